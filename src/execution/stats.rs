//! Per-step timing telemetry.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit in which step times are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingUnit {
    /// Whole milliseconds
    #[default]
    Millis,
    /// Whole microseconds
    Micros,
}

impl TimingUnit {
    /// Convert a duration to whole units, truncating.
    pub fn whole_units(self, elapsed: Duration) -> u64 {
        let units = match self {
            TimingUnit::Millis => elapsed.as_millis(),
            TimingUnit::Micros => elapsed.as_micros(),
        };
        u64::try_from(units).unwrap_or(u64::MAX)
    }
}

/// Time spent on one graph step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTiming {
    /// Filter tag of the step
    pub filter: String,
    /// Elapsed engine time, in whole units
    pub time: u64,
}

/// Ordered step timings, one per executed or skipped step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionStats {
    steps: Vec<StepTiming>,
}

impl ExecutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn record(&mut self, filter: impl Into<String>, time: u64) {
        self.steps.push(StepTiming {
            filter: filter.into(),
            time,
        });
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of all step times.
    pub fn total(&self) -> u64 {
        self.steps.iter().map(|step| step.time).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_truncate() {
        let elapsed = Duration::from_micros(2_999);
        assert_eq!(TimingUnit::Millis.whole_units(elapsed), 2);
        assert_eq!(TimingUnit::Micros.whole_units(elapsed), 2_999);
        assert_eq!(TimingUnit::Micros.whole_units(Duration::from_nanos(999)), 0);
    }

    #[test]
    fn test_stats_serialize_as_list() {
        let mut stats = ExecutionStats::new();
        stats.record("invert", 3);
        stats.record("box", 12);
        assert_eq!(stats.total(), 15);

        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"[{"filter":"invert","time":3},{"filter":"box","time":12}]"#);
        let back: ExecutionStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
