//! Filter graph executor.
//!
//! Runs a [`FilterGraph`] against one source image. Pixel operations write
//! the current buffer in place; convolutions read the current buffer and
//! write the other one, after which the two swap roles.

use crate::core::error::{ExecutionResult, FilterError, ResourceError};
use crate::core::types::{PixelBuffer, HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH};
use crate::execution::resources::{ImageHandle, ResourceManager};
use crate::execution::stats::{ExecutionStats, TimingUnit};
use crate::graph::descriptor::Filter;
use crate::graph::serialization::{FilterGraph, FilterStep};
use crate::native::{PixelEngine, PixelOp};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// What to do with a step whose tag is not in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedPolicy {
    /// Log a warning, leave the image untouched and continue.
    #[default]
    Skip,
    /// Abort the graph with [`FilterError::UnsupportedFilter`].
    Reject,
}

/// Executor options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Handling of unsupported filter tags.
    pub unsupported: UnsupportedPolicy,
    /// Unit used for step timings.
    pub timing_unit: TimingUnit,
}

impl ExecutorOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unsupported-filter policy.
    pub fn with_unsupported(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported = policy;
        self
    }

    /// Set the timing unit.
    pub fn with_timing_unit(mut self, unit: TimingUnit) -> Self {
        self.timing_unit = unit;
        self
    }
}

/// Result of a successful graph run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    /// The transformed image.
    pub image: PixelBuffer,
    /// 256x100 histogram of the transformed image.
    pub histogram: PixelBuffer,
    /// One timing entry per graph step.
    pub stats: ExecutionStats,
}

/// Selects which of the two working buffers holds the current image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Front,
    Back,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::Front => 0,
            Slot::Back => 1,
        }
    }

    fn other(self) -> Slot {
        match self {
            Slot::Front => Slot::Back,
            Slot::Back => Slot::Front,
        }
    }
}

/// Executes filter graphs against an injected engine.
#[derive(Debug)]
pub struct Executor<E: PixelEngine> {
    resources: ResourceManager<E>,
    options: ExecutorOptions,
}

impl<E: PixelEngine> Executor<E> {
    /// Create an executor with default options.
    pub fn new(engine: E) -> Self {
        Self {
            resources: ResourceManager::new(engine),
            options: ExecutorOptions::default(),
        }
    }

    /// Set options.
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// The resource manager owning the engine.
    pub fn resources(&self) -> &ResourceManager<E> {
        &self.resources
    }

    /// Consume the executor and return its engine.
    pub fn into_engine(self) -> E {
        self.resources.into_engine()
    }

    /// Run `graph` on `image`, rendering the result's histogram into `histogram`.
    ///
    /// Both buffers are returned, mutated, in the output. Any error other
    /// than a skipped unsupported filter aborts the run; every engine
    /// allocation is released on all paths.
    pub fn execute(
        &self,
        graph: &FilterGraph,
        mut image: PixelBuffer,
        mut histogram: PixelBuffer,
    ) -> ExecutionResult<ExecutionOutput> {
        if !histogram.has_dimensions(HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT) {
            return Err(ResourceError::DimensionMismatch {
                expected_width: HISTOGRAM_WIDTH,
                expected_height: HISTOGRAM_HEIGHT,
                width: histogram.width,
                height: histogram.height,
            }
            .into());
        }

        let mut buffers = [
            self.resources.load_image(&image)?,
            self.resources.allocate_image(image.width, image.height)?,
        ];
        let mut histogram_image = self.resources.allocate_image(HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT)?;

        let mut current = Slot::Front;
        let mut stats = ExecutionStats::new();
        for step in graph.iter() {
            let elapsed = self.run_step(step, &buffers, &mut current)?;
            let time = self.options.timing_unit.whole_units(elapsed);
            log::debug!("Step {} ({}) took {time} {:?}", step.id, step.filter.name(), self.options.timing_unit);
            stats.record(step.filter.name(), time);
        }

        let result = &buffers[current.index()];
        self.resources.histogram(result, &histogram_image)?;
        result.export_pixels(&mut image)?;
        histogram_image.export_pixels(&mut histogram)?;

        for buffer in &mut buffers {
            buffer.free()?;
        }
        histogram_image.free()?;

        Ok(ExecutionOutput {
            image,
            histogram,
            stats,
        })
    }

    /// Apply one step and return the time spent in the engine.
    fn run_step(
        &self,
        step: &FilterStep,
        buffers: &[ImageHandle<'_, E>; 2],
        current: &mut Slot,
    ) -> ExecutionResult<Duration> {
        let source = &buffers[current.index()];

        if let Some(op) = pixel_op(&step.filter) {
            let start = Instant::now();
            self.resources.apply(op, source, source)?;
            return Ok(start.elapsed());
        }

        if let Some(descriptor) = step.filter.kernel() {
            let target = &buffers[current.other().index()];
            let mut kernel = self.resources.create_kernel(&descriptor)?;

            let start = Instant::now();
            self.resources.convolve(source, target, &kernel)?;
            let elapsed = start.elapsed();

            kernel.free()?;
            *current = current.other();
            return Ok(elapsed);
        }

        match self.options.unsupported {
            UnsupportedPolicy::Skip => {
                log::warn!("Skipping unsupported filter '{}' (step {})", step.filter.name(), step.id);
                Ok(Duration::ZERO)
            }
            UnsupportedPolicy::Reject => Err(FilterError::UnsupportedFilter(step.filter.name().to_string()).into()),
        }
    }
}

/// Engine operation for filters that write the current buffer in place.
fn pixel_op(filter: &Filter) -> Option<PixelOp> {
    let op = match *filter {
        Filter::Grayscale => PixelOp::Grayscale,
        Filter::Invert => PixelOp::Invert,
        Filter::Threshold { value } => PixelOp::Threshold { value },
        Filter::HsvAdjust {
            hue,
            saturation,
            value,
        } => PixelOp::HsvAdjust {
            hue,
            saturation,
            value,
        },
        Filter::LinearBrightness { value } => PixelOp::LinearBrightness {
            multiplier: 10f64.powf(value / 100.0) as f32,
        },
        Filter::Gamma { value } => PixelOp::Gamma { gamma: value },
        Filter::Pixelate { pixel_size } => PixelOp::Pixelate { size: pixel_size },
        Filter::Noise { noise, color } => PixelOp::Noise {
            noise,
            color,
            seed: fresh_seed(),
        },
        Filter::Bitcrush { bits } => PixelOp::Bitcrush { bits },
        _ => return None,
    };
    Some(op)
}

/// A new random 32-bit seed for every call.
fn fresh_seed() -> u32 {
    uuid::Uuid::new_v4().as_u128() as u32
}
