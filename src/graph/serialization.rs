//! Filter graph parsing and serialization.
//!
//! On the wire a graph is a JSON array of `{ id, type, params }` objects.
//! Parsing happens in two phases: the JSON must deserialize into descriptor
//! records (otherwise the request is malformed), then each record's params
//! are validated into a typed [`Filter`].

use crate::core::error::{FilterError, FilterGraphError};
use crate::graph::descriptor::Filter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serializable representation of one descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedFilter {
    /// Identifier assigned by the editor
    pub id: i64,
    /// Filter tag
    #[serde(rename = "type")]
    pub tag: String,
    /// Tag-specific parameters
    #[serde(default)]
    pub params: Value,
}

/// One step of a filter graph.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStep {
    /// Identifier assigned by the editor
    pub id: i64,
    /// Validated filter
    pub filter: Filter,
}

impl FilterStep {
    /// Create a step.
    pub fn new(id: i64, filter: Filter) -> Self {
        Self { id, filter }
    }
}

impl TryFrom<SerializedFilter> for FilterStep {
    type Error = FilterError;

    fn try_from(raw: SerializedFilter) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            filter: Filter::from_params(&raw.tag, &raw.params)?,
        })
    }
}

impl From<&FilterStep> for SerializedFilter {
    fn from(step: &FilterStep) -> Self {
        Self {
            id: step.id,
            tag: step.filter.name().to_string(),
            params: step.filter.params(),
        }
    }
}

/// Ordered sequence of filter steps. Order is execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    steps: Vec<FilterStep>,
}

impl FilterGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn push(&mut self, id: i64, filter: Filter) {
        self.steps.push(FilterStep::new(id, filter));
    }

    /// Builder-style [`Self::push`] using the next free id.
    pub fn with(mut self, filter: Filter) -> Self {
        let id = self.steps.len() as i64;
        self.push(id, filter);
        self
    }

    /// Parse a graph from its JSON wire form.
    ///
    /// JSON that is not a descriptor list yields
    /// [`FilterGraphError::MalformedRequest`]; invalid params yield the
    /// corresponding [`FilterError`].
    pub fn from_json(json: &str) -> Result<Self, FilterGraphError> {
        let raw: Vec<SerializedFilter> = serde_json::from_str(json)
            .map_err(|e| FilterGraphError::MalformedRequest(format!("graph: {e}")))?;
        let steps = raw
            .into_iter()
            .map(FilterStep::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let raw: Vec<SerializedFilter> = self.steps.iter().map(SerializedFilter::from).collect();
        serde_json::to_string(&raw)
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[FilterStep] {
        &self.steps
    }

    /// Iterate over steps in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &FilterStep> {
        self.steps.iter()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the graph has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromIterator<Filter> for FilterGraph {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        iter.into_iter().fold(FilterGraph::new(), FilterGraph::with)
    }
}
