//! Request boundary in front of an [`Executor`].
//!
//! A request carries a graph (as a JSON string), a source image and a
//! histogram target. Requests are validated before any engine allocation
//! and run one at a time; concurrent callers wait on the worker's lock.

use crate::core::error::{FilterGraphError, FilterGraphResult};
use crate::core::types::PixelBuffer;
use crate::execution::executor::{ExecutionOutput, Executor};
use crate::execution::stats::ExecutionStats;
use crate::graph::serialization::FilterGraph;
use crate::native::PixelEngine;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One graph execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Serialized filter graph
    pub graph: String,
    /// Source image
    pub image: PixelBuffer,
    /// Histogram target; must be 256x100
    pub histogram: PixelBuffer,
}

impl Request {
    /// Build a request for `graph` with a fresh histogram target.
    pub fn new(graph: &FilterGraph, image: PixelBuffer) -> FilterGraphResult<Self> {
        Ok(Self {
            graph: graph.to_json()?,
            image,
            histogram: PixelBuffer::histogram(),
        })
    }
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success {
        image: PixelBuffer,
        histogram: PixelBuffer,
        stats: ExecutionStats,
    },
    Failure {
        error: String,
    },
}

impl Response {
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }
}

impl From<ExecutionOutput> for Response {
    fn from(output: ExecutionOutput) -> Self {
        Response::Success {
            image: output.image,
            histogram: output.histogram,
            stats: output.stats,
        }
    }
}

impl From<FilterGraphError> for Response {
    fn from(error: FilterGraphError) -> Self {
        Response::Failure {
            error: error.to_string(),
        }
    }
}

/// Serializes requests onto a single executor.
#[derive(Debug)]
pub struct Worker<E: PixelEngine> {
    executor: Mutex<Executor<E>>,
}

impl<E: PixelEngine> Worker<E> {
    pub fn new(executor: Executor<E>) -> Self {
        Self {
            executor: Mutex::new(executor),
        }
    }

    /// Give back the executor.
    pub fn into_inner(self) -> Executor<E> {
        self.executor.into_inner()
    }

    /// Validate and run a request.
    pub fn process(&self, request: Request) -> FilterGraphResult<ExecutionOutput> {
        request
            .image
            .validate()
            .map_err(|reason| FilterGraphError::MalformedRequest(format!("image: {reason}")))?;
        request
            .histogram
            .validate()
            .map_err(|reason| FilterGraphError::MalformedRequest(format!("histogram: {reason}")))?;
        let graph = FilterGraph::from_json(&request.graph)?;

        let executor = self.executor.lock();
        let output = executor.execute(&graph, request.image, request.histogram)?;
        log::info!(
            "Executed {} step(s) in {} {:?}",
            output.stats.len(),
            output.stats.total(),
            executor.options().timing_unit
        );
        Ok(output)
    }

    /// Run a request, folding any failure into [`Response::Failure`].
    pub fn handle(&self, request: Request) -> Response {
        match self.process(request) {
            Ok(output) => output.into(),
            Err(error) => {
                log::warn!("Request failed: {error}");
                error.into()
            }
        }
    }

    /// Line protocol: one JSON request in, one JSON response out.
    pub fn handle_json(&self, line: &str) -> String {
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(error) => FilterGraphError::MalformedRequest(error.to_string()).into(),
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|error| serde_json::json!({ "error": error.to_string() }).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::descriptor::Filter;
    use crate::native::SoftwareEngine;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn worker() -> Worker<SoftwareEngine> {
        Worker::new(Executor::new(SoftwareEngine::new()))
    }

    fn error_of(response: Response) -> String {
        match response {
            Response::Failure { error } => error,
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_handle_success() {
        let graph = FilterGraph::new().with(Filter::Invert);
        let request = Request::new(&graph, PixelBuffer::filled(2, 2, [10, 20, 30, 255])).unwrap();

        match worker().handle(request) {
            Response::Success { image, histogram, stats } => {
                assert!(image.pixels().all(|px| px == [245, 235, 225, 255]));
                assert!(histogram.has_dimensions(256, 100));
                assert_eq!(stats.steps()[0].filter, "invert");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_buffers_rejected_before_allocation() {
        let worker = worker();
        let mut request = Request::new(&FilterGraph::new(), PixelBuffer::filled(2, 2, [0, 0, 0, 255])).unwrap();
        request.image.data.pop();

        let error = error_of(worker.handle(request.clone()));
        assert!(error.starts_with("Malformed request: image"), "{error}");

        request.image = PixelBuffer::new(2, 2);
        request.histogram = PixelBuffer::new(0, 100);
        let error = error_of(worker.handle(request));
        assert!(error.starts_with("Malformed request: histogram"), "{error}");

        let executor = worker.into_inner();
        assert_eq!(executor.resources().engine().allocation_count(), 0);
    }

    #[test]
    fn test_bad_graph_is_reported() {
        let worker = worker();
        let mut request = Request::new(&FilterGraph::new(), PixelBuffer::new(1, 1)).unwrap();

        request.graph = "not json".to_string();
        assert!(error_of(worker.handle(request.clone())).starts_with("Malformed request: graph"));

        request.graph = r#"[{"id": 0, "type": "gamma", "params": {"value": 0}}]"#.to_string();
        assert!(error_of(worker.handle(request)).contains("gamma"));
    }

    #[test]
    fn test_handle_json_wire_format() {
        let line = json!({
            "graph": r#"[{"id": 1, "type": "grayscale", "params": {}}, {"id": 2, "type": "sepia"}]"#,
            "image": { "width": 1, "height": 1, "data": "/wAAZA==" },
            "histogram": PixelBuffer::histogram(),
        })
        .to_string();

        let reply: Value = serde_json::from_str(&worker().handle_json(&line)).unwrap();
        assert_eq!(reply["image"]["data"], "NjY2ZA==");
        assert_eq!(reply["stats"][0]["filter"], "grayscale");
        assert_eq!(reply["stats"][1], json!({ "filter": "sepia", "time": 0 }));
    }

    #[test]
    fn test_handle_json_garbage() {
        let reply: Value = serde_json::from_str(&worker().handle_json("{\"graph\": 3}")).unwrap();
        assert!(reply["error"].as_str().unwrap().starts_with("Malformed request"));
        assert!(reply.get("image").is_none());
    }

    #[test]
    fn test_concurrent_requests_are_serialized() {
        let worker = Arc::new(worker());
        let graph = FilterGraph::new().with(Filter::Box { size: 3 }).with(Filter::Invert);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let worker = Arc::clone(&worker);
                let request = Request::new(&graph, PixelBuffer::filled(8, 8, [40, 80, 120, 255])).unwrap();
                scope.spawn(move || {
                    assert!(worker.handle(request).is_success());
                });
            }
        });

        let executor = Arc::try_unwrap(worker).unwrap().into_inner();
        assert_eq!(executor.resources().live_handles(), 0);
    }
}
