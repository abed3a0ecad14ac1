//! Seam to the image-processing engine proper.
//!
//! Decoders, encoders, and the operation graph are external collaborators.
//! The runtime hands them a job's bound streams plus the caller's JSON
//! payload through [`EngineBackend`] and stores whatever JSON they produce.
//! [`NullEngine`] is the default backend: it runs the trivial no-op pass
//! used by the boundary contract tests and by callers probing the plumbing.

use crate::errors::FlowError;
use crate::io::{Direction, IoObject};
use crate::job::{IoBinding, Job};
use std::collections::HashMap;
use std::fmt::Debug;

// Handle types live in context.rs; the scope only ever resolves job-local ids.
use crate::context::IoId;

/// A job's view of its bound streams during one engine invocation.
///
/// Resolves job-local io ids to the context-owned streams for the duration
/// of the call; the engine never sees context handles.
#[derive(Debug)]
pub struct ExecutionScope<'a> {
    job: &'a Job,
    ios: &'a mut HashMap<IoId, IoObject>,
}

impl<'a> ExecutionScope<'a> {
    pub(crate) fn new(job: &'a Job, ios: &'a mut HashMap<IoId, IoObject>) -> Self {
        Self { job, ios }
    }

    /// Returns the job's bound io ids in ascending order.
    #[must_use]
    pub fn io_ids(&self) -> Vec<i32> {
        self.job.io_ids()
    }

    /// Returns the binding for a job-local io id.
    #[must_use]
    pub fn binding(&self, io_id: i32) -> Option<IoBinding> {
        self.job.get_io(io_id)
    }

    /// Resolves a job-local io id to its stream.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the id is unbound or its stream no longer exists.
    pub fn io_mut(&mut self, io_id: i32) -> Result<&mut IoObject, FlowError> {
        let binding = self
            .job
            .get_io(io_id)
            .ok_or_else(|| FlowError::ItemNotFound(format!("io_id {io_id} is not bound")))?;
        self.ios
            .get_mut(&binding.io)
            .ok_or_else(|| FlowError::ItemNotFound(format!("io_id {io_id} has no backing stream")))
    }
}

/// The engine collaborator invoked by the JSON dispatcher.
///
/// Implementations run synchronously to completion or failure within the
/// call; the runtime provides no cancellation or scheduling.
pub trait EngineBackend: Debug {
    /// Returns a short backend name for logs and version info.
    fn name(&self) -> &str;

    /// Executes one run against a job's streams.
    ///
    /// `payload` is the caller's JSON command body, passed through without
    /// validation. The returned JSON becomes the `data` field of the
    /// response envelope.
    ///
    /// # Errors
    ///
    /// Any [`FlowError`]; decode/encode/graph failures should carry the
    /// matching taxonomy variant so the boundary code is accurate.
    fn execute(
        &mut self,
        scope: &mut ExecutionScope<'_>,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, FlowError>;
}

/// Default backend performing a no-op pass over the job's streams.
#[derive(Debug, Default)]
pub struct NullEngine;

impl EngineBackend for NullEngine {
    fn name(&self) -> &str {
        "null"
    }

    fn execute(
        &mut self,
        scope: &mut ExecutionScope<'_>,
        _payload: &serde_json::Value,
    ) -> Result<serde_json::Value, FlowError> {
        let mut outputs_touched = 0u32;
        for io_id in scope.io_ids() {
            let binding = scope
                .binding(io_id)
                .ok_or_else(|| FlowError::Internal(format!("binding for io_id {io_id} vanished")))?;
            // Resolve every stream so dangling bindings fail loudly even in
            // the no-op pass.
            let _ = scope.io_mut(io_id)?;
            if binding.direction == Direction::Out {
                outputs_touched += 1;
            }
        }
        Ok(serde_json::json!({
            "engine": self.name(),
            "outputs_touched": outputs_touched,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{CleanupWith, Lifetime};
    use pretty_assertions::assert_eq;

    fn scope_fixture() -> (Job, HashMap<IoId, IoObject>) {
        let input = IoId::from_token(1).unwrap();
        let output = IoId::from_token(2).unwrap();
        let mut ios = HashMap::new();
        ios.insert(
            input,
            IoObject::from_buffer(&[1, 2, 3], Lifetime::OutlivesFunctionCall, CleanupWith::Context)
                .unwrap(),
        );
        ios.insert(output, IoObject::for_output_buffer());
        let mut job = Job::new();
        job.add_io(0, input, Direction::In).unwrap();
        job.add_io(1, output, Direction::Out).unwrap();
        (job, ios)
    }

    #[test]
    fn test_null_engine_counts_outputs() {
        let (job, mut ios) = scope_fixture();
        let mut scope = ExecutionScope::new(&job, &mut ios);
        let result = NullEngine.execute(&mut scope, &serde_json::json!({})).unwrap();
        assert_eq!(result["outputs_touched"], 1);
        assert_eq!(result["engine"], "null");
    }

    #[test]
    fn test_scope_rejects_unbound_id() {
        let (job, mut ios) = scope_fixture();
        let mut scope = ExecutionScope::new(&job, &mut ios);
        let err = scope.io_mut(9).unwrap_err();
        assert_eq!(err.code().value(), 54);
    }

    #[test]
    fn test_scope_detects_dangling_binding() {
        let (job, mut ios) = scope_fixture();
        ios.remove(&IoId::from_token(2).unwrap());
        let mut scope = ExecutionScope::new(&job, &mut ios);
        let err = NullEngine
            .execute(&mut scope, &serde_json::Value::Null)
            .unwrap_err();
        assert_eq!(err.code().value(), 54);
    }
}
