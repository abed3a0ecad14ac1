//! Comprehensive tests for context ownership, teardown, and dispatch.

use crate::context::{Context, IoId, JobId, ResponseId, Target};
use crate::engine::{EngineBackend, ExecutionScope};
use crate::errors::FlowError;
use crate::io::{CleanupWith, Direction, IoMode, Lifetime};
use pretty_assertions::assert_eq;
use std::io::Write as _;

/// Installs a test subscriber so teardown events are visible under
/// `RUST_LOG=lumaflow=debug`. Safe to call from every test.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test backend that writes fixed bytes to every Out stream.
#[derive(Debug)]
struct EchoEngine {
    bytes: &'static [u8],
}

impl EngineBackend for EchoEngine {
    fn name(&self) -> &str {
        "echo"
    }

    fn execute(
        &mut self,
        scope: &mut ExecutionScope<'_>,
        _payload: &serde_json::Value,
    ) -> Result<serde_json::Value, FlowError> {
        for io_id in scope.io_ids() {
            let binding = scope.binding(io_id).ok_or_else(|| {
                FlowError::Internal(format!("binding for io_id {io_id} vanished"))
            })?;
            if binding.direction == Direction::Out {
                scope.io_mut(io_id)?.write_all(self.bytes)?;
            }
        }
        Ok(serde_json::json!({ "written": self.bytes.len() }))
    }
}

/// Test backend that always fails with a decode error.
#[derive(Debug)]
struct FailingEngine;

impl EngineBackend for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    fn execute(
        &mut self,
        _scope: &mut ExecutionScope<'_>,
        _payload: &serde_json::Value,
    ) -> Result<serde_json::Value, FlowError> {
        Err(FlowError::DecodeFailed("corrupt jpeg marker".into()))
    }
}

#[test]
fn test_error_passthrough_state_machine() {
    let mut ctx = Context::new();
    assert!(!ctx.has_error());
    assert_eq!(ctx.error_code(), 0);

    assert!(ctx.raise_error(60, "decode failed", Some("src/dec.rs"), Some(10), Some("decode")));
    assert!(ctx.has_error());
    assert_eq!(ctx.error_code(), 60);
    assert!(!ctx.raise_error(61, "encode failed", None, None, None));
    assert!(ctx.add_to_callstack(Some("src/api.rs"), Some(99), None));

    ctx.clear_error();
    assert!(!ctx.has_error());
    assert!(!ctx.add_to_callstack(None, None, None));
}

#[test]
fn test_error_and_stacktrace_buffer_contract() {
    let mut ctx = Context::new();
    assert!(ctx.raise_error(60, "decode failed", None, None, None));

    let mut tiny = [0u8; 8];
    assert_eq!(ctx.error_and_stacktrace(&mut tiny), -1);

    let mut buffer = [0u8; 256];
    let written = ctx.error_and_stacktrace(&mut buffer);
    assert!(written > 0);
    let written = usize::try_from(written).unwrap();
    assert_eq!(buffer[written], 0);

    ctx.clear_error();
    assert!(!ctx.has_error());
}

#[test]
fn test_memory_ledger_through_context() {
    let mut ctx = Context::new();
    let ptr = ctx.memory_allocate(128, Some("caller.c"), Some(12)).unwrap();
    let addr = ptr.as_ptr() as usize;
    assert_eq!(ctx.memory().live_bytes(), 128);
    assert!(ctx.memory_free(addr));
    assert!(!ctx.memory_free(addr));
}

#[test]
fn test_leaked_allocations_reclaimed_at_teardown() {
    let mut ctx = Context::new();
    ctx.memory_allocate(64, None, None).unwrap();
    ctx.memory_allocate(32, None, None).unwrap();
    // Never freed by the caller; teardown reclaims without raising.
    assert!(ctx.begin_terminate());
    assert!(ctx.memory().is_empty());
    assert!(!ctx.has_error());
}

#[test]
fn test_foreign_handles_rejected_not_dereferenced() {
    let mut ctx = Context::new();
    let stray_io = IoId::from_token(999).unwrap();
    let stray_job = JobId::from_token(998).unwrap();
    let stray_response = ResponseId::from_token(997).unwrap();

    assert!(ctx.io(stray_io).is_none());
    assert_eq!(ctx.io_output_buffer(stray_io).unwrap_err().code().value(), 54);
    assert_eq!(
        ctx.job_add_io(stray_job, stray_io, 0, Direction::In)
            .unwrap_err()
            .code()
            .value(),
        54
    );
    assert_eq!(ctx.destroy_job(stray_job).unwrap_err().code().value(), 54);
    assert!(ctx.response(stray_response).is_none());
    assert!(!ctx.destroy_response(stray_response));
}

#[test]
fn test_handle_tokens_never_alias_across_kinds() {
    let mut ctx = Context::new();
    let io = ctx.create_io_for_output_buffer();
    let job = ctx.create_job();
    assert_ne!(io.token(), job.token());
    // The io token is not a valid job handle.
    let as_job = JobId::from_token(io.token()).unwrap();
    assert!(ctx.job(as_job).is_none());
}

#[test]
fn test_job_binding_and_lookup() {
    let mut ctx = Context::new();
    let input = ctx
        .create_io_from_buffer(&[1, 2, 3], Lifetime::OutlivesFunctionCall, CleanupWith::Context)
        .unwrap();
    let output = ctx.create_io_for_output_buffer();
    let job = ctx.create_job();

    ctx.job_add_io(job, input, 0, Direction::In).unwrap();
    ctx.job_add_io(job, output, 1, Direction::Out).unwrap();
    assert_eq!(ctx.job_get_io(job, 0).unwrap(), input);
    assert_eq!(ctx.job_get_io(job, 1).unwrap(), output);

    let err = ctx.job_add_io(job, input, 0, Direction::In).unwrap_err();
    assert_eq!(err.code().value(), 50);
    assert_eq!(ctx.job_get_io(job, 9).unwrap_err().code().value(), 54);
}

#[test]
fn test_destroy_job_keeps_streams_alive() {
    let mut ctx = Context::new();
    let output = ctx.create_io_for_output_buffer();
    let job = ctx.create_job();
    ctx.job_add_io(job, output, 0, Direction::Out).unwrap();

    ctx.destroy_job(job).unwrap();
    assert!(ctx.job(job).is_none());
    // The stream survives the job and stays writable.
    ctx.io_mut(output).unwrap().write_all(b"tail").unwrap();
    assert_eq!(ctx.io_output_buffer(output).unwrap(), b"tail");
}

#[test]
fn test_send_json_to_unknown_job_fails_before_dispatch() {
    let mut ctx = Context::new();
    let stray = JobId::from_token(1234).unwrap();
    let err = ctx
        .send_json(Target::Job(stray), "v1/execute", b"{}")
        .unwrap_err();
    assert_eq!(err.code().value(), 54);
}

#[test]
fn test_response_lifecycle() {
    let mut ctx = Context::new();
    let response = ctx.send_json(Target::Context, "v1/ping", b"").unwrap();
    let stored = ctx.response(response).unwrap();
    assert_eq!(stored.status(), 200);
    assert!(!stored.body().is_empty());

    assert!(ctx.destroy_response(response));
    assert!(!ctx.destroy_response(response));
    assert!(ctx.response(response).is_none());
}

#[test]
fn test_end_to_end_noop_encode() {
    // create context → output io → job → bind → execute → read buffer →
    // destroy job → terminate. No error may ever be active.
    let mut ctx = Context::new();
    let output = ctx.create_io_for_output_buffer();
    let job = ctx.create_job();
    ctx.job_add_io(job, output, 0, Direction::Out).unwrap();

    let response = ctx.send_json(Target::Job(job), "v1/execute", b"{}").unwrap();
    assert_eq!(ctx.response(response).unwrap().status(), 200);

    let buffer = ctx.job_output_buffer_by_id(job, 0).unwrap();
    assert!(buffer.is_empty()); // no-op engine writes nothing

    ctx.destroy_job(job).unwrap();
    assert!(!ctx.has_error());
    assert!(ctx.begin_terminate());
}

#[test]
fn test_engine_writes_reach_output_buffer() {
    let mut ctx = Context::with_engine(Box::new(EchoEngine { bytes: b"IMG0" }));
    let output = ctx.create_io_for_output_buffer();
    let job = ctx.create_job();
    ctx.job_add_io(job, output, 0, Direction::Out).unwrap();

    ctx.send_json(Target::Job(job), "v1/execute", b"{}").unwrap();
    assert_eq!(ctx.job_output_buffer_by_id(job, 0).unwrap(), b"IMG0");
}

#[test]
fn test_engine_failure_surfaces_through_error_path() {
    let mut ctx = Context::with_engine(Box::new(FailingEngine));
    let job = ctx.create_job();
    let err = ctx.send_json(Target::Job(job), "v1/execute", b"{}").unwrap_err();
    assert_eq!(err.code().value(), 60);

    // The boundary layer deposits it; a second deposit is refused.
    assert!(ctx.record_error(&err));
    assert_eq!(ctx.error_code(), 60);
    assert!(!ctx.record_error(&err));
}

#[test]
fn test_io_summary_reports_bindings() {
    let mut ctx = Context::new();
    let input = ctx
        .create_io_from_buffer(&[0xFF], Lifetime::OutlivesContext, CleanupWith::Context)
        .unwrap();
    let job = ctx.create_job();
    ctx.job_add_io(job, input, 4, Direction::In).unwrap();

    let response = ctx.send_json(Target::Job(job), "v1/io_summary", b"").unwrap();
    let value: serde_json::Value =
        serde_json::from_slice(ctx.response(response).unwrap().body()).unwrap();
    assert_eq!(value["data"]["io"][0]["io_id"], 4);
    assert_eq!(value["data"]["io"][0]["direction"], "in");
    assert_eq!(value["data"]["io"][0]["kind"], "buffer");
}

#[test]
fn test_begin_terminate_is_idempotent_and_releases_everything() {
    init_tracing();
    let mut ctx = Context::new();
    let output = ctx.create_io_for_output_buffer();
    let job = ctx.create_job();
    ctx.job_add_io(job, output, 0, Direction::Out).unwrap();
    ctx.send_json(Target::Context, "v1/ping", b"").unwrap();
    ctx.memory_allocate(16, None, None).unwrap();

    assert!(ctx.begin_terminate());
    assert!(ctx.is_terminating());
    assert!(ctx.io(output).is_none());
    assert!(ctx.job(job).is_none());
    assert!(ctx.memory().is_empty());
    // Second call reports the same cleanliness without re-tearing-down.
    assert!(ctx.begin_terminate());
}

#[test]
fn test_terminate_preserves_prior_error_for_queries() {
    let mut ctx = Context::new();
    assert!(ctx.raise_error(61, "encode failed", None, None, None));
    // Teardown is not clean because an error predates it, and the record
    // stays queryable afterwards.
    assert!(!ctx.begin_terminate());
    assert_eq!(ctx.error_code(), 61);
    let mut buffer = [0u8; 128];
    assert!(ctx.error_and_stacktrace(&mut buffer) > 0);
}

#[test]
fn test_teardown_flushes_files_cleanly() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("written.bin");

    let mut ctx = Context::new();
    let file = ctx
        .create_io_for_file(&path, IoMode::WriteSeekable, CleanupWith::Context)
        .unwrap();
    let job = ctx.create_job();
    ctx.job_add_io(job, file, 0, Direction::Out).unwrap();
    ctx.create_io_for_output_buffer();

    // Healthy teardown: file flushes, everything is released, no error.
    assert!(ctx.begin_terminate());
    assert!(!ctx.has_error());
    assert!(ctx.io(file).is_none());
}

#[test]
fn test_teardown_failure_is_collected_not_fatal() {
    init_tracing();
    let mut ctx = Context::new();
    let bad = ctx.create_io_failing_sink();
    let good = ctx.create_io_for_output_buffer();
    let job = ctx.create_job();
    ctx.job_add_io(job, bad, 0, Direction::Out).unwrap();
    ctx.memory_allocate(8, None, None).unwrap();

    // The flush failure lands in the error slot; teardown keeps going and
    // still drains every arena.
    assert!(!ctx.begin_terminate());
    assert_eq!(ctx.error_code(), 20);
    assert!(ctx.io(bad).is_none());
    assert!(ctx.io(good).is_none());
    assert!(ctx.job(job).is_none());
    assert!(ctx.memory().is_empty());

    // The record stays queryable after teardown.
    let mut buffer = [0u8; 256];
    assert!(ctx.error_and_stacktrace(&mut buffer) > 0);
}
