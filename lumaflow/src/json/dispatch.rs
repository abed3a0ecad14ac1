//! Method-name routing for JSON commands.
//!
//! A static table maps (target kind, method name) to a handler with a
//! uniform `(scope, payload) -> response-or-failure` contract; handlers are
//! registered here at compile time, never discovered at runtime. The method
//! string and payload are borrowed for the call only; anything a handler
//! needs later is copied.

use super::JsonResponse;
use crate::context::JobId;
use crate::engine::{EngineBackend, ExecutionScope};
use crate::errors::FlowError;
use crate::io::IoObject;
use crate::job::Job;
use std::collections::HashMap;

// Handle key types for the borrowed arenas.
use crate::context::IoId;

/// Which kind of object a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Addressed to the context itself.
    Context,
    /// Addressed to a job owned by the context.
    Job,
}

/// Borrowed view of the context internals a handler may touch.
///
/// Built fresh per dispatch; holding it across calls is impossible by
/// construction.
pub struct DispatchScope<'a> {
    pub(crate) jobs: &'a HashMap<JobId, Job>,
    pub(crate) ios: &'a mut HashMap<IoId, IoObject>,
    pub(crate) engine: &'a mut dyn EngineBackend,
    pub(crate) target_job: Option<JobId>,
}

impl<'a> DispatchScope<'a> {
    pub(crate) fn new(
        jobs: &'a HashMap<JobId, Job>,
        ios: &'a mut HashMap<IoId, IoObject>,
        engine: &'a mut dyn EngineBackend,
        target_job: Option<JobId>,
    ) -> Self {
        Self {
            jobs,
            ios,
            engine,
            target_job,
        }
    }

    fn target_job(&self) -> Result<&'a Job, FlowError> {
        let id = self
            .target_job
            .ok_or(FlowError::NullArgument("job-addressed command without a job"))?;
        self.jobs
            .get(&id)
            .ok_or_else(|| FlowError::ItemNotFound(format!("job handle {} is unknown", id.token())))
    }
}

type Handler = fn(&mut DispatchScope<'_>, &[u8]) -> Result<JsonResponse, FlowError>;

/// The routing table. Order is lookup order; methods are few enough that a
/// linear scan beats a map.
const ROUTES: &[(TargetKind, &str, Handler)] = &[
    (TargetKind::Context, "v1/get_version_info", get_version_info),
    (TargetKind::Context, "v1/ping", ping),
    (TargetKind::Job, "v1/execute", execute),
    (TargetKind::Job, "v1/io_summary", io_summary),
];

/// Routes `method` to its handler and runs it.
///
/// # Errors
///
/// `ItemNotFound` for an unknown (target, method) pair; otherwise whatever
/// the handler fails with. An out-of-memory handler failure is downgraded to
/// the static degraded-mode response so the condition is still reportable.
pub fn route(
    kind: TargetKind,
    method: &str,
    scope: &mut DispatchScope<'_>,
    payload: &[u8],
) -> Result<JsonResponse, FlowError> {
    let handler = ROUTES
        .iter()
        .find(|(route_kind, route_method, _)| *route_kind == kind && *route_method == method)
        .map(|(_, _, handler)| handler)
        .ok_or_else(|| FlowError::ItemNotFound(format!("no handler for method '{method}'")))?;

    tracing::debug!(method, target = ?kind, payload_bytes = payload.len(), "dispatching json command");
    match handler(scope, payload) {
        Ok(response) => Ok(response),
        Err(error) if error.code() == crate::errors::ErrorCode::OutOfMemory => {
            tracing::warn!(method, "handler ran out of memory; returning static response");
            Ok(JsonResponse::out_of_memory())
        }
        Err(error) => {
            tracing::debug!(method, error = %error, "json command failed");
            Err(error)
        }
    }
}

fn parse_payload(payload: &[u8]) -> Result<serde_json::Value, FlowError> {
    if payload.is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_slice(payload)?)
}

fn get_version_info(
    scope: &mut DispatchScope<'_>,
    _payload: &[u8],
) -> Result<JsonResponse, FlowError> {
    JsonResponse::ok(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "engine": scope.engine.name(),
        "debug_build": cfg!(debug_assertions),
    }))
}

fn ping(_scope: &mut DispatchScope<'_>, _payload: &[u8]) -> Result<JsonResponse, FlowError> {
    JsonResponse::ok(serde_json::json!({ "pong": true }))
}

fn execute(scope: &mut DispatchScope<'_>, payload: &[u8]) -> Result<JsonResponse, FlowError> {
    let payload = parse_payload(payload)?;
    let job = scope.target_job()?;
    let mut execution = ExecutionScope::new(job, scope.ios);
    let data = scope.engine.execute(&mut execution, &payload)?;
    JsonResponse::ok(data)
}

fn io_summary(scope: &mut DispatchScope<'_>, _payload: &[u8]) -> Result<JsonResponse, FlowError> {
    let job = scope.target_job()?;
    let mut entries = Vec::with_capacity(job.len());
    for io_id in job.io_ids() {
        let binding = job
            .get_io(io_id)
            .ok_or_else(|| FlowError::Internal(format!("binding for io_id {io_id} vanished")))?;
        let io = scope.ios.get(&binding.io).ok_or_else(|| {
            FlowError::Internal(format!("io_id {io_id} has no backing stream"))
        })?;
        entries.push(serde_json::json!({
            "io_id": io_id,
            "direction": binding.direction,
            "kind": io.kind(),
            "mode": io.mode(),
        }));
    }
    JsonResponse::ok(serde_json::json!({ "io": entries }))
}
