//! The root ownership and error scope for one sequence of engine calls.
//!
//! A [`Context`] owns everything the boundary hands out: the error slot, the
//! memory ledger, and arenas of IO streams, jobs, and JSON responses. Owned
//! objects are addressed by opaque non-zero tokens drawn from one shared
//! counter, so a token of one kind can never alias another kind; stale or
//! foreign tokens miss the arena and are rejected instead of dereferenced.
//!
//! A context is not safe for concurrent use. The caller serializes all
//! operations against it, including across the jobs and streams it owns.
//!
//! Teardown is ordered: jobs release their bindings first, then streams are
//! flushed and dropped, then responses, then the ledger. Failures along the
//! way are collected into the error slot, never raised mid-teardown, and
//! the remaining steps always run.

use crate::engine::{EngineBackend, NullEngine};
use crate::errors::{ErrorState, FlowError};
use crate::io::{CleanupWith, Direction, IoMode, IoObject, Lifetime};
use crate::job::Job;
use crate::json::{self, DispatchScope, JsonResponse, TargetKind};
use crate::memory::{AllocationSite, MemoryLedger};
use std::collections::HashMap;
use std::path::Path;
use std::ptr::NonNull;

macro_rules! handle_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Returns the raw non-zero token value.
            #[must_use]
            pub fn token(self) -> u64 {
                self.0
            }

            /// Wraps a raw token; `None` for the reserved zero value.
            #[must_use]
            pub fn from_token(token: u64) -> Option<Self> {
                (token != 0).then_some(Self(token))
            }
        }
    };
}

handle_type! {
    /// Opaque handle to a context-owned IO stream.
    IoId
}
handle_type! {
    /// Opaque handle to a context-owned job.
    JobId
}
handle_type! {
    /// Opaque handle to a context-owned JSON response.
    ResponseId
}

/// Addressee of a JSON command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The context itself.
    Context,
    /// A job owned by the context.
    Job(JobId),
}

/// Root owner of error state, tracked memory, streams, jobs, and responses.
#[derive(Debug)]
pub struct Context {
    error: ErrorState,
    memory: MemoryLedger,
    ios: HashMap<IoId, IoObject>,
    jobs: HashMap<JobId, Job>,
    responses: HashMap<ResponseId, JsonResponse>,
    engine: Box<dyn EngineBackend>,
    next_token: u64,
    terminating: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a context with the default (no-op) engine backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(Box::new(NullEngine))
    }

    /// Creates a context driving the given engine backend.
    #[must_use]
    pub fn with_engine(engine: Box<dyn EngineBackend>) -> Self {
        Self {
            error: ErrorState::new(),
            memory: MemoryLedger::new(),
            ios: HashMap::new(),
            jobs: HashMap::new(),
            responses: HashMap::new(),
            engine,
            next_token: 1,
            terminating: false,
        }
    }

    fn next_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        token
    }

    // ---- error state -----------------------------------------------------

    /// Returns true if an error is active on this context.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.has_error()
    }

    /// Returns the numeric code of the active error, or 0.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        self.error.code()
    }

    /// Raises an error on the context. See [`ErrorState::raise`].
    ///
    /// The optional file/line/function become the first call-stack frame.
    /// Returns false if an error is already active.
    pub fn raise_error(
        &mut self,
        code: i32,
        message: &str,
        file: Option<&str>,
        line: Option<i32>,
        function: Option<&str>,
    ) -> bool {
        if !self.error.raise(code, message) {
            return false;
        }
        if file.is_some() || line.is_some() || function.is_some() {
            self.error.add_frame(file, line, function);
        }
        true
    }

    /// Appends a frame to the active error. See [`ErrorState::add_frame`].
    pub fn add_to_callstack(
        &mut self,
        file: Option<&str>,
        line: Option<i32>,
        function: Option<&str>,
    ) -> bool {
        self.error.add_frame(file, line, function)
    }

    /// Clears the active error. The caller asserts it handled the error.
    pub fn clear_error(&mut self) {
        self.error.clear();
    }

    /// Writes the error report into `buffer`. See
    /// [`ErrorState::write_diagnostics`].
    pub fn error_and_stacktrace(&self, buffer: &mut [u8]) -> i64 {
        self.error.write_diagnostics(buffer)
    }

    /// Deposits a [`FlowError`] into the error slot if it is clear.
    ///
    /// Returns false when an earlier error already holds the slot.
    pub fn record_error(&mut self, error: &FlowError) -> bool {
        self.error.accumulate(error)
    }

    /// Prints the active error to stderr and exits the process.
    ///
    /// Diagnostic escape hatch for command-line callers only; never use it
    /// from a service. Returns false when no error is active (and is the
    /// only way it returns at all).
    pub fn print_and_exit_if_error(&self) -> bool {
        if !self.error.has_error() {
            return false;
        }
        eprintln!("{}", self.error.diagnostic_report());
        std::process::exit(self.error.code().clamp(1, 255));
    }

    // ---- memory ledger ---------------------------------------------------

    /// Allocates zeroed, context-owned memory. See [`MemoryLedger::allocate`].
    pub fn memory_allocate(
        &mut self,
        bytes: usize,
        file: Option<&str>,
        line: Option<i32>,
    ) -> Option<NonNull<u8>> {
        self.memory
            .allocate(bytes, AllocationSite::from_parts(file, line))
    }

    /// Frees a ledger allocation early. Returns false if `addr` is unknown.
    pub fn memory_free(&mut self, addr: usize) -> bool {
        self.memory.free(addr)
    }

    /// Read access to the ledger, for diagnostics.
    #[must_use]
    pub fn memory(&self) -> &MemoryLedger {
        &self.memory
    }

    // ---- io objects ------------------------------------------------------

    /// Creates a file-backed stream owned by this context.
    ///
    /// # Errors
    ///
    /// See [`IoObject::for_file`].
    pub fn create_io_for_file(
        &mut self,
        path: impl AsRef<Path>,
        mode: IoMode,
        cleanup: CleanupWith,
    ) -> Result<IoId, FlowError> {
        let io = IoObject::for_file(path, mode, cleanup)?;
        Ok(self.insert_io(io))
    }

    /// Creates a stream over a copy of the caller's buffer.
    ///
    /// # Errors
    ///
    /// See [`IoObject::from_buffer`].
    pub fn create_io_from_buffer(
        &mut self,
        bytes: &[u8],
        lifetime: Lifetime,
        cleanup: CleanupWith,
    ) -> Result<IoId, FlowError> {
        let io = IoObject::from_buffer(bytes, lifetime, cleanup)?;
        Ok(self.insert_io(io))
    }

    /// Creates a growable output sink owned by this context.
    pub fn create_io_for_output_buffer(&mut self) -> IoId {
        self.insert_io(IoObject::for_output_buffer())
    }

    /// Inserts a stream whose teardown flush fails, for teardown tests.
    #[cfg(test)]
    pub(crate) fn create_io_failing_sink(&mut self) -> IoId {
        self.insert_io(IoObject::for_failing_sink())
    }

    fn insert_io(&mut self, io: IoObject) -> IoId {
        let id = IoId(self.next_token());
        self.ios.insert(id, io);
        id
    }

    /// Returns the stream for a handle, if it is one of ours.
    #[must_use]
    pub fn io(&self, id: IoId) -> Option<&IoObject> {
        self.ios.get(&id)
    }

    /// Mutable access to a stream.
    #[must_use]
    pub fn io_mut(&mut self, id: IoId) -> Option<&mut IoObject> {
        self.ios.get_mut(&id)
    }

    /// Returns the current contents of an output sink.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` for a foreign handle, `InvalidArgument` if the stream
    /// is not an output sink.
    pub fn io_output_buffer(&self, id: IoId) -> Result<&[u8], FlowError> {
        let io = self
            .ios
            .get(&id)
            .ok_or_else(|| FlowError::ItemNotFound(format!("io handle {} is unknown", id.token())))?;
        io.output_buffer().ok_or_else(|| {
            FlowError::InvalidArgument(format!(
                "io handle {} is {}-backed, not an output buffer",
                id.token(),
                io.kind()
            ))
        })
    }

    // ---- jobs ------------------------------------------------------------

    /// Creates an empty job owned by this context.
    pub fn create_job(&mut self) -> JobId {
        let id = JobId(self.next_token());
        self.jobs.insert(id, Job::new());
        id
    }

    /// Returns a job by handle, if it is one of ours.
    #[must_use]
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    /// Binds a context-owned stream into a job under `io_id`.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the job or stream handle is foreign,
    /// `InvalidArgument` if `io_id` is already bound in the job.
    pub fn job_add_io(
        &mut self,
        job: JobId,
        io: IoId,
        io_id: i32,
        direction: Direction,
    ) -> Result<(), FlowError> {
        if !self.ios.contains_key(&io) {
            return Err(FlowError::ItemNotFound(format!(
                "io handle {} is unknown",
                io.token()
            )));
        }
        let job = self
            .jobs
            .get_mut(&job)
            .ok_or_else(|| FlowError::ItemNotFound(format!("job handle {} is unknown", job.token())))?;
        job.add_io(io_id, io, direction)
    }

    /// Resolves a job-local io id to the stream handle.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the job handle is foreign or the id is unbound.
    pub fn job_get_io(&self, job: JobId, io_id: i32) -> Result<IoId, FlowError> {
        let job = self
            .jobs
            .get(&job)
            .ok_or_else(|| FlowError::ItemNotFound(format!("job handle {} is unknown", job.token())))?;
        job.get_io(io_id)
            .map(|binding| binding.io)
            .ok_or_else(|| FlowError::ItemNotFound(format!("io_id {io_id} is not bound")))
    }

    /// Returns the output-sink contents bound under `io_id` in a job.
    ///
    /// # Errors
    ///
    /// As [`job_get_io`](Self::job_get_io) and
    /// [`io_output_buffer`](Self::io_output_buffer).
    pub fn job_output_buffer_by_id(&self, job: JobId, io_id: i32) -> Result<&[u8], FlowError> {
        let io = self.job_get_io(job, io_id)?;
        self.io_output_buffer(io)
    }

    /// Destroys a job, releasing its id bindings.
    ///
    /// The bound streams stay context-owned and usable.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the job handle is foreign.
    pub fn destroy_job(&mut self, job: JobId) -> Result<(), FlowError> {
        self.jobs
            .remove(&job)
            .map(|_| ())
            .ok_or_else(|| FlowError::ItemNotFound(format!("job handle {} is unknown", job.token())))
    }

    // ---- json commands ---------------------------------------------------

    /// Sends a JSON command to the context or one of its jobs.
    ///
    /// `method` and `payload` are borrowed for this call only. On success
    /// the response is stored in the context's arena and its handle
    /// returned; it stays valid until destroyed or until the context is.
    ///
    /// # Errors
    ///
    /// Routing and handler failures; see [`json::route`].
    pub fn send_json(
        &mut self,
        target: Target,
        method: &str,
        payload: &[u8],
    ) -> Result<ResponseId, FlowError> {
        let (kind, job) = match target {
            Target::Context => (TargetKind::Context, None),
            Target::Job(id) => {
                if !self.jobs.contains_key(&id) {
                    return Err(FlowError::ItemNotFound(format!(
                        "job handle {} is unknown",
                        id.token()
                    )));
                }
                (TargetKind::Job, Some(id))
            }
        };
        let mut scope = DispatchScope::new(&self.jobs, &mut self.ios, self.engine.as_mut(), job);
        let response = json::route(kind, method, &mut scope, payload)?;
        let id = ResponseId(self.next_token());
        self.responses.insert(id, response);
        Ok(id)
    }

    /// Returns a stored response, if the handle is one of ours.
    #[must_use]
    pub fn response(&self, id: ResponseId) -> Option<&JsonResponse> {
        self.responses.get(&id)
    }

    /// Destroys a response early. Returns false for a foreign handle.
    pub fn destroy_response(&mut self, id: ResponseId) -> bool {
        self.responses.remove(&id).is_some()
    }

    // ---- lifecycle -------------------------------------------------------

    /// Returns true once teardown has begun.
    #[must_use]
    pub fn is_terminating(&self) -> bool {
        self.terminating
    }

    /// Begins teardown, releasing everything the context owns.
    ///
    /// Error information stays intact and queryable so teardown problems can
    /// be diagnosed before the final destroy. Failures are collected into
    /// the error slot; later steps still run. Idempotent.
    ///
    /// Returns true if no error is active after teardown (including errors
    /// that predate it).
    pub fn begin_terminate(&mut self) -> bool {
        if self.terminating {
            return !self.error.has_error();
        }
        self.terminating = true;
        tracing::debug!(
            jobs = self.jobs.len(),
            ios = self.ios.len(),
            responses = self.responses.len(),
            live_allocations = self.memory.len(),
            "context teardown started"
        );

        // Jobs before streams: bindings must not outlive what they bind.
        self.jobs.clear();

        for (id, mut io) in self.ios.drain() {
            if let Err(error) = io.flush_for_teardown() {
                tracing::warn!(io = id.token(), error = %error, "io teardown failure collected");
                self.error.accumulate(&error);
            }
        }

        self.responses.clear();
        self.memory.release_all();

        !self.error.has_error()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.terminating {
            self.begin_terminate();
        }
    }
}
