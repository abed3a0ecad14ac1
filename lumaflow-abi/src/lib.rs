//! C bindings for the lumaflow runtime library.
//!
//! This crate exposes the runtime's context/job/io/JSON surface to foreign
//! callers as a stable, opaque-handle C interface. The core crate stays
//! entirely safe; every `unsafe` obligation of the boundary lives here.
//!
//! # Handle model
//!
//! `lumaflow_context_create` returns a boxed [`Context`] pointer; every
//! other handle (io, job, response) is an opaque non-zero token minted by
//! that context and transported as a pointer-sized value. Tokens are
//! validated against the owning context's arenas on every call; a stale,
//! foreign, or mismatched handle is rejected through the error-state path,
//! never dereferenced.
//!
//! # Caller obligations
//!
//! - A context is not thread-safe. The caller serializes every call that
//!   touches one context, including calls through its jobs and streams.
//! - The context pointer itself must be valid: passing a dangling or
//!   foreign pointer is undefined behavior. Null context pointers are
//!   tolerated and return the sentinel failure value.
//! - Strings are NUL-terminated UTF-8; JSON payloads and returned buffers
//!   are pointer + length, not NUL-terminated.
//! - Borrowed-out pointers (response bodies, output buffers) die with the
//!   object that owns them: the response, the io object, or the context,
//!   whichever is destroyed first.

use lumaflow::context::{Context, IoId, JobId, ResponseId, Target};
use lumaflow::io::{CleanupWith, Direction, IoMode, Lifetime};
use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::slice;

/// Reborrows the context pointer, or returns `None` for null.
///
/// # Safety
///
/// `context` must be null or a pointer previously returned by
/// [`lumaflow_context_create`] and not yet destroyed.
unsafe fn borrow_context<'a>(context: *mut c_void) -> Option<&'a mut Context> {
    context.cast::<Context>().as_mut()
}

/// Converts an optional NUL-terminated UTF-8 string.
///
/// Invalid UTF-8 is treated the same as absent rather than trusted.
///
/// # Safety
///
/// `ptr` must be null or a valid NUL-terminated string.
unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Converts a pointer + length pair into a byte slice; null means empty.
///
/// # Safety
///
/// `ptr` must be null or valid for `len` bytes.
unsafe fn borrow_bytes<'a>(ptr: *const u8, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return (len == 0).then_some(&[][..]);
    }
    Some(slice::from_raw_parts(ptr, len))
}

fn token_to_ptr(token: u64) -> *mut c_void {
    token as usize as *mut c_void
}

fn ptr_to_token(ptr: *const c_void) -> u64 {
    ptr as usize as u64
}

fn line_arg(line: i32) -> Option<i32> {
    (line >= 0).then_some(line)
}

/// Creates and returns a lumaflow context, the root object required by
/// every other call.
///
/// A context tracks error state and messages, diagnostic stack traces,
/// context-managed memory, and every io object, job, and JSON response
/// created under it.
///
/// **Contexts are not thread-safe.** The caller is responsible for ensuring
/// a context is never involved in two overlapping calls.
///
/// Returns null on failure; there is no context to query for details in
/// that case.
#[no_mangle]
pub extern "C" fn lumaflow_context_create() -> *mut c_void {
    catch_unwind(|| Box::into_raw(Box::new(Context::new())).cast::<c_void>())
        .unwrap_or(ptr::null_mut())
}

/// Begins tearing the context down while leaving error information intact,
/// so teardown problems can still be inspected with
/// [`lumaflow_context_error_and_stacktrace`].
///
/// Returns true if no error is active after teardown.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_begin_terminate(context: *mut c_void) -> bool {
    match borrow_context(context) {
        Some(ctx) => ctx.begin_terminate(),
        None => false,
    }
}

/// Destroys the context and frees it. Only use with pointers from
/// [`lumaflow_context_create`].
///
/// Returns true if teardown was error-free. Null is tolerated and returns
/// true.
///
/// # Safety
///
/// `context` must be null or a live context pointer; it is invalid after
/// this call.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_destroy(context: *mut c_void) -> bool {
    if context.is_null() {
        return true;
    }
    let mut ctx = Box::from_raw(context.cast::<Context>());
    let clean = ctx.begin_terminate();
    drop(ctx);
    clean
}

/// Returns true if the context is in an error state. Deal with the error
/// immediately: subsequent calls fail until it is cleared.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_has_error(context: *mut c_void) -> bool {
    borrow_context(context).is_some_and(|ctx| ctx.has_error())
}

/// Clears the error state. Only call this after accounting for all the
/// inconsistent state the failed call may have left behind.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_clear_error(context: *mut c_void) {
    if let Some(ctx) = borrow_context(context) {
        ctx.clear_error();
    }
}

/// Returns the numeric code of the active error, or 0 when none is active.
///
/// See the crate documentation for the stable code taxonomy (10 OOM, 20
/// I/O, 30 internal, 40 not implemented, 50–54 argument/lookup, 60/61
/// codec, 70–73 graph, 1024 other, 1025+ caller-defined).
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_error_code(context: *mut c_void) -> i32 {
    borrow_context(context).map_or(0, |ctx| ctx.error_code())
}

/// Writes the error message and stack trace into `buffer` as UTF-8 and
/// NUL-terminates it.
///
/// Returns the number of bytes written (excluding the NUL), or -1 if
/// `buffer` is null or `buffer_length` is too small. Be accurate with the
/// length or the write runs off the end of your allocation.
///
/// # Safety
///
/// `context` must be null or a live context pointer; `buffer` must be null
/// or valid for `buffer_length` bytes.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_error_and_stacktrace(
    context: *mut c_void,
    buffer: *mut c_char,
    buffer_length: usize,
) -> i64 {
    let Some(ctx) = borrow_context(context) else {
        return -1;
    };
    if buffer.is_null() {
        return -1;
    }
    let buffer = slice::from_raw_parts_mut(buffer.cast::<u8>(), buffer_length);
    ctx.error_and_stacktrace(buffer)
}

/// Prints the error to stderr and exits the process if an error is active;
/// returns false otherwise.
///
/// THIS PRINTS DIRECTLY TO STDERR AND EXITS. Command-line usage only; never
/// call it from a service.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_print_and_exit_if_error(context: *mut c_void) -> bool {
    borrow_context(context).is_some_and(|ctx| ctx.print_and_exit_if_error())
}

/// Raises an error on the context.
///
/// Returns true on success, false if an error is already active (the call
/// is ignored, as are subsequent
/// [`lumaflow_context_add_to_callstack`] calls, until the first error is
/// cleared). An error code of 0 is replaced with 1024.
///
/// Safe(ish) in out-of-memory scenarios: the message is copied into fixed
/// preallocated storage, so no allocation happens here. `message`,
/// `filename`, and `function_name` are only borrowed for the duration of
/// this call.
///
/// # Safety
///
/// `context` must be null or a live context pointer; the three string
/// arguments must each be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_raise_error(
    context: *mut c_void,
    error_code: i32,
    message: *const c_char,
    filename: *const c_char,
    line: i32,
    function_name: *const c_char,
) -> bool {
    let Some(ctx) = borrow_context(context) else {
        return false;
    };
    let message = borrow_str(message).unwrap_or("");
    ctx.raise_error(
        error_code,
        message,
        borrow_str(filename),
        line_arg(line),
        borrow_str(function_name),
    )
}

/// Appends a file/line/function frame to the active error's call stack.
///
/// Fails and returns false if no error has been raised, or if the stack is
/// at capacity (14 frames); the latter is an acceptable soft failure that
/// leaves recorded frames intact. Strings are borrowed for this call only.
///
/// # Safety
///
/// `context` must be null or a live context pointer; `filename` and
/// `function_name` must each be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_add_to_callstack(
    context: *mut c_void,
    filename: *const c_char,
    line: i32,
    function_name: *const c_char,
) -> bool {
    let Some(ctx) = borrow_context(context) else {
        return false;
    };
    ctx.add_to_callstack(borrow_str(filename), line_arg(line), borrow_str(function_name))
}

unsafe fn send_json_inner(
    context: *mut c_void,
    target: *mut c_void,
    to_job: bool,
    method: *const c_char,
    json_buffer: *const u8,
    json_buffer_size: usize,
) -> *const c_void {
    let Some(ctx) = borrow_context(context) else {
        return ptr::null();
    };
    let Some(method) = borrow_str(method) else {
        ctx.record_error(&lumaflow::errors::FlowError::NullArgument("method"));
        return ptr::null();
    };
    let Some(payload) = borrow_bytes(json_buffer, json_buffer_size) else {
        ctx.record_error(&lumaflow::errors::FlowError::NullArgument("json_buffer"));
        return ptr::null();
    };
    let target = if to_job {
        match JobId::from_token(ptr_to_token(target)) {
            Some(job) => Target::Job(job),
            None => {
                ctx.record_error(&lumaflow::errors::FlowError::NullArgument("job"));
                return ptr::null();
            }
        }
    } else {
        Target::Context
    };
    match ctx.send_json(target, method, payload) {
        Ok(response) => token_to_ptr(response.token()),
        Err(error) => {
            ctx.record_error(&error);
            ptr::null()
        }
    }
}

/// Sends a JSON command to the context.
///
/// `method` selects the code path that processes `json_buffer` and composes
/// a response. Both are borrowed for the duration of the call; static
/// strings are handy for `method`. `json_buffer` is UTF-8 JSON of
/// `json_buffer_size` bytes, not NUL-terminated.
///
/// Returns an opaque response handle, or null on failure; consult the
/// standard error methods for details. Release the response with
/// [`lumaflow_json_response_destroy`] (or let the context do it).
///
/// # Safety
///
/// `context` must be null or a live context pointer; `method` null or a
/// valid NUL-terminated string; `json_buffer` null or valid for
/// `json_buffer_size` bytes.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_send_json(
    context: *mut c_void,
    method: *const c_char,
    json_buffer: *const u8,
    json_buffer_size: usize,
) -> *const c_void {
    send_json_inner(context, ptr::null_mut(), false, method, json_buffer, json_buffer_size)
}

/// Sends a JSON command to a job owned by the context.
///
/// Same contract as [`lumaflow_context_send_json`], addressed to `job`.
///
/// # Safety
///
/// As [`lumaflow_context_send_json`]; `job` must be a handle minted by this
/// context.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_job_send_json(
    context: *mut c_void,
    job: *mut c_void,
    method: *const c_char,
    json_buffer: *const u8,
    json_buffer_size: usize,
) -> *const c_void {
    send_json_inner(context, job, true, method, json_buffer, json_buffer_size)
}

/// Reads fields from a JSON response into the provided locations.
///
/// The buffer written to `buffer_utf8_no_nulls_out` is UTF-8 of the length
/// written to `buffer_size_out`, not NUL-terminated, and becomes invalid
/// when the response or the context is destroyed. Output pointers may be
/// null to skip a field.
///
/// # Safety
///
/// `context` must be null or a live context pointer; each output pointer
/// must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_json_response_read(
    context: *mut c_void,
    response_in: *const c_void,
    status_code_out: *mut i64,
    buffer_utf8_no_nulls_out: *mut *const u8,
    buffer_size_out: *mut usize,
) -> bool {
    let Some(ctx) = borrow_context(context) else {
        return false;
    };
    // Copy the view out as raw parts so the arena borrow ends before any
    // error-state write.
    let view = ResponseId::from_token(ptr_to_token(response_in))
        .and_then(|id| ctx.response(id))
        .map(|response| (response.status(), response.body().as_ptr(), response.body().len()));
    let Some((status, body, body_len)) = view else {
        ctx.record_error(&lumaflow::errors::FlowError::ItemNotFound(
            "response handle is unknown".into(),
        ));
        return false;
    };
    if !status_code_out.is_null() {
        *status_code_out = status;
    }
    if !buffer_utf8_no_nulls_out.is_null() {
        *buffer_utf8_no_nulls_out = body;
    }
    if !buffer_size_out.is_null() {
        *buffer_size_out = body_len;
    }
    true
}

/// Frees the memory held by a JSON response early.
///
/// Returns true if `response` is null or was released; false (with the
/// reason in the error state) if the handle is unknown to this context.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_json_response_destroy(
    context: *mut c_void,
    response: *mut c_void,
) -> bool {
    let Some(ctx) = borrow_context(context) else {
        return false;
    };
    let Some(id) = ResponseId::from_token(ptr_to_token(response)) else {
        return true;
    };
    if ctx.destroy_response(id) {
        return true;
    }
    ctx.record_error(&lumaflow::errors::FlowError::ItemNotFound(
        "response handle is unknown".into(),
    ));
    false
}

/// Creates an io object wrapping a file path.
///
/// `filename` must be NUL-terminated and usable with the host's native file
/// open. `mode` is advisory beyond the open flags it selects; `cleanup`
/// must be 0 (with-context); 1 (with-first-job) is reserved.
///
/// Returns an opaque io handle, or null with the reason in the error state.
///
/// # Safety
///
/// `context` must be null or a live context pointer; `filename` null or a
/// valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_io_create_for_file(
    context: *mut c_void,
    mode: i32,
    filename: *const c_char,
    cleanup: i32,
) -> *mut c_void {
    let Some(ctx) = borrow_context(context) else {
        return ptr::null_mut();
    };
    let Some(path) = borrow_str(filename) else {
        ctx.record_error(&lumaflow::errors::FlowError::NullArgument("filename"));
        return ptr::null_mut();
    };
    let (Some(mode), Some(cleanup)) = (IoMode::from_value(mode), CleanupWith::from_value(cleanup))
    else {
        ctx.record_error(&lumaflow::errors::FlowError::InvalidArgument(
            "unrecognized io mode or cleanup value".into(),
        ));
        return ptr::null_mut();
    };
    match ctx.create_io_for_file(path, mode, cleanup) {
        Ok(io) => token_to_ptr(io.token()),
        Err(error) => {
            ctx.record_error(&error);
            ptr::null_mut()
        }
    }
}

/// Creates an io object reading from the provided buffer.
///
/// The bytes are copied during this call for either lifetime value, so the
/// caller may free `buffer` as soon as it returns; see the core library's
/// `Lifetime` documentation for the copy-over-borrow decision.
///
/// # Safety
///
/// `context` must be null or a live context pointer; `buffer` null or valid
/// for `buffer_byte_count` bytes.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_io_create_from_buffer(
    context: *mut c_void,
    buffer: *const u8,
    buffer_byte_count: usize,
    lifetime: i32,
    cleanup: i32,
) -> *mut c_void {
    let Some(ctx) = borrow_context(context) else {
        return ptr::null_mut();
    };
    let Some(bytes) = borrow_bytes(buffer, buffer_byte_count) else {
        ctx.record_error(&lumaflow::errors::FlowError::NullArgument("buffer"));
        return ptr::null_mut();
    };
    let (Some(lifetime), Some(cleanup)) =
        (Lifetime::from_value(lifetime), CleanupWith::from_value(cleanup))
    else {
        ctx.record_error(&lumaflow::errors::FlowError::InvalidArgument(
            "unrecognized lifetime or cleanup value".into(),
        ));
        return ptr::null_mut();
    };
    match ctx.create_io_from_buffer(bytes, lifetime, cleanup) {
        Ok(io) => token_to_ptr(io.token()),
        Err(error) => {
            ctx.record_error(&error);
            ptr::null_mut()
        }
    }
}

/// Creates an io object writing to an expanding memory buffer.
///
/// The io object and its buffer are freed with the context.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_io_create_for_output_buffer(context: *mut c_void) -> *mut c_void {
    match borrow_context(context) {
        Some(ctx) => token_to_ptr(ctx.create_io_for_output_buffer().token()),
        None => ptr::null_mut(),
    }
}

unsafe fn write_buffer_view(
    buffer: (*const u8, usize),
    result_buffer: *mut *const u8,
    result_buffer_length: *mut usize,
) {
    if !result_buffer.is_null() {
        *result_buffer = buffer.0;
    }
    if !result_buffer_length.is_null() {
        *result_buffer_length = buffer.1;
    }
}

/// Provides access to an output io object's underlying buffer.
///
/// The view stays valid until the io object is written to again or the
/// context is destroyed. Ensure your length variable holds 64 bits.
///
/// # Safety
///
/// `context` must be null or a live context pointer; output pointers must
/// be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_io_get_output_buffer(
    context: *mut c_void,
    io: *mut c_void,
    result_buffer: *mut *const u8,
    result_buffer_length: *mut usize,
) -> bool {
    let Some(ctx) = borrow_context(context) else {
        return false;
    };
    let Some(id) = IoId::from_token(ptr_to_token(io)) else {
        ctx.record_error(&lumaflow::errors::FlowError::NullArgument("io"));
        return false;
    };
    let view = ctx
        .io_output_buffer(id)
        .map(|buffer| (buffer.as_ptr(), buffer.len()));
    match view {
        Ok(buffer) => {
            write_buffer_view(buffer, result_buffer, result_buffer_length);
            true
        }
        Err(error) => {
            ctx.record_error(&error);
            false
        }
    }
}

/// Provides access to the output buffer bound under `io_id` in a job.
///
/// Same view contract as [`lumaflow_io_get_output_buffer`].
///
/// # Safety
///
/// As [`lumaflow_io_get_output_buffer`]; `job` must be a handle minted by
/// this context.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_job_get_output_buffer_by_id(
    context: *mut c_void,
    job: *mut c_void,
    io_id: i32,
    result_buffer: *mut *const u8,
    result_buffer_length: *mut usize,
) -> bool {
    let Some(ctx) = borrow_context(context) else {
        return false;
    };
    let Some(id) = JobId::from_token(ptr_to_token(job)) else {
        ctx.record_error(&lumaflow::errors::FlowError::NullArgument("job"));
        return false;
    };
    let view = ctx
        .job_output_buffer_by_id(id, io_id)
        .map(|buffer| (buffer.as_ptr(), buffer.len()));
    match view {
        Ok(buffer) => {
            write_buffer_view(buffer, result_buffer, result_buffer_length);
            true
        }
        Err(error) => {
            ctx.record_error(&error);
            false
        }
    }
}

/// Creates a job: a sub-context that associates io objects with numeric
/// identifiers for one processing run.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_job_create(context: *mut c_void) -> *mut c_void {
    match borrow_context(context) {
        Some(ctx) => token_to_ptr(ctx.create_job().token()),
        None => ptr::null_mut(),
    }
}

/// Looks up the io handle bound under `io_id` in a job.
///
/// Returns null with the reason in the error state if the job handle is
/// foreign or the id is unbound.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_job_get_io(
    context: *mut c_void,
    job: *mut c_void,
    io_id: i32,
) -> *mut c_void {
    let Some(ctx) = borrow_context(context) else {
        return ptr::null_mut();
    };
    let Some(id) = JobId::from_token(ptr_to_token(job)) else {
        ctx.record_error(&lumaflow::errors::FlowError::NullArgument("job"));
        return ptr::null_mut();
    };
    match ctx.job_get_io(id, io_id) {
        Ok(io) => token_to_ptr(io.token()),
        Err(error) => {
            ctx.record_error(&error);
            ptr::null_mut()
        }
    }
}

/// Associates an io object with a job under `io_id`.
///
/// The id will correspond to the io_id in the operation graph. `direction`
/// is 4 (in) or 8 (out). Fails if the id is already bound in this job.
///
/// # Safety
///
/// `context` must be null or a live context pointer; `job` and `io` must be
/// handles minted by this context.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_job_add_io(
    context: *mut c_void,
    job: *mut c_void,
    io: *mut c_void,
    io_id: i32,
    direction: i32,
) -> bool {
    let Some(ctx) = borrow_context(context) else {
        return false;
    };
    let (Some(job), Some(io)) = (
        JobId::from_token(ptr_to_token(job)),
        IoId::from_token(ptr_to_token(io)),
    ) else {
        ctx.record_error(&lumaflow::errors::FlowError::NullArgument("job or io"));
        return false;
    };
    let Some(direction) = Direction::from_value(direction) else {
        ctx.record_error(&lumaflow::errors::FlowError::InvalidArgument(
            "direction must be 4 (in) or 8 (out)".into(),
        ));
        return false;
    };
    match ctx.job_add_io(job, io, io_id, direction) {
        Ok(()) => true,
        Err(error) => {
            ctx.record_error(&error);
            false
        }
    }
}

/// Destroys a job, releasing its io bindings.
///
/// The io objects stay owned by the context and remain usable.
///
/// # Safety
///
/// `context` must be null or a live context pointer.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_job_destroy(context: *mut c_void, job: *mut c_void) -> bool {
    let Some(ctx) = borrow_context(context) else {
        return false;
    };
    let Some(id) = JobId::from_token(ptr_to_token(job)) else {
        return true;
    };
    match ctx.destroy_job(id) {
        Ok(()) => true,
        Err(error) => {
            ctx.record_error(&error);
            false
        }
    }
}

/// Allocates zeroed memory that will be freed with the context.
///
/// `filename`/`line` are optional debugging aids; pass null/-1 to skip.
/// Returns null on failure (including zero-byte requests).
///
/// # Safety
///
/// `context` must be null or a live context pointer; `filename` null or a
/// valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_memory_allocate(
    context: *mut c_void,
    bytes: usize,
    filename: *const c_char,
    line: i32,
) -> *mut c_void {
    let Some(ctx) = borrow_context(context) else {
        return ptr::null_mut();
    };
    let allocated = catch_unwind(AssertUnwindSafe(|| {
        ctx.memory_allocate(bytes, borrow_str(filename), line_arg(line))
    }));
    match allocated {
        Ok(Some(ptr)) => ptr.as_ptr().cast::<c_void>(),
        Ok(None) | Err(_) => ptr::null_mut(),
    }
}

/// Frees memory allocated with [`lumaflow_context_memory_allocate`] ahead
/// of context teardown.
///
/// `filename`/`line` are optional debugging aids. Returns false if the
/// pointer is unknown to this context's ledger.
///
/// # Safety
///
/// `context` must be null or a live context pointer; `pointer` must have
/// come from this context's allocator and not been freed already.
#[no_mangle]
pub unsafe extern "C" fn lumaflow_context_memory_free(
    context: *mut c_void,
    pointer: *mut c_void,
    filename: *const c_char,
    line: i32,
) -> bool {
    let _ = (filename, line); // advisory, currently unused on the free path
    match borrow_context(context) {
        Some(ctx) => ctx.memory_free(pointer as usize),
        None => false,
    }
}
