//! Error taxonomy and the per-context error slot.
//!
//! Two layers live here:
//!
//! - [`FlowError`] is the ordinary Rust error type used with `?` inside the
//!   crate and by engine collaborators.
//! - [`ErrorState`] is the single-slot error record owned by a
//!   [`Context`](crate::context::Context). It is what foreign callers query
//!   through the boundary: one active error at a time, a bounded diagnostic
//!   call stack, and an explicit clear that asserts the caller handled it.
//!
//! The raise path never allocates. Messages and frames are copied into fixed
//! inline buffers, so an out-of-memory condition can still be reported.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of diagnostic call-stack frames per error.
///
/// Overflow is tolerated silently: further appends fail without disturbing
/// the frames already recorded.
pub const MAX_CALLSTACK_FRAMES: usize = 14;

/// Capacity of the inline error message buffer, in bytes.
const MESSAGE_CAPACITY: usize = 255;

/// Capacity of each inline frame text buffer (file path or function name).
const FRAME_TEXT_CAPACITY: usize = 127;

/// Stable numeric error codes exposed across the boundary.
///
/// The numeric values are a frozen contract with foreign callers and must
/// never be renumbered. Codes 1025 and above are reserved for caller-defined
/// errors and round-trip through [`ErrorCode::UserDefined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum ErrorCode {
    /// No error condition.
    NoError,
    /// Out of memory (allocation failed).
    OutOfMemory,
    /// I/O error.
    IoError,
    /// Invalid internal state (assertion failed; you found a bug).
    InternalError,
    /// Feature not implemented.
    NotImplemented,
    /// Invalid argument provided.
    InvalidArgument,
    /// Null argument provided.
    NullArgument,
    /// Invalid dimensions.
    InvalidDimensions,
    /// Unsupported pixel format.
    UnsupportedPixelFormat,
    /// Item does not exist.
    ItemNotFound,
    /// Image decoding failed.
    DecodeFailed,
    /// Image encoding failed.
    EncodeFailed,
    /// Graph invalid.
    GraphInvalid,
    /// Graph is cyclic.
    GraphCyclic,
    /// Invalid inputs to node.
    InvalidNodeInput,
    /// Maximum graph passes exceeded.
    GraphPassLimitExceeded,
    /// Other error; something else happened.
    Other,
    /// Caller-defined error code (1025 and above).
    UserDefined(i32),
}

impl ErrorCode {
    /// Returns the stable numeric value for this code.
    #[must_use]
    pub fn value(self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::OutOfMemory => 10,
            Self::IoError => 20,
            Self::InternalError => 30,
            Self::NotImplemented => 40,
            Self::InvalidArgument => 50,
            Self::NullArgument => 51,
            Self::InvalidDimensions => 52,
            Self::UnsupportedPixelFormat => 53,
            Self::ItemNotFound => 54,
            Self::DecodeFailed => 60,
            Self::EncodeFailed => 61,
            Self::GraphInvalid => 70,
            Self::GraphCyclic => 71,
            Self::InvalidNodeInput => 72,
            Self::GraphPassLimitExceeded => 73,
            Self::Other => 1024,
            Self::UserDefined(code) => code,
        }
    }

    /// Maps a numeric value back to a code.
    ///
    /// Values 1025 and above map to [`ErrorCode::UserDefined`]. Any other
    /// unrecognized value maps to [`ErrorCode::Other`], so a bogus code can
    /// never masquerade as a reserved one.
    #[must_use]
    pub fn from_value(value: i32) -> Self {
        match value {
            0 => Self::NoError,
            10 => Self::OutOfMemory,
            20 => Self::IoError,
            30 => Self::InternalError,
            40 => Self::NotImplemented,
            50 => Self::InvalidArgument,
            51 => Self::NullArgument,
            52 => Self::InvalidDimensions,
            53 => Self::UnsupportedPixelFormat,
            54 => Self::ItemNotFound,
            60 => Self::DecodeFailed,
            61 => Self::EncodeFailed,
            70 => Self::GraphInvalid,
            71 => Self::GraphCyclic,
            72 => Self::InvalidNodeInput,
            73 => Self::GraphPassLimitExceeded,
            1024 => Self::Other,
            code if code >= 1025 => Self::UserDefined(code),
            _ => Self::Other,
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.value()
    }
}

impl From<i32> for ErrorCode {
    fn from(value: i32) -> Self {
        Self::from_value(value)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoError => "no error",
            Self::OutOfMemory => "out of memory",
            Self::IoError => "I/O error",
            Self::InternalError => "internal error",
            Self::NotImplemented => "not implemented",
            Self::InvalidArgument => "invalid argument",
            Self::NullArgument => "null argument",
            Self::InvalidDimensions => "invalid dimensions",
            Self::UnsupportedPixelFormat => "unsupported pixel format",
            Self::ItemNotFound => "item not found",
            Self::DecodeFailed => "decode failed",
            Self::EncodeFailed => "encode failed",
            Self::GraphInvalid => "graph invalid",
            Self::GraphCyclic => "graph is cyclic",
            Self::InvalidNodeInput => "invalid node input",
            Self::GraphPassLimitExceeded => "graph pass limit exceeded",
            Self::Other => "other error",
            Self::UserDefined(_) => "user-defined error",
        };
        write!(f, "{name}")
    }
}

/// The main error type for lumaflow runtime operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// An allocation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(&'static str),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON payload or response could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A reserved or unfinished feature was requested.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// An argument failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A required argument was null or missing.
    #[error("null argument: {0}")]
    NullArgument(&'static str),

    /// A lookup by handle or id found nothing.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// The engine reported a decode failure.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// The engine reported an encode failure.
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// An error raised through the boundary with an explicit numeric code.
    #[error("{message}")]
    Raised {
        /// The numeric boundary code.
        code: i32,
        /// The caller-supplied message.
        message: String,
    },
}

impl FlowError {
    /// Returns the boundary error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::OutOfMemory(_) => ErrorCode::OutOfMemory,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::InvalidArgument,
            Self::NotImplemented(_) => ErrorCode::NotImplemented,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NullArgument(_) => ErrorCode::NullArgument,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::DecodeFailed(_) => ErrorCode::DecodeFailed,
            Self::EncodeFailed(_) => ErrorCode::EncodeFailed,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Raised { code, .. } => ErrorCode::from_value(*code),
        }
    }
}

/// Fixed-capacity inline string storage.
///
/// Truncates on overflow at a character boundary. Used for error messages
/// and frame text so the raise path never touches the heap.
#[derive(Clone, Copy)]
struct InlineStr<const N: usize> {
    buf: [u8; N],
    len: u8,
}

impl<const N: usize> InlineStr<N> {
    fn empty() -> Self {
        Self { buf: [0; N], len: 0 }
    }

    fn truncated_from(s: &str) -> Self {
        let mut end = s.len().min(N);
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut buf = [0u8; N];
        buf[..end].copy_from_slice(&s.as_bytes()[..end]);
        // N never exceeds u8::MAX for the capacities used here.
        let len = u8::try_from(end).unwrap_or(u8::MAX);
        Self { buf, len }
    }

    fn as_str(&self) -> &str {
        // Only ever filled from a &str at a char boundary.
        std::str::from_utf8(&self.buf[..usize::from(self.len)]).unwrap_or("")
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> fmt::Debug for InlineStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// One diagnostic call-stack frame attached to an active error.
///
/// Every field is optional; a frame with nothing set still counts against
/// [`MAX_CALLSTACK_FRAMES`].
#[derive(Debug, Clone, Copy)]
pub struct CallFrame {
    file: InlineStr<FRAME_TEXT_CAPACITY>,
    function: InlineStr<FRAME_TEXT_CAPACITY>,
    line: Option<i32>,
}

impl CallFrame {
    fn new(file: Option<&str>, line: Option<i32>, function: Option<&str>) -> Self {
        Self {
            file: file.map_or_else(InlineStr::empty, InlineStr::truncated_from),
            function: function.map_or_else(InlineStr::empty, InlineStr::truncated_from),
            line,
        }
    }

    /// Returns the recorded file path, if any.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        (!self.file.is_empty()).then(|| self.file.as_str())
    }

    /// Returns the recorded function name, if any.
    #[must_use]
    pub fn function(&self) -> Option<&str> {
        (!self.function.is_empty()).then(|| self.function.as_str())
    }

    /// Returns the recorded line number, if any.
    #[must_use]
    pub fn line(&self) -> Option<i32> {
        self.line
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file() {
            Some(file) => write!(f, "{file}")?,
            None => write!(f, "<unknown>")?,
        }
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        if let Some(function) = self.function() {
            write!(f, ": in {function}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct ErrorRecord {
    code: ErrorCode,
    message: InlineStr<MESSAGE_CAPACITY>,
    frames: [CallFrame; MAX_CALLSTACK_FRAMES],
    frame_count: usize,
}

/// Single-slot error record with a bounded diagnostic call stack.
///
/// State machine: `Clear → (raise) → Active → (clear) → Clear`. A second
/// raise while active is rejected and leaves the original error untouched;
/// frame appends are only valid while active and under capacity.
#[derive(Debug, Default)]
pub struct ErrorState {
    slot: Option<ErrorRecord>,
}

impl ErrorState {
    /// Creates a clear error state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an error is active.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.slot.is_some()
    }

    /// Returns the numeric code of the active error, or 0 when clear.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.slot.as_ref().map_or(0, |record| record.code.value())
    }

    /// Returns the message of the active error, or `None` when clear.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.slot.as_ref().map(|record| record.message.as_str())
    }

    /// Returns the recorded frames of the active error.
    #[must_use]
    pub fn frames(&self) -> &[CallFrame] {
        self.slot
            .as_ref()
            .map_or(&[][..], |record| &record.frames[..record.frame_count])
    }

    /// Raises an error, transitioning `Clear → Active`.
    ///
    /// Returns false (and changes nothing) if an error is already active.
    /// A code of 0 is substituted with [`ErrorCode::Other`]: an error was
    /// raised, so "no error" is not an acceptable description of it.
    ///
    /// Copies `message` into fixed inline storage; performs no allocation,
    /// so it stays usable while recovering from out-of-memory.
    pub fn raise(&mut self, code: i32, message: &str) -> bool {
        if self.slot.is_some() {
            return false;
        }
        let code = match ErrorCode::from_value(code) {
            ErrorCode::NoError => ErrorCode::Other,
            other => other,
        };
        self.slot = Some(ErrorRecord {
            code,
            message: InlineStr::truncated_from(message),
            frames: [CallFrame::new(None, None, None); MAX_CALLSTACK_FRAMES],
            frame_count: 0,
        });
        true
    }

    /// Appends a diagnostic frame to the active error.
    ///
    /// Fails (returns false) when no error is active or the frame capacity
    /// is exhausted. Capacity overflow is a soft failure: already-recorded
    /// frames are never disturbed.
    pub fn add_frame(
        &mut self,
        file: Option<&str>,
        line: Option<i32>,
        function: Option<&str>,
    ) -> bool {
        let Some(record) = self.slot.as_mut() else {
            return false;
        };
        if record.frame_count >= MAX_CALLSTACK_FRAMES {
            return false;
        }
        record.frames[record.frame_count] = CallFrame::new(file, line, function);
        record.frame_count += 1;
        true
    }

    /// Clears the active error, transitioning `Active → Clear`.
    ///
    /// The caller asserts responsibility for having handled the error.
    /// Clearing an already-clear state is a no-op.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Deposits a [`FlowError`] into the slot if it is clear.
    ///
    /// Used during teardown, where failures are collected rather than
    /// surfaced: the first failure wins the slot, later ones are logged and
    /// dropped. Returns true if the error took the slot.
    pub fn accumulate(&mut self, error: &FlowError) -> bool {
        if self.slot.is_some() {
            tracing::debug!(error = %error, "error slot occupied; dropping collected error");
            return false;
        }
        self.raise(error.code().value(), &error.to_string())
    }

    /// Writes the active error and its call stack into `buffer` as UTF-8.
    ///
    /// Returns the number of bytes written (excluding the terminating NUL),
    /// or -1 if the buffer is empty or too small for the full report plus
    /// the NUL. A NUL terminator is always written on success.
    pub fn write_diagnostics(&self, buffer: &mut [u8]) -> i64 {
        let report = self.diagnostic_report();
        let bytes = report.as_bytes();
        if buffer.len() <= bytes.len() {
            return -1;
        }
        buffer[..bytes.len()].copy_from_slice(bytes);
        buffer[bytes.len()] = 0;
        bytes.len() as i64
    }

    /// Renders the active error and call stack as a multi-line report.
    #[must_use]
    pub fn diagnostic_report(&self) -> String {
        use std::fmt::Write as _;

        let Some(record) = self.slot.as_ref() else {
            return String::from("no error");
        };
        let mut report = format!(
            "Error {}: {}",
            record.code.value(),
            record.message.as_str()
        );
        for frame in &record.frames[..record.frame_count] {
            let _ = write!(report, "\n  at {frame}");
        }
        report
    }
}
