//! JSON command envelope and context-owned responses.
//!
//! Callers invoke engine operations by sending a (method, payload) pair
//! rather than through a widening binary ABI. The dispatcher routes the
//! method to a handler and stores the resulting [`JsonResponse`] in the
//! context's arena; the caller reads it back as a status code plus a
//! borrowed, non-NUL-terminated UTF-8 byte view.

mod dispatch;

pub use dispatch::{route, DispatchScope, TargetKind};

use crate::errors::FlowError;
use serde::Serialize;
use std::borrow::Cow;

/// Status code for a successful command.
pub const STATUS_OK: i64 = 200;
/// Status code for a command that failed inside the engine.
pub const STATUS_ERROR: i64 = 500;

/// Pre-serialized body for the out-of-memory response.
///
/// Kept static so reporting an allocation failure never requires a fresh
/// allocation for the report itself.
static OOM_BODY: &[u8] =
    br#"{"code":10,"success":false,"message":"out of memory","data":null}"#;

#[derive(Debug, Serialize)]
struct ResponseEnvelope<'a> {
    code: i64,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    data: serde_json::Value,
}

/// An opaque, context-owned JSON response.
///
/// Valid until explicitly destroyed or until the owning context is
/// destroyed, whichever comes first.
#[derive(Debug)]
pub struct JsonResponse {
    status: i64,
    body: Cow<'static, [u8]>,
}

impl JsonResponse {
    /// Wraps a successful handler result in the standard envelope.
    ///
    /// # Errors
    ///
    /// `Json` if the envelope cannot be serialized.
    pub fn ok(data: serde_json::Value) -> Result<Self, FlowError> {
        let body = serde_json::to_vec(&ResponseEnvelope {
            code: STATUS_OK,
            success: true,
            message: None,
            data,
        })?;
        Ok(Self {
            status: STATUS_OK,
            body: Cow::Owned(body),
        })
    }

    /// The degraded-mode response for out-of-memory conditions.
    ///
    /// Uses only static storage; see [`OOM_BODY`].
    #[must_use]
    pub fn out_of_memory() -> Self {
        Self {
            status: STATUS_ERROR,
            body: Cow::Borrowed(OOM_BODY),
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> i64 {
        self.status
    }

    /// Returns the UTF-8 body bytes (not NUL-terminated).
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
