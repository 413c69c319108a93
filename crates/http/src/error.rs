// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds for the control-service HTTP client, per spec.md §4.2 / §7.

use thiserror::Error;

/// Transport-level outcome of a retried call.
///
/// Matches the "replace exceptions with a result-variant carrying either a
/// response or a typed error kind" redesign note: callers branch on kind
/// rather than catching.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The service rejected our credentials (401/403). Callers must treat
    /// this as fatal: journal `invalid-creds`/`invalid-config`, print, exit.
    #[error("authentication rejected by control service (status {status})")]
    FatalAuth { status: u16 },

    /// All retry attempts were spent without a successful response.
    #[error("transport exhausted after {attempts} attempt(s): {last_error}")]
    TransportExhausted { attempts: u32, last_error: String },

    /// The response body could not be decoded as the expected JSON shape.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] reqwest::Error),
}
