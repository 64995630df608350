// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for ippscope.

use thiserror::Error;

/// Top-level error type for all ippscope operations.
#[derive(Debug, Error)]
pub enum IppScopeError {
    // -- Discovery --
    #[error("service discovery failed: {0}")]
    Discovery(String),

    #[error("could not resolve service instance: {0}")]
    Resolve(String),

    // -- Attribute fetch --
    #[error("IPP request failed: {0}")]
    IppRequest(String),

    #[error(
        "printer-name and printer-uri-supported disagree: {names} names, {uris} URIs"
    )]
    ProtocolMismatch { names: usize, uris: usize },

    #[error("cannot build endpoint URI: {0}")]
    InvalidEndpoint(String),

    // -- Object model invariants --
    #[error("system '{0}' already exists")]
    DuplicateId(String),

    #[error("no system named '{0}'")]
    UnknownSystem(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IppScopeError>;
