// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Endpoint URI construction from a resolved source.

use std::net::Ipv6Addr;

use ippscope_core::AppConfig;
use ippscope_core::error::{IppScopeError, Result};
use ippscope_core::types::SourceRecord;

/// Build `{scheme}://{host}:{port}{resource}` for a source.
///
/// The host's trailing dot is dropped and IPv6 literals are bracketed.
pub fn build_endpoint(config: &AppConfig, source: &SourceRecord) -> Result<String> {
    let host = source.host.strip_suffix('.').unwrap_or(&source.host);

    if host.is_empty() {
        return Err(IppScopeError::InvalidEndpoint("empty host name".into()));
    }
    if source.port == 0 {
        return Err(IppScopeError::InvalidEndpoint(format!("{host}: port 0")));
    }

    let host = if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{host}]")
    } else if host
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '@' | '?' | '#' | '[' | ']'))
    {
        return Err(IppScopeError::InvalidEndpoint(format!(
            "'{host}' is not a usable host name"
        )));
    } else {
        host.to_string()
    };

    Ok(format!(
        "{}://{}:{}{}",
        config.uri_scheme, host, source.port, config.system_resource
    ))
}
