// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Attribute fetch gateway adapter.
//
// Fetching is split in three so that the object model is only ever touched
// by the reducer:
//   - `plan` decides, against the model, whether a fetch is needed;
//   - `execute` performs the network calls with no access to the model;
//   - `apply` folds the outcome back into the model.
//
// Every gateway failure is turned into "unset" plus a human-readable reason
// here.  Nothing past this module sees a fetch error.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use ippscope_core::error::{IppScopeError, Result};
use ippscope_core::human_errors::humanize_error;
use ippscope_core::types::{ChildDescriptor, Incarnation, ObjectKind, SystemId};

use crate::model::{ObjectModel, PrinterObject, SystemObject};
use crate::presentation::TreeSink;

/// The attribute-fetch and enumeration collaborator.
#[async_trait]
pub trait AttributeGateway: Send + Sync {
    /// Rendered attribute text for the object at `uri`.
    async fn fetch_attributes(&self, kind: ObjectKind, uri: &str) -> Result<String>;

    /// Printers hosted by the system at `uri`.
    async fn enumerate_children(&self, uri: &str) -> Result<Vec<ChildDescriptor>>;
}

/// A fetch the reducer has decided to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub system: SystemId,
    pub incarnation: Incarnation,
    /// Where to send the requests. The system endpoint on the first attempt,
    /// the newly resolved source's URI on a retry.
    pub uri: String,
    pub attributes: bool,
    pub children: bool,
}

/// What came back from a fetch. `None` means the call was not requested.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub system: SystemId,
    pub incarnation: Incarnation,
    pub attributes: Option<std::result::Result<String, String>>,
    pub children: Option<std::result::Result<Vec<PrinterObject>, String>>,
}

impl FetchOutcome {
    /// An outcome where every call failed for `reason`.
    pub fn failed(system: SystemId, incarnation: Incarnation, reason: &str) -> Self {
        Self {
            system,
            incarnation,
            attributes: Some(Err(reason.to_string())),
            children: Some(Err(reason.to_string())),
        }
    }
}

/// Decide whether `system` needs a fetch.
///
/// Returns nothing when the endpoint is unset or when attributes and printers
/// are both known.  If a fetch is already running the attempt is parked and
/// reissued by `apply` once that fetch lands.
pub fn plan(system: &mut SystemObject, via: Option<String>) -> Option<FetchRequest> {
    let endpoint = system.endpoint()?.to_string();

    let attributes = system.attributes().is_none();
    let children = !system.has_children();
    if !attributes && !children {
        return None;
    }

    let uri = via.unwrap_or(endpoint);
    if system.fetch_in_flight() {
        debug!(system = %system.id(), uri = %uri, "fetch in flight, retry deferred");
        system.defer_retry(uri);
        return None;
    }

    system.set_fetch_in_flight(true);
    Some(FetchRequest {
        system: system.id().clone(),
        incarnation: system.incarnation(),
        uri,
        attributes,
        children,
    })
}

/// Run the network side of a fetch. Each call is bounded by `timeout`.
pub async fn execute(
    request: FetchRequest,
    gateway: &dyn AttributeGateway,
    timeout: Duration,
) -> FetchOutcome {
    let FetchRequest {
        system,
        incarnation,
        uri,
        attributes,
        children,
    } = request;

    let attributes = if attributes {
        let result = bounded(
            "Get-System-Attributes",
            timeout,
            gateway.fetch_attributes(ObjectKind::System, &uri),
        )
        .await;
        Some(result.map_err(|e| {
            warn!(system = %system, uri = %uri, error = %e, "system attributes unavailable");
            humanize_error(&e).message
        }))
    } else {
        None
    };

    let children = if children {
        let result = bounded("Get-Printers", timeout, gateway.enumerate_children(&uri)).await;
        match result {
            Ok(descriptors) => {
                let mut printers = Vec::with_capacity(descriptors.len());
                for descriptor in descriptors {
                    printers.push(fetch_printer(&system, descriptor, gateway, timeout).await);
                }
                info!(system = %system, count = printers.len(), "printers enumerated");
                Some(Ok(printers))
            }
            Err(e) => {
                warn!(system = %system, uri = %uri, error = %e, "printer enumeration failed");
                Some(Err(humanize_error(&e).message))
            }
        }
    } else {
        None
    };

    FetchOutcome {
        system,
        incarnation,
        attributes,
        children,
    }
}

async fn fetch_printer(
    system: &SystemId,
    descriptor: ChildDescriptor,
    gateway: &dyn AttributeGateway,
    timeout: Duration,
) -> PrinterObject {
    let result = bounded(
        "Get-Printer-Attributes",
        timeout,
        gateway.fetch_attributes(ObjectKind::Printer, &descriptor.uri),
    )
    .await;

    let (attributes, attribute_error) = match result {
        Ok(text) => (Some(text), None),
        Err(e) => {
            warn!(
                system = %system,
                printer = %descriptor.name,
                uri = %descriptor.uri,
                error = %e,
                "printer attributes unavailable"
            );
            (None, Some(humanize_error(&e).message))
        }
    };

    PrinterObject {
        name: descriptor.name,
        uri: descriptor.uri,
        attributes,
        attribute_error,
    }
}

async fn bounded<T>(
    operation: &str,
    timeout: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(IppScopeError::IppRequest(format!(
            "{operation} timed out after {timeout:?}"
        ))),
    }
}

/// Fold a finished fetch into the model.
///
/// Outcomes for systems that are gone, or that were destroyed and announced
/// again since the fetch started, are dropped.  Returns a follow-up request
/// through the oldest parked source while anything is still unset; the
/// others stay parked for the fetches after it.
pub fn apply(
    outcome: FetchOutcome,
    model: &mut ObjectModel,
    sink: &mut dyn TreeSink,
) -> Option<FetchRequest> {
    let FetchOutcome {
        system: id,
        incarnation,
        attributes,
        children,
    } = outcome;

    let system = match model.lookup_system_mut(&id) {
        Some(system) if system.incarnation() == incarnation => system,
        Some(_) => {
            debug!(system = %id, "outcome for an earlier incarnation dropped");
            return None;
        }
        None => {
            debug!(system = %id, "outcome for a removed system dropped");
            return None;
        }
    };
    system.set_fetch_in_flight(false);

    match attributes {
        Some(Ok(text)) => {
            if let Err(e) = model.record_attributes(&id, text, sink) {
                warn!(system = %id, error = %e, "could not record attributes");
            }
        }
        Some(Err(reason)) => {
            if let Some(system) = model.lookup_system_mut(&id)
                && system.attributes().is_none()
            {
                system.set_attribute_error(reason);
            }
        }
        None => {}
    }

    match children {
        Some(Ok(printers)) => {
            if let Err(e) = model.append_children(&id, printers, sink) {
                warn!(system = %id, error = %e, "could not attach printers");
            }
        }
        Some(Err(reason)) => debug!(system = %id, reason = %reason, "no printers this time"),
        None => {}
    }

    let system = model.lookup_system_mut(&id)?;
    let via = system.take_retry()?;
    let retry = plan(system, Some(via));
    if retry.is_none() {
        // Nothing left unset, so the remaining parked paths are moot.
        system.clear_retries();
    }
    retry
}
