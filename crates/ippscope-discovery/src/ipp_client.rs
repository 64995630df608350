// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async IPP client for querying IPP systems and their printers.
//
// Uses the `ipp` crate's async API to send:
//   - Get-System-Attributes   (PWG 5100.22 §6.2.7)
//   - Get-Printers            (PWG 5100.22 §6.2.6)
//   - Get-Printer-Attributes  (RFC 8011 §4.2.5)

use std::collections::HashMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use ipp::operation::IppOperation;
use ipp::prelude::*;
use tracing::{debug, error, instrument};

use ippscope_core::AppConfig;
use ippscope_core::error::{IppScopeError, Result};
use ippscope_core::types::{ChildDescriptor, ObjectKind};

use crate::fetch::AttributeGateway;

/// Operation code for Get-Printers.
pub const OP_GET_PRINTERS: u16 = 0x0043;
/// Operation code for Get-System-Attributes.
pub const OP_GET_SYSTEM_ATTRIBUTES: u16 = 0x005B;

/// Flattened response attributes: name to display string.
pub type AttributeMap = HashMap<String, String>;

/// A System Service operation addressed by `system-uri`.
///
/// The `ipp` crate has no builders for these, so the request is assembled by
/// hand and the operation code patched into the header.
struct SystemOperation {
    code: u16,
    system_uri: Uri,
    user_name: String,
    requested: Vec<String>,
}

impl IppOperation for SystemOperation {
    fn into_ipp_request(self) -> IppRequestResponse {
        let mut request =
            IppRequestResponse::new(self.version(), Operation::GetPrinterAttributes, None);
        request.header_mut().operation_or_status = self.code;

        let attributes = request.attributes_mut();
        attributes.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new("system-uri", IppValue::Uri(self.system_uri.to_string())),
        );
        attributes.add(
            DelimiterTag::OperationAttributes,
            IppAttribute::new(
                "requesting-user-name",
                IppValue::NameWithoutLanguage(self.user_name),
            ),
        );
        if !self.requested.is_empty() {
            let keywords = self.requested.into_iter().map(IppValue::Keyword).collect();
            attributes.add(
                DelimiterTag::OperationAttributes,
                IppAttribute::new("requested-attributes", IppValue::Array(keywords)),
            );
        }
        request
    }

    fn version(&self) -> IppVersion {
        IppVersion::v2_0()
    }
}

/// Async IPP client bound to one URI.
pub struct IppClient {
    uri: Uri,
}

impl IppClient {
    /// Create a client for an `ipp://` or `ipps://` address.
    pub fn new(uri: &str) -> Result<Self> {
        let parsed: Uri = uri
            .parse()
            .map_err(|e| IppScopeError::IppRequest(format!("invalid URI '{uri}': {e}")))?;
        Ok(Self { uri: parsed })
    }

    /// Query a system's own attributes.
    #[instrument(skip(self, user_name, requested), fields(uri = %self.uri))]
    pub async fn get_system_attributes(
        &self,
        user_name: &str,
        requested: &[String],
    ) -> Result<AttributeMap> {
        let response = self
            .send_system_operation(
                "Get-System-Attributes",
                OP_GET_SYSTEM_ATTRIBUTES,
                user_name,
                requested,
            )
            .await?;
        let attrs = flatten_attributes(response.attributes());
        debug!(count = attrs.len(), "received system attributes");
        Ok(attrs)
    }

    /// List the printers a system hosts.
    #[instrument(skip(self, user_name), fields(uri = %self.uri))]
    pub async fn get_printers(&self, user_name: &str) -> Result<Vec<ChildDescriptor>> {
        let requested = ["printer-name".to_string(), "printer-uri-supported".to_string()];
        let response = self
            .send_system_operation("Get-Printers", OP_GET_PRINTERS, user_name, &requested)
            .await?;

        let (names, uris) = collect_printer_lists(response.attributes());
        let printers = pair_children(names, uris)?;
        debug!(count = printers.len(), "received printer list");
        Ok(printers)
    }

    /// Query a printer's attributes.
    #[instrument(skip(self), fields(uri = %self.uri))]
    pub async fn get_printer_attributes(&self) -> Result<AttributeMap> {
        let operation = IppOperationBuilder::get_printer_attributes(self.uri.clone()).build();
        let client = AsyncIppClient::new(self.uri.clone());

        debug!("sending Get-Printer-Attributes");
        let response = client
            .send(operation)
            .await
            .map_err(|e| IppScopeError::IppRequest(format!("Get-Printer-Attributes: {e}")))?;

        check_status("Get-Printer-Attributes", &response)?;

        let attrs = flatten_attributes(response.attributes());
        debug!(count = attrs.len(), "received printer attributes");
        Ok(attrs)
    }

    async fn send_system_operation(
        &self,
        name: &str,
        code: u16,
        user_name: &str,
        requested: &[String],
    ) -> Result<IppRequestResponse> {
        let operation = SystemOperation {
            code,
            system_uri: self.uri.clone(),
            user_name: user_name.to_string(),
            requested: requested.to_vec(),
        };
        let client = AsyncIppClient::new(self.uri.clone());

        debug!(operation = name, "sending request");
        let response = client
            .send(operation)
            .await
            .map_err(|e| IppScopeError::IppRequest(format!("{name}: {e}")))?;

        check_status(name, &response)?;
        Ok(response)
    }
}

fn check_status(name: &str, response: &IppRequestResponse) -> Result<()> {
    let code = response.header().status_code();
    if code.is_success() {
        return Ok(());
    }
    error!(status = ?code, "{name} failed");
    Err(IppScopeError::IppRequest(format!(
        "{name} returned status {code:?}"
    )))
}

/// [`AttributeGateway`] that talks IPP.
pub struct IppGateway {
    user_name: String,
    system_attributes: Vec<String>,
    printer_attributes: Vec<String>,
    max_text: usize,
}

impl IppGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            user_name: config.requesting_user_name.clone(),
            system_attributes: config.system_attributes.clone(),
            printer_attributes: config.printer_attributes.clone(),
            max_text: config.max_attribute_text,
        }
    }
}

#[async_trait]
impl AttributeGateway for IppGateway {
    async fn fetch_attributes(&self, kind: ObjectKind, uri: &str) -> Result<String> {
        let client = IppClient::new(uri)?;
        match kind {
            ObjectKind::System => {
                let attrs = client
                    .get_system_attributes(&self.user_name, &self.system_attributes)
                    .await?;
                Ok(format_attributes(&attrs, &self.system_attributes, self.max_text))
            }
            ObjectKind::Printer => {
                let attrs = client.get_printer_attributes().await?;
                Ok(format_attributes(&attrs, &self.printer_attributes, self.max_text))
            }
        }
    }

    async fn enumerate_children(&self, uri: &str) -> Result<Vec<ChildDescriptor>> {
        IppClient::new(uri)?.get_printers(&self.user_name).await
    }
}

// ---------------------------------------------------------------------------
// Helper functions for parsing IPP responses
// ---------------------------------------------------------------------------

/// Flatten all attribute groups in an IPP response into a single map.
fn flatten_attributes(attrs: &IppAttributes) -> AttributeMap {
    let mut map = HashMap::new();
    for group in attrs.groups() {
        for (name, attr) in group.attributes() {
            map.insert(name.clone(), format!("{}", attr.value()));
        }
    }
    map
}

/// Gather `printer-name` and `printer-uri-supported` across the printer
/// groups of a Get-Printers response.  Only the first supported URI of each
/// printer is kept.
fn collect_printer_lists(attrs: &IppAttributes) -> (Vec<String>, Vec<String>) {
    let mut names = Vec::new();
    let mut uris = Vec::new();

    for group in attrs.groups_of(DelimiterTag::PrinterAttributes) {
        let attributes = group.attributes();
        if let Some(name) = attributes.get("printer-name") {
            names.push(first_value(name.value()));
        }
        if let Some(uri) = attributes.get("printer-uri-supported") {
            uris.push(first_value(uri.value()));
        }
    }

    (names, uris)
}

fn first_value(value: &IppValue) -> String {
    match value {
        IppValue::Array(values) => values.first().map(|v| v.to_string()).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Pair printer names with their URIs.  The lists must be the same length.
pub fn pair_children(names: Vec<String>, uris: Vec<String>) -> Result<Vec<ChildDescriptor>> {
    if names.len() != uris.len() {
        return Err(IppScopeError::ProtocolMismatch {
            names: names.len(),
            uris: uris.len(),
        });
    }
    Ok(names
        .into_iter()
        .zip(uris)
        .map(|(name, uri)| ChildDescriptor { name, uri })
        .collect())
}

/// Render the wanted attributes as `name = value` lines.
///
/// Missing attributes read `unknown`; `*-state` enums are shown by keyword.
/// The text is cut at `max_len` bytes on a character boundary.
pub fn format_attributes(attrs: &AttributeMap, wanted: &[String], max_len: usize) -> String {
    let mut text = String::new();
    for name in wanted {
        let value = attrs.get(name).map(String::as_str).unwrap_or("unknown");
        let value = if name.ends_with("-state") {
            state_keyword(value)
        } else {
            value
        };
        let _ = writeln!(text, "{name} = {value}");
    }
    truncate(&mut text, max_len);
    text
}

fn state_keyword(value: &str) -> &str {
    match value.trim() {
        "3" => "idle",
        "4" => "processing",
        "5" => "stopped",
        _ => value,
    }
}

fn truncate(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}
