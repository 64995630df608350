// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration, persisted as JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IppScopeError, Result};

/// Default config file name inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Runtime settings for discovery and attribute fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// mDNS service type to browse for.
    pub service_type: String,
    /// Scheme of endpoint URIs built from resolved sources.
    pub uri_scheme: String,
    /// Resource path of the system service on the endpoint.
    pub system_resource: String,
    /// Value sent as `requesting-user-name`.
    pub requesting_user_name: String,
    /// Upper bound on one fetch call, in seconds.
    pub fetch_timeout_secs: u64,
    /// Number of fetches allowed to run at once.
    pub fetch_workers: usize,
    /// Attribute text longer than this is truncated.
    pub max_attribute_text: usize,
    /// Capacity of the inbound event channel.
    pub event_channel_capacity: usize,
    /// System attributes rendered in the details text, in order.
    pub system_attributes: Vec<String>,
    /// Printer attributes rendered in the details text, in order.
    pub printer_attributes: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_type: "_ipps-system._tcp.local.".into(),
            uri_scheme: "ipp".into(),
            system_resource: "/ipp/system".into(),
            requesting_user_name: std::env::var("USER").unwrap_or_else(|_| "anonymous".into()),
            fetch_timeout_secs: 10,
            fetch_workers: 4,
            max_attribute_text: 1024,
            event_channel_capacity: 256,
            system_attributes: [
                "system-state",
                "system-make-and-model",
                "system-dns-sd-name",
                "system-location",
                "system-geo-location",
            ]
            .map(String::from)
            .to_vec(),
            printer_attributes: [
                "printer-state",
                "printer-make-and-model",
                "printer-dns-sd-name",
                "printer-location",
                "printer-geo-location",
                "printer-more-info",
                "printer-supply-info-uri",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl AppConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Reject settings the discovery loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.service_type.starts_with('_') || !self.service_type.contains("._") {
            return Err(IppScopeError::Config(format!(
                "'{}' is not a DNS-SD service type",
                self.service_type
            )));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(IppScopeError::Config("fetch_timeout_secs must be at least 1".into()));
        }
        if self.fetch_workers == 0 {
            return Err(IppScopeError::Config("fetch_workers must be at least 1".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(IppScopeError::Config(
                "event_channel_capacity must be at least 1".into(),
            ));
        }
        if !self.system_resource.starts_with('/') {
            return Err(IppScopeError::Config(format!(
                "system_resource '{}' must start with '/'",
                self.system_resource
            )));
        }
        Ok(())
    }

    /// Load the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_attribute_text, 1024);
        assert_eq!(config.system_resource, "/ipp/system");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn save_then_load_preserves_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let config = AppConfig {
            fetch_timeout_secs: 3,
            service_type: "_ipp-system._tcp.local.".into(),
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "fetch_workers": 2 }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.fetch_workers, 2);
        assert_eq!(config.uri_scheme, "ipp");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = AppConfig {
            fetch_workers: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(IppScopeError::Config(_))));

        let config = AppConfig {
            service_type: "printers".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
