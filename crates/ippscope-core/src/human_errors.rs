// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the details pane and the CLI.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how the console presents it.

use crate::error::IppScopeError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or timeout; a later announcement may fix it.
    Transient,
    /// User must do something (fix config, check network).
    ActionRequired,
    /// The device or data is wrong and retrying won't help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

/// Convert an `IppScopeError` into a `HumanError`.
pub fn humanize_error(err: &IppScopeError) -> HumanError {
    match err {
        IppScopeError::Discovery(detail) => {
            if detail.contains("daemon") || detail.contains("multicast") {
                HumanError {
                    message: "We can't listen for network announcements right now.".into(),
                    suggestion: "Make sure this machine is on a network that allows multicast, then try again.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "Service discovery stopped working.".into(),
                    suggestion: format!("Restart ippscope. ({detail})"),
                    severity: Severity::Transient,
                }
            }
        }

        IppScopeError::Resolve(_) => HumanError {
            message: "A device announced itself but its address could not be found.".into(),
            suggestion: "It will show up once the device answers again.".into(),
            severity: Severity::Transient,
        },

        IppScopeError::IppRequest(detail) => humanize_ipp_error(detail),

        IppScopeError::ProtocolMismatch { .. } => HumanError {
            message: "The device sent an inconsistent printer list.".into(),
            suggestion: "Its firmware may be out of date. The system is still shown without its printers.".into(),
            severity: Severity::Permanent,
        },

        IppScopeError::InvalidEndpoint(detail) => HumanError {
            message: "The device's address can't be used.".into(),
            suggestion: format!("Another announcement of the same device may work. ({detail})"),
            severity: Severity::Transient,
        },

        IppScopeError::DuplicateId(_) | IppScopeError::UnknownSystem(_) => HumanError {
            message: "ippscope lost track of a device.".into(),
            suggestion: "Please report this. Restarting ippscope rebuilds the list.".into(),
            severity: Severity::Permanent,
        },

        IppScopeError::Config(detail) => HumanError {
            message: "The configuration file has a problem.".into(),
            suggestion: format!("Fix the setting or delete the file to use defaults. ({detail})"),
            severity: Severity::ActionRequired,
        },

        IppScopeError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "ippscope doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or pass a different --config path.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, check the disk.".into(),
                    severity: Severity::Transient,
                }
            }
        }

        IppScopeError::Serialization(_) => HumanError {
            message: "The configuration file isn't valid JSON.".into(),
            suggestion: "Fix the file or delete it to start from defaults.".into(),
            severity: Severity::ActionRequired,
        },
    }
}

/// Parse IPP-specific error details into human-readable messages.
fn humanize_ipp_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") {
        HumanError {
            message: "The device didn't respond in time.".into(),
            suggestion: "It might be busy or asleep. Attributes are fetched again if it is seen on another address.".into(),
            severity: Severity::Transient,
        }
    } else if lower.contains("connection refused") {
        HumanError {
            message: "The device refused our connection.".into(),
            suggestion: "It may not accept IPP on the announced port.".into(),
            severity: Severity::Transient,
        }
    } else if lower.contains("connection reset") || lower.contains("broken pipe") {
        HumanError {
            message: "The connection to the device was interrupted.".into(),
            suggestion: "This sometimes happens with Wi-Fi.".into(),
            severity: Severity::Transient,
        }
    } else if lower.contains("operation-not-supported") || lower.contains("operationnotsupported") {
        HumanError {
            message: "The device doesn't support the IPP System Service.".into(),
            suggestion: "Only systems implementing PWG 5100.22 report attributes here.".into(),
            severity: Severity::Permanent,
        }
    } else if lower.contains("not-authorized")
        || lower.contains("notauthorized")
        || lower.contains("forbidden")
    {
        HumanError {
            message: "The device won't share its details with us.".into(),
            suggestion: "It may require authentication, which ippscope does not perform.".into(),
            severity: Severity::Permanent,
        }
    } else if lower.contains("server-error") || lower.contains("servererror") {
        HumanError {
            message: "The device reported an internal error.".into(),
            suggestion: "Try restarting the device.".into(),
            severity: Severity::Transient,
        }
    } else if lower.contains("invalid uri") || lower.contains("invalid url") {
        HumanError {
            message: "The device address doesn't look right.".into(),
            suggestion: "Check the device's network settings.".into(),
            severity: Severity::Permanent,
        }
    } else {
        HumanError {
            message: "The device had a problem answering.".into(),
            suggestion: format!("Detail: {detail}"),
            severity: Severity::Transient,
        }
    }
}
