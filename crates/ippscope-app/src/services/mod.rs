// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: wires discovery, the lifecycle service, and the console
// together for the binary.

pub mod app_services;
pub mod config_dir;
