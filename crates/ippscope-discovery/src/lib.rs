// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ippscope discovery: mDNS browsing for IPP systems, IPP attribute fetching,
// and the system/printer lifecycle that ties them together.  The reducer and
// the object model are free of I/O; `service` runs them on tokio.

pub mod discovery;
pub mod endpoint;
pub mod fetch;
pub mod ipp_client;
pub mod model;
pub mod presentation;
pub mod reducer;
pub mod service;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use discovery::{DiscoveryEvent, SystemDiscovery};
pub use fetch::AttributeGateway;
pub use ipp_client::{IppClient, IppGateway};
pub use model::ObjectModel;
pub use presentation::{PresentationBridge, RowHandle, TreeView};
pub use reducer::Reducer;
pub use service::{LifecycleService, ServiceHandle};
