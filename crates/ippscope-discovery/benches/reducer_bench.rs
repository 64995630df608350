// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the discovery reducer under announcement churn
// and for attribute text rendering.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ippscope_core::AppConfig;
use ippscope_core::types::{ProtocolFamily, SourceRecord, SystemId};
use ippscope_discovery::discovery::DiscoveryEvent;
use ippscope_discovery::ipp_client::{AttributeMap, format_attributes};
use ippscope_discovery::presentation::{RowHandle, TreeView};
use ippscope_discovery::reducer::Reducer;

/// View that draws nothing.
#[derive(Default)]
struct NullView {
    next: u64,
}

impl TreeView for NullView {
    fn insert_row(&mut self, _: Option<RowHandle>, _: &str, _: &str) -> RowHandle {
        self.next += 1;
        RowHandle(self.next)
    }

    fn update_row(&mut self, _: RowHandle, _: &str) {}

    fn remove_row(&mut self, _: RowHandle) {}

    fn show_details(&mut self, _: Option<&str>) {}
}

/// Announce `systems` systems over two paths each, then withdraw them all.
fn churn(systems: usize) -> Vec<DiscoveryEvent> {
    let mut events = Vec::with_capacity(systems * 4);
    for n in 0..systems {
        for host in ["a", "b"] {
            events.push(DiscoveryEvent::New {
                id: SystemId::new(format!("System {n}")),
                source: SourceRecord::new(ProtocolFamily::Ipv4, "local", format!("{host}{n}"), 631),
            });
        }
    }
    for n in 0..systems {
        for host in ["a", "b"] {
            events.push(DiscoveryEvent::Remove {
                id: SystemId::new(format!("System {n}")),
                source: SourceRecord::new(ProtocolFamily::Ipv4, "local", format!("{host}{n}"), 631),
            });
        }
    }
    events
}

fn bench_reducer_churn(c: &mut Criterion) {
    let events = churn(256);

    c.bench_function("reducer churn (256 systems, 2 paths)", |b| {
        b.iter(|| {
            let mut reducer = Reducer::new(AppConfig::default(), NullView::default());
            for event in events.iter().cloned() {
                black_box(reducer.handle(event));
            }
            black_box(reducer.model().len());
        });
    });
}

fn bench_format_attributes(c: &mut Criterion) {
    let config = AppConfig::default();
    let mut attrs = AttributeMap::new();
    attrs.insert("printer-state".into(), "3".into());
    attrs.insert("printer-make-and-model".into(), "Acme LaserJet 9000".into());
    attrs.insert("printer-location".into(), "Second floor, east wing".into());

    c.bench_function("format_attributes (printer list)", |b| {
        b.iter(|| {
            format_attributes(
                black_box(&attrs),
                &config.printer_attributes,
                config.max_attribute_text,
            )
        });
    });
}

criterion_group!(benches, bench_reducer_churn, bench_format_attributes);
criterion_main!(benches);
