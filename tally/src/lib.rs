//! Windowed aggregation for synchronous metric instruments.
//!
//! This crate turns high-frequency measurements from counters, up-down
//! counters, histograms and gauges into periodic streams of aggregated data
//! points. Measurements carry attributes; each distinct attribute set forms
//! a series that is aggregated independently and reported per collection
//! cycle.
//!
//! Every reader gets its own [`Pipeline`] with independent temporality,
//! aggregation and attribute projection per instrument, configured through
//! [`ViewEntry`]. Recording on a handle is safe from any number of threads
//! and never blocks collection for long: collection checkpoints the current
//! window in one phase and builds data points in a second, so no update is
//! lost between cycles.
//!
//! ```
//! use tally::{Descriptor, InstrumentKind, KeyValue, NumberKind, Pipelines, Temporality, ViewEntry};
//!
//! let pipelines = Pipelines::new(1);
//! let descriptor = Descriptor::new("requests", InstrumentKind::Counter, NumberKind::I64);
//! let counter = pipelines.i64_counter(
//!     descriptor.clone(),
//!     vec![Some(ViewEntry::new(descriptor).with_temporality(Temporality::Delta))],
//! );
//!
//! counter.add(1, &[KeyValue::new("route", "/health")]);
//!
//! let mut metrics = Vec::new();
//! pipelines.get(0).unwrap().collect(&mut metrics);
//! assert_eq!(metrics.len(), 1);
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

mod aggregation;
mod attribute_set;
mod attributes;
pub mod data;
mod descriptor;
mod error;
mod instrument;
mod internal;
mod internal_logging;
mod pipeline;
mod view;

pub use aggregation::Aggregation;
pub use attribute_set::AttributeSet;
pub use attributes::{Key, KeyValue, StringValue, Value};
pub use data::{Metric, Sequence, Temporality};
pub use descriptor::{Descriptor, InstrumentKind, NumberKind};
pub use error::{MetricError, MetricResult};
pub use instrument::{Counter, Gauge, Histogram, SyncInstrument, UpDownCounter};
pub use pipeline::{Pipeline, Pipelines};
pub use view::{Filter, ViewEntry};

#[cfg(feature = "internal-logs")]
#[doc(hidden)]
pub mod _private {
    pub use tracing::{debug, error, info, warn};
}
