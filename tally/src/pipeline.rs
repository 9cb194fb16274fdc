//! Reader pipelines and instrument construction.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::aggregation::Aggregation;
use crate::data::{Metric, Sequence};
use crate::descriptor::Descriptor;
use crate::instrument::{
    Counter, Gauge, Histogram, ResolvedMeasures, SyncInstrument, UpDownCounter,
};
use crate::internal::aggregate::{AggregateBuilder, AggregateFns, ComputeAggregation, Measure};
use crate::internal::Number;
use crate::view::ViewEntry;
use crate::{tally_debug, tally_warn};

struct RegisteredInstrument {
    descriptor: Descriptor,
    aggregate: Arc<dyn ComputeAggregation>,
}

/// The aggregation state of one reader.
///
/// A pipeline owns the collection timestamps and one aggregation path per
/// instrument view that targets its reader. Collection runs in two phases
/// so a caller can settle on timestamps between closing the windows and
/// building the data points; [`Pipeline::collect`] runs both phases with
/// freshly advanced timestamps.
pub struct Pipeline {
    sequence: Mutex<Sequence>,
    instruments: Mutex<Vec<RegisteredInstrument>>,
}

impl Pipeline {
    fn new() -> Self {
        let now = SystemTime::now();
        Pipeline {
            sequence: Mutex::new(Sequence {
                start: now,
                last: now,
                now,
            }),
            instruments: Mutex::new(Vec::new()),
        }
    }

    fn register(&self, descriptor: Descriptor, aggregate: Arc<dyn ComputeAggregation>) {
        self.instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RegisteredInstrument {
                descriptor,
                aggregate,
            });
    }

    /// The timestamps the next [`Pipeline::produce`] call would be stamped
    /// with if the window were not advanced first.
    pub fn sequence(&self) -> Sequence {
        *self.sequence.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close the previous window and open a new one, returning the
    /// timestamps describing the closed window.
    pub fn advance_window(&self) -> Sequence {
        let mut sequence = self.sequence.lock().unwrap_or_else(PoisonError::into_inner);
        sequence.last = sequence.now;
        sequence.now = SystemTime::now();
        *sequence
    }

    /// Phase one of collection: checkpoint the current window of every
    /// registered instrument.
    pub fn snapshot_and_process(&self) {
        let instruments = self
            .instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for instrument in instruments.iter() {
            instrument.aggregate.snapshot_and_process();
        }
    }

    /// Phase two of collection: build one [`Metric`] per registered
    /// instrument from the checkpointed windows, stamped with `sequence`.
    ///
    /// Instruments whose series recorded nothing still contribute a metric
    /// with zero data points.
    pub fn produce(&self, sequence: Sequence, dest: &mut Vec<Metric>) {
        let instruments = self
            .instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        dest.reserve(instruments.len());
        for instrument in instruments.iter() {
            dest.push(Metric {
                descriptor: instrument.descriptor.clone(),
                data: instrument.aggregate.produce(sequence),
            });
        }
    }

    /// Advance the window and run both collection phases.
    pub fn collect(&self, dest: &mut Vec<Metric>) {
        let sequence = self.advance_window();
        self.snapshot_and_process();
        self.produce(sequence, dest);
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

/// The reader pipelines of one aggregation engine, fixed at construction.
///
/// Instruments are created against all pipelines at once: each reader
/// supplies one optional [`ViewEntry`] deciding whether and how it sees the
/// instrument.
pub struct Pipelines(Vec<Arc<Pipeline>>);

impl Pipelines {
    /// Create `readers` independent pipelines.
    pub fn new(readers: usize) -> Self {
        Pipelines((0..readers).map(|_| Arc::new(Pipeline::new())).collect())
    }

    /// The number of reader pipelines.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no reader pipelines.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The pipeline of reader `reader`, if it exists.
    pub fn get(&self, reader: usize) -> Option<&Arc<Pipeline>> {
        self.0.get(reader)
    }

    /// Iterate over the reader pipelines in reader order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Pipeline>> {
        self.0.iter()
    }

    /// Create an `i64` counter.
    ///
    /// `register` holds one optional view entry per reader, in reader
    /// order; `None` drops the instrument for that reader. When every
    /// reader drops it the returned handle is a no-op.
    pub fn i64_counter(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> Counter<i64> {
        Counter::new(self.create(descriptor, register))
    }

    /// Create an `f64` counter. See [`Pipelines::i64_counter`] for how
    /// `register` is interpreted.
    pub fn f64_counter(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> Counter<f64> {
        Counter::new(self.create(descriptor, register))
    }

    /// Create an `i64` up-down counter. See [`Pipelines::i64_counter`] for
    /// how `register` is interpreted.
    pub fn i64_up_down_counter(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> UpDownCounter<i64> {
        UpDownCounter::new(self.create(descriptor, register))
    }

    /// Create an `f64` up-down counter. See [`Pipelines::i64_counter`] for
    /// how `register` is interpreted.
    pub fn f64_up_down_counter(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> UpDownCounter<f64> {
        UpDownCounter::new(self.create(descriptor, register))
    }

    /// Create an `i64` histogram. See [`Pipelines::i64_counter`] for how
    /// `register` is interpreted.
    pub fn i64_histogram(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> Histogram<i64> {
        Histogram::new(self.create(descriptor, register))
    }

    /// Create an `f64` histogram. See [`Pipelines::i64_counter`] for how
    /// `register` is interpreted.
    pub fn f64_histogram(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> Histogram<f64> {
        Histogram::new(self.create(descriptor, register))
    }

    /// Create an `i64` gauge. See [`Pipelines::i64_counter`] for how
    /// `register` is interpreted.
    pub fn i64_gauge(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> Gauge<i64> {
        Gauge::new(self.create(descriptor, register))
    }

    /// Create an `f64` gauge. See [`Pipelines::i64_counter`] for how
    /// `register` is interpreted.
    pub fn f64_gauge(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> Gauge<f64> {
        Gauge::new(self.create(descriptor, register))
    }

    /// Resolve an instrument against every reader's view entry.
    ///
    /// Returns `None` when no reader kept the instrument, so the handle
    /// collapses to a no-op instead of carrying dead aggregation state.
    fn create<T: Number>(
        &self,
        descriptor: Descriptor,
        register: Vec<Option<ViewEntry>>,
    ) -> Option<Arc<dyn SyncInstrument<T>>> {
        debug_assert_eq!(descriptor.number_kind(), T::kind());
        debug_assert_eq!(register.len(), self.0.len());

        let mut measures: Vec<Option<Arc<dyn Measure<T>>>> = Vec::with_capacity(self.0.len());
        for (entry, pipeline) in register.into_iter().zip(&self.0) {
            measures.push(entry.and_then(|entry| resolve_aggregate(pipeline, entry)));
        }

        if measures.iter().all(Option::is_none) {
            tally_debug!(
                name: "instrument_dropped_by_views",
                instrument = descriptor.name().to_string()
            );
            return None;
        }
        Some(Arc::new(ResolvedMeasures {
            descriptor,
            measures,
        }))
    }
}

impl fmt::Debug for Pipelines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipelines")
            .field("readers", &self.0.len())
            .finish()
    }
}

/// Build the aggregation path one view entry asks for and register its
/// collection half with the entry's pipeline.
fn resolve_aggregate<T: Number>(
    pipeline: &Pipeline,
    entry: ViewEntry,
) -> Option<Arc<dyn Measure<T>>> {
    let (descriptor, aggregation, temporality, filter) = entry.into_parts();
    if let Err(err) = aggregation.validate() {
        tally_warn!(
            name: "view_aggregation_invalid",
            instrument = descriptor.name().to_string(),
            reason = err.to_string()
        );
        return None;
    }

    let builder = AggregateBuilder::<T>::new(temporality, filter);
    let AggregateFns { measure, collect } = match aggregation {
        Aggregation::Sum { monotonic } => builder.sum(monotonic),
        Aggregation::LastValue => builder.last_value(),
        Aggregation::ExplicitBucketHistogram {
            boundaries,
            record_min_max,
        } => builder.explicit_bucket_histogram(boundaries, record_min_max),
    };

    pipeline.register(descriptor, collect);
    Some(measure)
}
