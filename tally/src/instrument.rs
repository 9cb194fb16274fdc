//! Synchronous instrument handles.

use std::fmt;
use std::sync::Arc;

use crate::attributes::KeyValue;
use crate::descriptor::Descriptor;
use crate::internal::aggregate::{range_test, Measure};
use crate::internal::Number;

/// The measurement sink behind every synchronous instrument handle.
pub trait SyncInstrument<T>: Send + Sync {
    /// Record a measurement for every reader pipeline that kept the
    /// instrument.
    fn measure(&self, value: T, attributes: &[KeyValue]);
}

/// Validates measurements once, then fans them out to the aggregation path
/// of each reader pipeline that kept the instrument. Pipelines that dropped
/// it hold an empty slot.
pub(crate) struct ResolvedMeasures<T> {
    pub(crate) descriptor: Descriptor,
    pub(crate) measures: Vec<Option<Arc<dyn Measure<T>>>>,
}

impl<T: Number> SyncInstrument<T> for ResolvedMeasures<T> {
    fn measure(&self, value: T, attributes: &[KeyValue]) {
        if !range_test(value, self.descriptor.kind()) {
            return;
        }
        for measure in self.measures.iter().flatten() {
            measure.call(value, attributes)
        }
    }
}

macro_rules! instrument_handle {
    ($(#[$outer:meta])* $name:ident, $method:ident, $(#[$method_doc:meta])*) => {
        $(#[$outer])*
        ///
        /// Handles are cheap to clone and safe to use from any thread. A
        /// handle whose instrument was dropped by every reader's view does
        /// nothing.
        pub struct $name<T>(Option<Arc<dyn SyncInstrument<T>>>);

        impl<T> $name<T> {
            pub(crate) fn new(inner: Option<Arc<dyn SyncInstrument<T>>>) -> Self {
                $name(inner)
            }

            $(#[$method_doc])*
            pub fn $method(&self, value: T, attributes: &[KeyValue]) {
                if let Some(inner) = &self.0 {
                    inner.measure(value, attributes)
                }
            }

            /// Whether any reader pipeline kept this instrument.
            ///
            /// Callers can skip building expensive attribute sets when this
            /// returns `false`.
            pub fn is_enabled(&self) -> bool {
                self.0.is_some()
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                $name(self.0.clone())
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("enabled", &self.is_enabled())
                    .finish()
            }
        }
    };
}

instrument_handle!(
    /// An instrument that records increasing values.
    Counter,
    add,
    /// Record an increment to the counter.
    ///
    /// Negative, NaN and infinite values are discarded.
);

instrument_handle!(
    /// An instrument that records changes to a value that can go up or down.
    UpDownCounter,
    add,
    /// Record a change to the counter.
    ///
    /// NaN and infinite values are discarded.
);

instrument_handle!(
    /// An instrument that records a distribution of values.
    Histogram,
    record,
    /// Record a value into the distribution.
    ///
    /// Negative, NaN and infinite values are discarded.
);

instrument_handle!(
    /// An instrument that records the current value of something.
    Gauge,
    record,
    /// Record the current value.
    ///
    /// NaN and infinite values are discarded.
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink(AtomicUsize);

    impl SyncInstrument<i64> for CountingSink {
        fn measure(&self, _value: i64, _attributes: &[KeyValue]) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn dropped_handle_is_a_noop() {
        let counter = Counter::<i64>::new(None);
        assert!(!counter.is_enabled());
        counter.add(1, &[]);
        counter.add(1, &[KeyValue::new("k", "v")]);
    }

    #[test]
    fn live_handle_forwards_measurements() {
        let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
        let histogram = Histogram::<i64>::new(Some(sink.clone()));
        assert!(histogram.is_enabled());

        histogram.record(3, &[]);
        let clone = histogram.clone();
        clone.record(4, &[]);
        assert_eq!(sink.0.load(Ordering::Relaxed), 2);
    }
}
