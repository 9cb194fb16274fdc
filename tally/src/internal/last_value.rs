//! Last-value aggregation for gauge style instruments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::attributes::KeyValue;
use crate::data::{AggregatedData, GaugeData, GaugeDataPoint, MetricData, Sequence};

use super::aggregate::{AttributeSetFilter, ComputeAggregation, Measure};
use super::{Aggregator, Number, ValueMap};

/// The most recent value written to one series.
///
/// Each update draws a generation number before taking the cell lock, so
/// concurrent updates resolve by update order rather than by lock
/// acquisition order. A value only replaces the stored one when its
/// generation is newer.
pub(crate) struct Latest<T> {
    generation: AtomicU64,
    current: Mutex<Option<(T, u64)>>,
}

impl<T: Number> Aggregator for Latest<T> {
    type InitConfig = ();
    type PreComputedValue = T;
    type Snapshot = (T, u64);

    fn create(_init: &()) -> Self {
        Latest {
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    fn update(&self, value: T) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match *current {
            Some((_, stored)) if generation < stored => {}
            _ => *current = Some((value, generation)),
        }
    }

    fn snapshot(&self, reset: bool) -> Option<(T, u64)> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if reset {
            current.take()
        } else {
            *current
        }
    }

    fn merge(pending: &mut Option<(T, u64)>, snapshot: (T, u64)) {
        match pending {
            Some((_, stored)) if *stored >= snapshot.1 => {}
            _ => *pending = Some(snapshot),
        }
    }
}

/// Keeps the last value written per attribute set.
///
/// Always collected as delta: taking a snapshot clears the series, so a
/// series is only reported for cycles it was written in.
pub(crate) struct LastValue<T: Number> {
    value_map: ValueMap<Latest<T>>,
    filter: AttributeSetFilter,
}

impl<T: Number> LastValue<T> {
    pub(crate) fn new(filter: AttributeSetFilter) -> Self {
        LastValue {
            value_map: ValueMap::new(()),
            filter,
        }
    }
}

impl<T: Number> Measure<T> for LastValue<T> {
    fn call(&self, measurement: T, attrs: &[KeyValue]) {
        self.filter.apply(attrs, |filtered| {
            self.value_map.measure(measurement, filtered);
        });
    }
}

impl<T: Number> ComputeAggregation for LastValue<T> {
    fn snapshot_and_process(&self) {
        self.value_map.checkpoint(true);
    }

    fn produce(&self, sequence: Sequence) -> AggregatedData {
        let mut data_points = Vec::new();
        self.value_map
            .produce(&mut data_points, |attributes, (value, _)| GaugeDataPoint {
                attributes,
                value,
            });

        T::make_aggregated(MetricData::Gauge(GaugeData {
            data_points,
            start_time: sequence.last,
            time: sequence.now,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn sequence() -> Sequence {
        let now = SystemTime::now();
        Sequence {
            start: now,
            last: now,
            now,
        }
    }

    fn produce(last_value: &LastValue<i64>) -> GaugeData<i64> {
        last_value.snapshot_and_process();
        match last_value.produce(sequence()) {
            AggregatedData::I64(MetricData::Gauge(data)) => data,
            other => panic!("unexpected data variant: {other:?}"),
        }
    }

    #[test]
    fn newest_write_wins() {
        let last_value = LastValue::<i64>::new(AttributeSetFilter::new(None));
        last_value.call(10, &[]);
        last_value.call(7, &[]);

        let data = produce(&last_value);
        assert_eq!(data.data_points.len(), 1);
        assert_eq!(data.data_points[0].value, 7);
    }

    #[test]
    fn series_disappears_when_not_written() {
        let last_value = LastValue::<i64>::new(AttributeSetFilter::new(None));
        last_value.call(10, &[]);

        assert_eq!(produce(&last_value).data_points.len(), 1);
        assert!(produce(&last_value).data_points.is_empty());

        last_value.call(20, &[]);
        let data = produce(&last_value);
        assert_eq!(data.data_points.len(), 1);
        assert_eq!(data.data_points[0].value, 20);
    }

    #[test]
    fn merge_keeps_the_newer_generation() {
        let mut pending = None;
        Latest::<i64>::merge(&mut pending, (5, 2));
        assert_eq!(pending, Some((5, 2)));

        // An older snapshot cannot displace a newer pending value.
        Latest::<i64>::merge(&mut pending, (9, 1));
        assert_eq!(pending, Some((5, 2)));

        Latest::<i64>::merge(&mut pending, (3, 7));
        assert_eq!(pending, Some((3, 7)));
    }

    #[test]
    fn stale_generation_does_not_overwrite() {
        let latest = Latest::<i64>::create(&());
        latest.update(1);
        latest.update(2);

        // Updates are assigned generations 0 and 1; the stored pair must
        // carry the later one.
        assert_eq!(latest.snapshot(false), Some((2, 1)));
    }
}
