//! Sum aggregation for counter style instruments.

use crate::attributes::KeyValue;
use crate::data::{AggregatedData, MetricData, Sequence, SumData, SumDataPoint, Temporality};

use super::aggregate::{AttributeSetFilter, ComputeAggregation, Measure};
use super::{Aggregator, AtomicTracker, AtomicallyUpdate, Number, ValueMap};

/// The running total of one series.
pub(crate) struct Increment<T: AtomicallyUpdate<T>> {
    value: AtomicTracker<T, T::AtomicValue>,
}

impl<T: Number> Aggregator for Increment<T> {
    type InitConfig = ();
    type PreComputedValue = T;
    type Snapshot = T;

    fn create(_init: &()) -> Self {
        Increment {
            value: T::new_atomic_tracker(),
        }
    }

    fn update(&self, value: T) {
        self.value.add(value);
    }

    fn snapshot(&self, reset: bool) -> Option<T> {
        self.value.get_value(reset)
    }

    fn merge(pending: &mut Option<T>, snapshot: T) {
        *pending = Some(match pending.take() {
            Some(prior) => prior + snapshot,
            None => snapshot,
        });
    }
}

/// Sums measurements per attribute set.
pub(crate) struct Sum<T: Number> {
    value_map: ValueMap<Increment<T>>,
    filter: AttributeSetFilter,
    temporality: Temporality,
    monotonic: bool,
}

impl<T: Number> Sum<T> {
    pub(crate) fn new(
        temporality: Temporality,
        filter: AttributeSetFilter,
        monotonic: bool,
    ) -> Self {
        Sum {
            value_map: ValueMap::new(()),
            filter,
            temporality,
            monotonic,
        }
    }
}

impl<T: Number> Measure<T> for Sum<T> {
    fn call(&self, measurement: T, attrs: &[KeyValue]) {
        self.filter.apply(attrs, |filtered| {
            self.value_map.measure(measurement, filtered);
        });
    }
}

impl<T: Number> ComputeAggregation for Sum<T> {
    fn snapshot_and_process(&self) {
        self.value_map
            .checkpoint(self.temporality == Temporality::Delta);
    }

    fn produce(&self, sequence: Sequence) -> AggregatedData {
        let start_time = match self.temporality {
            Temporality::Delta => sequence.last,
            Temporality::Cumulative => sequence.start,
        };
        let mut data_points = Vec::new();
        self.value_map
            .produce(&mut data_points, |attributes, value| SumDataPoint {
                attributes,
                value,
            });

        T::make_aggregated(MetricData::Sum(SumData {
            data_points,
            start_time,
            time: sequence.now,
            temporality: self.temporality,
            is_monotonic: self.monotonic,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn sequence() -> Sequence {
        let start = SystemTime::now();
        Sequence {
            start,
            last: start + Duration::from_secs(1),
            now: start + Duration::from_secs(2),
        }
    }

    fn produce(sum: &Sum<f64>, sequence: Sequence) -> SumData<f64> {
        sum.snapshot_and_process();
        match sum.produce(sequence) {
            AggregatedData::F64(MetricData::Sum(data)) => data,
            other => panic!("unexpected data variant: {other:?}"),
        }
    }

    #[test]
    fn delta_resets_between_cycles() {
        let sum = Sum::<f64>::new(Temporality::Delta, AttributeSetFilter::new(None), true);
        sum.call(2.5, &[]);
        sum.call(2.5, &[]);

        let seq = sequence();
        let first = produce(&sum, seq);
        assert_eq!(first.data_points.len(), 1);
        assert!((first.data_points[0].value - 5.0).abs() < f64::EPSILON);
        assert_eq!(first.start_time, seq.last);
        assert_eq!(first.time, seq.now);

        // Nothing recorded since, the series stays quiet.
        let second = produce(&sum, seq);
        assert!(second.data_points.is_empty());
    }

    #[test]
    fn cumulative_keeps_the_running_total() {
        let sum = Sum::<f64>::new(Temporality::Cumulative, AttributeSetFilter::new(None), false);
        sum.call(2.0, &[]);

        let seq = sequence();
        let first = produce(&sum, seq);
        assert!((first.data_points[0].value - 2.0).abs() < f64::EPSILON);
        assert_eq!(first.start_time, seq.start);
        assert!(!first.is_monotonic);

        sum.call(3.0, &[]);
        let second = produce(&sum, seq);
        assert!((second.data_points[0].value - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cumulative_reports_untouched_series_every_cycle() {
        let sum = Sum::<f64>::new(Temporality::Cumulative, AttributeSetFilter::new(None), true);
        sum.call(1.0, &[KeyValue::new("k", "v")]);

        let first = produce(&sum, sequence());
        assert_eq!(first.data_points.len(), 1);

        let second = produce(&sum, sequence());
        assert_eq!(second.data_points.len(), 1);
        assert!((second.data_points[0].value - 1.0).abs() < f64::EPSILON);
    }
}
