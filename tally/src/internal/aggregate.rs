//! Assembly of aggregation paths from view configuration.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::attributes::KeyValue;
use crate::data::{AggregatedData, Sequence, Temporality};
use crate::descriptor::InstrumentKind;
use crate::view::Filter;

use super::histogram::Histogram;
use super::last_value::LastValue;
use super::sum::Sum;
use super::Number;

/// Receives measurements to be aggregated.
pub(crate) trait Measure<T>: Send + Sync + 'static {
    fn call(&self, measurement: T, attrs: &[KeyValue]);
}

/// The reader-facing half of an aggregation path.
///
/// Collection runs in two phases. `snapshot_and_process` closes the current
/// window of every series and parks it in a checkpoint. `produce` then
/// drains the checkpoints into data points, stamped with the timestamps the
/// caller settled on between the phases.
pub(crate) trait ComputeAggregation: Send + Sync + 'static {
    fn snapshot_and_process(&self);
    fn produce(&self, sequence: Sequence) -> AggregatedData;
}

/// The two halves of one aggregation path.
pub(crate) struct AggregateFns<T> {
    pub(crate) measure: Arc<dyn Measure<T>>,
    pub(crate) collect: Arc<dyn ComputeAggregation>,
}

/// Creates both halves from a single aggregator instance.
impl<A, T> From<A> for AggregateFns<T>
where
    A: Measure<T> + ComputeAggregation,
{
    fn from(value: A) -> Self {
        let inst = Arc::new(value);
        AggregateFns {
            measure: inst.clone(),
            collect: inst,
        }
    }
}

/// Applies an attribute filter to every measurement.
#[derive(Clone)]
pub(crate) struct AttributeSetFilter {
    filter: Option<Filter>,
}

impl AttributeSetFilter {
    pub(crate) fn new(filter: Option<Filter>) -> Self {
        Self { filter }
    }

    pub(crate) fn apply(&self, attrs: &[KeyValue], run: impl FnOnce(&[KeyValue])) {
        if let Some(filter) = &self.filter {
            let filtered_attrs: Vec<KeyValue> =
                attrs.iter().filter(|kv| filter(kv)).cloned().collect();
            run(&filtered_attrs);
        } else {
            run(attrs);
        };
    }
}

/// Builds aggregate functions for a fixed temporality and attribute filter.
pub(crate) struct AggregateBuilder<T> {
    temporality: Temporality,
    filter: AttributeSetFilter,
    _marker: PhantomData<T>,
}

impl<T: Number> AggregateBuilder<T> {
    pub(crate) fn new(temporality: Temporality, filter: Option<Filter>) -> Self {
        AggregateBuilder {
            temporality,
            filter: AttributeSetFilter::new(filter),
            _marker: PhantomData,
        }
    }

    /// A sum of measurements.
    pub(crate) fn sum(&self, monotonic: bool) -> AggregateFns<T> {
        Sum::new(self.temporality, self.filter.clone(), monotonic).into()
    }

    /// The last recorded value.
    ///
    /// Always collected as delta regardless of the builder's temporality: a
    /// series only appears in cycles it was written in.
    pub(crate) fn last_value(&self) -> AggregateFns<T> {
        LastValue::new(self.filter.clone()).into()
    }

    /// A bucketed distribution with explicit boundaries.
    pub(crate) fn explicit_bucket_histogram(
        &self,
        boundaries: Vec<f64>,
        record_min_max: bool,
    ) -> AggregateFns<T> {
        Histogram::new(
            self.temporality,
            self.filter.clone(),
            boundaries,
            record_min_max,
        )
        .into()
    }
}

/// Checks a measurement against the instrument's admissible range.
///
/// NaN and infinite values are never admissible. Negative values are also
/// rejected for the monotonic-input kinds, counter and histogram.
pub(crate) fn range_test<T: Number>(value: T, kind: InstrumentKind) -> bool {
    let float = value.into_float();
    if float.is_nan() || float.is_infinite() {
        return false;
    }
    match kind {
        InstrumentKind::Counter | InstrumentKind::Histogram => value >= T::default(),
        InstrumentKind::UpDownCounter | InstrumentKind::Gauge => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MetricData;
    use std::time::SystemTime;

    fn test_sequence() -> Sequence {
        let now = SystemTime::now();
        Sequence {
            start: now,
            last: now,
            now,
        }
    }

    fn collect(agg: &AggregateFns<i64>) -> AggregatedData {
        agg.collect.snapshot_and_process();
        agg.collect.produce(test_sequence())
    }

    #[test]
    fn sum_delta_merges_uncollected_snapshots() {
        let agg = AggregateBuilder::<i64>::new(Temporality::Delta, None).sum(true);
        agg.measure.call(3, &[KeyValue::new("k", "v")]);
        agg.collect.snapshot_and_process();
        agg.measure.call(4, &[KeyValue::new("k", "v")]);
        agg.collect.snapshot_and_process();

        let data = agg.collect.produce(test_sequence());
        let AggregatedData::I64(MetricData::Sum(sum)) = data else {
            panic!("expected i64 sum data");
        };
        assert!(sum.is_monotonic);
        assert_eq!(sum.temporality, Temporality::Delta);
        assert_eq!(sum.data_points.len(), 1);
        assert_eq!(sum.data_points[0].value, 7);
    }

    #[test]
    fn last_value_keeps_only_the_newest_measurement() {
        let agg = AggregateBuilder::<i64>::new(Temporality::Cumulative, None).last_value();
        agg.measure.call(10, &[]);
        agg.measure.call(20, &[]);

        let AggregatedData::I64(MetricData::Gauge(gauge)) = collect(&agg) else {
            panic!("expected i64 gauge data");
        };
        assert_eq!(gauge.data_points.len(), 1);
        assert_eq!(gauge.data_points[0].value, 20);

        // Delta behavior even though the builder was cumulative.
        let AggregatedData::I64(MetricData::Gauge(gauge)) = collect(&agg) else {
            panic!("expected i64 gauge data");
        };
        assert!(gauge.data_points.is_empty());
    }

    #[test]
    fn histogram_bins_by_boundary() {
        let agg = AggregateBuilder::<i64>::new(Temporality::Delta, None)
            .explicit_bucket_histogram(vec![5.0, 50.0], true);
        for value in [1, 5, 6, 100] {
            agg.measure.call(value, &[]);
        }

        let AggregatedData::I64(MetricData::Histogram(histogram)) = collect(&agg) else {
            panic!("expected i64 histogram data");
        };
        assert_eq!(histogram.data_points.len(), 1);
        let point = &histogram.data_points[0];
        assert_eq!(point.count, 4);
        assert_eq!(point.bucket_counts, vec![2, 1, 1]);
        assert_eq!(point.sum, 112);
        assert_eq!(point.min, Some(1));
        assert_eq!(point.max, Some(100));
    }

    #[test]
    fn filter_projects_attributes_before_aggregation() {
        let filter: Filter = Arc::new(|kv: &KeyValue| kv.key.as_str() != "drop");
        let agg = AggregateBuilder::<i64>::new(Temporality::Delta, Some(filter)).sum(true);
        agg.measure.call(1, &[KeyValue::new("keep", 1), KeyValue::new("drop", 1)]);
        agg.measure.call(1, &[KeyValue::new("keep", 1), KeyValue::new("drop", 2)]);

        let AggregatedData::I64(MetricData::Sum(sum)) = collect(&agg) else {
            panic!("expected i64 sum data");
        };
        assert_eq!(sum.data_points.len(), 1);
        assert_eq!(sum.data_points[0].value, 2);
        assert_eq!(sum.data_points[0].attributes.len(), 1);
    }

    #[test]
    fn range_test_rejects_invalid_values() {
        assert!(range_test(1.0, InstrumentKind::Counter));
        assert!(range_test(0.0, InstrumentKind::Counter));
        assert!(!range_test(-1.0, InstrumentKind::Counter));
        assert!(!range_test(-0.5, InstrumentKind::Histogram));
        assert!(range_test(-1.0, InstrumentKind::UpDownCounter));
        assert!(range_test(-1.0, InstrumentKind::Gauge));

        for kind in [
            InstrumentKind::Counter,
            InstrumentKind::UpDownCounter,
            InstrumentKind::Histogram,
            InstrumentKind::Gauge,
        ] {
            assert!(!range_test(f64::NAN, kind));
            assert!(!range_test(f64::INFINITY, kind));
            assert!(!range_test(f64::NEG_INFINITY, kind));
        }

        assert!(!range_test(-1, InstrumentKind::Counter));
        assert!(range_test(-1, InstrumentKind::UpDownCounter));
    }
}
