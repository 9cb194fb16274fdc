//! Explicit-bucket histogram aggregation.

use std::mem;
use std::sync::{Mutex, PoisonError};

use crate::attributes::KeyValue;
use crate::data::{
    AggregatedData, HistogramData, HistogramDataPoint, MetricData, Sequence, Temporality,
};

use super::aggregate::{AttributeSetFilter, ComputeAggregation, Measure};
use super::{Aggregator, Number, ValueMap};

/// The accumulated distribution of one series.
#[derive(Clone, Default, Debug)]
pub(crate) struct Buckets<T> {
    counts: Vec<u64>,
    count: u64,
    total: T,
    min: T,
    max: T,
}

impl<T: Number> Buckets<T> {
    fn new(size: usize) -> Buckets<T> {
        Buckets {
            counts: vec![0; size],
            min: T::max(),
            max: T::min(),
            ..Default::default()
        }
    }

    fn bin(&mut self, idx: usize, value: T) {
        self.counts[idx] += 1;
        self.count += 1;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    fn sum(&mut self, value: T) {
        self.total += value;
    }

    /// Folds `other` into `self` bucket by bucket.
    ///
    /// Merging two windows is equivalent to having recorded all of their
    /// measurements into a single window.
    fn merge(&mut self, other: Buckets<T>) {
        for (count, other_count) in self.counts.iter_mut().zip(other.counts) {
            *count += other_count;
        }
        self.count += other.count;
        self.total += other.total;
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
    }
}

/// The bucket state of one series behind its lock.
pub(crate) struct HistogramTracker<T> {
    buckets: Mutex<Buckets<T>>,
}

impl<T: Number> Aggregator for HistogramTracker<T> {
    type InitConfig = usize;
    /// The measurement and the index of the bucket it falls into. The index
    /// only depends on the boundaries, so it is computed before any lock is
    /// taken.
    type PreComputedValue = (T, usize);
    type Snapshot = Buckets<T>;

    fn create(count: &usize) -> Self {
        HistogramTracker {
            buckets: Mutex::new(Buckets::new(*count)),
        }
    }

    fn update(&self, (value, index): (T, usize)) {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        buckets.bin(index, value);
        buckets.sum(value);
    }

    fn snapshot(&self, reset: bool) -> Option<Buckets<T>> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if buckets.count == 0 {
            return None;
        }
        if reset {
            let empty = Buckets::new(buckets.counts.len());
            Some(mem::replace(&mut *buckets, empty))
        } else {
            Some(buckets.clone())
        }
    }

    fn merge(pending: &mut Option<Buckets<T>>, snapshot: Buckets<T>) {
        match pending {
            Some(prior) => prior.merge(snapshot),
            None => *pending = Some(snapshot),
        }
    }
}

/// Summarizes measurements as a bucketed distribution per attribute set.
pub(crate) struct Histogram<T: Number> {
    value_map: ValueMap<HistogramTracker<T>>,
    bounds: Vec<f64>,
    record_min_max: bool,
    filter: AttributeSetFilter,
    temporality: Temporality,
}

impl<T: Number> Histogram<T> {
    pub(crate) fn new(
        temporality: Temporality,
        filter: AttributeSetFilter,
        mut bounds: Vec<f64>,
        record_min_max: bool,
    ) -> Self {
        bounds.retain(|v| !v.is_nan());
        bounds.sort_by(|a, b| a.partial_cmp(b).expect("NaNs filtered out"));

        Histogram {
            value_map: ValueMap::new(bounds.len() + 1),
            bounds,
            record_min_max,
            filter,
            temporality,
        }
    }
}

impl<T: Number> Measure<T> for Histogram<T> {
    fn call(&self, measurement: T, attrs: &[KeyValue]) {
        let float = measurement.into_float();
        // A measurement lands in the first bucket whose upper boundary is
        // not below it: bounds[i-1] < value <= bounds[i], with one implicit
        // bucket past the last boundary.
        let index = self.bounds.partition_point(|&bound| bound < float);

        self.filter.apply(attrs, |filtered| {
            self.value_map.measure((measurement, index), filtered);
        });
    }
}

impl<T: Number> ComputeAggregation for Histogram<T> {
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
            .produce(&mut data_points, |attributes, buckets| HistogramDataPoint {
                attributes,
                count: buckets.count,
                bounds: self.bounds.clone(),
                bucket_counts: buckets.counts,
                min: self.record_min_max.then_some(buckets.min),
                max: self.record_min_max.then_some(buckets.max),
                sum: buckets.total,
            });

        T::make_aggregated(MetricData::Histogram(HistogramData {
            data_points,
            start_time,
            time: sequence.now,
            temporality: self.temporality,
        }))
    }
}
