//! Types produced by a collection cycle.

use std::time::SystemTime;

use crate::attribute_set::AttributeSet;
use crate::descriptor::Descriptor;

mod temporality;

pub use temporality::Temporality;

/// The collection timestamps for one reader pipeline.
///
/// `start` is fixed when the pipeline is created, `last` is the time of the
/// previous collection cycle and `now` is the time of the current one. Delta
/// streams are stamped with the `(last, now]` window, cumulative streams with
/// `(start, now]`.
#[derive(Clone, Copy, Debug)]
pub struct Sequence {
    /// When the pipeline started observing.
    pub start: SystemTime,
    /// When the previous collection cycle ran.
    pub last: SystemTime,
    /// When the current collection cycle runs.
    pub now: SystemTime,
}

/// A collected stream of aggregated data for one instrument view.
#[derive(Debug)]
pub struct Metric {
    /// The instrument descriptor, after any view rewrites.
    pub descriptor: Descriptor,
    /// The aggregated data.
    pub data: AggregatedData,
}

/// Aggregated data tagged with its numeric type.
#[derive(Debug)]
pub enum AggregatedData {
    /// Data recorded by an `i64` instrument.
    I64(MetricData<i64>),
    /// Data recorded by an `f64` instrument.
    F64(MetricData<f64>),
}

impl From<MetricData<i64>> for AggregatedData {
    fn from(data: MetricData<i64>) -> Self {
        AggregatedData::I64(data)
    }
}

impl From<MetricData<f64>> for AggregatedData {
    fn from(data: MetricData<f64>) -> Self {
        AggregatedData::F64(data)
    }
}

/// The aggregated data of one instrument view.
#[derive(Debug)]
pub enum MetricData<T> {
    /// A summed stream.
    Sum(SumData<T>),
    /// A last-value stream.
    Gauge(GaugeData<T>),
    /// A bucketed distribution stream.
    Histogram(HistogramData<T>),
}

/// A summed stream of data points.
#[derive(Debug)]
pub struct SumData<T> {
    /// The collected data points, one per active series.
    pub data_points: Vec<SumDataPoint<T>>,
    /// When the reported window began.
    pub start_time: SystemTime,
    /// When the reported window ended.
    pub time: SystemTime,
    /// How the window relates to previous cycles.
    pub temporality: Temporality,
    /// Whether the sum only ever increases.
    pub is_monotonic: bool,
}

/// A single summed series.
#[derive(Clone, Debug)]
pub struct SumDataPoint<T> {
    /// The attributes identifying the series.
    pub attributes: AttributeSet,
    /// The summed value.
    pub value: T,
}

/// A last-value stream of data points.
///
/// Gauge streams always report deltas: a series only appears in cycles where
/// it was written to.
#[derive(Debug)]
pub struct GaugeData<T> {
    /// The collected data points, one per series written this window.
    pub data_points: Vec<GaugeDataPoint<T>>,
    /// When the reported window began.
    pub start_time: SystemTime,
    /// When the reported window ended.
    pub time: SystemTime,
}

/// A single last-value series.
#[derive(Clone, Debug)]
pub struct GaugeDataPoint<T> {
    /// The attributes identifying the series.
    pub attributes: AttributeSet,
    /// The last value written during the window.
    pub value: T,
}

/// A bucketed distribution stream of data points.
#[derive(Debug)]
pub struct HistogramData<T> {
    /// The collected data points, one per active series.
    pub data_points: Vec<HistogramDataPoint<T>>,
    /// When the reported window began.
    pub start_time: SystemTime,
    /// When the reported window ended.
    pub time: SystemTime,
    /// How the window relates to previous cycles.
    pub temporality: Temporality,
}

/// A single distribution series.
#[derive(Clone, Debug)]
pub struct HistogramDataPoint<T> {
    /// The attributes identifying the series.
    pub attributes: AttributeSet,
    /// The number of measurements recorded.
    pub count: u64,
    /// The upper bucket boundaries.
    ///
    /// A measurement `m` lands in bucket `i` when
    /// `bounds[i-1] < m <= bounds[i]`, with a final implicit bucket above the
    /// last boundary.
    pub bounds: Vec<f64>,
    /// The number of measurements per bucket, one longer than `bounds`.
    pub bucket_counts: Vec<u64>,
    /// The smallest measurement recorded, if min/max recording is enabled.
    pub min: Option<T>,
    /// The largest measurement recorded, if min/max recording is enabled.
    pub max: Option<T>,
    /// The sum of all measurements recorded.
    pub sum: T,
}
