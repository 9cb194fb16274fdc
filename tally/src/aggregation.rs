//! Aggregation strategies for view pipelines.

use crate::descriptor::InstrumentKind;
use crate::error::{MetricError, MetricResult};

/// The way measurements are summarized into a stream of data points.
#[derive(Clone, Debug, PartialEq)]
pub enum Aggregation {
    /// An aggregation that summarizes a set of measurements as their sum.
    Sum {
        /// Whether the sum only ever increases.
        ///
        /// Monotonic sums reject negative measurements at the instrument.
        monotonic: bool,
    },

    /// An aggregation that summarizes a set of measurements as the last one
    /// recorded. Last-value streams are always collected as delta.
    LastValue,

    /// An aggregation that summarizes a set of measurements as a histogram
    /// with explicitly defined bucket boundaries.
    ExplicitBucketHistogram {
        /// The increasing bucket boundary values.
        ///
        /// Boundary values define bucket upper bounds. A measurement falls
        /// into bucket `i` when it is greater than `boundaries[i-1]` and
        /// less than or equal to `boundaries[i]`. An implicit final bucket
        /// holds everything above the last boundary.
        boundaries: Vec<f64>,

        /// Whether to record min and max values alongside the buckets.
        record_min_max: bool,
    },
}

impl Aggregation {
    /// The default aggregation for each instrument kind.
    pub fn default_for(kind: InstrumentKind) -> Aggregation {
        match kind {
            InstrumentKind::Counter => Aggregation::Sum { monotonic: true },
            InstrumentKind::UpDownCounter => Aggregation::Sum { monotonic: false },
            InstrumentKind::Gauge => Aggregation::LastValue,
            InstrumentKind::Histogram => Aggregation::ExplicitBucketHistogram {
                boundaries: vec![
                    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0,
                    5000.0, 7500.0, 10000.0,
                ],
                record_min_max: true,
            },
        }
    }

    /// Validate the aggregation's configuration.
    pub fn validate(&self) -> MetricResult<()> {
        match self {
            Aggregation::Sum { .. } | Aggregation::LastValue => Ok(()),
            Aggregation::ExplicitBucketHistogram { boundaries, .. } => {
                for x in boundaries {
                    if x.is_nan() {
                        return Err(MetricError::Config(
                            "explicit bucket histogram boundaries must not contain NaN".into(),
                        ));
                    }
                }
                if boundaries.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(MetricError::Config(format!(
                        "explicit bucket histogram boundaries must be strictly increasing: {boundaries:?}",
                    )));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_instrument_kinds() {
        assert_eq!(
            Aggregation::default_for(InstrumentKind::Counter),
            Aggregation::Sum { monotonic: true }
        );
        assert_eq!(
            Aggregation::default_for(InstrumentKind::UpDownCounter),
            Aggregation::Sum { monotonic: false }
        );
        assert_eq!(
            Aggregation::default_for(InstrumentKind::Gauge),
            Aggregation::LastValue
        );
        assert!(matches!(
            Aggregation::default_for(InstrumentKind::Histogram),
            Aggregation::ExplicitBucketHistogram { record_min_max: true, .. }
        ));
    }

    #[test]
    fn validate_ok() {
        assert!(Aggregation::Sum { monotonic: true }.validate().is_ok());
        assert!(Aggregation::LastValue.validate().is_ok());
        assert!(Aggregation::ExplicitBucketHistogram {
            boundaries: vec![0.0, 2.5, 10.0],
            record_min_max: true,
        }
        .validate()
        .is_ok());
        assert!(Aggregation::ExplicitBucketHistogram {
            boundaries: vec![],
            record_min_max: false,
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn validate_rejects_bad_boundaries() {
        let nan = Aggregation::ExplicitBucketHistogram {
            boundaries: vec![0.0, f64::NAN],
            record_min_max: true,
        };
        assert!(nan.validate().is_err());

        let unsorted = Aggregation::ExplicitBucketHistogram {
            boundaries: vec![10.0, 5.0],
            record_min_max: true,
        };
        assert!(unsorted.validate().is_err());

        let duplicated = Aggregation::ExplicitBucketHistogram {
            boundaries: vec![1.0, 1.0],
            record_min_max: true,
        };
        assert!(duplicated.validate().is_err());
    }
}
