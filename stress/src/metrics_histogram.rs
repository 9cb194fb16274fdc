/*
    Stress test results:
    OS: Ubuntu 22.04.4 LTS (6.5.0-1025-azure)
    Hardware: Intel(R) Xeon(R) Platinum 8370C CPU @ 2.80GHz, 16 vCPUs
    RAM: 64.0 GB
    ~7.3 M/sec
*/

use lazy_static::lazy_static;
use rand::{rngs, Rng, SeedableRng};
use std::cell::RefCell;
use tally::{
    Aggregation, Descriptor, Histogram, InstrumentKind, KeyValue, NumberKind, Pipelines, ViewEntry,
};

mod throughput;

lazy_static! {
    static ref PIPELINES: Pipelines = Pipelines::new(1);
    static ref ATTRIBUTE_VALUES: [&'static str; 10] = [
        "value1", "value2", "value3", "value4", "value5", "value6", "value7", "value8", "value9",
        "value10"
    ];
    static ref HISTOGRAM: Histogram<f64> = {
        let descriptor = Descriptor::new(
            "request_latency",
            InstrumentKind::Histogram,
            NumberKind::F64,
        );
        let entry = ViewEntry::new(descriptor.clone()).with_aggregation(
            Aggregation::ExplicitBucketHistogram {
                boundaries: vec![50.0, 100.0, 250.0, 500.0, 1000.0],
                record_min_max: true,
            },
        );
        PIPELINES.f64_histogram(descriptor, vec![Some(entry)])
    };
}

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_os_rng());
}

fn main() {
    throughput::test_throughput(test_histogram);
}

fn test_histogram() {
    let len = ATTRIBUTE_VALUES.len();
    let (rands, value) = CURRENT_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        (
            [
                rng.random_range(0..len),
                rng.random_range(0..len),
                rng.random_range(0..len),
            ],
            rng.random_range(0.0..1100.0),
        )
    });
    let index_first_attribute = rands[0];
    let index_second_attribute = rands[1];
    let index_third_attribute = rands[2];

    // each attribute has 10 possible values, so there are 1000 possible combinations (time-series)
    HISTOGRAM.record(
        value,
        &[
            KeyValue::new("attribute1", ATTRIBUTE_VALUES[index_first_attribute]),
            KeyValue::new("attribute2", ATTRIBUTE_VALUES[index_second_attribute]),
            KeyValue::new("attribute3", ATTRIBUTE_VALUES[index_third_attribute]),
        ],
    );
}
