/*
    Stress test results:
    OS: Ubuntu 22.04.4 LTS (6.5.0-1025-azure)
    Hardware: Intel(R) Xeon(R) Platinum 8370C CPU @ 2.80GHz, 16 vCPUs
    RAM: 64.0 GB
    ~9.5 M/sec
*/

use lazy_static::lazy_static;
use rand::{rngs, Rng, SeedableRng};
use std::cell::RefCell;
use tally::{Counter, Descriptor, InstrumentKind, KeyValue, NumberKind, Pipelines, ViewEntry};

mod throughput;

lazy_static! {
    static ref PIPELINES: Pipelines = Pipelines::new(1);
    static ref ATTRIBUTE_VALUES: [&'static str; 10] = [
        "value1", "value2", "value3", "value4", "value5", "value6", "value7", "value8", "value9",
        "value10"
    ];
    static ref COUNTER: Counter<i64> = {
        let descriptor =
            Descriptor::new("request_count", InstrumentKind::Counter, NumberKind::I64);
        PIPELINES.i64_counter(descriptor.clone(), vec![Some(ViewEntry::new(descriptor))])
    };
}

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_os_rng());
}

fn main() {
    throughput::test_throughput(test_counter);
}

fn test_counter() {
    let len = ATTRIBUTE_VALUES.len();
    let rands = CURRENT_RNG.with(|rng| {
        let mut rng = rng.borrow_mut();
        [
            rng.random_range(0..len),
            rng.random_range(0..len),
            rng.random_range(0..len),
        ]
    });
    let index_first_attribute = rands[0];
    let index_second_attribute = rands[1];
    let index_third_attribute = rands[2];

    // each attribute has 10 possible values, so there are 1000 possible combinations (time-series)
    COUNTER.add(
        1,
        &[
            KeyValue::new("attribute1", ATTRIBUTE_VALUES[index_first_attribute]),
            KeyValue::new("attribute2", ATTRIBUTE_VALUES[index_second_attribute]),
            KeyValue::new("attribute3", ATTRIBUTE_VALUES[index_third_attribute]),
        ],
    );
}
