//! Aggregation internals shared by all instrument kinds.

pub(crate) mod aggregate;
mod histogram;
mod last_value;
mod sum;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::attribute_set::AttributeSet;
use crate::attributes::KeyValue;
use crate::data::{AggregatedData, MetricData};
use crate::descriptor::NumberKind;

/// The numeric types instruments can record.
pub(crate) trait Number:
    Add<Output = Self>
    + AddAssign
    + PartialOrd
    + fmt::Debug
    + Clone
    + Copy
    + PartialEq
    + Default
    + Send
    + Sync
    + 'static
    + AtomicallyUpdate<Self>
{
    /// The smallest representable value.
    fn min() -> Self;
    /// The largest representable value.
    fn max() -> Self;
    /// Casts to `f64`. May have precision loss at high values.
    fn into_float(self) -> f64;
    /// The runtime tag for this numeric type.
    fn kind() -> NumberKind;
    /// Wraps collected data in the matching [`AggregatedData`] variant.
    fn make_aggregated(data: MetricData<Self>) -> AggregatedData;
}

impl Number for i64 {
    fn min() -> Self {
        i64::MIN
    }

    fn max() -> Self {
        i64::MAX
    }

    fn into_float(self) -> f64 {
        // May have precision loss at high values
        self as f64
    }

    fn kind() -> NumberKind {
        NumberKind::I64
    }

    fn make_aggregated(data: MetricData<Self>) -> AggregatedData {
        data.into()
    }
}

impl Number for f64 {
    fn min() -> Self {
        f64::MIN
    }

    fn max() -> Self {
        f64::MAX
    }

    fn into_float(self) -> f64 {
        self
    }

    fn kind() -> NumberKind {
        NumberKind::F64
    }

    fn make_aggregated(data: MetricData<Self>) -> AggregatedData {
        data.into()
    }
}

/// A lock-free or lock-guarded cell a number can be accumulated into.
pub(crate) trait AtomicValue<T>: Send + Sync + 'static {
    fn add(&self, value: T);
    fn get_value(&self, reset: bool) -> T;
}

/// Ties a number type to the atomic cell that can accumulate it.
pub(crate) trait AtomicallyUpdate<T> {
    type AtomicValue: AtomicValue<T>;
    fn new_atomic_tracker() -> AtomicTracker<T, Self::AtomicValue>;
}

/// An accumulating cell that also remembers whether it was ever written to.
///
/// `get_value(true)` hands the accumulated value to exactly one caller. A
/// write that races with the reset is either included in the returned value
/// or left behind with the flag re-armed for the next cycle, so no update is
/// lost. A reset that captures a racing write may leave a zero behind, which
/// shows up as one spurious zero-valued delta.
pub(crate) struct AtomicTracker<N, T: AtomicValue<N>> {
    value: T,
    has_value: AtomicBool,
    _number: PhantomData<N>,
}

impl<N, T: AtomicValue<N>> AtomicTracker<N, T> {
    fn new(value: T) -> Self {
        AtomicTracker {
            value,
            has_value: AtomicBool::new(false),
            _number: PhantomData,
        }
    }

    pub(crate) fn add(&self, value: N) {
        self.value.add(value);
        self.has_value.store(true, Ordering::Release);
    }

    pub(crate) fn get_value(&self, reset: bool) -> Option<N> {
        if reset {
            self.has_value
                .swap(false, Ordering::AcqRel)
                .then(|| self.value.get_value(true))
        } else {
            self.has_value
                .load(Ordering::Acquire)
                .then(|| self.value.get_value(false))
        }
    }
}

impl AtomicValue<i64> for AtomicI64 {
    fn add(&self, value: i64) {
        self.fetch_add(value, Ordering::Relaxed);
    }

    fn get_value(&self, reset: bool) -> i64 {
        if reset {
            self.swap(0, Ordering::Relaxed)
        } else {
            self.load(Ordering::Relaxed)
        }
    }
}

impl AtomicallyUpdate<i64> for i64 {
    type AtomicValue = AtomicI64;

    fn new_atomic_tracker() -> AtomicTracker<i64, Self::AtomicValue> {
        AtomicTracker::new(AtomicI64::new(0))
    }
}

/// No native atomic for f64, so this wraps the value in a mutex.
pub(crate) struct F64AtomicValue {
    inner: Mutex<f64>,
}

impl F64AtomicValue {
    fn new() -> Self {
        F64AtomicValue {
            inner: Mutex::new(0.0),
        }
    }
}

impl AtomicValue<f64> for F64AtomicValue {
    fn add(&self, value: f64) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += value;
    }

    fn get_value(&self, reset: bool) -> f64 {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let value = *guard;
        if reset {
            *guard = 0.0;
        }
        value
    }
}

impl AtomicallyUpdate<f64> for f64 {
    type AtomicValue = F64AtomicValue;

    fn new_atomic_tracker() -> AtomicTracker<f64, Self::AtomicValue> {
        AtomicTracker::new(F64AtomicValue::new())
    }
}

/// The live accumulator state kept per series.
///
/// `update` must tolerate concurrent callers. `snapshot(true)` closes the
/// current window and resets the live state; `snapshot(false)` copies it
/// without resetting. Both return `None` when nothing was recorded. `merge`
/// folds a freshly taken snapshot into one still pending from an earlier
/// cycle.
pub(crate) trait Aggregator: Send + Sync + 'static {
    /// Configuration fixed when the series is created.
    type InitConfig: Send + Sync;
    /// The per-measurement input, possibly pre-processed by the caller.
    type PreComputedValue;
    /// The owned result of closing or copying a window.
    type Snapshot: Send;

    fn create(init: &Self::InitConfig) -> Self;
    fn update(&self, value: Self::PreComputedValue);
    fn snapshot(&self, reset: bool) -> Option<Self::Snapshot>;
    fn merge(pending: &mut Option<Self::Snapshot>, snapshot: Self::Snapshot);
}

/// Pairs the live accumulator of a series with the checkpoint cell the
/// two collection phases hand data through.
struct SeriesTracker<A: Aggregator> {
    live: A,
    pending: Mutex<Option<A::Snapshot>>,
}

impl<A: Aggregator> SeriesTracker<A> {
    fn new(init: &A::InitConfig) -> Self {
        SeriesTracker {
            live: A::create(init),
            pending: Mutex::new(None),
        }
    }

    fn update(&self, value: A::PreComputedValue) {
        self.live.update(value);
    }

    /// Finalizes the current window into the pending cell.
    ///
    /// With `reset` the live state is drained and folded into whatever is
    /// already pending, so two snapshot phases without an intervening
    /// produce lose nothing. Without `reset` the running state replaces the
    /// pending value outright; merging here would double count.
    fn checkpoint(&self, reset: bool) {
        if reset {
            if let Some(snapshot) = self.live.snapshot(true) {
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                A::merge(&mut pending, snapshot);
            }
        } else {
            let snapshot = self.live.snapshot(false);
            *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = snapshot;
        }
    }

    fn take_pending(&self) -> Option<A::Snapshot> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// All series of one aggregation path, keyed by attribute set.
///
/// Lookups of an existing series take the shared lock only. The first write
/// to a new series takes the exclusive lock once to insert its tracker, and
/// a concurrent first write to the same series lands in the existing entry
/// instead of replacing it. Entries are never removed while the instrument
/// is alive.
pub(crate) struct ValueMap<A: Aggregator> {
    trackers: RwLock<HashMap<AttributeSet, Arc<SeriesTracker<A>>>>,
    config: A::InitConfig,
}

impl<A: Aggregator> ValueMap<A> {
    pub(crate) fn new(config: A::InitConfig) -> Self {
        ValueMap {
            trackers: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub(crate) fn measure(&self, value: A::PreComputedValue, attributes: &[KeyValue]) {
        let attrs = AttributeSet::from(attributes);

        if let Ok(trackers) = self.trackers.read() {
            if let Some(tracker) = trackers.get(&attrs) {
                tracker.update(value);
                return;
            }
        }

        let Ok(mut trackers) = self.trackers.write() else {
            return;
        };
        match trackers.entry(attrs) {
            Entry::Occupied(occupied) => occupied.get().update(value),
            Entry::Vacant(vacant) => {
                let tracker = Arc::new(SeriesTracker::new(&self.config));
                tracker.update(value);
                vacant.insert(tracker);
            }
        }
    }

    /// Phase one of collection: checkpoint every series.
    pub(crate) fn checkpoint(&self, reset: bool) {
        let Ok(trackers) = self.trackers.read() else {
            return;
        };
        for tracker in trackers.values() {
            tracker.checkpoint(reset);
        }
    }

    /// Phase two of collection: drain the pending window of every series
    /// into `dest`. Series with nothing pending are skipped.
    pub(crate) fn produce<P>(
        &self,
        dest: &mut Vec<P>,
        mut point: impl FnMut(AttributeSet, A::Snapshot) -> P,
    ) {
        let Ok(trackers) = self.trackers.read() else {
            return;
        };
        dest.reserve(trackers.len());
        for (attrs, tracker) in trackers.iter() {
            if let Some(snapshot) = tracker.take_pending() {
                dest.push(point(attrs.clone(), snapshot));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::sum::Increment;
    use super::*;

    #[test]
    fn can_add_and_get_i64_atomic_value() {
        let tracker = i64::new_atomic_tracker();
        tracker.add(15);
        tracker.add(10);
        assert_eq!(tracker.get_value(false), Some(25));
    }

    #[test]
    fn can_reset_i64_atomic_value() {
        let tracker = i64::new_atomic_tracker();
        tracker.add(15);
        assert_eq!(tracker.get_value(true), Some(15));
        assert_eq!(tracker.get_value(true), None);
    }

    #[test]
    fn can_add_and_get_f64_atomic_value() {
        let tracker = f64::new_atomic_tracker();
        tracker.add(15.3);
        tracker.add(10.4);
        let value = tracker.get_value(false).unwrap();
        assert!((value - 25.7).abs() < f64::EPSILON);
    }

    #[test]
    fn can_reset_f64_atomic_value() {
        let tracker = f64::new_atomic_tracker();
        tracker.add(15.5);
        let value = tracker.get_value(true).unwrap();
        assert!((value - 15.5).abs() < f64::EPSILON);
        assert_eq!(tracker.get_value(true), None);
    }

    #[test]
    fn untouched_tracker_reports_no_value() {
        let tracker = i64::new_atomic_tracker();
        assert_eq!(tracker.get_value(false), None);
        assert_eq!(tracker.get_value(true), None);
    }

    fn drain(map: &ValueMap<Increment<i64>>) -> Vec<(AttributeSet, i64)> {
        let mut points = Vec::new();
        map.produce(&mut points, |attrs, value| (attrs, value));
        points
    }

    #[test]
    fn one_tracker_per_attribute_set() {
        let map = ValueMap::<Increment<i64>>::new(());
        map.measure(1, &[KeyValue::new("a", 1), KeyValue::new("b", 2)]);
        map.measure(2, &[KeyValue::new("b", 2), KeyValue::new("a", 1)]);
        map.measure(10, &[KeyValue::new("a", 2)]);

        map.checkpoint(true);
        let mut points = drain(&map);
        points.sort_by_key(|(_, value)| *value);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].1, 3);
        assert_eq!(points[1].1, 10);
    }

    #[test]
    fn delta_checkpoints_merge_into_pending() {
        let map = ValueMap::<Increment<i64>>::new(());
        map.measure(5, &[]);
        map.checkpoint(true);
        map.measure(3, &[]);
        map.checkpoint(true);

        let points = drain(&map);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].1, 8);
        assert!(drain(&map).is_empty());
    }

    #[test]
    fn cumulative_checkpoints_replace_pending() {
        let map = ValueMap::<Increment<i64>>::new(());
        map.measure(5, &[]);
        map.checkpoint(false);
        map.checkpoint(false);

        let points = drain(&map);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].1, 5);
    }

    #[test]
    fn concurrent_first_writes_share_one_tracker() {
        let map = Arc::new(ValueMap::<Increment<i64>>::new(()));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let map = Arc::clone(&map);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    map.measure(1, &[KeyValue::new("shared", true)]);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        map.checkpoint(true);
        let points = drain(&map);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].1, 4000);
    }
}
