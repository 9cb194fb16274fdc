/// Defines how the time window of reported aggregates relates to previous
/// collection cycles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Hash)]
pub enum Temporality {
    /// Aggregates collected data since the previous collection cycle.
    ///
    /// The aggregation resets after every cycle, so each reported window is
    /// independent of the ones before it.
    Delta,

    /// Aggregates collected data over the whole lifetime of the instrument.
    #[default]
    Cumulative,
}
