//! Instrument identity and configuration.

use std::borrow::Cow;

/// The kind of measurements an instrument makes.
///
/// The kind determines which values are valid inputs and which aggregation
/// applies when a view does not override it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// A monotonically increasing sum of measurements.
    Counter,
    /// A sum of measurements that may go up or down.
    UpDownCounter,
    /// A distribution of measurements.
    Histogram,
    /// The most recent measurement.
    Gauge,
}

/// The numeric type an instrument records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumberKind {
    /// Signed 64-bit integers.
    I64,
    /// 64-bit floating point numbers.
    F64,
}

/// Describes a single instrument as seen by the caller.
///
/// Views may rewrite the descriptor per reader, so the descriptor attached to
/// collected data can differ from the one the instrument was created with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    name: Cow<'static, str>,
    kind: InstrumentKind,
    number_kind: NumberKind,
    unit: Cow<'static, str>,
    description: Cow<'static, str>,
}

impl Descriptor {
    /// Create a new descriptor with an empty unit and description.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        kind: InstrumentKind,
        number_kind: NumberKind,
    ) -> Self {
        Descriptor {
            name: name.into(),
            kind,
            number_kind,
            unit: Cow::Borrowed(""),
            description: Cow::Borrowed(""),
        }
    }

    /// Set the unit of measure.
    pub fn with_unit(mut self, unit: impl Into<Cow<'static, str>>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the human readable description.
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    /// The instrument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of instrument.
    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    /// The numeric type the instrument records.
    pub fn number_kind(&self) -> NumberKind {
        self.number_kind
    }

    /// The unit of measure.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The human readable description.
    pub fn description(&self) -> &str {
        &self.description
    }
}
