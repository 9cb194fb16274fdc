//! Per-reader view configuration for instruments.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::aggregation::Aggregation;
use crate::attributes::{Key, KeyValue};
use crate::data::Temporality;
use crate::descriptor::Descriptor;

/// A predicate deciding whether an attribute is kept on measurements.
pub type Filter = Arc<dyn Fn(&KeyValue) -> bool + Send + Sync>;

/// How one reader pipeline sees one instrument.
///
/// A view entry rewrites the instrument's descriptor, picks the aggregation
/// and temporality, and optionally projects attributes down to a smaller
/// set. Measurements whose attribute sets collapse under the projection are
/// merged by the aggregation.
pub struct ViewEntry {
    descriptor: Descriptor,
    aggregation: Aggregation,
    temporality: Temporality,
    filter: Option<Filter>,
}

impl ViewEntry {
    /// Create an entry reporting `descriptor` with the default aggregation
    /// for its kind, cumulative temporality and no attribute projection.
    pub fn new(descriptor: Descriptor) -> Self {
        let aggregation = Aggregation::default_for(descriptor.kind());
        ViewEntry {
            descriptor,
            aggregation,
            temporality: Temporality::default(),
            filter: None,
        }
    }

    /// Override the aggregation.
    ///
    /// The override is validated when the instrument is built; an invalid
    /// aggregation drops the instrument for this reader.
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Override the temporality. Last-value aggregations ignore this and
    /// always collect as delta.
    pub fn with_temporality(mut self, temporality: Temporality) -> Self {
        self.temporality = temporality;
        self
    }

    /// Keep only the attributes matching `filter` on every measurement.
    pub fn with_attribute_filter(
        mut self,
        filter: impl Fn(&KeyValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Keep only the attributes whose keys appear in `keys`.
    pub fn with_allowed_attribute_keys(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        let allowed: HashSet<Key> = keys.into_iter().collect();
        self.filter = Some(Arc::new(move |kv| allowed.contains(&kv.key)));
        self
    }

    /// The descriptor this entry reports under.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub(crate) fn into_parts(self) -> (Descriptor, Aggregation, Temporality, Option<Filter>) {
        (
            self.descriptor,
            self.aggregation,
            self.temporality,
            self.filter,
        )
    }
}

impl fmt::Debug for ViewEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewEntry")
            .field("descriptor", &self.descriptor)
            .field("aggregation", &self.aggregation)
            .field("temporality", &self.temporality)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
