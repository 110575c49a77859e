//! Equivalence classification of source and destination tables.
//!
//! Descriptors are fed in incrementally as catalogs are drained instance by
//! instance. Each one joins the class with a matching fingerprint or starts a
//! new one. Classes are keyed and members stored in ordered collections, so
//! the final grouping (and its order) is independent of arrival order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::core::{Role, TableDescriptor};
use crate::fingerprint::{MarkerFlags, StructuralFingerprint, TableShape};

/// Tables sharing one structural fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceClass {
    pub fingerprint: StructuralFingerprint,

    /// Source tables, sorted.
    pub sources: Vec<TableDescriptor>,

    /// Destination tables, sorted.
    pub dests: Vec<TableDescriptor>,

    /// Marker columns present on the destination tables.
    pub markers: MarkerFlags,
}

impl EquivalenceClass {
    /// Class with destination tables but no source table.
    pub fn is_dest_only(&self) -> bool {
        self.sources.is_empty()
    }

    /// Class with source tables that have no structural counterpart.
    pub fn is_source_only(&self) -> bool {
        self.dests.is_empty()
    }

    /// Total member count across both sides.
    pub fn len(&self) -> usize {
        self.sources.len() + self.dests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct ClassBuilder {
    sources: BTreeSet<TableDescriptor>,
    dests: BTreeSet<TableDescriptor>,
    markers: MarkerFlags,
}

/// Incremental classifier.
#[derive(Debug, Default)]
pub struct Classifier {
    classes: BTreeMap<StructuralFingerprint, ClassBuilder>,
    seen: HashMap<(Role, TableDescriptor), StructuralFingerprint>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place one descriptor into its class.
    ///
    /// Returns `false` when the descriptor was already classified for this
    /// role; the repeated insertion is ignored so a descriptor never lands in
    /// two classes.
    pub fn insert(&mut self, descriptor: TableDescriptor, shape: &TableShape, role: Role) -> bool {
        let key = (role, descriptor);
        if let Some(existing) = self.seen.get(&key) {
            if *existing != shape.fingerprint {
                warn!(
                    "Ignoring {} table {}: already classified with fingerprint {} (now {})",
                    role,
                    key.1,
                    existing.short(),
                    shape.fingerprint.short()
                );
            } else {
                debug!("Ignoring duplicate {} table {}", role, key.1);
            }
            return false;
        }

        let class = self.classes.entry(shape.fingerprint.clone()).or_default();
        match role {
            Role::Source => {
                class.sources.insert(key.1.clone());
            }
            Role::Dest => {
                class.dests.insert(key.1.clone());
                class.markers = class.markers.union(shape.markers);
            }
        }
        self.seen.insert(key, shape.fingerprint.clone());
        true
    }

    /// Number of descriptors classified so far.
    pub fn table_count(&self) -> usize {
        self.seen.len()
    }

    /// Consume the classifier and return all classes, ordered by fingerprint.
    pub fn finish(self) -> Vec<EquivalenceClass> {
        self.classes
            .into_iter()
            .map(|(fingerprint, b)| EquivalenceClass {
                fingerprint,
                sources: b.sources.into_iter().collect(),
                dests: b.dests.into_iter().collect(),
                markers: b.markers,
            })
            .collect()
    }
}

/// Classify a complete set of descriptors in one call.
pub fn classify<I>(descriptors: I) -> Vec<EquivalenceClass>
where
    I: IntoIterator<Item = (TableDescriptor, TableShape, Role)>,
{
    let mut classifier = Classifier::new();
    for (descriptor, shape, role) in descriptors {
        classifier.insert(descriptor, &shape, role);
    }
    classifier.finish()
}
