//! Resolution of equivalence classes into mappings.
//!
//! A class with a single table on either side is already a mapping. A
//! many-to-many class is split: sources and destinations with the same table
//! name are peeled off as one-to-one pairs first, and the remainder is treated
//! as a consolidation of differently named shards into one destination.
//! Anything the name match cannot settle is reported as unresolved instead of
//! guessed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::EquivalenceClass;
use crate::core::{Role, TableDescriptor};

/// Resolved correspondence between source and destination tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mapping {
    OneToOne {
        source: TableDescriptor,
        dest: TableDescriptor,
    },

    /// Several source shards consolidated into one destination table.
    ManyToOne {
        sources: Vec<TableDescriptor>,
        dest: TableDescriptor,
    },

    /// One source table copied into several destination tables.
    OneToMany {
        source: TableDescriptor,
        dests: Vec<TableDescriptor>,
    },

    /// Unresolved: needs name-based disambiguation by an operator.
    ManyToMany {
        sources: Vec<TableDescriptor>,
        dests: Vec<TableDescriptor>,
    },

    /// Tables with no structural counterpart on the other side.
    Unmatched {
        role: Role,
        tables: Vec<TableDescriptor>,
    },
}

impl Mapping {
    /// Source tables covered by this mapping.
    pub fn sources(&self) -> Vec<&TableDescriptor> {
        match self {
            Mapping::OneToOne { source, .. } | Mapping::OneToMany { source, .. } => vec![source],
            Mapping::ManyToOne { sources, .. } | Mapping::ManyToMany { sources, .. } => {
                sources.iter().collect()
            }
            Mapping::Unmatched { role: Role::Source, tables } => tables.iter().collect(),
            Mapping::Unmatched { role: Role::Dest, .. } => Vec::new(),
        }
    }

    /// Destination tables covered by this mapping.
    pub fn dests(&self) -> Vec<&TableDescriptor> {
        match self {
            Mapping::OneToOne { dest, .. } | Mapping::ManyToOne { dest, .. } => vec![dest],
            Mapping::OneToMany { dests, .. } | Mapping::ManyToMany { dests, .. } => {
                dests.iter().collect()
            }
            Mapping::Unmatched { role: Role::Dest, tables } => tables.iter().collect(),
            Mapping::Unmatched { role: Role::Source, .. } => Vec::new(),
        }
    }

    /// True for mappings that need operator intervention.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Mapping::ManyToMany { .. } | Mapping::Unmatched { .. })
    }

    /// Short label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Mapping::OneToOne { .. } => "one-to-one",
            Mapping::ManyToOne { .. } => "many-to-one",
            Mapping::OneToMany { .. } => "one-to-many",
            Mapping::ManyToMany { .. } => "many-to-many",
            Mapping::Unmatched { .. } => "unmatched",
        }
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |tables: Vec<&TableDescriptor>| {
            tables
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Mapping::Unmatched { role, tables } => {
                write!(f, "unmatched {}: [{}]", role, join(tables.iter().collect()))
            }
            _ => write!(
                f,
                "{}: [{}] -> [{}]",
                self.kind(),
                join(self.sources()),
                join(self.dests())
            ),
        }
    }
}

/// Split one equivalence class into mappings.
///
/// Every member of the class appears in exactly one returned mapping.
pub fn resolve(class: &EquivalenceClass) -> Vec<Mapping> {
    let sources = &class.sources;
    let dests = &class.dests;

    if sources.is_empty() || dests.is_empty() {
        if sources.is_empty() && dests.is_empty() {
            return Vec::new();
        }
        let (role, tables) = if sources.is_empty() {
            (Role::Dest, dests.clone())
        } else {
            (Role::Source, sources.clone())
        };
        return vec![Mapping::Unmatched { role, tables }];
    }

    if sources.len() <= 1 || dests.len() <= 1 {
        return vec![group(sources.clone(), dests.clone())];
    }

    let mut mappings = Vec::new();
    let mut dest_used = vec![false; dests.len()];
    let mut remaining_sources = Vec::new();

    for source in sources {
        let matched = dests
            .iter()
            .enumerate()
            .find(|(i, d)| !dest_used[*i] && d.suffix() == source.suffix())
            .map(|(i, _)| i);

        match matched {
            Some(i) => {
                dest_used[i] = true;
                mappings.push(Mapping::OneToOne {
                    source: source.clone(),
                    dest: dests[i].clone(),
                });
            }
            None => remaining_sources.push(source.clone()),
        }
    }

    let remaining_dests: Vec<TableDescriptor> = dests
        .iter()
        .zip(&dest_used)
        .filter(|(_, used)| !**used)
        .map(|(d, _)| d.clone())
        .collect();

    match (remaining_sources.len(), remaining_dests.len()) {
        (0, 0) => {}
        // One side exhausted: the leftovers are reported, not guessed.
        (0, _) | (_, 0) => mappings.push(Mapping::ManyToMany {
            sources: remaining_sources,
            dests: remaining_dests,
        }),
        (_, 1) => mappings.push(group(remaining_sources, remaining_dests)),
        _ => mappings.push(Mapping::ManyToMany {
            sources: remaining_sources,
            dests: remaining_dests,
        }),
    }

    mappings
}

/// Build a mapping for a group with at most one table on one side.
fn group(mut sources: Vec<TableDescriptor>, mut dests: Vec<TableDescriptor>) -> Mapping {
    match (sources.len(), dests.len()) {
        (1, 1) => Mapping::OneToOne {
            source: sources.remove(0),
            dest: dests.remove(0),
        },
        (_, 1) => Mapping::ManyToOne {
            sources,
            dest: dests.remove(0),
        },
        (1, _) => Mapping::OneToMany {
            source: sources.remove(0),
            dests,
        },
        _ => Mapping::ManyToMany { sources, dests },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{MarkerFlags, StructuralFingerprint};
    use std::collections::HashSet;

    fn t(dotted: &str) -> TableDescriptor {
        let parts: Vec<&str> = dotted.split('.').collect();
        TableDescriptor::new(parts[0], parts[1], parts[2])
    }

    fn class(sources: &[&str], dests: &[&str]) -> EquivalenceClass {
        let mut sources: Vec<TableDescriptor> = sources.iter().map(|s| t(s)).collect();
        let mut dests: Vec<TableDescriptor> = dests.iter().map(|s| t(s)).collect();
        sources.sort();
        dests.sort();
        EquivalenceClass {
            fingerprint: StructuralFingerprint {
                names_hash: "0".repeat(64),
                full_hash: "0".repeat(64),
            },
            sources,
            dests,
            markers: MarkerFlags::default(),
        }
    }

    /// Every class member must appear exactly once across the mappings.
    fn assert_complete(class: &EquivalenceClass, mappings: &[Mapping]) {
        let mut seen_sources = HashSet::new();
        let mut seen_dests = HashSet::new();
        for m in mappings {
            for s in m.sources() {
                assert!(seen_sources.insert(s.clone()), "duplicate source {}", s);
            }
            for d in m.dests() {
                assert!(seen_dests.insert(d.clone()), "duplicate dest {}", d);
            }
        }
        let expected_sources: HashSet<_> = class.sources.iter().cloned().collect();
        let expected_dests: HashSet<_> = class.dests.iter().cloned().collect();
        assert_eq!(seen_sources, expected_sources);
        assert_eq!(seen_dests, expected_dests);
    }

    #[test]
    fn test_one_to_one() {
        let c = class(&["a.db.orders"], &["b.app.orders"]);
        let m = resolve(&c);
        assert_eq!(
            m,
            vec![Mapping::OneToOne {
                source: t("a.db.orders"),
                dest: t("b.app.orders"),
            }]
        );
        assert_complete(&c, &m);
    }

    #[test]
    fn test_shards_consolidate_into_one_dest() {
        let c = class(&["a.a.orders1", "a.a.orders2"], &["b.b.orders"]);
        let m = resolve(&c);
        assert_eq!(m.len(), 1);
        match &m[0] {
            Mapping::ManyToOne { sources, dest } => {
                assert_eq!(sources, &vec![t("a.a.orders1"), t("a.a.orders2")]);
                assert_eq!(dest, &t("b.b.orders"));
            }
            other => panic!("expected many-to-one, got {}", other),
        }
        assert_complete(&c, &m);
    }

    #[test]
    fn test_one_source_many_dests() {
        let c = class(&["a.db.audit"], &["b.app.audit_2023", "b.app.audit_2024"]);
        let m = resolve(&c);
        assert!(matches!(&m[0], Mapping::OneToMany { dests, .. } if dests.len() == 2));
        assert!(!m[0].is_unresolved());
        assert_complete(&c, &m);
    }

    #[test]
    fn test_unmatched_sides() {
        let c = class(&["a.db.legacy"], &[]);
        let m = resolve(&c);
        assert_eq!(
            m,
            vec![Mapping::Unmatched {
                role: Role::Source,
                tables: vec![t("a.db.legacy")],
            }]
        );
        assert!(m[0].is_unresolved());

        let c = class(&[], &["b.app.new_table"]);
        let m = resolve(&c);
        assert!(matches!(&m[0], Mapping::Unmatched { role: Role::Dest, .. }));
        assert_complete(&c, &m);
    }

    #[test]
    fn test_many_to_many_peels_name_matches() {
        let c = class(
            &[
                "a.db.orders",
                "a.db.orders_01",
                "a.db.orders_02",
                "a.db.orders_03",
            ],
            &["b.app.orders", "b.app.orders_all"],
        );
        let m = resolve(&c);
        assert_eq!(m.len(), 2);
        assert!(m.contains(&Mapping::OneToOne {
            source: t("a.db.orders"),
            dest: t("b.app.orders"),
        }));
        assert!(m.contains(&Mapping::ManyToOne {
            sources: vec![
                t("a.db.orders_01"),
                t("a.db.orders_02"),
                t("a.db.orders_03"),
            ],
            dest: t("b.app.orders_all"),
        }));
        assert_complete(&c, &m);
    }

    #[test]
    fn test_many_to_many_all_names_match() {
        let c = class(
            &["a.db1.t1", "a.db1.t2"],
            &["b.app.t1", "b.app.t2"],
        );
        let m = resolve(&c);
        assert_eq!(m.len(), 2);
        assert!(m.iter().all(|m| matches!(m, Mapping::OneToOne { .. })));
        assert_complete(&c, &m);
    }

    #[test]
    fn test_each_dest_paired_once() {
        // Two sources named `orders` in different schemas, two dests named `orders`.
        let c = class(
            &["a.db1.orders", "a.db2.orders", "a.db3.orders"],
            &["b.x.orders", "b.y.orders"],
        );
        let m = resolve(&c);
        assert_complete(&c, &m);
        let one_to_one = m
            .iter()
            .filter(|m| matches!(m, Mapping::OneToOne { .. }))
            .count();
        assert_eq!(one_to_one, 2);
        // The third source has no dest left: reported, not guessed.
        assert!(m.contains(&Mapping::ManyToMany {
            sources: vec![t("a.db3.orders")],
            dests: vec![],
        }));
    }

    #[test]
    fn test_ambiguous_remainder_is_unresolved() {
        let c = class(
            &["a.db.x1", "a.db.x2", "a.db.x3"],
            &["b.app.y1", "b.app.y2"],
        );
        let m = resolve(&c);
        assert_eq!(m.len(), 1);
        assert!(m[0].is_unresolved());
        assert_complete(&c, &m);
    }

    #[test]
    fn test_leftover_dests_reported() {
        let c = class(&["a.db.t1", "a.db.t2"], &["b.app.t1", "b.app.t2", "b.app.t3"]);
        let m = resolve(&c);
        assert!(m.contains(&Mapping::ManyToMany {
            sources: vec![],
            dests: vec![t("b.app.t3")],
        }));
        assert_complete(&c, &m);
    }

    #[test]
    fn test_single_remaining_pair_is_one_to_one() {
        let c = class(&["a.db.t1", "a.db.t2"], &["b.app.t1", "b.app.other"]);
        let m = resolve(&c);
        assert!(m.contains(&Mapping::OneToOne {
            source: t("a.db.t2"),
            dest: t("b.app.other"),
        }));
        assert_complete(&c, &m);
    }

    #[test]
    fn test_mapping_display() {
        let m = Mapping::ManyToOne {
            sources: vec![t("a.s.o1"), t("a.s.o2")],
            dest: t("b.s.o"),
        };
        assert_eq!(m.to_string(), "many-to-one: [a.s.o1, a.s.o2] -> [b.s.o]");
    }
}
