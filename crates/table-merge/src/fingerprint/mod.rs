//! Structural fingerprints of table column catalogs.
//!
//! A fingerprint is a pair of SHA-256 digests over the column list sorted by
//! name: one over the names alone and one over the full signature tuples.
//! Two tables are structurally equivalent iff both digests match.
//!
//! The reserved marker columns `c_instance`, `c_schema` and `c_table` never
//! participate in either digest. Their presence is recorded separately in
//! [`MarkerFlags`], since a destination carrying them records where each
//! consolidated row came from.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::core::ColumnSignature;

/// Marker column recording the source instance of a consolidated row.
pub const SOURCE_MARKER: &str = "c_instance";
/// Marker column recording the source schema of a consolidated row.
pub const SCHEMA_MARKER: &str = "c_schema";
/// Marker column recording the source table of a consolidated row.
pub const TABLE_MARKER: &str = "c_table";

/// Precision recorded for integer-family columns.
const INTEGER_PRECISION_SENTINEL: &str = "0";

/// Hash pair identifying a table's structure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructuralFingerprint {
    /// Digest of the ordered column-name list.
    pub names_hash: String,

    /// Digest of the ordered signature tuples.
    pub full_hash: String,
}

impl StructuralFingerprint {
    /// Short form for log lines.
    pub fn short(&self) -> String {
        let prefix = |hash: &str| hash.get(..8).unwrap_or(hash).to_string();
        format!("{}/{}", prefix(&self.names_hash), prefix(&self.full_hash))
    }
}

impl fmt::Display for StructuralFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.names_hash, self.full_hash)
    }
}

/// Presence of the reserved marker columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerFlags {
    pub has_source_marker: bool,
    pub has_schema_marker: bool,
    pub has_table_marker: bool,
}

impl MarkerFlags {
    /// True when any marker column is present.
    pub fn any(&self) -> bool {
        self.has_source_marker || self.has_schema_marker || self.has_table_marker
    }

    /// Combine flags from several tables.
    pub fn union(self, other: MarkerFlags) -> MarkerFlags {
        MarkerFlags {
            has_source_marker: self.has_source_marker || other.has_source_marker,
            has_schema_marker: self.has_schema_marker || other.has_schema_marker,
            has_table_marker: self.has_table_marker || other.has_table_marker,
        }
    }
}

/// Fingerprint plus marker flags for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    pub fingerprint: StructuralFingerprint,
    pub markers: MarkerFlags,
}

/// Check if a column name is one of the reserved marker columns.
pub fn is_marker_column(name: &str) -> bool {
    matches!(name, SOURCE_MARKER | SCHEMA_MARKER | TABLE_MARKER)
}

/// Compute the structural shape of a table from its columns.
///
/// Pure and independent of the order the catalog returned the columns in.
/// An empty column list yields the (valid) fingerprint of an empty table.
pub fn fingerprint(columns: &[ColumnSignature]) -> TableShape {
    let mut markers = MarkerFlags::default();
    let mut hashed: Vec<&ColumnSignature> = Vec::with_capacity(columns.len());

    for col in columns {
        match col.name.as_str() {
            SOURCE_MARKER => markers.has_source_marker = true,
            SCHEMA_MARKER => markers.has_schema_marker = true,
            TABLE_MARKER => markers.has_table_marker = true,
            _ => hashed.push(col),
        }
    }

    hashed.sort_by(|a, b| a.name.cmp(&b.name));

    let names: Vec<&str> = hashed.iter().map(|c| c.name.as_str()).collect();
    let tuples: Vec<String> = hashed.iter().map(|c| signature_tuple(c)).collect();

    TableShape {
        fingerprint: StructuralFingerprint {
            names_hash: sha256_hex(&names.join(",")),
            full_hash: sha256_hex(&tuples.join(",")),
        },
        markers,
    }
}

/// Render one column as `name:type:nullable:length:precision:scale:temporal`.
///
/// Absent attributes render as empty fields so positions stay fixed.
fn signature_tuple(col: &ColumnSignature) -> String {
    let precision = if col.is_integer_family() {
        INTEGER_PRECISION_SENTINEL.to_string()
    } else {
        opt(col.numeric_precision)
    };

    [
        col.name.clone(),
        col.data_type.to_lowercase(),
        if col.nullable { "YES" } else { "NO" }.to_string(),
        opt(col.max_length),
        precision,
        opt(col.numeric_scale),
        opt(col.temporal_precision),
    ]
    .join(":")
}

fn opt(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_columns() -> Vec<ColumnSignature> {
        vec![
            ColumnSignature::new("id", "bigint").not_null().with_precision(19, 0),
            ColumnSignature::new("customer", "varchar").with_max_length(64),
            ColumnSignature::new("amount", "decimal").with_precision(10, 2),
            ColumnSignature::new("created_at", "datetime").with_temporal_precision(0),
        ]
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let cols = orders_columns();
        let mut reversed = cols.clone();
        reversed.reverse();
        assert_eq!(fingerprint(&cols), fingerprint(&reversed));
    }

    #[test]
    fn test_integer_display_width_is_ignored() {
        let a = vec![ColumnSignature::new("id", "int").with_precision(10, 0)];
        let b = vec![ColumnSignature::new("id", "int").with_precision(11, 0)];
        let c = vec![ColumnSignature::new("id", "INT")];
        assert_eq!(fingerprint(&a).fingerprint, fingerprint(&b).fingerprint);
        assert_eq!(fingerprint(&a).fingerprint, fingerprint(&c).fingerprint);
    }

    #[test]
    fn test_decimal_precision_is_significant() {
        let a = vec![ColumnSignature::new("amount", "decimal").with_precision(10, 2)];
        let b = vec![ColumnSignature::new("amount", "decimal").with_precision(12, 2)];
        assert_ne!(fingerprint(&a).fingerprint, fingerprint(&b).fingerprint);
    }

    #[test]
    fn test_type_nullability_and_length_changes_break_equivalence() {
        let base = orders_columns();
        let base_fp = fingerprint(&base).fingerprint;

        let mut retyped = base.clone();
        retyped[1].data_type = "text".to_string();
        let fp = fingerprint(&retyped).fingerprint;
        assert_ne!(fp, base_fp);
        assert_eq!(fp.names_hash, base_fp.names_hash);

        let mut nullable = base.clone();
        nullable[0].nullable = true;
        assert_ne!(fingerprint(&nullable).fingerprint, base_fp);

        let mut longer = base.clone();
        longer[1].max_length = Some(128);
        assert_ne!(fingerprint(&longer).fingerprint, base_fp);
    }

    #[test]
    fn test_renamed_column_changes_names_hash() {
        let base = orders_columns();
        let mut renamed = base.clone();
        renamed[1].name = "client".to_string();
        assert_ne!(
            fingerprint(&base).fingerprint.names_hash,
            fingerprint(&renamed).fingerprint.names_hash
        );
    }

    #[test]
    fn test_marker_columns_excluded_and_flagged() {
        let base = orders_columns();
        let mut with_markers = base.clone();
        with_markers.push(ColumnSignature::new(SOURCE_MARKER, "varchar").with_max_length(64));
        with_markers.push(ColumnSignature::new(TABLE_MARKER, "varchar").with_max_length(64));

        let plain = fingerprint(&base);
        let marked = fingerprint(&with_markers);
        assert_eq!(plain.fingerprint, marked.fingerprint);
        assert!(!plain.markers.any());
        assert!(marked.markers.has_source_marker);
        assert!(!marked.markers.has_schema_marker);
        assert!(marked.markers.has_table_marker);
    }

    #[test]
    fn test_empty_table_fingerprint() {
        let empty = fingerprint(&[]);
        let only_markers = fingerprint(&[ColumnSignature::new(SCHEMA_MARKER, "varchar")]);
        assert_eq!(empty.fingerprint, only_markers.fingerprint);
        assert_eq!(empty.fingerprint.names_hash.len(), 64);
        assert!(only_markers.markers.has_schema_marker);
    }

    #[test]
    fn test_short_form() {
        let fp = fingerprint(&[ColumnSignature::new("id", "int")]).fingerprint;
        assert_eq!(fp.short(), format!("{}/{}", &fp.names_hash[..8], &fp.full_hash[..8]));

        let truncated: StructuralFingerprint =
            serde_json::from_str(r#"{"names_hash": "abc", "full_hash": "0123456789"}"#).unwrap();
        assert_eq!(truncated.short(), "abc/01234567");
    }

    #[test]
    fn test_signature_tuple_format() {
        let col = ColumnSignature::new("amount", "DECIMAL").with_precision(10, 2);
        assert_eq!(signature_tuple(&col), "amount:decimal:YES::10:2:");

        let id = ColumnSignature::new("id", "bigint").not_null().with_precision(19, 0);
        assert_eq!(signature_tuple(&id), "id:bigint:NO::0:0:");
    }

    #[test]
    fn test_marker_union() {
        let a = MarkerFlags {
            has_source_marker: true,
            ..Default::default()
        };
        let b = MarkerFlags {
            has_table_marker: true,
            ..Default::default()
        };
        let u = a.union(b);
        assert!(u.has_source_marker && u.has_table_marker && !u.has_schema_marker);
        assert!(is_marker_column("c_schema"));
        assert!(!is_marker_column("schema"));
    }
}
