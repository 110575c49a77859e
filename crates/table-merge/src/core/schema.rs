//! Catalog metadata types: table descriptors and column signatures.
//!
//! These types are read-only snapshots of catalog state, produced by a
//! [`CatalogReader`](super::traits::CatalogReader) and consumed by the
//! fingerprint engine and classifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one table in one database instance.
///
/// Ordering is lexicographic on `(instance, schema, table)`, which the
/// classifier relies on to keep class members in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Configured instance name (not a host name).
    pub instance: String,

    /// Schema (database) name.
    pub schema: String,

    /// Table name.
    pub table: String,
}

impl TableDescriptor {
    pub fn new(
        instance: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            instance: instance.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Name used for exact name matching between sources and destinations.
    ///
    /// Only the table name participates; instance and schema are ignored.
    pub fn suffix(&self) -> &str {
        &self.table
    }

    /// `schema.table`, without the instance.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.instance, self.schema, self.table)
    }
}

/// Which side of the migration a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Source,
    Dest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Source => write!(f, "source"),
            Role::Dest => write!(f, "dest"),
        }
    }
}

/// Column metadata as read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSignature {
    /// Column name.
    pub name: String,

    /// Data type (e.g., "int", "varchar", "datetime").
    pub data_type: String,

    /// Whether the column allows NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,

    /// Maximum character length for string types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,

    /// Numeric precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_precision: Option<i64>,

    /// Numeric scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_scale: Option<i64>,

    /// Fractional seconds precision for temporal types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_precision: Option<i64>,
}

impl ColumnSignature {
    /// Create a nullable column with no length or precision attributes.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: default_nullable(),
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            temporal_precision: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_max_length(mut self, len: i64) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn with_precision(mut self, precision: i64, scale: i64) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = Some(scale);
        self
    }

    pub fn with_temporal_precision(mut self, precision: i64) -> Self {
        self.temporal_precision = Some(precision);
        self
    }

    /// Check if the column belongs to the integer family.
    ///
    /// Display widths on these types (`int(11)`) surface as varying numeric
    /// precision across server versions, so precision is ignored for them.
    pub fn is_integer_family(&self) -> bool {
        is_integer_type(&self.data_type.to_lowercase())
    }
}

fn default_nullable() -> bool {
    true
}

fn is_integer_type(data_type: &str) -> bool {
    matches!(
        data_type,
        "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint"
    )
}

/// One table as yielded by a catalog reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub descriptor: TableDescriptor,
    pub columns: Vec<ColumnSignature>,
}
