//! File-backed catalog reader.
//!
//! A snapshot captures the column catalogs of several instances in one YAML
//! (or JSON) document, so planning can run without database access:
//!
//! ```yaml
//! instances:
//!   - name: shard_a
//!     schemas:
//!       - name: orderdb_01
//!         tables:
//!           - name: orders
//!             columns:
//!               - { name: id, data_type: bigint }
//!               - { name: total, data_type: decimal, nullable: true, numeric_precision: 10, numeric_scale: 2 }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::core::{CatalogEntry, CatalogReader, ColumnSignature, TableDescriptor};
use crate::error::{PlanError, Result};

/// Snapshot document root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub instances: Vec<InstanceSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub name: String,
    #[serde(default)]
    pub schemas: Vec<SchemaSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSignature>,
}

/// [`CatalogReader`] over an in-memory [`CatalogSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalog {
    snapshot: CatalogSnapshot,
}

impl SnapshotCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot file. `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let snapshot: CatalogSnapshot = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        debug!(
            "Loaded catalog snapshot {} ({} instances)",
            path.display(),
            snapshot.instances.len()
        );
        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl CatalogReader for SnapshotCatalog {
    async fn read_tables(&self, instance: &str, schemas: &[String]) -> Result<Vec<CatalogEntry>> {
        let inst = self
            .snapshot
            .instances
            .iter()
            .find(|i| i.name == instance)
            .ok_or_else(|| PlanError::catalog(instance, "instance not found in snapshot"))?;

        let mut entries = Vec::new();
        for schema_name in schemas {
            let schema = inst
                .schemas
                .iter()
                .find(|s| &s.name == schema_name)
                .ok_or_else(|| {
                    PlanError::catalog(instance, format!("schema '{}' not found", schema_name))
                })?;

            entries.extend(schema.tables.iter().map(|t| CatalogEntry {
                descriptor: TableDescriptor::new(instance, &schema.name, &t.name),
                columns: t.columns.clone(),
            }));
        }

        entries.sort_by(|a, b| {
            (&a.descriptor.schema, &a.descriptor.table)
                .cmp(&(&b.descriptor.schema, &b.descriptor.table))
        });
        entries.dedup_by(|a, b| a.descriptor == b.descriptor);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
instances:
  - name: shard_a
    schemas:
      - name: orderdb_02
        tables:
          - name: orders
            columns:
              - { name: id, data_type: bigint }
      - name: orderdb_01
        tables:
          - name: users
            columns:
              - { name: id, data_type: int }
          - name: orders
            columns:
              - { name: id, data_type: bigint }
              - { name: total, data_type: decimal, nullable: true, numeric_precision: 10, numeric_scale: 2 }
"#;

    fn catalog() -> SnapshotCatalog {
        SnapshotCatalog::new(serde_yaml::from_str(SNAPSHOT).unwrap())
    }

    fn schemas(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_read_tables_sorted() {
        let entries = catalog()
            .read_tables("shard_a", &schemas(&["orderdb_02", "orderdb_01"]))
            .await
            .unwrap();
        let names: Vec<String> = entries.iter().map(|e| e.descriptor.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "shard_a.orderdb_01.orders",
                "shard_a.orderdb_01.users",
                "shard_a.orderdb_02.orders",
            ]
        );
        assert_eq!(entries[0].columns.len(), 2);
        assert_eq!(entries[0].columns[1].numeric_precision, Some(10));
    }

    #[tokio::test]
    async fn test_only_requested_schemas() {
        let entries = catalog()
            .read_tables("shard_a", &schemas(&["orderdb_02"]))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_instance_or_schema() {
        let err = catalog()
            .read_tables("shard_z", &schemas(&["orderdb_01"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Catalog { ref instance, .. } if instance == "shard_z"));

        let err = catalog()
            .read_tables("shard_a", &schemas(&["missing"]))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_CATALOG_ERROR);
        assert!(err.to_string().contains("schema 'missing' not found"));
    }

    #[tokio::test]
    async fn test_load_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("catalog.yaml");
        std::fs::write(&yaml_path, SNAPSHOT).unwrap();
        let from_yaml = SnapshotCatalog::load(&yaml_path).unwrap();

        let json_path = dir.path().join("catalog.json");
        std::fs::write(
            &json_path,
            serde_json::to_string(from_yaml.snapshot()).unwrap(),
        )
        .unwrap();
        let from_json = SnapshotCatalog::load(&json_path).unwrap();

        let wanted = schemas(&["orderdb_01"]);
        assert_eq!(
            from_yaml.read_tables("shard_a", &wanted).await.unwrap(),
            from_json.read_tables("shard_a", &wanted).await.unwrap()
        );
    }
}
