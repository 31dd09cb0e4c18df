//! Metadata provider over tables declared in code.
//!
//! Useful for embedding the mapper behind a catalog that is not reachable
//! through SQL, and for tests.
//!
//! # Example
//!
//! ```ignore
//! let provider = InMemoryMetadataProvider::new()
//!     .table("RESIDENCE", &[("ID", "INTEGER"), ("CITY", "VARCHAR")], &["ID"])
//!     .table("EMPLOYEE", &[("ID", "INTEGER"), ("RESIDENCE", "INTEGER")], &["ID"])
//!     .foreign_key("EMPLOYEE", "RESIDENCE", &["RESIDENCE"], &["ID"]);
//! ```

use indexmap::IndexMap;

use super::metadata::{ColumnMetadata, ImportedKeyRow, MetadataProvider};
use crate::errors::{MappingError, Result};

#[derive(Debug, Clone, Default)]
struct TableDefinition {
    columns: Vec<ColumnMetadata>,
    primary_key: Vec<String>,
    imported_keys: Vec<ImportedKeyRow>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataProvider {
    schema_name: Option<String>,
    tables: IndexMap<String, TableDefinition>,
    closed: bool,
}

impl InMemoryMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    /// Declare a table from `(column, type)` pairs in column order
    pub fn table(mut self, name: &str, columns: &[(&str, &str)], primary_key: &[&str]) -> Self {
        let definition = TableDefinition {
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, (column, data_type))| ColumnMetadata::new(*column, i + 1, *data_type))
                .collect(),
            primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
            imported_keys: Vec::new(),
        };
        self.tables.insert(name.to_string(), definition);
        self
    }

    /// Declare a (possibly composite) foreign key from `table` to `parent`
    pub fn foreign_key(
        mut self,
        table: &str,
        parent: &str,
        fk_columns: &[&str],
        pk_columns: &[&str],
    ) -> Self {
        if let Some(definition) = self.tables.get_mut(table) {
            for (i, (fk, pk)) in fk_columns.iter().zip(pk_columns).enumerate() {
                definition
                    .imported_keys
                    .push(ImportedKeyRow::new(parent, *pk, *fk, i + 1));
            }
            definition
                .imported_keys
                .sort_by(|a, b| a.pktable_name.cmp(&b.pktable_name));
        }
        self
    }

    /// Append raw imported-key rows exactly as given
    pub fn imported_key_rows(mut self, table: &str, rows: Vec<ImportedKeyRow>) -> Self {
        if let Some(definition) = self.tables.get_mut(table) {
            definition.imported_keys.extend(rows);
        }
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn definition(&self, table: &str) -> Result<&TableDefinition> {
        if self.closed {
            return Err(MappingError::metadata_error_with_context(
                table,
                "provider already closed",
                "connection closed".to_string(),
            ));
        }
        self.tables.get(table).ok_or_else(|| {
            MappingError::metadata_error_with_context(
                table,
                "looking up table definition",
                format!("no such table: {}", table),
            )
        })
    }
}

impl MetadataProvider for InMemoryMetadataProvider {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn schema_name(&self) -> Option<String> {
        self.schema_name.clone()
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnMetadata>> {
        Ok(self.definition(table)?.columns.clone())
    }

    fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.definition(table)?.primary_key.clone())
    }

    fn imported_keys(&self, table: &str) -> Result<Vec<ImportedKeyRow>> {
        Ok(self.definition(table)?.imported_keys.clone())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
