use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Column as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// 1-based position in the table
    pub ordinal_position: usize,
    pub data_type: String,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, ordinal_position: usize, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal_position,
            data_type: data_type.into(),
        }
    }
}

/// One row of a table's imported keys.
///
/// `key_seq` is the 1-based position of the column inside one logical
/// foreign key; a new key starts whenever it resets to 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedKeyRow {
    pub pktable_name: String,
    pub pkcolumn_name: String,
    pub fkcolumn_name: String,
    pub key_seq: usize,
}

impl ImportedKeyRow {
    pub fn new(
        pktable_name: impl Into<String>,
        pkcolumn_name: impl Into<String>,
        fkcolumn_name: impl Into<String>,
        key_seq: usize,
    ) -> Self {
        Self {
            pktable_name: pktable_name.into(),
            pkcolumn_name: pkcolumn_name.into(),
            fkcolumn_name: fkcolumn_name.into(),
            key_seq,
        }
    }
}

/// Read-only view over a relational catalog.
///
/// Every call may block on the underlying connection; failures surface as
/// [`MappingError::Metadata`](crate::errors::MappingError::Metadata).
pub trait MetadataProvider {
    /// All table names, in catalog order
    fn table_names(&self) -> Result<Vec<String>>;

    /// Namespace the tables live in, if the catalog has one
    fn schema_name(&self) -> Option<String> {
        None
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnMetadata>>;

    /// Primary-key column names in key order
    fn primary_key(&self, table: &str) -> Result<Vec<String>>;

    /// Imported-key rows ordered by `(pktable_name, key_seq)`
    fn imported_keys(&self, table: &str) -> Result<Vec<ImportedKeyRow>>;

    /// Release the connection. Called once extraction has finished.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Allow/deny list applied to table names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFilter {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl TableFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// A non-empty include list wins; otherwise the exclude list applies
    pub fn allows(&self, table: &str) -> bool {
        if !self.include.is_empty() {
            self.include.iter().any(|t| t == table)
        } else if !self.exclude.is_empty() {
            !self.exclude.iter().any(|t| t == table)
        } else {
            true
        }
    }
}
