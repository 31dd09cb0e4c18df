//! SQLite catalog reader.
//!
//! Tables come from `sqlite_master`, columns and primary keys from
//! `pragma_table_info`, imported keys from `pragma_foreign_key_list`.

use log::debug;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

use super::metadata::{ColumnMetadata, ImportedKeyRow, MetadataProvider};
use crate::errors::{MappingError, Result};

pub struct SqliteMetadataProvider {
    conn: Option<Connection>,
}

impl SqliteMetadataProvider {
    /// Open a database file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            MappingError::metadata_error_with_context(
                path.display().to_string(),
                "opening sqlite database",
                e,
            )
        })?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Some(conn) }
    }

    fn conn(&self, table: &str) -> Result<&Connection> {
        self.conn.as_ref().ok_or_else(|| {
            MappingError::metadata_error_with_context(
                table,
                "provider already closed",
                "connection closed".to_string(),
            )
        })
    }
}

/// `VARCHAR(20)` -> `VARCHAR`; untyped columns report an empty name
fn normalize_declared_type(declared: &str) -> String {
    let base = match declared.find('(') {
        Some(index) => &declared[..index],
        None => declared,
    };
    base.trim().to_ascii_uppercase()
}

/// The catalog's own spelling of `name`, matched ignoring ASCII case
fn catalog_spelling(names: &[String], name: &str) -> Option<String> {
    names
        .iter()
        .find(|candidate| candidate.as_str() == name)
        .or_else(|| names.iter().find(|candidate| candidate.eq_ignore_ascii_case(name)))
        .cloned()
}

impl MetadataProvider for SqliteMetadataProvider {
    fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.conn("sqlite_master")?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("sqlite catalog lists {} tables", names.len());
        Ok(names)
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnMetadata>> {
        let conn = self.conn(table)?;
        let mut stmt = conn
            .prepare("SELECT cid, name, type FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(|e| MappingError::metadata_error_with_context(table, "reading columns", e))?;
        let columns = stmt
            .query_map(params![table], |row| {
                let cid: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                let declared: String = row.get::<_, Option<String>>(2)?.unwrap_or_default();
                Ok(ColumnMetadata::new(
                    name,
                    cid as usize + 1,
                    normalize_declared_type(&declared),
                ))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| MappingError::metadata_error_with_context(table, "reading columns", e))?;
        Ok(columns)
    }

    fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let conn = self.conn(table)?;
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk")
            .map_err(|e| MappingError::metadata_error_with_context(table, "reading primary key", e))?;
        let names = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| MappingError::metadata_error_with_context(table, "reading primary key", e))?;
        Ok(names)
    }

    fn imported_keys(&self, table: &str) -> Result<Vec<ImportedKeyRow>> {
        let conn = self.conn(table)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, seq, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) \
                 ORDER BY \"table\", id, seq",
            )
            .map_err(|e| MappingError::metadata_error_with_context(table, "reading imported keys", e))?;
        let raw = stmt
            .query_map(params![table], |row| {
                Ok((
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| MappingError::metadata_error_with_context(table, "reading imported keys", e))?;

        let tables = self.table_names()?;
        let own_columns: Vec<String> = self.columns(table)?.into_iter().map(|c| c.name).collect();
        let mut rows = Vec::with_capacity(raw.len());
        for (seq, parent, from, to) in raw {
            let key_seq = seq as usize + 1;
            // The pragma echoes the DDL spelling; sqlite itself matches names case-insensitively
            let parent = catalog_spelling(&tables, &parent).unwrap_or(parent);
            let from = catalog_spelling(&own_columns, &from).unwrap_or(from);
            // `REFERENCES parent` without a column list targets the parent's primary key
            let pkcolumn = match to {
                Some(column) => {
                    let parent_columns: Vec<String> =
                        self.columns(&parent)?.into_iter().map(|c| c.name).collect();
                    catalog_spelling(&parent_columns, &column).unwrap_or(column)
                }
                None => self
                    .primary_key(&parent)?
                    .get(key_seq - 1)
                    .cloned()
                    .ok_or_else(|| {
                        MappingError::metadata_error_with_context(
                            table,
                            "resolving implicit foreign key target",
                            format!("'{}' has no primary key column at position {}", parent, key_seq),
                        )
                    })?,
            };
            rows.push(ImportedKeyRow::new(parent, pkcolumn, from, key_seq));
        }
        Ok(rows)
    }

    fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| {
                MappingError::metadata_error_with_context("sqlite_master", "closing connection", e)
            }),
            None => Ok(()),
        }
    }
}
