//! Schema extraction
//!
//! Builds the [`DatabaseSchema`] from a [`MetadataProvider`]: one entity per
//! allowed table, attributes in column order, the primary key, and one
//! relationship per logical (possibly composite) foreign key.
//!
//! Composite keys are rebuilt from imported-key rows: the first unconsumed
//! row opens a key and pulls in the remaining rows for the same parent table
//! whose `key_seq` continues the run (2, 3, ...).

pub mod memory;
pub mod metadata;
pub mod sqlite;

use log::{debug, info};
use std::collections::HashSet;

pub use memory::InMemoryMetadataProvider;
pub use metadata::{ColumnMetadata, ImportedKeyRow, MetadataProvider, TableFilter};
pub use sqlite::SqliteMetadataProvider;

use crate::errors::{MappingError, Result};
use crate::pipeline::{MappingContext, Phase};
use crate::schema_model::{Attribute, DatabaseSchema, EntityId, Key, Relationship};

#[derive(Debug, Clone, Default)]
pub struct SchemaExtractor {
    filter: TableFilter,
}

impl SchemaExtractor {
    pub fn new(filter: TableFilter) -> Self {
        Self { filter }
    }

    /// Read the whole schema model.
    ///
    /// The provider is closed afterwards whatever the outcome; a failed close
    /// is only a warning.
    pub fn extract(
        &self,
        provider: &mut dyn MetadataProvider,
        ctx: &mut MappingContext,
    ) -> Result<DatabaseSchema> {
        let result = self.extract_open(&*provider, ctx);
        if let Err(e) = provider.close() {
            ctx.warn(format!("The connection was not properly closed: {}", e));
        }
        let schema = result?;

        ctx.statistics.source_entities = schema.entities().len();
        ctx.statistics.source_relationships = schema.relationship_count();
        info!(
            "Extracted {} entities and {} relationships",
            schema.entities().len(),
            schema.relationship_count()
        );
        ctx.notify(Phase::Extraction);
        Ok(schema)
    }

    fn extract_open(
        &self,
        provider: &dyn MetadataProvider,
        ctx: &mut MappingContext,
    ) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new();
        let schema_name = provider.schema_name();

        let tables: Vec<String> = provider
            .table_names()?
            .into_iter()
            .filter(|t| self.filter.allows(t))
            .collect();

        for table in &tables {
            let id = schema.add_entity(table.as_str(), schema_name.clone());
            self.build_entity(provider, &mut schema, id, ctx)?;
        }

        for table in &tables {
            let Some(id) = schema.entity_id_by_name(table) else {
                continue;
            };
            self.build_relationships(provider, &mut schema, id, &tables)?;
        }

        for id in schema.entity_ids().collect::<Vec<_>>() {
            let join = is_join_table_dim2(&schema, id);
            schema.entity_mut(id).join_table_dim2 = join;
        }

        Ok(schema)
    }

    fn build_entity(
        &self,
        provider: &dyn MetadataProvider,
        schema: &mut DatabaseSchema,
        id: EntityId,
        ctx: &mut MappingContext,
    ) -> Result<()> {
        let table = schema.entity(id).name.clone();
        debug!("Building entity '{}'", table);

        let mut columns = provider.columns(&table)?;
        columns.sort_by_key(|c| c.ordinal_position);
        let primary_key = provider.primary_key(&table)?;

        let entity = schema.entity_mut(id);
        for column in columns {
            entity.attributes.push(Attribute::new(
                column.name,
                column.ordinal_position,
                column.data_type,
                id,
            ));
        }
        for pk_column in &primary_key {
            if let Some(attribute) = entity.attribute_by_name(pk_column).cloned() {
                entity.primary_key.add_attribute(attribute);
            }
        }

        if entity.primary_key.is_empty() {
            ctx.warn(format!(
                "It's not declared a primary key for the Entity {}. \
                 This might lead to issues during the migration or the sync phase.",
                table
            ));
        }
        Ok(())
    }

    fn build_relationships(
        &self,
        provider: &dyn MetadataProvider,
        schema: &mut DatabaseSchema,
        id: EntityId,
        allowed_tables: &[String],
    ) -> Result<()> {
        let table = schema.entity(id).name.clone();
        let allowed: HashSet<&str> = allowed_tables.iter().map(|t| t.as_str()).collect();

        let mut remaining: Vec<ImportedKeyRow> = provider
            .imported_keys(&table)?
            .into_iter()
            .filter(|row| allowed.contains(row.pktable_name.as_str()))
            .collect();

        for group in group_imported_keys(&mut remaining) {
            let parent_table = &group[0].pktable_name;
            let parent = schema.entity_id_by_name(parent_table).ok_or_else(|| {
                MappingError::UnknownTable {
                    table: parent_table.clone(),
                    context: format!("foreign key of '{}'", table),
                }
            })?;

            let mut foreign_key = Key::new(id);
            let mut primary_key = Key::new(parent);
            for row in &group {
                let fk_attribute = schema
                    .entity(id)
                    .attribute_by_name(&row.fkcolumn_name)
                    .cloned()
                    .ok_or_else(|| MappingError::UnknownColumn {
                        column: row.fkcolumn_name.clone(),
                        table: table.clone(),
                    })?;
                let pk_attribute = schema
                    .entity(parent)
                    .attribute_by_name(&row.pkcolumn_name)
                    .cloned()
                    .ok_or_else(|| MappingError::UnknownColumn {
                        column: row.pkcolumn_name.clone(),
                        table: parent_table.clone(),
                    })?;
                foreign_key.add_attribute(fk_attribute);
                primary_key.add_attribute(pk_attribute);
            }

            debug!(
                "Relationship {}({}) -> {}({})",
                table,
                foreign_key.attribute_names().join(", "),
                parent_table,
                primary_key.attribute_names().join(", ")
            );
            schema.add_relationship(Relationship::new(id, parent, foreign_key, primary_key));
        }
        Ok(())
    }
}

/// Consume imported-key rows into one group per logical foreign key
pub fn group_imported_keys(rows: &mut Vec<ImportedKeyRow>) -> Vec<Vec<ImportedKeyRow>> {
    let mut groups = Vec::new();
    while !rows.is_empty() {
        let first = rows.remove(0);
        let mut next_seq = first.key_seq + 1;
        let mut group = vec![first];

        while let Some(index) = rows
            .iter()
            .position(|r| r.pktable_name == group[0].pktable_name && r.key_seq == next_seq)
        {
            group.push(rows.remove(index));
            next_seq += 1;
        }
        groups.push(group);
    }
    groups
}

/// Exactly two foreign keys to two distinct parents that together cover a
/// non-empty primary key.
fn is_join_table_dim2(schema: &DatabaseSchema, id: EntityId) -> bool {
    let entity = schema.entity(id);
    if entity.out_relationships.len() != 2 || entity.primary_key.is_empty() {
        return false;
    }
    let first = schema.relationship(entity.out_relationships[0]);
    let second = schema.relationship(entity.out_relationships[1]);
    if first.parent_entity == second.parent_entity {
        return false;
    }
    entity
        .primary_key
        .attributes
        .iter()
        .all(|a| first.foreign_key.contains(&a.name) || second.foreign_key.contains(&a.name))
}
