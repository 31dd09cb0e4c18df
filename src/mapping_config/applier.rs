//! Applies a validated [`MappingConfiguration`] on top of the inferred
//! graph model.
//!
//! Vertex classes come first (rename, retype, merge), then edge classes
//! (rename, redirect, new relationships, join-table aggregation setup).

use indexmap::IndexMap;
use log::{debug, info};
use std::collections::HashMap;

use super::document::{
    ConfiguredEdgeClass, ConfiguredProperty, ConfiguredVertexClass, EdgeMapping, MappingConfiguration,
};
use crate::errors::{MappingError, Result};
use crate::graph_model::{ClassMapper, EdgeId, ElementRef, GraphModel, MappingRules, ModelProperty, VertexId};
use crate::pipeline::{MappingContext, Phase};
use crate::schema_model::{DatabaseSchema, Direction, EntityId, Key, Relationship, RelationshipId};

#[derive(Debug, Clone)]
pub struct ConfigurationApplier {
    configuration: MappingConfiguration,
}

impl ConfigurationApplier {
    pub fn new(configuration: MappingConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &MappingConfiguration {
        &self.configuration
    }

    pub fn apply(
        &self,
        schema: &mut DatabaseSchema,
        model: &mut GraphModel,
        rules: &mut MappingRules,
        ctx: &mut MappingContext,
    ) -> Result<()> {
        debug!("Configuration applying phase...");
        for class in &self.configuration.vertices {
            match distinct_sources(class) {
                1 => self.apply_single_source(class, schema, model, rules, ctx)?,
                _ => self.apply_aggregation(class, schema, model, rules, ctx)?,
            }
        }
        model.sort_vertices();

        for class in &self.configuration.edges {
            self.apply_edge_class(class, schema, model, rules, ctx)?;
        }

        ctx.statistics.source_relationships = schema.relationship_count();
        ctx.statistics.built_vertex_types = model.vertex_count();
        ctx.statistics.built_edge_types = model.edge_count();
        info!(
            "Configuration applied: {} vertex classes, {} edge classes",
            ctx.statistics.configured_vertex_classes, ctx.statistics.configured_edge_classes
        );
        ctx.notify(Phase::ConfigurationApplying);
        Ok(())
    }

    fn apply_single_source(
        &self,
        class: &ConfiguredVertexClass,
        schema: &DatabaseSchema,
        model: &mut GraphModel,
        rules: &mut MappingRules,
        ctx: &mut MappingContext,
    ) -> Result<()> {
        let source = &class.source_tables[0];
        let entity = lookup_entity(schema, &source.table_name, &class.name)?;
        let vertex = single_vertex(rules, entity, &source.table_name)?;
        debug!("Vertex class '{}' <- table '{}'", class.name, source.table_name);

        if let Some(v) = model.vertex_mut(vertex) {
            v.name = class.name.clone();
        }

        for configured in &class.properties {
            let Some(mapping) = &configured.mapping else {
                ctx.warn(format!(
                    "Property '{}' of '{}' has no source mapping and was ignored",
                    configured.name, class.name
                ));
                continue;
            };
            let column = mapping.column_name.as_str();

            let Some(mapper) = rules.class_mapper(entity, vertex) else {
                continue;
            };
            if mapper.is_excluded(column) {
                ctx.warn(format!(
                    "Column '{}' of '{}' is already excluded, property '{}' ignored",
                    column, source.table_name, configured.name
                ));
                continue;
            }

            match mapper.property_for(column).map(str::to_string) {
                Some(current) => {
                    if let Some(v) = model.vertex_mut(vertex) {
                        if let Some(property) = v.property_by_name_mut(&current) {
                            configure_property(property, configured, Some(mapping.column_type.as_str()));
                        }
                    }
                    if let Some(mapper) = rules.class_mapper_mut(entity, vertex) {
                        if configured.include {
                            mapper.rename_property(column, &configured.name);
                        } else {
                            mapper.exclude(column);
                        }
                    }
                }
                None => {
                    // Inherited properties are built in inherited-attribute order
                    let Some(index) = schema
                        .entity(entity)
                        .inherited_attributes
                        .iter()
                        .position(|a| a.name == column)
                    else {
                        return Err(MappingError::UnknownColumn {
                            column: column.to_string(),
                            table: source.table_name.clone(),
                        });
                    };
                    if let Some(property) = model
                        .vertex_mut(vertex)
                        .and_then(|v| v.inherited_properties.get_mut(index))
                    {
                        configure_property(property, configured, Some(mapping.column_type.as_str()));
                    }
                }
            }
        }

        ctx.statistics.configured_vertex_classes += 1;
        Ok(())
    }

    /// Merge the vertices of several tables into one vertex type
    fn apply_aggregation(
        &self,
        class: &ConfiguredVertexClass,
        schema: &DatabaseSchema,
        model: &mut GraphModel,
        rules: &mut MappingRules,
        ctx: &mut MappingContext,
    ) -> Result<()> {
        let mut source_entities: Vec<EntityId> = Vec::new();
        let mut source_id_to_entity: HashMap<&str, EntityId> = HashMap::new();
        for table in &class.source_tables {
            let entity = lookup_entity(schema, &table.table_name, &class.name)?;
            if !source_entities.contains(&entity) {
                source_entities.push(entity);
            }
            source_id_to_entity.insert(table.source_id.as_str(), entity);
        }

        let mut merged: Vec<VertexId> = Vec::new();
        for entity in &source_entities {
            for mapper in rules.class_mappers_for_entity(*entity) {
                if !merged.contains(&mapper.vertex) {
                    merged.push(mapper.vertex);
                }
            }
        }
        if merged.is_empty() {
            return Err(MappingError::AmbiguousMapping {
                message: format!("no vertex type backs the source tables of '{}'", class.name),
            });
        }

        if let Some(reason) = aggregation_blocker(schema, model, rules, &source_entities, &merged, ctx) {
            ctx.warn(format!(
                "Aggregation into '{}' skipped: {}",
                class.name, reason
            ));
            ctx.statistics.skipped_aggregations += 1;
            return Ok(());
        }

        let (parent_type, depth) = model
            .vertex(merged[0])
            .map(|v| (v.parent_type, v.inheritance_depth))
            .unwrap_or((None, 0));
        let aggregated = model.add_vertex(class.name.as_str());

        // Re-target every edge touching a merged vertex
        for old in &merged {
            let Some(vertex) = model.vertex(*old) else {
                continue;
            };
            let (in_edges, out_edges) = (vertex.in_edges.clone(), vertex.out_edges.clone());
            for edge in in_edges {
                if let Some(e) = model.edge_mut(edge) {
                    e.in_vertex = Some(aggregated);
                }
                if let Some(v) = model.vertex_mut(aggregated) {
                    v.add_in_edge(edge);
                }
            }
            for edge in out_edges {
                if let Some(e) = model.edge_mut(edge) {
                    e.out_vertex = Some(aggregated);
                }
                if let Some(v) = model.vertex_mut(aggregated) {
                    v.add_out_edge(edge);
                }
            }
        }
        for child in model.vertex_ids() {
            if let Some(v) = model.vertex_mut(child) {
                if v.parent_type.is_some_and(|p| merged.contains(&p)) {
                    v.parent_type = Some(aggregated);
                }
            }
        }

        // Properties and per-entity mappers, in document order
        let mut mappers: IndexMap<EntityId, ClassMapper> = source_entities
            .iter()
            .map(|e| (*e, ClassMapper::new(*e, aggregated)))
            .collect();
        let mut properties = Vec::with_capacity(class.properties.len());
        for (index, configured) in class.properties.iter().enumerate() {
            let source = configured
                .mapping
                .as_ref()
                .and_then(|m| source_id_to_entity.get(m.source_id.as_str()).map(|e| (m, *e)));

            let from_primary_key = source
                .map(|(m, e)| schema.entity(e).primary_key.contains(&m.column_name))
                .unwrap_or(false);
            let mut property = ModelProperty::new(
                configured.name.as_str(),
                index + 1,
                None,
                from_primary_key,
                ElementRef::Vertex(aggregated),
            );
            configure_property(
                &mut property,
                configured,
                configured.mapping.as_ref().map(|m| m.column_type.as_str()),
            );
            properties.push(property);

            match source {
                Some((m, entity)) => {
                    if let Some(mapper) = mappers.get_mut(&entity) {
                        if configured.include {
                            mapper.map(m.column_name.as_str(), configured.name.as_str());
                        } else {
                            mapper.exclude(&m.column_name);
                        }
                    }
                }
                None => {
                    if let Some(m) = &configured.mapping {
                        ctx.warn(format!(
                            "Property '{}' of '{}' references unknown source '{}'",
                            configured.name, class.name, m.source_id
                        ));
                    }
                }
            }
        }

        if let Some(v) = model.vertex_mut(aggregated) {
            v.properties = properties;
            v.parent_type = parent_type;
            v.inheritance_depth = depth;
        }
        for mapper in mappers.into_values() {
            rules.replace_class_mappers(&merged, mapper);
        }
        for old in &merged {
            model.remove_vertex(*old);
        }

        info!(
            "{} vertex types aggregated into '{}'",
            merged.len(),
            class.name
        );
        ctx.statistics.configured_vertex_classes += 1;
        Ok(())
    }

    fn apply_edge_class(
        &self,
        class: &ConfiguredEdgeClass,
        schema: &mut DatabaseSchema,
        model: &mut GraphModel,
        rules: &mut MappingRules,
        ctx: &mut MappingContext,
    ) -> Result<()> {
        for mapping in &class.mappings {
            match &mapping.join_table {
                None => {
                    let relationship = upsert_relationship(
                        schema,
                        &class.name,
                        &mapping.from_table,
                        &mapping.to_table,
                        &mapping.from_columns,
                        &mapping.to_columns,
                    )?;
                    if let Some(direction) = mapping.direction {
                        schema.relationship_mut(relationship).direction = direction;
                    }
                    let direction = schema.relationship(relationship).direction;
                    let edge = upsert_edge(schema, model, rules, relationship, &class.name, direction)?;
                    apply_edge_properties(model, edge, &class.properties);
                }
                Some(join) => {
                    if !ctx.execution_mode.aggregates() {
                        return Err(MappingError::JoinTableInNaiveMode {
                            edge: class.name.clone(),
                            join_table: join.table_name.clone(),
                        });
                    }
                    self.apply_join_table_mapping(class, mapping, schema, model, rules)?;
                }
            }
        }
        ctx.statistics.configured_edge_classes += 1;
        Ok(())
    }

    /// Two relationships out of the join table, then flag it for aggregation
    fn apply_join_table_mapping(
        &self,
        class: &ConfiguredEdgeClass,
        mapping: &EdgeMapping,
        schema: &mut DatabaseSchema,
        model: &mut GraphModel,
        rules: &mut MappingRules,
    ) -> Result<()> {
        let Some(join) = &mapping.join_table else {
            return Ok(());
        };
        debug!(
            "Edge class '{}' backed by join table '{}'",
            class.name, join.table_name
        );

        let sides = [
            (&mapping.from_table, &join.from_columns, &mapping.from_columns, "left"),
            (&mapping.to_table, &join.to_columns, &mapping.to_columns, "right"),
        ];
        for (parent_table, join_columns, parent_columns, side) in sides {
            let relationship = upsert_relationship(
                schema,
                &class.name,
                &join.table_name,
                parent_table,
                join_columns,
                parent_columns,
            )?;
            // Direction belongs to the aggregated edge; both sides stay direct
            let name = format!("{}-{}", class.name, side);
            let edge = upsert_edge(schema, model, rules, relationship, &name, Direction::Direct)?;
            apply_edge_properties(model, edge, &class.properties);
        }

        let join_entity = lookup_entity(schema, &join.table_name, &class.name)?;
        {
            let entity = schema.entity_mut(join_entity);
            entity.aggregable_join_table = true;
            entity.n2n_relationship_name = Some(class.name.clone());
            entity.n2n_direction = Some(mapping.direction.unwrap_or_default());
        }
        let vertex = single_vertex(rules, join_entity, &join.table_name)?;
        if let Some(v) = model.vertex_mut(vertex) {
            v.from_join_table = true;
        }
        Ok(())
    }
}

fn lookup_entity(schema: &DatabaseSchema, table: &str, class: &str) -> Result<EntityId> {
    schema
        .entity_id_by_name(table)
        .ok_or_else(|| MappingError::UnknownTable {
            table: table.to_string(),
            context: format!("configured class '{}'", class),
        })
}

/// The one vertex an entity maps to
fn single_vertex(rules: &MappingRules, entity: EntityId, table: &str) -> Result<VertexId> {
    let vertices: Vec<VertexId> = rules
        .class_mappers_for_entity(entity)
        .map(|m| m.vertex)
        .collect();
    match vertices.as_slice() {
        [single] => Ok(*single),
        [] => Err(MappingError::AmbiguousMapping {
            message: format!("table '{}' is not mapped to any vertex type", table),
        }),
        _ => Err(MappingError::AmbiguousMapping {
            message: format!("table '{}' is mapped to {} vertex types", table, vertices.len()),
        }),
    }
}

/// Source tables counted once per source id
fn distinct_sources(class: &ConfiguredVertexClass) -> usize {
    let mut seen: Vec<&str> = Vec::with_capacity(class.source_tables.len());
    for table in &class.source_tables {
        if !seen.contains(&table.source_id.as_str()) {
            seen.push(table.source_id.as_str());
        }
    }
    seen.len()
}

/// Why the vertices cannot be merged, if they cannot
fn aggregation_blocker(
    schema: &DatabaseSchema,
    model: &GraphModel,
    rules: &MappingRules,
    entities: &[EntityId],
    vertices: &[VertexId],
    ctx: &MappingContext,
) -> Option<String> {
    for entity in entities.iter().map(|id| schema.entity(*id)) {
        if entity.aggregable_join_table || (ctx.execution_mode.aggregates() && entity.join_table_dim2) {
            return Some(format!("table '{}' is a join table", entity.name));
        }
    }
    for id in vertices {
        let Some(vertex) = model.vertex(*id) else {
            let table = rules
                .entity_for_vertex(*id)
                .map(|e| schema.entity(e).name.as_str())
                .unwrap_or_default();
            return Some(format!("the vertex type of table '{}' was already removed", table));
        };
        if vertex.from_join_table {
            return Some(format!("'{}' comes from a join table", vertex.name));
        }
    }
    let first_parent = model.vertex(vertices[0]).and_then(|v| v.parent_type);
    for id in vertices {
        let Some(vertex) = model.vertex(*id) else {
            continue;
        };
        if vertex.parent_type != first_parent {
            return Some(format!(
                "'{}' does not share the parent type of '{}'",
                vertex.name,
                model.vertex_name(vertices[0]).unwrap_or_default()
            ));
        }
    }
    None
}

fn configure_property(property: &mut ModelProperty, configured: &ConfiguredProperty, original_type: Option<&str>) {
    property.name = configured.name.clone();
    property.included = configured.include;
    property.target_type = Some(configured.target_type);
    property.mandatory = Some(configured.mandatory);
    property.read_only = Some(configured.read_only);
    property.not_null = Some(configured.not_null);
    if let Some(original_type) = original_type {
        property.original_type = Some(original_type.to_string());
    }
}

/// Find the relationship described by a mapping or add it to the schema
fn upsert_relationship(
    schema: &mut DatabaseSchema,
    class: &str,
    foreign_table: &str,
    parent_table: &str,
    from_columns: &[String],
    to_columns: &[String],
) -> Result<RelationshipId> {
    let foreign = lookup_entity(schema, foreign_table, class)?;
    let parent = lookup_entity(schema, parent_table, class)?;
    if let Some(existing) = schema.find_relationship(foreign, parent, from_columns, to_columns) {
        return Ok(existing);
    }
    if from_columns.len() != to_columns.len() || from_columns.is_empty() {
        return Err(MappingError::invalid_value(
            "toColumns",
            to_columns.join(", "),
            class,
        ));
    }

    let foreign_key = key_from_columns(schema, foreign, from_columns)?;
    let primary_key = key_from_columns(schema, parent, to_columns)?;
    debug!(
        "Relationship {}({}) -> {}({}) added from configuration",
        foreign_table,
        from_columns.join(", "),
        parent_table,
        to_columns.join(", ")
    );
    Ok(schema.add_relationship(Relationship::new(foreign, parent, foreign_key, primary_key)))
}

fn key_from_columns(schema: &DatabaseSchema, entity: EntityId, columns: &[String]) -> Result<Key> {
    let owner = schema.entity(entity);
    let mut key = Key::new(entity);
    for column in columns {
        let attribute = owner
            .any_attribute_by_name(column)
            .or_else(|| owner.primary_key.attributes.iter().find(|a| a.name == *column))
            .cloned()
            .ok_or_else(|| MappingError::UnknownColumn {
                column: column.clone(),
                table: owner.name.clone(),
            })?;
        key.add_attribute(attribute);
    }
    Ok(key)
}

/// Rename, redirect or create the edge type of a relationship
fn upsert_edge(
    schema: &DatabaseSchema,
    model: &mut GraphModel,
    rules: &mut MappingRules,
    relationship_id: RelationshipId,
    name: &str,
    direction: Direction,
) -> Result<EdgeId> {
    let relationship = schema.relationship(relationship_id);
    let foreign_vertex = single_vertex(
        rules,
        relationship.foreign_entity,
        &schema.entity(relationship.foreign_entity).name,
    )?;
    let parent_vertex = single_vertex(
        rules,
        relationship.parent_entity,
        &schema.entity(relationship.parent_entity).name,
    )?;
    let (from, to) = match direction {
        Direction::Direct => (foreign_vertex, parent_vertex),
        Direction::Inverse => (parent_vertex, foreign_vertex),
    };

    if let Some(edge) = rules.edge_for_relationship(relationship_id) {
        let previous = model.edge(edge).map(|e| (e.out_vertex, e.in_vertex));
        if let Some(e) = model.edge_mut(edge) {
            e.name = name.to_string();
        }
        if let Some((old_from, old_to)) = previous {
            if old_from != Some(from) || old_to != Some(to) {
                if let Some(v) = old_from.and_then(|id| model.vertex_mut(id)) {
                    v.out_edges.retain(|e| *e != edge);
                }
                if let Some(v) = old_to.and_then(|id| model.vertex_mut(id)) {
                    v.in_edges.retain(|e| *e != edge);
                }
                if let Some(e) = model.edge_mut(edge) {
                    e.out_vertex = Some(from);
                }
                model.wire_edge(edge, from, to);
                debug!("Edge type '{}' redirected", name);
            }
        }
        return Ok(edge);
    }

    let edge = match model.edge_by_name(name).map(|e| e.id) {
        Some(existing) => {
            if let Some(e) = model.edge_mut(existing) {
                e.relationships_represented += 1;
            }
            existing
        }
        None => model.add_edge(name, Some(to)),
    };
    model.wire_edge(edge, from, to);
    rules.upsert_relationship_edge(relationship_id, edge);
    debug!("Edge type '{}' built from configuration", name);
    Ok(edge)
}

fn apply_edge_properties(model: &mut GraphModel, edge: EdgeId, configured: &[ConfiguredProperty]) {
    let Some(edge_type) = model.edge_mut(edge) else {
        return;
    };
    for property in configured {
        let original_type = property.mapping.as_ref().map(|m| m.column_type.as_str());
        match edge_type.property_by_name_mut(&property.name) {
            Some(existing) => configure_property(existing, property, original_type),
            None => {
                let mut created = ModelProperty::new(
                    property.name.as_str(),
                    edge_type.properties.len() + 1,
                    None,
                    false,
                    ElementRef::Edge(edge),
                );
                configure_property(&mut created, property, original_type);
                edge_type.properties.push(created);
            }
        }
    }
}
