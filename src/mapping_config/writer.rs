//! Renders the current graph model back into a mapping configuration, so a
//! run can be inspected, edited and replayed.

use log::debug;

use super::document::{
    ConfiguredEdgeClass, ConfiguredProperty, ConfiguredVertexClass, EdgeMapping, JoinTableMapping,
    MappingConfiguration, PropertyMapping, SourceTable,
};
use crate::graph_model::{ClassMapper, EdgeType, GraphModel, MappingRules, ModelProperty, VertexType};
use crate::resolver::TargetType;
use crate::schema_model::{DatabaseSchema, Direction, Entity, EntityId, Key, RelationshipId};

#[derive(Debug, Clone)]
pub struct ConfigurationWriter {
    data_source: String,
}

impl ConfigurationWriter {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
        }
    }

    pub fn build(&self, schema: &DatabaseSchema, model: &GraphModel, rules: &MappingRules) -> MappingConfiguration {
        let vertices = model
            .vertices()
            .filter_map(|v| self.vertex_class(schema, rules, v))
            .collect();
        let edges = model
            .edges()
            .filter_map(|e| self.edge_class(schema, rules, e))
            .collect();
        MappingConfiguration { vertices, edges }
    }

    fn vertex_class(
        &self,
        schema: &DatabaseSchema,
        rules: &MappingRules,
        vertex: &VertexType,
    ) -> Option<ConfiguredVertexClass> {
        let mappers: Vec<&ClassMapper> = rules.class_mappers_for_vertex(vertex.id).collect();
        if mappers.is_empty() {
            debug!("Vertex type '{}' has no source table, not written", vertex.name);
            return None;
        }

        let sources: Vec<(SourceTable, &Entity, &ClassMapper)> = mappers
            .iter()
            .map(|m| {
                let entity = schema.entity(m.entity);
                (SourceTable::new(&self.data_source, &entity.name), entity, *m)
            })
            .collect();

        let properties = vertex
            .properties
            .iter()
            .map(|property| {
                let mapping = sources.iter().find_map(|(source, entity, mapper)| {
                    column_for(property, entity, mapper, sources.len() == 1).map(|column| PropertyMapping {
                        source_id: source.source_id.clone(),
                        column_type: entity
                            .any_attribute_by_name(column)
                            .map(|a| a.data_type.clone())
                            .or_else(|| property.original_type.clone())
                            .unwrap_or_default(),
                        column_name: column.to_string(),
                    })
                });
                configured_property(property, mapping)
            })
            .collect();

        Some(ConfiguredVertexClass {
            name: vertex.name.clone(),
            source_tables: sources.into_iter().map(|(source, _, _)| source).collect(),
            aggregation_function: None,
            properties,
        })
    }

    fn edge_class(
        &self,
        schema: &DatabaseSchema,
        rules: &MappingRules,
        edge: &EdgeType,
    ) -> Option<ConfiguredEdgeClass> {
        let mappings = match rules.join_vertex_for_aggregator_edge(edge.id) {
            Some(join_vertex) => {
                let join_entity = rules.entity_for_vertex(join_vertex)?;
                vec![aggregated_mapping(schema, rules, edge, join_entity)?]
            }
            None => rules
                .relationships_for_edge(edge.id)
                .iter()
                .map(|id| relationship_mapping(schema, *id))
                .collect(),
        };
        if mappings.is_empty() {
            debug!("Edge type '{}' represents no relationship, not written", edge.name);
            return None;
        }

        Some(ConfiguredEdgeClass {
            name: edge.name.clone(),
            mappings,
            properties: edge
                .properties
                .iter()
                .map(|p| configured_property(p, None))
                .collect(),
        })
    }
}

/// Source column of a vertex property. Excluded properties lose their
/// mapper entry, so a single-source vertex falls back to the ordinal.
fn column_for<'a>(
    property: &ModelProperty,
    entity: &'a Entity,
    mapper: &'a ClassMapper,
    single_source: bool,
) -> Option<&'a str> {
    if let Some(column) = mapper.attribute_for(&property.name) {
        return Some(column);
    }
    if property.included || !single_source {
        return None;
    }
    entity
        .attributes
        .iter()
        .find(|a| a.ordinal_position == property.ordinal_position && mapper.is_excluded(&a.name))
        .map(|a| a.name.as_str())
}

fn configured_property(property: &ModelProperty, mapping: Option<PropertyMapping>) -> ConfiguredProperty {
    ConfiguredProperty {
        name: property.name.clone(),
        include: property.included,
        target_type: property.target_type.unwrap_or(TargetType::String),
        mandatory: property.mandatory.unwrap_or(false),
        read_only: property.read_only.unwrap_or(false),
        not_null: property.not_null.unwrap_or(false),
        mapping,
    }
}

fn relationship_mapping(schema: &DatabaseSchema, id: RelationshipId) -> EdgeMapping {
    let relationship = schema.relationship(id);
    EdgeMapping {
        from_table: schema.entity(relationship.foreign_entity).name.clone(),
        to_table: schema.entity(relationship.parent_entity).name.clone(),
        from_columns: columns(&relationship.foreign_key),
        to_columns: columns(&relationship.primary_key),
        direction: Some(relationship.direction),
        join_table: None,
    }
}

/// Mapping of an edge collapsed from a join table. `from`/`to` follow the
/// declared direction, so replaying it rebuilds the same endpoints.
fn aggregated_mapping(
    schema: &DatabaseSchema,
    rules: &MappingRules,
    edge: &EdgeType,
    join_entity: EntityId,
) -> Option<EdgeMapping> {
    let join = schema.entity(join_entity);
    let direction = join.n2n_direction_or_default();
    let out_entity = rules.entity_for_vertex(edge.out_vertex?)?;
    let in_entity = rules.entity_for_vertex(edge.in_vertex?)?;
    let (from, to) = match direction {
        Direction::Direct => (out_entity, in_entity),
        Direction::Inverse => (in_entity, out_entity),
    };

    let from_side = join
        .out_relationships
        .iter()
        .copied()
        .find(|r| schema.relationship(*r).parent_entity == from)?;
    let to_side = join
        .out_relationships
        .iter()
        .copied()
        .find(|r| *r != from_side && schema.relationship(*r).parent_entity == to)?;

    let from_relationship = schema.relationship(from_side);
    let to_relationship = schema.relationship(to_side);
    Some(EdgeMapping {
        from_table: schema.entity(from).name.clone(),
        to_table: schema.entity(to).name.clone(),
        from_columns: columns(&from_relationship.primary_key),
        to_columns: columns(&to_relationship.primary_key),
        direction: Some(direction),
        join_table: Some(JoinTableMapping {
            table_name: join.name.clone(),
            from_columns: columns(&from_relationship.foreign_key),
            to_columns: columns(&to_relationship.foreign_key),
        }),
    })
}

fn columns(key: &Key) -> Vec<String> {
    key.attributes.iter().map(|a| a.name.clone()).collect()
}
