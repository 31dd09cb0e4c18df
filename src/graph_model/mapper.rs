//! Mapping rules between the source schema and the graph model.
//!
//! All maps are keyed by arena handles ([`EntityId`], [`VertexId`],
//! [`RelationshipId`], [`EdgeId`]). Lookups that can miss return `Option`.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

use super::model::{EdgeId, VertexId};
use crate::schema_model::{EntityId, RelationshipId};

/// Bidirectional name mapping between one entity's attributes and one
/// vertex type's properties.
///
/// `attribute_to_property` holds every mapped attribute; `None` marks an
/// excluded one. `property_to_attribute` covers included properties only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMapper {
    pub entity: EntityId,
    pub vertex: VertexId,
    pub attribute_to_property: IndexMap<String, Option<String>>,
    pub property_to_attribute: IndexMap<String, String>,
}

impl ClassMapper {
    pub fn new(entity: EntityId, vertex: VertexId) -> Self {
        Self {
            entity,
            vertex,
            attribute_to_property: IndexMap::new(),
            property_to_attribute: IndexMap::new(),
        }
    }

    pub fn map(&mut self, attribute: impl Into<String>, property: impl Into<String>) {
        let attribute = attribute.into();
        let property = property.into();
        self.attribute_to_property
            .insert(attribute.clone(), Some(property.clone()));
        self.property_to_attribute.insert(property, attribute);
    }

    /// Mark an attribute as not migrated
    pub fn exclude(&mut self, attribute: &str) {
        if let Some(Some(property)) = self.attribute_to_property.get(attribute).cloned() {
            self.property_to_attribute.shift_remove(&property);
        }
        self.attribute_to_property.insert(attribute.to_string(), None);
    }

    /// Point an attribute at a new property name, keeping both maps in sync
    pub fn rename_property(&mut self, attribute: &str, new_property: &str) {
        if let Some(Some(old)) = self.attribute_to_property.get(attribute).cloned() {
            self.property_to_attribute.shift_remove(&old);
        }
        self.map(attribute, new_property);
    }

    pub fn property_for(&self, attribute: &str) -> Option<&str> {
        self.attribute_to_property
            .get(attribute)
            .and_then(|p| p.as_deref())
    }

    pub fn attribute_for(&self, property: &str) -> Option<&str> {
        self.property_to_attribute.get(property).map(String::as_str)
    }

    pub fn is_excluded(&self, attribute: &str) -> bool {
        matches!(self.attribute_to_property.get(attribute), Some(None))
    }

    /// True when the two maps mirror each other over included properties
    pub fn is_bijective(&self) -> bool {
        let included = self
            .attribute_to_property
            .values()
            .filter(|p| p.is_some())
            .count();
        included == self.property_to_attribute.len()
            && self
                .property_to_attribute
                .iter()
                .all(|(p, a)| self.property_for(a) == Some(p.as_str()))
    }
}

/// Edge produced by collapsing a join-table vertex
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatorEdge {
    pub out_vertex_name: String,
    pub in_vertex_name: String,
    pub edge: EdgeId,
}

/// Every rule linking source schema elements to graph model elements
#[derive(Debug, Clone, Default)]
pub struct MappingRules {
    class_mappers: Vec<ClassMapper>,
    relationship_to_edge: HashMap<RelationshipId, EdgeId>,
    edge_to_relationships: IndexMap<EdgeId, Vec<RelationshipId>>,
    join_vertex_to_aggregator_edge: IndexMap<VertexId, AggregatorEdge>,
}

impl MappingRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapper, replacing one for the same (entity, vertex) pair
    pub fn upsert_class_mapper(&mut self, mapper: ClassMapper) {
        match self
            .class_mappers
            .iter_mut()
            .find(|m| m.entity == mapper.entity && m.vertex == mapper.vertex)
        {
            Some(existing) => *existing = mapper,
            None => self.class_mappers.push(mapper),
        }
    }

    /// Drop the entity's mappers onto `replaced` vertices and install `mapper`.
    /// Mappers of the same entity onto other vertices are kept.
    pub fn replace_class_mappers(&mut self, replaced: &[VertexId], mapper: ClassMapper) {
        self.class_mappers
            .retain(|m| m.entity != mapper.entity || !replaced.contains(&m.vertex));
        self.upsert_class_mapper(mapper);
    }

    pub fn class_mappers(&self) -> &[ClassMapper] {
        &self.class_mappers
    }

    pub fn class_mappers_for_entity(&self, entity: EntityId) -> impl Iterator<Item = &ClassMapper> {
        self.class_mappers.iter().filter(move |m| m.entity == entity)
    }

    pub fn class_mappers_for_vertex(&self, vertex: VertexId) -> impl Iterator<Item = &ClassMapper> {
        self.class_mappers.iter().filter(move |m| m.vertex == vertex)
    }

    pub fn class_mapper(&self, entity: EntityId, vertex: VertexId) -> Option<&ClassMapper> {
        self.class_mappers
            .iter()
            .find(|m| m.entity == entity && m.vertex == vertex)
    }

    pub fn class_mapper_mut(&mut self, entity: EntityId, vertex: VertexId) -> Option<&mut ClassMapper> {
        self.class_mappers
            .iter_mut()
            .find(|m| m.entity == entity && m.vertex == vertex)
    }

    /// First vertex an entity is mapped to
    pub fn vertex_for_entity(&self, entity: EntityId) -> Option<VertexId> {
        self.class_mappers_for_entity(entity).next().map(|m| m.vertex)
    }

    /// First entity mapped onto a vertex
    pub fn entity_for_vertex(&self, vertex: VertexId) -> Option<EntityId> {
        self.class_mappers_for_vertex(vertex).next().map(|m| m.entity)
    }

    pub fn upsert_relationship_edge(&mut self, relationship: RelationshipId, edge: EdgeId) {
        if let Some(previous) = self.relationship_to_edge.insert(relationship, edge) {
            if previous != edge {
                if let Some(list) = self.edge_to_relationships.get_mut(&previous) {
                    list.retain(|r| *r != relationship);
                }
            }
        }
        let list = self.edge_to_relationships.entry(edge).or_default();
        if !list.contains(&relationship) {
            list.push(relationship);
        }
    }

    pub fn edge_for_relationship(&self, relationship: RelationshipId) -> Option<EdgeId> {
        self.relationship_to_edge.get(&relationship).copied()
    }

    pub fn relationships_for_edge(&self, edge: EdgeId) -> &[RelationshipId] {
        self.edge_to_relationships
            .get(&edge)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn record_aggregator_edge(&mut self, join_vertex: VertexId, aggregator: AggregatorEdge) {
        self.join_vertex_to_aggregator_edge
            .insert(join_vertex, aggregator);
    }

    pub fn aggregator_edge(&self, join_vertex: VertexId) -> Option<&AggregatorEdge> {
        self.join_vertex_to_aggregator_edge.get(&join_vertex)
    }

    pub fn aggregator_edges(&self) -> impl Iterator<Item = (VertexId, &AggregatorEdge)> {
        self.join_vertex_to_aggregator_edge
            .iter()
            .map(|(v, a)| (*v, a))
    }

    /// Which join vertex produced this edge
    pub fn join_vertex_for_aggregator_edge(&self, edge: EdgeId) -> Option<VertexId> {
        self.join_vertex_to_aggregator_edge
            .iter()
            .find(|(_, a)| a.edge == edge)
            .map(|(v, _)| *v)
    }
}
