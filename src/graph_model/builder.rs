//! Schema model -> graph model.
//!
//! One vertex type per entity, carrying own and inherited properties, and
//! one edge type per distinct edge name. Relationships that only encode
//! table-per-type inheritance produce no edge.

use log::{debug, info};

use super::mapper::{ClassMapper, MappingRules};
use super::model::{EdgeId, ElementRef, GraphModel, ModelProperty, VertexId};
use crate::pipeline::{MappingContext, Phase};
use crate::resolver::{NameResolver, TypeResolver};
use crate::schema_model::{Attribute, DatabaseSchema, Direction, Entity, EntityId};

pub struct GraphModelBuilder<'a> {
    name_resolver: &'a dyn NameResolver,
    type_resolver: TypeResolver,
}

impl<'a> GraphModelBuilder<'a> {
    pub fn new(name_resolver: &'a dyn NameResolver, type_resolver: TypeResolver) -> Self {
        Self {
            name_resolver,
            type_resolver,
        }
    }

    pub fn build(&self, schema: &DatabaseSchema, ctx: &mut MappingContext) -> (GraphModel, MappingRules) {
        let mut model = GraphModel::new();
        let mut rules = MappingRules::new();

        self.build_vertex_types(schema, &mut model, &mut rules, ctx);
        self.build_edge_types(schema, &mut model, &mut rules, ctx);

        ctx.statistics.built_vertex_types = model.vertex_count();
        ctx.statistics.built_edge_types = model.edge_count();
        info!(
            "Graph model built: {} vertex types, {} edge types",
            model.vertex_count(),
            model.edge_count()
        );
        ctx.notify(Phase::GraphModelBuilding);
        (model, rules)
    }

    fn build_vertex_types(
        &self,
        schema: &DatabaseSchema,
        model: &mut GraphModel,
        rules: &mut MappingRules,
        ctx: &mut MappingContext,
    ) {
        let total = schema.entities().len();
        for (index, entity) in schema.entities().iter().enumerate() {
            let name = self.name_resolver.resolve_vertex_name(&entity.name);
            debug!("Building '{}' vertex type ({}/{})", name, index + 1, total);

            // Reuse a vertex type that already carries this name
            let vertex = match model.vertex_by_name(&name) {
                Some(existing) => existing.id,
                None => model.add_vertex(name.as_str()),
            };

            let from_join_table = entity.aggregable_join_table
                || (ctx.execution_mode.aggregates() && entity.join_table_dim2);

            let mut mapper = ClassMapper::new(entity.id, vertex);
            let mut properties = Vec::with_capacity(entity.attributes.len());
            for attribute in &entity.attributes {
                let property = self.property_from(attribute, entity, ElementRef::Vertex(vertex), ctx);
                mapper.map(attribute.name.as_str(), property.name.as_str());
                properties.push(property);
            }
            let inherited: Vec<ModelProperty> = entity
                .inherited_attributes
                .iter()
                .map(|a| self.property_from(a, entity, ElementRef::Vertex(vertex), ctx))
                .collect();

            if let Some(v) = model.vertex_mut(vertex) {
                v.from_join_table = from_join_table;
                v.inheritance_depth = entity.inheritance_depth;
                for property in properties {
                    if v.property_by_name(&property.name).is_none() {
                        v.properties.push(property);
                    }
                }
                v.inherited_properties = inherited;
            }
            rules.upsert_class_mapper(mapper);
        }

        // Parents may appear after their children in schema order
        for entity in schema.entities() {
            let Some(parent) = entity.parent else {
                continue;
            };
            let (Some(child_vertex), Some(parent_vertex)) =
                (rules.vertex_for_entity(entity.id), rules.vertex_for_entity(parent))
            else {
                continue;
            };
            if let Some(v) = model.vertex_mut(child_vertex) {
                v.parent_type = Some(parent_vertex);
                v.inheritance_depth = entity.inheritance_depth;
            }
        }

        model.sort_vertices();
    }

    fn property_from(
        &self,
        attribute: &Attribute,
        entity: &Entity,
        owner: ElementRef,
        ctx: &mut MappingContext,
    ) -> ModelProperty {
        let mut property = ModelProperty::new(
            self.name_resolver.resolve_vertex_property(&attribute.name),
            attribute.ordinal_position,
            Some(attribute.data_type.clone()),
            entity.primary_key.contains(&attribute.name),
            owner,
        );
        property.target_type = Some(self.type_resolver.resolve(&attribute.data_type, ctx));
        property
    }

    fn build_edge_types(
        &self,
        schema: &DatabaseSchema,
        model: &mut GraphModel,
        rules: &mut MappingRules,
        ctx: &mut MappingContext,
    ) {
        for entity in schema.entities() {
            for relationship_id in &entity.out_relationships {
                let relationship = schema.relationship(*relationship_id);
                let (Some(foreign_vertex), Some(parent_vertex)) = (
                    rules.vertex_for_entity(relationship.foreign_entity),
                    rules.vertex_for_entity(relationship.parent_entity),
                ) else {
                    ctx.warn(format!(
                        "Information loss: relationship from '{}' to '{}' has no vertex types, edge type not built",
                        entity.name,
                        schema.entity(relationship.parent_entity).name
                    ));
                    continue;
                };

                if rules.edge_for_relationship(*relationship_id).is_some() {
                    continue;
                }
                if encodes_inheritance(schema, entity, relationship.parent_entity) {
                    debug!(
                        "Relationship {} -> {} encodes inheritance, no edge type",
                        entity.name,
                        schema.entity(relationship.parent_entity).name
                    );
                    continue;
                }

                let name = self.name_resolver.resolve_edge_name(schema, relationship);
                let (from, to) = match relationship.direction {
                    Direction::Direct => (foreign_vertex, parent_vertex),
                    Direction::Inverse => (parent_vertex, foreign_vertex),
                };

                let edge = match model.edge_by_name(&name).map(|e| e.id) {
                    Some(existing) => {
                        if let Some(e) = model.edge_mut(existing) {
                            e.relationships_represented += 1;
                        }
                        debug!("Edge type '{}' reused", name);
                        existing
                    }
                    None => {
                        debug!("Edge type '{}' built", name);
                        model.add_edge(name.as_str(), Some(to))
                    }
                };
                model.wire_edge(edge, from, to);
                rules.upsert_relationship_edge(*relationship_id, edge);
            }
        }

        // Inherited relationships reuse the edge of the ancestor that owns them
        for entity in schema.entities() {
            let Some(own_vertex) = rules.vertex_for_entity(entity.id) else {
                continue;
            };
            for relationship_id in &entity.inherited_out_relationships {
                let Some(edge) = rules.edge_for_relationship(*relationship_id) else {
                    continue;
                };
                let relationship = schema.relationship(*relationship_id);
                let Some(parent_vertex) = rules.vertex_for_entity(relationship.parent_entity) else {
                    continue;
                };
                attach_inherited(model, edge, own_vertex, parent_vertex, relationship.direction);
            }
        }
    }
}

fn attach_inherited(
    model: &mut GraphModel,
    edge: EdgeId,
    own_vertex: VertexId,
    parent_vertex: VertexId,
    direction: Direction,
) {
    let (from, to) = match direction {
        Direction::Direct => (own_vertex, parent_vertex),
        Direction::Inverse => (parent_vertex, own_vertex),
    };
    if let Some(v) = model.vertex_mut(from) {
        v.add_out_edge(edge);
    }
    if let Some(v) = model.vertex_mut(to) {
        v.add_in_edge(edge);
    }
}

/// The relationship points at the entity's declared parent table.
///
/// Compared by name: a genuine foreign key to the same parent table is
/// indistinguishable from the inheritance link.
fn encodes_inheritance(schema: &DatabaseSchema, entity: &Entity, parent_entity: EntityId) -> bool {
    match entity.parent {
        Some(declared) => schema.entity(declared).name == schema.entity(parent_entity).name,
        None => false,
    }
}
