//! Join-table aggregation.
//!
//! A vertex type coming from a two-foreign-key join table, with exactly two
//! out-edges, is replaced by a single edge type between the two vertex
//! types it links. The join vertex disappears from the model; the source
//! entity and its class mapper stay, and an [`AggregatorEdge`] records
//! which join vertex produced the new edge.

use log::{debug, info};
use std::collections::HashSet;

use super::mapper::{AggregatorEdge, MappingRules};
use super::model::{EdgeId, ElementRef, GraphModel, ModelProperty, VertexId};
use crate::pipeline::{MappingContext, Phase};
use crate::schema_model::{DatabaseSchema, Direction};

#[derive(Debug, Clone, Default)]
pub struct JoinTableAggregator {
    /// Join tables left alone by this pass
    skipped_tables: HashSet<String>,
}

impl JoinTableAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipping_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skipped_tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    /// Collapse every candidate join vertex; returns how many were collapsed
    pub fn aggregate(
        &self,
        schema: &DatabaseSchema,
        model: &mut GraphModel,
        rules: &mut MappingRules,
        ctx: &mut MappingContext,
    ) -> usize {
        debug!("Join table aggregation phase...");
        let mut aggregated = 0;
        let mut removed_edges = 0;

        for vertex_id in model.vertex_ids() {
            let Some(vertex) = model.vertex(vertex_id) else {
                continue;
            };
            if !vertex.from_join_table || vertex.out_edges.len() != 2 {
                continue;
            }
            let Some(entity_id) = rules.entity_for_vertex(vertex_id) else {
                continue;
            };
            let entity = schema.entity(entity_id);
            if self.skipped_tables.contains(&entity.name) {
                continue;
            }

            let (edge1, edge2) = (vertex.out_edges[0], vertex.out_edges[1]);
            let direction = entity.n2n_direction_or_default();
            let name = entity.n2n_relationship_name.as_deref();
            let Some((aggregator, removed)) = self.collapse(model, vertex_id, (edge1, edge2), direction, name) else {
                continue;
            };
            removed_edges += removed;

            info!(
                "Join table '{}' aggregated into edge type from '{}' to '{}'",
                entity.name, aggregator.out_vertex_name, aggregator.in_vertex_name
            );
            rules.record_aggregator_edge(vertex_id, aggregator);
            aggregated += 1;
        }

        ctx.statistics.aggregated_join_vertices += aggregated;
        ctx.statistics.removed_edge_types += removed_edges;
        ctx.statistics.built_vertex_types = model.vertex_count();
        ctx.statistics.built_edge_types = model.edge_count();
        ctx.notify(Phase::JoinTableAggregation);
        aggregated
    }

    fn collapse(
        &self,
        model: &mut GraphModel,
        join_vertex: VertexId,
        (edge1, edge2): (EdgeId, EdgeId),
        direction: Direction,
        relationship_name: Option<&str>,
    ) -> Option<(AggregatorEdge, usize)> {
        let vertex = model.vertex(join_vertex)?;
        let first = model.edge(edge1)?;
        let second = model.edge(edge2)?;

        let (out_vertex, in_vertex) = match direction {
            Direction::Direct => (first.in_vertex?, second.in_vertex?),
            Direction::Inverse => (second.in_vertex?, first.in_vertex?),
        };

        let name = relationship_name
            .map(str::to_string)
            .unwrap_or_else(|| vertex.name.clone());

        // Join-vertex columns outside the key, then both old edges' properties
        let candidates: Vec<ModelProperty> = vertex
            .properties
            .iter()
            .filter(|p| !p.from_primary_key)
            .chain(first.properties.iter())
            .chain(second.properties.iter())
            .cloned()
            .collect();

        let new_edge = model.add_edge(name.as_str(), Some(in_vertex));
        let mut properties: Vec<ModelProperty> = Vec::new();
        for property in candidates {
            if properties.iter().any(|p| p.name == property.name) {
                continue;
            }
            let position = properties.len() + 1;
            properties.push(property.copy_to(ElementRef::Edge(new_edge), position));
        }
        if let Some(edge) = model.edge_mut(new_edge) {
            edge.properties = properties;
            edge.out_vertex = Some(out_vertex);
        }

        // A shared edge loses one count and stays wired for its other relationships
        let mut removed = 0;
        for old in [edge1, edge2] {
            let remaining = match model.edge_mut(old) {
                Some(edge) => {
                    edge.relationships_represented = edge.relationships_represented.saturating_sub(1);
                    edge.relationships_represented
                }
                None => continue,
            };
            if remaining == 0 {
                model.remove_edge(old);
                removed += 1;
            }
        }

        let out_vertex_name = model.vertex_name(out_vertex)?.to_string();
        let in_vertex_name = model.vertex_name(in_vertex)?.to_string();

        model.remove_vertex(join_vertex);
        model.wire_edge(new_edge, out_vertex, in_vertex);

        let aggregator = AggregatorEdge {
            out_vertex_name,
            in_vertex_name,
            edge: new_edge,
        };
        Some((aggregator, removed))
    }
}
