use serde::Serialize;
use std::fmt;

use super::mapper::MappingRules;
use crate::resolver::TargetType;

/// Handle of a [`VertexType`] inside a [`GraphModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VertexId(pub usize);

/// Handle of an [`EdgeType`] inside a [`GraphModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeId(pub usize);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vertex#{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge#{}", self.0)
    }
}

/// Graph element owning a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementRef {
    Vertex(VertexId),
    Edge(EdgeId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelProperty {
    pub name: String,
    pub ordinal_position: usize,
    /// Source type name, when the property comes from a column
    pub original_type: Option<String>,
    pub target_type: Option<TargetType>,
    pub from_primary_key: bool,
    pub belonging_element: ElementRef,
    pub mandatory: Option<bool>,
    pub read_only: Option<bool>,
    pub not_null: Option<bool>,
    /// Excluded properties stay in the model but are not migrated
    pub included: bool,
}

impl ModelProperty {
    pub fn new(
        name: impl Into<String>,
        ordinal_position: usize,
        original_type: Option<String>,
        from_primary_key: bool,
        belonging_element: ElementRef,
    ) -> Self {
        Self {
            name: name.into(),
            ordinal_position,
            original_type,
            target_type: None,
            from_primary_key,
            belonging_element,
            mandatory: None,
            read_only: None,
            not_null: None,
            included: true,
        }
    }

    /// Copy onto another element, keeping type and constraints
    pub fn copy_to(&self, element: ElementRef, ordinal_position: usize) -> Self {
        Self {
            ordinal_position,
            belonging_element: element,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexType {
    pub id: VertexId,
    pub name: String,
    pub properties: Vec<ModelProperty>,
    pub inherited_properties: Vec<ModelProperty>,
    pub parent_type: Option<VertexId>,
    pub inheritance_depth: usize,
    pub out_edges: Vec<EdgeId>,
    pub in_edges: Vec<EdgeId>,
    pub from_join_table: bool,
}

impl VertexType {
    pub fn property_by_name(&self, name: &str) -> Option<&ModelProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_by_name_mut(&mut self, name: &str) -> Option<&mut ModelProperty> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    pub fn inherited_property_by_name(&self, name: &str) -> Option<&ModelProperty> {
        self.inherited_properties.iter().find(|p| p.name == name)
    }

    pub fn add_out_edge(&mut self, edge: EdgeId) {
        if !self.out_edges.contains(&edge) {
            self.out_edges.push(edge);
        }
    }

    pub fn add_in_edge(&mut self, edge: EdgeId) {
        if !self.in_edges.contains(&edge) {
            self.in_edges.push(edge);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeType {
    pub id: EdgeId,
    pub name: String,
    pub properties: Vec<ModelProperty>,
    pub out_vertex: Option<VertexId>,
    pub in_vertex: Option<VertexId>,
    /// Starts at 1; shared edge names count every relationship they stand for
    pub relationships_represented: usize,
}

impl EdgeType {
    pub fn property_by_name(&self, name: &str) -> Option<&ModelProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_by_name_mut(&mut self, name: &str) -> Option<&mut ModelProperty> {
        self.properties.iter_mut().find(|p| p.name == name)
    }
}

/// Arena of vertex and edge types.
///
/// Removed elements leave a tombstone so ids stay stable; the ordered lists
/// hold the live elements in presentation order.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    vertex_store: Vec<Option<VertexType>>,
    vertex_order: Vec<VertexId>,
    edge_store: Vec<Option<EdgeType>>,
    edge_order: Vec<EdgeId>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, name: impl Into<String>) -> VertexId {
        let id = VertexId(self.vertex_store.len());
        self.vertex_store.push(Some(VertexType {
            id,
            name: name.into(),
            properties: Vec::new(),
            inherited_properties: Vec::new(),
            parent_type: None,
            inheritance_depth: 0,
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            from_join_table: false,
        }));
        self.vertex_order.push(id);
        id
    }

    pub fn add_edge(&mut self, name: impl Into<String>, in_vertex: Option<VertexId>) -> EdgeId {
        let id = EdgeId(self.edge_store.len());
        self.edge_store.push(Some(EdgeType {
            id,
            name: name.into(),
            properties: Vec::new(),
            out_vertex: None,
            in_vertex,
            relationships_represented: 1,
        }));
        self.edge_order.push(id);
        id
    }

    pub fn vertex(&self, id: VertexId) -> Option<&VertexType> {
        self.vertex_store.get(id.0).and_then(Option::as_ref)
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut VertexType> {
        self.vertex_store.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&EdgeType> {
        self.edge_store.get(id.0).and_then(Option::as_ref)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut EdgeType> {
        self.edge_store.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Live vertices in model order
    pub fn vertices(&self) -> impl Iterator<Item = &VertexType> {
        self.vertex_order.iter().filter_map(|id| self.vertex(*id))
    }

    /// Live edges in model order
    pub fn edges(&self) -> impl Iterator<Item = &EdgeType> {
        self.edge_order.iter().filter_map(|id| self.edge(*id))
    }

    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertex_order.clone()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edge_order.clone()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    pub fn vertex_by_name(&self, name: &str) -> Option<&VertexType> {
        self.vertices().find(|v| v.name == name)
    }

    pub fn vertex_by_name_ignore_case(&self, name: &str) -> Option<&VertexType> {
        self.vertices().find(|v| v.name.eq_ignore_ascii_case(name))
    }

    pub fn edge_by_name(&self, name: &str) -> Option<&EdgeType> {
        self.edges().find(|e| e.name == name)
    }

    pub fn vertex_name(&self, id: VertexId) -> Option<&str> {
        self.vertex(id).map(|v| v.name.as_str())
    }

    pub fn remove_vertex(&mut self, id: VertexId) -> Option<VertexType> {
        self.vertex_order.retain(|v| *v != id);
        self.vertex_store.get_mut(id.0).and_then(Option::take)
    }

    /// Remove an edge and every vertex reference to it
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<EdgeType> {
        self.edge_order.retain(|e| *e != id);
        for vertex in self.vertex_store.iter_mut().flatten() {
            vertex.out_edges.retain(|e| *e != id);
            vertex.in_edges.retain(|e| *e != id);
        }
        self.edge_store.get_mut(id.0).and_then(Option::take)
    }

    /// Order vertices by (inheritance depth, name); parents precede children
    pub fn sort_vertices(&mut self) {
        let store = &self.vertex_store;
        self.vertex_order.sort_by(|a, b| {
            match (
                store.get(a.0).and_then(Option::as_ref),
                store.get(b.0).and_then(Option::as_ref),
            ) {
                (Some(va), Some(vb)) => va
                    .inheritance_depth
                    .cmp(&vb.inheritance_depth)
                    .then_with(|| va.name.cmp(&vb.name)),
                _ => a.cmp(b),
            }
        });
    }

    /// Connect an edge: `from` gets it as out-edge, `to` as in-edge
    pub fn wire_edge(&mut self, edge: EdgeId, from: VertexId, to: VertexId) {
        if let Some(vertex) = self.vertex_mut(from) {
            vertex.add_out_edge(edge);
        }
        if let Some(vertex) = self.vertex_mut(to) {
            vertex.add_in_edge(edge);
        }
        if let Some(e) = self.edge_mut(edge) {
            if e.out_vertex.is_none() {
                e.out_vertex = Some(from);
            }
            e.in_vertex = Some(to);
        }
    }

    /// Property of a vertex by name, walking up the parent chain for
    /// inherited ones.
    pub fn property_in_hierarchy(&self, vertex: VertexId, name: &str) -> Option<&ModelProperty> {
        let mut current = Some(vertex);
        let mut hops = 0;
        while let Some(id) = current {
            let v = self.vertex(id)?;
            if let Some(property) = v.property_by_name(name) {
                return Some(property);
            }
            hops += 1;
            if hops > self.vertex_store.len() {
                return None;
            }
            current = v.parent_type;
        }
        None
    }

    /// Property mapped from a source column, searching the vertex's own
    /// mappers first and then each ancestor's.
    pub fn property_by_attribute(
        &self,
        rules: &MappingRules,
        vertex: VertexId,
        attribute: &str,
    ) -> Option<&ModelProperty> {
        let mut current = Some(vertex);
        let mut hops = 0;
        while let Some(id) = current {
            let v = self.vertex(id)?;
            let property = rules
                .class_mappers_for_vertex(id)
                .find_map(|m| m.property_for(attribute));
            if let Some(name) = property {
                return v.property_by_name(name);
            }
            hops += 1;
            if hops > self.vertex_store.len() {
                return None;
            }
            current = v.parent_type;
        }
        None
    }
}
