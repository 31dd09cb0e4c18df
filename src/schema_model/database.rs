use serde::Serialize;

use super::{
    BagId, Entity, EntityId, HierarchicalBag, InheritancePattern, Relationship, RelationshipId,
};

/// Owning store of the source schema model.
///
/// Entities, relationships and hierarchical bags live in flat arenas and
/// refer to each other through ids, so parent links and back-references
/// never form ownership cycles.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseSchema {
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
    bags: Vec<HierarchicalBag>,
}

impl DatabaseSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, name: impl Into<String>, schema_name: Option<String>) -> EntityId {
        let id = EntityId(self.entities.len());
        self.entities.push(Entity::new(id, name, schema_name));
        id
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> {
        (0..self.entities.len()).map(EntityId)
    }

    /// Exact match first, then a case-insensitive one
    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .or_else(|| self.entities.iter().find(|e| e.name.eq_ignore_ascii_case(name)))
    }

    pub fn entity_id_by_name(&self, name: &str) -> Option<EntityId> {
        self.entity_by_name(name).map(|e| e.id)
    }

    /// Register a relationship and mirror it onto both entities.
    ///
    /// The foreign key is recorded on the foreign entity if it is not
    /// already there.
    pub fn add_relationship(&mut self, relationship: Relationship) -> RelationshipId {
        let id = RelationshipId(self.relationships.len());
        let foreign = relationship.foreign_entity;
        let parent = relationship.parent_entity;

        let foreign_entity = &mut self.entities[foreign.0];
        if !foreign_entity
            .foreign_keys
            .iter()
            .any(|k| *k == relationship.foreign_key)
        {
            foreign_entity
                .foreign_keys
                .push(relationship.foreign_key.clone());
        }
        foreign_entity.out_relationships.push(id);
        self.entities[parent.0].in_relationships.push(id);

        self.relationships.push(relationship);
        id
    }

    pub fn relationship(&self, id: RelationshipId) -> &Relationship {
        &self.relationships[id.0]
    }

    pub fn relationship_mut(&mut self, id: RelationshipId) -> &mut Relationship {
        &mut self.relationships[id.0]
    }

    pub fn relationships(&self) -> impl Iterator<Item = (RelationshipId, &Relationship)> {
        self.relationships
            .iter()
            .enumerate()
            .map(|(i, r)| (RelationshipId(i), r))
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn find_relationship<S: AsRef<str>>(
        &self,
        foreign_entity: EntityId,
        parent_entity: EntityId,
        from_columns: &[S],
        to_columns: &[S],
    ) -> Option<RelationshipId> {
        self.relationships()
            .find(|(_, r)| r.matches(foreign_entity, parent_entity, from_columns, to_columns))
            .map(|(id, _)| id)
    }

    pub fn add_bag(&mut self, pattern: InheritancePattern) -> BagId {
        let id = BagId(self.bags.len());
        self.bags.push(HierarchicalBag::new(id, pattern));
        id
    }

    pub fn bag(&self, id: BagId) -> &HierarchicalBag {
        &self.bags[id.0]
    }

    pub fn bag_mut(&mut self, id: BagId) -> &mut HierarchicalBag {
        &mut self.bags[id.0]
    }

    pub fn bags(&self) -> &[HierarchicalBag] {
        &self.bags
    }

    /// Ancestor chain, nearest parent first
    pub fn ancestors(&self, id: EntityId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut current = self.entity(id).parent;
        while let Some(parent) = current {
            if chain.contains(&parent) || parent == id {
                break;
            }
            chain.push(parent);
            current = self.entity(parent).parent;
        }
        chain
    }

    /// Sync key ordinals held by relationships after an entity's attributes
    /// were renumbered.
    pub fn refresh_relationship_keys(&mut self, id: EntityId) {
        let current = self.entities[id.0].attributes.clone();
        for relationship in &mut self.relationships {
            if relationship.foreign_entity == id {
                relationship.foreign_key.refresh_ordinals(&current);
            }
            if relationship.parent_entity == id {
                relationship.primary_key.refresh_ordinals(&current);
            }
        }
    }
}
