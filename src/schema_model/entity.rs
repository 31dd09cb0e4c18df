use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::{BagId, Direction, RelationshipId};

/// Handle of an [`Entity`] inside a [`DatabaseSchema`](super::DatabaseSchema)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// One source column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    /// 1-based position in the source table
    pub ordinal_position: usize,
    pub data_type: String,
    pub belonging_entity: EntityId,
}

impl Attribute {
    pub fn new(
        name: impl Into<String>,
        ordinal_position: usize,
        data_type: impl Into<String>,
        belonging_entity: EntityId,
    ) -> Self {
        Self {
            name: name.into(),
            ordinal_position,
            data_type: data_type.into(),
            belonging_entity,
        }
    }
}

impl PartialOrd for Attribute {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Attribute {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal_position
            .cmp(&other.ordinal_position)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Primary or foreign key: an ordered, duplicate-free attribute list.
///
/// Position `i` of a foreign key corresponds to position `i` of the
/// referenced primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub belonging_entity: EntityId,
    pub attributes: Vec<Attribute>,
}

impl Key {
    pub fn new(belonging_entity: EntityId) -> Self {
        Self {
            belonging_entity,
            attributes: Vec::new(),
        }
    }

    /// Append an attribute unless one with the same name is already present
    pub fn add_attribute(&mut self, attribute: Attribute) -> bool {
        if self.contains(&attribute.name) {
            return false;
        }
        self.attributes.push(attribute);
        true
    }

    pub fn contains(&self, attribute_name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == attribute_name)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// Same key columns, compared by name and order only
    pub fn same_columns<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        self.attributes.len() == columns.len()
            && self
                .attributes
                .iter()
                .zip(columns)
                .all(|(a, c)| a.name == c.as_ref())
    }

    /// Re-read ordinal positions from the owning entity's current attribute list
    pub(crate) fn refresh_ordinals(&mut self, current: &[Attribute]) {
        for attribute in &mut self.attributes {
            if let Some(found) = current.iter().find(|a| a.name == attribute.name) {
                attribute.ordinal_position = found.ordinal_position;
            }
        }
    }
}

/// In-memory representation of one source table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub schema_name: Option<String>,
    pub attributes: Vec<Attribute>,
    /// Copies of ancestor attributes, root ancestor first
    pub inherited_attributes: Vec<Attribute>,
    pub primary_key: Key,
    pub foreign_keys: Vec<Key>,
    pub out_relationships: Vec<RelationshipId>,
    pub in_relationships: Vec<RelationshipId>,
    pub inherited_out_relationships: Vec<RelationshipId>,
    pub inherited_in_relationships: Vec<RelationshipId>,
    pub parent: Option<EntityId>,
    /// 0 for roots and for entities outside any hierarchy
    pub inheritance_depth: usize,
    pub hierarchical_bag: Option<BagId>,
    /// Exactly two foreign keys covering the whole primary key
    pub join_table_dim2: bool,
    /// Set by configuration when a join table backs a configured edge
    pub aggregable_join_table: bool,
    pub n2n_relationship_name: Option<String>,
    pub n2n_direction: Option<Direction>,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, schema_name: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            schema_name,
            attributes: Vec::new(),
            inherited_attributes: Vec::new(),
            primary_key: Key::new(id),
            foreign_keys: Vec::new(),
            out_relationships: Vec::new(),
            in_relationships: Vec::new(),
            inherited_out_relationships: Vec::new(),
            inherited_in_relationships: Vec::new(),
            parent: None,
            inheritance_depth: 0,
            hierarchical_bag: None,
            join_table_dim2: false,
            aggregable_join_table: false,
            n2n_relationship_name: None,
            n2n_direction: None,
        }
    }

    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Own attribute first, then inherited ones
    pub fn any_attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attribute_by_name(name)
            .or_else(|| self.inherited_attributes.iter().find(|a| a.name == name))
    }

    pub fn attribute_by_name_ignore_case(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Remove an own attribute, returning it
    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index))
    }

    /// Reassign own ordinal positions 1..n in current order and sync the
    /// entity's own keys.
    pub fn renumber_attributes(&mut self) {
        for (index, attribute) in self.attributes.iter_mut().enumerate() {
            attribute.ordinal_position = index + 1;
        }
        let current = self.attributes.clone();
        self.primary_key.refresh_ordinals(&current);
        for key in &mut self.foreign_keys {
            key.refresh_ordinals(&current);
        }
    }

    /// Direction of the represented N-N relationship, `direct` when unset
    pub fn n2n_direction_or_default(&self) -> Direction {
        self.n2n_direction.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_with(columns: &[&str]) -> Entity {
        let id = EntityId(0);
        let mut entity = Entity::new(id, "EMPLOYEE", None);
        for (i, c) in columns.iter().enumerate() {
            entity
                .attributes
                .push(Attribute::new(*c, i + 1, "VARCHAR", id));
        }
        entity
    }

    #[test]
    fn test_attributes_order_by_position() {
        let id = EntityId(0);
        let mut attrs = vec![
            Attribute::new("NAME", 2, "VARCHAR", id),
            Attribute::new("ID", 1, "INTEGER", id),
        ];
        attrs.sort();
        assert_eq!(attrs[0].name, "ID");
    }

    #[test]
    fn test_key_rejects_duplicates() {
        let id = EntityId(0);
        let mut key = Key::new(id);
        assert!(key.add_attribute(Attribute::new("ID", 1, "INTEGER", id)));
        assert!(!key.add_attribute(Attribute::new("ID", 1, "INTEGER", id)));
        assert_eq!(key.len(), 1);
        assert!(key.same_columns(&["ID"]));
    }

    #[test]
    fn test_renumber_syncs_primary_key() {
        let mut entity = entity_with(&["ID", "TYPE", "NAME"]);
        let name = entity.attribute_by_name("NAME").cloned().unwrap();
        entity.primary_key.add_attribute(name);

        entity.remove_attribute("TYPE");
        entity.renumber_attributes();

        assert_eq!(entity.attribute_by_name("NAME").unwrap().ordinal_position, 2);
        assert_eq!(entity.primary_key.attributes[0].ordinal_position, 2);
    }
}
