//! Source schema model: entities, keys, relationships and hierarchical bags
//! discovered from relational metadata.

pub mod bag;
pub mod database;
pub mod entity;
pub mod relationship;

pub use bag::{BagId, HierarchicalBag, InheritancePattern};
pub use database::DatabaseSchema;
pub use entity::{Attribute, Entity, EntityId, Key};
pub use relationship::{Direction, Relationship, RelationshipId};
