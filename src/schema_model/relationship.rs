use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{EntityId, Key};
use crate::errors::MappingError;

/// Handle of a [`Relationship`] inside a [`DatabaseSchema`](super::DatabaseSchema)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipId(pub usize);

/// Which way the derived edge points.
///
/// `Direct` goes from the foreign (referencing) entity to the parent
/// (referenced) entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Direct,
    Inverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Direct => "direct",
            Direction::Inverse => "inverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Direction::Direct),
            "inverse" => Ok(Direction::Inverse),
            other => Err(MappingError::invalid_value("direction", other, "relationship")),
        }
    }
}

/// One logical, possibly composite, foreign-key reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub foreign_entity: EntityId,
    pub parent_entity: EntityId,
    pub foreign_key: Key,
    pub primary_key: Key,
    pub direction: Direction,
}

impl Relationship {
    pub fn new(
        foreign_entity: EntityId,
        parent_entity: EntityId,
        foreign_key: Key,
        primary_key: Key,
    ) -> Self {
        Self {
            foreign_entity,
            parent_entity,
            foreign_key,
            primary_key,
            direction: Direction::Direct,
        }
    }

    /// Matches on both entities and on the column lists of both keys
    pub fn matches<S: AsRef<str>>(
        &self,
        foreign_entity: EntityId,
        parent_entity: EntityId,
        from_columns: &[S],
        to_columns: &[S],
    ) -> bool {
        self.foreign_entity == foreign_entity
            && self.parent_entity == parent_entity
            && self.foreign_key.same_columns(from_columns)
            && self.primary_key.same_columns(to_columns)
    }
}

/// Equality ignores direction.
impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.foreign_entity == other.foreign_entity
            && self.parent_entity == other.parent_entity
            && self.foreign_key == other.foreign_key
            && self.primary_key == other.primary_key
    }
}

impl Eq for Relationship {}
