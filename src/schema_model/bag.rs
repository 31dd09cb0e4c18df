use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::EntityId;
use crate::errors::MappingError;

/// Handle of a [`HierarchicalBag`] inside a [`DatabaseSchema`](super::DatabaseSchema)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BagId(pub usize);

/// Storage strategy of an inheritance tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InheritancePattern {
    /// One table holds the whole hierarchy; a discriminator selects the subtype
    TablePerHierarchy,
    /// One table per subtype sharing the parent's primary key
    TablePerType,
    /// One independent table per concrete subtype
    TablePerConcreteType,
}

impl InheritancePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            InheritancePattern::TablePerHierarchy => "table-per-hierarchy",
            InheritancePattern::TablePerType => "table-per-type",
            InheritancePattern::TablePerConcreteType => "table-per-concrete-type",
        }
    }
}

impl fmt::Display for InheritancePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InheritancePattern {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table-per-hierarchy" => Ok(InheritancePattern::TablePerHierarchy),
            "table-per-type" => Ok(InheritancePattern::TablePerType),
            "table-per-concrete-type" => Ok(InheritancePattern::TablePerConcreteType),
            other => Err(MappingError::InvalidDescriptor {
                message: format!("unknown inheritance pattern '{}'", other),
            }),
        }
    }
}

/// Entities that together encode one inheritance tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalBag {
    pub id: BagId,
    pub pattern: InheritancePattern,
    pub depth_to_entities: BTreeMap<usize, BTreeSet<EntityId>>,
    pub discriminator_column: Option<String>,
    /// Entity name -> discriminator value (table-per-hierarchy only)
    pub discriminator_values: BTreeMap<String, String>,
}

impl HierarchicalBag {
    pub fn new(id: BagId, pattern: InheritancePattern) -> Self {
        Self {
            id,
            pattern,
            depth_to_entities: BTreeMap::new(),
            discriminator_column: None,
            discriminator_values: BTreeMap::new(),
        }
    }

    /// Place an entity at a depth. An entity already present is moved.
    pub fn insert(&mut self, depth: usize, entity: EntityId) {
        for entities in self.depth_to_entities.values_mut() {
            entities.remove(&entity);
        }
        self.depth_to_entities.retain(|_, entities| !entities.is_empty());
        self.depth_to_entities
            .entry(depth)
            .or_default()
            .insert(entity);
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.depth_to_entities.values().flatten().copied()
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities().any(|e| e == entity)
    }

    pub fn depth_of(&self, entity: EntityId) -> Option<usize> {
        self.depth_to_entities
            .iter()
            .find(|(_, entities)| entities.contains(&entity))
            .map(|(depth, _)| *depth)
    }

    pub fn roots(&self) -> Vec<EntityId> {
        self.depth_to_entities
            .get(&0)
            .map(|entities| entities.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Depth keys run 0..n without gaps
    pub fn has_contiguous_depths(&self) -> bool {
        self.depth_to_entities
            .keys()
            .enumerate()
            .all(|(expected, depth)| expected == *depth)
    }
}
