use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::MappingError;
use crate::schema_model::{DatabaseSchema, Relationship};

/// Maps source names onto graph names
pub trait NameResolver {
    fn resolve_vertex_name(&self, table_name: &str) -> String;
    fn resolve_vertex_property(&self, column_name: &str) -> String;
    fn resolve_edge_name(&self, schema: &DatabaseSchema, relationship: &Relationship) -> String;
}

/// Class names in UpperCamelCase, properties in lowerCamelCase, edges
/// named `Has<Column>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaConventionNameResolver;

impl JavaConventionNameResolver {
    fn class_case(name: &str) -> String {
        if is_compound(name) {
            name.split(|c: char| c == '_' || c == ' ' || c == '-')
                .filter(|part| !part.is_empty())
                .map(capitalize_lowering_rest)
                .collect()
        } else {
            capitalize(name)
        }
    }

    fn variable_case(name: &str) -> String {
        let class = Self::class_case(name);
        let mut chars = class.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => class,
        }
    }
}

/// Separated or shouting names get every word re-cased; camel names are
/// kept as they are.
fn is_compound(name: &str) -> bool {
    name.contains(['_', ' ', '-']) || !name.chars().any(|c| c.is_ascii_lowercase())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize_lowering_rest(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

impl NameResolver for JavaConventionNameResolver {
    fn resolve_vertex_name(&self, table_name: &str) -> String {
        Self::class_case(table_name)
    }

    fn resolve_vertex_property(&self, column_name: &str) -> String {
        Self::variable_case(column_name)
    }

    fn resolve_edge_name(&self, schema: &DatabaseSchema, relationship: &Relationship) -> String {
        match relationship.foreign_key.attributes.as_slice() {
            [single] => format!("Has{}", Self::class_case(&single.name)),
            _ => {
                let parent = &schema.entity(relationship.parent_entity).name;
                format!("Has{}", Self::class_case(parent))
            }
        }
    }
}

/// Keeps source names untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalNameResolver;

impl NameResolver for OriginalNameResolver {
    fn resolve_vertex_name(&self, table_name: &str) -> String {
        table_name.to_string()
    }

    fn resolve_vertex_property(&self, column_name: &str) -> String {
        column_name.to_string()
    }

    fn resolve_edge_name(&self, schema: &DatabaseSchema, relationship: &Relationship) -> String {
        format!("has_{}", schema.entity(relationship.parent_entity).name)
    }
}

/// Resolver selector used by run settings and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameResolverKind {
    #[default]
    Java,
    Original,
}

impl NameResolverKind {
    pub fn resolver(&self) -> Box<dyn NameResolver> {
        match self {
            NameResolverKind::Java => Box::new(JavaConventionNameResolver),
            NameResolverKind::Original => Box::new(OriginalNameResolver),
        }
    }
}

impl fmt::Display for NameResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameResolverKind::Java => f.write_str("java"),
            NameResolverKind::Original => f.write_str("original"),
        }
    }
}

impl FromStr for NameResolverKind {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "java" => Ok(NameResolverKind::Java),
            "original" => Ok(NameResolverKind::Original),
            other => Err(MappingError::invalid_value("name_resolver", other, "run settings")),
        }
    }
}
