//! Inheritance descriptor.
//!
//! Declares which tables form an inheritance tree and how it is stored.
//! Loaded from YAML or JSON:
//!
//! ```yaml
//! hierarchies:
//!   - pattern: table-per-hierarchy
//!     root: EMPLOYEE
//!     discriminator_column: TYPE
//!     discriminator_value: emp
//!     subclasses:
//!       - name: Regular_Employee
//!         discriminator_value: reg_emp
//!         columns: [SALARY, BONUS]
//!       - name: Contract_Employee
//!         discriminator_value: cont_emp
//!         columns: [PAY_PER_HOUR, CONTRACT_DURATION]
//! ```
//!
//! For `table-per-hierarchy` subclass names are new entity names and
//! `columns` lists the root-table columns they own. For the other two
//! patterns subclass names are existing tables and `columns` is unused.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::errors::{MappingError, Result};
use crate::schema_model::InheritancePattern;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InheritanceDescriptor {
    #[serde(default)]
    pub hierarchies: Vec<HierarchyDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyDeclaration {
    pub pattern: InheritancePattern,
    pub root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_value: Option<String>,
    #[serde(default)]
    pub subclasses: Vec<SubclassDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubclassDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subclasses: Vec<SubclassDeclaration>,
}

impl InheritanceDescriptor {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let descriptor: Self = serde_yaml::from_str(yaml).map_err(|e| MappingError::InvalidDescriptor {
            message: e.to_string(),
        })?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(json).map_err(|e| MappingError::InvalidDescriptor {
            message: e.to_string(),
        })?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Load by extension: `.json` is JSON, anything else YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MappingError::ConfigRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Structural checks that need no schema: names unique, discriminator
    /// present for table-per-hierarchy.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for hierarchy in &self.hierarchies {
            if !seen.insert(hierarchy.root.to_ascii_uppercase()) {
                return Err(invalid(format!("'{}' declared more than once", hierarchy.root)));
            }
            for subclass in hierarchy.all_subclasses() {
                if !seen.insert(subclass.name.to_ascii_uppercase()) {
                    return Err(invalid(format!("'{}' declared more than once", subclass.name)));
                }
                if hierarchy.pattern != InheritancePattern::TablePerHierarchy && !subclass.columns.is_empty() {
                    return Err(invalid(format!(
                        "subclass '{}' lists columns, only allowed for table-per-hierarchy",
                        subclass.name
                    )));
                }
            }
            if hierarchy.pattern == InheritancePattern::TablePerHierarchy
                && hierarchy.discriminator_column.is_none()
            {
                return Err(invalid(format!(
                    "hierarchy rooted at '{}' needs a discriminator_column",
                    hierarchy.root
                )));
            }
        }
        Ok(())
    }
}

impl HierarchyDeclaration {
    /// Every subclass, parents before children
    pub fn all_subclasses(&self) -> Vec<&SubclassDeclaration> {
        let mut out = Vec::new();
        let mut queue: Vec<&SubclassDeclaration> = self.subclasses.iter().collect();
        let mut next = 0;
        while next < queue.len() {
            let current = queue[next];
            out.push(current);
            queue.extend(current.subclasses.iter());
            next += 1;
        }
        out
    }
}

fn invalid(message: String) -> MappingError {
    MappingError::InvalidDescriptor { message }
}
