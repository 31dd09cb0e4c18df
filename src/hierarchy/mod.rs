//! Hierarchy resolution.
//!
//! Applies an [`InheritanceDescriptor`] to the extracted schema: assigns
//! parents and depths, builds one [`HierarchicalBag`] per tree, reshapes the
//! participating entities according to the storage pattern and finally
//! copies inherited attributes and relationships down every chain.
//!
//! Per pattern:
//! - `table-per-hierarchy`: subclasses are carved out of the root table.
//!   Their columns move to a new entity and the discriminator column leaves
//!   the root.
//! - `table-per-type`: the child's foreign-key columns pointing at its
//!   parent leave the child's own attributes (they stay in its primary key).
//! - `table-per-concrete-type`: child columns that repeat an ancestor
//!   column leave the child's own attributes.
//!
//! [`HierarchicalBag`]: crate::schema_model::HierarchicalBag

pub mod descriptor;

use log::{debug, info};
use std::collections::HashSet;

pub use descriptor::{HierarchyDeclaration, InheritanceDescriptor, SubclassDeclaration};

use crate::errors::{MappingError, Result};
use crate::pipeline::{MappingContext, Phase};
use crate::schema_model::{BagId, DatabaseSchema, EntityId, InheritancePattern, RelationshipId};

#[derive(Debug, Clone, Default)]
pub struct HierarchyResolver {
    descriptor: InheritanceDescriptor,
}

impl HierarchyResolver {
    pub fn new(descriptor: InheritanceDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn resolve(&self, schema: &mut DatabaseSchema, ctx: &mut MappingContext) -> Result<()> {
        debug!("Hierarchy resolution phase...");
        for hierarchy in &self.descriptor.hierarchies {
            self.resolve_hierarchy(schema, hierarchy)?;
        }
        propagate_inheritance(schema);

        ctx.statistics.hierarchical_bags = schema.bags().len();
        ctx.statistics.source_entities = schema.entities().len();
        info!("Resolved {} hierarchical bags", schema.bags().len());
        ctx.notify(Phase::HierarchyResolution);
        Ok(())
    }

    fn resolve_hierarchy(&self, schema: &mut DatabaseSchema, hierarchy: &HierarchyDeclaration) -> Result<()> {
        let root = lookup_entity(schema, &hierarchy.root)?;
        if let Some(existing) = schema.entity(root).hierarchical_bag {
            return Err(MappingError::InvalidDescriptor {
                message: format!(
                    "'{}' already belongs to hierarchy #{}",
                    hierarchy.root, existing.0
                ),
            });
        }

        let bag = schema.add_bag(hierarchy.pattern);
        place(schema, bag, root, None, 0);
        debug!(
            "Hierarchy rooted at '{}' ({})",
            schema.entity(root).name,
            hierarchy.pattern
        );

        match hierarchy.pattern {
            InheritancePattern::TablePerHierarchy => self.resolve_single_table(schema, bag, root, hierarchy),
            InheritancePattern::TablePerType | InheritancePattern::TablePerConcreteType => {
                for subclass in &hierarchy.subclasses {
                    self.resolve_table_subclass(schema, bag, root, 1, hierarchy.pattern, subclass)?;
                }
                Ok(())
            }
        }
    }

    fn resolve_single_table(
        &self,
        schema: &mut DatabaseSchema,
        bag: BagId,
        root: EntityId,
        hierarchy: &HierarchyDeclaration,
    ) -> Result<()> {
        let root_name = schema.entity(root).name.clone();
        let discriminator = hierarchy.discriminator_column.clone().ok_or_else(|| {
            MappingError::InvalidDescriptor {
                message: format!("hierarchy rooted at '{}' needs a discriminator_column", root_name),
            }
        })?;
        if schema.entity(root).attribute_by_name(&discriminator).is_none() {
            return Err(MappingError::UnknownColumn {
                column: discriminator,
                table: root_name,
            });
        }

        {
            let bag = schema.bag_mut(bag);
            bag.discriminator_column = Some(discriminator.clone());
            if let Some(value) = &hierarchy.discriminator_value {
                bag.discriminator_values.insert(root_name.clone(), value.clone());
            }
        }

        for subclass in &hierarchy.subclasses {
            self.carve_subclass(schema, bag, root, root, 1, subclass)?;
        }

        schema.entity_mut(root).remove_attribute(&discriminator);
        schema.entity_mut(root).renumber_attributes();
        schema.refresh_relationship_keys(root);
        Ok(())
    }

    /// Build a virtual entity out of root-table columns
    fn carve_subclass(
        &self,
        schema: &mut DatabaseSchema,
        bag: BagId,
        root: EntityId,
        parent: EntityId,
        depth: usize,
        subclass: &SubclassDeclaration,
    ) -> Result<()> {
        if schema.entities().iter().any(|e| e.name == subclass.name) {
            return Err(MappingError::InvalidDescriptor {
                message: format!("subclass '{}' clashes with an existing table", subclass.name),
            });
        }
        let schema_name = schema.entity(root).schema_name.clone();
        let root_name = schema.entity(root).name.clone();
        let child = schema.add_entity(subclass.name.as_str(), schema_name);

        let mut moved = HashSet::new();
        for column in &subclass.columns {
            let mut attribute = schema
                .entity_mut(root)
                .remove_attribute(column)
                .ok_or_else(|| MappingError::UnknownColumn {
                    column: column.clone(),
                    table: root_name.clone(),
                })?;
            attribute.belonging_entity = child;
            schema.entity_mut(child).attributes.push(attribute);
            moved.insert(column.clone());
        }
        let primary_key = schema.entity(root).primary_key.clone();
        schema.entity_mut(child).primary_key = primary_key;

        // Foreign keys made only of moved columns follow them
        let owned: Vec<RelationshipId> = schema
            .entity(root)
            .out_relationships
            .iter()
            .copied()
            .filter(|r| {
                let key = &schema.relationship(*r).foreign_key;
                !key.is_empty() && key.attributes.iter().all(|a| moved.contains(&a.name))
            })
            .collect();
        for relationship in owned {
            move_relationship(schema, relationship, root, child);
        }

        schema.entity_mut(child).renumber_attributes();
        schema.refresh_relationship_keys(child);
        place(schema, bag, child, Some(parent), depth);
        if let Some(value) = &subclass.discriminator_value {
            schema
                .bag_mut(bag)
                .discriminator_values
                .insert(subclass.name.clone(), value.clone());
        }
        debug!("Subclass '{}' carved out of '{}'", subclass.name, root_name);

        for nested in &subclass.subclasses {
            self.carve_subclass(schema, bag, root, child, depth + 1, nested)?;
        }
        Ok(())
    }

    fn resolve_table_subclass(
        &self,
        schema: &mut DatabaseSchema,
        bag: BagId,
        parent: EntityId,
        depth: usize,
        pattern: InheritancePattern,
        subclass: &SubclassDeclaration,
    ) -> Result<()> {
        let child = lookup_entity(schema, &subclass.name)?;
        if schema.entity(child).hierarchical_bag.is_some() {
            return Err(MappingError::InvalidDescriptor {
                message: format!("'{}' already belongs to a hierarchy", subclass.name),
            });
        }
        place(schema, bag, child, Some(parent), depth);

        let redundant: Vec<String> = match pattern {
            InheritancePattern::TablePerType => {
                let link = schema
                    .entity(child)
                    .out_relationships
                    .iter()
                    .map(|r| schema.relationship(*r))
                    .find(|r| r.parent_entity == parent)
                    .ok_or_else(|| MappingError::InvalidDescriptor {
                        message: format!(
                            "table-per-type subclass '{}' has no foreign key to '{}'",
                            subclass.name,
                            schema.entity(parent).name
                        ),
                    })?;
                link.foreign_key
                    .attributes
                    .iter()
                    .map(|a| a.name.clone())
                    .collect()
            }
            _ => {
                let inherited: HashSet<String> = schema
                    .ancestors(child)
                    .into_iter()
                    .flat_map(|a| schema.entity(a).attributes.iter().map(|attr| attr.name.clone()))
                    .collect();
                schema
                    .entity(child)
                    .attributes
                    .iter()
                    .filter(|a| inherited.contains(&a.name))
                    .map(|a| a.name.clone())
                    .collect()
            }
        };

        let entity = schema.entity_mut(child);
        for name in &redundant {
            entity.remove_attribute(name);
        }
        entity.renumber_attributes();
        schema.refresh_relationship_keys(child);
        debug!(
            "Subclass '{}' at depth {} ({} inherited columns dropped)",
            subclass.name,
            depth,
            redundant.len()
        );

        for nested in &subclass.subclasses {
            self.resolve_table_subclass(schema, bag, child, depth + 1, pattern, nested)?;
        }
        Ok(())
    }
}

fn lookup_entity(schema: &DatabaseSchema, name: &str) -> Result<EntityId> {
    schema
        .entity_id_by_name(name)
        .ok_or_else(|| MappingError::UnknownTable {
            table: name.to_string(),
            context: "inheritance descriptor".to_string(),
        })
}

fn place(schema: &mut DatabaseSchema, bag: BagId, entity: EntityId, parent: Option<EntityId>, depth: usize) {
    schema.bag_mut(bag).insert(depth, entity);
    let entity = schema.entity_mut(entity);
    entity.hierarchical_bag = Some(bag);
    entity.parent = parent;
    entity.inheritance_depth = depth;
}

fn move_relationship(schema: &mut DatabaseSchema, id: RelationshipId, from: EntityId, to: EntityId) {
    let old_key = schema.relationship(id).foreign_key.clone();
    {
        let relationship = schema.relationship_mut(id);
        relationship.foreign_entity = to;
        relationship.foreign_key.belonging_entity = to;
        for attribute in &mut relationship.foreign_key.attributes {
            attribute.belonging_entity = to;
        }
    }
    let new_key = schema.relationship(id).foreign_key.clone();

    let source = schema.entity_mut(from);
    source.out_relationships.retain(|r| *r != id);
    source.foreign_keys.retain(|k| *k != old_key);

    let target = schema.entity_mut(to);
    target.out_relationships.push(id);
    if !target.foreign_keys.contains(&new_key) {
        target.foreign_keys.push(new_key);
    }
}

/// Copy ancestor attributes and relationships down every parent chain.
///
/// Entities are visited by increasing depth so a parent's inherited lists
/// are complete before its children read them.
pub fn propagate_inheritance(schema: &mut DatabaseSchema) {
    let mut ordered: Vec<EntityId> = schema
        .entities()
        .iter()
        .filter(|e| e.parent.is_some())
        .map(|e| e.id)
        .collect();
    ordered.sort_by_key(|id| schema.entity(*id).inheritance_depth);

    for id in ordered {
        let Some(parent_id) = schema.entity(id).parent else {
            continue;
        };
        let parent = schema.entity(parent_id);

        let mut attributes = parent.inherited_attributes.clone();
        attributes.extend(parent.attributes.iter().cloned());

        let mut out_relationships = parent.inherited_out_relationships.clone();
        out_relationships.extend(
            parent
                .out_relationships
                .iter()
                .copied()
                .filter(|r| Some(schema.relationship(*r).parent_entity) != parent.parent),
        );

        let mut in_relationships = parent.inherited_in_relationships.clone();
        in_relationships.extend(parent.in_relationships.iter().copied().filter(|r| {
            schema.entity(schema.relationship(*r).foreign_entity).parent != Some(parent_id)
        }));

        let entity = schema.entity_mut(id);
        entity.inherited_attributes = attributes;
        entity.inherited_out_relationships = out_relationships;
        entity.inherited_in_relationships = in_relationships;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{InMemoryMetadataProvider, SchemaExtractor};
    use crate::pipeline::ExecutionMode;

    fn employee_tables() -> InMemoryMetadataProvider {
        InMemoryMetadataProvider::new()
            .table(
                "RESIDENCE",
                &[("ID", "VARCHAR"), ("CITY", "VARCHAR"), ("COUNTRY", "VARCHAR")],
                &["ID"],
            )
            .table(
                "EMPLOYEE",
                &[
                    ("ID", "VARCHAR"),
                    ("TYPE", "VARCHAR"),
                    ("NAME", "VARCHAR"),
                    ("SALARY", "DECIMAL"),
                    ("BONUS", "DECIMAL"),
                    ("PAY_PER_HOUR", "DECIMAL"),
                    ("CONTRACT_DURATION", "VARCHAR"),
                    ("RESIDENCE", "VARCHAR"),
                ],
                &["ID"],
            )
            .foreign_key("EMPLOYEE", "RESIDENCE", &["RESIDENCE"], &["ID"])
    }

    const TPH: &str = r#"
hierarchies:
  - pattern: table-per-hierarchy
    root: EMPLOYEE
    discriminator_column: TYPE
    discriminator_value: emp
    subclasses:
      - name: Regular_Employee
        discriminator_value: reg_emp
        columns: [SALARY, BONUS]
      - name: Contract_Employee
        discriminator_value: cont_emp
        columns: [PAY_PER_HOUR, CONTRACT_DURATION]
"#;

    fn resolved(provider: InMemoryMetadataProvider, yaml: &str) -> Result<DatabaseSchema> {
        let mut ctx = MappingContext::new(ExecutionMode::Naive);
        let mut provider = provider;
        let mut schema = SchemaExtractor::default().extract(&mut provider, &mut ctx)?;
        let descriptor = InheritanceDescriptor::from_yaml_str(yaml)?;
        HierarchyResolver::new(descriptor).resolve(&mut schema, &mut ctx)?;
        Ok(schema)
    }

    fn names(attributes: &[crate::schema_model::Attribute]) -> Vec<&str> {
        attributes.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_single_table_hierarchy_splits_root() {
        let schema = resolved(employee_tables(), TPH).unwrap();

        let employee = schema.entity_by_name("EMPLOYEE").unwrap();
        assert_eq!(names(&employee.attributes), vec!["ID", "NAME", "RESIDENCE"]);
        assert_eq!(employee.attribute_by_name("RESIDENCE").unwrap().ordinal_position, 3);
        assert!(employee.inherited_attributes.is_empty());

        let regular = schema.entity_by_name("Regular_Employee").unwrap();
        assert_eq!(names(&regular.attributes), vec!["SALARY", "BONUS"]);
        assert_eq!(regular.attributes[0].belonging_entity, regular.id);
        assert_eq!(names(&regular.inherited_attributes), vec!["ID", "NAME", "RESIDENCE"]);
        assert_eq!(regular.primary_key.attribute_names(), vec!["ID"]);
        assert_eq!(regular.parent, Some(employee.id));
        assert_eq!(regular.inheritance_depth, 1);
        assert_eq!(regular.inherited_out_relationships, employee.out_relationships);

        let bag = schema.bag(employee.hierarchical_bag.unwrap());
        assert_eq!(bag.pattern, InheritancePattern::TablePerHierarchy);
        assert_eq!(bag.discriminator_column.as_deref(), Some("TYPE"));
        assert_eq!(bag.discriminator_values.get("EMPLOYEE").map(String::as_str), Some("emp"));
        assert_eq!(
            bag.discriminator_values.get("Contract_Employee").map(String::as_str),
            Some("cont_emp")
        );
        assert_eq!(bag.roots(), vec![employee.id]);
        assert_eq!(bag.entities().count(), 3);
        assert!(bag.has_contiguous_depths());

        // The relationship key follows the renumbered column
        let relationship = schema.relationship(employee.out_relationships[0]);
        assert_eq!(relationship.foreign_key.attributes[0].ordinal_position, 3);
    }

    #[test]
    fn test_moved_foreign_key_follows_subclass() {
        let provider = InMemoryMetadataProvider::new()
            .table("OFFICE", &[("ID", "INTEGER")], &["ID"])
            .table(
                "EMPLOYEE",
                &[("ID", "INTEGER"), ("TYPE", "VARCHAR"), ("OFFICE", "INTEGER")],
                &["ID"],
            )
            .foreign_key("EMPLOYEE", "OFFICE", &["OFFICE"], &["ID"]);
        let yaml = r#"
hierarchies:
  - pattern: table-per-hierarchy
    root: EMPLOYEE
    discriminator_column: TYPE
    subclasses:
      - name: Clerk
        columns: [OFFICE]
"#;
        let schema = resolved(provider, yaml).unwrap();
        let employee = schema.entity_by_name("EMPLOYEE").unwrap();
        let clerk = schema.entity_by_name("Clerk").unwrap();
        assert!(employee.out_relationships.is_empty());
        assert!(employee.foreign_keys.is_empty());
        assert_eq!(clerk.out_relationships.len(), 1);
        assert_eq!(schema.relationship(clerk.out_relationships[0]).foreign_entity, clerk.id);
    }

    #[test]
    fn test_table_per_type_drops_link_columns() {
        let provider = InMemoryMetadataProvider::new()
            .table("EMPLOYEE", &[("ID", "VARCHAR"), ("NAME", "VARCHAR")], &["ID"])
            .table(
                "REGULAR_EMPLOYEE",
                &[("EID", "VARCHAR"), ("SALARY", "DECIMAL"), ("BONUS", "DECIMAL")],
                &["EID"],
            )
            .foreign_key("REGULAR_EMPLOYEE", "EMPLOYEE", &["EID"], &["ID"]);
        let yaml = r#"
hierarchies:
  - pattern: table-per-type
    root: EMPLOYEE
    subclasses:
      - name: REGULAR_EMPLOYEE
"#;
        let schema = resolved(provider, yaml).unwrap();
        let regular = schema.entity_by_name("REGULAR_EMPLOYEE").unwrap();
        assert_eq!(names(&regular.attributes), vec!["SALARY", "BONUS"]);
        assert_eq!(regular.attributes[0].ordinal_position, 1);
        assert_eq!(regular.primary_key.attribute_names(), vec!["EID"]);
        assert_eq!(names(&regular.inherited_attributes), vec!["ID", "NAME"]);
        // The inheritance link itself is not inherited
        assert!(regular.inherited_in_relationships.is_empty());
        assert!(regular.inherited_out_relationships.is_empty());
    }

    #[test]
    fn test_table_per_type_without_link_is_rejected() {
        let provider = InMemoryMetadataProvider::new()
            .table("EMPLOYEE", &[("ID", "VARCHAR")], &["ID"])
            .table("MANAGER", &[("ID", "VARCHAR")], &["ID"]);
        let yaml = "hierarchies:\n  - pattern: table-per-type\n    root: EMPLOYEE\n    subclasses:\n      - name: MANAGER\n";
        let err = resolved(provider, yaml).unwrap_err();
        assert!(matches!(err, MappingError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_table_per_concrete_type_drops_repeated_columns() {
        let provider = InMemoryMetadataProvider::new()
            .table("EMPLOYEE", &[("ID", "VARCHAR"), ("NAME", "VARCHAR")], &["ID"])
            .table(
                "MANAGER",
                &[("ID", "VARCHAR"), ("NAME", "VARCHAR"), ("BUDGET", "DECIMAL")],
                &["ID"],
            )
            .table(
                "DIRECTOR",
                &[("ID", "VARCHAR"), ("NAME", "VARCHAR"), ("BUDGET", "DECIMAL"), ("BOARD", "VARCHAR")],
                &["ID"],
            );
        let yaml = r#"
hierarchies:
  - pattern: table-per-concrete-type
    root: EMPLOYEE
    subclasses:
      - name: MANAGER
        subclasses:
          - name: DIRECTOR
"#;
        let schema = resolved(provider, yaml).unwrap();
        let manager = schema.entity_by_name("MANAGER").unwrap();
        let director = schema.entity_by_name("DIRECTOR").unwrap();
        assert_eq!(names(&manager.attributes), vec!["BUDGET"]);
        assert_eq!(names(&director.attributes), vec!["BOARD"]);
        assert_eq!(names(&director.inherited_attributes), vec!["ID", "NAME", "BUDGET"]);
        assert_eq!(director.inheritance_depth, 2);
        assert_eq!(director.primary_key.attribute_names(), vec!["ID"]);

        let bag = schema.bag(director.hierarchical_bag.unwrap());
        assert_eq!(bag.depth_of(director.id), Some(2));
        assert_eq!(bag.depth_of(manager.id), Some(1));
    }

    #[test]
    fn test_unknown_root_is_fatal() {
        let yaml = "hierarchies:\n  - pattern: table-per-type\n    root: PERSON\n";
        let err = resolved(employee_tables(), yaml).unwrap_err();
        assert!(matches!(err, MappingError::UnknownTable { .. }));
    }

    #[test]
    fn test_unknown_subclass_column_is_fatal() {
        let yaml = TPH.replace("BONUS", "BONUSES");
        let err = resolved(employee_tables(), &yaml).unwrap_err();
        assert!(matches!(err, MappingError::UnknownColumn { ref column, .. } if column == "BONUSES"));
    }

    #[test]
    fn test_entities_outside_hierarchies_stay_flat() {
        let schema = resolved(employee_tables(), TPH).unwrap();
        let residence = schema.entity_by_name("RESIDENCE").unwrap();
        assert_eq!(residence.inheritance_depth, 0);
        assert!(residence.hierarchical_bag.is_none());
        assert!(residence.parent.is_none());
    }
}
