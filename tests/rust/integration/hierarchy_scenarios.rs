use relgraph::errors::MappingError;
use relgraph::extractor::InMemoryMetadataProvider;
use relgraph::pipeline::ExecutionMode;
use relgraph::schema_model::InheritancePattern;

use crate::common::{employee_residence, property_names, run_pipeline, vertex_names, EMPLOYEE_TPH};

#[test]
fn test_table_per_hierarchy_end_to_end() {
    let mut provider = employee_residence();
    let (output, ctx) = run_pipeline(&mut provider, ExecutionMode::Naive, None, Some(EMPLOYEE_TPH)).unwrap();

    assert_eq!(
        vertex_names(&output),
        vec!["Employee", "Residence", "ContractEmployee", "RegularEmployee"]
    );
    assert_eq!(output.model.edge_count(), 1);
    let has_residence = output.model.edge_by_name("HasResidence").unwrap();

    let employee = output.model.vertex_by_name("Employee").unwrap();
    assert!(employee.property_by_name("type").is_none());
    for name in ["RegularEmployee", "ContractEmployee"] {
        let vertex = output.model.vertex_by_name(name).unwrap();
        assert_eq!(vertex.parent_type, Some(employee.id));
        assert_eq!(vertex.inheritance_depth, 1);
        assert_eq!(
            property_names(&vertex.inherited_properties),
            vec!["id", "name", "residence"]
        );
        assert!(vertex.out_edges.contains(&has_residence.id));
    }
    let regular = output.model.vertex_by_name("RegularEmployee").unwrap();
    assert_eq!(property_names(&regular.properties), vec!["salary", "bonus"]);

    let bags = output.schema.bags();
    assert_eq!(bags.len(), 1);
    assert_eq!(bags[0].pattern, InheritancePattern::TablePerHierarchy);
    assert_eq!(bags[0].discriminator_column.as_deref(), Some("TYPE"));
    assert_eq!(ctx.statistics.hierarchical_bags, 1);
}

#[test]
fn test_inherited_column_found_through_parent_mapper() {
    let mut provider = employee_residence();
    let (output, _) = run_pipeline(&mut provider, ExecutionMode::Naive, None, Some(EMPLOYEE_TPH)).unwrap();
    let regular = output.model.vertex_by_name("RegularEmployee").unwrap();

    let own = output
        .model
        .property_by_attribute(&output.rules, regular.id, "SALARY")
        .unwrap();
    assert_eq!(own.name, "salary");

    let inherited = output
        .model
        .property_by_attribute(&output.rules, regular.id, "NAME")
        .unwrap();
    let employee = output.model.vertex_by_name("Employee").unwrap();
    assert_eq!(inherited.belonging_element, relgraph::graph_model::ElementRef::Vertex(employee.id));
}

#[test]
fn test_hierarchy_partition_covers_every_entity_once() {
    let mut provider = employee_residence();
    let (output, _) = run_pipeline(&mut provider, ExecutionMode::Naive, None, Some(EMPLOYEE_TPH)).unwrap();

    let bag = &output.schema.bags()[0];
    let mut seen = Vec::new();
    for (depth, entities) in &bag.depth_to_entities {
        for entity in entities {
            assert!(!seen.contains(entity), "entity listed at two depths");
            seen.push(*entity);
            assert_eq!(output.schema.entity(*entity).inheritance_depth, *depth);
        }
    }
    assert_eq!(seen.len(), 3);
    let root = output.schema.entity_id_by_name("EMPLOYEE").unwrap();
    assert_eq!(bag.roots(), vec![root]);
}

fn table_per_type() -> InMemoryMetadataProvider {
    InMemoryMetadataProvider::new()
        .table("EMPLOYEE", &[("ID", "INTEGER"), ("NAME", "VARCHAR")], &["ID"])
        .table("PROJECT", &[("ID", "INTEGER"), ("TITLE", "VARCHAR")], &["ID"])
        .table("MANAGER", &[("EID", "INTEGER"), ("PROJECT", "INTEGER")], &["EID"])
        .foreign_key("MANAGER", "EMPLOYEE", &["EID"], &["ID"])
        .foreign_key("MANAGER", "PROJECT", &["PROJECT"], &["ID"])
}

#[test]
fn test_table_per_type_link_builds_no_edge() {
    let yaml = r#"
hierarchies:
  - pattern: table-per-type
    root: EMPLOYEE
    subclasses:
      - name: MANAGER
"#;
    let mut provider = table_per_type();
    let (output, _) = run_pipeline(&mut provider, ExecutionMode::Naive, None, Some(yaml)).unwrap();

    assert_eq!(vertex_names(&output), vec!["Employee", "Project", "Manager"]);
    assert_eq!(output.model.edge_count(), 1);
    let has_project = output.model.edge_by_name("HasProject").unwrap();

    let manager = output.model.vertex_by_name("Manager").unwrap();
    let employee = output.model.vertex_by_name("Employee").unwrap();
    assert_eq!(manager.parent_type, Some(employee.id));
    assert_eq!(property_names(&manager.properties), vec!["project"]);
    assert_eq!(property_names(&manager.inherited_properties), vec!["id", "name"]);
    assert_eq!(has_project.out_vertex, Some(manager.id));
    assert_eq!(output.schema.bags()[0].pattern, InheritancePattern::TablePerType);
}

#[test]
fn test_table_per_concrete_type_three_levels() {
    let yaml = r#"
hierarchies:
  - pattern: table-per-concrete-type
    root: EMPLOYEE
    subclasses:
      - name: MANAGER
        subclasses:
          - name: DIRECTOR
"#;
    let mut provider = InMemoryMetadataProvider::new()
        .table("EMPLOYEE", &[("ID", "INTEGER"), ("NAME", "VARCHAR")], &["ID"])
        .table(
            "MANAGER",
            &[("ID", "INTEGER"), ("NAME", "VARCHAR"), ("BUDGET", "DECIMAL")],
            &["ID"],
        )
        .table(
            "DIRECTOR",
            &[("ID", "INTEGER"), ("NAME", "VARCHAR"), ("BUDGET", "DECIMAL"), ("BOARD_SEAT", "INTEGER")],
            &["ID"],
        );
    let (output, _) = run_pipeline(&mut provider, ExecutionMode::Naive, None, Some(yaml)).unwrap();

    assert_eq!(vertex_names(&output), vec!["Employee", "Manager", "Director"]);
    let manager = output.model.vertex_by_name("Manager").unwrap();
    let director = output.model.vertex_by_name("Director").unwrap();
    assert_eq!(director.parent_type, Some(manager.id));
    assert_eq!(director.inheritance_depth, 2);
    assert_eq!(property_names(&manager.properties), vec!["budget"]);
    assert_eq!(property_names(&director.properties), vec!["boardSeat"]);
    assert_eq!(
        property_names(&director.inherited_properties),
        vec!["id", "name", "budget"]
    );

    let bag = &output.schema.bags()[0];
    let director_entity = output.schema.entity_id_by_name("DIRECTOR").unwrap();
    assert_eq!(bag.depth_of(director_entity), Some(2));
    assert!(bag.has_contiguous_depths());
}

#[test]
fn test_descriptor_naming_unknown_table_stops_run() {
    let yaml = r#"
hierarchies:
  - pattern: table-per-type
    root: PERSON
    subclasses:
      - name: MANAGER
"#;
    let mut provider = table_per_type();
    let err = run_pipeline(&mut provider, ExecutionMode::Naive, None, Some(yaml)).unwrap_err();
    assert!(matches!(err, MappingError::UnknownTable { ref table, .. } if table == "PERSON"));
}
