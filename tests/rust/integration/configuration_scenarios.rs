use relgraph::extractor::InMemoryMetadataProvider;
use relgraph::graph_model::ClassMapper;
use relgraph::mapping_config::ConfigDocument;
use relgraph::pipeline::{ExecutionMode, MappingContext, MappingOutput, MappingPipeline, Phase, Statistics, StatisticsListener};
use relgraph::resolver::TargetType;

use crate::common::{actor_film, edge_names, property_names, run_pipeline, vertex_names};

fn employee_project() -> InMemoryMetadataProvider {
    InMemoryMetadataProvider::new()
        .table(
            "EMPLOYEE",
            &[("ID", "INTEGER"), ("NAME", "VARCHAR"), ("PROJECT", "INTEGER")],
            &["ID"],
        )
        .table("PROJECT", &[("ID", "INTEGER"), ("TITLE", "VARCHAR")], &["ID"])
}

const WORKS_AT: &str = r#"{
  "vertices": [
    { "name": "Worker",
      "mapping": { "sourceTables": [ { "name": "db_EMPLOYEE", "tableName": "EMPLOYEE", "dataSource": "db" } ] },
      "properties": {
        "fullName": { "include": true, "type": "STRING", "mandatory": true, "readOnly": false, "notNull": true,
                      "mapping": { "source": "db_EMPLOYEE", "columnName": "NAME", "type": "VARCHAR" } } } }
  ],
  "edges": [
    { "WorksAtProject": {
        "mapping": [ { "fromTable": "EMPLOYEE", "toTable": "PROJECT",
                       "fromColumns": ["PROJECT"], "toColumns": ["ID"], "direction": "direct" } ],
        "properties": {
          "updatedOn": { "include": true, "type": "DATE", "mandatory": false, "readOnly": false, "notNull": false } } } }
  ]
}"#;

#[test]
fn test_configuration_adds_relationship_and_renames() {
    let mut provider = employee_project();
    let (output, ctx) = run_pipeline(&mut provider, ExecutionMode::Naive, Some(WORKS_AT), None).unwrap();

    assert_eq!(vertex_names(&output), vec!["Project", "Worker"]);
    assert_eq!(edge_names(&output), vec!["WorksAtProject"]);

    let worker = output.model.vertex_by_name("Worker").unwrap();
    let full_name = worker.property_by_name("fullName").unwrap();
    assert_eq!(full_name.mandatory, Some(true));
    assert_eq!(full_name.not_null, Some(true));
    assert!(worker.property_by_name("name").is_none());

    let edge = output.model.edge_by_name("WorksAtProject").unwrap();
    assert_eq!(edge.out_vertex, Some(worker.id));
    assert_eq!(edge.in_vertex, output.model.vertex_by_name("Project").map(|v| v.id));
    assert_eq!(property_names(&edge.properties), vec!["updatedOn"]);
    assert_eq!(edge.properties[0].target_type, Some(TargetType::Date));

    let entity = output.schema.entity_id_by_name("EMPLOYEE").unwrap();
    let mapper = output.rules.class_mapper(entity, worker.id).unwrap();
    assert_eq!(mapper.property_for("NAME"), Some("fullName"));
    assert_eq!(mapper.attribute_for("fullName"), Some("NAME"));
    assert_eq!(ctx.statistics.configured_vertex_classes, 1);
    assert_eq!(ctx.statistics.configured_edge_classes, 1);
}

#[test]
fn test_excluded_column_keeps_mapper_entry() {
    let config = WORKS_AT.replace(r#""include": true, "type": "STRING""#, r#""include": false, "type": "STRING""#);
    let mut provider = employee_project();
    let (output, _) = run_pipeline(&mut provider, ExecutionMode::Naive, Some(&config), None).unwrap();

    let worker = output.model.vertex_by_name("Worker").unwrap();
    let entity = output.schema.entity_id_by_name("EMPLOYEE").unwrap();
    let mapper = output.rules.class_mapper(entity, worker.id).unwrap();
    assert!(mapper.is_excluded("NAME"));
    assert_eq!(mapper.property_for("NAME"), None);
}

fn mappers(output: &MappingOutput) -> Vec<(String, Vec<(String, Option<String>)>)> {
    output
        .rules
        .class_mappers()
        .iter()
        .map(|m: &ClassMapper| {
            let vertex = output.model.vertex_name(m.vertex).unwrap_or_default().to_string();
            let pairs = m
                .attribute_to_property
                .iter()
                .map(|(a, p)| (a.clone(), p.clone()))
                .collect();
            (vertex, pairs)
        })
        .filter(|(vertex, _)| !vertex.is_empty())
        .collect()
}

#[test]
fn test_written_configuration_reproduces_model() {
    let mut provider = employee_project();
    let (first, _) = run_pipeline(&mut provider, ExecutionMode::Naive, Some(WORKS_AT), None).unwrap();
    let written = first.configuration("db").to_json_pretty().unwrap();

    let mut provider = employee_project();
    let (second, _) = run_pipeline(&mut provider, ExecutionMode::Naive, Some(&written), None).unwrap();

    assert_eq!(vertex_names(&second), vertex_names(&first));
    assert_eq!(edge_names(&second), edge_names(&first));
    for vertex in first.model.vertices() {
        let other = second.model.vertex_by_name(&vertex.name).unwrap();
        assert_eq!(property_names(&other.properties), property_names(&vertex.properties));
    }
    assert_eq!(mappers(&second), mappers(&first));
}

#[test]
fn test_written_join_table_configuration_reproduces_aggregation() {
    let mut provider = actor_film(true);
    let (first, _) = run_pipeline(&mut provider, ExecutionMode::NaiveAggregate, None, None).unwrap();
    let document = first.configuration("db");
    let written = document.to_json_pretty().unwrap();
    assert!(written.contains("\"joinTable\""));

    let mut provider = actor_film(true);
    let (second, _) = run_pipeline(&mut provider, ExecutionMode::NaiveAggregate, Some(&written), None).unwrap();

    assert_eq!(vertex_names(&second), vertex_names(&first));
    assert_eq!(edge_names(&second), edge_names(&first));
    let (before, after) = (first.summary(), second.summary());
    assert_eq!(before.edges[0].from, after.edges[0].from);
    assert_eq!(before.edges[0].to, after.edges[0].to);
    assert_eq!(mappers(&second), mappers(&first));
}

#[test]
fn test_merging_vertices_with_different_parents_is_skipped() {
    let hierarchy = r#"
hierarchies:
  - pattern: table-per-concrete-type
    root: EMPLOYEE
    subclasses:
      - name: MANAGER
"#;
    let config = r#"{
      "vertices": [ { "name": "Staff",
        "mapping": { "sourceTables": [
          { "name": "db_EMPLOYEE", "tableName": "EMPLOYEE", "dataSource": "db" },
          { "name": "db_MANAGER", "tableName": "MANAGER", "dataSource": "db" } ] },
        "properties": {} } ],
      "edges": []
    }"#;
    let provider = || {
        InMemoryMetadataProvider::new()
            .table("EMPLOYEE", &[("ID", "INTEGER"), ("NAME", "VARCHAR")], &["ID"])
            .table("MANAGER", &[("ID", "INTEGER"), ("NAME", "VARCHAR"), ("BUDGET", "DECIMAL")], &["ID"])
    };

    let (baseline, _) = run_pipeline(&mut provider(), ExecutionMode::Naive, None, Some(hierarchy)).unwrap();
    let (output, ctx) = run_pipeline(&mut provider(), ExecutionMode::Naive, Some(config), Some(hierarchy)).unwrap();

    assert_eq!(ctx.statistics.skipped_aggregations, 1);
    assert!(ctx.warnings().iter().any(|w| w.contains("Staff")));
    assert_eq!(
        serde_json::to_value(output.summary()).unwrap(),
        serde_json::to_value(baseline.summary()).unwrap()
    );
}

#[test]
fn test_configuration_document_accepts_yaml() {
    let yaml = r#"
vertices: []
edges:
  - WorksAtProject:
      mapping:
        - fromTable: EMPLOYEE
          toTable: PROJECT
          fromColumns: [PROJECT]
          toColumns: [ID]
"#;
    let document = ConfigDocument::from_yaml_str(yaml).unwrap();
    let mut ctx = MappingContext::new(ExecutionMode::Naive);
    let output = MappingPipeline::new()
        .with_configuration(document)
        .run(&mut employee_project(), &mut ctx)
        .unwrap();

    let edge = output.model.edge_by_name("WorksAtProject").unwrap();
    assert_eq!(output.model.vertex_name(edge.out_vertex.unwrap()), Some("Employee"));
}

struct FailingListener;

impl StatisticsListener for FailingListener {
    fn on_phase_completed(&mut self, _phase: Phase, _statistics: &Statistics) -> anyhow::Result<()> {
        anyhow::bail!("sink unavailable")
    }
}

#[test]
fn test_failing_listener_does_not_abort_run() {
    let mut ctx = MappingContext::new(ExecutionMode::Naive);
    ctx.add_listener(Box::new(FailingListener));

    let output = MappingPipeline::new().run(&mut employee_project(), &mut ctx).unwrap();

    assert_eq!(output.model.vertex_count(), 2);
    assert!(ctx
        .warnings()
        .iter()
        .any(|w| w == "Statistics listener failed after schema extraction: sink unavailable"));
}
