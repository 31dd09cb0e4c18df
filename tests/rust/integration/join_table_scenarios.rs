use relgraph::errors::MappingError;
use relgraph::graph_model::JoinTableAggregator;
use relgraph::pipeline::ExecutionMode;
use test_case::test_case;

use crate::common::{actor_film, edge_names, property_names, run_pipeline, vertex_names};

const PERFORMS: &str = r#"{
  "vertices": [],
  "edges": [
    { "Performs": {
        "mapping": [ { "fromTable": "ACTOR", "toTable": "FILM",
                       "fromColumns": ["ID"], "toColumns": ["ID"],
                       "direction": "direct",
                       "joinTable": { "tableName": "ACTOR_FILM",
                                      "fromColumns": ["ACTOR_ID"], "toColumns": ["FILM_ID"] } } ],
        "properties": {
          "year": { "include": true, "type": "INTEGER",
                    "mandatory": false, "readOnly": false, "notNull": false } } } }
  ]
}"#;

#[test]
fn test_configured_many_to_many_edge() {
    let mut provider = actor_film(false);
    let (output, ctx) = run_pipeline(&mut provider, ExecutionMode::NaiveAggregate, Some(PERFORMS), None).unwrap();

    assert_eq!(vertex_names(&output), vec!["Actor", "Film"]);
    assert_eq!(edge_names(&output), vec!["Performs"]);
    let performs = output.model.edge_by_name("Performs").unwrap();
    assert_eq!(property_names(&performs.properties), vec!["payment", "year"]);
    assert_eq!(performs.out_vertex, output.model.vertex_by_name("Actor").map(|v| v.id));
    assert_eq!(performs.in_vertex, output.model.vertex_by_name("Film").map(|v| v.id));
    assert_eq!(ctx.statistics.aggregated_join_vertices, 1);
    assert_eq!(ctx.statistics.configured_edge_classes, 1);

    // The join table still has its class mapper, reachable from the edge
    let join_vertex = output.rules.join_vertex_for_aggregator_edge(performs.id).unwrap();
    let join_entity = output.rules.entity_for_vertex(join_vertex).unwrap();
    assert_eq!(output.schema.entity(join_entity).name, "ACTOR_FILM");
}

#[test]
fn test_inverse_configured_join_swaps_endpoints() {
    let config = PERFORMS.replace("\"direct\"", "\"inverse\"");
    let mut provider = actor_film(false);
    let (output, _) = run_pipeline(&mut provider, ExecutionMode::NaiveAggregate, Some(&config), None).unwrap();

    let performs = output.model.edge_by_name("Performs").unwrap();
    assert_eq!(performs.out_vertex, output.model.vertex_by_name("Film").map(|v| v.id));
    assert_eq!(performs.in_vertex, output.model.vertex_by_name("Actor").map(|v| v.id));
}

#[test]
fn test_join_table_configuration_requires_aggregating_mode() {
    let mut provider = actor_film(false);
    let err = run_pipeline(&mut provider, ExecutionMode::Naive, Some(PERFORMS), None).unwrap_err();
    assert!(matches!(
        err,
        MappingError::JoinTableInNaiveMode { ref edge, ref join_table } if edge == "Performs" && join_table == "ACTOR_FILM"
    ));
}

#[test_case(ExecutionMode::Naive, 3, 2 ; "naive keeps the join vertex")]
#[test_case(ExecutionMode::NaiveAggregate, 2, 1 ; "aggregate collapses it")]
fn test_detected_join_table(mode: ExecutionMode, vertices: usize, edges: usize) {
    let mut provider = actor_film(true);
    let (output, _) = run_pipeline(&mut provider, mode, None, None).unwrap();

    assert_eq!(output.model.vertex_count(), vertices);
    assert_eq!(output.model.edge_count(), edges);
}

#[test]
fn test_aggregation_is_idempotent() {
    let mut provider = actor_film(true);
    let (mut output, mut ctx) = run_pipeline(&mut provider, ExecutionMode::NaiveAggregate, None, None).unwrap();
    let vertices: Vec<_> = output.model.vertices().cloned().collect();
    let edges: Vec<_> = output.model.edges().cloned().collect();

    let collapsed = JoinTableAggregator::new().aggregate(&output.schema, &mut output.model, &mut output.rules, &mut ctx);

    assert_eq!(collapsed, 0);
    assert_eq!(output.model.vertices().cloned().collect::<Vec<_>>(), vertices);
    assert_eq!(output.model.edges().cloned().collect::<Vec<_>>(), edges);
}
