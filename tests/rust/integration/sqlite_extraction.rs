use relgraph::extractor::{MetadataProvider, SqliteMetadataProvider, TableFilter};
use relgraph::pipeline::{ExecutionMode, MappingContext, MappingPipeline};
use relgraph::resolver::{DriverTypeMap, NameResolverKind, TargetType};
use rusqlite::Connection;
use tempfile::TempDir;
use test_case::test_case;

use crate::common::{edge_names, property_names, run_pipeline, sqlite, vertex_names};

const ORDER_LINES: &str = "
CREATE TABLE ORDER_LINE (
    ORDER_ID INTEGER NOT NULL,
    LINE_NO INTEGER NOT NULL,
    PRODUCT VARCHAR(40),
    PRIMARY KEY (ORDER_ID, LINE_NO)
);
CREATE TABLE SHIPMENT (
    ID INTEGER PRIMARY KEY,
    ORDER_ID INTEGER,
    LINE_NO INTEGER,
    CARRIER TEXT,
    SHIPPED_ON DATE,
    FOREIGN KEY (ORDER_ID, LINE_NO) REFERENCES ORDER_LINE (ORDER_ID, LINE_NO)
);
";

#[test]
fn test_composite_foreign_key_becomes_one_edge() {
    let mut provider = sqlite(ORDER_LINES);
    let (output, ctx) = run_pipeline(&mut provider, ExecutionMode::Naive, None, None).unwrap();

    assert_eq!(vertex_names(&output), vec!["OrderLine", "Shipment"]);
    assert_eq!(edge_names(&output), vec!["HasOrderLine"]);
    assert_eq!(ctx.statistics.source_relationships, 1);

    let (_, relationship) = output.schema.relationships().next().unwrap();
    assert_eq!(relationship.foreign_key.attribute_names(), vec!["ORDER_ID", "LINE_NO"]);
    assert_eq!(relationship.primary_key.attribute_names(), vec!["ORDER_ID", "LINE_NO"]);
    let order_line = output.schema.entity_by_name("ORDER_LINE").unwrap();
    assert_eq!(order_line.primary_key.attribute_names(), relationship.primary_key.attribute_names());

    let edge = output.model.edge_by_name("HasOrderLine").unwrap();
    assert_eq!(edge.out_vertex, output.model.vertex_by_name("Shipment").map(|v| v.id));
}

#[test]
fn test_sqlite_declared_types_resolve_with_sqlite_driver() {
    let mut provider = sqlite(ORDER_LINES);
    let mut ctx = MappingContext::new(ExecutionMode::Naive);
    let output = MappingPipeline::new()
        .with_driver(DriverTypeMap::Sqlite)
        .run(&mut provider, &mut ctx)
        .unwrap();

    let shipment = output.model.vertex_by_name("Shipment").unwrap();
    let type_of = |name: &str| shipment.property_by_name(name).and_then(|p| p.target_type);
    assert_eq!(type_of("id"), Some(TargetType::Long));
    assert_eq!(type_of("carrier"), Some(TargetType::String));
    assert_eq!(type_of("shippedOn"), Some(TargetType::Date));
    assert!(ctx.warnings().is_empty());
}

#[test]
fn test_sqlite_join_table_is_aggregated() {
    let ddl = "
CREATE TABLE ACTOR (ID INTEGER PRIMARY KEY, NAME TEXT);
CREATE TABLE FILM (ID INTEGER PRIMARY KEY, TITLE TEXT);
CREATE TABLE ACTOR_FILM (
    ACTOR_ID INTEGER REFERENCES ACTOR,
    FILM_ID INTEGER REFERENCES FILM (ID),
    PAYMENT NUMERIC,
    PRIMARY KEY (ACTOR_ID, FILM_ID)
);
";
    let mut provider = sqlite(ddl);
    let (output, ctx) = run_pipeline(&mut provider, ExecutionMode::NaiveAggregate, None, None).unwrap();

    assert_eq!(vertex_names(&output), vec!["Actor", "Film"]);
    assert_eq!(edge_names(&output), vec!["ActorFilm"]);
    let edge = output.model.edge_by_name("ActorFilm").unwrap();
    assert_eq!(property_names(&edge.properties), vec!["payment"]);
    assert_eq!(ctx.statistics.aggregated_join_vertices, 1);
    assert!(output.schema.entity_by_name("ACTOR_FILM").unwrap().join_table_dim2);
}

#[test]
fn test_filtered_file_database_with_original_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shop.db");
    Connection::open(&path).unwrap().execute_batch(ORDER_LINES).unwrap();

    let mut provider = SqliteMetadataProvider::open(&path).unwrap();
    let mut ctx = MappingContext::new(ExecutionMode::Naive);
    let output = MappingPipeline::new()
        .with_name_resolver(NameResolverKind::Original)
        .with_filter(TableFilter::new(vec!["SHIPMENT".to_string()], Vec::new()))
        .run(&mut provider, &mut ctx)
        .unwrap();

    assert_eq!(vertex_names(&output), vec!["SHIPMENT"]);
    // The referenced table was filtered out, so no edge is built
    assert_eq!(output.model.edge_count(), 0);
    let shipment = output.model.vertex_by_name("SHIPMENT").unwrap();
    assert!(shipment.property_by_name("ORDER_ID").is_some());

    // Extraction closes the provider
    assert!(provider.table_names().is_err());
}

#[test_case("REFERENCES residence (ID)" ; "lowercase table")]
#[test_case("REFERENCES RESIDENCE (id)" ; "lowercase column")]
#[test_case("REFERENCES Residence" ; "implicit key with mixed case")]
fn test_references_match_tables_ignoring_case(reference: &str) {
    let ddl = format!(
        "CREATE TABLE RESIDENCE (ID INTEGER PRIMARY KEY, CITY TEXT);
         CREATE TABLE EMPLOYEE (ID INTEGER PRIMARY KEY, NAME TEXT, RESIDENCE INTEGER {});",
        reference
    );
    let mut provider = sqlite(&ddl);
    let (output, ctx) = run_pipeline(&mut provider, ExecutionMode::Naive, None, None).unwrap();

    assert_eq!(edge_names(&output), vec!["HasResidence"]);
    assert_eq!(ctx.statistics.source_relationships, 1);
    let (_, relationship) = output.schema.relationships().next().unwrap();
    assert_eq!(relationship.primary_key.attribute_names(), vec!["ID"]);
}
