//! Shared fixtures for the integration scenarios

use relgraph::extractor::{InMemoryMetadataProvider, MetadataProvider, SqliteMetadataProvider};
use relgraph::hierarchy::InheritanceDescriptor;
use relgraph::mapping_config::ConfigDocument;
use relgraph::pipeline::{ExecutionMode, MappingContext, MappingOutput, MappingPipeline};
use rusqlite::Connection;

pub fn run_pipeline(
    provider: &mut dyn MetadataProvider,
    mode: ExecutionMode,
    config_json: Option<&str>,
    hierarchy_yaml: Option<&str>,
) -> relgraph::Result<(MappingOutput, MappingContext)> {
    let mut pipeline = MappingPipeline::new();
    if let Some(json) = config_json {
        pipeline = pipeline.with_configuration(ConfigDocument::from_json_str(json)?);
    }
    if let Some(yaml) = hierarchy_yaml {
        pipeline = pipeline.with_hierarchy(InheritanceDescriptor::from_yaml_str(yaml)?);
    }
    let mut ctx = MappingContext::new(mode);
    let output = pipeline.run(provider, &mut ctx)?;
    Ok((output, ctx))
}

pub fn sqlite(ddl: &str) -> SqliteMetadataProvider {
    let conn = Connection::open_in_memory().expect("in-memory sqlite");
    conn.execute_batch(ddl).expect("fixture ddl");
    SqliteMetadataProvider::from_connection(conn)
}

pub fn vertex_names(output: &MappingOutput) -> Vec<String> {
    output.model.vertices().map(|v| v.name.clone()).collect()
}

pub fn edge_names(output: &MappingOutput) -> Vec<String> {
    output.model.edges().map(|e| e.name.clone()).collect()
}

pub fn property_names(properties: &[relgraph::graph_model::ModelProperty]) -> Vec<&str> {
    properties.iter().map(|p| p.name.as_str()).collect()
}

/// `RESIDENCE` plus the single-table `EMPLOYEE` hierarchy
pub fn employee_residence() -> InMemoryMetadataProvider {
    InMemoryMetadataProvider::new()
        .table(
            "RESIDENCE",
            &[("ID", "INTEGER"), ("CITY", "VARCHAR"), ("COUNTRY", "VARCHAR")],
            &["ID"],
        )
        .table(
            "EMPLOYEE",
            &[
                ("ID", "INTEGER"),
                ("TYPE", "VARCHAR"),
                ("NAME", "VARCHAR"),
                ("SALARY", "DECIMAL"),
                ("BONUS", "DECIMAL"),
                ("PAY_PER_HOUR", "DECIMAL"),
                ("CONTRACT_DURATION", "VARCHAR"),
                ("RESIDENCE", "INTEGER"),
            ],
            &["ID"],
        )
        .foreign_key("EMPLOYEE", "RESIDENCE", &["RESIDENCE"], &["ID"])
}

pub const EMPLOYEE_TPH: &str = r#"
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

/// `ACTOR`, `FILM` and the `ACTOR_FILM` join table, optionally with its
/// two foreign keys declared
pub fn actor_film(with_foreign_keys: bool) -> InMemoryMetadataProvider {
    let provider = InMemoryMetadataProvider::new()
        .table("ACTOR", &[("ID", "INTEGER"), ("NAME", "VARCHAR")], &["ID"])
        .table("FILM", &[("ID", "INTEGER"), ("TITLE", "VARCHAR")], &["ID"])
        .table(
            "ACTOR_FILM",
            &[("ACTOR_ID", "INTEGER"), ("FILM_ID", "INTEGER"), ("PAYMENT", "DECIMAL")],
            &["ACTOR_ID", "FILM_ID"],
        );
    if with_foreign_keys {
        provider
            .foreign_key("ACTOR_FILM", "ACTOR", &["ACTOR_ID"], &["ID"])
            .foreign_key("ACTOR_FILM", "FILM", &["FILM_ID"], &["ID"])
    } else {
        provider
    }
}
