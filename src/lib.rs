//! relgraph - relational schema to graph schema mapping
//!
//! This crate derives a property-graph schema from relational metadata:
//! - Schema extraction through pluggable metadata providers
//! - ORM inheritance resolution (table-per-hierarchy, -type, -concrete-type)
//! - Vertex/edge type inference with bidirectional class mappers
//! - Join-table aggregation into many-to-many edges
//! - User configuration overrides, with a writer for round trips

pub mod config;
pub mod errors;
pub mod extractor;
pub mod graph_model;
pub mod hierarchy;
pub mod mapping_config;
pub mod pipeline;
pub mod resolver;
pub mod schema_model;

pub use errors::{MappingError, Result};
