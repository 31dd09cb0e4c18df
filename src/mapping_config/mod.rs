//! User mapping configuration: the JSON/YAML document, its validated form,
//! the applier that overrides the inferred model and the writer that
//! renders a model back into a document.

pub mod applier;
pub mod document;
pub mod writer;

pub use applier::ConfigurationApplier;
pub use document::{
    ConfigDocument, ConfiguredEdgeClass, ConfiguredProperty, ConfiguredVertexClass, EdgeMapping,
    JoinTableMapping, MappingConfiguration, PropertyMapping, SourceTable,
};
pub use writer::ConfigurationWriter;
