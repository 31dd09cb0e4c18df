//! Graph model: vertex and edge types, the mapping rules back to the
//! source schema, and the phases that build and reshape them.

pub mod aggregator;
pub mod builder;
pub mod mapper;
pub mod model;

pub use aggregator::JoinTableAggregator;
pub use builder::GraphModelBuilder;
pub use mapper::{AggregatorEdge, ClassMapper, MappingRules};
pub use model::{EdgeId, EdgeType, ElementRef, GraphModel, ModelProperty, VertexId, VertexType};
