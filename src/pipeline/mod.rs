//! Mapping pipeline: extraction, hierarchy resolution, model building,
//! join-table aggregation and configuration, run in that order against one
//! [`MappingContext`].

pub mod context;
pub mod statistics;

pub use context::{ExecutionMode, MappingContext};
pub use statistics::{LoggingListener, Phase, Statistics, StatisticsListener};

use log::{debug, info};
use serde::Serialize;

use crate::errors::Result;
use crate::extractor::{MetadataProvider, SchemaExtractor, TableFilter};
use crate::graph_model::{
    EdgeId, GraphModel, GraphModelBuilder, JoinTableAggregator, MappingRules, ModelProperty, VertexId,
};
use crate::hierarchy::{HierarchyResolver, InheritanceDescriptor};
use crate::mapping_config::{ConfigDocument, ConfigurationApplier, ConfigurationWriter, MappingConfiguration};
use crate::resolver::{DriverTypeMap, NameResolverKind, TypeResolver};
use crate::schema_model::DatabaseSchema;

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct MappingOutput {
    pub schema: DatabaseSchema,
    pub model: GraphModel,
    pub rules: MappingRules,
}

#[derive(Debug, Clone, Default)]
pub struct MappingPipeline {
    configuration: Option<ConfigDocument>,
    descriptor: Option<InheritanceDescriptor>,
    name_resolver: NameResolverKind,
    driver: DriverTypeMap,
    filter: TableFilter,
}

impl MappingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configuration(mut self, configuration: ConfigDocument) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_hierarchy(mut self, descriptor: InheritanceDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn with_name_resolver(mut self, name_resolver: NameResolverKind) -> Self {
        self.name_resolver = name_resolver;
        self
    }

    pub fn with_driver(mut self, driver: DriverTypeMap) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_filter(mut self, filter: TableFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Run every phase. Configuration errors are raised before any
    /// metadata is read.
    pub fn run(&self, provider: &mut dyn MetadataProvider, ctx: &mut MappingContext) -> Result<MappingOutput> {
        info!(
            "Starting mapping run (mode: {}, names: {}, driver: {:?})",
            ctx.execution_mode, self.name_resolver, self.driver
        );
        let configuration: Option<MappingConfiguration> = match &self.configuration {
            Some(document) => Some(document.validate(ctx)?),
            None => None,
        };

        let mut schema = SchemaExtractor::new(self.filter.clone()).extract(provider, ctx)?;

        if let Some(descriptor) = &self.descriptor {
            HierarchyResolver::new(descriptor.clone()).resolve(&mut schema, ctx)?;
        }

        let name_resolver = self.name_resolver.resolver();
        let (mut model, mut rules) =
            GraphModelBuilder::new(name_resolver.as_ref(), TypeResolver::new(self.driver)).build(&schema, ctx);

        if ctx.execution_mode.aggregates() {
            // Configured join tables wait until their edge mapping is applied
            let skipped = configuration
                .as_ref()
                .map(MappingConfiguration::join_tables)
                .unwrap_or_default();
            JoinTableAggregator::skipping_tables(skipped).aggregate(&schema, &mut model, &mut rules, ctx);
        }

        if let Some(configuration) = configuration {
            ConfigurationApplier::new(configuration).apply(&mut schema, &mut model, &mut rules, ctx)?;
            if ctx.execution_mode.aggregates() {
                debug!("Aggregating join tables flagged by the configuration");
                JoinTableAggregator::new().aggregate(&schema, &mut model, &mut rules, ctx);
            }
        }

        info!(
            "Mapping run finished: {} vertex types, {} edge types, {} warnings",
            model.vertex_count(),
            model.edge_count(),
            ctx.warnings().len()
        );
        Ok(MappingOutput { schema, model, rules })
    }
}

impl MappingOutput {
    /// Configuration document describing this model
    pub fn configuration(&self, data_source: &str) -> ConfigDocument {
        let configuration = ConfigurationWriter::new(data_source).build(&self.schema, &self.model, &self.rules);
        ConfigDocument::from(&configuration)
    }

    pub fn summary(&self) -> GraphSummary {
        let name_of = |id: VertexId| self.model.vertex_name(id).map(str::to_string);
        let edge_name = |id: EdgeId| self.model.edge(id).map(|e| e.name.clone());

        let vertices = self
            .model
            .vertices()
            .map(|v| VertexSummary {
                name: v.name.clone(),
                parent: v.parent_type.and_then(name_of),
                properties: v.properties.iter().map(PropertySummary::from).collect(),
                inherited_properties: v.inherited_properties.iter().map(PropertySummary::from).collect(),
                out_edges: v.out_edges.iter().filter_map(|e| edge_name(*e)).collect(),
                in_edges: v.in_edges.iter().filter_map(|e| edge_name(*e)).collect(),
            })
            .collect();
        let edges = self
            .model
            .edges()
            .map(|e| EdgeSummary {
                name: e.name.clone(),
                from: e.out_vertex.and_then(name_of),
                to: e.in_vertex.and_then(name_of),
                properties: e.properties.iter().map(PropertySummary::from).collect(),
            })
            .collect();
        GraphSummary { vertices, edges }
    }
}

/// Printable view of a graph model
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub vertices: Vec<VertexSummary>,
    pub edges: Vec<EdgeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VertexSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub properties: Vec<PropertySummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inherited_properties: Vec<PropertySummary>,
    pub out_edges: Vec<String>,
    pub in_edges: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeSummary {
    pub name: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub properties: Vec<PropertySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertySummary {
    pub name: String,
    #[serde(rename = "type")]
    pub target_type: Option<String>,
    pub ordinal: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
    pub included: bool,
}

impl From<&ModelProperty> for PropertySummary {
    fn from(property: &ModelProperty) -> Self {
        Self {
            name: property.name.clone(),
            target_type: property.target_type.map(|t| t.as_str().to_string()),
            ordinal: property.ordinal_position,
            primary_key: property.from_primary_key,
            included: property.included,
        }
    }
}
