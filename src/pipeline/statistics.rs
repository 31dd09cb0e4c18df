use serde::Serialize;
use std::fmt;

/// Major phases of a mapping run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Extraction,
    HierarchyResolution,
    GraphModelBuilding,
    JoinTableAggregation,
    ConfigurationApplying,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Extraction => "schema extraction",
            Phase::HierarchyResolution => "hierarchy resolution",
            Phase::GraphModelBuilding => "graph model building",
            Phase::JoinTableAggregation => "join table aggregation",
            Phase::ConfigurationApplying => "configuration applying",
        };
        f.write_str(name)
    }
}

/// Counters updated by each phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub source_entities: usize,
    pub source_relationships: usize,
    pub hierarchical_bags: usize,
    pub built_vertex_types: usize,
    pub built_edge_types: usize,
    pub aggregated_join_vertices: usize,
    pub removed_edge_types: usize,
    pub configured_vertex_classes: usize,
    pub configured_edge_classes: usize,
    pub skipped_aggregations: usize,
    pub warnings: usize,
}

/// Receives the statistics after each completed phase.
///
/// A listener error is logged and recorded as a warning; it never aborts
/// the run.
pub trait StatisticsListener {
    fn on_phase_completed(&mut self, phase: Phase, statistics: &Statistics) -> anyhow::Result<()>;
}

/// Listener that writes a one-line summary through the `log` facade
#[derive(Debug, Default)]
pub struct LoggingListener;

impl StatisticsListener for LoggingListener {
    fn on_phase_completed(&mut self, phase: Phase, statistics: &Statistics) -> anyhow::Result<()> {
        log::info!(
            "{} completed: {} entities, {} relationships, {} vertex types, {} edge types, {} warnings",
            phase,
            statistics.source_entities,
            statistics.source_relationships,
            statistics.built_vertex_types,
            statistics.built_edge_types,
            statistics.warnings
        );
        Ok(())
    }
}
