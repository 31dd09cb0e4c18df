use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::statistics::{Phase, Statistics, StatisticsListener};
use crate::errors::MappingError;

/// How join tables are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Every table becomes a vertex type
    #[default]
    Naive,
    /// Join tables are collapsed into edges
    NaiveAggregate,
}

impl ExecutionMode {
    pub fn aggregates(&self) -> bool {
        matches!(self, ExecutionMode::NaiveAggregate)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Naive => f.write_str("naive"),
            ExecutionMode::NaiveAggregate => f.write_str("naive-aggregate"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" => Ok(ExecutionMode::Naive),
            "naive-aggregate" => Ok(ExecutionMode::NaiveAggregate),
            other => Err(MappingError::invalid_value("execution_mode", other, "run settings")),
        }
    }
}

/// Per-run state handed explicitly to every phase.
///
/// Built once per run; holds the execution mode, the counters, the ordered
/// warning list and the progress listeners.
pub struct MappingContext {
    pub execution_mode: ExecutionMode,
    pub statistics: Statistics,
    warnings: Vec<String>,
    listeners: Vec<Box<dyn StatisticsListener>>,
}

impl MappingContext {
    pub fn new(execution_mode: ExecutionMode) -> Self {
        Self {
            execution_mode,
            statistics: Statistics::default(),
            warnings: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn StatisticsListener>) {
        self.listeners.push(listener);
    }

    /// Record a non-fatal warning. Repeated messages are kept once.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.warnings.contains(&message) {
            return;
        }
        warn!("{}", message);
        self.warnings.push(message);
        self.statistics.warnings = self.warnings.len();
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Invoke every listener; failures become warnings
    pub fn notify(&mut self, phase: Phase) {
        let mut failures = Vec::new();
        for listener in &mut self.listeners {
            if let Err(e) = listener.on_phase_completed(phase, &self.statistics) {
                failures.push(format!("Statistics listener failed after {}: {}", phase, e));
            }
        }
        for failure in failures {
            self.warn(failure);
        }
    }
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::new(ExecutionMode::default())
    }
}

impl fmt::Debug for MappingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingContext")
            .field("execution_mode", &self.execution_mode)
            .field("statistics", &self.statistics)
            .field("warnings", &self.warnings)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
