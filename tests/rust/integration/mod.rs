//! Integration tests - full mapping runs over in-memory metadata and
//! in-memory SQLite databases.
//!
//! These tests verify that extraction, hierarchy resolution, model building,
//! aggregation and configuration work together.

mod common;
mod configuration_scenarios;
mod hierarchy_scenarios;
mod join_table_scenarios;
mod sqlite_extraction;
