//! Hierarchical time index for energy measurements.
//!
//! Records (date, time, five channel readings) are bucketed by
//! year -> month -> day -> quarter of day and queried over closed time
//! ranges: sum, average, range comparison and tolerance search.

pub mod cli;
pub mod utils;
pub mod index;
pub mod query;
pub mod error;
pub mod config;
pub mod record;
pub mod rollup;
pub mod commands;
pub mod menu;
pub mod persistence;
pub mod validity_log;
pub mod csv_processor;
