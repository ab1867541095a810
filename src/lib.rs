//! Merge company records collected by several independent sources into one
//! deduplicated, scored master dataset.

pub mod config;
pub mod csv;
pub mod db;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod report;
