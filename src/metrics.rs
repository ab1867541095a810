use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use crate::db;
use crate::merge::resolve::SourceStats;

/// Per-source counters for one `merge` invocation.
pub struct RunTracker {
    run_id: String,
    metrics: Vec<SourceStats>,
}

impl RunTracker {
    pub fn new(run_id: String) -> Self {
        RunTracker {
            run_id,
            metrics: Vec::new(),
        }
    }

    pub fn record(&mut self, stats: SourceStats) {
        info!(
            source = %stats.source,
            rows = stats.rows,
            new = stats.new_companies,
            merged = stats.merged,
            skipped = stats.skipped_blank_name,
            "source merged"
        );
        self.metrics.push(stats);
    }

    pub fn persist(&self, conn: &Connection) -> Result<()> {
        db::insert_run_metrics(conn, &self.run_id, &self.metrics)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn metrics(&self) -> &[SourceStats] {
        &self.metrics
    }

    pub fn total_rows(&self) -> usize {
        self.metrics.iter().map(|m| m.rows).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.metrics.iter().map(|m| m.skipped_blank_name).sum()
    }
}

pub fn new_run_id() -> String {
    format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f"))
}
