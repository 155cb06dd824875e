//! Data output and serialization for experimental analysis
//!
//! Structured export of run results to CSV and JSON for downstream analysis
//! in Python (pandas, matplotlib).

use crate::market::Market;
use crate::{ModelConfig, RunSummary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level container for the output of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub metadata: RunMetadata,
    pub summary: RunSummary,
    pub collector_snapshots: Vec<CollectorSnapshot>,
}

/// Metadata for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub config: ModelConfig,
    pub seed: u64,
    pub timestamp: String,
}

/// Final state of one friend collector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorSnapshot {
    pub collector_id: usize,
    pub album_len: usize,
    pub n_duplicates: u64,
    pub money_spent: u64,
    pub is_finished: bool,
}

impl RunOutput {
    /// Capture the final market state and run summary
    pub fn from_run(market: &Market, summary: &RunSummary, seed: u64) -> Self {
        let collector_snapshots = market
            .members()
            .iter()
            .enumerate()
            .map(|(id, member)| CollectorSnapshot {
                collector_id: id,
                album_len: member.album_len(),
                n_duplicates: member.n_duplicates(),
                money_spent: member.money_spent(),
                is_finished: member.is_finished(),
            })
            .collect();

        RunOutput {
            metadata: RunMetadata {
                config: market.config().clone(),
                seed,
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            summary: summary.clone(),
            collector_snapshots,
        }
    }

    /// Write the per-round time series to CSV
    pub fn write_rounds_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let mut wtr = csv::Writer::from_path(path)?;

        wtr.write_record(["round", "n_finished", "total_money_spent", "n_trades"])?;

        for point in &self.summary.rounds {
            wtr.write_record(&[
                point.round.to_string(),
                point.n_finished.to_string(),
                point.total_money_spent.to_string(),
                point.n_trades.to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Write final collector snapshots to CSV
    pub fn write_collectors_csv<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut wtr = csv::Writer::from_path(path)?;

        wtr.write_record([
            "collector_id",
            "album_len",
            "n_duplicates",
            "money_spent",
            "is_finished",
        ])?;

        for snapshot in &self.collector_snapshots {
            wtr.write_record(&[
                snapshot.collector_id.to_string(),
                snapshot.album_len.to_string(),
                snapshot.n_duplicates.to_string(),
                snapshot.money_spent.to_string(),
                snapshot.is_finished.to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Write the full output, metadata included, as pretty JSON
    pub fn write_summary_json<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Write all outputs to a directory
    ///
    /// Creates:
    /// - round_timeseries.csv
    /// - collector_snapshots.csv
    /// - summary.json
    pub fn write_all<P: AsRef<Path>>(&self, dir: P) -> Result<(), Box<dyn std::error::Error>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        self.write_rounds_csv(dir.join("round_timeseries.csv"))?;
        self.write_collectors_csv(dir.join("collector_snapshots.csv"))?;
        self.write_summary_json(dir.join("summary.json"))?;

        Ok(())
    }
}
