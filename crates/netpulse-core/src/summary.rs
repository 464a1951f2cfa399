//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Per-tick outcome summary."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use netpulse_common::time::format_duration;
use netpulse_logging::{np_error, np_info, np_warn, LogContext};

use crate::population::TickSample;
use crate::writer::WriteOutcome;

/// Human-readable account of one tick, emitted once the write settles.
#[derive(Debug, Clone)]
pub struct TickSummary {
    pub population: &'static str,
    pub tick: u64,
    pub devices: usize,
    pub points: usize,
    pub offline: usize,
    pub slow: usize,
    pub skipped: Option<String>,
    pub outcome: WriteOutcome,
    pub elapsed: Duration,
}

impl TickSummary {
    pub fn new(
        population: &'static str,
        tick: u64,
        sample: &TickSample,
        outcome: WriteOutcome,
        elapsed: Duration,
    ) -> Self {
        Self {
            population,
            tick,
            devices: sample.devices,
            points: sample.batch.len(),
            offline: sample.offline,
            slow: sample.slow,
            skipped: sample.skipped.clone(),
            outcome,
            elapsed,
        }
    }

    pub fn message(&self) -> String {
        if let Some(reason) = &self.skipped {
            return format!("tick skipped: {reason}");
        }
        let health = format!("{} offline, {} slow", self.offline, self.slow);
        match &self.outcome {
            WriteOutcome::Empty => format!("no points from {} devices ({health})", self.devices),
            WriteOutcome::Delivered => format!(
                "wrote {} points from {} devices ({health}) in {}",
                self.points,
                self.devices,
                format_duration(self.elapsed)
            ),
            WriteOutcome::DeliveredWithRetry(retries) => format!(
                "wrote {} points from {} devices ({health}) after {retries} retries in {}",
                self.points,
                self.devices,
                format_duration(self.elapsed)
            ),
            WriteOutcome::Failed(err) => format!(
                "dropped {} points from {} devices ({health}): {err}",
                self.points, self.devices
            ),
        }
    }

    pub fn log(&self) {
        let ctx = LogContext::population(self.population).with_tick(self.tick);
        let message = self.message();
        match (&self.skipped, &self.outcome) {
            (Some(_), _) => np_warn!(context = ctx, "{message}"),
            (None, WriteOutcome::Failed(_)) => np_error!(context = ctx, "{message}"),
            (None, WriteOutcome::DeliveredWithRetry(_)) => np_warn!(context = ctx, "{message}"),
            _ => np_info!(context = ctx, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use netpulse_net::StoreError;
    use netpulse_schema::{Batch, Point};

    use super::*;
    use crate::writer::WriteError;

    fn sample(points: usize) -> TickSample {
        let batch: Batch = (0..points)
            .map(|i| {
                Point::builder("ruckus_ap_metrics")
                    .tag("ap_name", format!("Lobby-AP-{:02}", i + 1))
                    .field("status", 1i64)
                    .build()
                    .unwrap()
            })
            .collect();
        TickSample {
            batch,
            devices: points,
            offline: 2,
            slow: 1,
            skipped: None,
        }
    }

    #[test]
    fn delivered_summary_reports_health_counts() {
        let summary = TickSummary::new(
            "access_points",
            4,
            &sample(10),
            WriteOutcome::Delivered,
            Duration::from_millis(12),
        );
        let message = summary.message();
        assert!(message.starts_with("wrote 10 points from 10 devices (2 offline, 1 slow)"));
    }

    #[test]
    fn failed_and_skipped_summaries_explain_themselves() {
        let failed = TickSummary::new(
            "switches",
            1,
            &sample(3),
            WriteOutcome::Failed(WriteError::Exhausted {
                attempts: 4,
                source: StoreError::Connect("refused".into()),
            }),
            Duration::ZERO,
        );
        assert!(failed.message().contains("dropped 3 points"));
        assert!(failed.message().contains("4 attempt(s)"));

        let skipped = TickSummary::new(
            "sensor",
            2,
            &TickSample::skipped(1, "timed out"),
            WriteOutcome::Empty,
            Duration::ZERO,
        );
        assert_eq!(skipped.message(), "tick skipped: timed out");
        skipped.log();
    }
}
