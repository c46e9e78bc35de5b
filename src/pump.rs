//! The tail-and-forward loop
//!
//! Reads one line, forwards it, waits for the outcome, then reads the next.
//! There is no queue between the two halves: a slow collector simply leaves
//! unread lines in the file.

use crate::collectors::FileTailer;
use crate::error::TailError;
use crate::events::DeliveryOutcome;
use crate::forward::Forwarder;
use log::{debug, info};
use std::fs::File;
use std::io::{Read, Seek};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Counters for one run of the pump
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpSummary {
    /// Complete lines read from the file
    pub lines: u64,
    /// Lines the collector answered with a 2xx status
    pub delivered: u64,
    /// Lines the collector answered with any other status
    pub non_success: u64,
    pub parse_errors: u64,
    /// Lines for which no response arrived
    pub failed: u64,
}

impl PumpSummary {
    pub fn record(&mut self, outcome: &DeliveryOutcome) {
        self.lines += 1;
        match outcome {
            DeliveryOutcome::Delivered { .. } if outcome.is_success_status() => {
                self.delivered += 1
            }
            DeliveryOutcome::Delivered { .. } => self.non_success += 1,
            DeliveryOutcome::ParseError(_) => self.parse_errors += 1,
            DeliveryOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Number of HTTP requests issued
    pub fn attempts(&self) -> u64 {
        self.delivered + self.non_success + self.failed
    }
}

/// Joins one tailer to one forwarder
pub struct AlertPump<R = File> {
    tailer: FileTailer<R>,
    forwarder: Forwarder,
    running: Arc<AtomicBool>,
}

impl<R: Read + Seek> AlertPump<R> {
    pub fn new(tailer: FileTailer<R>, forwarder: Forwarder) -> Self {
        Self {
            tailer,
            forwarder,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag that keeps [`run`](Self::run) going; clear it to stop the loop
    ///
    /// The loop notices within one poll interval, or once the delivery in
    /// progress finishes.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Forward lines until the running flag is cleared
    ///
    /// # Errors
    ///
    /// Returns `TailError` if the alerts file can no longer be read. Per-line
    /// problems never end the loop.
    pub async fn run(&mut self) -> Result<PumpSummary, TailError> {
        let mut summary = PumpSummary::default();
        match self.tailer.path() {
            Some(path) => info!("Alert pump started on {}", path.display()),
            None => info!("Alert pump started"),
        }

        while let Some(line) = self.tailer.next_line_until(&self.running).await? {
            let outcome = self.forwarder.forward(&line).await;
            summary.record(&outcome);

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
        }

        info!("Alert pump stopped");
        Ok(summary)
    }

    /// Forward every complete line currently in the file, then return
    pub async fn drain_available(&mut self) -> Result<PumpSummary, TailError> {
        let mut summary = PumpSummary::default();

        while let Some(line) = self.tailer.poll_line()? {
            let outcome = self.forwarder.forward(&line).await;
            summary.record(&outcome);
        }

        debug!("Drained {} lines", summary.lines);
        Ok(summary)
    }
}
