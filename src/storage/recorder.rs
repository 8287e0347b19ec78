//! Single writer for attempt outcomes
//!
//! Workers never touch the ledger, report or error log directly. They send each
//! finished attempt over a channel and the recorder task writes it to every sink
//! in arrival order, one attempt at a time.

use crate::state::{AttemptResult, RunState};
use crate::storage::report::{ErrorLog, ReportWriter};
use crate::storage::traits::Ledger;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// How often (in attempts) a progress line is logged
const PROGRESS_EVERY: u64 = 10;

/// Owns the report and error log; shares the ledger with the coordinator
pub struct Recorder<L: Ledger> {
    run_id: i64,
    ledger: Arc<Mutex<L>>,
    report: ReportWriter,
    error_log: Option<ErrorLog>,
    run_state: Arc<Mutex<RunState>>,
    write_failures: u64,
}

impl<L: Ledger> Recorder<L> {
    pub fn new(
        run_id: i64,
        ledger: Arc<Mutex<L>>,
        report: ReportWriter,
        error_log: Option<ErrorLog>,
        run_state: Arc<Mutex<RunState>>,
    ) -> Self {
        Self {
            run_id,
            ledger,
            report,
            error_log,
            run_state,
            write_failures: 0,
        }
    }

    /// Writes one attempt to the ledger, the report and (for failures) the error log
    ///
    /// A failing sink is logged and counted; it does not stop the other sinks.
    pub async fn record(&mut self, attempt: &AttemptResult) {
        if let Err(e) = self
            .ledger
            .lock()
            .await
            .record_attempt(self.run_id, attempt)
        {
            tracing::error!("Failed to record {} in ledger: {}", attempt.target_id, e);
            self.write_failures += 1;
        }

        if let Err(e) = self.report.append(attempt) {
            tracing::error!("Failed to append {} to report: {}", attempt.target_id, e);
            self.write_failures += 1;
        }

        if let (Some(log), Some(error)) = (self.error_log.as_mut(), attempt.error.as_deref()) {
            if let Err(e) = log.append(&attempt.url, error) {
                tracing::error!("Failed to append {} to error log: {}", attempt.target_id, e);
                self.write_failures += 1;
            }
        }

        let mut state = self.run_state.lock().await;
        state.record(attempt);

        if state.processed() % PROGRESS_EVERY == 0 {
            tracing::info!(
                "Progress: {} processed ({} ok, {} failed), {:.2} targets/sec",
                state.processed(),
                state.succeeded(),
                state.failed(),
                state.rate()
            );
        }
    }

    /// Drains the channel until every sender is dropped
    ///
    /// Returns the number of sink writes that failed.
    pub async fn run(mut self, mut rx: mpsc::Receiver<AttemptResult>) -> u64 {
        while let Some(attempt) = rx.recv().await {
            match (&attempt.error, attempt.is_success()) {
                (_, true) => tracing::info!(
                    "{}: saved via {} ({})",
                    attempt.target_id,
                    attempt.strategy,
                    attempt.local_path.as_deref().unwrap_or("-")
                ),
                (Some(error), false) => {
                    tracing::warn!("{}: failed: {}", attempt.target_id, error)
                }
                (None, false) => tracing::warn!("{}: failed", attempt.target_id),
            }
            self.record(&attempt).await;
        }
        self.write_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Target;
    use crate::state::Strategy;
    use crate::storage::SqliteLedger;
    use tempfile::TempDir;
    use url::Url;

    fn target(id: &str) -> Target {
        Target {
            id: id.to_string(),
            title: id.to_string(),
            url: Url::parse(&format!("https://{}.example.com/", id)).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_recorder_writes_every_sink() {
        let dir = TempDir::new().unwrap();
        let mut ledger = SqliteLedger::new(&dir.path().join("ledger.db")).unwrap();
        let run_id = ledger.create_run("h").unwrap();
        let ledger = Arc::new(Mutex::new(ledger));
        let state = Arc::new(Mutex::new(RunState::new(0)));

        let recorder = Recorder::new(
            run_id,
            ledger.clone(),
            ReportWriter::open(&dir.path().join("report.jsonl")).unwrap(),
            Some(ErrorLog::open(&dir.path().join("errors.log")).unwrap()),
            state.clone(),
        );

        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(recorder.run(rx));

        for id in ["a", "b", "c"] {
            tx.send(AttemptResult::failed(&target(id), Strategy::None, None, "down", 1))
                .await
                .unwrap();
        }
        drop(tx);

        assert_eq!(handle.await.unwrap(), 0);

        assert_eq!(ledger.lock().await.attempts_for_run(run_id).unwrap().len(), 3);
        let report = std::fs::read_to_string(dir.path().join("report.jsonl")).unwrap();
        assert_eq!(report.lines().count(), 3);
        let errors = std::fs::read_to_string(dir.path().join("errors.log")).unwrap();
        assert_eq!(errors.lines().count(), 3);
        assert_eq!(state.lock().await.failed(), 3);
    }
}
