use crate::config::SyncConfig;
use crate::models::SheetCell;
use crate::sheets::SheetOperations;
use indicatif::ProgressStyle;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{Span, debug, error, instrument, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const RETRY_DELAY: Duration = Duration::from_millis(500);
const OUTCOME_CAPACITY: usize = 64;
const FLUSH_PROGRESS_TEMPLATE: &str = "{bar:40.cyan/blue} {pos:>4}/{len:4} {msg}";

/// Final result of writing one pending edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub range: String,
    pub value: String,
    pub success: bool,
    pub attempts: u32,
}

enum Command {
    Edit { range: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Coalesces edits per A1 range and writes them back once no edit has
/// arrived for the quiet period.
///
/// The pending map lives in a background worker task. Every edit pushes the
/// flush deadline back; `flush` writes immediately and `shutdown` writes
/// whatever is left before the worker exits.
pub struct WriteBackQueue {
    commands: mpsc::UnboundedSender<Command>,
    outcomes: broadcast::Sender<WriteOutcome>,
    worker: JoinHandle<()>,
}

impl WriteBackQueue {
    /// Start the worker. Must be called from within a Tokio runtime.
    pub fn spawn<SC>(sheets: Arc<SC>, config: &SyncConfig) -> Self
    where
        SC: SheetOperations + Send + Sync + 'static,
    {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (outcomes, _) = broadcast::channel(OUTCOME_CAPACITY);

        let worker = Worker {
            sheets,
            quiet_period: config.debounce(),
            retries: config.write_retries,
            pending: BTreeMap::new(),
            outcomes: outcomes.clone(),
        };

        Self {
            commands,
            outcomes,
            worker: tokio::spawn(worker.run(receiver)),
        }
    }

    /// Store `value` as the latest edit for `range` and restart the quiet period
    pub fn queue_edit(&self, range: impl Into<String>, value: impl Into<String>) {
        let command = Command::Edit {
            range: range.into(),
            value: value.into(),
        };
        if self.commands.send(command).is_err() {
            warn!("Write-back worker has stopped, dropping edit");
        }
    }

    pub fn queue_cell(&self, cell: &SheetCell) {
        self.queue_edit(cell.range(), cell.value.clone());
    }

    /// Outcomes of every write attempted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<WriteOutcome> {
        self.outcomes.subscribe()
    }

    /// Write all pending edits now and wait until they are done
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Write remaining edits and stop the worker
    pub async fn shutdown(self) {
        let Self {
            commands, worker, ..
        } = self;
        drop(commands);

        if let Err(e) = worker.await {
            error!(error = %e, "Write-back worker failed");
        }
    }
}

struct Worker<SC> {
    sheets: Arc<SC>,
    quiet_period: Duration,
    retries: u32,
    pending: BTreeMap<String, String>,
    outcomes: broadcast::Sender<WriteOutcome>,
}

impl<SC> Worker<SC>
where
    SC: SheetOperations + Send + Sync + 'static,
{
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Edit { range, value }) => {
                        if self.pending.insert(range.clone(), value).is_some() {
                            debug!(range = %range, "Replaced pending edit");
                        }
                        deadline = Some(Instant::now() + self.quiet_period);
                    }
                    Some(Command::Flush(done)) => {
                        deadline = None;
                        self.flush().await;
                        let _ = done.send(());
                    }
                    None => {
                        self.flush().await;
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.flush().await;
                }
            }
        }

        debug!("Write-back worker stopped");
    }

    #[instrument(name = "Flushing edits", skip_all, fields(edits = self.pending.len()))]
    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let edits = std::mem::take(&mut self.pending);

        let span = Span::current();
        match ProgressStyle::with_template(FLUSH_PROGRESS_TEMPLATE) {
            Ok(style) => span.pb_set_style(&style),
            Err(e) => warn!(error = %e, "Invalid progress bar template"),
        }
        span.pb_set_length(edits.len() as u64);
        span.pb_set_message("Writing cells");

        for (range, value) in edits {
            let outcome = self.write(range, value).await;
            span.pb_inc(1);
            // No subscribers is fine
            let _ = self.outcomes.send(outcome);
        }
    }

    async fn write(&self, range: String, value: String) -> WriteOutcome {
        let mut attempts = 0;

        loop {
            attempts += 1;
            if self.sheets.update_cell(&range, &value).await {
                return WriteOutcome {
                    range,
                    value,
                    success: true,
                    attempts,
                };
            }

            if attempts > self.retries {
                error!(range = %range, attempts, "Dropping edit after failed write");
                return WriteOutcome {
                    range,
                    value,
                    success: false,
                    attempts,
                };
            }

            warn!(range = %range, attempt = attempts, "Write failed, retrying");
            sleep(RETRY_DELAY).await;
        }
    }
}
