//! Scheduled and manual polling.
//!
//! The [`Poller`] task owns the [`Pipeline`]. Timer ticks and commands from
//! [`PollerHandle`]s are handled one at a time by the same loop, so cycles
//! never overlap; a command sent mid-cycle waits in the channel.
//! Readers observe the collection and status through watch channels and
//! never see a collection that is being modified.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::article::ArticleCollection;
use crate::config::PollerConfig;
use crate::pipeline::{CycleReport, Pipeline};
use crate::{FeedmergeError, Result};

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 16;
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Phase of the poller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollState {
    #[default]
    Idle,
    Fetching,
    Merging,
    Persisting,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollState::Idle => "idle",
            PollState::Fetching => "fetching",
            PollState::Merging => "merging",
            PollState::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// Requests accepted by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run a cycle now and restart the interval.
    PollNow,
    /// Upsert the whole collection to the durable store.
    UpsertAll,
    /// Stop the poller after the current command.
    Shutdown,
}

/// Observable state of the poller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollerStatus {
    /// Current phase.
    pub state: PollState,
    /// Report of the last successful cycle.
    pub last_report: Option<CycleReport>,
    /// Error of the last failed cycle, cleared by the next success.
    pub last_error: Option<String>,
    /// Outcome of the last manual full upsert.
    pub last_upsert: Option<String>,
}

impl PollerStatus {
    /// When the last successful cycle finished.
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_report.as_ref().map(|r| r.completed_at)
    }

    /// Status line for display.
    pub fn message(&self) -> String {
        match (&self.last_error, &self.last_report) {
            (Some(error), _) => format!("Poll failed: {}", error),
            (None, Some(report)) => report.to_string(),
            (None, None) => "Waiting for first poll".to_string(),
        }
    }
}

/// Client side of a running poller.
#[derive(Clone)]
pub struct PollerHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<PollerStatus>,
    collection: watch::Receiver<Arc<ArticleCollection>>,
}

impl PollerHandle {
    /// Send a command to the poller.
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FeedmergeError::Validation("poller is not running".to_string()))
    }

    /// Request an immediate cycle.
    pub async fn poll_now(&self) -> Result<()> {
        self.send(Command::PollNow).await
    }

    /// Request a full upsert of the collection.
    pub async fn upsert_all(&self) -> Result<()> {
        self.send(Command::UpsertAll).await
    }

    /// Ask the poller to stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    /// The collection as of the last successful cycle.
    pub fn snapshot(&self) -> Arc<ArticleCollection> {
        Arc::clone(&self.collection.borrow())
    }

    /// The current status.
    pub fn status(&self) -> PollerStatus {
        self.status.borrow().clone()
    }

    /// Receiver that changes whenever the status does.
    pub fn subscribe_status(&self) -> watch::Receiver<PollerStatus> {
        self.status.clone()
    }

    /// Receiver that changes whenever a new collection is published.
    pub fn subscribe_collection(&self) -> watch::Receiver<Arc<ArticleCollection>> {
        self.collection.clone()
    }
}

/// Drives the pipeline on a timer and on request.
pub struct Poller {
    pipeline: Pipeline,
    interval: Duration,
    run_on_start: bool,
    commands: mpsc::Receiver<Command>,
    status: watch::Sender<PollerStatus>,
    collection: watch::Sender<Arc<ArticleCollection>>,
}

impl Poller {
    /// Create a poller and its handle.
    pub fn new(pipeline: Pipeline, config: &PollerConfig) -> (Self, PollerHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (status_tx, status_rx) = watch::channel(PollerStatus::default());
        let (collection_tx, collection_rx) = watch::channel(pipeline.collection());

        let poller = Self {
            pipeline,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            run_on_start: config.run_on_start,
            commands: command_rx,
            status: status_tx,
            collection: collection_tx,
        };
        let handle = PollerHandle {
            commands: command_tx,
            status: status_rx,
            collection: collection_rx,
        };
        (poller, handle)
    }

    /// Override the interval. A zero interval is raised to one millisecond.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Run the poller on a new task. The pipeline is returned on shutdown.
    pub fn spawn(self) -> JoinHandle<Pipeline> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown or until every handle is dropped.
    pub async fn run(mut self) -> Pipeline {
        info!(
            "Poller started (interval: {} seconds, {} source(s))",
            self.interval.as_secs(),
            self.pipeline.sources().len()
        );

        let first_tick = if self.run_on_start {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut timer = interval_at(first_tick, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.poll().await;
                }
                command = self.commands.recv() => match command {
                    Some(Command::PollNow) => {
                        self.poll().await;
                        timer.reset();
                    }
                    Some(Command::UpsertAll) => self.upsert_all().await,
                    Some(Command::Shutdown) | None => break,
                },
            }
        }

        info!("Poller stopped");
        self.pipeline
    }

    async fn poll(&mut self) {
        let status = &self.status;
        let result = self
            .pipeline
            .run_cycle(|state| status.send_modify(|s| s.state = state))
            .await;

        match result {
            Ok(report) => {
                if let Some(warning) = &report.durable_warning {
                    warn!("Cycle completed with durable store warning: {}", warning);
                }
                self.collection.send_replace(self.pipeline.collection());
                self.status.send_modify(|s| {
                    s.state = PollState::Idle;
                    s.last_report = Some(report);
                    s.last_error = None;
                });
            }
            Err(e) => {
                error!("Poll cycle failed: {}", e);
                self.status.send_modify(|s| {
                    s.state = PollState::Idle;
                    s.last_error = Some(e.to_string());
                });
            }
        }
    }

    async fn upsert_all(&mut self) {
        let message = match self.pipeline.upsert_all().await {
            Ok(count) => format!("Upserted {} row(s) to the database", count),
            Err(e) => {
                error!("Full upsert failed: {}", e);
                format!("DB upsert failed: {}", e)
            }
        };
        info!("{}", message);
        self.status.send_modify(|s| s.last_upsert = Some(message));
    }
}
