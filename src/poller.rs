//! # UV Poller
//!
//! The display-side state machine. It drives periodic data acquisition
//! without overlap and decides what to show when data is missing, stale or
//! erroring.
//!
//! ## Scheduling
//!
//! The Poller owns at most one pending one-shot timer. Arming a new timer
//! drops the previous one, so re-arming always supersedes. On expiry the
//! Poller calls [`Poller::fetch`], which sends `FETCH_UV_DATA` to the helper
//! unless a request is already in flight. Overlapping calls are dropped, not
//! queued.
//!
//! Every outcome clears the in-flight flag first, then re-arms the timer at
//! the regular update interval. Retries and backoff live in the Fetcher; the
//! Poller never polls faster after a failure.
//!
//! ## Display Policy
//!
//! ```text
//! Uninitialized ──no coords──▶ MissingCoords (terminal)
//!       │
//!       ▼
//! AwaitingFirstData ──ok──▶ Ready ◀──ok── TransientError
//!       │                     ▲ │              ▲
//!       └────────fail─────────┼─┼──────────────┘
//!                             └─┘ ok / fail
//! ```
//!
//! Once any snapshot has been shown, failures are swallowed and the stale
//! snapshot stays on screen.

use crate::channel::{HelperNotification, HelperRequest};
use crate::config::PollConfig;
use crate::renderer::{Render, View};
use crate::{FetchOutcome, UvSnapshot};
use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant, Sleep};

/// What the widget is currently showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayState {
    /// `start` has not run yet
    Uninitialized,
    /// No usable coordinates; nothing will ever be fetched
    MissingCoords,
    /// Waiting for the first outcome
    AwaitingFirstData,
    /// Showing a snapshot, possibly stale
    Ready,
    /// First fetch failed and there is nothing to fall back on
    TransientError,
}

type Timer = Pin<Box<Sleep>>;

/// Resolves when the pending timer expires; never resolves when none is armed.
async fn expiry(timer: &mut Option<Timer>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

/// Display-side state machine driving periodic UV requests.
pub struct Poller<R> {
    config: PollConfig,
    requests: mpsc::Sender<HelperRequest>,
    renderer: R,
    state: DisplayState,
    snapshot: Option<UvSnapshot>,
    in_flight: bool,
    timer: Option<Timer>,
    requests_sent: u64,
}

impl<R: Render> Poller<R> {
    /// New Poller in `Uninitialized`; nothing happens until [`Poller::start`].
    pub fn new(config: PollConfig, requests: mpsc::Sender<HelperRequest>, renderer: R) -> Self {
        Poller {
            config,
            requests,
            renderer,
            state: DisplayState::Uninitialized,
            snapshot: None,
            in_flight: false,
            timer: None,
            requests_sent: 0,
        }
    }

    /// Current display state.
    pub fn state(&self) -> DisplayState {
        self.state
    }

    /// Last good snapshot, kept through later failures.
    pub fn snapshot(&self) -> Option<&UvSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// When the pending timer fires, if one is armed.
    pub fn timer_deadline(&self) -> Option<Instant> {
        self.timer.as_ref().map(|sleep| sleep.deadline())
    }

    /// Requests handed to the helper so far.
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn render(&mut self) {
        let view = View {
            state: self.state,
            snapshot: self.snapshot.as_ref(),
        };
        self.renderer.render(&view);
    }

    /// Enter the first display state and, with valid coordinates, schedule an
    /// immediate fetch.
    pub fn start(&mut self) {
        if self.state != DisplayState::Uninitialized {
            log::warn!("UV poller already started, ignoring start");
            return;
        }

        match self.config.coordinates() {
            Some((latitude, longitude)) => {
                log::info!(
                    "Starting UV poller for ({:.4}, {:.4}), every {} s",
                    latitude,
                    longitude,
                    self.config.update_interval.as_secs()
                );
                self.state = DisplayState::AwaitingFirstData;
                self.render();
                self.schedule_next(Duration::ZERO);
            }
            None => {
                log::error!("Latitude/longitude missing or invalid; UV polling disabled");
                self.state = DisplayState::MissingCoords;
                self.render();
            }
        }
    }

    /// Replace any pending timer with a new one firing after `delay`.
    pub fn schedule_next(&mut self, delay: Duration) {
        if self.state == DisplayState::MissingCoords {
            return;
        }

        if self.timer.replace(Box::pin(sleep(delay))).is_some() {
            log::debug!("Pending poll timer superseded");
        }
        log::debug!("Next UV poll in {} ms", delay.as_millis());
    }

    /// Ask the helper for fresh data unless a request is already outstanding.
    pub fn fetch(&mut self) {
        if self.in_flight {
            log::info!("UV request already in flight, skipping this poll");
            return;
        }
        let Some((latitude, longitude)) = self.config.coordinates() else {
            return;
        };

        self.in_flight = true;
        let request = HelperRequest::FetchUvData {
            latitude,
            longitude,
        };

        match self.requests.try_send(request) {
            Ok(()) => {
                self.requests_sent += 1;
                log::debug!("Sent FETCH_UV_DATA #{}", self.requests_sent);
            }
            Err(e) => {
                // No outcome will ever arrive for this request
                log::error!("Could not reach UV helper: {}", e);
                self.in_flight = false;
                self.schedule_next(self.config.update_interval);
            }
        }
    }

    /// Apply one helper outcome and re-arm the regular poll.
    pub fn on_outcome(&mut self, outcome: FetchOutcome) {
        self.in_flight = false;

        if self.state == DisplayState::MissingCoords {
            log::warn!("Ignoring UV outcome, no coordinates configured");
            return;
        }

        match outcome {
            FetchOutcome::Success(snapshot) => {
                log::info!("UV index now {:.1}", snapshot.now.uvi);
                self.snapshot = Some(snapshot);
                self.state = DisplayState::Ready;
                self.render();
            }
            FetchOutcome::Failure {
                message,
                exhausted_retries,
            } => {
                if self.snapshot.is_none() {
                    log::error!(
                        "UV fetch failed (exhausted retries: {}): {}",
                        exhausted_retries,
                        message
                    );
                    self.state = DisplayState::TransientError;
                    self.render();
                } else {
                    log::warn!("UV fetch failed, keeping last good data: {}", message);
                }
            }
        }

        self.schedule_next(self.config.update_interval);
    }

    /// Teardown: clear the pending timer. An in-flight request is left to
    /// finish; its outcome is simply never applied.
    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            log::info!("UV poll timer cleared");
        }
    }

    /// Start and drive the Poller until shutdown or until the helper goes away.
    ///
    /// Timer expiry, helper outcomes and shutdown are handled on this one task,
    /// so the in-flight flag needs no further synchronization.
    pub async fn run(
        mut self,
        mut notifications: mpsc::Receiver<HelperNotification>,
        mut shutdown: watch::Receiver<()>,
    ) -> Self {
        self.start();

        loop {
            tokio::select! {
                _ = expiry(&mut self.timer) => {
                    self.timer = None;
                    self.fetch();
                }
                received = notifications.recv() => match received {
                    Some(notification) => self.on_outcome(notification.into()),
                    None => {
                        log::warn!("UV helper channel closed");
                        break;
                    }
                },
                _ = shutdown.changed() => {
                    log::info!("Shutting down UV poller");
                    break;
                }
            }
        }

        self.stop();
        self
    }
}
