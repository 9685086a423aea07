//! # Poller ⇄ Helper Notification Bus
//!
//! The display side and the fetch helper never share state. They exchange
//! named notifications over a pair of tokio `mpsc` queues:
//!
//! | direction       | notification    | payload                                   |
//! |-----------------|-----------------|-------------------------------------------|
//! | Poller → Helper | `FETCH_UV_DATA` | `{latitude, longitude}`                   |
//! | Helper → Poller | `UV_DATA`       | [`UvSnapshot`]                            |
//! | Helper → Poller | `UV_ERROR`      | `"message"` or `{message, exhaustedRetries}` |
//!
//! Messages serialize as `{"notification": NAME, "payload": ...}` so the bus
//! can be carried over a socket if the two halves ever live in separate
//! processes.

use crate::uv_data::{Fetcher, UvApi};
use crate::{FetchOutcome, UvSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Queue depth in each direction. The Poller never has more than one
/// request outstanding, so this only needs a little slack.
pub const BUS_CAPACITY: usize = 4;

/// Requests from the Poller to the helper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notification", content = "payload")]
pub enum HelperRequest {
    #[serde(rename = "FETCH_UV_DATA")]
    FetchUvData { latitude: f64, longitude: f64 },
}

/// Notifications from the helper back to the Poller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notification", content = "payload")]
pub enum HelperNotification {
    #[serde(rename = "UV_DATA")]
    UvData(UvSnapshot),
    #[serde(rename = "UV_ERROR")]
    UvError(ErrorPayload),
}

/// `UV_ERROR` payload. Backoff exhaustion sends the detailed form; a single
/// rejection that never entered backoff sends a bare message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Detailed {
        message: String,
        #[serde(rename = "exhaustedRetries")]
        exhausted_retries: bool,
    },
    Message(String),
}

impl From<FetchOutcome> for HelperNotification {
    fn from(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Success(snapshot) => HelperNotification::UvData(snapshot),
            FetchOutcome::Failure {
                message,
                exhausted_retries: true,
            } => HelperNotification::UvError(ErrorPayload::Detailed {
                message,
                exhausted_retries: true,
            }),
            FetchOutcome::Failure { message, .. } => {
                HelperNotification::UvError(ErrorPayload::Message(message))
            }
        }
    }
}

impl From<HelperNotification> for FetchOutcome {
    fn from(notification: HelperNotification) -> Self {
        match notification {
            HelperNotification::UvData(snapshot) => FetchOutcome::Success(snapshot),
            HelperNotification::UvError(ErrorPayload::Detailed {
                message,
                exhausted_retries,
            }) => FetchOutcome::Failure {
                message,
                exhausted_retries,
            },
            HelperNotification::UvError(ErrorPayload::Message(message)) => FetchOutcome::Failure {
                message,
                exhausted_retries: false,
            },
        }
    }
}

/// Poller's end of the bus.
#[derive(Debug)]
pub struct PollerPort {
    pub requests: mpsc::Sender<HelperRequest>,
    pub notifications: mpsc::Receiver<HelperNotification>,
}

/// Helper's end of the bus.
#[derive(Debug)]
pub struct HelperPort {
    pub requests: mpsc::Receiver<HelperRequest>,
    pub notifications: mpsc::Sender<HelperNotification>,
}

/// Create both ends of a bus with `capacity` slots per direction.
pub fn bus(capacity: usize) -> (PollerPort, HelperPort) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (notification_tx, notification_rx) = mpsc::channel(capacity);

    (
        PollerPort {
            requests: request_tx,
            notifications: notification_rx,
        },
        HelperPort {
            requests: request_rx,
            notifications: notification_tx,
        },
    )
}

/// Spawn the helper task.
///
/// Requests are served one at a time in arrival order. The task ends when the
/// request queue closes or the Poller stops listening.
pub fn spawn_helper<A>(fetcher: Fetcher<A>, port: HelperPort) -> JoinHandle<()>
where
    A: UvApi + Send + Sync + 'static,
{
    let HelperPort {
        mut requests,
        notifications,
    } = port;

    tokio::spawn(async move {
        log::info!("Starting UV helper");

        while let Some(request) = requests.recv().await {
            match request {
                HelperRequest::FetchUvData {
                    latitude,
                    longitude,
                } => {
                    let outcome = fetcher.fetch(latitude, longitude).await;
                    if notifications.send(outcome.into()).await.is_err() {
                        log::warn!("Poller is gone, dropping UV outcome");
                        break;
                    }
                }
            }
        }

        log::info!("UV helper stopped");
    })
}
