use futures_util::StreamExt;
use pagewatch_core::{parse_change_event, ChangeEvent, ChangeParseError, UpstreamState};
use reqwest_eventsource::{Event, EventSource};
use std::time::Duration;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

const RESTART_DELAY: Duration = Duration::from_secs(2);

/// Raw observations forwarded from the transport task to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamSignal {
    Opened,
    Frame(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream frame dropped: {0}")]
    Parse(#[from] ChangeParseError),
}

/// Opens the physical event stream and reports what happens on it.
///
/// Implementations own reconnection; the hub only sees the resulting signals.
pub trait UpstreamTransport: Send + 'static {
    fn open(self: Box<Self>, url: String, signals: mpsc::Sender<UpstreamSignal>)
        -> JoinHandle<()>;
}

/// Server-sent-events transport backed by `reqwest-eventsource`.
pub struct SseTransport {
    client: reqwest::Client,
}

impl SseTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for SseTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamTransport for SseTransport {
    fn open(
        self: Box<Self>,
        url: String,
        signals: mpsc::Sender<UpstreamSignal>,
    ) -> JoinHandle<()> {
        tokio::spawn(stream_events(self.client, url, signals))
    }
}

async fn stream_events(client: reqwest::Client, url: String, signals: mpsc::Sender<UpstreamSignal>) {
    loop {
        let request = client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let mut source = match EventSource::new(request) {
            Ok(source) => source,
            Err(err) => {
                warn!(event = "upstream_request_invalid", url = %url, error = %err);
                return;
            }
        };
        debug!(event = "upstream_connecting", url = %url);

        while let Some(item) = source.next().await {
            let signal = match item {
                Ok(Event::Open) => UpstreamSignal::Opened,
                Ok(Event::Message(message)) => UpstreamSignal::Frame(message.data),
                Err(err) => UpstreamSignal::Failed(err.to_string()),
            };
            if signals.send(signal).await.is_err() {
                source.close();
                return;
            }
        }

        // the event source stopped retrying on its own
        let closed = UpstreamSignal::Failed("event stream closed".to_string());
        if signals.send(closed).await.is_err() {
            return;
        }
        tokio::time::sleep(RESTART_DELAY).await;
    }
}

/// The hub's single upstream connection and its observed state.
pub struct UpstreamAdapter {
    url: String,
    transport: Option<Box<dyn UpstreamTransport>>,
    signals: Option<mpsc::Sender<UpstreamSignal>>,
    task: Option<JoinHandle<()>>,
    state: UpstreamState,
}

impl UpstreamAdapter {
    pub fn new(
        url: impl Into<String>,
        transport: Box<dyn UpstreamTransport>,
        signals: mpsc::Sender<UpstreamSignal>,
    ) -> Self {
        Self {
            url: url.into(),
            transport: Some(transport),
            signals: Some(signals),
            task: None,
            state: UpstreamState::Unknown,
        }
    }

    /// Opens the connection on first call; later calls return false and do nothing.
    pub fn start(&mut self) -> bool {
        if self.task.is_some() {
            return false;
        }
        let (Some(transport), Some(signals)) = (self.transport.take(), self.signals.take()) else {
            return false;
        };
        info!(event = "upstream_start", url = %self.url);
        self.task = Some(transport.open(self.url.clone(), signals));
        true
    }

    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }

    pub fn state(&self) -> UpstreamState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn on_open(&mut self) -> Option<UpstreamState> {
        self.transition(UpstreamState::Connected)
    }

    pub fn on_failure(&mut self) -> Option<UpstreamState> {
        self.transition(UpstreamState::Disconnected)
    }

    pub fn on_frame(&self, raw: &str) -> Result<Option<ChangeEvent>, UpstreamError> {
        Ok(parse_change_event(raw)?)
    }

    fn transition(&mut self, next: UpstreamState) -> Option<UpstreamState> {
        if self.state == next {
            return None;
        }
        self.state = next;
        Some(next)
    }
}

impl Drop for UpstreamAdapter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
