use crate::config::DEFAULT_UPSTREAM;
use crate::registry::{PeerHandle, SubscriberRegistry};
use crate::upstream::{UpstreamAdapter, UpstreamSignal, UpstreamTransport};
use chrono::Utc;
use pagewatch_core::change::kind_names;
use pagewatch_core::{matches, ChangeEvent, ClientMsg, HubMsg, InterestFilter, UpstreamState};
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot, watch,
    },
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

const MIN_HEARTBEAT: Duration = Duration::from_millis(100);
const COMMAND_QUEUE: usize = 1024;
const SIGNAL_QUEUE: usize = 256;

#[derive(Clone, Debug)]
pub struct HubSettings {
    pub upstream_url: String,
    pub heartbeat_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM.to_string(),
            heartbeat_interval: Duration::from_secs(15),
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HubPhase {
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub phase: HubPhase,
    pub subscribers: usize,
    pub upstream: String,
    pub upstream_changed_at: Option<String>,
}

pub enum HubCommand {
    Control { peer: PeerHandle, msg: ClientMsg },
    Detach { conn_id: String },
    Stats { reply: oneshot::Sender<HubStats> },
}

enum Delivery {
    Sent,
    Dropped,
    Closed,
}

fn deliver(peer: &PeerHandle, msg: HubMsg) -> Delivery {
    match peer.try_send(msg) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => {
            warn!(event = "send_backpressure", conn_id = %peer.conn_id());
            Delivery::Dropped
        }
        Err(TrySendError::Closed(_)) => Delivery::Closed,
    }
}

/// Hub state. Lives on a single task; every mutation goes through `&mut self`.
pub struct Hub {
    registry: SubscriberRegistry,
    upstream: UpstreamAdapter,
    phase: HubPhase,
    upstream_changed_at: Option<String>,
}

impl Hub {
    pub fn new(upstream: UpstreamAdapter) -> Self {
        Self {
            registry: SubscriberRegistry::new(),
            upstream,
            phase: HubPhase::Idle,
            upstream_changed_at: None,
        }
    }

    pub fn phase(&self) -> HubPhase {
        self.phase
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn upstream_state(&self) -> UpstreamState {
        self.upstream.state()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            phase: self.phase,
            subscribers: self.registry.len(),
            upstream: self.upstream.state().to_string(),
            upstream_changed_at: self.upstream_changed_at.clone(),
        }
    }

    pub fn handle_command(&mut self, command: HubCommand, now: Instant) {
        match command {
            HubCommand::Control { peer, msg } => self.handle_control(peer, msg, now),
            HubCommand::Detach { conn_id } => self.detach(&conn_id, "disconnect"),
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    pub fn handle_control(&mut self, peer: PeerHandle, msg: ClientMsg, now: Instant) {
        match msg {
            ClientMsg::Connect(filter) => self.attach(peer, filter, now),
            ClientMsg::Pong => {
                if !self.registry.record_pong(peer.conn_id(), now) {
                    debug!(event = "pong_unknown", conn_id = %peer.conn_id());
                }
            }
        }
    }

    fn attach(&mut self, peer: PeerHandle, filter: InterestFilter, now: Instant) {
        let conn_id = peer.conn_id().to_string();
        let matcher = filter.matcher.to_string();
        let kinds = kind_names(&filter.kinds).join(",");
        if let Err(err) = self.registry.attach(peer.clone(), filter, now) {
            warn!(event = "protocol_violation", conn_id = %conn_id, error = %err);
            return;
        }
        info!(
            event = "subscriber_attached",
            conn_id = %conn_id,
            matcher = %matcher,
            kinds = %kinds,
            subscribers = self.registry.len()
        );
        self.ensure_running();

        // first ping goes out right away and leaves the liveness window untouched
        if let Delivery::Closed = deliver(&peer, HubMsg::Ping(self.upstream.state())) {
            self.detach(&conn_id, "closed");
        }
    }

    fn ensure_running(&mut self) {
        if self.phase == HubPhase::Running {
            return;
        }
        self.phase = HubPhase::Running;
        self.upstream.start();
        info!(event = "hub_running");
    }

    pub fn detach(&mut self, conn_id: &str, reason: &str) {
        if self.registry.detach(conn_id).is_some() {
            info!(
                event = "subscriber_detached",
                conn_id = conn_id,
                reason = reason,
                subscribers = self.registry.len()
            );
        }
    }

    pub fn handle_upstream(&mut self, signal: UpstreamSignal, now: Instant) {
        match signal {
            UpstreamSignal::Opened => {
                if let Some(state) = self.upstream.on_open() {
                    info!(event = "upstream_state", state = %state);
                    self.announce_state(now);
                }
            }
            UpstreamSignal::Failed(reason) => match self.upstream.on_failure() {
                Some(state) => {
                    warn!(event = "upstream_state", state = %state, reason = %reason);
                    self.announce_state(now);
                }
                None => debug!(event = "upstream_retry", reason = %reason),
            },
            UpstreamSignal::Frame(raw) => match self.upstream.on_frame(&raw) {
                Ok(Some(event)) => {
                    self.fan_out(&event);
                }
                Ok(None) => {}
                Err(err) => warn!(event = "upstream_parse_error", error = %err),
            },
        }
    }

    /// A transition is announced by an out-of-schedule sweep carrying the new state.
    fn announce_state(&mut self, now: Instant) {
        self.upstream_changed_at = Some(Utc::now().to_rfc3339());
        self.sweep(now);
    }

    /// Sends `notify` to every subscriber whose filter matches; returns how many got it.
    pub fn fan_out(&mut self, event: &ChangeEvent) -> usize {
        let msg = HubMsg::Notify {
            path: event.path.clone(),
            kinds: event.kinds.clone(),
        };
        let mut sent = 0;
        let mut closed = Vec::new();
        for subscriber in self.registry.all() {
            if !matches(&subscriber.filter, event) {
                continue;
            }
            match deliver(&subscriber.peer, msg.clone()) {
                Delivery::Sent => sent += 1,
                Delivery::Dropped => {}
                Delivery::Closed => closed.push(subscriber.conn_id().to_string()),
            }
        }
        for conn_id in closed {
            self.detach(&conn_id, "closed");
        }
        debug!(event = "fan_out", path = %event.path, notified = sent);
        sent
    }

    /// Evicts subscribers that ignored the last ping and pings everyone else.
    pub fn sweep(&mut self, now: Instant) {
        let outcome = self.registry.sweep();
        for subscriber in &outcome.evicted {
            info!(
                event = "subscriber_evicted",
                conn_id = %subscriber.conn_id(),
                matcher = %subscriber.filter.matcher,
                silent_ms = now
                    .saturating_duration_since(subscriber.last_pong_received_at)
                    .as_millis() as u64
            );
        }

        let state = self.upstream.state();
        let mut closed = Vec::new();
        for peer in &outcome.alive {
            match deliver(peer, HubMsg::Ping(state)) {
                Delivery::Sent => {
                    self.registry.record_ping(peer.conn_id(), now);
                }
                // a ping that never left the hub cannot go unanswered
                Delivery::Dropped => {}
                Delivery::Closed => closed.push(peer.conn_id().to_string()),
            }
        }
        for conn_id in closed {
            self.detach(&conn_id, "closed");
        }
    }
}

/// Cloneable front door to a running hub task.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    conn_counter: Arc<AtomicU64>,
    queue_capacity: usize,
}

impl HubHandle {
    pub fn new(commands: mpsc::Sender<HubCommand>, queue_capacity: usize) -> Self {
        Self {
            commands,
            conn_counter: Arc::new(AtomicU64::new(0)),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Allocates a fresh connection id and the outbound queue the hub will write to.
    pub fn open_peer(&self) -> (PeerHandle, mpsc::Receiver<HubMsg>) {
        let id = self.conn_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        (PeerHandle::new(format!("tab-{id}"), tx), rx)
    }

    pub async fn control(&self, peer: &PeerHandle, msg: ClientMsg) -> bool {
        self.commands
            .send(HubCommand::Control {
                peer: peer.clone(),
                msg,
            })
            .await
            .is_ok()
    }

    pub async fn detach(&self, conn_id: &str) -> bool {
        self.commands
            .send(HubCommand::Detach {
                conn_id: conn_id.to_string(),
            })
            .await
            .is_ok()
    }

    pub async fn stats(&self) -> Option<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(HubCommand::Stats { reply }).await.ok()?;
        rx.await.ok()
    }
}

pub fn spawn_hub(
    settings: HubSettings,
    transport: Box<dyn UpstreamTransport>,
    shutdown: watch::Receiver<bool>,
) -> (HubHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_QUEUE);
    let upstream = UpstreamAdapter::new(settings.upstream_url.clone(), transport, signal_tx);
    let handle = HubHandle::new(command_tx, settings.queue_capacity);
    let task = tokio::spawn(run_hub(
        Hub::new(upstream),
        settings.heartbeat_interval,
        command_rx,
        signal_rx,
        shutdown,
    ));
    (handle, task)
}

async fn run_hub(
    mut hub: Hub,
    heartbeat_interval: Duration,
    mut commands: mpsc::Receiver<HubCommand>,
    mut signals: mpsc::Receiver<UpstreamSignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = heartbeat_interval.max(MIN_HEARTBEAT);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        event = "hub_start",
        heartbeat_ms = period.as_millis() as u64,
        upstream = %hub.upstream.url()
    );

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                hub.handle_command(command, Instant::now());
            }
            Some(signal) = signals.recv() => {
                hub.handle_upstream(signal, Instant::now());
            }
            _ = ticker.tick() => {
                hub.sweep(Instant::now());
            }
        }
    }

    info!(event = "hub_stop", subscribers = hub.registry.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_core::{EventKind, InterestDefaults, KindSet, PathMatcher};
    use std::sync::atomic::AtomicUsize;

    struct IdleTransport {
        opened: Arc<AtomicUsize>,
    }

    impl UpstreamTransport for IdleTransport {
        fn open(
            self: Box<Self>,
            _url: String,
            _signals: mpsc::Sender<UpstreamSignal>,
        ) -> JoinHandle<()> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async {})
        }
    }

    fn hub() -> (Hub, Arc<AtomicUsize>) {
        let opened = Arc::new(AtomicUsize::new(0));
        let (signal_tx, _signal_rx) = mpsc::channel(8);
        let upstream = UpstreamAdapter::new(
            "http://127.0.0.1:8000/_/stream/",
            Box::new(IdleTransport {
                opened: opened.clone(),
            }),
            signal_tx,
        );
        (Hub::new(upstream), opened)
    }

    fn peer(conn_id: &str) -> (PeerHandle, mpsc::Receiver<HubMsg>) {
        let (tx, rx) = mpsc::channel(16);
        (PeerHandle::new(conn_id, tx), rx)
    }

    fn connect(path: &str, kinds: &[EventKind]) -> ClientMsg {
        ClientMsg::Connect(InterestFilter::new(
            PathMatcher::from_page_path(path).expect("matcher"),
            kinds.iter().copied().collect(),
        ))
    }

    fn drain(rx: &mut mpsc::Receiver<HubMsg>) -> Vec<HubMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn frame(path: &str, kinds: &[&str]) -> UpstreamSignal {
        UpstreamSignal::Frame(
            serde_json::json!({ "path": path, "type": kinds }).to_string(),
        )
    }

    #[tokio::test]
    async fn connect_pings_immediately_and_starts_upstream_once() {
        let (mut hub, opened) = hub();
        assert_eq!(hub.phase(), HubPhase::Idle);

        let (a, mut rx_a) = peer("tab-a");
        hub.handle_control(a, connect("/a.html", &[EventKind::Write]), Instant::now());
        assert_eq!(drain(&mut rx_a), vec![HubMsg::Ping(UpstreamState::Unknown)]);
        assert_eq!(hub.phase(), HubPhase::Running);

        hub.handle_upstream(UpstreamSignal::Opened, Instant::now());
        let (b, mut rx_b) = peer("tab-b");
        hub.handle_control(b, connect("/docs/", &[EventKind::Create]), Instant::now());
        assert_eq!(drain(&mut rx_b), vec![HubMsg::Ping(UpstreamState::Connected)]);

        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(hub.registry().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_connect_is_dropped() {
        let (mut hub, _) = hub();
        let (a, mut rx) = peer("tab-a");
        hub.handle_control(
            a.clone(),
            connect("/a.html", &[EventKind::Write]),
            Instant::now(),
        );
        hub.handle_control(a, connect("/b.html", &[EventKind::Write]), Instant::now());

        assert_eq!(drain(&mut rx).len(), 1);
        assert_eq!(hub.registry().len(), 1);
        let entry = hub.registry().get("tab-a").expect("entry");
        assert_eq!(entry.filter.matcher.as_str(), "/a.html");
    }

    #[tokio::test]
    async fn matching_event_notifies_once() {
        let (mut hub, _) = hub();
        let (a, mut rx) = peer("tab-a");
        hub.handle_control(a, connect("/a.html", &[EventKind::Write]), Instant::now());
        drain(&mut rx);

        hub.handle_upstream(frame("/a.html", &["write"]), Instant::now());
        assert_eq!(
            drain(&mut rx),
            vec![HubMsg::Notify {
                path: "/a.html".to_string(),
                kinds: KindSet::from([EventKind::Write]),
            }]
        );
    }

    #[tokio::test]
    async fn other_path_sends_nothing() {
        let (mut hub, _) = hub();
        let (a, mut rx) = peer("tab-a");
        hub.handle_control(a, connect("/a.html", &[EventKind::Write]), Instant::now());
        drain(&mut rx);

        hub.handle_upstream(frame("/b.html", &["write"]), Instant::now());
        hub.handle_upstream(frame("/a.html", &["remove"]), Instant::now());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn identical_filters_each_get_notified() {
        let (mut hub, _) = hub();
        let (a, mut rx_a) = peer("tab-a");
        let (b, mut rx_b) = peer("tab-b");
        hub.handle_control(a, connect("/a.html", &[EventKind::Write]), Instant::now());
        hub.handle_control(b, connect("/a.html", &[EventKind::Write]), Instant::now());
        drain(&mut rx_a);
        drain(&mut rx_b);

        let event = ChangeEvent::new("/a.html", [EventKind::Write]);
        assert_eq!(hub.fan_out(&event), 2);
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
    }

    #[tokio::test]
    async fn malformed_frame_does_not_block_neighbours() {
        let (mut hub, _) = hub();
        let (a, mut rx) = peer("tab-a");
        hub.handle_control(a, connect("/docs/", &[EventKind::Write]), Instant::now());
        drain(&mut rx);

        hub.handle_upstream(frame("/docs/one.md", &["write"]), Instant::now());
        hub.handle_upstream(UpstreamSignal::Frame("{\"path\": ".to_string()), Instant::now());
        hub.handle_upstream(UpstreamSignal::Frame(String::new()), Instant::now());
        hub.handle_upstream(frame("/docs/two.md", &["write"]), Instant::now());

        let paths = drain(&mut rx)
            .into_iter()
            .map(|msg| match msg {
                HubMsg::Notify { path, .. } => path,
                other => panic!("unexpected {other:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["/docs/one.md", "/docs/two.md"]);
    }

    #[tokio::test]
    async fn state_flaps_broadcast_once_per_transition() {
        let (mut hub, _) = hub();
        let t0 = Instant::now();
        let at = |secs: u64| t0 + Duration::from_secs(secs);
        let (a, mut rx) = peer("tab-a");
        hub.handle_control(a.clone(), connect("/a.html", &[EventKind::Write]), t0);
        hub.handle_upstream(UpstreamSignal::Opened, at(1));
        hub.handle_control(a.clone(), ClientMsg::Pong, at(1));
        drain(&mut rx);

        hub.handle_upstream(UpstreamSignal::Failed("reset".to_string()), at(2));
        hub.handle_control(a.clone(), ClientMsg::Pong, at(2));
        hub.handle_upstream(UpstreamSignal::Failed("reset again".to_string()), at(3));
        hub.handle_upstream(UpstreamSignal::Opened, at(4));
        hub.handle_control(a, ClientMsg::Pong, at(4));
        hub.handle_upstream(UpstreamSignal::Opened, at(5));

        assert_eq!(
            drain(&mut rx),
            vec![
                HubMsg::Ping(UpstreamState::Disconnected),
                HubMsg::Ping(UpstreamState::Connected),
            ]
        );
        assert_eq!(hub.registry().len(), 1);
        assert!(hub.stats().upstream_changed_at.is_some());
    }

    #[tokio::test]
    async fn transition_evicts_subscriber_that_ignored_last_ping() {
        let (mut hub, _) = hub();
        let t0 = Instant::now();
        let (quiet, _rx_quiet) = peer("quiet");
        let (live, mut rx_live) = peer("live");
        hub.handle_control(quiet, connect("/a.html", &[EventKind::Write]), t0);
        hub.handle_control(live.clone(), connect("/a.html", &[EventKind::Write]), t0);

        let swept_at = t0 + Duration::from_secs(15);
        hub.sweep(swept_at);
        hub.handle_control(live, ClientMsg::Pong, swept_at);
        drain(&mut rx_live);

        let opened_at = swept_at + Duration::from_secs(1);
        hub.handle_upstream(UpstreamSignal::Opened, opened_at);

        assert!(hub.registry().get("quiet").is_none());
        let live = hub.registry().get("live").expect("live kept");
        assert_eq!(live.last_ping_sent_at, opened_at);
        assert_eq!(drain(&mut rx_live), vec![HubMsg::Ping(UpstreamState::Connected)]);
    }

    #[tokio::test]
    async fn silent_subscriber_evicted_after_second_unanswered_ping() {
        let (mut hub, _) = hub();
        let t0 = Instant::now();
        let (quiet, mut rx_quiet) = peer("quiet");
        let (live, mut rx_live) = peer("live");
        hub.handle_control(quiet, connect("/a.html", &[EventKind::Write]), t0);
        hub.handle_control(live.clone(), connect("/a.html", &[EventKind::Write]), t0);

        let period = Duration::from_secs(15);
        hub.sweep(t0 + period);
        hub.handle_control(live.clone(), ClientMsg::Pong, t0 + period);
        assert_eq!(hub.registry().len(), 2);

        hub.sweep(t0 + period * 2);
        hub.handle_control(live.clone(), ClientMsg::Pong, t0 + period * 2);
        assert!(hub.registry().get("quiet").is_none());
        assert!(hub.registry().get("live").is_some());

        for round in 3..8 {
            hub.sweep(t0 + period * round);
            hub.handle_control(live.clone(), ClientMsg::Pong, t0 + period * round);
        }
        assert!(hub.registry().get("live").is_some());

        assert_eq!(drain(&mut rx_quiet).len(), 2);
        assert_eq!(drain(&mut rx_live).len(), 8);
    }

    #[tokio::test]
    async fn closed_channel_detaches_on_next_send() {
        let (mut hub, _) = hub();
        let (a, rx) = peer("tab-a");
        hub.handle_control(a, connect("/a.html", &[EventKind::Write]), Instant::now());
        drop(rx);

        assert_eq!(
            hub.fan_out(&ChangeEvent::new("/a.html", [EventKind::Write])),
            0
        );
        assert!(hub.registry().is_empty());
    }

    #[tokio::test]
    async fn pong_and_detach_for_unknown_peer_are_noops() {
        let (mut hub, opened) = hub();
        let (ghost, _rx) = peer("ghost");
        hub.handle_control(ghost, ClientMsg::Pong, Instant::now());
        hub.detach("ghost", "disconnect");
        assert_eq!(hub.phase(), HubPhase::Idle);
        assert_eq!(opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_message_but_keeps_subscriber() {
        let (mut hub, _) = hub();
        let (tx, mut rx) = mpsc::channel(1);
        let slow = PeerHandle::new("slow", tx);
        let filter = InterestDefaults::default()
            .filter_for_page("/a.html")
            .expect("filter");
        hub.handle_control(slow, ClientMsg::Connect(filter), Instant::now());

        assert_eq!(
            hub.fan_out(&ChangeEvent::new("/a.html", [EventKind::Write])),
            0
        );
        assert_eq!(hub.registry().len(), 1);
        assert_eq!(drain(&mut rx), vec![HubMsg::Ping(UpstreamState::Unknown)]);
    }

    #[tokio::test]
    async fn dropped_ping_does_not_count_against_backpressured_tab() {
        let (mut hub, _) = hub();
        let t0 = Instant::now();
        let at = |secs: u64| t0 + Duration::from_secs(secs);
        let (tx, mut rx) = mpsc::channel(1);
        hub.handle_control(
            PeerHandle::new("slow", tx),
            connect("/a.html", &[EventKind::Write]),
            t0,
        );

        // the connect ping fills the queue, so both sweep pings are dropped
        hub.sweep(at(15));
        hub.sweep(at(30));
        let slow = hub.registry().get("slow").expect("still attached");
        assert_eq!(slow.last_ping_sent_at, t0);

        assert_eq!(drain(&mut rx), vec![HubMsg::Ping(UpstreamState::Unknown)]);
        hub.sweep(at(45));
        assert_eq!(
            hub.registry().get("slow").expect("slow").last_ping_sent_at,
            at(45)
        );

        // a ping that did arrive and went unanswered still evicts
        hub.sweep(at(60));
        assert!(hub.registry().is_empty());
    }

    #[tokio::test]
    async fn stats_reflect_state() {
        let (mut hub, _) = hub();
        assert_eq!(
            hub.stats(),
            HubStats {
                phase: HubPhase::Idle,
                subscribers: 0,
                upstream: "unknown".to_string(),
                upstream_changed_at: None,
            }
        );
        let (a, _rx) = peer("tab-a");
        hub.handle_control(a, connect("/a.html", &[EventKind::Write]), Instant::now());
        hub.handle_upstream(UpstreamSignal::Failed("refused".to_string()), Instant::now());
        let stats = hub.stats();
        assert_eq!(stats.phase, HubPhase::Running);
        assert_eq!(stats.subscribers, 1);
        assert_eq!(stats.upstream, "disconnected");
    }
}
