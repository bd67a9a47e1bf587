use crate::coordinator::HubHandle;
use pagewatch_core::{ClientMsg, HubMsg, InterestDefaults, InterestFilter, MatcherError, UpstreamState};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusStyle {
    #[default]
    Neutral,
    Connected,
    Disconnected,
}

/// The page a tab is showing.
pub trait TabView {
    fn refresh_region(&mut self, page_path: &str, region_id: &str);
    fn set_status(&mut self, style: StatusStyle);
}

/// Per-tab reaction logic: answers pings, mirrors upstream state, refreshes on notify.
pub struct TabClient<V> {
    page_path: String,
    region_id: String,
    filter: InterestFilter,
    status: StatusStyle,
    view: V,
}

impl<V: TabView> TabClient<V> {
    pub fn new(
        page_path: impl Into<String>,
        region_id: impl Into<String>,
        defaults: &InterestDefaults,
        mut view: V,
    ) -> Result<Self, MatcherError> {
        let page_path = page_path.into();
        let filter = defaults.filter_for_page(&page_path)?;
        view.set_status(StatusStyle::Neutral);
        Ok(Self {
            page_path,
            region_id: region_id.into(),
            filter,
            status: StatusStyle::Neutral,
            view,
        })
    }

    pub fn filter(&self) -> &InterestFilter {
        &self.filter
    }

    pub fn status(&self) -> StatusStyle {
        self.status
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn connect_message(&self) -> ClientMsg {
        ClientMsg::Connect(self.filter.clone())
    }

    /// The reply a hub message calls for. Sent before the message is applied.
    pub fn reply_for(&self, msg: &HubMsg) -> Option<ClientMsg> {
        match msg {
            HubMsg::Ping(_) => Some(ClientMsg::Pong),
            HubMsg::Notify { .. } => None,
        }
    }

    pub fn apply(&mut self, msg: HubMsg) {
        match msg {
            HubMsg::Ping(state) => {
                let next = match state {
                    UpstreamState::Connected => StatusStyle::Connected,
                    UpstreamState::Disconnected => StatusStyle::Disconnected,
                    UpstreamState::Unknown => return,
                };
                self.status = next;
                self.view.set_status(next);
            }
            HubMsg::Notify { path, .. } => {
                debug!(event = "tab_refresh", page = %self.page_path, changed = %path);
                self.view.refresh_region(&self.page_path, &self.region_id);
            }
        }
    }

    /// Drives the client against an in-process hub until `shutdown` flips.
    pub async fn run(mut self, hub: &HubHandle, mut shutdown: watch::Receiver<bool>) -> V {
        let (peer, mut inbox) = hub.open_peer();
        if !hub.control(&peer, self.connect_message()).await {
            return self.view;
        }

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                msg = inbox.recv() => {
                    let Some(msg) = msg else {
                        break;
                    };
                    if let Some(reply) = self.reply_for(&msg) {
                        if !hub.control(&peer, reply).await {
                            break;
                        }
                    }
                    self.apply(msg);
                }
            }
        }

        hub.detach(peer.conn_id()).await;
        self.view
    }
}
