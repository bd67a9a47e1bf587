pub mod config;
pub mod coordinator;
pub mod logging;
pub mod registry;
pub mod tab;
pub mod upstream;
pub mod ws;

pub use coordinator::{spawn_hub, HubHandle, HubPhase, HubSettings, HubStats};
pub use tab::{StatusStyle, TabClient, TabView};
pub use upstream::{SseTransport, UpstreamSignal, UpstreamTransport};
