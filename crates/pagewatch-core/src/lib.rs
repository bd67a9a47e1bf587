pub mod change;
pub mod matcher;
pub mod wire;

pub use change::{parse_change_event, ChangeEvent, ChangeParseError, EventKind, KindSet};
pub use matcher::{matches, DirPattern, InterestDefaults, InterestFilter, MatcherError, PathMatcher};
pub use wire::{
    decode_client_msg, decode_hub_msg, encode_msg, ClientMsg, FrameError, HubMsg, UpstreamState,
    MAX_CONTROL_FRAME_BYTES,
};
