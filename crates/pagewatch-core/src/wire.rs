//! Hub <-> tab messages. Every message is a JSON array whose first element is the tag:
//!
//! - tab to hub: `["connect", path, kinds]`, `["pong"]`
//! - hub to tab: `["ping", true | false | null]`, `["notify", path, kinds]`

use crate::change::{kind_names, kinds_from_names, KindSet};
use crate::matcher::{InterestFilter, PathMatcher};
use serde::de::{self, DeserializeOwned, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

pub const MAX_CONTROL_FRAME_BYTES: usize = 16 * 1024;

const CLIENT_TAGS: &[&str] = &["connect", "pong"];
const HUB_TAGS: &[&str] = &["ping", "notify"];

/// Connectivity of the single upstream event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamState {
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

impl UpstreamState {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            UpstreamState::Unknown => None,
            UpstreamState::Connected => Some(true),
            UpstreamState::Disconnected => Some(false),
        }
    }

    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => UpstreamState::Unknown,
            Some(true) => UpstreamState::Connected,
            Some(false) => UpstreamState::Disconnected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamState::Unknown => "unknown",
            UpstreamState::Connected => "connected",
            UpstreamState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for UpstreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UpstreamState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_flag().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UpstreamState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<bool>::deserialize(deserializer).map(UpstreamState::from_flag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMsg {
    Connect(InterestFilter),
    Pong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubMsg {
    Ping(UpstreamState),
    Notify { path: String, kinds: KindSet },
}

impl Serialize for ClientMsg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ClientMsg::Connect(filter) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element("connect")?;
                seq.serialize_element(filter.matcher.as_str())?;
                seq.serialize_element(&kind_names(&filter.kinds))?;
                seq.end()
            }
            ClientMsg::Pong => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element("pong")?;
                seq.end()
            }
        }
    }
}

impl Serialize for HubMsg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            HubMsg::Ping(state) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element("ping")?;
                seq.serialize_element(state)?;
                seq.end()
            }
            HubMsg::Notify { path, kinds } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element("notify")?;
                seq.serialize_element(path)?;
                seq.serialize_element(&kind_names(kinds))?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ClientMsg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ClientMsgVisitor;

        impl<'de> Visitor<'de> for ClientMsgVisitor {
            type Value = ClientMsg;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a tagged client message array")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let tag: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let msg = match tag.as_str() {
                    "connect" => {
                        let path: String = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                        let kinds: Vec<String> = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                        let matcher = PathMatcher::from_page_path(&path)
                            .map_err(<A::Error as de::Error>::custom)?;
                        ClientMsg::Connect(InterestFilter::new(matcher, kinds_from_names(kinds)))
                    }
                    "pong" => ClientMsg::Pong,
                    other => return Err(de::Error::unknown_variant(other, CLIENT_TAGS)),
                };
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(msg)
            }
        }

        deserializer.deserialize_seq(ClientMsgVisitor)
    }
}

impl<'de> Deserialize<'de> for HubMsg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HubMsgVisitor;

        impl<'de> Visitor<'de> for HubMsgVisitor {
            type Value = HubMsg;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a tagged hub message array")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let tag: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let msg = match tag.as_str() {
                    "ping" => {
                        let flag: Option<Option<bool>> = seq.next_element()?;
                        HubMsg::Ping(UpstreamState::from_flag(flag.flatten()))
                    }
                    "notify" => {
                        let path: String = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                        let kinds: Vec<String> = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                        HubMsg::Notify {
                            path,
                            kinds: kinds_from_names(kinds),
                        }
                    }
                    other => return Err(de::Error::unknown_variant(other, HUB_TAGS)),
                };
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(msg)
            }
        }

        deserializer.deserialize_seq(HubMsgVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame exceeds max size: {size} > {max}")]
    OversizedFrame { size: usize, max: usize },
    #[error("frame encode failed: {0}")]
    Encode(String),
    #[error("frame decode failed: {0}")]
    Decode(String),
}

pub fn encode_msg<T: Serialize>(msg: &T) -> Result<String, FrameError> {
    serde_json::to_string(msg).map_err(|err| FrameError::Encode(err.to_string()))
}

pub fn decode_client_msg(raw: &str) -> Result<ClientMsg, FrameError> {
    decode_frame(raw)
}

pub fn decode_hub_msg(raw: &str) -> Result<HubMsg, FrameError> {
    decode_frame(raw)
}

fn decode_frame<T: DeserializeOwned>(raw: &str) -> Result<T, FrameError> {
    if raw.len() > MAX_CONTROL_FRAME_BYTES {
        return Err(FrameError::OversizedFrame {
            size: raw.len(),
            max: MAX_CONTROL_FRAME_BYTES,
        });
    }
    serde_json::from_str(raw.trim()).map_err(|err| FrameError::Decode(err.to_string()))
}
