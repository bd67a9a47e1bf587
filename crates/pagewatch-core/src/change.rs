use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of file-system change reported by the upstream event stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

pub type KindSet = BTreeSet<EventKind>;

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Create,
        EventKind::Write,
        EventKind::Remove,
        EventKind::Rename,
        EventKind::Chmod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Write => "write",
            EventKind::Remove => "remove",
            EventKind::Rename => "rename",
            EventKind::Chmod => "chmod",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "create" => Ok(EventKind::Create),
            "write" => Ok(EventKind::Write),
            "remove" => Ok(EventKind::Remove),
            "rename" => Ok(EventKind::Rename),
            "chmod" => Ok(EventKind::Chmod),
            other => Err(format!("Unknown event kind: {other}")),
        }
    }
}

/// Collects kind names into a set, skipping names this build does not know.
pub fn kinds_from_names<I, S>(names: I) -> KindSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| name.as_ref().parse::<EventKind>().ok())
        .collect()
}

pub fn kind_names(kinds: &KindSet) -> Vec<&'static str> {
    kinds.iter().map(EventKind::as_str).collect()
}

/// One change notification as published by the dev server's event stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: String,
    #[serde(rename = "type", deserialize_with = "deserialize_kinds")]
    pub kinds: KindSet,
}

impl ChangeEvent {
    pub fn new<I>(path: impl Into<String>, kinds: I) -> Self
    where
        I: IntoIterator<Item = EventKind>,
    {
        Self {
            path: path.into(),
            kinds: kinds.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeParseError {
    #[error("change event decode failed: {0}")]
    Decode(String),
    #[error("change event has an empty path")]
    EmptyPath,
}

/// Parses one upstream frame payload.
///
/// Blank payloads are keepalives and yield `Ok(None)`.
pub fn parse_change_event(raw: &str) -> Result<Option<ChangeEvent>, ChangeParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let event: ChangeEvent =
        serde_json::from_str(trimmed).map_err(|err| ChangeParseError::Decode(err.to_string()))?;
    if event.path.is_empty() {
        return Err(ChangeParseError::EmptyPath);
    }
    Ok(Some(event))
}

fn deserialize_kinds<'de, D>(deserializer: D) -> Result<KindSet, D::Error>
where
    D: Deserializer<'de>,
{
    let names: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(names.map(kinds_from_names).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upstream_record() {
        let event = parse_change_event(r#"{"path":"/docs/a.md","type":["write","create"]}"#)
            .expect("parse")
            .expect("event");
        assert_eq!(event.path, "/docs/a.md");
        assert_eq!(
            event.kinds,
            KindSet::from([EventKind::Create, EventKind::Write])
        );
    }

    #[test]
    fn blank_payload_is_keepalive() {
        assert_eq!(parse_change_event(""), Ok(None));
        assert_eq!(parse_change_event("  \n"), Ok(None));
    }

    #[test]
    fn null_type_list_yields_empty_kinds() {
        let event = parse_change_event(r#"{"path":"/a.html","type":null}"#)
            .expect("parse")
            .expect("event");
        assert!(event.kinds.is_empty());
    }

    #[test]
    fn unknown_kind_names_are_skipped() {
        let event = parse_change_event(r#"{"path":"/a.html","type":["write","touch"]}"#)
            .expect("parse")
            .expect("event");
        assert_eq!(event.kinds, KindSet::from([EventKind::Write]));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(matches!(
            parse_change_event("{\"path\":"),
            Err(ChangeParseError::Decode(_))
        ));
        assert!(matches!(
            parse_change_event(r#"{"type":["write"]}"#),
            Err(ChangeParseError::Decode(_))
        ));
        assert_eq!(
            parse_change_event(r#"{"path":"","type":["write"]}"#),
            Err(ChangeParseError::EmptyPath)
        );
    }

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!("WRITE".parse::<EventKind>(), Ok(EventKind::Write));
        assert_eq!(" rename ".parse::<EventKind>(), Ok(EventKind::Rename));
        assert!("touch".parse::<EventKind>().is_err());
    }

    #[test]
    fn serializes_kinds_under_type_key() {
        let event = ChangeEvent::new("/a.html", [EventKind::Write]);
        let json = serde_json::to_value(&event).expect("encode");
        assert_eq!(json, serde_json::json!({"path": "/a.html", "type": ["write"]}));
    }
}
