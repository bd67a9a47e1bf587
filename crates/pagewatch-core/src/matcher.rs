//! Interest filters and the pure matching function used for fan-out.

use crate::change::{ChangeEvent, EventKind, KindSet};
use regex::Regex;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatcherError {
    #[error("path must be absolute: {0}")]
    RelativePath(String),
    #[error("invalid directory pattern for {root}: {reason}")]
    InvalidPattern { root: String, reason: String },
}

/// Matches paths that sit directly under one directory root.
#[derive(Debug, Clone)]
pub struct DirPattern {
    root: String,
    regex: Regex,
}

impl DirPattern {
    pub fn new(root: &str) -> Result<Self, MatcherError> {
        if !root.starts_with('/') {
            return Err(MatcherError::RelativePath(root.to_string()));
        }
        let root = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{root}/")
        };
        let regex = Regex::new(&format!("^{}[^/]+$", regex::escape(&root))).map_err(|err| {
            MatcherError::InvalidPattern {
                root: root.clone(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self { root, regex })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl PartialEq for DirPattern {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for DirPattern {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(String),
    Pattern(DirPattern),
}

impl PathMatcher {
    /// Picks the matcher for a page path: a trailing `/` marks a directory view.
    pub fn from_page_path(path: &str) -> Result<Self, MatcherError> {
        if !path.starts_with('/') {
            return Err(MatcherError::RelativePath(path.to_string()));
        }
        if path.ends_with('/') {
            Ok(PathMatcher::Pattern(DirPattern::new(path)?))
        } else {
            Ok(PathMatcher::Exact(path.to_string()))
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, PathMatcher::Pattern(_))
    }

    /// The wire form: the exact path, or the directory root with its trailing `/`.
    pub fn as_str(&self) -> &str {
        match self {
            PathMatcher::Exact(path) => path,
            PathMatcher::Pattern(pattern) => pattern.root(),
        }
    }

    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(expected) => expected == path,
            PathMatcher::Pattern(pattern) => pattern.is_match(path),
        }
    }
}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestFilter {
    pub matcher: PathMatcher,
    pub kinds: KindSet,
}

impl InterestFilter {
    pub fn new(matcher: PathMatcher, kinds: KindSet) -> Self {
        Self { matcher, kinds }
    }
}

/// Both the path test and the kind intersection must hold.
pub fn matches(filter: &InterestFilter, event: &ChangeEvent) -> bool {
    filter.matcher.matches_path(&event.path) && kinds_intersect(&filter.kinds, &event.kinds)
}

pub fn kinds_intersect(wanted: &KindSet, actual: &KindSet) -> bool {
    wanted.intersection(actual).next().is_some()
}

/// Interest kinds a tab declares, depending on whether it views a directory or a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestDefaults {
    pub directory: KindSet,
    pub file: KindSet,
}

impl Default for InterestDefaults {
    fn default() -> Self {
        Self {
            directory: KindSet::from([
                EventKind::Create,
                EventKind::Write,
                EventKind::Remove,
                EventKind::Rename,
            ]),
            file: KindSet::from([EventKind::Write, EventKind::Create]),
        }
    }
}

impl InterestDefaults {
    pub fn filter_for_page(&self, page_path: &str) -> Result<InterestFilter, MatcherError> {
        let matcher = PathMatcher::from_page_path(page_path)?;
        let kinds = if matcher.is_directory() {
            self.directory.clone()
        } else {
            self.file.clone()
        };
        Ok(InterestFilter::new(matcher, kinds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(path: &str, kinds: &[EventKind]) -> InterestFilter {
        InterestFilter::new(
            PathMatcher::Exact(path.to_string()),
            kinds.iter().copied().collect(),
        )
    }

    fn dir(root: &str, kinds: &[EventKind]) -> InterestFilter {
        InterestFilter::new(
            PathMatcher::Pattern(DirPattern::new(root).expect("pattern")),
            kinds.iter().copied().collect(),
        )
    }

    #[test]
    fn directory_pattern_matches_direct_children_only() {
        let filter = dir("/docs/", &[EventKind::Write]);
        let hit = |path: &str| matches(&filter, &ChangeEvent::new(path, [EventKind::Write]));
        assert!(hit("/docs/a.md"));
        assert!(!hit("/docs/sub/a.md"));
        assert!(!hit("/other/a.md"));
        assert!(!hit("/docs/"));
        assert!(!hit("/docsx/a.md"));
    }

    #[test]
    fn directory_root_gets_trailing_separator() {
        let pattern = DirPattern::new("/docs").expect("pattern");
        assert_eq!(pattern.root(), "/docs/");
        assert!(pattern.is_match("/docs/a.md"));
    }

    #[test]
    fn pattern_root_is_escaped() {
        let pattern = DirPattern::new("/a.b/").expect("pattern");
        assert!(pattern.is_match("/a.b/c"));
        assert!(!pattern.is_match("/axb/c"));
    }

    #[test]
    fn site_root_pattern() {
        let filter = dir("/", &[EventKind::Create]);
        assert!(matches(
            &filter,
            &ChangeEvent::new("/index.md", [EventKind::Create])
        ));
        assert!(!matches(
            &filter,
            &ChangeEvent::new("/docs/index.md", [EventKind::Create])
        ));
    }

    #[test]
    fn exact_matches_only_same_path() {
        let filter = exact("/docs/a.md", &[EventKind::Write]);
        assert!(matches(
            &filter,
            &ChangeEvent::new("/docs/a.md", [EventKind::Write])
        ));
        assert!(!matches(
            &filter,
            &ChangeEvent::new("/docs/a.mdx", [EventKind::Write])
        ));
        assert!(!matches(
            &filter,
            &ChangeEvent::new("/docs/", [EventKind::Write])
        ));
    }

    #[test]
    fn path_only_or_kind_only_is_not_a_match() {
        let filter = exact("/a.html", &[EventKind::Write]);
        assert!(!matches(
            &filter,
            &ChangeEvent::new("/a.html", [EventKind::Remove])
        ));
        assert!(!matches(
            &filter,
            &ChangeEvent::new("/b.html", [EventKind::Write])
        ));
    }

    #[test]
    fn empty_kind_sets_never_match() {
        let filter = exact("/a.html", &[]);
        assert!(!matches(
            &filter,
            &ChangeEvent::new("/a.html", [EventKind::Write])
        ));
        let filter = exact("/a.html", &[EventKind::Write]);
        assert!(!matches(&filter, &ChangeEvent::new("/a.html", [])));
    }

    #[test]
    fn any_shared_kind_is_enough() {
        let filter = exact("/a.html", &[EventKind::Write, EventKind::Create]);
        let event = ChangeEvent::new("/a.html", [EventKind::Chmod, EventKind::Create]);
        assert!(matches(&filter, &event));
    }

    #[test]
    fn page_defaults_pick_matcher_and_kinds() {
        let defaults = InterestDefaults::default();

        let file = defaults.filter_for_page("/a.html").expect("file filter");
        assert_eq!(file.matcher, PathMatcher::Exact("/a.html".to_string()));
        assert_eq!(file.kinds, defaults.file);

        let listing = defaults.filter_for_page("/docs/").expect("dir filter");
        assert!(listing.matcher.is_directory());
        assert_eq!(listing.matcher.as_str(), "/docs/");
        assert_eq!(listing.kinds.len(), 4);
        assert!(!listing.kinds.contains(&EventKind::Chmod));
    }

    #[test]
    fn relative_paths_are_rejected() {
        assert!(matches!(
            PathMatcher::from_page_path("docs/a.md"),
            Err(MatcherError::RelativePath(_))
        ));
        assert!(DirPattern::new("docs/").is_err());
    }
}
