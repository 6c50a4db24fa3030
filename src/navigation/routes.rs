use serde::Serialize;

use super::NavigationRef;

/// Path of the synthetic entry that matches anything.
pub const CATCH_ALL: &str = "*";

/// Page a route renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    Home,
    Skills,
    SkillCategory,
    Stories,
    Story,
    Games,
    Game,
    ParentGuide,
    SpeechTherapy,
    NotFound,
}

/// Shape of an absolute path a dispatch rule accepts
#[derive(Debug, Clone, Copy)]
pub enum PathPattern {
    /// The path itself and nothing else.
    Exact(&'static str),
    /// Exactly one segment below the root (`/skills/animals`).
    ChildOf(&'static str),
    /// The root or anything below it.
    Within(&'static str),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match *self {
            PathPattern::Exact(root) => path == root,
            PathPattern::ChildOf(root) => path
                .strip_prefix(root)
                .and_then(|rest| rest.strip_prefix('/'))
                .map_or(false, |rest| !rest.is_empty() && !rest.contains('/')),
            PathPattern::Within(root) => {
                path == root
                    || path
                        .strip_prefix(root)
                        .map_or(false, |rest| rest.starts_with('/'))
            }
        }
    }
}

/// View dispatch table, evaluated top to bottom; the first match wins and
/// unmatched paths render [`ViewKind::Home`].
pub const VIEW_RULES: &[(PathPattern, ViewKind)] = &[
    (PathPattern::Exact("/skills"), ViewKind::Skills),
    (PathPattern::ChildOf("/skills"), ViewKind::SkillCategory),
    (PathPattern::Exact("/stories"), ViewKind::Stories),
    (PathPattern::ChildOf("/stories"), ViewKind::Story),
    (PathPattern::Exact("/games"), ViewKind::Games),
    (PathPattern::ChildOf("/games"), ViewKind::Game),
    (PathPattern::Within("/parent-guide"), ViewKind::ParentGuide),
    (PathPattern::Within("/speech-therapy"), ViewKind::SpeechTherapy),
];

impl ViewKind {
    pub fn for_path(path: &str) -> ViewKind {
        VIEW_RULES
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, view)| *view)
            .unwrap_or(ViewKind::Home)
    }
}

/// One routable path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEntry {
    pub path: String,
    pub view: ViewKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NavigationRef>,
}

impl RouteEntry {
    pub fn is_catch_all(&self) -> bool {
        self.path == CATCH_ALL
    }
}

/// Flat route list compiled from a navigation tree.
///
/// Always starts with `/` and ends with the catch-all entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub(crate) fn from_entries(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, path: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    /// Entry that renders `path`: concrete entries first, in order, then the catch-all.
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        let path = normalize(path);

        self.entries
            .iter()
            .filter(|entry| !entry.is_catch_all())
            .find(|entry| entry.path == path)
            .or_else(|| self.entries.iter().find(|entry| entry.is_catch_all()))
    }
}

/// Drop a trailing slash so `/skills/` resolves like `/skills`.
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
