//! Navigation tree loading and compilation.
//!
//! The navigation configuration is a tree of sections. Each node stores only
//! its own route segment; a node's absolute path is the concatenation of the
//! segments from the root down to it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::store::ContentStore;

pub mod routes;

pub use routes::{PathPattern, RouteEntry, RouteTable, ViewKind, CATCH_ALL, VIEW_RULES};

/// A section of the navigation tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationNode {
    pub id: String,
    /// Own path segment, e.g. `/animals`.
    pub route: String,
    pub label_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub children: Vec<NavigationNode>,
}

/// Shape of the navigation configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default)]
    pub main: Vec<NavigationNode>,
}

/// A node as seen from a route or breadcrumb: its metadata plus absolute path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRef {
    pub id: String,
    pub path: String,
    pub label_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
}

impl NavigationRef {
    fn new(node: &NavigationNode, path: &str) -> Self {
        Self {
            id: node.id.clone(),
            path: path.to_string(),
            label_key: node.label_key.clone(),
            icon: node.icon.clone(),
            cover_image: node.cover_image.clone(),
        }
    }
}

/// Absolute path of a child segment under `parent`.
pub fn full_path(parent: &str, route: &str) -> String {
    if route.is_empty() {
        return parent.to_string();
    }
    if route.starts_with('/') {
        format!("{}{}", parent.trim_end_matches('/'), route)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), route)
    }
}

/// Read-only navigation tree
#[derive(Debug, Clone)]
pub struct NavigationTree {
    main: Arc<[NavigationNode]>,
}

impl Default for NavigationTree {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl NavigationTree {
    pub fn new(main: Vec<NavigationNode>) -> Self {
        Self { main: main.into() }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: NavigationConfig = serde_json::from_str(raw)
            .map_err(|e| AppError::InvariantViolation(format!("Malformed navigation config: {}", e)))?;
        Ok(Self::new(config.main))
    }

    /// Top-level sections. The returned slice is shared, not copied.
    pub fn structure(&self) -> Arc<[NavigationNode]> {
        self.main.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    /// Ids that occur more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<String> {
        fn walk(nodes: &[NavigationNode], seen: &mut HashSet<String>, duplicates: &mut Vec<String>) {
            for node in nodes {
                if !seen.insert(node.id.clone()) && !duplicates.contains(&node.id) {
                    duplicates.push(node.id.clone());
                }
                walk(&node.children, seen, duplicates);
            }
        }

        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        walk(&self.main, &mut seen, &mut duplicates);
        duplicates
    }

    /// Depth-first search for the first node with `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&NavigationNode> {
        fn search<'a>(nodes: &'a [NavigationNode], id: &str) -> Option<&'a NavigationNode> {
            for node in nodes {
                if node.id == id {
                    return Some(node);
                }
                if let Some(found) = search(&node.children, id) {
                    return Some(found);
                }
            }
            None
        }

        search(&self.main, id)
    }

    /// Flatten the tree into routes: `/` first, every node in depth-first
    /// order, then the catch-all.
    pub fn generate_routes(&self) -> RouteTable {
        let mut entries = vec![RouteEntry {
            path: "/".to_string(),
            view: ViewKind::Home,
            node: None,
        }];

        collect_routes(&self.main, "", &mut entries);

        entries.push(RouteEntry {
            path: CATCH_ALL.to_string(),
            view: ViewKind::NotFound,
            node: None,
        });

        RouteTable::from_entries(entries)
    }

    /// Trail of nodes from the root to the node whose absolute path is `path`.
    ///
    /// A subtree is entered only when `path` starts with the node's absolute
    /// path. Empty when nothing matches.
    pub fn breadcrumbs(&self, path: &str) -> Vec<NavigationRef> {
        let mut trail = Vec::new();
        if collect_trail(&self.main, path, "", &mut trail) {
            trail
        } else {
            Vec::new()
        }
    }
}

fn collect_routes(nodes: &[NavigationNode], parent_path: &str, entries: &mut Vec<RouteEntry>) {
    for node in nodes {
        let path = full_path(parent_path, &node.route);
        entries.push(RouteEntry {
            view: ViewKind::for_path(&path),
            node: Some(NavigationRef::new(node, &path)),
            path: path.clone(),
        });
        collect_routes(&node.children, &path, entries);
    }
}

fn collect_trail(
    nodes: &[NavigationNode],
    target: &str,
    parent_path: &str,
    trail: &mut Vec<NavigationRef>,
) -> bool {
    for node in nodes {
        let path = full_path(parent_path, &node.route);
        trail.push(NavigationRef::new(node, &path));

        if path == target {
            return true;
        }

        if !node.children.is_empty()
            && target.starts_with(&path)
            && collect_trail(&node.children, target, &path, trail)
        {
            return true;
        }

        trail.pop();
    }
    false
}

/// Lifecycle of the navigation tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
}

/// Loads the navigation configuration once and answers routing queries.
///
/// One instance is meant to live for the whole process. The first query
/// triggers the load; queries arriving while it is in flight wait for the
/// same result. A failed load settles on an empty tree instead of failing
/// callers.
pub struct NavigationCompiler {
    store: Option<Arc<dyn ContentStore>>,
    config_path: String,
    tree: OnceCell<Arc<NavigationTree>>,
    load_started: AtomicBool,
}

impl NavigationCompiler {
    pub fn new(store: Arc<dyn ContentStore>, config_path: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            config_path: config_path.into(),
            tree: OnceCell::new(),
            load_started: AtomicBool::new(false),
        }
    }

    /// A compiler that is already `Ready` with `tree`.
    pub fn from_tree(tree: NavigationTree) -> Self {
        Self {
            store: None,
            config_path: String::new(),
            tree: OnceCell::new_with(Some(Arc::new(tree))),
            load_started: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> LoadState {
        if self.tree.initialized() {
            LoadState::Ready
        } else if self.load_started.load(Ordering::SeqCst) {
            LoadState::Loading
        } else {
            LoadState::Unloaded
        }
    }

    /// The loaded tree, loading it on first use.
    pub async fn tree(&self) -> Arc<NavigationTree> {
        self.tree.get_or_init(|| self.load()).await.clone()
    }

    pub async fn generate_routes(&self) -> RouteTable {
        self.tree().await.generate_routes()
    }

    /// Top-level sections for building menus
    pub async fn get_navigation_structure(&self) -> Arc<[NavigationNode]> {
        self.tree().await.structure()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<NavigationNode> {
        self.tree().await.find_by_id(id).cloned()
    }

    pub async fn get_breadcrumbs(&self, path: &str) -> Vec<NavigationRef> {
        self.tree().await.breadcrumbs(path)
    }

    async fn load(&self) -> Arc<NavigationTree> {
        self.load_started.store(true, Ordering::SeqCst);

        let Some(store) = &self.store else {
            return Arc::new(NavigationTree::default());
        };

        debug!("Loading navigation config from {}", self.config_path);
        let tree = match store.fetch(&self.config_path).await {
            Ok(raw) => match NavigationTree::parse(&raw) {
                Ok(tree) => tree,
                Err(e) => {
                    error!("Failed to load navigation config: {}", e);
                    NavigationTree::default()
                }
            },
            Err(e) => {
                error!("Failed to load navigation config {}: {}", self.config_path, e);
                NavigationTree::default()
            }
        };

        let duplicates = tree.duplicate_ids();
        if !duplicates.is_empty() {
            warn!(
                "Navigation config has duplicate ids, lookups use the first occurrence: {}",
                duplicates.join(", ")
            );
        }

        info!("Navigation ready with {} top-level sections", tree.structure().len());
        Arc::new(tree)
    }
}
