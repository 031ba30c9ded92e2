//! Client-Side Router
//!
//! Static route table with history-mode navigation.
//!
//! ## Features
//!
//! - **Nested routes**: pages are declared as children of a shared layout
//! - **Dynamic segments**: `:id` segments are exposed as route params
//! - **Hooks**: before-each hooks run on every navigation; the default one
//!   sets the document title from route metadata
//! - **Redirects**: the router is a [`Navigator`], so the request wrapper
//!   can send the user to the not-found page
//!
//! Route records are immutable after construction. Only the history stack
//! and the document title change, behind a `tokio` lock.

mod routes;

pub use routes::{app_router, app_routes, DEFAULT_APP_TITLE, DEFAULT_BASE};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::request::Navigator;

/// Page components a route can render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    BasicLayout,
    AccountManagement,
    Home,
    QuiltDiff,
    QuiltDiffDetails,
    ImageComparison,
    ImageComparisonCreate,
    ImageComparisonDetails,
    Help,
    NotFound,
}

impl Page {
    pub fn component_name(&self) -> &'static str {
        match self {
            Page::BasicLayout => "BasicLayout",
            Page::AccountManagement => "AccountManagement",
            Page::Home => "Home",
            Page::QuiltDiff => "QuiltDiff",
            Page::QuiltDiffDetails => "QuiltDiffDetails",
            Page::ImageComparison => "ImageComparison",
            Page::ImageComparisonCreate => "ImageComparisonCreate",
            Page::ImageComparisonDetails => "ImageComparisonDetails",
            Page::Help => "Help",
            Page::NotFound => "NotFound",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.component_name())
    }
}

/// Per-route metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    /// Document title while the route is active
    pub title: Option<String>,
    /// Menu entry to highlight while the route is active
    pub menu_index: Option<String>,
}

/// A route declaration, possibly with children
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: Option<String>,
    pub component: Page,
    pub meta: RouteMeta,
    pub children: Vec<RouteDescriptor>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, component: Page) -> Self {
        Self {
            path: path.into(),
            name: None,
            component,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }

    pub fn menu_index(mut self, menu_index: impl Into<String>) -> Self {
        self.meta.menu_index = Some(menu_index.into());
        self
    }

    pub fn children(mut self, children: Vec<RouteDescriptor>) -> Self {
        self.children = children;
        self
    }
}

/// A location matched against the route table
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Path without the history base or query
    pub path: String,
    /// Path plus query string
    pub full_path: String,
    pub name: Option<String>,
    /// Declared path, e.g. `/quiltdiff/details/:id`
    pub template: String,
    pub params: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub meta: RouteMeta,
    /// Components from the outermost layout to the page
    pub matched: Vec<Page>,
}

impl Route {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The innermost component
    pub fn page(&self) -> Option<Page> {
        self.matched.last().copied()
    }
}

/// Global document state touched by navigation hooks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub title: String,
}

/// Hook run before every navigation with the target and current routes
pub type BeforeEachHook = Box<dyn Fn(&Route, Option<&Route>, &mut Document) + Send + Sync>;

/// Router errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("Duplicate route name: {0}")]
    DuplicateName(String),

    #[error("No route matches {0}")]
    NoMatch(String),

    #[error("Unknown route name: {0}")]
    UnknownName(String),

    #[error("Missing param '{param}' for route {route}")]
    MissingParam { route: String, param: String },

    #[error("No previous location in history")]
    NoHistory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

#[derive(Debug)]
struct RouteRecord {
    template: String,
    segments: Vec<Segment>,
    name: Option<String>,
    meta: RouteMeta,
    matched: Vec<Page>,
}

impl RouteRecord {
    fn matches(&self, parts: &[&str]) -> Option<HashMap<String, String>> {
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(s) if s.eq_ignore_ascii_case(part) => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), decode(part));
                }
            }
        }
        Some(params)
    }
}

struct RouterState {
    history: Vec<Route>,
    document: Document,
}

/// History-mode router over a static route table
pub struct Router {
    records: Vec<RouteRecord>,
    base: String,
    hooks: Vec<BeforeEachHook>,
    state: RwLock<RouterState>,
}

impl Router {
    /// Build a router. Route names must be unique.
    ///
    /// A before-each hook that sets the document title from `meta.title`,
    /// falling back to `app_title`, is installed first.
    pub fn new(
        routes: Vec<RouteDescriptor>,
        base: &str,
        app_title: &str,
    ) -> Result<Self, RouterError> {
        let mut records = Vec::new();
        for route in &routes {
            flatten(route, "", &[], &mut records);
        }

        let mut names = HashSet::new();
        for name in records.iter().filter_map(|r| r.name.as_ref()) {
            if !names.insert(name.clone()) {
                return Err(RouterError::DuplicateName(name.clone()));
            }
        }

        let mut router = Self {
            records,
            base: normalize_base(base),
            hooks: Vec::new(),
            state: RwLock::new(RouterState {
                history: Vec::new(),
                document: Document {
                    title: app_title.to_string(),
                },
            }),
        };
        router.before_each(title_hook(app_title.to_string()));
        Ok(router)
    }

    /// Register a hook that runs before every navigation
    pub fn before_each(&mut self, hook: BeforeEachHook) {
        self.hooks.push(hook);
    }

    /// History base, without trailing slash (empty for `/`)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Declared routes as `(template, name, meta, matched components)`
    pub fn routes(&self) -> impl Iterator<Item = (&str, Option<&str>, &RouteMeta, &[Page])> {
        self.records.iter().map(|r| {
            (
                r.template.as_str(),
                r.name.as_deref(),
                &r.meta,
                r.matched.as_slice(),
            )
        })
    }

    /// Match a location (optionally prefixed by the base) against the table
    pub fn resolve(&self, location: &str) -> Result<Route, RouterError> {
        let location = location.split('#').next().unwrap_or_default();
        let (path, query) = match location.split_once('?') {
            Some((path, query)) => (path, query),
            None => (location, ""),
        };
        let path = self.strip_base(path);
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

        let (record, params) = self
            .records
            .iter()
            .find_map(|r| r.matches(&parts).map(|params| (r, params)))
            .ok_or_else(|| RouterError::NoMatch(location.to_string()))?;

        let path = format!("/{}", parts.join("/"));
        let full_path = if query.is_empty() {
            path.clone()
        } else {
            format!("{}?{}", path, query)
        };

        Ok(Route {
            path,
            full_path,
            name: record.name.clone(),
            template: record.template.clone(),
            params,
            query: parse_query(query),
            meta: record.meta.clone(),
            matched: record.matched.clone(),
        })
    }

    /// Build the path of a named route, filling in its params
    pub fn location_for(
        &self,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<String, RouterError> {
        let record = self
            .records
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
            .ok_or_else(|| RouterError::UnknownName(name.to_string()))?;

        let mut parts = Vec::with_capacity(record.segments.len());
        for segment in &record.segments {
            match segment {
                Segment::Static(s) => parts.push(s.clone()),
                Segment::Param(p) => {
                    let value = params.get(p).ok_or_else(|| RouterError::MissingParam {
                        route: name.to_string(),
                        param: p.clone(),
                    })?;
                    parts.push(urlencoding::encode(value).into_owned());
                }
            }
        }
        Ok(format!("/{}", parts.join("/")))
    }

    /// Browser URL path for a route, including the base
    pub fn href(&self, route: &Route) -> String {
        format!("{}{}", self.base, route.full_path)
    }

    /// Navigate to `location`, adding a history entry
    pub async fn push(&self, location: &str) -> Result<Route, RouterError> {
        let to = self.resolve(location)?;
        let mut state = self.state.write().await;
        self.run_hooks(&to, &mut state);
        state.history.push(to.clone());
        tracing::debug!("Navigated to {}", to.full_path);
        Ok(to)
    }

    /// Navigate to `location`, replacing the current history entry
    pub async fn replace(&self, location: &str) -> Result<Route, RouterError> {
        let to = self.resolve(location)?;
        let mut state = self.state.write().await;
        self.run_hooks(&to, &mut state);
        state.history.pop();
        state.history.push(to.clone());
        tracing::debug!("Replaced location with {}", to.full_path);
        Ok(to)
    }

    /// Go back one history entry
    pub async fn back(&self) -> Result<Route, RouterError> {
        let mut state = self.state.write().await;
        if state.history.len() < 2 {
            return Err(RouterError::NoHistory);
        }

        let to = state.history[state.history.len() - 2].clone();
        self.run_hooks(&to, &mut state);
        state.history.pop();
        Ok(to)
    }

    pub async fn current(&self) -> Option<Route> {
        self.state.read().await.history.last().cloned()
    }

    pub async fn history_len(&self) -> usize {
        self.state.read().await.history.len()
    }

    pub async fn document_title(&self) -> String {
        self.state.read().await.document.title.clone()
    }

    fn run_hooks(&self, to: &Route, state: &mut RouterState) {
        let RouterState { history, document } = state;
        let from = history.last();
        for hook in &self.hooks {
            hook(to, from, document);
        }
    }

    fn strip_base<'a>(&self, path: &'a str) -> &'a str {
        if self.base.is_empty() {
            return path;
        }
        match path.strip_prefix(self.base.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    }
}

#[async_trait]
impl Navigator for Router {
    async fn redirect(&self, location: &str) {
        if let Err(e) = self.replace(location).await {
            tracing::warn!("Redirect to {} failed: {}", location, e);
        }
    }
}

fn title_hook(app_title: String) -> BeforeEachHook {
    Box::new(move |to, _from, document| {
        document.title = to
            .meta
            .title
            .clone()
            .unwrap_or_else(|| app_title.clone());
    })
}

fn flatten(route: &RouteDescriptor, parent: &str, chain: &[Page], out: &mut Vec<RouteRecord>) {
    let template = join_paths(parent, &route.path);
    let mut matched = chain.to_vec();
    matched.push(route.component);

    if route.children.is_empty() {
        out.push(RouteRecord {
            segments: parse_segments(&template),
            template,
            name: route.name.clone(),
            meta: route.meta.clone(),
            matched,
        });
    } else {
        for child in &route.children {
            flatten(child, &template, &matched, out);
        }
    }
}

fn join_paths(parent: &str, child: &str) -> String {
    let joined = if child.starts_with('/') {
        child.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), child)
    };
    let parts: Vec<&str> = joined.split('/').filter(|p| !p.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

fn parse_segments(template: &str) -> Vec<Segment> {
    template
        .split('/')
        .filter(|p| !p.is_empty())
        .map(|p| match p.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Static(p.to_string()),
        })
        .collect()
}

fn normalize_base(base: &str) -> String {
    let trimmed = base.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| s.to_string())
}
