//! Route extraction from Go call expressions.
//!
//! Route registrations look alike across Go web frameworks: a method call on a router
//! value whose first argument is a path literal and whose second argument is the
//! handler. Each idiom is implemented as a [`RouteMatcher`]; the
//! [`RouteCallRecognizer`] tries them in order on every call expression of a file.
//!
//! # Supported idioms
//!
//! - **gorilla/mux**: `r.HandleFunc(path, h).Methods("GET", "POST")`, see [`mux`]
//! - **net/http**: `mux.HandleFunc(path, h)` and `mux.Handle(path, h)`, see [`mux`]
//! - **chi, echo, gin, fiber**: `r.Get(path, h)`, `e.POST(path, h)`, ..., see [`verb`]
//! - **GraphQL**: `r.POST("/graphql", h)`, see [`verb`]
//!
//! # Example
//!
//! ```no_run
//! use postman_from_source::body_detector::HandlerBodies;
//! use postman_from_source::extractor::RouteCallRecognizer;
//! use postman_from_source::parser::GoParser;
//! use std::path::Path;
//!
//! let parsed = GoParser::parse_file(Path::new("cmd/api/routes.go")).unwrap();
//! let recognizer = RouteCallRecognizer::new();
//! let endpoints = recognizer.recognize(&parsed, &HandlerBodies::default());
//! println!("Found {} endpoints", endpoints.len());
//! ```

pub mod mux;
pub mod verb;

use crate::body_detector::HandlerBodies;
use crate::parser::{named_children, nodes_of_kind, string_literal_value, ParsedFile};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;
use tree_sitter::Node;

/// HTTP verbs a route can be registered for.
pub const VERBS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Method of routes that accept any verb.
pub const ANY_METHOD: &str = "ANY";

/// Paths that are really header names picked up from `Header.Get("/...")`-like calls.
const HEADER_LIKE_PATHS: &[&str] = &[
    "/X-Request-ID",
    "/Content-Type",
    "/Authorization",
    "/Accept",
    "/User-Agent",
];

/// Whether an endpoint is a plain HTTP route or a GraphQL entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EndpointKind {
    #[default]
    Rest,
    GraphQl,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EndpointKind::Rest => f.write_str("REST"),
            EndpointKind::GraphQl => f.write_str("GraphQL"),
        }
    }
}

/// GraphQL details of an endpoint; empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphQlInfo {
    /// `query`, `mutation` or `subscription`
    pub operation: String,
    pub schema: String,
    pub query: String,
    pub variables: String,
}

/// A single discovered API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Upper-case verb from [`VERBS`] or [`ANY_METHOD`]
    pub method: String,
    /// Route path, always starting with `/`
    pub path: String,
    /// File the endpoint was discovered in
    pub source_file: String,
    pub handler: Option<String>,
    pub description: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Raw single-line JSON example
    pub body: Option<String>,
    /// Insertion-ordered, without duplicates
    pub tags: Vec<String>,
    pub kind: EndpointKind,
    pub graphql: Option<GraphQlInfo>,
}

impl Endpoint {
    /// Create a REST endpoint with no metadata
    pub fn new(method: impl Into<String>, path: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            source_file: source_file.into(),
            handler: None,
            description: None,
            headers: BTreeMap::new(),
            body: None,
            tags: Vec::new(),
            kind: EndpointKind::Rest,
            graphql: None,
        }
    }

    /// Create a GraphQL endpoint for the given operation
    pub fn graphql(
        path: impl Into<String>,
        source_file: impl Into<String>,
        info: GraphQlInfo,
    ) -> Self {
        Self {
            kind: EndpointKind::GraphQl,
            graphql: Some(info),
            ..Self::new("POST", path, source_file)
        }
    }

    pub fn with_handler(mut self, handler: Option<String>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body.filter(|b| !b.is_empty());
        self
    }
}

/// Case-insensitive membership in [`VERBS`].
pub fn is_verb(name: &str) -> bool {
    VERBS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Upper-cases a method and maps anything outside [`VERBS`] to [`ANY_METHOD`].
pub fn normalize_method(method: &str) -> String {
    let upper = method.trim().to_uppercase();
    if VERBS.contains(&upper.as_str()) {
        upper
    } else {
        ANY_METHOD.to_string()
    }
}

/// Methods that conventionally carry a request body.
pub fn method_takes_body(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH")
}

/// Checks that a string literal is plausibly a route path.
///
/// Rejects empty and relative strings, header names mistaken for paths, and paths with
/// fewer than two characters after the slash.
pub fn is_valid_endpoint_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };

    if HEADER_LIKE_PATHS
        .iter()
        .any(|header| header.eq_ignore_ascii_case(path))
    {
        return false;
    }

    if !rest.contains('/') && rest.contains('-') && is_title_case(rest) {
        return false;
    }

    rest.len() >= 2
}

/// True when every word starts with a non-lower-case letter.
///
/// Words are separated by anything other than letters, digits and `_`.
fn is_title_case(text: &str) -> bool {
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start && c.is_lowercase() {
            return false;
        }
        at_word_start = is_word_separator(c);
    }
    true
}

fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}

/// A method call `receiver.method(args...)` found in the syntax tree.
pub struct CallSite<'t> {
    /// The `call_expression` node
    pub node: Node<'t>,
    pub receiver: Node<'t>,
    pub method: String,
    pub args: Vec<Node<'t>>,
}

impl<'t> CallSite<'t> {
    /// Returns `None` unless `node` is a call through a selector.
    pub fn from_node(file: &ParsedFile, node: Node<'t>) -> Option<Self> {
        if node.kind() != "call_expression" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        if function.kind() != "selector_expression" {
            return None;
        }
        let receiver = function.child_by_field_name("operand")?;
        let method = file.text(function.child_by_field_name("field")?).to_string();
        let args = node
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();

        Some(Self {
            node,
            receiver,
            method,
            args,
        })
    }

    /// The first argument, when it is a string literal holding a valid route path.
    pub fn route_path(&self, file: &ParsedFile) -> Option<String> {
        let first = self.args.first()?;
        string_literal_value(file, *first).filter(|p| is_valid_endpoint_path(p))
    }

    /// Handler name from the second argument: `handler` or `pkg.Handler`.
    pub fn handler_name(&self, file: &ParsedFile) -> Option<String> {
        let second = self.args.get(1)?;
        match second.kind() {
            "identifier" => Some(file.text(*second).to_string()),
            "selector_expression" => second
                .child_by_field_name("field")
                .map(|f| file.text(f).to_string()),
            _ => None,
        }
    }

    /// Upper-cased verb literals among the arguments, as in `.Methods("GET", "post")`.
    pub fn verb_args(&self, file: &ParsedFile) -> Vec<String> {
        self.args
            .iter()
            .filter_map(|arg| string_literal_value(file, *arg))
            .map(|s| s.trim().to_uppercase())
            .filter(|s| VERBS.contains(&s.as_str()))
            .collect()
    }
}

/// Inputs shared by all matchers while recognizing one file.
pub struct MatchContext<'a> {
    pub file: &'a ParsedFile,
    pub bodies: &'a HandlerBodies,
    pub source_file: String,
}

impl MatchContext<'_> {
    /// Example body of the handler, if it consumes one.
    pub fn body_for(&self, handler: Option<&str>) -> Option<String> {
        handler
            .and_then(|h| self.bodies.get(h))
            .map(str::to_string)
    }
}

/// One route registration idiom.
pub trait RouteMatcher {
    /// Short name used in debug logs.
    fn name(&self) -> &'static str;

    /// Returns the endpoints registered by `call`, or `None` if the idiom does not apply.
    ///
    /// `Some(vec![])` consumes the call without producing endpoints, which stops later
    /// matchers from seeing it.
    fn try_match(&self, call: &CallSite, ctx: &MatchContext) -> Option<Vec<Endpoint>>;
}

/// Applies an ordered list of [`RouteMatcher`]s to every call expression of a file.
pub struct RouteCallRecognizer {
    matchers: Vec<Box<dyn RouteMatcher>>,
}

impl Default for RouteCallRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteCallRecognizer {
    /// Creates a recognizer with the built-in matchers in precedence order.
    pub fn new() -> Self {
        Self {
            matchers: vec![
                Box::new(mux::ChainedMethodsMatcher),
                Box::new(mux::HandleFuncMatcher),
                Box::new(verb::GraphQlMatcher),
                Box::new(verb::VerbMatcher),
            ],
        }
    }

    /// Creates a recognizer with a custom matcher list.
    pub fn with_matchers(matchers: Vec<Box<dyn RouteMatcher>>) -> Self {
        Self { matchers }
    }

    /// Recognizes route registrations in `file`, in syntax order.
    ///
    /// # Arguments
    ///
    /// * `file` - The parsed Go file
    /// * `bodies` - Example bodies of handlers that consume one
    ///
    /// # Returns
    ///
    /// Returns the endpoints produced by every consumed call, outer calls first.
    pub fn recognize(&self, file: &ParsedFile, bodies: &HandlerBodies) -> Vec<Endpoint> {
        let ctx = MatchContext {
            file,
            bodies,
            source_file: file.display_path(),
        };

        let mut endpoints = Vec::new();
        for node in nodes_of_kind(file.root_node(), "call_expression") {
            let Some(call) = CallSite::from_node(file, node) else {
                continue;
            };
            for matcher in &self.matchers {
                if let Some(found) = matcher.try_match(&call, &ctx) {
                    for endpoint in &found {
                        debug!(
                            "{} matched {} {} in {}",
                            matcher.name(),
                            endpoint.method,
                            endpoint.path,
                            ctx.source_file
                        );
                    }
                    endpoints.extend(found);
                    break;
                }
            }
        }
        endpoints
    }
}
