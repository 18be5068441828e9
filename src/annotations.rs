//! Endpoint declarations written as comment directives.
//!
//! Routes that cannot be recognized from code (dynamic paths, custom routers) can be
//! declared in a comment block:
//!
//! ```go
//! // @route POST /v1/users Create a user
//! // @header Authorization: Bearer {{token}}
//! // @body {"name":"string"}
//! // @tag users
//! func CreateUser(w http.ResponseWriter, r *http.Request) {}
//! ```
//!
//! Every route directive of a comment group becomes an endpoint; the other directives
//! of the group apply to all of them.

use crate::extractor::{normalize_method, Endpoint, GraphQlInfo};
use crate::parser::{nodes_of_kind, ParsedFile};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tree_sitter::Node;

static ROUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)@route\s+([A-Z]+)\s+(\S+)(?:\s+(.*))?$").expect("Invalid regex")
});
static REST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)@rest\s+([A-Z]+)\s+(\S+)(?:\s+(.*))?$").expect("Invalid regex")
});
static GRAPHQL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)@graphql\s+(query|mutation|subscription)\s+(\S+)(?:\s+(.*))?$")
        .expect("Invalid regex")
});
static HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)@header\s+([^:]+):\s*(.+)$").expect("Invalid regex"));
static BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)@body\s+(.+)$").expect("Invalid regex"));
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)@tag\s+([A-Za-z0-9_./-]+)$").expect("Invalid regex"));
static SCHEMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)@schema\s+(.+)$").expect("Invalid regex"));
static QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)@query\s+(.+)$").expect("Invalid regex"));
static VARIABLES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)@variables\s+(.+)$").expect("Invalid regex"));

/// A route directive before the group's shared directives are applied.
#[derive(Debug)]
struct RouteDecl {
    method: String,
    path: String,
    description: Option<String>,
    /// GraphQL operation; `None` for REST routes
    operation: Option<String>,
}

/// Header, body, tag and GraphQL directives collected over one comment group.
#[derive(Debug, Default)]
struct SharedDirectives {
    headers: BTreeMap<String, String>,
    body: Option<String>,
    tags: Vec<String>,
    graphql: Option<GraphQlInfo>,
}

/// Parses comment directives into endpoints.
pub struct AnnotationParser;

impl AnnotationParser {
    /// Extracts the endpoints declared by directives in the comments of `file`.
    ///
    /// Groups are processed in source order; within a group, endpoints follow the order
    /// of their route directives.
    pub fn parse(file: &ParsedFile) -> Vec<Endpoint> {
        let source_file = file.display_path();
        let mut endpoints = Vec::new();

        for group in comment_groups(file) {
            let lines: Vec<String> = group
                .iter()
                .flat_map(|comment| comment_lines(file.text(*comment)))
                .filter(|line| is_directive(line))
                .collect();
            if lines.is_empty() {
                continue;
            }

            let routes = route_declarations(&lines);
            if routes.is_empty() {
                continue;
            }
            if routes.len() > 1 {
                debug!(
                    "Comment group at {}:{} declares {} routes; shared directives apply to all",
                    source_file,
                    group[0].start_position().row + 1,
                    routes.len()
                );
            }

            let shared = shared_directives(&lines);
            for route in routes {
                endpoints.push(build_endpoint(route, &shared, &source_file));
            }
        }

        endpoints
    }
}

fn build_endpoint(route: RouteDecl, shared: &SharedDirectives, source_file: &str) -> Endpoint {
    let mut endpoint = match route.operation {
        Some(operation) => {
            let mut info = shared.graphql.clone().unwrap_or_default();
            if info.operation.is_empty() {
                info.operation = operation;
            }
            Endpoint::graphql(route.path, source_file, info)
        }
        None => Endpoint::new(route.method, route.path, source_file),
    };
    endpoint.description = route.description;
    endpoint.headers = shared.headers.clone();
    endpoint.tags = shared.tags.clone();
    endpoint.with_body(shared.body.clone())
}

fn is_directive(line: &str) -> bool {
    [
        &*HEADER_RE,
        &*BODY_RE,
        &*TAG_RE,
        &*SCHEMA_RE,
        &*QUERY_RE,
        &*VARIABLES_RE,
        &*GRAPHQL_RE,
        &*REST_RE,
        &*ROUTE_RE,
    ]
    .iter()
    .any(|re| re.is_match(line))
}

fn optional_description(caps: &regex::Captures, index: usize) -> Option<String> {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .filter(|d| !d.is_empty())
}

fn route_declarations(lines: &[String]) -> Vec<RouteDecl> {
    let mut routes = Vec::new();
    for line in lines {
        if let Some(caps) = GRAPHQL_RE.captures(line) {
            routes.push(RouteDecl {
                method: "POST".to_string(),
                path: caps[2].to_string(),
                description: optional_description(&caps, 3),
                operation: Some(caps[1].to_lowercase()),
            });
        }
        for re in [&*REST_RE, &*ROUTE_RE] {
            if let Some(caps) = re.captures(line) {
                routes.push(RouteDecl {
                    method: normalize_method(&caps[1]),
                    path: caps[2].to_string(),
                    description: optional_description(&caps, 3),
                    operation: None,
                });
            }
        }
    }
    routes
}

fn shared_directives(lines: &[String]) -> SharedDirectives {
    let mut shared = SharedDirectives::default();

    for line in lines {
        if let Some(caps) = HEADER_RE.captures(line) {
            let key = caps[1].trim();
            if !key.is_empty() {
                shared
                    .headers
                    .insert(key.to_string(), caps[2].trim().to_string());
            }
        } else if let Some(caps) = BODY_RE.captures(line) {
            shared.body = Some(caps[1].trim().to_string());
        } else if let Some(caps) = TAG_RE.captures(line) {
            let tag = caps[1].trim().to_string();
            if !tag.is_empty() && !shared.tags.contains(&tag) {
                shared.tags.push(tag);
            }
        } else if let Some(caps) = SCHEMA_RE.captures(line) {
            shared.graphql.get_or_insert_with(GraphQlInfo::default).schema =
                caps[1].trim().to_string();
        } else if let Some(caps) = QUERY_RE.captures(line) {
            shared.graphql.get_or_insert_with(GraphQlInfo::default).query =
                caps[1].trim().to_string();
        } else if let Some(caps) = VARIABLES_RE.captures(line) {
            shared.graphql.get_or_insert_with(GraphQlInfo::default).variables =
                caps[1].trim().to_string();
        }
    }

    shared
}

/// Splits the comments of a file into groups.
///
/// Consecutive comments belong together when only whitespace with at most one line
/// break separates them. A comment that follows code on its line stands alone.
fn comment_groups(file: &ParsedFile) -> Vec<Vec<Node<'_>>> {
    let source = file.source.as_str();
    let mut groups: Vec<Vec<Node>> = Vec::new();
    let mut last_trailing = false;

    for comment in nodes_of_kind(file.root_node(), "comment") {
        let trailing = follows_code(source, comment.start_byte());

        let joins_previous = !trailing
            && !last_trailing
            && groups.last().and_then(|g| g.last()).is_some_and(|prev| {
                let gap = &source[prev.end_byte()..comment.start_byte()];
                gap.trim().is_empty() && gap.matches('\n').count() <= 1
            });

        match groups.last_mut() {
            Some(group) if joins_previous => group.push(comment),
            _ => groups.push(vec![comment]),
        }
        last_trailing = trailing;
    }

    groups
}

fn follows_code(source: &str, start: usize) -> bool {
    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    !source[line_start..start].trim().is_empty()
}

/// Comment text without its markers, one trimmed line per entry, blank lines dropped.
fn comment_lines(text: &str) -> Vec<String> {
    let inner = if let Some(line) = text.strip_prefix("//") {
        line
    } else if let Some(block) = text.strip_prefix("/*") {
        block.strip_suffix("*/").unwrap_or(block)
    } else {
        text
    };

    inner
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
