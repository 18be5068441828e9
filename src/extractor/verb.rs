//! Verb-named registrations used by chi, echo, gin and fiber.
//!
//! ```go
//! r.Get("/users", listUsers)          // chi, fiber
//! e.POST("/users", createUser)        // echo, gin
//! r.POST("/graphql", graphqlHandler)  // GraphQL entry point
//! ```

use super::{is_verb, CallSite, Endpoint, GraphQlInfo, MatchContext, RouteMatcher};

/// Whether a POST route path looks like a GraphQL entry point.
pub fn is_graphql_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.contains("graphql") || lower.contains("graph") || lower.ends_with("/query")
}

/// `X.POST(path, h)` on a GraphQL-looking path.
pub struct GraphQlMatcher;

impl RouteMatcher for GraphQlMatcher {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn try_match(&self, call: &CallSite, ctx: &MatchContext) -> Option<Vec<Endpoint>> {
        if call.method != "POST" {
            return None;
        }
        let path = call.route_path(ctx.file)?;
        if !is_graphql_path(&path) {
            return None;
        }

        let info = GraphQlInfo {
            operation: "query".to_string(),
            ..GraphQlInfo::default()
        };
        let endpoint = Endpoint::graphql(path, ctx.source_file.as_str(), info)
            .with_handler(call.handler_name(ctx.file));
        Some(vec![endpoint])
    }
}

/// `X.<Verb>(path, h)` for any verb, matched case-insensitively.
pub struct VerbMatcher;

impl RouteMatcher for VerbMatcher {
    fn name(&self) -> &'static str {
        "verb"
    }

    fn try_match(&self, call: &CallSite, ctx: &MatchContext) -> Option<Vec<Endpoint>> {
        if !is_verb(&call.method) {
            return None;
        }
        let path = call.route_path(ctx.file)?;
        let handler = call.handler_name(ctx.file);
        let body = ctx.body_for(handler.as_deref());

        let endpoint = Endpoint::new(call.method.to_uppercase(), path, ctx.source_file.as_str())
            .with_handler(handler)
            .with_body(body);
        Some(vec![endpoint])
    }
}
