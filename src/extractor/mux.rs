//! `net/http` and gorilla/mux registrations.
//!
//! ```go
//! http.HandleFunc("/health", health)                        // ANY /health
//! r.HandleFunc("/users", users).Methods("GET", "POST")      // GET, POST /users
//! r.Methods("PUT").HandleFunc("/users/{id}", updateUser)    // PUT /users/{id}
//! ```

use super::{method_takes_body, CallSite, Endpoint, MatchContext, RouteMatcher, ANY_METHOD};
use log::debug;

fn is_handle_method(method: &str) -> bool {
    method == "HandleFunc" || method == "Handle"
}

/// One endpoint per verb; only body-carrying verbs get the handler's body.
fn per_verb_endpoints(
    methods: Vec<String>,
    path: &str,
    handler: Option<String>,
    ctx: &MatchContext,
) -> Vec<Endpoint> {
    let body = ctx.body_for(handler.as_deref());
    methods
        .into_iter()
        .map(|method| {
            let endpoint_body = if method_takes_body(&method) {
                body.clone()
            } else {
                None
            };
            Endpoint::new(method, path, ctx.source_file.as_str())
                .with_handler(handler.clone())
                .with_body(endpoint_body)
        })
        .collect()
}

/// `X.HandleFunc(path, h).Methods(m1, m2, ...)`, also with `Handle`.
pub struct ChainedMethodsMatcher;

impl RouteMatcher for ChainedMethodsMatcher {
    fn name(&self) -> &'static str {
        "chained-methods"
    }

    fn try_match(&self, call: &CallSite, ctx: &MatchContext) -> Option<Vec<Endpoint>> {
        if call.method != "Methods" {
            return None;
        }
        let inner = CallSite::from_node(ctx.file, call.receiver)?;
        if !is_handle_method(&inner.method) {
            return None;
        }
        let path = inner.route_path(ctx.file)?;

        // Without verb literals the inner registration is reported as ANY.
        let methods = call.verb_args(ctx.file);
        if methods.is_empty() {
            return None;
        }
        Some(per_verb_endpoints(
            methods,
            &path,
            inner.handler_name(ctx.file),
            ctx,
        ))
    }
}

/// `X.HandleFunc(path, h)` and `X.Handle(path, h)`.
///
/// A registration that is the receiver of `.Methods(...)` listing verb literals was
/// already expanded by [`ChainedMethodsMatcher`] and is consumed without output. With
/// no literal verbs (`.Methods(http.MethodGet)`) it is reported as ANY.
pub struct HandleFuncMatcher;

impl HandleFuncMatcher {
    fn is_expanded_by_methods_call(call: &CallSite, ctx: &MatchContext) -> bool {
        let Some(selector) = call.node.parent() else {
            return false;
        };
        if selector.kind() != "selector_expression" {
            return false;
        }
        let is_operand = selector
            .child_by_field_name("operand")
            .is_some_and(|operand| operand.id() == call.node.id());
        if !is_operand {
            return false;
        }
        selector
            .parent()
            .and_then(|outer| CallSite::from_node(ctx.file, outer))
            .is_some_and(|outer| {
                outer.method == "Methods" && !outer.verb_args(ctx.file).is_empty()
            })
    }
}

impl RouteMatcher for HandleFuncMatcher {
    fn name(&self) -> &'static str {
        "handle-func"
    }

    fn try_match(&self, call: &CallSite, ctx: &MatchContext) -> Option<Vec<Endpoint>> {
        if !is_handle_method(&call.method) {
            return None;
        }
        let path = call.route_path(ctx.file)?;

        if Self::is_expanded_by_methods_call(call, ctx) {
            debug!("{} is expanded by its .Methods(...) call", path);
            return Some(Vec::new());
        }

        let handler = call.handler_name(ctx.file);

        if let Some(methods_call) = CallSite::from_node(ctx.file, call.receiver) {
            let methods = methods_call.verb_args(ctx.file);
            if methods_call.method == "Methods" && !methods.is_empty() {
                return Some(per_verb_endpoints(methods, &path, handler, ctx));
            }
        }

        let body = ctx.body_for(handler.as_deref());
        Some(vec![Endpoint::new(ANY_METHOD, path, ctx.source_file.as_str())
            .with_handler(handler)
            .with_body(body)])
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::recognize;
    use super::super::RouteCallRecognizer;
    use crate::body_detector::HandlerBodies;
    use crate::parser::GoParser;
    use crate::project_analyzer::ProjectAnalyzer;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn test_plain_handle_func_is_any() {
        let endpoints = recognize(
            r#"
package main

func main() {
    router.HandleFunc("/v1/ping", handler)
}
"#,
        );

        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, "ANY");
        assert_eq!(endpoints[0].path, "/v1/ping");
        assert_eq!(endpoints[0].handler.as_deref(), Some("handler"));
    }

    #[test]
    fn test_handle_func_with_methods_yields_each_verb_once() {
        let endpoints = recognize(
            r#"
package main

func main() {
    router.HandleFunc("/v1/users", handler).Methods("GET", "POST")
}
"#,
        );

        let methods: Vec<&str> = endpoints.iter().map(|e| e.method.as_str()).collect();
        assert_eq!(methods, vec!["GET", "POST"]);
        assert!(endpoints.iter().all(|e| e.path == "/v1/users"));
    }

    #[test]
    fn test_handle_with_methods_drops_unknown_verbs() {
        let endpoints = recognize(
            r#"
package main

func main() {
    r.Handle("/v1/files", fileServer).Methods(" get ", "FETCH", http.MethodPut)
}
"#,
        );

        let methods: Vec<&str> = endpoints.iter().map(|e| e.method.as_str()).collect();
        assert_eq!(methods, vec!["GET"]);
    }

    #[test]
    fn test_methods_before_handle_func() {
        let endpoints = recognize(
            r#"
package main

func main() {
    r.Methods("PUT", "DELETE").HandleFunc("/v1/users/{id}", h.UpdateUser)
}
"#,
        );

        let methods: Vec<&str> = endpoints.iter().map(|e| e.method.as_str()).collect();
        assert_eq!(methods, vec!["PUT", "DELETE"]);
        assert_eq!(endpoints[0].handler.as_deref(), Some("UpdateUser"));
    }

    #[test]
    fn test_body_only_on_body_carrying_verbs() {
        let code = r#"
package main

func CreateUser(w http.ResponseWriter, r *http.Request) {
    json.NewDecoder(r.Body).Decode(&userInput)
}

func main() {
    r.HandleFunc("/v1/users", CreateUser).Methods("GET", "POST")
    http.HandleFunc("/v1/signup", CreateUser)
}
"#;
        let file = GoParser::parse_source(Path::new("main.go"), code.to_string()).unwrap();
        let analysis = ProjectAnalyzer::analyze_files(Path::new("."), std::slice::from_ref(&file));
        let bodies = HandlerBodies::collect(std::slice::from_ref(&file), &analysis);

        let endpoints = RouteCallRecognizer::new().recognize(&file, &bodies);

        let user_shape = r#"{"name":"string","email":"string","id":"string"}"#;
        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[0].method, "GET");
        assert_eq!(endpoints[0].body, None);
        assert_eq!(endpoints[1].method, "POST");
        assert_eq!(endpoints[1].body.as_deref(), Some(user_shape));
        assert_eq!(endpoints[2].method, "ANY");
        assert_eq!(endpoints[2].body.as_deref(), Some(user_shape));
    }

    #[test]
    fn test_methods_without_verb_literals_fall_back_to_any() {
        let code = r#"
package main

func ListUsers(w http.ResponseWriter, r *http.Request) {
    json.NewDecoder(r.Body).Decode(&filterRequest)
}

func main() {
    r.HandleFunc("/v1/users", ListUsers).Methods(http.MethodGet)
    r.HandleFunc("/v1/health", health).Methods()
    r.Methods(http.MethodPost).HandleFunc("/v1/items", items)
}
"#;
        let file = GoParser::parse_source(Path::new("main.go"), code.to_string()).unwrap();
        let analysis = ProjectAnalyzer::analyze_files(Path::new("."), std::slice::from_ref(&file));
        let bodies = HandlerBodies::collect(std::slice::from_ref(&file), &analysis);

        let endpoints = RouteCallRecognizer::new().recognize(&file, &bodies);

        let routes: Vec<(&str, &str)> = endpoints
            .iter()
            .map(|e| (e.method.as_str(), e.path.as_str()))
            .collect();
        assert_eq!(
            routes,
            vec![("ANY", "/v1/users"), ("ANY", "/v1/health"), ("ANY", "/v1/items")]
        );
        assert_eq!(
            endpoints[0].body.as_deref(),
            Some(r#"{"data":"string","parameters":{}}"#)
        );
        assert_eq!(endpoints[1].handler.as_deref(), Some("health"));
    }
}
