use crate::example_generator::{body_for_variable_name, render_struct_json, REQUEST_SHAPE};
use crate::parser::{named_children, walk_preorder, ParsedFile};
use crate::project_analyzer::{ProjectAnalysis, StructDefinition, DTO_SUFFIXES};
use crate::type_resolver::{struct_fields, StructField};
use log::debug;
use std::collections::HashMap;
use tree_sitter::Node;

/// Struct name reported for a body shaped after an anonymous struct in the handler.
pub const INLINE_STRUCT_NAME: &str = "InlineStruct";

const BIND_METHODS: &[&str] = &["ShouldBindJSON", "BindJSON", "ShouldBind", "Bind"];

/// Whether a function consumes a structured request body, and what it looks like.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyDetectionResult {
    pub has_body: bool,
    /// Compact JSON example, empty when `has_body` is false
    pub example: String,
    /// Project struct the example was built from, or [`INLINE_STRUCT_NAME`]
    pub struct_name: Option<String>,
}

/// Detects request body consumption inside function bodies.
///
/// The detector recognizes four idioms: framework binding calls
/// (`c.ShouldBindJSON(&v)` and friends), `json.NewDecoder(r.Body).Decode(&v)`,
/// `json.Unmarshal(data, &v)` and `io.ReadAll(...)`. The decode target is matched
/// against the structs of the project analysis to synthesize an example payload.
pub struct BodyDetector<'a> {
    analysis: &'a ProjectAnalysis,
}

impl<'a> BodyDetector<'a> {
    pub fn new(analysis: &'a ProjectAnalysis) -> Self {
        Self { analysis }
    }

    /// Inspects a `function_declaration`, `method_declaration` or `func_literal` node.
    ///
    /// Functions without a body never consume one.
    pub fn detect(&self, file: &ParsedFile, function: Node) -> BodyDetectionResult {
        let Some(body) = function.child_by_field_name("body") else {
            return BodyDetectionResult::default();
        };

        let local_hint = find_local_struct(file, body);

        let mut matched = None;
        walk_preorder(body, |node| {
            if matched.is_some() {
                return false;
            }
            if node.kind() == "call_expression" && is_body_idiom(file, node) {
                matched = Some(node);
                return false;
            }
            true
        });

        let Some(call) = matched else {
            return BodyDetectionResult::default();
        };

        let (example, struct_name) = self.synthesize(file, call, local_hint.as_deref());
        BodyDetectionResult {
            has_body: true,
            example,
            struct_name,
        }
    }

    fn synthesize(
        &self,
        file: &ParsedFile,
        call: Node,
        local_hint: Option<&[StructField]>,
    ) -> (String, Option<String>) {
        let target = decode_target(file, call);

        if let Some(ident) = target {
            if let Some(found) = self.match_project_struct(ident) {
                debug!("Body of {} matched struct {}", ident, found.name);
                return (render_struct_json(&found.fields), Some(found.name.clone()));
            }
        }

        if let Some(fields) = local_hint.filter(|f| !f.is_empty()) {
            return (
                render_struct_json(fields),
                Some(INLINE_STRUCT_NAME.to_string()),
            );
        }

        match target {
            Some(ident) => (body_for_variable_name(ident).to_string(), None),
            None => (REQUEST_SHAPE.to_string(), None),
        }
    }

    /// Picks the best project struct for a decode target variable.
    ///
    /// Exact name matches rank first, then data-transfer objects, then any other
    /// fuzzy match; ties keep qualified-name order.
    fn match_project_struct(&self, ident: &str) -> Option<&'a StructDefinition> {
        let var = ident.to_lowercase();
        let pattern = &self.analysis.arch_pattern;

        self.analysis
            .structs
            .values()
            .filter(|s| struct_name_matches(&var, &s.name.to_lowercase()))
            .min_by_key(|s| {
                if s.name.to_lowercase() == var {
                    0
                } else if pattern.is_dto(&s.name) {
                    1
                } else {
                    2
                }
            })
    }
}

/// Fuzzy match between a lower-cased variable name and a lower-cased struct name.
fn struct_name_matches(var: &str, struct_name: &str) -> bool {
    if struct_name.contains(var) || var.contains(struct_name) {
        return true;
    }

    // A struct named only by a suffix (`Request`) strips to "" and matches any variable.
    DTO_SUFFIXES
        .iter()
        .find_map(|suffix| struct_name.strip_suffix(suffix))
        .is_some_and(|base| base.contains(var) || var.contains(base))
}

fn is_body_idiom(file: &ParsedFile, call: Node) -> bool {
    let Some(function) = call.child_by_field_name("function") else {
        return false;
    };
    if function.kind() != "selector_expression" {
        return false;
    }
    let (Some(operand), Some(field)) = (
        function.child_by_field_name("operand"),
        function.child_by_field_name("field"),
    ) else {
        return false;
    };
    let method = file.text(field);

    if BIND_METHODS.contains(&method) {
        return true;
    }

    if method == "Decode" && operand.kind() == "call_expression" {
        let creates_decoder = operand
            .child_by_field_name("function")
            .filter(|f| f.kind() == "selector_expression")
            .and_then(|f| f.child_by_field_name("field"))
            .is_some_and(|f| file.text(f) == "NewDecoder");
        if creates_decoder {
            return true;
        }
    }

    if operand.kind() == "identifier" {
        let package = file.text(operand);
        return (package == "json" && method == "Unmarshal")
            || (package == "io" && method == "ReadAll");
    }

    false
}

/// The variable a body is decoded into: `&v` as first argument, else as second.
fn decode_target<'f>(file: &'f ParsedFile, call: Node) -> Option<&'f str> {
    let args = call.child_by_field_name("arguments")?;
    let args = named_children(args);
    args.iter().take(2).find_map(|arg| address_of_ident(file, *arg))
}

fn address_of_ident<'f>(file: &'f ParsedFile, node: Node) -> Option<&'f str> {
    if node.kind() != "unary_expression" {
        return None;
    }
    let operator = node.child_by_field_name("operator")?;
    let operand = node.child_by_field_name("operand")?;
    if file.text(operator) == "&" && operand.kind() == "identifier" {
        Some(file.text(operand))
    } else {
        None
    }
}

/// First anonymous struct declared in the body, as `var x struct{...}` or
/// `x := struct{...}{...}`.
fn find_local_struct(file: &ParsedFile, body: Node) -> Option<Vec<StructField>> {
    let mut found = None;
    walk_preorder(body, |node| {
        if found.is_some() {
            return false;
        }
        match node.kind() {
            "var_spec" => {
                if let Some(ty) = node
                    .child_by_field_name("type")
                    .filter(|t| t.kind() == "struct_type")
                {
                    found = Some(struct_fields(file, ty));
                    return false;
                }
            }
            "short_var_declaration" | "assignment_statement" => {
                let literal_struct = node.child_by_field_name("right").and_then(|right| {
                    named_children(right).into_iter().find_map(|expr| {
                        (expr.kind() == "composite_literal")
                            .then(|| expr.child_by_field_name("type"))
                            .flatten()
                            .filter(|t| t.kind() == "struct_type")
                    })
                });
                if let Some(ty) = literal_struct {
                    found = Some(struct_fields(file, ty));
                    return false;
                }
            }
            _ => {}
        }
        true
    });
    found
}

/// Example bodies of every function that consumes one, keyed by function name.
#[derive(Debug, Default, Clone)]
pub struct HandlerBodies {
    bodies: HashMap<String, String>,
}

impl HandlerBodies {
    /// Runs the detector over every function and method of every file.
    ///
    /// Names are not qualified, so a later file overwrites an earlier function of the
    /// same name.
    pub fn collect(files: &[ParsedFile], analysis: &ProjectAnalysis) -> Self {
        let detector = BodyDetector::new(analysis);
        let mut bodies = HashMap::new();

        for file in files {
            for decl in named_children(file.root_node()) {
                if decl.kind() != "function_declaration" && decl.kind() != "method_declaration" {
                    continue;
                }
                let Some(name) = decl.child_by_field_name("name") else {
                    continue;
                };
                let result = detector.detect(file, decl);
                if result.has_body {
                    debug!(
                        "Handler {} in {} reads a body",
                        file.text(name),
                        file.display_path()
                    );
                    bodies.insert(file.text(name).to_string(), result.example);
                }
            }
        }

        Self { bodies }
    }

    pub fn get(&self, handler: &str) -> Option<&str> {
        self.bodies.get(handler).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{nodes_of_kind, GoParser};
    use crate::project_analyzer::ProjectAnalyzer;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn parse(code: &str) -> ParsedFile {
        GoParser::parse_source(Path::new("handlers.go"), code.to_string()).unwrap()
    }

    /// Detects the body of the first function in `code`, with `code` as the whole project.
    fn detect_in(code: &str) -> BodyDetectionResult {
        let file = parse(code);
        let analysis = ProjectAnalyzer::analyze_files(Path::new("."), std::slice::from_ref(&file));
        let function = nodes_of_kind(file.root_node(), "function_declaration")[0];
        BodyDetector::new(&analysis).detect(&file, function)
    }

    #[test]
    fn test_inline_struct_decode() {
        let result = detect_in(
            r#"
package api

func Create(w http.ResponseWriter, r *http.Request) {
    var input struct {
        Name string `json:"name"`
        Age  int    `json:"age"`
    }
    json.NewDecoder(r.Body).Decode(&input)
}
"#,
        );

        assert!(result.has_body);
        assert_eq!(result.example, r#"{"name":"string","age":0}"#);
        assert_eq!(result.struct_name.as_deref(), Some(INLINE_STRUCT_NAME));
    }

    #[test]
    fn test_short_var_inline_struct() {
        let result = detect_in(
            r#"
package api

func Update(c *gin.Context) {
    body := struct {
        Title   string   `json:"title"`
        Labels  []string `json:"labels,omitempty"`
        Private bool     `json:"-"`
    }{}
    c.BindJSON(&body)
}
"#,
        );

        assert_eq!(result.example, r#"{"title":"string","labels":["string"]}"#);
    }

    #[test]
    fn test_gin_binding_uses_variable_name_without_struct() {
        let result = detect_in(
            r#"
package api

func Register(c *gin.Context) {
    c.ShouldBindJSON(&userRequest)
}
"#,
        );

        assert!(result.has_body);
        assert_eq!(
            result.example,
            r#"{"name":"string","email":"string","id":"string"}"#
        );
        assert_eq!(result.struct_name, None);
    }

    #[test]
    fn test_decoder_with_req_variable() {
        let result = detect_in(
            r#"
package api

func Handle(w http.ResponseWriter, r *http.Request) {
    json.NewDecoder(r.Body).Decode(&req)
}
"#,
        );

        assert_eq!(result.example, r#"{"data":"string","parameters":{}}"#);
    }

    #[test]
    fn test_unmarshal_uses_second_argument() {
        let result = detect_in(
            r#"
package api

func Handle(w http.ResponseWriter, r *http.Request) {
    var deletePayload map[string]string
    json.Unmarshal(data, &deletePayload)
}
"#,
        );

        assert_eq!(result.example, r#"{"id":"string","reason":"string"}"#);
    }

    #[test]
    fn test_read_all_without_target() {
        let result = detect_in(
            r#"
package api

func Raw(w http.ResponseWriter, r *http.Request) {
    data, _ := io.ReadAll(r.Body)
    _ = data
}
"#,
        );

        assert!(result.has_body);
        assert_eq!(result.example, REQUEST_SHAPE);
    }

    #[test]
    fn test_no_body_idiom() {
        let result = detect_in(
            r#"
package api

func List(w http.ResponseWriter, r *http.Request) {
    w.Write([]byte("ok"))
}
"#,
        );

        assert_eq!(result, BodyDetectionResult::default());
    }

    #[test]
    fn test_project_struct_match_prefers_exact_then_dto() {
        let result = detect_in(
            r#"
package api

type OrderItem struct {
    SKU string `json:"sku"`
}

type OrderRequest struct {
    CustomerID int64   `json:"customer_id"`
    Total      float64 `json:"total"`
    Secret     string  `json:"-"`
}

func PlaceOrder(c *gin.Context) {
    var order OrderRequest
    c.ShouldBindJSON(&order)
}
"#,
        );

        assert_eq!(result.example, r#"{"customer_id":0,"total":0.0}"#);
        assert_eq!(result.struct_name.as_deref(), Some("OrderRequest"));
    }

    #[test]
    fn test_exact_struct_name_wins() {
        let result = detect_in(
            r#"
package api

type ItemRequest struct {
    A string
}

type Item struct {
    B bool
}

func Add(c *gin.Context) {
    c.Bind(&item)
}
"#,
        );

        assert_eq!(result.struct_name.as_deref(), Some("Item"));
        assert_eq!(result.example, r#"{"b":false}"#);
    }

    #[test]
    fn test_struct_name_matches() {
        assert!(struct_name_matches("user", "userrequest"));
        assert!(struct_name_matches("createuserinput", "user"));
        assert!(struct_name_matches("loginpayload", "loginrequest"));
        assert!(struct_name_matches("payload", "request"));
        assert!(!struct_name_matches("payload", "orderdto"));
        assert!(!struct_name_matches("abc", "product"));
    }

    #[test]
    fn test_struct_named_after_suffix_matches_any_variable() {
        let result = detect_in(
            r#"
package auth

type Request struct {
    Email string `json:"email"`
}

func Login(c *gin.Context) {
    var payload Request
    if err := c.ShouldBindJSON(&payload); err != nil {
        return
    }
}
"#,
        );

        assert_eq!(result.example, r#"{"email":"string"}"#);
        assert_eq!(result.struct_name.as_deref(), Some("Request"));
    }

    #[test]
    fn test_first_local_struct_hint_wins() {
        let result = detect_in(
            r#"
package api

func Two(w http.ResponseWriter, r *http.Request) {
    var first struct {
        A string
    }
    var second struct {
        B int
    }
    json.NewDecoder(r.Body).Decode(&zzz)
}
"#,
        );

        assert_eq!(result.example, r#"{"a":"string"}"#);
    }

    #[test]
    fn test_collect_handler_bodies() {
        let file = parse(
            r#"
package api

func CreateUser(c *gin.Context) {
    c.ShouldBindJSON(&userRequest)
}

func (h *Handler) Delete(w http.ResponseWriter, r *http.Request) {
    json.NewDecoder(r.Body).Decode(&payload)
}

func Ping(c *gin.Context) {}
"#,
        );
        let analysis = ProjectAnalyzer::analyze_files(Path::new("."), std::slice::from_ref(&file));
        let bodies = HandlerBodies::collect(std::slice::from_ref(&file), &analysis);

        assert_eq!(bodies.len(), 2);
        assert_eq!(
            bodies.get("CreateUser"),
            Some(r#"{"name":"string","email":"string","id":"string"}"#)
        );
        assert!(bodies.get("Delete").is_some());
        assert_eq!(bodies.get("Ping"), None);
    }
}
