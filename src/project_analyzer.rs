use crate::parser::{named_children, nodes_of_kind, string_literal_value, GoParser, ParsedFile};
use crate::scanner::FileScanner;
use crate::type_resolver::{render_type, struct_fields, StructField, OPAQUE_TYPE};
use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tree_sitter::Node;

const CLEAN_KEYWORDS: &[&str] = &[
    "domain",
    "entity",
    "entities",
    "usecase",
    "usecases",
    "application",
    "repository",
    "repositories",
    "infrastructure",
    "handler",
    "handlers",
    "delivery",
    "transport",
    "service",
    "services",
];

const MVC_KEYWORDS: &[&str] = &["model", "view", "controller"];

const LAYERED_KEYWORDS: &[&str] = &[
    "api",
    "web",
    "http",
    "business",
    "logic",
    "service",
    "data",
    "dal",
    "persistence",
    "common",
    "shared",
    "utils",
];

/// Struct name suffixes that mark data-transfer objects.
pub const DTO_SUFFIXES: &[&str] = &["request", "req", "dto", "model", "entity", "response", "resp"];

/// Whole-project index of declarations, built once per scan.
///
/// All maps are keyed by `"package.Name"`. A later declaration with the same
/// qualified name replaces an earlier one.
#[derive(Debug, Default)]
pub struct ProjectAnalysis {
    pub structs: BTreeMap<String, StructDefinition>,
    pub interfaces: BTreeMap<String, InterfaceDefinition>,
    pub types: BTreeMap<String, TypeDefinition>,
    pub functions: BTreeMap<String, FunctionInfo>,
    /// Keyed by package name
    pub packages: BTreeMap<String, PackageInfo>,
    /// Module path from `go.mod`, empty when unavailable
    pub module_name: String,
    pub arch_pattern: ArchitecturePattern,
}

/// A named struct type declared at package level.
#[derive(Debug, Clone)]
pub struct StructDefinition {
    pub name: String,
    pub package: String,
    pub file: String,
    pub exported: bool,
    pub comments: Vec<String>,
    pub fields: Vec<StructField>,
}

/// A named interface type and its method set.
#[derive(Debug, Clone)]
pub struct InterfaceDefinition {
    pub name: String,
    pub package: String,
    pub file: String,
    pub exported: bool,
    pub methods: Vec<MethodInfo>,
}

/// Any other named type, e.g. `type Status string`.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub underlying_type: String,
    pub package: String,
    pub file: String,
    pub exported: bool,
}

/// A function or method declaration.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub package: String,
    pub file: String,
    pub params: Vec<ParamInfo>,
    pub returns: Vec<ParamInfo>,
    pub exported: bool,
    pub comments: Vec<String>,
    pub is_method: bool,
    pub receiver: Option<ParamInfo>,
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<ParamInfo>,
    pub returns: Vec<ParamInfo>,
}

/// A parameter or result; the name is empty when the declaration omits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct PackageInfo {
    pub name: String,
    /// Directory of the first file seen for this package
    pub path: String,
    /// File names, in walk order
    pub files: Vec<String>,
    /// Import paths of every file, in walk order
    pub imports: Vec<String>,
    /// True for the `main` package
    pub is_main: bool,
}

/// Heuristic classification of the project layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchitectureKind {
    Clean,
    Mvc,
    Layered,
    Microservice,
    #[default]
    Unknown,
}

impl fmt::Display for ArchitectureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ArchitectureKind::Clean => "clean",
            ArchitectureKind::Mvc => "mvc",
            ArchitectureKind::Layered => "layered",
            ArchitectureKind::Microservice => "microservice",
            ArchitectureKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArchitecturePattern {
    pub kind: ArchitectureKind,
    /// Score of the winning kind, between 0 and 1
    pub confidence: f64,
    /// Non-entry package names
    pub layers: Vec<String>,
    /// Struct names that look like data-transfer objects
    pub dto_patterns: Vec<String>,
}

impl ArchitecturePattern {
    /// Whether `struct_name` was classified as a data-transfer object.
    pub fn is_dto(&self, struct_name: &str) -> bool {
        self.dto_patterns.iter().any(|n| n == struct_name)
    }
}

/// Builds a [`ProjectAnalysis`] from a Go source tree.
pub struct ProjectAnalyzer;

impl ProjectAnalyzer {
    /// Walks `root`, parses every non-test Go file and indexes its declarations.
    ///
    /// # Errors
    ///
    /// Returns an error naming the file if any source file cannot be read or parsed.
    pub fn analyze(root: &Path) -> Result<ProjectAnalysis> {
        let scan = FileScanner::new(root.to_path_buf()).scan()?;
        let files = GoParser::parse_files(&scan.go_files)
            .with_context(|| format!("Failed to analyze project: {}", root.display()))?;
        Ok(Self::analyze_files(root, &files))
    }

    /// Indexes already-parsed files. `root` is only used to locate `go.mod`.
    pub fn analyze_files(root: &Path, files: &[ParsedFile]) -> ProjectAnalysis {
        let mut analysis = ProjectAnalysis::default();

        for file in files {
            analyze_file(file, &mut analysis);
        }

        analysis.module_name = detect_module_name(root);
        analysis.arch_pattern = detect_architecture_pattern(&analysis);

        info!(
            "Project analysis: {} structs, {} functions, {} packages, architecture {} ({:.2})",
            analysis.structs.len(),
            analysis.functions.len(),
            analysis.packages.len(),
            analysis.arch_pattern.kind,
            analysis.arch_pattern.confidence
        );
        if !analysis.module_name.is_empty() {
            debug!("Module: {}", analysis.module_name);
        }

        analysis
    }
}

fn analyze_file(file: &ParsedFile, analysis: &mut ProjectAnalysis) {
    let package_name = file.package_name();
    let file_path = file.display_path();

    let package = analysis
        .packages
        .entry(package_name.clone())
        .or_insert_with(|| PackageInfo {
            name: package_name.clone(),
            path: file
                .path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            is_main: package_name == "main",
            ..PackageInfo::default()
        });

    if let Some(name) = file.path.file_name() {
        package.files.push(name.to_string_lossy().into_owned());
    }

    let root = file.root_node();
    for spec in nodes_of_kind(root, "import_spec") {
        if let Some(path) = spec
            .child_by_field_name("path")
            .and_then(|p| string_literal_value(file, p))
        {
            package.imports.push(path);
        }
    }

    for decl in named_children(root) {
        match decl.kind() {
            "type_declaration" => {
                let comments = doc_comments(file, decl);
                for spec in named_children(decl) {
                    if spec.kind() == "type_spec" || spec.kind() == "type_alias" {
                        analyze_type_spec(file, spec, &comments, &package_name, analysis);
                    }
                }
            }
            "function_declaration" | "method_declaration" => {
                analyze_function(file, decl, &package_name, analysis);
            }
            _ => {}
        }
    }
}

fn analyze_type_spec(
    file: &ParsedFile,
    spec: Node,
    comments: &[String],
    package: &str,
    analysis: &mut ProjectAnalysis,
) {
    let (Some(name_node), Some(type_node)) = (
        spec.child_by_field_name("name"),
        spec.child_by_field_name("type"),
    ) else {
        return;
    };

    let name = file.text(name_node).to_string();
    let qualified = format!("{}.{}", package, name);
    let exported = is_exported(&name);

    match type_node.kind() {
        "struct_type" => {
            let fields = struct_fields(file, type_node);
            debug!("Struct {} with {} fields", qualified, fields.len());
            analysis.structs.insert(
                qualified,
                StructDefinition {
                    name,
                    package: package.to_string(),
                    file: file.display_path(),
                    exported,
                    comments: comments.to_vec(),
                    fields,
                },
            );
        }
        "interface_type" => {
            let methods = named_children(type_node)
                .into_iter()
                .filter(|n| n.kind() == "method_elem" || n.kind() == "method_spec")
                .filter_map(|m| {
                    let name = m.child_by_field_name("name")?;
                    Some(MethodInfo {
                        name: file.text(name).to_string(),
                        params: m
                            .child_by_field_name("parameters")
                            .map(|p| params_of(file, p))
                            .unwrap_or_default(),
                        returns: m
                            .child_by_field_name("result")
                            .map(|r| results_of(file, r))
                            .unwrap_or_default(),
                    })
                })
                .collect();
            analysis.interfaces.insert(
                qualified,
                InterfaceDefinition {
                    name,
                    package: package.to_string(),
                    file: file.display_path(),
                    exported,
                    methods,
                },
            );
        }
        _ => {
            analysis.types.insert(
                qualified,
                TypeDefinition {
                    name,
                    underlying_type: render_type(file, type_node),
                    package: package.to_string(),
                    file: file.display_path(),
                    exported,
                },
            );
        }
    }
}

fn analyze_function(file: &ParsedFile, decl: Node, package: &str, analysis: &mut ProjectAnalysis) {
    let Some(name_node) = decl.child_by_field_name("name") else {
        return;
    };
    let name = file.text(name_node).to_string();

    let receiver = decl
        .child_by_field_name("receiver")
        .and_then(|r| params_of(file, r).into_iter().next());

    let info = FunctionInfo {
        package: package.to_string(),
        file: file.display_path(),
        params: decl
            .child_by_field_name("parameters")
            .map(|p| params_of(file, p))
            .unwrap_or_default(),
        returns: decl
            .child_by_field_name("result")
            .map(|r| results_of(file, r))
            .unwrap_or_default(),
        exported: is_exported(&name),
        comments: doc_comments(file, decl),
        is_method: decl.kind() == "method_declaration",
        receiver,
        name: name.clone(),
    };

    analysis
        .functions
        .insert(format!("{}.{}", package, name), info);
}

/// Flattens a `parameter_list`; each name of `a, b int` becomes its own entry.
fn params_of(file: &ParsedFile, list: Node) -> Vec<ParamInfo> {
    let mut params = Vec::new();
    for decl in named_children(list) {
        let type_name = match decl.kind() {
            "parameter_declaration" => decl
                .child_by_field_name("type")
                .map(|t| render_type(file, t))
                .unwrap_or_else(|| OPAQUE_TYPE.to_string()),
            "variadic_parameter_declaration" => OPAQUE_TYPE.to_string(),
            _ => continue,
        };

        let mut cursor = decl.walk();
        let names: Vec<String> = decl
            .children_by_field_name("name", &mut cursor)
            .map(|n| file.text(n).to_string())
            .collect();

        if names.is_empty() {
            params.push(ParamInfo {
                name: String::new(),
                type_name,
            });
        } else {
            params.extend(names.into_iter().map(|name| ParamInfo {
                name,
                type_name: type_name.clone(),
            }));
        }
    }
    params
}

/// A result is either a parenthesized parameter list or a single bare type.
fn results_of(file: &ParsedFile, result: Node) -> Vec<ParamInfo> {
    if result.kind() == "parameter_list" {
        params_of(file, result)
    } else {
        vec![ParamInfo {
            name: String::new(),
            type_name: render_type(file, result),
        }]
    }
}

/// Comment lines directly above `node`, with the leading `//` removed.
fn doc_comments(file: &ParsedFile, node: Node) -> Vec<String> {
    let mut lines = Vec::new();
    let mut row = node.start_position().row;
    let mut current = node.prev_sibling();

    while let Some(prev) = current {
        if prev.kind() != "comment" || prev.end_position().row + 1 < row {
            break;
        }
        let text = file.text(prev);
        lines.push(text.strip_prefix("//").unwrap_or(text).to_string());
        row = prev.start_position().row;
        current = prev.prev_sibling();
    }

    lines.reverse();
    lines
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Reads the module path from `go.mod`; any failure yields an empty string.
fn detect_module_name(root: &Path) -> String {
    let Ok(content) = fs::read_to_string(root.join("go.mod")) else {
        return String::new();
    };
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("module "))
        .map(|module| module.trim().to_string())
        .unwrap_or_default()
}

fn keyword_score(packages: &[String], keywords: &[&str]) -> f64 {
    let hits = keywords
        .iter()
        .filter(|kw| packages.iter().any(|p| p.to_lowercase().contains(*kw)))
        .count();
    hits as f64 / keywords.len() as f64
}

fn microservice_score(analysis: &ProjectAnalysis) -> f64 {
    let mut score = 0.0;
    for package in analysis.packages.values() {
        for import in &package.imports {
            if import.contains("grpc") || import.contains("protobuf") {
                score += 0.3;
            }
        }
    }
    if analysis.packages.contains_key("main") {
        score += 0.2;
    }
    for name in analysis.packages.keys() {
        let lower = name.to_lowercase();
        if lower.contains("config") || lower.contains("env") {
            score += 0.2;
        }
    }
    f64::min(score, 1.0)
}

fn detect_architecture_pattern(analysis: &ProjectAnalysis) -> ArchitecturePattern {
    let layers: Vec<String> = analysis
        .packages
        .keys()
        .filter(|name| name.as_str() != "main")
        .cloned()
        .collect();

    let candidates = [
        (ArchitectureKind::Clean, keyword_score(&layers, CLEAN_KEYWORDS)),
        (ArchitectureKind::Mvc, keyword_score(&layers, MVC_KEYWORDS)),
        (ArchitectureKind::Layered, keyword_score(&layers, LAYERED_KEYWORDS)),
        (ArchitectureKind::Microservice, microservice_score(analysis)),
    ];

    let mut kind = ArchitectureKind::Unknown;
    let mut confidence = 0.0;
    for (candidate, score) in candidates {
        if score > confidence {
            kind = candidate;
            confidence = score;
        }
    }

    let dto_patterns = analysis
        .structs
        .values()
        .filter(|s| is_dto_name(&s.name))
        .map(|s| s.name.clone())
        .collect();

    ArchitecturePattern {
        kind,
        confidence,
        layers,
        dto_patterns,
    }
}

fn is_dto_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    DTO_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_analyze_structs_interfaces_and_types() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            "models/user.go",
            r#"
package models

// User is a registered account.
// It is stored in Postgres.
type User struct {
    ID    int    `json:"id"`
    Email string `json:"email"`
}

type Status string

type Store interface {
    Get(id int) (*User, error)
    Put(u User) error
}
"#,
        );

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();

        let user = &analysis.structs["models.User"];
        assert_eq!(user.name, "User");
        assert_eq!(user.package, "models");
        assert!(user.exported);
        assert_eq!(
            user.comments,
            vec![" User is a registered account.", " It is stored in Postgres."]
        );
        assert_eq!(user.fields.len(), 2);

        assert_eq!(analysis.types["models.Status"].underlying_type, "string");

        let store = &analysis.interfaces["models.Store"];
        assert_eq!(store.methods.len(), 2);
        assert_eq!(store.methods[0].name, "Get");
        assert_eq!(
            store.methods[0].returns,
            vec![
                ParamInfo {
                    name: String::new(),
                    type_name: "*User".into()
                },
                ParamInfo {
                    name: String::new(),
                    type_name: "error".into()
                },
            ]
        );
    }

    #[test]
    fn test_analyze_functions_and_methods() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            "main.go",
            r#"
package main

import (
    "net/http"
    "github.com/gin-gonic/gin"
)

// CreateUser handles user creation.
func CreateUser(c *gin.Context) {}

func (h *Handler) list(w http.ResponseWriter, r *http.Request) (n, m int) { return 0, 0 }

func main() {}
"#,
        );

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();

        let create = &analysis.functions["main.CreateUser"];
        assert!(create.exported);
        assert!(!create.is_method);
        assert_eq!(create.comments, vec![" CreateUser handles user creation."]);
        assert_eq!(create.params[0].type_name, "*gin.Context");

        let list = &analysis.functions["main.list"];
        assert!(list.is_method);
        assert!(!list.exported);
        assert_eq!(
            list.receiver,
            Some(ParamInfo {
                name: "h".into(),
                type_name: "*Handler".into()
            })
        );
        assert_eq!(list.params.len(), 2);
        assert_eq!(list.returns.len(), 2);

        let package = &analysis.packages["main"];
        assert!(package.is_main);
        assert_eq!(package.files, vec!["main.go"]);
        assert_eq!(
            package.imports,
            vec!["net/http", "github.com/gin-gonic/gin"]
        );
    }

    #[test]
    fn test_module_name_from_go_mod() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "go.mod", "// comment\nmodule github.com/acme/shop\n\ngo 1.22\n");
        write(&temp_dir, "main.go", "package main\n");

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();
        assert_eq!(analysis.module_name, "github.com/acme/shop");
    }

    #[test]
    fn test_missing_go_mod_is_silent() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "main.go", "package main\n");

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();
        assert_eq!(analysis.module_name, "");
    }

    #[test]
    fn test_parse_failure_aborts_analysis() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "good.go", "package main\n");
        write(&temp_dir, "bad.go", "package main\nfunc {\n");

        let err = ProjectAnalyzer::analyze(temp_dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.go"));
    }

    #[test]
    fn test_clean_architecture_detection() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "main.go", "package main\n");
        write(&temp_dir, "domain/user.go", "package domain\ntype UserEntity struct{}\n");
        write(&temp_dir, "usecase/user.go", "package usecase\n");
        write(&temp_dir, "repository/user.go", "package repository\n");
        write(
            &temp_dir,
            "handler/user.go",
            "package handler\ntype CreateUserRequest struct{}\ntype Server struct{}\n",
        );

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();
        let pattern = &analysis.arch_pattern;

        assert_eq!(pattern.kind, ArchitectureKind::Clean);
        assert!((pattern.confidence - 4.0 / 15.0).abs() < 1e-9);
        assert_eq!(pattern.layers, vec!["domain", "handler", "repository", "usecase"]);
        assert_eq!(pattern.dto_patterns, vec!["UserEntity", "CreateUserRequest"]);
        assert!(pattern.is_dto("CreateUserRequest"));
        assert!(!pattern.is_dto("Server"));
    }

    #[test]
    fn test_mvc_detection() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "models/a.go", "package models\n");
        write(&temp_dir, "views/a.go", "package views\n");
        write(&temp_dir, "controllers/a.go", "package controllers\n");

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();
        assert_eq!(analysis.arch_pattern.kind, ArchitectureKind::Mvc);
        assert!((analysis.arch_pattern.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_microservice_detection() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            "main.go",
            "package main\nimport \"google.golang.org/grpc\"\n",
        );
        write(&temp_dir, "config/config.go", "package config\n");

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();
        assert_eq!(analysis.arch_pattern.kind, ArchitectureKind::Microservice);
        assert!((analysis.arch_pattern.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_architecture_when_nothing_matches() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "lib/a.go", "package zebra\n");

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();
        assert_eq!(analysis.arch_pattern.kind, ArchitectureKind::Unknown);
        assert_eq!(analysis.arch_pattern.confidence, 0.0);
        assert_eq!(analysis.arch_pattern.kind.to_string(), "unknown");
    }

    #[test]
    fn test_last_declaration_wins() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "a.go", "package api\ntype Item struct { A int }\n");
        write(&temp_dir, "b.go", "package api\ntype Item struct { B int; C int }\n");

        let analysis = ProjectAnalyzer::analyze(temp_dir.path()).unwrap();
        assert_eq!(analysis.structs["api.Item"].fields.len(), 2);
        assert_eq!(analysis.packages["api"].files, vec!["a.go", "b.go"]);
    }
}
