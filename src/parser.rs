use crate::error::Error;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Syntax tree parser for Go source files.
///
/// The `GoParser` uses `tree-sitter` with the Go grammar to parse source code into a
/// concrete syntax tree, which can then be analyzed to extract route registrations,
/// struct definitions, comment directives and request body idioms.
///
/// Parsing is strict: tree-sitter recovers from syntax errors, but a tree that contains
/// error or missing nodes is reported as a parse failure so that a malformed file
/// never silently contributes partial results.
///
/// # Example
///
/// ```no_run
/// use postman_from_source::parser::GoParser;
/// use std::path::Path;
///
/// let parsed = GoParser::parse_file(Path::new("cmd/api/main.go")).unwrap();
/// println!("Package root has {} children", parsed.root_node().child_count());
/// ```
pub struct GoParser;

/// A successfully parsed Go file with its syntax tree.
///
/// The tree only stores byte offsets, so the source text is kept alongside it.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The original source text
    pub source: String,
    /// The parsed syntax tree
    pub tree: Tree,
}

impl ParsedFile {
    /// Returns the `source_file` node of the tree.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Returns the source text covered by `node`.
    pub fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// The path as it is reported on endpoints and definitions.
    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    /// Name from the `package` clause, or an empty string for a file without one.
    pub fn package_name(&self) -> String {
        let root = self.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "package_clause" {
                let mut inner = child.walk();
                for part in child.children(&mut inner) {
                    if part.kind() == "package_identifier" {
                        return self.text(part).to_string();
                    }
                }
            }
        }
        String::new()
    }
}

impl GoParser {
    /// Parses a single Go source file into a syntax tree.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the Go source file to parse
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid Go syntax
    pub fn parse_file(path: &Path) -> Result<ParsedFile> {
        debug!("Parsing file: {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let parsed = Self::parse_source(path, content)
            .with_context(|| format!("Failed to parse Go syntax in file: {}", path.display()))?;

        debug!("Successfully parsed file: {}", path.display());
        Ok(parsed)
    }

    /// Parses in-memory Go source, attributing it to `path`.
    pub fn parse_source(path: &Path, source: String) -> crate::error::Result<ParsedFile> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;

        let tree = parser.parse(&source, None).ok_or_else(|| Error::ParseError {
            file: path.to_path_buf(),
            message: "parser produced no tree".to_string(),
        })?;

        if tree.root_node().has_error() {
            let (row, column) = first_error_position(tree.root_node());
            return Err(Error::ParseError {
                file: path.to_path_buf(),
                message: format!("syntax error at line {}, column {}", row + 1, column + 1),
            });
        }

        Ok(ParsedFile {
            path: path.to_path_buf(),
            source,
            tree,
        })
    }

    /// Parses every file and stops at the first failure.
    ///
    /// A scan treats any unparsable file as fatal, so unlike a best-effort batch parse
    /// this returns the first error instead of collecting partial results.
    pub fn parse_files(paths: &[PathBuf]) -> Result<Vec<ParsedFile>> {
        debug!("Parsing {} files", paths.len());

        let mut parsed = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::parse_file(path) {
                Ok(file) => parsed.push(file),
                Err(e) => {
                    warn!("Failed to parse {}: {:#}", path.display(), e);
                    return Err(e);
                }
            }
        }

        debug!("Parsing complete: {} files", parsed.len());
        Ok(parsed)
    }
}

/// Row and column of the first error or missing node in pre-order.
fn first_error_position(root: Node) -> (usize, usize) {
    let mut position = (root.start_position().row, root.start_position().column);
    let mut found = false;
    walk_preorder(root, |node| {
        if found {
            return false;
        }
        if node.is_error() || node.is_missing() {
            position = (node.start_position().row, node.start_position().column);
            found = true;
            return false;
        }
        node.has_error()
    });
    position
}

/// Visits `root` and its descendants in syntax order.
///
/// Returning `false` from `visit` skips the children of the visited node, mirroring
/// the classic inspect-style traversal.
pub fn walk_preorder<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>) -> bool) {
    let mut cursor = root.walk();
    loop {
        let descend = visit(cursor.node());
        if descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.node().id() == root.id() {
                return;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Collects every descendant of `root` (including itself) with the given kind.
pub fn nodes_of_kind<'t>(root: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut nodes = Vec::new();
    walk_preorder(root, |node| {
        if node.kind() == kind {
            nodes.push(node);
        }
        true
    });
    nodes
}

/// Named children of `node` that are not comments.
pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Value of a Go string literal node, or `None` if `node` is not a valid string literal.
pub fn string_literal_value(file: &ParsedFile, node: Node) -> Option<String> {
    match node.kind() {
        "interpreted_string_literal" | "raw_string_literal" => unquote(file.text(node)),
        _ => None,
    }
}

/// Decodes a quoted Go string literal (`"..."` or `` `...` ``).
///
/// Supports the escape sequences Go allows in interpreted literals; anything else makes
/// the literal invalid.
pub fn unquote(literal: &str) -> Option<String> {
    if literal.len() >= 2 && literal.starts_with('`') && literal.ends_with('`') {
        return Some(literal[1..literal.len() - 1].replace('\r', ""));
    }
    if literal.len() < 2 || !literal.starts_with('"') || !literal.ends_with('"') {
        return None;
    }

    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\n' || c == '"' {
            return None;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            d @ '0'..='7' => {
                let mut value = d.to_digit(8)?;
                for _ in 0..2 {
                    value = value * 8 + chars.next()?.to_digit(8)?;
                }
                out.push(char::from_u32(value)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

fn hex_escape(chars: &mut std::str::Chars, digits: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..digits {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Helper function to create a temporary file with content
    fn create_temp_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        let mut file = fs::File::create(&file_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file_path
    }

    #[test]
    fn test_parse_valid_go_file() {
        let temp_dir = TempDir::new().unwrap();
        let valid_code = r#"
package users

import "net/http"

type User struct {
    ID   int    `json:"id"`
    Name string `json:"name"`
}

func GetUser(w http.ResponseWriter, r *http.Request) {}
"#;

        let file_path = create_temp_file(&temp_dir, "users.go", valid_code);
        let result = GoParser::parse_file(&file_path);

        assert!(result.is_ok());
        let parsed = result.unwrap();
        assert_eq!(parsed.path, file_path);
        assert_eq!(parsed.package_name(), "users");
        assert!(parsed.root_node().named_child_count() >= 4);
    }

    #[test]
    fn test_parse_invalid_go_file() {
        let temp_dir = TempDir::new().unwrap();
        let invalid_code = r#"
package main

func broken( {
    x :=
}
"#;

        let file_path = create_temp_file(&temp_dir, "invalid.go", invalid_code);
        let result = GoParser::parse_file(&file_path);

        assert!(result.is_err());
        let err_msg = format!("{:#}", result.unwrap_err());
        assert!(err_msg.contains("Failed to parse Go syntax"));
        assert!(err_msg.contains("invalid.go"));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = GoParser::parse_file(Path::new("/nonexistent/file.go"));

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Failed to read file"));
    }

    #[test]
    fn test_parse_files_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();

        let file1 = create_temp_file(&temp_dir, "a.go", "package a\n");
        let file2 = create_temp_file(&temp_dir, "b.go", "package b\nfunc ( {\n");
        let file3 = create_temp_file(&temp_dir, "c.go", "package c\n");

        let result = GoParser::parse_files(&[file1, file2, file3]);
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("b.go"));
    }

    #[test]
    fn test_parse_files_all_valid() {
        let temp_dir = TempDir::new().unwrap();

        let file1 = create_temp_file(&temp_dir, "a.go", "package a\nfunc A() {}\n");
        let file2 = create_temp_file(&temp_dir, "b.go", "package a\nfunc B() {}\n");

        let parsed = GoParser::parse_files(&[file1, file2]).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_walk_preorder_visits_outer_call_first() {
        let parsed = GoParser::parse_source(
            Path::new("calls.go"),
            "package p\nfunc f() { a.B(c.D()) }\n".to_string(),
        )
        .unwrap();

        let calls: Vec<String> = nodes_of_kind(parsed.root_node(), "call_expression")
            .into_iter()
            .map(|n| parsed.text(n).to_string())
            .collect();
        assert_eq!(calls, vec!["a.B(c.D())".to_string(), "c.D()".to_string()]);
    }

    #[test]
    fn test_unquote_literals() {
        assert_eq!(unquote(r#""/v1/users""#), Some("/v1/users".to_string()));
        assert_eq!(unquote("`/raw/path`"), Some("/raw/path".to_string()));
        assert_eq!(unquote(r#""a\tbé""#), Some("a\tb\u{e9}".to_string()));
        assert_eq!(unquote(r#""\101""#), Some("A".to_string()));
        assert_eq!(unquote(r#""bad\q""#), None);
        assert_eq!(unquote("/no/quotes"), None);
    }
}
