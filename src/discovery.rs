//! The endpoint discovery pipeline.
//!
//! Discovery runs in three stages over a Go source tree:
//!
//! 1. scan the tree and parse every non-test `.go` file once;
//! 2. index the project and compute the example body of every function that reads one;
//! 3. per file, in walk order, collect annotation endpoints and then recognized route
//!    calls into one deduplicating [`EndpointSet`].

use crate::annotations::AnnotationParser;
use crate::body_detector::HandlerBodies;
use crate::endpoint_set::EndpointSet;
use crate::extractor::{Endpoint, RouteCallRecognizer};
use crate::parser::{GoParser, ParsedFile};
use crate::project_analyzer::ProjectAnalyzer;
use crate::scanner::FileScanner;
use anyhow::Result;
use log::{debug, info, warn};
use std::path::Path;

/// Options accepted by [`discover_endpoints`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Build tags such as `dev,integration`. Files are analyzed syntactically, so
    /// constraints are not evaluated and the tags are only recorded.
    pub build_tags: Vec<String>,
}

impl ScanOptions {
    /// Parses a comma-separated tag list, ignoring blanks.
    pub fn with_build_tags(tags: &str) -> Self {
        Self {
            build_tags: tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Discovers every endpoint declared or registered under `root`.
///
/// # Arguments
///
/// * `root` - Root directory of the Go project
/// * `options` - Scan options
///
/// # Returns
///
/// Returns the deduplicated endpoints in discovery order.
///
/// # Errors
///
/// Returns an error naming the file if any source file cannot be read or parsed.
pub fn discover_endpoints(root: &Path, options: &ScanOptions) -> Result<Vec<Endpoint>> {
    if !options.build_tags.is_empty() {
        debug!(
            "Build tags {:?} are recorded but not evaluated",
            options.build_tags
        );
    }

    info!("Scanning {} for Go files...", root.display());
    let scan = FileScanner::new(root.to_path_buf()).scan()?;
    for warning in &scan.warnings {
        warn!("{}", warning);
    }
    info!("Found {} Go files", scan.go_files.len());

    let files = GoParser::parse_files(&scan.go_files)?;

    Ok(discover_in_files(root, &files))
}

/// Runs the analysis and recognition stages over already-parsed files.
pub fn discover_in_files(root: &Path, files: &[ParsedFile]) -> Vec<Endpoint> {
    info!("Analyzing project structure...");
    let analysis = ProjectAnalyzer::analyze_files(root, files);
    let bodies = HandlerBodies::collect(files, &analysis);
    debug!("{} handlers read a request body", bodies.len());

    info!("Extracting endpoints...");
    let recognizer = RouteCallRecognizer::new();
    let mut endpoints = EndpointSet::new();
    for file in files {
        let annotated = AnnotationParser::parse(file);
        let recognized = recognizer.recognize(file, &bodies);
        debug!(
            "{}: {} annotated, {} recognized",
            file.display_path(),
            annotated.len(),
            recognized.len()
        );
        endpoints.extend(annotated);
        endpoints.extend(recognized);
    }

    info!("Discovered {} endpoints", endpoints.len());
    endpoints.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_build_tag_parsing() {
        let options = ScanOptions::with_build_tags(" dev, ,integration ");
        assert_eq!(options.build_tags, vec!["dev", "integration"]);
        assert!(ScanOptions::with_build_tags("").build_tags.is_empty());
    }

    #[test]
    fn test_annotations_precede_calls_and_win_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            "main.go",
            r#"
package main

func main() {
    r.Get("/v1/users", listUsers)
}

// @route GET /v1/users List every user
func listUsers(w http.ResponseWriter, r *http.Request) {}
"#,
        );

        let endpoints = discover_endpoints(temp_dir.path(), &ScanOptions::default()).unwrap();

        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].description.as_deref(), Some("List every user"));
        assert_eq!(endpoints[0].handler, None);
    }

    #[test]
    fn test_cross_file_handler_body() {
        let temp_dir = TempDir::new().unwrap();
        write(
            &temp_dir,
            "dto/order.go",
            r#"
package dto

type CreateOrderRequest struct {
    Items []string `json:"items"`
    Note  *string  `json:"note,omitempty"`
}
"#,
        );
        write(
            &temp_dir,
            "handlers/order.go",
            r#"
package handlers

func CreateOrder(c *gin.Context) {
    var order dto.CreateOrderRequest
    if err := c.ShouldBindJSON(&order); err != nil {
        return
    }
}
"#,
        );
        write(
            &temp_dir,
            "main.go",
            r#"
package main

func main() {
    r := gin.Default()
    r.POST("/v1/orders", handlers.CreateOrder)
}
"#,
        );

        let endpoints = discover_endpoints(temp_dir.path(), &ScanOptions::default()).unwrap();

        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, "POST");
        assert_eq!(
            endpoints[0].body.as_deref(),
            Some(r#"{"items":["string"],"note":"string"}"#)
        );
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        write(&temp_dir, "main.go", "package main\nfunc main() {\n");

        let result = discover_endpoints(temp_dir.path(), &ScanOptions::default());
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("main.go"));
    }

    #[test]
    fn test_empty_tree_yields_no_endpoints() {
        let temp_dir = TempDir::new().unwrap();
        let endpoints = discover_endpoints(temp_dir.path(), &ScanOptions::default()).unwrap();
        assert!(endpoints.is_empty());
    }
}
