use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names that never contain project sources worth scanning.
const SKIPPED_DIRS: &[&str] = &[
    "vendor",
    "node_modules",
    "__pycache__",
    "build",
    "dist",
    "bin",
    "target",
];

/// File scanner for traversing Go project directories.
///
/// The `FileScanner` recursively walks through a project directory to find all Go source
/// files. It skips hidden directories (those starting with `.`), vendored and build output
/// directories, and `_test.go` files. Entries are visited in file-name order so that two
/// scans of the same tree always produce the same file list.
///
/// # Example
///
/// ```no_run
/// use postman_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-service"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Go files", result.go_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of directory scanning operation.
///
/// Contains the list of discovered Go files and any warnings encountered during scanning.
pub struct ScanResult {
    /// Paths to all discovered non-test `.go` files, in walk order
    pub go_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a new `FileScanner` for the specified root directory.
    ///
    /// # Arguments
    ///
    /// * `root_path` - The root directory to scan for Go files
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all non-test `.go` files.
    ///
    /// If any directories or files cannot be accessed, warnings are logged and added to
    /// the result, but scanning continues.
    ///
    /// # Returns
    ///
    /// Returns a `ScanResult` containing the list of discovered files and any warnings.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut go_files = Vec::new();
        let mut warnings = Vec::new();

        let walker = WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.path() == self.root_path || !is_skipped_dir(e));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file() && is_go_source(path) {
                        debug!("Found Go file: {}", path.display());
                        go_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult { go_files, warnings })
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// True for `.go` files that are not `_test.go` files.
pub fn is_go_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.ends_with("_test.go")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn file_names(result: &ScanResult) -> Vec<String> {
        result
            .go_files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_normal_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("main.go"), "package main").unwrap();
        fs::write(root.join("routes.go"), "package main").unwrap();
        fs::write(root.join("readme.md"), "# README").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(file_names(&result), vec!["main.go", "routes.go"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let scanner = FileScanner::new(temp_dir.path().to_path_buf());
        let result = scanner.scan().unwrap();

        assert!(result.go_files.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_nested_directories_in_sorted_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("internal/handlers")).unwrap();
        fs::create_dir(root.join("cmd")).unwrap();

        fs::write(root.join("main.go"), "package main").unwrap();
        fs::write(root.join("cmd/server.go"), "package cmd").unwrap();
        fs::write(root.join("internal/handlers/users.go"), "package handlers").unwrap();
        fs::write(root.join("internal/handlers/auth.go"), "package handlers").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(
            file_names(&result),
            vec!["server.go", "auth.go", "users.go", "main.go"]
        );
    }

    #[test]
    fn test_scan_skips_test_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("users.go"), "package users").unwrap();
        fs::write(root.join("users_test.go"), "package users").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(file_names(&result), vec!["users.go"]);
    }

    #[test]
    fn test_scan_skips_vendor_and_build_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        for dir in ["vendor", "node_modules", "build", "dist", "bin", "target"] {
            fs::create_dir(root.join(dir)).unwrap();
            fs::write(root.join(dir).join("lib.go"), "package lib").unwrap();
        }
        fs::write(root.join("main.go"), "package main").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(file_names(&result), vec!["main.go"]);
    }

    #[test]
    fn test_scan_skips_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join(".git/hooks.go"), "package hooks").unwrap();
        fs::write(root.join("main.go"), "package main").unwrap();

        let scanner = FileScanner::new(root.to_path_buf());
        let result = scanner.scan().unwrap();

        assert_eq!(file_names(&result), vec!["main.go"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_is_go_source() {
        assert!(is_go_source(Path::new("api/routes.go")));
        assert!(!is_go_source(Path::new("api/routes_test.go")));
        assert!(!is_go_source(Path::new("api/routes.rs")));
        assert!(!is_go_source(Path::new("go.mod")));
    }
}
