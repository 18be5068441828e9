use crate::collection_builder::{CollectionBuilder, CollectionOptions};
use crate::discovery::{discover_endpoints, ScanOptions};
use crate::environment::build_environment;
use crate::error::Error;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Postman From Source - Generate a Postman collection from the routes of a Go project
#[derive(Parser, Debug)]
#[command(name = "postman-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Go project directory
    #[arg(value_name = "PROJECT_PATH", default_value = ".")]
    pub project_path: PathBuf,

    /// Collection name
    #[arg(short = 'n', long = "name", default_value = "Go API")]
    pub name: String,

    /// Value of the {{baseUrl}} variable
    #[arg(long = "base-url", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Output format (json or yaml)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Number of leading path segments turned into folders (0 = no folders)
    #[arg(long = "group-depth", default_value_t = 1, allow_negative_numbers = true)]
    pub group_depth: i32,

    /// Place requests in one folder per HTTP method
    #[arg(long = "group-by-method")]
    pub group_by_method: bool,

    /// Append a "By Tag" folder tree
    #[arg(long = "tag-folders")]
    pub tag_folders: bool,

    /// Comma-separated build tags
    #[arg(long = "build-tags", default_value = "")]
    pub build_tags: String,

    /// Write a Postman environment file to this path
    #[arg(long = "env-out", value_name = "FILE")]
    pub env_out: Option<PathBuf>,

    /// Name of the generated environment
    #[arg(long = "env-name", default_value = "Local")]
    pub env_name: String,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl CliArgs {
    pub fn collection_options(&self) -> CollectionOptions {
        CollectionOptions {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            group_depth: self.group_depth,
            group_by_method: self.group_by_method,
            tag_folders: self.tag_folders,
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::with_build_tags(&self.build_tags)
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(Error::InvalidArgument(format!(
            "Project path does not exist: {}",
            args.project_path.display()
        )));
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(Error::InvalidArgument(format!(
            "Project path is not a directory: {}",
            args.project_path.display()
        )));
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting Postman collection generation...");

    // Step 1: Discover endpoints
    let endpoints = discover_endpoints(&args.project_path, &args.scan_options())
        .with_context(|| format!("Failed to scan {}", args.project_path.display()))?;
    let endpoint_count = endpoints.len();

    if endpoints.is_empty() {
        warn!("No endpoints found. Tip: use @route for dynamic routes.");
    }

    // Step 2: Build the collection
    info!("Building collection...");
    let mut builder = CollectionBuilder::new(args.collection_options());
    builder.add_endpoints(endpoints);
    let collection = builder.build();

    // Step 3: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Json => serialize_json(&collection)?,
        OutputFormat::Yaml => serialize_yaml(&collection)?,
    };

    // Step 4: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    } else {
        println!("{}", content);
    }

    // Step 5: Environment
    if let Some(env_path) = &args.env_out {
        info!("Writing environment '{}' to: {}", args.env_name, env_path.display());
        let environment = build_environment(&args.env_name, &args.base_url);
        write_to_file(&serialize_json(&environment)?, env_path)
            .with_context(|| format!("Failed to write {}", env_path.display()))?;
    }

    info!("Generation complete!");
    info!("  - Endpoints: {}", endpoint_count);

    Ok(())
}
