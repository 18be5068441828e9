//! Postman From Source - Postman collections from the routes of Go web projects.
//!
//! The library statically analyzes a Go source tree, finds the HTTP endpoints it
//! registers or documents, infers example request bodies, and renders the result as a
//! Postman Collection v2.1 document.
//!
//! # Recognized sources
//!
//! - Route registration calls of chi, echo, gin, fiber and gorilla/mux style routers
//! - `@route`, `@rest` and `@graphql` comment annotations
//!
//! # Architecture
//!
//! 1. [`scanner`] - Recursively scans the project for Go source files
//! 2. [`parser`] - Parses Go sources into syntax trees
//! 3. [`project_analyzer`] - Indexes structs, interfaces, functions and packages
//! 4. [`body_detector`] - Infers the example body each handler reads
//! 5. [`annotations`] and [`extractor`] - Produce endpoints from comments and calls
//! 6. [`endpoint_set`] - Deduplicates endpoints in discovery order
//! 7. [`discovery`] - Runs the stages above over a project
//! 8. [`collection_builder`] and [`environment`] - Render Postman documents
//! 9. [`serializer`] - Serializes documents to JSON or YAML
//!
//! # Example Usage
//!
//! ```no_run
//! use postman_from_source::{
//!     collection_builder::{CollectionBuilder, CollectionOptions},
//!     discovery::{discover_endpoints, ScanOptions},
//!     serializer::serialize_json,
//! };
//! use std::path::Path;
//!
//! let endpoints = discover_endpoints(Path::new("./my-service"), &ScanOptions::default()).unwrap();
//!
//! let mut builder = CollectionBuilder::new(CollectionOptions::default());
//! builder.add_endpoints(endpoints);
//! let collection = builder.build();
//!
//! println!("{}", serialize_json(&collection).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod annotations;
pub mod body_detector;
pub mod cli;
pub mod collection_builder;
pub mod discovery;
pub mod endpoint_set;
pub mod environment;
pub mod error;
pub mod example_generator;
pub mod extractor;
pub mod parser;
pub mod project_analyzer;
pub mod scanner;
pub mod serializer;
pub mod type_resolver;
