use crate::extractor::{Endpoint, EndpointKind};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Schema URL of Postman Collection v2.1 documents.
pub const COLLECTION_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Name of the variable every request URL is built on.
pub const BASE_URL_VARIABLE: &str = "baseUrl";

/// Name of the auxiliary folder that groups requests by tag.
pub const TAG_FOLDER_NAME: &str = "By Tag";

/// Rendering options for a collection.
#[derive(Debug, Clone)]
pub struct CollectionOptions {
    /// Collection name
    pub name: String,
    /// Initial value of `{{baseUrl}}`
    pub base_url: String,
    /// Number of leading path segments turned into folders; 0 or less disables folders
    pub group_depth: i32,
    /// Place requests in one sub-folder per HTTP method
    pub group_by_method: bool,
    /// Append a "By Tag" folder tree
    pub tag_folders: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            name: "Go API".to_string(),
            base_url: "http://localhost:8080".to_string(),
            group_depth: 1,
            group_by_method: false,
            tag_folders: false,
        }
    }
}

/// Postman Collection v2.1 document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub info: Info,
    pub item: Vec<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variable: Vec<Variable>,
}

/// Collection metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Info {
    pub name: String,
    #[serde(rename = "_postman_id")]
    pub postman_id: String,
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A request (leaf) or a folder of items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<Item>,
}

impl Item {
    fn folder(name: impl Into<String>, item: Vec<Item>) -> Self {
        Self {
            name: name.into(),
            request: None,
            response: Vec::new(),
            item,
        }
    }

    /// Folders are the items without a request.
    pub fn is_folder(&self) -> bool {
        self.request.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub method: String,
    pub header: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    pub url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Header {
    pub key: String,
    pub value: String,
}

/// Raw request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Body {
    pub mode: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BodyOptions>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodyOptions {
    pub raw: RawOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawOptions {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Url {
    pub raw: String,
    pub host: Vec<String>,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Collection builder
///
/// Collects endpoints and renders them as a folder tree once all are known.
///
/// # Example
///
/// ```
/// use postman_from_source::collection_builder::{CollectionBuilder, CollectionOptions};
/// use postman_from_source::extractor::Endpoint;
///
/// let mut builder = CollectionBuilder::new(CollectionOptions::default());
/// builder.add_endpoint(Endpoint::new("GET", "/v1/users", "main.go"));
/// let collection = builder.build();
/// assert_eq!(collection.item[0].name, "v1");
/// ```
pub struct CollectionBuilder {
    options: CollectionOptions,
    endpoints: Vec<Endpoint>,
}

impl CollectionBuilder {
    pub fn new(options: CollectionOptions) -> Self {
        Self {
            options,
            endpoints: Vec::new(),
        }
    }

    pub fn add_endpoint(&mut self, endpoint: Endpoint) {
        debug!("Adding request: {} {}", endpoint.method, endpoint.path);
        self.endpoints.push(endpoint);
    }

    pub fn add_endpoints(&mut self, endpoints: impl IntoIterator<Item = Endpoint>) {
        for endpoint in endpoints {
            self.add_endpoint(endpoint);
        }
    }

    /// Build the final collection document
    ///
    /// Requests are ordered by path, then method, then source file.
    pub fn build(mut self) -> Collection {
        sort_endpoints(&mut self.endpoints);
        let depth = usize::try_from(self.options.group_depth).unwrap_or(0);

        let mut tree = Vec::new();
        for endpoint in &self.endpoints {
            let leaf = leaf_item(endpoint);
            if depth == 0 {
                if self.options.group_by_method {
                    let method_folder = Item::folder(endpoint.method.to_uppercase(), vec![leaf]);
                    insert_child(&mut tree, method_folder, true);
                } else {
                    tree.push(leaf);
                }
                continue;
            }

            let segments = split_path(&endpoint.path);
            let group: Vec<String> = segments.into_iter().take(depth).collect();
            if self.options.group_by_method {
                let method_folder = Item::folder(endpoint.method.to_uppercase(), vec![leaf]);
                insert_into_folders(&mut tree, &group, method_folder, true);
            } else {
                insert_into_folders(&mut tree, &group, leaf, false);
            }
        }

        if self.options.tag_folders {
            let by_tag = tag_tree(&self.endpoints);
            if !by_tag.is_empty() {
                tree.push(Item::folder(TAG_FOLDER_NAME, by_tag));
            }
        }

        Collection {
            info: Info {
                name: self.options.name,
                postman_id: uuid::Uuid::new_v4().to_string(),
                schema: COLLECTION_SCHEMA.to_string(),
                description: None,
            },
            item: tree,
            variable: vec![Variable {
                key: BASE_URL_VARIABLE.to_string(),
                value: self.options.base_url,
                kind: Some("string".to_string()),
            }],
        }
    }
}

/// Stable sort by path, then method, then source file.
pub fn sort_endpoints(endpoints: &mut [Endpoint]) {
    endpoints.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then_with(|| a.method.cmp(&b.method))
            .then_with(|| a.source_file.cmp(&b.source_file))
    });
}

fn leaf_item(endpoint: &Endpoint) -> Item {
    Item {
        name: format!("{} {}", endpoint.method.to_uppercase(), endpoint.path)
            .trim()
            .to_string(),
        request: Some(build_request(endpoint)),
        response: Vec::new(),
        item: Vec::new(),
    }
}

fn build_request(endpoint: &Endpoint) -> Request {
    let mut header: Vec<Header> = endpoint
        .headers
        .iter()
        .map(|(key, value)| Header {
            key: key.clone(),
            value: value.clone(),
        })
        .collect();

    let raw_body = match endpoint.kind {
        EndpointKind::GraphQl => Some(graphql_body(endpoint)),
        EndpointKind::Rest => endpoint.body.clone().filter(|b| !b.is_empty()),
    };

    let body = raw_body.map(|raw| {
        let has_content_type = header
            .iter()
            .any(|h| h.key.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            header.push(Header {
                key: "Content-Type".to_string(),
                value: "application/json".to_string(),
            });
        }
        Body {
            mode: "raw".to_string(),
            raw,
            options: Some(BodyOptions {
                raw: RawOptions {
                    language: "json".to_string(),
                },
            }),
        }
    });

    Request {
        method: endpoint.method.clone(),
        header,
        body,
        url: build_url(&endpoint.path),
        description: Some(describe(endpoint)),
    }
}

/// `{"query": ..., "variables": ...}`, with a placeholder query per operation.
fn graphql_body(endpoint: &Endpoint) -> String {
    let info = endpoint.graphql.as_ref();

    let query = match info {
        Some(info) if !info.query.is_empty() => info.query.clone(),
        Some(info) => default_graphql_query(&info.operation).to_string(),
        None => default_graphql_query("query").to_string(),
    };

    let mut body = Map::new();
    body.insert("query".to_string(), Value::String(query));
    if let Some(info) = info.filter(|i| !i.variables.is_empty()) {
        body.insert("variables".to_string(), Value::String(info.variables.clone()));
    }
    Value::Object(body).to_string()
}

fn default_graphql_query(operation: &str) -> &'static str {
    match operation {
        "mutation" => "mutation { # Add your mutation here }",
        "subscription" => "subscription { # Add your subscription here }",
        _ => "query { # Add your query here }",
    }
}

/// The endpoint description, or a summary of where it was found.
fn describe(endpoint: &Endpoint) -> String {
    if let Some(description) = endpoint.description.as_ref().filter(|d| !d.is_empty()) {
        return description.clone();
    }

    let mut text = format!("Source: {}", endpoint.source_file);
    if let Some(handler) = endpoint.handler.as_ref().filter(|h| !h.is_empty()) {
        text.push_str(&format!(" | Handler: {}", handler));
    }
    text.push_str(&format!(" | Type: {}", endpoint.kind));
    if endpoint.kind == EndpointKind::GraphQl {
        if let Some(info) = endpoint.graphql.as_ref().filter(|i| !i.operation.is_empty()) {
            text.push_str(&format!(" | Operation: {}", info.operation));
        }
    }
    text
}

fn build_url(path: &str) -> Url {
    let clean = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    Url {
        raw: format!("{{{{{}}}}}{}", BASE_URL_VARIABLE, clean),
        host: vec![format!("{{{{{}}}}}", BASE_URL_VARIABLE)],
        path: split_path(path),
    }
}

/// Non-empty path segments; the root path yields a single empty segment.
fn split_path(path: &str) -> Vec<String> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return vec![String::new()];
    }
    trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn insert_into_folders(
    tree: &mut Vec<Item>,
    group: &[String],
    child: Item,
    child_is_method_folder: bool,
) {
    let Some((head, rest)) = group.split_first() else {
        insert_child(tree, child, child_is_method_folder);
        return;
    };
    if head.is_empty() && rest.is_empty() {
        insert_child(tree, child, child_is_method_folder);
        return;
    }

    let index = match tree.iter().position(|i| i.is_folder() && &i.name == head) {
        Some(index) => index,
        None => {
            tree.push(Item::folder(head.clone(), Vec::new()));
            tree.len() - 1
        }
    };
    insert_into_folders(&mut tree[index].item, rest, child, child_is_method_folder);
}

/// Appends `child`, merging a method folder into an existing folder of the same name.
fn insert_child(tree: &mut Vec<Item>, child: Item, child_is_method_folder: bool) {
    if child_is_method_folder {
        if let Some(existing) = tree
            .iter_mut()
            .find(|i| i.is_folder() && i.name == child.name)
        {
            existing.item.extend(child.item);
            return;
        }
    }
    tree.push(child);
}

fn tag_tree(endpoints: &[Endpoint]) -> Vec<Item> {
    let mut buckets: BTreeMap<String, Vec<Item>> = BTreeMap::new();
    for endpoint in endpoints {
        if endpoint.tags.is_empty() {
            continue;
        }
        let leaf = leaf_item(endpoint);
        for tag in endpoint.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            buckets.entry(tag.to_string()).or_default().push(leaf.clone());
        }
    }
    buckets
        .into_iter()
        .map(|(tag, items)| Item::folder(tag, items))
        .collect()
}
