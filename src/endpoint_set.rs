use crate::extractor::{Endpoint, ANY_METHOD};
use log::debug;
use std::collections::HashSet;

/// Ordered, deduplicating collection of discovered endpoints.
///
/// Two endpoints are the same when method, path, source file and tag list agree. The
/// first one inserted is kept and later duplicates are dropped, so annotation
/// endpoints (inserted first for a file) win over recognized calls.
#[derive(Debug, Default)]
pub struct EndpointSet {
    endpoints: Vec<Endpoint>,
    seen: HashSet<String>,
}

impl EndpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes and inserts `endpoint`; returns false if an equal endpoint exists.
    ///
    /// The method is upper-cased (empty becomes `ANY`) and the path gets a leading
    /// slash.
    pub fn insert(&mut self, mut endpoint: Endpoint) -> bool {
        endpoint.method = endpoint.method.trim().to_uppercase();
        if endpoint.method.is_empty() {
            endpoint.method = ANY_METHOD.to_string();
        }
        if !endpoint.path.starts_with('/') {
            endpoint.path = format!("/{}", endpoint.path);
        }

        let key = format!(
            "{} {} {} {}",
            endpoint.method,
            endpoint.path,
            endpoint.source_file,
            endpoint.tags.join(",")
        );
        if !self.seen.insert(key) {
            debug!(
                "Skipping duplicate endpoint {} {} from {}",
                endpoint.method, endpoint.path, endpoint.source_file
            );
            return false;
        }

        self.endpoints.push(endpoint);
        true
    }

    pub fn extend(&mut self, endpoints: impl IntoIterator<Item = Endpoint>) {
        for endpoint in endpoints {
            self.insert(endpoint);
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoints in insertion order.
    pub fn into_vec(self) -> Vec<Endpoint> {
        self.endpoints
    }
}
