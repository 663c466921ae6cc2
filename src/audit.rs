//! # Content Tree Audit Module
//!
//! Walks a hierarchical content store and logs every binary-typed property.
//!
//! ## Responsibilities:
//! - Visits every node under the root exactly once (explicit stack, pre-order)
//! - Logs a running node number and path for each node
//! - Logs a running number and path for each binary property
//! - Asks the version tracker how many versions a binary property's node has
//! - Keeps going when a single node or property cannot be read
//!
//! Counters live in the returned `AuditSummary`, so two audits never share
//! state.
//!
//! ## Filesystem store:
//! `FsNode` maps directories to nodes and files to properties. A file is
//! binary when its header is a known image format, contains NUL bytes, or is
//! not UTF-8. Symlinks are not followed.

use crate::error::OptimizeError;
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Bytes inspected when classifying a file
const SNIFF_LEN: u64 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Binary,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub path: String,
    pub kind: PropertyType,
}

/// A node in a hierarchical content store
pub trait ContentNode: Sized {
    fn path(&self) -> String;
    /// Properties of the node. The outer error means the node could not be
    /// listed at all; an inner error affects only that one property.
    fn properties(&self) -> Result<Vec<Result<Property, OptimizeError>>, OptimizeError>;
    fn children(&self) -> Result<Vec<Self>, OptimizeError>;
}

/// Version history lookup for a node path
pub trait VersionTracker {
    /// Number of recorded versions, `None` when the path is not versioned
    fn version_count(&self, path: &str) -> Result<Option<usize>, OptimizeError>;
}

/// Store without version history
#[derive(Debug, Clone, Copy, Default)]
pub struct Unversioned;

impl VersionTracker for Unversioned {
    fn version_count(&self, _path: &str) -> Result<Option<usize>, OptimizeError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub nodes_visited: u64,
    pub binary_properties: u64,
    /// Nodes whose properties or children could not be listed
    pub failed_nodes: u64,
    /// Properties that could not be read on an otherwise readable node
    pub failed_properties: u64,
}

/// Audit every node reachable from `root`
pub fn audit<N, V>(root: N, versions: &V) -> AuditSummary
where
    N: ContentNode,
    V: VersionTracker,
{
    let mut summary = AuditSummary::default();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let node_path = node.path();
        info!("#{}: {}", summary.nodes_visited, node_path);
        summary.nodes_visited += 1;

        let mut failed = false;
        match node.properties() {
            Ok(properties) => {
                let mut binaries = Vec::new();
                for property in properties {
                    match property {
                        Ok(property) if property.kind == PropertyType::Binary => binaries.push(property),
                        Ok(_) => {}
                        Err(e) => {
                            error!("{}", e);
                            summary.failed_properties += 1;
                        }
                    }
                }
                for property in &binaries {
                    info!("**** #{}: {}", summary.binary_properties, property.path);
                    summary.binary_properties += 1;

                    match versions.version_count(&node_path) {
                        Ok(Some(count)) => debug!("       {} version(s) of {}", count, node_path),
                        Ok(None) => {}
                        Err(e) => debug!("Version lookup failed for {}: {}", node_path, e),
                    }
                }
            }
            Err(e) => {
                error!("{}", e);
                failed = true;
            }
        }

        match node.children() {
            Ok(children) => stack.extend(children.into_iter().rev()),
            Err(e) => {
                error!("{}", e);
                failed = true;
            }
        }

        if failed {
            summary.failed_nodes += 1;
        }
    }

    summary
}

/// Directory in a filesystem-backed store
#[derive(Debug, Clone)]
pub struct FsNode {
    path: PathBuf,
}

impl FsNode {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn entries(&self) -> Result<Vec<fs::DirEntry>, OptimizeError> {
        let store_error = |e: std::io::Error| OptimizeError::Audit {
            path: self.path.display().to_string(),
            message: e.to_string(),
        };

        let mut entries = fs::read_dir(&self.path)
            .map_err(store_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(store_error)?;
        entries.sort_by_key(|e| e.file_name());
        Ok(entries)
    }
}

impl ContentNode for FsNode {
    fn path(&self) -> String {
        self.path.display().to_string()
    }

    fn properties(&self) -> Result<Vec<Result<Property, OptimizeError>>, OptimizeError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| {
                let path = entry.path().display().to_string();
                match sniff_property_type(&entry.path()) {
                    Ok(kind) => Ok(Property { path, kind }),
                    Err(e) => Err(OptimizeError::Audit {
                        path,
                        message: e.to_string(),
                    }),
                }
            })
            .collect())
    }

    fn children(&self) -> Result<Vec<Self>, OptimizeError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| Self::new(e.path()))
            .collect())
    }
}

/// Classify a file by its first bytes
pub fn sniff_property_type(path: &Path) -> std::io::Result<PropertyType> {
    let mut header = Vec::new();
    fs::File::open(path)?.take(SNIFF_LEN).read_to_end(&mut header)?;
    Ok(classify_bytes(&header))
}

fn classify_bytes(bytes: &[u8]) -> PropertyType {
    if image::guess_format(bytes).is_ok() || bytes.contains(&0) {
        return PropertyType::Binary;
    }
    match std::str::from_utf8(bytes) {
        Ok(_) => PropertyType::Text,
        // a multi-byte character cut at the sniff boundary is still text
        Err(e) if e.error_len().is_none() => PropertyType::Text,
        Err(_) => PropertyType::Binary,
    }
}
