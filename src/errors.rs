use thiserror::Error;

use std::path::PathBuf;

/// Failures tied to a single course, folder or file. They are collected in
/// the mirror report instead of being returned early: one bad entry must
/// not take its siblings down with it.
#[derive(Debug, Error)]
pub enum SyncError {
	#[error("request for {url} failed: {source:#}")]
	Transport { url: String, source: anyhow::Error },
	#[error("unexpected page structure at {url}: {what}")]
	Parse { url: String, what: String },
	#[error("{} already exists and is not a directory", .path.display())]
	NameCollision { path: PathBuf },
	#[error("{}: {source:#}", .path.display())]
	Filesystem { path: PathBuf, source: anyhow::Error },
	#[error("folder nesting deeper than {limit} levels at {url}")]
	DepthExceeded { url: String, limit: usize },
}
