// SPDX-License-Identifier: GPL-3.0-or-later

use futures::future::BoxFuture;
use futures_util::{stream, FutureExt, StreamExt};
use tokio::fs;
use tokio_util::io::StreamReader;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::SystemTime;

use crate::cli::{PROGRESS_BAR, PROGRESS_BAR_ENABLED};
use crate::errors::SyncError;
use crate::l2p::L2P;
use crate::tree::{Entry, File, Folder};
use crate::util::{parse_http_date, sanitize, write_file_data};

/// Tally of one mirror run. Counters only ever increase while a sync is in
/// flight, regardless of download completion order.
#[derive(Debug, Default)]
pub struct MirrorReport {
	pub files_checked: usize,
	pub files_written: usize,
	pub files_skipped: usize,
	pub errors: Vec<SyncError>,
}

impl MirrorReport {
	pub fn merge(&mut self, other: MirrorReport) {
		self.files_checked += other.files_checked;
		self.files_written += other.files_written;
		self.files_skipped += other.files_skipped;
		self.errors.extend(other.errors);
	}
}

enum FileOutcome {
	Written,
	Skipped,
}

/// Replays a crawled course tree onto the local filesystem. The filesystem
/// is the only sync state: a file is stale exactly when the remote
/// Last-Modified is strictly newer than the local modification time.
pub struct MirrorEngine {
	l2p: Arc<L2P>,
	jobs: usize,
	force: bool,
}

/// A missing or malformed Last-Modified counts as stale: better to fetch
/// again than to silently keep an outdated copy.
fn needs_refresh(remote: Option<SystemTime>, local_mtime: SystemTime) -> bool {
	match remote {
		Some(remote) => remote > local_mtime,
		None => true,
	}
}

async fn ensure_dir(path: &Path) -> Result<(), SyncError> {
	match fs::metadata(path).await {
		Ok(meta) if meta.is_dir() => Ok(()),
		Ok(_) => Err(SyncError::NameCollision { path: path.to_owned() }),
		Err(_) => fs::create_dir(path).await.map_err(|e| SyncError::Filesystem {
			path: path.to_owned(),
			source: e.into(),
		}),
	}
}

impl MirrorEngine {
	pub fn new(l2p: Arc<L2P>, jobs: usize, force: bool) -> Self {
		MirrorEngine {
			l2p,
			jobs: jobs.max(1),
			force,
		}
	}

	/// Mirrors `tree` below `local_root` (which must already exist),
	/// downloading what is missing or stale. Never fails as a whole:
	/// per-entry problems end up in the report.
	pub async fn mirror(&self, tree: &Folder, local_root: &Path) -> MirrorReport {
		let mut report = MirrorReport::default();
		self.sync_folder(tree, local_root, &mut report).await;
		report
	}

	fn sync_folder<'a>(
		&'a self,
		folder: &'a Folder,
		path: &'a Path,
		report: &'a mut MirrorReport,
	) -> BoxFuture<'a, ()> {
		async move {
			// files first: siblings may download concurrently, while each
			// subfolder is entered only after its directory exists
			let files = folder.children().iter().filter_map(|entry: &Entry| match entry {
				Entry::File(file) => Some(file),
				Entry::Folder(..) => None,
			});
			let outcomes = stream::iter(files.map(|file: &File| self.sync_file(file, path)))
				.buffer_unordered(self.jobs)
				.collect::<Vec<_>>()
				.await;
			for outcome in outcomes {
				report.files_checked += 1;
				match outcome {
					Ok(FileOutcome::Written) => report.files_written += 1,
					Ok(FileOutcome::Skipped) => report.files_skipped += 1,
					Err(e) => {
						warning!(e);
						report.errors.push(e);
					},
				}
			}
			for entry in folder.children() {
				if let Entry::Folder(sub) = entry {
					let dir = path.join(sanitize(&sub.name));
					match ensure_dir(&dir).await {
						Ok(()) => self.sync_folder(sub, &dir, report).await,
						Err(e) => {
							// a collision or unwritable directory takes this
							// subtree out, siblings keep going
							warning!(e);
							report.errors.push(e);
						},
					}
				}
			}
		}
		.boxed()
	}

	async fn sync_file(&self, file: &File, dir: &Path) -> Result<FileOutcome, SyncError> {
		let target = dir.join(&file.name);
		if PROGRESS_BAR_ENABLED.load(Ordering::SeqCst) {
			PROGRESS_BAR.inc(1);
			PROGRESS_BAR.set_message(target.display().to_string());
		}
		let local = match fs::metadata(&target).await {
			Ok(meta) if meta.is_dir() => return Err(SyncError::NameCollision { path: target }),
			Ok(meta) => Some(meta),
			Err(_) => None,
		};
		let resp = self.l2p.download(&file.url).await.map_err(|source| SyncError::Transport {
			url: file.url.to_string(),
			source,
		})?;
		if let Some(meta) = &local {
			if !self.force {
				let remote_mtime = resp.last_modified.as_deref().and_then(parse_http_date);
				if remote_mtime.is_none() {
					warning!(format => "no usable Last-Modified for {}, downloading again", file.name);
				}
				let local_mtime = meta.modified().map_err(|e| SyncError::Filesystem {
					path: target.clone(),
					source: e.into(),
				})?;
				if !needs_refresh(remote_mtime, local_mtime) {
					log!(2, "Skipping {}, local copy is current", file.name);
					return Ok(FileOutcome::Skipped);
				}
			}
		}
		log!(0, "Writing {}", target.display());
		let mut reader = StreamReader::new(resp.body);
		write_file_data(&target, &mut reader)
			.await
			.map_err(|source| SyncError::Filesystem { path: target, source })?;
		Ok(FileOutcome::Written)
	}
}
