use anyhow::Result;
use futures::future::BoxFuture;
use futures_util::FutureExt;
use url::Url;

use std::sync::Arc;

use crate::errors::SyncError;
use crate::l2p::{parse_listing, ListingKind, L2P};
use crate::tree::{Entry, File, Folder};

/// Walks the remote materials hierarchy depth-first and assembles the
/// in-memory tree the mirror engine later replays onto disk. The remote is
/// trusted not to contain folder cycles, but a self-referential link would
/// otherwise recurse forever, so nesting is capped at `max_depth` and the
/// crawl fails closed beyond it.
pub struct Crawler {
	l2p: Arc<L2P>,
	max_depth: usize,
}

impl Crawler {
	pub fn new(l2p: Arc<L2P>, max_depth: usize) -> Self {
		Crawler { l2p, max_depth }
	}

	/// Fetches the listing at `url` and every folder below it. Rows that do
	/// not parse are skipped and reported alongside the tree.
	pub async fn crawl(&self, name: &str, url: &Url) -> Result<(Folder, Vec<SyncError>)> {
		let mut errors = Vec::new();
		let tree = self.crawl_level(name, url, 0, &mut errors).await?;
		Ok((tree, errors))
	}

	fn crawl_level<'a>(
		&'a self,
		name: &'a str,
		url: &'a Url,
		depth: usize,
		errors: &'a mut Vec<SyncError>,
	) -> BoxFuture<'a, Result<Folder>> {
		async move {
			if depth > self.max_depth {
				return Err(SyncError::DepthExceeded {
					url: url.to_string(),
					limit: self.max_depth,
				}
				.into());
			}
			let html = self.l2p.get_html(url).await?;
			let rows = parse_listing(&html, url);
			drop(html);
			let mut folder = Folder::named(name);
			for row in rows {
				let entry = match row {
					Ok(entry) => entry,
					Err(e) => {
						warning!(e);
						errors.push(e);
						continue;
					},
				};
				match entry.kind {
					ListingKind::Folder => {
						let child = self.crawl_level(&entry.name, &entry.url, depth + 1, errors).await?;
						folder.insert(Entry::Folder(child));
					},
					ListingKind::File => {
						folder.insert(Entry::File(File {
							name: entry.name,
							url: entry.url,
						}));
					},
				}
			}
			Ok(folder)
		}
		.boxed()
	}
}
