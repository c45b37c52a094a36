// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use std::sync::Arc;

use crate::errors::SyncError;
use crate::transport::{RemoteResponse, Transport};
use crate::tree::Course;

pub const DASHBOARD_PAGE: &str = "/foyer/summary/default.aspx";
pub const INFO_PAGE: &str = "/information/default.aspx";
pub const MATERIALS_PAGE: &str = "/materials/default.aspx";

#[allow(non_upper_case_globals)]
mod selectors {
	use once_cell::sync::Lazy;
	use scraper::Selector;
	// construct CSS selectors once
	pub static listing_cells: Lazy<Selector> = Lazy::new(|| Selector::parse("td.ms-vb2").unwrap());
	pub static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
	pub static IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
}
use selectors::*;

static COURSE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S+)/information/default\.aspx").unwrap());

/// Shared handle for everything that talks to the platform.
pub struct L2P {
	transport: Arc<dyn Transport>,
}

impl L2P {
	pub fn new(transport: Arc<dyn Transport>) -> Self {
		L2P { transport }
	}

	pub async fn download(&self, url: &Url) -> Result<RemoteResponse> {
		log!(2, "Downloading {}", url);
		self.transport.get(url).await
	}

	pub async fn get_html(&self, url: &Url) -> Result<Html> {
		let resp = self.download(url).await?;
		let mut body = resp.body;
		let mut data = Vec::new();
		while let Some(chunk) = body.next().await {
			data.extend_from_slice(&chunk.context("failed to read page body")?);
		}
		Ok(Html::parse_document(&String::from_utf8_lossy(&data)))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
	Folder,
	File,
}

/// One row of a materials listing: the link text and where it points.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
	pub name: String,
	pub url: Url,
	pub kind: ListingKind,
}

/// Subfolder rows link back to the materials page with a RootFolder query
/// parameter; every other link in a listing row is a direct file download.
/// This is the only place that encodes the detection rule, so a platform
/// with a different marker only needs this predicate swapped.
pub fn is_folder_link(url: &Url) -> bool {
	url.path().ends_with(MATERIALS_PAGE) && url.query_pairs().any(|(k, _)| k == "RootFolder")
}

fn resolve_href(context: &Url, href: &str) -> Result<Url, SyncError> {
	context.join(href).map_err(|e| SyncError::Parse {
		url: context.to_string(),
		what: format!("invalid link target {:?}: {}", href, e),
	})
}

/// Extracts the rows of one materials listing, in document order. Cells
/// without a link are not rows; a row whose link text is empty still counts.
pub fn parse_listing(html: &Html, context: &Url) -> Vec<Result<ListingEntry, SyncError>> {
	html.select(&listing_cells)
		.flat_map(|cell| cell.select(&LINKS).next().map(|link| entry_from_link(link, context)))
		.collect()
}

fn entry_from_link(link: ElementRef, context: &Url) -> Result<ListingEntry, SyncError> {
	let name = link.text().collect::<String>().trim().to_owned();
	let href = link.value().attr("href").ok_or_else(|| SyncError::Parse {
		url: context.to_string(),
		what: "listing row link without href".to_owned(),
	})?;
	let url = resolve_href(context, href)?;
	let kind = if is_folder_link(&url) {
		ListingKind::Folder
	} else {
		ListingKind::File
	};
	Ok(ListingEntry { name, url, kind })
}

/// Parses the dashboard ("summary") page into the visible course rows.
/// Rows whose link carries an icon image are navigation chrome, not
/// courses, and are skipped outright.
pub fn enumerate_courses(html: &Html, context: &Url) -> Vec<Result<Course, SyncError>> {
	let mut courses = Vec::new();
	for cell in html.select(&listing_cells) {
		let link = match cell.select(&LINKS).next() {
			Some(link) => link,
			None => continue,
		};
		if link.select(&IMAGES).next().is_some() {
			continue;
		}
		courses.push(course_from_link(link, context));
	}
	courses
}

fn course_from_link(link: ElementRef, context: &Url) -> Result<Course, SyncError> {
	let title = link.text().collect::<String>().trim().to_owned();
	let href = link.value().attr("href").ok_or_else(|| SyncError::Parse {
		url: context.to_string(),
		what: "dashboard row link without href".to_owned(),
	})?;
	if !COURSE_LINK.is_match(href) {
		return Err(SyncError::Parse {
			url: context.to_string(),
			what: format!("dashboard link {:?} does not point at a course information page", href),
		});
	}
	let url = resolve_href(context, href)?;
	Ok(Course { title, url })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> Url {
		Url::parse("https://www2.elearning.rwth-aachen.de/x1/materials/default.aspx").unwrap()
	}

	#[test]
	fn folder_links_carry_the_root_folder_marker() {
		let folder = base().join("/x1/materials/default.aspx?RootFolder=%2Fx1%2FExercises").unwrap();
		let file = base().join("/x1/materials/slides.pdf").unwrap();
		let other_query = base().join("/x1/materials/default.aspx?Sort=name").unwrap();
		assert!(is_folder_link(&folder));
		assert!(!is_folder_link(&file));
		assert!(!is_folder_link(&other_query));
	}

	#[test]
	fn listing_rows_are_classified_and_ordered() {
		let html = Html::parse_document(
			r#"<table><tr>
				<td class="ms-vb2"><a href="/x1/materials/slides.pdf">slides.pdf</a></td>
				<td class="ms-vb2">no link here</td>
				<td class="ms-vb2"><a href="/x1/materials/default.aspx?RootFolder=%2Fx1%2FExercises">Exercises</a></td>
			</tr></table>"#,
		);
		let entries: Vec<ListingEntry> =
			parse_listing(&html, &base()).into_iter().map(|e| e.unwrap()).collect();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].name, "slides.pdf");
		assert_eq!(entries[0].kind, ListingKind::File);
		assert_eq!(entries[1].name, "Exercises");
		assert_eq!(entries[1].kind, ListingKind::Folder);
	}

	#[test]
	fn listing_row_with_empty_text_still_yields_an_entry() {
		let html = Html::parse_document(
			r#"<table><tr><td class="ms-vb2"><a href="/x1/materials/x.pdf"></a></td></tr></table>"#,
		);
		let entries = parse_listing(&html, &base());
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].as_ref().unwrap().name, "");
	}

	#[test]
	fn relative_hrefs_resolve_against_the_page_url() {
		let html = Html::parse_document(
			r#"<table><tr><td class="ms-vb2"><a href="notes.pdf">notes.pdf</a></td></tr></table>"#,
		);
		let entries = parse_listing(&html, &base());
		assert_eq!(
			entries[0].as_ref().unwrap().url.as_str(),
			"https://www2.elearning.rwth-aachen.de/x1/materials/notes.pdf"
		);
	}

	#[test]
	fn dashboard_rows_become_courses() {
		let html = Html::parse_document(
			r#"<table><tr>
				<td class="ms-vb2"><a href="/x1/information/default.aspx">Algorithms I</a></td>
				<td class="ms-vb2"><a href="/foyer/icons/x.aspx"><img src="icon.gif"></a></td>
				<td class="ms-vb2"><a href="/x2/information/default.aspx">Databases</a></td>
			</tr></table>"#,
		);
		let dashboard = Url::parse("https://www2.elearning.rwth-aachen.de/foyer/summary/default.aspx").unwrap();
		let courses: Vec<Course> =
			enumerate_courses(&html, &dashboard).into_iter().filter_map(|c| c.ok()).collect();
		assert_eq!(courses.len(), 2);
		assert_eq!(courses[0].title, "Algorithms I");
		assert_eq!(
			courses[0].url.as_str(),
			"https://www2.elearning.rwth-aachen.de/x1/information/default.aspx"
		);
		assert_eq!(courses[1].title, "Databases");
	}

	#[test]
	fn icon_rows_and_linkless_cells_are_not_courses_or_errors() {
		let html = Html::parse_document(
			r#"<table><tr>
				<td class="ms-vb2"><a href="/foyer/x.aspx"><img src="i.gif"></a></td>
				<td class="ms-vb2">plain text</td>
			</tr></table>"#,
		);
		let dashboard = Url::parse("https://www2.elearning.rwth-aachen.de/foyer/summary/default.aspx").unwrap();
		assert!(enumerate_courses(&html, &dashboard).is_empty());
	}

	#[test]
	fn non_course_link_is_a_parse_error() {
		let html = Html::parse_document(
			r#"<table><tr><td class="ms-vb2"><a href="/somewhere/else.aspx">misc</a></td></tr></table>"#,
		);
		let dashboard = Url::parse("https://www2.elearning.rwth-aachen.de/foyer/summary/default.aspx").unwrap();
		let rows = enumerate_courses(&html, &dashboard);
		assert_eq!(rows.len(), 1);
		assert!(matches!(rows[0], Err(SyncError::Parse { .. })));
	}
}
