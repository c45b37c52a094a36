use url::Url;

use crate::l2p::{INFO_PAGE, MATERIALS_PAGE};

/// One node of a remote course tree. Built bottom-up by the crawler and not
/// modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
	Folder(Folder),
	File(File),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Folder {
	pub name: String,
	children: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct File {
	pub name: String,
	pub url: Url,
}

impl Entry {
	pub fn name(&self) -> &str {
		match self {
			Entry::Folder(folder) => &folder.name,
			Entry::File(file) => &file.name,
		}
	}
}

impl Folder {
	pub fn named(name: impl Into<String>) -> Self {
		Folder {
			name: name.into(),
			children: Vec::new(),
		}
	}

	/// Adds a child, keeping document order. The listing does not guarantee
	/// unique display names; a repeated name replaces the earlier entry.
	pub fn insert(&mut self, entry: Entry) {
		if let Some(existing) = self.children.iter_mut().find(|e| e.name() == entry.name()) {
			*existing = entry;
		} else {
			self.children.push(entry);
		}
	}

	pub fn children(&self) -> &[Entry] {
		&self.children
	}

	/// Number of files anywhere below this folder.
	pub fn count_files(&self) -> usize {
		self.children
			.iter()
			.map(|entry| match entry {
				Entry::Folder(folder) => folder.count_files(),
				Entry::File(..) => 1,
			})
			.sum()
	}

	/// Prints the tree for `--list-only`, folders in upper case.
	pub fn print(&self, depth: usize) {
		for entry in &self.children {
			match entry {
				Entry::Folder(folder) => {
					log!(0, "{}{}", "   ".repeat(depth), folder.name.to_uppercase());
					folder.print(depth + 1);
				},
				Entry::File(file) => {
					log!(0, "{}{}", "   ".repeat(depth), file.name);
				},
			}
		}
	}
}

/// One course row of the dashboard. `url` is the absolute address of the
/// course's information page; the materials tree hangs off a sibling path.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
	pub title: String,
	pub url: Url,
}

impl Course {
	pub fn materials_url(&self) -> Url {
		let mut url = self.url.clone();
		let base = url.path().trim_end_matches(INFO_PAGE).to_owned();
		url.set_path(&format!("{}{}", base, MATERIALS_PAGE));
		url.set_query(None);
		url
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn file(name: &str) -> Entry {
		Entry::File(File {
			name: name.to_owned(),
			url: Url::parse("https://example.com/f").unwrap(),
		})
	}

	#[test]
	fn insert_keeps_document_order() {
		let mut folder = Folder::named("root");
		folder.insert(file("b"));
		folder.insert(file("a"));
		folder.insert(file("c"));
		let names: Vec<&str> = folder.children().iter().map(Entry::name).collect();
		assert_eq!(names, vec!["b", "a", "c"]);
	}

	#[test]
	fn repeated_name_replaces_the_earlier_entry() {
		let mut folder = Folder::named("root");
		folder.insert(file("notes"));
		let mut replacement = Folder::named("notes");
		replacement.insert(file("inner"));
		folder.insert(Entry::Folder(replacement));
		assert_eq!(folder.children().len(), 1);
		assert!(matches!(folder.children()[0], Entry::Folder(..)));
	}

	#[test]
	fn count_files_recurses() {
		let mut sub = Folder::named("sub");
		sub.insert(file("one"));
		sub.insert(file("two"));
		let mut root = Folder::named("root");
		root.insert(file("top"));
		root.insert(Entry::Folder(sub));
		assert_eq!(root.count_files(), 3);
	}

	#[test]
	fn materials_url_is_a_sibling_of_the_information_page() {
		let course = Course {
			title: "Algorithms".to_owned(),
			url: Url::parse("https://www2.elearning.rwth-aachen.de/x1/information/default.aspx").unwrap(),
		};
		assert_eq!(
			course.materials_url().as_str(),
			"https://www2.elearning.rwth-aachen.de/x1/materials/default.aspx"
		);
	}
}
