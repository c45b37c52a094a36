// SPDX-License-Identifier: GPL-3.0-or-later

#![allow(clippy::upper_case_acronyms)]

use anyhow::{Context, Result};
use indicatif::{ProgressDrawTarget, ProgressStyle};
use structopt::StructOpt;
use tokio::fs;
use url::Url;

use std::process;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub const L2P_URL: &str = "https://www2.elearning.rwth-aachen.de";

#[macro_use]
mod cli;
use cli::*;
mod crawler;
mod errors;
mod l2p;
mod mirror;
mod transport;
mod tree;
mod util;

use crawler::Crawler;
use errors::SyncError;
use l2p::L2P;
use mirror::{MirrorEngine, MirrorReport};
use transport::{AuthFailed, HttpTransport};
use util::sanitize;

#[tokio::main]
async fn main() {
	let opt = Opt::from_args();
	if let Err(e) = real_main(opt).await {
		error!(e);
		process::exit(1);
	}
}

async fn real_main(mut opt: Opt) -> Result<()> {
	LOG_LEVEL.store(opt.verbose, Ordering::SeqCst);
	#[cfg(windows)]
	let _ = colored::control::set_virtual_terminal(true);

	fs::create_dir_all(&opt.output).await.context("failed to create output directory")?;
	// use UNC paths on Windows (to avoid the default max. path length of 255)
	opt.output = fs::canonicalize(&opt.output).await.context("failed to canonicalize output directory")?;

	let (user, pass) = ask_user_pass(&opt).context("credentials input failed")?;
	let transport = HttpTransport::new(user, pass, opt.proxy.as_deref()).context("failed to set up the HTTP client")?;
	let l2p = Arc::new(L2P::new(Arc::new(transport)));

	let dashboard = Url::parse(L2P_URL)?.join(l2p::DASHBOARD_PAGE)?;
	info!("Collecting courses..");
	let html = match l2p.get_html(&dashboard).await {
		Ok(html) => html,
		Err(e) => {
			if e.downcast_ref::<AuthFailed>().is_some() {
				error!(e);
				process::exit(77);
			}
			return Err(e).context("failed to load the course summary page");
		},
	};
	success!("Logged in!");

	let mut report = MirrorReport::default();
	let mut courses = Vec::new();
	for row in l2p::enumerate_courses(&html, &dashboard) {
		match row {
			Ok(course) => courses.push(course),
			Err(e) => {
				warning!(e);
				report.errors.push(e);
			},
		}
	}
	if courses.is_empty() {
		info!("No courses found");
		return Ok(());
	}

	info!("Collecting files..");
	let crawler = Crawler::new(Arc::clone(&l2p), opt.max_depth);
	let mut trees = Vec::new();
	for course in &courses {
		match crawler.crawl(&course.title, &course.materials_url()).await {
			Ok((tree, errors)) => {
				report.errors.extend(errors);
				trees.push((course, tree));
			},
			Err(e) => {
				error!("Crawling {}", course.title; e);
				match e.downcast::<SyncError>() {
					Ok(sync_error) => report.errors.push(sync_error),
					Err(other) => report.errors.push(SyncError::Transport {
						url: course.materials_url().to_string(),
						source: other,
					}),
				}
			},
		}
	}
	let total: usize = trees.iter().map(|(_, tree)| tree.count_files()).sum();
	log!(0, "Found {} files in {} courses", total, trees.len());

	if opt.list_only {
		for (course, tree) in &trees {
			log!(0, "{}", course.title.to_uppercase());
			tree.print(1);
		}
		return Ok(());
	}

	PROGRESS_BAR_ENABLED.store(atty::is(atty::Stream::Stdout), Ordering::SeqCst);
	if PROGRESS_BAR_ENABLED.load(Ordering::SeqCst) {
		PROGRESS_BAR.set_draw_target(ProgressDrawTarget::stderr_nohz());
		PROGRESS_BAR.set_style(ProgressStyle::default_bar().template("[{pos}/{len}] {wide_msg}"));
		PROGRESS_BAR.set_length(total as u64);
		PROGRESS_BAR.set_message("starting..");
	}

	let engine = MirrorEngine::new(Arc::clone(&l2p), opt.jobs, opt.force);
	for (course, tree) in &trees {
		let course_root = opt.output.join(sanitize(&course.title));
		if let Err(e) = fs::create_dir_all(&course_root).await {
			report.errors.push(SyncError::Filesystem {
				path: course_root,
				source: e.into(),
			});
			continue;
		}
		report.merge(engine.mirror(tree, &course_root).await);
	}

	if PROGRESS_BAR_ENABLED.load(Ordering::SeqCst) {
		PROGRESS_BAR.finish_with_message("done");
	}
	log!(
		0,
		"{} files checked, {} written, {} skipped",
		report.files_checked,
		report.files_written,
		report.files_skipped
	);
	if !report.errors.is_empty() {
		log!(0, "{} entries failed:", report.errors.len());
		for e in &report.errors {
			error!(e);
		}
	}
	Ok(())
}
