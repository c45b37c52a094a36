// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use once_cell::sync::Lazy;
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = env!("CARGO_PKG_NAME"), about = "Mirror L2P course materials to a local directory")]
pub struct Opt {
	/// Only print the remote file tree, do not download anything
	#[structopt(short, long)]
	pub list_only: bool,

	/// Re-download files that are already present
	#[structopt(short, long)]
	pub force: bool,

	/// Verbose logging
	#[structopt(short, multiple = true, parse(from_occurrences))]
	pub verbose: usize,

	/// Output directory
	#[structopt(short, long, default_value = "L2P", parse(from_os_str))]
	pub output: PathBuf,

	/// Parallel downloads within one folder
	#[structopt(short, long, default_value = "1")]
	pub jobs: usize,

	/// Maximum folder nesting before a course is abandoned
	#[structopt(long, default_value = "16")]
	pub max_depth: usize,

	/// Proxy, e.g. socks5h://127.0.0.1:1080
	#[structopt(long)]
	pub proxy: Option<String>,

	/// Account username
	#[structopt(short = "u", long)]
	pub username: Option<String>,

	/// Account password
	#[structopt(short = "p", long)]
	pub password: Option<String>,
}

pub static LOG_LEVEL: AtomicUsize = AtomicUsize::new(0);
pub static PROGRESS_BAR_ENABLED: AtomicBool = AtomicBool::new(false);
pub static PROGRESS_BAR: Lazy<ProgressBar> = Lazy::new(|| ProgressBar::new(0));

macro_rules! log {
	($lvl:expr, $($t:expr),+) => {{
		#[allow(unused_imports)]
		use colored::Colorize as _;
		#[allow(unused_comparisons)] // 0 <= 0
		if $lvl <= crate::cli::LOG_LEVEL.load(std::sync::atomic::Ordering::SeqCst) {
			if crate::cli::PROGRESS_BAR_ENABLED.load(std::sync::atomic::Ordering::SeqCst) {
				crate::cli::PROGRESS_BAR.println(format!($($t),+));
			} else {
				println!($($t),+);
			}
		}
	}}
}

macro_rules! info {
	($t:tt) => {
		log!(0, $t);
	};
}

macro_rules! success {
	($t:tt) => {
		log!(0, "{}", format!($t).bright_green());
	};
}

macro_rules! warning {
	($e:expr) => {{
		log!(0, "Warning: {}", format!("{:?}", $e).bright_yellow());
	}};
	($msg:expr, $e:expr) => {{
		log!(0, "Warning: {}", format!("{} {:?}", $msg, $e).bright_yellow());
	}};
	(format => $($e:expr),+) => {{
		log!(0, "Warning: {}", format!($($e),+).bright_yellow());
	}};
}

macro_rules! error {
	($($prefix:expr),+; $e:expr) => {
		log!(0, "{}: {}", format!($($prefix),+), format!("{:?}", $e).bright_red());
	};
	($e:expr) => {
		log!(0, "Error: {}", format!("{:?}", $e).bright_red());
	};
}

pub fn ask_user_pass(opt: &Opt) -> Result<(String, String)> {
	let user = if let Some(username) = opt.username.as_ref() {
		username.clone()
	} else {
		rprompt::prompt_reply_stdout("Username: ").context("username prompt")?
	};
	let pass = if let Some(password) = opt.password.as_ref() {
		password.clone()
	} else {
		rpassword::read_password_from_tty(Some("Password: ")).context("password prompt")?
	};
	Ok((user, pass))
}
