use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use ssot_cli::Commands;
use ssot_cli::OutputFormat;
use ssot_cli::SsotCli;
use ssot_core::AnyEmptyResult;
use ssot_core::AnyResult;
use ssot_core::FilePlan;
use ssot_core::Registry;
use ssot_core::SAMPLE_REGISTRY;
use ssot_core::SsotError;
use ssot_core::SyncContext;
use ssot_core::SyncOptions;
use ssot_core::SyncReport;
use ssot_core::load_context;
use ssot_core::synchronize;
use tracing_subscriber::EnvFilter;

/// Exit status of `ssot check` when at least one file is out of date.
const EXIT_STALE: i32 = 4;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = SsotCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Update { dry_run, watch }) => run_update(&args, dry_run, watch),
		Some(Commands::Check { diff, format }) => run_check(&args, diff, format),
		Some(Commands::List) => run_list(&args),
		None => {
			eprintln!("No subcommand specified. Run `ssot --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		process::exit(report_error(e));
	}
}

/// Install the `tracing` subscriber. `SSOT_LOG` takes precedence over the
/// verbosity flag.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env("SSOT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.init();
}

/// Print an error that ended the run and return the process exit code.
fn report_error(error: ssot_core::AnyError) -> i32 {
	// Render through miette for rich diagnostics with help text and error
	// codes.
	match error.downcast::<SsotError>() {
		Ok(ssot_err) => {
			let code = ssot_err.exit_code();
			let report: miette::Report = (*ssot_err).into();
			eprintln!("{report:?}");
			code
		}
		Err(e) => {
			eprintln!("{} {e}", colored!("error:", red));
			1
		}
	}
}

fn resolve_root(args: &SsotCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load(args: &SsotCli) -> AnyResult<SyncContext> {
	let root = resolve_root(args);
	let ctx = load_context(&root, args.registry.as_deref())?;

	if args.verbose {
		println!(
			"Loaded registry: {} file(s), {} constant(s)",
			ctx.registry.files.len(),
			ctx.registry.constants.len()
		);
	}

	Ok(ctx)
}

/// Reported paths are relative to the registry's directory, or to the project
/// root for registries not loaded from disk.
fn display_root(args: &SsotCli, ctx: &SyncContext) -> PathBuf {
	ctx.registry
		.root()
		.map_or_else(|| resolve_root(args), Path::to_path_buf)
}

fn run_init(args: &SsotCli) -> AnyEmptyResult {
	let root = resolve_root(args);
	let existing = match &args.registry {
		Some(path) => path.is_file().then(|| path.clone()),
		None => Registry::resolve_path(&root),
	};

	if let Some(path) = existing {
		println!("Registry already exists: {}", path.display());
		return Ok(());
	}

	let registry_path = args
		.registry
		.clone()
		.unwrap_or_else(|| root.join("ssot.yaml"));
	std::fs::write(&registry_path, SAMPLE_REGISTRY)?;
	println!("Created registry: {}", registry_path.display());

	println!();
	println!("Next steps:");
	println!("  1. List the files to keep in sync under `files`");
	println!("  2. Add a directive to each value you want managed:");
	println!("     const Version = \"1.0.0\" // ssot[version]: \"(\\d+\\.\\d+\\.\\d+)\"");
	println!("  3. Run `ssot update` to sync values");

	Ok(())
}

fn run_update(args: &SsotCli, dry_run: bool, watch: bool) -> AnyEmptyResult {
	// Run the initial update.
	let result = run_update_once(args, dry_run);

	if !watch || dry_run {
		return result;
	}

	if let Err(e) = result {
		report_error(e);
	}

	// Watch mode
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let root = resolve_root(args);
	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&root, notify::RecursiveMode::Recursive)?;
	tracing::debug!(root = %root.display(), "watching for changes");

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, updating...");
		if let Err(e) = run_update_once(args, false) {
			report_error(e);
		}
	}
}

fn run_update_once(args: &SsotCli, dry_run: bool) -> AnyEmptyResult {
	let ctx = load(args)?;
	let root = display_root(args, &ctx);
	let mut report = synchronize(&ctx, SyncOptions { dry_run });

	let changed: Vec<_> = report.changed().collect();
	if changed.is_empty() {
		if report.is_ok() {
			println!("All directives are already up to date.");
		}
	} else if dry_run {
		println!("Dry run: would update {} file(s):", changed.len());
		for plan in &changed {
			println!("  {}", make_relative(&plan.path, &root));
		}
	} else {
		println!(
			"Updated {} directive(s) in {} file(s).",
			changed
				.iter()
				.map(|plan| plan.stale_directives().count())
				.sum::<usize>(),
			changed.len()
		);
		for plan in &changed {
			println!("  {}", make_relative(&plan.path, &root));
		}
	}

	if args.verbose {
		let unchanged = report.files.len() - changed.len();
		println!("{unchanged} file(s) already up to date.");
	}

	match report.take_error() {
		Some(error) => Err(error.into()),
		None => Ok(()),
	}
}

/// Check every file without writing. Exits with [`EXIT_STALE`] when any
/// file is out of date.
fn run_check(args: &SsotCli, show_diff: bool, format: OutputFormat) -> AnyEmptyResult {
	let ctx = load(args)?;
	let root = display_root(args, &ctx);
	let mut report = synchronize(&ctx, SyncOptions { dry_run: true });
	let stale: Vec<&FilePlan> = report.changed().collect();
	let is_stale = !stale.is_empty();

	match format {
		OutputFormat::Json => print_check_json(&report, &stale, &root),
		OutputFormat::Github => print_check_github(&report, &stale, &root),
		OutputFormat::Text => print_check_text(&report, &stale, &root, show_diff),
	}

	if let Some(error) = report.take_error() {
		return Err(error.into());
	}

	if is_stale {
		process::exit(EXIT_STALE);
	}

	Ok(())
}

fn print_check_json(report: &SyncReport, stale: &[&FilePlan], root: &Path) {
	let stale_entries: Vec<serde_json::Value> = stale
		.iter()
		.flat_map(|plan| {
			let rel = make_relative(&plan.path, root);
			plan.stale_directives().map(move |entry| {
				serde_json::json!({
					"file": rel,
					"line": entry.line,
					"constant": entry.rewrite.constant,
					"current": entry.rewrite.previous,
					"expected": entry.rewrite.value,
					"whitespace_only": entry.rewrite.is_current(),
				})
			})
		})
		.collect();
	let error_entries: Vec<serde_json::Value> = report
		.errors
		.iter()
		.map(|error| {
			serde_json::json!({
				"file": error.path().map(|path| make_relative(Path::new(path), root)),
				"line": error.line(),
				"message": error_message(error),
			})
		})
		.collect();
	let output = serde_json::json!({
		"ok": stale_entries.is_empty() && error_entries.is_empty(),
		"stale": stale_entries,
		"errors": error_entries,
	});
	println!("{output}");
}

fn print_check_github(report: &SyncReport, stale: &[&FilePlan], root: &Path) {
	for error in &report.errors {
		let location = match (error.path(), error.line()) {
			(Some(path), Some(line)) => {
				format!(" file={},line={line}", make_relative(Path::new(path), root))
			}
			(Some(path), None) => format!(" file={}", make_relative(Path::new(path), root)),
			_ => String::new(),
		};
		println!("::error{location}::{}", error_message(error));
	}

	for plan in stale {
		let rel = make_relative(&plan.path, root);
		for entry in plan.stale_directives() {
			if entry.rewrite.is_current() {
				println!(
					"::warning file={rel},line={}::Directive for `{}` has trailing whitespace",
					entry.line, entry.rewrite.constant
				);
				continue;
			}
			println!(
				"::warning file={rel},line={}::Constant `{}` is out of date (found `{}`, expected \
				 `{}`)",
				entry.line, entry.rewrite.constant, entry.rewrite.previous, entry.rewrite.value
			);
		}
	}

	if stale.is_empty() && report.is_ok() {
		println!("All directives are up to date.");
	} else {
		eprintln!("{}", check_summary(report, stale));
	}
}

fn print_check_text(report: &SyncReport, stale: &[&FilePlan], root: &Path, show_diff: bool) {
	if stale.is_empty() {
		if report.is_ok() {
			println!("Check passed: all directives are up to date.");
		}
		return;
	}

	eprintln!("Check failed.");
	eprintln!("  files out of date: {}", stale.len());
	eprintln!();
	eprintln!("Out of date directives:");
	for plan in stale {
		let rel = make_relative(&plan.path, root);
		for entry in plan.stale_directives() {
			if entry.rewrite.is_current() {
				eprintln!(
					"  {rel}:{} `{}` has trailing whitespace",
					entry.line, entry.rewrite.constant
				);
				continue;
			}
			eprintln!(
				"  {rel}:{} `{}` is {}, expected {}",
				entry.line,
				entry.rewrite.constant,
				colored!(entry.rewrite.previous, red),
				colored!(entry.rewrite.value, green)
			);
		}

		if show_diff {
			print_diff(&plan.original_text(), &plan.updated_text());
		}
	}

	eprintln!();
	eprintln!("{}", check_summary(report, stale));
}

fn check_summary(report: &SyncReport, stale: &[&FilePlan]) -> String {
	let mut parts = Vec::new();
	if !report.errors.is_empty() {
		parts.push(format!("{} file(s) failed", report.errors.len()));
	}
	if !stale.is_empty() {
		parts.push(format!("{} file(s) are out of date", stale.len()));
	}
	format!("{}. Run `ssot update` to fix.", parts.join(" and "))
}

fn run_list(args: &SsotCli) -> AnyEmptyResult {
	let ctx = load(args)?;
	let root = display_root(args, &ctx);
	let mut report = synchronize(&ctx, SyncOptions { dry_run: true });

	if report.files.is_empty() && report.is_ok() {
		println!("No files listed in the registry.");
		return Ok(());
	}

	for plan in &report.files {
		println!("{}", colored!(make_relative(&plan.path, &root), bold));
		for entry in &plan.directives {
			let rewrite = &entry.rewrite;
			if !rewrite.is_changed() {
				println!(
					"  {:>4}  {} = {} [{}]",
					entry.line,
					rewrite.constant,
					rewrite.value,
					colored!("ok", green)
				);
			} else if rewrite.is_current() {
				println!(
					"  {:>4}  {} = {} [{}]",
					entry.line,
					rewrite.constant,
					rewrite.value,
					colored!("trailing whitespace", yellow)
				);
			} else {
				println!(
					"  {:>4}  {} = {} -> {} [{}]",
					entry.line,
					rewrite.constant,
					rewrite.previous,
					rewrite.value,
					colored!("stale", yellow)
				);
			}
		}
	}

	let stale_count: usize = report
		.files
		.iter()
		.map(|plan| plan.stale_directives().count())
		.sum();
	println!(
		"\n{} directive(s) in {} file(s), {stale_count} out of date",
		report.directive_count(),
		report.files.len()
	);

	match report.take_error() {
		Some(error) => Err(error.into()),
		None => Ok(()),
	}
}

/// The error message followed by its chain of causes.
fn error_message(error: &SsotError) -> String {
	let mut message = error.to_string();
	let mut source = std::error::Error::source(error);
	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}
	message
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
