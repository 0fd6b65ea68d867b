use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Keep duplicated constants in sync with a single registry.",
	long_about = "ssot (single source of truth) keeps constants that are duplicated across a code \
	              base (version strings, URLs, limits) in sync with one registry file.\n\nSource \
	              lines opt in with a trailing comment such as:\n  const Version = \"1.2.3\" // \
	              ssot[version]: \"(\\d+\\.\\d+\\.\\d+)\"\n\nQuick start:\n  ssot init    Create \
	              a sample ssot.yaml\n  ssot update  Rewrite every directive with the registry \
	              value\n  ssot check   Verify everything is up to date\n  ssot list    Show \
	              every directive and its current value"
)]
pub struct SsotCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory. The registry is discovered here.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Path to the registry file. Overrides discovery in the project root.
	#[arg(long, short, global = true)]
	pub registry: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize ssot in a project by creating a sample registry.
	///
	/// Creates a commented `ssot.yaml` in the project root. If a registry
	/// already exists, this command is a no-op and exits successfully.
	Init,
	/// Rewrite every directive with the value from the registry.
	///
	/// Processes each file listed under `files` in order. For every line
	/// carrying an `ssot[name]: regex` directive the first capture group of
	/// the regex is replaced with the constant's value. Files are only written
	/// when their content changes. A failing file never stops the run; all
	/// failures are reported at the end.
	///
	/// Use `--dry-run` to preview changes without writing to disk, or
	/// `--watch` to automatically re-run whenever files change.
	Update {
		/// Preview changes without writing files. Prints which files would
		/// be modified.
		#[arg(long, default_value_t = false)]
		dry_run: bool,

		/// Watch for file changes and re-run updates automatically.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// Check that every directive already holds its registry value.
	///
	/// Computes the same updates as `ssot update` without writing anything.
	/// Exits with status 4 if any file is out of date and 3 if any file could
	/// not be processed.
	///
	/// Ideal for CI pipelines. Use `--diff` to see exactly what would change
	/// and `--format` to control the output style.
	Check {
		/// Show a unified diff for each out of date file.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results. Use `text` for human-readable
		/// output, `json` for programmatic consumption, or `github` for
		/// GitHub Actions annotations that appear inline on PRs.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// List every directive in the registered files.
	///
	/// Prints the line, constant name, current value and registry value of
	/// each directive, flagging the ones that are out of date.
	List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption. Each stale entry includes
	/// the file path, line, constant, current value and expected value.
	Json,
	/// GitHub Actions annotation format. Emits `::warning` or `::error`
	/// annotations that appear inline on pull request diffs.
	Github,
}
