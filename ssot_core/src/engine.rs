use std::borrow::Cow;
use std::path::Path;
use std::path::PathBuf;

use crate::LineRewrite;
use crate::SsotError;
use crate::SsotResult;
use crate::config::Registry;
use crate::directive::LinePatterns;
use crate::directive::has_directives;
use crate::rewriter::rewrite_line;

/// A loaded registry together with the compiled directive patterns for every
/// supported extension.
///
/// This is the main entry point returned by [`load_context`] and consumed by
/// [`plan_file`], [`update_file`] and [`synchronize`].
#[derive(Debug, Clone)]
pub struct SyncContext {
	/// The registry the run is driven by.
	pub registry: Registry,
	/// Directive patterns built from the registry's comment markers.
	pub patterns: LinePatterns,
}

impl SyncContext {
	/// Compile the directive pattern of every supported extension up front.
	pub fn new(registry: Registry) -> SsotResult<Self> {
		let patterns = LinePatterns::new(&registry.markers)?;
		Ok(Self { registry, patterns })
	}
}

/// Load the registry (from `registry` when given, otherwise discovered in
/// `root`) and prepare a [`SyncContext`].
pub fn load_context(root: &Path, registry: Option<&Path>) -> SsotResult<SyncContext> {
	let registry = match registry {
		Some(path) => Registry::load(path)?,
		None => Registry::discover(root)?,
	};

	SyncContext::new(registry)
}

/// A directive found while processing a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveEntry {
	/// 1-indexed line number.
	pub line: usize,
	/// The rewrite computed for the line.
	pub rewrite: LineRewrite,
}

/// A rewritten line whose length differs from the original. Usually harmless,
/// but it can break column alignment in the surrounding code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentWarning {
	/// 1-indexed line number.
	pub line: usize,
	/// Length of the line before rewriting, in bytes.
	pub before: usize,
	/// Length of the line after rewriting, in bytes.
	pub after: usize,
}

/// The computed result of processing one file. Nothing has been written yet.
#[derive(Debug, Clone)]
pub struct FilePlan {
	pub path: PathBuf,
	/// The file content as read from disk.
	pub original: Vec<u8>,
	/// The content after every directive line was rewritten. Lines without a
	/// directive are copied byte for byte, whatever their encoding.
	pub updated: Vec<u8>,
	pub directives: Vec<DirectiveEntry>,
	pub warnings: Vec<AlignmentWarning>,
}

impl FilePlan {
	/// Returns true when writing the plan would change the file.
	pub fn is_changed(&self) -> bool {
		self.original != self.updated
	}

	/// Directives whose line would be rewritten, either because the value
	/// differs from the registry or because trailing whitespace is trimmed.
	pub fn stale_directives(&self) -> impl Iterator<Item = &DirectiveEntry> {
		self.directives
			.iter()
			.filter(|entry| entry.rewrite.is_changed())
	}

	/// The original content, with invalid UTF-8 replaced for display.
	pub fn original_text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.original)
	}

	/// The updated content, with invalid UTF-8 replaced for display.
	pub fn updated_text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.updated)
	}

	/// Write the updated content back to disk if it differs from the
	/// original. Returns whether a write happened.
	pub fn write(&self) -> SsotResult<bool> {
		if !self.is_changed() {
			return Ok(false);
		}

		// Writing through the existing file keeps its permission bits.
		std::fs::write(&self.path, &self.updated).map_err(|source| {
			SsotError::FileWrite {
				path: self.path.display().to_string(),
				source,
			}
		})?;
		tracing::info!(file = %self.path.display(), "updated");

		Ok(true)
	}
}

/// Split a line produced by splitting on `\n` (terminator included) into its
/// content and its terminator (`"\r\n"`, `"\n"` or `""`).
fn split_line_ending(raw: &[u8]) -> (&[u8], &[u8]) {
	if let Some(line) = raw.strip_suffix(b"\r\n") {
		(line, &b"\r\n"[..])
	} else if let Some(line) = raw.strip_suffix(b"\n") {
		(line, &b"\n"[..])
	} else {
		(raw, &[])
	}
}

/// Compute the rewritten content of `path` without writing it.
///
/// Only directive lines need to be valid UTF-8. Every other line is copied
/// as raw bytes, so files in legacy encodings keep their content. The first
/// failing line aborts the whole file.
pub fn plan_file(ctx: &SyncContext, path: &Path) -> SsotResult<FilePlan> {
	let file = path.display().to_string();
	let original = std::fs::read(path).map_err(|source| {
		SsotError::FileRead {
			path: file.clone(),
			source,
		}
	})?;

	if !has_directives(&String::from_utf8_lossy(&original)) {
		return Err(SsotError::NoDirectivesFound { path: file });
	}

	let extension = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or_default();
	let Some(pattern) = ctx.patterns.get(extension) else {
		return Err(SsotError::UnsupportedExtension {
			path: file,
			extension: extension.to_string(),
		});
	};

	let mut updated = Vec::with_capacity(original.len());
	let mut directives = Vec::new();
	let mut warnings = Vec::new();

	for (index, raw) in original.split_inclusive(|&byte| byte == b'\n').enumerate() {
		let (bytes, ending) = split_line_ending(raw);
		let Ok(line) = std::str::from_utf8(bytes) else {
			if contains_directive_marker(bytes) {
				return Err(SsotError::InvalidEncoding {
					path: file,
					line: index + 1,
				});
			}
			updated.extend_from_slice(raw);
			continue;
		};

		let rewrite = rewrite_line(line, pattern, &ctx.registry.constants).map_err(|source| {
			SsotError::Directive {
				path: file.clone(),
				line: index + 1,
				source,
			}
		})?;

		let Some(rewrite) = rewrite else {
			updated.extend_from_slice(raw);
			continue;
		};

		if rewrite.text.len() != line.len() {
			warnings.push(AlignmentWarning {
				line: index + 1,
				before: line.len(),
				after: rewrite.text.len(),
			});
		}

		updated.extend_from_slice(rewrite.text.as_bytes());
		updated.extend_from_slice(ending);
		directives.push(DirectiveEntry {
			line: index + 1,
			rewrite,
		});
	}

	if updated.iter().all(u8::is_ascii_whitespace) {
		return Err(SsotError::EmptyOutput { path: file });
	}

	tracing::debug!(
		file = %path.display(),
		directives = directives.len(),
		changed = original != updated,
		"processed file"
	);

	Ok(FilePlan {
		path: path.to_path_buf(),
		original,
		updated,
		directives,
		warnings,
	})
}

fn contains_directive_marker(bytes: &[u8]) -> bool {
	bytes.windows(5).any(|window| window == b"ssot[")
}

/// Rewrite `path` in place. Returns `true` when the file was written and
/// `false` when its content was already up to date.
pub fn update_file(ctx: &SyncContext, path: &Path) -> SsotResult<bool> {
	plan_file(ctx, path)?.write()
}

/// Options for [`synchronize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
	/// Compute every file but never write.
	pub dry_run: bool,
}

/// Result of processing every file listed in the registry.
#[derive(Debug, Default)]
pub struct SyncReport {
	/// Files processed without error, in registry order.
	pub files: Vec<FilePlan>,
	/// One error per failed file, in registry order.
	pub errors: Vec<SsotError>,
	/// Whether this report comes from a dry run.
	pub dry_run: bool,
}

impl SyncReport {
	/// Returns true if no file failed.
	pub fn is_ok(&self) -> bool {
		self.errors.is_empty()
	}

	/// Files whose content was (or, in a dry run, would be) rewritten.
	pub fn changed(&self) -> impl Iterator<Item = &FilePlan> {
		self.files.iter().filter(|plan| plan.is_changed())
	}

	/// Total number of directives across successfully processed files.
	pub fn directive_count(&self) -> usize {
		self.files.iter().map(|plan| plan.directives.len()).sum()
	}

	/// Collapse the per-file errors into a single [`SsotError::FilesFailed`].
	/// Returns `None` when every file succeeded.
	pub fn take_error(&mut self) -> Option<SsotError> {
		if self.errors.is_empty() {
			return None;
		}

		Some(SsotError::FilesFailed {
			errors: std::mem::take(&mut self.errors),
		})
	}
}

/// Process every file in the registry, in order. A failing file never stops
/// the run: its error is collected and the next file is processed.
pub fn synchronize(ctx: &SyncContext, options: SyncOptions) -> SyncReport {
	let mut report = SyncReport {
		dry_run: options.dry_run,
		..SyncReport::default()
	};

	for path in &ctx.registry.files {
		tracing::debug!(file = %path.display(), "scanning");
		let result = plan_file(ctx, path).and_then(|plan| {
			if !options.dry_run {
				plan.write()?;
			}
			Ok(plan)
		});

		match result {
			Ok(plan) => report.files.push(plan),
			Err(error) => {
				tracing::debug!(file = %path.display(), %error, "failed to synchronize");
				report.errors.push(error);
			}
		}
	}

	report
}
