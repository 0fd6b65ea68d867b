use miette::Diagnostic;
use thiserror::Error;

/// A failure while rewriting a single directive line. These are raised by the
/// line rewriter, which has no knowledge of the file being processed, and are
/// wrapped into [`SsotError::Directive`] together with the file path and line
/// number.
#[derive(Debug, Diagnostic, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DirectiveError {
	#[error("failed to compile directive regex `{pattern}`: {reason}")]
	#[diagnostic(
		code(ssot::directive_regex_compile),
		help("the text after `ssot[name]:` must be a valid regular expression")
	)]
	RegexCompile { pattern: String, reason: String },

	#[error("directive regex `{pattern}` does not match code `{code}`")]
	#[diagnostic(
		code(ssot::directive_regex_no_match),
		help("update the directive so its regex matches the code before the comment marker")
	)]
	RegexNoMatch { pattern: String, code: String },

	#[error("directive regex `{pattern}` has no capture group around the value")]
	#[diagnostic(
		code(ssot::directive_regex_no_capture),
		help("wrap the part of the code to replace in a capture group, e.g. `v(\\d+\\.\\d+\\.\\d+)`")
	)]
	RegexNoCapture { pattern: String },

	#[error("unknown constant `{name}`")]
	#[diagnostic(
		code(ssot::unknown_constant),
		help("add `{name}` to the `constants` section of the registry")
	)]
	UnknownConstant { name: String },
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum SsotError {
	#[error("no registry file found in `{root}`")]
	#[diagnostic(
		code(ssot::registry_not_found),
		help("create `ssot.yaml` with `ssot init` or pass `--registry <path>`")
	)]
	RegistryNotFound { root: String },

	#[error("failed to read registry `{path}`")]
	#[diagnostic(code(ssot::registry_read))]
	RegistryRead {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse registry `{path}`: {reason}")]
	#[diagnostic(
		code(ssot::registry_parse),
		help(
			"the registry needs a `files` list and a `constants` map; quote TOML and JSON \
			 values as strings"
		)
	)]
	RegistryParse { path: String, reason: String },

	#[error("unsupported registry format: `{0}`")]
	#[diagnostic(
		code(ssot::unsupported_format),
		help("supported formats: yaml, yml, toml, json")
	)]
	UnsupportedFormat(String),

	#[error("failed to build the directive pattern for `.{extension}`: {reason}")]
	#[diagnostic(code(ssot::line_pattern))]
	LinePattern { extension: String, reason: String },

	#[error("unsupported file type `{extension}` for `{path}`")]
	#[diagnostic(
		code(ssot::unsupported_extension),
		help("add a comment marker for this extension under `markers` in the registry")
	)]
	UnsupportedExtension { path: String, extension: String },

	#[error("failed to read `{path}`")]
	#[diagnostic(code(ssot::file_read))]
	FileRead {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("no ssot directives found in `{path}`")]
	#[diagnostic(
		code(ssot::no_directives),
		help("remove the file from the registry's `files` list or add an `ssot[name]: regex` comment")
	)]
	NoDirectivesFound { path: String },

	#[error("directive at {path}:{line} is not valid UTF-8")]
	#[diagnostic(
		code(ssot::invalid_encoding),
		help("only the bytes of directive lines must be UTF-8; the rest of the file is copied as is")
	)]
	InvalidEncoding { path: String, line: usize },

	#[error("invalid directive at {path}:{line}")]
	#[diagnostic(code(ssot::directive))]
	Directive {
		path: String,
		line: usize,
		#[source]
		#[diagnostic_source]
		source: DirectiveError,
	},

	#[error("refusing to write empty output to `{path}`")]
	#[diagnostic(code(ssot::empty_output))]
	EmptyOutput { path: String },

	#[error("failed to write `{path}`")]
	#[diagnostic(code(ssot::file_write))]
	FileWrite {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("{} file(s) failed to synchronize", .errors.len())]
	#[diagnostic(
		code(ssot::files_failed),
		help("fix the reported files and run `ssot update` again")
	)]
	FilesFailed {
		#[related]
		errors: Vec<SsotError>,
	},
}

impl SsotError {
	/// The line-level cause when this error was raised by the line rewriter.
	pub fn directive_error(&self) -> Option<&DirectiveError> {
		match self {
			Self::Directive { source, .. } => Some(source),
			_ => None,
		}
	}

	/// The file (or registry) this error is about, when it concerns one.
	pub fn path(&self) -> Option<&str> {
		match self {
			Self::RegistryRead { path, .. }
			| Self::RegistryParse { path, .. }
			| Self::UnsupportedExtension { path, .. }
			| Self::FileRead { path, .. }
			| Self::NoDirectivesFound { path }
			| Self::Directive { path, .. }
			| Self::InvalidEncoding { path, .. }
			| Self::EmptyOutput { path }
			| Self::FileWrite { path, .. } => Some(path),
			_ => None,
		}
	}

	/// 1-indexed line number for line-level errors.
	pub fn line(&self) -> Option<usize> {
		match self {
			Self::Directive { line, .. } | Self::InvalidEncoding { line, .. } => Some(*line),
			_ => None,
		}
	}

	/// Process exit code for this error when it ends a run.
	pub fn exit_code(&self) -> i32 {
		match self {
			Self::RegistryParse { .. } | Self::UnsupportedFormat(_) => 2,
			Self::FilesFailed { .. }
			| Self::FileRead { .. }
			| Self::FileWrite { .. }
			| Self::NoDirectivesFound { .. }
			| Self::Directive { .. }
			| Self::InvalidEncoding { .. }
			| Self::EmptyOutput { .. }
			| Self::UnsupportedExtension { .. } => 3,
			_ => 1,
		}
	}
}

pub type SsotResult<T> = Result<T, SsotError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
