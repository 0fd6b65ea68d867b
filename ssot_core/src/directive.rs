use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::SsotError;
use crate::SsotResult;
use crate::config::CommentMarkers;
use crate::config::normalize_extension;

/// Extension-agnostic check used to reject listed files that carry no
/// directive at all.
static DIRECTIVE_PRESENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"ssot\[([^\]]+)\]: .+")
		.unwrap_or_else(|e| panic!("invalid directive presence regex: {e}"))
});

/// Returns `true` when `content` contains at least one directive-shaped line.
pub fn has_directives(content: &str) -> bool {
	DIRECTIVE_PRESENCE.is_match(content)
}

/// Build the full-line directive pattern for a comment marker.
///
/// The pattern has exactly three capture groups: the code before the marker,
/// the constant name and the value regex source.
pub fn line_pattern_source(marker: &str) -> String {
	format!(
		r"^(.*){}\s*ssot\[\s*([^\]]+)\s*\]:\s*(.+)\s*$",
		regex::escape(marker)
	)
}

/// The compiled directive pattern for one file extension.
#[derive(Debug, Clone)]
pub struct LinePattern {
	marker: String,
	regex: Regex,
}

impl LinePattern {
	/// Compile the directive pattern for `marker`.
	pub fn new(extension: &str, marker: &str) -> SsotResult<Self> {
		let regex = Regex::new(&line_pattern_source(marker)).map_err(|e| {
			SsotError::LinePattern {
				extension: normalize_extension(extension),
				reason: e.to_string(),
			}
		})?;

		Ok(Self {
			marker: marker.to_string(),
			regex,
		})
	}

	/// The comment marker this pattern was built for.
	pub fn marker(&self) -> &str {
		&self.marker
	}

	/// The compiled full-line regex.
	pub fn regex(&self) -> &Regex {
		&self.regex
	}

	/// Parse `line` into a [`Directive`]. Returns `None` for ordinary lines.
	pub fn parse<'a>(&self, line: &'a str) -> Option<Directive<'a>> {
		let captures = self.regex.captures(line)?;
		let code = captures.get(1)?;
		let name = captures.get(2)?;
		let pattern = captures.get(3)?;

		Some(Directive {
			code: code.as_str(),
			name: name.as_str().trim(),
			pattern: pattern.as_str().trim_end(),
			tail: &line[code.end()..],
		})
	}
}

/// A directive found on a single line:
/// `<code><marker>ssot[<name>]: <pattern>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'a> {
	/// The live code before the comment marker.
	pub code: &'a str,
	/// The registry constant this directive refers to.
	pub name: &'a str,
	/// The value regex source, as written in the directive.
	pub pattern: &'a str,
	/// The comment marker and directive text, verbatim to the end of the
	/// line.
	pub tail: &'a str,
}

/// Compiled directive patterns for every supported extension.
///
/// Built once from a [`CommentMarkers`] table and shared by reference
/// afterwards; nothing is compiled lazily while files are processed.
#[derive(Debug, Clone)]
pub struct LinePatterns {
	patterns: BTreeMap<String, LinePattern>,
}

impl LinePatterns {
	/// Compile the directive pattern for every extension in `markers`.
	pub fn new(markers: &CommentMarkers) -> SsotResult<Self> {
		let mut patterns = BTreeMap::new();
		for (extension, marker) in markers.iter() {
			if patterns.contains_key(extension) {
				continue;
			}
			tracing::trace!(
				extension = extension.as_str(),
				marker = marker.as_str(),
				"compiling directive pattern"
			);
			patterns.insert(extension.clone(), LinePattern::new(extension, marker)?);
		}

		Ok(Self { patterns })
	}

	/// Return the compiled pattern for `extension` (with or without a leading
	/// dot).
	pub fn get(&self, extension: &str) -> Option<&LinePattern> {
		self.patterns.get(&normalize_extension(extension))
	}

	/// Supported extensions in sorted order.
	pub fn extensions(&self) -> impl Iterator<Item = &str> {
		self.patterns.keys().map(String::as_str)
	}
}
