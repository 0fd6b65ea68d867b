use crate::DirectiveError;
use crate::config::Constants;
use crate::directive::LinePattern;
use crate::pattern::ValuePattern;

/// The result of rewriting a line that carries a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRewrite {
	/// The rewritten line, without its line terminator.
	pub text: String,
	/// Name of the constant the directive refers to.
	pub constant: String,
	/// The value found in the code before rewriting.
	pub previous: String,
	/// The registry value written in its place.
	pub value: String,
	/// Whether `text` differs from the input line. A current value can still
	/// produce a change when trailing whitespace is trimmed.
	pub changed: bool,
}

impl LineRewrite {
	/// Whether the token already held the registry value.
	pub fn is_current(&self) -> bool {
		self.previous == self.value
	}

	/// Whether rewriting alters the line in any way.
	pub fn is_changed(&self) -> bool {
		self.changed
	}
}

/// Rewrite a single line.
///
/// Lines without a directive for `pattern`'s comment marker return
/// `Ok(None)` and must be kept byte for byte. For directive lines the value
/// regex is located inside the code before the marker, its first capture group
/// is replaced with the registry value, and the marker plus directive text are
/// copied from the input unchanged. Trailing spaces and tabs are trimmed from
/// the result.
pub fn rewrite_line(
	line: &str,
	pattern: &LinePattern,
	constants: &Constants,
) -> Result<Option<LineRewrite>, DirectiveError> {
	let Some(directive) = pattern.parse(line) else {
		return Ok(None);
	};

	let value_pattern = ValuePattern::compile(directive.pattern)?;
	value_pattern.matches(directive.code)?;
	let value = constants.value(directive.name).ok_or_else(|| {
		DirectiveError::UnknownConstant {
			name: directive.name.to_string(),
		}
	})?;
	let split = value_pattern.locate(directive.code)?;

	let mut text = split.render(value);
	text.push_str(directive.tail);
	let trimmed_len = text.trim_end_matches([' ', '\t']).len();
	text.truncate(trimmed_len);

	if text.len() != line.len() {
		tracing::warn!(
			before = line.len(),
			after = text.len(),
			line = text.as_str(),
			"line lengths differ"
		);
	}

	let changed = text != line;

	Ok(Some(LineRewrite {
		text,
		constant: directive.name.to_string(),
		previous: split.value().to_string(),
		value: value.to_string(),
		changed,
	}))
}
