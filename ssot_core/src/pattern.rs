use std::ops::Range;

use regex::Regex;

use crate::DirectiveError;

/// Which ends of a value regex are anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Anchoring {
	/// The pattern starts with `^`.
	pub start: bool,
	/// The pattern ends with an unescaped `$`.
	pub end: bool,
}

impl Anchoring {
	pub fn detect(source: &str) -> Self {
		let start = source.starts_with('^');
		let end = source.ends_with('$') && !is_escaped(source, source.len() - 1);

		Self { start, end }
	}
}

/// Whether the byte at `index` is preceded by an odd number of backslashes.
fn is_escaped(source: &str, index: usize) -> bool {
	source.as_bytes()[..index]
		.iter()
		.rev()
		.take_while(|&&byte| byte == b'\\')
		.count() % 2
		== 1
}

/// Wrap a value regex so that a match partitions the whole input into
/// `before`, the match itself and `after`.
///
/// The first group captures the text before the match and the last group the
/// text after it. Anchored ends get an empty group instead. The user pattern
/// is kept verbatim inside a non-capturing group, so its own capture groups
/// start at index 2.
///
/// ```
/// use ssot_core::decorated_source;
///
/// assert_eq!(decorated_source(r"v(\d+)"), r"^(.*?)(?:v(\d+))(.*)$");
/// assert_eq!(decorated_source(r"^v(\d+)$"), r"^()(?:^v(\d+)$)()$");
/// ```
pub fn decorated_source(source: &str) -> String {
	let anchoring = Anchoring::detect(source);
	let before = if anchoring.start { "()" } else { "(.*?)" };
	let after = if anchoring.end { "()" } else { "(.*)" };

	format!("^{before}(?:{source}){after}$")
}

/// Compile the decorated form of `source`. See [`decorated_source`].
pub fn decorate(source: &str) -> Result<Regex, DirectiveError> {
	if source.is_empty() {
		return Err(DirectiveError::RegexCompile {
			pattern: String::new(),
			reason: "regular expression is empty".to_string(),
		});
	}

	Regex::new(&decorated_source(source)).map_err(|e| {
		DirectiveError::RegexCompile {
			pattern: source.to_string(),
			reason: e.to_string(),
		}
	})
}

/// A value regex taken from a directive.
///
/// Only the plain regex is compiled up front. The decorated form used to split
/// the code is built by [`ValuePattern::locate`], once the directive is known
/// to refer to a real constant.
#[derive(Debug, Clone)]
pub struct ValuePattern {
	source: String,
	regex: Regex,
}

impl ValuePattern {
	pub fn compile(source: &str) -> Result<Self, DirectiveError> {
		let regex = Regex::new(source).map_err(|e| {
			DirectiveError::RegexCompile {
				pattern: source.to_string(),
				reason: e.to_string(),
			}
		})?;

		Ok(Self {
			source: source.to_string(),
			regex,
		})
	}

	pub fn source(&self) -> &str {
		&self.source
	}

	/// Check that the pattern matches `code` and captures a value.
	///
	/// Fails with [`DirectiveError::RegexNoMatch`] when the pattern does not
	/// match and [`DirectiveError::RegexNoCapture`] when it matches without a
	/// first capture group to replace.
	pub fn matches(&self, code: &str) -> Result<(), DirectiveError> {
		let found = self
			.regex
			.captures(code)
			.ok_or_else(|| self.no_match(code))?;
		if found.get(1).is_none() {
			return Err(self.no_capture());
		}

		Ok(())
	}

	/// Locate the token this pattern describes inside `code`.
	///
	/// Runs the checks of [`ValuePattern::matches`] first, then compiles the
	/// decorated form. Inline flags that change how the wrapper parses, such as
	/// `(?x)`, surface here as [`DirectiveError::RegexCompile`].
	pub fn locate<'a>(&self, code: &'a str) -> Result<TokenSplit<'a>, DirectiveError> {
		self.matches(code)?;

		let decorated = decorate(&self.source)?;
		let parts = decorated
			.captures(code)
			.ok_or_else(|| self.no_match(code))?;
		let (Some(before), Some(after), Some(value)) =
			(parts.get(1), parts.get(parts.len() - 1), parts.get(2))
		else {
			return Err(self.no_capture());
		};

		let token_start = before.end();
		let token_end = after.start();
		let value = (value.start() - token_start)..(value.end() - token_start);

		Ok(TokenSplit {
			before: before.as_str(),
			token: &code[token_start..token_end],
			after: after.as_str(),
			value,
		})
	}

	fn no_match(&self, code: &str) -> DirectiveError {
		DirectiveError::RegexNoMatch {
			pattern: self.source.clone(),
			code: code.to_string(),
		}
	}

	fn no_capture(&self) -> DirectiveError {
		DirectiveError::RegexNoCapture {
			pattern: self.source.clone(),
		}
	}
}

/// The code before a directive split around the located token.
///
/// `before + token + after` is always the original code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSplit<'a> {
	/// Everything before the token.
	pub before: &'a str,
	/// The full text matched by the value regex, including fixed context.
	pub token: &'a str,
	/// Everything after the token.
	pub after: &'a str,
	/// Byte range of the replaceable value inside `token`.
	value: Range<usize>,
}

impl<'a> TokenSplit<'a> {
	/// The current value: the text of the first capture group.
	pub fn value(&self) -> &'a str {
		&self.token[self.value.clone()]
	}

	/// The token with its value swapped for `replacement`; fixed context
	/// around the value is kept.
	pub fn replaced_token(&self, replacement: &str) -> String {
		let mut token = String::with_capacity(self.token.len() + replacement.len());
		token.push_str(&self.token[..self.value.start]);
		token.push_str(replacement);
		token.push_str(&self.token[self.value.end..]);
		token
	}

	/// The full code with the value swapped for `replacement`.
	pub fn render(&self, replacement: &str) -> String {
		let token = self.replaced_token(replacement);
		let mut code = String::with_capacity(self.before.len() + token.len() + self.after.len());
		code.push_str(self.before);
		code.push_str(&token);
		code.push_str(self.after);
		code
	}
}
