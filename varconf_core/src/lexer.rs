use logos::Logos;
use snailquote::unescape;

use crate::VarconfError;
use crate::VarconfResult;

/// Raw tokens of a section header line such as `[name="alpha" type="widget"]`.
#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r]+")]
enum HeaderToken {
	#[token("[")]
	Open,
	#[token("]")]
	Close,
	#[token("=")]
	Equals,
	#[regex(r#""([^"\\]|\\.)*""#)]
	Quoted,
	#[regex(r#"[^ \t\r\[\]="]+"#)]
	Word,
}

/// A parsed section header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionHeader {
	/// `label="value"` pairs in order.
	pub fields: Vec<(String, String)>,
	/// The name of a bare `[name]` header.
	pub bare: Option<String>,
	/// Non-blank text following the closing bracket.
	pub trailing: Option<String>,
}

impl SectionHeader {
	pub fn field(&self, label: &str) -> Option<&str> {
		self.fields
			.iter()
			.find(|(candidate, _)| candidate == label)
			.map(|(_, value)| value.as_str())
	}
}

/// States of the header walker.
enum HeaderState {
	/// Expecting a label, a bare name or the closing bracket.
	Label,
	/// A label was read: `=` must follow, or `]` for a bare header.
	Equals(String),
	/// `label=` was read and a quoted value must follow.
	Value(String),
}

/// Parse a `[label="value" ...]` or legacy `[name]` header line.
pub fn parse_section_header(line: &str) -> VarconfResult<SectionHeader> {
	let source = line.trim();
	let mut lexer = HeaderToken::lexer(source);
	let invalid =
		|reason: &str| VarconfError::syntax(format!("invalid section header `{source}`: {reason}"));

	if lexer.next() != Some(Ok(HeaderToken::Open)) {
		return Err(invalid("expected `[`"));
	}

	let mut header = SectionHeader::default();
	let mut state = HeaderState::Label;

	loop {
		let Some(token) = lexer.next() else {
			return Err(invalid("missing `]`"));
		};
		let Ok(token) = token else {
			return Err(invalid("unterminated quoted value"));
		};

		state = match (state, token) {
			(HeaderState::Label, HeaderToken::Close) if !header.fields.is_empty() => break,
			(HeaderState::Label, HeaderToken::Word) => HeaderState::Equals(lexer.slice().to_string()),
			(HeaderState::Equals(label), HeaderToken::Equals) => HeaderState::Value(label),
			(HeaderState::Equals(label), HeaderToken::Close) if header.fields.is_empty() => {
				header.bare = Some(label);
				break;
			}
			(HeaderState::Value(label), HeaderToken::Quoted) => {
				let value = unescape(lexer.slice())
					.map_err(|_| invalid("invalid escape in quoted value"))?;
				header.fields.push((label, value));
				HeaderState::Label
			}
			(HeaderState::Value(_), _) => return Err(invalid("values must be double quoted")),
			(HeaderState::Equals(_), _) => return Err(invalid("expected `=` after a label")),
			(HeaderState::Label, _) => return Err(invalid("unexpected token")),
		};
	}

	let rest = source[lexer.span().end..].trim();
	if !rest.is_empty() {
		header.trailing = Some(rest.to_string());
	}

	Ok(header)
}

/// Raw tokens of a whitespace-separated value list.
#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum ValueToken {
	#[regex(r#""([^"\\]|\\.)*""#)]
	Quoted,
	#[regex(r#"[^ \t\r\n"]+"#)]
	Bare,
}

/// Split an array value into raw tokens. Quoted tokens keep their quotes.
pub fn split_values(text: &str) -> VarconfResult<Vec<&str>> {
	let mut lexer = ValueToken::lexer(text);
	let mut tokens = vec![];

	while let Some(token) = lexer.next() {
		if token.is_err() {
			return Err(VarconfError::syntax(format!(
				"unterminated quoted value in `{}`",
				text.trim()
			)));
		}

		tokens.push(lexer.slice());
	}

	Ok(tokens)
}

/// Read the double-quoted argument of a directive.
pub fn quoted_argument(directive: &str, argument: &str) -> VarconfResult<String> {
	let argument = argument.trim();

	if argument.len() < 2 || !argument.starts_with('"') || !argument.ends_with('"') {
		return Err(VarconfError::syntax(format!(
			"unquoted value for `{directive}`: `{argument}`"
		)));
	}

	unescape(argument).map_err(|_| {
		VarconfError::syntax(format!("invalid quoted value for `{directive}`: `{argument}`"))
	})
}

/// Split a `#@name argument` comment into its name and trimmed argument.
pub fn split_directive(line: &str) -> Option<(&str, &str)> {
	let body = line.trim().strip_prefix("#@")?;
	let (name, argument) = body
		.split_once(char::is_whitespace)
		.unwrap_or((body, ""));

	Some((name, argument.trim()))
}

/// Lines with trailing `\` continuations joined, numbered from 1 by the
/// line they start on.
pub struct LogicalLines<'a> {
	lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> LogicalLines<'a> {
	pub fn new(text: &'a str) -> Self {
		Self {
			lines: text.lines().enumerate(),
		}
	}
}

impl Iterator for LogicalLines<'_> {
	type Item = (usize, String);

	fn next(&mut self) -> Option<Self::Item> {
		let (index, first) = self.lines.next()?;
		let mut line = first.to_string();

		while line.ends_with('\\') {
			line.pop();
			match self.lines.next() {
				Some((_, next)) => line.push_str(next),
				None => break,
			}
		}

		Some((index + 1, line))
	}
}
