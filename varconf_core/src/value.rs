use std::fmt;
use std::fmt::Write as _;

use float_cmp::approx_eq;
use serde::Serialize;
use snailquote::unescape;

use crate::VarconfError;
use crate::VarconfResult;

/// The scalar types a parameter or property can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
	Boolean,
	Integer,
	Real,
	String,
}

impl ValueType {
	/// The label used in configuration files, e.g. `integer`.
	pub fn label(self) -> &'static str {
		match self {
			Self::Boolean => "boolean",
			Self::Integer => "integer",
			Self::Real => "real",
			Self::String => "string",
		}
	}

	pub fn from_label(label: &str) -> Option<Self> {
		match label {
			"boolean" => Some(Self::Boolean),
			"integer" => Some(Self::Integer),
			"real" => Some(Self::Real),
			"string" => Some(Self::String),
			_ => None,
		}
	}
}

impl fmt::Display for ValueType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// A typed scalar value.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
	Boolean(bool),
	Integer(i64),
	Real(f64),
	String(String),
}

impl Eq for Value {}
impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Boolean(value), Value::Boolean(other_value)) => value == other_value,
			(Value::Integer(value), Value::Integer(other_value)) => value == other_value,
			(Value::Real(value), Value::Real(other_value)) => {
				approx_eq!(f64, *value, *other_value, ulps = 2)
			}
			(Value::String(value), Value::String(other_value)) => value == other_value,
			_ => false,
		}
	}
}

impl Value {
	pub fn value_type(&self) -> ValueType {
		match self {
			Self::Boolean(_) => ValueType::Boolean,
			Self::Integer(_) => ValueType::Integer,
			Self::Real(_) => ValueType::Real,
			Self::String(_) => ValueType::String,
		}
	}

	/// Parse `text` as a value of `value_type`.
	///
	/// Booleans accept `true`, `false`, `1` and `0`. Strings may be double
	/// quoted (with backslash escapes) or bare, in which case the trimmed
	/// text is taken as is.
	pub fn parse(value_type: ValueType, text: &str) -> VarconfResult<Self> {
		let trimmed = text.trim();

		match value_type {
			ValueType::Boolean => parse_boolean(trimmed).map(Self::Boolean),
			ValueType::Integer => trimmed
				.parse::<i64>()
				.map(Self::Integer)
				.map_err(|_| VarconfError::conversion(trimmed, "integer")),
			ValueType::Real => trimmed
				.parse::<f64>()
				.map(Self::Real)
				.map_err(|_| VarconfError::conversion(trimmed, "real")),
			ValueType::String => parse_string(trimmed).map(Self::String),
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Boolean(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_integer(&self) -> Option<i64> {
		match self {
			Self::Integer(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_real(&self) -> Option<f64> {
		match self {
			Self::Real(value) => Some(*value),
			Self::Integer(value) => Some(*value as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(value) => Some(value.as_str()),
			_ => None,
		}
	}

	/// The form used by values files and section bodies: `true`/`false`
	/// booleans and double-quoted strings.
	pub fn to_literal(&self) -> String {
		match self {
			Self::Boolean(value) => value.to_string(),
			Self::Integer(value) => value.to_string(),
			Self::Real(value) => format_real(*value),
			Self::String(value) => quote(value),
		}
	}

	/// The form substituted by `@variant(...)` macros: numeric booleans and
	/// raw string text.
	pub fn to_macro_text(&self) -> String {
		match self {
			Self::Boolean(value) => if *value { "1" } else { "0" }.to_string(),
			Self::String(value) => value.clone(),
			_ => self.to_literal(),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_literal())
	}
}

pub(crate) fn parse_boolean(text: &str) -> VarconfResult<bool> {
	match text {
		"true" | "1" => Ok(true),
		"false" | "0" => Ok(false),
		_ => Err(VarconfError::conversion(text, "boolean")),
	}
}

pub(crate) fn parse_string(text: &str) -> VarconfResult<String> {
	if text.starts_with('"') {
		if text.len() < 2 || !text.ends_with('"') {
			return Err(VarconfError::conversion(text, "string"));
		}

		return unescape(text).map_err(|_| VarconfError::conversion(text, "string"));
	}

	Ok(text.to_string())
}

/// Wrap `text` in double quotes. Backslashes, quotes and control characters
/// are escaped so the result stays on one line and unescapes to `text`.
pub fn quote(text: &str) -> String {
	let mut quoted = String::with_capacity(text.len() + 2);
	quoted.push('"');

	for character in text.chars() {
		match character {
			'\\' => quoted.push_str("\\\\"),
			'"' => quoted.push_str("\\\""),
			'\n' => quoted.push_str("\\n"),
			'\r' => quoted.push_str("\\r"),
			'\t' => quoted.push_str("\\t"),
			control if control.is_control() => {
				let _ = write!(quoted, "\\u{{{:x}}}", u32::from(control));
			}
			other => quoted.push(other),
		}
	}

	quoted.push('"');
	quoted
}

/// Remove one pair of matching surrounding quotes (`"` or `'`), if any.
pub fn strip_quotes(text: &str) -> &str {
	for quote in ['"', '\''] {
		if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
			return &text[1..text.len() - 1];
		}
	}

	text
}

fn format_real(value: f64) -> String {
	let text = value.to_string();

	if value.is_finite() && !text.contains(['.', 'e', 'E']) {
		format!("{text}.0")
	} else {
		text
	}
}
