use std::fmt::Write;

use crate::Properties;
use crate::Property;
use crate::PropertyValue;
use crate::Value;
use crate::ValueType;
use crate::VarconfError;
use crate::VarconfResult;
use crate::VariantPreprocessor;
use crate::lexer::LogicalLines;
use crate::lexer::split_directive;
use crate::lexer::split_values;
use crate::preprocessor::VARIANT_MACRO_OPEN;
use crate::properties::key_is_private;

/// Marks a property that cannot be redefined.
pub const LOCK_DECORATOR: &str = "const";

/// Options of a [`PropertiesReader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesReaderOptions {
	/// Reject every variant directive and macro.
	pub forbid_variants: bool,
	/// Drop properties whose key starts with `__`.
	pub skip_private: bool,
	/// Let a later line replace an earlier property with the same key.
	pub allow_key_override: bool,
}

/// The type part of a property line: `[const] type[[N]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TypeSpec {
	value_type: ValueType,
	size: Option<usize>,
	array: bool,
	locked: bool,
}

/// Reads the `key : type = value` body of a section into [`Properties`].
#[derive(Debug, Clone)]
pub struct PropertiesReader<'a> {
	preprocessor: VariantPreprocessor<'a>,
	options: PropertiesReaderOptions,
	origin: String,
	first_line: usize,
}

/// Per-pass state of the body reader.
#[derive(Default)]
struct BodyState {
	variants_enabled: bool,
	description: Option<String>,
	variant_only: Option<String>,
	/// Effective activity of each open `#@variant_if` block.
	variant_if: Vec<bool>,
}

impl<'a> PropertiesReader<'a> {
	pub fn new(preprocessor: VariantPreprocessor<'a>) -> Self {
		Self {
			preprocessor,
			options: PropertiesReaderOptions::default(),
			origin: "properties".to_string(),
			first_line: 1,
		}
	}

	#[must_use]
	pub fn with_options(mut self, options: PropertiesReaderOptions) -> Self {
		self.options = options;
		self
	}

	/// Name the stream in error messages and shift reported line numbers so
	/// the first body line is `first_line`.
	#[must_use]
	pub fn with_origin(mut self, origin: impl Into<String>, first_line: usize) -> Self {
		self.origin = origin.into();
		self.first_line = first_line;
		self
	}

	pub fn read(&self, text: &str) -> VarconfResult<Properties> {
		let mut properties = Properties::new();
		self.read_into(text, &mut properties)?;

		Ok(properties)
	}

	pub fn read_into(&self, text: &str, properties: &mut Properties) -> VarconfResult<()> {
		let offset = self.first_line - 1;
		let lines = LogicalLines::new(text).map(|(number, line)| (number + offset, line));

		self.read_lines(lines, properties)
	}

	/// Read lines that already carry their line number in the origin stream.
	/// Continuations must already be joined.
	pub fn read_lines<I>(&self, lines: I, properties: &mut Properties) -> VarconfResult<()>
	where
		I: IntoIterator<Item = (usize, String)>,
	{
		let mut state = BodyState {
			variants_enabled: !self.options.forbid_variants,
			..BodyState::default()
		};
		let mut last_line = self.first_line;

		for (number, line) in lines {
			last_line = number;
			self.read_line(&line, &mut state, properties)
				.map_err(|error| error.located(&self.origin, number))?;
		}

		if !state.variant_if.is_empty() {
			return Err(
				VarconfError::syntax("missing `#@variant_endif`").located(&self.origin, last_line),
			);
		}

		Ok(())
	}

	fn read_line(
		&self,
		line: &str,
		state: &mut BodyState,
		properties: &mut Properties,
	) -> VarconfResult<()> {
		let trimmed = line.trim();

		if trimmed.is_empty() {
			return Ok(());
		}

		if let Some((name, argument)) = split_directive(trimmed) {
			return self.read_directive(name, argument, state, properties);
		}

		if trimmed.starts_with('#') {
			return Ok(());
		}

		let description = state.description.take();
		let variant_only = state.variant_only.take();

		if state.variant_if.contains(&false) {
			tracing::trace!(line = trimmed, "property disabled by `#@variant_if`");
			return Ok(());
		}

		if let Some(descriptor) = variant_only {
			if !self.preprocessor.resolve_variant(&descriptor)?.effective() {
				tracing::trace!(line = trimmed, "property disabled by `#@variant_only`");
				return Ok(());
			}
		}

		self.read_property(trimmed, description, state, properties)
	}

	fn read_directive(
		&self,
		name: &str,
		argument: &str,
		state: &mut BodyState,
		properties: &mut Properties,
	) -> VarconfResult<()> {
		let variant_directive = matches!(
			name,
			"variant_only" | "variant_if" | "variant_endif" | "enable_variants"
		);

		if variant_directive && self.options.forbid_variants {
			return Err(VarconfError::forbidden(
				format!("#@{name}"),
				"variants are not supported by this reader",
			));
		}

		match name {
			"config" => properties.set_description(argument),
			"description" => state.description = Some(argument.to_string()),
			"enable_variants" => state.variants_enabled = true,
			"disable_variants" => state.variants_enabled = false,
			"variant_only" if state.variants_enabled => {
				if state.variant_only.is_some() {
					return Err(VarconfError::DirectiveReused("#@variant_only".to_string()));
				}
				state.variant_only = Some(argument.to_string());
			}
			"variant_if" if state.variants_enabled => {
				let active = if state.variant_if.contains(&false) {
					false
				} else {
					self.preprocessor.resolve_variant(argument)?.effective()
				};
				state.variant_if.push(active);
			}
			"variant_endif" if state.variants_enabled => {
				if state.variant_if.pop().is_none() {
					return Err(VarconfError::misplaced(
						"#@variant_endif",
						"no `#@variant_if` block is open",
					));
				}
			}
			"variant_only" | "variant_if" | "variant_endif" => {
				tracing::debug!(directive = name, "variants disabled, directive ignored");
			}
			_ => tracing::warn!(directive = name, "ignoring unknown directive"),
		}

		Ok(())
	}

	fn read_property(
		&self,
		line: &str,
		description: Option<String>,
		state: &BodyState,
		properties: &mut Properties,
	) -> VarconfResult<()> {
		let Some(assign) = line.find('=') else {
			return Err(VarconfError::syntax(format!(
				"cannot find assign symbol `=` in `{line}`"
			)));
		};
		let append = assign > 0 && line[..assign].ends_with('+');
		let declaration = &line[..assign - usize::from(append)];
		let raw_value = line[assign + 1..].trim();

		let (key, spec) = match declaration.split_once(':') {
			Some((key, spec)) => (key.trim(), Some(parse_type_spec(spec)?)),
			None => (declaration.trim(), None),
		};

		if key.is_empty() || key.contains(char::is_whitespace) {
			return Err(VarconfError::syntax(format!("invalid property key `{key}`")));
		}

		if self.options.skip_private && key_is_private(key) {
			return Ok(());
		}

		let expanded;
		let raw_value = if raw_value.contains(VARIANT_MACRO_OPEN) {
			if !state.variants_enabled {
				return Err(VarconfError::forbidden(
					VARIANT_MACRO_OPEN,
					format!("variants are disabled for property `{key}`"),
				));
			}

			expanded = self.preprocessor.preprocess(raw_value)?;
			expanded.trim()
		} else {
			raw_value
		};

		let Some(spec) = spec else {
			if append {
				return Err(VarconfError::syntax(format!(
					"append mode needs an array type for `{key}`"
				)));
			}

			let value = Value::parse(ValueType::String, raw_value)?;
			return self.store(properties, key, Property {
				value: PropertyValue::Scalar(value),
				description,
				locked: false,
			});
		};

		if !spec.array {
			if append {
				return Err(VarconfError::syntax(format!(
					"append mode is only supported for arrays, not `{key}`"
				)));
			}

			let value = Value::parse(spec.value_type, raw_value)?;
			return self.store(properties, key, Property {
				value: PropertyValue::Scalar(value),
				description,
				locked: spec.locked,
			});
		}

		let values = split_values(raw_value)?
			.into_iter()
			.map(|token| Value::parse(spec.value_type, token))
			.collect::<VarconfResult<Vec<_>>>()?;

		if let Some(size) = spec.size {
			if size != values.len() {
				return Err(VarconfError::syntax(format!(
					"array `{key}` declares {size} value(s) but {} were given",
					values.len()
				)));
			}
		}

		if append {
			return properties.append(key, spec.value_type, values);
		}

		self.store(properties, key, Property {
			value: PropertyValue::Array {
				value_type: spec.value_type,
				values,
			},
			description,
			locked: spec.locked,
		})
	}

	fn store(&self, properties: &mut Properties, key: &str, property: Property) -> VarconfResult<()> {
		if properties.has_key(key) && !self.options.allow_key_override {
			return Err(VarconfError::Duplicate {
				what: "property",
				name: key.to_string(),
			});
		}

		properties.store(key, property)
	}
}

fn parse_type_spec(spec: &str) -> VarconfResult<TypeSpec> {
	let mut tokens = spec.split_whitespace();
	let mut token = tokens.next();
	let locked = token == Some(LOCK_DECORATOR);

	if locked {
		token = tokens.next();
	}

	let Some(token) = token else {
		return Err(VarconfError::syntax(format!("missing type in `{}`", spec.trim())));
	};

	if let Some(extra) = tokens.next() {
		return Err(VarconfError::syntax(format!(
			"unsupported trailing token `{extra}` in `{}`",
			spec.trim()
		)));
	}

	let (label, array, size) = match token.split_once('[') {
		Some((label, rest)) => {
			let Some(size) = rest.strip_suffix(']') else {
				return Err(VarconfError::syntax(format!("invalid array size in `{token}`")));
			};
			let size = if size.trim().is_empty() {
				None
			} else {
				Some(size.trim().parse::<usize>().map_err(|_| {
					VarconfError::syntax(format!("invalid array size in `{token}`"))
				})?)
			};
			(label, true, size)
		}
		None => (token, false, None),
	};

	let value_type = ValueType::from_label(label)
		.ok_or_else(|| VarconfError::syntax(format!("invalid type specifier `{label}`")))?;

	Ok(TypeSpec {
		value_type,
		size,
		array,
		locked,
	})
}

/// Writes [`Properties`] in the body grammar read by [`PropertiesReader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesWriter {
	/// Leave out private properties.
	pub skip_private: bool,
}

impl PropertiesWriter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn write(&self, properties: &Properties) -> String {
		let mut out = String::new();

		if let Some(description) = properties.description() {
			let _ = writeln!(out, "#@config {description}");
			out.push('\n');
		}

		for (key, property) in properties.iter() {
			if self.skip_private && key_is_private(key) {
				continue;
			}

			if let Some(description) = &property.description {
				let _ = writeln!(out, "#@description {description}");
			}

			let lock = if property.locked {
				format!("{LOCK_DECORATOR} ")
			} else {
				String::new()
			};

			match &property.value {
				PropertyValue::Scalar(value) => {
					let _ = writeln!(
						out,
						"{key} : {lock}{} = {}",
						value.value_type(),
						value.to_literal()
					);
				}
				PropertyValue::Array { value_type, values } => {
					let literals: Vec<String> = values.iter().map(Value::to_literal).collect();
					let _ = write!(out, "{key} : {lock}{value_type}[{}] =", values.len());

					if !literals.is_empty() {
						let _ = write!(out, " {}", literals.join(" "));
					}

					out.push('\n');
				}
			}
		}

		out
	}
}
