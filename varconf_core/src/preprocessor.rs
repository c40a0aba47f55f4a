use crate::VarconfError;
use crate::VarconfResult;
use crate::VariantRepository;
use crate::repository::REGISTRY_SEPARATOR;
use crate::value::parse_boolean;
use crate::value::strip_quotes;

/// Opening tag of a parameter macro.
pub const VARIANT_MACRO_OPEN: &str = "@variant(";
/// Closing tag of a parameter macro.
pub const VARIANT_MACRO_CLOSE: char = ')';
/// Separates a descriptor from its fallback default.
pub const DEFAULT_SEPARATOR: char = '|';
/// Negates a variant descriptor.
pub const REVERSE_PREFIX: char = '!';

/// Outcome of [`VariantPreprocessor::resolve_variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantResolution {
	pub active: bool,
	pub reverse: bool,
}

impl VariantResolution {
	/// The activation with the negation applied.
	pub fn effective(self) -> bool {
		self.active != self.reverse
	}
}

/// Resolves `@variant(...)` macros and variant descriptors against a
/// repository.
///
/// A preprocessor without a repository, or bound to one that has no
/// registries, behaves as if no repository were active: descriptors then
/// fall back to their default.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantPreprocessor<'a> {
	repository: Option<&'a VariantRepository>,
	remove_quotes: bool,
	trace: bool,
}

impl<'a> VariantPreprocessor<'a> {
	pub fn new(repository: &'a VariantRepository) -> Self {
		Self {
			repository: Some(repository),
			remove_quotes: false,
			trace: false,
		}
	}

	/// A preprocessor bound to no repository.
	pub fn unbound() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_remove_quotes(mut self, remove_quotes: bool) -> Self {
		self.remove_quotes = remove_quotes;
		self
	}

	#[must_use]
	pub fn with_trace(mut self, trace: bool) -> Self {
		self.trace = trace;
		self
	}

	pub fn set_trace(&mut self, trace: bool) {
		self.trace = trace;
	}

	pub fn is_trace(&self) -> bool {
		self.trace
	}

	pub fn repository(&self) -> Option<&'a VariantRepository> {
		self.repository
	}

	pub fn repository_is_active(&self) -> bool {
		self.repository
			.is_some_and(VariantRepository::is_active)
	}

	/// Resolve `["!"]registry:path["|"default]` to the activation of a
	/// variant.
	///
	/// Without an active repository the default is returned as is and the
	/// negation is dropped.
	pub fn resolve_variant(&self, descriptor: &str) -> VarconfResult<VariantResolution> {
		let (core, default) = match split_default(descriptor) {
			(core, Some(default)) => {
				let default = parse_boolean(default.trim()).map_err(|_| {
					VarconfError::descriptor(
						descriptor,
						format!("invalid default boolean value `{}`", default.trim()),
					)
				})?;
				(core, Some(default))
			}
			(core, None) => (core, None),
		};

		let core = core.trim();
		let (reverse, core) = match core.strip_prefix(REVERSE_PREFIX) {
			Some(rest) => (true, rest),
			None => (false, core),
		};
		let (registry, path) = split_descriptor(descriptor, core)?;

		let Some(repository) = self.repository.filter(|repository| repository.is_active()) else {
			return match default {
				Some(active) => {
					if self.trace {
						tracing::debug!(descriptor, active, "no active repository, using default");
					}

					Ok(VariantResolution {
						active,
						reverse: false,
					})
				}
				None => Err(VarconfError::NoActiveRepository(descriptor.to_string())),
			};
		};

		if !repository.registry(registry)?.has_variant(path) {
			return Err(VarconfError::UnknownRecord {
				registry: registry.to_string(),
				path: path.to_string(),
			});
		}

		let active = repository.is_active_variant(registry, path)?;

		if self.trace {
			tracing::debug!(descriptor, active, reverse, "resolved variant");
		}

		Ok(VariantResolution { active, reverse })
	}

	/// Resolve `registry:path["|"default]` to the current value of a
	/// parameter in macro form.
	pub fn preprocess_parameter(&self, descriptor: &str) -> VarconfResult<String> {
		let (core, default) = split_default(descriptor);
		let (registry, path) = split_descriptor(descriptor, core.trim())?;

		let value = match self.repository.filter(|repository| repository.is_active()) {
			Some(repository) => {
				let value = repository.registry(registry)?.get_parameter_value(path)?;
				repository.record_usage(&format!("{registry}{REGISTRY_SEPARATOR}{path}"));
				value
			}
			None => {
				default
					.map(ToString::to_string)
					.ok_or_else(|| VarconfError::NoActiveRepository(descriptor.to_string()))?
			}
		};

		if self.trace {
			tracing::debug!(descriptor, %value, "preprocessed parameter");
		}

		if self.remove_quotes {
			Ok(strip_quotes(&value).to_string())
		} else {
			Ok(value)
		}
	}

	/// Replace every `@variant(...)` macro of `text`, scanning left to right.
	pub fn preprocess(&self, text: &str) -> VarconfResult<String> {
		let mut output = String::with_capacity(text.len());
		let mut rest = text;

		while let Some(start) = rest.find(VARIANT_MACRO_OPEN) {
			output.push_str(&rest[..start]);
			let inner = &rest[start + VARIANT_MACRO_OPEN.len()..];
			let Some(end) = inner.find(VARIANT_MACRO_CLOSE) else {
				return Err(VarconfError::UnterminatedMacro(text.to_string()));
			};

			output.push_str(&self.preprocess_parameter(&inner[..end])?);
			rest = &inner[end + 1..];
		}

		output.push_str(rest);

		Ok(output)
	}

	/// Expand macros and strip one pair of surrounding double quotes.
	pub fn preprocess_string(&self, text: &str) -> VarconfResult<String> {
		let expanded = self.preprocess(text)?;
		let trimmed = expanded.trim();

		match trimmed
			.strip_prefix('"')
			.and_then(|inner| inner.strip_suffix('"'))
		{
			Some(inner) => Ok(inner.to_string()),
			None => Ok(expanded),
		}
	}

	pub fn preprocess_boolean(&self, text: &str) -> VarconfResult<bool> {
		let expanded = self.preprocess(text)?;
		parse_boolean(expanded.trim())
	}

	pub fn preprocess_integer(&self, text: &str) -> VarconfResult<i64> {
		let expanded = self.preprocess(text)?;
		expanded
			.trim()
			.parse()
			.map_err(|_| VarconfError::conversion(expanded.trim(), "integer"))
	}

	pub fn preprocess_real(&self, text: &str) -> VarconfResult<f64> {
		let expanded = self.preprocess(text)?;
		expanded
			.trim()
			.parse()
			.map_err(|_| VarconfError::conversion(expanded.trim(), "real"))
	}

	/// Apply [`Self::preprocess_string`] to every argument.
	pub fn preprocess_args(&self, args: &[String]) -> VarconfResult<Vec<String>> {
		args.iter()
			.map(|arg| self.preprocess_string(arg))
			.collect()
	}
}

/// Split `core|default|...` on every separator. Tokens after the default
/// are ignored.
fn split_default(descriptor: &str) -> (&str, Option<&str>) {
	let mut tokens = descriptor.split(DEFAULT_SEPARATOR);
	let core = tokens.next().unwrap_or(descriptor);

	(core, tokens.next())
}

fn split_descriptor<'d>(descriptor: &str, core: &'d str) -> VarconfResult<(&'d str, &'d str)> {
	let tokens: Vec<&str> = core.split(REGISTRY_SEPARATOR).collect();

	match tokens.as_slice() {
		[registry, path] if !registry.trim().is_empty() && !path.trim().is_empty() => {
			Ok((registry.trim(), path.trim()))
		}
		[registry, _] if registry.trim().is_empty() => {
			Err(VarconfError::descriptor(descriptor, "missing registry name"))
		}
		[_, _] => Err(VarconfError::descriptor(descriptor, "missing variant path")),
		_ => {
			Err(VarconfError::descriptor(
				descriptor,
				"expected exactly one `:` between a registry and a path",
			))
		}
	}
}
