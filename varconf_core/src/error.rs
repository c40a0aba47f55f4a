use miette::Diagnostic;
use thiserror::Error;

/// Broad failure classes shared by every operation in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Malformed line, directive, descriptor or unterminated macro tag.
	Parse,
	/// Unknown registry, record, model or include target.
	Reference,
	/// A lookup that needs an active repository or record did not have one.
	ContextInvalid,
	/// A value does not fit its target type or domain.
	TypeConversion,
	/// Path mismatch during tree-driven loading, misplaced or reused
	/// directives and edits that the current state forbids.
	Structural,
	/// Filesystem failures.
	Io,
	/// Invalid `varconf.toml`.
	Config,
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum VarconfError {
	#[error(transparent)]
	#[diagnostic(code(varconf::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(varconf::config_parse),
		help("check that varconf.toml is valid TOML with a `[[registries]]` table per registry")
	)]
	ConfigParse(String),

	#[error("{origin}:{line}: {source}")]
	#[diagnostic(code(varconf::located))]
	Located {
		origin: String,
		line: usize,
		#[source]
		source: Box<VarconfError>,
	},

	#[error("syntax error: {0}")]
	#[diagnostic(code(varconf::syntax))]
	Syntax(String),

	#[error("invalid variant descriptor `{descriptor}`: {reason}")]
	#[diagnostic(
		code(varconf::invalid_descriptor),
		help("descriptors look like `registry:path`, optionally prefixed by `!` and followed by `|default`")
	)]
	InvalidDescriptor { descriptor: String, reason: String },

	#[error("cannot find variant close tag in `{0}`")]
	#[diagnostic(
		code(varconf::unterminated_macro),
		help("close the macro with `)`, for example `@variant(registry:path|default)`")
	)]
	UnterminatedMacro(String),

	#[error("unknown registry `{0}`")]
	#[diagnostic(code(varconf::unknown_registry))]
	UnknownRegistry(String),

	#[error("registry `{registry}` has no record with path `{path}`")]
	#[diagnostic(code(varconf::unknown_record))]
	UnknownRecord { registry: String, path: String },

	#[error("unknown {kind} model `{name}`")]
	#[diagnostic(code(varconf::unknown_model))]
	UnknownModel { kind: &'static str, name: String },

	#[error("property `{0}` does not exist")]
	#[diagnostic(code(varconf::unknown_property))]
	UnknownProperty(String),

	#[error("cannot resolve `{path}`: file was not found")]
	#[diagnostic(
		code(varconf::include_not_found),
		help("add the containing directory with `#@include_dir` or an include path environment variable")
	)]
	IncludeNotFound { path: String },

	#[error("include directory `{0}` does not correspond to a directory")]
	#[diagnostic(code(varconf::include_dir))]
	IncludeDir(String),

	#[error("no active variant repository to resolve `{0}`")]
	#[diagnostic(
		code(varconf::no_repository),
		help("add a default value with `|`, for example `registry:path|false`")
	)]
	NoActiveRepository(String),

	#[error("record `{path}` in registry `{registry}` is not active")]
	#[diagnostic(code(varconf::inactive_record))]
	InactiveRecord { registry: String, path: String },

	#[error("parameter `{path}` in registry `{registry}` has no value")]
	#[diagnostic(code(varconf::unset_value))]
	UnsetValue { registry: String, path: String },

	#[error("cannot convert `{value}` to {expected}")]
	#[diagnostic(code(varconf::type_conversion))]
	TypeConversion { value: String, expected: String },

	#[error("value `{value}` is not allowed for parameter `{path}`")]
	#[diagnostic(code(varconf::value_not_allowed))]
	ValueNotAllowed { path: String, value: String },

	#[error("expected a line for `{expected}`, found `{found}`")]
	#[diagnostic(
		code(varconf::path_mismatch),
		help("values files must list active parameters in ranked order")
	)]
	PathMismatch { expected: String, found: String },

	#[error("directive `{0}` is already set")]
	#[diagnostic(code(varconf::directive_reused))]
	DirectiveReused(String),

	#[error("directive `{directive}` is misplaced: {reason}")]
	#[diagnostic(code(varconf::directive_misplaced))]
	DirectiveMisplaced { directive: String, reason: String },

	#[error("directive `{directive}` is forbidden: {reason}")]
	#[diagnostic(code(varconf::directive_forbidden))]
	DirectiveForbidden { directive: String, reason: String },

	#[error("label mismatch: expected `{expected}`, found `{found}`")]
	#[diagnostic(code(varconf::label_mismatch))]
	LabelMismatch { expected: String, found: String },

	#[error("parameter `{0}` is fixed and cannot be changed")]
	#[diagnostic(code(varconf::fixed_parameter))]
	FixedParameter(String),

	#[error("repository `{0}` is locked")]
	#[diagnostic(
		code(varconf::locked_repository),
		help("call `unlock()` before editing the repository structure")
	)]
	LockedRepository(String),

	#[error("property `{0}` is locked")]
	#[diagnostic(code(varconf::locked_property))]
	LockedProperty(String),

	#[error("duplicate {what} `{name}`")]
	#[diagnostic(code(varconf::duplicate))]
	Duplicate { what: &'static str, name: String },

	#[error("invalid name `{name}`: {reason}")]
	#[diagnostic(code(varconf::invalid_name))]
	InvalidName { name: String, reason: String },

	#[error("a reporting sink is already attached to repository `{0}`")]
	#[diagnostic(code(varconf::reporting_attached))]
	ReportingAttached(String),

	#[error("variant model `{0}` contains itself")]
	#[diagnostic(code(varconf::recursive_model))]
	RecursiveModel(String),

	#[error("cannot resolve section gate `{descriptor}`")]
	#[diagnostic(
		code(varconf::section_gate),
		help("add a missing default boolean value, for example `{descriptor}|false`")
	)]
	SectionGate {
		descriptor: String,
		#[source]
		source: Box<VarconfError>,
	},

	#[error("environment variable `{0}` is not defined")]
	#[diagnostic(code(varconf::undefined_variable))]
	UndefinedVariable(String),

	#[error("variant `{0}` cannot be selected: no value of its parameter maps to it")]
	#[diagnostic(code(varconf::unselectable_variant))]
	UnselectableVariant(String),
}

impl VarconfError {
	/// Wrap an error with the stream name and line it was raised at. Errors
	/// that already carry a location keep it.
	pub fn located(self, origin: impl Into<String>, line: usize) -> Self {
		if matches!(self, Self::Located { .. }) {
			return self;
		}

		Self::Located {
			origin: origin.into(),
			line,
			source: Box::new(self),
		}
	}

	pub fn syntax(message: impl Into<String>) -> Self {
		Self::Syntax(message.into())
	}

	pub fn descriptor(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidDescriptor {
			descriptor: descriptor.into(),
			reason: reason.into(),
		}
	}

	pub fn conversion(value: impl Into<String>, expected: impl Into<String>) -> Self {
		Self::TypeConversion {
			value: value.into(),
			expected: expected.into(),
		}
	}

	pub fn misplaced(directive: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::DirectiveMisplaced {
			directive: directive.into(),
			reason: reason.into(),
		}
	}

	pub fn forbidden(directive: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::DirectiveForbidden {
			directive: directive.into(),
			reason: reason.into(),
		}
	}

	/// The failure class of this error. Located errors report the class of
	/// the error they wrap.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Io(_) | Self::IncludeDir(_) => ErrorKind::Io,
			Self::ConfigParse(_) => ErrorKind::Config,
			Self::Located { source, .. } => source.kind(),
			Self::Syntax(_)
			| Self::InvalidDescriptor { .. }
			| Self::UnterminatedMacro(_)
			| Self::SectionGate { .. } => ErrorKind::Parse,
			Self::UnknownRegistry(_)
			| Self::UnknownRecord { .. }
			| Self::UnknownModel { .. }
			| Self::UnknownProperty(_)
			| Self::IncludeNotFound { .. }
			| Self::UndefinedVariable(_)
			| Self::UnsetValue { .. } => ErrorKind::Reference,
			Self::NoActiveRepository(_) | Self::InactiveRecord { .. } => ErrorKind::ContextInvalid,
			Self::TypeConversion { .. } | Self::ValueNotAllowed { .. } => ErrorKind::TypeConversion,
			Self::PathMismatch { .. }
			| Self::DirectiveReused(_)
			| Self::DirectiveMisplaced { .. }
			| Self::DirectiveForbidden { .. }
			| Self::LabelMismatch { .. }
			| Self::FixedParameter(_)
			| Self::LockedRepository(_)
			| Self::LockedProperty(_)
			| Self::Duplicate { .. }
			| Self::InvalidName { .. }
			| Self::ReportingAttached(_)
			| Self::RecursiveModel(_)
			| Self::UnselectableVariant(_) => ErrorKind::Structural,
		}
	}
}

pub type VarconfResult<T> = Result<T, VarconfError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
