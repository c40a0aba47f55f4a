//! Line-oriented persistence of the active values of a repository.
//!
//! ```text
//! #@format=datatools::configuration::variant
//! #@format.version=1.0
//! #@organization=acme
//! #@application=simulation
//!
//! [registry="geometry"]
//! has_detector = true
//! has_detector/if_detector/length = 2.5
//! ```
//!
//! Loading walks the record tree of each registry in ranked order and
//! expects every consumed line to name the record being visited.

use std::io::Write;

use crate::RecordId;
use crate::RecordNode;
use crate::Value;
use crate::VarconfError;
use crate::VarconfResult;
use crate::VariantRegistry;
use crate::VariantRepository;
use crate::lexer::parse_section_header;

/// Written in place of a value for a parameter without one.
pub const UNSET_LABEL: &str = "__unset__";
/// Identifies the values file format.
pub const FORMAT_LABEL: &str = "datatools::configuration::variant";
/// Current format version.
pub const FORMAT_VERSION: (u32, u32) = (1, 0);
/// Label of the registry section header.
pub const REGISTRY_LABEL: &str = "registry";

/// Result of loading a registry or repository that did not raise an
/// error. `Failed` is recoverable: the caller may go on with the next
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
	Ok,
	Failed,
}

impl LoadStatus {
	/// `0` on success, `1` otherwise.
	pub fn code(self) -> i32 {
		match self {
			Self::Ok => 0,
			Self::Failed => 1,
		}
	}

	pub fn is_ok(self) -> bool {
		self == Self::Ok
	}
}

/// Cursor over the content lines of a values file.
pub struct ValuesLines<'a> {
	lines: Vec<(usize, &'a str)>,
	cursor: usize,
}

impl<'a> ValuesLines<'a> {
	pub fn new(text: &'a str) -> Self {
		Self {
			lines: text
				.lines()
				.enumerate()
				.map(|(index, line)| (index + 1, line.trim()))
				.filter(|(_, line)| !line.is_empty())
				.collect(),
			cursor: 0,
		}
	}

	/// The next non-blank line that is not a plain `#` comment.
	fn peek(&mut self) -> Option<(usize, &'a str)> {
		while let Some(&(number, line)) = self.lines.get(self.cursor) {
			if line.starts_with('#') && !line.starts_with("#@") {
				self.cursor += 1;
				continue;
			}

			return Some((number, line));
		}

		None
	}

	fn advance(&mut self) {
		self.cursor += 1;
	}

	/// The number of the line about to be read, or of the last line.
	fn line_number(&self) -> usize {
		self.lines
			.get(self.cursor)
			.or_else(|| self.lines.last())
			.map_or(0, |(number, _)| *number)
	}
}

/// Stores and loads repositories, registries and records.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiIo {
	/// Neither write nor validate the `#@format` header.
	pub no_header: bool,
	/// Fail on sections naming unknown registries instead of skipping them.
	pub dont_ignore_unknown_registries: bool,
	pub trace: bool,
}

impl AsciiIo {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_no_header(mut self, no_header: bool) -> Self {
		self.no_header = no_header;
		self
	}

	#[must_use]
	pub fn with_strict(mut self, strict: bool) -> Self {
		self.dont_ignore_unknown_registries = strict;
		self
	}

	#[must_use]
	pub fn with_trace(mut self, trace: bool) -> Self {
		self.trace = trace;
		self
	}

	/// Write the header and one section per active registry.
	pub fn store_repository<W: Write>(
		&self,
		out: &mut W,
		repository: &VariantRepository,
	) -> VarconfResult<()> {
		if !self.no_header {
			writeln!(out, "#@format={FORMAT_LABEL}")?;
			writeln!(out, "#@format.version={}.{}", FORMAT_VERSION.0, FORMAT_VERSION.1)?;

			if let Some(organization) = repository.organization() {
				writeln!(out, "#@organization={organization}")?;
			}

			if let Some(application) = repository.application() {
				writeln!(out, "#@application={application}")?;
			}

			writeln!(out)?;
		}

		for name in repository.ordered_registry_names() {
			if !repository.is_active_registry(&name)? {
				if self.trace {
					tracing::debug!(registry = %name, "skipping inactive registry");
				}
				continue;
			}

			writeln!(out, "[{REGISTRY_LABEL}=\"{name}\"]")?;
			self.store_registry(out, repository.registry(&name)?)?;
			writeln!(out)?;
		}

		Ok(())
	}

	pub fn store_repository_to_string(&self, repository: &VariantRepository) -> VarconfResult<String> {
		let mut buffer = Vec::new();
		self.store_repository(&mut buffer, repository)?;

		String::from_utf8(buffer).map_err(|error| VarconfError::syntax(error.to_string()))
	}

	pub fn store_registry<W: Write>(&self, out: &mut W, registry: &VariantRegistry) -> VarconfResult<()> {
		for &id in registry.ranked_parameters() {
			self.store_record(out, registry, id)?;
		}

		Ok(())
	}

	/// Write an active record and its active descendants.
	pub fn store_record<W: Write>(
		&self,
		out: &mut W,
		registry: &VariantRegistry,
		id: RecordId,
	) -> VarconfResult<()> {
		if !registry.is_active(id) {
			return Ok(());
		}

		let record = registry.record(id);

		match &record.node {
			RecordNode::Parameter { model, value } => {
				if model.is_variable() {
					match value {
						Some(value) => writeln!(out, "{} = {}", record.path(), value.to_literal())?,
						None => {
							writeln!(out, "{} = {UNSET_LABEL}", record.path())?;
							return Ok(());
						}
					}
				}

				for (_, daughter) in record.daughters() {
					self.store_record(out, registry, daughter)?;
				}
			}
			RecordNode::Variant { .. } => {
				for &daughter in registry.ranked_parameter_daughters(id) {
					self.store_record(out, registry, daughter)?;
				}
			}
		}

		Ok(())
	}

	/// Load a values file into `repository`.
	///
	/// A registry section that cannot be loaded completely is logged and
	/// skipped, and the final status is [`LoadStatus::Failed`]. Structural
	/// problems raise errors.
	pub fn load_repository(
		&self,
		text: &str,
		repository: &mut VariantRepository,
	) -> VarconfResult<LoadStatus> {
		let mut lines = ValuesLines::new(text);
		let mut status = LoadStatus::Ok;
		let mut sections_started = false;

		while let Some((number, line)) = lines.peek() {
			if let Some(meta) = line.strip_prefix("#@") {
				if sections_started {
					return Err(VarconfError::misplaced(
						line,
						"metacomments are only allowed before the first registry section",
					)
					.located("values", number));
				}

				self.load_metacomment(meta, repository)
					.map_err(|error| error.located("values", number))?;
				lines.advance();
				continue;
			}

			if !line.starts_with('[') {
				return Err(
					VarconfError::syntax(format!("unexpected line `{line}`")).located("values", number),
				);
			}

			sections_started = true;
			lines.advance();

			let name =
				registry_section_name(line).map_err(|error| error.located("values", number))?;

			if !repository.has_registry(&name) {
				if self.dont_ignore_unknown_registries {
					return Err(VarconfError::UnknownRegistry(name).located("values", number));
				}

				tracing::warn!(registry = %name, "ignoring values of unknown registry");
				skip_section(&mut lines);
				continue;
			}

			let registry = repository.registry_mut(&name)?;
			let registry_status = self.load_registry(&mut lines, registry)?;

			if !registry_status.is_ok() {
				tracing::error!(
					registry = %name,
					line = lines.line_number(),
					"cannot load registry values"
				);
				status = LoadStatus::Failed;
				skip_section(&mut lines);
				continue;
			}

			match lines.peek() {
				Some((number, line)) if !line.starts_with('[') => {
					return Err(VarconfError::syntax(format!(
						"unexpected line `{line}` after the values of registry `{name}`"
					))
					.located("values", number));
				}
				_ => {}
			}
		}

		Ok(status)
	}

	fn load_metacomment(&self, meta: &str, repository: &mut VariantRepository) -> VarconfResult<()> {
		let Some((key, value)) = meta.split_once('=') else {
			tracing::debug!(meta, "ignoring metacomment without a value");
			return Ok(());
		};
		let (key, value) = (key.trim(), value.trim());

		match key {
			"format" => {
				if !self.no_header && value != FORMAT_LABEL {
					return Err(VarconfError::syntax(format!(
						"unsupported values format `{value}`, expected `{FORMAT_LABEL}`"
					)));
				}
			}
			"format.version" => {
				let version = value.split_once('.').and_then(|(major, minor)| {
					Some((major.parse::<u32>().ok()?, minor.parse::<u32>().ok()?))
				});

				match version {
					Some((major, _)) if major == FORMAT_VERSION.0 => {}
					Some(_) => tracing::warn!(version = value, "unexpected values format version"),
					None => {
						return Err(VarconfError::syntax(format!("invalid format version `{value}`")));
					}
				}
			}
			"organization" | "application" if repository.is_locked() => {
				tracing::debug!(key, value, "repository is locked, metadata not updated");
			}
			"organization" => repository.set_organization(value)?,
			"application" => repository.set_application(value)?,
			_ => tracing::debug!(key, "ignoring unknown metacomment"),
		}

		Ok(())
	}

	/// Load the values of one registry, stopping before the next section.
	///
	/// Missing or malformed lines yield [`LoadStatus::Failed`]. A line
	/// naming another record than the one visited is an error.
	pub fn load_registry(
		&self,
		lines: &mut ValuesLines<'_>,
		registry: &mut VariantRegistry,
	) -> VarconfResult<LoadStatus> {
		let ranked = registry.ranked_parameters().to_vec();

		for id in ranked {
			if !self.load_record(lines, registry, id)?.is_ok() {
				return Ok(LoadStatus::Failed);
			}
		}

		Ok(LoadStatus::Ok)
	}

	pub fn load_record(
		&self,
		lines: &mut ValuesLines<'_>,
		registry: &mut VariantRegistry,
		id: RecordId,
	) -> VarconfResult<LoadStatus> {
		if !registry.is_active(id) {
			return Ok(LoadStatus::Ok);
		}

		let record = registry.record(id);

		if record.is_variant() {
			let ranked = registry.ranked_parameter_daughters(id).to_vec();
			for daughter in ranked {
				if !self.load_record(lines, registry, daughter)?.is_ok() {
					return Ok(LoadStatus::Failed);
				}
			}

			return Ok(LoadStatus::Ok);
		}

		if record.is_variable_parameter() {
			let path = record.path().to_string();
			let Some(value_type) = record.parameter_model().map(|model| model.value_type) else {
				return Ok(LoadStatus::Failed);
			};
			let Some((number, line)) = lines.peek() else {
				tracing::debug!(%path, "missing value line at end of input");
				return Ok(LoadStatus::Failed);
			};

			if line.starts_with('[') || line.starts_with("#@") {
				tracing::debug!(%path, "missing value line before the next section");
				return Ok(LoadStatus::Failed);
			}

			let Some((found, text)) = line.split_once('=') else {
				tracing::debug!(%path, line, "value line without `=`");
				return Ok(LoadStatus::Failed);
			};
			let (found, text) = (found.trim(), text.trim());

			if found != path {
				return Err(VarconfError::PathMismatch {
					expected: path,
					found: found.to_string(),
				}
				.located("values", number));
			}

			let value = if text == UNSET_LABEL {
				None
			} else {
				Some(Value::parse(value_type, text).map_err(|error| error.located("values", number))?)
			};

			if self.trace {
				tracing::debug!(%path, text, "loaded value");
			}

			registry
				.assign(id, value)
				.map_err(|error| error.located("values", number))?;
			lines.advance();
		}

		let daughters: Vec<RecordId> = registry
			.record(id)
			.daughters()
			.map(|(_, daughter)| daughter)
			.collect();
		for daughter in daughters {
			if !self.load_record(lines, registry, daughter)?.is_ok() {
				return Ok(LoadStatus::Failed);
			}
		}

		Ok(LoadStatus::Ok)
	}
}

/// Read the registry name of `[registry="name"]` or the legacy `[name]`.
fn registry_section_name(line: &str) -> VarconfResult<String> {
	let header = parse_section_header(line)?;

	if let Some(name) = header.bare {
		tracing::warn!(
			registry = %name,
			"deprecated registry section header `[{name}]`, use `[{REGISTRY_LABEL}=\"{name}\"]`"
		);
		return Ok(name);
	}

	match header.fields.as_slice() {
		[(label, name)] if label == REGISTRY_LABEL => Ok(name.clone()),
		_ => {
			Err(VarconfError::syntax(format!(
				"invalid registry section header `{line}`"
			)))
		}
	}
}

fn skip_section(lines: &mut ValuesLines<'_>) {
	while let Some((_, line)) = lines.peek() {
		if line.starts_with('[') {
			break;
		}
		lines.advance();
	}
}
