use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::FileInclude;
use crate::IncludeResolution;
use crate::MultiProperties;
use crate::Properties;
use crate::PropertiesReader;
use crate::PropertiesReaderOptions;
use crate::PropertiesWriter;
use crate::VarconfError;
use crate::VarconfResult;
use crate::VariantPreprocessor;
use crate::file_include::expand_env;
use crate::lexer::LogicalLines;
use crate::lexer::SectionHeader;
use crate::lexer::parse_section_header;
use crate::lexer::quoted_argument;
use crate::lexer::split_directive;
use crate::properties::key_is_private;
use crate::value::quote;
use crate::value::strip_quotes;

/// Value of the `#@format` directive.
pub const MULTI_PROPERTIES_FORMAT: &str = "datatools::multi_properties";
/// Editor mode line written at the top of decorated files.
pub const EDITOR_DECORATION: &str = "# -*- mode: conf-unix; -*-";
/// Key label used when a container declares none.
pub const DEFAULT_KEY_LABEL: &str = "name";
/// Meta label used when entries carry a meta but the container declares no
/// label.
pub const DEFAULT_META_LABEL: &str = "type";

const HEADER_BANNER: &str =
	"# List of sections of configuration properties (datatools::multi_properties)";
const FOOTER_BANNER: &str =
	"# End of list of sections of configuration properties (datatools::multi_properties)";

/// Directives only legal before the first section header.
const FILE_DIRECTIVES: [&str; 11] = [
	"format",
	"description",
	"key_label",
	"meta_label",
	"topic",
	"forbid_include",
	"include_dir",
	"include_path_env",
	"include_no_propagate",
	"include_debug",
	"variant_devel",
];

/// Options of a [`MultiPropertiesReader`].
#[derive(Debug, Clone, Default)]
pub struct MultiPropertiesReaderOptions {
	/// Discard sections whose key starts with `__`.
	pub skip_private_sections: bool,
	/// Drop properties whose key starts with `__`.
	pub skip_private_properties: bool,
	/// Reject variant directives and macros.
	pub forbid_variants: bool,
	/// Reject `#@include_sections` and the include setup directives.
	pub forbid_include: bool,
	/// Expand environment variables in file names given to `read_file`.
	pub resolve_path: bool,
	/// Forget labels preset on the target before reading.
	pub start_without_labels: bool,
	/// Required `#@topic`, if any.
	pub topic: Option<String>,
}

/// Reads a stream of `[key="..." meta="..."]` sections.
///
/// The reader walks logical lines through three states: before the first
/// header, inside an open section and between sections after an include
/// committed the open one. A section is committed when the next header, an
/// include directive or the end of input is reached. Its buffered body is
/// then read by a [`PropertiesReader`].
///
/// `#@variant_section_only` gates the section whose header comes right
/// after it. The same directive placed after a header, as older files do,
/// is rejected as [`VarconfError::DirectiveMisplaced`].
#[derive(Debug, Clone)]
pub struct MultiPropertiesReader<'a> {
	preprocessor: VariantPreprocessor<'a>,
	options: MultiPropertiesReaderOptions,
	include: Option<FileInclude>,
	origin: String,
}

/// A section whose body is still being read.
#[derive(Debug)]
struct OpenBlock {
	key: String,
	meta: Option<String>,
	header_line: usize,
	gate: Option<String>,
	lines: Vec<(usize, String)>,
}

#[derive(Debug)]
enum ReaderState {
	/// No header read yet: file level directives are legal.
	Start,
	/// Sections started, none open.
	Between,
	InBlock(OpenBlock),
}

/// Settings learnt from file level directives during one pass.
struct Pass<'a> {
	preprocessor: VariantPreprocessor<'a>,
	include: FileInclude,
	/// Include rules may be edited. False when they were inherited.
	include_setup: bool,
	include_enabled: bool,
	include_propagate: bool,
	variants_enabled: bool,
	format: Option<String>,
	description_set: bool,
	key_label_set: bool,
	meta_label_set: bool,
	pending_gate: Option<(String, usize)>,
}

impl<'a> MultiPropertiesReader<'a> {
	pub fn new(preprocessor: VariantPreprocessor<'a>) -> Self {
		Self {
			preprocessor,
			options: MultiPropertiesReaderOptions::default(),
			include: None,
			origin: "sections".to_string(),
		}
	}

	#[must_use]
	pub fn with_options(mut self, options: MultiPropertiesReaderOptions) -> Self {
		self.options = options;
		self
	}

	/// Preset include rules. `#@include_dir` and `#@include_path_env` are
	/// then ignored.
	#[must_use]
	pub fn with_include(mut self, include: FileInclude) -> Self {
		self.include = Some(include);
		self
	}

	#[must_use]
	pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
		self.origin = origin.into();
		self
	}

	pub fn read(&self, text: &str) -> VarconfResult<MultiProperties> {
		let mut target = MultiProperties::new();
		self.read_into(text, &mut target)?;

		Ok(target)
	}

	pub fn read_file(&self, path: impl AsRef<Path>) -> VarconfResult<MultiProperties> {
		let mut target = MultiProperties::new();
		self.read_file_into(path, &mut target)?;

		Ok(target)
	}

	pub fn read_file_into(
		&self,
		path: impl AsRef<Path>,
		target: &mut MultiProperties,
	) -> VarconfResult<()> {
		let path = self.resolve_file(path.as_ref())?;
		let text = fs::read_to_string(&path)?;

		self.clone()
			.with_origin(path.display().to_string())
			.read_into(&text, target)
	}

	pub fn read_into(&self, text: &str, target: &mut MultiProperties) -> VarconfResult<()> {
		if self.options.start_without_labels {
			target.clear_labels();
		}

		let mut pass = Pass {
			preprocessor: self.preprocessor,
			include: self.include.clone().unwrap_or_default(),
			include_setup: self.include.is_none(),
			include_enabled: !self.options.forbid_include,
			include_propagate: true,
			variants_enabled: !self.options.forbid_variants,
			format: None,
			description_set: false,
			key_label_set: false,
			meta_label_set: false,
			pending_gate: None,
		};
		let mut state = ReaderState::Start;

		for (number, line) in LogicalLines::new(text) {
			state = self
				.step(state, number, &line, &mut pass, target)
				.map_err(|error| error.located(&self.origin, number))?;
		}

		if let Some((descriptor, line)) = pass.pending_gate.take() {
			return Err(VarconfError::syntax(format!(
				"`#@variant_section_only {descriptor}` is not followed by a section header"
			))
			.located(&self.origin, line));
		}

		if let ReaderState::InBlock(block) = state {
			let line = block.header_line;
			self.commit(block, &pass, target)
				.map_err(|error| error.located(&self.origin, line))?;
		}

		if !pass.key_label_set && !pass.meta_label_set && pass.format.is_none() && target.is_empty()
		{
			tracing::warn!(
				origin = %self.origin,
				"no section was loaded, the input does not look like a multi-section file"
			);
		}

		Ok(())
	}

	fn step(
		&self,
		state: ReaderState,
		number: usize,
		line: &str,
		pass: &mut Pass<'a>,
		target: &mut MultiProperties,
	) -> VarconfResult<ReaderState> {
		let trimmed = line.trim();

		if trimmed.is_empty() || (trimmed.starts_with('#') && !trimmed.starts_with("#@")) {
			return Ok(state);
		}

		if trimmed.starts_with('[') {
			return self.header(state, trimmed, number, pass, target);
		}

		let directive = split_directive(trimmed);

		if let Some((descriptor, _)) = &pass.pending_gate {
			if directive.is_some_and(|(name, _)| name == "variant_section_only") {
				return Err(VarconfError::DirectiveReused(
					"#@variant_section_only".to_string(),
				));
			}

			return Err(VarconfError::misplaced(
				"#@variant_section_only",
				format!("`{descriptor}` must be followed by a section header"),
			));
		}

		let Some((name, argument)) = directive else {
			return match state {
				ReaderState::InBlock(mut block) => {
					block.lines.push((number, line.to_string()));
					Ok(ReaderState::InBlock(block))
				}
				ReaderState::Start | ReaderState::Between => {
					Err(VarconfError::syntax(format!(
						"line `{trimmed}` is outside of any section"
					)))
				}
			};
		};

		let started = !matches!(state, ReaderState::Start);

		match name {
			"variant_section_only" => {
				self.gate(argument, number, pass)?;
				Ok(state)
			}
			"include_sections" | "include_sections_try" => {
				self.include(state, name, argument, pass, target)
			}
			// Once sections started, `#@description` describes the next property.
			"description" if started => Ok(append_directive(state, number, line)),
			_ if FILE_DIRECTIVES.contains(&name) => {
				if started {
					return Err(VarconfError::misplaced(
						format!("#@{name}"),
						"file level directives must come before the first section",
					));
				}

				self.file_directive(name, argument, pass, target)?;
				Ok(state)
			}
			_ => Ok(append_directive(state, number, line)),
		}
	}

	fn file_directive(
		&self,
		name: &str,
		argument: &str,
		pass: &mut Pass<'a>,
		target: &mut MultiProperties,
	) -> VarconfResult<()> {
		let directive = format!("#@{name}");

		match name {
			"format" => {
				if pass.format.is_some() {
					return Err(VarconfError::DirectiveReused(directive));
				}

				let format = strip_quotes(argument.trim());

				if format.is_empty() {
					return Err(VarconfError::syntax("empty `#@format` value"));
				}

				if format != MULTI_PROPERTIES_FORMAT {
					return Err(VarconfError::syntax(format!(
						"format `{format}` does not match `{MULTI_PROPERTIES_FORMAT}`"
					)));
				}

				pass.format = Some(format.to_string());
			}
			"description" => {
				if pass.description_set {
					return Err(VarconfError::DirectiveReused(directive));
				}

				if !argument.is_empty() {
					target.set_description(argument);
				}
				pass.description_set = true;
			}
			"key_label" => {
				if pass.key_label_set {
					return Err(VarconfError::DirectiveReused(directive));
				}

				let label = quoted_argument(&directive, argument)?;

				if !label.is_empty() {
					match target.key_label() {
						Some(expected) if expected != label => {
							return Err(VarconfError::LabelMismatch {
								expected: expected.to_string(),
								found: label,
							});
						}
						Some(_) => {}
						None => target.set_key_label(label),
					}
				}
				pass.key_label_set = true;
			}
			"meta_label" => {
				if pass.meta_label_set {
					return Err(VarconfError::DirectiveReused(directive));
				}

				let label = quoted_argument(&directive, argument)?;

				match target.meta_label() {
					Some(expected) if expected != label => {
						return Err(VarconfError::LabelMismatch {
							expected: expected.to_string(),
							found: label,
						});
					}
					Some(_) => {}
					None if label.is_empty() => {}
					None => target.set_meta_label(label),
				}
				pass.meta_label_set = true;
			}
			"topic" => {
				let topic = strip_quotes(argument.trim());

				if let Some(required) = &self.options.topic {
					if required != topic {
						return Err(VarconfError::LabelMismatch {
							expected: required.clone(),
							found: topic.to_string(),
						});
					}
				}
			}
			"forbid_include" => pass.include_enabled = false,
			"include_no_propagate" => pass.include_propagate = false,
			"include_debug" => pass.include.set_debug(true),
			"include_dir" | "include_path_env" => {
				if !pass.include_enabled {
					return Err(VarconfError::forbidden(directive, "file inclusion is disabled"));
				}

				let value = quoted_argument(&directive, argument)?;

				if !pass.include_setup {
					tracing::debug!(%directive, %value, "include rules are inherited, directive ignored");
					return Ok(());
				}

				if name == "include_dir" {
					pass.include.append_dir(value);
				} else {
					pass.include.set_env_name(value)?;
				}
			}
			"variant_devel" => {
				if !pass.variants_enabled {
					return Err(VarconfError::forbidden(
						directive,
						"variants are not supported by this reader",
					));
				}

				pass.preprocessor.set_trace(true);
			}
			_ => tracing::warn!(%directive, "ignoring unknown directive"),
		}

		Ok(())
	}

	fn gate(&self, argument: &str, number: usize, pass: &mut Pass<'a>) -> VarconfResult<()> {
		if !pass.variants_enabled {
			return Err(VarconfError::forbidden(
				"#@variant_section_only",
				"variants are not supported by this reader",
			));
		}

		let descriptor = strip_quotes(argument.trim());

		if descriptor.is_empty() {
			return Err(VarconfError::syntax(
				"missing variant descriptor for `#@variant_section_only`",
			));
		}

		tracing::debug!(descriptor, "next section is gated");
		pass.pending_gate = Some((descriptor.to_string(), number));

		Ok(())
	}

	fn header(
		&self,
		state: ReaderState,
		line: &str,
		number: usize,
		pass: &mut Pass<'a>,
		target: &mut MultiProperties,
	) -> VarconfResult<ReaderState> {
		let header = parse_section_header(line)?;
		let (key, meta) = entry_from_header(&header, pass, target)?;

		if let ReaderState::InBlock(block) = state {
			self.commit(block, pass, target)?;
		}

		Ok(ReaderState::InBlock(OpenBlock {
			key,
			meta,
			header_line: number,
			gate: pass.pending_gate.take().map(|(descriptor, _)| descriptor),
			lines: vec![],
		}))
	}

	fn commit(&self, block: OpenBlock, pass: &Pass<'a>, target: &mut MultiProperties) -> VarconfResult<()> {
		if let Some(descriptor) = &block.gate {
			let resolution = pass
				.preprocessor
				.resolve_variant(descriptor)
				.map_err(|error| {
					VarconfError::SectionGate {
						descriptor: descriptor.clone(),
						source: Box::new(error),
					}
					.located(&self.origin, block.header_line)
				})?;

			if !resolution.effective() {
				tracing::debug!(key = %block.key, %descriptor, "section discarded by its variant gate");
				return Ok(());
			}
		}

		if self.options.skip_private_sections && key_is_private(&block.key) {
			tracing::trace!(key = %block.key, "private section skipped");
			return Ok(());
		}

		let reader = PropertiesReader::new(pass.preprocessor)
			.with_options(PropertiesReaderOptions {
				forbid_variants: !pass.variants_enabled,
				skip_private: self.options.skip_private_properties,
				allow_key_override: false,
			})
			.with_origin(&self.origin, block.header_line + 1);
		let mut properties = Properties::new();
		reader.read_lines(block.lines, &mut properties)?;

		target.add(block.key, block.meta, properties)
	}

	fn include(
		&self,
		state: ReaderState,
		name: &str,
		argument: &str,
		pass: &mut Pass<'a>,
		target: &mut MultiProperties,
	) -> VarconfResult<ReaderState> {
		let directive = format!("#@{name}");

		if !pass.include_enabled {
			return Err(VarconfError::forbidden(directive, "file inclusion is disabled"));
		}

		let path = quoted_argument(&directive, argument)?;
		let state = match state {
			ReaderState::InBlock(block) => {
				self.commit(block, pass, target)?;
				ReaderState::Between
			}
			other => other,
		};

		let resolved = match pass
			.include
			.resolve(&path)
			.and_then(IncludeResolution::into_path)
		{
			Ok(resolved) => resolved,
			Err(error) if name == "include_sections_try" => {
				tracing::warn!(%path, %error, "could not resolve optional file inclusion");
				return Ok(state);
			}
			Err(error) => return Err(error),
		};

		tracing::debug!(path = %resolved.display(), "including sections");

		let mut nested = MultiPropertiesReader::new(pass.preprocessor).with_options(
			MultiPropertiesReaderOptions {
				forbid_variants: !pass.variants_enabled,
				resolve_path: true,
				..MultiPropertiesReaderOptions::default()
			},
		);

		if pass.include_propagate {
			nested = nested.with_include(pass.include.clone());
		}

		target.merge_with(nested.read_file(&resolved)?);

		Ok(state)
	}

	fn resolve_file(&self, path: &Path) -> VarconfResult<PathBuf> {
		if !self.options.resolve_path {
			return Ok(path.to_path_buf());
		}

		let text = path.to_string_lossy();
		Ok(PathBuf::from(expand_env(&text)?))
	}
}

/// Queue a body directive on the open section. Outside of a section it has
/// nothing to apply to.
fn append_directive(state: ReaderState, number: usize, line: &str) -> ReaderState {
	match state {
		ReaderState::InBlock(mut block) => {
			block.lines.push((number, line.to_string()));
			ReaderState::InBlock(block)
		}
		other => {
			tracing::warn!(line = line.trim(), "ignoring directive outside of any section");
			other
		}
	}
}

/// Check a header against the container labels, adopting labels the
/// container does not declare yet.
fn entry_from_header(
	header: &SectionHeader,
	pass: &Pass<'_>,
	target: &mut MultiProperties,
) -> VarconfResult<(String, Option<String>)> {
	if let Some(name) = &header.bare {
		return Err(VarconfError::syntax(format!(
			"section header `[{name}]` needs a `label=\"key\"` field"
		)));
	}

	let mut fields = header.fields.iter();
	let Some((key_label, key)) = fields.next() else {
		return Err(VarconfError::syntax("empty section header"));
	};

	match target.key_label() {
		Some(expected) if expected != key_label => {
			return Err(VarconfError::LabelMismatch {
				expected: expected.to_string(),
				found: key_label.clone(),
			});
		}
		Some(_) => {}
		None => target.set_key_label(key_label.clone()),
	}

	if key.is_empty() {
		return Err(VarconfError::InvalidName {
			name: key.clone(),
			reason: "section keys cannot be empty".to_string(),
		});
	}

	let meta = match fields.next() {
		Some((meta_label, meta)) => {
			match target.meta_label() {
				Some(expected) if expected != meta_label => {
					return Err(VarconfError::LabelMismatch {
						expected: expected.to_string(),
						found: meta_label.clone(),
					});
				}
				Some(_) => {}
				None if pass.meta_label_set => {
					return Err(VarconfError::LabelMismatch {
						expected: String::new(),
						found: meta_label.clone(),
					});
				}
				None => target.set_meta_label(meta_label.clone()),
			}

			Some(meta.clone())
		}
		None => {
			if let Some(meta_label) = target.meta_label() {
				tracing::warn!(key = %key, meta_label, "section header has no meta field");
			}

			None
		}
	};

	if let Some((extra, _)) = fields.next() {
		return Err(VarconfError::syntax(format!(
			"unexpected field `{extra}` in the header of section `{key}`"
		)));
	}

	if let Some(trailing) = &header.trailing {
		if !trailing.starts_with('#') {
			tracing::warn!(key = %key, %trailing, "ignoring trailing characters after section header");
		}
	}

	Ok((key.clone(), meta))
}

/// Writes [`MultiProperties`] in the format read by
/// [`MultiPropertiesReader`].
#[derive(Debug, Clone, Default)]
pub struct MultiPropertiesWriter {
	/// Frame the output with comment banners.
	pub header_footer: bool,
	/// Omit the editor mode line and the `#` rule above each header.
	pub without_decoration: bool,
	pub skip_private_sections: bool,
	pub skip_private_properties: bool,
	/// Emitted as `#@topic` when set.
	pub topic: Option<String>,
}

impl MultiPropertiesWriter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn write(&self, source: &MultiProperties) -> String {
		let mut out = String::new();
		let key_label = source.key_label().unwrap_or(DEFAULT_KEY_LABEL);
		let meta_label = match source.meta_label() {
			Some(label) => label,
			None if source.entries().iter().any(|entry| entry.meta.is_some()) => {
				DEFAULT_META_LABEL
			}
			None => "",
		};
		let body_writer = PropertiesWriter {
			skip_private: self.skip_private_properties,
		};

		if !self.without_decoration {
			let _ = writeln!(out, "{EDITOR_DECORATION}\n");
		}

		if self.header_footer {
			let _ = writeln!(out, "{HEADER_BANNER}\n");
		}

		if let Some(topic) = &self.topic {
			let _ = writeln!(out, "#@topic {topic}");
		}

		if let Some(description) = source.description() {
			let _ = writeln!(out, "#@description {description}");
		}

		let _ = writeln!(out, "#@key_label {}", quote(key_label));
		let _ = writeln!(out, "#@meta_label {}\n", quote(meta_label));

		for entry in source.entries() {
			if self.skip_private_sections && key_is_private(&entry.key) {
				continue;
			}

			let mut header = format!("[{key_label}={}", quote(&entry.key));

			if let Some(meta) = &entry.meta {
				let _ = write!(header, " {meta_label}={}", quote(meta));
			}

			header.push(']');

			if !self.without_decoration {
				let _ = writeln!(out, "{}", "#".repeat(header.len()));
			}

			let _ = writeln!(out, "{header}\n");
			out.push_str(&body_writer.write(&entry.properties));
			out.push('\n');
		}

		if self.header_footer {
			let _ = writeln!(out, "{FOOTER_BANNER}");
		}

		out
	}

	pub fn write_file(&self, path: impl AsRef<Path>, source: &MultiProperties) -> VarconfResult<()> {
		fs::write(path, self.write(source))?;
		Ok(())
	}
}
