use std::path::Path;
use std::path::PathBuf;

use crate::VarconfError;
use crate::VarconfResult;

/// Separates directories in an include path environment variable.
pub const INCLUDE_PATH_SEPARATOR: char = ':';

/// Where the directories listed by the include path environment variable go
/// relative to the explicit include directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvStrategy {
	/// Searched before the explicit directories.
	#[default]
	Prepend,
	/// Searched after the explicit directories.
	Append,
	/// Replace the explicit directories.
	Clear,
}

impl EnvStrategy {
	pub fn from_label(label: &str) -> Option<Self> {
		match label {
			"prepend" => Some(Self::Prepend),
			"append" => Some(Self::Append),
			"clear" => Some(Self::Clear),
			_ => None,
		}
	}
}

/// Outcome of [`FileInclude::resolve`]. A missing file is not an error by
/// itself so callers can decide whether to tolerate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeResolution {
	Resolved(PathBuf),
	NotFound {
		path: String,
		searched: Vec<PathBuf>,
	},
}

impl IncludeResolution {
	pub fn is_resolved(&self) -> bool {
		matches!(self, Self::Resolved(_))
	}

	/// The resolved path, or [`VarconfError::IncludeNotFound`].
	pub fn into_path(self) -> VarconfResult<PathBuf> {
		match self {
			Self::Resolved(path) => Ok(path),
			Self::NotFound { path, .. } => Err(VarconfError::IncludeNotFound { path }),
		}
	}
}

/// Search rules for included files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInclude {
	dirs: Vec<String>,
	env_name: Option<String>,
	strategy: EnvStrategy,
	debug: bool,
}

impl FileInclude {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn append_dir(&mut self, dir: impl Into<String>) {
		self.dirs.push(dir.into());
	}

	pub fn prepend_dir(&mut self, dir: impl Into<String>) {
		self.dirs.insert(0, dir.into());
	}

	pub fn dirs(&self) -> &[String] {
		&self.dirs
	}

	/// Name the environment variable holding a `:` separated directory list.
	pub fn set_env_name(&mut self, name: impl Into<String>) -> VarconfResult<()> {
		let name = name.into();
		let valid = !name.is_empty()
			&& !name.starts_with(|c: char| c.is_ascii_digit())
			&& name
				.chars()
				.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');

		if !valid {
			return Err(VarconfError::InvalidName {
				name,
				reason: "include path variables use upper case letters, digits and `_`".to_string(),
			});
		}

		self.env_name = Some(name);

		Ok(())
	}

	pub fn env_name(&self) -> Option<&str> {
		self.env_name.as_deref()
	}

	pub fn set_strategy(&mut self, strategy: EnvStrategy) {
		self.strategy = strategy;
	}

	pub fn strategy(&self) -> EnvStrategy {
		self.strategy
	}

	pub fn set_debug(&mut self, debug: bool) {
		self.debug = debug;
	}

	/// Directories in search order, environment directories included.
	pub fn search_paths(&self) -> Vec<String> {
		let env_dirs: Option<Vec<String>> = self
			.env_name
			.as_deref()
			.and_then(|name| std::env::var(name).ok())
			.map(|value| {
				value
					.split(INCLUDE_PATH_SEPARATOR)
					.filter(|dir| !dir.is_empty())
					.map(ToString::to_string)
					.collect()
			});

		let Some(env_dirs) = env_dirs else {
			return self.dirs.clone();
		};

		match self.strategy {
			EnvStrategy::Prepend => env_dirs.into_iter().chain(self.dirs.iter().cloned()).collect(),
			EnvStrategy::Append => self.dirs.iter().cloned().chain(env_dirs).collect(),
			EnvStrategy::Clear => env_dirs,
		}
	}

	/// Find the file `path` refers to.
	///
	/// An absolute path naming a regular file wins. Otherwise each search
	/// directory is tried in order and a search directory that does not exist
	/// fails the lookup.
	pub fn resolve(&self, path: &str) -> VarconfResult<IncludeResolution> {
		if path.trim().is_empty() {
			return Err(VarconfError::syntax("missing path for the file to include"));
		}

		let expanded = expand_env(path)?;

		if self.debug {
			tracing::debug!(path, %expanded, "resolving include");
		}

		if Path::new(&expanded).is_absolute() && Path::new(&expanded).is_file() {
			return Ok(IncludeResolution::Resolved(PathBuf::from(expanded)));
		}

		let mut searched = vec![];

		for dir in self.search_paths() {
			let dir = PathBuf::from(expand_env(&dir)?);

			if !dir.is_dir() {
				return Err(VarconfError::IncludeDir(dir.display().to_string()));
			}

			let candidate = dir.join(&expanded);

			if self.debug {
				tracing::debug!(candidate = %candidate.display(), "trying include candidate");
			}

			if candidate.is_file() {
				return Ok(IncludeResolution::Resolved(candidate));
			}

			searched.push(dir);
		}

		Ok(IncludeResolution::NotFound {
			path: path.to_string(),
			searched,
		})
	}
}

/// Expand `${VAR}` and `$VAR` references.
pub fn expand_env(text: &str) -> VarconfResult<String> {
	let mut output = String::with_capacity(text.len());
	let mut rest = text;

	while let Some(start) = rest.find('$') {
		output.push_str(&rest[..start]);
		let after = &rest[start + 1..];

		let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
			let Some(end) = braced.find('}') else {
				return Err(VarconfError::syntax(format!(
					"unterminated variable reference in `{text}`"
				)));
			};
			(&braced[..end], end + 2)
		} else {
			let end = after
				.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
				.unwrap_or(after.len());
			(&after[..end], end)
		};

		if name.is_empty() {
			output.push('$');
			rest = after;
			continue;
		}

		let value =
			std::env::var(name).map_err(|_| VarconfError::UndefinedVariable(name.to_string()))?;
		output.push_str(&value);
		rest = &after[consumed..];
	}

	output.push_str(rest);

	Ok(output)
}
