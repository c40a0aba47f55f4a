use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::FileInclude;
use crate::ModelCatalog;
use crate::MultiProperties;
use crate::MultiPropertiesReader;
use crate::MultiPropertiesReaderOptions;
use crate::VarconfError;
use crate::VarconfResult;
use crate::VariantPreprocessor;
use crate::VariantRegistry;
use crate::VariantRepository;
use crate::multi_properties_config::DEFAULT_KEY_LABEL;
use crate::multi_properties_config::DEFAULT_META_LABEL;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["varconf.toml", ".varconf.toml", ".config/varconf.toml"];

/// Description of a repository, read from `varconf.toml`.
///
/// ```toml
/// name = "experiment"
/// organization = "acme"
/// application = "simulation"
/// models = ["models/geometry.def"]
/// include_dirs = ["models"]
/// include_path_env = "VARCONF_PATH"
///
/// [[registries]]
/// name = "geometry"
/// top_variant = "geometry.VM"
/// rank = 0
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
	pub name: String,
	#[serde(default)]
	pub organization: Option<String>,
	#[serde(default)]
	pub application: Option<String>,
	/// Model definition files, relative to the config directory.
	#[serde(default)]
	pub models: Vec<PathBuf>,
	/// Extra directories searched by `#@include_sections` in model files.
	#[serde(default)]
	pub include_dirs: Vec<PathBuf>,
	/// Environment variable holding a `:` separated list of include
	/// directories.
	#[serde(default)]
	pub include_path_env: Option<String>,
	#[serde(default)]
	pub registries: Vec<RegistryConfig>,
}

/// One `[[registries]]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
	pub name: String,
	/// Variant model of the top record.
	pub top_variant: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub rank: Option<i64>,
	/// `["!"]registry:variant-path` the registry is gated on.
	#[serde(default)]
	pub dependency: Option<String>,
	#[serde(default = "default_enabled")]
	pub enabled: bool,
}

fn default_enabled() -> bool {
	true
}

impl FromStr for RepositoryConfig {
	type Err = VarconfError;

	fn from_str(content: &str) -> VarconfResult<Self> {
		toml::from_str(content).map_err(|e| VarconfError::ConfigParse(e.to_string()))
	}
}

impl RepositoryConfig {
	/// Resolve the first existing config file path in `root`.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> VarconfResult<Option<Self>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		Self::load_file(&config_path).map(Some)
	}

	pub fn load_file(path: &Path) -> VarconfResult<Self> {
		let content = std::fs::read_to_string(path)?;
		content.parse()
	}

	/// Include rules for model files. `None` when the config declares none,
	/// so model files keep their own `#@include_dir` directives.
	pub fn file_include(&self, base_dir: &Path) -> VarconfResult<Option<FileInclude>> {
		if self.include_dirs.is_empty() && self.include_path_env.is_none() {
			return Ok(None);
		}

		let mut include = FileInclude::new();

		for dir in &self.include_dirs {
			include.append_dir(base_dir.join(dir).display().to_string());
		}

		if let Some(name) = &self.include_path_env {
			include.set_env_name(name.clone())?;
		}

		Ok(Some(include))
	}

	/// Read every model definition file into a catalog.
	pub fn load_catalog(&self, base_dir: &Path) -> VarconfResult<ModelCatalog> {
		let mut catalog = ModelCatalog::new();
		let mut reader = MultiPropertiesReader::new(VariantPreprocessor::unbound()).with_options(
			MultiPropertiesReaderOptions {
				resolve_path: true,
				..MultiPropertiesReaderOptions::default()
			},
		);

		if let Some(include) = self.file_include(base_dir)? {
			reader = reader.with_include(include);
		}

		for model in &self.models {
			let mut definitions =
				MultiProperties::with_labels(DEFAULT_KEY_LABEL, Some(DEFAULT_META_LABEL));
			reader.read_file_into(base_dir.join(model), &mut definitions)?;
			catalog.load_definitions(&definitions)?;
		}

		Ok(catalog)
	}

	/// Build the repository this config describes. Relative paths are
	/// resolved against `base_dir`.
	pub fn build(&self, base_dir: &Path) -> VarconfResult<VariantRepository> {
		let catalog = self.load_catalog(base_dir)?;
		let mut repository = VariantRepository::new(&self.name);

		if let Some(organization) = &self.organization {
			repository.set_organization(organization)?;
		}

		if let Some(application) = &self.application {
			repository.set_application(application)?;
		}

		for entry in &self.registries {
			let mut registry = VariantRegistry::build(&entry.name, &entry.top_variant, &catalog)?;

			if let Some(description) = &entry.description {
				registry.set_description(description);
			}

			repository.add_registry(registry, entry.rank)?;
		}

		// Dependencies may name registries declared later.
		for entry in &self.registries {
			if let Some(dependency) = &entry.dependency {
				repository.set_registry_dependency(&entry.name, dependency)?;
			}

			repository.set_registry_enabled(&entry.name, entry.enabled)?;
		}

		tracing::debug!(
			repository = %self.name,
			registries = self.registries.len(),
			"built repository from config"
		);

		Ok(repository)
	}
}
