use std::path::Path;

use crate::AsciiIo;
use crate::LoadStatus;
use crate::MultiPropertiesReader;
use crate::PropertiesReader;
use crate::RepositoryConfig;
use crate::VarconfError;
use crate::VarconfResult;
use crate::VariantPreprocessor;
use crate::VariantRepository;

/// Holds the repository that variant lookups resolve against.
///
/// Readers and preprocessors created from a context borrow its repository.
/// A context without a repository hands out preprocessors that behave as if
/// no repository were active, so descriptors fall back to their defaults.
#[derive(Debug, Default)]
pub struct VariantContext {
	repository: Option<VariantRepository>,
}

impl VariantContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_repository(repository: VariantRepository) -> Self {
		Self {
			repository: Some(repository),
		}
	}

	pub fn has_repository(&self) -> bool {
		self.repository.is_some()
	}

	pub fn repository(&self) -> Option<&VariantRepository> {
		self.repository.as_ref()
	}

	pub fn repository_mut(&mut self) -> Option<&mut VariantRepository> {
		self.repository.as_mut()
	}

	/// The repository, created by `init` on first use.
	pub fn repository_or_init<F>(&mut self, init: F) -> VarconfResult<&mut VariantRepository>
	where
		F: FnOnce() -> VarconfResult<VariantRepository>,
	{
		let repository = match self.repository.take() {
			Some(repository) => repository,
			None => init()?,
		};

		Ok(self.repository.insert(repository))
	}

	/// Build the repository from `config` unless one is already loaded.
	pub fn load_config(
		&mut self,
		config: &RepositoryConfig,
		base_dir: &Path,
	) -> VarconfResult<&mut VariantRepository> {
		self.repository_or_init(|| config.build(base_dir))
	}

	/// Apply a values file to the loaded repository.
	pub fn load_values(&mut self, io: &AsciiIo, text: &str) -> VarconfResult<LoadStatus> {
		let Some(repository) = self.repository.as_mut() else {
			return Err(VarconfError::NoActiveRepository("values file".to_string()));
		};

		io.load_repository(text, repository)
	}

	pub fn set_repository(&mut self, repository: VariantRepository) -> Option<VariantRepository> {
		self.repository.replace(repository)
	}

	pub fn take_repository(&mut self) -> Option<VariantRepository> {
		self.repository.take()
	}

	pub fn preprocessor(&self) -> VariantPreprocessor<'_> {
		match &self.repository {
			Some(repository) => VariantPreprocessor::new(repository),
			None => VariantPreprocessor::unbound(),
		}
	}

	pub fn properties_reader(&self) -> PropertiesReader<'_> {
		PropertiesReader::new(self.preprocessor())
	}

	pub fn multi_properties_reader(&self) -> MultiPropertiesReader<'_> {
		MultiPropertiesReader::new(self.preprocessor())
	}
}
