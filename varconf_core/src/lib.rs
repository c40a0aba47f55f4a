//! `varconf_core` is the engine behind [varconf](https://github.com/ifiokjr/varconf): a configuration system where parameters branch into variants, and only the currently active branch of the tree takes part in storing, loading and macro expansion.
//!
//! ## Pipeline
//!
//! ```text
//! Model definitions (multi-section file)
//!   → ModelCatalog (parameter and variant models)
//!   → VariantRegistry (record tree, one per subsystem)
//!   → VariantRepository (registries + metadata + usage reporting)
//!   → AsciiIo (values file: store/load active values)
//!   → VariantPreprocessor (`@variant(...)` macros, variant descriptors)
//!   → MultiPropertiesReader (sections gated by `#@variant_section_only`)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Repository description loaded from `varconf.toml`.
//!
//! ## Key Types
//!
//! - [`VariantRegistry`]: An arena of [`VariantRecord`]s. Parameters branch into variants selected by their value.
//! - [`VariantRepository`]: Named registries with ranks, dependencies, a lock and an optional [`VariantReporting`] sink.
//! - [`AsciiIo`]: Reads and writes the `datatools::configuration::variant` values format.
//! - [`VariantPreprocessor`]: Resolves `["!"]registry:path["|"default]` descriptors and expands `@variant(registry:path|default)` macros.
//! - [`MultiPropertiesReader`] / [`MultiPropertiesWriter`]: The `[name="key" type="meta"]` section format, with file inclusion.
//! - [`VariantContext`]: Owns the repository the readers and preprocessors resolve against.
//!
//! ## Quick Start
//!
//! ```rust
//! use varconf_core::ModelCatalog;
//! use varconf_core::ParameterModel;
//! use varconf_core::Value;
//! use varconf_core::ValueType;
//! use varconf_core::VariantModel;
//! use varconf_core::VariantPreprocessor;
//! use varconf_core::VariantRegistry;
//! use varconf_core::VariantRepository;
//!
//! let mut catalog = ModelCatalog::new();
//! catalog.add_parameter(ParameterModel::new("length.PM", ValueType::Real).with_default(Value::Real(1.5)))?;
//! catalog.add_variant(VariantModel::new("geometry.VM").with_parameter("length", "length.PM"))?;
//!
//! let mut repository = VariantRepository::new("experiment");
//! repository.add_registry(VariantRegistry::build("geometry", "geometry.VM", &catalog)?, None)?;
//!
//! let preprocessor = VariantPreprocessor::new(&repository);
//! assert_eq!(preprocessor.preprocess("length=@variant(geometry:length)")?, "length=1.5");
//! # Ok::<(), varconf_core::VarconfError>(())
//! ```

pub use ascii_io::*;
pub use config::*;
pub use context::*;
pub use error::*;
pub use file_include::*;
pub use model::*;
pub use multi_properties::*;
pub use multi_properties_config::*;
pub use preprocessor::*;
pub use properties::*;
pub use properties_config::*;
pub use record::*;
pub use registry::*;
pub use reporting::*;
pub use repository::*;
pub use value::*;

mod ascii_io;
pub mod config;
mod context;
#[allow(unused_assignments)]
mod error;
mod file_include;
pub(crate) mod lexer;
mod model;
mod multi_properties;
mod multi_properties_config;
mod preprocessor;
mod properties;
mod properties_config;
mod record;
mod registry;
mod reporting;
mod repository;
mod value;

#[cfg(test)]
mod __fixtures;
