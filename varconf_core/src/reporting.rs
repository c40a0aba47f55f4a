use std::collections::BTreeMap;
use std::io::Write;

use derive_more::Deref;
use serde::Serialize;

use crate::VarconfResult;
use crate::VariantRepository;

/// Counts how often each `registry:path` parameter was read through the
/// preprocessor.
#[derive(Debug, Clone, Default, Deref)]
pub struct VariantReporting {
	#[deref]
	usage: BTreeMap<String, usize>,
}

/// One line of a usage report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageEntry {
	pub path: String,
	pub value: String,
	pub count: usize,
}

impl VariantReporting {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, path: &str) {
		*self.usage.entry(path.to_string()).or_default() += 1;
	}

	pub fn reset(&mut self) {
		self.usage.clear();
	}

	pub fn count(&self, path: &str) -> usize {
		self.usage.get(path).copied().unwrap_or_default()
	}

	/// Every active variable parameter holding a value, with its usage
	/// count.
	pub fn report(&self, repository: &VariantRepository) -> Vec<UsageEntry> {
		let mut entries = vec![];

		for name in repository.ordered_registry_names() {
			let Ok(registry) = repository.registry(&name) else {
				continue;
			};

			if !repository.is_active_registry(&name).unwrap_or(false) {
				continue;
			}

			for (id, record) in registry.records() {
				let Some(value) = record.value() else {
					continue;
				};

				if !record.is_variable_parameter() || !registry.is_active(id) {
					continue;
				}

				let path = format!("{name}:{}", record.path());
				entries.push(UsageEntry {
					count: self.count(&path),
					value: value.to_literal(),
					path,
				});
			}
		}

		entries
	}

	/// Paths of parameters that hold a value but were never read.
	pub fn unused(&self, repository: &VariantRepository) -> Vec<String> {
		self.report(repository)
			.into_iter()
			.filter(|entry| entry.count == 0)
			.map(|entry| entry.path)
			.collect()
	}

	/// Log a warning for every parameter set but never read.
	pub fn warn_unused(&self, repository: &VariantRepository) {
		for path in self.unused(repository) {
			tracing::warn!(%path, "variant parameter is set but was never used");
		}
	}

	pub fn print_report<W: Write>(
		&self,
		out: &mut W,
		repository: &VariantRepository,
	) -> VarconfResult<()> {
		for entry in self.report(repository) {
			let status = if entry.count == 0 { "unused" } else { "used" };
			writeln!(
				out,
				"{:<40} {:<20} {status} ({})",
				entry.path, entry.value, entry.count
			)?;
		}

		Ok(())
	}
}
