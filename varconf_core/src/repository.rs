use std::cell::Ref;
use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::VarconfError;
use crate::VarconfResult;
use crate::VariantRegistry;
use crate::VariantReporting;

/// Separates the registry from the record path in a fully qualified path.
pub const REGISTRY_SEPARATOR: char = ':';

#[derive(Debug, Clone)]
struct RegistryEntry {
	registry: VariantRegistry,
	rank: Option<i64>,
	enabled: bool,
	dependency: Option<String>,
}

/// Named registries plus metadata and an optional usage reporting sink.
#[derive(Debug)]
pub struct VariantRepository {
	name: String,
	organization: Option<String>,
	application: Option<String>,
	registries: Vec<RegistryEntry>,
	locked: bool,
	reporting: Option<RefCell<VariantReporting>>,
}

impl VariantRepository {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			organization: None,
			application: None,
			registries: vec![],
			locked: false,
			reporting: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn organization(&self) -> Option<&str> {
		self.organization.as_deref()
	}

	pub fn application(&self) -> Option<&str> {
		self.application.as_deref()
	}

	pub fn set_organization(&mut self, organization: impl Into<String>) -> VarconfResult<()> {
		let organization = organization.into();
		self.check_unlocked()?;
		check_metadata(&organization)?;
		self.organization = Some(organization);

		Ok(())
	}

	pub fn set_application(&mut self, application: impl Into<String>) -> VarconfResult<()> {
		let application = application.into();
		self.check_unlocked()?;
		check_metadata(&application)?;
		self.application = Some(application);

		Ok(())
	}

	pub fn lock(&mut self) {
		self.locked = true;
	}

	pub fn unlock(&mut self) {
		self.locked = false;
	}

	pub fn is_locked(&self) -> bool {
		self.locked
	}

	/// A repository with at least one registry can resolve variants.
	pub fn is_active(&self) -> bool {
		!self.registries.is_empty()
	}

	pub fn add_registry(&mut self, registry: VariantRegistry, rank: Option<i64>) -> VarconfResult<()> {
		self.check_unlocked()?;

		if registry.name().is_empty() || registry.name().contains(REGISTRY_SEPARATOR) {
			return Err(VarconfError::InvalidName {
				name: registry.name().to_string(),
				reason: format!("registry names must be non-empty and cannot contain `{REGISTRY_SEPARATOR}`"),
			});
		}

		if self.has_registry(registry.name()) {
			return Err(VarconfError::Duplicate {
				what: "registry",
				name: registry.name().to_string(),
			});
		}

		self.registries.push(RegistryEntry {
			registry,
			rank,
			enabled: true,
			dependency: None,
		});

		Ok(())
	}

	/// Gate a registry on a variant of another registry, written
	/// `["!"]registry:path`.
	pub fn set_registry_dependency(
		&mut self,
		name: &str,
		dependency: impl Into<String>,
	) -> VarconfResult<()> {
		let dependency = dependency.into();
		let (target, _, _) = parse_dependency(&dependency)?;

		if target == name {
			return Err(VarconfError::descriptor(
				&dependency,
				"a registry cannot depend on itself",
			));
		}

		self.check_unlocked()?;
		self.entry_mut(name)?.dependency = Some(dependency);

		Ok(())
	}

	pub fn set_registry_enabled(&mut self, name: &str, enabled: bool) -> VarconfResult<()> {
		self.entry_mut(name)?.enabled = enabled;
		Ok(())
	}

	pub fn has_registry(&self, name: &str) -> bool {
		self.registries
			.iter()
			.any(|entry| entry.registry.name() == name)
	}

	pub fn registry(&self, name: &str) -> VarconfResult<&VariantRegistry> {
		self.entry(name).map(|entry| &entry.registry)
	}

	pub fn registry_mut(&mut self, name: &str) -> VarconfResult<&mut VariantRegistry> {
		self.entry_mut(name).map(|entry| &mut entry.registry)
	}

	pub fn registry_rank(&self, name: &str) -> VarconfResult<Option<i64>> {
		self.entry(name).map(|entry| entry.rank)
	}

	/// Registry names in insertion order.
	pub fn registry_names(&self) -> Vec<String> {
		self.registries
			.iter()
			.map(|entry| entry.registry.name().to_string())
			.collect()
	}

	/// Ranked registries by rank, then unranked ones in insertion order.
	pub fn ordered_registry_names(&self) -> Vec<String> {
		let mut ranked: BTreeMap<i64, Vec<String>> = BTreeMap::new();
		let mut unranked = vec![];

		for entry in &self.registries {
			let name = entry.registry.name().to_string();
			match entry.rank {
				Some(rank) => ranked.entry(rank).or_default().push(name),
				None => unranked.push(name),
			}
		}

		ranked.into_values().flatten().chain(unranked).collect()
	}

	/// A registry is active when it is enabled and its dependency, if any,
	/// holds.
	pub fn is_active_registry(&self, name: &str) -> VarconfResult<bool> {
		let mut visiting = vec![];
		self.registry_activity(name, &mut visiting)
	}

	fn registry_activity<'a>(&'a self, name: &'a str, visiting: &mut Vec<&'a str>) -> VarconfResult<bool> {
		let entry = self.entry(name)?;

		if !entry.enabled {
			return Ok(false);
		}

		let Some(dependency) = &entry.dependency else {
			return Ok(true);
		};

		if visiting.contains(&name) {
			return Err(VarconfError::descriptor(
				dependency,
				"registry dependencies form a cycle",
			));
		}
		visiting.push(name);

		let (target, path, reverse) = parse_dependency(dependency)?;
		let target_entry = self.entry(target)?;
		let active = self.registry_activity(target_entry.registry.name(), visiting)?
			&& target_entry.registry.is_active_variant(path)?;

		visiting.pop();

		Ok(active != reverse)
	}

	pub fn has_variant(&self, registry: &str, path: &str) -> VarconfResult<bool> {
		self.registry(registry).map(|registry| registry.has_variant(path))
	}

	pub fn has_parameter(&self, registry: &str, path: &str) -> VarconfResult<bool> {
		self.registry(registry)
			.map(|registry| registry.has_parameter(path))
	}

	/// Whether `path` is an active variant of an active registry.
	pub fn is_active_variant(&self, registry: &str, path: &str) -> VarconfResult<bool> {
		let active = self.registry(registry)?.is_active_variant(path)?;
		Ok(active && self.is_active_registry(registry)?)
	}

	/// Assign `text` to the parameter at `registry:path`.
	pub fn set_parameter_value(&mut self, full_path: &str, text: &str) -> VarconfResult<()> {
		let (registry, path) = parse_variant_path(full_path)?;
		self.registry_mut(registry)?.set_parameter_value(path, text)
	}

	/// Read the parameter at `registry:path` in macro form.
	pub fn get_parameter_value(&self, full_path: &str) -> VarconfResult<String> {
		let (registry, path) = parse_variant_path(full_path)?;
		self.registry(registry)?.get_parameter_value(path)
	}

	/// Apply a `registry:path=value` setting.
	pub fn apply_setting(&mut self, setting: &str) -> VarconfResult<()> {
		let Some((full_path, text)) = setting.split_once('=') else {
			return Err(VarconfError::syntax(format!(
				"setting `{setting}` must look like `registry:path=value`"
			)));
		};

		self.set_parameter_value(full_path.trim(), text.trim())
	}

	/// `registry:path` of every active parameter without a value, across
	/// active registries.
	pub fn unset_parameters(&self) -> VarconfResult<Vec<String>> {
		let mut unset = vec![];

		for name in self.ordered_registry_names() {
			if !self.is_active_registry(&name)? {
				continue;
			}

			for path in self.registry(&name)?.unset_parameters() {
				unset.push(format!("{name}{REGISTRY_SEPARATOR}{path}"));
			}
		}

		Ok(unset)
	}

	pub fn is_accomplished(&self) -> VarconfResult<bool> {
		self.unset_parameters().map(|unset| unset.is_empty())
	}

	pub fn attach_reporting(&mut self) -> VarconfResult<()> {
		if self.reporting.is_some() {
			return Err(VarconfError::ReportingAttached(self.name.clone()));
		}

		self.reporting = Some(RefCell::new(VariantReporting::new()));

		Ok(())
	}

	pub fn detach_reporting(&mut self) -> Option<VariantReporting> {
		self.reporting.take().map(RefCell::into_inner)
	}

	pub fn has_reporting(&self) -> bool {
		self.reporting.is_some()
	}

	pub fn reporting(&self) -> Option<Ref<'_, VariantReporting>> {
		self.reporting.as_ref().map(RefCell::borrow)
	}

	pub fn reset_reporting(&self) {
		if let Some(reporting) = &self.reporting {
			reporting.borrow_mut().reset();
		}
	}

	/// Count one read of `registry:path`, if reporting is attached.
	pub(crate) fn record_usage(&self, full_path: &str) {
		if let Some(reporting) = &self.reporting {
			reporting.borrow_mut().add(full_path);
		}
	}

	fn entry(&self, name: &str) -> VarconfResult<&RegistryEntry> {
		self.registries
			.iter()
			.find(|entry| entry.registry.name() == name)
			.ok_or_else(|| VarconfError::UnknownRegistry(name.to_string()))
	}

	fn entry_mut(&mut self, name: &str) -> VarconfResult<&mut RegistryEntry> {
		self.registries
			.iter_mut()
			.find(|entry| entry.registry.name() == name)
			.ok_or_else(|| VarconfError::UnknownRegistry(name.to_string()))
	}

	fn check_unlocked(&self) -> VarconfResult<()> {
		if self.locked {
			Err(VarconfError::LockedRepository(self.name.clone()))
		} else {
			Ok(())
		}
	}
}

/// Split `registry:path` into its two non-empty halves.
pub fn parse_variant_path(full_path: &str) -> VarconfResult<(&str, &str)> {
	let tokens: Vec<&str> = full_path.split(REGISTRY_SEPARATOR).collect();

	match tokens.as_slice() {
		[registry, path] if !registry.trim().is_empty() && !path.trim().is_empty() => {
			Ok((registry.trim(), path.trim()))
		}
		_ => {
			Err(VarconfError::descriptor(
				full_path,
				"expected exactly one `:` between a registry and a path",
			))
		}
	}
}

fn parse_dependency(dependency: &str) -> VarconfResult<(&str, &str, bool)> {
	let trimmed = dependency.trim();
	let (reverse, core) = match trimmed.strip_prefix('!') {
		Some(rest) => (true, rest),
		None => (false, trimmed),
	};
	let (registry, path) = parse_variant_path(core)?;

	Ok((registry, path, reverse))
}

fn check_metadata(value: &str) -> VarconfResult<()> {
	if value.contains('/') {
		return Err(VarconfError::InvalidName {
			name: value.to_string(),
			reason: "organization and application names cannot contain `/`".to_string(),
		});
	}

	Ok(())
}
