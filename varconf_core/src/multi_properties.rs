use serde::Serialize;

use crate::Properties;
use crate::VarconfError;
use crate::VarconfResult;

/// One `(key, meta, properties)` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiEntry {
	pub key: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub meta: Option<String>,
	pub properties: Properties,
}

impl MultiEntry {
	pub fn new(key: impl Into<String>, meta: Option<String>, properties: Properties) -> Self {
		Self {
			key: key.into(),
			meta,
			properties,
		}
	}
}

/// An ordered list of named property sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MultiProperties {
	#[serde(skip_serializing_if = "Option::is_none")]
	description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	key_label: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	meta_label: Option<String>,
	entries: Vec<MultiEntry>,
}

impl MultiProperties {
	pub fn new() -> Self {
		Self::default()
	}

	/// Preset the labels a reader checks headers against.
	pub fn with_labels(key_label: impl Into<String>, meta_label: Option<&str>) -> Self {
		Self {
			key_label: Some(key_label.into()),
			meta_label: meta_label.map(ToString::to_string),
			..Self::default()
		}
	}

	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	pub fn set_description(&mut self, description: impl Into<String>) {
		self.description = Some(description.into());
	}

	pub fn key_label(&self) -> Option<&str> {
		self.key_label.as_deref()
	}

	pub fn set_key_label(&mut self, label: impl Into<String>) {
		self.key_label = Some(label.into());
	}

	pub fn meta_label(&self) -> Option<&str> {
		self.meta_label.as_deref()
	}

	pub fn set_meta_label(&mut self, label: impl Into<String>) {
		self.meta_label = Some(label.into());
	}

	pub fn clear_labels(&mut self) {
		self.key_label = None;
		self.meta_label = None;
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> &[MultiEntry] {
		&self.entries
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|entry| entry.key.as_str())
	}

	pub fn has_key(&self, key: &str) -> bool {
		self.position(key).is_some()
	}

	pub fn get(&self, key: &str) -> Option<&MultiEntry> {
		self.position(key).map(|index| &self.entries[index])
	}

	pub fn get_mut(&mut self, key: &str) -> Option<&mut MultiEntry> {
		self.position(key).map(move |index| &mut self.entries[index])
	}

	/// Append a section. The key must be new.
	pub fn add(
		&mut self,
		key: impl Into<String>,
		meta: Option<String>,
		properties: Properties,
	) -> VarconfResult<()> {
		let key = key.into();

		if key.is_empty() {
			return Err(VarconfError::InvalidName {
				name: key,
				reason: "section keys cannot be empty".to_string(),
			});
		}

		if self.has_key(&key) {
			return Err(VarconfError::Duplicate {
				what: "section",
				name: key,
			});
		}

		self.entries.push(MultiEntry::new(key, meta, properties));

		Ok(())
	}

	/// Replace a section in place, or append it when the key is new.
	pub fn add_or_replace(&mut self, entry: MultiEntry) {
		match self.position(&entry.key) {
			Some(index) => self.entries[index] = entry,
			None => self.entries.push(entry),
		}
	}

	pub fn remove(&mut self, key: &str) -> Option<MultiEntry> {
		self.position(key).map(|index| self.entries.remove(index))
	}

	/// Merge the sections of `other`: same-key sections are replaced in
	/// place and new ones appended. Missing labels are taken from `other`.
	pub fn merge_with(&mut self, other: MultiProperties) {
		if self.key_label.is_none() {
			self.key_label = other.key_label;
		}

		if self.meta_label.is_none() {
			self.meta_label = other.meta_label;
		}

		for entry in other.entries {
			self.add_or_replace(entry);
		}
	}

	fn position(&self, key: &str) -> Option<usize> {
		self.entries.iter().position(|entry| entry.key == key)
	}
}
