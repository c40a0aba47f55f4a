use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::ParameterModel;
use crate::Value;
use crate::VariantModel;

/// Index of a record inside the arena of its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(pub(crate) usize);

impl RecordId {
	pub fn index(self) -> usize {
		self.0
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
	Parameter,
	Variant,
}

impl fmt::Display for RecordKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Parameter => f.write_str("parameter"),
			Self::Variant => f.write_str("variant"),
		}
	}
}

/// What a record is an instance of.
#[derive(Debug, Clone)]
pub enum RecordNode {
	Parameter {
		model: Arc<ParameterModel>,
		value: Option<Value>,
	},
	Variant {
		model: Arc<VariantModel>,
	},
}

/// A node of the variant tree.
///
/// Parameter records have variant daughters and variant records have
/// parameter daughters. Parents and daughters are referenced by [`RecordId`]
/// into the owning registry.
#[derive(Debug, Clone)]
pub struct VariantRecord {
	pub(crate) path: String,
	pub(crate) name: String,
	pub(crate) description: Option<String>,
	pub(crate) parent: Option<RecordId>,
	pub(crate) daughters: Vec<(String, RecordId)>,
	pub(crate) ranked: Vec<RecordId>,
	pub(crate) node: RecordNode,
}

impl VariantRecord {
	pub fn path(&self) -> &str {
		&self.path
	}

	/// The last component of the path.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	pub fn parent(&self) -> Option<RecordId> {
		self.parent
	}

	/// Daughters in insertion order.
	pub fn daughters(&self) -> impl Iterator<Item = (&str, RecordId)> {
		self.daughters.iter().map(|(name, id)| (name.as_str(), *id))
	}

	pub fn daughter(&self, name: &str) -> Option<RecordId> {
		self.daughters
			.iter()
			.find(|(candidate, _)| candidate == name)
			.map(|(_, id)| *id)
	}

	pub fn kind(&self) -> RecordKind {
		match self.node {
			RecordNode::Parameter { .. } => RecordKind::Parameter,
			RecordNode::Variant { .. } => RecordKind::Variant,
		}
	}

	pub fn is_parameter(&self) -> bool {
		self.kind() == RecordKind::Parameter
	}

	pub fn is_variant(&self) -> bool {
		self.kind() == RecordKind::Variant
	}

	pub fn parameter_model(&self) -> Option<&ParameterModel> {
		match &self.node {
			RecordNode::Parameter { model, .. } => Some(model),
			RecordNode::Variant { .. } => None,
		}
	}

	pub fn variant_model(&self) -> Option<&VariantModel> {
		match &self.node {
			RecordNode::Variant { model } => Some(model),
			RecordNode::Parameter { .. } => None,
		}
	}

	pub fn value(&self) -> Option<&Value> {
		match &self.node {
			RecordNode::Parameter { value, .. } => value.as_ref(),
			RecordNode::Variant { .. } => None,
		}
	}

	pub fn has_value(&self) -> bool {
		self.value().is_some()
	}

	pub fn is_fixed(&self) -> bool {
		self.parameter_model().is_some_and(ParameterModel::is_fixed)
	}

	/// Variable parameters are the only records that carry a stored value.
	pub fn is_variable_parameter(&self) -> bool {
		self.parameter_model().is_some_and(ParameterModel::is_variable)
	}

	/// The name of the variant daughter selected by the current value.
	pub fn selected_variant(&self) -> Option<&str> {
		match &self.node {
			RecordNode::Parameter { model, value } => {
				value.as_ref().and_then(|value| model.variant_for(value))
			}
			RecordNode::Variant { .. } => None,
		}
	}

	pub(crate) fn set_value(&mut self, new_value: Option<Value>) {
		if let RecordNode::Parameter { value, .. } = &mut self.node {
			*value = new_value;
		}
	}
}
