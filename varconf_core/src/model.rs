//! Parameter and variant models, and the catalog registries are built from.
//!
//! A catalog can be filled programmatically or from a definitions file in
//! the multi-section format, with one section per model:
//!
//! ```text
//! #@key_label "name"
//! #@meta_label "type"
//!
//! [name="has_detector.PM" type="parameter"]
//! type : string = "boolean"
//! boolean.default : boolean = false
//! variants : string[1] = "if_detector"
//! variants.if_detector.model : string = "detector.VM"
//! boolean.true.variant : string = "if_detector"
//!
//! [name="geometry.VM" type="variant"]
//! parameters : string[1] = "has_detector"
//! parameters.has_detector.model : string = "has_detector.PM"
//! ```

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::MultiProperties;
use crate::Properties;
use crate::PropertyValue;
use crate::Value;
use crate::ValueType;
use crate::VarconfError;
use crate::VarconfResult;

/// Meta value of a parameter model section.
pub const PARAMETER_MODEL_META: &str = "parameter";
/// Meta value of a variant model section.
pub const VARIANT_MODEL_META: &str = "variant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutability {
	#[default]
	Variable,
	Fixed,
}

impl Mutability {
	pub fn from_label(label: &str) -> Option<Self> {
		match label {
			"variable" => Some(Self::Variable),
			"fixed" => Some(Self::Fixed),
			_ => None,
		}
	}
}

/// A variant a parameter can branch into.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDecl {
	pub name: String,
	pub model: String,
	pub description: Option<String>,
}

/// Describes the type, domain and branching of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterModel {
	pub name: String,
	pub description: Option<String>,
	pub value_type: ValueType,
	pub mutability: Mutability,
	pub default: Option<Value>,
	pub fixed: Option<Value>,
	/// Allowed values. Empty means unrestricted.
	pub enumerated: Vec<Value>,
	pub variants: Vec<VariantDecl>,
	/// Values that select a variant, in declaration order.
	pub associations: Vec<(Value, String)>,
}

impl ParameterModel {
	pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
		Self {
			name: name.into(),
			description: None,
			value_type,
			mutability: Mutability::Variable,
			default: None,
			fixed: None,
			enumerated: vec![],
			variants: vec![],
			associations: vec![],
		}
	}

	#[must_use]
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	#[must_use]
	pub fn with_default(mut self, value: Value) -> Self {
		self.default = Some(value);
		self
	}

	/// Make the parameter fixed to `value`.
	#[must_use]
	pub fn with_fixed(mut self, value: Value) -> Self {
		self.mutability = Mutability::Fixed;
		self.fixed = Some(value);
		self
	}

	#[must_use]
	pub fn with_enumerated(mut self, values: Vec<Value>) -> Self {
		self.enumerated = values;
		self
	}

	#[must_use]
	pub fn with_variant(mut self, name: impl Into<String>, model: impl Into<String>) -> Self {
		self.variants.push(VariantDecl {
			name: name.into(),
			model: model.into(),
			description: None,
		});
		self
	}

	/// Selecting `value` activates the variant named `variant`.
	#[must_use]
	pub fn with_association(mut self, value: Value, variant: impl Into<String>) -> Self {
		self.associations.push((value, variant.into()));
		self
	}

	pub fn is_fixed(&self) -> bool {
		self.mutability == Mutability::Fixed
	}

	pub fn is_variable(&self) -> bool {
		self.mutability == Mutability::Variable
	}

	/// The value a freshly built record starts with.
	pub fn initial_value(&self) -> Option<Value> {
		match self.mutability {
			Mutability::Variable => self.default.clone(),
			Mutability::Fixed => self.fixed.clone(),
		}
	}

	/// The name of the variant selected by `value`, if any.
	pub fn variant_for(&self, value: &Value) -> Option<&str> {
		self.associations
			.iter()
			.find(|(candidate, _)| candidate == value)
			.map(|(_, variant)| variant.as_str())
	}

	/// The first value selecting `variant`.
	pub fn value_for_variant(&self, variant: &str) -> Option<&Value> {
		self.associations
			.iter()
			.find(|(_, candidate)| candidate == variant)
			.map(|(value, _)| value)
	}

	/// Check that `value` has the right type and lies in the domain.
	pub fn check_value(&self, path: &str, value: &Value) -> VarconfResult<()> {
		if value.value_type() != self.value_type {
			return Err(VarconfError::conversion(
				value.to_literal(),
				self.value_type.label(),
			));
		}

		if !self.enumerated.is_empty() && !self.enumerated.contains(value) {
			return Err(VarconfError::ValueNotAllowed {
				path: path.to_string(),
				value: value.to_literal(),
			});
		}

		Ok(())
	}

	/// Check the internal consistency of the model.
	pub fn validate(&self) -> VarconfResult<()> {
		if self.is_fixed() && self.fixed.is_none() {
			return Err(VarconfError::syntax(format!(
				"fixed parameter model `{}` has no fixed value",
				self.name
			)));
		}

		for value in self.default.iter().chain(self.fixed.iter()) {
			self.check_value(&self.name, value)?;
		}

		let mut names = BTreeSet::new();
		for variant in &self.variants {
			if !names.insert(variant.name.as_str()) {
				return Err(VarconfError::Duplicate {
					what: "variant",
					name: format!("{}/{}", self.name, variant.name),
				});
			}
		}

		for (value, variant) in &self.associations {
			if value.value_type() != self.value_type {
				return Err(VarconfError::conversion(
					value.to_literal(),
					self.value_type.label(),
				));
			}

			if !names.contains(variant.as_str()) {
				return Err(VarconfError::UnknownModel {
					kind: "variant",
					name: format!("{}/{variant}", self.name),
				});
			}
		}

		Ok(())
	}

	fn from_properties(name: &str, properties: &Properties) -> VarconfResult<Self> {
		let type_label = properties.fetch_string("type")?;
		let value_type = ValueType::from_label(&type_label)
			.ok_or_else(|| VarconfError::conversion(&type_label, "parameter type"))?;
		let mut model = Self::new(name, value_type);

		if properties.has_key("description") {
			model.description = Some(properties.fetch_string("description")?);
		}

		if properties.has_key("mutability") {
			let label = properties.fetch_string("mutability")?;
			model.mutability = Mutability::from_label(&label)
				.ok_or_else(|| VarconfError::conversion(&label, "mutability"))?;
		}

		let prefix = value_type.label();
		model.default = typed_value(properties, &format!("{prefix}.default"), value_type)?;
		model.fixed = typed_value(properties, &format!("{prefix}.fixed"), value_type)?;

		if properties.has_key("variants") {
			for variant in properties.fetch_strings("variants")? {
				let model_name = properties.fetch_string(&format!("variants.{variant}.model"))?;
				let description_key = format!("variants.{variant}.description");
				let description = if properties.has_key(&description_key) {
					Some(properties.fetch_string(&description_key)?)
				} else {
					None
				};

				model.variants.push(VariantDecl {
					name: variant,
					model: model_name,
					description,
				});
			}
		}

		match value_type {
			ValueType::Boolean => {
				for flag in [true, false] {
					let key = format!("boolean.{flag}.variant");
					if properties.has_key(&key) {
						model
							.associations
							.push((Value::Boolean(flag), properties.fetch_string(&key)?));
					}
				}
			}
			ValueType::Integer | ValueType::String => {
				let key = format!("{prefix}.enumerated.values");
				if properties.has_key(&key) {
					model.enumerated = properties.fetch_array(&key, value_type)?.to_vec();
				}

				for value in &model.enumerated {
					let literal = match value {
						Value::String(text) => text.clone(),
						other => other.to_literal(),
					};
					let key = format!("{prefix}.enumerated.{literal}.variant");
					if properties.has_key(&key) {
						model
							.associations
							.push((value.clone(), properties.fetch_string(&key)?));
					}
				}
			}
			ValueType::Real => {}
		}

		model.validate()?;

		Ok(model)
	}
}

fn typed_value(
	properties: &Properties,
	key: &str,
	value_type: ValueType,
) -> VarconfResult<Option<Value>> {
	let Some(property) = properties.get(key) else {
		return Ok(None);
	};

	match (&property.value, value_type) {
		(PropertyValue::Scalar(Value::Integer(value)), ValueType::Real) => {
			Ok(Some(Value::Real(*value as f64)))
		}
		(PropertyValue::Scalar(value), _) if value.value_type() == value_type => {
			Ok(Some(value.clone()))
		}
		_ => Err(VarconfError::conversion(key, value_type.label())),
	}
}

/// A parameter slot of a variant model.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSlot {
	pub name: String,
	pub model: String,
	pub description: Option<String>,
	pub rank: Option<i64>,
}

/// Groups the parameters that exist while a variant is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantModel {
	pub name: String,
	pub description: Option<String>,
	pub parameters: Vec<ParameterSlot>,
}

impl VariantModel {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			description: None,
			parameters: vec![],
		}
	}

	#[must_use]
	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	#[must_use]
	pub fn with_parameter(mut self, name: impl Into<String>, model: impl Into<String>) -> Self {
		self.parameters.push(ParameterSlot {
			name: name.into(),
			model: model.into(),
			description: None,
			rank: None,
		});
		self
	}

	#[must_use]
	pub fn with_ranked_parameter(
		mut self,
		name: impl Into<String>,
		model: impl Into<String>,
		rank: i64,
	) -> Self {
		self.parameters.push(ParameterSlot {
			name: name.into(),
			model: model.into(),
			description: None,
			rank: Some(rank),
		});
		self
	}

	/// Indices of the parameter slots in ranked order: ranked slots sorted
	/// by rank, then unranked ones in declaration order.
	pub fn ranked_order(&self) -> VarconfResult<Vec<usize>> {
		let mut ranked = BTreeMap::new();
		let mut unranked = vec![];

		for (index, slot) in self.parameters.iter().enumerate() {
			match slot.rank {
				Some(rank) => {
					if ranked.insert(rank, index).is_some() {
						return Err(VarconfError::Duplicate {
							what: "parameter rank",
							name: format!("{}#{rank}", self.name),
						});
					}
				}
				None => unranked.push(index),
			}
		}

		Ok(ranked.into_values().chain(unranked).collect())
	}

	pub fn validate(&self) -> VarconfResult<()> {
		let mut names = BTreeSet::new();
		for slot in &self.parameters {
			if !names.insert(slot.name.as_str()) {
				return Err(VarconfError::Duplicate {
					what: "parameter",
					name: format!("{}/{}", self.name, slot.name),
				});
			}
		}

		self.ranked_order().map(|_| ())
	}

	fn from_properties(name: &str, properties: &Properties) -> VarconfResult<Self> {
		let mut model = Self::new(name);

		if properties.has_key("description") {
			model.description = Some(properties.fetch_string("description")?);
		}

		if properties.has_key("parameters") {
			for parameter in properties.fetch_strings("parameters")? {
				let model_name = properties.fetch_string(&format!("parameters.{parameter}.model"))?;
				let description_key = format!("parameters.{parameter}.description");
				let rank_key = format!("parameters.{parameter}.rank");

				model.parameters.push(ParameterSlot {
					description: if properties.has_key(&description_key) {
						Some(properties.fetch_string(&description_key)?)
					} else {
						None
					},
					rank: if properties.has_key(&rank_key) {
						Some(properties.fetch_integer(&rank_key)?)
					} else {
						None
					},
					name: parameter,
					model: model_name,
				});
			}
		}

		model.validate()?;

		Ok(model)
	}
}

/// Named parameter and variant models.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
	parameters: BTreeMap<String, Arc<ParameterModel>>,
	variants: BTreeMap<String, Arc<VariantModel>>,
}

impl ModelCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_parameter(&mut self, model: ParameterModel) -> VarconfResult<()> {
		model.validate()?;

		if self.parameters.contains_key(&model.name) {
			return Err(VarconfError::Duplicate {
				what: "parameter model",
				name: model.name,
			});
		}

		self.parameters.insert(model.name.clone(), Arc::new(model));

		Ok(())
	}

	pub fn add_variant(&mut self, model: VariantModel) -> VarconfResult<()> {
		model.validate()?;

		if self.variants.contains_key(&model.name) {
			return Err(VarconfError::Duplicate {
				what: "variant model",
				name: model.name,
			});
		}

		self.variants.insert(model.name.clone(), Arc::new(model));

		Ok(())
	}

	pub fn parameter(&self, name: &str) -> VarconfResult<&Arc<ParameterModel>> {
		self.parameters
			.get(name)
			.ok_or_else(|| VarconfError::UnknownModel {
				kind: "parameter",
				name: name.to_string(),
			})
	}

	pub fn variant(&self, name: &str) -> VarconfResult<&Arc<VariantModel>> {
		self.variants.get(name).ok_or_else(|| VarconfError::UnknownModel {
			kind: "variant",
			name: name.to_string(),
		})
	}

	pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
		self.parameters.keys().map(String::as_str)
	}

	pub fn variant_names(&self) -> impl Iterator<Item = &str> {
		self.variants.keys().map(String::as_str)
	}

	/// Add every model section of a definitions file.
	pub fn load_definitions(&mut self, definitions: &MultiProperties) -> VarconfResult<()> {
		for entry in definitions.entries() {
			match entry.meta.as_deref() {
				Some(PARAMETER_MODEL_META) => {
					self.add_parameter(ParameterModel::from_properties(
						&entry.key,
						&entry.properties,
					)?)?;
				}
				Some(VARIANT_MODEL_META) => {
					self.add_variant(VariantModel::from_properties(
						&entry.key,
						&entry.properties,
					)?)?;
				}
				other => {
					return Err(VarconfError::syntax(format!(
						"section `{}` has unsupported model type `{}`",
						entry.key,
						other.unwrap_or_default()
					)));
				}
			}
		}

		tracing::debug!(
			parameters = self.parameters.len(),
			variants = self.variants.len(),
			"loaded model definitions"
		);

		Ok(())
	}
}
