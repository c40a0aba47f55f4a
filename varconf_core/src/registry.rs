use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ModelCatalog;
use crate::RecordId;
use crate::RecordKind;
use crate::RecordNode;
use crate::Value;
use crate::VarconfError;
use crate::VarconfResult;
use crate::VariantModel;
use crate::VariantRecord;

/// Path of the top variant record of every registry.
pub const TOP_PATH: &str = "/";
/// Separator between path components.
pub const PATH_SEPARATOR: char = '/';

/// The variant tree of one configurable subsystem.
#[derive(Debug, Clone)]
pub struct VariantRegistry {
	name: String,
	description: Option<String>,
	records: Vec<VariantRecord>,
	index: BTreeMap<String, RecordId>,
}

impl VariantRegistry {
	/// Instantiate the tree rooted at the variant model `top_model`.
	pub fn build(
		name: impl Into<String>,
		top_model: &str,
		catalog: &ModelCatalog,
	) -> VarconfResult<Self> {
		let name = name.into();
		let top = Arc::clone(catalog.variant(top_model)?);
		let mut registry = Self {
			name,
			description: top.description.clone(),
			records: vec![],
			index: BTreeMap::new(),
		};
		let mut stack = vec![];

		registry.instantiate_variant(None, TOP_PATH.to_string(), TOP_PATH, top, catalog, &mut stack)?;

		tracing::debug!(
			registry = %registry.name,
			records = registry.records.len(),
			"built variant registry"
		);

		Ok(registry)
	}

	fn push_record(&mut self, record: VariantRecord) -> RecordId {
		let id = RecordId(self.records.len());

		if let Some(parent) = record.parent {
			self.records[parent.0]
				.daughters
				.push((record.name.clone(), id));
		}

		self.index.insert(record.path.clone(), id);
		self.records.push(record);

		id
	}

	fn instantiate_variant(
		&mut self,
		parent: Option<RecordId>,
		path: String,
		name: &str,
		model: Arc<VariantModel>,
		catalog: &ModelCatalog,
		stack: &mut Vec<String>,
	) -> VarconfResult<RecordId> {
		if stack.contains(&model.name) {
			return Err(VarconfError::RecursiveModel(model.name.clone()));
		}
		stack.push(model.name.clone());

		let order = model.ranked_order()?;
		let id = self.push_record(VariantRecord {
			path: path.clone(),
			name: name.to_string(),
			description: model.description.clone(),
			parent,
			daughters: vec![],
			ranked: vec![],
			node: RecordNode::Variant {
				model: Arc::clone(&model),
			},
		});

		let mut daughters = Vec::with_capacity(model.parameters.len());
		for slot in &model.parameters {
			let parameter = Arc::clone(catalog.parameter(&slot.model)?);
			let parameter_path = if path == TOP_PATH {
				slot.name.clone()
			} else {
				format!("{path}{PATH_SEPARATOR}{}", slot.name)
			};
			let value = parameter.initial_value();
			let parameter_id = self.push_record(VariantRecord {
				path: parameter_path.clone(),
				name: slot.name.clone(),
				description: slot
					.description
					.clone()
					.or_else(|| parameter.description.clone()),
				parent: Some(id),
				daughters: vec![],
				ranked: vec![],
				node: RecordNode::Parameter {
					model: Arc::clone(&parameter),
					value,
				},
			});

			for variant in &parameter.variants {
				let variant_model = Arc::clone(catalog.variant(&variant.model)?);
				let variant_id = self.instantiate_variant(
					Some(parameter_id),
					format!("{parameter_path}{PATH_SEPARATOR}{}", variant.name),
					&variant.name,
					variant_model,
					catalog,
					stack,
				)?;

				if let Some(description) = &variant.description {
					self.records[variant_id.0].description = Some(description.clone());
				}
			}

			daughters.push(parameter_id);
		}

		self.records[id.0].ranked = order.into_iter().map(|index| daughters[index]).collect();
		stack.pop();

		Ok(id)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	pub fn set_description(&mut self, description: impl Into<String>) {
		self.description = Some(description.into());
	}

	pub fn top(&self) -> RecordId {
		RecordId(0)
	}

	pub fn record(&self, id: RecordId) -> &VariantRecord {
		&self.records[id.0]
	}

	/// Every record, parents before daughters.
	pub fn records(&self) -> impl Iterator<Item = (RecordId, &VariantRecord)> {
		self.records
			.iter()
			.enumerate()
			.map(|(index, record)| (RecordId(index), record))
	}

	pub fn find(&self, path: &str) -> Option<RecordId> {
		self.index.get(path).copied()
	}

	/// Look up a record, failing with a reference error.
	pub fn get(&self, path: &str) -> VarconfResult<RecordId> {
		self.find(path).ok_or_else(|| self.unknown(path))
	}

	pub fn has_record(&self, path: &str) -> bool {
		self.index.contains_key(path)
	}

	pub fn has_parameter(&self, path: &str) -> bool {
		self.find(path)
			.is_some_and(|id| self.records[id.0].kind() == RecordKind::Parameter)
	}

	pub fn has_variant(&self, path: &str) -> bool {
		self.find(path)
			.is_some_and(|id| self.records[id.0].kind() == RecordKind::Variant)
	}

	/// A record is active when its whole ancestry is active and every
	/// parameter ancestor's value selects the branch the record lies on.
	pub fn is_active(&self, id: RecordId) -> bool {
		let mut current = id;

		while let Some(parent) = self.records[current.0].parent {
			let parent_record = &self.records[parent.0];

			if parent_record.is_parameter()
				&& parent_record.selected_variant() != Some(self.records[current.0].name.as_str())
			{
				return false;
			}

			current = parent;
		}

		true
	}

	pub fn is_active_record(&self, path: &str) -> VarconfResult<bool> {
		self.get(path).map(|id| self.is_active(id))
	}

	pub fn is_active_variant(&self, path: &str) -> VarconfResult<bool> {
		let id = self.get(path)?;

		if !self.records[id.0].is_variant() {
			return Err(self.unknown(path));
		}

		Ok(self.is_active(id))
	}

	pub fn is_active_parameter(&self, path: &str) -> VarconfResult<bool> {
		let id = self.parameter_id(path)?;
		Ok(self.is_active(id))
	}

	/// Ranked parameters of the top variant.
	pub fn ranked_parameters(&self) -> &[RecordId] {
		self.ranked_parameter_daughters(self.top())
	}

	/// Parameter daughters of a variant record in ranked order. Parameter
	/// records have none.
	pub fn ranked_parameter_daughters(&self, id: RecordId) -> &[RecordId] {
		&self.records[id.0].ranked
	}

	/// The current typed value of an active parameter.
	pub fn parameter_value(&self, path: &str) -> VarconfResult<&Value> {
		let id = self.parameter_id(path)?;

		if !self.is_active(id) {
			return Err(VarconfError::InactiveRecord {
				registry: self.name.clone(),
				path: path.to_string(),
			});
		}

		self.records[id.0]
			.value()
			.ok_or_else(|| VarconfError::UnsetValue {
				registry: self.name.clone(),
				path: path.to_string(),
			})
	}

	/// The current value of an active parameter in macro form: numeric
	/// booleans and raw strings.
	pub fn get_parameter_value(&self, path: &str) -> VarconfResult<String> {
		self.parameter_value(path).map(Value::to_macro_text)
	}

	/// Parse `text` according to the parameter type and assign it.
	pub fn set_parameter_value(&mut self, path: &str, text: &str) -> VarconfResult<()> {
		let id = self.parameter_id(path)?;
		let value_type = self.records[id.0]
			.parameter_model()
			.map(|model| model.value_type)
			.ok_or_else(|| self.unknown(path))?;
		let value = Value::parse(value_type, text)?;

		self.set_value(path, value)
	}

	/// Assign a typed value to an active variable parameter.
	pub fn set_value(&mut self, path: &str, value: Value) -> VarconfResult<()> {
		let id = self.assignable(path)?;
		self.assign(id, Some(value))
	}

	pub fn unset_parameter_value(&mut self, path: &str) -> VarconfResult<()> {
		let id = self.assignable(path)?;
		self.assign(id, None)
	}

	/// Select a variant by assigning its parent parameter the first value
	/// mapped to it. Sibling branches become inactive.
	pub fn select_variant(&mut self, path: &str) -> VarconfResult<()> {
		let id = self.get(path)?;
		let record = &self.records[id.0];

		if !record.is_variant() {
			return Err(self.unknown(path));
		}

		let Some(parent) = record.parent else {
			// The top variant is always selected.
			return Ok(());
		};

		let value = self.records[parent.0]
			.parameter_model()
			.and_then(|model| model.value_for_variant(&record.name))
			.cloned()
			.ok_or_else(|| VarconfError::UnselectableVariant(path.to_string()))?;
		let parent_path = self.records[parent.0].path.clone();

		self.set_value(&parent_path, value)
	}

	/// Assign without the activity check. Used by loaders walking active
	/// records only.
	pub(crate) fn assign(&mut self, id: RecordId, value: Option<Value>) -> VarconfResult<()> {
		let record = &self.records[id.0];
		let Some(model) = record.parameter_model() else {
			return Err(self.unknown(&record.path));
		};

		if model.is_fixed() {
			return Err(VarconfError::FixedParameter(record.path.clone()));
		}

		if let Some(value) = &value {
			model.check_value(&record.path, value)?;
		}

		self.records[id.0].set_value(value);

		Ok(())
	}

	/// Paths of active variable parameters without a value.
	pub fn unset_parameters(&self) -> Vec<String> {
		self.records()
			.filter(|(id, record)| {
				record.is_variable_parameter() && !record.has_value() && self.is_active(*id)
			})
			.map(|(_, record)| record.path.clone())
			.collect()
	}

	/// Whether every active variable parameter has a value.
	pub fn is_accomplished(&self) -> bool {
		self.unset_parameters().is_empty()
	}

	fn parameter_id(&self, path: &str) -> VarconfResult<RecordId> {
		let id = self.get(path)?;

		if self.records[id.0].is_parameter() {
			Ok(id)
		} else {
			Err(self.unknown(path))
		}
	}

	fn assignable(&self, path: &str) -> VarconfResult<RecordId> {
		let id = self.parameter_id(path)?;

		if !self.is_active(id) {
			return Err(VarconfError::InactiveRecord {
				registry: self.name.clone(),
				path: path.to_string(),
			});
		}

		Ok(id)
	}

	fn unknown(&self, path: &str) -> VarconfError {
		VarconfError::UnknownRecord {
			registry: self.name.clone(),
			path: path.to_string(),
		}
	}
}
