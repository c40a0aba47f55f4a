use serde::Serialize;
use serde::ser::SerializeMap;

use crate::Value;
use crate::ValueType;
use crate::VarconfError;
use crate::VarconfResult;

/// Keys starting with this prefix are private.
pub const PRIVATE_PREFIX: &str = "__";

/// A scalar or a homogeneous array of scalars.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
	Scalar(Value),
	Array {
		value_type: ValueType,
		values: Vec<Value>,
	},
}

impl PropertyValue {
	pub fn value_type(&self) -> ValueType {
		match self {
			Self::Scalar(value) => value.value_type(),
			Self::Array { value_type, .. } => *value_type,
		}
	}

	pub fn is_array(&self) -> bool {
		matches!(self, Self::Array { .. })
	}
}

impl Serialize for PropertyValue {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		match self {
			Self::Scalar(value) => value.serialize(serializer),
			Self::Array { values, .. } => values.serialize(serializer),
		}
	}
}

impl From<Value> for PropertyValue {
	fn from(value: Value) -> Self {
		Self::Scalar(value)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
	pub value: PropertyValue,
	pub description: Option<String>,
	pub locked: bool,
}

impl Property {
	pub fn new(value: impl Into<PropertyValue>) -> Self {
		Self {
			value: value.into(),
			description: None,
			locked: false,
		}
	}
}

/// An ordered, typed key/value store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
	description: Option<String>,
	entries: Vec<(String, Property)>,
}

impl Properties {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	pub fn set_description(&mut self, description: impl Into<String>) {
		self.description = Some(description.into());
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(key, _)| key.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
		self.entries
			.iter()
			.map(|(key, property)| (key.as_str(), property))
	}

	pub fn has_key(&self, key: &str) -> bool {
		self.position(key).is_some()
	}

	pub fn get(&self, key: &str) -> Option<&Property> {
		self.position(key).map(|index| &self.entries[index].1)
	}

	pub fn is_locked(&self, key: &str) -> bool {
		self.get(key).is_some_and(|property| property.locked)
	}

	/// Insert or replace a property. Replacing a locked property fails.
	pub fn store(&mut self, key: impl Into<String>, property: Property) -> VarconfResult<()> {
		let key = key.into();

		match self.position(&key) {
			Some(index) if self.entries[index].1.locked => Err(VarconfError::LockedProperty(key)),
			Some(index) => {
				self.entries[index].1 = property;
				Ok(())
			}
			None => {
				self.entries.push((key, property));
				Ok(())
			}
		}
	}

	pub fn store_value(&mut self, key: impl Into<String>, value: Value) -> VarconfResult<()> {
		self.store(key, Property::new(value))
	}

	pub fn store_array(
		&mut self,
		key: impl Into<String>,
		value_type: ValueType,
		values: Vec<Value>,
	) -> VarconfResult<()> {
		self.store(
			key,
			Property::new(PropertyValue::Array { value_type, values }),
		)
	}

	/// Append values to an existing array of the same type.
	pub fn append(
		&mut self,
		key: &str,
		value_type: ValueType,
		extra: Vec<Value>,
	) -> VarconfResult<()> {
		let Some(index) = self.position(key) else {
			return Err(VarconfError::UnknownProperty(key.to_string()));
		};
		let property = &mut self.entries[index].1;

		if property.locked {
			return Err(VarconfError::LockedProperty(key.to_string()));
		}

		match &mut property.value {
			PropertyValue::Array {
				value_type: existing,
				values,
			} if *existing == value_type => {
				values.extend(extra);
				Ok(())
			}
			other => {
				Err(VarconfError::conversion(
					key,
					format!("{}[] (found {})", value_type, other.value_type()),
				))
			}
		}
	}

	pub fn lock(&mut self, key: &str) -> VarconfResult<()> {
		let Some(index) = self.position(key) else {
			return Err(VarconfError::UnknownProperty(key.to_string()));
		};
		self.entries[index].1.locked = true;

		Ok(())
	}

	pub fn erase(&mut self, key: &str) -> Option<Property> {
		self.position(key).map(|index| self.entries.remove(index).1)
	}

	/// Remove every private key.
	pub fn erase_private(&mut self) {
		self.entries.retain(|(key, _)| !key_is_private(key));
	}

	pub fn fetch_boolean(&self, key: &str) -> VarconfResult<bool> {
		self.fetch_scalar(key, ValueType::Boolean)
			.and_then(|value| value.as_bool().ok_or_else(|| mismatch(key, ValueType::Boolean)))
	}

	pub fn fetch_integer(&self, key: &str) -> VarconfResult<i64> {
		self.fetch_scalar(key, ValueType::Integer)
			.and_then(|value| value.as_integer().ok_or_else(|| mismatch(key, ValueType::Integer)))
	}

	/// Reals also accept integer properties.
	pub fn fetch_real(&self, key: &str) -> VarconfResult<f64> {
		let property = self.fetch(key)?;

		match &property.value {
			PropertyValue::Scalar(value) => value.as_real().ok_or_else(|| mismatch(key, ValueType::Real)),
			PropertyValue::Array { .. } => Err(mismatch(key, ValueType::Real)),
		}
	}

	pub fn fetch_string(&self, key: &str) -> VarconfResult<String> {
		self.fetch_scalar(key, ValueType::String).and_then(|value| {
			value
				.as_str()
				.map(ToString::to_string)
				.ok_or_else(|| mismatch(key, ValueType::String))
		})
	}

	pub fn fetch_strings(&self, key: &str) -> VarconfResult<Vec<String>> {
		Ok(self
			.fetch_array(key, ValueType::String)?
			.iter()
			.filter_map(|value| value.as_str().map(ToString::to_string))
			.collect())
	}

	pub fn fetch_integers(&self, key: &str) -> VarconfResult<Vec<i64>> {
		Ok(self
			.fetch_array(key, ValueType::Integer)?
			.iter()
			.filter_map(Value::as_integer)
			.collect())
	}

	/// Fetch an array of any type as its values.
	pub fn fetch_array(&self, key: &str, value_type: ValueType) -> VarconfResult<&[Value]> {
		match &self.fetch(key)?.value {
			PropertyValue::Array {
				value_type: found,
				values,
			} if *found == value_type => Ok(values.as_slice()),
			_ => Err(VarconfError::conversion(key, format!("{value_type}[]"))),
		}
	}

	/// Copy every property of `other` into `self`. Existing keys are
	/// replaced only when `allow_override` is set.
	pub fn merge_with(&mut self, other: &Properties, allow_override: bool) -> VarconfResult<()> {
		for (key, property) in &other.entries {
			if self.has_key(key) && !allow_override {
				return Err(VarconfError::Duplicate {
					what: "property",
					name: key.clone(),
				});
			}

			self.store(key.clone(), property.clone())?;
		}

		Ok(())
	}

	fn fetch(&self, key: &str) -> VarconfResult<&Property> {
		self.get(key)
			.ok_or_else(|| VarconfError::UnknownProperty(key.to_string()))
	}

	fn fetch_scalar(&self, key: &str, value_type: ValueType) -> VarconfResult<&Value> {
		match &self.fetch(key)?.value {
			PropertyValue::Scalar(value) => Ok(value),
			PropertyValue::Array { .. } => Err(mismatch(key, value_type)),
		}
	}

	fn position(&self, key: &str) -> Option<usize> {
		self.entries.iter().position(|(existing, _)| existing == key)
	}
}

impl Serialize for Properties {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		let mut map = serializer.serialize_map(Some(self.entries.len()))?;

		for (key, property) in &self.entries {
			map.serialize_entry(key, &property.value)?;
		}

		map.end()
	}
}

pub fn key_is_private(key: &str) -> bool {
	key.starts_with(PRIVATE_PREFIX)
}

fn mismatch(key: &str, expected: ValueType) -> VarconfError {
	VarconfError::conversion(key, expected.label())
}
