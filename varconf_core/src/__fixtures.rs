use crate::ModelCatalog;
use crate::ParameterModel;
use crate::Value;
use crate::ValueType;
use crate::VarconfResult;
use crate::VariantModel;
use crate::VariantRegistry;
use crate::VariantRepository;

/// The geometry models written in the definition file format.
pub const GEOMETRY_DEFINITIONS: &str = r#"#@description Geometry models
#@key_label "name"
#@meta_label "type"

[name="has_detector.PM" type="parameter"]
type : string = "boolean"
boolean.default : boolean = false
variants : string[1] = "if_detector"
variants.if_detector.model : string = "detector.VM"
boolean.true.variant : string = "if_detector"

[name="length.PM" type="parameter"]
type : string = "real"
real.default : real = 2.5

[name="material.PM" type="parameter"]
type : string = "string"
string.enumerated.values : string[2] = "iron" "copper"
string.default : string = "iron"

[name="layout.PM" type="parameter"]
type : string = "string"
string.enumerated.values : string[2] = "basic" "advanced"
string.default : string = "basic"
variants : string[2] = "if_basic" "if_advanced"
variants.if_basic.model : string = "basic.VM"
variants.if_advanced.model : string = "advanced.VM"
string.enumerated.basic.variant : string = "if_basic"
string.enumerated.advanced.variant : string = "if_advanced"

[name="shape.PM" type="parameter"]
type : string = "string"
mutability : string = "fixed"
string.fixed : string = "box"

[name="count.PM" type="parameter"]
type : string = "integer"
integer.default : integer = 3

[name="width.PM" type="parameter"]
type : string = "real"

[name="detector.VM" type="variant"]
parameters : string[2] = "length" "material"
parameters.length.model : string = "length.PM"
parameters.material.model : string = "material.PM"

[name="basic.VM" type="variant"]
parameters : string[2] = "shape" "count"
parameters.shape.model : string = "shape.PM"
parameters.count.model : string = "count.PM"

[name="advanced.VM" type="variant"]
parameters : string[2] = "width" "count"
parameters.width.model : string = "width.PM"
parameters.count.model : string = "count.PM"

[name="geometry.VM" type="variant"]
parameters : string[2] = "has_detector" "layout"
parameters.has_detector.model : string = "has_detector.PM"
parameters.has_detector.rank : integer = 0
parameters.layout.model : string = "layout.PM"
parameters.layout.rank : integer = 1
"#;

fn text(value: &str) -> Value {
	Value::String(value.to_string())
}

/// Parameter models matching [`GEOMETRY_DEFINITIONS`].
pub fn geometry_parameter_models() -> Vec<ParameterModel> {
	vec![
		ParameterModel::new("has_detector.PM", ValueType::Boolean)
			.with_default(Value::Boolean(false))
			.with_variant("if_detector", "detector.VM")
			.with_association(Value::Boolean(true), "if_detector"),
		ParameterModel::new("length.PM", ValueType::Real).with_default(Value::Real(2.5)),
		ParameterModel::new("material.PM", ValueType::String)
			.with_enumerated(vec![text("iron"), text("copper")])
			.with_default(text("iron")),
		ParameterModel::new("layout.PM", ValueType::String)
			.with_enumerated(vec![text("basic"), text("advanced")])
			.with_default(text("basic"))
			.with_variant("if_basic", "basic.VM")
			.with_variant("if_advanced", "advanced.VM")
			.with_association(text("basic"), "if_basic")
			.with_association(text("advanced"), "if_advanced"),
		ParameterModel::new("shape.PM", ValueType::String).with_fixed(text("box")),
		ParameterModel::new("count.PM", ValueType::Integer).with_default(Value::Integer(3)),
		ParameterModel::new("width.PM", ValueType::Real),
	]
}

pub fn geometry_variant_models() -> Vec<VariantModel> {
	vec![
		VariantModel::new("detector.VM")
			.with_parameter("length", "length.PM")
			.with_parameter("material", "material.PM"),
		VariantModel::new("basic.VM")
			.with_parameter("shape", "shape.PM")
			.with_parameter("count", "count.PM"),
		VariantModel::new("advanced.VM")
			.with_parameter("width", "width.PM")
			.with_parameter("count", "count.PM"),
		VariantModel::new("geometry.VM")
			.with_ranked_parameter("has_detector", "has_detector.PM", 0)
			.with_ranked_parameter("layout", "layout.PM", 1),
	]
}

pub fn geometry_catalog() -> VarconfResult<ModelCatalog> {
	let mut catalog = ModelCatalog::new();

	for model in geometry_parameter_models() {
		catalog.add_parameter(model)?;
	}

	for model in geometry_variant_models() {
		catalog.add_variant(model)?;
	}

	Ok(catalog)
}

pub fn geometry_registry() -> VarconfResult<VariantRegistry> {
	VariantRegistry::build("geometry", "geometry.VM", &geometry_catalog()?)
}

/// A repository holding the `geometry` registry.
pub fn geometry_repository() -> VarconfResult<VariantRepository> {
	let mut repository = VariantRepository::new("experiment");
	repository.set_organization("acme")?;
	repository.set_application("simulation")?;
	repository.add_registry(geometry_registry()?, Some(0))?;

	Ok(repository)
}

/// Values of [`geometry_repository`] right after it is built.
pub const DEFAULT_GEOMETRY_VALUES: &str = r#"#@format=datatools::configuration::variant
#@format.version=1.0
#@organization=acme
#@application=simulation

[registry="geometry"]
has_detector = false
layout = "basic"
layout/if_basic/count = 3

"#;
