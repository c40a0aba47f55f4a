#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;
use varconf_core::AnyEmptyResult;

pub const GEOMETRY_DEFINITIONS: &str = r#"#@key_label "name"
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

[name="width.PM" type="parameter"]
type : string = "real"

[name="layout.PM" type="parameter"]
type : string = "string"
string.enumerated.values : string[2] = "basic" "advanced"
string.default : string = "basic"
variants : string[1] = "if_advanced"
variants.if_advanced.model : string = "advanced.VM"
string.enumerated.advanced.variant : string = "if_advanced"

[name="detector.VM" type="variant"]
parameters : string[1] = "length"
parameters.length.model : string = "length.PM"

[name="advanced.VM" type="variant"]
parameters : string[1] = "width"
parameters.width.model : string = "width.PM"

[name="geometry.VM" type="variant"]
parameters : string[2] = "has_detector" "layout"
parameters.has_detector.model : string = "has_detector.PM"
parameters.layout.model : string = "layout.PM"
"#;

pub const CONFIG: &str = r#"name = "experiment"
organization = "acme"
models = ["models/geometry.def"]

[[registries]]
name = "geometry"
top_variant = "geometry.VM"
description = "Detector geometry"
rank = 0
"#;

pub fn varconf_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("varconf"));
	cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
	cmd
}

/// Write the geometry models and a `varconf.toml` describing them.
pub fn write_project(root: &Path) -> AnyEmptyResult {
	std::fs::create_dir_all(root.join("models"))?;
	std::fs::write(root.join("models/geometry.def"), GEOMETRY_DEFINITIONS)?;
	std::fs::write(root.join("varconf.toml"), CONFIG)?;

	Ok(())
}
