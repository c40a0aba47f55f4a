mod common;

use predicates::prelude::*;
use varconf_core::AnyEmptyResult;

const PARTS: &str = r#"#@key_label "name"
#@meta_label "type"

#@variant_section_only geometry:has_detector/if_detector|false
[name="detector" type="part"]
length : real = @variant(geometry:has_detector/if_detector/length|1.0)

[name="__scratch" type="part"]
note : string = "draft"

[name="frame" type="part"]
#@variant_only !geometry:layout/if_advanced|true
label : string = "main"
__hidden : boolean = true
"#;

#[test]
fn sections_drop_inactive_gates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;
	std::fs::write(tmp.path().join("parts.conf"), PARTS)?;

	common::varconf_cmd()
		.arg("sections")
		.arg(tmp.path().join("parts.conf"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("[name=\"frame\" type=\"part\"]"))
		.stdout(predicates::str::contains("[name=\"__scratch\" type=\"part\"]"))
		.stdout(predicates::str::contains("[name=\"detector\"").not());

	Ok(())
}

#[test]
fn sections_follow_settings() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;
	std::fs::write(tmp.path().join("parts.conf"), PARTS)?;

	let output = common::varconf_cmd()
		.arg("sections")
		.arg(tmp.path().join("parts.conf"))
		.arg("--format")
		.arg("json")
		.arg("--skip-private")
		.arg("--path")
		.arg(tmp.path())
		.arg("--set")
		.arg("geometry:has_detector=true")
		.output()?;
	assert!(output.status.success());

	let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
	similar_asserts::assert_eq!(
		json,
		serde_json::json!({
			"key_label": "name",
			"meta_label": "type",
			"entries": [
				{
					"key": "detector",
					"meta": "part",
					"properties": { "length": 2.5 },
				},
				{
					"key": "frame",
					"meta": "part",
					"properties": { "label": "main" },
				},
			],
		})
	);

	Ok(())
}

#[test]
fn sections_without_config_use_defaults() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("parts.conf"), PARTS)?;

	common::varconf_cmd()
		.arg("sections")
		.arg(tmp.path().join("parts.conf"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("[name=\"frame\" type=\"part\"]"))
		.stdout(predicates::str::contains("label : string = \"main\""));

	Ok(())
}

#[test]
fn sections_forbid_variants() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("parts.conf"), PARTS)?;

	common::varconf_cmd()
		.arg("sections")
		.arg(tmp.path().join("parts.conf"))
		.arg("--forbid-variants")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2);

	Ok(())
}

#[test]
fn sections_missing_file_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::varconf_cmd()
		.arg("sections")
		.arg(tmp.path().join("missing.conf"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2);

	Ok(())
}
