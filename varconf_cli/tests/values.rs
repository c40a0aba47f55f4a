mod common;

use varconf_core::AnyEmptyResult;

#[test]
fn store_prints_active_values() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("store")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::diff(
			"#@format=datatools::configuration::variant\n#@format.version=1.0\n#@organization=acme\n\n[registry=\"geometry\"]\nhas_detector = false\nlayout = \"basic\"\n\n",
		));

	Ok(())
}

#[test]
fn store_applies_settings() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("store")
		.arg("--no-header")
		.arg("--path")
		.arg(tmp.path())
		.arg("--set")
		.arg("geometry:has_detector=true")
		.arg("--set")
		.arg("geometry:has_detector/if_detector/length=3.5")
		.assert()
		.success()
		.stdout(predicates::str::diff(
			"[registry=\"geometry\"]\nhas_detector = true\nhas_detector/if_detector/length = 3.5\nlayout = \"basic\"\n\n",
		));

	Ok(())
}

#[test]
fn stored_values_load_back() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;
	let values = tmp.path().join("values.conf");

	common::varconf_cmd()
		.arg("store")
		.arg("--path")
		.arg(tmp.path())
		.arg("--output")
		.arg(&values)
		.arg("--set")
		.arg("geometry:has_detector=1")
		.arg("--set")
		.arg("geometry:has_detector/if_detector/length=4")
		.assert()
		.success()
		.stdout(predicates::str::contains("Wrote values to"));

	common::varconf_cmd()
		.arg("get")
		.arg("geometry:has_detector/if_detector/length")
		.arg("--path")
		.arg(tmp.path())
		.arg("--load")
		.arg(&values)
		.assert()
		.success()
		.stdout("4.0\n");

	Ok(())
}

#[test]
fn get_prints_macro_text() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("get")
		.arg("geometry:has_detector")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("0\n");

	common::varconf_cmd()
		.arg("get")
		.arg("geometry:layout")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("basic\n");

	Ok(())
}

#[test]
fn get_unknown_registry_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("get")
		.arg("optics:focus")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("unknown registry `optics`"));

	Ok(())
}

#[test]
fn missing_config_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::varconf_cmd()
		.arg("show")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("no config file found"));

	Ok(())
}

#[test]
fn check_passes_with_defaults() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Check passed"));

	Ok(())
}

#[test]
fn check_lists_unset_parameters() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.arg("--set")
		.arg("geometry:layout=advanced")
		.assert()
		.code(1)
		.stdout(predicates::str::contains("Check failed"))
		.stdout(predicates::str::contains("geometry:layout/if_advanced/width"));

	Ok(())
}

#[test]
fn invalid_setting_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.arg("--set")
		.arg("geometry:layout=round")
		.assert()
		.code(2)
		.stderr(predicates::str::contains("is not allowed"));

	Ok(())
}

#[test]
fn show_json_lists_active_values() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	let output = common::varconf_cmd()
		.arg("show")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.arg("--set")
		.arg("geometry:layout=advanced")
		.output()?;
	assert!(output.status.success());

	let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["name"], "experiment");
	assert_eq!(json["accomplished"], false);
	assert_eq!(json["registries"][0]["name"], "geometry");
	assert_eq!(json["registries"][0]["active"], true);
	assert_eq!(json["registries"][0]["values"]["layout"], "advanced");
	assert!(json["registries"][0]["values"]["layout/if_advanced/width"].is_null());

	Ok(())
}

#[test]
fn show_text_lists_registries() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("show")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("[geometry]"))
		.stdout(predicates::str::contains("Detector geometry"))
		.stdout(predicates::str::contains("  layout = \"basic\""));

	Ok(())
}
