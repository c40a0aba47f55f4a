mod common;

use rstest::rstest;
use varconf_core::AnyEmptyResult;

#[rstest]
#[case::default_used(&["resolve", "geometry:has_detector/if_detector|true"], "true")]
#[case::default_skips_negation(&["resolve", "!geometry:has_detector/if_detector|true"], "true")]
#[case::plain_text(&["preprocess", "len=@variant(geometry:length|1.5)"], "len=1.5")]
#[case::no_macro(&["preprocess", "plain text"], "plain text")]
#[case::quoted_default(&["preprocess", r#"shape=@variant(geometry:shape|"box")"#], r#"shape="box""#)]
#[case::remove_quotes(
	&["preprocess", "--remove-quotes", r#"shape=@variant(geometry:shape|"box")"#],
	"shape=box"
)]
fn expand_without_config(#[case] args: &[&str], #[case] expected: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::varconf_cmd()
		.args(args)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(format!("{expected}\n"));

	Ok(())
}

#[rstest]
#[case::inactive_variant("geometry:has_detector/if_detector|true", "false")]
#[case::negated_variant("!geometry:has_detector/if_detector", "true")]
#[case::negated_default("!geometry:layout/if_advanced|false", "true")]
fn resolve_against_repository(#[case] descriptor: &str, #[case] expected: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("resolve")
		.arg(descriptor)
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(format!("{expected}\n"));

	Ok(())
}

#[test]
fn resolve_unknown_path_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("resolve")
		.arg("geometry:has_detector/if_missing")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2);

	Ok(())
}

#[test]
fn preprocess_reads_active_values() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("preprocess")
		.arg("len=@variant(geometry:has_detector/if_detector/length)")
		.arg("layout=@variant(geometry:layout)")
		.arg("--path")
		.arg(tmp.path())
		.arg("--set")
		.arg("geometry:has_detector=true")
		.assert()
		.success()
		.stdout("len=2.5\nlayout=basic\n");

	Ok(())
}

#[test]
fn preprocess_reports_usage() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_project(tmp.path())?;

	common::varconf_cmd()
		.arg("preprocess")
		.arg("--report")
		.arg("len=@variant(geometry:has_detector/if_detector/length)")
		.arg("--path")
		.arg(tmp.path())
		.arg("--set")
		.arg("geometry:has_detector=true")
		.assert()
		.success()
		.stdout(predicates::str::starts_with("len=2.5\n"))
		.stdout(predicates::str::contains("Usage"))
		.stdout(predicates::str::is_match(
			r"geometry:has_detector/if_detector/length\s+2\.5\s+used \(1\)",
		)?)
		.stdout(predicates::str::is_match(r"geometry:layout\s+.basic.\s+unused \(0\)")?)
		.stderr(predicates::str::contains("variant parameter is set but was never used"));

	Ok(())
}

#[test]
fn preprocess_report_requires_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::varconf_cmd()
		.arg("preprocess")
		.arg("--report")
		.arg("x")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("no config file found"));

	Ok(())
}
