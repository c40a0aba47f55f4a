use clap::Parser;
use varconf_cli::Commands;
use varconf_cli::OutputFormat;
use varconf_cli::VarconfCli;

#[test]
fn parse_repeated_settings() {
	let cli = VarconfCli::try_parse_from([
		"varconf",
		"--set",
		"geometry:layout=advanced",
		"-s",
		"geometry:has_detector=true",
		"get",
		"geometry:layout",
	])
	.unwrap_or_else(|e| panic!("parse: {e}"));

	similar_asserts::assert_eq!(
		cli.settings,
		vec!["geometry:layout=advanced", "geometry:has_detector=true"]
	);
	assert!(matches!(cli.command, Some(Commands::Get { ref parameter }) if parameter == "geometry:layout"));
}

#[test]
fn global_flags_follow_subcommand() {
	let cli = VarconfCli::try_parse_from(["varconf", "show", "--format", "json", "--strict", "-v"])
		.unwrap_or_else(|e| panic!("parse: {e}"));

	assert!(cli.strict);
	assert!(cli.verbose);
	assert!(matches!(
		cli.command,
		Some(Commands::Show {
			format: OutputFormat::Json
		})
	));
}

#[test]
fn preprocess_requires_text() {
	assert!(VarconfCli::try_parse_from(["varconf", "preprocess"]).is_err());
}
