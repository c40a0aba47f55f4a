use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use varconf_cli::Commands;
use varconf_cli::OutputFormat;
use varconf_cli::VarconfCli;
use varconf_core::AnyEmptyResult;
use varconf_core::AnyResult;
use varconf_core::AsciiIo;
use varconf_core::CONFIG_FILE_CANDIDATES;
use varconf_core::MultiPropertiesReaderOptions;
use varconf_core::MultiPropertiesWriter;
use varconf_core::RepositoryConfig;
use varconf_core::VariantContext;
use varconf_core::VariantRepository;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,dimmed) => {
		if color_enabled() {
			format!("{}", $text.dimmed())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = VarconfCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	init_tracing(args.verbose);

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match &args.command {
		Some(Commands::Show { format }) => run_show(&args, *format),
		Some(Commands::Store { output, no_header }) => run_store(&args, output.as_deref(), *no_header),
		Some(Commands::Get { parameter }) => run_get(&args, parameter),
		Some(Commands::Check) => run_check(&args),
		Some(Commands::Resolve { descriptor }) => run_resolve(&args, descriptor),
		Some(Commands::Preprocess {
			text,
			remove_quotes,
			report,
		}) => run_preprocess(&args, text, *remove_quotes, *report),
		Some(Commands::Sections {
			file,
			format,
			forbid_variants,
			skip_private,
		}) => run_sections(&args, file, *format, *forbid_variants, *skip_private),
		None => {
			eprintln!("No subcommand specified. Run `varconf --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<varconf_core::VarconfError>() {
			Ok(varconf_err) => {
				let report: miette::Report = (*varconf_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: bool) {
	let fallback = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.without_time()
		.init();
}

fn resolve_root(args: &VarconfCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn print_section(title: &str) {
	println!();
	println!("{}", colored!(title, bold));
}

fn print_field(label: &str, value: impl std::fmt::Display) {
	println!("{label:<16} {value}");
}

/// The loaded context and the config it came from, with the directory
/// relative paths resolve against.
struct Session {
	context: VariantContext,
	config: Option<(RepositoryConfig, PathBuf)>,
}

impl Session {
	fn repository(&self) -> AnyResult<&VariantRepository> {
		self.context
			.repository()
			.ok_or_else(|| "no repository is loaded".into())
	}
}

fn find_config(args: &VarconfCli) -> AnyResult<Option<(RepositoryConfig, PathBuf)>> {
	if let Some(path) = &args.config {
		let config = RepositoryConfig::load_file(path)?;
		let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
		return Ok(Some((config, base_dir)));
	}

	let root = resolve_root(args);
	Ok(RepositoryConfig::load(&root)?.map(|config| (config, root)))
}

/// Build the repository, then apply `--load` and `--set` in that order.
fn open_session(args: &VarconfCli, require_repository: bool) -> AnyResult<Session> {
	let config = find_config(args)?;
	let mut context = VariantContext::new();

	if config.is_none() {
		if require_repository || args.load.is_some() || !args.settings.is_empty() {
			return Err(format!(
				"no config file found in {} (looked for {})",
				resolve_root(args).display(),
				CONFIG_FILE_CANDIDATES.join(", ")
			)
			.into());
		}

		return Ok(Session {
			context,
			config: None,
		});
	}

	if let Some((repository_config, base_dir)) = &config {
		context.load_config(repository_config, base_dir)?;
	}

	if let Some(path) = &args.load {
		let text = std::fs::read_to_string(path)?;
		let io = AsciiIo::new().with_strict(args.strict);

		if !context.load_values(&io, &text)?.is_ok() {
			tracing::warn!(path = %path.display(), "values file was only partially loaded");
		}
	}

	if let Some(repository) = context.repository_mut() {
		for setting in &args.settings {
			repository.apply_setting(setting)?;
		}
	}

	Ok(Session { context, config })
}

#[derive(Serialize)]
struct RepositorySummary<'a> {
	name: &'a str,
	organization: Option<&'a str>,
	application: Option<&'a str>,
	accomplished: bool,
	registries: Vec<RegistrySummary<'a>>,
}

#[derive(Serialize)]
struct RegistrySummary<'a> {
	name: String,
	description: Option<&'a str>,
	rank: Option<i64>,
	active: bool,
	/// Active variable parameters by path. Unset ones are `null`.
	values: serde_json::Map<String, serde_json::Value>,
}

fn summarize(repository: &VariantRepository) -> AnyResult<RepositorySummary<'_>> {
	let mut registries = vec![];

	for name in repository.ordered_registry_names() {
		let registry = repository.registry(&name)?;
		let active = repository.is_active_registry(&name)?;
		let mut values = serde_json::Map::new();

		if active {
			for (id, record) in registry.records() {
				if !record.is_variable_parameter() || !registry.is_active(id) {
					continue;
				}

				let value = match record.value() {
					Some(value) => serde_json::to_value(value)?,
					None => serde_json::Value::Null,
				};
				values.insert(record.path().to_string(), value);
			}
		}

		registries.push(RegistrySummary {
			rank: repository.registry_rank(&name)?,
			description: registry.description(),
			name,
			active,
			values,
		});
	}

	Ok(RepositorySummary {
		name: repository.name(),
		organization: repository.organization(),
		application: repository.application(),
		accomplished: repository.is_accomplished()?,
		registries,
	})
}

fn run_show(args: &VarconfCli, format: OutputFormat) -> AnyEmptyResult {
	let session = open_session(args, true)?;
	let repository = session.repository()?;

	if matches!(format, OutputFormat::Json) {
		println!("{}", serde_json::to_string_pretty(&summarize(repository)?)?);
		return Ok(());
	}

	print_field("Repository", repository.name());
	if let Some(organization) = repository.organization() {
		print_field("Organization", organization);
	}
	if let Some(application) = repository.application() {
		print_field("Application", application);
	}

	let io = AsciiIo::new();

	for name in repository.ordered_registry_names() {
		let registry = repository.registry(&name)?;
		let state = if repository.is_active_registry(&name)? {
			colored!("active", green)
		} else {
			colored!("inactive", dimmed)
		};

		print_section(&format!("[{name}]"));
		print_field("State", state);
		if let Some(description) = registry.description() {
			print_field("Description", description);
		}

		if !repository.is_active_registry(&name)? {
			continue;
		}

		let mut buffer = Vec::new();
		io.store_registry(&mut buffer, registry)?;
		for line in String::from_utf8(buffer)?.lines() {
			println!("  {line}");
		}
	}

	Ok(())
}

fn run_store(args: &VarconfCli, output: Option<&Path>, no_header: bool) -> AnyEmptyResult {
	let session = open_session(args, true)?;
	let stored = AsciiIo::new()
		.with_no_header(no_header)
		.store_repository_to_string(session.repository()?)?;

	match output {
		Some(path) => {
			std::fs::write(path, stored)?;
			println!("Wrote values to {}", path.display());
		}
		None => print!("{stored}"),
	}

	Ok(())
}

fn run_get(args: &VarconfCli, parameter: &str) -> AnyEmptyResult {
	let session = open_session(args, true)?;
	println!("{}", session.repository()?.get_parameter_value(parameter)?);

	Ok(())
}

fn run_check(args: &VarconfCli) -> AnyEmptyResult {
	let session = open_session(args, true)?;
	let unset = session.repository()?.unset_parameters()?;

	if unset.is_empty() {
		println!("Check passed: every active parameter has a value.");
		return Ok(());
	}

	println!(
		"{} {} active parameter(s) without a value:",
		colored!("Check failed:", red),
		unset.len()
	);
	for path in &unset {
		println!("  {path}");
	}

	process::exit(1);
}

fn run_resolve(args: &VarconfCli, descriptor: &str) -> AnyEmptyResult {
	let session = open_session(args, false)?;
	let resolution = session.context.preprocessor().resolve_variant(descriptor)?;

	tracing::debug!(
		descriptor,
		active = resolution.active,
		reverse = resolution.reverse,
		"resolved descriptor"
	);
	println!("{}", resolution.effective());

	Ok(())
}

fn run_preprocess(
	args: &VarconfCli,
	texts: &[String],
	remove_quotes: bool,
	report: bool,
) -> AnyEmptyResult {
	let mut session = open_session(args, report)?;

	if report {
		if let Some(repository) = session.context.repository_mut() {
			repository.attach_reporting()?;
		}
	}

	let preprocessor = session
		.context
		.preprocessor()
		.with_remove_quotes(remove_quotes)
		.with_trace(args.verbose);
	for text in texts {
		println!("{}", preprocessor.preprocess(text)?);
	}

	if !report {
		return Ok(());
	}

	let repository = session.repository()?;
	if let Some(reporting) = repository.reporting() {
		print_section("Usage");
		let mut stdout = std::io::stdout().lock();
		reporting.print_report(&mut stdout, repository)?;
		stdout.flush()?;
		reporting.warn_unused(repository);
	}

	Ok(())
}

fn run_sections(
	args: &VarconfCli,
	file: &Path,
	format: OutputFormat,
	forbid_variants: bool,
	skip_private: bool,
) -> AnyEmptyResult {
	let session = open_session(args, false)?;
	let mut reader = session
		.context
		.multi_properties_reader()
		.with_options(MultiPropertiesReaderOptions {
			forbid_variants,
			skip_private_sections: skip_private,
			skip_private_properties: skip_private,
			resolve_path: true,
			..MultiPropertiesReaderOptions::default()
		});

	if let Some((config, base_dir)) = &session.config {
		if let Some(include) = config.file_include(base_dir)? {
			reader = reader.with_include(include);
		}
	}

	let sections = reader.read_file(file)?;

	match format {
		OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sections)?),
		OutputFormat::Text => {
			let writer = MultiPropertiesWriter {
				without_decoration: true,
				..MultiPropertiesWriter::default()
			};
			print!("{}", writer.write(&sections));
		}
	}

	Ok(())
}
