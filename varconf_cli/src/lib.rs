use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Inspect and edit variant configuration repositories.",
	long_about = "varconf loads a repository of variant registries described by `varconf.toml`, \
	              applies values files and `registry:path=value` settings, and expands \
	              `@variant(...)` macros against the result.\n\nQuick start:\n  varconf show        \
	              Print the active values of every registry\n  varconf store       Write a \
	              values file\n  varconf check       Verify every active parameter has a \
	              value\n  varconf sections    Read a multi-section configuration file"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct VarconfCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Explicit config file. Relative model paths resolve against its
	/// directory.
	#[arg(long, short, global = true)]
	pub config: Option<PathBuf>,

	/// Values file applied to the repository before the command runs.
	#[arg(long, short, global = true)]
	pub load: Option<PathBuf>,

	/// `registry:path=value` setting applied after the values file. May be
	/// repeated.
	#[arg(long = "set", short = 's', global = true, value_name = "SETTING")]
	pub settings: Vec<String>,

	/// Fail on values of registries the repository does not know.
	#[arg(long, global = true, default_value_t = false)]
	pub strict: bool,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Print the repository metadata and the active values of each registry.
	///
	/// Inactive registries are listed without values. Use `--format json`
	/// for programmatic consumption.
	Show {
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Write the active values in the values file format.
	///
	/// Only parameters on currently selected branches are written, in ranked
	/// order, so the output can be loaded back with `--load`.
	Store {
		/// Write to this file instead of stdout.
		#[arg(long, short)]
		output: Option<PathBuf>,

		/// Leave out the `#@format` header lines.
		#[arg(long, default_value_t = false)]
		no_header: bool,
	},
	/// Print the value of one parameter, written `registry:path`.
	Get {
		/// The parameter, for example `geometry:layout`.
		parameter: String,
	},
	/// Check that every active parameter has a value.
	///
	/// Exits with a non-zero status code and lists the parameters that are
	/// still unset otherwise.
	Check,
	/// Resolve a variant descriptor such as `!geometry:layout/if_basic|false`
	/// and print whether it holds.
	Resolve {
		descriptor: String,
	},
	/// Expand the `@variant(registry:path|default)` macros of each argument.
	Preprocess {
		/// Text to expand. Each argument is printed on its own line.
		#[arg(required = true)]
		text: Vec<String>,

		/// Strip the quotes around string values substituted by macros.
		#[arg(long, default_value_t = false)]
		remove_quotes: bool,

		/// Print how often each parameter was read, and warn about
		/// parameters that were set but never read.
		#[arg(long, default_value_t = false)]
		report: bool,
	},
	/// Read a multi-section configuration file against the repository.
	///
	/// Sections gated by `#@variant_section_only` are dropped when their
	/// variant is inactive. Works without a config file, in which case
	/// descriptors fall back to their defaults.
	Sections {
		/// The file to read.
		file: PathBuf,

		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Reject variant directives and macros.
		#[arg(long, default_value_t = false)]
		forbid_variants: bool,

		/// Drop sections and properties whose name starts with `__`.
		#[arg(long, default_value_t = false)]
		skip_private: bool,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
