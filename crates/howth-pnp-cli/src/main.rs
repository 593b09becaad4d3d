#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use howth_pnp::ImportKind;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "howth-pnp")]
#[command(author, version, about = "Resolve imports through Yarn Plug'n'Play", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve a specifier the way the bundler plugin would
    Resolve {
        /// The import specifier
        specifier: String,

        /// File containing the import
        #[arg(long, value_name = "PATH")]
        importer: Option<PathBuf>,

        /// Directory the import is resolved from (wins over --importer)
        #[arg(long, value_name = "PATH")]
        resolve_dir: Option<PathBuf>,

        /// Import kind (import-statement, require-call, dynamic-import, ...)
        #[arg(long, default_value = "import-statement")]
        kind: ImportKind,

        /// Path to .pnp.data.json (discovered from the working directory if omitted)
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,

        /// Leave matching specifiers external (repeatable, one `*` allowed)
        #[arg(long, value_name = "SPECIFIER")]
        external: Vec<String>,

        /// Target platform (browser, node, neutral)
        #[arg(long)]
        platform: Option<String>,

        /// Extra export condition (repeatable)
        #[arg(long = "condition", value_name = "NAME")]
        conditions: Vec<String>,

        /// JSON file with build options ({"external", "platform", "conditions"})
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Print the contents of a path through the PnP loader
    Load {
        /// Path to load (may point inside a zip archive)
        path: PathBuf,

        /// Path to .pnp.data.json (discovered from the working directory if omitted)
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

    logging::init(cli.verbose, cli.json);

    match cli.command {
        None | Some(Commands::Version) => commands::version::run(cli.json),
        Some(Commands::Resolve {
            specifier,
            importer,
            resolve_dir,
            kind,
            manifest,
            external,
            platform,
            conditions,
            config,
        }) => {
            let span = tracing::info_span!("resolve", cmd = "resolve", cwd = %cwd.display());
            let _guard = span.enter();
            let action = commands::resolve::ResolveAction {
                specifier,
                importer,
                resolve_dir,
                kind,
                manifest,
                external,
                platform,
                conditions,
                config,
            };
            commands::resolve::run(&cwd, &action, cli.json)
        }
        Some(Commands::Load { path, manifest }) => {
            commands::load::run(&cwd, &path, manifest.as_deref(), cli.json)
        }
    }
}
