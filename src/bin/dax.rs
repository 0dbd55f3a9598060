use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use dax_manager::app::App;
use dax_manager::config::{ConfigLoader, ConfigOverrides};
use dax_manager::error::DaxError;
use dax_manager::fetch::ChirpGet;
use dax_manager::location::PersistMode;
use dax_manager::manifest::ManifestKind;
use dax_manager::output::{JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "dax")]
#[command(about = "Catalog RUN/CLONE/GEN simulation output as pointer-file trees")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    project: ProjectArgs,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ProjectArgs {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    prefix: Option<String>,

    #[arg(long, global = true)]
    group: Option<String>,

    #[arg(long, global = true)]
    platform: Option<String>,

    #[arg(long, global = true)]
    projid: Option<u32>,

    #[arg(long, global = true)]
    scratch_dir: Option<String>,

    #[arg(long, global = true)]
    fetch_command: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Place the entries of a file list into the project tree")]
    Ingest(IngestArgs),
    #[command(about = "List the trajectories, generations and files of the project")]
    List,
    #[command(about = "Find the file matching a wildcard in every generation")]
    Locate(LocateArgs),
    #[command(about = "Copy a file URL into the scratch cache and print its local path")]
    Fetch(FetchArgs),
}

#[derive(Args)]
struct IngestArgs {
    manifest: Utf8PathBuf,

    #[arg(long)]
    chirp_host: Option<String>,

    #[arg(long, requires = "chirp_host")]
    chirp_port: Option<u16>,

    #[arg(long)]
    force: bool,

    #[arg(long, value_enum)]
    mode: Option<PersistMode>,
}

#[derive(Args)]
struct LocateArgs {
    pattern: String,

    #[arg(long)]
    files: bool,
}

#[derive(Args)]
struct FetchArgs {
    url: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(dax) = report.downcast_ref::<DaxError>() {
            return ExitCode::from(map_exit_code(dax));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DaxError) -> u8 {
    match error {
        DaxError::UnknownCoordinate(_)
        | DaxError::NoMatch { .. }
        | DaxError::MissingSetting(_)
        | DaxError::ConfigRead(_) => 2,
        DaxError::Fetch { .. } | DaxError::FetchSpawn { .. } | DaxError::FetchOutputMissing { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let (force, mode) = match &cli.command {
        Commands::Ingest(args) => (args.force.then_some(true), args.mode),
        _ => (None, None),
    };
    let ProjectArgs {
        config,
        prefix,
        group,
        platform,
        projid,
        scratch_dir,
        fetch_command,
    } = cli.project;
    let overrides = ConfigOverrides {
        prefix,
        group,
        platform,
        projid,
        scratch_dir,
        fetch_command,
        persist_mode: mode,
        force,
    };
    let resolved = ConfigLoader::resolve(config.as_deref(), overrides)?;
    let transport = ChirpGet::with_program(&resolved.fetch_command);
    let app = App::new(resolved, transport);

    match cli.command {
        Commands::Ingest(args) => run_ingest(args, &app, output_mode),
        Commands::List => run_list(&app, output_mode),
        Commands::Locate(args) => run_locate(args, &app, output_mode),
        Commands::Fetch(args) => run_fetch(args, &app, output_mode),
    }
}

fn run_ingest(args: IngestArgs, app: &App<ChirpGet>, output_mode: OutputMode) -> miette::Result<()> {
    let kind = match args.chirp_host {
        Some(host) => ManifestKind::Chirp {
            host,
            port: args.chirp_port,
        },
        None => ManifestKind::Local,
    };
    match output_mode {
        OutputMode::Json => {
            let result = app.ingest(&args.manifest, &kind, &JsonOutput)?;
            JsonOutput::print_ingest(&result).into_diagnostic()
        }
        OutputMode::Text => {
            let result = app.ingest(&args.manifest, &kind, &TextOutput)?;
            TextOutput::print_ingest(&result).into_diagnostic()
        }
    }
}

fn run_list(app: &App<ChirpGet>, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::Json => {
            let result = app.list(&JsonOutput)?;
            JsonOutput::print_list(&result).into_diagnostic()
        }
        OutputMode::Text => {
            let result = app.list(&TextOutput)?;
            TextOutput::print_list(&result).into_diagnostic()
        }
    }
}

fn run_locate(args: LocateArgs, app: &App<ChirpGet>, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::Json => {
            let result = app.locate(&args.pattern, args.files, &JsonOutput)?;
            JsonOutput::print_locate(&result).into_diagnostic()
        }
        OutputMode::Text => {
            let result = app.locate(&args.pattern, args.files, &TextOutput)?;
            TextOutput::print_locate(&result).into_diagnostic()
        }
    }
}

fn run_fetch(args: FetchArgs, app: &App<ChirpGet>, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::Json => {
            let result = app.fetch(&args.url, &JsonOutput)?;
            JsonOutput::print_fetch(&result).into_diagnostic()
        }
        OutputMode::Text => {
            let result = app.fetch(&args.url, &TextOutput)?;
            TextOutput::print_fetch(&result).into_diagnostic()
        }
    }
}
