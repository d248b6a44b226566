use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use dmrr_prep::app::{App, PrepareOptions};
use dmrr_prep::config::ConfigLoader;
use dmrr_prep::error::PrepError;
use dmrr_prep::output::{
    ConsoleProgress, JsonOutput, OutputMode, render_checklist, render_summary,
};

#[derive(Parser)]
#[command(name = "dmrr-prep")]
#[command(about = "Prepare donor/biosample metadata and a manifest for DMRR bulk submission")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build and write metadata tables and the manifest")]
    Prepare(PrepareArgs),
    #[command(about = "List the metadata files that must be written by hand")]
    Checklist(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, help = "YAML configuration (default: ./dmrr-prep.yaml)")]
    config: Option<String>,
}

#[derive(Args)]
struct PrepareArgs {
    #[command(flatten)]
    config: ConfigArgs,

    #[arg(long, help = "Build everything but write nothing")]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PrepError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PrepError) -> u8 {
    match error {
        PrepError::MissingOutput(_) => 4,
        error if error.is_lookup() => 3,
        PrepError::MissingConfig
        | PrepError::ConfigRead(_)
        | PrepError::ConfigParse(_)
        | PrepError::InvalidConfig(_)
        | PrepError::MissingColumn { .. }
        | PrepError::UnknownProperty { .. }
        | PrepError::InvalidDataFileName(_)
        | PrepError::InvalidSpecimenId(_)
        | PrepError::InvalidSource { .. } => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Prepare(args) => run_prepare(args, output_mode),
        Commands::Checklist(args) => run_checklist(args, output_mode),
    }
}

fn run_prepare(args: PrepareArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.config.config.as_deref())?;
    let app = App::new(config);
    let options = PrepareOptions {
        dry_run: args.dry_run,
    };

    match output_mode {
        OutputMode::Json => {
            let result = app.prepare(options, &JsonOutput)?;
            JsonOutput::print_prepare(&result).into_diagnostic()?;
        }
        OutputMode::Human => {
            println!("Resolved configuration:");
            print!("{}", app.config().to_yaml()?);
            let result = app.prepare(options, &ConsoleProgress)?;
            print!("{}", render_summary(&result));
        }
    }
    Ok(())
}

fn run_checklist(args: ConfigArgs, output_mode: OutputMode) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let app = App::new(config);
    let result = app.prepare(PrepareOptions { dry_run: true }, &JsonOutput)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_checklist(&result.manual_checklist).into_diagnostic()?,
        OutputMode::Human => print!("{}", render_checklist(&result.manual_checklist)),
    }
    Ok(())
}
