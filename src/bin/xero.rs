use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use xero_explorer::app::App;
use xero_explorer::config::{ConfigLoader, ResolvedConfig};
use xero_explorer::deletion::DeleteOptions;
use xero_explorer::domain::{DegFilter, SearchMethod, SpeciesFilter};
use xero_explorer::error::XeroError;
use xero_explorer::export::{self, CSV_PREFIX, FASTA_PREFIX};
use xero_explorer::output::{HumanOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "xero")]
#[command(about = "Search, inspect and curate the Xerophyta gene database")]
#[command(version, author)]
struct Cli {
    /// Path to a xero-explorer.json config file.
    #[arg(long, global = true)]
    config: Option<String>,

    /// SQLite database file, overriding the config.
    #[arg(long, global = true)]
    database: Option<Utf8PathBuf>,

    /// Print JSON instead of a human summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create the database and its tables")]
    Init,
    #[command(about = "List species")]
    Species,
    #[command(about = "List experiments recorded for a species")]
    Experiments(ExperimentsArgs),
    #[command(about = "Register an experiment for a species")]
    AddExperiment(AddExperimentArgs),
    #[command(about = "Search genes and optionally export CSV / FASTA")]
    Search(SearchArgs),
    #[command(about = "Expression values of searched genes in one experiment")]
    Expression(ExpressionArgs),
    #[command(about = "Browse the gene regulatory network")]
    Grn(GrnArgs),
    #[command(about = "Delete genes and all dependent records")]
    Delete(DeleteArgs),
    #[command(about = "Load tabular results")]
    Import(ImportArgs),
}

#[derive(Args)]
struct ExperimentsArgs {
    #[arg(long)]
    species: Option<String>,
}

#[derive(Args)]
struct AddExperimentArgs {
    name: String,

    #[arg(long)]
    species: Option<String>,

    #[arg(long)]
    description: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    #[arg(long, value_enum, default_value_t = SearchMethod::GeneId)]
    method: SearchMethod,

    #[arg(long)]
    species: Option<String>,

    /// Comma- or newline-separated search terms.
    #[arg(long)]
    input: String,

    /// Write the result table here; a directory gets a timestamped file name.
    #[arg(long)]
    csv: Option<Utf8PathBuf>,

    /// Write coding sequences here; a directory gets a timestamped file name.
    #[arg(long)]
    fasta: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct ExpressionArgs {
    #[arg(long)]
    experiment: String,

    #[arg(long, value_enum, default_value_t = DegFilter::ShowAll)]
    filter: DegFilter,

    #[arg(long, value_enum, default_value_t = SearchMethod::GeneId)]
    method: SearchMethod,

    #[arg(long)]
    species: Option<String>,

    #[arg(long)]
    input: String,
}

#[derive(Args)]
struct GrnArgs {
    /// Only edges where this gene is regulator or target.
    #[arg(long)]
    gene: Option<String>,

    #[arg(long, default_value_t = 100)]
    limit: usize,
}

#[derive(Args)]
struct DeleteArgs {
    #[arg(required = true)]
    genes: Vec<String>,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    cleanup_orphans: bool,
}

#[derive(Args)]
struct ImportArgs {
    #[command(subcommand)]
    command: ImportCommand,
}

#[derive(Subcommand)]
enum ImportCommand {
    #[command(about = "Regulatory interactions (GRN CSV)")]
    Grn {
        file: Utf8PathBuf,
        #[arg(long)]
        species: Option<String>,
    },
    #[command(about = "Differential expression results for an experiment")]
    Deg {
        file: Utf8PathBuf,
        #[arg(long)]
        experiment: String,
    },
    #[command(about = "Tidy expression table for an experiment")]
    Expression {
        file: Utf8PathBuf,
        #[arg(long)]
        experiment: String,
    },
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<XeroError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &XeroError) -> u8 {
    match error {
        XeroError::SpeciesNotFound(_)
        | XeroError::ExperimentNotFound(_)
        | XeroError::GeneNotFound(_)
        | XeroError::ConfigRead(_) => 2,
        XeroError::Database(_) => 3,
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

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let app = match cli.database {
        Some(path) => App::new(path).with_commit_batch_size(config.commit_batch_size),
        None => App::from_config(&config),
    };

    match cli.command {
        Commands::Init => {
            let result = app.init()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_init(&result).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_init(&result),
            }
            Ok(())
        }
        Commands::Species => {
            let species = app.species()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_species(&species).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_species(&species),
            }
            Ok(())
        }
        Commands::Experiments(args) => {
            let species = require_species(args.species, &config)?;
            let experiments = app.experiments(&species)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_experiments(&experiments).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_experiments(&experiments),
            }
            Ok(())
        }
        Commands::AddExperiment(args) => {
            let species = require_species(args.species, &config)?;
            let experiment =
                app.add_experiment(&args.name, &species, args.description.as_deref())?;
            match output_mode {
                OutputMode::Json => {
                    JsonOutput::print_experiments(std::slice::from_ref(&experiment))
                        .into_diagnostic()?
                }
                OutputMode::Human => {
                    HumanOutput::print_experiments(std::slice::from_ref(&experiment))
                }
            }
            Ok(())
        }
        Commands::Search(args) => run_search(args, &app, &config, output_mode),
        Commands::Expression(args) => {
            let species = species_filter(args.species, &config);
            let result = app.expression_for_search(
                args.method,
                &args.input,
                species,
                &args.experiment,
                args.filter,
            )?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_expression_search(&result).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_expression_search(&result),
            }
            Ok(())
        }
        Commands::Grn(args) => {
            let interactions = app.regulatory_interactions(args.gene.as_deref(), args.limit)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_interactions(&interactions).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_interactions(&interactions),
            }
            Ok(())
        }
        Commands::Delete(args) => {
            let options = DeleteOptions {
                dry_run: args.dry_run,
                cleanup_orphans: args.cleanup_orphans,
            };
            let report = app.delete_genes(&args.genes, options)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_deletion(&report).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_deletion(&report),
            }
            if report.success {
                Ok(())
            } else {
                Err(miette::Report::msg("gene deletion was rolled back"))
            }
        }
        Commands::Import(args) => run_import(args.command, &app, &config, output_mode),
    }
}

fn run_search(
    args: SearchArgs,
    app: &App,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let species = species_filter(args.species, config);
    let result = app.search(args.method, &args.input, species)?;

    let export = if args.csv.is_some() || args.fasta.is_some() {
        let now = chrono::Local::now();
        let csv_path = args
            .csv
            .map(|path| resolve_export_path(path, &export::export_file_name(CSV_PREFIX, "csv", now)));
        let fasta_path = args.fasta.map(|path| {
            resolve_export_path(path, &export::export_file_name(FASTA_PREFIX, "fasta", now))
        });
        Some(app.export_search(&result, csv_path.as_deref(), fasta_path.as_deref())?)
    } else {
        None
    };

    match output_mode {
        OutputMode::Json => JsonOutput::print_search(&result, export.as_ref()).into_diagnostic()?,
        OutputMode::Human => HumanOutput::print_search(&result, export.as_ref()),
    }
    Ok(())
}

fn run_import(
    command: ImportCommand,
    app: &App,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        ImportCommand::Grn { file, species } => {
            let species = species.or_else(|| config.default_species.clone());
            let summary = app.import_grn(&file, species.as_deref())?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_grn_import(&summary).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_grn_import(&summary),
            }
        }
        ImportCommand::Deg { file, experiment } => {
            let summary = app.import_deg(&file, &experiment)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_deg_import(&summary).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_deg_import(&summary),
            }
        }
        ImportCommand::Expression { file, experiment } => {
            let result = app.import_expression(&file, &experiment)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_expression_import(&result).into_diagnostic()?,
                OutputMode::Human => HumanOutput::print_expression_import(&result),
            }
        }
    }
    Ok(())
}

fn species_filter(species: Option<String>, config: &ResolvedConfig) -> SpeciesFilter {
    SpeciesFilter::parse(species.or_else(|| config.default_species.clone()).as_deref())
}

fn require_species(species: Option<String>, config: &ResolvedConfig) -> miette::Result<String> {
    species
        .or_else(|| config.default_species.clone())
        .ok_or_else(|| miette::Report::msg("--species is required (or set default_species)"))
}

fn resolve_export_path(path: Utf8PathBuf, file_name: &str) -> Utf8PathBuf {
    if path.is_dir() {
        path.join(file_name)
    } else {
        path
    }
}
