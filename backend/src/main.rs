//! jsonflat CLI - Flatten nested JSON documents into CSV tables
//!
//! # One-shot
//!
//! ```bash
//! jsonflat flatten orders.json -o orders.csv   # Flatten a file to CSV
//! jsonflat schema orders.json                  # Show inferred column kinds
//! ```
//!
//! # Jobs
//!
//! ```bash
//! jsonflat submit orders.json                  # Stage a document, open a job
//! jsonflat run 1700000000000-orders            # Run a submitted job
//! jsonflat status [job-id]                     # Show one job or list all
//! ```

use clap::{Parser, Subcommand};
use jsonflat::config::parse_delimiter;
use jsonflat::logs::{log_info, log_success};
use jsonflat::{
    describe, document_to_records, flatten_document, init_logging, parse_document, submit,
    write_csv, CsvOptions, Dataset, FlattenOptions, Flattener, FsDocumentSource, JobConfig,
    JobRunner, StatusRegistry,
};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jsonflat")]
#[command(about = "Flatten nested JSON documents into CSV tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten a JSON file and write CSV
    Flatten {
        /// Input JSON file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Nested columns per pass (0 = all)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Pass limit
        #[arg(long)]
        max_passes: Option<usize>,

        /// Treat this column's objects as maps (repeatable)
        #[arg(long = "map-column")]
        map_columns: Vec<String>,

        /// CSV delimiter
        #[arg(short, long)]
        delimiter: Option<String>,
    },

    /// Print the inferred column kinds of a JSON file
    Schema {
        /// Input JSON file
        input: PathBuf,

        /// Treat this column's objects as maps (repeatable)
        #[arg(long = "map-column")]
        map_columns: Vec<String>,
    },

    /// Stage a JSON file as a new job
    Submit {
        /// Input JSON file
        input: PathBuf,

        /// File name recorded on the job (default: input file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Run a submitted job
    Run {
        /// Job ID
        job_id: String,

        /// Logical output location (default: the job's own)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show job status
    Status {
        /// Job ID (default: list all jobs)
        job_id: Option<String>,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = start(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn start(cli: Cli) -> CliResult {
    let config = JobConfig::from_env()?;
    init_logging(&config.log_level, config.log_format)?;
    dispatch(cli.command, config)
}

fn dispatch(command: Commands, config: JobConfig) -> CliResult {
    match command {
        Commands::Flatten {
            input,
            output,
            batch_size,
            max_passes,
            map_columns,
            delimiter,
        } => {
            let mut options = config.flatten_options();
            if let Some(n) = batch_size {
                options = options.with_batch_size(n);
            }
            if let Some(n) = max_passes {
                options = options.with_max_passes(n);
            }
            if !map_columns.is_empty() {
                options = options.with_map_columns(map_columns);
            }
            let delimiter = match delimiter {
                Some(d) => parse_delimiter("--delimiter", &d)?,
                None => config.delimiter,
            };
            cmd_flatten(&input, output.as_deref(), options, delimiter)
        }

        Commands::Schema { input, map_columns } => {
            let mut options = config.flatten_options();
            if !map_columns.is_empty() {
                options = options.with_map_columns(map_columns);
            }
            cmd_schema(&input, &options)
        }

        Commands::Submit { input, name } => cmd_submit(&input, name, &config),

        Commands::Run { job_id, output } => cmd_run(&job_id, output, &config),

        Commands::Status { job_id } => cmd_status(job_id.as_deref(), &config),
    }
}

fn read_document(input: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    log_info(format!("Reading {}", input.display()));
    let bytes = fs::read(input)?;
    Ok(parse_document(&bytes)?)
}

fn cmd_flatten(
    input: &Path,
    output: Option<&Path>,
    options: FlattenOptions,
    delimiter: u8,
) -> CliResult {
    let document = read_document(input)?;
    let flattener = Flattener::new(options);
    let table = flatten_document(document, &flattener)?;

    let csv_options = CsvOptions { delimiter };
    match output {
        Some(path) => {
            write_csv(&table, BufWriter::new(File::create(path)?), &csv_options)?;
            log_success(format!(
                "{} rows × {} columns written to {}",
                table.row_count(),
                table.column_count(),
                path.display()
            ));
        }
        None => write_csv(&table, io::stdout().lock(), &csv_options)?,
    }
    Ok(())
}

fn cmd_schema(input: &Path, options: &FlattenOptions) -> CliResult {
    let document = read_document(input)?;
    let dataset = Dataset::from_records(document_to_records(document)?, &options.hints())?;
    println!("{}", serde_json::to_string_pretty(&describe(&dataset))?);
    Ok(())
}

fn cmd_submit(input: &Path, name: Option<String>, config: &JobConfig) -> CliResult {
    let file_name = name.unwrap_or_else(|| {
        input
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document.json")
            .to_string()
    });
    let bytes = fs::read(input)?;

    let source = FsDocumentSource::new(config.inbox_dir());
    let mut registry = StatusRegistry::with_dir(config.jobs_dir())?;
    let record = submit(&source, &mut registry, &file_name, &bytes)?;

    println!("{}", record.file_id);
    Ok(())
}

fn cmd_run(job_id: &str, output: Option<String>, config: &JobConfig) -> CliResult {
    let mut runner = JobRunner::from_config(config)?;
    let location = match output {
        Some(location) => location,
        None => runner
            .status()
            .get(job_id)
            .map(|record| record.output_location.clone())
            .unwrap_or_else(|| format!("{job_id}.csv")),
    };

    let summary = runner.run(job_id, &location)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_status(job_id: Option<&str>, config: &JobConfig) -> CliResult {
    let registry = StatusRegistry::with_dir(config.jobs_dir())?;

    match job_id {
        Some(id) => {
            let record = registry
                .get(id)
                .ok_or_else(|| format!("Job not found: {}", id))?;
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        None => {
            let records = registry.list();
            if records.is_empty() {
                log_info("No jobs recorded yet.");
                return Ok(());
            }
            for record in records {
                println!(
                    "{}  {:<11}  {}",
                    record.file_id,
                    record.status.to_string(),
                    record.file_name
                );
            }
        }
    }
    Ok(())
}
