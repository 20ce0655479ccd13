//! eclio - inspect Fortran-framed simulator restart, init and grid files

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use eclio_engine::Endian;

mod commands;
mod config;

use commands::{OpenOptions, ShowArgs};
use config::Config;

/// eclio - keyword file inspector
#[derive(Parser, Debug)]
#[command(name = "eclio")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Byte order of the file (detected when omitted)
    #[arg(long, value_enum)]
    endian: Option<ByteOrder>,

    /// Load keyword data only when it is accessed
    #[arg(long)]
    lazy: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List name, count and type of every keyword
    List {
        file: PathBuf,
        /// Restrict the listing to one report step
        #[arg(short, long)]
        report_step: Option<i32>,
    },
    /// Show the restart sections with their dates
    Steps { file: PathBuf },
    /// Print the values of one keyword
    Show {
        file: PathBuf,
        name: String,
        #[arg(short, long, default_value_t = 0)]
        occurrence: usize,
        #[arg(short, long)]
        report_step: Option<i32>,
        /// Maximum number of values printed
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Write a sidecar index for faster opens
    Index {
        file: PathBuf,
        /// Index path (defaults to FILE.index)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check record framing and keyword structure
    Verify { file: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ByteOrder {
    Big,
    Little,
}

impl From<ByteOrder> for Endian {
    fn from(order: ByteOrder) -> Self {
        match order {
            ByteOrder::Big => Endian::Big,
            ByteOrder::Little => Endian::Little,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Set up logging
    let level_name = args
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "warn".to_string());
    let log_level = match level_name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut mode = config.open_mode();
    if let Some(order) = args.endian {
        mode.endian = Some(order.into());
    }
    mode.lazy |= args.lazy;
    let opts = OpenOptions {
        mode,
        filter: config.name_filter()?,
    };
    debug!("Open options: {:?}", opts);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let ok = match &args.command {
        Command::List { file, report_step } => {
            commands::list(&mut out, file, &opts, *report_step)?;
            true
        }
        Command::Steps { file } => {
            commands::steps(&mut out, file, &opts)?;
            true
        }
        Command::Show {
            file,
            name,
            occurrence,
            report_step,
            limit,
        } => {
            let show = ShowArgs {
                name,
                occurrence: *occurrence,
                report_step: *report_step,
                limit: *limit,
            };
            commands::show(&mut out, file, &opts, &show)?;
            true
        }
        Command::Index { file, output } => {
            commands::index(&mut out, file, &opts, output.as_deref())?;
            true
        }
        Command::Verify { file } => commands::verify(&mut out, file, &opts)?,
    };

    out.flush()?;
    Ok(ok)
}
