//! iplist: IPv4 list normalizer
//!
//! Usage: iplist <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use iplist_normalize::commands::{
    decode_records, NormalizeCommand, SerializeCommand, StripCommand, ValidateCommand,
};
use iplist_normalize::error::IpListError;
use iplist_normalize::streaming::BlockWriter;

/// Exit status when `validate` finds malformed lines.
const EXIT_INVALID_LINES: i32 = 2;

#[derive(Parser)]
#[command(name = "iplist")]
#[command(version)]
#[command(about = "Normalize, serialize, validate and filter IPv4 address lists", long_about = None)]
struct Cli {
    /// Log progress details to stderr
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Reject prefix lengths below /8, as older list loaders do
    #[arg(long, global = true)]
    legacy_masks: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Coalesce entries into a minimal sorted list of CIDR blocks
    Normalize {
        /// Input list (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write 5-byte binary records instead of text
        #[arg(long)]
        binary: bool,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Encode entries as 5-byte binary records, exploding ranges
    Serialize {
        /// Input list (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Print binary records as text, one block per line
    Decode {
        /// Serialized input (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Report line numbers of malformed entries
    Validate {
        /// Input list (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Stop after this many malformed lines
        #[arg(short = 'n', long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
        limit: u64,
    },

    /// Copy the input, dropping malformed lines
    Strip {
        /// Input list (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use small I/O buffers
        #[arg(long)]
        low_memory: bool,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    // Must be set before any parsing occurs
    if cli.legacy_masks {
        iplist_normalize::config::set_legacy_mask_bounds(true);
    }

    let result = match cli.command {
        Commands::Normalize {
            input,
            binary,
            stats,
        } => run_normalize(input, binary, stats),

        Commands::Serialize {
            input,
            output,
            stats,
        } => run_serialize(input, output, stats),

        Commands::Decode { input } => run_decode(input),

        Commands::Validate { input, limit } => match run_validate(input, limit) {
            Ok(false) => process::exit(EXIT_INVALID_LINES),
            other => other.map(|_| ()),
        },

        Commands::Strip {
            input,
            output,
            low_memory,
            stats,
        } => run_strip(input, output, low_memory, stats),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// `None` and `-` both mean stdin.
fn stdin_requested(input: &Option<PathBuf>) -> bool {
    match input {
        Some(path) => path.to_string_lossy() == "-",
        None => true,
    }
}

fn open_output(output: Option<PathBuf>) -> Result<Box<dyn Write>, IpListError> {
    Ok(match output {
        Some(path) => Box::new(File::create(&path)?),
        None => Box::new(io::stdout().lock()),
    })
}

fn run_normalize(input: Option<PathBuf>, binary: bool, stats: bool) -> Result<(), IpListError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    let cmd = NormalizeCommand::new().with_binary(binary);
    let result = if stdin_requested(&input) {
        cmd.run_stdin(&mut handle)?
    } else {
        let path = input.unwrap_or_default();
        cmd.run(&path, &mut handle)?
    };

    if stats {
        eprintln!("Normalize stats: {}", result);
    }

    Ok(())
}

fn run_serialize(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    stats: bool,
) -> Result<(), IpListError> {
    let cmd = SerializeCommand::new();

    // Parse everything before touching the output file
    let mut encoded = Vec::new();
    let result = if stdin_requested(&input) {
        cmd.run_stdin(&mut encoded)?
    } else {
        let path = input.unwrap_or_default();
        cmd.run(&path, &mut encoded)?
    };

    let mut sink = open_output(output)?;
    sink.write_all(&encoded)?;
    sink.flush()?;

    if stats {
        eprintln!("Serialize stats: {}", result);
    }

    Ok(())
}

fn run_decode(input: Option<PathBuf>) -> Result<(), IpListError> {
    let mut bytes = Vec::new();
    if stdin_requested(&input) {
        io::stdin().lock().read_to_end(&mut bytes)?;
    } else {
        let path = input.unwrap_or_default();
        File::open(&path)?.read_to_end(&mut bytes)?;
    }

    let blocks = decode_records(&bytes)?;

    let stdout = io::stdout();
    let mut writer = BlockWriter::new(stdout.lock());
    for block in &blocks {
        writer.write_block_line(block)?;
    }
    writer.flush()
}

/// Returns `true` when every scanned line is well formed.
fn run_validate(input: Option<PathBuf>, limit: u64) -> Result<bool, IpListError> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let cmd = ValidateCommand::new().with_limit(limit);

    let failures = if stdin_requested(&input) {
        cmd.run_stdin()?
    } else {
        let path = input.unwrap_or_default();
        cmd.run_path(&path)?
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let mut buf = itoa::Buffer::new();
    for line in &failures {
        handle.write_all(buf.format(*line).as_bytes())?;
        handle.write_all(b"\n")?;
    }
    handle.flush()?;

    Ok(failures.is_empty())
}

fn run_strip(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    low_memory: bool,
    stats: bool,
) -> Result<(), IpListError> {
    let cmd = StripCommand::new().with_low_memory(low_memory);

    // Open the input before creating or truncating the output file
    let result = if stdin_requested(&input) {
        let mut sink = open_output(output)?;
        cmd.run_stdin(&mut sink)?
    } else {
        let source = File::open(input.unwrap_or_default())?;
        let mut sink = open_output(output)?;
        cmd.run(source, &mut sink)?
    };

    if stats {
        eprintln!("Strip stats: {}", result);
    }

    Ok(())
}
