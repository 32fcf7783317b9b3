use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use csim::config::CacheConfig;
use csim::simulation::Simulator;
use csim::trace::Trace;
use tracing_subscriber::EnvFilter;

/// Counts hits, misses and evictions of an LRU cache on a valgrind memory trace.
#[derive(Debug, Parser)]
#[command(name = "csim", version)]
struct Args {
    /// Number of set index bits, the cache has 2^s sets
    #[arg(short = 's', value_name = "s")]
    set_index_bits: u32,

    /// Associativity, number of lines per set
    #[arg(short = 'E', value_name = "E")]
    num_lines: usize,

    /// Number of block offset bits, a block holds 2^b bytes
    #[arg(short = 'b', value_name = "b")]
    offset_bits: u32,

    /// Trace file to replay
    #[arg(short = 't', value_name = "tracefile")]
    trace_file: PathBuf,

    /// Print the outcome of every access
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "arguments");

    let config = CacheConfig::new(args.set_index_bits, args.num_lines, args.offset_bits)
        .context("invalid cache configuration")?;

    let file_data = std::fs::read_to_string(&args.trace_file)
        .with_context(|| format!("unable to read trace file {}", args.trace_file.display()))?;
    let trace = Trace::try_from(file_data.as_str())
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to parse trace file")?;

    let mut simulator = Simulator::new(config).context("invalid cache configuration")?;
    tracing::debug!("{}", simulator.config().format_info());
    let mut stdout = BufWriter::new(stdout().lock());

    for record in trace.records() {
        let Some(access) = record.access() else {
            continue;
        };

        let outcome = simulator
            .apply(access)
            .with_context(|| format!("simulation aborted at '{record}'"))?;
        if args.verbose {
            writeln!(stdout, "{}", record.format_outcome(&outcome))?;
        }
    }

    let result = simulator.result();
    tracing::info!(
        percent_hit = result.percent_hit(),
        percent_miss = result.percent_miss(),
        "hit rate"
    );
    writeln!(stdout, "{result}")?;
    stdout.flush()?;

    Ok(())
}
