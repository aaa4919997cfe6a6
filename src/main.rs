//! vmsim - replay a memory trace through the TLB and page table
//!
//! Usage:
//!   vmsim trace.dat                      # default machine
//!   vmsim -c vm.config trace.dat         # machine from a config file
//!   vmsim --tlb-entries 16 < trace.dat   # read the trace from stdin

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use vmsim_rs::{Config, Mmu, SimError, TraceError, TraceEvent, TraceReader};

#[derive(Parser)]
#[command(name = "vmsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Trace file of `R:<hex>` / `W:<hex>` lines (stdin if omitted)
    #[arg(value_name = "TRACE")]
    trace: Option<PathBuf>,

    /// Machine configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of TLB entries (power of two)
    #[arg(long)]
    tlb_entries: Option<u32>,

    /// Number of physical page frames
    #[arg(long)]
    frames: Option<u32>,

    /// Accesses between clearing referenced bits (0 = never)
    #[arg(long)]
    clear_interval: Option<u32>,

    /// Accesses between TLB write-backs (0 = only on eviction)
    #[arg(long)]
    flush_interval: Option<u32>,

    /// Only print the summary
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Result<Config, SimError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(n) = self.tlb_entries {
            config.tlb.entries = n;
        }
        if let Some(n) = self.frames {
            config.phys.frames = n;
        }
        if let Some(n) = self.clear_interval {
            config.kernel.reference_clear_interval = n;
        }
        if let Some(n) = self.flush_interval {
            config.kernel.flush_interval = n;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<(), SimError> {
    let config = cli.load_config()?;
    if !cli.quiet {
        println!("{}", config);
    }

    let mut mmu = Mmu::new(&config)?;
    let events: Box<dyn Iterator<Item = Result<TraceEvent, TraceError>>> = match &cli.trace {
        Some(path) => Box::new(TraceReader::from_file(path)?),
        None => Box::new(TraceReader::from_stdin(io::stdin().lock())),
    };

    for event in events {
        let access = mmu.replay(event?)?;
        if !cli.quiet {
            println!("{}", access);
        }
    }

    mmu.flush();
    println!();
    println!("{}", mmu.stats());
    log::debug!("{:?}", mmu.tlb());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
