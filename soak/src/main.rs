mod cli;
mod report;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "soak", version, about = "Seed sweeps over the verbfuzz mutation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mutate a scaffold under many seeds and record what held.
    Run {
        /// Built-in scaffold name or path to a scaffold file.
        #[arg(long)]
        scaffold: String,
        #[arg(long, default_value_t = 32)]
        seeds: u32,
        #[arg(long)]
        rounds: Option<u32>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Use consecutive seeds starting here instead of random ones.
        #[arg(long)]
        seed_base: Option<u64>,
    },
    /// Summarize a soak report.
    Report { path: PathBuf },
}

fn main() -> Result<()> {
    verbfuzz::logging::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            scaffold,
            seeds,
            rounds,
            config,
            out,
            seed_base,
        } => cli::run_soak(&cli::RunArgs {
            scaffold,
            seeds,
            rounds,
            config,
            out,
            seed_base,
        }),
        Command::Report { path } => cli::show_report(&path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::parse_from([
            "soak",
            "run",
            "--scaffold",
            "rc_send_recv",
            "--seeds",
            "8",
            "--seed-base",
            "100",
        ]);
        match cli.command {
            Command::Run {
                scaffold,
                seeds,
                rounds,
                seed_base,
                ..
            } => {
                assert_eq!(scaffold, "rc_send_recv");
                assert_eq!(seeds, 8);
                assert_eq!(rounds, None);
                assert_eq!(seed_base, Some(100));
            }
            Command::Report { .. } => panic!("expected run"),
        }
    }
}
