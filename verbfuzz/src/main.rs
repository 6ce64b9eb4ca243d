use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use verbfuzz::core::spec::ResourceRef;
use verbfuzz::core::state::{ResourceKind, State};
use verbfuzz::core::table::Snapshot;
use verbfuzz::exit_codes;
use verbfuzz::io::config::{FuzzConfig, load_config};
use verbfuzz::io::scaffold_store::{load_scaffold, parse_scaffold, render_scaffold, write_scaffold};
use verbfuzz::logging;
use verbfuzz::mutate::Mutator;
use verbfuzz::run::run_mutations;
use verbfuzz::scaffold::{BUILTIN_SCAFFOLDS, Scaffold, builtin};

#[derive(Parser)]
#[command(name = "verbfuzz", version, about = "Contract-aware RDMA verb sequence mutator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print or write a built-in scaffold.
    Scaffold {
        name: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load and replay a scaffold, then print the final resource table.
    Validate { path: PathBuf },
    /// Run mutation rounds over a scaffold.
    Mutate {
        path: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        rounds: Option<u32>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the indices of verbs that depend on a resource.
    Deps {
        path: PathBuf,
        #[arg(long)]
        kind: ResourceKind,
        #[arg(long)]
        name: String,
        #[arg(long)]
        state: Option<State>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Scaffold { name, out } => cmd_scaffold(&name, out.as_deref()),
        Command::Validate { path } => cmd_validate(&path),
        Command::Mutate {
            path,
            config,
            seed,
            rounds,
            out,
        } => cmd_mutate(&path, config.as_deref(), seed, rounds, out.as_deref()),
        Command::Deps {
            path,
            kind,
            name,
            state,
        } => cmd_deps(&path, ResourceRef::new(kind, name), state),
    }
}

fn cmd_scaffold(name: &str, out: Option<&Path>) -> Result<i32> {
    let scaffold = builtin(name).ok_or_else(|| {
        let known: Vec<&str> = BUILTIN_SCAFFOLDS.iter().map(|entry| entry.name).collect();
        anyhow!("unknown scaffold '{}' (known: {})", name, known.join(", "))
    })?;
    emit_scaffold(&scaffold, out)?;
    Ok(exit_codes::OK)
}

fn cmd_validate(path: &Path) -> Result<i32> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read scaffold {}", path.display()))?;
    let (scaffold, table) =
        parse_scaffold(&contents).with_context(|| format!("validate {}", path.display()))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "ok: {} verbs", scaffold.verbs.len())?;
    write_table(&mut stdout, &table.snapshot())?;
    Ok(exit_codes::OK)
}

fn cmd_mutate(
    path: &Path,
    config: Option<&Path>,
    seed: Option<u64>,
    rounds: Option<u32>,
    out: Option<&Path>,
) -> Result<i32> {
    let cfg = match config {
        Some(config) => load_config(config)?,
        None => FuzzConfig::default(),
    };
    let rounds = rounds.unwrap_or(cfg.rounds);
    if rounds == 0 {
        return Err(anyhow!("rounds must be > 0"));
    }
    let seed = seed.or(cfg.seed).unwrap_or_else(rand::random);
    let scaffold = load_scaffold(path)?;
    let outcome = run_mutations(&scaffold, &cfg.mutation, seed, rounds)
        .with_context(|| format!("mutate {}", path.display()))?;

    eprintln!("seed {}: {} of {} rounds committed", seed, outcome.committed(), rounds);
    for mutation in &outcome.mutations {
        eprintln!("  {}", mutation);
    }
    emit_scaffold(&outcome.scaffold, out)?;
    if outcome.mutations.is_empty() {
        return Ok(exit_codes::NO_MUTATION);
    }
    Ok(exit_codes::OK)
}

fn cmd_deps(path: &Path, resource: ResourceRef, state: Option<State>) -> Result<i32> {
    let scaffold = load_scaffold(path)?;
    let mutator = Mutator::new(scaffold.verbs, Default::default())
        .with_context(|| format!("replay {}", path.display()))?;
    let indices = match state {
        Some(state) => mutator.find_dependent_verbs_stateful(&resource, state),
        None => mutator.find_dependent_verbs(&resource),
    };
    let mut stdout = std::io::stdout().lock();
    for index in indices {
        writeln!(stdout, "{}\t{}", index, mutator.sequence()[index].kind())?;
    }
    Ok(exit_codes::OK)
}

fn emit_scaffold(scaffold: &Scaffold, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => write_scaffold(path, scaffold),
        None => {
            print!("{}", render_scaffold(scaffold)?);
            Ok(())
        }
    }
}

fn write_table(out: &mut impl Write, snapshot: &Snapshot) -> Result<()> {
    for (resource, record) in snapshot.iter() {
        write!(out, "{}\t{}", resource, record.state)?;
        for (key, linked) in &record.metadata {
            write!(out, "\t{}={}", key, linked)?;
        }
        writeln!(out)?;
    }
    Ok(())
}
