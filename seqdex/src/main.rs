use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use seqdex::shapes::{self, critical_tuples, min_matching_positions};
use seqdex::{
    evaluate_one_shape, BuildConfig, Container, IndexInfo, IndexName, IndexTableBuilder, Outcome, SearchConfig, Shape,
    StepOutcome, Table, SWITCH_NEVER,
};

#[derive(Parser, Debug)]
#[command(
    name = "seqdex",
    author,
    version,
    about = "Suffix-array index tables and spaced-seed design",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build derived tables for a saved container (<idx>.seq + <idx>.manifest)
    Tables {
        /// Index base name
        index: PathBuf,
        /// Tables to build: nextpos, pos, lcp, lcp1, lcp2, bwt, rindex, <rate>.occ
        #[arg(short = 'T', long, value_delimiter = ',', default_value = "nextpos,pos,lcp,lcp1,bwt,rindex")]
        tables: Vec<Table>,
        #[arg(short = 't', long = "threads", default_value_t = 0)]
        threads: usize,
        /// Reader/writer buffer size in bytes
        #[arg(long = "buffer", default_value_t = 1 << 16)]
        buffer: usize,
    },
    /// Search optimal shapes of weight w over spans w+dstart ..= w+dstop
    Shapes {
        /// Number of care positions
        weight: usize,
        #[arg(short = 'k', long = "maxk", default_value_t = 2)]
        maxk: usize,
        #[arg(short = 'c', long = "mincov", default_value_t = 1)]
        mincov: u32,
        #[arg(long, default_value_t = 0)]
        dstart: usize,
        /// Defaults to dstart
        #[arg(long)]
        dstop: Option<usize>,
        #[arg(long = "switch-at", default_value_t = 500)]
        switch_at: usize,
        /// Keep coverage counters for the whole search
        #[arg(long = "never-switch")]
        never_switch: bool,
        /// Random-phase samples per shape type (automatic when omitted)
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long, default_value_t = 1717)]
        seed: u64,
        #[arg(short = 't', long = "threads", default_value_t = 0)]
        threads: usize,
        /// Record the best representative shape in <idx>.info
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Evaluate one shape given as a string of '#' (care) and '_' (wildcard)
    Evaluate {
        shape: Shape,
        #[arg(short = 'k', long = "maxk", default_value_t = 2)]
        maxk: usize,
        #[arg(short = 'c', long = "mincov", default_value_t = 1)]
        mincov: u32,
        /// Stop searching at this window length
        #[arg(long = "last-m")]
        last_m: Option<usize>,
        #[arg(long = "switch-at", default_value_t = 500)]
        switch_at: usize,
        /// Also list the maxk-tuples covered exactly mincov times
        #[arg(long)]
        critical: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Tables { index, tables, threads, buffer } => {
            let config = BuildConfig { num_threads: threads, io_buffer_bytes: buffer };
            run_tables(IndexName::new(index), &tables, config)
        }
        Commands::Shapes {
            weight,
            maxk,
            mincov,
            dstart,
            dstop,
            switch_at,
            never_switch,
            samples,
            seed,
            threads,
            record,
        } => {
            let config = SearchConfig {
                switch_at: if never_switch { SWITCH_NEVER } else { switch_at },
                samples,
                seed,
                num_threads: threads,
                ..SearchConfig::default()
            };
            run_shapes(weight, maxk, mincov, dstart, dstop.unwrap_or(dstart), &config, record)
        }
        Commands::Evaluate { shape, maxk, mincov, last_m, switch_at, critical } => {
            run_evaluate(&shape, maxk, mincov, last_m, switch_at, critical)
        }
    }
}

fn run_tables(idx: IndexName, tables: &[Table], config: BuildConfig) -> Result<()> {
    let container = Container::open(&idx).with_context(|| format!("cannot open container '{}'", idx))?;
    let mut builder = IndexTableBuilder::new(&container, idx.clone()).config(config);
    let report = builder.build(tables).with_context(|| format!("cannot build tables for '{}'", idx))?;

    for outcome in &report.outcomes {
        match outcome {
            StepOutcome::Built { table, elements, elapsed } => {
                println!("{}.{}: {} elements in {:.3}s", idx, table, elements, elapsed.as_secs_f64())
            }
            StepOutcome::Skipped { table, reason } => println!("{}.{}: skipped ({})", idx, table, reason),
            StepOutcome::Failed { table, error } => println!("{}.{}: FAILED: {}", idx, table, error),
        }
    }
    if let Some(error) = &report.info_error {
        println!("{}.info: FAILED: {}", idx, error);
    }
    if !report.is_success() {
        anyhow::bail!(
            "{} table step(s) failed{}",
            report.failures().count(),
            if report.info_error.is_some() { ", index info not updated" } else { "" }
        );
    }
    Ok(())
}

fn run_shapes(
    weight: usize,
    maxk: usize,
    mincov: u32,
    dstart: usize,
    dstop: usize,
    config: &SearchConfig,
    record: Option<PathBuf>,
) -> Result<()> {
    config.print();
    let rows = shapes::evaluate_all_shapes_with_weight(weight, maxk, mincov, dstart, dstop, config)?;
    println!("% switching only for counter length >= {}", config.switch_at);
    println!("% w  q  d    k  cov  m*[k..1]  shape    #opt.shapes, #matches");
    for row in &rows {
        println!("{}", row);
    }

    if let Some(base) = record {
        let best = rows
            .iter()
            .min_by(|a, b| a.best.cmp(&b.best))
            .context("no shape type was evaluated")?;
        let idx = IndexName::new(base);
        let path = idx.info();
        let mut info = IndexInfo::load(&path).with_context(|| format!("cannot read '{}'", path.display()))?;
        info.record_shape(&best.representative);
        info.save(&path).with_context(|| format!("cannot write '{}'", path.display()))?;
        println!("recorded shape {} in {}", best.representative, path.display());
    }
    Ok(())
}

fn run_evaluate(
    shape: &Shape,
    maxk: usize,
    mincov: u32,
    last_m: Option<usize>,
    switch_at: usize,
    critical: bool,
) -> Result<()> {
    let outcome = if critical {
        critical_tuples(shape, maxk, mincov)?
    } else {
        evaluate_one_shape(shape, maxk, mincov, last_m, switch_at)?
    };
    match outcome {
        Outcome::Converged(result) => {
            println!("shape {} (w={}, q={})", shape, shape.weight(), shape.span());
            for (k, m) in result.mstars().iter().enumerate() {
                println!("  m*[{}] = {}", k + 1, m);
            }
            if result.switched_at() != 0 {
                println!("  switched to deficiency counters at {} covered tuples", result.switched_at());
            }
            let matches = min_matching_positions(shape, mincov as usize);
            println!("  min matching positions for 0..={} hits: {:?}", mincov, matches);
            if let Some(tuples) = result.critical_tuples() {
                println!("  {} critical {}-tuples:", tuples.len(), maxk);
                for t in tuples {
                    println!("    {:?}", t);
                }
            }
        }
        Outcome::Indeterminate { last_m } => {
            println!("shape {}: no m* up to window length {}", shape, last_m);
        }
    }
    Ok(())
}
