// Comma Pump Explorer CLI entry point.
//
// Subcommands:
//   commas   sweep the prime lattice for small commas, with tempering EDOs
//   steps    list the odd-limit step vocabulary
//   pumps    solve for pumps of one comma over chosen steps, canonicalize them,
//            and report each pump's walk
//   kernel   print the integer null space of the chosen steps' matrix
//
// Usage:
//   cargo run -p comma_pump -- [--config FILE] [--json] [--primes P] <command> ...
//   cargo run -p comma_pump -- pumps --comma 0 --steps 0,1,2,3,4
//   cargo run -p comma_pump -- pumps --comma -4,4,-1 --edo 12
//
// Step indices refer to the `steps` listing (0-based); a comma given as an
// index refers to the `commas` listing. Text output goes to stdout in
// numbered stages; `--json` replaces it with a single JSON document.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use comma_pump::canonical::{PumpCanonicalizer, step_equivalences};
use comma_pump::comma::{CommaSweep, SweepEvent, SweepOutcome};
use comma_pump::config::ExplorerConfig;
use comma_pump::edo::edos_tempering;
use comma_pump::kernel::KernelCache;
use comma_pump::monzo::{Monzo, Step, cents, ratio_string};
use comma_pump::schedule::{Incremental, StopReason, final_outcome};
use comma_pump::session::{PumpSession, SessionUpdate};
use comma_pump::vector::{apply_columns, l1};
use comma_pump::vocabulary::generate_vocabulary;
use comma_pump::walk::{WalkOptions, build_pump_walk};
use serde::Serialize;
use std::path::PathBuf;

/// Number of vocabulary steps used when `--steps` is not given.
const DEFAULT_STEP_COUNT: usize = 5;

#[derive(Parser)]
#[command(name = "pumps", about = "Explore just-intonation commas and comma pumps")]
struct Cli {
    /// JSON config file. Flags override its fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the result as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Prime limit ("7") or explicit subgroup ("2,3,7").
    #[arg(long, global = true)]
    primes: Option<String>,

    /// Per-prime exponent bound for the comma sweep.
    #[arg(long, global = true)]
    exp_bound: Option<u32>,

    /// Largest comma size in cents.
    #[arg(long, global = true)]
    max_cents: Option<f64>,

    /// Odd limit of the step vocabulary.
    #[arg(long, global = true)]
    odd_limit: Option<u64>,

    /// Maximum vocabulary size.
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List commas and the EDOs that temper them out.
    Commas {
        /// Show at most this many commas.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the step vocabulary.
    Steps,
    /// Find canonical pumps for a comma.
    Pumps {
        /// Comma index from `commas`, or a monzo such as "-4,4,-1".
        #[arg(long, allow_hyphen_values = true)]
        comma: String,
        /// Step indices from `steps` (default: the first five).
        #[arg(long, value_delimiter = ',')]
        steps: Vec<usize>,
        #[arg(long)]
        coeff_bound: Option<u32>,
        #[arg(long)]
        max_solutions: Option<usize>,
        /// Reject pumps with more total moves than this.
        #[arg(long)]
        l1_cap: Option<u64>,
        /// Also walk each pump in this EDO.
        #[arg(long)]
        edo: Option<u32>,
        /// Show at most this many pumps.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the kernel basis of the chosen steps.
    Kernel {
        #[arg(long, value_delimiter = ',', required = true)]
        steps: Vec<usize>,
    },
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CommaRow {
    index: usize,
    ratio: String,
    monzo: Monzo,
    cents: f64,
    edos: Vec<u32>,
}

#[derive(Serialize)]
struct CommasReport {
    primes: Vec<u64>,
    reason: StopReason,
    partial: bool,
    commas: Vec<CommaRow>,
}

#[derive(Serialize)]
struct PumpRow {
    coeffs: Vec<i64>,
    moves: i64,
    exact: bool,
    net_cents: f64,
    net_cents_edo: Option<f64>,
}

#[derive(Serialize)]
struct PumpsReport {
    primes: Vec<u64>,
    target: Monzo,
    target_cents: f64,
    steps: Vec<Step>,
    /// Step pairs a comma apart, as "upper=lower".
    equivalences: Vec<String>,
    reason: StopReason,
    partial: bool,
    raw_solutions: usize,
    pumps: Vec<PumpRow>,
}

#[derive(Serialize)]
struct KernelReport {
    steps: Vec<Step>,
    basis: Vec<Vec<i64>>,
}

/// Stage and detail lines, silenced in JSON mode.
struct Console {
    quiet: bool,
}

impl Console {
    fn line(&self, text: impl std::fmt::Display) {
        if !self.quiet {
            println!("{text}");
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let console = Console { quiet: cli.json };
    let primes = config.prime_basis();

    match cli.command {
        Command::Commas { limit } => {
            console.line("=== Comma Pump Explorer: commas ===");
            console.line(format!("Primes: {primes:?}"));
            console.line(format!("Exponent bound: ±{}", config.exp_bound));
            console.line(format!("Max cents: {}", config.max_cents));
            console.line("");

            console.line("[1/2] Sweeping lattice...");
            let outcome = sweep_commas(&config, &primes)?;
            console.line(format!(
                "  {} commas ({})",
                outcome.commas.len(),
                outcome.reason.as_str()
            ));

            console.line(format!(
                "[2/2] Matching EDOs {}-{}...",
                config.edo_range().start(),
                config.edo_range().end()
            ));
            let shown = limit.unwrap_or(outcome.commas.len());
            let rows: Vec<CommaRow> = outcome
                .commas
                .iter()
                .take(shown)
                .enumerate()
                .map(|(index, c)| CommaRow {
                    index,
                    ratio: ratio_string(&c.monzo, &primes),
                    monzo: c.monzo.clone(),
                    cents: c.cents,
                    edos: edos_tempering(&c.monzo, &primes, config.edo_range()),
                })
                .collect();

            if cli.json {
                let report = CommasReport {
                    primes,
                    reason: outcome.reason,
                    partial: outcome.partial,
                    commas: rows,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for row in &rows {
                    println!(
                        "  {:>4}  {:>9.3}¢  {:<24} {:?}  EDOs: {:?}",
                        row.index, row.cents, row.ratio, row.monzo, row.edos
                    );
                }
            }
        }

        Command::Steps => {
            let vocab = generate_vocabulary(&primes, config.odd_limit, config.max_steps);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&vocab)?);
            } else {
                println!(
                    "{} steps (odd limit {}, primes {:?}):",
                    vocab.len(),
                    config.odd_limit,
                    primes
                );
                for (i, s) in vocab.iter().enumerate() {
                    println!("  {:>3}  {:<8} {:>9.3}¢  {:?}", i, s.name, s.cents, s.monzo);
                }
            }
        }

        Command::Pumps {
            comma,
            steps,
            coeff_bound,
            max_solutions,
            l1_cap,
            edo,
            limit,
        } => {
            let mut solver_config = config.solver.clone();
            if let Some(b) = coeff_bound {
                solver_config.coeff_bound = b;
            }
            if let Some(m) = max_solutions {
                solver_config.max_solutions = m;
            }
            if l1_cap.is_some() {
                solver_config.l1_cap = l1_cap;
            }

            console.line("=== Comma Pump Explorer: pumps ===");
            console.line("[1/4] Resolving target and steps...");
            let target = resolve_target(&comma, &config, &primes)?;
            let vocab = generate_vocabulary(&primes, config.odd_limit, config.max_steps);
            let chosen = select_steps(&vocab, &steps)?;
            console.line(format!(
                "  Target: {} {:?} ({:.3}¢)",
                ratio_string(&target, &primes),
                target,
                cents(&target, &primes)
            ));
            let names: Vec<&str> = chosen.iter().map(|s| s.name.as_str()).collect();
            console.line(format!("  Steps: {}", names.join(", ")));
            let equivalences: Vec<String> = step_equivalences(&chosen, &target)?
                .into_iter()
                .map(|e| format!("{}={}", chosen[e.upper].name, chosen[e.lower].name))
                .collect();
            if !equivalences.is_empty() {
                console.line(format!("  Tempered equal: {}", equivalences.join(", ")));
            }

            console.line(format!(
                "[2/4] Searching (coefficients within ±{})...",
                solver_config.coeff_bound
            ));
            let mut canonicalizer = PumpCanonicalizer::new();
            let (session, _cancel) =
                PumpSession::start(&target, &chosen, solver_config, &mut canonicalizer)?;
            let mut last_bound = None;
            let report = session.run(|update| {
                let SessionUpdate::Progress(p) = update else {
                    return;
                };
                if p.bound > 0 && last_bound != Some(p.bound) {
                    last_bound = Some(p.bound);
                    console.line(format!(
                        "  bound ±{}: {} found, {} leaves, {}ms",
                        p.bound, p.found, p.leaves, p.elapsed_ms
                    ));
                }
            })?;
            console.line(format!(
                "  {} raw solutions ({}{})",
                report.raw.solutions.len(),
                report.raw.reason.as_str(),
                if report.raw.partial { ", partial" } else { "" }
            ));

            console.line("[3/4] Canonicalizing...");
            console.line(format!("  {} canonical pumps", report.canonical.len()));

            console.line("[4/4] Walking pumps...");
            let options = WalkOptions {
                edo,
                ..WalkOptions::default()
            };
            let dim = primes.len();
            let columns: Vec<&[i64]> = chosen.iter().map(|s| s.monzo.as_slice()).collect();
            let mut rows = Vec::new();
            for pump in report.canonical.iter().take(limit.unwrap_or(usize::MAX)) {
                let walk = build_pump_walk(pump, &chosen, &primes, &options)?;
                rows.push(PumpRow {
                    coeffs: pump.clone(),
                    moves: l1(pump),
                    exact: apply_columns(&columns, pump, dim) == target,
                    net_cents: walk.summary.net_cents,
                    net_cents_edo: walk.summary.net_cents_edo,
                });
            }

            if cli.json {
                let out = PumpsReport {
                    target_cents: cents(&target, &primes),
                    primes,
                    target,
                    steps: chosen,
                    equivalences,
                    reason: report.raw.reason,
                    partial: report.raw.partial,
                    raw_solutions: report.raw.solutions.len(),
                    pumps: rows,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for (i, row) in rows.iter().enumerate() {
                    let edo_note = row
                        .net_cents_edo
                        .map(|c| format!("  EDO net {c:+.1}¢"))
                        .unwrap_or_default();
                    println!(
                        "  {:>3}  moves {:>3}  {:<40} net {:+.3}¢{}{}",
                        i,
                        row.moves,
                        describe_pump(&row.coeffs, &chosen),
                        row.net_cents,
                        edo_note,
                        if row.exact { "" } else { "  (MISMATCH)" }
                    );
                }
            }
        }

        Command::Kernel { steps } => {
            let vocab = generate_vocabulary(&primes, config.odd_limit, config.max_steps);
            let chosen = select_steps(&vocab, &steps)?;
            let columns: Vec<Monzo> = chosen.iter().map(|s| s.monzo.clone()).collect();
            let mut cache = KernelCache::new();
            let basis = cache.basis(&columns)?.to_vec();
            if cli.json {
                let out = KernelReport {
                    steps: chosen,
                    basis,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let names: Vec<&str> = chosen.iter().map(|s| s.name.as_str()).collect();
                println!("Steps: {}", names.join(", "));
                if basis.is_empty() {
                    println!("Kernel is trivial: the steps are independent.");
                }
                for k in &basis {
                    println!("  {:?}  {}", k, describe_pump(k, &chosen));
                }
            }
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ExplorerConfig> {
    let mut config = match &cli.config {
        Some(path) => ExplorerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExplorerConfig::default(),
    };
    if let Some(p) = &cli.primes {
        config.primes = p.clone();
    }
    if let Some(b) = cli.exp_bound {
        config.exp_bound = b;
    }
    if let Some(c) = cli.max_cents {
        config.max_cents = c;
    }
    if let Some(o) = cli.odd_limit {
        config.odd_limit = o;
    }
    if let Some(m) = cli.max_steps {
        config.max_steps = m;
    }
    Ok(config)
}

/// Drive the incremental sweep to its `Done` event.
fn sweep_commas(config: &ExplorerConfig, primes: &[u64]) -> Result<SweepOutcome> {
    let (mut sweep, _cancel) =
        CommaSweep::new(primes, config.exp_bound, config.max_cents, &config.sweep)?;
    let outcome = final_outcome(sweep.run_to_end(), "comma sweep", |e| match e {
        SweepEvent::Done(outcome) => Some(outcome),
        _ => None,
    })?;
    Ok(outcome)
}

/// Parse "-4,4,-1", "[-4 4 -1]" or "<-4 4 -1]" into a monzo.
fn parse_monzo(text: &str) -> Option<Monzo> {
    let inner = text.trim().trim_matches(|c: char| matches!(c, '[' | ']' | '<' | '>'));
    let parts: Vec<&str> = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    parts.iter().map(|s| s.parse().ok()).collect()
}

fn resolve_target(text: &str, config: &ExplorerConfig, primes: &[u64]) -> Result<Monzo> {
    if let Ok(index) = text.trim().parse::<usize>() {
        let outcome = sweep_commas(config, primes)?;
        return match outcome.commas.get(index) {
            Some(c) => Ok(c.monzo.clone()),
            None => bail!(
                "comma index {index} out of range ({} commas found)",
                outcome.commas.len()
            ),
        };
    }
    let Some(monzo) = parse_monzo(text) else {
        bail!("cannot parse comma {text:?}: expected an index or a monzo like -4,4,-1");
    };
    if monzo.len() != primes.len() {
        bail!(
            "comma {monzo:?} has {} entries but the basis {primes:?} has {}",
            monzo.len(),
            primes.len()
        );
    }
    Ok(monzo)
}

fn select_steps(vocab: &[Step], indices: &[usize]) -> Result<Vec<Step>> {
    if indices.is_empty() {
        return Ok(vocab.iter().take(DEFAULT_STEP_COUNT).cloned().collect());
    }
    indices
        .iter()
        .map(|&i| {
            vocab
                .get(i)
                .cloned()
                .with_context(|| format!("step index {i} out of range ({} steps)", vocab.len()))
        })
        .collect()
}

/// "+4×3/2 -1×5/4 -2×2/1"
fn describe_pump(coeffs: &[i64], steps: &[Step]) -> String {
    let terms: Vec<String> = coeffs
        .iter()
        .zip(steps)
        .filter(|(c, _)| **c != 0)
        .map(|(c, s)| format!("{c:+}×{}", s.name))
        .collect();
    if terms.is_empty() {
        "(empty)".to_string()
    } else {
        terms.join(" ")
    }
}
