//! Command line front end: normalize inputs, verify rule sets, inspect
//! critical pairs and list rules.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use canonform::analysis::CriticalPairAnalyzer;
use canonform::analysis::instances::Pools;
use canonform::cache::NormalizationCache;
use canonform::verification::format::{
    CsvFormatter, PrettyFormatter, colored_status, pair_rows, rule_rows,
};
use canonform::verification::{PropertyVerifier, VerificationReport};
use canonform::{Domain, EngineConfig, RewriteEngine, RuleSet, VerifierConfig};

const EXIT_FAILED: u8 = 1;
const EXIT_INVALID_INPUT: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Canonical forms by term rewriting, with rule set verification",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical form of each input
    Normalize {
        #[arg(short, long)]
        domain: Domain,

        /// Rewrite budget per input
        #[arg(long)]
        max_steps: Option<usize>,

        /// Print the rules applied and where
        #[arg(long)]
        trace: bool,

        /// JSON file caching results across runs
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Rule file replacing the shipped rule set
        #[arg(long)]
        rules: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Check the rule set properties and exit non-zero on a failure
    Verify {
        /// A domain name or `all`
        #[arg(short, long, default_value = "all")]
        domain: Selection,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        /// JSON verifier configuration
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        /// Generated inputs per domain
        #[arg(long)]
        corpus_size: Option<usize>,

        #[arg(long)]
        max_steps: Option<usize>,

        /// Rule file replacing the shipped rule set of its domain
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// List critical pairs and whether they join
    Pairs {
        #[arg(short, long)]
        domain: Domain,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,

        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the rules of a domain in declaration order
    Rules {
        #[arg(short, long)]
        domain: Domain,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Debug)]
struct Selection(Vec<Domain>);

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Selection(Domain::ALL.to_vec()));
        }
        Domain::from_str(s).map(|domain| Selection(vec![domain]))
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<VerifierConfig> {
    match path {
        Some(path) => {
            VerifierConfig::load(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(VerifierConfig::default()),
    }
}

fn load_rules(domain: Domain, path: Option<&PathBuf>) -> anyhow::Result<RuleSet> {
    match path {
        Some(path) => {
            let rules = RuleSet::from_json(path)
                .with_context(|| format!("loading rules from {}", path.display()))?;
            anyhow::ensure!(
                rules.domain() == domain,
                "{} holds {} rules, not {domain}",
                path.display(),
                rules.domain()
            );
            Ok(rules)
        }
        None => domain.ruleset().with_context(|| format!("building the {domain} rule set")),
    }
}

#[allow(clippy::too_many_arguments)]
fn normalize(
    domain: Domain,
    max_steps: Option<usize>,
    trace: bool,
    cache_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    format: Format,
    inputs: Vec<String>,
) -> anyhow::Result<ExitCode> {
    let rules = load_rules(domain, rules_path.as_ref())?;
    let mut config = EngineConfig {
        record_trace: trace,
        ..EngineConfig::default()
    };
    if let Some(max_steps) = max_steps {
        config.max_steps = max_steps;
    }
    let engine = RewriteEngine::new(&rules, config);

    let mut exit = ExitCode::SUCCESS;
    if let Some(path) = &cache_path {
        let mut cache = NormalizationCache::load(path)
            .with_context(|| format!("loading {}", path.display()))?;
        for input in &inputs {
            match cache.normalize(&engine, input) {
                Ok(result) => match format {
                    Format::Json => println!("{}", serde_json::to_string(&result)?),
                    _ => println!("{}", result.canonical),
                },
                Err(error) => {
                    eprintln!("{input}: {error}");
                    exit = ExitCode::from(EXIT_INVALID_INPUT);
                }
            }
        }
        cache.save(path).with_context(|| format!("saving {}", path.display()))?;
        return Ok(exit);
    }

    for input in &inputs {
        let term = match domain.parse(input) {
            Ok(term) => term,
            Err(error) => {
                eprintln!("{input}: {error}");
                exit = ExitCode::from(EXIT_INVALID_INPUT);
                continue;
            }
        };
        let result = engine.normalize(term);
        match format {
            Format::Json => println!("{}", serde_json::to_string(&result)?),
            _ => {
                println!("{}", domain.serialize(&result.normal_form));
                for step in &result.trace {
                    println!("  {} at {}", step.rule, step.position);
                }
                if !result.terminated {
                    eprintln!(
                        "{input}: stopped after {} steps ({:?})",
                        result.steps_taken, result.outcome
                    );
                }
            }
        }
    }
    Ok(exit)
}

fn print_report(report: &VerificationReport, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Table => print!("{}", PrettyFormatter::format_report(report)),
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
        Format::Csv => print!("{}", CsvFormatter::format_report(report)?),
    }
    Ok(())
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Normalize {
            domain,
            max_steps,
            trace,
            cache,
            rules,
            format,
            inputs,
        } => normalize(domain, max_steps, trace, cache, rules, format, inputs),

        Command::Verify {
            domain,
            format,
            config,
            seed,
            corpus_size,
            max_steps,
            rules,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(corpus_size) = corpus_size {
                config.corpus_size = corpus_size;
            }
            if let Some(max_steps) = max_steps {
                config.engine.max_steps = max_steps;
            }
            config.validate()?;

            let Selection(selected) = domain;
            anyhow::ensure!(
                rules.is_none() || selected.len() == 1,
                "--rules needs a single --domain"
            );
            let mut domains = Vec::with_capacity(selected.len());
            for domain in selected {
                let rules = load_rules(domain, rules.as_ref())?;
                domains.push(PropertyVerifier::new(&rules, config.clone()).verify());
            }
            let report = VerificationReport {
                seed: config.seed,
                domains,
            };
            print_report(&report, format)?;
            if report.has_failures() {
                Ok(ExitCode::from(EXIT_FAILED))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }

        Command::Pairs { domain, format, config } => {
            let config = load_config(config.as_ref())?;
            let rules = load_rules(domain, None)?;
            let engine = RewriteEngine::new(&rules, config.engine.clone());
            let pools = Pools::build(domain, &engine, config.seed, config.max_depth);
            let local = CriticalPairAnalyzer::new(engine, pools, config.max_instances).analyze();
            match format {
                Format::Table => {
                    print!("{}", PrettyFormatter::format(&pair_rows(&local)));
                    let status = colored_status(local.status);
                    println!("\n{} critical pairs: {status}", local.pairs.len());
                }
                Format::Json => println!("{}", serde_json::to_string_pretty(&local)?),
                Format::Csv => print!("{}", CsvFormatter::format(&pair_rows(&local))?),
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Rules { domain, format } => {
            let rules = load_rules(domain, None)?;
            match format {
                Format::Table => {
                    println!("{}", rules.identity());
                    print!("{}", PrettyFormatter::format(&rule_rows(&rules)));
                    println!();
                }
                Format::Json => println!("{}", serde_json::to_string_pretty(&rules)?),
                Format::Csv => print!("{}", CsvFormatter::format(&rule_rows(&rules))?),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
