//! rulebook CLI: run built-in rule packs against facts from the command line.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use rulebook::config::EngineConfig;
use rulebook::engine::Engine;
use rulebook::fact::FactMap;
use rulebook::seeds;

#[derive(Parser)]
#[command(name = "rulebook", version, about = "Namespace-discovered rule engine")]
struct Cli {
    /// Engine config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List namespaces that have built-in rules.
    Namespaces,

    /// Show the ordered rules of a namespace.
    Rules {
        /// Namespace to inspect (overrides the config file).
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Run a namespace's rules against a set of facts.
    Run {
        /// Namespace to run (overrides the config file).
        #[arg(long)]
        namespace: Option<String>,

        /// Fact as name=value. Repeat for several facts.
        #[arg(long = "fact", value_parser = parse_fact)]
        facts: Vec<(String, String)>,

        /// Run the same facts on this many threads sharing one engine.
        #[arg(long, default_value = "1")]
        threads: usize,
    },
}

/// Outcome of one run, printed as JSON.
#[derive(Serialize)]
struct RunReport {
    namespace: String,
    thread: usize,
    facts: BTreeMap<String, String>,
    result: Option<String>,
}

fn parse_fact(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got \"{raw}\"")),
    }
}

fn engine_config(path: Option<&PathBuf>, namespace: Option<String>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(namespace) = namespace {
        config.namespace = namespace;
    }
    if config.namespace.trim().is_empty() {
        miette::bail!("no namespace given; pass --namespace or set it in the config file");
    }
    Ok(config)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = Arc::new(seeds::builtin_registry()?);

    match cli.command {
        Commands::Namespaces => {
            for namespace in registry.namespaces() {
                println!("{namespace} ({} rules)", registry.rule_count(&namespace));
            }
        }

        Commands::Rules { namespace } => {
            let config = engine_config(cli.config.as_ref(), namespace)?;
            let engine: Engine<String> = Engine::with_config(config, registry);
            let rules = engine.populate();
            if rules.is_empty() {
                println!("No rules in namespace \"{}\".", engine.namespace());
            } else {
                println!("Rules in \"{}\" ({}):", engine.namespace(), rules.len());
                for (i, rule) in rules.iter().enumerate() {
                    println!("  {}. {} (order {})", i + 1, rule.name(), rule.order());
                }
            }
        }

        Commands::Run {
            namespace,
            facts,
            threads,
        } => {
            let config = engine_config(cli.config.as_ref(), namespace)?;
            let engine: Engine<String> = Engine::with_config(config, registry);
            let threads = threads.max(1);

            let reports: Vec<Result<RunReport>> = std::thread::scope(|s| {
                let handles: Vec<_> = (0..threads)
                    .map(|thread| {
                        let engine = &engine;
                        let facts = &facts;
                        s.spawn(move || -> Result<RunReport> {
                            let mut fact_map: FactMap<String> = facts.iter().cloned().collect();
                            engine.run(&mut fact_map)?;
                            Ok(RunReport {
                                namespace: engine.namespace().to_string(),
                                thread,
                                facts: fact_map.snapshot(),
                                result: engine.result(),
                            })
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| match h.join() {
                        Ok(report) => report,
                        Err(_) => Err(miette::miette!("run thread panicked")),
                    })
                    .collect()
            });

            for report in reports {
                let report = report?;
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            }
        }
    }

    Ok(())
}
