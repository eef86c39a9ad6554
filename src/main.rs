//! ontograph CLI: change sets, inference and validation over an RDF store.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ontograph::graph::Entity;
use ontograph::infer::RuleSet;
use ontograph::service::{Service, ServiceConfig};
use ontograph::store::GraphStore;

/// Selects every statement in the store.
const SELECT_ALL: &str = "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }";

#[derive(Parser)]
#[command(name = "ontograph", version, about = "Ontology-typed RDF graph with invertible change sets")]
struct Cli {
    /// Data directory for persistent storage (memory-only when omitted).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show store, ontology and journal statistics.
    Info,

    /// Diff desired entity states from a JSON file against the store and apply.
    Apply {
        /// JSON array of entities.
        #[arg(long)]
        file: PathBuf,

        /// Label recorded in the journal.
        #[arg(long)]
        label: Option<String>,

        /// Print the transformation without applying it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a SPARQL query.
    Query {
        #[arg(long)]
        sparql: String,
    },

    /// Saturate a subgraph with derive rules and print what was derived.
    Infer {
        /// Rule file.
        #[arg(long)]
        rules: PathBuf,

        /// Selection query (CONSTRUCT, or SELECT binding ?s ?p ?o).
        #[arg(long)]
        select: Option<String>,

        /// Add the ontology's schema statements to the selection.
        #[arg(long)]
        schema: bool,
    },

    /// Evaluate violation rules over a subgraph.
    Validate {
        /// Rule file.
        #[arg(long)]
        rules: PathBuf,

        /// Selection query (CONSTRUCT, or SELECT binding ?s ?p ?o).
        #[arg(long)]
        select: Option<String>,

        /// Add the ontology's schema statements to the selection.
        #[arg(long)]
        schema: bool,
    },

    /// Revert the most recently journaled transformation.
    Undo,

    /// List journaled transformations.
    History,

    /// List the ontology's types and predicates.
    Types,

    /// Write the effective configuration as TOML.
    InitConfig {
        /// Output path.
        #[arg(long, default_value = "ontograph.toml")]
        out: PathBuf,
    },
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

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }

    if let Commands::InitConfig { out } = &cli.command {
        config.save(out)?;
        println!("Wrote configuration to {}", out.display());
        return Ok(());
    }

    let service = Service::open(&config)?;

    match cli.command {
        Commands::Info => {
            let registry = service.registry();
            println!("ontograph");
            match &config.data_dir {
                Some(dir) => println!("  data dir:   {}", dir.display()),
                None => println!("  data dir:   (memory only)"),
            }
            println!("  statements: {}", service.store().len()?);
            println!(
                "  ontology:   {} ({} types, {} predicates)",
                registry.name(),
                registry.types().len(),
                registry.predicates().len()
            );
            println!("  name via:   {}", registry.prefixes().compact(service.name_predicate()));
            match service.journal() {
                Some(journal) => println!("  journal:    {} entries", journal.len()?),
                None => println!("  journal:    disabled"),
            }
        }

        Commands::Apply {
            file,
            label,
            dry_run,
        } => {
            let entities = read_entities(&file)?;
            let transformation = service.create_transformation(&entities)?;
            if transformation.is_empty() {
                println!("Nothing to change.");
                return Ok(());
            }
            if dry_run {
                print!("{}", transformation.flatten());
                return Ok(());
            }
            let applied = service.apply_labeled(&transformation, label.as_deref())?;
            println!(
                "Applied {} operations: {}",
                applied.transformation.operation_count(),
                applied.stats
            );
            if let Some(seq) = applied.journal_seq {
                println!("Journal entry #{seq}");
            }
        }

        Commands::Query { sparql } => {
            let query = format!("{}{sparql}", service.registry().prefixes().to_sparql());
            let rows = service.query(&query)?;
            let prefixes = service.registry().prefixes();
            for row in &rows {
                let cells: Vec<String> = row
                    .iter()
                    .map(|(var, term)| match term.as_iri() {
                        Some(iri) => format!("?{var}={}", prefixes.compact(iri)),
                        None => format!("?{var}={term}"),
                    })
                    .collect();
                println!("{}", cells.join("  "));
            }
            println!("({} rows)", rows.len());
        }

        Commands::Infer {
            rules,
            select,
            schema,
        } => {
            let rule_set = load_rules(&service, &rules)?;
            let selection = selection_query(&service, select.as_deref());
            let outcome = service.apply_inference_rules(&selection, &rule_set, schema)?;
            let prefixes = service.registry().prefixes();
            for d in &outcome.derived {
                println!(
                    "{} {} {}  [{} round {}]",
                    prefixes.compact(&d.statement.subject),
                    prefixes.compact(&d.statement.predicate),
                    match d.statement.object.as_iri() {
                        Some(iri) => prefixes.compact(iri),
                        None => d.statement.object.to_string(),
                    },
                    d.rule_name,
                    d.round
                );
            }
            println!(
                "Derived {} statements in {} rounds ({} in result graph).",
                outcome.derived.len(),
                outcome.iterations,
                outcome.store.len()?
            );
        }

        Commands::Validate {
            rules,
            select,
            schema,
        } => {
            let rule_set = load_rules(&service, &rules)?;
            let selection = selection_query(&service, select.as_deref());
            let report = service.validate(&selection, &rule_set, schema)?;
            for entry in report.iter() {
                println!("{entry}");
            }
            if report.is_valid() {
                println!("Valid ({} derived statements considered).", report.derived);
            } else {
                println!("{} violations.", report.len());
                std::process::exit(2);
            }
        }

        Commands::Undo => {
            let undone = service.undo_last()?;
            println!(
                "Undid journal entry #{}: {}",
                undone.journal_seq.unwrap_or_default(),
                undone.stats
            );
        }

        Commands::History => {
            let entries = service.history()?;
            if entries.is_empty() {
                println!("Journal is empty.");
            }
            for entry in &entries {
                println!(
                    "#{:<4} {:>5} ops  {}",
                    entry.seq,
                    entry.transformation.operation_count(),
                    entry.label.as_deref().unwrap_or("-")
                );
            }
        }

        Commands::Types => {
            let registry = service.registry();
            let prefixes = registry.prefixes();
            println!("Types:");
            for ty in registry.types() {
                let supertypes = if ty.supertypes.is_empty() {
                    String::new()
                } else {
                    format!(" : {}", ty.supertypes.join(", "))
                };
                println!("  {}{supertypes}  ({})", ty.name, prefixes.compact(&ty.iri));
            }
            println!("Predicates:");
            for p in registry.predicates() {
                println!(
                    "  {}  ({})  {} -> {}",
                    p.name,
                    prefixes.compact(&p.iri),
                    p.domain.as_deref().unwrap_or("*"),
                    p.range.as_deref().unwrap_or("*")
                );
            }
        }

        // Handled before the service opens.
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn read_entities(path: &Path) -> Result<Vec<Entity>> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&content).into_diagnostic()
}

/// Rule files ending in `.json` hold a serialized rule list; anything else is rule text.
fn load_rules<S: GraphStore>(service: &Service<S>, path: &Path) -> Result<RuleSet> {
    let text = std::fs::read_to_string(path).into_diagnostic()?;
    let source = path.display().to_string();
    if path.extension().is_some_and(|ext| ext == "json") {
        return Ok(RuleSet::from_json(&text, &source)?);
    }
    Ok(service.parse_rules(&text, &source)?)
}

fn selection_query<S: GraphStore>(service: &Service<S>, select: Option<&str>) -> String {
    match select {
        Some(q) => format!("{}{q}", service.registry().prefixes().to_sparql()),
        None => SELECT_ALL.to_string(),
    }
}
