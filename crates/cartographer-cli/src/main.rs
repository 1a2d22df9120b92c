//! Cartographer CLI - cross-document knowledge graph builder

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use cartographer_core::config::Config;
use cartographer_core::knowledge::{Canonicalizer, Extraction, KnowledgeGraph};
use cartographer_core::storage::{GraphFile, load_extraction_dir};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cartographer")]
#[command(author, version, about = "Cross-document knowledge graph builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Graph file (overrides storage.graph_path)
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one document's extractor output into the graph
    Ingest {
        /// Document ID
        document_id: String,
        /// Extractor output file, or `-` for stdin
        input: PathBuf,
    },

    /// List documents sharing concepts with a document
    Related {
        /// Document ID
        document_id: String,
        /// Maximum number of results (defaults to query.related_limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a concept and the concepts it is linked to
    Concept {
        /// Any name that resolves to the concept
        name: String,
    },

    /// Export nodes and edges as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rebuild the graph from a directory of extraction files
    Rebuild {
        /// Directory of `<document-id>.json` files
        dir: PathBuf,
    },

    /// Show graph size
    Stats,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show the configuration file path
    Path,
}

/// Settings shared by the graph commands
struct Session {
    file: GraphFile,
    canonicalizer: Canonicalizer,
    related_limit: usize,
    format: OutputFormat,
    quiet: bool,
}

impl Session {
    fn new(
        config: Config,
        graph: Option<PathBuf>,
        format: OutputFormat,
        quiet: bool,
    ) -> anyhow::Result<Self> {
        let path = match graph {
            Some(path) => path,
            None => config.resolved_graph_path()?,
        };
        debug!(path = %path.display(), "Using graph file");

        Ok(Self {
            file: GraphFile::new(path),
            canonicalizer: config.canonicalizer()?,
            related_limit: config.query.related_limit,
            format,
            quiet,
        })
    }

    fn load(&self) -> anyhow::Result<KnowledgeGraph> {
        Ok(self.file.load(self.canonicalizer.clone())?)
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A broken config file must not prevent `config reset`
    let config = Config::load();
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&level, cli.quiet);

    let result = run(cli, config);
    if let Err(err) = &result {
        if let Some(hint) = err
            .downcast_ref::<cartographer_core::Error>()
            .and_then(|e| e.suggestion())
        {
            eprintln!("hint: {}", hint);
        }
    }
    result
}

fn init_tracing(level: &str, quiet: bool) {
    let level = if quiet { "error" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("cartographer={level},cartographer_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli, config: anyhow::Result<Config>) -> anyhow::Result<()> {
    if let Commands::Config { action } = cli.command {
        return cmd_config(action, cli.quiet);
    }

    let session = Session::new(config?, cli.graph, cli.format, cli.quiet)?;

    match cli.command {
        Commands::Ingest { document_id, input } => cmd_ingest(&session, &document_id, &input),
        Commands::Related { document_id, limit } => cmd_related(&session, &document_id, limit),
        Commands::Concept { name } => cmd_concept(&session, &name),
        Commands::Export { output } => cmd_export(&session, output.as_deref()),
        Commands::Rebuild { dir } => cmd_rebuild(&session, &dir),
        Commands::Stats => cmd_stats(&session),
        Commands::Config { .. } => Ok(()),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_ingest(session: &Session, document_id: &str, input: &Path) -> anyhow::Result<()> {
    let text = if input == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read extraction from stdin")?;
        buffer
    } else {
        fs::read_to_string(input)
            .with_context(|| format!("Failed to read extraction file: {}", input.display()))?
    };

    let extraction = Extraction::parse_response(&text)?;
    let mut graph = session.load()?;
    let report = graph.ingest_document(document_id, &extraction);
    session.file.save(&graph)?;

    if session.json() {
        print_json(&report)?;
    } else if !session.quiet {
        println!("Ingested '{}'", report.document_id);
        println!(
            "  Concepts: {} new, {} merged, {} skipped",
            report.concepts_created, report.concepts_merged, report.concepts_skipped
        );
        println!(
            "  Relations: {} new, {} merged",
            report.relations_created, report.relations_merged
        );
    }
    Ok(())
}

fn cmd_related(session: &Session, document_id: &str, limit: Option<usize>) -> anyhow::Result<()> {
    let limit = limit.unwrap_or(session.related_limit);
    if limit == 0 {
        anyhow::bail!("--limit must be at least 1");
    }

    let graph = session.load()?;
    let related = graph.related_documents_with_limit(document_id, limit);

    if session.json() {
        return print_json(&related);
    }

    if related.is_empty() {
        if !session.quiet {
            println!("No related documents for '{}'.", document_id);
        }
        return Ok(());
    }

    for doc in &related {
        if session.quiet {
            println!("{}", doc.document_id);
        } else {
            println!(
                "{:<32} {:>6.2}  {}",
                doc.document_id,
                doc.score,
                doc.shared_concepts.join(", ")
            );
        }
    }
    Ok(())
}

fn cmd_concept(session: &Session, name: &str) -> anyhow::Result<()> {
    let graph = session.load()?;
    let info = graph.concept_info(name);

    if session.json() {
        return print_json(&info);
    }

    let Some(info) = info else {
        if !session.quiet {
            println!("Concept '{}' not found.", name);
        }
        return Ok(());
    };

    println!("{} ({})", info.name, info.concept_type);
    if session.quiet {
        return Ok(());
    }
    println!("  Importance: {:.2}", info.importance);
    if let Some(parent) = &info.parent {
        println!("  Parent: {}", parent);
    }
    if !info.aliases.is_empty() {
        println!("  Aliases: {}", info.aliases.join(", "));
    }
    println!("  Sources: {}", info.sources.join(", "));
    if !info.related.is_empty() {
        println!("  Related:");
        for related in &info.related {
            println!(
                "    {} [{}] {:.2}",
                related.name, related.relation_type, related.strength
            );
        }
    }
    Ok(())
}

fn cmd_export(session: &Session, output: Option<&Path>) -> anyhow::Result<()> {
    let graph = session.load()?;
    let export = graph.export_graph();
    let json = serde_json::to_string_pretty(&export).context("Failed to serialize graph export")?;

    match output {
        Some(path) => {
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            if !session.quiet && !session.json() {
                println!(
                    "Exported {} nodes and {} edges to {}",
                    export.nodes.len(),
                    export.edges.len(),
                    path.display()
                );
            }
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_rebuild(session: &Session, dir: &Path) -> anyhow::Result<()> {
    let documents = load_extraction_dir(dir)?;

    let mut graph = KnowledgeGraph::new(session.canonicalizer.clone());
    let report = graph.rebuild_all(&documents, &session.file)?;

    if session.json() {
        print_json(&report)?;
    } else if !session.quiet {
        println!("Rebuilt graph from {} documents", report.documents_ingested);
        println!("  Concepts: {}", report.stats.concepts);
        println!("  Relations: {}", report.stats.relations);
        if !report.failed_documents.is_empty() {
            println!(
                "  Failed extractions (indexed without concepts): {}",
                report.failed_documents.join(", ")
            );
        }
    }
    Ok(())
}

fn cmd_stats(session: &Session) -> anyhow::Result<()> {
    let graph = session.load()?;
    let stats = graph.stats();

    if session.json() {
        return print_json(&stats);
    }

    if session.quiet {
        println!("{} {} {}", stats.concepts, stats.relations, stats.documents);
    } else {
        println!("Graph: {}", session.file.path().display());
        println!("  Concepts: {}", stats.concepts);
        println!("  Relations: {}", stats.relations);
        println!("  Documents: {}", stats.documents);
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
