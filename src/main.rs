//! kgviz CLI - Render knowledge-graph query results as interactive HTML.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use kgviz::config::KgvizConfig;
use kgviz::store::{Neo4jHttpStore, RowsFileStore};
use kgviz::style::{ParallelEdges, StyleConfig};
use kgviz::{visualize, VisualizeOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "kgviz")]
#[command(about = "Render property-graph query results as an interactive visualization")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, default_value = "kgviz.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run a Cypher query against Neo4j and render the result
    Query {
        /// Neo4j HTTP address (e.g. "http://localhost:7474")
        #[arg(long)]
        uri: Option<String>,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        password: Option<String>,

        /// Database to query (one per case)
        #[arg(long)]
        database: Option<String>,

        /// Cypher query returning nodes, relationships or paths
        #[arg(short, long)]
        query: Option<String>,

        /// Output file path (.html, or .json for the raw payload)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the normalized graph next to the output
        #[arg(long)]
        save_graph: bool,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Render a saved rows file (JSON rows or a Neo4j HTTP response)
    Render {
        /// Rows file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        save_graph: bool,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Render every rows file in a directory, one page per file
    Batch {
        /// Directory of *.json rows files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[arg(long)]
        save_graph: bool,

        #[command(flatten)]
        style: StyleArgs,
    },
}

#[derive(Args, Debug, Default)]
struct StyleArgs {
    /// Entity type drawn in the highlight color
    #[arg(long)]
    highlight_type: Option<String>,

    /// Highlight color (CSS name or hex, e.g. "#3988A4")
    #[arg(long)]
    highlight_color: Option<String>,

    /// How parallel edges between the same two nodes are drawn
    #[arg(long, value_enum)]
    parallel_edges: Option<ParallelEdgesArg>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum ParallelEdgesArg {
    /// One edge per relationship
    Independent,
    /// Parallel edges all show the last relationship of their node pair
    Collapse,
}

impl ParallelEdgesArg {
    fn to_mode(self) -> ParallelEdges {
        match self {
            ParallelEdgesArg::Independent => ParallelEdges::Independent,
            ParallelEdgesArg::Collapse => ParallelEdges::Collapse,
        }
    }
}

impl StyleArgs {
    fn apply(self, mut style: StyleConfig) -> StyleConfig {
        if let Some(entity_type) = self.highlight_type {
            style.highlight_entity_type = entity_type;
        }
        if let Some(color) = self.highlight_color {
            style.highlight_color = color;
        }
        if let Some(mode) = self.parallel_edges {
            style.parallel_edges = mode.to_mode();
        }
        style
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kgviz=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = KgvizConfig::load(Path::new(&cli.config))
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    match cli.command {
        Commands::Query {
            uri,
            user,
            password,
            database,
            query,
            output,
            save_graph,
            style,
        } => {
            let uri = uri.unwrap_or_else(|| config.neo4j.uri.clone());
            let user = user.unwrap_or_else(|| config.neo4j.user.clone());
            let password = password.unwrap_or_else(|| config.neo4j.password.clone());
            let database = database.unwrap_or_else(|| config.neo4j.database.clone());
            let query = query.unwrap_or_else(|| config.query.default.clone());
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.file));
            let options = VisualizeOptions {
                style: style.apply(config.style.clone()),
                save_graph: save_graph || config.output.save_graph,
            };

            let store = Neo4jHttpStore::new(&uri, database, user, password)?;
            info!(uri = %uri, "querying graph store");
            let path = visualize(&store, &query, &output, &options)
                .await
                .context("visualization failed")?;
            println!("Graph visualization saved to {}", path.display());
        }

        Commands::Render {
            input,
            output,
            save_graph,
            style,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&config.output.file));
            let options = VisualizeOptions {
                style: style.apply(config.style.clone()),
                save_graph: save_graph || config.output.save_graph,
            };

            let store = RowsFileStore::new(&input);
            let path = visualize(&store, "", &output, &options)
                .await
                .with_context(|| format!("failed to render {}", input.display()))?;
            println!("Graph visualization saved to {}", path.display());
        }

        Commands::Batch {
            input_dir,
            output_dir,
            save_graph,
            style,
        } => {
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&config.output.directory));
            fs::create_dir_all(&output_dir)?;
            let options = VisualizeOptions {
                style: style.apply(config.style.clone()),
                save_graph: save_graph || config.output.save_graph,
            };

            let inputs = rows_files(&input_dir)?;
            println!(
                "Rendering {} files from {}...",
                inputs.len(),
                input_dir.display()
            );

            let mut failed = 0usize;
            for input in &inputs {
                let Some(stem) = input.file_stem() else {
                    continue;
                };
                let output = output_dir.join(format!("{}.html", stem.to_string_lossy()));
                let store = RowsFileStore::new(input);
                match visualize(&store, "", &output, &options).await {
                    Ok(path) => println!("  Created {}", path.display()),
                    Err(err) => {
                        failed += 1;
                        error!(input = %input.display(), error = %err, "render failed");
                    }
                }
            }

            if failed > 0 {
                bail!("{failed} of {} files failed to render", inputs.len());
            }
            println!("Done! Visualizations saved to {}", output_dir.display());
        }
    }

    Ok(())
}

/// Rows files in `dir`, sorted, skipping graph exports written by
/// `--save-graph`.
fn rows_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("cannot read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .filter(|path| {
            !path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".graph.json"))
        })
        .collect();
    files.sort();
    Ok(files)
}
