//! Schemawire CLI - inspect, transform and run GraphQL schemas.
//!
//! Usage:
//!   schemawire print <sdl...>                      # Canonical SDL
//!   schemawire stats <sdl...>                      # Type counts as JSON
//!   schemawire rename <sdl> --from A --to B        # Rename a type everywhere
//!   schemawire prune <sdl>                         # Drop unused and empty types
//!   schemawire exec <sdl> --query '{ hello }'      # Run a query against fixtures

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use schemawire::graphql::{ExecutableSchema, ExecutorOptions, GraphQLRequest};
use schemawire::{
    make_executable_schema, map_schema, print_schema, prune_schema, ExecutableSchemaDefinition, Mapped, MapperKind,
    PruneOptions, ResolverMap, SchemaConfig, SchemaGraph, SchemaMapper,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemawire")]
#[command(about = "Schemawire - GraphQL schema graph toolkit", long_about = None)]
struct Cli {
    /// TOML config with [parse], [validation], [build] and [pruning] sections
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the schema and print it as canonical SDL
    Print {
        /// SDL files, concatenated in order
        #[arg(required = true)]
        sdl: Vec<PathBuf>,
    },

    /// Show type and field counts
    Stats {
        #[arg(required = true)]
        sdl: Vec<PathBuf>,
    },

    /// Rename a type and every reference to it
    Rename {
        sdl: PathBuf,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// Remove unused and empty types
    Prune { sdl: PathBuf },

    /// Execute a query with constant resolvers from a JSON fixture
    Exec {
        sdl: PathBuf,

        /// Query document
        #[arg(short, long)]
        query: String,

        /// JSON fixture shaped {"Type": {"field": value}}
        #[arg(short, long)]
        resolvers: Option<PathBuf>,

        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,

        /// Operation to run when the document has several
        #[arg(long)]
        operation: Option<String>,

        /// Attach errorType and stacktrace to resolver errors
        #[arg(long)]
        debug: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schemawire=info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SchemaConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => SchemaConfig::default(),
    };

    match cli.command {
        Commands::Print { sdl } => {
            let graph = build(&sdl, &config, None)?;
            print!("{}", print_schema(&graph));
        }

        Commands::Stats { sdl } => {
            let graph = build(&sdl, &config, None)?;
            println!("{}", serde_json::to_string_pretty(&graph.stats())?);
        }

        Commands::Rename { sdl, from, to } => {
            let graph = build(&[sdl], &config, None)?;
            if graph.get_type(&from).is_none() {
                bail!("Unknown type \"{}\"", from);
            }
            let mapper = SchemaMapper::new().on_type(MapperKind::Type, move |ty, _| {
                if ty.name == from {
                    Mapped::Rename(to.clone(), ty.clone())
                } else {
                    Mapped::Keep
                }
            });
            print!("{}", print_schema(&map_schema(&graph, &mapper)?));
        }

        Commands::Prune { sdl } => {
            let graph = build(&[sdl], &config, None)?;
            let options = config.pruning.as_ref().map(PruneOptions::from).unwrap_or_default();
            let pruned = prune_schema(&graph, &options)?;
            info!(
                before = graph.stats().type_count,
                after = pruned.stats().type_count,
                "pruned"
            );
            print!("{}", print_schema(&pruned));
        }

        Commands::Exec {
            sdl,
            query,
            resolvers,
            variables,
            operation,
            debug,
        } => {
            let fixtures = match resolvers {
                Some(path) => {
                    let text = read(&path)?;
                    let json: serde_json::Value =
                        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
                    ResolverMap::from_json_constants(&json)?
                }
                None => ResolverMap::new(),
            };
            let graph = build(&[sdl], &config, Some(fixtures))?;

            let mut request = GraphQLRequest::new(query);
            if let Some(variables) = variables {
                request = request.variables(serde_json::from_str(&variables).context("parsing --variables")?);
            }
            if let Some(operation) = operation {
                request = request.operation_name(operation);
            }

            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(async {
                let options = ExecutorOptions {
                    debug,
                    ..ExecutorOptions::default()
                };
                let schema = ExecutableSchema::with_options(graph, options)?;
                anyhow::Ok(schema.execute(request, None, None).await)
            })?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn build(paths: &[PathBuf], config: &SchemaConfig, resolvers: Option<ResolverMap>) -> Result<SchemaGraph> {
    let sources = paths.iter().map(|p| read(p)).collect::<Result<Vec<_>>>()?;
    let mut definition = ExecutableSchemaDefinition::new(sources).with_config(config);
    // Pruning is its own subcommand.
    definition.pruning_options = None;
    if let Some(resolvers) = resolvers {
        definition = definition.with_resolvers(resolvers);
    }
    let graph = make_executable_schema(definition)?;
    Ok(graph)
}
