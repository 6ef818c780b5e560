//! FLIX Resolver CLI
//!
//! Usage:
//!   flix-resolver serve [--config <FILE>] [--bind <ADDR>] [--templates <DIR>]
//!   flix-resolver hash [FILE] [--config <FILE>]
//!   flix-resolver resolve-name <NAME> [--names <FILE>]
//!   flix-resolver generate <REPOS> [--flow-cli <BIN>] [--out <DIR>]

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use flix_resolver::canonical::TemplateHashes;
use flix_resolver::generate::{Generator, GeneratorConfig};
use flix_resolver::{
    canonicalize, AliasResolution, AliasTable, AuditorRegistry, FlowAccessClient,
    InMemoryTemplateStore, Network, ResolutionService, ServiceConfig,
};

#[derive(Parser)]
#[command(name = "flix-resolver")]
#[command(about = "Resolve and audit Flow Interaction Templates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Service configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bind address, overriding the config file
        #[arg(short, long)]
        bind: Option<String>,

        /// Template directory, overriding the config file
        #[arg(short, long)]
        templates: Option<PathBuf>,
    },

    /// Print the digests of a Cadence file (reads stdin if not provided)
    Hash {
        input: Option<PathBuf>,

        /// Service configuration supplying address books
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Resolve a human name to a template id
    ResolveName {
        name: String,

        /// Alias table (JSON)
        #[arg(short, long, default_value = "data/names.json")]
        names: PathBuf,
    },

    /// Generate templates from the repositories listed in a TOML file
    Generate {
        repositories: PathBuf,

        /// flow-cli executable
        #[arg(long, default_value = "./flow-cli")]
        flow_cli: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "templates")]
        out: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ServiceConfig> {
    match path {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config '{}'", path.display())),
        None => Ok(ServiceConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            config,
            bind,
            templates,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(bind) = bind {
                config = config.with_bind(bind);
            }
            if let Some(templates) = templates {
                config = config.with_templates_dir(templates);
            }
            serve(config).await
        }
        Command::Hash { input, config } => {
            let config = load_config(config.as_ref())?;
            let source = match &input {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("reading '{}'", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };
            let filename = input
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<stdin>".to_string());
            let form = match canonicalize(&source) {
                Ok(form) => form,
                Err(errors) => {
                    for error in &errors {
                        eprintln!("{}", error.format(&source, &filename));
                    }
                    bail!("{} parse error(s)", errors.len());
                }
            };
            let hashes = TemplateHashes::compute(&form, &config.address_books);
            println!("{}", serde_json::to_string_pretty(&hashes)?);
            Ok(())
        }
        Command::ResolveName { name, names } => {
            let aliases = AliasTable::from_file(&names)
                .with_context(|| format!("loading aliases '{}'", names.display()))?;
            match aliases.resolve(&name) {
                AliasResolution::Resolved(id) => println!("{}", id),
                AliasResolution::Unresolved => bail!("no template named '{}'", name),
                AliasResolution::Cycle { chain } => {
                    bail!("alias chain does not terminate: {}", chain.join(" -> "))
                }
            }
            Ok(())
        }
        Command::Generate {
            repositories,
            flow_cli,
            out,
        } => {
            let config = GeneratorConfig::from_file(&repositories)
                .with_context(|| format!("loading '{}'", repositories.display()))?;
            let reports = Generator::new(flow_cli, out).run(&config).await;
            let mut failed_repositories = 0;
            for report in reports {
                match report {
                    Ok(report) => println!(
                        "{}: {} generated, {} failed",
                        report.repository, report.generated, report.failed
                    ),
                    Err(err) => {
                        failed_repositories += 1;
                        eprintln!("Error: {}", err);
                    }
                }
            }
            if failed_repositories > 0 {
                bail!("{} repositories failed", failed_repositories);
            }
            Ok(())
        }
    }
}

async fn serve(config: ServiceConfig) -> Result<()> {
    let aliases = AliasTable::from_file(&config.names_path)
        .with_context(|| format!("loading aliases '{}'", config.names_path.display()))?;
    let registry = AuditorRegistry::from_file(&config.auditors_path)
        .with_context(|| format!("loading auditors '{}'", config.auditors_path.display()))?;
    let store = InMemoryTemplateStore::load_dir(&config.templates_dir, &config.address_books)
        .with_context(|| format!("loading templates '{}'", config.templates_dir.display()))?;

    let mut client = FlowAccessClient::new(config.query_timeout)?;
    for network in Network::ALL {
        client = client.with_endpoint(network, config.access_node(network));
    }

    let service = ResolutionService::new(
        Arc::new(store),
        Arc::new(client),
        Arc::new(aliases),
        Arc::new(registry),
    )
    .with_address_books(config.address_books.clone())
    .with_query_timeout(config.query_timeout);

    let app = flix_resolver::http::router(Arc::new(service));
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(bind = %config.bind, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
