//! shelter CLI - inspect and maintain the proxy's cache database.
//!
//! Commands:
//! - `shelter generations` - List stored cache generations
//! - `shelter provision` - Provision the configured generation
//! - `shelter activate` - Retire every generation except the configured one
//! - `shelter route <url>` - Show which strategy a request would get
//! - `shelter show <url>` - Show the entry stored for a request

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::json;
use shelter_client::{FetchConfig, HttpNetwork};
use shelter_core::url::{canonicalize, normalize};
use shelter_core::{
    AppConfig, CacheDb, CacheStore, ProvisionReport, ProxyController, RequestDescriptor, RequestKey,
};
use tracing_subscriber::EnvFilter;
use url::Url;

/// shelter - offline-first caching proxy maintenance
#[derive(Parser)]
#[command(name = "shelter")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path (overrides SHELTER_CONFIG_FILE)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored cache generations
    Generations,

    /// Fetch every static asset into the configured generation
    Provision {
        /// Fail if any asset could not be stored
        #[arg(long)]
        strict: bool,
    },

    /// Retire every generation except the configured one
    Activate,

    /// Show which strategy the proxy would apply to a request
    Route {
        /// Request URL, absolute or relative to the origin
        url: String,

        /// Request method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Treat the request as a top-level navigation
        #[arg(long)]
        navigate: bool,
    },

    /// Show the cached entry for a request in the configured generation
    Show {
        /// Request URL, absolute or relative to the origin
        url: String,

        /// Request method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
    },
}

struct Session {
    config: AppConfig,
    db: Arc<CacheDb>,
    json: bool,
}

impl Session {
    async fn load(cli: &Cli) -> Result<Self> {
        let config = AppConfig::load_from(cli.config.clone().or_else(|| {
            std::env::var("SHELTER_CONFIG_FILE").ok().map(PathBuf::from)
        }))?;
        let db = CacheDb::open(&config.db_path)
            .await
            .with_context(|| format!("opening {}", config.db_path.display()))?;
        Ok(Self { config, db: Arc::new(db), json: cli.json })
    }

    fn controller(&self) -> Result<ProxyController> {
        let network = HttpNetwork::new(FetchConfig::from(&self.config))?;
        Ok(ProxyController::new(self.config.settings()?, self.db.clone(), Arc::new(network)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::from_default_env() };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Session::load(&cli).await?;

    let result = match &cli.command {
        Commands::Generations => generations(&ctx).await,
        Commands::Provision { strict } => provision(&ctx, *strict).await,
        Commands::Activate => activate(&ctx).await,
        Commands::Route { url, method, navigate } => route(&ctx, url, method, *navigate),
        Commands::Show { url, method } => show(&ctx, url, method).await,
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn generations(ctx: &Session) -> Result<()> {
    let current = ctx.config.settings()?.generation;
    let mut rows = Vec::new();
    for generation in ctx.db.generations().await? {
        let entries = ctx.db.entry_count(&generation).await?;
        rows.push((generation.clone(), entries, generation == current));
    }

    if ctx.json {
        let value: Vec<_> = rows
            .iter()
            .map(|(id, entries, current)| json!({ "generation": id, "entries": entries, "current": current }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("no generations stored");
    }
    for (id, entries, current) in rows {
        let marker = if current { "*" } else { " " };
        println!("{marker} {id}\t{entries} entries");
    }
    Ok(())
}

async fn provision(ctx: &Session, strict: bool) -> Result<()> {
    let report = ctx.controller()?.on_init().await?;
    print_report(ctx, &report)?;
    if strict {
        report.into_strict()?;
    }
    Ok(())
}

fn print_report(ctx: &Session, report: &ProvisionReport) -> Result<()> {
    if ctx.json {
        let failed: Vec<_> = report
            .failed
            .iter()
            .map(|f| json!({ "url": f.url.as_str(), "reason": f.reason }))
            .collect();
        let value = json!({
            "generation": report.generation,
            "stored": report.stored.iter().map(|u| u.as_str()).collect::<Vec<_>>(),
            "failed": failed,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("generation {}: {}/{} assets stored", report.generation, report.stored.len(), report.total());
    for failure in &report.failed {
        println!("  failed {}: {}", failure.url, failure.reason);
    }
    Ok(())
}

async fn activate(ctx: &Session) -> Result<()> {
    let controller = ctx.controller()?;
    let retired = controller.on_activate().await?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&json!({ "current": controller.generation(), "retired": retired }))?);
    } else if retired.is_empty() {
        println!("{} is the only generation", controller.generation());
    } else {
        for id in &retired {
            println!("retired {id}");
        }
    }
    Ok(())
}

fn parse_target(origin: &Url, target: &str, method: &str) -> Result<(Url, Method)> {
    let url = if target.starts_with('/') {
        origin.join(target).map(|u| normalize(&u))?
    } else {
        canonicalize(target)?
    };
    let method = Method::from_bytes(method.to_uppercase().as_bytes()).context("invalid method")?;
    Ok((url, method))
}

fn route(ctx: &Session, target: &str, method: &str, navigate: bool) -> Result<()> {
    let settings = ctx.config.settings()?;
    let (url, method) = parse_target(&settings.origin, target, method)?;
    let controller = ctx.controller()?;
    let strategy = controller.rules().select(&RequestDescriptor { method: method.clone(), url: url.clone(), navigate });

    if ctx.json {
        let value = json!({ "method": method.as_str(), "url": url.as_str(), "strategy": strategy.as_str() });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{} {} -> {}", method, url, strategy);
    }
    Ok(())
}

async fn show(ctx: &Session, target: &str, method: &str) -> Result<()> {
    let settings = ctx.config.settings()?;
    let (url, method) = parse_target(&settings.origin, target, method)?;
    let key = RequestKey::new(&method, &url);

    let Some(response) = ctx.db.lookup(&settings.generation, &key).await? else {
        bail!("no entry for {} {} in {}", method, url, settings.generation);
    };

    if ctx.json {
        let headers: Vec<_> = response
            .headers
            .iter()
            .map(|(name, value)| json!([name.as_str(), value.to_str().unwrap_or_default()]))
            .collect();
        let value = json!({
            "key": key.hash,
            "status": response.status.as_u16(),
            "headers": headers,
            "bytes": response.body.len(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} {} ({})", method, url, key.hash);
    println!("status: {}", response.status);
    for (name, value) in &response.headers {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    println!("{} bytes", response.body.len());
    Ok(())
}
