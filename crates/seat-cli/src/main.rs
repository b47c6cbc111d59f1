mod config;
mod http;
mod remote;
mod server;
mod state;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, service::ServerInitializeError, transport::stdio};
use seat_core::{NearbyOutcome, PreferenceInput, RecommendationSet, TurnOutcome};
use seat_store::CatalogStore;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::state::AppState;

const CATALOG_FILE: &str = "catalog.db";

#[derive(Parser)]
#[command(name = "seats", about = "Seat advisor CLI, MCP server and HTTP API")]
struct Cli {
    /// Catalog database path (default: <data dir>/catalog.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Start the HTTP JSON API
    Http {
        /// Address to bind (overrides [http].bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Recommend seats for a set of preferences
    Recommend {
        /// Maximum price
        #[arg(long)]
        budget: Option<f64>,
        /// required, preferred or optional
        #[arg(long)]
        ac: Option<String>,
        /// View importance, 0-10
        #[arg(long)]
        view: Option<f64>,
        /// Prefer seats with a famous former occupant
        #[arg(long)]
        famous: bool,
        /// aisle, center or any
        #[arg(long)]
        position: Option<String>,
        /// front, middle, back or any
        #[arg(long)]
        location: Option<String>,
        /// Number of seats to show
        #[arg(long)]
        limit: Option<usize>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find available seats near a customer's booking
    Nearby {
        /// Customer name (or part of it)
        customer: String,
        /// Booking id, when several bookings match
        #[arg(long)]
        booking: Option<i64>,
        /// Number of seats to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Chat with the advisor, one message per stdin line
    Chat,

    /// Book a seat for a customer
    Book {
        name: String,
        email: String,
        seat: i64,
    },

    /// Populate an empty catalog with the reference venue
    Seed,

    /// Show catalog statistics
    Stats,

    /// Export the catalog to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import the catalog from a JSON file, replacing it
    Import {
        /// Input file path
        path: PathBuf,
    },
}

fn data_dir() -> PathBuf {
    std::env::var("SEATS_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(seat_store::default_base_dir)
}

fn open_store(cli: &Cli) -> Result<CatalogStore> {
    let path = match &cli.db {
        Some(path) => path.clone(),
        None => {
            let dir = data_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            dir.join(CATALOG_FILE)
        }
    };
    CatalogStore::open(&path).with_context(|| format!("failed to open {}", path.display()))
}

/// Open the catalog, seeding the reference venue on first use.
fn open_seeded_store(cli: &Cli) -> Result<CatalogStore> {
    let store = open_store(cli)?;
    store
        .seed_default_venue()
        .context("failed to seed reference venue")?;
    Ok(store)
}

fn open_state(cli: &Cli) -> Result<(Config, Arc<AppState>)> {
    let config = Config::load(&data_dir())?;
    let store = open_seeded_store(cli)?;
    let state = Arc::new(AppState::from_config(&config, store));
    Ok((config, state))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Http { bind } => cmd_http(&cli, bind.as_deref()).await,
        Commands::Recommend {
            budget,
            ac,
            view,
            famous,
            position,
            location,
            limit,
            json,
        } => {
            let input = PreferenceInput {
                budget_max: *budget,
                ac_importance: ac.clone(),
                view_importance: *view,
                famous_people: famous.then_some(true),
                position_preference: position.clone(),
                location_preference: location.clone(),
                ..Default::default()
            };
            cmd_recommend(&cli, input, *limit, *json)
        }
        Commands::Nearby {
            customer,
            booking,
            limit,
        } => cmd_nearby(&cli, customer, *booking, *limit),
        Commands::Chat => cmd_chat(&cli).await,
        Commands::Book { name, email, seat } => cmd_book(&cli, name, email, *seat),
        Commands::Seed => cmd_seed(&cli),
        Commands::Stats => cmd_stats(&cli),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let (_, state) = open_state(cli)?;
    tracing::info!("starting MCP server");

    let service = match server::SeatServer::new(state).serve(stdio()).await {
        Ok(service) => service,
        Err(ServerInitializeError::ConnectionClosed(during)) => {
            tracing::info!("client disconnected before initialization ({during})");
            return Ok(());
        }
        Err(e) => return Err(e).context("failed to start MCP server"),
    };
    service.waiting().await?;
    Ok(())
}

async fn cmd_http(cli: &Cli, bind: Option<&str>) -> Result<()> {
    let (config, state) = open_state(cli)?;
    let bind = bind.unwrap_or(&config.http.bind);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let addr = listener.local_addr()?;
    tracing::info!("listening on http://{addr}");
    eprintln!("listening on http://{addr}");

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));
    http::serve(listener, state, shutdown)
        .await
        .context("HTTP server failed")?;
    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("shutdown requested");
    token.cancel();
}

fn cmd_recommend(
    cli: &Cli,
    input: PreferenceInput,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let limit = server::check_limit(limit).map_err(anyhow::Error::msg)?;
    let (_, state) = open_state(cli)?;
    let catalog = state.catalog().context("failed to load catalog")?;
    let set = state.advisor.recommend(&catalog.seats, input, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
    } else {
        print_recommendations(&set);
    }
    Ok(())
}

fn print_recommendations(set: &RecommendationSet) {
    for (rank, rec) in set.recommendations.iter().enumerate() {
        println!(
            "{}. {} ${:.0}  score {} ({})",
            rank + 1,
            rec.seat.label(),
            rec.seat.price,
            rec.score,
            rec.match_quality.as_str()
        );
        for line in &rec.explanation {
            println!("     - {line}");
        }
    }
    println!("{}", set.summary);
}

fn cmd_nearby(cli: &Cli, customer: &str, booking: Option<i64>, limit: Option<usize>) -> Result<()> {
    let limit = server::check_limit(limit).map_err(anyhow::Error::msg)?;
    let (_, state) = open_state(cli)?;
    let outcome = state
        .nearby(customer, booking, None, limit)
        .context("failed to load catalog")?;

    match outcome {
        NearbyOutcome::CustomerNotFound => {
            anyhow::bail!("no booking found for {customer:?}");
        }
        NearbyOutcome::SeatMissing { booking } => {
            anyhow::bail!(
                "booking {} refers to seat {} which is not in the catalog",
                booking.id,
                booking.seat_id
            );
        }
        NearbyOutcome::Ambiguous { matches } => {
            println!("several bookings match {customer:?}; pass --booking <id>:");
            for b in matches {
                println!("  {}  {} <{}>  seat {}", b.id, b.customer_name, b.email, b.seat_id);
            }
        }
        NearbyOutcome::Found {
            booking,
            reference,
            nearby,
        } => {
            println!("{} is in {}", booking.customer_name, reference.label());
            if nearby.is_empty() {
                println!("no available seats nearby");
            }
            for n in nearby {
                println!("  {}  ${:.0}  distance {}", n.seat.label(), n.seat.price, n.distance);
            }
        }
    }
    Ok(())
}

async fn cmd_chat(cli: &Cli) -> Result<()> {
    let (_, state) = open_state(cli)?;
    // The remote extractor blocks; keep the whole loop off the runtime.
    tokio::task::spawn_blocking(move || chat_loop(&state))
        .await
        .context("chat loop panicked")?
}

fn chat_loop(state: &AppState) -> Result<()> {
    let catalog = state.catalog().context("failed to load catalog")?;
    let mut session_id: Option<String> = None;

    for line in std::io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        let reply = state
            .advisor
            .chat_turn(&catalog.seats, message, session_id.as_deref());
        println!("{}", reply.reply);
        if let TurnOutcome::RefinementUnavailable { reason } = &reply.outcome {
            tracing::debug!("refinement unavailable: {reason}");
        }
        if let Some(set) = &reply.recommendations {
            print_recommendations(set);
        }
        session_id = Some(reply.session_id);
    }
    Ok(())
}

fn cmd_book(cli: &Cli, name: &str, email: &str, seat: i64) -> Result<()> {
    let store = open_seeded_store(cli)?;
    let booking_id = store
        .record_booking(name, email, seat)
        .context("failed to book seat")?;
    println!("booked seat {seat} for {name} (booking {booking_id})");
    Ok(())
}

fn cmd_seed(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let seeded = store
        .seed_default_venue()
        .context("failed to seed reference venue")?;
    if seeded == 0 {
        println!("catalog already has {} seats", store.seat_count()?);
    } else {
        println!("seeded {seeded} seats");
    }
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let bookings = store.load_bookings().context("failed to load bookings")?;

    println!("seats:      {}", store.seat_count()?);
    println!("available:  {}", store.available_count()?);
    println!("bookings:   {}", bookings.len());
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    store
        .export_json_file(path)
        .context("failed to export catalog")?;

    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let store = open_store(cli)?;
    let seats = store
        .import_json_file(path)
        .context("failed to import JSON")?;

    println!(
        "imported from {}. seats={}, available={}",
        path.display(),
        seats,
        store.available_count()?
    );
    Ok(())
}
