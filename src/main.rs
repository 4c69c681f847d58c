use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tipster::cli::{self, Cli, Commands};
use tipster::config::{self as cfg, Config};
use tipster::engine::access::{self, SubscriptionTier, ViewerContext};
use tipster::engine::admin::PredictionDraft;
use tipster::model::Outcome;
use tipster::service::TipService;
use tipster::store::{memory::MemoryStore, PredictionStore};
use tipster::supabase::{auth::SupabaseAuth, rest::SupabaseRest};
use tipster::tui::{self, state::AppState};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create("tipster.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tipster=info")))
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    // Load saved keys from .env (real env vars take precedence)
    Config::load_env_file();
    let mut config = Config::load(&cli.config)?;
    config.apply_env_overrides();

    let command = cli.command.clone().unwrap_or(Commands::Browse);

    let (store, rest): (Arc<dyn PredictionStore>, Option<Arc<SupabaseRest>>) = match cli.offline {
        Some(ref path) => {
            let memory: Arc<dyn PredictionStore> = Arc::new(MemoryStore::from_json_file(path)?);
            (memory, None)
        }
        None => {
            let anon_key = Config::supabase_anon_key()?;
            let auth = Arc::new(SupabaseAuth::new(anon_key, Config::supabase_access_token()));
            let rest = Arc::new(SupabaseRest::new(auth, &config.supabase));
            let store: Arc<dyn PredictionStore> = rest.clone();
            (store, Some(rest))
        }
    };

    if let Commands::Login { ref email } = command {
        let rest = rest.context("login needs the hosted backend (drop --offline)")?;
        return login(&rest, email.clone()).await;
    }

    let now = config.display.now()?;
    let viewer = match rest {
        Some(ref rest) => rest.resolve_viewer(now.with_timezone(&Utc)).await?,
        None => cli.viewer.context(),
    };
    let service = Arc::new(TipService::new(store, viewer.clone()));

    match command {
        Commands::Browse => browse(service, &config, viewer).await,
        Commands::List { kind, date, limit } => {
            let kind = kind.unwrap_or_else(|| config.listing.default_type.clone());
            let date = date.unwrap_or_else(|| config.listing.default_date.clone());
            let visible = service.named_listing(&kind, &date, limit, now).await?;
            println!("{} predictions found (showing {} for {})", visible.len(), kind, date);
            println!();
            for p in &visible {
                print!("{}", cli::format_card(&access::present(&viewer, p), now.timezone()));
            }
            Ok(())
        }
        Commands::Dashboard => {
            let dash = service.dashboard(now, config.listing.recent_limit).await?;
            println!("Welcome back, {}!  {}", viewer.display_name(), now.format("%A, %B %d, %Y"));
            if let Some(tier) = viewer.tier() {
                println!("{}", tier);
            }
            println!("{}", cli::format_record(&dash.record));
            println!();
            println!("Today's Predictions ({} tips available)", dash.today.len());
            for p in &dash.today {
                print!("{}", cli::format_card(&access::present(&viewer, p), now.timezone()));
            }
            println!();
            println!("Recent Activity");
            for p in &dash.recent {
                print!("{}", cli::format_card(&access::present(&viewer, p), now.timezone()));
            }
            if viewer.tier() == Some(SubscriptionTier::Free) {
                println!();
                println!("Upgrade to Premium: exclusive predictions, detailed analysis, and multi-bet tips");
            }
            Ok(())
        }
        Commands::Stats => {
            let rec = service.track_record().await?;
            println!("{}", cli::format_record(&rec));
            Ok(())
        }
        Commands::Add { draft } => {
            let draft = load_draft(&draft)?;
            let row = service.add(&draft, now.timezone()).await?;
            println!("Added {} ({})", row.id, row.matchup());
            Ok(())
        }
        Commands::Settle { id, result } => {
            let outcome: Outcome = result.parse()?;
            let row = service.settle(&id, outcome).await?;
            println!("Settled {} ({}) as {}", row.id, row.matchup(), row.result);
            Ok(())
        }
        Commands::Login { .. } => Ok(()),
    }
}

async fn browse(service: Arc<TipService>, config: &Config, viewer: ViewerContext) -> Result<()> {
    let types = config.listing.type_selector()?;
    let window = config.listing.date_window()?;
    let (state_tx, state_rx) = watch::channel(AppState::new(viewer, types, window, config.display.now()?));
    let (cmd_tx, cmd_rx) = mpsc::channel::<tui::TuiCommand>(16);

    let controller = tokio::spawn(tui::run_controller(
        service,
        config.display.clone(),
        config.listing.clone(),
        state_tx,
        cmd_rx,
    ));

    let result = tui::run_tui(state_rx, cmd_tx).await;
    if let Err(e) = controller.await {
        tracing::error!("controller task failed: {:#}", e);
    }
    tracing::debug!("shutting down");
    result
}

async fn login(rest: &SupabaseRest, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(e) => e,
        None => cfg::prompt("Email")?,
    };
    let password = cfg::prompt("Password")?;
    let session = rest.sign_in_with_password(&email, &password).await?;
    Config::save_access_token(&session.access_token);
    tracing::info!(user = %session.user.id, "signed in");
    println!("  Signed in as {}. Session saved to .env", session.user.email.as_deref().unwrap_or(&email));
    Ok(())
}

fn load_draft(path: &Path) -> Result<PredictionDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft file: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse draft TOML: {}", path.display()))
}
