use crate::engine::access::{Content, Member, PredictionView, SubscriptionTier, ViewerContext, LOCKED_PLACEHOLDER};
use crate::engine::stats::{self, TrackRecord};
use chrono::FixedOffset;
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tipster", version, about = "Expert betting tips: listings, dashboard and admin tools")]
pub struct Cli {
    /// Config file
    #[arg(long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Serve predictions from a JSON export instead of the hosted backend
    #[arg(long, global = true)]
    pub offline: Option<PathBuf>,

    /// Who is looking, for --offline runs
    #[arg(long, global = true, value_enum, default_value_t = OfflineViewer::Anonymous)]
    pub viewer: OfflineViewer,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Interactive browser (default)
    Browse,
    /// Print the filtered listing
    List {
        /// all | single | multi | jackpot
        #[arg(long = "type")]
        kind: Option<String>,
        /// today | tomorrow | week | all
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Today's tips, recent tips and the track record
    Dashboard,
    /// Track record only
    Stats,
    /// Add a prediction from a TOML draft (admins only)
    Add { draft: PathBuf },
    /// Settle a pending prediction as won or lost (admins only)
    Settle { id: String, result: String },
    /// Sign in and keep the session token in .env
    Login {
        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineViewer {
    Anonymous,
    Free,
    Premium,
    Admin,
}

impl OfflineViewer {
    pub fn context(self) -> ViewerContext {
        let member = |tier, is_admin| {
            ViewerContext::member(Member {
                user_id: "offline".to_string(),
                display_name: Some("Offline".to_string()),
                tier,
                is_admin,
            })
        };
        match self {
            Self::Anonymous => ViewerContext::anonymous(),
            Self::Free => member(SubscriptionTier::Free, false),
            Self::Premium => member(SubscriptionTier::Premium, false),
            Self::Admin => member(SubscriptionTier::Premium, true),
        }
    }
}

/// Plain-text card for one prediction.
pub fn format_card(view: &PredictionView<'_>, offset: FixedOffset) -> String {
    let p = view.prediction;
    let mut out = String::new();
    let premium = if p.is_premium { " [premium]" } else { "" };
    let _ = writeln!(
        out,
        "{}  {}  ({}, {}){}  [{}]",
        p.match_date.with_timezone(&offset).format("%b %d, %Y %H:%M"),
        p.matchup(),
        p.league,
        p.prediction_type,
        premium,
        p.result,
    );
    match &view.content {
        Content::Revealed(c) => {
            let _ = write!(out, "    Prediction: {}", c.pick);
            if let Some(conf) = c.confidence {
                let _ = write!(out, "  (confidence {})", conf);
            }
            out.push('\n');
            if let Some(reasoning) = c.reasoning {
                let _ = writeln!(out, "    Analysis: {}", reasoning);
            }
            if !c.odds.is_empty() {
                let odds: Vec<String> = c.odds.iter().map(|(b, price)| format!("{} {:.2}", b, price)).collect();
                let _ = writeln!(out, "    Odds: {}", odds.join(" | "));
            }
        }
        Content::Locked => {
            let _ = writeln!(out, "    {}", LOCKED_PLACEHOLDER);
        }
    }
    out
}

pub fn format_record(rec: &TrackRecord) -> String {
    format!(
        "Success Rate {}  \u{00b7}  Total Tips {} ({} won, {} lost, {} pending)  \u{00b7}  ROI {}  \u{00b7}  Win Streak {}",
        stats::format_rate(rec.success_rate),
        rec.total,
        rec.won,
        rec.lost,
        rec.pending,
        stats::format_roi(rec.roi),
        rec.win_streak,
    )
}
