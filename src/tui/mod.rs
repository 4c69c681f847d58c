pub mod render;
pub mod state;

use crate::config::{DisplayConfig, ListingConfig};
use crate::service::TipService;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use state::AppState;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Commands the TUI sends back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiCommand {
    Quit,
    Refresh,
    NextTab,
    NextType,
    NextDate,
    ResetFilters,
    SelectNext,
    SelectPrev,
}

/// Run the TUI. Reads state from `state_rx`, sends commands on `cmd_tx`.
pub async fn run_tui(
    state_rx: watch::Receiver<AppState>,
    cmd_tx: mpsc::Sender<TuiCommand>,
) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = tui_loop(&mut terminal, state_rx, cmd_tx).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state_rx: watch::Receiver<AppState>,
    cmd_tx: mpsc::Sender<TuiCommand>,
) -> Result<()> {
    loop {
        let state = state_rx.borrow().clone();
        terminal.draw(|f| render::draw(f, &state))?;

        // Poll for keyboard events with 100ms timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let cmd = match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        let _ = cmd_tx.send(TuiCommand::Quit).await;
                        return Ok(());
                    }
                    KeyCode::Char('r') => Some(TuiCommand::Refresh),
                    KeyCode::Tab => Some(TuiCommand::NextTab),
                    KeyCode::Char('t') => Some(TuiCommand::NextType),
                    KeyCode::Char('d') => Some(TuiCommand::NextDate),
                    KeyCode::Char('x') => Some(TuiCommand::ResetFilters),
                    KeyCode::Char('j') | KeyCode::Down => Some(TuiCommand::SelectNext),
                    KeyCode::Char('k') | KeyCode::Up => Some(TuiCommand::SelectPrev),
                    _ => None,
                };
                if let Some(cmd) = cmd {
                    let _ = cmd_tx.send(cmd).await;
                }
            }
        }
        tokio::task::yield_now().await;
    }
}

/// Apply TUI commands to the shared state. Commands are handled one at a
/// time, so there is never more than one fetch in flight.
pub async fn run_controller(
    service: Arc<TipService>,
    display: DisplayConfig,
    listing: ListingConfig,
    state_tx: watch::Sender<AppState>,
    mut cmd_rx: mpsc::Receiver<TuiCommand>,
) {
    refresh(&service, &display, &listing, &state_tx).await;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            TuiCommand::Quit => break,
            TuiCommand::Refresh => refresh(&service, &display, &listing, &state_tx).await,
            // Type narrowing happens server-side, so a new type means a new fetch
            TuiCommand::NextType => {
                state_tx.send_modify(|s| s.cycle_types());
                refresh(&service, &display, &listing, &state_tx).await;
            }
            TuiCommand::ResetFilters => {
                state_tx.send_modify(|s| s.reset_filters());
                refresh(&service, &display, &listing, &state_tx).await;
            }
            TuiCommand::NextDate => {
                let now = display.now().ok();
                state_tx.send_modify(|s| {
                    if let Some(now) = now {
                        s.now = now;
                    }
                    s.cycle_window();
                });
            }
            TuiCommand::NextTab => state_tx.send_modify(|s| s.next_tab()),
            TuiCommand::SelectNext => state_tx.send_modify(|s| s.select_next()),
            TuiCommand::SelectPrev => state_tx.send_modify(|s| s.select_prev()),
        }
    }
    tracing::debug!("controller stopped");
}

/// Fetch every view and replace the previous rows wholesale. A failure
/// leaves an error on the state for the user to retry.
async fn refresh(
    service: &TipService,
    display: &DisplayConfig,
    listing: &ListingConfig,
    state_tx: &watch::Sender<AppState>,
) {
    let types = state_tx.borrow().types;
    state_tx.send_modify(|s| {
        s.loading = true;
        s.error = None;
    });

    let result = async {
        let now = display.now()?;
        let records = service.listing(types, None).await?;
        let dashboard = service.dashboard(now, listing.recent_limit).await?;
        let admin_rows = if service.viewer().is_admin() {
            service.admin_rows(listing.admin_table_rows).await?
        } else {
            Vec::new()
        };
        Ok::<_, anyhow::Error>((now, records, dashboard, admin_rows))
    }
    .await;

    state_tx.send_modify(|s| {
        s.loading = false;
        match result {
            Ok((now, records, dashboard, admin_rows)) => {
                s.now = now;
                s.records = records;
                s.dashboard = dashboard;
                s.admin_rows = admin_rows;
                s.updated_at = Some(now);
                s.selected = s.selected.min(s.visible().len().saturating_sub(1));
            }
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "refresh failed");
                s.error = Some(format!("{:#}", e));
            }
        }
    });
}
