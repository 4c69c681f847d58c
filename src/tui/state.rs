use crate::engine::access::{self, PredictionView, ViewerContext};
use crate::engine::listing::{self, DateWindow, TypeSelector};
use crate::model::Prediction;
use crate::service::Dashboard;
use chrono::{DateTime, FixedOffset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Predictions,
    Dashboard,
    Admin,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Self::Predictions => "Predictions",
            Self::Dashboard => "Dashboard",
            Self::Admin => "Admin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub viewer: ViewerContext,
    pub tab: Tab,
    pub types: TypeSelector,
    pub window: DateWindow,
    /// Rows of the last listing fetch, replaced wholesale on refresh.
    pub records: Vec<Prediction>,
    pub dashboard: Dashboard,
    pub admin_rows: Vec<Prediction>,
    pub selected: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub now: DateTime<FixedOffset>,
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl AppState {
    pub fn new(viewer: ViewerContext, types: TypeSelector, window: DateWindow, now: DateTime<FixedOffset>) -> Self {
        Self {
            viewer,
            tab: Tab::Predictions,
            types,
            window,
            records: Vec::new(),
            dashboard: Dashboard::default(),
            admin_rows: Vec::new(),
            selected: 0,
            loading: true,
            error: None,
            now,
            updated_at: None,
        }
    }

    pub fn tabs(&self) -> Vec<Tab> {
        let mut tabs = vec![Tab::Predictions, Tab::Dashboard];
        if self.viewer.is_admin() {
            tabs.push(Tab::Admin);
        }
        tabs
    }

    pub fn next_tab(&mut self) {
        let tabs = self.tabs();
        let i = tabs.iter().position(|t| *t == self.tab).unwrap_or(0);
        self.tab = tabs[(i + 1) % tabs.len()];
    }

    pub fn visible(&self) -> Vec<&Prediction> {
        listing::filter(&self.records, self.types, self.window, self.now)
    }

    pub fn selected_view(&self) -> Option<PredictionView<'_>> {
        self.visible()
            .get(self.selected)
            .copied()
            .map(|p| access::present(&self.viewer, p))
    }

    pub fn select_next(&mut self) {
        let n = self.visible().len();
        if n > 0 {
            self.selected = (self.selected + 1).min(n - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn cycle_window(&mut self) {
        self.window = self.window.next();
        self.selected = 0;
    }

    pub fn cycle_types(&mut self) {
        self.types = self.types.next();
        self.selected = 0;
    }

    pub fn reset_filters(&mut self) {
        self.types = TypeSelector::All;
        self.window = DateWindow::Today;
        self.selected = 0;
    }

    /// "Showing all types for today"
    pub fn summary(&self) -> String {
        format!("Showing {} for {}", self.types, self.window)
    }
}
