// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// CONCEPTS RUST :
// 1. State Management : centraliser l'état dans une seule structure
// 2. Injection de dépendance : SettingsStore reçu au constructeur
// 3. Générations : les résultats d'une requête périmée sont ignorés
//
// PATTERN : Cette structure suit le pattern "Application State"
// - Tous les composants de l'UI lisent depuis App
// - Toutes les modifications passent par les méthodes de App
// - Chaque changement de réglage est persisté immédiatement
// ============================================================================

use std::sync::mpsc;

use tracing::{debug, info, warn};

use crate::api::{FetchRequest, ALL_CATEGORIES};
use crate::config::AppConfig;
use crate::models::{Commodity, RangeToken};
use crate::settings::{
    ChartSettings, GridSettings, SettingsChange, SettingsKey, SettingsStore, TableSettings,
    ViewMode,
};
use crate::theme::ThemeController;
use crate::ui::modal::{Adjust, ModalScope, SettingsControl, SettingsModal};
use crate::ui::view::{visible_rows, ViewScope};
use crate::worker::{AppCommand, AppResult};

/// Formats de date proposés dans la modale
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d %b %Y"];

/// Couleurs de courbe proposées (None = palette du thème)
pub const LINE_COLORS: [Option<&str>; 5] = [
    None,
    Some("#60a5fa"),
    Some("#f59e0b"),
    Some("#22c55e"),
    Some("#e879f9"),
];

const FILL_STEP: u8 = 5;
const MA_STEP: usize = 5;

// ============================================================================
// Enums : Screen et LoadState
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : tableau ou grille
    Dashboard,

    /// Graphique de la matière première sélectionnée
    Detail,
}

/// État du chargement courant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    /// Erreur affichée avec une invitation à réessayer
    Failed(String),
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    pub current_screen: Screen,

    /// Dernières données reçues
    pub commodities: Vec<Commodity>,

    /// Index dans les lignes VISIBLES (après filtre et tri)
    pub selected_index: usize,

    pub range: RangeToken,

    /// Catégorie filtrée ("all" = toutes)
    pub category: String,

    /// Catégories connues (apprises lors des chargements "all")
    pub categories: Vec<String>,

    // Réglages en cache (relus à chaque notification du store)
    pub view_mode: ViewMode,
    pub table: TableSettings,
    pub grid: GridSettings,
    pub chart: ChartSettings,

    pub theme: ThemeController,
    pub modal: SettingsModal,
    pub load_state: LoadState,

    /// Two-step quit : première pression de 'q' → confirmation
    pub confirm_quit: bool,

    pub dev_mode: bool,

    /// Message ponctuel affiché dans le footer
    pub status: Option<String>,

    store: SettingsStore,
    settings_rx: mpsc::Receiver<SettingsChange>,

    /// Génération de la dernière requête envoyée
    generation: u64,
}

impl App {
    /// Crée l'application à partir de la configuration et du store injecté
    pub fn new(config: &AppConfig, mut store: SettingsStore) -> Self {
        let settings_rx = store.subscribe();
        let theme = ThemeController::load(&mut store, config.palette.clone());

        let mut app = Self {
            running: true,
            current_screen: Screen::Dashboard,
            commodities: Vec::new(),
            selected_index: 0,
            range: config.default_range,
            category: config.default_category.clone(),
            categories: Vec::new(),
            view_mode: ViewMode::default(),
            table: TableSettings::default(),
            grid: GridSettings::default(),
            chart: ChartSettings::default(),
            theme,
            modal: SettingsModal::new(),
            load_state: LoadState::Idle,
            confirm_quit: false,
            dev_mode: config.dev_mode,
            status: None,
            store,
            settings_rx,
            generation: 0,
        };
        app.reload_all_settings();

        if app.store.is_degraded() {
            app.status = Some("Settings storage unavailable, changes kept in memory".into());
        }
        app
    }

    /// App sur un store en mémoire (tests)
    pub fn in_memory() -> Self {
        Self::new(&AppConfig::default(), SettingsStore::in_memory())
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn store_mut(&mut self) -> &mut SettingsStore {
        &mut self.store
    }

    // ========================================================================
    // Réglages
    // ========================================================================

    fn reload_all_settings(&mut self) {
        for key in SettingsKey::ALL {
            self.reload_settings(key);
        }
    }

    /// Relit une zone de réglages depuis le store
    fn reload_settings(&mut self, key: SettingsKey) {
        match key {
            SettingsKey::ViewMode => self.view_mode = self.store.load(),
            SettingsKey::TableSettings => self.table = self.store.load::<TableSettings>().clamped(),
            SettingsKey::GridSettings => self.grid = self.store.load::<GridSettings>().clamped(),
            SettingsKey::ChartSettings => self.chart = self.store.load::<ChartSettings>().clamped(),
            SettingsKey::Theme | SettingsKey::MarketTheme => self.theme.reload(&mut self.store),
        }
    }

    /// Tick : appelé à chaque itération de la boucle
    ///
    /// Synchronise les caches avec les notifications du store.
    pub fn tick(&mut self) {
        // CONCEPT RUST : try_iter() vide le channel sans bloquer
        let changed: Vec<SettingsKey> = self.settings_rx.try_iter().map(|c| c.key).collect();
        for key in changed {
            debug!(key = %key, "Settings changed, refreshing cache");
            self.reload_settings(key);
        }
    }

    pub fn toggle_view_mode(&mut self) {
        self.view_mode = self.view_mode.toggle();
        self.store.store(&self.view_mode);
        info!(view = %self.view_mode.label(), "View mode changed");
        self.clamp_selection();
    }

    pub fn cycle_theme(&mut self) {
        self.theme.cycle_theme(&mut self.store);
    }

    pub fn toggle_market_theme(&mut self) {
        self.theme.toggle_market_theme(&mut self.store);
    }

    // ========================================================================
    // Données et chargement
    // ========================================================================

    /// Plage et catégorie courantes
    pub fn scope(&self) -> ViewScope {
        ViewScope::new(self.range, self.category.clone())
    }

    /// Lignes visibles dans l'ordre d'affichage de la vue active
    pub fn visible_commodities(&self) -> Vec<&Commodity> {
        let sort = match self.view_mode {
            ViewMode::Table => &self.table.sort,
            ViewMode::Grid => &self.grid.sort,
        };
        visible_rows(&self.commodities, &self.scope(), sort)
    }

    /// Décimales des prix de la vue active (reprises par le graphique)
    pub fn price_decimals(&self) -> u8 {
        match self.view_mode {
            ViewMode::Table => self.table.price_decimals,
            ViewMode::Grid => self.grid.price_decimals,
        }
    }

    pub fn selected_commodity(&self) -> Option<&Commodity> {
        self.visible_commodities().get(self.selected_index).copied()
    }

    /// Prépare une nouvelle requête (nouvelle génération)
    ///
    /// Retourne la commande à envoyer au worker.
    pub fn request_load(&mut self) -> AppCommand {
        self.generation += 1;
        self.load_state = LoadState::Loading;

        let request = FetchRequest::new(self.range, self.category.clone());
        debug!(generation = self.generation, range = %self.range, category = %self.category, "Load requested");

        AppCommand::LoadCommodities {
            request,
            generation: self.generation,
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    /// Applique un résultat du worker
    ///
    /// Retourne false si le résultat est périmé (génération ancienne).
    pub fn apply_result(&mut self, result: AppResult) -> bool {
        if result.generation() != self.generation {
            debug!(
                stale = result.generation(),
                current = self.generation,
                "Dropping stale result"
            );
            return false;
        }

        match result {
            AppResult::CommoditiesLoaded {
                request,
                commodities,
                ..
            } => {
                let selected_id = self.selected_commodity().map(|c| c.id.clone());

                if request.category_filter().is_none() {
                    self.learn_categories(&commodities);
                }
                self.commodities = commodities;
                self.load_state = LoadState::Loaded;

                // Garde la même ligne sélectionnée si elle existe encore
                self.selected_index = self.position_of(selected_id.as_deref()).unwrap_or(0);
                self.clamp_selection();
            }
            AppResult::LoadFailed { error, .. } => {
                warn!(error = %error, "Load failed, waiting for retry");
                self.load_state = LoadState::Failed(error);
            }
        }
        true
    }

    fn learn_categories(&mut self, commodities: &[Commodity]) {
        let mut categories: Vec<String> = commodities
            .iter()
            .map(|c| c.category.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        self.categories = categories;
    }

    /// Change la plage ; retourne la commande de chargement si elle a changé
    pub fn set_range(&mut self, range: RangeToken) -> Option<AppCommand> {
        if range == self.range {
            return None;
        }
        self.range = range;
        info!(range = %range, "Range changed");
        Some(self.request_load())
    }

    pub fn next_range(&mut self) -> Option<AppCommand> {
        self.set_range(self.range.next())
    }

    pub fn previous_range(&mut self) -> Option<AppCommand> {
        self.set_range(self.range.previous())
    }

    /// Catégorie suivante : all → energy → metal → ... → all
    pub fn cycle_category(&mut self) -> AppCommand {
        let current = self
            .categories
            .iter()
            .position(|c| c.eq_ignore_ascii_case(&self.category));

        self.category = match current {
            None if !self.categories.is_empty()
                && self.category.eq_ignore_ascii_case(ALL_CATEGORIES) =>
            {
                self.categories[0].clone()
            }
            Some(i) if i + 1 < self.categories.len() => self.categories[i + 1].clone(),
            _ => ALL_CATEGORIES.to_string(),
        };
        info!(category = %self.category, "Category changed");
        self.selected_index = 0;
        self.request_load()
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Position d'un identifiant dans les lignes visibles
    fn position_of(&self, id: Option<&str>) -> Option<usize> {
        let id = id?;
        self.visible_commodities().iter().position(|c| c.id == id)
    }

    fn clamp_selection(&mut self) {
        let max_index = self.visible_commodities().len().saturating_sub(1);
        self.selected_index = self.selected_index.min(max_index);
    }

    /// Pas vertical : 1 ligne (tableau) ou une rangée de cartes (grille)
    fn vertical_step(&self) -> usize {
        match self.view_mode {
            ViewMode::Table => 1,
            ViewMode::Grid => self.grid.columns.max(1) as usize,
        }
    }

    pub fn navigate_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(self.vertical_step());
    }

    pub fn navigate_down(&mut self) {
        let max_index = self.visible_commodities().len().saturating_sub(1);
        let next = self.selected_index + self.vertical_step();
        if next <= max_index {
            self.selected_index = next;
        }
    }

    pub fn navigate_left(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn navigate_right(&mut self) {
        let max_index = self.visible_commodities().len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max_index);
    }

    pub fn show_detail(&mut self) {
        if self.selected_commodity().is_some() {
            self.current_screen = Screen::Detail;
        }
    }

    pub fn show_dashboard(&mut self) {
        self.current_screen = Screen::Dashboard;
    }

    pub fn is_on_dashboard(&self) -> bool {
        self.current_screen == Screen::Dashboard
    }

    pub fn is_on_detail(&self) -> bool {
        self.current_screen == Screen::Detail
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Modale de réglages
    // ========================================================================

    /// Zone éditée selon l'écran et la vue
    pub fn modal_scope(&self) -> ModalScope {
        match (self.current_screen, self.view_mode) {
            (Screen::Detail, _) => ModalScope::Chart,
            (Screen::Dashboard, ViewMode::Table) => ModalScope::Table,
            (Screen::Dashboard, ViewMode::Grid) => ModalScope::Grid,
        }
    }

    pub fn open_settings(&mut self) {
        let scope = self.modal_scope();
        let selected_id = self.selected_commodity().map(|c| c.id.clone());
        self.modal.open(scope, selected_id);
        debug!(?scope, "Settings modal opened");
    }

    /// Ferme la modale et restaure la sélection
    ///
    /// La ligne est retrouvée par identifiant (le tri a pu changer) ;
    /// si elle a disparu, on garde l'index courant borné.
    pub fn close_settings(&mut self) {
        let return_id = self.modal.close();
        if let Some(index) = self.position_of(return_id.as_deref()) {
            self.selected_index = index;
        }
        self.clamp_selection();
        debug!("Settings modal closed");
    }

    /// Applique l'action sur le contrôle focalisé
    pub fn adjust_focused(&mut self, adjust: Adjust) {
        if let Some(control) = self.modal.focused() {
            self.apply_control(control, adjust);
        }
    }

    /// Modifie un réglage et le persiste immédiatement
    pub fn apply_control(&mut self, control: SettingsControl, adjust: Adjust) {
        use SettingsControl as C;

        let up = adjust != Adjust::Decrease;
        match control {
            C::Close => {
                if adjust == Adjust::Activate {
                    self.close_settings();
                }
                return;
            }
            C::ResetDefaults => {
                if adjust == Adjust::Activate {
                    self.reset_scope_defaults();
                }
                return;
            }
            C::Theme => {
                let theme = if up {
                    self.theme.theme().next()
                } else {
                    previous_theme(self.theme.theme())
                };
                self.theme.set_theme(&mut self.store, theme);
                return;
            }
            C::MarketTheme => {
                self.toggle_market_theme();
                return;
            }

            // Tableau
            C::Column(column) => self.table.columns.toggle(column),
            C::TableSortColumn => self.table.sort.next_column(),
            C::TableSortDirection => self.table.sort.descending = !self.table.sort.descending,
            C::TableDecimals => self.table.price_decimals = step_decimals(self.table.price_decimals, adjust),
            C::TableSparkline => self.table.show_sparkline = !self.table.show_sparkline,
            C::TableCompact => self.table.compact = !self.table.compact,
            C::TableArrows => self.table.show_arrows = !self.table.show_arrows,
            C::TableDateFormat => {
                let index = DATE_FORMATS
                    .iter()
                    .position(|f| *f == self.table.date_format)
                    .map_or(0, |i| cycle_index(i, DATE_FORMATS.len(), up));
                self.table.date_format = DATE_FORMATS[index].to_string();
            }

            // Grille
            C::GridColumns => {
                let columns = if up {
                    self.grid.columns.saturating_add(1)
                } else {
                    self.grid.columns.saturating_sub(1)
                };
                self.grid.columns =
                    columns.clamp(GridSettings::MIN_COLUMNS, GridSettings::MAX_COLUMNS);
            }
            C::GridSortColumn => self.grid.sort.next_column(),
            C::GridSortDirection => self.grid.sort.descending = !self.grid.sort.descending,
            C::GridDecimals => self.grid.price_decimals = step_decimals(self.grid.price_decimals, adjust),
            C::GridSparkline => self.grid.show_sparkline = !self.grid.show_sparkline,
            C::GridCategory => self.grid.show_category = !self.grid.show_category,
            C::GridUnit => self.grid.show_unit = !self.grid.show_unit,
            C::GridDate => self.grid.show_date = !self.grid.show_date,

            // Graphique
            C::ChartLineColor => {
                let current = self.chart.line_color.as_deref();
                let index = LINE_COLORS
                    .iter()
                    .position(|c| *c == current)
                    .map_or(0, |i| cycle_index(i, LINE_COLORS.len(), up));
                self.chart.line_color = LINE_COLORS[index].map(str::to_string);
            }
            C::ChartFill => self.chart.show_fill = !self.chart.show_fill,
            C::ChartFillOpacity => {
                self.chart.fill_opacity = match adjust {
                    Adjust::Decrease => self.chart.fill_opacity.saturating_sub(FILL_STEP),
                    _ => self.chart.fill_opacity.saturating_add(FILL_STEP).min(100),
                };
            }
            C::ChartGrid => self.chart.show_grid = !self.chart.show_grid,
            C::ChartMovingAverage => {
                self.chart.show_moving_average = !self.chart.show_moving_average
            }
            C::ChartMovingAverageWindow => {
                let window = match adjust {
                    Adjust::Decrease => self.chart.moving_average_window.saturating_sub(MA_STEP),
                    _ => self.chart.moving_average_window + MA_STEP,
                };
                self.chart.moving_average_window =
                    window.clamp(ChartSettings::MIN_MA_WINDOW, ChartSettings::MAX_MA_WINDOW);
            }
            C::ChartPercentChange => {
                self.chart.show_percent_change = !self.chart.show_percent_change
            }
            C::ChartThresholds => self.chart.show_thresholds = !self.chart.show_thresholds,
            C::ChartUpperThreshold => {
                self.chart.upper_threshold = self.step_threshold(self.chart.upper_threshold, adjust)
            }
            C::ChartLowerThreshold => {
                self.chart.lower_threshold = self.step_threshold(self.chart.lower_threshold, adjust)
            }
            C::ChartSmoothLine => self.chart.smooth_line = !self.chart.smooth_line,
        }

        self.persist_scope(control);
    }

    /// Seuil : ← → par pas de 1 % du dernier prix, Entrée → automatique
    fn step_threshold(&self, current: Option<f64>, adjust: Adjust) -> Option<f64> {
        let price = self.selected_commodity().map(|c| c.price)?;
        let step = (price.abs() * 0.01).max(f64::EPSILON);
        let base = current.unwrap_or(price);

        match adjust {
            Adjust::Activate => None,
            Adjust::Increase => Some(base + step),
            Adjust::Decrease => Some(base - step),
        }
    }

    fn persist_scope(&mut self, control: SettingsControl) {
        match control_key(control) {
            Some(SettingsKey::TableSettings) => self.store.store(&self.table),
            Some(SettingsKey::GridSettings) => self.store.store(&self.grid),
            Some(SettingsKey::ChartSettings) => self.store.store(&self.chart),
            _ => {}
        }
        self.clamp_selection();
    }

    /// Remet la zone de la modale à ses valeurs par défaut
    fn reset_scope_defaults(&mut self) {
        let key = match self.modal.scope() {
            ModalScope::Table => SettingsKey::TableSettings,
            ModalScope::Grid => SettingsKey::GridSettings,
            ModalScope::Chart => SettingsKey::ChartSettings,
        };
        self.store.remove(key);
        self.reload_settings(key);
        info!(key = %key, "Settings reset to defaults");
    }

    /// Valeur affichée d'un contrôle
    pub fn control_value(&self, control: SettingsControl) -> String {
        use SettingsControl as C;

        let flag = |on: bool| String::from(if on { "on" } else { "off" });
        let direction =
            |descending: bool| String::from(if descending { "descending" } else { "ascending" });
        let threshold = |value: Option<f64>| match value {
            Some(v) => format!("{:.2}", v),
            None => "auto".to_string(),
        };

        match control {
            C::Column(column) => flag(self.table.columns.is_visible(column)),
            C::TableSortColumn => self.table.sort.column.header().to_string(),
            C::TableSortDirection => direction(self.table.sort.descending),
            C::TableDecimals => self.table.price_decimals.to_string(),
            C::TableSparkline => flag(self.table.show_sparkline),
            C::TableCompact => flag(self.table.compact),
            C::TableArrows => flag(self.table.show_arrows),
            C::TableDateFormat => self.table.date_format.clone(),
            C::GridColumns => self.grid.columns.to_string(),
            C::GridSortColumn => self.grid.sort.column.header().to_string(),
            C::GridSortDirection => direction(self.grid.sort.descending),
            C::GridDecimals => self.grid.price_decimals.to_string(),
            C::GridSparkline => flag(self.grid.show_sparkline),
            C::GridCategory => flag(self.grid.show_category),
            C::GridUnit => flag(self.grid.show_unit),
            C::GridDate => flag(self.grid.show_date),
            C::ChartLineColor => self
                .chart
                .line_color
                .clone()
                .unwrap_or_else(|| "theme".to_string()),
            C::ChartFill => flag(self.chart.show_fill),
            C::ChartFillOpacity => format!("{}%", self.chart.fill_opacity),
            C::ChartGrid => flag(self.chart.show_grid),
            C::ChartMovingAverage => flag(self.chart.show_moving_average),
            C::ChartMovingAverageWindow => self.chart.moving_average_window.to_string(),
            C::ChartPercentChange => flag(self.chart.show_percent_change),
            C::ChartThresholds => flag(self.chart.show_thresholds),
            C::ChartUpperThreshold => threshold(self.chart.upper_threshold),
            C::ChartLowerThreshold => threshold(self.chart.lower_threshold),
            C::ChartSmoothLine => flag(self.chart.smooth_line),
            C::Theme => self.theme.theme().name().to_string(),
            C::MarketTheme => self.theme.market_theme().name().to_string(),
            C::ResetDefaults | C::Close => String::new(),
        }
    }
}

/// Clé persistée modifiée par un contrôle
fn control_key(control: SettingsControl) -> Option<SettingsKey> {
    use SettingsControl as C;

    match control {
        C::Column(_)
        | C::TableSortColumn
        | C::TableSortDirection
        | C::TableDecimals
        | C::TableSparkline
        | C::TableCompact
        | C::TableArrows
        | C::TableDateFormat => Some(SettingsKey::TableSettings),
        C::GridColumns
        | C::GridSortColumn
        | C::GridSortDirection
        | C::GridDecimals
        | C::GridSparkline
        | C::GridCategory
        | C::GridUnit
        | C::GridDate => Some(SettingsKey::GridSettings),
        C::ChartLineColor
        | C::ChartFill
        | C::ChartFillOpacity
        | C::ChartGrid
        | C::ChartMovingAverage
        | C::ChartMovingAverageWindow
        | C::ChartPercentChange
        | C::ChartThresholds
        | C::ChartUpperThreshold
        | C::ChartLowerThreshold
        | C::ChartSmoothLine => Some(SettingsKey::ChartSettings),
        C::Theme => Some(SettingsKey::Theme),
        C::MarketTheme => Some(SettingsKey::MarketTheme),
        C::ResetDefaults | C::Close => None,
    }
}

fn cycle_index(index: usize, len: usize, forward: bool) -> usize {
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

fn step_decimals(decimals: u8, adjust: Adjust) -> u8 {
    match adjust {
        Adjust::Decrease => decimals.saturating_sub(1),
        _ => decimals.saturating_add(1).min(TableSettings::MAX_DECIMALS),
    }
}

fn previous_theme(theme: crate::theme::Theme) -> crate::theme::Theme {
    use crate::theme::Theme;

    let index = Theme::ALL.iter().position(|t| *t == theme).unwrap_or(0);
    Theme::ALL[cycle_index(index, Theme::ALL.len(), false)]
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricePoint;
    use crate::settings::ColumnId;
    use crate::theme::Theme;
    use chrono::NaiveDate;

    fn commodity(id: &str, name: &str, category: &str, price: f64) -> Commodity {
        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        Commodity::new(id, name, price)
            .with_category(category)
            .with_history(vec![PricePoint::new(date, price)])
    }

    fn loaded(app: &mut App, commodities: Vec<Commodity>) {
        let AppCommand::LoadCommodities { request, generation } = app.request_load() else {
            panic!("expected a load command");
        };
        assert!(app.apply_result(AppResult::CommoditiesLoaded {
            generation,
            request,
            commodities,
        }));
    }

    fn sample() -> Vec<Commodity> {
        vec![
            commodity("wti", "WTI", "energy", 78.0),
            commodity("gold", "Gold", "precious", 2400.0),
            commodity("copper", "Copper", "metal", 4.1),
        ]
    }

    #[test]
    fn test_app_creation() {
        let app = App::in_memory();
        assert!(app.is_running());
        assert!(app.commodities.is_empty());
        assert_eq!(app.load_state, LoadState::Idle);
        assert_eq!(app.range, RangeToken::All);
    }

    #[test]
    fn test_stale_results_are_dropped() {
        let mut app = App::in_memory();
        let first = app.request_load();
        let _second = app.request_load();

        let AppCommand::LoadCommodities { request, generation } = first else {
            panic!("expected a load command");
        };
        let applied = app.apply_result(AppResult::CommoditiesLoaded {
            generation,
            request,
            commodities: sample(),
        });

        assert!(!applied);
        assert!(app.commodities.is_empty());
        assert!(app.is_loading());
    }

    #[test]
    fn test_failed_load_then_retry() {
        let mut app = App::in_memory();
        let AppCommand::LoadCommodities { request, generation } = app.request_load() else {
            panic!("expected a load command");
        };
        app.apply_result(AppResult::LoadFailed {
            generation,
            request,
            error: "connexion refusée".into(),
        });
        assert_eq!(app.load_state, LoadState::Failed("connexion refusée".into()));

        loaded(&mut app, sample());
        assert_eq!(app.load_state, LoadState::Loaded);
        assert_eq!(app.categories, vec!["energy", "metal", "precious"]);
    }

    #[test]
    fn test_range_change_requests_new_load() {
        let mut app = App::in_memory();
        assert!(app.set_range(RangeToken::All).is_none());

        let command = app.set_range(RangeToken::OneMonth);
        assert!(matches!(
            command,
            Some(AppCommand::LoadCommodities { generation: 1, .. })
        ));
        assert!(app.next_range().is_some());
        assert_eq!(app.range, RangeToken::ThreeMonths);
    }

    #[test]
    fn test_navigation_follows_visible_order() {
        let mut app = App::in_memory();
        loaded(&mut app, sample());

        // Tri par nom : Copper, Gold, WTI
        assert_eq!(app.selected_commodity().unwrap().id, "copper");
        app.navigate_down();
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.selected_commodity().unwrap().id, "wti");
        app.navigate_up();
        assert_eq!(app.selected_commodity().unwrap().id, "gold");
    }

    #[test]
    fn test_selection_survives_reload() {
        let mut app = App::in_memory();
        loaded(&mut app, sample());
        app.navigate_down(); // gold

        let mut reordered = sample();
        reordered.push(commodity("brent", "Brent", "energy", 82.0));
        loaded(&mut app, reordered);

        assert_eq!(app.selected_commodity().unwrap().id, "gold");
    }

    #[test]
    fn test_cycle_category() {
        let mut app = App::in_memory();
        loaded(&mut app, sample());

        app.cycle_category();
        assert_eq!(app.category, "energy");
        app.cycle_category();
        assert_eq!(app.category, "metal");
        app.cycle_category();
        app.cycle_category();
        assert_eq!(app.category, ALL_CATEGORIES);
    }

    #[test]
    fn test_controls_persist_immediately() {
        let mut app = App::in_memory();
        app.apply_control(SettingsControl::Column(ColumnId::Unit), Adjust::Activate);
        app.apply_control(SettingsControl::ChartFillOpacity, Adjust::Increase);

        let table: TableSettings = app.store_mut().load();
        let chart: ChartSettings = app.store_mut().load();
        assert!(!table.columns.unit);
        assert_eq!(chart.fill_opacity, 25);
    }

    #[test]
    fn test_modal_restores_selection() {
        let mut app = App::in_memory();
        loaded(&mut app, sample());
        app.navigate_down();

        app.open_settings();
        assert_eq!(app.modal.scope(), ModalScope::Table);
        app.selected_index = 0;

        app.close_settings();
        assert_eq!(app.selected_index, 1);
        assert!(app.modal.aria_hidden());
    }

    #[test]
    fn test_modal_follows_selection_across_sort_change() {
        let mut app = App::in_memory();
        loaded(&mut app, sample());
        assert_eq!(app.selected_commodity().unwrap().id, "copper");

        app.open_settings();
        app.apply_control(SettingsControl::TableSortDirection, Adjust::Activate);
        app.close_settings();

        // Tri inversé : WTI, Gold, Copper
        assert_eq!(app.selected_index, 2);
        assert_eq!(app.selected_commodity().unwrap().id, "copper");
    }

    #[test]
    fn test_modal_close_clamps_when_selection_vanished() {
        let mut app = App::in_memory();
        loaded(&mut app, sample());
        app.navigate_down();
        app.navigate_down(); // wti
        app.open_settings();

        loaded(&mut app, vec![commodity("gold", "Gold", "precious", 2400.0)]);
        app.close_settings();

        assert_eq!(app.selected_index, 0);
        assert_eq!(app.selected_commodity().unwrap().id, "gold");
    }

    #[test]
    fn test_price_decimals_follow_active_view() {
        let mut app = App::in_memory();
        app.apply_control(SettingsControl::TableDecimals, Adjust::Increase);
        assert_eq!(app.price_decimals(), app.table.price_decimals);

        app.toggle_view_mode();
        assert_eq!(app.price_decimals(), app.grid.price_decimals);
        assert_ne!(app.table.price_decimals, app.grid.price_decimals);
    }

    #[test]
    fn test_out_of_range_stored_settings_are_clamped() {
        let mut app = App::in_memory();
        app.store_mut().save(
            SettingsKey::GridSettings,
            &serde_json::json!({ "columns": 60000, "price_decimals": 40 }),
        );
        app.store_mut().save(
            SettingsKey::ChartSettings,
            &serde_json::json!({ "moving_average_window": 0, "fill_opacity": 250 }),
        );
        app.tick();

        assert_eq!(app.grid.columns, GridSettings::MAX_COLUMNS);
        assert_eq!(app.grid.price_decimals, TableSettings::MAX_DECIMALS);
        assert_eq!(app.chart.moving_average_window, ChartSettings::MIN_MA_WINDOW);
        assert_eq!(app.chart.fill_opacity, 100);
    }

    #[test]
    fn test_reset_defaults() {
        let mut app = App::in_memory();
        app.toggle_view_mode();
        app.open_settings();
        app.apply_control(SettingsControl::GridColumns, Adjust::Increase);
        assert_eq!(app.grid.columns, 4);

        app.apply_control(SettingsControl::ResetDefaults, Adjust::Activate);
        assert_eq!(app.grid, GridSettings::default());
    }

    #[test]
    fn test_theme_control_cycles_both_ways() {
        let mut app = App::in_memory();
        app.apply_control(SettingsControl::Theme, Adjust::Increase);
        assert_eq!(app.theme.theme(), Theme::Bloomberg);
        app.apply_control(SettingsControl::Theme, Adjust::Decrease);
        app.apply_control(SettingsControl::Theme, Adjust::Decrease);
        assert_eq!(app.theme.theme(), Theme::Light);
    }

    #[test]
    fn test_tick_resyncs_from_store() {
        let mut app = App::in_memory();
        app.store_mut().store(&ViewMode::Grid);
        assert_eq!(app.view_mode, ViewMode::Table);

        app.tick();
        assert_eq!(app.view_mode, ViewMode::Grid);
    }
}
