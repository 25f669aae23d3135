// ============================================================================
// Réglages typés
// ============================================================================
// Chaque zone de réglages a une clé persistée et une structure typée :
//
//   "view-mode"       → ViewMode
//   "table-settings"  → TableSettings
//   "grid-settings"   → GridSettings
//   "chart-settings"  → ChartSettings
//   "theme"           → Theme        (voir theme.rs)
//   "market-theme"    → MarketTheme  (voir theme.rs)
//
// CONCEPTS RUST :
// 1. #[serde(default)] sur la struct : tout champ absent prend sa valeur Default
// 2. Trait avec constante associée : SettingsArea::KEY
// 3. Enums à la place des clés "stringly-typed"
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Clés persistées dans le stockage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsKey {
    Theme,
    MarketTheme,
    ViewMode,
    TableSettings,
    GridSettings,
    ChartSettings,
}

impl SettingsKey {
    pub const ALL: [SettingsKey; 6] = [
        SettingsKey::Theme,
        SettingsKey::MarketTheme,
        SettingsKey::ViewMode,
        SettingsKey::TableSettings,
        SettingsKey::GridSettings,
        SettingsKey::ChartSettings,
    ];

    /// Nom de la clé dans le stockage
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsKey::Theme => "theme",
            SettingsKey::MarketTheme => "market-theme",
            SettingsKey::ViewMode => "view-mode",
            SettingsKey::TableSettings => "table-settings",
            SettingsKey::GridSettings => "grid-settings",
            SettingsKey::ChartSettings => "chart-settings",
        }
    }
}

impl fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingsKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Clé de réglages inconnue : {}", s))
    }
}

/// Une zone de réglages persistée sous une clé
///
/// CONCEPT RUST : Trait bounds
/// - Serialize + DeserializeOwned : aller-retour JSON
/// - Default : les valeurs par défaut servent de base à la fusion
pub trait SettingsArea: Serialize + DeserializeOwned + Default {
    const KEY: SettingsKey;
}

// ============================================================================
// ViewMode
// ============================================================================

/// Mode d'affichage du dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Tableau compact (une ligne par matière première)
    #[default]
    Table,
    /// Grille de cartes
    Grid,
}

impl ViewMode {
    pub fn toggle(&self) -> ViewMode {
        match self {
            ViewMode::Table => ViewMode::Grid,
            ViewMode::Grid => ViewMode::Table,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Table => "Table",
            ViewMode::Grid => "Grid",
        }
    }
}

impl SettingsArea for ViewMode {
    const KEY: SettingsKey = SettingsKey::ViewMode;
}

// ============================================================================
// Colonnes et tri
// ============================================================================

/// Identifiants stables des colonnes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnId {
    Name,
    Category,
    Price,
    Change,
    ChangePercent,
    Unit,
    Date,
    Source,
    Trend,
}

impl ColumnId {
    /// Ordre d'affichage des colonnes
    pub const ALL: [ColumnId; 9] = [
        ColumnId::Name,
        ColumnId::Category,
        ColumnId::Price,
        ColumnId::Change,
        ColumnId::ChangePercent,
        ColumnId::Unit,
        ColumnId::Date,
        ColumnId::Source,
        ColumnId::Trend,
    ];

    /// Identifiant stable (contrat de mise en page)
    pub fn id(&self) -> &'static str {
        match self {
            ColumnId::Name => "name",
            ColumnId::Category => "category",
            ColumnId::Price => "price",
            ColumnId::Change => "change",
            ColumnId::ChangePercent => "change_percent",
            ColumnId::Unit => "unit",
            ColumnId::Date => "date",
            ColumnId::Source => "source",
            ColumnId::Trend => "trend",
        }
    }

    /// Titre de l'en-tête
    pub fn header(&self) -> &'static str {
        match self {
            ColumnId::Name => "Name",
            ColumnId::Category => "Category",
            ColumnId::Price => "Price",
            ColumnId::Change => "Chg",
            ColumnId::ChangePercent => "Chg %",
            ColumnId::Unit => "Unit",
            ColumnId::Date => "Date",
            ColumnId::Source => "Source",
            ColumnId::Trend => "Trend",
        }
    }
}

/// Visibilité de chaque colonne
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnVisibility {
    pub name: bool,
    pub category: bool,
    pub price: bool,
    pub change: bool,
    pub change_percent: bool,
    pub unit: bool,
    pub date: bool,
    pub source: bool,
    pub trend: bool,
}

impl Default for ColumnVisibility {
    fn default() -> Self {
        Self {
            name: true,
            category: true,
            price: true,
            change: true,
            change_percent: true,
            unit: true,
            date: true,
            source: false,
            trend: true,
        }
    }
}

impl ColumnVisibility {
    /// CONCEPT RUST : retourner une référence mutable vers un champ
    fn flag_mut(&mut self, column: ColumnId) -> &mut bool {
        match column {
            ColumnId::Name => &mut self.name,
            ColumnId::Category => &mut self.category,
            ColumnId::Price => &mut self.price,
            ColumnId::Change => &mut self.change,
            ColumnId::ChangePercent => &mut self.change_percent,
            ColumnId::Unit => &mut self.unit,
            ColumnId::Date => &mut self.date,
            ColumnId::Source => &mut self.source,
            ColumnId::Trend => &mut self.trend,
        }
    }

    pub fn is_visible(&self, column: ColumnId) -> bool {
        match column {
            ColumnId::Name => self.name,
            ColumnId::Category => self.category,
            ColumnId::Price => self.price,
            ColumnId::Change => self.change,
            ColumnId::ChangePercent => self.change_percent,
            ColumnId::Unit => self.unit,
            ColumnId::Date => self.date,
            ColumnId::Source => self.source,
            ColumnId::Trend => self.trend,
        }
    }

    /// Inverse la visibilité d'une colonne (le nom reste toujours visible)
    pub fn toggle(&mut self, column: ColumnId) {
        if column == ColumnId::Name {
            return;
        }
        let flag = self.flag_mut(column);
        *flag = !*flag;
    }

    /// Colonnes visibles, dans l'ordre d'affichage
    pub fn visible(&self) -> Vec<ColumnId> {
        ColumnId::ALL
            .iter()
            .copied()
            .filter(|c| self.is_visible(*c))
            .collect()
    }
}

/// Colonne de tri et sens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSettings {
    pub column: ColumnId,
    pub descending: bool,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self {
            column: ColumnId::Name,
            descending: false,
        }
    }
}

impl SortSettings {
    /// Colonne suivante parmi les colonnes triables
    pub fn next_column(&mut self) {
        let index = ColumnId::ALL
            .iter()
            .position(|c| *c == self.column)
            .unwrap_or(0);
        self.column = ColumnId::ALL[(index + 1) % ColumnId::ALL.len()];
    }
}

// ============================================================================
// TableSettings
// ============================================================================

/// Réglages de la vue tableau
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub columns: ColumnVisibility,
    pub sort: SortSettings,
    /// Nombre de décimales pour les prix
    pub price_decimals: u8,
    /// Affiche une mini-courbe dans la colonne Trend
    pub show_sparkline: bool,
    /// Lignes serrées (sans marge)
    pub compact: bool,
    /// Flèches ▲▼ devant les variations
    pub show_arrows: bool,
    /// Format chrono des dates
    pub date_format: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            columns: ColumnVisibility::default(),
            sort: SortSettings::default(),
            price_decimals: 2,
            show_sparkline: true,
            compact: false,
            show_arrows: true,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

impl TableSettings {
    pub const MAX_DECIMALS: u8 = 6;

    /// Ramène les valeurs lues du stockage dans les bornes de la modale
    pub fn clamped(mut self) -> Self {
        self.price_decimals = self.price_decimals.min(Self::MAX_DECIMALS);
        self
    }
}

impl SettingsArea for TableSettings {
    const KEY: SettingsKey = SettingsKey::TableSettings;
}

// ============================================================================
// GridSettings
// ============================================================================

/// Réglages de la vue grille
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Nombre de cartes par ligne
    pub columns: u16,
    pub sort: SortSettings,
    pub price_decimals: u8,
    pub show_sparkline: bool,
    pub show_category: bool,
    pub show_unit: bool,
    pub show_date: bool,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            columns: 3,
            sort: SortSettings::default(),
            price_decimals: 2,
            show_sparkline: true,
            show_category: true,
            show_unit: true,
            show_date: false,
        }
    }
}

impl GridSettings {
    pub const MIN_COLUMNS: u16 = 1;
    pub const MAX_COLUMNS: u16 = 6;

    /// Un stockage édité à la main peut contenir n'importe quel nombre
    pub fn clamped(mut self) -> Self {
        self.columns = self.columns.clamp(Self::MIN_COLUMNS, Self::MAX_COLUMNS);
        self.price_decimals = self.price_decimals.min(TableSettings::MAX_DECIMALS);
        self
    }
}

impl SettingsArea for GridSettings {
    const KEY: SettingsKey = SettingsKey::GridSettings;
}

// ============================================================================
// ChartSettings
// ============================================================================

/// Réglages du graphique de détail (une seule matière première)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Couleur de la courbe (hex), None = couleur de la palette
    pub line_color: Option<String>,
    /// Opacité du remplissage en % (0-100)
    pub fill_opacity: u8,
    pub show_fill: bool,
    pub show_grid: bool,
    pub show_moving_average: bool,
    pub moving_average_window: usize,
    /// Affiche la variation en % depuis le début de la plage au lieu du prix
    pub show_percent_change: bool,
    pub show_thresholds: bool,
    pub upper_threshold: Option<f64>,
    pub lower_threshold: Option<f64>,
    /// Marqueur Braille (plus fin) au lieu de points
    pub smooth_line: bool,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            line_color: None,
            fill_opacity: 20,
            show_fill: false,
            show_grid: true,
            show_moving_average: false,
            moving_average_window: 20,
            show_percent_change: false,
            show_thresholds: false,
            upper_threshold: None,
            lower_threshold: None,
            smooth_line: true,
        }
    }
}

impl ChartSettings {
    pub const MIN_MA_WINDOW: usize = 2;
    pub const MAX_MA_WINDOW: usize = 200;

    pub fn clamped(mut self) -> Self {
        self.moving_average_window = self
            .moving_average_window
            .clamp(Self::MIN_MA_WINDOW, Self::MAX_MA_WINDOW);
        self.fill_opacity = self.fill_opacity.min(100);
        self
    }
}

impl SettingsArea for ChartSettings {
    const KEY: SettingsKey = SettingsKey::ChartSettings;
}

// ============================================================================
// Tests unitaires
// ============================================================================
