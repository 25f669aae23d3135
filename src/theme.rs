// ============================================================================
// Thèmes et palettes
// ============================================================================
// Deux réglages indépendants :
// - Theme : apparence générale (light, dark, bloomberg, ocean, forest)
// - MarketTheme : convention de couleurs des variations selon la région
//   (western : hausse verte / baisse rouge, eastern : hausse rouge / baisse verte)
//
// La palette des graphiques (courbe, remplissage, grille, hausse, baisse) est
// résolue ainsi :
// 1. surcharges de la configuration (équivalent des variables CSS) si valides
// 2. sinon table codée en dur par nom de thème (cas spécial dark/bloomberg)
//
// CONCEPTS RUST :
// 1. Couleurs en hex (String) dans le modèle, converties en Color au rendu
// 2. Fonctions pures + un contrôleur qui persiste via le SettingsStore injecté
// ============================================================================

use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::settings::{SettingsArea, SettingsKey, SettingsStore};

// ============================================================================
// Enums : Theme et MarketTheme
// ============================================================================

/// Thème visuel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    Bloomberg,
    Ocean,
    Forest,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Light,
        Theme::Dark,
        Theme::Bloomberg,
        Theme::Ocean,
        Theme::Forest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Bloomberg => "bloomberg",
            Theme::Ocean => "ocean",
            Theme::Forest => "forest",
        }
    }

    /// Thème suivant (cycle)
    pub fn next(&self) -> Theme {
        let index = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Fond sombre ?
    pub fn is_dark(&self) -> bool {
        !matches!(self, Theme::Light)
    }

    /// Couleurs de l'interface (bordures, texte, accent)
    pub fn chrome(&self) -> Chrome {
        match self {
            Theme::Light => Chrome {
                background: "#ffffff",
                text: "#111827",
                muted: "#6b7280",
                border: "#9ca3af",
                accent: "#2563eb",
            },
            Theme::Dark => Chrome {
                background: "#0b111a",
                text: "#e6edf7",
                muted: "#7f8ba0",
                border: "#334155",
                accent: "#5cb0ff",
            },
            Theme::Bloomberg => Chrome {
                background: "#000000",
                text: "#ffb000",
                muted: "#a0a0a0",
                border: "#ff9900",
                accent: "#ff9900",
            },
            Theme::Ocean => Chrome {
                background: "#0a1929",
                text: "#e3f2fd",
                muted: "#90a4ae",
                border: "#1e4976",
                accent: "#29b6f6",
            },
            Theme::Forest => Chrome {
                background: "#0f1a14",
                text: "#e8f5e9",
                muted: "#8aa392",
                border: "#2e5e3e",
                accent: "#66bb6a",
            },
        }
    }
}

impl SettingsArea for Theme {
    const KEY: SettingsKey = SettingsKey::Theme;
}

/// Convention régionale des couleurs de marché
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTheme {
    /// Hausse en vert, baisse en rouge
    #[default]
    Western,
    /// Hausse en rouge, baisse en vert (Chine, Japon, Corée...)
    Eastern,
}

impl MarketTheme {
    pub fn toggle(&self) -> MarketTheme {
        match self {
            MarketTheme::Western => MarketTheme::Eastern,
            MarketTheme::Eastern => MarketTheme::Western,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MarketTheme::Western => "western",
            MarketTheme::Eastern => "eastern",
        }
    }
}

impl SettingsArea for MarketTheme {
    const KEY: SettingsKey = SettingsKey::MarketTheme;
}

/// Couleurs de l'interface (hors graphiques)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chrome {
    pub background: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub border: &'static str,
    pub accent: &'static str,
}

// ============================================================================
// Palette des graphiques
// ============================================================================

/// Palette résolue (couleurs hex)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub line: String,
    /// Remplissage sous la courbe, avec alpha (#rrggbbaa)
    pub fill: String,
    pub grid: String,
    pub up: String,
    pub down: String,
}

/// Surcharges de palette (section "palette" de la configuration)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteOverrides {
    pub line: Option<String>,
    pub fill: Option<String>,
    pub grid: Option<String>,
    pub up: Option<String>,
    pub down: Option<String>,
}

/// Palette codée en dur pour un thème
///
/// CONCEPT : Cas spécial dark/bloomberg
/// - Les deux thèmes "terminal" partagent la grille et les couleurs de marché
/// - Bloomberg garde sa courbe ambre
fn base_palette(theme: Theme) -> Palette {
    let (line, grid, up, down, fill_alpha) = match theme {
        Theme::Dark | Theme::Bloomberg => {
            let line = if theme == Theme::Bloomberg { "#ff9900" } else { "#60a5fa" };
            (line, "#2a2a2a", "#22c55e", "#ef4444", 25.0)
        }
        Theme::Light => ("#2563eb", "#e5e7eb", "#16a34a", "#dc2626", 15.0),
        Theme::Ocean => ("#29b6f6", "#1e3a5f", "#26a69a", "#ef5350", 20.0),
        Theme::Forest => ("#81c784", "#2e4a36", "#66bb6a", "#e57373", 20.0),
    };

    Palette {
        line: line.to_string(),
        fill: hex_with_alpha(line, fill_alpha),
        grid: grid.to_string(),
        up: up.to_string(),
        down: down.to_string(),
    }
}

/// Résout la palette effective
pub fn resolve_palette(theme: Theme, market: MarketTheme, overrides: &PaletteOverrides) -> Palette {
    let mut palette = base_palette(theme);

    if market == MarketTheme::Eastern {
        std::mem::swap(&mut palette.up, &mut palette.down);
    }

    // CONCEPT RUST : tableau de paires (champ mutable, surcharge)
    let slots = [
        (&mut palette.line, &overrides.line),
        (&mut palette.fill, &overrides.fill),
        (&mut palette.grid, &overrides.grid),
        (&mut palette.up, &overrides.up),
        (&mut palette.down, &overrides.down),
    ];
    for (slot, over) in slots {
        if let Some(value) = over.as_deref().map(str::trim) {
            if parse_hex(value).is_some() {
                *slot = value.to_string();
            }
        }
    }

    palette
}

// ============================================================================
// Helpers couleurs
// ============================================================================

/// Décode "#rrggbb" ou "#rrggbbaa" en (r, g, b, a)
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if !(digits.len() == 6 || digits.len() == 8) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    let alpha = if digits.len() == 8 { channel(6)? } else { 255 };
    Some((channel(0)?, channel(2)?, channel(4)?, alpha))
}

/// Ajoute un canal alpha à une couleur "#rrggbb"
///
/// - `percent` : opacité de 0 à 100 (bornée)
/// - alpha = floor(255 × percent / 100), ex: 50 % → 7f
/// - Entrée invalide : retournée telle quelle
pub fn hex_with_alpha(hex: &str, percent: f64) -> String {
    let valid = hex.len() == 7
        && hex.starts_with('#')
        && hex[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return hex.to_string();
    }

    let alpha = (255.0 * percent.clamp(0.0, 100.0) / 100.0).floor() as u8;
    format!("{}{:02x}", hex, alpha)
}

/// Convertit une couleur hex en couleur terminal (Reset si invalide)
pub fn to_color(hex: &str) -> Color {
    match parse_hex(hex) {
        Some((r, g, b, _)) => Color::Rgb(r, g, b),
        None => Color::Reset,
    }
}

/// Compose une couleur avec alpha sur un fond opaque
///
/// Le terminal n'a pas de transparence : on pré-mélange les canaux.
pub fn blend_over(hex: &str, background: &str) -> Color {
    let (Some((r, g, b, a)), Some((br, bg, bb, _))) = (parse_hex(hex), parse_hex(background)) else {
        return to_color(hex);
    };

    let alpha = a as f64 / 255.0;
    let mix = |fg: u8, back: u8| (fg as f64 * alpha + back as f64 * (1.0 - alpha)).round() as u8;
    Color::Rgb(mix(r, br), mix(g, bg), mix(b, bb))
}

// ============================================================================
// ThemeController
// ============================================================================

/// Applique et persiste les choix de thème
///
/// CONCEPT : Injection de dépendance
/// - Le contrôleur ne possède pas le store : il le reçoit à chaque mutation
/// - Une seule source de vérité pour la persistance (le SettingsStore de App)
#[derive(Debug, Clone)]
pub struct ThemeController {
    theme: Theme,
    market: MarketTheme,
    overrides: PaletteOverrides,
    palette: Palette,
}

impl ThemeController {
    /// Charge les thèmes persistés
    pub fn load(store: &mut SettingsStore, overrides: PaletteOverrides) -> Self {
        let theme: Theme = store.load();
        let market: MarketTheme = store.load();
        let palette = resolve_palette(theme, market, &overrides);

        Self {
            theme,
            market,
            overrides,
            palette,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn market_theme(&self) -> MarketTheme {
        self.market
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn chrome(&self) -> Chrome {
        self.theme.chrome()
    }

    /// Applique un thème et le persiste
    pub fn set_theme(&mut self, store: &mut SettingsStore, theme: Theme) {
        self.theme = theme;
        self.refresh();
        store.store(&theme);
        info!(theme = %theme.name(), "Theme applied");
    }

    /// Applique une convention de marché et la persiste
    pub fn set_market_theme(&mut self, store: &mut SettingsStore, market: MarketTheme) {
        self.market = market;
        self.refresh();
        store.store(&market);
        info!(market_theme = %market.name(), "Market theme applied");
    }

    pub fn cycle_theme(&mut self, store: &mut SettingsStore) {
        let next = self.theme.next();
        self.set_theme(store, next);
    }

    pub fn toggle_market_theme(&mut self, store: &mut SettingsStore) {
        let next = self.market.toggle();
        self.set_market_theme(store, next);
    }

    /// Relit les choix persistés (après une notification du store)
    pub fn reload(&mut self, store: &mut SettingsStore) {
        self.theme = store.load();
        self.market = store.load();
        self.refresh();
    }

    fn refresh(&mut self) {
        self.palette = resolve_palette(self.theme, self.market, &self.overrides);
    }

    // ------------------------------------------------------------------------
    // Couleurs terminal dérivées
    // ------------------------------------------------------------------------

    /// Couleur d'une variation (hausse / baisse / nulle)
    pub fn change_color(&self, change: f64) -> Color {
        if change > 0.0 {
            to_color(&self.palette.up)
        } else if change < 0.0 {
            to_color(&self.palette.down)
        } else {
            to_color(self.chrome().muted)
        }
    }

    /// Couleur de sparkline selon la direction de la série
    pub fn sparkline_color(&self, change: f64) -> Color {
        if change == 0.0 {
            to_color(&self.palette.line)
        } else {
            self.change_color(change)
        }
    }

    /// Remplissage pré-mélangé sur le fond du thème
    pub fn fill_color(&self, opacity_percent: u8) -> Color {
        let fill = hex_with_alpha(&self.palette.line, opacity_percent as f64);
        blend_over(&fill, self.chrome().background)
    }

    pub fn line_color(&self, custom: Option<&str>) -> Color {
        match custom.filter(|c| parse_hex(c).is_some()) {
            Some(hex) => to_color(hex),
            None => to_color(&self.palette.line),
        }
    }

    pub fn grid_color(&self) -> Color {
        to_color(&self.palette.grid)
    }

    pub fn text_color(&self) -> Color {
        to_color(self.chrome().text)
    }

    pub fn muted_color(&self) -> Color {
        to_color(self.chrome().muted)
    }

    pub fn border_color(&self) -> Color {
        to_color(self.chrome().border)
    }

    pub fn accent_color(&self) -> Color {
        to_color(self.chrome().accent)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_with_alpha() {
        assert_eq!(hex_with_alpha("#ff0000", 50.0), "#ff00007f");
        assert_eq!(hex_with_alpha("#00ff00", 100.0), "#00ff00ff");
        assert_eq!(hex_with_alpha("#00ff00", 0.0), "#00ff0000");
        assert_eq!(hex_with_alpha("#00ff00", 250.0), "#00ff00ff");
    }

    #[test]
    fn test_hex_with_alpha_invalid_unchanged() {
        assert_eq!(hex_with_alpha("red", 50.0), "red");
        assert_eq!(hex_with_alpha("#fff", 50.0), "#fff");
        assert_eq!(hex_with_alpha("#gg0000", 50.0), "#gg0000");
        assert_eq!(hex_with_alpha("#ff000080", 50.0), "#ff000080");
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#102030"), Some((16, 32, 48, 255)));
        assert_eq!(parse_hex("#10203080"), Some((16, 32, 48, 128)));
        assert_eq!(parse_hex("102030"), None);
    }

    #[test]
    fn test_dark_and_bloomberg_share_market_colors() {
        let none = PaletteOverrides::default();
        let dark = resolve_palette(Theme::Dark, MarketTheme::Western, &none);
        let bloomberg = resolve_palette(Theme::Bloomberg, MarketTheme::Western, &none);

        assert_eq!(dark.grid, bloomberg.grid);
        assert_eq!(dark.up, bloomberg.up);
        assert_ne!(dark.line, bloomberg.line);
        assert_eq!(bloomberg.line, "#ff9900");
    }

    #[test]
    fn test_eastern_market_swaps_up_and_down() {
        let none = PaletteOverrides::default();
        let western = resolve_palette(Theme::Light, MarketTheme::Western, &none);
        let eastern = resolve_palette(Theme::Light, MarketTheme::Eastern, &none);

        assert_eq!(western.up, eastern.down);
        assert_eq!(western.down, eastern.up);
    }

    #[test]
    fn test_overrides_win_when_valid() {
        let overrides = PaletteOverrides {
            line: Some("#123456".into()),
            grid: Some("not-a-color".into()),
            ..PaletteOverrides::default()
        };
        let palette = resolve_palette(Theme::Dark, MarketTheme::Western, &overrides);

        assert_eq!(palette.line, "#123456");
        assert_eq!(palette.grid, "#2a2a2a");
    }

    #[test]
    fn test_blend_over() {
        assert_eq!(blend_over("#ff00007f", "#000000"), Color::Rgb(127, 0, 0));
        assert_eq!(blend_over("#ffffffff", "#000000"), Color::Rgb(255, 255, 255));
    }

    #[test]
    fn test_controller_persists_theme() {
        let mut store = SettingsStore::in_memory();
        let mut controller = ThemeController::load(&mut store, PaletteOverrides::default());
        assert_eq!(controller.theme(), Theme::Dark);

        controller.set_theme(&mut store, Theme::Bloomberg);
        controller.toggle_market_theme(&mut store);

        let reloaded = ThemeController::load(&mut store, PaletteOverrides::default());
        assert_eq!(reloaded.theme(), Theme::Bloomberg);
        assert_eq!(reloaded.market_theme(), MarketTheme::Eastern);
        assert_eq!(reloaded.palette().line, "#ff9900");
    }
}
