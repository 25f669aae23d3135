// ============================================================================
// Modèles de vue (tableau et grille)
// ============================================================================
// Fonctions pures : (matières premières, réglages, palette) → modèle de vue
// Le rendu ratatui ne fait ensuite que dessiner ce modèle.
//
// CONCEPTS RUST :
// 1. Fonctions pures : faciles à tester sans terminal
// 2. Vec<&Commodity> : trier des références, pas des copies
// 3. std::fmt::Write : formater sans paniquer sur un format invalide
// ============================================================================

use std::cmp::Ordering;
use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::api::ALL_CATEGORIES;
use crate::models::{filter_by_range, Commodity, PricePoint, RangeToken};
use crate::settings::{ColumnId, GridSettings, SortSettings, TableSettings};
use crate::theme::Palette;

/// Plage et catégorie affichées
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewScope {
    pub range: RangeToken,
    pub category: String,
}

impl ViewScope {
    pub fn new(range: RangeToken, category: impl Into<String>) -> Self {
        Self {
            range,
            category: category.into(),
        }
    }

    fn includes(&self, commodity: &Commodity) -> bool {
        self.category.eq_ignore_ascii_case(ALL_CATEGORIES)
            || self.category.is_empty()
            || commodity.category.eq_ignore_ascii_case(&self.category)
    }
}

// ============================================================================
// Tri et filtrage
// ============================================================================

/// Lignes visibles : filtrées par catégorie puis triées
pub fn visible_rows<'a>(
    commodities: &'a [Commodity],
    scope: &ViewScope,
    sort: &SortSettings,
) -> Vec<&'a Commodity> {
    let mut rows: Vec<&Commodity> = commodities.iter().filter(|c| scope.includes(c)).collect();

    // CONCEPT RUST : sort_by est stable, les égalités gardent l'ordre par nom
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows.sort_by(|a, b| {
        let ordering = compare_by(a, b, sort.column, scope.range);
        if sort.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    rows
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn compare_by(a: &Commodity, b: &Commodity, column: ColumnId, range: RangeToken) -> Ordering {
    match column {
        ColumnId::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        ColumnId::Category => a.category.cmp(&b.category),
        ColumnId::Price => compare_f64(a.price, b.price),
        ColumnId::Change => compare_f64(a.observed_change().0, b.observed_change().0),
        ColumnId::ChangePercent => compare_f64(a.observed_change().1, b.observed_change().1),
        ColumnId::Unit => a.unit.cmp(&b.unit),
        ColumnId::Date => a.date.cmp(&b.date),
        ColumnId::Source => a.source_label().cmp(b.source_label()),
        ColumnId::Trend => compare_f64(
            range_change_percent(&a.history, range),
            range_change_percent(&b.history, range),
        ),
    }
}

// ============================================================================
// Formatage
// ============================================================================

/// Prix avec séparateur de milliers : 12345.678, 2 → "12,345.68"
pub fn format_price(price: f64, decimals: u8) -> String {
    if !price.is_finite() {
        return "—".to_string();
    }

    let formatted = format!("{:.*}", decimals as usize, price.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };

    let mut grouped = String::new();
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Variation absolue signée, avec flèche optionnelle
pub fn format_change(change: f64, decimals: u8, arrows: bool) -> String {
    let arrow = match (arrows, change.partial_cmp(&0.0)) {
        (false, _) => "",
        (true, Some(Ordering::Greater)) => "▲ ",
        (true, Some(Ordering::Less)) => "▼ ",
        (true, _) => "  ",
    };
    let sign = if change > 0.0 { "+" } else { "" };
    format!("{}{}{:.*}", arrow, sign, decimals as usize, change)
}

/// Variation en pourcentage signée : "+1.23%"
pub fn format_percent(change_percent: f64) -> String {
    let sign = if change_percent > 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, change_percent)
}

/// Date avec un format chrono ; format invalide → ISO
pub fn format_date(date: Option<NaiveDate>, pattern: &str) -> String {
    let Some(date) = date else {
        return "—".to_string();
    };

    // CONCEPT RUST : write! sur String
    // - to_string() panique si le format chrono est invalide
    // - write! retourne une erreur qu'on peut rattraper
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_err() || out.is_empty() {
        return date.format("%Y-%m-%d").to_string();
    }
    out
}

// ============================================================================
// Sparklines
// ============================================================================

/// Prix de l'historique dans la plage affichée
pub fn sparkline_data(history: &[PricePoint], range: RangeToken) -> Vec<f64> {
    filter_by_range(history, range).iter().map(|p| p.price).collect()
}

/// Variation en % entre le premier et le dernier point de la plage
pub fn range_change_percent(history: &[PricePoint], range: RangeToken) -> f64 {
    let visible = filter_by_range(history, range);
    match (visible.first(), visible.last()) {
        (Some(first), Some(last)) if first.price != 0.0 => {
            (last.price - first.price) / first.price * 100.0
        }
        _ => 0.0,
    }
}

/// Ré-échantillonne une série sur `width` points (moyenne par paquet)
fn resample(values: &[f64], width: usize) -> Vec<f64> {
    if width == 0 || values.len() <= width {
        return values.to_vec();
    }

    (0..width)
        .map(|i| {
            let start = i * values.len() / width;
            let end = ((i + 1) * values.len() / width).max(start + 1);
            let bucket = &values[start..end];
            bucket.iter().sum::<f64>() / bucket.len() as f64
        })
        .collect()
}

/// Sparkline en caractères blocs : ▁▂▃▄▅▆▇█
pub fn sparkline_text(values: &[f64], width: usize) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    let points = resample(values, width);
    let (min, max) = min_max(&points);
    let span = max - min;

    points
        .iter()
        .map(|v| {
            if span <= f64::EPSILON {
                BARS[3]
            } else {
                let level = ((v - min) / span * (BARS.len() - 1) as f64).round() as usize;
                BARS[level.min(BARS.len() - 1)]
            }
        })
        .collect()
}

/// Données pour le widget Sparkline de ratatui (u64, min ramené à 1)
pub fn sparkline_bars(values: &[f64], width: usize) -> Vec<u64> {
    let points = resample(values, width);
    let (min, max) = min_max(&points);
    let span = max - min;

    points
        .iter()
        .map(|v| {
            if span <= f64::EPSILON {
                50
            } else {
                1 + ((v - min) / span * 99.0).round() as u64
            }
        })
        .collect()
}

pub fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

// ============================================================================
// Vue tableau
// ============================================================================

/// Une cellule : texte + couleur hex optionnelle
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub color: Option<String>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    fn colored(text: impl Into<String>, color: &str) -> Self {
        Self {
            text: text.into(),
            color: Some(color.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: String,
    pub cells: Vec<Cell>,
}

/// Modèle de la vue tableau
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    /// Colonnes visibles (identifiants stables)
    pub columns: Vec<ColumnId>,
    pub rows: Vec<TableRow>,
    pub compact: bool,
    pub sort: SortSettings,
}

impl TableView {
    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                if *column == self.sort.column {
                    let marker = if self.sort.descending { "↓" } else { "↑" };
                    format!("{} {}", column.header(), marker)
                } else {
                    column.header().to_string()
                }
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Largeur des sparklines texte du tableau
pub const TABLE_SPARKLINE_WIDTH: usize = 16;

/// Couleur hex d'une variation
fn change_hex(change: f64, palette: &Palette) -> Option<&str> {
    if change > 0.0 {
        Some(palette.up.as_str())
    } else if change < 0.0 {
        Some(palette.down.as_str())
    } else {
        None
    }
}

fn toned(text: String, change: f64, palette: &Palette) -> Cell {
    match change_hex(change, palette) {
        Some(hex) => Cell::colored(text, hex),
        None => Cell::plain(text),
    }
}

/// Construit la vue tableau
pub fn build_table_view(
    commodities: &[Commodity],
    settings: &TableSettings,
    palette: &Palette,
    scope: &ViewScope,
) -> TableView {
    let mut columns = settings.columns.visible();
    if !settings.show_sparkline {
        columns.retain(|c| *c != ColumnId::Trend);
    }

    let rows = visible_rows(commodities, scope, &settings.sort)
        .into_iter()
        .map(|commodity| {
            let (change, change_percent) = commodity.observed_change();
            let cells = columns
                .iter()
                .map(|column| match column {
                    ColumnId::Name => Cell::plain(commodity.name.clone()),
                    ColumnId::Category => Cell::plain(commodity.category.clone()),
                    ColumnId::Price => {
                        Cell::plain(format_price(commodity.price, settings.price_decimals))
                    }
                    ColumnId::Change => toned(
                        format_change(change, settings.price_decimals, settings.show_arrows),
                        change,
                        palette,
                    ),
                    ColumnId::ChangePercent => {
                        toned(format_percent(change_percent), change_percent, palette)
                    }
                    ColumnId::Unit => Cell::plain(commodity.unit.clone()),
                    ColumnId::Date => Cell::plain(format_date(commodity.date, &settings.date_format)),
                    ColumnId::Source => Cell::plain(commodity.source_label().to_string()),
                    ColumnId::Trend => {
                        let values = sparkline_data(&commodity.history, scope.range);
                        let trend = range_change_percent(&commodity.history, scope.range);
                        let color = change_hex(trend, palette).unwrap_or(palette.line.as_str());
                        Cell::colored(sparkline_text(&values, TABLE_SPARKLINE_WIDTH), color)
                    }
                })
                .collect();

            TableRow {
                id: commodity.id.clone(),
                cells,
            }
        })
        .collect();

    TableView {
        columns,
        rows,
        compact: settings.compact,
        sort: settings.sort.clone(),
    }
}

// ============================================================================
// Vue grille
// ============================================================================

/// Une carte de la grille
#[derive(Debug, Clone, PartialEq)]
pub struct GridCard {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub date: Option<String>,
    pub price: String,
    pub change: String,
    pub change_color: Option<String>,
    /// Prix de la plage (None si la sparkline est masquée)
    pub sparkline: Option<Vec<f64>>,
    pub sparkline_color: String,
}

/// Modèle de la vue grille
#[derive(Debug, Clone, PartialEq)]
pub struct GridView {
    pub columns: u16,
    pub cards: Vec<GridCard>,
}

impl GridView {
    /// Découpe les cartes en lignes de `columns` cartes
    pub fn rows(&self) -> impl Iterator<Item = &[GridCard]> {
        self.cards.chunks(self.columns.max(1) as usize)
    }
}

/// Construit la vue grille
pub fn build_grid_view(
    commodities: &[Commodity],
    settings: &GridSettings,
    palette: &Palette,
    scope: &ViewScope,
) -> GridView {
    let columns = settings
        .columns
        .clamp(GridSettings::MIN_COLUMNS, GridSettings::MAX_COLUMNS);

    let cards = visible_rows(commodities, scope, &settings.sort)
        .into_iter()
        .map(|commodity| {
            let (change, change_percent) = commodity.observed_change();
            let trend = range_change_percent(&commodity.history, scope.range);

            GridCard {
                id: commodity.id.clone(),
                name: commodity.name.clone(),
                category: settings
                    .show_category
                    .then(|| commodity.category.clone())
                    .filter(|c| !c.is_empty()),
                unit: settings
                    .show_unit
                    .then(|| commodity.unit.clone())
                    .filter(|u| !u.is_empty()),
                date: settings
                    .show_date
                    .then(|| format_date(commodity.date, "%Y-%m-%d")),
                price: format_price(commodity.price, settings.price_decimals),
                change: format!(
                    "{} ({})",
                    format_change(change, settings.price_decimals, true),
                    format_percent(change_percent)
                ),
                change_color: change_hex(change_percent, palette).map(str::to_string),
                sparkline: settings
                    .show_sparkline
                    .then(|| sparkline_data(&commodity.history, scope.range)),
                sparkline_color: change_hex(trend, palette)
                    .unwrap_or(palette.line.as_str())
                    .to_string(),
            }
        })
        .collect();

    GridView { columns, cards }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{resolve_palette, MarketTheme, PaletteOverrides, Theme};

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn palette() -> Palette {
        resolve_palette(Theme::Dark, MarketTheme::Western, &PaletteOverrides::default())
    }

    fn sample() -> Vec<Commodity> {
        let mut gold = Commodity::new("gold", "Gold", 2400.0)
            .with_category("precious")
            .with_history(vec![
                PricePoint::new(day(1, 2), 2000.0),
                PricePoint::new(day(3, 1), 2300.0),
                PricePoint::new(day(3, 8), 2400.0),
            ]);
        gold.change = 100.0;
        gold.change_percent = 4.35;

        let mut wti = Commodity::new("wti", "WTI Crude", 78.5)
            .with_category("energy")
            .with_history(vec![
                PricePoint::new(day(3, 1), 80.0),
                PricePoint::new(day(3, 8), 78.5),
            ]);
        wti.change = -1.5;
        wti.change_percent = -1.875;

        let copper = Commodity::new("copper", "Copper", 4.1).with_category("metal");
        vec![wti, gold, copper]
    }

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(12345.678, 2), "12,345.68");
        assert_eq!(format_price(999.0, 0), "999");
        assert_eq!(format_price(-1234.5, 1), "-1,234.5");
        assert_eq!(format_price(f64::NAN, 2), "—");
    }

    #[test]
    fn test_format_change_and_percent() {
        assert_eq!(format_change(1.5, 2, true), "▲ +1.50");
        assert_eq!(format_change(-1.5, 1, true), "▼ -1.5");
        assert_eq!(format_change(0.0, 2, false), "0.00");
        assert_eq!(format_percent(1.234), "+1.23%");
        assert_eq!(format_percent(-0.5), "-0.50%");
    }

    #[test]
    fn test_format_date_falls_back_on_bad_pattern() {
        assert_eq!(format_date(Some(day(3, 8)), "%d/%m/%Y"), "08/03/2024");
        assert_eq!(format_date(Some(day(3, 8)), "%Q"), "2024-03-08");
        assert_eq!(format_date(None, "%Y"), "—");
    }

    #[test]
    fn test_sort_and_category_filter() {
        let commodities = sample();
        let all = ViewScope::new(RangeToken::All, "all");

        let by_name = visible_rows(&commodities, &all, &SortSettings::default());
        let names: Vec<&str> = by_name.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Copper", "Gold", "WTI Crude"]);

        let by_price_desc = SortSettings {
            column: ColumnId::Price,
            descending: true,
        };
        let rows = visible_rows(&commodities, &all, &by_price_desc);
        assert_eq!(rows[0].id, "gold");

        let energy = ViewScope::new(RangeToken::All, "energy");
        let rows = visible_rows(&commodities, &energy, &SortSettings::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "wti");
    }

    #[test]
    fn test_table_view_uses_visible_columns() {
        let mut settings = TableSettings::default();
        settings.columns.toggle(ColumnId::Unit);
        settings.show_sparkline = false;

        let view = build_table_view(
            &sample(),
            &settings,
            &palette(),
            &ViewScope::new(RangeToken::All, "all"),
        );

        assert!(!view.columns.contains(&ColumnId::Unit));
        assert!(!view.columns.contains(&ColumnId::Trend));
        assert_eq!(view.rows.len(), 3);
        assert!(view.rows.iter().all(|r| r.cells.len() == view.columns.len()));
        assert_eq!(view.headers()[0], "Name ↑");
    }

    #[test]
    fn test_change_cells_use_palette_colors() {
        let palette = palette();
        let view = build_table_view(
            &sample(),
            &TableSettings::default(),
            &palette,
            &ViewScope::new(RangeToken::All, "all"),
        );

        let change_col = view
            .columns
            .iter()
            .position(|c| *c == ColumnId::Change)
            .unwrap();
        let gold = view.rows.iter().find(|r| r.id == "gold").unwrap();
        let wti = view.rows.iter().find(|r| r.id == "wti").unwrap();

        assert_eq!(gold.cells[change_col].color.as_deref(), Some(palette.up.as_str()));
        assert_eq!(wti.cells[change_col].color.as_deref(), Some(palette.down.as_str()));
    }

    #[test]
    fn test_sparkline_respects_range() {
        let commodities = sample();
        let gold = &commodities[1];

        assert_eq!(sparkline_data(&gold.history, RangeToken::All).len(), 3);
        assert_eq!(sparkline_data(&gold.history, RangeToken::OneWeek), vec![2300.0, 2400.0]);

        let text = sparkline_text(&[1.0, 2.0, 3.0], 16);
        assert_eq!(text.chars().count(), 3);
        assert!(text.starts_with('▁') && text.ends_with('█'));

        assert_eq!(sparkline_text(&(0..100).map(f64::from).collect::<Vec<_>>(), 10).chars().count(), 10);
    }

    #[test]
    fn test_grid_view_chunks_cards() {
        let settings = GridSettings {
            columns: 2,
            show_date: true,
            ..GridSettings::default()
        };
        let view = build_grid_view(
            &sample(),
            &settings,
            &palette(),
            &ViewScope::new(RangeToken::All, "all"),
        );

        let rows: Vec<&[GridCard]> = view.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].len(), 1);

        let gold = view.cards.iter().find(|c| c.id == "gold").unwrap();
        assert_eq!(gold.category.as_deref(), Some("precious"));
        assert_eq!(gold.date.as_deref(), Some("2024-03-08"));
        assert!(gold.sparkline.is_some());
    }
}
