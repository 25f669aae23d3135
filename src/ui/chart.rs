// ============================================================================
// Chart - Graphique de détail d'une matière première
// ============================================================================
// Courbe de l'historique filtré par la plage courante, avec options :
// - moyenne mobile
// - mode "variation en %" depuis le début de la plage
// - seuils haut / bas
// - lignes de grille
// - remplissage (couleur pré-mélangée sur le fond du thème)
//
// CONCEPTS RUST :
// 1. Séparer calcul (ChartSeries, testable) et dessin (ratatui)
// 2. Iterator chaining : historique → points (x, y)
//
// CONCEPTS RATATUI :
// 1. Chart widget : plusieurs Dataset superposés
// 2. Axis : bornes et labels
// ============================================================================

use chrono::NaiveDate;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::App;
use crate::models::analytics::{moving_average, percent_change_series};
use crate::models::{filter_by_range, Commodity, RangeToken};
use crate::settings::ChartSettings;
use crate::ui::view::{format_change, format_percent, format_price, min_max};

/// Nombre de lignes de grille horizontales
const GRID_LINES: usize = 4;

// ============================================================================
// Calcul des séries
// ============================================================================

/// Séries prêtes à dessiner
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    /// Points (index, valeur) de la courbe principale
    pub points: Vec<(f64, f64)>,
    /// Moyenne mobile (vide si désactivée)
    pub moving_average: Vec<(f64, f64)>,
    pub upper_threshold: Option<f64>,
    pub lower_threshold: Option<f64>,
    pub y_bounds: [f64; 2],
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// true : valeurs en % depuis le début de la plage
    pub percent: bool,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_max(&self) -> f64 {
        self.points.len().saturating_sub(1).max(1) as f64
    }
}

/// Construit les séries du graphique
///
/// Seuils non définis : bornes min / max de la plage affichée.
pub fn build_chart_series(
    commodity: &Commodity,
    range: RangeToken,
    settings: &ChartSettings,
) -> ChartSeries {
    let visible = filter_by_range(&commodity.history, range);

    let values: Vec<f64> = if settings.show_percent_change {
        percent_change_series(visible)
    } else {
        visible.iter().map(|p| p.price).collect()
    };

    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect();

    let moving_average: Vec<(f64, f64)> = if settings.show_moving_average {
        moving_average(&values, settings.moving_average_window)
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
            .collect()
    } else {
        Vec::new()
    };

    let (lo, hi) = min_max(&values);
    let (upper_threshold, lower_threshold) = if settings.show_thresholds && !values.is_empty() {
        // Les seuils sont exprimés en prix : convertis en % si besoin
        let base = visible.first().map(|p| p.price).unwrap_or(0.0);
        let to_display = |price: f64| {
            if settings.show_percent_change && base != 0.0 {
                (price - base) / base * 100.0
            } else {
                price
            }
        };
        (
            Some(settings.upper_threshold.map(to_display).unwrap_or(hi)),
            Some(settings.lower_threshold.map(to_display).unwrap_or(lo)),
        )
    } else {
        (None, None)
    };

    let y_bounds = if values.is_empty() {
        [0.0, 1.0]
    } else {
        let candidates = [Some(lo), Some(hi), upper_threshold, lower_threshold];
        let (min, max) = min_max(&candidates.iter().flatten().copied().collect::<Vec<_>>());
        // Marge de 5 % pour que le graphique respire
        let margin = ((max - min) * 0.05).max(max.abs() * 0.001).max(f64::EPSILON);
        [min - margin, max + margin]
    };

    ChartSeries {
        points,
        moving_average,
        upper_threshold,
        lower_threshold,
        y_bounds,
        first_date: visible.first().map(|p| p.date),
        last_date: visible.last().map(|p| p.date),
        percent: settings.show_percent_change,
    }
}

/// Valeurs des lignes de grille (strictement entre les bornes)
pub fn grid_levels(y_bounds: [f64; 2]) -> Vec<f64> {
    let step = (y_bounds[1] - y_bounds[0]) / (GRID_LINES + 1) as f64;
    (1..=GRID_LINES).map(|i| y_bounds[0] + step * i as f64).collect()
}

fn horizontal(level: f64, x_max: f64) -> Vec<(f64, f64)> {
    // Assez de points pour que la ligne soit continue en Braille
    let steps = 200;
    (0..=steps)
        .map(|i| (x_max * i as f64 / steps as f64, level))
        .collect()
}

// ============================================================================
// Rendu
// ============================================================================

/// Dessine l'écran de détail de la matière première sélectionnée
pub fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let Some(commodity) = app.selected_commodity() else {
        render_no_data(frame, app, area, "Aucune matière première sélectionnée");
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    render_chart_header(frame, app, commodity, chunks[0]);

    let series = build_chart_series(commodity, app.range, &app.chart);
    if series.is_empty() {
        let message = format!("Pas d'historique pour {}", commodity.name);
        render_no_data(frame, app, chunks[1], &message);
        return;
    }
    render_chart_graph(frame, app, commodity, &series, chunks[1]);
}

/// Textes du header : prix, variation, observation précédente
///
/// `decimals` vient des réglages de la vue d'origine (tableau ou grille).
pub fn header_figures(commodity: &Commodity, decimals: u8) -> (String, String, Option<String>) {
    let (change, change_percent) = commodity.observed_change();

    let price = format!("{} {}", format_price(commodity.price, decimals), commodity.unit);
    let change = format!(
        "{} ({})",
        format_change(change, decimals, true),
        format_percent(change_percent)
    );
    let previous = commodity
        .previous_observation()
        .map(|p| format!("  prev {} on {}", format_price(p.price, decimals), p.date));

    (price, change, previous)
}

/// Header : prix, variation, observation précédente, statistiques
fn render_chart_header(frame: &mut Frame, app: &App, commodity: &Commodity, area: Rect) {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_color()))
        .title(format!(" {} · {} ", commodity.name, app.range));

    let (_, change_percent) = commodity.observed_change();
    let color = theme.change_color(change_percent);
    let (price, change, previous) = header_figures(commodity, app.price_decimals());

    let mut spans = vec![
        Span::styled(
            price,
            Style::default().fg(theme.text_color()).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(change, Style::default().fg(color)),
    ];

    if let Some(previous) = previous {
        spans.push(Span::styled(previous, Style::default().fg(theme.muted_color())));
    }

    spans.push(Span::styled(
        format!("  {}", commodity.source_label()),
        Style::default().fg(theme.muted_color()),
    ));

    // Statistiques par observations (pré-calculées ou recalculées)
    let stats = commodity.stats();
    let pct = |value: Option<f64>| value.map(format_percent).unwrap_or_else(|| "—".to_string());
    let stats_line = Line::from(Span::styled(
        format!(
            "30 obs {} {}  ·  365 obs {}  ·  {} obs",
            stats.direction_30_obs.arrow(),
            pct(stats.pct_change_30_obs),
            pct(stats.pct_change_365_obs),
            stats.observations
        ),
        Style::default().fg(theme.muted_color()),
    ));

    let paragraph = Paragraph::new(vec![Line::from(spans), stats_line])
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

/// Graphique ligne avec les options de ChartSettings
fn render_chart_graph(
    frame: &mut Frame,
    app: &App,
    commodity: &Commodity,
    series: &ChartSeries,
    area: Rect,
) {
    let theme = &app.theme;
    let settings = &app.chart;
    let x_max = series.x_max();

    // CONCEPT RATATUI : Marker types
    // - Braille : trait fin (2x4 points par cellule)
    // - Dot : un point par cellule
    let marker = if settings.smooth_line {
        symbols::Marker::Braille
    } else {
        symbols::Marker::Dot
    };

    // Les Dataset empruntent leurs points : on les calcule avant
    let grid: Vec<Vec<(f64, f64)>> = if settings.show_grid {
        grid_levels(series.y_bounds)
            .into_iter()
            .map(|level| horizontal(level, x_max))
            .collect()
    } else {
        Vec::new()
    };
    let upper = series.upper_threshold.map(|level| horizontal(level, x_max));
    let lower = series.lower_threshold.map(|level| horizontal(level, x_max));

    // Ordre de dessin : grille, seuils, moyenne, courbe (au-dessus)
    let mut datasets: Vec<Dataset> = grid
        .iter()
        .map(|points| {
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(theme.grid_color()))
                .data(points)
        })
        .collect();

    if let Some(points) = &upper {
        datasets.push(
            Dataset::default()
                .name("upper")
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.change_color(1.0)))
                .data(points),
        );
    }
    if let Some(points) = &lower {
        datasets.push(
            Dataset::default()
                .name("lower")
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.change_color(-1.0)))
                .data(points),
        );
    }

    if !series.moving_average.is_empty() {
        datasets.push(
            Dataset::default()
                .name(format!("MA{}", settings.moving_average_window))
                .marker(marker)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.muted_color()))
                .data(&series.moving_average),
        );
    }

    datasets.push(
        Dataset::default()
            .name(commodity.id.as_str())
            .marker(marker)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme.line_color(settings.line_color.as_deref())))
            .data(&series.points),
    );

    let format_value = |v: f64| {
        if series.percent {
            format!("{:+.1}%", v)
        } else {
            format_price(v, app.price_decimals())
        }
    };
    let [y_min, y_max] = series.y_bounds;

    let x_axis = Axis::default()
        .style(Style::default().fg(theme.muted_color()))
        .bounds([0.0, x_max])
        .labels(vec![
            Span::raw(series.first_date.map(|d| d.to_string()).unwrap_or_default()),
            Span::raw(series.last_date.map(|d| d.to_string()).unwrap_or_default()),
        ]);

    let y_axis = Axis::default()
        .title(if series.percent { "%" } else { commodity.unit.as_str() })
        .style(Style::default().fg(theme.muted_color()))
        .bounds([y_min, y_max])
        .labels(vec![
            Span::raw(format_value(y_min)),
            Span::raw(format_value((y_min + y_max) / 2.0)),
            Span::raw(format_value(y_max)),
        ]);

    // Remplissage : le terminal n'a pas d'alpha, on teinte le fond
    let mut chart_style = Style::default();
    if settings.show_fill {
        chart_style = chart_style.bg(theme.fill_color(settings.fill_opacity));
    }

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border_color()))
                .title(format!(" {} - {} obs ", commodity.name, series.points.len())),
        )
        .style(chart_style)
        .x_axis(x_axis)
        .y_axis(y_axis);

    frame.render_widget(chart, area);
}

// ============================================================================
// Helper : Message quand pas de données
// ============================================================================

fn render_no_data(frame: &mut Frame, app: &App, area: Rect, message: &str) {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.change_color(-1.0)))
        .title(" ⚠ ");

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(theme.text_color()))),
        Line::from(""),
        Line::from(Span::styled(
            "[ESC] Retour",
            Style::default().fg(theme.muted_color()),
        )),
    ];

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricePoint;

    fn oil() -> Commodity {
        let history = (1..=10)
            .map(|d| {
                PricePoint::new(
                    NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                    100.0 + d as f64,
                )
            })
            .collect();
        Commodity::new("brent", "Brent", 110.0).with_history(history)
    }

    #[test]
    fn test_header_uses_requested_decimals() {
        let mut brent = oil();
        brent.change = 1.0;
        brent.change_percent = 0.92;

        let (price, change, previous) = header_figures(&brent, 4);
        assert!(price.starts_with("110.0000"));
        assert_eq!(change, "▲ +1.0000 (+0.92%)");
        assert_eq!(previous.as_deref(), Some("  prev 109.0000 on 2024-03-09"));

        let (price, _, _) = header_figures(&brent, 0);
        assert!(price.starts_with("110"));
        assert!(!price.contains('.'));
    }

    #[test]
    fn test_series_follow_range() {
        let settings = ChartSettings::default();
        let all = build_chart_series(&oil(), RangeToken::All, &settings);
        let week = build_chart_series(&oil(), RangeToken::OneWeek, &settings);

        assert_eq!(all.points.len(), 10);
        assert_eq!(week.points.len(), 8); // 3 → 10 mars inclus
        assert_eq!(week.first_date, NaiveDate::from_ymd_opt(2024, 3, 3));
        assert!(week.y_bounds[0] < 103.0 && week.y_bounds[1] > 110.0);
    }

    #[test]
    fn test_percent_mode_starts_at_zero() {
        let settings = ChartSettings {
            show_percent_change: true,
            ..ChartSettings::default()
        };
        let series = build_chart_series(&oil(), RangeToken::All, &settings);
        assert_eq!(series.points[0].1, 0.0);
        assert!(series.percent);
    }

    #[test]
    fn test_moving_average_skips_incomplete_window() {
        let settings = ChartSettings {
            show_moving_average: true,
            moving_average_window: 4,
            ..ChartSettings::default()
        };
        let series = build_chart_series(&oil(), RangeToken::All, &settings);
        assert_eq!(series.moving_average.len(), 7);
        assert_eq!(series.moving_average[0].0, 3.0);
    }

    #[test]
    fn test_thresholds_default_to_range_extremes() {
        let settings = ChartSettings {
            show_thresholds: true,
            upper_threshold: Some(120.0),
            ..ChartSettings::default()
        };
        let series = build_chart_series(&oil(), RangeToken::All, &settings);
        assert_eq!(series.upper_threshold, Some(120.0));
        assert_eq!(series.lower_threshold, Some(101.0));
        assert!(series.y_bounds[1] > 120.0);
    }

    #[test]
    fn test_grid_levels_inside_bounds() {
        let levels = grid_levels([0.0, 100.0]);
        assert_eq!(levels, vec![20.0, 40.0, 60.0, 80.0]);
    }
}
