// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine l'interface TUI en utilisant les widgets de ratatui
//
// CONCEPTS RUST :
// 1. Routing avec match sur enum (Screen, ViewMode, état de chargement)
// 2. Builder pattern : construction fluide des widgets
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Layout : découpage de l'espace en zones
// 3. Table + TableState : ligne sélectionnée mise en évidence
// 4. Tabs : plages 1W ... ALL
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs},
    Frame,
};

use crate::app::{App, LoadState, Screen};
use crate::models::RangeToken;
use crate::settings::{ColumnId, ViewMode};
use crate::theme::to_color;
use crate::ui::chart::render_chart;
use crate::ui::grid::render_grid;
use crate::ui::modal::render_modal;
use crate::ui::view::{build_table_view, TABLE_SPARKLINE_WIDTH};

/// Dessine l'interface complète
///
/// CONCEPT RUST : Match sur enum pour router
/// - Le compilateur force à gérer tous les variants
/// - La modale est dessinée en dernier, par-dessus le reste
pub fn render(frame: &mut Frame, app: &App) {
    let size = frame.size();

    // Fond du thème sur tout l'écran
    let background = Block::default().style(
        Style::default()
            .bg(to_color(app.theme.chrome().background))
            .fg(app.theme.text_color()),
    );
    frame.render_widget(background, size);

    let chunks = create_layout(size);
    render_header(frame, app, chunks[0]);

    match app.current_screen {
        Screen::Dashboard => render_main_content(frame, app, chunks[1]),
        Screen::Detail => render_chart(frame, app, chunks[1]),
    }

    render_footer(frame, app, chunks[2]);
    render_modal(frame, app);
}

/// Crée le layout principal (header, content, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header : plages, catégorie, thème
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(44)])
        .split(area);

    let titles: Vec<&str> = RangeToken::TOKENS.iter().map(|t| t.label()).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border_color()))
                .title(" Benchwatch "),
        )
        .select(app.range.index())
        .style(Style::default().fg(theme.muted_color()))
        .highlight_style(
            Style::default()
                .fg(theme.accent_color())
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, chunks[0]);

    let info = Line::from(vec![
        Span::styled("cat ", Style::default().fg(theme.muted_color())),
        Span::styled(app.category.clone(), Style::default().fg(theme.text_color())),
        Span::styled("  theme ", Style::default().fg(theme.muted_color())),
        Span::styled(theme.theme().name(), Style::default().fg(theme.text_color())),
        Span::styled("/", Style::default().fg(theme.muted_color())),
        Span::styled(
            theme.market_theme().name(),
            Style::default().fg(theme.text_color()),
        ),
    ]);
    let paragraph = Paragraph::new(info)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border_color())),
        )
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, chunks[1]);
}

// ============================================================================
// Main Content : tableau ou grille
// ============================================================================

/// Ce que la zone principale doit afficher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentState {
    /// Premier chargement en cours, rien à montrer
    Loading,
    /// Échec sans données : message + invitation à réessayer
    Failed(String),
    /// Chargé mais aucune ligne pour la plage / catégorie
    Empty,
    Ready,
}

pub fn content_state(app: &App) -> ContentState {
    let has_rows = !app.visible_commodities().is_empty();
    match &app.load_state {
        LoadState::Failed(error) if !has_rows => ContentState::Failed(error.clone()),
        LoadState::Idle | LoadState::Loading if !has_rows => ContentState::Loading,
        _ if !has_rows => ContentState::Empty,
        _ => ContentState::Ready,
    }
}

/// Échec d'un rechargement alors que des lignes sont déjà affichées
///
/// Les anciennes données restent visibles ; l'erreur passe dans le footer.
pub fn failure_banner(app: &App) -> Option<String> {
    match (&app.load_state, content_state(app)) {
        (LoadState::Failed(error), ContentState::Ready) => {
            Some(format!("Refresh failed: {}", error))
        }
        _ => None,
    }
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match content_state(app) {
        ContentState::Loading => render_message(frame, app, area, "Loading commodities...", None),
        ContentState::Failed(error) => render_message(
            frame,
            app,
            area,
            &format!("Failed to load commodities: {}", error),
            Some("[r] Retry"),
        ),
        ContentState::Empty => render_message(
            frame,
            app,
            area,
            &format!("No commodities for {} / {}", app.range, app.category),
            Some("[c] Category  [1-6] Range"),
        ),
        ContentState::Ready => match app.view_mode {
            ViewMode::Table => render_table(frame, app, area),
            ViewMode::Grid => render_grid(frame, app, area),
        },
    }
}

/// Largeur d'une colonne du tableau
fn column_width(column: ColumnId) -> Constraint {
    match column {
        ColumnId::Name => Constraint::Min(14),
        ColumnId::Category => Constraint::Length(10),
        ColumnId::Price => Constraint::Length(12),
        ColumnId::Change => Constraint::Length(12),
        ColumnId::ChangePercent => Constraint::Length(9),
        ColumnId::Unit => Constraint::Length(8),
        ColumnId::Date => Constraint::Length(12),
        ColumnId::Source => Constraint::Length(14),
        ColumnId::Trend => Constraint::Length(TABLE_SPARKLINE_WIDTH as u16),
    }
}

/// CONCEPT RATATUI : Table
/// - Row / Cell : une ligne = une matière première
/// - TableState : garde le défilement sur la ligne sélectionnée
fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let view = build_table_view(&app.commodities, &app.table, theme.palette(), &app.scope());

    let title = if app.is_loading() {
        format!(" Commodities ({}) · refreshing ", view.rows.len())
    } else {
        format!(" Commodities ({}) ", view.rows.len())
    };

    let header = Row::new(view.headers()).style(
        Style::default()
            .fg(theme.accent_color())
            .add_modifier(Modifier::BOLD),
    );

    let spacing = if view.compact { 0 } else { 1 };
    let rows: Vec<Row> = view
        .rows
        .iter()
        .map(|row| {
            let cells: Vec<Cell> = row
                .cells
                .iter()
                .map(|cell| {
                    let style = match &cell.color {
                        Some(hex) => Style::default().fg(to_color(hex)),
                        None => Style::default().fg(theme.text_color()),
                    };
                    Cell::from(cell.text.clone()).style(style)
                })
                .collect();
            Row::new(cells).bottom_margin(spacing)
        })
        .collect();

    let widths: Vec<Constraint> = view.columns.iter().map(|c| column_width(*c)).collect();

    let table = Table::new(rows, widths)
        .header(header.bottom_margin(spacing))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border_color()))
                .title(title),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD))
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(app.selected_index));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_message(frame: &mut Frame, app: &App, area: Rect, message: &str, hint: Option<&str>) {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_color()))
        .title(" Commodities ");

    let mut text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(theme.text_color()))),
    ];
    if let Some(hint) = hint {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            hint.to_string(),
            Style::default()
                .fg(theme.accent_color())
                .add_modifier(Modifier::BOLD),
        )));
    }

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Footer : Instructions
// ============================================================================

/// Dessine le footer avec les raccourcis clavier
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_color()));

    let key = Style::default()
        .fg(theme.accent_color())
        .add_modifier(Modifier::BOLD);

    // CONCEPT : Confirmation de quit two-step
    let line = if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled("⚠  Press ", Style::default().fg(theme.change_color(-1.0))),
            Span::styled(
                "[q]",
                key.add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " again to quit, any other key to cancel ⚠",
                Style::default().fg(theme.change_color(-1.0)),
            ),
        ])
    } else if let Some(banner) = failure_banner(app) {
        Line::from(vec![
            Span::styled(
                format!("⚠  {}  ", banner),
                Style::default().fg(theme.change_color(-1.0)),
            ),
            Span::styled("[r]", key),
            Span::raw(" Retry"),
        ])
    } else if let Some(status) = &app.status {
        Line::from(Span::styled(status.clone(), Style::default().fg(theme.muted_color())))
    } else if app.is_on_detail() {
        Line::from(vec![
            Span::styled("[Esc]", key),
            Span::raw(" Back  "),
            Span::styled("[h l / 1-6]", key),
            Span::raw(" Range  "),
            Span::styled("[s]", key),
            Span::raw(" Chart settings  "),
            Span::styled("[t m]", key),
            Span::raw(" Theme  "),
            Span::styled("[q]", key),
            Span::raw(" Quit"),
        ])
    } else {
        Line::from(vec![
            Span::styled("[↑↓ / j k]", key),
            Span::raw(" Navigate  "),
            Span::styled("[Enter]", key),
            Span::raw(" Chart  "),
            Span::styled("[h l / 1-6]", key),
            Span::raw(" Range  "),
            Span::styled("[c]", key),
            Span::raw(" Category  "),
            Span::styled("[v]", key),
            Span::raw(" View  "),
            Span::styled("[s]", key),
            Span::raw(" Settings  "),
            Span::styled("[t m]", key),
            Span::raw(" Theme  "),
            Span::styled("[q]", key),
            Span::raw(" Quit"),
        ])
    };

    let paragraph = Paragraph::new(vec![line])
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
    use crate::api::FetchRequest;
    use crate::models::Commodity;
    use crate::worker::AppResult;

    #[test]
    fn test_content_state_follows_load() {
        let mut app = App::in_memory();
        assert_eq!(content_state(&app), ContentState::Loading);

        let command = app.request_load();
        let generation = match command {
            crate::worker::AppCommand::LoadCommodities { generation, .. } => generation,
            _ => unreachable!(),
        };

        app.apply_result(AppResult::LoadFailed {
            generation,
            request: FetchRequest::new(RangeToken::All, "all"),
            error: "connection refused".into(),
        });
        assert_eq!(
            content_state(&app),
            ContentState::Failed("connection refused".into())
        );

        let _ = app.request_load();
        app.apply_result(AppResult::CommoditiesLoaded {
            generation: app.current_generation(),
            request: FetchRequest::new(RangeToken::All, "all"),
            commodities: Vec::new(),
        });
        assert_eq!(content_state(&app), ContentState::Empty);

        let _ = app.request_load();
        app.apply_result(AppResult::CommoditiesLoaded {
            generation: app.current_generation(),
            request: FetchRequest::new(RangeToken::All, "all"),
            commodities: vec![Commodity::new("gold", "Gold", 2400.0)],
        });
        assert_eq!(content_state(&app), ContentState::Ready);
    }

    #[test]
    fn test_failed_refresh_keeps_rows_and_shows_banner() {
        let mut app = App::in_memory();
        let _ = app.request_load();
        app.apply_result(AppResult::CommoditiesLoaded {
            generation: app.current_generation(),
            request: FetchRequest::new(RangeToken::All, "all"),
            commodities: vec![Commodity::new("gold", "Gold", 2400.0)],
        });
        assert_eq!(failure_banner(&app), None);

        let _ = app.set_range(RangeToken::OneMonth);
        app.apply_result(AppResult::LoadFailed {
            generation: app.current_generation(),
            request: FetchRequest::new(RangeToken::OneMonth, "all"),
            error: "HTTP 500".into(),
        });

        assert_eq!(content_state(&app), ContentState::Ready);
        assert_eq!(failure_banner(&app), Some("Refresh failed: HTTP 500".into()));

        // Sans lignes, l'erreur occupe la zone principale à la place
        let _ = app.request_load();
        app.apply_result(AppResult::CommoditiesLoaded {
            generation: app.current_generation(),
            request: FetchRequest::new(RangeToken::OneMonth, "all"),
            commodities: Vec::new(),
        });
        let _ = app.request_load();
        app.apply_result(AppResult::LoadFailed {
            generation: app.current_generation(),
            request: FetchRequest::new(RangeToken::OneMonth, "all"),
            error: "HTTP 500".into(),
        });
        assert_eq!(failure_banner(&app), None);
        assert_eq!(content_state(&app), ContentState::Failed("HTTP 500".into()));
    }
}
