// ============================================================================
// Grid - Vue en cartes
// ============================================================================
// Dessine le GridView (ui::view) : une carte par matière première,
// `columns` cartes par ligne, avec une mini sparkline.
//
// CONCEPTS RATATUI :
// 1. Layout imbriqués : lignes (vertical) puis cartes (horizontal)
// 2. Constraint::Ratio : colonnes de largeur égale
// 3. Sparkline widget : barres verticales à partir de u64
// ============================================================================

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline},
    Frame,
};

use crate::app::App;
use crate::theme::to_color;
use crate::ui::view::{build_grid_view, sparkline_bars, GridCard};

/// Hauteur d'une carte (bordures comprises)
const CARD_HEIGHT: u16 = 8;

/// Première ligne de cartes à afficher pour que la sélection reste visible
pub fn first_visible_row(selected_row: usize, visible_rows: usize) -> usize {
    if visible_rows == 0 {
        return selected_row;
    }
    selected_row.saturating_sub(visible_rows - 1)
}

/// Dessine la grille dans `area`
pub fn render_grid(frame: &mut Frame, app: &App, area: Rect) {
    let view = build_grid_view(&app.commodities, &app.grid, app.theme.palette(), &app.scope());
    let columns = view.columns.max(1) as usize;

    let visible_rows = (area.height / CARD_HEIGHT).max(1) as usize;
    let selected_row = app.selected_index / columns;
    let skip = first_visible_row(selected_row, visible_rows);

    let rows: Vec<&[GridCard]> = view.rows().skip(skip).take(visible_rows).collect();
    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            rows.iter()
                .map(|_| Constraint::Length(CARD_HEIGHT))
                .chain(std::iter::once(Constraint::Min(0)))
                .collect::<Vec<_>>(),
        )
        .split(area);

    for (offset, cards) in rows.iter().enumerate() {
        let card_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(row_areas[offset]);

        for (col, card) in cards.iter().enumerate() {
            let index = (skip + offset) * columns + col;
            render_card(frame, app, card, index == app.selected_index, card_areas[col]);
        }
    }
}

fn render_card(frame: &mut Frame, app: &App, card: &GridCard, selected: bool, area: Rect) {
    let theme = &app.theme;

    let border_style = if selected {
        Style::default()
            .fg(theme.accent_color())
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.border_color())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" {} ", card.name));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(inner);

    // Ligne méta : catégorie · unité · date (champs masquables)
    let meta: Vec<&str> = [&card.category, &card.unit, &card.date]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect();

    let change_style = match &card.change_color {
        Some(hex) => Style::default().fg(to_color(hex)),
        None => Style::default().fg(theme.text_color()),
    };

    let text = vec![
        Line::from(Span::styled(
            card.price.clone(),
            Style::default()
                .fg(theme.text_color())
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(card.change.clone(), change_style)),
        Line::from(Span::styled(
            meta.join(" · "),
            Style::default().fg(theme.muted_color()),
        )),
    ];
    frame.render_widget(Paragraph::new(text), chunks[0]);

    if let Some(values) = &card.sparkline {
        let bars = sparkline_bars(values, chunks[1].width as usize);
        let sparkline = Sparkline::default()
            .data(&bars)
            .style(Style::default().fg(to_color(&card.sparkline_color)));
        frame.render_widget(sparkline, chunks[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_visible_row_keeps_selection_on_screen() {
        assert_eq!(first_visible_row(0, 3), 0);
        assert_eq!(first_visible_row(2, 3), 0);
        assert_eq!(first_visible_row(5, 3), 3);
        assert_eq!(first_visible_row(4, 0), 4);
    }
}
