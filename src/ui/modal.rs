// ============================================================================
// Modale de réglages
// ============================================================================
// Dialogue superposé au dashboard ou au graphique :
// - ouverture : mémorise l'élément à re-sélectionner, focus sur le 1er contrôle
// - Tab / Shift-Tab : le focus reste DANS la modale (focus trap, boucle)
// - Échap : ferme et rend le focus à l'élément mémorisé
// - Entrée / Espace : active le contrôle, ← → : ajuste la valeur
//
// CONCEPT : État d'accessibilité
// - is_open() / aria_hidden() exposent l'état comme le ferait un dialog HTML
// - La modale ne persiste rien elle-même : App applique le contrôle
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::app::App;
use crate::settings::ColumnId;

// ============================================================================
// Contrôles
// ============================================================================

/// Zone de réglages éditée par la modale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalScope {
    Table,
    Grid,
    Chart,
}

impl ModalScope {
    pub fn title(&self) -> &'static str {
        match self {
            ModalScope::Table => " Table settings ",
            ModalScope::Grid => " Grid settings ",
            ModalScope::Chart => " Chart settings ",
        }
    }
}

/// Un contrôle focusable de la modale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsControl {
    // Tableau
    Column(ColumnId),
    TableSortColumn,
    TableSortDirection,
    TableDecimals,
    TableSparkline,
    TableCompact,
    TableArrows,
    TableDateFormat,

    // Grille
    GridColumns,
    GridSortColumn,
    GridSortDirection,
    GridDecimals,
    GridSparkline,
    GridCategory,
    GridUnit,
    GridDate,

    // Graphique
    ChartLineColor,
    ChartFill,
    ChartFillOpacity,
    ChartGrid,
    ChartMovingAverage,
    ChartMovingAverageWindow,
    ChartPercentChange,
    ChartThresholds,
    ChartUpperThreshold,
    ChartLowerThreshold,
    ChartSmoothLine,

    // Communs
    Theme,
    MarketTheme,
    ResetDefaults,
    Close,
}

impl SettingsControl {
    pub fn label(&self) -> String {
        let label = match self {
            SettingsControl::Column(column) => return format!("Column: {}", column.header()),
            SettingsControl::TableSortColumn | SettingsControl::GridSortColumn => "Sort by",
            SettingsControl::TableSortDirection | SettingsControl::GridSortDirection => {
                "Sort direction"
            }
            SettingsControl::TableDecimals | SettingsControl::GridDecimals => "Price decimals",
            SettingsControl::TableSparkline | SettingsControl::GridSparkline => "Sparkline",
            SettingsControl::TableCompact => "Compact rows",
            SettingsControl::TableArrows => "Change arrows",
            SettingsControl::TableDateFormat => "Date format",
            SettingsControl::GridColumns => "Cards per row",
            SettingsControl::GridCategory => "Show category",
            SettingsControl::GridUnit => "Show unit",
            SettingsControl::GridDate => "Show date",
            SettingsControl::ChartLineColor => "Line color",
            SettingsControl::ChartFill => "Area fill",
            SettingsControl::ChartFillOpacity => "Fill opacity",
            SettingsControl::ChartGrid => "Grid lines",
            SettingsControl::ChartMovingAverage => "Moving average",
            SettingsControl::ChartMovingAverageWindow => "MA window",
            SettingsControl::ChartPercentChange => "Percent change",
            SettingsControl::ChartThresholds => "Thresholds",
            SettingsControl::ChartUpperThreshold => "Upper threshold",
            SettingsControl::ChartLowerThreshold => "Lower threshold",
            SettingsControl::ChartSmoothLine => "Smooth line",
            SettingsControl::Theme => "Theme",
            SettingsControl::MarketTheme => "Market colors",
            SettingsControl::ResetDefaults => "Reset to defaults",
            SettingsControl::Close => "Close",
        };
        label.to_string()
    }
}

/// Contrôles affichés pour une zone, dans l'ordre du focus
pub fn controls_for(scope: ModalScope) -> Vec<SettingsControl> {
    use SettingsControl::*;

    let mut controls = match scope {
        ModalScope::Table => {
            // Le nom n'est pas masquable
            let mut c: Vec<SettingsControl> = ColumnId::ALL
                .iter()
                .copied()
                .filter(|column| *column != ColumnId::Name)
                .map(Column)
                .collect();
            c.extend([
                TableSortColumn,
                TableSortDirection,
                TableDecimals,
                TableSparkline,
                TableCompact,
                TableArrows,
                TableDateFormat,
            ]);
            c
        }
        ModalScope::Grid => vec![
            GridColumns,
            GridSortColumn,
            GridSortDirection,
            GridDecimals,
            GridSparkline,
            GridCategory,
            GridUnit,
            GridDate,
        ],
        ModalScope::Chart => vec![
            ChartLineColor,
            ChartFill,
            ChartFillOpacity,
            ChartGrid,
            ChartMovingAverage,
            ChartMovingAverageWindow,
            ChartPercentChange,
            ChartThresholds,
            ChartUpperThreshold,
            ChartLowerThreshold,
            ChartSmoothLine,
        ],
    };

    controls.extend([Theme, MarketTheme, ResetDefaults, Close]);
    controls
}

/// Action de l'utilisateur sur le contrôle focalisé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    /// Entrée / Espace
    Activate,
    /// Flèche droite
    Increase,
    /// Flèche gauche
    Decrease,
}

// ============================================================================
// État de la modale
// ============================================================================

/// État de la modale de réglages
#[derive(Debug, Clone)]
pub struct SettingsModal {
    open: bool,
    scope: ModalScope,
    controls: Vec<SettingsControl>,
    focus: usize,
    /// Élément sélectionné avant l'ouverture (identifiant, pas index :
    /// un changement de tri déplace les lignes)
    return_focus: Option<String>,
}

impl SettingsModal {
    pub fn new() -> Self {
        Self {
            open: false,
            scope: ModalScope::Table,
            controls: Vec::new(),
            focus: 0,
            return_focus: None,
        }
    }

    /// Ouvre la modale pour une zone
    ///
    /// `return_focus` : élément à re-sélectionner à la fermeture
    pub fn open(&mut self, scope: ModalScope, return_focus: Option<String>) {
        self.open = true;
        self.scope = scope;
        self.controls = controls_for(scope);
        self.focus = 0;
        self.return_focus = return_focus;
    }

    /// Ferme la modale et rend l'élément à re-sélectionner
    pub fn close(&mut self) -> Option<String> {
        self.open = false;
        self.controls.clear();
        self.focus = 0;
        self.return_focus.take()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// true quand la modale est masquée (aria-hidden)
    pub fn aria_hidden(&self) -> bool {
        !self.open
    }

    pub fn scope(&self) -> ModalScope {
        self.scope
    }

    pub fn controls(&self) -> &[SettingsControl] {
        &self.controls
    }

    pub fn focus_index(&self) -> usize {
        self.focus
    }

    pub fn focused(&self) -> Option<SettingsControl> {
        if !self.open {
            return None;
        }
        self.controls.get(self.focus).copied()
    }

    /// Tab : contrôle suivant (après le dernier, retour au premier)
    pub fn focus_next(&mut self) {
        if self.open && !self.controls.is_empty() {
            self.focus = (self.focus + 1) % self.controls.len();
        }
    }

    /// Shift-Tab : contrôle précédent (avant le premier, le dernier)
    pub fn focus_previous(&mut self) {
        if self.open && !self.controls.is_empty() {
            self.focus = (self.focus + self.controls.len() - 1) % self.controls.len();
        }
    }
}

impl Default for SettingsModal {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Rendu
// ============================================================================

/// Rectangle centré (pourcentages de la zone)
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Dessine la modale par-dessus l'écran courant
pub fn render_modal(frame: &mut Frame, app: &App) {
    let modal = &app.modal;
    if !modal.is_open() {
        return;
    }

    let theme = &app.theme;
    let area = centered_rect(60, 70, frame.size());

    // CONCEPT RATATUI : Clear efface la zone avant de dessiner la modale
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(modal.scope().title())
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent_color()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let items: Vec<ListItem> = modal
        .controls()
        .iter()
        .map(|control| {
            let value = app.control_value(*control);
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<22}", control.label()),
                    Style::default().fg(theme.text_color()),
                ),
                Span::styled(value, Style::default().fg(theme.accent_color())),
            ]))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD))
        .highlight_symbol("▶ ");

    // CONCEPT RATATUI : ListState garde le défilement sur l'élément focalisé
    let mut state = ListState::default();
    state.select(Some(modal.focus_index()));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let help = Paragraph::new("Tab/Shift-Tab: move │ Enter: toggle │ ←→: adjust │ Esc: close")
        .style(Style::default().fg(theme.muted_color()))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[1]);
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_focuses_first_control() {
        let mut modal = SettingsModal::new();
        assert!(modal.aria_hidden());
        assert_eq!(modal.focused(), None);

        modal.open(ModalScope::Grid, Some("gold".into()));
        assert!(modal.is_open());
        assert!(!modal.aria_hidden());
        assert_eq!(modal.focused(), Some(SettingsControl::GridColumns));
    }

    #[test]
    fn test_focus_trap_wraps_both_ways() {
        let mut modal = SettingsModal::new();
        modal.open(ModalScope::Chart, None);
        let count = modal.controls().len();

        modal.focus_previous();
        assert_eq!(modal.focused(), Some(SettingsControl::Close));

        modal.focus_next();
        assert_eq!(modal.focus_index(), 0);

        for _ in 0..count {
            modal.focus_next();
        }
        assert_eq!(modal.focus_index(), 0);
    }

    #[test]
    fn test_close_restores_focus() {
        let mut modal = SettingsModal::new();
        modal.open(ModalScope::Table, Some("copper".into()));
        modal.focus_next();

        assert_eq!(modal.close().as_deref(), Some("copper"));
        assert!(modal.aria_hidden());
        assert_eq!(modal.focused(), None);

        // Deuxième fermeture : rien à restaurer
        assert_eq!(modal.close(), None);
    }

    #[test]
    fn test_table_controls_skip_name_column() {
        let controls = controls_for(ModalScope::Table);
        assert!(!controls.contains(&SettingsControl::Column(ColumnId::Name)));
        assert!(controls.contains(&SettingsControl::Column(ColumnId::Source)));
        assert_eq!(controls.last(), Some(&SettingsControl::Close));
    }

    #[test]
    fn test_focus_ignored_when_closed() {
        let mut modal = SettingsModal::new();
        modal.focus_next();
        assert_eq!(modal.focus_index(), 0);
    }
}
