// ============================================================================
// Gestion des événements
// ============================================================================
// Lit le clavier (crossterm) et traduit les touches en intentions :
// navigation, plages, vue, thème, modale de réglages.
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Pattern matching avec matches! et gardes
// 3. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::models::RangeToken;

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (resynchronisation des réglages, rafraîchissement)
    Tick,

    /// Le terminal a changé de taille
    Resize,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
        }
    }

    /// Lit le prochain événement (bloquant avec timeout)
    ///
    /// CONCEPT : Non-blocking I/O avec timeout
    /// - poll(tick_rate) attend au plus 250ms
    /// - Si pas d'événement, retourne Ok(Event::Tick)
    pub fn next(&self) -> Result<Event> {
        if !event::poll(self.tick_rate)? {
            return Ok(Event::Tick);
        }

        let event = match event::read()? {
            // Sur certains OS, on reçoit Press ET Release : on ne garde que Press
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
            CrosstermEvent::Resize(_, _) => Event::Resize,
            _ => Event::Tick,
        };
        Ok(event)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : Convertir KeyEvent en intention
// ============================================================================

fn key_code(event: &Event) -> Option<KeyCode> {
    match event {
        Event::Key(key) => Some(key.code),
        _ => None,
    }
}

/// Touche lettre, insensible à la casse
fn is_letter(event: &Event, letter: char) -> bool {
    matches!(key_code(event), Some(KeyCode::Char(c)) if c.eq_ignore_ascii_case(&letter))
}

/// 'q' ou Ctrl+C
pub fn is_quit_event(event: &Event) -> bool {
    if let Event::Key(key) = event {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
    }
    is_letter(event, 'q')
}

pub fn is_escape_event(event: &Event) -> bool {
    key_code(event) == Some(KeyCode::Esc)
}

pub fn is_space_event(event: &Event) -> bool {
    key_code(event) == Some(KeyCode::Char(' '))
}

pub fn is_enter_event(event: &Event) -> bool {
    key_code(event) == Some(KeyCode::Enter)
}

/// Flèche haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Up)) || is_letter(event, 'k')
}

/// Flèche bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Down)) || is_letter(event, 'j')
}

pub fn is_left_event(event: &Event) -> bool {
    key_code(event) == Some(KeyCode::Left)
}

pub fn is_right_event(event: &Event) -> bool {
    key_code(event) == Some(KeyCode::Right)
}

/// Tab (focus suivant dans la modale)
pub fn is_tab_event(event: &Event) -> bool {
    match event {
        Event::Key(key) => key.code == KeyCode::Tab && !key.modifiers.contains(KeyModifiers::SHIFT),
        _ => false,
    }
}

/// Shift+Tab : selon le terminal, BackTab ou Tab + SHIFT
pub fn is_backtab_event(event: &Event) -> bool {
    match event {
        Event::Key(key) => {
            key.code == KeyCode::BackTab
                || (key.code == KeyCode::Tab && key.modifiers.contains(KeyModifiers::SHIFT))
        }
        _ => false,
    }
}

/// ']' ou 'l' : plage suivante
pub fn is_next_range_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char(']'))) || is_letter(event, 'l')
}

/// '[' ou 'h' : plage précédente
pub fn is_previous_range_event(event: &Event) -> bool {
    matches!(key_code(event), Some(KeyCode::Char('['))) || is_letter(event, 'h')
}

/// Raccourcis 1..6 → plage directe (1W ... ALL)
pub fn range_shortcut(event: &Event) -> Option<RangeToken> {
    match key_code(event)? {
        KeyCode::Char(c @ '1'..='6') => {
            let index = c.to_digit(10)? as usize - 1;
            RangeToken::TOKENS.get(index).copied()
        }
        _ => None,
    }
}

/// 'v' : bascule tableau / grille
pub fn is_view_toggle_event(event: &Event) -> bool {
    is_letter(event, 'v')
}

/// 't' : thème suivant
pub fn is_theme_event(event: &Event) -> bool {
    is_letter(event, 't')
}

/// 'm' : convention de couleurs du marché
pub fn is_market_theme_event(event: &Event) -> bool {
    is_letter(event, 'm')
}

/// 's' : ouvre la modale de réglages
pub fn is_settings_event(event: &Event) -> bool {
    is_letter(event, 's')
}

/// 'r' : relance le chargement
pub fn is_retry_event(event: &Event) -> bool {
    is_letter(event, 'r')
}

/// 'c' : catégorie suivante
pub fn is_category_event(event: &Event) -> bool {
    is_letter(event, 'c')
}

/// 'y' : confirmation (quitter)
pub fn is_confirm_event(event: &Event) -> bool {
    is_letter(event, 'y')
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(is_quit_event(&key(KeyCode::Char('Q'))));
        assert!(is_quit_event(&Event::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        ))));
        assert!(!is_quit_event(&key(KeyCode::Char('c'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_tab_and_backtab_are_distinct() {
        let shift_tab = Event::Key(KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT));
        assert!(is_tab_event(&key(KeyCode::Tab)));
        assert!(!is_tab_event(&shift_tab));
        assert!(is_backtab_event(&shift_tab));
        assert!(is_backtab_event(&key(KeyCode::BackTab)));
    }

    #[test]
    fn test_range_shortcuts() {
        assert_eq!(range_shortcut(&key(KeyCode::Char('1'))), Some(RangeToken::OneWeek));
        assert_eq!(range_shortcut(&key(KeyCode::Char('6'))), Some(RangeToken::All));
        assert_eq!(range_shortcut(&key(KeyCode::Char('7'))), None);
        assert_eq!(range_shortcut(&Event::Tick), None);
    }

    #[test]
    fn test_vim_navigation() {
        assert!(is_up_event(&key(KeyCode::Char('k'))));
        assert!(is_down_event(&key(KeyCode::Char('J'))));
        assert!(is_next_range_event(&key(KeyCode::Char(']'))));
        assert!(is_previous_range_event(&key(KeyCode::Char('h'))));
    }
}
