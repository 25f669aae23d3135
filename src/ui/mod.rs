// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod chart;     // Écran de détail : graphique ligne
pub mod dashboard; // Rendu de l'interface principale
pub mod events;    // Gestion des événements clavier
pub mod grid;      // Vue en cartes
pub mod modal;     // Modale de réglages (focus trap)
pub mod view;      // Modèles de vue purs (tableau, grille, formats)

// Re-exports pour simplifier les imports
pub use dashboard::render;
pub use events::{Event, EventHandler};
