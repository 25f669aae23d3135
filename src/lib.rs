// ============================================================================
// Benchwatch - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests d'intégration
// ============================================================================

pub mod api;      // Sources de données (HTTP, répertoire local)
pub mod app;      // État de l'application
pub mod config;   // Configuration (fichier + variables d'environnement)
pub mod models;   // Structures de données et filtre par plage
pub mod settings; // Réglages persistés
pub mod theme;    // Thèmes et palettes
pub mod ui;       // Interface utilisateur
pub mod worker;   // Worker de chargement (tokio)
