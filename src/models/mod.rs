// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod analytics; // Calculs sur les séries (variations, moyenne mobile, métriques)
pub mod commodity; // Record d'une matière première
pub mod range;     // Plages d'affichage (1W ... ALL) et filtre

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use benchwatch::models::commodity::Commodity;
// On peut faire : use benchwatch::models::Commodity;
pub use analytics::{DescriptiveStats, Direction};
pub use commodity::{Commodity, Derived, LegacyMetrics, PricePoint};
pub use range::{filter_by_range, RangeToken};
