// ============================================================================
// Module : settings
// ============================================================================
// Réglages persistés de l'application (thème, vue, tableau, grille, graphique)
//
// - storage : backends clé/valeur (fichier JSON, mémoire)
// - types   : clés et structures typées de chaque zone de réglages
// - store   : fusion avec les valeurs par défaut + notifications
// ============================================================================

pub mod storage;
pub mod store;
pub mod types;

pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::{deep_merge, defaults_for, SettingsChange, SettingsStore};
pub use types::{
    ChartSettings, ColumnId, ColumnVisibility, GridSettings, SettingsArea, SettingsKey,
    SortSettings, TableSettings, ViewMode,
};
