// ============================================================================
// SettingsStore : réglages persistés + fusion avec les valeurs par défaut
// ============================================================================
// - get(key)    → valeurs par défaut ⊕ valeurs stockées
// - save(key)   → sérialise, persiste immédiatement, notifie les abonnés
// - remove(key) → supprime l'entrée, notifie avec None
//
// CONCEPT IMPORTANT : dégradation gracieuse
// - Si le backend échoue (disque plein, permissions, fichier corrompu),
//   le store bascule sur un stockage en mémoire et continue de fonctionner
// - L'application ne plante jamais à cause des réglages
//
// CONCEPTS RUST :
// 1. Box<dyn Storage> : backend injecté au constructeur
// 2. mpsc::Sender : notifications de changement vers les abonnés
// 3. Génériques avec trait bound : load::<TableSettings>()
// ============================================================================

use std::path::Path;
use std::sync::mpsc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::settings::storage::{FileStorage, MemoryStorage, Storage, StorageError};
use crate::settings::types::{
    ChartSettings, GridSettings, SettingsArea, SettingsKey, TableSettings, ViewMode,
};
use crate::theme::{MarketTheme, Theme};

/// Notification émise après chaque save() / remove()
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsChange {
    pub key: SettingsKey,
    /// Nouvelle valeur, None après une suppression
    pub value: Option<Value>,
}

// ============================================================================
// Fusion profonde
// ============================================================================

/// Fusionne `overrides` par-dessus `defaults`
///
/// CONCEPT : Deep merge
/// - Deux objets : fusion clé par clé, récursive pour les objets imbriqués
/// - Un objet par défaut n'est jamais remplacé par un non-objet :
///   l'override est ignoré, on garde l'objet par défaut
/// - Sinon : la valeur de `overrides` remplace celle de `defaults`
/// - Une clé présente uniquement dans `defaults` n'est jamais perdue
pub fn deep_merge(defaults: &Value, overrides: &Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(base), Value::Object(over)) => {
            let mut merged = base.clone();
            for (key, value) in over {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (Value::Object(_), _) => defaults.clone(),
        (_, over) => over.clone(),
    }
}

/// Valeurs par défaut d'une clé, sous forme JSON
pub fn defaults_for(key: SettingsKey) -> Value {
    let value = match key {
        SettingsKey::Theme => serde_json::to_value(Theme::default()),
        SettingsKey::MarketTheme => serde_json::to_value(MarketTheme::default()),
        SettingsKey::ViewMode => serde_json::to_value(ViewMode::default()),
        SettingsKey::TableSettings => serde_json::to_value(TableSettings::default()),
        SettingsKey::GridSettings => serde_json::to_value(GridSettings::default()),
        SettingsKey::ChartSettings => serde_json::to_value(ChartSettings::default()),
    };
    value.unwrap_or(Value::Object(Map::new()))
}

// ============================================================================
// Structure : SettingsStore
// ============================================================================

/// Store de réglages avec repli en mémoire
pub struct SettingsStore {
    /// Backend principal (fichier en production)
    backend: Box<dyn Storage>,

    /// Some(...) dès que le backend a échoué une fois
    fallback: Option<MemoryStorage>,

    /// Abonnés aux changements
    subscribers: Vec<mpsc::Sender<SettingsChange>>,
}

impl SettingsStore {
    /// Crée un store au-dessus d'un backend quelconque
    pub fn new(backend: Box<dyn Storage>) -> Self {
        Self {
            backend,
            fallback: None,
            subscribers: Vec::new(),
        }
    }

    /// Store éphémère (tests, ou aucun répertoire de données disponible)
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Store persistant dans un fichier JSON
    pub fn open(path: &Path) -> Self {
        debug!(path = %path.display(), "Opening settings store");
        Self::new(Box::new(FileStorage::new(path)))
    }

    /// true si le store a basculé en mémoire
    pub fn is_degraded(&self) -> bool {
        self.fallback.is_some()
    }

    /// S'abonne aux changements
    ///
    /// CONCEPT RUST : mpsc channel
    /// - Le store garde le Sender, l'abonné reçoit le Receiver
    /// - Un abonné disparu (Receiver drop) est retiré au prochain envoi
    pub fn subscribe(&mut self) -> mpsc::Receiver<SettingsChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    // ------------------------------------------------------------------------
    // Accès brut au backend (avec repli)
    // ------------------------------------------------------------------------

    fn degrade(&mut self, error: &StorageError) {
        if self.fallback.is_none() {
            warn!(error = %error, "Settings storage unavailable, falling back to memory");
            self.fallback = Some(MemoryStorage::new());
        }
    }

    /// Lecture : la mémoire (écritures depuis la bascule) d'abord,
    /// puis le backend, qui peut encore servir les valeurs déjà persistées
    fn read(&mut self, key: SettingsKey) -> Option<String> {
        if let Some(memory) = &self.fallback {
            if let Ok(Some(value)) = memory.get_item(key.as_str()) {
                return Some(value);
            }
        }

        match self.backend.get_item(key.as_str()) {
            Ok(value) => value,
            Err(e) => {
                self.degrade(&e);
                None
            }
        }
    }

    fn write(&mut self, key: SettingsKey, text: &str) {
        if self.fallback.is_none() {
            match self.backend.set_item(key.as_str(), text) {
                Ok(()) => return,
                Err(e) => self.degrade(&e),
            }
        }

        if let Some(memory) = &mut self.fallback {
            let _ = memory.set_item(key.as_str(), text);
        }
    }

    fn delete(&mut self, key: SettingsKey) {
        if self.fallback.is_none() {
            match self.backend.remove_item(key.as_str()) {
                Ok(()) => return,
                Err(e) => self.degrade(&e),
            }
        }

        // "null" masque une valeur encore présente dans le backend
        if let Some(memory) = &mut self.fallback {
            let _ = memory.set_item(key.as_str(), "null");
        }
    }

    fn notify(&mut self, change: SettingsChange) {
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    // ------------------------------------------------------------------------
    // API publique
    // ------------------------------------------------------------------------

    /// Valeur stockée telle quelle (None si absente ou illisible)
    pub fn stored(&mut self, key: SettingsKey) -> Option<Value> {
        let text = self.read(key)?;
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Stored settings unreadable, using defaults");
                None
            }
        }
    }

    /// Réglages fusionnés : valeurs par défaut ⊕ valeurs stockées
    pub fn get(&mut self, key: SettingsKey) -> Value {
        let defaults = defaults_for(key);
        match self.stored(key) {
            Some(stored) if defaults.is_object() && !stored.is_object() => {
                warn!(key = %key, "Stored settings are not an object, using defaults");
                defaults
            }
            Some(stored) => deep_merge(&defaults, &stored),
            None => defaults,
        }
    }

    /// Persiste une valeur et notifie les abonnés
    pub fn save(&mut self, key: SettingsKey, value: &Value) {
        self.write(key, &value.to_string());
        debug!(key = %key, "Settings saved");
        self.notify(SettingsChange {
            key,
            value: Some(value.clone()),
        });
    }

    /// Supprime une valeur (retour aux valeurs par défaut) et notifie
    pub fn remove(&mut self, key: SettingsKey) {
        self.delete(key);
        debug!(key = %key, "Settings removed");
        self.notify(SettingsChange { key, value: None });
    }

    /// Lit une zone de réglages typée
    ///
    /// CONCEPT RUST : Turbofish
    /// - store.load::<TableSettings>() ou `let t: TableSettings = store.load();`
    /// - Si la fusion ne se désérialise pas (valeur stockée du mauvais type),
    ///   on retombe sur T::default()
    pub fn load<T: SettingsArea>(&mut self) -> T {
        let key = T::KEY;
        let merged = self.get(key);
        match serde_json::from_value(merged) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Invalid stored settings, using defaults");
                T::default()
            }
        }
    }

    /// Persiste une zone de réglages typée
    pub fn store<T: SettingsArea>(&mut self, value: &T) {
        let key = T::KEY;
        match serde_json::to_value(value) {
            Ok(json) => self.save(key, &json),
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize settings"),
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Backend qui échoue toujours (disque indisponible)
    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disque absent".into()))
        }
        fn set_item(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disque absent".into()))
        }
        fn remove_item(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disque absent".into()))
        }
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let defaults = json!({"a": 1, "b": {"c": true, "d": "x"}});
        assert_eq!(deep_merge(&defaults, &json!({})), defaults);
    }

    #[test]
    fn test_merge_keeps_untouched_keys() {
        let defaults = json!({"a": 0, "b": {"c": true, "d": "x"}});
        let merged = deep_merge(&defaults, &json!({"a": 1, "b": {"c": false}}));

        assert_eq!(merged["a"], json!(1));
        assert_eq!(merged["b"]["c"], json!(false));
        assert_eq!(merged["b"]["d"], json!("x"));
    }

    #[test]
    fn test_merge_adds_override_only_keys() {
        let merged = deep_merge(&json!({"a": 1}), &json!({"z": [1, 2]}));
        assert_eq!(merged, json!({"a": 1, "z": [1, 2]}));
    }

    #[test]
    fn test_get_without_stored_value_returns_defaults() {
        let mut store = SettingsStore::in_memory();
        assert_eq!(
            store.get(SettingsKey::TableSettings),
            defaults_for(SettingsKey::TableSettings)
        );
    }

    #[test]
    fn test_load_merges_partial_values() {
        let mut store = SettingsStore::in_memory();
        store.save(SettingsKey::TableSettings, &json!({"columns": {"unit": false}}));

        let table: TableSettings = store.load();
        assert!(!table.columns.unit);
        assert!(table.columns.price);
        assert_eq!(table.price_decimals, 2);
    }

    #[test]
    fn test_wrong_type_falls_back_to_defaults() {
        let mut store = SettingsStore::in_memory();
        store.save(SettingsKey::GridSettings, &json!({"columns": "beaucoup"}));

        let grid: GridSettings = store.load();
        assert_eq!(grid, GridSettings::default());
    }

    #[test]
    fn test_notifications_on_save_and_remove() {
        let mut store = SettingsStore::in_memory();
        let rx = store.subscribe();

        store.store(&ViewMode::Grid);
        store.remove(SettingsKey::ViewMode);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.key, SettingsKey::ViewMode);
        assert_eq!(first.value, Some(json!("grid")));

        let second = rx.try_recv().unwrap();
        assert_eq!(second.value, None);

        assert_eq!(store.load::<ViewMode>(), ViewMode::Table);
    }

    #[test]
    fn test_dropped_subscriber_is_removed() {
        let mut store = SettingsStore::in_memory();
        drop(store.subscribe());
        store.store(&ViewMode::Grid);
        assert!(store.subscribers.is_empty());
    }

    /// Backend en mémoire qui refuse les écritures une fois `read_only`
    struct ReadOnlyAfter {
        inner: MemoryStorage,
        read_only: Arc<AtomicBool>,
    }

    impl Storage for ReadOnlyAfter {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }
        fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.read_only.load(Ordering::SeqCst) {
                return Err(StorageError::QuotaExceeded { size: value.len(), limit: 0 });
            }
            self.inner.set_item(key, value)
        }
        fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
            if self.read_only.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("lecture seule".into()));
            }
            self.inner.remove_item(key)
        }
    }

    #[test]
    fn test_merge_ignores_scalar_over_object() {
        let defaults = json!({"a": 1, "b": {"c": 2}});
        assert_eq!(deep_merge(&defaults, &json!("garbage")), defaults);
        assert_eq!(deep_merge(&defaults, &json!([1, 2])), defaults);

        let merged = deep_merge(&defaults, &json!({"b": 7}));
        assert_eq!(merged["b"], json!({"c": 2}));
    }

    #[test]
    fn test_get_rejects_non_object_stored_value() {
        let mut store = SettingsStore::in_memory();
        store.save(SettingsKey::TableSettings, &json!([1, 2]));
        assert_eq!(
            store.get(SettingsKey::TableSettings),
            defaults_for(SettingsKey::TableSettings)
        );
        assert_eq!(store.load::<TableSettings>(), TableSettings::default());
    }

    #[test]
    fn test_fallback_keeps_values_persisted_before_failure() {
        let read_only = Arc::new(AtomicBool::new(false));
        let backend = ReadOnlyAfter {
            inner: MemoryStorage::new(),
            read_only: read_only.clone(),
        };
        let mut store = SettingsStore::new(Box::new(backend));
        store.store(&Theme::Bloomberg);
        store.store(&ViewMode::Grid);

        read_only.store(true, Ordering::SeqCst);
        let table = TableSettings {
            compact: true,
            ..TableSettings::default()
        };
        store.store(&table);
        assert!(store.is_degraded());

        // Les valeurs déjà persistées restent lisibles
        assert_eq!(store.load::<Theme>(), Theme::Bloomberg);
        assert!(store.load::<TableSettings>().compact);

        // Une suppression après la bascule masque la valeur du backend
        store.remove(SettingsKey::ViewMode);
        assert_eq!(store.load::<ViewMode>(), ViewMode::Table);
    }

    #[test]
    fn test_broken_backend_degrades_to_memory() {
        let mut store = SettingsStore::new(Box::new(BrokenStorage));
        assert!(!store.is_degraded());

        store.store(&ViewMode::Grid);
        assert!(store.is_degraded());

        // La valeur survit en mémoire
        assert_eq!(store.load::<ViewMode>(), ViewMode::Grid);
    }
}
