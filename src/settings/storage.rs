// ============================================================================
// Backends de stockage clé/valeur
// ============================================================================
// Équivalent terminal du "localStorage" d'un navigateur :
// - FileStorage : un objet JSON { clé: valeur } dans un fichier
// - MemoryStorage : une HashMap en mémoire (repli si le disque échoue)
//
// CONCEPTS RUST :
// 1. Traits : une interface commune pour plusieurs backends
// 2. thiserror : erreurs typées (le store doit savoir QUOI a échoué)
// 3. Écriture atomique : fichier .tmp puis rename
// ============================================================================

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Quota par défaut, comme le localStorage des navigateurs (5 Mio)
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Erreurs possibles d'un backend de stockage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("stockage indisponible : {0}")]
    Unavailable(String),

    #[error("quota de stockage dépassé ({size} octets, limite {limit})")]
    QuotaExceeded { size: usize, limit: usize },

    #[error("erreur d'entrée/sortie : {0}")]
    Io(#[from] std::io::Error),

    #[error("fichier de stockage corrompu : {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Interface clé/valeur (valeurs sérialisées en texte)
///
/// CONCEPT RUST : Trait objet
/// - Le store manipule un `Box<dyn Storage>`
/// - On peut injecter n'importe quel backend (fichier, mémoire, mock de test)
pub trait Storage: Send {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// Stockage en mémoire : ne peut pas échouer, disparaît à la fermeture
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

// ============================================================================
// FileStorage
// ============================================================================

/// Stockage persistant dans un fichier JSON
///
/// Chaque écriture relit puis réécrit le fichier entier : pas de cache,
/// pas de batching. Les réglages sont petits et modifiés à la main.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    quota: usize,
}

impl FileStorage {
    /// Crée un stockage fichier (le fichier est créé à la première écriture)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota: DEFAULT_QUOTA_BYTES,
        }
    }

    /// Change le quota (en octets)
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = quota;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lit toutes les entrées (fichier absent = stockage vide)
    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Écrit toutes les entrées de manière atomique
    ///
    /// CONCEPT : Atomic write
    /// - Écrit dans "settings.json.tmp"
    /// - Puis rename() : soit l'ancien fichier, soit le nouveau, jamais à moitié
    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(items)?;
        if json.len() > self.quota {
            return Err(StorageError::QuotaExceeded {
                size: json.len(),
                limit: self.quota,
            });
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Unavailable(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        if let Err(e) = fs::write(&tmp_path, json.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), entries = items.len(), "Settings file written");
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
