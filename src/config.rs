// ============================================================================
// Configuration de l'application
// ============================================================================
// Fichier : <config_dir>/benchwatch/config.json
// - Linux : ~/.config/benchwatch/config.json
// - macOS : ~/Library/Application Support/benchwatch/config.json
//
// Variables d'environnement (prioritaires sur le fichier) :
// - BENCHWATCH_API_URL  : URL de base de l'API
// - BENCHWATCH_DATA_DIR : répertoire de données locales (remplace l'API)
// - BENCHWATCH_DEV      : "1" / "true" active le mode développeur
//
// CONCEPTS RUST :
// 1. #[serde(default)] : un fichier partiel reste valide
// 2. Fonction de lookup injectée : les tests n'ont pas besoin de std::env
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::RangeToken;
use crate::theme::PaletteOverrides;

pub const ENV_API_URL: &str = "BENCHWATCH_API_URL";
pub const ENV_DATA_DIR: &str = "BENCHWATCH_DATA_DIR";
pub const ENV_DEV: &str = "BENCHWATCH_DEV";

/// Configuration chargée au démarrage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// URL de base de l'API (ex: http://localhost:3000)
    pub api_base_url: String,

    /// Répertoire de fichiers JSON (prioritaire sur l'API si défini)
    pub data_dir: Option<PathBuf>,

    /// Fichier des réglages persistés (None = emplacement par défaut)
    pub settings_path: Option<PathBuf>,

    /// Plage affichée au démarrage
    pub default_range: RangeToken,

    /// Catégorie affichée au démarrage ("all" = toutes)
    pub default_category: String,

    /// Mode développeur : records invalides signalés en warn!
    pub dev_mode: bool,

    /// Timeout des requêtes HTTP (secondes)
    pub request_timeout_secs: u64,

    /// Surcharges de la palette des graphiques
    pub palette: PaletteOverrides,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            data_dir: None,
            settings_path: None,
            default_range: RangeToken::default(),
            default_category: "all".to_string(),
            dev_mode: false,
            request_timeout_secs: 10,
            palette: PaletteOverrides::default(),
        }
    }
}

impl AppConfig {
    /// Emplacement par défaut du fichier de configuration
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("benchwatch").join("config.json"))
    }

    /// Charge la configuration : fichier puis variables d'environnement
    ///
    /// Un fichier absent ou invalide n'est pas fatal : on garde les défauts.
    pub fn load() -> Self {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = ?e, "Invalid config file, using defaults");
                Self::default()
            }),
            _ => {
                debug!("No config file, using defaults");
                Self::default()
            }
        };

        config.apply_env(|name| std::env::var(name).ok());
        info!(
            api = %config.api_base_url,
            data_dir = ?config.data_dir,
            dev_mode = config.dev_mode,
            "Configuration loaded"
        );
        config
    }

    /// Lit un fichier JSON de configuration
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Échec de la lecture de {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Échec du parsing de {}", path.display()))
    }

    /// Applique les surcharges d'environnement
    ///
    /// CONCEPT RUST : Closure en paramètre
    /// - `lookup` : Fn(&str) -> Option<String>
    /// - En production : std::env::var ; en test : une HashMap
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(flag) = lookup(ENV_DEV) {
            self.dev_mode = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Fichier des réglages effectif
    ///
    /// None si aucun répertoire de données n'existe sur la plateforme :
    /// le store fonctionnera alors en mémoire.
    pub fn resolved_settings_path(&self) -> Option<PathBuf> {
        self.settings_path.clone().or_else(|| {
            dirs::data_local_dir().map(|dir| dir.join("benchwatch").join("settings.json"))
        })
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
