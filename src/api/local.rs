// ============================================================================
// Source locale : répertoire de fichiers JSON
// ============================================================================
// Un fichier par matière première (ex: data/brent_oil.json), schema.json ignoré.
//
// Même traitement que le serveur :
// - l'historique est filtré pour l'affichage selon la plage
// - prix et date affichés = dernière observation de l'historique filtré
// - variations = statistiques pré-calculées (jamais recalculées sur la plage)
// - tri par nom pour un affichage stable
// ============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::api::FetchRequest;
use crate::models::{filter_by_range, Commodity, RangeToken};

const SCHEMA_FILE: &str = "schema.json";

/// Répertoire de données local
#[derive(Debug, Clone)]
pub struct LocalDataDir {
    root: PathBuf,
    dev_mode: bool,
}

impl LocalDataDir {
    pub fn new(root: impl Into<PathBuf>, dev_mode: bool) -> Self {
        Self {
            root: root.into(),
            dev_mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Charge toutes les matières premières du répertoire
    ///
    /// Répertoire absent : liste vide (comme le serveur).
    #[instrument(skip(self), fields(root = %self.root.display(), range = %request.range))]
    pub async fn fetch_commodities(&self, request: &FetchRequest) -> Result<Vec<Commodity>> {
        if !fs::try_exists(&self.root).await.unwrap_or(false) {
            warn!("Data directory does not exist");
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Échec de la lecture de {}", self.root.display()))?;

        let mut commodities = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .context("Échec du parcours du répertoire de données")?
        {
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|name| name != SCHEMA_FILE);
            if !is_record {
                continue;
            }

            let Some(commodity) = self.read_record(&path).await else {
                continue;
            };

            if !request.matches_category(&commodity.category) {
                continue;
            }

            commodities.push(apply_display_range(commodity, request.range));
        }

        commodities.sort_by(|a, b| a.name.cmp(&b.name));
        info!(count = commodities.len(), "Loaded commodities from data directory");
        Ok(commodities)
    }

    /// Lit et valide un fichier ; None si illisible ou invalide
    async fn read_record(&self, path: &Path) -> Option<Commodity> {
        match load_record(path).await {
            Ok(commodity) => Some(commodity),
            Err(e) if self.dev_mode => {
                warn!(path = %path.display(), error = ?e, "Skipping malformed record");
                None
            }
            Err(e) => {
                debug!(path = %path.display(), error = ?e, "Skipping malformed record");
                None
            }
        }
    }
}

/// Lit un fichier JSON et le convertit en Commodity
async fn load_record(path: &Path) -> Result<Commodity> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Échec de la lecture de {}", path.display()))?;
    let mut value: Value = serde_json::from_str(&content)
        .with_context(|| format!("JSON invalide dans {}", path.display()))?;

    // Identifiant manquant : déduit du nom de fichier
    if let (Some(object), Some(stem)) = (
        value.as_object_mut(),
        path.file_stem().and_then(|s| s.to_str()),
    ) {
        object
            .entry("id")
            .or_insert_with(|| Value::String(stem.to_string()));
    }

    Commodity::from_value(value).with_context(|| format!("Record invalide dans {}", path.display()))
}

/// Variations issues des statistiques pré-calculées
fn with_observed_change(mut commodity: Commodity) -> Commodity {
    let (change, change_percent) = commodity.observed_change();
    commodity.change = change;
    commodity.change_percent = change_percent;
    commodity
}

/// Restreint l'historique à la plage affichée
pub fn apply_display_range(mut commodity: Commodity, range: RangeToken) -> Commodity {
    let visible = filter_by_range(&commodity.history, range).len();
    let skip = commodity.history.len() - visible;
    commodity.history.drain(..skip);

    if let Some(last) = commodity.history.last() {
        commodity.price = last.price;
        commodity.date = Some(last.date);
    }

    with_observed_change(commodity)
}

// ============================================================================
// Tests unitaires
// ============================================================================
