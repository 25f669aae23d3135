// ============================================================================
// Module : api
// ============================================================================
// Sources de données des matières premières :
// - client : backend HTTP (/api/commodities)
// - local  : répertoire de fichiers JSON
//
// CONCEPT RUST : Enum plutôt que trait objet
// - Deux sources connues à la compilation : un enum suffit
// - Pas de Box<dyn ...>, pas d'async-trait
// ============================================================================

pub mod client; // Client HTTP
pub mod local;  // Répertoire de données local

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::models::{Commodity, RangeToken};

pub use client::ApiClient;
pub use local::LocalDataDir;

/// Catégorie spéciale : aucun filtre
pub const ALL_CATEGORIES: &str = "all";

/// Paramètres d'un chargement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub range: RangeToken,
    pub category: String,
}

impl FetchRequest {
    pub fn new(range: RangeToken, category: impl Into<String>) -> Self {
        Self {
            range,
            category: category.into(),
        }
    }

    /// Catégorie à filtrer, None pour "all"
    pub fn category_filter(&self) -> Option<&str> {
        let category = self.category.trim();
        if category.is_empty() || category.eq_ignore_ascii_case(ALL_CATEGORIES) {
            None
        } else {
            Some(category)
        }
    }

    pub fn matches_category(&self, category: &str) -> bool {
        match self.category_filter() {
            Some(wanted) => wanted.eq_ignore_ascii_case(category),
            None => true,
        }
    }
}

/// Source de données injectée dans le worker
#[derive(Debug, Clone)]
pub enum DataSource {
    Http(ApiClient),
    Local(LocalDataDir),
}

impl DataSource {
    /// Choisit la source selon la configuration (répertoire local prioritaire)
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match &config.data_dir {
            Some(dir) => {
                info!(data_dir = %dir.display(), "Using local data directory");
                Ok(DataSource::Local(LocalDataDir::new(dir, config.dev_mode)))
            }
            None => {
                info!(api = %config.api_base_url, "Using HTTP API");
                let client = ApiClient::new(
                    config.api_base_url.clone(),
                    config.request_timeout_secs,
                    config.dev_mode,
                )?;
                Ok(DataSource::Http(client))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DataSource::Http(client) => client.base_url().to_string(),
            DataSource::Local(dir) => dir.root().display().to_string(),
        }
    }

    pub async fn fetch_commodities(&self, request: &FetchRequest) -> Result<Vec<Commodity>> {
        match self {
            DataSource::Http(client) => client.fetch_commodities(request).await,
            DataSource::Local(dir) => dir.fetch_commodities(request).await,
        }
    }
}

/// Convertit des records JSON bruts en Commodity
///
/// Un record invalide est sauté : signalé en warn! en mode développeur,
/// en debug! sinon.
pub fn parse_records(records: Vec<Value>, dev_mode: bool) -> Vec<Commodity> {
    let total = records.len();
    let mut commodities = Vec::with_capacity(total);

    for (index, record) in records.into_iter().enumerate() {
        match Commodity::from_value(record) {
            Ok(commodity) => commodities.push(commodity),
            Err(e) if dev_mode => warn!(index, error = %e, "Skipping malformed record"),
            Err(e) => debug!(index, error = %e, "Skipping malformed record"),
        }
    }

    if commodities.len() < total {
        debug!(kept = commodities.len(), total, "Some records were skipped");
    }
    commodities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter() {
        assert_eq!(FetchRequest::new(RangeToken::All, "all").category_filter(), None);
        assert_eq!(FetchRequest::new(RangeToken::All, "").category_filter(), None);

        let energy = FetchRequest::new(RangeToken::All, "Energy");
        assert_eq!(energy.category_filter(), Some("Energy"));
        assert!(energy.matches_category("energy"));
        assert!(!energy.matches_category("metal"));
    }

    #[test]
    fn test_source_from_config() {
        let config = AppConfig {
            data_dir: Some("/srv/data".into()),
            ..AppConfig::default()
        };
        assert!(matches!(DataSource::from_config(&config).unwrap(), DataSource::Local(_)));

        let http = DataSource::from_config(&AppConfig::default()).unwrap();
        assert_eq!(http.describe(), "http://localhost:3000");
    }
}
