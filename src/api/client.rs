// ============================================================================
// API Client : backend HTTP BenchWatch
// ============================================================================
// GET {base_url}/api/commodities?range=<token>&category=<nom>
//
// Réponse acceptée sous deux formes :
// - enveloppe : { "data": [ {...}, {...} ] }
// - tableau nu : [ {...}, {...} ]
//
// CONCEPTS RUST :
// 1. reqwest::Client réutilisable (pool de connexions)
// 2. #[serde(untagged)] : plusieurs formes JSON pour un même type
// 3. #[instrument] : span tracing avec les paramètres de la requête
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::api::{parse_records, FetchRequest};
use crate::models::Commodity;

/// Corps de réponse de l'API
///
/// CONCEPT RUST : #[serde(untagged)]
/// - Serde essaie chaque variante dans l'ordre
/// - La première qui se désérialise gagne
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommoditiesBody {
    Envelope { data: Vec<Value> },
    Bare(Vec<Value>),
}

impl CommoditiesBody {
    fn into_records(self) -> Vec<Value> {
        match self {
            CommoditiesBody::Envelope { data } => data,
            CommoditiesBody::Bare(records) => records,
        }
    }
}

/// Client HTTP vers le backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    dev_mode: bool,
}

impl ApiClient {
    /// Crée un client (timeout par requête en secondes)
    pub fn new(base_url: impl Into<String>, timeout_secs: u64, dev_mode: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("benchwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            dev_mode,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Construit l'URL de la requête
    ///
    /// La catégorie n'est envoyée que si elle filtre quelque chose.
    pub fn commodities_url(&self, request: &FetchRequest) -> Result<Url> {
        let endpoint = format!("{}/api/commodities", self.base_url.trim_end_matches('/'));

        let mut params = vec![("range", request.range.label().to_string())];
        if let Some(category) = request.category_filter() {
            params.push(("category", category.to_string()));
        }

        Url::parse_with_params(&endpoint, &params)
            .with_context(|| format!("URL d'API invalide : {}", endpoint))
    }

    /// Récupère les matières premières pour une plage et une catégorie
    #[instrument(skip(self), fields(range = %request.range, category = ?request.category))]
    pub async fn fetch_commodities(&self, request: &FetchRequest) -> Result<Vec<Commodity>> {
        let url = self.commodities_url(request)?;
        debug!(url = %url, "Sending HTTP request");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("Échec de la requête HTTP vers l'API")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            error!(status = %status, "API returned error status");
            anyhow::bail!("L'API a retourné une erreur : HTTP {}", status);
        }

        let body = response
            .text()
            .await
            .context("Échec de la lecture de la réponse")?;
        let commodities = parse_body(&body, self.dev_mode)?;

        info!(count = commodities.len(), "Successfully fetched commodities");
        Ok(commodities)
    }
}

/// Parse le corps JSON d'une réponse
pub fn parse_body(body: &str, dev_mode: bool) -> Result<Vec<Commodity>> {
    let parsed: CommoditiesBody =
        serde_json::from_str(body).context("Échec du parsing JSON de la réponse")?;
    Ok(parse_records(parsed.into_records(), dev_mode))
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RangeToken;

    #[test]
    fn test_commodities_url() {
        let client = ApiClient::new("http://localhost:3000/", 5, false).unwrap();

        let all = FetchRequest::new(RangeToken::ThreeMonths, "all");
        let url = client.commodities_url(&all).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/commodities?range=3M");

        let energy = FetchRequest::new(RangeToken::OneWeek, "energy");
        let url = client.commodities_url(&energy).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/commodities?range=1W&category=energy"
        );
    }

    #[test]
    fn test_parse_envelope_and_bare_array() {
        let record = r#"{"id": "gold", "name": "Gold", "price": 2400.5}"#;

        let envelope = parse_body(&format!(r#"{{"data": [{}]}}"#, record), false).unwrap();
        let bare = parse_body(&format!("[{}]", record), false).unwrap();

        assert_eq!(envelope.len(), 1);
        assert_eq!(envelope, bare);
        assert_eq!(envelope[0].currency, "USD");
    }

    #[test]
    fn test_parse_skips_malformed_records() {
        let body = r#"[
            {"id": "gold", "name": "Gold", "price": 2400.5},
            {"id": "broken", "price": "cher"},
            {"id": "wti", "name": "WTI", "price": 78.1,
             "history": [{"date": "2024-01-02", "price": 70.0}, {"date": "2024-01-01", "price": 71.0}]}
        ]"#;

        let commodities = parse_body(body, true).unwrap();
        assert_eq!(commodities.len(), 2);
        assert!(commodities[1].history[0].date < commodities[1].history[1].date);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_body("<html>oops</html>", false).is_err());
    }
}
