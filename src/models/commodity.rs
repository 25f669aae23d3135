// ============================================================================
// Structure : Commodity
// ============================================================================
// Représente une matière première suivie par le dashboard (pétrole, or, blé...)
// avec son dernier prix et son historique d'observations.
//
// CONCEPTS RUST :
// 1. NaiveDate : date sans fuseau horaire (les séries sont journalières)
// 2. #[serde(default)] : champs optionnels dans le JSON
// 3. Normalisation à la construction : l'historique est toujours trié
// ============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::analytics::{self, DescriptiveStats};

/// Une observation de prix (une date, un prix)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Date de l'observation (format JSON "YYYY-MM-DD")
    pub date: NaiveDate,

    /// Prix observé
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Statistiques pré-calculées par le backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Derived {
    pub descriptive_stats: DescriptiveStats,
}

/// Ancien format de métriques (compatibilité avec les vieux fichiers)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyMetrics {
    pub change_1d: Option<f64>,
    pub pct_1d: Option<f64>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Record complet d'une matière première
///
/// CONCEPT RUST : Invariant de type
/// - `history` est trié par date croissante, sans doublons
/// - Garanti par `from_value()` et `normalize()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    /// Identifiant stable (ex: "brent_oil")
    pub id: String,

    /// Nom affiché (ex: "Brent Crude Oil")
    pub name: String,

    /// Catégorie (energy, metal, precious, agricultural)
    #[serde(default)]
    pub category: String,

    /// Dernier prix connu
    pub price: f64,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// Unité de cotation (ex: "USD/bbl")
    #[serde(default)]
    pub unit: String,

    /// Date de la dernière observation
    #[serde(default)]
    pub date: Option<NaiveDate>,

    /// Variation absolue depuis l'observation précédente
    #[serde(default)]
    pub change: f64,

    /// Variation en pourcentage depuis l'observation précédente
    #[serde(default)]
    pub change_percent: f64,

    /// Type de source (FRED, EIA, YAHOO, FREEGOLD...)
    #[serde(default)]
    pub source_type: String,

    #[serde(default)]
    pub source_name: Option<String>,

    #[serde(default)]
    pub source_url: Option<String>,

    /// "official_benchmark" ou "public_market_reference"
    #[serde(default)]
    pub source_class: Option<String>,

    /// true si les données ont été générées (mode simulation du backend)
    #[serde(default)]
    pub simulated: bool,

    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub derived: Option<Derived>,

    #[serde(default)]
    pub metrics: Option<LegacyMetrics>,

    /// Historique trié par date croissante
    #[serde(default)]
    pub history: Vec<PricePoint>,
}

impl Commodity {
    /// Crée un record minimal (utile pour les tests et les sources locales)
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            price,
            currency: default_currency(),
            unit: String::new(),
            date: None,
            change: 0.0,
            change_percent: 0.0,
            source_type: String::new(),
            source_name: None,
            source_url: None,
            source_class: None,
            simulated: false,
            updated_at: None,
            derived: None,
            metrics: None,
            history: Vec::new(),
        }
    }

    /// Builder : ajoute un historique (normalisé au passage)
    pub fn with_history(mut self, history: Vec<PricePoint>) -> Self {
        self.history = history;
        self.normalize();
        self
    }

    /// Builder : catégorie
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Désérialise un record JSON et le normalise
    ///
    /// CONCEPT RUST : Result<T, serde_json::Error>
    /// - Un record invalide est une erreur locale : l'appelant décide de le sauter
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut commodity: Commodity = serde_json::from_value(value)?;
        commodity.normalize();
        Ok(commodity)
    }

    /// Trie l'historique par date et supprime les doublons (la dernière valeur gagne)
    pub fn normalize(&mut self) {
        if !self.history.windows(2).all(|w| w[0].date < w[1].date) {
            self.history = analytics::merge_history(&[], &self.history);
        }

        if self.date.is_none() {
            self.date = self.history.last().map(|p| p.date);
        }
    }

    /// Dernière observation de l'historique
    pub fn latest(&self) -> Option<&PricePoint> {
        self.history.last()
    }

    /// Observation précédente (l'avant-dernière)
    pub fn previous_observation(&self) -> Option<&PricePoint> {
        let len = self.history.len();
        if len >= 2 {
            self.history.get(len - 2)
        } else {
            None
        }
    }

    /// Statistiques descriptives : pré-calculées si disponibles, sinon calculées
    pub fn stats(&self) -> DescriptiveStats {
        match &self.derived {
            Some(derived) if derived.descriptive_stats.observations > 0 => {
                derived.descriptive_stats.clone()
            }
            _ => analytics::compute_metrics(&self.history),
        }
    }

    /// Variation (absolue, %) à afficher
    ///
    /// Ordre de priorité : stats dérivées → anciennes métriques → champs du record.
    /// Les variations ne sont jamais recalculées à partir de la plage affichée.
    pub fn observed_change(&self) -> (f64, f64) {
        let stats = self.derived.as_ref().map(|d| &d.descriptive_stats);
        let legacy = self.metrics.as_ref();

        let change = stats
            .and_then(|s| s.abs_change_1_obs)
            .or_else(|| legacy.and_then(|m| m.change_1d))
            .unwrap_or(self.change);

        let change_percent = stats
            .and_then(|s| s.pct_change_1_obs)
            .or_else(|| legacy.and_then(|m| m.pct_1d))
            .unwrap_or(self.change_percent);

        (change, change_percent)
    }

    /// Libellé de la source (nom si connu, sinon type)
    pub fn source_label(&self) -> &str {
        self.source_name.as_deref().unwrap_or(&self.source_type)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_from_value_sorts_history() {
        let value = json!({
            "id": "gold",
            "name": "Gold",
            "price": 2000.0,
            "history": [
                {"date": "2024-01-10", "price": 2000.0},
                {"date": "2024-01-08", "price": 1950.0},
                {"date": "2024-01-09", "price": 1980.0}
            ]
        });

        let gold = Commodity::from_value(value).unwrap();
        let dates: Vec<NaiveDate> = gold.history.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(8), day(9), day(10)]);
        assert_eq!(gold.currency, "USD");
        assert_eq!(gold.date, Some(day(10)));
    }

    #[test]
    fn test_from_value_rejects_bad_date() {
        let value = json!({
            "id": "gold",
            "name": "Gold",
            "price": 2000.0,
            "history": [{"date": "10/01/2024", "price": 2000.0}]
        });

        assert!(Commodity::from_value(value).is_err());
    }

    #[test]
    fn test_duplicate_dates_keep_last_value() {
        let c = Commodity::new("x", "X", 1.0).with_history(vec![
            PricePoint::new(day(1), 1.0),
            PricePoint::new(day(1), 2.0),
            PricePoint::new(day(2), 3.0),
        ]);

        assert_eq!(c.history.len(), 2);
        assert_eq!(c.history[0].price, 2.0);
    }

    #[test]
    fn test_previous_observation() {
        let c = Commodity::new("gold", "Gold", 2000.0).with_history(vec![
            PricePoint::new(day(8), 1950.0),
            PricePoint::new(day(9), 1980.0),
            PricePoint::new(day(10), 2000.0),
        ]);

        let prev = c.previous_observation().unwrap();
        assert_eq!(prev.price, 1980.0);
        assert_eq!(prev.date, day(9));
    }

    #[test]
    fn test_observed_change_prefers_derived_then_legacy() {
        let mut c = Commodity::new("gold", "Gold", 2000.0);
        c.metrics = Some(LegacyMetrics {
            change_1d: Some(20.0),
            pct_1d: Some(1.01),
        });
        assert_eq!(c.observed_change(), (20.0, 1.01));

        c.derived = Some(Derived {
            descriptive_stats: DescriptiveStats {
                abs_change_1_obs: Some(5.0),
                pct_change_1_obs: Some(0.25),
                ..DescriptiveStats::default()
            },
        });
        assert_eq!(c.observed_change(), (5.0, 0.25));
    }
}
