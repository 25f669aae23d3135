// ============================================================================
// Analytics : calculs sur les séries de prix
// ============================================================================
// Toutes les métriques sont basées sur des OBSERVATIONS, pas sur le calendrier :
// "1 observation en arrière" peut être 1 jour ou 4 ans selon la source.
//
// CONCEPTS RUST :
// 1. Fonctions pures : prennent des slices, retournent des valeurs neuves
// 2. BTreeMap : dictionnaire trié (dédoublonnage + tri en une passe)
// 3. Option<f64> : une métrique absente n'est pas un zéro
// ============================================================================

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::PricePoint;

/// Direction sur 30 observations (descriptive, pas une tendance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Flat,
}

impl Direction {
    /// Flèche pour l'affichage
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Up => "▲",
            Direction::Down => "▼",
            Direction::Flat => "▶",
        }
    }
}

/// Statistiques descriptives d'une série
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptiveStats {
    pub latest_price: Option<f64>,
    pub abs_change_1_obs: Option<f64>,
    pub pct_change_1_obs: Option<f64>,
    pub pct_change_30_obs: Option<f64>,
    pub pct_change_365_obs: Option<f64>,
    pub direction_30_obs: Direction,
    pub observations: usize,
    pub latest_observation_date: Option<NaiveDate>,
}

/// Arrondi à `decimals` décimales
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Calcule les statistiques descriptives d'un historique trié
pub fn compute_metrics(history: &[PricePoint]) -> DescriptiveStats {
    let Some(latest) = history.last() else {
        return DescriptiveStats::default();
    };

    // Variation en % par rapport à l'observation située `back` positions avant
    let pct_change = |back: usize| -> Option<f64> {
        if history.len() < back + 1 {
            return None;
        }
        let past = history[history.len() - 1 - back].price;
        if past == 0.0 {
            return None;
        }
        Some(round_to((latest.price / past - 1.0) * 100.0, 2))
    };

    let abs_change_1_obs = if history.len() >= 2 {
        Some(round_to(latest.price - history[history.len() - 2].price, 4))
    } else {
        None
    };

    let pct_change_30_obs = pct_change(30);
    let direction_30_obs = match pct_change_30_obs {
        Some(pct) if pct > 1.0 => Direction::Up,
        Some(pct) if pct < -1.0 => Direction::Down,
        _ => Direction::Flat,
    };

    DescriptiveStats {
        latest_price: Some(latest.price),
        abs_change_1_obs,
        pct_change_1_obs: pct_change(1),
        pct_change_30_obs,
        pct_change_365_obs: pct_change(365),
        direction_30_obs,
        observations: history.len(),
        latest_observation_date: Some(latest.date),
    }
}

/// Série des variations en % depuis le premier point
///
/// Le premier élément vaut toujours 0.
pub fn percent_change_series(series: &[PricePoint]) -> Vec<f64> {
    let Some(first) = series.first() else {
        return Vec::new();
    };

    let base = first.price;
    series
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == 0 || base == 0.0 {
                0.0
            } else {
                (p.price / base - 1.0) * 100.0
            }
        })
        .collect()
}

/// Moyenne mobile simple
///
/// CONCEPT : Fenêtre glissante
/// - Somme incrémentale : O(n) au lieu de O(n * window)
/// - None tant que la fenêtre n'est pas pleine
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }

        if i + 1 >= window {
            result.push(Some(sum / window as f64));
        } else {
            result.push(None);
        }
    }

    result
}

/// Fusionne deux historiques, dédoublonnés par date
///
/// En cas de doublon, la valeur de `new_data` gagne. Résultat trié.
pub fn merge_history(existing: &[PricePoint], new_data: &[PricePoint]) -> Vec<PricePoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for point in existing.iter().chain(new_data.iter()) {
        by_date.insert(point.date, point.price);
    }

    by_date
        .into_iter()
        .map(|(date, price)| PricePoint::new(date, price))
        .collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================
