// ============================================================================
// Plage d'affichage : RangeToken
// ============================================================================
// Fenêtre historique relative (1W, 1M, 3M, 6M, 1Y, ALL)
//
// CONCEPT IMPORTANT : ancrage sur la dernière observation
// - La date de coupure est calculée depuis la DERNIÈRE date de la série,
//   pas depuis "maintenant" (les séries officielles ont souvent du retard)
// - Une série arrêtée il y a 3 mois affiche quand même sa dernière semaine
//
// CONCEPTS RUST :
// 1. Slices : le filtre retourne une sous-slice (aucune copie, aucune mutation)
// 2. partition_point : recherche binaire sur une slice triée
// 3. FromStr / Display : conversion texte <-> enum
// ============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::PricePoint;

/// Plage d'historique affichée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeToken {
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

impl RangeToken {
    /// Toutes les plages, dans l'ordre d'affichage des onglets
    pub const TOKENS: [RangeToken; 6] = [
        RangeToken::OneWeek,
        RangeToken::OneMonth,
        RangeToken::ThreeMonths,
        RangeToken::SixMonths,
        RangeToken::OneYear,
        RangeToken::All,
    ];

    /// Label court, identique au paramètre `range=` de l'API
    pub fn label(&self) -> &'static str {
        match self {
            RangeToken::OneWeek => "1W",
            RangeToken::OneMonth => "1M",
            RangeToken::ThreeMonths => "3M",
            RangeToken::SixMonths => "6M",
            RangeToken::OneYear => "1Y",
            RangeToken::All => "ALL",
        }
    }

    /// Date de coupure pour une série dont la dernière observation est `anchor`
    ///
    /// CONCEPT : décalage calendaire
    /// - 1W : 7 jours
    /// - 1M / 3M / 6M / 1Y : mois calendaires (chrono gère les fins de mois)
    /// - ALL : pas de coupure (None)
    pub fn cutoff(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        let cutoff = match self {
            RangeToken::OneWeek => anchor.checked_sub_days(Days::new(7)),
            RangeToken::OneMonth => anchor.checked_sub_months(Months::new(1)),
            RangeToken::ThreeMonths => anchor.checked_sub_months(Months::new(3)),
            RangeToken::SixMonths => anchor.checked_sub_months(Months::new(6)),
            RangeToken::OneYear => anchor.checked_sub_months(Months::new(12)),
            RangeToken::All => return None,
        };

        // Dépassement avant le début du calendrier : on garde tout
        Some(cutoff.unwrap_or(NaiveDate::MIN))
    }

    /// Position dans TOKENS (pour les onglets)
    pub fn index(&self) -> usize {
        Self::TOKENS.iter().position(|t| t == self).unwrap_or(0)
    }

    /// Plage suivante (cycle)
    pub fn next(&self) -> RangeToken {
        Self::TOKENS[(self.index() + 1) % Self::TOKENS.len()]
    }

    /// Plage précédente (cycle)
    pub fn previous(&self) -> RangeToken {
        let len = Self::TOKENS.len();
        Self::TOKENS[(self.index() + len - 1) % len]
    }
}

impl Default for RangeToken {
    /// Par défaut : tout l'historique
    fn default() -> Self {
        RangeToken::All
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RangeToken {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        RangeToken::TOKENS
            .iter()
            .copied()
            .find(|t| t.label() == upper)
            .ok_or_else(|| anyhow::anyhow!("Plage inconnue : {}", s))
    }
}

// ============================================================================
// Filtre par plage
// ============================================================================

/// Filtre une série triée par date croissante
///
/// CONCEPT RUST : Lifetime élidée
/// - La slice retournée emprunte `series` : pas d'allocation
/// - ALL ou série vide : retourne `series` telle quelle
///
/// La dernière observation est toujours incluse (elle est l'ancre).
pub fn filter_by_range(series: &[PricePoint], range: RangeToken) -> &[PricePoint] {
    let Some(last) = series.last() else {
        return series;
    };

    let Some(cutoff) = range.cutoff(last.date) else {
        return series;
    };

    let start = series.partition_point(|p| p.date < cutoff);
    &series[start..]
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn point(y: i32, m: u32, d: u32, price: f64) -> PricePoint {
        PricePoint::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), price)
    }

    #[test]
    fn test_one_week_is_anchored_on_latest_date() {
        let history = vec![point(2024, 1, 1, 100.0), point(2024, 1, 10, 110.0)];

        let filtered = filter_by_range(&history, RangeToken::OneWeek);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].price, 110.0);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let history = vec![
            point(2024, 1, 2, 1.0),
            point(2024, 1, 3, 2.0),
            point(2024, 1, 10, 3.0),
        ];

        // 10 janvier - 7 jours = 3 janvier, inclus
        let filtered = filter_by_range(&history, RangeToken::OneWeek);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].price, 2.0);
    }

    #[test]
    fn test_month_offset_is_calendar_based() {
        let anchor = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        // Février 2024 n'a que 29 jours
        assert_eq!(
            RangeToken::OneMonth.cutoff(anchor),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            RangeToken::OneYear.cutoff(anchor),
            NaiveDate::from_ymd_opt(2023, 3, 31)
        );
        assert_eq!(RangeToken::All.cutoff(anchor), None);
    }

    #[test]
    fn test_all_and_empty_return_same_slice() {
        let history = vec![point(2020, 1, 1, 1.0), point(2024, 1, 1, 2.0)];
        let filtered = filter_by_range(&history, RangeToken::All);
        assert!(std::ptr::eq(filtered, history.as_slice()));

        let empty: Vec<PricePoint> = Vec::new();
        assert!(filter_by_range(&empty, RangeToken::OneWeek).is_empty());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("1w".parse::<RangeToken>().unwrap(), RangeToken::OneWeek);
        assert_eq!("ALL".parse::<RangeToken>().unwrap(), RangeToken::All);
        assert!("2W".parse::<RangeToken>().is_err());
        assert_eq!(RangeToken::SixMonths.to_string(), "6M");
    }

    #[test]
    fn test_range_cycle() {
        assert_eq!(RangeToken::OneWeek.next(), RangeToken::OneMonth);
        assert_eq!(RangeToken::All.next(), RangeToken::OneWeek); // Boucle
        assert_eq!(RangeToken::OneWeek.previous(), RangeToken::All);
    }
}
