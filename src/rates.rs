use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{EngineError, Result};

/// one row of the rate table, in the shape it is configured and exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTableEntry {
    /// loan term in fortnights
    pub term: u32,
    /// rate charged over the term, as a percentage of principal
    pub annual_rate_percent: Decimal,
}

/// immutable term -> rate mapping
///
/// Built once and handed to the quote calculator by value; changing rates means
/// building a new table. Contracts copy the rate at quote time, so existing
/// contracts never see a table change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RateTableEntry>", into = "Vec<RateTableEntry>")]
pub struct RateTable {
    rates: BTreeMap<u32, Rate>,
}

/// terms offered in production and their rates (percent)
const STANDARD_RATES: [(u32, u32); 16] = [
    (5, 20),
    (6, 22),
    (7, 24),
    (8, 26),
    (9, 28),
    (10, 30),
    (12, 34),
    (14, 38),
    (16, 42),
    (18, 46),
    (20, 50),
    (22, 54),
    (24, 58),
    (26, 62),
    (28, 66),
    (30, 70),
];

impl RateTable {
    /// Build a table from configured rows.
    ///
    /// Rejects zero terms, negative rates, duplicate terms and any longer term
    /// priced below a shorter one.
    pub fn new(entries: impl IntoIterator<Item = RateTableEntry>) -> Result<Self> {
        let mut rates = BTreeMap::new();
        for entry in entries {
            if entry.term == 0 {
                return Err(EngineError::InvalidConfiguration {
                    message: "rate table term must be a positive number of fortnights".to_string(),
                });
            }
            if entry.annual_rate_percent < Decimal::ZERO {
                return Err(EngineError::InvalidConfiguration {
                    message: format!("rate for term {} is negative", entry.term),
                });
            }
            if rates
                .insert(entry.term, Rate::from_percent(entry.annual_rate_percent))
                .is_some()
            {
                return Err(EngineError::InvalidConfiguration {
                    message: format!("duplicate rate table term {}", entry.term),
                });
            }
        }

        if rates.is_empty() {
            return Err(EngineError::InvalidConfiguration {
                message: "rate table is empty".to_string(),
            });
        }

        let table = Self { rates };
        if !table.is_monotonic() {
            return Err(EngineError::InvalidConfiguration {
                message: "rate table rates must not fall as the term grows".to_string(),
            });
        }
        Ok(table)
    }

    /// the production table: 5-10 fortnights then even terms to 30
    pub fn standard() -> Self {
        let rates = STANDARD_RATES
            .iter()
            .map(|&(term, percent)| (term, Rate::from_percentage(percent)))
            .collect();
        Self { rates }
    }

    /// rate for a term, or `InvalidTerm` when the term is not offered
    pub fn lookup_rate(&self, term: u32) -> Result<Rate> {
        self.rates
            .get(&term)
            .copied()
            .ok_or(EngineError::InvalidTerm { term })
    }

    pub fn contains(&self, term: u32) -> bool {
        self.rates.contains_key(&term)
    }

    /// offered terms in ascending order
    pub fn terms(&self) -> impl Iterator<Item = u32> + '_ {
        self.rates.keys().copied()
    }

    pub fn entries(&self) -> Vec<RateTableEntry> {
        self.rates
            .iter()
            .map(|(&term, rate)| RateTableEntry {
                term,
                annual_rate_percent: rate.as_percentage(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// true when longer terms never carry a lower rate
    pub fn is_monotonic(&self) -> bool {
        self.rates
            .values()
            .zip(self.rates.values().skip(1))
            .all(|(shorter, longer)| shorter <= longer)
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<RateTableEntry>> for RateTable {
    type Error = EngineError;

    fn try_from(entries: Vec<RateTableEntry>) -> Result<Self> {
        RateTable::new(entries)
    }
}

impl From<RateTable> for Vec<RateTableEntry> {
    fn from(table: RateTable) -> Self {
        table.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_lookup() {
        let table = RateTable::standard();
        assert_eq!(table.lookup_rate(12).unwrap(), Rate::from_percentage(34));
        assert_eq!(table.lookup_rate(5).unwrap(), Rate::from_percentage(20));
        assert_eq!(table.lookup_rate(30).unwrap(), Rate::from_percentage(70));
        assert_eq!(table.len(), 16);
    }

    #[test]
    fn test_unlisted_term_rejected() {
        let table = RateTable::standard();
        assert_eq!(table.lookup_rate(11), Err(EngineError::InvalidTerm { term: 11 }));
        assert_eq!(table.lookup_rate(0), Err(EngineError::InvalidTerm { term: 0 }));
        assert!(!table.contains(31));
    }

    #[test]
    fn test_rates_increase_with_term() {
        let table = RateTable::standard();
        assert!(table.is_monotonic());

        let terms: Vec<u32> = table.terms().collect();
        for pair in terms.windows(2) {
            let shorter = table.lookup_rate(pair[0]).unwrap();
            let longer = table.lookup_rate(pair[1]).unwrap();
            assert!(shorter <= longer, "rate({}) > rate({})", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_custom_table_validation() {
        let duplicate = RateTable::new(vec![
            RateTableEntry { term: 4, annual_rate_percent: dec!(10) },
            RateTableEntry { term: 4, annual_rate_percent: dec!(12) },
        ]);
        assert!(matches!(duplicate, Err(EngineError::InvalidConfiguration { .. })));

        let zero_term = RateTable::new(vec![RateTableEntry { term: 0, annual_rate_percent: dec!(10) }]);
        assert!(zero_term.is_err());

        assert!(RateTable::new(Vec::new()).is_err());

        let falling = RateTable::new(vec![
            RateTableEntry { term: 4, annual_rate_percent: dec!(12.5) },
            RateTableEntry { term: 2, annual_rate_percent: dec!(15) },
        ]);
        assert!(matches!(falling, Err(EngineError::InvalidConfiguration { .. })));

        let custom = RateTable::new(vec![
            RateTableEntry { term: 4, annual_rate_percent: dec!(15) },
            RateTableEntry { term: 2, annual_rate_percent: dec!(12.5) },
            RateTableEntry { term: 3, annual_rate_percent: dec!(12.5) },
        ])
        .unwrap();
        assert_eq!(custom.terms().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert!(custom.is_monotonic());
        assert_eq!(custom.lookup_rate(2).unwrap().as_percentage(), dec!(12.5));
    }

    #[test]
    fn test_table_json_shape() {
        let table = RateTable::new(vec![RateTableEntry { term: 6, annual_rate_percent: dec!(22) }]).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let restored: RateTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table);

        let bad: std::result::Result<RateTable, _> =
            serde_json::from_str(r#"[{"term":0,"annual_rate_percent":"10"}]"#);
        assert!(bad.is_err());

        let falling: std::result::Result<RateTable, _> = serde_json::from_str(
            r#"[{"term":2,"annual_rate_percent":"20"},{"term":4,"annual_rate_percent":"18"}]"#,
        );
        assert!(falling.is_err());
    }
}
