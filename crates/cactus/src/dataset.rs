//! 🌵 Dataset — a year of completely fictional cactus sales in the American Southwest.
//!
//! 🎬 COLD OPEN — EXT. ROADSIDE CACTUS STAND — ARIZONA — HIGH NOON
//!
//! A Saguaro sells for $4,812.37 in Nevada. A Cholla goes for $3.10 in Utah.
//! Nobody asks why. Nobody asks who buys a cactus for five grand. The RNG
//! has spoken, and the RNG does not take questions.
//!
//! Each record draws every field independently and uniformly:
//! - 💰 price: uniform in `[min_price, max_price)`, rounded half-up to cents
//! - 📅 date: `today` minus a uniform offset in `[0, lookback_days)`
//! - 🗺️ state / 🌵 category: uniform pick from the configured lists
//!
//! The vocabularies and ranges live in [`DatasetConfig`] and get passed in. No globals.
//! The RNG gets passed in too, so tests can seed it and production can let the OS roll dice.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::CactusError;

/// 🗺️ The southwest, abbreviated.
pub const DEFAULT_STATES: [&str; 7] = ["AZ", "CA", "CO", "NM", "NV", "TX", "UT"];

/// 🌵 The product catalogue. Spiky, all of it.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Cholla", "Barrel", "Hedgehog", "Prickly Pear", "Saguaro"];

/// 🧾 One sale. One cactus. One line in a ledger nobody audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub price: f64,
    pub date: NaiveDate,
    pub state: String,
    pub category: String,
}

/// 🎛️ What the fake data looks like. Every knob has a default that matches the classic demo.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// 📦 How many records per run.
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_min_price")]
    pub min_price: f64,
    #[serde(default = "default_max_price")]
    pub max_price: f64,
    /// 📅 How far back in time sales may land, in days. 365 = "the past year".
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_states")]
    pub states: Vec<String>,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// 🎲 Fixed seed for reproducible runs. `None` → seeded from the OS, different every time.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_count() -> usize {
    1000
}

fn default_min_price() -> f64 {
    1.0
}

fn default_max_price() -> f64 {
    10000.0
}

fn default_lookback_days() -> u32 {
    365
}

fn default_states() -> Vec<String> {
    DEFAULT_STATES.iter().map(|s| s.to_string()).collect()
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            min_price: default_min_price(),
            max_price: default_max_price(),
            lookback_days: default_lookback_days(),
            states: default_states(),
            categories: default_categories(),
            seed: None,
        }
    }
}

impl DatasetConfig {
    /// 🔒 Reject configs that would make the generator panic or produce nothing.
    ///
    /// `random_range` panics on an empty range or one whose width overflows to infinity, and a bulk request with zero documents
    /// is a 400 waiting to happen. Better to say so before the index gets created.
    pub fn validate(&self) -> Result<()> {
        let problem = if self.count == 0 {
            Some("dataset.count must be at least 1".to_string())
        } else if !self.min_price.is_finite() || !self.max_price.is_finite() {
            Some("dataset prices must be finite numbers".to_string())
        } else if !(self.max_price - self.min_price).is_finite() {
            // 📏 two finite bounds can still be an infinitely wide range, and rand refuses those
            Some(format!(
                "dataset price range [{}, {}) is too wide to sample from",
                self.min_price, self.max_price
            ))
        } else if self.min_price >= self.max_price {
            Some(format!(
                "dataset.min_price ({}) must be below dataset.max_price ({})",
                self.min_price, self.max_price
            ))
        } else if self.lookback_days == 0 {
            Some("dataset.lookback_days must be at least 1".to_string())
        } else if self.states.is_empty() {
            Some("dataset.states must list at least one state".to_string())
        } else if self.categories.is_empty() {
            Some("dataset.categories must list at least one category".to_string())
        } else {
            None
        };

        match problem {
            Some(message) => Err(CactusError::InvalidConfig(message).into()),
            None => Ok(()),
        }
    }
}

/// 🎲 Build the generator RNG: seeded if asked, OS entropy otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// 💰 Round to two decimal places, halves away from zero (half-up for the positive prices we sell).
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 🚀 Generate `config.count` sales records ending at `today`.
///
/// Calling it again gives a fresh, independent sequence (unless you reuse a seeded RNG state,
/// in which case congratulations, you have reproducibility).
pub fn generate_dataset<R: Rng>(
    rng: &mut R,
    config: &DatasetConfig,
    today: NaiveDate,
) -> Result<Vec<SalesRecord>> {
    config.validate()?;

    let mut records = Vec::with_capacity(config.count);
    for _ in 0..config.count {
        records.push(generate_record(rng, config, today)?);
    }
    Ok(records)
}

fn generate_record<R: Rng>(
    rng: &mut R,
    config: &DatasetConfig,
    today: NaiveDate,
) -> Result<SalesRecord> {
    let price = round_to_cents(rng.random_range(config.min_price..config.max_price));

    let days_back = rng.random_range(0..config.lookback_days);
    let date = today
        .checked_sub_days(Days::new(u64::from(days_back)))
        .with_context(|| {
            format!("💀 {today} minus {days_back} days fell off the edge of the calendar")
        })?;

    let state = config.states[rng.random_range(0..config.states.len())].clone();
    let category = config.categories[rng.random_range(0..config.categories.len())].clone();

    Ok(SalesRecord {
        price,
        date,
        state,
        category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn the_fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).expect("💀 June 15th exists. Usually.")
    }

    fn has_at_most_two_decimals(price: f64) -> bool {
        let formatted = format!("{price}");
        match formatted.split_once('.') {
            Some((_, decimals)) => decimals.len() <= 2,
            None => true,
        }
    }

    #[test]
    fn the_one_where_a_thousand_means_a_thousand() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(42);
        let records = generate_dataset(&mut rng, &DatasetConfig::default(), the_fixed_today())?;
        assert_eq!(records.len(), 1000);
        Ok(())
    }

    #[test]
    fn the_one_where_every_field_stays_inside_the_fence() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let today = the_fixed_today();
        let oldest_allowed = today - Days::new(365);
        let records = generate_dataset(&mut rng, &DatasetConfig::default(), today)?;

        for record in &records {
            assert!(
                (1.0..=10000.0).contains(&record.price),
                "price {} escaped the range",
                record.price
            );
            assert!(
                has_at_most_two_decimals(record.price),
                "price {} has too many decimals",
                record.price
            );
            assert!(
                record.date >= oldest_allowed && record.date <= today,
                "date {} is outside the trailing year",
                record.date
            );
            assert!(DEFAULT_STATES.contains(&record.state.as_str()));
            assert!(DEFAULT_CATEGORIES.contains(&record.category.as_str()));
        }
        Ok(())
    }

    #[test]
    fn the_one_where_the_same_seed_tells_the_same_story() -> Result<()> {
        let config = DatasetConfig {
            count: 50,
            seed: Some(99),
            ..DatasetConfig::default()
        };
        let first = generate_dataset(&mut rng_from_seed(config.seed), &config, the_fixed_today())?;
        let second = generate_dataset(&mut rng_from_seed(config.seed), &config, the_fixed_today())?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn the_one_where_custom_vocabularies_are_respected() -> Result<()> {
        let config = DatasetConfig {
            count: 200,
            states: vec!["AZ".to_string()],
            categories: vec!["Saguaro".to_string(), "Cholla".to_string()],
            lookback_days: 1,
            ..DatasetConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let records = generate_dataset(&mut rng, &config, the_fixed_today())?;

        assert!(records.iter().all(|r| r.state == "AZ"));
        assert!(records.iter().all(|r| r.category == "Saguaro" || r.category == "Cholla"));
        // 📅 lookback of one day means "today only"
        assert!(records.iter().all(|r| r.date == the_fixed_today()));
        Ok(())
    }

    #[test]
    fn the_one_where_rounding_goes_up_at_the_halfway_mark() {
        assert_eq!(round_to_cents(1.005_000_1), 1.01);
        assert_eq!(round_to_cents(2.125), 2.13);
        assert_eq!(round_to_cents(9999.994), 9999.99);
        assert_eq!(round_to_cents(1.0), 1.0);
    }

    #[test]
    fn the_one_where_broken_configs_are_turned_away_at_the_door() {
        let inverted = DatasetConfig {
            min_price: 10.0,
            max_price: 1.0,
            ..DatasetConfig::default()
        };
        let err = inverted.validate().expect_err("💀 inverted range must be rejected");
        assert!(matches!(
            err.downcast_ref::<CactusError>(),
            Some(CactusError::InvalidConfig(_))
        ));

        let nowhere = DatasetConfig {
            states: vec![],
            ..DatasetConfig::default()
        };
        assert!(nowhere.validate().is_err());

        let nothing = DatasetConfig {
            count: 0,
            ..DatasetConfig::default()
        };
        assert!(nothing.validate().is_err());

        let the_whole_number_line = DatasetConfig {
            min_price: -1e308,
            max_price: 1e308,
            ..DatasetConfig::default()
        };
        let err = the_whole_number_line
            .validate()
            .expect_err("💀 a range wider than f64 can hold must be rejected");
        assert!(matches!(
            err.downcast_ref::<CactusError>(),
            Some(CactusError::InvalidConfig(_))
        ));
        // 🎲 and the generator refuses it too, instead of panicking inside rand
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_dataset(&mut rng, &the_whole_number_line, the_fixed_today()).is_err());
    }

    #[test]
    fn the_one_where_a_record_serializes_like_the_mapping_expects() -> Result<()> {
        let record = SalesRecord {
            price: 1234.56,
            date: NaiveDate::from_ymd_opt(2024, 1, 31).expect("💀 Jan 31 exists"),
            state: "NM".to_string(),
            category: "Prickly Pear".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&record)?,
            r#"{"price":1234.56,"date":"2024-01-31","state":"NM","category":"Prickly Pear"}"#
        );
        Ok(())
    }
}
