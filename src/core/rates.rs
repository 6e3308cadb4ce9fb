//! Rate table abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Exchange rates for a single base currency.
///
/// Every rate is expressed as "1 unit of base = rate units of key currency".
/// A table is only valid for the base it was fetched for; a new base always
/// gets a freshly fetched table.
#[derive(Debug, Clone)]
pub struct RateTable {
    base: String,
    rates: HashMap<String, f64>,
    last_updated: Option<DateTime<Utc>>,
}

impl RateTable {
    pub fn new(base: &str, rates: HashMap<String, f64>, last_updated: Option<DateTime<Utc>>) -> Self {
        RateTable {
            base: base.to_string(),
            rates,
            last_updated,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// All currency codes in the table, sorted for stable display.
    pub fn currencies(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}

/// Converts an amount with the given rate, rounded to 2 decimal places.
pub fn convert(amount: f64, rate: f64) -> f64 {
    (amount * rate * 100.0).round() / 100.0
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> Result<RateTable>;
}
