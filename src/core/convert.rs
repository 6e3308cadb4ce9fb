//! Conversion state machine tying user input to a displayed result.

use anyhow::Result;
use tracing::debug;

use crate::core::rates::{RateTable, convert};

/// Outcome of the last rate fetch for the currently selected base currency.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Handle for one outstanding rate fetch.
///
/// The generation is compared in [`Converter::complete_fetch`]; a completion
/// whose generation no longer matches the converter's is discarded, so a
/// response to a superseded fetch can never overwrite later state.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub base: String,
    generation: u64,
}

/// Owns the current selections and recomputes the result after every change.
///
/// The converter never performs I/O itself. Callers obtain a [`FetchRequest`]
/// from [`Converter::new`], [`Converter::set_from_currency`] or
/// [`Converter::retry`], run the fetch, and hand the outcome back through
/// [`Converter::complete_fetch`].
pub struct Converter {
    amount: f64,
    from: String,
    to: String,
    table: Option<RateTable>,
    request: RequestState,
    validation: Option<String>,
    result: Option<f64>,
    generation: u64,
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Converter {
    /// Creates a converter and immediately issues the first fetch.
    pub fn new(amount: f64, from: &str, to: &str) -> (Self, FetchRequest) {
        let mut converter = Converter {
            amount: 0.0,
            from: normalize(from),
            to: normalize(to),
            table: None,
            request: RequestState::Idle,
            validation: None,
            result: None,
            generation: 0,
        };
        converter.set_amount(amount);
        let request = converter.begin_fetch();
        (converter, request)
    }

    fn begin_fetch(&mut self) -> FetchRequest {
        // The previous table belongs to another base (or a failed fetch) and
        // must never serve computation again.
        self.table = None;
        self.result = None;
        self.request = RequestState::Loading;
        self.generation += 1;
        FetchRequest {
            base: self.from.clone(),
            generation: self.generation,
        }
    }

    /// Stores a new amount. Negative input is clamped to 0 and reported as a
    /// validation error instead of being computed.
    pub fn set_amount(&mut self, amount: f64) {
        if amount < 0.0 {
            self.amount = 0.0;
            self.validation = Some("amount cannot be negative".to_string());
        } else {
            self.amount = amount;
            self.validation = None;
        }
        self.recompute();
    }

    /// Changes the base currency and issues a new fetch, superseding any
    /// fetch still in flight. Returns `None` for an empty code.
    pub fn set_from_currency(&mut self, code: &str) -> Option<FetchRequest> {
        let code = normalize(code);
        if code.is_empty() {
            self.validation = Some("currency code cannot be empty".to_string());
            return None;
        }
        self.validation = None;
        debug!(from = %code, "Base currency changed");
        self.from = code;
        Some(self.begin_fetch())
    }

    /// Changes the target currency and recomputes against the current table;
    /// no refetch is needed.
    pub fn set_to_currency(&mut self, code: &str) {
        let code = normalize(code);
        if code.is_empty() {
            self.validation = Some("currency code cannot be empty".to_string());
            return;
        }
        self.validation = None;
        self.to = code;
        self.recompute();
    }

    /// Re-issues the fetch for the current base currency.
    pub fn retry(&mut self) -> FetchRequest {
        debug!(base = %self.from, "Retrying rate fetch");
        self.begin_fetch()
    }

    /// Applies the outcome of a fetch. Outcomes of superseded requests are
    /// discarded (last request wins).
    pub fn complete_fetch(&mut self, request: &FetchRequest, outcome: Result<RateTable>) {
        if request.generation != self.generation {
            debug!(base = %request.base, "Discarding superseded rate fetch");
            return;
        }
        match outcome {
            Ok(table) => {
                self.table = Some(table);
                self.request = RequestState::Ready;
                self.recompute();
            }
            Err(e) => {
                self.request = RequestState::Failed(e.to_string());
                self.result = None;
            }
        }
    }

    fn recompute(&mut self) {
        self.result = None;
        if self.validation.is_some() {
            return;
        }
        let Some(table) = &self.table else { return };
        match table.rate(&self.to) {
            Some(rate) => {
                self.request = RequestState::Ready;
                self.result = Some(convert(self.amount, rate));
            }
            None => {
                self.request = RequestState::Failed(format!("rate for {} not found", self.to));
            }
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn from_currency(&self) -> &str {
        &self.from
    }

    pub fn to_currency(&self) -> &str {
        &self.to
    }

    pub fn request_state(&self) -> &RequestState {
        &self.request
    }

    pub fn validation_error(&self) -> Option<&str> {
        self.validation.as_deref()
    }

    pub fn rate_table(&self) -> Option<&RateTable> {
        self.table.as_ref()
    }

    /// The converted amount, rounded to 2 decimal places. `None` while no
    /// valid table is installed or the input is invalid.
    pub fn result(&self) -> Option<f64> {
        self.result
    }

    /// The result formatted for display, e.g. `"9.00"`.
    pub fn result_text(&self) -> Option<String> {
        self.result.map(|v| format!("{v:.2}"))
    }
}
