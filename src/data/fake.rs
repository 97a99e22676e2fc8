//! In-memory `PageSource` for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Value, json};

use crate::data::worldbank::{PageSource, RetryPolicy};
use crate::domain::YearRange;
use crate::error::FetchError;

type Responses = HashMap<(String, u32), Vec<Result<Value, FetchError>>>;

/// Serves canned pages per `(code, page)`.
///
/// A page with several responses returns them in order and then keeps
/// returning the last one.
pub struct FakeSource {
    responses: Responses,
    calls: Mutex<HashMap<(String, u32), usize>>,
    retries: u32,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            retries: 3,
        }
    }

    pub fn with_page(self, code: &str, page: u32, body: Value) -> Self {
        self.with_sequence(code, page, vec![Ok(body)])
    }

    pub fn with_sequence(
        mut self,
        code: &str,
        page: u32,
        responses: Vec<Result<Value, FetchError>>,
    ) -> Self {
        self.responses.insert((code.to_string(), page), responses);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Total requests made for `code`, across pages.
    pub fn calls(&self, code: &str) -> usize {
        let calls = self.calls.lock().unwrap();
        calls
            .iter()
            .filter(|((c, _), _)| c == code)
            .map(|(_, n)| *n)
            .sum()
    }
}

impl PageSource for FakeSource {
    fn fetch_page(&self, code: &str, _years: YearRange, page: u32) -> Result<Value, FetchError> {
        let key = (code.to_string(), page);
        let n = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(key.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let Some(responses) = self.responses.get(&key) else {
            return Err(FetchError::Network(format!("no canned page {page} for {code}")));
        };
        let idx = (n - 1).min(responses.len().saturating_sub(1));
        responses[idx].clone()
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_empty_retries: self.retries,
            delay: Duration::ZERO,
        }
    }
}

/// A valid page body.
pub fn page(pages: u32, items: Vec<Value>) -> Value {
    json!([{"page": 1, "pages": pages, "per_page": 20000, "total": items.len()}, items])
}

/// One API observation; `code` goes into `countryiso3code`.
pub fn item(code: &str, name: &str, date: &str, value: Value) -> Value {
    json!({
        "indicator": {"id": "X", "value": "Test indicator"},
        "country": {"id": "XX", "value": name},
        "countryiso3code": code,
        "date": date,
        "value": value,
    })
}

/// Single-page indicator with `(code, name, year, value)` rows.
pub fn single_page(rows: &[(&str, &str, i32, Option<f64>)]) -> Value {
    page(
        1,
        rows.iter()
            .map(|(code, name, year, value)| item(code, name, &year.to_string(), json!(value)))
            .collect(),
    )
}
