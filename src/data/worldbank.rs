//! World Bank indicator API integration.
//!
//! One indicator is downloaded page by page from
//! `{base}/country/all/indicator/{code}?date=start:end&format=json`.
//! Each page is a two-element JSON array `[metadata, items]`; error responses
//! carry a `message` instead.
//!
//! HTTP is kept behind the [`PageSource`] trait so the paging and parsing
//! rules can be exercised without a network.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{IndicatorSeries, Observation, YearRange};
use crate::error::{AppError, FetchError};

const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";
const DEFAULT_PER_PAGE: usize = 20000;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_EMPTY_PAGE_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Aggregate code the API uses for "World".
pub const WORLD_CODE: &str = "WLD";

/// Endpoint and request settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub per_page: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl ApiConfig {
    /// Defaults overridden by `WON_*` variables (a `.env` file is honored).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(url) = std::env::var("WON_API_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        if let Some(n) = env_number::<usize>("WON_PER_PAGE")? {
            config.per_page = at_least_one("WON_PER_PAGE", n)?;
        }
        if let Some(secs) = env_number::<u64>("WON_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(at_least_one("WON_TIMEOUT_SECS", secs)?);
        }
        if let Some(n) = env_number::<u32>("WON_EMPTY_PAGE_RETRIES")? {
            config.retry.max_empty_retries = n;
        }
        if let Some(ms) = env_number::<u64>("WON_RETRY_DELAY_MS")? {
            config.retry.delay = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AppError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::usage(format!("Invalid {name} value '{raw}'."))),
        _ => Ok(None),
    }
}

fn at_least_one<T: PartialOrd + From<u8>>(name: &str, n: T) -> Result<T, AppError> {
    if n < T::from(1) {
        return Err(AppError::usage(format!("{name} must be at least 1.")));
    }
    Ok(n)
}

/// Bounded retry for pages that come back with a null items list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_empty_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_empty_retries: DEFAULT_EMPTY_PAGE_RETRIES,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Something that can return one raw JSON page of an indicator query.
pub trait PageSource: Sync {
    fn fetch_page(&self, code: &str, years: YearRange, page: u32) -> Result<Value, FetchError>;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

pub struct WorldBankClient {
    client: Client,
    config: ApiConfig,
}

impl WorldBankClient {
    pub fn new(config: ApiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::data(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::new(ApiConfig::from_env()?)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

impl PageSource for WorldBankClient {
    fn fetch_page(&self, code: &str, years: YearRange, page: u32) -> Result<Value, FetchError> {
        let url = format!("{}/country/all/indicator/{code}", self.config.base_url);
        debug!("GET {url} date={years} page={page}");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("date", years.to_string()),
                ("format", "json".to_string()),
                ("per_page", self.config.per_page.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        resp.json::<Value>()
            .map_err(|e| FetchError::Malformed(format!("invalid JSON body: {e}")))
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.config.retry
    }
}

/// Download one indicator as tidy rows.
///
/// Rows for the world aggregate and for codes that are not three letters
/// (regional/income aggregates) are dropped. An empty series means "no data
/// for this indicator/range", not an error.
pub fn fetch_indicator<S: PageSource + ?Sized>(
    source: &S,
    code: &str,
    years: YearRange,
) -> Result<IndicatorSeries, FetchError> {
    let retry = source.retry_policy();
    let mut observations = Vec::new();
    let mut page = 1u32;

    loop {
        let mut empty_attempts = 0u32;
        let body = loop {
            let body = parse_page(source.fetch_page(code, years, page)?)?;
            if body.items.is_some() || empty_attempts >= retry.max_empty_retries {
                break body;
            }
            empty_attempts += 1;
            warn!(
                "{code}: page {page} returned no items (attempt {empty_attempts}/{}); retrying",
                retry.max_empty_retries
            );
            if !retry.delay.is_zero() {
                thread::sleep(retry.delay);
            }
        };

        let Some(items) = body.items else {
            warn!("{code}: page {page} still empty after retries; treating as end of data");
            break;
        };
        if items.is_empty() {
            break;
        }

        for item in items {
            if let Some(obs) = observation_from_item(item)? {
                observations.push(obs);
            }
        }

        if page >= body.pages {
            break;
        }
        page += 1;
    }

    info!("{code} ({years}): {} rows", observations.len());
    Ok(IndicatorSeries::new(code, observations))
}

struct PageBody {
    pages: u32,
    items: Option<Vec<Value>>,
}

fn parse_page(payload: Value) -> Result<PageBody, FetchError> {
    if let Some(message) = error_message(&payload) {
        return Err(FetchError::Upstream(message));
    }

    let Value::Array(mut parts) = payload else {
        return Err(FetchError::Malformed(
            "expected a [metadata, items] array".to_string(),
        ));
    };
    if parts.len() < 2 {
        return Err(FetchError::Malformed(format!(
            "expected 2 elements, got {}",
            parts.len()
        )));
    }

    let items = match parts.swap_remove(1) {
        Value::Null => None,
        Value::Array(items) => Some(items),
        other => {
            return Err(FetchError::Malformed(format!(
                "items must be a list, got {}",
                json_kind(&other)
            )));
        }
    };

    let pages = parts
        .first()
        .and_then(|meta| meta.get("pages"))
        .and_then(as_page_count)
        .ok_or_else(|| FetchError::Malformed("metadata has no page count".to_string()))?;

    Ok(PageBody { pages, items })
}

/// Extract the message from `{"message": ...}` or `[{"message": ...}]`.
fn error_message(payload: &Value) -> Option<String> {
    let holder = match payload {
        Value::Object(_) => payload,
        Value::Array(parts) => parts.first().filter(|p| p.get("message").is_some())?,
        _ => return None,
    };
    holder.get("message").map(message_text)
}

fn message_text(message: &Value) -> String {
    match message {
        Value::String(s) => s.clone(),
        Value::Array(entries) => entries
            .iter()
            .map(message_text)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => ["value", "message", "key"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string()),
        other => other.to_string(),
    }
}

fn as_page_count(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Deserialize)]
struct Item {
    country: CountryRef,
    #[serde(default, rename = "countryiso3code")]
    iso3: Option<String>,
    date: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct CountryRef {
    id: String,
    #[serde(default)]
    value: Option<String>,
}

fn observation_from_item(raw: Value) -> Result<Option<Observation>, FetchError> {
    let item: Item = serde_json::from_value(raw)
        .map_err(|e| FetchError::Malformed(format!("bad observation: {e}")))?;

    let raw_code = item
        .iso3
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(item.country.id);
    let country_code = normalize_country_code(&raw_code);
    if country_code == WORLD_CODE || !is_country_code(&country_code) {
        return Ok(None);
    }

    let year = parse_year(&item.date)
        .ok_or_else(|| FetchError::Malformed(format!("bad date '{}'", item.date)))?;

    Ok(Some(Observation {
        country_name: item.country.value.unwrap_or_else(|| country_code.clone()),
        country_code,
        year,
        value: coerce_value(&item.value),
    }))
}

/// Trim and uppercase a country code.
pub fn normalize_country_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Exactly three ASCII letters.
pub fn is_country_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())
}

fn parse_year(raw: &str) -> Option<i32> {
    let head = raw.trim().get(..4)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

/// Numbers and numeric strings become `f64`; anything else becomes null.
pub fn coerce_value(v: &Value) -> Option<f64> {
    let x = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    x.is_finite().then_some(x)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data::fake::{FakeSource, item, page};

    fn years() -> YearRange {
        YearRange::new(2019, 2020).unwrap()
    }

    #[test]
    fn accumulates_pages_and_filters_aggregates() {
        let source = FakeSource::new()
            .with_page(
                "X",
                1,
                page(
                    2,
                    vec![
                        item("USA", "United States", "2020", json!(1.5)),
                        item("WLD", "World", "2020", json!(9.0)),
                        item("", "Euro area", "2020", json!(3.0)),
                    ],
                ),
            )
            .with_page(
                "X",
                2,
                page(2, vec![item(" ita", "Italy", "2019", json!("2.25"))]),
            );

        let series = fetch_indicator(&source, "X", years()).unwrap();
        let codes: Vec<&str> = series
            .observations
            .iter()
            .map(|o| o.country_code.as_str())
            .collect();
        assert_eq!(codes, vec!["USA", "ITA"]);
        assert_eq!(series.observations[1].value, Some(2.25));
        assert_eq!(series.observations[1].year, 2019);
        assert_eq!(source.calls("X"), 2);
    }

    #[test]
    fn falls_back_to_country_id_and_drops_non_alpha_codes() {
        let source = FakeSource::new().with_page(
            "X",
            1,
            json!([
                {"page": 1, "pages": 1},
                [
                    {"country": {"id": "1A", "value": "Arab World"}, "countryiso3code": "", "date": "2020", "value": 1.0},
                    {"country": {"id": "fra", "value": "France"}, "date": "2020", "value": 2.0},
                    {"country": {"id": "1W", "value": "World"}, "countryiso3code": "wld", "date": "2020", "value": 3.0}
                ]
            ]),
        );

        let series = fetch_indicator(&source, "X", years()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.observations[0].country_code, "FRA");
        assert_eq!(series.observations[0].country_name, "France");
    }

    #[test]
    fn non_numeric_values_become_null() {
        let source = FakeSource::new().with_page(
            "X",
            1,
            page(
                1,
                vec![
                    item("USA", "United States", "2020", json!(null)),
                    item("ITA", "Italy", "2020", json!("n/a")),
                    item("FRA", "France", "2020", json!({"x": 1})),
                ],
            ),
        );

        let series = fetch_indicator(&source, "X", years()).unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.observations.iter().all(|o| o.value.is_none()));
    }

    #[test]
    fn null_items_are_retried_then_end_the_stream() {
        let null_page = json!([{"page": 1, "pages": 3}, null]);
        let source = FakeSource::new()
            .with_sequence("X", 1, vec![Ok(null_page.clone()), Ok(null_page.clone()), Ok(null_page)])
            .with_retries(2);

        let series = fetch_indicator(&source, "X", years()).unwrap();
        assert!(series.is_empty());
        assert_eq!(source.calls("X"), 3);
    }

    #[test]
    fn null_items_recover_on_retry() {
        let source = FakeSource::new()
            .with_sequence(
                "X",
                1,
                vec![
                    Ok(json!([{"page": 1, "pages": 1}, null])),
                    Ok(page(1, vec![item("USA", "United States", "2020", json!(4.0))])),
                ],
            )
            .with_retries(3);

        let series = fetch_indicator(&source, "X", years()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(source.calls("X"), 2);
    }

    #[test]
    fn http_errors_are_not_retried() {
        let source = FakeSource::new()
            .with_sequence("X", 1, vec![Err(FetchError::Status(503))])
            .with_retries(3);

        let err = fetch_indicator(&source, "X", years()).unwrap_err();
        assert_eq!(err, FetchError::Status(503));
        assert!(err.is_network());
        assert_eq!(source.calls("X"), 1);
    }

    #[test]
    fn upstream_error_payloads_fail_with_message() {
        let object = FakeSource::new().with_page("X", 1, json!({"message": "Invalid indicator"}));
        assert_eq!(
            fetch_indicator(&object, "X", years()).unwrap_err(),
            FetchError::Upstream("Invalid indicator".to_string())
        );

        let wrapped = FakeSource::new().with_page(
            "X",
            1,
            json!([{"message": [{"id": "120", "key": "Invalid value", "value": "The provided parameter value is not valid"}]}]),
        );
        assert_eq!(
            fetch_indicator(&wrapped, "X", years()).unwrap_err(),
            FetchError::Upstream("The provided parameter value is not valid".to_string())
        );
    }

    #[test]
    fn malformed_payloads_fail() {
        for payload in [
            json!("nope"),
            json!([{"pages": 1}]),
            json!([{"pages": 1}, {"not": "a list"}]),
            json!([{}, []]),
            json!([{"pages": 1}, [{"country": {"id": "USA", "value": "US"}, "date": "later", "value": 1}]]),
        ] {
            let source = FakeSource::new().with_page("X", 1, payload.clone());
            let err = fetch_indicator(&source, "X", years()).unwrap_err();
            assert!(matches!(err, FetchError::Malformed(_)), "{payload}: {err:?}");
        }
    }

    #[test]
    fn page_count_may_be_a_string() {
        let source = FakeSource::new()
            .with_page("X", 1, json!([{"pages": "2"}, [item("USA", "United States", "2020", json!(1))]]))
            .with_page("X", 2, json!([{"pages": "2"}, [item("ITA", "Italy", "2020", json!(2))]]));
        let series = fetch_indicator(&source, "X", years()).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn empty_items_list_stops_paging() {
        let source = FakeSource::new().with_page("X", 1, json!([{"pages": 5}, []]));
        let series = fetch_indicator(&source, "X", years()).unwrap();
        assert!(series.is_empty());
        assert_eq!(source.calls("X"), 1);
    }

    #[test]
    fn coerce_value_rules() {
        assert_eq!(coerce_value(&json!(3)), Some(3.0));
        assert_eq!(coerce_value(&json!(" 1e3 ")), Some(1000.0));
        assert_eq!(coerce_value(&json!("NaN")), None);
        assert_eq!(coerce_value(&json!("")), None);
        assert_eq!(coerce_value(&json!(true)), None);
    }

    #[test]
    fn api_defaults_and_unset_variables() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "https://api.worldbank.org/v2");
        assert_eq!(config.per_page, 20000);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.retry.max_empty_retries, 3);

        assert_eq!(env_number::<u32>("WON_TEST_UNSET_VARIABLE").unwrap(), None);
    }

    #[test]
    fn zero_page_size_and_timeout_are_rejected() {
        for name in ["WON_PER_PAGE", "WON_TIMEOUT_SECS"] {
            let err = at_least_one(name, 0u64).unwrap_err();
            assert_eq!(err.exit_code(), crate::error::EXIT_USAGE);
            assert!(err.to_string().contains(name));
        }
        assert_eq!(at_least_one("WON_PER_PAGE", 1usize).unwrap(), 1);
        assert_eq!(at_least_one("WON_TIMEOUT_SECS", 30u64).unwrap(), 30);
    }
}
