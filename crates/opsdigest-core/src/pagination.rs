//! Driving an upstream paginated search endpoint to exhaustion.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::calendar::{dates_between, LocalDate};
use crate::error::{DateError, ReportError};
use crate::filter::DateField;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::pacer::RequestPacer;
use crate::record::Record;

/// Inclusive date window a caller wants records for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    start: LocalDate,
    end: LocalDate,
}

impl SearchWindow {
    pub fn new(start: LocalDate, end: LocalDate) -> Result<Self, DateError> {
        if start > end {
            return Err(DateError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: LocalDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub const fn start(&self) -> LocalDate {
        self.start
    }

    pub const fn end(&self) -> LocalDate {
        self.end
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    /// End date sent upstream.
    ///
    /// The upstream range filter returns nothing for equal bounds, so a
    /// single-day window is widened by one day on the wire. Post-fetch
    /// filtering still uses [`Self::dates`], which never includes the extra day.
    pub fn upstream_end(&self) -> Result<LocalDate, DateError> {
        if self.is_single_day() {
            self.end.next_day()
        } else {
            Ok(self.end)
        }
    }

    pub fn dates(&self) -> Result<Vec<LocalDate>, DateError> {
        dates_between(self.start, self.end)
    }
}

/// Body of one search request: which date field to range over, the window,
/// and category-specific filters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub date_field: DateField,
    pub window: SearchWindow,
    pub filters: Map<String, Value>,
}

impl SearchQuery {
    pub fn new(date_field: DateField, window: SearchWindow) -> Self {
        Self {
            date_field,
            window,
            filters: Map::new(),
        }
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.filters.insert(name.into(), value);
        self
    }

    pub fn to_body(&self) -> Result<Value, DateError> {
        let mut body = Map::new();
        body.insert(
            String::from("tipoData"),
            Value::String(self.date_field.name().to_owned()),
        );
        body.insert(
            String::from("dataInicial"),
            Value::String(self.window.start().to_string()),
        );
        body.insert(
            String::from("dataFinal"),
            Value::String(self.window.upstream_end()?.to_string()),
        );
        for (name, value) in &self.filters {
            body.insert(name.clone(), value.clone());
        }
        Ok(Value::Object(body))
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Option<Vec<Record>>,
    #[serde(default)]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    #[serde(default)]
    next: Option<Value>,
}

impl SearchPage {
    fn has_next(&self) -> bool {
        self.links
            .as_ref()
            .and_then(|links| links.next.as_ref())
            .is_some_and(|next| !next.is_null())
    }
}

/// Sequential page walker for the core search endpoints.
#[derive(Clone)]
pub struct PageFetcher {
    http_client: Arc<dyn HttpClient>,
    pacer: RequestPacer,
    timeout_ms: u64,
}

impl PageFetcher {
    pub fn new(http_client: Arc<dyn HttpClient>, pacer: RequestPacer, timeout_ms: u64) -> Self {
        Self {
            http_client,
            pacer,
            timeout_ms,
        }
    }

    /// Requests pages 1, 2, ... until the response carries no next link,
    /// waiting the pacer interval after every page.
    ///
    /// Any non-success page aborts the whole fetch; partial results are
    /// discarded.
    pub async fn fetch_all_pages(
        &self,
        endpoint: &str,
        auth: &HttpAuth,
        query: &SearchQuery,
    ) -> Result<Vec<Record>, ReportError> {
        let body = query.to_body()?;
        if query.window.is_single_day() {
            debug!(
                endpoint,
                date = %query.window.start(),
                upstream_end = %query.window.upstream_end()?,
                "widening single-day window for upstream search"
            );
        }

        let mut accumulated = Vec::new();
        let mut page: u32 = 1;

        loop {
            self.pacer.ready().await;

            let url = format!("{endpoint}?page={page}");
            let request = HttpRequest::post(&url)
                .with_auth(auth)
                .with_timeout_ms(self.timeout_ms)
                .with_json(&body)
                .map_err(|error| ReportError::transport(endpoint, error))?;

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|error| ReportError::transport(endpoint, error))?;

            if !response.is_success() {
                return Err(ReportError::UpstreamRequest {
                    endpoint: endpoint.to_owned(),
                    status: response.status,
                });
            }

            let parsed: SearchPage = serde_json::from_str(&response.body)
                .map_err(|error| ReportError::decode(endpoint, error))?;
            let has_next = parsed.has_next();
            let records = parsed.data.unwrap_or_default();

            debug!(endpoint, page, records = records.len(), has_next, "fetched page");
            accumulated.extend(records);
            // Also after the last page, which spaces consecutive days.
            self.pacer.settle().await;

            if !has_next {
                break;
            }
            page += 1;
        }

        info!(
            endpoint,
            pages = page,
            records = accumulated.len(),
            start = %query.window.start(),
            end = %query.window.end(),
            "search exhausted"
        );
        Ok(accumulated)
    }
}
