use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::auth::{authenticate, AccessToken, Credentials};
use crate::calendar::{Clock, LocalDate};
use crate::error::ReportError;
use crate::filter::{filter_by_date, filter_by_dates, DateField};
use crate::http_client::HttpClient;
use crate::pacer::RequestPacer;
use crate::pagination::{PageFetcher, SearchQuery, SearchWindow};
use crate::record::Record;

const PRODUCTION_PATH: &str = "/producao/pesquisar";
const CLAIMS_PATH: &str = "/sinistros/pesquisar";

/// Connection settings for the broker API.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub api_url: String,
    pub login_url: String,
    pub credentials: Credentials,
    pub page_delay: Duration,
    pub timeout_ms: u64,
}

impl BrokerSettings {
    pub fn new(api_url: impl Into<String>, credentials: Credentials) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_owned();
        Self {
            login_url: format!("{api_url}/login"),
            api_url,
            credentials,
            page_delay: Duration::from_millis(1_000),
            timeout_ms: 30_000,
        }
    }

    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = login_url.into();
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Adapters for the broker's production and claims search endpoints.
///
/// Each per-day adapter searches from the target date up to today and then
/// keeps only records whose category date equals the target.
#[derive(Clone)]
pub struct BrokerApi {
    http_client: Arc<dyn HttpClient>,
    fetcher: PageFetcher,
    clock: Arc<dyn Clock>,
    settings: BrokerSettings,
}

impl BrokerApi {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        settings: BrokerSettings,
    ) -> Self {
        let fetcher = PageFetcher::new(
            http_client.clone(),
            RequestPacer::new(settings.page_delay),
            settings.timeout_ms,
        );
        Self {
            http_client,
            fetcher,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub async fn authenticate(&self) -> Result<AccessToken, ReportError> {
        authenticate(
            self.http_client.as_ref(),
            &self.settings.login_url,
            &self.settings.credentials,
            self.settings.timeout_ms,
        )
        .await
    }

    /// Production whose effective start falls on `target`.
    pub async fn transmissions(
        &self,
        token: &AccessToken,
        target: LocalDate,
    ) -> Result<Vec<Record>, ReportError> {
        self.production_on(token, target, DateField::EffectiveStart)
            .await
    }

    /// Policies issued on `target`.
    pub async fn issued_policies(
        &self,
        token: &AccessToken,
        target: LocalDate,
    ) -> Result<Vec<Record>, ReportError> {
        self.production_on(token, target, DateField::Issued).await
    }

    /// Claims whose notice date falls on `target`.
    pub async fn claims(
        &self,
        token: &AccessToken,
        target: LocalDate,
    ) -> Result<Vec<Record>, ReportError> {
        let window = self.window_until_today(target)?;
        let query = SearchQuery::new(DateField::ClaimNotice, window);
        let records = self
            .fetcher
            .fetch_all_pages(&self.endpoint(CLAIMS_PATH), &token.bearer(), &query)
            .await?;
        Ok(filter_by_date(target, records, DateField::ClaimNotice))
    }

    /// Every production record whose effective start lies within `[start, end]`.
    pub async fn production_for_period(
        &self,
        token: &AccessToken,
        start: LocalDate,
        end: LocalDate,
    ) -> Result<Vec<Record>, ReportError> {
        let window = SearchWindow::new(start, end)?;
        let query = production_query(DateField::EffectiveStart, window);
        let records = self
            .fetcher
            .fetch_all_pages(&self.endpoint(PRODUCTION_PATH), &token.bearer(), &query)
            .await?;

        let kept = filter_by_dates(&window.dates()?, records, DateField::EffectiveStart);
        info!(%start, %end, records = kept.len(), "full production fetched");
        Ok(kept)
    }

    async fn production_on(
        &self,
        token: &AccessToken,
        target: LocalDate,
        field: DateField,
    ) -> Result<Vec<Record>, ReportError> {
        let window = self.window_until_today(target)?;
        let query = production_query(field, window);
        let records = self
            .fetcher
            .fetch_all_pages(&self.endpoint(PRODUCTION_PATH), &token.bearer(), &query)
            .await?;
        Ok(filter_by_date(target, records, field))
    }

    fn window_until_today(&self, target: LocalDate) -> Result<SearchWindow, ReportError> {
        Ok(SearchWindow::new(target, self.clock.today())?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.settings.api_url)
    }
}

fn production_query(field: DateField, window: SearchWindow) -> SearchQuery {
    SearchQuery::new(field, window)
        .with_filter("nivel", json!(["1", "2"]))
        .with_filter("tipo", json!(["0", "2", "4"]))
        .with_filter(
            "status",
            json!(["0", null, "", "1", "3", "4", "5", "6", "7"]),
        )
}
