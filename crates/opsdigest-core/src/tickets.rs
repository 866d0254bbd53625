//! Incremental scan of the urgent-ticket feed.
//!
//! The feed is sorted upstream and filtered to tickets opened after a
//! lookback start. The scanner keeps urgent tickets opened on the target day,
//! de-duplicates them by id, and stops as soon as it has results and has seen
//! tickets newer than the target. Every failure is absorbed: tickets are a
//! supplementary signal and must never abort a run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::calendar::{iso_midnight_utc, LocalDate};
use crate::error::ReportError;
use crate::filter::{matches_date, DateField};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::pacer::RequestPacer;
use crate::record::{Record, RecordId};

pub const DEFAULT_FEED_URL: &str = "https://api.sults.com.br/api/v1/chamado/ticket";

/// Title fragments that mark a ticket as an urgent assistance request.
pub const URGENT_MARKERS: [&str; 2] = [
    "Solicitação: Assistência Urgente",
    "Solicitação: Assistência urgente",
];

const TITLE_FIELD: &str = "titulo";
const ID_FIELD: &str = "id";

/// Feed connection settings.
#[derive(Debug, Clone)]
pub struct TicketFeedSettings {
    pub feed_url: String,
    /// Sent verbatim as the authorization header. `None` disables the scan.
    pub token: Option<String>,
    pub page_size: u32,
    pub page_delay: Duration,
    pub lookback_days: i64,
    pub timeout_ms: u64,
}

impl Default for TicketFeedSettings {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_owned(),
            token: None,
            page_size: 100,
            page_delay: Duration::from_millis(500),
            lookback_days: 7,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketPage {
    #[serde(default)]
    data: Option<Vec<Record>>,
    #[serde(default)]
    total_page: Option<u64>,
}

/// True when the ticket title carries one of [`URGENT_MARKERS`].
pub fn is_urgent(ticket: &Record) -> bool {
    ticket
        .text(TITLE_FIELD)
        .is_some_and(|title| URGENT_MARKERS.iter().any(|marker| title.contains(marker)))
}

/// Urgent tickets accumulated over one scan, unique by id.
///
/// Tickets without an id count as sharing one id, so only the first is kept.
#[derive(Debug, Default)]
struct ScanAccumulator {
    seen: HashSet<RecordId>,
    kept_unidentified: bool,
    tickets: Vec<Record>,
}

impl ScanAccumulator {
    fn offer(&mut self, ticket: &Record) {
        match ticket.identity(ID_FIELD) {
            Some(id) => {
                if self.seen.insert(id) {
                    self.tickets.push(ticket.clone());
                }
            }
            None => {
                if !self.kept_unidentified {
                    self.kept_unidentified = true;
                    self.tickets.push(ticket.clone());
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct TicketScanner {
    http_client: Arc<dyn HttpClient>,
    pacer: RequestPacer,
    settings: TicketFeedSettings,
}

impl TicketScanner {
    pub fn new(http_client: Arc<dyn HttpClient>, settings: TicketFeedSettings) -> Self {
        Self {
            http_client,
            pacer: RequestPacer::new(settings.page_delay),
            settings,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.token.is_some()
    }

    /// Urgent tickets opened on `target`.
    pub async fn scan(&self, target: LocalDate) -> Vec<Record> {
        let Some(token) = self.settings.token.as_deref() else {
            warn!(%target, "ticket feed token not configured, skipping urgent tickets");
            return Vec::new();
        };

        let opened_after = match target.add_days(-self.settings.lookback_days) {
            Ok(start) => iso_midnight_utc(start),
            Err(error) => {
                warn!(%target, %error, "cannot compute ticket lookback start");
                return Vec::new();
            }
        };
        let auth = HttpAuth::RawToken(token.to_owned());
        let target_text = target.to_string();

        let mut accumulator = ScanAccumulator::default();
        let mut page: u64 = 0;
        let mut processed = 0usize;

        loop {
            let page_tickets = match self.fetch_page(page, &opened_after, &auth).await {
                Ok(parsed) => parsed,
                Err(error) => {
                    warn!(%target, page, code = error.code(), %error, "ticket scan stopped early");
                    break;
                }
            };
            let total_pages = page_tickets.total_page.unwrap_or(page);
            let tickets = page_tickets.data.unwrap_or_default();
            processed += tickets.len();

            for ticket in tickets
                .iter()
                .filter(|ticket| is_urgent(ticket))
                .filter(|ticket| matches_date(ticket, DateField::TicketOpened, &target_text))
            {
                accumulator.offer(ticket);
            }

            let saw_newer = tickets.iter().any(|ticket| {
                ticket
                    .date_prefix(DateField::TicketOpened.name())
                    .is_some_and(|opened| opened.as_ref() > target_text.as_str())
            });

            debug!(
                page,
                total_pages,
                processed,
                matched = accumulator.tickets.len(),
                saw_newer,
                "ticket page scanned"
            );

            if saw_newer && !accumulator.tickets.is_empty() {
                break;
            }

            page += 1;
            self.pacer.settle().await;
            if page > total_pages {
                break;
            }
        }

        info!(%target, urgent_tickets = accumulator.tickets.len(), processed, "ticket scan finished");
        accumulator.tickets
    }

    async fn fetch_page(
        &self,
        page: u64,
        opened_after: &str,
        auth: &HttpAuth,
    ) -> Result<TicketPage, ReportError> {
        self.pacer.ready().await;

        let url = format!(
            "{}?start={page}&limit={}&abertoStart={}",
            self.settings.feed_url,
            self.settings.page_size,
            urlencoding::encode(opened_after)
        );
        let request = HttpRequest::get(url)
            .with_auth(auth)
            .with_header("content-type", "application/json;charset=UTF-8")
            .with_timeout_ms(self.settings.timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| ReportError::transport(&self.settings.feed_url, error))?;

        if !response.is_success() {
            return Err(ReportError::TicketFeed {
                status: response.status,
            });
        }

        serde_json::from_str(&response.body)
            .map_err(|error| ReportError::decode(&self.settings.feed_url, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ScriptedHttpClient;
    use serde_json::{json, Value};

    const URGENT: &str = "Solicitação: Assistência Urgente - guincho";

    fn date(value: &str) -> LocalDate {
        LocalDate::parse(value).expect("valid date")
    }

    fn scanner(client: Arc<ScriptedHttpClient>, token: Option<&str>) -> TicketScanner {
        TicketScanner::new(
            client,
            TicketFeedSettings {
                feed_url: String::from("https://tickets.test/ticket"),
                token: token.map(str::to_owned),
                page_delay: Duration::ZERO,
                ..TicketFeedSettings::default()
            },
        )
    }

    fn ticket(id: u64, title: &str, opened: &str) -> Value {
        json!({"id": id, "titulo": title, "aberto": opened})
    }

    #[test]
    fn urgent_match_accepts_both_marker_spellings_only() {
        let upper = Record::try_from(json!({"titulo": URGENT})).expect("object");
        let lower =
            Record::try_from(json!({"titulo": "Solicitação: Assistência urgente"})).expect("object");
        let other =
            Record::try_from(json!({"titulo": "Solicitação: ASSISTÊNCIA URGENTE"})).expect("object");
        let untitled = Record::try_from(json!({"id": 1})).expect("object");

        assert!(is_urgent(&upper));
        assert!(is_urgent(&lower));
        assert!(!is_urgent(&other));
        assert!(!is_urgent(&untitled));
    }

    #[tokio::test]
    async fn missing_token_short_circuits_without_requests() {
        let client = Arc::new(ScriptedHttpClient::new());
        let tickets = scanner(client.clone(), None).scan(date("2024-05-01")).await;

        assert!(tickets.is_empty());
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn dedups_across_pages_and_stops_after_newer_tickets() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.push_json(json!({
            "data": [
                ticket(1, URGENT, "2024-05-01T08:00:00"),
                ticket(2, URGENT, "2024-05-01T09:30:00-03:00"),
                ticket(9, "Dúvida geral", "2024-05-01T10:00:00")
            ],
            "totalPage": 10
        }));
        client.push_json(json!({
            "data": [
                ticket(2, URGENT, "2024-05-01T09:30:00-03:00"),
                ticket(3, URGENT, "2024-05-01T17:00:00")
            ],
            "totalPage": 10
        }));
        client.push_json(json!({
            "data": [ticket(4, URGENT, "2024-05-02T07:00:00")],
            "totalPage": 10
        }));

        let tickets = scanner(client.clone(), Some("raw-token"))
            .scan(date("2024-05-01"))
            .await;

        let ids: Vec<_> = tickets.iter().filter_map(|t| t.get("id")).cloned().collect();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(client.request_count(), 3);

        let first = &client.recorded_requests()[0];
        assert_eq!(
            first.url,
            "https://tickets.test/ticket?start=0&limit=100&abertoStart=2024-04-24T00%3A00%3A00Z"
        );
        assert_eq!(
            first.headers.get("authorization").map(String::as_str),
            Some("raw-token")
        );
    }

    #[tokio::test]
    async fn newer_tickets_without_results_keep_scanning_until_total_pages() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.push_json(json!({"data": [ticket(1, URGENT, "2024-05-03")], "totalPage": 1}));
        client.push_json(json!({"data": [ticket(2, "outro", "2024-05-03")], "totalPage": 1}));

        let tickets = scanner(client.clone(), Some("t")).scan(date("2024-05-01")).await;

        assert!(tickets.is_empty());
        assert_eq!(client.request_count(), 2);
    }

    #[tokio::test]
    async fn slow_ticket_pages_are_still_followed_by_the_full_delay() {
        let client = Arc::new(ScriptedHttpClient::new().with_latency(Duration::from_millis(100)));
        client.push_json(json!({"data": [ticket(1, URGENT, "2024-05-01")], "totalPage": 2}));
        client.push_json(json!({"data": [ticket(2, URGENT, "2024-05-01")], "totalPage": 2}));
        client.push_json(json!({"data": [ticket(3, URGENT, "2024-05-01")], "totalPage": 2}));
        let scanner = TicketScanner::new(
            client.clone(),
            TicketFeedSettings {
                feed_url: String::from("https://tickets.test/ticket"),
                token: Some(String::from("t")),
                page_delay: Duration::from_millis(50),
                ..TicketFeedSettings::default()
            },
        );

        let tickets = scanner.scan(date("2024-05-01")).await;

        assert_eq!(tickets.len(), 3);
        let gaps = client.idle_gaps();
        assert_eq!(gaps.len(), 2);
        assert!(
            gaps.iter().all(|gap| *gap >= Duration::from_millis(50)),
            "gaps {gaps:?}"
        );
    }

    #[tokio::test]
    async fn tickets_without_id_collapse_into_the_first_one() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.push_json(json!({
            "data": [
                {"titulo": URGENT, "aberto": "2024-05-01T08:00:00"},
                {"titulo": URGENT, "aberto": "2024-05-01T09:00:00"},
                ticket(5, URGENT, "2024-05-01T10:00:00")
            ]
        }));

        let tickets = scanner(client.clone(), Some("t")).scan(date("2024-05-01")).await;

        assert_eq!(tickets.len(), 2);
        assert_eq!(
            tickets[0].get("aberto"),
            Some(&json!("2024-05-01T08:00:00"))
        );
        assert_eq!(tickets[1].get("id"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn failing_page_returns_what_was_accumulated() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.push_json(json!({"data": [ticket(1, URGENT, "2024-05-01")], "totalPage": 3}));
        client.push_status(503);

        let tickets = scanner(client.clone(), Some("t")).scan(date("2024-05-01")).await;

        assert_eq!(tickets.len(), 1);
        assert_eq!(client.request_count(), 2);
    }

    #[tokio::test]
    async fn missing_total_page_stops_after_first_page() {
        let client = Arc::new(ScriptedHttpClient::new());
        client.push_json(json!({"data": []}));

        let tickets = scanner(client.clone(), Some("t")).scan(date("2024-05-01")).await;

        assert!(tickets.is_empty());
        assert_eq!(client.request_count(), 1);
    }
}
