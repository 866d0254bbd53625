use std::sync::Arc;
use std::time::Duration;

use opsdigest_core::{
    BrokerApi, BrokerSettings, Clock, Credentials, FixedClock, HttpClient, LocalDate,
    ReportError, ReqwestHttpClient, TicketFeedSettings, TicketScanner,
};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const URGENT: &str = "Solicitação: Assistência Urgente - chaveiro";

fn date(value: &str) -> LocalDate {
    LocalDate::parse(value).expect("valid date")
}

fn broker(server: &MockServer, today: &str) -> BrokerApi {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::on(date(today)));
    let settings = BrokerSettings::new(
        format!("{}/api", server.uri()),
        Credentials::new("ops@example.test", "secret"),
    )
    .with_page_delay(Duration::ZERO);
    BrokerApi::new(http, clock, settings)
}

fn tickets(server: &MockServer, token: Option<&str>) -> TicketScanner {
    TicketScanner::new(
        Arc::new(ReqwestHttpClient::new()),
        TicketFeedSettings {
            feed_url: format!("{}/ticket", server.uri()),
            token: token.map(str::to_owned),
            page_delay: Duration::ZERO,
            ..TicketFeedSettings::default()
        },
    )
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"email": "ops@example.test", "senha": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"token": "tok-123"}})))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_then_walks_every_production_page_with_the_bearer_token() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/producao/pesquisar"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Bearer tok-123"))
        .and(body_partial_json(json!({
            "tipoData": "dataVigenciaInicial",
            "dataInicial": "2024-05-14",
            "dataFinal": "2024-05-15"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": 1, "dataVigenciaInicial": "2024-05-14"},
                {"id": 2, "dataVigenciaInicial": "2024-05-15"}
            ],
            "links": {"next": "https://broker/api/producao/pesquisar?page=2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/producao/pesquisar"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 3, "dataVigenciaInicial": "2024-05-14T11:00:00"}],
            "links": {"next": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = broker(&server, "2024-05-15");
    let token = api.authenticate().await.expect("login");
    let records = api
        .transmissions(&token, date("2024-05-14"))
        .await
        .expect("transmissions");

    let ids: Vec<_> = records.iter().filter_map(|r| r.get("id")).cloned().collect();
    assert_eq!(ids, vec![json!(1), json!(3)]);
}

#[tokio::test]
async fn rejected_login_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let error = broker(&server, "2024-05-15")
        .authenticate()
        .await
        .expect_err("rejected");

    assert!(matches!(error, ReportError::Authentication { status: 401 }));
}

#[tokio::test]
async fn single_day_full_production_asks_for_the_following_day_too() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/producao/pesquisar"))
        .and(body_partial_json(json!({
            "dataInicial": "2024-05-01",
            "dataFinal": "2024-05-02"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"propostaId": 1, "dataVigenciaInicial": "2024-05-01"},
                {"propostaId": 2, "dataVigenciaInicial": "2024-05-02"}
            ],
            "links": {"next": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = broker(&server, "2024-05-20");
    let records = api
        .production_for_period(
            &opsdigest_core::AccessToken::new("tok"),
            date("2024-05-01"),
            date("2024-05-01"),
        )
        .await
        .expect("production");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("propostaId"), Some(&json!(1)));
}

#[tokio::test]
async fn failing_second_page_aborts_the_claims_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sinistros/pesquisar"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"dataAviso": "2024-05-14"}],
            "links": {"next": "p2"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/sinistros/pesquisar"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let error = broker(&server, "2024-05-15")
        .claims(&opsdigest_core::AccessToken::new("tok"), date("2024-05-14"))
        .await
        .expect_err("second page fails");

    assert!(matches!(error, ReportError::UpstreamRequest { status: 502, .. }));
}

#[tokio::test]
async fn ticket_scan_reads_every_page_up_to_total_page_and_no_further() {
    let server = MockServer::start().await;
    for (page, id) in [("0", 1), ("1", 2), ("2", 3)] {
        Mock::given(method("GET"))
            .and(path("/ticket"))
            .and(query_param("start", page))
            .and(query_param("limit", "100"))
            .and(query_param("abertoStart", "2024-04-24T00:00:00Z"))
            .and(header("authorization", "feed-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": id, "titulo": URGENT, "aberto": "2024-05-01T09:00:00"}],
                "totalPage": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/ticket"))
        .and(query_param("start", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "totalPage": 2})))
        .expect(0)
        .mount(&server)
        .await;

    let found = tickets(&server, Some("feed-token")).scan(date("2024-05-01")).await;

    let ids: Vec<_> = found.iter().filter_map(|t| t.get("id")).cloned().collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn ticket_feed_outage_degrades_to_no_tickets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticket"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let found = tickets(&server, Some("feed-token")).scan(date("2024-05-01")).await;

    assert!(found.is_empty());
}

#[tokio::test]
async fn ticket_feed_garbage_degrades_to_no_tickets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticket"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let found = tickets(&server, Some("feed-token")).scan(date("2024-05-01")).await;

    assert!(found.is_empty());
}
