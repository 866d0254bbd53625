//! Per-category fetch adapters.
//!
//! [`RecordSource`] is the seam between orchestration and the upstream APIs:
//! the runner and aggregator only see this trait, so tests can drive them with
//! in-memory sources while [`HttpRecordSource`] talks to the real endpoints.

mod broker;

use std::future::Future;
use std::pin::Pin;

pub use broker::{BrokerApi, BrokerSettings};

use crate::auth::AccessToken;
use crate::calendar::LocalDate;
use crate::error::ReportError;
use crate::record::Record;
use crate::tickets::TicketScanner;

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ReportError>> + Send + 'a>>;
pub type TicketFuture<'a> = Pin<Box<dyn Future<Output = Vec<Record>> + Send + 'a>>;

/// Everything a report run needs from upstream.
pub trait RecordSource: Send + Sync {
    fn authenticate<'a>(&'a self) -> SourceFuture<'a, AccessToken>;

    fn transmissions<'a>(
        &'a self,
        token: &'a AccessToken,
        target: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>>;

    fn issued_policies<'a>(
        &'a self,
        token: &'a AccessToken,
        target: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>>;

    fn claims<'a>(
        &'a self,
        token: &'a AccessToken,
        target: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>>;

    /// Urgent tickets never fail; problems degrade to fewer tickets.
    fn urgent_tickets<'a>(&'a self, target: LocalDate) -> TicketFuture<'a>;

    fn production_for_period<'a>(
        &'a self,
        token: &'a AccessToken,
        start: LocalDate,
        end: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>>;
}

/// Live source backed by the broker API and the ticket feed.
#[derive(Clone)]
pub struct HttpRecordSource {
    broker: BrokerApi,
    tickets: TicketScanner,
}

impl HttpRecordSource {
    pub fn new(broker: BrokerApi, tickets: TicketScanner) -> Self {
        Self { broker, tickets }
    }

    pub fn broker(&self) -> &BrokerApi {
        &self.broker
    }
}

impl RecordSource for HttpRecordSource {
    fn authenticate<'a>(&'a self) -> SourceFuture<'a, AccessToken> {
        Box::pin(self.broker.authenticate())
    }

    fn transmissions<'a>(
        &'a self,
        token: &'a AccessToken,
        target: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>> {
        Box::pin(self.broker.transmissions(token, target))
    }

    fn issued_policies<'a>(
        &'a self,
        token: &'a AccessToken,
        target: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>> {
        Box::pin(self.broker.issued_policies(token, target))
    }

    fn claims<'a>(
        &'a self,
        token: &'a AccessToken,
        target: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>> {
        Box::pin(self.broker.claims(token, target))
    }

    fn urgent_tickets<'a>(&'a self, target: LocalDate) -> TicketFuture<'a> {
        Box::pin(self.tickets.scan(target))
    }

    fn production_for_period<'a>(
        &'a self,
        token: &'a AccessToken,
        start: LocalDate,
        end: LocalDate,
    ) -> SourceFuture<'a, Vec<Record>> {
        Box::pin(self.broker.production_for_period(token, start, end))
    }
}
