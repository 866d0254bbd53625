//! Composing day-level fetches into period aggregates.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::RecordSource;
use crate::auth::AccessToken;
use crate::calendar::{LocalDate, Period};
use crate::error::ReportError;
use crate::record::Record;

/// Results that can be concatenated in date order.
pub trait Accumulate: Default {
    fn concat(&mut self, other: Self);
}

impl<T> Accumulate for Vec<T> {
    fn concat(&mut self, other: Self) {
        self.extend(other);
    }
}

/// Calls `fetch_day` for every date of `period`, strictly in order, and
/// concatenates the results. Single-day periods call it exactly once.
///
/// Days are independently date-filtered, so no cross-day de-duplication is
/// applied. The first failing day aborts the aggregation.
pub async fn aggregate<T, F, Fut>(period: &Period, mut fetch_day: F) -> Result<T, ReportError>
where
    T: Accumulate,
    F: FnMut(LocalDate) -> Fut,
    Fut: Future<Output = Result<T, ReportError>>,
{
    if period.is_single_day() {
        return fetch_day(period.start).await;
    }

    let mut total = T::default();
    for date in period.dates()? {
        debug!(%date, period = %period.label, "aggregating day");
        total.concat(fetch_day(date).await?);
    }
    Ok(total)
}

/// Record counts shown in every digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub transmissions: usize,
    pub issued_policies: usize,
    pub claims: usize,
    pub urgent_tickets: usize,
}

/// The four summary categories gathered for a period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryRecords {
    pub transmissions: Vec<Record>,
    pub issued_policies: Vec<Record>,
    pub claims: Vec<Record>,
    pub urgent_tickets: Vec<Record>,
}

impl CategoryRecords {
    pub fn counts(&self) -> SummaryCounts {
        SummaryCounts {
            transmissions: self.transmissions.len(),
            issued_policies: self.issued_policies.len(),
            claims: self.claims.len(),
            urgent_tickets: self.urgent_tickets.len(),
        }
    }
}

impl Accumulate for CategoryRecords {
    fn concat(&mut self, other: Self) {
        self.transmissions.extend(other.transmissions);
        self.issued_policies.extend(other.issued_policies);
        self.claims.extend(other.claims);
        self.urgent_tickets.extend(other.urgent_tickets);
    }
}

/// Fetches the four categories for one day, sequentially.
pub async fn fetch_day(
    source: &dyn RecordSource,
    token: &AccessToken,
    date: LocalDate,
) -> Result<CategoryRecords, ReportError> {
    let transmissions = source.transmissions(token, date).await?;
    let issued_policies = source.issued_policies(token, date).await?;
    let claims = source.claims(token, date).await?;
    let urgent_tickets = source.urgent_tickets(date).await;

    Ok(CategoryRecords {
        transmissions,
        issued_policies,
        claims,
        urgent_tickets,
    })
}

/// Summary categories for the whole period.
pub async fn collect_summary(
    source: &dyn RecordSource,
    token: &AccessToken,
    period: &Period,
) -> Result<CategoryRecords, ReportError> {
    let records = aggregate(period, |date| fetch_day(source, token, date)).await?;
    let counts = records.counts();
    info!(
        period = %period.label,
        transmissions = counts.transmissions,
        issued_policies = counts.issued_policies,
        claims = counts.claims,
        urgent_tickets = counts.urgent_tickets,
        "summary collected"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::PeriodKind;
    use std::cell::RefCell;

    fn date(value: &str) -> LocalDate {
        LocalDate::parse(value).expect("valid date")
    }

    #[tokio::test]
    async fn single_day_calls_fetch_once() {
        let calls = RefCell::new(Vec::new());
        let period = Period::single_day(date("2024-05-01"));

        let result: Vec<String> = aggregate(&period, |day| {
            calls.borrow_mut().push(day);
            async move { Ok(vec![day.to_string()]) }
        })
        .await
        .expect("aggregate");

        assert_eq!(result, vec!["2024-05-01"]);
        assert_eq!(calls.into_inner(), vec![date("2024-05-01")]);
    }

    #[tokio::test]
    async fn multi_day_concatenates_in_date_order() {
        let period =
            Period::new(PeriodKind::Weekly, date("2024-04-29"), date("2024-05-02"), "w").expect("period");

        let result: Vec<String> = aggregate(&period, |day| async move {
            Ok(vec![format!("{day}#a"), format!("{day}#b")])
        })
        .await
        .expect("aggregate");

        assert_eq!(result.len(), 8);
        assert_eq!(result[0], "2024-04-29#a");
        assert_eq!(result[2], "2024-04-30#a");
        assert_eq!(result[7], "2024-05-02#b");
    }

    #[tokio::test]
    async fn failing_day_aborts_the_aggregate() {
        let period =
            Period::new(PeriodKind::Weekly, date("2024-05-06"), date("2024-05-10"), "w").expect("period");
        let calls = RefCell::new(0);

        let result: Result<Vec<u8>, _> = aggregate(&period, |day| {
            *calls.borrow_mut() += 1;
            async move {
                if day == date("2024-05-07") {
                    Err(ReportError::UpstreamRequest {
                        endpoint: String::from("x"),
                        status: 500,
                    })
                } else {
                    Ok(vec![1])
                }
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.into_inner(), 2);
    }

    #[test]
    fn category_records_append_per_category() {
        let record = |n: u8| Record::try_from(serde_json::json!({ "n": n })).expect("object");
        let mut total = CategoryRecords {
            transmissions: vec![record(1)],
            ..CategoryRecords::default()
        };
        total.concat(CategoryRecords {
            transmissions: vec![record(2)],
            claims: vec![record(3)],
            ..CategoryRecords::default()
        });

        assert_eq!(
            total.counts(),
            SummaryCounts {
                transmissions: 2,
                issued_policies: 0,
                claims: 1,
                urgent_tickets: 0
            }
        );
        assert_eq!(total.transmissions[1], record(2));
    }
}
