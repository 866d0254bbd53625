//! Narrowing raw record sets down to a target date.

use std::collections::HashSet;

use crate::calendar::LocalDate;
use crate::record::Record;

/// Date fields the pipeline inspects, by upstream name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    /// Policy effective start (`dataVigenciaInicial`).
    EffectiveStart,
    /// Policy issue date (`dataEmitida`).
    Issued,
    /// Claim notice date (`dataAviso`).
    ClaimNotice,
    /// Ticket opened timestamp (`aberto`).
    TicketOpened,
}

impl DateField {
    pub const fn name(self) -> &'static str {
        match self {
            Self::EffectiveStart => "dataVigenciaInicial",
            Self::Issued => "dataEmitida",
            Self::ClaimNotice => "dataAviso",
            Self::TicketOpened => "aberto",
        }
    }
}

/// True when the field's date-only prefix equals `target` exactly.
pub fn matches_date(record: &Record, field: DateField, target: &str) -> bool {
    record
        .date_prefix(field.name())
        .is_some_and(|prefix| prefix == target)
}

/// Keeps records whose `field` falls on `target`. Missing or null fields never match.
pub fn filter_by_date(
    target: LocalDate,
    records: impl IntoIterator<Item = Record>,
    field: DateField,
) -> Vec<Record> {
    let target = target.to_string();
    records
        .into_iter()
        .filter(|record| matches_date(record, field, &target))
        .collect()
}

/// Keeps records whose `field` falls on any of `dates`.
pub fn filter_by_dates(
    dates: &[LocalDate],
    records: impl IntoIterator<Item = Record>,
    field: DateField,
) -> Vec<Record> {
    let wanted: HashSet<String> = dates.iter().map(ToString::to_string).collect();
    records
        .into_iter()
        .filter(|record| {
            record
                .date_prefix(field.name())
                .is_some_and(|prefix| wanted.contains(prefix.as_ref()))
        })
        .collect()
}
