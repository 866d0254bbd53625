use serde::Serialize;

use opsdigest_core::{Clock, LocalDate, Locale, Period, PeriodKind};

use crate::cli::PeriodArgs;
use crate::error::CliError;

use super::print_json;

#[derive(Debug, Serialize)]
struct PeriodOutput {
    kind: PeriodKind,
    start: LocalDate,
    end: LocalDate,
    label: String,
    days: i64,
    artifact_label: String,
}

impl From<Period> for PeriodOutput {
    fn from(period: Period) -> Self {
        Self {
            days: period.day_count(),
            artifact_label: period.artifact_label(),
            kind: period.kind,
            start: period.start,
            end: period.end,
            label: period.label,
        }
    }
}

pub fn run(
    args: &PeriodArgs,
    clock: &dyn Clock,
    locale: Locale,
    pretty: bool,
) -> Result<(), CliError> {
    let period = Period::for_kind(args.kind.into(), clock, locale)?;
    print_json(&PeriodOutput::from(period), pretty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdigest_core::FixedClock;

    #[test]
    fn weekly_output_names_the_business_week() {
        let clock = FixedClock::on(LocalDate::parse("2024-05-08").expect("date"));
        let period = Period::for_kind(PeriodKind::Weekly, &clock, Locale::default()).expect("period");
        let output = PeriodOutput::from(period);

        assert_eq!(output.days, 5);
        assert_eq!(output.artifact_label, "semana_2024-04-29_a_2024-05-03");

        let json = serde_json::to_value(&output).expect("serializable");
        assert_eq!(json["start"], "2024-04-29");
        assert_eq!(json["end"], "2024-05-03");
    }
}
