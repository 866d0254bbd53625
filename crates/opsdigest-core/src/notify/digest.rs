//! Reader-facing rendering of a period's summary.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::aggregator::SummaryCounts;
use crate::calendar::{Period, PeriodKind};
use crate::mail::escape_html;

const GENERATED_AT_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]/[month]/[year] [hour]:[minute]:[second]");

const ACCENT: &str = "#4A04A5";
const INK: &str = "#170138";

/// Title shown for each cadence, e.g. in subjects and failure reports.
pub const fn report_title(kind: PeriodKind) -> &'static str {
    match kind {
        PeriodKind::Daily => "Relatório Diário",
        PeriodKind::Weekly => "Relatório Semanal",
        PeriodKind::Monthly => "Relatório Mensal",
    }
}

/// Counts for one period plus everything needed to describe them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDigest {
    pub period: Period,
    pub counts: SummaryCounts,
    pub generated_at: OffsetDateTime,
}

impl ReportDigest {
    pub fn new(period: Period, counts: SummaryCounts) -> Self {
        Self {
            period,
            counts,
            generated_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn generated_at(mut self, generated_at: OffsetDateTime) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn kind(&self) -> PeriodKind {
        self.period.kind
    }

    pub fn title(&self) -> &'static str {
        report_title(self.period.kind)
    }

    /// Human description of the period, as used in subjects.
    fn period_text(&self, joiner: &str) -> String {
        match self.period.kind {
            PeriodKind::Daily | PeriodKind::Monthly => self.period.label.clone(),
            PeriodKind::Weekly => format!("{} {joiner} {}", self.period.start, self.period.end),
        }
    }

    fn summary_heading(&self) -> &'static str {
        match self.period.kind {
            PeriodKind::Daily => "Resumo do Dia Anterior",
            PeriodKind::Weekly => "Resumo da Semana",
            PeriodKind::Monthly => "Resumo do Mês",
        }
    }

    fn attachment_note(&self) -> &'static str {
        match self.period.kind {
            PeriodKind::Daily => "Em anexo, segue a planilha completa com a produção do dia anterior.",
            PeriodKind::Weekly => "Em anexo, planilha completa da semana.",
            PeriodKind::Monthly => "Em anexo, planilha completa do mês.",
        }
    }

    fn period_caption(&self) -> (&'static str, String) {
        match self.period.kind {
            PeriodKind::Daily => ("Data de Referência", self.period.label.clone()),
            PeriodKind::Weekly => ("Período", self.period_text("até")),
            PeriodKind::Monthly => ("Período", self.period.label.clone()),
        }
    }

    pub fn email_subject(&self) -> String {
        format!("{} - Centro de Operações - {}", self.title(), self.period_text("a"))
    }

    pub fn email_html(&self) -> String {
        let (caption, period) = self.period_caption();
        let generated = self
            .generated_at
            .format(GENERATED_AT_FORMAT)
            .unwrap_or_else(|_| self.generated_at.to_string());

        let rows = [
            ("Transmissões", self.counts.transmissions),
            ("Apólices Emitidas", self.counts.issued_policies),
            ("Sinistros Abertos", self.counts.claims),
            ("Assistências Urgentes", self.counts.urgent_tickets),
        ];

        let mut html = String::from(
            "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head><meta charset=\"UTF-8\"></head>\n\
             <body style=\"margin: 0; padding: 0; background-color: #f5f5f5; font-family: Arial, sans-serif;\">\n\
             <table role=\"presentation\" width=\"600\" align=\"center\" style=\"background-color: #ffffff;\">\n",
        );
        html.push_str(&format!(
            "<tr><td style=\"padding: 35px 40px 25px 40px; border-top: 3px solid {ACCENT};\">\
             <h1 style=\"margin: 0; font-size: 24px; font-weight: 400; color: {INK};\">{}</h1>\
             <p style=\"margin: 8px 0 0 0; font-size: 14px; color: #666666;\">Centro de Operações</p></td></tr>\n",
            self.title()
        ));
        html.push_str(&format!(
            "<tr><td style=\"padding: 0 40px 30px 40px; font-size: 13px; color: #666666;\">\
             <p style=\"margin: 0;\">{caption}: <strong style=\"color: {INK};\">{}</strong></p>\
             <p style=\"margin: 8px 0 0 0;\">Gerado em: <strong style=\"color: {INK};\">{generated}</strong></p></td></tr>\n",
            escape_html(&period)
        ));
        html.push_str(&format!(
            "<tr><td style=\"padding: 0 40px;\">\
             <h2 style=\"margin: 0 0 20px 0; font-size: 16px; font-weight: 500; color: {INK}; text-transform: uppercase;\">{}</h2>\
             <table role=\"presentation\" width=\"100%\">\n",
            self.summary_heading()
        ));
        for (label, count) in rows {
            html.push_str(&format!(
                "<tr><td style=\"padding: 18px 0; font-size: 14px; color: #666666; border-bottom: 1px solid #e0e0e0;\">{label}</td>\
                 <td style=\"padding: 18px 0; font-size: 28px; color: {ACCENT}; text-align: right; border-bottom: 1px solid #e0e0e0;\">{count}</td></tr>\n"
            ));
        }
        html.push_str("</table></td></tr>\n");
        html.push_str(&format!(
            "<tr><td style=\"padding: 35px 40px 40px 40px; font-size: 13px; color: #666666;\">{}</td></tr>\n",
            self.attachment_note()
        ));
        html.push_str("</table>\n</body>\n</html>\n");
        html
    }

    /// Plain text for chat delivery, using `*bold*` markup.
    pub fn messaging_text(&self) -> String {
        let (caption, period) = self.period_caption();
        format!(
            "📊 *{} - Centro de Operações*\n\n\
             📅 *{caption}:* {period}\n\n\
             📈 *{}:*\n\
             • Transmissões: *{}*\n\
             • Apólices Emitidas: *{}*\n\
             • Sinistros Abertos: *{}*\n\
             • Assistências Urgentes: *{}*\n\n\
             📎 Planilha completa em anexo.",
            self.title(),
            self.summary_heading(),
            self.counts.transmissions,
            self.counts.issued_policies,
            self.counts.claims,
            self.counts.urgent_tickets,
        )
    }
}
