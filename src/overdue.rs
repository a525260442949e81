use serde::Deserialize;
use time::{macros::format_description, Date};

use crate::model::{Invoice, InvoiceStatus};

/// Whether `draft`/`sent` invoices past their due date are reported as overdue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverduePolicy {
    /// Status only changes through explicit user action.
    #[default]
    Manual,
    DueDatePassed,
}

fn parse_ymd(raw: &str) -> Option<Date> {
    let format = format_description!("[year]-[month]-[day]");
    // Accept full timestamps by looking at the date prefix only.
    let head = raw.trim().get(..10)?;
    Date::parse(head, &format).ok()
}

impl OverduePolicy {
    pub fn effective_status(&self, invoice: &Invoice, today: Date) -> InvoiceStatus {
        match self {
            OverduePolicy::Manual => invoice.status,
            OverduePolicy::DueDatePassed => {
                let open = matches!(invoice.status, InvoiceStatus::Draft | InvoiceStatus::Sent);
                let past_due = invoice
                    .due_date_str()
                    .and_then(parse_ymd)
                    .is_some_and(|due| due < today);
                if open && past_due {
                    InvoiceStatus::Overdue
                } else {
                    invoice.status
                }
            }
        }
    }

    /// Rewrites statuses in place for display; nothing is persisted.
    pub fn apply(&self, invoices: &mut [Invoice], today: Date) {
        if *self == OverduePolicy::Manual {
            return;
        }
        for invoice in invoices {
            invoice.status = self.effective_status(invoice, today);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::date;

    fn invoice(status: InvoiceStatus, due: Option<&str>) -> Invoice {
        let mut inv = Invoice::new_draft_on("USD", "2026-01-01".into(), "INV-1".into());
        inv.status = status;
        inv.due_date = due.map(str::to_string);
        inv
    }

    #[rstest]
    #[case(InvoiceStatus::Draft, Some("2026-03-01"), InvoiceStatus::Overdue)]
    #[case(InvoiceStatus::Sent, Some("2026-03-01"), InvoiceStatus::Overdue)]
    #[case(InvoiceStatus::Paid, Some("2026-03-01"), InvoiceStatus::Paid)]
    #[case(InvoiceStatus::Sent, Some("2026-03-10"), InvoiceStatus::Sent)]
    #[case(InvoiceStatus::Sent, Some("2026-04-01"), InvoiceStatus::Sent)]
    #[case(InvoiceStatus::Sent, None, InvoiceStatus::Sent)]
    #[case(InvoiceStatus::Sent, Some(""), InvoiceStatus::Sent)]
    #[case(InvoiceStatus::Sent, Some("not a date"), InvoiceStatus::Sent)]
    fn due_date_policy(#[case] status: InvoiceStatus, #[case] due: Option<&str>, #[case] expected: InvoiceStatus) {
        let today = date!(2026 - 03 - 10);
        let got = OverduePolicy::DueDatePassed.effective_status(&invoice(status, due), today);
        assert_eq!(got, expected);
    }

    #[test]
    fn manual_policy_never_changes_status() {
        let mut list = vec![invoice(InvoiceStatus::Draft, Some("2000-01-01"))];
        OverduePolicy::Manual.apply(&mut list, date!(2026 - 03 - 10));
        assert_eq!(list[0].status, InvoiceStatus::Draft);
    }

    #[test]
    fn parses_timestamp_prefix() {
        assert_eq!(parse_ymd("2026-03-10T12:00:00Z"), Some(date!(2026 - 03 - 10)));
        assert_eq!(parse_ymd("2026-3-1"), None);
    }
}
