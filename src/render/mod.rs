//! Presentation model for an invoice.
//!
//! [`layout`] turns an [`Invoice`] into an [`InvoiceLayout`]: every string the
//! preview and the exporters show, already formatted, with the conditional
//! totals lines decided once. Nothing here mutates the invoice or touches
//! storage.

pub mod html;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::currency::currency_symbol;
use crate::error::InvoiceError;
use crate::model::{Invoice, InvoiceStatus};

pub const INVOICE_TITLE: &str = "INVOICE";
pub const ITEM_COLUMNS: [&str; 4] = ["Description", "Qty", "Rate", "Amount"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Minimal,
    Modern,
    Elegant,
    Vibrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Minimal, Theme::Modern, Theme::Elegant, Theme::Vibrant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Minimal => "minimal",
            Theme::Modern => "modern",
            Theme::Elegant => "elegant",
            Theme::Vibrant => "vibrant",
        }
    }

    pub fn colors(&self) -> ThemeColors {
        match self {
            Theme::Minimal => ThemeColors {
                primary: "#000000",
                secondary: "#666666",
                accent: "#f8f9fa",
            },
            Theme::Modern => ThemeColors {
                primary: "#2563eb",
                secondary: "#64748b",
                accent: "#eff6ff",
            },
            Theme::Elegant => ThemeColors {
                primary: "#7c3aed",
                secondary: "#6b7280",
                accent: "#f3f4f6",
            },
            Theme::Vibrant => ThemeColors {
                primary: "#dc2626",
                secondary: "#374151",
                accent: "#fef2f2",
            },
        }
    }
}

impl FromStr for Theme {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Theme::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| InvoiceError::Validation(format!("unknown theme: {s}")))
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two decimals, no grouping. Values that round to zero never print as `-0.00`.
pub fn format_amount(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    let rounded = (v * 100.0).round() / 100.0;
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.2}", rounded)
}

/// `$1234.50`, `-$10.00`. An unknown currency prints without a symbol.
pub fn format_money(symbol: &str, v: f64) -> String {
    let s = format_amount(v);
    match s.strip_prefix('-') {
        Some(abs) => format!("-{symbol}{abs}"),
        None => format!("{symbol}{s}"),
    }
}

/// Shortest form of a user-entered number: `2`, `1.5`, `8.25`.
pub fn format_number(v: f64) -> String {
    if v.is_finite() {
        format!("{}", v)
    } else {
        "0".to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderBlock {
    /// Raw logo value; each surface decides what it can show.
    pub logo: Option<String>,
    pub title: String,
    pub invoice_number: String,
    pub date: String,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartyBlock {
    pub heading: &'static str,
    pub name: String,
    /// Email, phone, then each address line; blanks omitted.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub description: String,
    pub quantity: String,
    pub rate: String,
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalKind {
    Subtotal,
    Tax,
    Discount,
    Shipping,
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TotalLine {
    pub kind: TotalKind,
    pub label: String,
    pub value: String,
}

impl TotalLine {
    pub fn emphasized(&self) -> bool {
        self.kind == TotalKind::Total
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub heading: &'static str,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLayout {
    pub theme: Theme,
    /// ISO code of the invoice currency; money values carry its symbol.
    pub currency: String,
    pub header: HeaderBlock,
    pub from: PartyBlock,
    pub to: PartyBlock,
    pub rows: Vec<ItemRow>,
    pub totals: Vec<TotalLine>,
    pub notes: Option<TextBlock>,
    pub terms: Option<TextBlock>,
}

fn party(heading: &'static str, contact: &crate::model::Contact) -> PartyBlock {
    let mut lines = Vec::new();
    for value in [&contact.email, &contact.phone] {
        let v = value.trim();
        if !v.is_empty() {
            lines.push(v.to_string());
        }
    }
    lines.extend(
        contact
            .address
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
    );
    PartyBlock {
        heading,
        name: contact.name.trim().to_string(),
        lines,
    }
}

fn text_block(heading: &'static str, text: &str) -> Option<TextBlock> {
    if text.trim().is_empty() {
        return None;
    }
    Some(TextBlock {
        heading,
        lines: text.trim_end().lines().map(str::to_string).collect(),
    })
}

/// Builds the display model from a recalculated copy, so stale stored
/// totals never reach the page.
pub fn layout(invoice: &Invoice, theme: Theme) -> InvoiceLayout {
    let mut inv = invoice.clone();
    inv.recalculate();

    let symbol = currency_symbol(&inv.currency);
    let money = |v: f64| format_money(symbol, v);

    let rows = inv
        .items
        .iter()
        .map(|item| ItemRow {
            description: item.description.clone(),
            quantity: format_number(item.quantity),
            rate: money(item.rate),
            amount: money(item.amount),
        })
        .collect();

    let mut totals = vec![TotalLine {
        kind: TotalKind::Subtotal,
        label: "Subtotal".to_string(),
        value: money(inv.subtotal),
    }];
    if inv.tax_amount != 0.0 {
        totals.push(TotalLine {
            kind: TotalKind::Tax,
            label: format!("Tax ({}%)", format_number(inv.tax_rate)),
            value: money(inv.tax_amount),
        });
    }
    if inv.discount_amount != 0.0 {
        totals.push(TotalLine {
            kind: TotalKind::Discount,
            label: format!("Discount ({}%)", format_number(inv.discount_rate)),
            value: money(-inv.discount_amount),
        });
    }
    if inv.shipping != 0.0 {
        totals.push(TotalLine {
            kind: TotalKind::Shipping,
            label: "Shipping".to_string(),
            value: money(inv.shipping),
        });
    }
    totals.push(TotalLine {
        kind: TotalKind::Total,
        label: "Total".to_string(),
        value: money(inv.total),
    });

    InvoiceLayout {
        theme,
        currency: inv.currency.clone(),
        header: HeaderBlock {
            logo: inv.logo_str().map(str::to_string),
            title: INVOICE_TITLE.to_string(),
            invoice_number: inv.invoice_number.clone(),
            date: inv.date.clone(),
            due_date: inv.due_date_str().map(str::to_string),
        },
        from: party("From", &inv.sender),
        to: party("To", &inv.recipient),
        rows,
        totals,
        notes: text_block("Notes", &inv.notes),
        terms: text_block("Terms & Conditions", &inv.terms),
    }
}

/// One line of the saved-invoice history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub invoice_number: String,
    pub recipient: String,
    pub date: String,
    pub due_date: Option<String>,
    pub status: InvoiceStatus,
    pub total: String,
}

impl HistoryEntry {
    pub fn summary_line(&self) -> String {
        let due = self
            .due_date
            .as_deref()
            .map(|d| format!(" (due {d})"))
            .unwrap_or_default();
        format!(
            "{}  {}  {}{}  {}  {}",
            self.invoice_number, self.recipient, self.date, due, self.status, self.total
        )
    }
}

pub fn history(invoices: &[Invoice]) -> Vec<HistoryEntry> {
    invoices
        .iter()
        .map(|inv| HistoryEntry {
            id: inv.id.clone(),
            invoice_number: inv.invoice_number.clone(),
            recipient: inv.recipient.name.clone(),
            date: inv.date.clone(),
            due_date: inv.due_date_str().map(str::to_string),
            status: inv.status,
            total: format_money(currency_symbol(&inv.currency), inv.totals().total),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvoiceItem;
    use rstest::rstest;

    fn sample() -> Invoice {
        let mut inv = Invoice::new_draft_on("USD", "2026-03-01".into(), "INV-000123".into());
        inv.sender.name = "Acme".into();
        inv.sender.email = "billing@acme.test".into();
        inv.sender.address = "1 Loop Rd\n\nCupertino".into();
        inv.recipient.name = "Globex".into();
        inv.items = vec![InvoiceItem::new("Design", 2.0, 50.0)];
        inv.set_tax_rate(10.0);
        inv.set_shipping(5.0);
        inv
    }

    fn labels(layout: &InvoiceLayout) -> Vec<&str> {
        layout.totals.iter().map(|t| t.label.as_str()).collect()
    }

    #[rstest]
    #[case(0.0, "0.00")]
    #[case(115.0, "115.00")]
    #[case(0.1 + 0.2, "0.30")]
    #[case(-0.001, "0.00")]
    #[case(1234.5, "1234.50")]
    #[case(f64::NAN, "0.00")]
    fn amounts_have_two_decimals(#[case] v: f64, #[case] expected: &str) {
        assert_eq!(format_amount(v), expected);
    }

    #[test]
    fn money_puts_sign_before_symbol() {
        assert_eq!(format_money("$", 10.0), "$10.00");
        assert_eq!(format_money("$", -10.0), "-$10.00");
        assert_eq!(format_money("", 3.0), "3.00");
    }

    #[test]
    fn conditional_total_lines() {
        let l = layout(&sample(), Theme::Minimal);
        assert_eq!(labels(&l), vec!["Subtotal", "Tax (10%)", "Shipping", "Total"]);
        assert_eq!(l.totals.last().unwrap().value, "$115.00");
        assert!(l.totals.last().unwrap().emphasized());

        let mut bare = sample();
        bare.set_tax_rate(0.0);
        bare.set_shipping(0.0);
        bare.set_discount_rate(10.0);
        let l = layout(&bare, Theme::Minimal);
        assert_eq!(labels(&l), vec!["Subtotal", "Discount (10%)", "Total"]);
        assert_eq!(l.totals[1].value, "-$10.00");
    }

    #[test]
    fn rows_follow_item_order() {
        let mut inv = sample();
        inv.push_item(InvoiceItem::new("Hosting", 1.5, 20.0));
        let l = layout(&inv, Theme::Modern);
        assert_eq!(l.rows.len(), 2);
        assert_eq!(l.rows[0].description, "Design");
        assert_eq!(l.rows[1].quantity, "1.5");
        assert_eq!(l.rows[1].rate, "$20.00");
        assert_eq!(l.rows[1].amount, "$30.00");
    }

    #[test]
    fn unknown_currency_has_no_symbol() {
        let mut inv = sample();
        inv.currency = "XYZ".into();
        let l = layout(&inv, Theme::Minimal);
        assert_eq!(l.rows[0].amount, "100.00");
    }

    #[test]
    fn stale_totals_are_not_rendered() {
        let mut inv = sample();
        inv.total = 999.0;
        let before = inv.clone();
        let l = layout(&inv, Theme::Minimal);
        assert_eq!(l.totals.last().unwrap().value, "$115.00");
        assert_eq!(inv, before);
    }

    #[test]
    fn party_lines_and_text_blocks() {
        let mut inv = sample();
        inv.notes = "Thanks\nSee you".into();
        let l = layout(&inv, Theme::Minimal);
        assert_eq!(l.from.lines, vec!["billing@acme.test", "1 Loop Rd", "Cupertino"]);
        assert!(l.to.lines.is_empty());
        assert_eq!(l.notes.unwrap().lines, vec!["Thanks", "See you"]);
        assert!(l.terms.is_none());
        assert_eq!(l.header.due_date, None);
    }

    #[test]
    fn theme_parsing_and_colors() {
        assert_eq!("Vibrant".parse::<Theme>().unwrap(), Theme::Vibrant);
        assert!("neon".parse::<Theme>().is_err());
        assert_eq!(Theme::Modern.colors().primary, "#2563eb");
        assert_eq!(Theme::default(), Theme::Minimal);
    }

    #[test]
    fn history_summary() {
        let mut inv = sample();
        inv.due_date = Some("2026-03-31".into());
        inv.status = InvoiceStatus::Sent;
        let entries = history(&[inv]);
        assert_eq!(
            entries[0].summary_line(),
            "INV-000123  Globex  2026-03-01 (due 2026-03-31)  sent  $115.00"
        );
    }
}
