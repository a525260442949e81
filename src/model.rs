use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{InvoiceError, InvoiceResult};

pub fn today_ymd() -> String {
    let d = OffsetDateTime::now_utc().date();
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

pub(crate) fn epoch_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// `INV-` followed by the last six digits of the epoch-millisecond clock.
pub fn invoice_number_from_millis(millis: u128) -> String {
    format!("INV-{:06}", millis % 1_000_000)
}

pub fn next_invoice_number() -> String {
    invoice_number_from_millis(epoch_millis())
}

/// Parses a numeric form field. Blank, malformed and non-finite input all read as 0.
pub fn parse_amount_input(raw: &str) -> f64 {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

pub(crate) fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl Contact {
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    #[serde(default)]
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    /// Always `quantity * rate`; kept in sync by the item setters.
    #[serde(default)]
    pub amount: f64,
}

impl InvoiceItem {
    pub fn new(description: impl Into<String>, quantity: f64, rate: f64) -> Self {
        let mut item = Self {
            description: description.into(),
            quantity: finite_or_zero(quantity).max(0.0),
            rate: finite_or_zero(rate).max(0.0),
            amount: 0.0,
        };
        item.refresh_amount();
        item
    }

    pub fn blank() -> Self {
        Self::new("", 1.0, 0.0)
    }

    pub(crate) fn refresh_amount(&mut self) {
        self.amount = self.quantity * self.rate;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(InvoiceStatus::Draft),
            "sent" => Some(InvoiceStatus::Sent),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            _ => None,
        }
    }

    /// Badge (background, foreground) colours for history listings.
    pub fn badge_colors(&self) -> (&'static str, &'static str) {
        match self {
            InvoiceStatus::Paid => ("#dcfce7", "#166534"),
            InvoiceStatus::Sent => ("#dbeafe", "#1e40af"),
            InvoiceStatus::Overdue => ("#fee2e2", "#991b1b"),
            InvoiceStatus::Draft => ("#f3f4f6", "#1f2937"),
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Empty until the store assigns one.
    #[serde(default)]
    pub id: String,
    pub invoice_number: String,
    pub date: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub sender: Contact,
    #[serde(default)]
    pub recipient: Contact,
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub discount_rate: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub shipping: f64,
    #[serde(default)]
    pub total: f64,
    pub currency: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub status: InvoiceStatus,
}

impl Invoice {
    /// A fresh form: dated today, one blank line item, a generated number.
    pub fn new_draft(currency: &str) -> Self {
        Self::new_draft_on(currency, today_ymd(), next_invoice_number())
    }

    pub fn new_draft_on(currency: &str, date: String, invoice_number: String) -> Self {
        let mut invoice = Self {
            id: String::new(),
            invoice_number,
            date,
            due_date: None,
            sender: Contact::default(),
            recipient: Contact::default(),
            items: vec![InvoiceItem::blank()],
            subtotal: 0.0,
            tax_rate: 0.0,
            tax_amount: 0.0,
            discount_rate: 0.0,
            discount_amount: 0.0,
            shipping: 0.0,
            total: 0.0,
            currency: currency.to_string(),
            notes: String::new(),
            terms: String::new(),
            logo: None,
            status: InvoiceStatus::Draft,
        };
        invoice.recalculate();
        invoice
    }

    pub fn due_date_str(&self) -> Option<&str> {
        self.due_date.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn logo_str(&self) -> Option<&str> {
        self.logo.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn add_item(&mut self) {
        self.items.push(InvoiceItem::blank());
        self.recalculate();
    }

    pub fn push_item(&mut self, item: InvoiceItem) {
        self.items.push(item);
        self.recalculate();
    }

    /// Removing the last remaining item is a no-op. Returns whether an item was removed.
    pub fn remove_item(&mut self, index: usize) -> bool {
        if self.items.len() <= 1 || index >= self.items.len() {
            return false;
        }
        self.items.remove(index);
        self.recalculate();
        true
    }

    pub fn set_item_description(&mut self, index: usize, description: impl Into<String>) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.description = description.into();
                true
            }
            None => false,
        }
    }

    pub fn set_item_quantity(&mut self, index: usize, quantity: f64) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.quantity = finite_or_zero(quantity).max(0.0);
        item.refresh_amount();
        self.recalculate();
        true
    }

    pub fn set_item_rate(&mut self, index: usize, rate: f64) -> bool {
        let Some(item) = self.items.get_mut(index) else {
            return false;
        };
        item.rate = finite_or_zero(rate).max(0.0);
        item.refresh_amount();
        self.recalculate();
        true
    }

    pub fn set_tax_rate(&mut self, rate: f64) {
        self.tax_rate = finite_or_zero(rate);
        self.recalculate();
    }

    pub fn set_discount_rate(&mut self, rate: f64) {
        self.discount_rate = finite_or_zero(rate);
        self.recalculate();
    }

    pub fn set_shipping(&mut self, shipping: f64) {
        self.shipping = finite_or_zero(shipping);
        self.recalculate();
    }

    /// Clone into a new unsaved draft dated `today` with a fresh number.
    pub fn duplicate_on(&self, today: String, invoice_number: String) -> Invoice {
        Invoice {
            id: String::new(),
            invoice_number,
            date: today,
            status: InvoiceStatus::Draft,
            ..self.clone()
        }
    }

    pub fn duplicate(&self) -> Invoice {
        self.duplicate_on(today_ymd(), next_invoice_number())
    }

    /// Required-field checks run before an explicit save.
    pub fn validate(&self) -> InvoiceResult<()> {
        if self.items.is_empty() {
            return Err(InvoiceError::Validation("invoice has no line items".to_string()));
        }
        if !self.sender.has_name() {
            return Err(InvoiceError::Validation("sender name is required".to_string()));
        }
        if !self.recipient.has_name() {
            return Err(InvoiceError::Validation("recipient name is required".to_string()));
        }
        if self.invoice_number.trim().is_empty() {
            return Err(InvoiceError::Validation("invoice number is required".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Invoice {
        Invoice::new_draft_on("USD", "2026-01-15".to_string(), "INV-000001".to_string())
    }

    #[test]
    fn invoice_number_uses_last_six_digits() {
        assert_eq!(invoice_number_from_millis(1_760_000_123_456), "INV-123456");
        assert_eq!(invoice_number_from_millis(1_700_000_000_042), "INV-000042");
    }

    #[test]
    fn new_draft_has_one_blank_item() {
        let inv = draft();
        assert!(inv.id.is_empty());
        assert_eq!(inv.items.len(), 1);
        assert_eq!(inv.items[0].quantity, 1.0);
        assert_eq!(inv.status, InvoiceStatus::Draft);
        assert_eq!(inv.total, 0.0);
    }

    #[test]
    fn removing_last_item_is_noop() {
        let mut inv = draft();
        assert!(!inv.remove_item(0));
        assert_eq!(inv.items.len(), 1);

        inv.add_item();
        assert!(inv.remove_item(1));
        assert_eq!(inv.items.len(), 1);
        assert!(!inv.remove_item(5));
    }

    #[test]
    fn quantity_and_rate_edits_refresh_amount_and_totals() {
        let mut inv = draft();
        inv.set_item_quantity(0, 3.0);
        inv.set_item_rate(0, 12.5);
        assert_eq!(inv.items[0].amount, 37.5);
        assert_eq!(inv.subtotal, 37.5);
        assert_eq!(inv.total, 37.5);

        inv.set_item_rate(0, f64::NAN);
        assert_eq!(inv.items[0].rate, 0.0);
        assert_eq!(inv.total, 0.0);
    }

    #[test]
    fn amount_is_raw_product() {
        let item = InvoiceItem::new("x", 3.0, 0.1);
        assert_eq!(item.amount, 3.0 * 0.1);
    }

    #[test]
    fn parse_amount_input_treats_garbage_as_zero() {
        assert_eq!(parse_amount_input("12.5"), 12.5);
        assert_eq!(parse_amount_input("  7 "), 7.0);
        assert_eq!(parse_amount_input(""), 0.0);
        assert_eq!(parse_amount_input("abc"), 0.0);
        assert_eq!(parse_amount_input("NaN"), 0.0);
        assert_eq!(parse_amount_input("inf"), 0.0);
    }

    #[test]
    fn duplicate_resets_identity_and_status() {
        let mut inv = draft();
        inv.id = "row-1".to_string();
        inv.status = InvoiceStatus::Paid;
        inv.sender.name = "Acme".to_string();
        inv.recipient.name = "Globex".to_string();
        inv.items = vec![InvoiceItem::new("Design", 2.0, 50.0)];
        inv.recalculate();

        let copy = inv.duplicate_on("2026-02-01".to_string(), "INV-999999".to_string());
        assert!(copy.id.is_empty());
        assert_eq!(copy.status, InvoiceStatus::Draft);
        assert_eq!(copy.invoice_number, "INV-999999");
        assert_eq!(copy.date, "2026-02-01");
        assert_eq!(copy.items, inv.items);
        assert_eq!(copy.sender, inv.sender);
        assert_eq!(copy.recipient, inv.recipient);
    }

    #[test]
    fn validate_requires_party_names() {
        let mut inv = draft();
        assert!(matches!(inv.validate(), Err(InvoiceError::Validation(_))));
        inv.sender.name = "Acme".to_string();
        inv.recipient.name = "Globex".to_string();
        assert!(inv.validate().is_ok());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&InvoiceStatus::Overdue).unwrap();
        assert_eq!(json, "\"overdue\"");
        assert_eq!(InvoiceStatus::parse("PAID"), Some(InvoiceStatus::Paid));
        assert_eq!(InvoiceStatus::parse("void"), None);
    }

    #[test]
    fn deserializes_browser_shaped_json() {
        let json = r#"{
            "id": "1712345678901",
            "invoiceNumber": "INV-678901",
            "date": "2026-03-01",
            "dueDate": "",
            "sender": {"name": "A", "email": "", "phone": "", "address": ""},
            "recipient": {"name": "B", "email": "", "phone": "", "address": "1 Main St\nSpringfield"},
            "items": [{"description": "Design", "quantity": 2, "rate": 50, "amount": 100}],
            "subtotal": 100, "taxRate": 10, "taxAmount": 10, "discountRate": 0,
            "discountAmount": 0, "shipping": 5, "total": 115,
            "currency": "USD", "notes": "", "terms": "", "logo": null, "status": "sent"
        }"#;
        let inv: Invoice = serde_json::from_str(json).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Sent);
        assert_eq!(inv.due_date_str(), None);
        assert_eq!(inv.total, 115.0);
        assert_eq!(inv.logo_str(), None);
    }
}
