//! Derived invoice totals.
//!
//! `subtotal -> tax -> discount -> shipping -> total`. Values are stored
//! unrounded; only display formatting rounds to two decimals.

use serde::Serialize;

use crate::model::{finite_or_zero, Invoice, InvoiceItem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub total: f64,
}

/// Rates are percentages. Nothing is clamped here; non-finite inputs count as 0.
pub fn calculate_totals(items: &[InvoiceItem], tax_rate: f64, discount_rate: f64, shipping: f64) -> Totals {
    let subtotal: f64 = items.iter().map(|i| finite_or_zero(i.amount)).sum();
    let tax_amount = subtotal * finite_or_zero(tax_rate) / 100.0;
    let discount_amount = subtotal * finite_or_zero(discount_rate) / 100.0;
    let total = subtotal + tax_amount - discount_amount + finite_or_zero(shipping);

    Totals {
        subtotal,
        tax_amount,
        discount_amount,
        total,
    }
}

impl Invoice {
    pub fn totals(&self) -> Totals {
        calculate_totals(&self.items, self.tax_rate, self.discount_rate, self.shipping)
    }

    /// Refreshes every item amount and the derived invoice totals.
    pub fn recalculate(&mut self) {
        for item in &mut self.items {
            item.refresh_amount();
        }
        let t = self.totals();
        self.subtotal = t.subtotal;
        self.tax_amount = t.tax_amount;
        self.discount_amount = t.discount_amount;
        self.total = t.total;
    }

    pub fn totals_are_current(&self) -> bool {
        let mut fresh = self.clone();
        fresh.recalculate();
        fresh == *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn design_item() -> InvoiceItem {
        InvoiceItem {
            description: "Design".to_string(),
            quantity: 2.0,
            rate: 50.0,
            amount: 100.0,
        }
    }

    #[test]
    fn concrete_scenario() {
        let t = calculate_totals(&[design_item()], 10.0, 0.0, 5.0);
        assert_eq!(t.subtotal, 100.0);
        assert_eq!(t.tax_amount, 10.0);
        assert_eq!(t.discount_amount, 0.0);
        assert_eq!(t.total, 115.0);
    }

    #[test]
    fn empty_items_total_is_shipping() {
        let t = calculate_totals(&[], 20.0, 5.0, 7.5);
        assert_eq!(t.subtotal, 0.0);
        assert_eq!(t.tax_amount, 0.0);
        assert_eq!(t.total, 7.5);
    }

    #[test]
    fn deterministic() {
        let items = vec![design_item(), InvoiceItem::new("Hosting", 3.0, 9.99)];
        assert_eq!(
            calculate_totals(&items, 8.25, 3.0, 4.0),
            calculate_totals(&items, 8.25, 3.0, 4.0)
        );
    }

    #[rstest]
    #[case(0.0, 0.0, 0.0)]
    #[case(10.0, 0.0, 0.0)]
    #[case(0.0, 15.0, 0.0)]
    #[case(0.0, 0.0, 12.0)]
    #[case(21.0, 10.0, 3.5)]
    #[case(-5.0, 120.0, -2.0)]
    fn total_identity_holds(#[case] tax: f64, #[case] discount: f64, #[case] shipping: f64) {
        let items = vec![design_item(), InvoiceItem::new("Support", 1.5, 80.0)];
        let t = calculate_totals(&items, tax, discount, shipping);
        assert_eq!(t.total, t.subtotal + t.tax_amount - t.discount_amount + shipping);
    }

    #[test]
    fn nan_inputs_count_as_zero() {
        let t = calculate_totals(&[design_item()], f64::NAN, f64::INFINITY, f64::NAN);
        assert_eq!(t.total, 100.0);
    }

    #[test]
    fn recalculate_repairs_stale_fields() {
        let mut inv = crate::model::Invoice::new_draft_on("USD", "2026-01-01".into(), "INV-1".into());
        inv.items = vec![InvoiceItem {
            description: "stale".into(),
            quantity: 4.0,
            rate: 2.5,
            amount: 0.0,
        }];
        inv.tax_rate = 10.0;
        assert!(!inv.totals_are_current());
        inv.recalculate();
        assert_eq!(inv.items[0].amount, 10.0);
        assert_eq!(inv.total, 11.0);
        assert!(inv.totals_are_current());
    }

    proptest! {
        #[test]
        fn subtotal_matches_sum_of_products(
            lines in prop::collection::vec((0.0f64..1_000.0, 0.0f64..10_000.0), 0..20)
        ) {
            let items: Vec<InvoiceItem> = lines
                .iter()
                .map(|(q, r)| InvoiceItem::new("line", *q, *r))
                .collect();
            let expected: f64 = lines.iter().map(|(q, r)| q * r).sum();
            let t = calculate_totals(&items, 0.0, 0.0, 0.0);
            let tolerance = 1e-9 * expected.abs().max(1.0);
            prop_assert!((t.subtotal - expected).abs() <= tolerance);
        }

        #[test]
        fn total_identity_for_any_rates(
            tax in 0.0f64..100.0,
            discount in 0.0f64..100.0,
            shipping in 0.0f64..500.0,
        ) {
            let t = calculate_totals(&[design_item()], tax, discount, shipping);
            prop_assert_eq!(t.total, t.subtotal + t.tax_amount - t.discount_amount + shipping);
        }
    }
}
