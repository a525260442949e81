//! Print surface: a standalone page that opens the print dialog as soon as
//! it loads.

use crate::error::InvoiceResult;
use crate::render::html::{escape_html, lines_html, logo_src};
use crate::render::{InvoiceLayout, ITEM_COLUMNS};

use super::{print_file_name, ExportKind, Exporter};

#[derive(Debug, Clone, Copy, Default)]
pub struct PrintExporter;

pub fn print_document(layout: &InvoiceLayout) -> String {
    let colors = layout.theme.colors();
    let h = &layout.header;
    let mut html = String::new();

    html.push_str("<!doctype html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!(
        "<title>Invoice {}</title>",
        escape_html(&h.invoice_number)
    ));
    html.push_str("<style>");
    html.push_str("body{font-family:Arial,Helvetica,sans-serif;margin:20px;color:#111827;}");
    html.push_str(".header{display:flex;justify-content:space-between;align-items:flex-start;margin-bottom:32px;}");
    html.push_str(&format!(".title{{font-size:28px;font-weight:bold;color:{};}}", colors.primary));
    html.push_str(&format!(".muted{{color:{};}}", colors.secondary));
    html.push_str(".parties{display:flex;gap:40px;margin-bottom:32px;}.parties>div{flex:1;}");
    html.push_str(".heading{font-size:12px;font-weight:bold;text-transform:uppercase;margin-bottom:6px;}");
    html.push_str("table{width:100%;border-collapse:collapse;margin-bottom:24px;}");
    html.push_str(&format!("th{{background:{};color:{};padding:8px;}}", colors.accent, colors.primary));
    html.push_str("td{padding:8px;border-bottom:1px solid #e5e7eb;}.num{text-align:right;}");
    html.push_str(".totals{margin-left:auto;width:280px;}.totals div{display:flex;justify-content:space-between;padding:4px 0;}");
    html.push_str(&format!(
        ".totals .grand{{border-top:2px solid {c};font-weight:bold;font-size:18px;color:{c};}}",
        c = colors.primary
    ));
    html.push_str(".text{white-space:pre-line;}");
    html.push_str("@media print{body{margin:0;}}");
    html.push_str("</style></head><body>");

    html.push_str("<div class=\"header\"><div>");
    html.push_str(&format!("<div class=\"title\">{}</div>", escape_html(&h.title)));
    html.push_str(&format!("<div class=\"muted\">#{}</div>", escape_html(&h.invoice_number)));
    html.push_str("</div><div class=\"num\">");
    if let Some(src) = h.logo.as_deref().and_then(logo_src) {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"Logo\" style=\"max-height:60px;\"><br>",
            escape_html(src)
        ));
    }
    html.push_str(&format!("Date: {}", escape_html(&h.date)));
    if let Some(due) = h.due_date.as_deref() {
        html.push_str(&format!("<br>Due Date: {}", escape_html(due)));
    }
    html.push_str("</div></div>");

    html.push_str("<div class=\"parties\">");
    for party in [&layout.from, &layout.to] {
        html.push_str(&format!(
            "<div><div class=\"heading muted\">{}</div><strong>{}</strong><br>{}</div>",
            escape_html(party.heading),
            escape_html(&party.name),
            lines_html(&party.lines)
        ));
    }
    html.push_str("</div>");

    html.push_str("<table><thead><tr>");
    for (i, col) in ITEM_COLUMNS.iter().enumerate() {
        let class = if i == 0 { "" } else { " class=\"num\"" };
        html.push_str(&format!("<th{}>{}</th>", class, escape_html(col)));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &layout.rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
            escape_html(&row.description),
            escape_html(&row.quantity),
            escape_html(&row.rate),
            escape_html(&row.amount)
        ));
    }
    html.push_str("</tbody></table>");

    html.push_str("<div class=\"totals\">");
    for line in &layout.totals {
        let class = if line.emphasized() { " class=\"grand\"" } else { "" };
        html.push_str(&format!(
            "<div{}><span>{}</span><span>{}</span></div>",
            class,
            escape_html(&line.label),
            escape_html(&line.value)
        ));
    }
    html.push_str("</div>");

    if layout.notes.is_some() || layout.terms.is_some() {
        html.push_str("<div class=\"parties\" style=\"margin-top:32px;\">");
        for block in [&layout.notes, &layout.terms].into_iter().flatten() {
            html.push_str(&format!(
                "<div><div class=\"heading muted\">{}</div><div class=\"text\">{}</div></div>",
                escape_html(&block.heading.to_uppercase()),
                escape_html(&block.lines.join("\n"))
            ));
        }
        html.push_str("</div>");
    }

    html.push_str("<script>window.onload=function(){window.print();};</script>");
    html.push_str("</body></html>");
    html
}

impl Exporter for PrintExporter {
    fn kind(&self) -> ExportKind {
        ExportKind::Print
    }

    fn file_name(&self, invoice_number: &str) -> String {
        print_file_name(invoice_number)
    }

    fn render(&self, layout: &InvoiceLayout) -> InvoiceResult<Vec<u8>> {
        Ok(print_document(layout).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export_to_dir;
    use crate::model::{Invoice, InvoiceItem};
    use crate::render::{layout, Theme};

    fn sample() -> Invoice {
        let mut inv = Invoice::new_draft_on("GBP", "2026-03-01".into(), "INV-000777".into());
        inv.sender.name = "Acme".into();
        inv.recipient.name = "Globex".into();
        inv.items = vec![
            InvoiceItem::new("Design", 2.0, 50.0),
            InvoiceItem::new("Review", 1.0, 25.0),
        ];
        inv.set_shipping(5.0);
        inv.terms = "Net 30\nLate fee 2%".into();
        inv
    }

    #[test]
    fn opens_print_dialog_and_keeps_content_model() {
        let html = print_document(&layout(&sample(), Theme::Vibrant));
        assert!(html.contains("window.print()"));
        assert!(html.contains("Description</th><th class=\"num\">Qty</th>"));
        assert!(html.contains("£130.00"));
        assert!(html.contains("Shipping"));
        assert!(!html.contains("Tax ("));
        assert!(html.contains("TERMS &amp; CONDITIONS"));
        assert!(html.contains("Net 30\nLate fee 2%"));
        assert!(!html.contains("NOTES"));
        assert!(html.contains("#dc2626"));
    }

    #[test]
    fn item_rows_in_order() {
        let html = print_document(&layout(&sample(), Theme::Minimal));
        let design = html.find("Design").unwrap();
        let review = html.find("Review").unwrap();
        assert!(design < review);
    }

    #[tokio::test]
    async fn exports_html_file() {
        let dir = std::env::temp_dir().join(format!("invoice-studio-{}", uuid::Uuid::new_v4()));
        let artifact = export_to_dir(&PrintExporter, &sample(), Theme::Modern, &dir)
            .await
            .unwrap();
        assert_eq!(artifact.kind, ExportKind::Print);
        assert_eq!(artifact.path, dir.join("invoice-INV-000777-print.html"));
        let written = std::fs::read_to_string(&artifact.path).unwrap();
        assert_eq!(written.len(), artifact.bytes);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
