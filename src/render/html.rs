//! Screen preview markup. Inline styles only, so the output can be written
//! to a file and opened anywhere.

use super::{HistoryEntry, InvoiceLayout, PartyBlock, TextBlock, ITEM_COLUMNS};

pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Logo sources a page may load: embedded images and http(s) URLs.
pub(crate) fn logo_src(raw: &str) -> Option<&str> {
    let s = raw.trim();
    let lower = s.to_ascii_lowercase();
    let allowed = lower.starts_with("data:image/")
        || lower.starts_with("https://")
        || lower.starts_with("http://");
    allowed.then_some(s)
}

pub(crate) fn lines_html(lines: &[String]) -> String {
    lines.iter().map(|l| escape_html(l)).collect::<Vec<_>>().join("<br>")
}

fn push_party(html: &mut String, party: &PartyBlock, primary: &str, secondary: &str) {
    html.push_str("<td style=\"width:50%;vertical-align:top;padding:0 12px 0 0;\">");
    html.push_str(&format!(
        "<div style=\"font-size:11px;font-weight:700;letter-spacing:0.08em;text-transform:uppercase;color:{};\">{}</div>",
        secondary,
        escape_html(party.heading)
    ));
    html.push_str(&format!(
        "<div style=\"font-size:15px;font-weight:600;color:{};margin-top:4px;\">{}</div>",
        primary,
        escape_html(&party.name)
    ));
    if !party.lines.is_empty() {
        html.push_str(&format!(
            "<div style=\"font-size:13px;color:#374151;margin-top:2px;\">{}</div>",
            lines_html(&party.lines)
        ));
    }
    html.push_str("</td>");
}

fn push_text_block(html: &mut String, block: &TextBlock, secondary: &str) {
    html.push_str("<td style=\"width:50%;vertical-align:top;padding:0 12px 0 0;\">");
    html.push_str(&format!(
        "<div style=\"font-size:11px;font-weight:700;text-transform:uppercase;color:{};\">{}</div>",
        secondary,
        escape_html(block.heading)
    ));
    html.push_str(&format!(
        "<div style=\"font-size:13px;color:#374151;white-space:pre-line;margin-top:4px;\">{}</div>",
        escape_html(&block.lines.join("\n"))
    ));
    html.push_str("</td>");
}

/// Full preview document for one invoice.
pub fn render_preview(layout: &InvoiceLayout) -> String {
    let colors = layout.theme.colors();
    let mut html = String::new();
    html.push_str("<!doctype html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!(
        "<title>{} {}</title></head>",
        escape_html(&layout.header.title),
        escape_html(&layout.header.invoice_number)
    ));
    html.push_str("<body style=\"margin:0;padding:24px;background-color:#f6f7f9;font-family:Arial,Helvetica,sans-serif;\">");
    html.push_str("<div style=\"max-width:800px;margin:0 auto;background-color:#ffffff;border:1px solid #e6e8ec;border-radius:10px;padding:32px;\">");

    // Header
    html.push_str("<table role=\"presentation\" width=\"100%\" cellspacing=\"0\" cellpadding=\"0\"><tr><td style=\"vertical-align:top;\">");
    html.push_str(&format!(
        "<div style=\"font-size:30px;font-weight:700;color:{};\">{}</div>",
        colors.primary,
        escape_html(&layout.header.title)
    ));
    html.push_str(&format!(
        "<div style=\"font-size:14px;color:{};\">#{}</div>",
        colors.secondary,
        escape_html(&layout.header.invoice_number)
    ));
    html.push_str("</td><td align=\"right\" style=\"vertical-align:top;font-size:13px;color:#374151;\">");
    if let Some(src) = layout.header.logo.as_deref().and_then(logo_src) {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"Logo\" style=\"max-height:64px;max-width:200px;display:block;margin:0 0 8px auto;\">",
            escape_html(src)
        ));
    }
    html.push_str(&format!("<div>Date: {}</div>", escape_html(&layout.header.date)));
    if let Some(due) = layout.header.due_date.as_deref() {
        html.push_str(&format!("<div>Due Date: {}</div>", escape_html(due)));
    }
    html.push_str("</td></tr></table>");

    // From / To
    html.push_str("<table role=\"presentation\" width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" style=\"margin-top:28px;\"><tr>");
    push_party(&mut html, &layout.from, colors.primary, colors.secondary);
    push_party(&mut html, &layout.to, colors.primary, colors.secondary);
    html.push_str("</tr></table>");

    // Items
    html.push_str("<table width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" style=\"margin-top:28px;border-collapse:collapse;font-size:13px;\">");
    html.push_str(&format!("<tr style=\"background-color:{};\">", colors.accent));
    for (i, col) in ITEM_COLUMNS.iter().enumerate() {
        let align = if i == 0 { "left" } else { "right" };
        html.push_str(&format!(
            "<th align=\"{}\" style=\"padding:8px;color:{};\">{}</th>",
            align,
            colors.primary,
            escape_html(col)
        ));
    }
    html.push_str("</tr>");
    for row in &layout.rows {
        html.push_str("<tr style=\"border-bottom:1px solid #e5e7eb;\">");
        html.push_str(&format!("<td style=\"padding:8px;\">{}</td>", escape_html(&row.description)));
        for cell in [&row.quantity, &row.rate, &row.amount] {
            html.push_str(&format!("<td align=\"right\" style=\"padding:8px;\">{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");

    // Totals
    html.push_str("<table role=\"presentation\" cellspacing=\"0\" cellpadding=\"0\" style=\"margin:20px 0 0 auto;min-width:260px;font-size:13px;\">");
    for line in &layout.totals {
        if line.emphasized() {
            html.push_str(&format!(
                "<tr><td style=\"padding:8px 0 0 0;border-top:2px solid {c};font-size:16px;font-weight:700;color:{c};\">{}</td><td align=\"right\" style=\"padding:8px 0 0 16px;border-top:2px solid {c};font-size:16px;font-weight:700;color:{c};\">{}</td></tr>",
                escape_html(&line.label),
                escape_html(&line.value),
                c = colors.primary
            ));
        } else {
            html.push_str(&format!(
                "<tr><td style=\"padding:4px 0;color:#4b5563;\">{}</td><td align=\"right\" style=\"padding:4px 0 4px 16px;color:#111827;\">{}</td></tr>",
                escape_html(&line.label),
                escape_html(&line.value)
            ));
        }
    }
    html.push_str("</table>");

    // Notes / terms
    if layout.notes.is_some() || layout.terms.is_some() {
        html.push_str("<table role=\"presentation\" width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" style=\"margin-top:28px;\"><tr>");
        for block in [&layout.notes, &layout.terms].into_iter().flatten() {
            push_text_block(&mut html, block, colors.secondary);
        }
        html.push_str("</tr></table>");
    }

    html.push_str("</div></body></html>");
    html
}

/// Saved invoices as a table with coloured status badges.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    let mut html = String::new();
    html.push_str("<table width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" style=\"border-collapse:collapse;font-family:Arial,Helvetica,sans-serif;font-size:13px;\">");
    html.push_str("<tr><th align=\"left\">Invoice</th><th align=\"left\">Client</th><th align=\"left\">Date</th><th align=\"left\">Status</th><th align=\"right\">Total</th></tr>");
    for e in entries {
        let (bg, fg) = e.status.badge_colors();
        html.push_str("<tr style=\"border-bottom:1px solid #e5e7eb;\">");
        html.push_str(&format!("<td style=\"padding:6px 0;\">{}</td>", escape_html(&e.invoice_number)));
        html.push_str(&format!("<td>{}</td>", escape_html(&e.recipient)));
        html.push_str(&format!("<td>{}</td>", escape_html(&e.date)));
        html.push_str(&format!(
            "<td><span style=\"background-color:{};color:{};border-radius:9999px;padding:2px 8px;font-size:11px;\">{}</span></td>",
            bg,
            fg,
            e.status
        ));
        html.push_str(&format!("<td align=\"right\">{}</td>", escape_html(&e.total)));
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Invoice, InvoiceItem, InvoiceStatus};
    use crate::render::{history, layout, Theme};

    fn sample() -> Invoice {
        let mut inv = Invoice::new_draft_on("EUR", "2026-03-01".into(), "INV-000123".into());
        inv.sender.name = "Acme & Sons".into();
        inv.recipient.name = "<Globex>".into();
        inv.items = vec![InvoiceItem::new("Design", 2.0, 50.0)];
        inv.set_discount_rate(10.0);
        inv
    }

    #[test]
    fn escapes_user_text() {
        let html = render_preview(&layout(&sample(), Theme::Minimal));
        assert!(html.contains("Acme &amp; Sons"));
        assert!(html.contains("&lt;Globex&gt;"));
        assert!(!html.contains("<Globex>"));
    }

    #[test]
    fn shows_conditional_lines_and_theme() {
        let html = render_preview(&layout(&sample(), Theme::Elegant));
        assert!(html.contains("Discount (10%)"));
        assert!(html.contains("-€10.00"));
        assert!(!html.contains("Tax ("));
        assert!(!html.contains("Shipping"));
        assert!(html.contains("#7c3aed"));
    }

    #[test]
    fn notes_keep_line_breaks() {
        let mut inv = sample();
        inv.notes = "Line one\nLine two".into();
        let html = render_preview(&layout(&inv, Theme::Minimal));
        assert!(html.contains("white-space:pre-line"));
        assert!(html.contains("Line one\nLine two"));
        assert!(!html.contains("Terms &amp; Conditions"));
    }

    #[test]
    fn only_safe_logo_sources_render() {
        assert!(logo_src("data:image/png;base64,AAAA").is_some());
        assert!(logo_src("https://cdn.test/logo.png").is_some());
        assert!(logo_src("javascript:alert(1)").is_none());

        let mut inv = sample();
        inv.logo = Some("javascript:alert(1)".into());
        let html = render_preview(&layout(&inv, Theme::Minimal));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn history_uses_badge_colors() {
        let mut inv = sample();
        inv.status = InvoiceStatus::Paid;
        let html = render_history(&history(&[inv]));
        assert!(html.contains("#dcfce7"));
        assert!(html.contains(">paid<"));
    }
}
