//! Rendering of one notification per enriched publication.

use pubwatch_common::{EnrichmentResult, PublicationId, PublicationRecord};
use serde::{Deserialize, Serialize};

/// Fixed parts of every message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    pub recipient: String,
    /// How the author is named in the message body, e.g. "Joseph".
    pub author_display_name: String,
}

/// A rendered message, ready for delivery. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub publication_id: PublicationId,
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

/// Build the message for one publication. Absent fields render as empty.
///
/// Title, summary and link are escaped; the suggestion is already HTML
/// produced by the model and is embedded as is.
pub fn render_notification(
    record: &PublicationRecord,
    enrichment: &EnrichmentResult,
    settings: &RenderSettings,
) -> NotificationRecord {
    let title = escape_html(record.display_title());
    let summary = escape_html(enrichment.summary.as_deref().unwrap_or("")).replace('\n', "<br>");
    let link = escape_html(record.document_url.as_deref().unwrap_or(""));
    let suggestion = enrichment.suggestion_email.as_deref().unwrap_or("");
    let author = escape_html(&settings.author_display_name);

    let html_body = format!(
        "<html>\
         <body>\
         <p>Hello there,</p>\
         <p><strong>{author} published something new:</strong> {title}</p>\
         <p><strong>Here is a Summary (written for a five-year-old):</strong><br>{summary}</p>\
         <p><strong>Link:</strong> <a href='{link}'>{link}</a></p>\
         <p><strong>Here is an email draft to {author}, with some suggestions for improvement:</strong><br>{suggestion}</p>\
         </body>\
         </html>"
    );

    NotificationRecord {
        publication_id: record.id,
        recipient: settings.recipient.clone(),
        subject: format!("New Publication: {}!", record.display_title()),
        html_body,
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
