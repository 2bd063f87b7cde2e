//! HTML fragments for chat turns and the document catalog.

use shared::domain::{CatalogStats, Document, Message, Role, Source};

use crate::{
    catalog::CatalogSnapshot,
    format::{escape_html, format_content, format_file_size},
};

macro_rules! empty_catalog_text {
    () => {
        "No documents uploaded yet"
    };
}

/// Shown in place of the document list when the catalog is empty.
pub const EMPTY_CATALOG_TEXT: &str = empty_catalog_text!();
pub const EMPTY_CATALOG_HTML: &str = concat!(
    "<div class=\"empty-state\"><p>",
    empty_catalog_text!(),
    "</p></div>"
);

/// Date portion of a backend timestamp such as `2024-03-01 10:22:00`.
pub fn upload_date_display(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.split(' ').next().unwrap_or(trimmed)
}

pub fn document_count_label(count: usize) -> String {
    if count == 1 {
        "1 Document".to_string()
    } else {
        format!("{count} Documents")
    }
}

pub fn render_message(message: &Message) -> String {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    let sources = if message.role == Role::Assistant {
        render_sources(&message.sources)
    } else {
        String::new()
    };
    format!(
        "<div class=\"message {role}\"><div class=\"message-content\">{}</div>{sources}</div>",
        format_content(&message.text)
    )
}

pub fn render_sources(sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let items: String = sources.iter().map(render_source).collect();
    format!("<div class=\"sources\"><div class=\"sources-title\">Sources</div>{items}</div>")
}

pub fn render_source(source: &Source) -> String {
    let mut html = format!(
        "<div class=\"source-item\"><span class=\"source-name\">{}</span>",
        escape_html(&source.document_name)
    );
    if let Some(page) = &source.page {
        html.push_str(&format!(
            "<span class=\"source-page\">Page {}</span>",
            escape_html(&page.to_string())
        ));
    }
    if let Some(date) = source.upload_date.as_deref() {
        html.push_str(&format!(
            "<span class=\"source-date\">Uploaded: {}</span>",
            escape_html(upload_date_display(date))
        ));
    }
    if let Some(links) = source.cross_reference_links.as_deref() {
        html.push_str(&format!(
            "<div class=\"source-links\">Links: {}</div>",
            escape_html(links)
        ));
    }
    html.push_str("</div>");
    html
}

pub fn render_document(document: &Document) -> String {
    let chunks = document
        .chunk_count
        .map(|n| format!(" &middot; {n} chunks"))
        .unwrap_or_default();
    format!(
        "<div class=\"document-item\" data-id=\"{}\"><i class=\"icon {}\"></i><div class=\"document-info\"><div class=\"document-name\">{}</div><div class=\"document-meta\">{}{chunks}</div></div></div>",
        escape_html(&document.id),
        document.kind.icon(),
        escape_html(&document.name),
        format_file_size(document.size_bytes),
    )
}

pub fn render_document_list(documents: &[Document]) -> String {
    if documents.is_empty() {
        return EMPTY_CATALOG_HTML.to_string();
    }
    documents.iter().map(render_document).collect()
}

pub fn render_stats(stats: &CatalogStats) -> String {
    format!(
        "<span class=\"stat-chunks\">{}</span><span class=\"stat-embeddings\">{}</span>",
        stats.chunk_total, stats.embedding_total
    )
}

pub fn render_catalog(snapshot: &CatalogSnapshot) -> String {
    format!(
        "<div class=\"document-count\">{}</div><div class=\"document-list\">{}</div><div class=\"stats\">{}</div>",
        document_count_label(snapshot.documents.len()),
        render_document_list(&snapshot.documents),
        render_stats(&snapshot.stats),
    )
}
