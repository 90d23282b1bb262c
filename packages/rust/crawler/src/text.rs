//! Visible-text and link extraction from fetched HTML.

use scraper::{Html, Selector};
use url::Url;

/// Elements whose subtrees never contribute visible text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "noscript"];

/// Text and outgoing links of one parsed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub text: String,
    pub links: Vec<String>,
}

/// Parse `html` once and pull out both visible text and resolved links.
pub fn parse_page(html: &str, base_url: &Url, text_cap: usize) -> PageContent {
    let doc = Html::parse_document(html);
    PageContent {
        text: visible_text(&doc, text_cap),
        links: extract_links(&doc, base_url),
    }
}

/// Newline-joined visible text, boilerplate subtrees removed, truncated to `cap` chars.
pub fn visible_text(doc: &Html, cap: usize) -> String {
    let mut lines: Vec<&str> = Vec::new();

    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed);
        }
    }

    truncate_chars(&lines.join("\n"), cap)
}

/// Extract all links from a document, resolved against the base URL.
pub fn extract_links(doc: &Html, base_url: &Url) -> Vec<String> {
    let link_sel = Selector::parse("a[href]").expect("valid selector");
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        if let Some(href) = el.value().attr("href") {
            // Skip anchors, javascript:, mailto:, tel:
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                continue;
            }

            if let Ok(mut resolved) = base_url.join(href) {
                resolved.set_fragment(None);
                links.push(resolved.to_string());
            }
        }
    }

    links
}

fn truncate_chars(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html>
        <head><title>Staff</title><style>body { color: red }</style></head>
        <body>
            <header>Site Header</header>
            <nav><a href="/menu">Menu</a></nav>
            <main>
                <h1>Computer Science Department</h1>
                <p>Jane Doe, Director &mdash; jane.doe@isd.example.org</p>
                <script>var tracking = 1;</script>
                <a href="/staff/jane">Jane</a>
                <a href="#top">Top</a>
                <a href="mailto:jane.doe@isd.example.org">Mail</a>
            </main>
            <footer>Copyright</footer>
        </body>
    </html>"##;

    #[test]
    fn strips_boilerplate_tags() {
        let base = Url::parse("https://isd.example.org/staff").unwrap();
        let page = parse_page(PAGE, &base, 10_000);

        assert!(page.text.contains("Computer Science Department"));
        assert!(page.text.contains("jane.doe@isd.example.org"));
        assert!(!page.text.contains("Site Header"));
        assert!(!page.text.contains("Menu"));
        assert!(!page.text.contains("tracking"));
        assert!(!page.text.contains("color: red"));
        assert!(!page.text.contains("Copyright"));
    }

    #[test]
    fn links_include_nav_but_skip_anchors_and_mailto() {
        let base = Url::parse("https://isd.example.org/staff").unwrap();
        let page = parse_page(PAGE, &base, 10_000);

        assert!(page.links.contains(&"https://isd.example.org/menu".to_string()));
        assert!(page.links.contains(&"https://isd.example.org/staff/jane".to_string()));
        assert!(!page.links.iter().any(|l| l.contains('#') || l.starts_with("mailto:")));
    }

    #[test]
    fn text_is_truncated_on_char_boundary() {
        let html = "<html><body><p>héllo wörld</p></body></html>";
        let base = Url::parse("https://example.org/").unwrap();
        let page = parse_page(html, &base, 4);
        assert_eq!(page.text, "héll");
    }
}
