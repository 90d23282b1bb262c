//! Organization site crawling.
//!
//! - [`fetcher`] fetches raw HTML behind the [`PageFetcher`] trait
//! - [`text`] reduces HTML to visible text and same-page links
//! - [`engine`] runs the bounded seed + frontier crawl

pub mod engine;
pub mod fetcher;
pub mod text;

pub use engine::{CrawlSession, CrawledPage, SiteCrawler};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use text::{PageContent, parse_page};
