//! Feed fetcher.
//!
//! Retrieves a feed over HTTP and parses it as an RSS 2.0 document. Publish
//! dates are kept as raw strings; interpreting them is left to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::types::{FetchedFeedDocument, FetchedItem};
use crate::config::FetcherConfig;
use crate::{GatorError, Result};

/// Longest entity name (between `&` and `;`) that is decoded.
const MAX_ENTITY_LEN: usize = 10;

/// Failure of a single fetch attempt. Neither variant is retried here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The network call failed or the server answered with a non-success status.
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// The body is not a well-formed RSS document.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Anything that can turn a feed URL into a parsed document.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Retrieve and parse the feed at `url`.
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedFeedDocument, FetchError>;
}

/// HTTP feed fetcher.
pub struct FeedFetcher {
    client: Client,
    max_size: u64,
}

impl FeedFetcher {
    /// Create a fetcher from the `[fetcher]` configuration section.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_size: config.max_feed_size_bytes,
        })
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedFeedDocument, FetchError> {
        if url.trim().is_empty() {
            return Err(FetchError::Retrieval("feed URL is empty".to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Retrieval(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FetchError::Retrieval(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_size {
                return Err(FetchError::Retrieval(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Retrieval(format!("failed to read response: {}", e)))?;

        // Content-Length may be absent or wrong (chunked/compressed bodies).
        if bytes.len() as u64 > self.max_size {
            return Err(FetchError::Retrieval(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_size
            )));
        }

        parse_document(&bytes)
    }
}

/// Parse an RSS 2.0 body into a [`FetchedFeedDocument`].
///
/// Missing channel or item fields become empty strings.
pub fn parse_document(bytes: &[u8]) -> std::result::Result<FetchedFeedDocument, FetchError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| FetchError::Parse(format!("feed is not valid UTF-8: {}", e)))?;

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| FetchError::Parse(format!("malformed XML: {}", e)))?;

    let root = doc.root_element();
    if !root.has_tag_name("rss") {
        return Err(FetchError::Parse(format!(
            "expected <rss> root element, found <{}>",
            root.tag_name().name()
        )));
    }

    let channel = root
        .children()
        .find(|n| n.has_tag_name("channel"))
        .ok_or_else(|| FetchError::Parse("missing <channel> element".to_string()))?;

    let items = channel
        .children()
        .filter(|n| n.has_tag_name("item"))
        .map(|item| FetchedItem {
            title: child_text(item, "title"),
            link: child_text(item, "link").trim().to_string(),
            description: child_text(item, "description"),
            pub_date: child_text(item, "pubDate"),
        })
        .collect();

    Ok(FetchedFeedDocument {
        title: child_text(channel, "title"),
        description: child_text(channel, "description"),
        items,
    })
}

/// Text content of the first child element named `name`, entity-unescaped.
fn child_text(node: roxmltree::Node<'_, '_>, name: &str) -> String {
    node.children()
        .find(|n| n.has_tag_name(name))
        .map(|n| {
            let raw: String = n
                .descendants()
                .filter(|d| d.is_text())
                .filter_map(|d| d.text())
                .collect();
            unescape_entities(&raw)
        })
        .unwrap_or_default()
}

/// Decode HTML entities left over after XML decoding.
///
/// Feeds often double-escape (`&amp;#8217;`), so the XML layer leaves
/// `&#8217;` behind. One pass is applied; unknown entities are kept as-is.
fn unescape_entities(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];

        let decoded = tail
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_entity(&tail[..end]).map(|c| (end, c)));

        match decoded {
            Some((end, c)) => {
                result.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                result.push('&');
                rest = tail;
            }
        }
    }

    result.push_str(rest);
    result
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => parse_numeric_entity(entity).and_then(char::from_u32),
    }
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    let digits = entity.strip_prefix('#')?;
    if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        digits.parse().ok()
    }
}
