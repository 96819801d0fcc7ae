//! Wikipedia lookups through the MediaWiki action API.
//!
//! API: https://www.mediawiki.org/wiki/API:Main_page

use super::dictionary::{Encyclopedia, LookupError};
use serde::Deserialize;
use std::time::Duration;
use triage_core::{AppError, AppResult};

const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
const SUMMARY_SENTENCES: &str = "3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    info: String,
}

#[derive(Debug, Default, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<Page>,
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    pageprops: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

/// What a summary query resolved to.
#[derive(Debug, Clone, PartialEq)]
enum PageLookup {
    Extract(String),
    Disambiguation { title: String },
    Missing,
}

/// Wikipedia-backed [`Encyclopedia`].
pub struct WikipediaClient {
    endpoint: String,
    client: reqwest::Client,
}

impl WikipediaClient {
    /// Client for English Wikipedia.
    pub fn new() -> AppResult<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Client for another MediaWiki `api.php` endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("triage/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Lookup(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<String, LookupError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(|e| LookupError::Other(format!("Failed to reach Wikipedia: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Other(format!(
                "Wikipedia returned HTTP {}",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| LookupError::Other(format!("Failed to read Wikipedia response: {}", e)))
    }

    async fn disambiguation_options(&self, title: &str) -> Result<Vec<String>, LookupError> {
        let body = self
            .get(&[
                ("prop", "links"),
                ("plnamespace", "0"),
                ("pllimit", "max"),
                ("titles", title),
            ])
            .await?;
        parse_links(&body)
    }
}

#[async_trait::async_trait]
impl Encyclopedia for WikipediaClient {
    async fn summary(&self, term: &str) -> Result<String, LookupError> {
        tracing::debug!("Fetching Wikipedia summary for {:?}", term);

        let body = self
            .get(&[
                ("prop", "extracts|pageprops"),
                ("ppprop", "disambiguation"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exsentences", SUMMARY_SENTENCES),
                ("redirects", "1"),
                ("titles", term),
            ])
            .await?;

        match parse_summary(&body)? {
            PageLookup::Extract(text) => Ok(text),
            PageLookup::Missing => Err(LookupError::NotFound),
            PageLookup::Disambiguation { title } => {
                let options = self.disambiguation_options(&title).await?;
                if options.is_empty() {
                    Err(LookupError::NotFound)
                } else {
                    Err(LookupError::Ambiguous(options))
                }
            }
        }
    }

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<String>, LookupError> {
        let limit = limit.max(1).to_string();
        let body = self
            .get(&[("list", "search"), ("srsearch", term), ("srlimit", limit.as_str())])
            .await?;
        parse_search(&body)
    }
}

fn parse_body(body: &str) -> Result<QueryBody, LookupError> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::Other(format!("Invalid Wikipedia response: {}", e)))?;

    if let Some(error) = response.error {
        return Err(LookupError::Other(format!("Wikipedia error: {}", error.info)));
    }

    Ok(response.query.unwrap_or_default())
}

fn parse_summary(body: &str) -> Result<PageLookup, LookupError> {
    let Some(page) = parse_body(body)?.pages.into_iter().next() else {
        return Ok(PageLookup::Missing);
    };

    if page.missing || page.invalid {
        return Ok(PageLookup::Missing);
    }

    let is_disambiguation = page
        .pageprops
        .as_ref()
        .is_some_and(|props| props.contains_key("disambiguation"));
    if is_disambiguation {
        return Ok(PageLookup::Disambiguation { title: page.title });
    }

    match page.extract.map(|text| text.trim().to_string()) {
        Some(text) if !text.is_empty() => Ok(PageLookup::Extract(text)),
        _ => Ok(PageLookup::Missing),
    }
}

fn parse_links(body: &str) -> Result<Vec<String>, LookupError> {
    Ok(parse_body(body)?
        .pages
        .into_iter()
        .flat_map(|page| page.links)
        .map(|link| link.title)
        .collect())
}

fn parse_search(body: &str) -> Result<Vec<String>, LookupError> {
    Ok(parse_body(body)?
        .search
        .into_iter()
        .map(|hit| hit.title)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extract() {
        let body = r#"{"batchcomplete":true,"query":{"pages":[
            {"pageid":1,"ns":0,"title":"Osmosis","extract":"Osmosis is the movement of solvent. "}
        ]}}"#;
        assert_eq!(
            parse_summary(body).unwrap(),
            PageLookup::Extract("Osmosis is the movement of solvent.".to_string())
        );
    }

    #[test]
    fn test_parse_missing_page() {
        let body = r#"{"query":{"pages":[{"ns":0,"title":"Qwzx","missing":true}]}}"#;
        assert_eq!(parse_summary(body).unwrap(), PageLookup::Missing);

        let invalid = r#"{"query":{"pages":[{"title":"","invalid":true}]}}"#;
        assert_eq!(parse_summary(invalid).unwrap(), PageLookup::Missing);

        assert_eq!(parse_summary("{}").unwrap(), PageLookup::Missing);
    }

    #[test]
    fn test_parse_disambiguation() {
        let body = r#"{"query":{"pages":[
            {"pageid":2,"title":"Mercury","extract":"Mercury may refer to:","pageprops":{"disambiguation":""}}
        ]}}"#;
        assert_eq!(
            parse_summary(body).unwrap(),
            PageLookup::Disambiguation {
                title: "Mercury".to_string()
            }
        );
    }

    #[test]
    fn test_parse_links_and_search() {
        let links = r#"{"query":{"pages":[{"title":"Mercury","links":[
            {"ns":0,"title":"Mercury (planet)"},{"ns":0,"title":"Mercury (element)"}
        ]}]}}"#;
        assert_eq!(
            parse_links(links).unwrap(),
            vec!["Mercury (planet)".to_string(), "Mercury (element)".to_string()]
        );

        let search = r#"{"query":{"searchinfo":{"totalhits":1},"search":[{"ns":0,"title":"Photosynthesis"}]}}"#;
        assert_eq!(parse_search(search).unwrap(), vec!["Photosynthesis".to_string()]);
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error":{"code":"badvalue","info":"Unrecognized value"}}"#;
        match parse_summary(body) {
            Err(LookupError::Other(message)) => assert!(message.contains("Unrecognized value")),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(parse_search("not json"), Err(LookupError::Other(_))));
    }
}
