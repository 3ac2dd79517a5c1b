use crate::config::CrawlConfig;
use crate::error::Result;
use crate::result::FetchResult;
use chrono::{DateTime, NaiveDate};
use reqwest::header::{CONTENT_TYPE, HeaderMap, LAST_MODIFIED};
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

/// Stateless page fetcher. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        Ok(Self::new(config.build_client()?))
    }

    /// GET `url`, collect every anchor `href` and the `Last-Modified` date.
    ///
    /// The status code is recorded but never fails the fetch: error pages are
    /// parsed like any other. Non-HTML responses are leaves and their body is
    /// never read. A missing or malformed `Last-Modified` header is not an
    /// error.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult> {
        debug!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!("{} answered {}", url, status);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut result = FetchResult::new(url.to_string());
        result.status_code = status.as_u16();
        result.last_modified = last_modified(response.headers());

        if is_html(content_type.as_deref()) {
            let body = response.text().await?;
            result.links = extract_links(&body);
        }
        result.content_type = content_type;

        debug!("{} yielded {} links", url, result.links.len());
        Ok(result)
    }

    /// GET `url` and read only the `Last-Modified` header. The body is dropped
    /// unread. Any failure yields `None`.
    pub async fn fetch_last_modified(&self, url: &Url) -> Option<NaiveDate> {
        match self.client.get(url.as_str()).send().await {
            Ok(response) => last_modified(response.headers()),
            Err(e) => {
                debug!("Last-modified fetch failed for {}: {}", url, e);
                None
            }
        }
    }
}

fn is_html(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("html"))
        .unwrap_or(true)
}

fn last_modified(headers: &HeaderMap) -> Option<NaiveDate> {
    headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date)
}

/// Parse an HTTP date such as `Tue, 15 Sep 2015 10:00:00 GMT` down to its
/// calendar day.
pub fn parse_http_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.date_naive())
}

/// Every `<a href>` value in document order, unresolved.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn fetcher() -> Fetcher {
        Fetcher::from_config(&CrawlConfig::new().with_timeout(5)).unwrap()
    }

    #[test]
    fn test_parse_http_date() {
        let date = parse_http_date("Tue, 15 Sep 2015 10:00:00 GMT");
        assert_eq!(date, NaiveDate::from_ymd_opt(2015, 9, 15));
    }

    #[test]
    fn test_parse_http_date_garbage() {
        assert_eq!(parse_http_date("yesterday-ish"), None);
        assert_eq!(parse_http_date(""), None);
    }

    #[test]
    fn test_extract_links_keeps_raw_values_and_duplicates() {
        let html = r##"<html><body>
            <a href="/a">A</a>
            <a href="/a">A again</a>
            <a href="#top">Top</a>
            <a>No href</a>
            <a href="http://other.com/b">Other</a>
        </body></html>"##;

        let links = extract_links(html);
        assert_eq!(links, vec!["/a", "/a", "#top", "http://other.com/b"]);
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Some("text/html; charset=utf-8")));
        assert!(is_html(Some("application/xhtml+xml")));
        assert!(is_html(None));
        assert!(!is_html(Some("application/pdf")));
    }

    #[tokio::test]
    async fn test_fetch_reads_links_and_last_modified() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .insert_header("last-modified", "Tue, 15 Sep 2015 10:00:00 GMT")
                    .set_body_bytes(b"<html><body><a href=\"/page1\">1</a></body></html>".as_slice()),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&mock_server.uri()).unwrap();
        let result = fetcher().fetch(&url).await.unwrap();

        assert_eq!(result.status_code, 200);
        assert_eq!(result.links, vec!["/page1"]);
        assert_eq!(result.last_modified, NaiveDate::from_ymd_opt(2015, 9, 15));
    }

    #[tokio::test]
    async fn test_fetch_non_html_is_leaf() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"<a href=\"/hidden\">not html</a>".as_slice()),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/doc.pdf", mock_server.uri())).unwrap();
        let result = fetcher().fetch(&url).await.unwrap();

        assert!(result.links.is_empty());
        assert_eq!(result.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_fetch_error_page_keeps_links_and_date() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("content-type", "text/html")
                    .insert_header("last-modified", "Tue, 15 Sep 2015 10:00:00 GMT")
                    .set_body_bytes(b"<p>Not found. <a href=\"/\">Home</a></p>".as_slice()),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();
        let result = fetcher().fetch(&url).await.unwrap();

        assert_eq!(result.status_code, 404);
        assert_eq!(result.links, vec!["/"]);
        assert_eq!(result.last_modified, NaiveDate::from_ymd_opt(2015, 9, 15));
    }

    #[tokio::test]
    async fn test_fetch_non_html_body_is_not_read() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Promise a large body, send a few bytes, then stall with the socket open.
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\n\
                      Content-Type: application/pdf\r\n\
                      Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT\r\n\
                      Content-Length: 1000000\r\n\r\n%PDF-1.4",
                )
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let url = Url::parse(&format!("http://{}/doc.pdf", addr)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), fetcher().fetch(&url))
            .await
            .expect("fetch should not wait for the body")
            .unwrap();

        assert!(result.links.is_empty());
        assert_eq!(result.last_modified, NaiveDate::from_ymd_opt(2015, 10, 21));
    }

    #[tokio::test]
    async fn test_fetch_last_modified() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/leaf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/leaf", mock_server.uri())).unwrap();
        let date = fetcher().fetch_last_modified(&url).await;

        assert_eq!(date, NaiveDate::from_ymd_opt(2015, 10, 21));
    }

    #[tokio::test]
    async fn test_fetch_last_modified_unreachable_is_none() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
        assert_eq!(fetcher().fetch_last_modified(&url).await, None);
    }
}
