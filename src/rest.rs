use anyhow::{anyhow, Context, Result};
use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, RANGE},
    Client,
};
use serde_json::{Map, Value};
use url::Url;

use crate::config::Config;

/// Tally key for rows whose column is null or absent.
pub const NULL_NAME: &str = "<null>";

/// Where the reporters get their numbers from.
#[allow(async_fn_in_trait)]
pub trait PlanSource {
    /// Number of rows whose provider column equals `value` exactly.
    async fn count_exact(&self, value: &str) -> Result<u64>;

    /// The provider column of at most `limit` rows, one entry per row.
    async fn fetch_column(&self, limit: usize) -> Result<Vec<String>>;
}

pub struct RestClient {
    client: Client,
    table_url: Url,
    column: String,
}

impl RestClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();

        let mut key = HeaderValue::from_str(&config.api_key)
            .context("API key contains characters not allowed in a header")?;
        key.set_sensitive(true);
        headers.insert("apikey", key);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .context("API key contains characters not allowed in a header")?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            table_url: config.table_url()?,
            column: config.column.clone(),
        })
    }

    fn count_url(&self, value: &str) -> Url {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.column, &format!("eq.{}", value))
            .append_pair("select", "id");
        url
    }

    fn column_url(&self, limit: usize) -> Url {
        let mut url = self.table_url.clone();
        url.query_pairs_mut()
            .append_pair("select", &self.column)
            .append_pair("limit", &limit.to_string());
        url
    }
}

impl PlanSource for RestClient {
    async fn count_exact(&self, value: &str) -> Result<u64> {
        let url = self.count_url(value);
        debug!("GET {} (count=exact)", url);

        let response = self
            .client
            .get(url.clone())
            .header(RANGE, "0-0")
            .header("Prefer", "count=exact")
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?
            .error_for_status()
            .with_context(|| format!("Count request for {} was rejected", value))?;

        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .map(|v| v.to_str())
            .transpose()
            .context("Content-Range header is not valid text")?;

        parse_content_range(content_range)
            .with_context(|| format!("Failed to read count for {}", value))
    }

    async fn fetch_column(&self, limit: usize) -> Result<Vec<String>> {
        let url = self.column_url(limit);
        debug!("GET {}", url);

        let rows: Vec<Map<String, Value>> = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?
            .error_for_status()
            .context("Row request was rejected")?
            .json()
            .await
            .context("Failed to parse rows as a JSON array of objects")?;

        debug!("fetched {} rows", rows.len());

        Ok(rows
            .iter()
            .map(|row| column_text(row.get(&self.column)))
            .collect())
    }
}

fn column_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NULL_NAME.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Total row count from a `Content-Range` value such as `0-0/1234` or `*/0`.
/// A missing header counts as zero rows.
pub fn parse_content_range(header: Option<&str>) -> Result<u64> {
    let Some(header) = header else {
        return Ok(0);
    };

    let (_, total) = header
        .split_once('/')
        .ok_or_else(|| anyhow!("Malformed Content-Range: {}", header))?;

    total
        .trim()
        .parse()
        .with_context(|| format!("Content-Range has no exact total: {}", header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_COLUMN, DEFAULT_TABLE};
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
    };

    fn client_for(base_url: &str) -> RestClient {
        let config = Config::resolve(
            Some("test-key".to_string()),
            Some(base_url.to_string()),
            DEFAULT_TABLE.to_string(),
            DEFAULT_COLUMN.to_string(),
        )
        .unwrap();
        RestClient::new(&config).unwrap()
    }

    fn client() -> RestClient {
        client_for("https://example.supabase.co")
    }

    fn http_response(status: &str, headers: &[&str], body: &str) -> String {
        let mut response = format!("HTTP/1.1 {}\r\n", status);
        for header in headers {
            response.push_str(header);
            response.push_str("\r\n");
        }
        response.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));
        response
    }

    /// Answers a single request on a local port with `response`.
    /// The handle yields the raw request head.
    fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8(request).unwrap()
        });

        (base_url, handle)
    }

    #[tokio::test]
    async fn count_request_sends_auth_and_count_headers() {
        let (base_url, server) = serve_once(http_response(
            "206 Partial Content",
            &["Content-Type: application/json", "Content-Range: 0-0/4321"],
            r#"[{"id":1}]"#,
        ));

        let count = client_for(&base_url)
            .count_exact("Verizon Fios")
            .await
            .unwrap();
        assert_eq!(count, 4321);

        let request = server.join().unwrap();
        assert!(request.starts_with(
            "GET /rest/v1/broadband_plans?provider_name=eq.Verizon+Fios&select=id HTTP/1.1\r\n"
        ));

        let head = request.to_lowercase();
        assert!(head.contains("\r\napikey: test-key\r\n"));
        assert!(head.contains("\r\nauthorization: bearer test-key\r\n"));
        assert!(head.contains("\r\nrange: 0-0\r\n"));
        assert!(head.contains("\r\nprefer: count=exact\r\n"));
    }

    #[tokio::test]
    async fn count_without_content_range_is_zero() {
        let (base_url, server) = serve_once(http_response("200 OK", &[], "[]"));

        assert_eq!(client_for(&base_url).count_exact("Cox").await.unwrap(), 0);
        server.join().unwrap();
    }

    #[tokio::test]
    async fn server_error_fails_the_count() {
        let (base_url, server) = serve_once(http_response(
            "500 Internal Server Error",
            &["Content-Range: 0-0/10"],
            "{}",
        ));

        let err = client_for(&base_url).count_exact("Cox").await.unwrap_err();
        assert!(format!("{:#}", err).contains("Count request for Cox was rejected"));
        server.join().unwrap();
    }

    #[tokio::test]
    async fn fetch_decodes_rows_and_nulls() {
        let (base_url, server) = serve_once(http_response(
            "200 OK",
            &["Content-Type: application/json"],
            r#"[{"provider_name":"Cox"},{"provider_name":null},{}]"#,
        ));

        let rows = client_for(&base_url).fetch_column(3).await.unwrap();
        assert_eq!(rows, ["Cox", NULL_NAME, NULL_NAME]);

        let request = server.join().unwrap();
        assert!(request
            .starts_with("GET /rest/v1/broadband_plans?select=provider_name&limit=3 HTTP/1.1\r\n"));
        assert!(request.to_lowercase().contains("\r\napikey: test-key\r\n"));
        assert!(!request.to_lowercase().contains("\r\nrange:"));
    }

    #[tokio::test]
    async fn fetch_rejects_non_array_body() {
        let (base_url, server) = serve_once(http_response(
            "200 OK",
            &["Content-Type: application/json"],
            r#"{"message":"oops"}"#,
        ));

        assert!(client_for(&base_url).fetch_column(10).await.is_err());
        server.join().unwrap();
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_content_range(Some("0-0/1234")).unwrap(), 1234);
        assert_eq!(parse_content_range(Some("*/0")).unwrap(), 0);
        assert_eq!(parse_content_range(None).unwrap(), 0);
    }

    #[test]
    fn content_range_without_exact_total_fails() {
        assert!(parse_content_range(Some("0-0/*")).is_err());
        assert!(parse_content_range(Some("garbage")).is_err());
    }

    #[test]
    fn count_url_filters_and_encodes() {
        let url = client().count_url("AT&T");
        assert_eq!(
            url.as_str(),
            "https://example.supabase.co/rest/v1/broadband_plans?provider_name=eq.AT%26T&select=id"
        );
    }

    #[test]
    fn column_url_selects_and_limits() {
        let url = client().column_url(100000);
        assert_eq!(
            url.as_str(),
            "https://example.supabase.co/rest/v1/broadband_plans?select=provider_name&limit=100000"
        );
    }

    #[test]
    fn null_and_non_string_columns() {
        assert_eq!(column_text(None), NULL_NAME);
        assert_eq!(column_text(Some(&Value::Null)), NULL_NAME);
        assert_eq!(column_text(Some(&Value::from("Cox"))), "Cox");
        assert_eq!(column_text(Some(&Value::from(7))), "7");
    }
}
