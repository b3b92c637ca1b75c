//! Fetch command: answer one request through the proxy

use colored::Colorize;
use reqwest::Method;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::{OutputFormat, ProxyContext};
use crate::error::{FetchError, Result};
use crate::http::{HttpResponse, ProxyRequest};
use crate::output::formatters::{EncodedBody, encode_body, format_size};
use crate::output::print_json;
use crate::output::table::{FieldRow, format_table};
use crate::proxy::classify;
use crate::proxy::freshness::CACHE_TIME_HEADER;

#[derive(Debug, Serialize)]
struct FetchOutput<'a> {
    method: String,
    url: &'a str,
    class: &'static str,
    status: u16,
    status_text: &'a str,
    headers: &'a [(String, String)],
    body: EncodedBody,
}

/// Run the fetch command
pub async fn run(opts: &GlobalOptions, url: &str, method: &str, headers: &[String]) -> Result<()> {
    let request = build_request(url, method, headers)?;
    let ctx = ProxyContext::new(opts)?;
    let class = classify(&request.url, &ctx.config().api_hosts);

    let response = ctx.proxy.handle_fetch(&request).await?;

    match ctx.format {
        OutputFormat::Json => print_json(&FetchOutput {
            method: request.method.to_string(),
            url: &request.url,
            class: class.as_str(),
            status: response.status,
            status_text: &response.status_text,
            headers: &response.headers,
            body: encode_body(&response.body),
        })?,
        OutputFormat::Table => {
            let mut rows = vec![
                FieldRow::new("URL", &request.url),
                FieldRow::new("Class", class),
                FieldRow::new("Status", format!("{} {}", response.status, response.status_text)),
                FieldRow::new("Size", format_size(response.body.len())),
            ];
            if let Some(content_type) = response.header("content-type") {
                rows.push(FieldRow::new("Content-Type", content_type));
            }
            if let Some(stamp) = response.header(CACHE_TIME_HEADER) {
                rows.push(FieldRow::new("Cached at", stamp));
            }
            println!("{}", format_table(&rows));
        }
        OutputFormat::Pretty => print_pretty(&response),
    }

    Ok(())
}

fn print_pretty(response: &HttpResponse) {
    let status_line = format!("{} {}", response.status, response.status_text);
    let status_line = if response.is_success() {
        status_line.green().bold()
    } else {
        status_line.red().bold()
    };
    println!("{}", status_line);
    for (name, value) in &response.headers {
        println!("{}", format!("{}: {}", name, value).dimmed());
    }
    println!();
    println!("{}", response.text());
}

/// Build a request from command-line pieces
fn build_request(url: &str, method: &str, headers: &[String]) -> Result<ProxyRequest> {
    url::Url::parse(url)
        .map_err(|e| FetchError::InvalidRequest(format!("'{}' is not an absolute URL: {}", url, e)))?;

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| FetchError::InvalidRequest(format!("Invalid method '{}'", method)))?;

    let mut request = ProxyRequest::get(url);
    request.method = method;
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        request = request.header(name, value);
    }
    Ok(request)
}

fn parse_header(raw: &str) -> std::result::Result<(&str, &str), FetchError> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value.trim())),
        _ => Err(FetchError::InvalidRequest(format!(
            "Header '{}' must look like 'Name: value'",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_defaults_to_get() {
        let request = build_request("https://example.com/a", "get", &[]).unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "https://example.com/a");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_build_request_with_method_and_headers() {
        let headers = vec!["Accept: text/html".to_string(), "X-Empty:".to_string()];
        let request = build_request("https://example.com/a", "post", &headers).unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.headers,
            vec![
                ("Accept".to_string(), "text/html".to_string()),
                ("X-Empty".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_build_request_rejects_relative_url() {
        let result = build_request("/styles.css", "GET", &[]);
        assert!(matches!(
            result,
            Err(crate::error::Error::Fetch(FetchError::InvalidRequest(_)))
        ));
    }

    #[test]
    fn test_parse_header_rejects_missing_colon() {
        assert!(parse_header("Accept text/html").is_err());
        assert!(parse_header(": value").is_err());
    }
}
