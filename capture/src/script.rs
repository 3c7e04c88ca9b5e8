//! Browser snippets pointing back at this service.

use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use serde_json::Value;
use uuid::Uuid;

const JAVASCRIPT: &str = "application/javascript";
const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";
const DEFAULT_SCHEME: &str = "http";
const DEFAULT_HOST: &str = "localhost";

/// `<scheme>://<host>` as seen by the browser that requested the script.
///
/// Only `http`/`https` and well-formed URI authorities are taken from the
/// request; anything else falls back to the defaults.
pub fn base_url(headers: &HeaderMap) -> String {
    let scheme = headers
        .get(FORWARDED_PROTO_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| DEFAULT_SCHEME.to_string());
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Authority::from_str(v.trim()).ok())
        .filter(|authority| !authority.as_str().contains('@'))
        .map_or_else(|| DEFAULT_HOST.to_string(), |a| a.as_str().to_string());
    format!("{scheme}://{host}")
}

/// Renders `url` as a double-quoted JS string literal.
fn js_string(url: String) -> String {
    Value::String(url).to_string()
}

pub fn page_view_script(base_url: &str) -> String {
    let track_url = js_string(format!("{base_url}/track"));
    format!(
        r#"
const payload = {{
  url: window.location.href
}}
fetch({track_url}, {{
  method: 'POST',
  headers: {{ 'Content-Type': 'application/json' }},
  body: JSON.stringify(payload)
}});
"#
    )
}

pub fn recording_script(base_url: &str, recording_id: Uuid) -> String {
    let save_url = js_string(format!("{base_url}/save-recording"));
    format!(
        r#"
import * as rrweb from 'https://esm.run/rrweb';

// skip the Admin page
if (document.title != 'Admin') {{
  const stopFn = rrweb.record({{
    emit(event) {{
      const recording = {{
        id: "{recording_id}",
        page_title: document.title,
        recording: event,
        timestamp: event?.timestamp
      }}
      fetch({save_url}, {{
        method: 'POST',
        headers: {{ 'Content-Type': 'application/json' }},
        body: JSON.stringify(recording)
      }});
    }},
  }});
}}
"#
    )
}

pub async fn page_view(headers: HeaderMap) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, JAVASCRIPT)],
        page_view_script(&base_url(&headers)),
    )
}

pub async fn recorder(headers: HeaderMap) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, JAVASCRIPT)],
        recording_script(&base_url(&headers), Uuid::new_v4()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[rstest]
    #[case(&[("host", "edge.example.com")], "http://edge.example.com")]
    #[case(&[("host", "localhost:3000"), ("x-forwarded-proto", "https")], "https://localhost:3000")]
    #[case(&[("host", "edge.example.com"), ("x-forwarded-proto", "https, http")], "https://edge.example.com")]
    #[case(&[], "http://localhost")]
    #[case(&[("host", "x\");alert(document.cookie);//")], "http://localhost")]
    #[case(&[("host", "user@evil.example")], "http://localhost")]
    #[case(&[("host", "edge.example.com"), ("x-forwarded-proto", "javascript")], "http://edge.example.com")]
    #[case(&[("host", "edge.example.com"), ("x-forwarded-proto", "HTTPS")], "https://edge.example.com")]
    fn base_url_follows_the_proxy(
        #[case] pairs: &[(&'static str, &'static str)],
        #[case] expected: &str,
    ) {
        assert_eq!(base_url(&headers(pairs)), expected);
    }

    #[test]
    fn page_view_script_posts_to_track() {
        let script = page_view_script("https://edge.example.com");
        assert!(script.contains(r#"fetch("https://edge.example.com/track""#));
        assert!(script.contains("url: window.location.href"));
    }

    #[test]
    fn urls_are_emitted_as_string_literals() {
        let script = page_view_script(r#"http://a"b\c"#);
        assert!(script.contains(r#"fetch("http://a\"b\\c/track", {"#));
    }

    #[tokio::test]
    async fn hostile_host_header_cannot_escape_the_literal() {
        use http_body_util::BodyExt;

        let response = page_view(headers(&[("host", "x\");alert(document.cookie);//")]))
            .await
            .into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let script = String::from_utf8(body.to_vec()).unwrap();

        assert!(!script.contains("alert("));
        assert!(script.contains(r#"fetch("http://localhost/track", {"#));
    }

    #[test]
    fn recording_script_embeds_its_id() {
        let id = Uuid::new_v4();
        let script = recording_script("http://localhost:3000", id);
        assert!(script.contains(&format!(r#"id: "{id}""#)));
        assert!(script.contains(r#"fetch("http://localhost:3000/save-recording""#));
        assert!(script.contains("document.title != 'Admin'"));
    }
}
