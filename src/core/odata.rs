//! Nimbus OData HTTP client
//!
//! Implements [`RecordSource`] over blocking reqwest. The API returns XML by
//! default, so every request asks for JSON explicitly. Responses come back
//! either as a bare array or as `{ "value": [...] }`; both are accepted.

use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::debug;

use crate::core::session::Session;
use crate::core::source::{FetchError, Page, PageQuery, RecordSource};

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// OData client bound to one session
pub struct ODataClient {
    client: Client,
    odata_base: String,
    headers: HeaderMap,
}

impl ODataClient {
    /// Create a client for the session
    pub fn new(session: &Session, timeout_secs: Option<u64>) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let client = ClientBuilder::new()
            .timeout(timeout)
            .cookie_store(true)
            .user_agent(format!("NimbusReports/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::InvalidRequest {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            odata_base: odata_base_url(&session.base_url),
            headers: build_headers(session)?,
        })
    }

    /// The normalised OData root this client queries
    pub fn odata_base(&self) -> &str {
        &self.odata_base
    }
}

impl RecordSource for ODataClient {
    fn fetch_page(&self, query: &PageQuery) -> Result<Page, FetchError> {
        let url = build_url(&self.odata_base, query);
        debug!(%url, "OData query");

        let transport = |e: reqwest::Error| FetchError::Transport {
            entity_set: query.entity_set.clone(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Status {
                entity_set: query.entity_set.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().map_err(transport)?;
        parse_body(&query.entity_set, &body)
    }
}

/// Normalise a tenant URL to its OData root.
///
/// `/CoreApi/OData` returns adhoc fields with `$select`; the legacy
/// `/ODataApi` does not, so it is rewritten.
pub fn odata_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/CoreApi/OData") || trimmed.ends_with("/odata") {
        trimmed.to_string()
    } else if trimmed.ends_with("/ODataApi") {
        trimmed.replace("/ODataApi", "/CoreApi/OData")
    } else {
        format!("{}/CoreApi/OData", trimmed)
    }
}

/// Build the request URL for a page query
pub fn build_url(odata_base: &str, query: &PageQuery) -> String {
    let mut url = format!("{}/{}", odata_base, query.entity_set);
    let mut params: Vec<String> = Vec::new();

    if let Some(top) = query.top {
        params.push(format!("$top={}", top));
    }
    if let Some(skip) = query.skip {
        params.push(format!("$skip={}", skip));
    }
    if let Some(ref filter) = query.filter {
        let text = filter.to_odata();
        if !text.is_empty() {
            params.push(format!("$filter={}", text));
        }
    }
    if !query.select.is_empty() {
        params.push(format!("$select={}", query.select.join(",")));
    }
    if let Some(ref order_by) = query.order_by {
        if !order_by.is_empty() {
            params.push(format!("$orderby={}", order_by));
        }
    }

    if !params.is_empty() {
        url = format!("{}?{}", url, params.join("&"));
    }
    url
}

/// Parse a response body into records
pub fn parse_body(entity_set: &str, body: &str) -> Result<Page, FetchError> {
    let malformed = |message: String| FetchError::Malformed {
        entity_set: entity_set.to_string(),
        message,
    };

    let json: Value = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    match json {
        Value::Array(records) => Ok(records),
        Value::Object(mut obj) => match obj.remove("value") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(malformed("object response without a 'value' array".to_string())),
        },
        _ => Err(malformed("expected an array or an object".to_string())),
    }
}

fn build_headers(session: &Session) -> Result<HeaderMap, FetchError> {
    let invalid = |what: &str, e: String| FetchError::InvalidRequest {
        message: format!("Invalid {} header: {}", what, e),
    };

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(user_id) = session.user_id {
        headers.insert(
            HeaderName::from_static("userid"),
            HeaderValue::from_str(&user_id.to_string()).map_err(|e| invalid("UserID", e.to_string()))?,
        );
    }

    // Nimbus wants the token both as a bearer and as AuthenticationToken
    if let Some(ref token) = session.auth_token {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| invalid("Authorization", e.to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let mut raw = HeaderValue::from_str(token)
            .map_err(|e| invalid("AuthenticationToken", e.to_string()))?;
        raw.set_sensitive(true);
        headers.insert(HeaderName::from_static("authenticationtoken"), raw);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::Filter;

    #[test]
    fn test_odata_base_normalisation() {
        assert_eq!(
            odata_base_url("https://t.nimbus.cloud/CoreApi/OData/"),
            "https://t.nimbus.cloud/CoreApi/OData"
        );
        assert_eq!(
            odata_base_url("https://t.nimbus.cloud/ODataApi"),
            "https://t.nimbus.cloud/CoreApi/OData"
        );
        assert_eq!(
            odata_base_url("https://t.nimbus.cloud/odata"),
            "https://t.nimbus.cloud/odata"
        );
        assert_eq!(
            odata_base_url("https://t.nimbus.cloud/"),
            "https://t.nimbus.cloud/CoreApi/OData"
        );
    }

    #[test]
    fn test_build_url_parameter_order() {
        let query = PageQuery::new("Location")
            .with_filter(Filter::active())
            .with_select(&["ID", "Description"])
            .with_order_by("ID")
            .page(100, 200);

        assert_eq!(
            build_url("https://t/CoreApi/OData", &query),
            "https://t/CoreApi/OData/Location?$top=100&$skip=200\
             &$filter=Active eq true and Deleted eq false\
             &$select=ID,Description&$orderby=ID"
        );
    }

    #[test]
    fn test_client_queries_normalised_root() {
        let client = ODataClient::new(&Session::new("https://t.nimbus.cloud/"), None).unwrap();
        assert_eq!(client.odata_base(), "https://t.nimbus.cloud/CoreApi/OData");
    }

    #[test]
    fn test_build_url_without_params() {
        assert_eq!(
            build_url("https://t/odata", &PageQuery::new("User")),
            "https://t/odata/User"
        );
    }

    #[test]
    fn test_parse_body_accepts_both_shapes() {
        assert_eq!(parse_body("X", r#"[{"ID": 1}]"#).unwrap().len(), 1);
        assert_eq!(
            parse_body("X", r#"{"@odata.context": "x", "value": [{"ID": 1}, {"ID": 2}]}"#)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_parse_body_malformed() {
        assert!(parse_body("X", "<xml/>").unwrap_err().is_malformed());
        assert!(parse_body("X", r#"{"error": "nope"}"#).unwrap_err().is_malformed());
        assert!(parse_body("X", "42").unwrap_err().is_malformed());
    }

    #[test]
    fn test_headers_carry_credentials() {
        let session = Session::new("https://t").with_user_id(9).with_auth_token("tok");
        let headers = build_headers(&session).unwrap();

        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(headers.get("UserID").unwrap(), "9");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert_eq!(headers.get("AuthenticationToken").unwrap(), "tok");
    }

    #[test]
    fn test_headers_reject_invalid_token() {
        let session = Session::new("https://t").with_auth_token("bad\ntoken");
        assert!(matches!(
            build_headers(&session),
            Err(FetchError::InvalidRequest { .. })
        ));
    }
}
