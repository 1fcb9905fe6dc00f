//! HTTP client utilities shared by the single-shot and streaming calls.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::collections::HashMap;

use crate::client::ClientError;
use crate::options::TransportOptions;

/// Build the HTTP client for a call.
///
/// A client supplied through [`TransportOptions::with_http_client`] is used
/// as is. Otherwise the configured timeout becomes the connect timeout. The
/// single-shot call also bounds the whole request with it, and the streaming
/// call uses it as the longest allowed wait between reads.
///
/// # Example
/// ```ignore
/// let client = build_http_client(&transport_options)?;
/// ```
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, reqwest::Error> {
    if let Some(client) = &transport_options.http_client {
        return Ok(client.clone());
    }

    let mut builder = Client::builder().connect_timeout(transport_options.timeout());

    if let Some(proxy_url) = &transport_options.proxy {
        if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build()
}

/// Headers common to every call: the bearer token.
pub fn auth_headers(transport_options: &TransportOptions) -> Result<HeaderMap, ClientError> {
    let api_key = transport_options
        .api_key
        .as_ref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ClientError::Config("API key is required".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            .map_err(|_| ClientError::Config("Invalid API key".to_string()))?,
    );
    Ok(headers)
}

/// Add extra headers to a request if specified in transport options.
///
/// # Example
/// ```ignore
/// let mut req = client.post(url);
/// req = add_extra_headers(req, &transport_options.extra_headers);
/// ```
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Map a response status to an error. Only 200 counts as success.
pub fn check_status(status: StatusCode) -> Result<(), ClientError> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
        other => Err(ClientError::Status(other.as_u16())),
    }
}
