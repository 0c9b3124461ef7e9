//! Outbound HTTP towards resolved tunnel endpoints.

use crate::error::GatewayError;
use crate::headers;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use std::time::Duration;
use url::Url;

/// Sends requests to tunnel endpoints and turns their answers into responses.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    timeout: Duration,
}

/// A fully buffered upstream answer.
#[derive(Debug)]
pub struct BufferedReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl Forwarder {
    /// `timeout` bounds the wait for response headers on the streamed forward
    /// path, and the whole exchange on the buffered paths.
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Transparent forward: same verb, same headers (minus hop-by-hop), same
    /// body. The upstream status, headers and body are relayed as-is, with
    /// the body streamed.
    pub async fn forward(
        &self,
        method: Method,
        inbound: &HeaderMap,
        body: Bytes,
        target: Url,
    ) -> Result<Response, GatewayError> {
        tracing::debug!(%method, "forwarding to tunnel");

        let mut request = self
            .client
            .request(method, target)
            .headers(headers::outbound(inbound));
        if !body.is_empty() {
            request = request.body(body);
        }

        let upstream = self.send(request).await?;
        Ok(relay(upstream))
    }

    /// GET `target` with only the caller's content type and re-emit the body
    /// as JSON, keeping the upstream status.
    pub async fn probe(&self, inbound: &HeaderMap, target: Url) -> Result<Response, GatewayError> {
        let reply = self.get_buffered(inbound, target).await?;
        let mut response = Response::new(Body::from(reply.body));
        *response.status_mut() = reply.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(response)
    }

    /// GET `target` with only the caller's content type and buffer the body.
    pub async fn get_buffered(
        &self,
        inbound: &HeaderMap,
        target: Url,
    ) -> Result<BufferedReply, GatewayError> {
        let request = self
            .client
            .get(target)
            .headers(headers::content_type_only(inbound));
        self.fetch(request).await
    }

    /// POST a JSON document to `target` and buffer the answer.
    pub async fn post_json(
        &self,
        inbound: &HeaderMap,
        target: Url,
        payload: &serde_json::Value,
    ) -> Result<BufferedReply, GatewayError> {
        let mut headers = headers::content_type_only(inbound);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let request = self.client.post(target).headers(headers).json(payload);
        self.fetch(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(result) => result.map_err(transport_error),
            Err(_) => Err(GatewayError::ConnectionFailed(format!(
                "no response within {:?}",
                self.timeout
            ))),
        }
    }

    /// Send and read the full body, all within the timeout.
    async fn fetch(&self, request: reqwest::RequestBuilder) -> Result<BufferedReply, GatewayError> {
        let exchange = async {
            let upstream = request.send().await.map_err(transport_error)?;
            buffer(upstream).await
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::ConnectionFailed(format!(
                "no complete response within {:?}",
                self.timeout
            ))),
        }
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    GatewayError::ConnectionFailed(e.without_url().to_string())
}

/// Turn an upstream response into a gateway response without buffering.
fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = headers::relayed(upstream.headers());
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

async fn buffer(upstream: reqwest::Response) -> Result<BufferedReply, GatewayError> {
    let status = upstream.status();
    let body = upstream.bytes().await.map_err(transport_error)?;
    Ok(BufferedReply { status, body })
}
