use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures_util::TryStreamExt;
use reqwest::{header, Client, Proxy, StatusCode};
use thiserror::Error;
use url::Url;

use std::io;

/// What the crawler and the mirror engine see of one GET: the header the
/// freshness check needs and the body as a lazy chunk stream. Dropping the
/// response without reading the body aborts the transfer.
pub struct RemoteResponse {
	pub last_modified: Option<String>,
	pub body: BoxStream<'static, io::Result<Bytes>>,
}

/// Authenticated read access to the platform, narrowed to the single
/// operation the sync needs. Tests substitute a canned implementation.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn get(&self, url: &Url) -> Result<RemoteResponse>;
}

/// Marker for HTTP 401/403, so startup can tell bad credentials apart from
/// an unreachable server.
#[derive(Debug, Error)]
#[error("authentication rejected ({status})")]
pub struct AuthFailed {
	pub status: StatusCode,
}

pub struct HttpTransport {
	client: Client,
	username: String,
	password: String,
}

impl HttpTransport {
	pub fn new(username: String, password: String, proxy: Option<&str>) -> Result<Self> {
		let mut builder =
			Client::builder().user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
		if let Some(proxy) = proxy {
			builder = builder.proxy(Proxy::all(proxy)?);
		}
		let client = builder
			// timeout is infinite by default
			.build()?;
		Ok(HttpTransport { client, username, password })
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn get(&self, url: &Url) -> Result<RemoteResponse> {
		let resp = self
			.client
			.get(url.clone())
			.basic_auth(&self.username, Some(&self.password))
			.send()
			.await?;
		let status = resp.status();
		if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
			return Err(AuthFailed { status }.into());
		}
		let resp = resp.error_for_status()?;
		let last_modified = resp
			.headers()
			.get(header::LAST_MODIFIED)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned);
		Ok(RemoteResponse {
			last_modified,
			body: Box::pin(resp.bytes_stream().map_err(|e| io::Error::new(io::ErrorKind::Other, e))),
		})
	}
}
