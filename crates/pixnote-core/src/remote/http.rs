//! JSON-over-HTTP document store client.
//!
//! Collections live under `{base}/v1/{family}`; documents are addressed as
//! `{base}/v1/{family}/{remote_id}`.

use std::marker::PhantomData;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::{Cursor, RemoteDraft, RemoteFields, RemotePage, RemoteRecord, RemoteSource};
use crate::error::{Error, Result};
use crate::models::{Payload, RemoteId};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// REST client for one family's collection.
pub struct HttpRemote<P> {
    base_url: Url,
    token: Option<String>,
    client: Client,
    _family: PhantomData<fn() -> P>,
}

impl<P> std::fmt::Debug for HttpRemote<P> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemote")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl<P: Payload> HttpRemote<P> {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Network(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            base_url,
            token: normalize_text_option(token),
            client,
            _family: PhantomData,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidInput(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", P::FAMILY])
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

impl<P: Payload> RemoteSource<P> for HttpRemote<P> {
    async fn create(&self, draft: &RemoteDraft<P>) -> Result<RemoteId> {
        let url = self.endpoint(&[])?;
        let body = WireCreate {
            created_at: draft.created_at,
            favorite: draft.favorite,
            fields: &draft.payload,
        };
        let response = self.send(self.client.post(url).json(&body)).await?;
        let created: WireCreated = decode(response).await?;
        created.id.parse()
    }

    async fn get_page(&self, cursor: Option<&Cursor>, page_size: usize) -> Result<RemotePage<P>> {
        if page_size == 0 {
            return Err(Error::InvalidInput("page size must be positive".into()));
        }
        let mut url = self.endpoint(&[])?;
        url.query_pairs_mut()
            .append_pair("limit", &page_size.to_string());
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("cursor", cursor.as_token());
        }

        let response = self.send(self.client.get(url)).await?;
        let page: WirePage<P> = decode(response).await?;
        page.try_into()
    }

    async fn update(&self, remote_id: &RemoteId, fields: &RemoteFields<P>) -> Result<()> {
        let url = self.endpoint(&[remote_id.as_str()])?;
        let body = WireUpdate {
            favorite: fields.favorite,
            fields: &fields.payload,
        };
        self.send(self.client.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn delete(&self, remote_id: &RemoteId) -> Result<()> {
        let url = self.endpoint(&[remote_id.as_str()])?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn query_by_substring(&self, field: &str, text: &str) -> Result<Vec<RemoteRecord<P>>> {
        let mut url = self.endpoint(&["search"])?;
        url.query_pairs_mut()
            .append_pair("field", field)
            .append_pair("contains", text);

        let response = match self.send(self.client.get(url)).await {
            Ok(response) => response,
            Err(Error::NotFound(_)) => {
                return Err(Error::Unsupported(format!(
                    "substring query on {}.{field}",
                    P::FAMILY
                )))
            }
            Err(error) => return Err(error),
        };
        let page: WirePage<P> = decode(response).await?;
        page.documents.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDocument<P> {
    id: String,
    created_at: i64,
    #[serde(default)]
    favorite: bool,
    fields: P,
}

#[derive(Debug, Deserialize)]
struct WirePage<P> {
    documents: Vec<WireDocument<P>>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireCreate<'a, P> {
    created_at: i64,
    favorite: bool,
    fields: &'a P,
}

#[derive(Debug, Serialize)]
struct WireUpdate<'a, P> {
    favorite: bool,
    fields: &'a P,
}

#[derive(Debug, Deserialize)]
struct WireCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: Option<String>,
    message: Option<String>,
}

impl<P> TryFrom<WireDocument<P>> for RemoteRecord<P> {
    type Error = Error;

    fn try_from(document: WireDocument<P>) -> Result<Self> {
        Ok(Self {
            remote_id: document.id.parse()?,
            payload: document.fields,
            created_at: document.created_at,
            favorite: document.favorite,
        })
    }
}

impl<P> TryFrom<WirePage<P>> for RemotePage<P> {
    type Error = Error;

    fn try_from(page: WirePage<P>) -> Result<Self> {
        let records = page
            .documents
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>>>()?;
        let next = normalize_text_option(page.next_cursor).map(Cursor::from_token);
        Ok(Self { records, next })
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await.map_err(transport_error)?;
    Ok(serde_json::from_str(&body)?)
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !is_http_url(trimmed) {
        return Err(Error::InvalidInput(
            "remote base URL must include http:// or https://".to_string(),
        ));
    }
    Url::parse(trimmed).map_err(|error| Error::InvalidInput(format!("invalid remote base URL: {error}")))
}

fn transport_error(error: reqwest::Error) -> Error {
    Error::Network(error.to_string())
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let message = parse_api_error(status, body);
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Error::Conflict(message),
        StatusCode::NOT_IMPLEMENTED => Error::Unsupported(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::InvalidInput(message),
        _ => Error::Network(message),
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<WireError>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
