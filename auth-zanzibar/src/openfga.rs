//! HTTP client for an OpenFGA-compatible authorization engine

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{Result, ZanzibarError};
use crate::models::{StoreInfo, TupleKey, WriteRequest};
use crate::repository::AuthorizationEngineClient;
use crate::schema::AuthorizationModel;

const PAGE_SIZE: usize = 100;

pub struct OpenFgaClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct ListStoresResponse {
    #[serde(default)]
    stores: Vec<StoreInfo>,
    #[serde(default)]
    continuation_token: String,
}

#[derive(Serialize)]
struct CreateStoreRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct WriteModelResponse {
    authorization_model_id: String,
}

#[derive(Serialize)]
struct TupleKeys<'a> {
    tuple_keys: &'a [TupleKey],
}

#[derive(Serialize)]
struct WriteBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    writes: Option<TupleKeys<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletes: Option<TupleKeys<'a>>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl OpenFgaClient {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Map non-success responses onto engine errors. Invalid-input and
/// duplicate rejections of writes become [`ZanzibarError::Duplicate`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    logger_redacted::redacted_warn!("Authorization engine returned {}: {}", status, text);
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = logger_redacted::redact(if body.message.is_empty() { &text } else { &body.message });

    if status.as_u16() == 400 && (body.code.contains("invalid_input") || body.code.contains("duplicate")) {
        return Err(ZanzibarError::Duplicate(message));
    }
    if status.as_u16() == 404 {
        return Err(ZanzibarError::StoreNotFound(message));
    }
    Err(ZanzibarError::Engine {
        status: status.as_u16(),
        code: body.code,
        message,
    })
}

#[async_trait]
impl AuthorizationEngineClient for OpenFgaClient {
    #[instrument(skip(self))]
    async fn list_stores(&self) -> Result<Vec<StoreInfo>> {
        let mut stores = Vec::new();
        let mut token = String::new();
        loop {
            let mut query = vec![("page_size", PAGE_SIZE.to_string())];
            if !token.is_empty() {
                query.push(("continuation_token", token.clone()));
            }
            let page: ListStoresResponse = self.send(self.request(Method::GET, "/stores").query(&query)).await?;
            stores.extend(page.stores);
            if page.continuation_token.is_empty() || page.continuation_token == token {
                break;
            }
            token = page.continuation_token;
        }
        debug!(count = stores.len(), "Listed stores");
        Ok(stores)
    }

    #[instrument(skip(self))]
    async fn create_store(&self, name: &str) -> Result<StoreInfo> {
        self.send(self.request(Method::POST, "/stores").json(&CreateStoreRequest { name }))
            .await
    }

    #[instrument(skip(self, model))]
    async fn write_authorization_model(&self, store_id: &str, model: &AuthorizationModel) -> Result<String> {
        let path = format!("/stores/{store_id}/authorization-models");
        let response: WriteModelResponse = self.send(self.request(Method::POST, &path).json(model)).await?;
        Ok(response.authorization_model_id)
    }

    #[instrument(skip(self, request), fields(writes = request.writes.len(), deletes = request.deletes.len()))]
    async fn write(&self, store_id: &str, request: WriteRequest) -> Result<()> {
        if request.is_empty() {
            return Err(ZanzibarError::InvalidTuple("write request is empty".to_string()));
        }
        let body = WriteBody {
            writes: (!request.writes.is_empty()).then_some(TupleKeys {
                tuple_keys: &request.writes,
            }),
            deletes: (!request.deletes.is_empty()).then_some(TupleKeys {
                tuple_keys: &request.deletes,
            }),
        };
        let path = format!("/stores/{store_id}/write");
        let response = self.request(Method::POST, &path).json(&body).send().await?;
        check_status(response).await?;
        Ok(())
    }
}
