//! Remote Store client.
//!
//! [`RemoteStore`] and [`IdentityStore`] are the seams the sync context and
//! identity client are written against; [`HttpRemote`] implements both over
//! the fairway server's HTTP API.

use std::future::Future;
use std::sync::RwLock;

use fairway_engine::{CollectionName, Principal, Role};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

/// Whole-document access to the remote copy of each collection.
pub trait RemoteStore: Send + Sync {
    /// The stored document, or `None` when nothing has been stored yet.
    fn fetch(
        &self,
        collection: CollectionName,
    ) -> impl Future<Output = Result<Option<Value>, RemoteError>> + Send;

    /// Overwrite the stored document.
    fn push(
        &self,
        collection: CollectionName,
        value: &Value,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub principal: Principal,
    pub role: Role,
}

/// The identity collaborator.
pub trait IdentityStore: Send + Sync {
    fn sign_in(
        &self,
        identifier: &str,
        secret: &str,
    ) -> impl Future<Output = Result<Session, RemoteError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn role_of(&self, uid: &str) -> impl Future<Output = Result<Role, RemoteError>> + Send;

    /// Use `token` for subsequent requests.
    fn set_token(&self, _token: Option<String>) {}
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    identifier: &'a str,
    secret: &'a str,
}

#[derive(Deserialize)]
struct RoleResponse {
    role: Role,
}

/// HTTP client for the fairway server.
#[derive(Debug)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    /// WebSocket endpoint derived from the base URL.
    pub fn ws_url(&self) -> String {
        let url = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{url}/ws")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn non-success responses into [`RemoteError::Status`].
    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl RemoteStore for HttpRemote {
    async fn fetch(&self, collection: CollectionName) -> Result<Option<Value>, RemoteError> {
        let request = self.client.get(self.url(&format!("/data/{collection}")));
        let response = Self::check(self.authorized(request).send().await?).await?;
        let value: Value = response.json().await?;
        Ok(Some(value).filter(|v| !v.is_null()))
    }

    async fn push(&self, collection: CollectionName, value: &Value) -> Result<(), RemoteError> {
        let request = self
            .client
            .put(self.url(&format!("/data/{collection}")))
            .json(value);
        Self::check(self.authorized(request).send().await?).await?;
        Ok(())
    }
}

impl IdentityStore for HttpRemote {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Session, RemoteError> {
        let response = self
            .client
            .post(self.url("/auth/sign-in"))
            .json(&SignInRequest { identifier, secret })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        if self.token().is_none() {
            return Ok(());
        }
        let request = self.client.post(self.url("/auth/sign-out"));
        let response = self.authorized(request).send().await?;
        // An expired session is already signed out.
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }

    async fn role_of(&self, uid: &str) -> Result<Role, RemoteError> {
        let request = self.client.get(self.url(&format!("/auth/roles/{uid}")));
        let response = Self::check(self.authorized(request).send().await?).await?;
        let body: RoleResponse = response.json().await?;
        Ok(body.role)
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut current) = self.token.write() {
            *current = token;
        }
    }
}
