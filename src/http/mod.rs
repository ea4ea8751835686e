// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod navigate;
pub(crate) mod transport;

use std::sync::Arc;

use log::{debug, warn};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::{form_urlencoded, Url};

use crate::{
    error::{self, Result},
    geo::{fix::Fix, LocationAccessor},
    session::store::{SharedStorage, Store},
};

use navigate::Navigator;
use transport::{Request, Transport};

pub(crate) const AUTHORIZATION_HEADER: &str = "Authorization";
pub(crate) const USER_LOCATION_HEADER: &str = "X-User-Location";
pub(crate) const LOGIN_PATH: &str = "/login";

/// The single point through which every backend call goes. Each call is
/// augmented with the persisted bearer token and the current location, and
/// every response is screened for session rejection.
pub(crate) struct Client {
    base_url: Url,
    transport: Arc<dyn Transport>,
    sessions: Store,
    navigator: Arc<dyn Navigator>,
    unauthenticated_paths: Vec<String>,
    location: Option<LocationAccessor>,
}

impl Client {
    pub(crate) fn new(
        base_url: Url,
        transport: Arc<dyn Transport>,
        storage: SharedStorage,
        navigator: Arc<dyn Navigator>,
        unauthenticated_paths: Vec<String>,
    ) -> Self {
        Self {
            base_url,
            transport,
            sessions: Store::new(storage),
            navigator,
            unauthenticated_paths,
            location: None,
        }
    }

    /// Attaches a location snapshot function whose fixes are sent along with
    /// every request. Without one, or while no fix is available, requests
    /// simply go out without a location header.
    pub(crate) fn with_location_accessor(mut self, accessor: LocationAccessor) -> Self {
        self.location = Some(accessor);
        self
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&Value>,
    ) -> Result<T> {
        self.request(Method::GET, path, query.cloned()).await
    }

    pub(crate) async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request(Method::POST, path, Some(body.clone())).await
    }

    pub(crate) async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request(Method::PUT, path, Some(body.clone())).await
    }

    pub(crate) async fn patch<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request(Method::PATCH, path, Some(body.clone())).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::DELETE, path, None).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let mut req = Request {
            method: method.clone(),
            url: self.base_url.join(path)?,
            headers: Vec::new(),
            body: None,
        };

        if method == Method::GET {
            if let Some(Value::Object(params)) = body {
                let mut pairs = req.url.query_pairs_mut();
                for (key, value) in &params {
                    let _pairs = pairs.append_pair(key, &query_value(value));
                }
            }
        } else {
            req.body = body;
        }

        if let Some(token) = self.sessions.token().await {
            req.headers
                .push((AUTHORIZATION_HEADER, format!("Bearer {}", token.as_str())));
        }

        if let Some(header) = self
            .location
            .as_ref()
            .and_then(|accessor| accessor())
            .as_ref()
            .and_then(location_header)
        {
            req.headers.push((USER_LOCATION_HEADER, header));
        }

        let response = self.transport.execute(req).await?;

        let failure = error::Http::Status {
            status: response.status,
            body: response.body.clone(),
        };
        if failure.is_auth_rejection() {
            self.intercept_rejection().await;
            return Err(failure.into());
        }
        if !response.status.is_success() {
            return Err(failure.into());
        }

        // Some endpoints respond with an empty body; let callers read that
        // as JSON null so an Option deserializes cleanly.
        let text = if response.body.trim().is_empty() {
            "null"
        } else {
            &response.body
        };
        Ok(serde_json::from_str(text)?)
    }

    /// The server no longer accepts our session. Invalidate it and, unless
    /// the user is somewhere that works without a session, send them to the
    /// login screen with a way back.
    async fn intercept_rejection(&self) {
        debug!("The server rejected our session, clearing the persisted token");
        if let Err(e) = self.sessions.clear_token().await {
            warn!("Failed to clear the persisted session token: {e}");
        }

        let path = self.navigator.current_path();
        if self.is_unauthenticated_path(&path) {
            return;
        }

        let from: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
        self.navigator.assign(&format!("{LOGIN_PATH}?from={from}"));
    }

    fn is_unauthenticated_path(&self, path: &str) -> bool {
        path == "/"
            || path == LOGIN_PATH
            || self
                .unauthenticated_paths
                .iter()
                .any(|candidate| candidate == path)
    }
}

fn query_value(value: &Value) -> String {
    match *value {
        Value::String(ref s) => s.clone(),
        _ => value.to_string(),
    }
}

fn location_header(fix: &Fix) -> Option<String> {
    let (latitude, longitude) = fix.coordinates()?;
    Some(format!(
        "{},{},{}",
        latitude,
        longitude,
        fix.accuracy.unwrap_or(0.0)
    ))
}
