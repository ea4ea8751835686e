// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result};

use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] Http),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("authentication error: {0}")]
    Auth(#[from] Auth),
    #[error("location error: {0}")]
    Geo(#[from] Geo),
    #[error("command execution failed")]
    Command,
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(Http::Transport(value))
    }
}

impl From<url::ParseError> for Error {
    fn from(value: url::ParseError) -> Self {
        Self::Http(Http::Url(value))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

#[derive(Error, Debug)]
pub(crate) enum Http {
    #[error("request failed: {0}")]
    Transport(reqwest::Error),
    #[error("invalid request URL: {0}")]
    Url(url::ParseError),
    #[error("server responded with status {status}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl Http {
    /// Whether the server rejected the session credential attached to the
    /// request.
    pub(crate) fn is_auth_rejection(&self) -> bool {
        match *self {
            Self::Status { status, .. } => {
                status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
            }
            Self::Transport(_) | Self::Url(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub(crate) enum Auth {
    #[error("no session token is available (log in first)")]
    NotAuthenticated,
    #[error("login and registration both failed (login: {login}; registration: {register})")]
    Logister {
        login: Box<Error>,
        register: Box<Error>,
    },
}

#[derive(Error, Debug)]
pub(crate) enum Geo {
    #[error("geolocation requires a secure context (HTTPS or localhost)")]
    InsecureContext,
    #[error("geolocation is not supported in this environment")]
    Unsupported,
}
