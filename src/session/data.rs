// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque bearer credential issued by the backend on login or
/// registration.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub(crate) struct Token(String);

impl Token {
    pub(crate) fn new<S: Into<String>>(raw: S) -> Self {
        Self(raw.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl secrecy::CloneableSecret for Token {}

impl secrecy::SerializableSecret for Token {}

impl secrecy::Zeroize for Token {
    fn zeroize(&mut self) {
        secrecy::Zeroize::zeroize(&mut self.0);
    }
}

/// Who this device claims to be. Before login, activity is attributed to a
/// generated ephemeral identifier; after login, to the real user id. The two
/// are mutually exclusive by construction.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) enum DeviceIdentity {
    UserId(String),
    EphemeralUserId(Uuid),
}

impl DeviceIdentity {
    pub(crate) fn generate() -> Self {
        Self::EphemeralUserId(uuid::Builder::from_random_bytes(rand::random()).into_uuid())
    }

    pub(crate) fn user_id(&self) -> Option<&str> {
        match *self {
            Self::UserId(ref id) => Some(id),
            Self::EphemeralUserId(_) => None,
        }
    }

    pub(crate) const fn is_ephemeral(&self) -> bool {
        matches!(*self, Self::EphemeralUserId(_))
    }
}

/// The record persisted between runs of the program.
#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct Data {
    #[serde(flatten)]
    device: DeviceIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<secrecy::Secret<Token>>,
}

impl Data {
    pub(crate) fn new_anonymous() -> Self {
        Self {
            device: DeviceIdentity::generate(),
            token: None,
        }
    }

    pub(crate) fn new_authenticated(user_id: &str, token: Token) -> Self {
        Self {
            device: DeviceIdentity::UserId(user_id.to_owned()),
            token: Some(secrecy::Secret::new(token)),
        }
    }

    pub(crate) const fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    pub(crate) fn token(&self) -> Option<&Token> {
        self.token.as_ref().map(ExposeSecret::expose_secret)
    }

    /// The same device with any trace of the authenticated user removed. An
    /// already-anonymous record keeps its ephemeral identifier.
    pub(crate) fn into_anonymous(self) -> Self {
        Self {
            device: if self.device.is_ephemeral() {
                self.device
            } else {
                DeviceIdentity::generate()
            },
            token: None,
        }
    }
}
