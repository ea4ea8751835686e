// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod data;
pub(crate) mod store;
pub(crate) mod user;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{self, Result},
    http,
};

use data::Token;
use store::{SharedStorage, Store};
use user::User;

/// Where the phone-verification login flow currently stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Flow {
    #[default]
    Idle,
    VerificationCodeSent,
    Authenticated,
    Error,
}

#[derive(Default)]
struct State {
    user: Option<User>,
    loading: bool,
    error: Option<String>,
    waiting_for_verification_code: bool,
    is_register: bool,
    flow: Flow,
}

/// What login and registration hand back on success.
#[derive(Deserialize)]
struct Credentials {
    user: User,
    token: String,
}

/// Drives the phone-verification login flow and session restoration, and
/// holds the one current-user value the rest of the program reads.
pub(crate) struct Auth {
    client: Arc<http::Client>,
    store: Store,
    app_name: String,
    auth_prefix: String,
    state: Mutex<State>,
}

impl Auth {
    pub(crate) fn new(
        client: Arc<http::Client>,
        storage: SharedStorage,
        app_name: String,
        auth_prefix: String,
    ) -> Self {
        Self {
            client,
            store: Store::new(storage),
            app_name,
            auth_prefix,
            state: Mutex::new(State::default()),
        }
    }

    /// Verifies a persisted token with the backend and repopulates the
    /// current user from it. Without a persisted token this resolves to
    /// `None` immediately.
    pub(crate) async fn restore(&self) -> Result<Option<User>> {
        let Some(token) = self.store.token().await else {
            return Ok(None);
        };
        self.lock().loading = true;

        let verified: Result<User> = self
            .client
            .post(
                &format!("{}/token/verify", self.auth_prefix),
                &json!({ "token": token.as_str() }),
            )
            .await;

        match verified {
            Ok(user) => {
                let mut state = self.lock();
                state.user = Some(user.clone());
                state.flow = Flow::Authenticated;
                state.loading = false;
                drop(state);
                Ok(Some(user))
            }
            Err(e) => {
                // A token the server no longer accepts is useless; drop it
                // so the next startup doesn't reverify a dead credential.
                if let Err(clear_error) = self.store.clear_token().await {
                    warn!("Failed to clear the rejected session token: {clear_error}");
                }
                let mut state = self.lock();
                state.user = None;
                state.error = Some(e.to_string());
                state.flow = Flow::Error;
                state.loading = false;
                drop(state);
                Err(e)
            }
        }
    }

    /// Asks the backend to text a one-time code to the given phone number.
    /// The response also tells us whether the number already has an account,
    /// which decides whether the follow-up call will log in or register.
    pub(crate) async fn request_verification_code(&self, phone_number: &str) -> Result<()> {
        let result: Result<Option<Value>> = self
            .client
            .post(
                &format!("{}/text/verification-code", self.auth_prefix),
                &json!({ "phoneNumber": phone_number, "appName": self.app_name }),
            )
            .await;

        match result {
            Ok(payload) => {
                let existing = payload.map_or(false, |payload| is_account_payload(&payload));
                let mut state = self.lock();
                state.waiting_for_verification_code = true;
                state.is_register = !existing;
                state.error = None;
                state.flow = Flow::VerificationCodeSent;
                drop(state);
                Ok(())
            }
            Err(e) => {
                let mut state = self.lock();
                state.waiting_for_verification_code = false;
                state.error = Some(e.to_string());
                state.flow = Flow::Error;
                drop(state);
                Err(e)
            }
        }
    }

    /// Logs in with a phone number and one-time code, falling back to
    /// registration when login fails. The server, not this client, is the
    /// authority on whether the account exists.
    pub(crate) async fn logister(
        &self,
        phone_number: &str,
        code: &str,
        name: Option<&str>,
    ) -> Result<User> {
        let login: Result<Credentials> = self
            .client
            .post(
                &format!("{}/login", self.auth_prefix),
                &json!({ "phoneNumber": phone_number, "code": code }),
            )
            .await;

        let (credentials, registered) = match login {
            Ok(credentials) => (credentials, false),
            Err(login_error) => {
                debug!("Login failed ({login_error}), attempting registration");
                let register: Result<Credentials> = self
                    .client
                    .post(
                        &format!("{}/register", self.auth_prefix),
                        &json!({
                            "phoneNumber": phone_number,
                            "code": code,
                            "name": name.unwrap_or(""),
                        }),
                    )
                    .await;

                match register {
                    Ok(credentials) => (credentials, true),
                    Err(register_error) => {
                        let failure = error::Auth::Logister {
                            login: Box::new(login_error),
                            register: Box::new(register_error),
                        };
                        let mut state = self.lock();
                        state.error = Some(failure.to_string());
                        state.flow = Flow::Error;
                        drop(state);
                        return Err(failure.into());
                    }
                }
            }
        };

        self.store
            .persist_token(&credentials.user.id, Token::new(credentials.token))
            .await?;

        let mut state = self.lock();
        state.user = Some(credentials.user.clone());
        state.is_register = registered;
        state.waiting_for_verification_code = false;
        state.error = None;
        state.flow = Flow::Authenticated;
        drop(state);
        Ok(credentials.user)
    }

    /// Ends the session on this device. No network call is involved: the
    /// token simply stops existing here.
    pub(crate) async fn logout(&self) -> Result<()> {
        self.store.clear_token().await?;

        let mut state = self.lock();
        state.user = None;
        state.is_register = false;
        state.waiting_for_verification_code = false;
        state.flow = Flow::Idle;
        drop(state);
        Ok(())
    }

    pub(crate) fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub(crate) fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub(crate) fn is_waiting_for_verification_code(&self) -> bool {
        self.lock().waiting_for_verification_code
    }

    pub(crate) fn is_register(&self) -> bool {
        self.lock().is_register
    }

    pub(crate) fn flow(&self) -> Flow {
        self.lock().flow
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The code-issuance endpoint answers with the existing account's record
/// when the phone number is already registered, and with nothing useful
/// otherwise.
fn is_account_payload(payload: &Value) -> bool {
    payload.get("id").is_some()
}
