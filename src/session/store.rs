// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use futures_util::lock::Mutex;
use log::warn;

use crate::{error::Result, storage::Storage};

use super::data::{Data, Token};

pub(crate) type SharedStorage = Arc<Mutex<Box<dyn Storage<Data>>>>;

/// Stateless view over the persisted session record. Every operation reads
/// the record fresh from storage, so holders of a `Store` never observe stale
/// in-memory session state.
#[derive(Clone)]
pub(crate) struct Store {
    storage: SharedStorage,
}

impl Store {
    pub(crate) fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// The current session record, initializing (and persisting) a fresh
    /// anonymous one on first use or when the stored record cannot be
    /// decoded.
    pub(crate) async fn data(&self) -> Result<Data> {
        let mut storage = self.storage.lock().await;
        let existing = match storage.load().await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Failed to decode the stored session, so we have to start over: {e}");
                None
            }
        };

        match existing {
            Some(data) => Ok(data),
            None => {
                let data = Data::new_anonymous();
                storage.store(&data).await?;
                Ok(data)
            }
        }
    }

    /// The persisted bearer token, if any. Never fails: a broken session
    /// store reads as "not logged in".
    pub(crate) async fn token(&self) -> Option<Token> {
        let mut storage = self.storage.lock().await;
        match storage.load().await {
            Ok(data) => data.and_then(|data| data.token().cloned()),
            Err(e) => {
                warn!("Failed to read the stored session: {e}");
                None
            }
        }
    }

    pub(crate) async fn persist_token(&self, user_id: &str, token: Token) -> Result<()> {
        let mut storage = self.storage.lock().await;
        storage.store(&Data::new_authenticated(user_id, token)).await
    }

    /// Drops the token and reverts the device to an anonymous identity.
    pub(crate) async fn clear_token(&self) -> Result<()> {
        let mut storage = self.storage.lock().await;
        let data = match storage.load().await {
            Ok(Some(data)) => data.into_anonymous(),
            Ok(None) | Err(_) => Data::new_anonymous(),
        };
        storage.store(&data).await
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::Result, storage::Memory};

    use super::*;

    fn memory_store() -> Store {
        Store::new(Arc::new(Mutex::new(
            Box::new(Memory::<Data>::new()) as Box<dyn Storage<Data>>
        )))
    }

    #[tokio::test]
    async fn first_use_persists_an_ephemeral_identity() -> Result<()> {
        let store = memory_store();

        let first = store.data().await?;
        assert!(first.device().is_ephemeral());
        assert!(store.token().await.is_none());

        // The generated identity is stable across reads.
        assert_eq!(store.data().await?.device(), first.device());
        Ok(())
    }

    #[tokio::test]
    async fn persisting_a_token_switches_to_the_real_user() -> Result<()> {
        let store = memory_store();
        store.persist_token("42", Token::new("tok-123")).await?;

        let data = store.data().await?;
        assert_eq!(data.device().user_id(), Some("42"));
        assert_eq!(store.token().await.as_ref().map(Token::as_str), Some("tok-123"));
        Ok(())
    }

    #[tokio::test]
    async fn clearing_reverts_to_an_anonymous_identity() -> Result<()> {
        let store = memory_store();
        store.persist_token("42", Token::new("tok-123")).await?;
        store.clear_token().await?;

        let data = store.data().await?;
        assert!(data.device().is_ephemeral());
        assert!(store.token().await.is_none());
        Ok(())
    }
}
