// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::{fs, path::Path, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    time,
};

use crate::error::Result;

use super::fix::Fix;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Permission {
    Granted,
    Denied,
    Prompt,
}

/// Options for a fix request, mirroring what platform position APIs accept.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FixRequest {
    pub(crate) timeout: Duration,
    pub(crate) high_accuracy: bool,
    /// Maximum acceptable age of a cached fix. Zero means only a fresh fix
    /// will do.
    pub(crate) maximum_age: Duration,
}

impl FixRequest {
    /// The one-shot fix requested as soon as permission allows.
    pub(crate) const INITIAL: Self = Self {
        timeout: Duration::from_secs(10),
        high_accuracy: true,
        maximum_age: Duration::ZERO,
    };

    /// The continuous watch tolerates slower fixes.
    pub(crate) const WATCH: Self = Self {
        timeout: Duration::from_secs(20),
        high_accuracy: true,
        maximum_age: Duration::ZERO,
    };
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub(crate) enum WatchError {
    #[error("timed out waiting for a position fix")]
    Timeout,
    #[error("location permission was revoked")]
    PermissionRevoked,
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum WatchEvent {
    Fix(Fix),
    Error(WatchError),
}

/// A subscription to a platform position watch. Dropping the handle cancels
/// the underlying watch so no platform handle leaks past the subscriber.
pub(crate) struct Watch {
    events: mpsc::Receiver<WatchEvent>,
    cancel: Option<oneshot::Sender<()>>,
}

impl Watch {
    pub(crate) fn new(events: mpsc::Receiver<WatchEvent>, cancel: oneshot::Sender<()>) -> Self {
        Self {
            events,
            cancel: Some(cancel),
        }
    }

    /// The next event, or `None` once the watch has ended.
    pub(crate) async fn next_event(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _result = cancel.send(());
        }
    }
}

/// The platform geolocation capability behind a seam, so trackers can run
/// against the real platform, a replay file, or a test script.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    /// Whether the platform exposes a geolocation capability at all.
    fn is_available(&self) -> bool {
        true
    }

    /// The current permission state. An error means access is blocked by
    /// platform policy before permission can even be queried.
    async fn permission(&self) -> Result<Permission>;

    /// One immediate fix, bounded by the request's timeout.
    async fn current_fix(&self, req: FixRequest) -> Result<Fix, WatchError>;

    /// A continuous stream of position events.
    async fn watch(&self, req: FixRequest) -> Result<Watch>;
}

/// Replays a prerecorded sequence of fixes, one per interval. The first fix
/// answers the immediate request; the rest arrive through the watch.
pub(crate) struct Replay {
    permission: Permission,
    fixes: Vec<Fix>,
    interval: Duration,
}

impl Replay {
    pub(crate) fn new(permission: Permission, fixes: Vec<Fix>, interval: Duration) -> Self {
        Self {
            permission,
            fixes,
            interval,
        }
    }

    pub(crate) fn from_file<P: AsRef<Path>>(path: P, interval: Duration) -> Result<Self> {
        let file = fs::File::open(path)?;
        let fixes: Vec<Fix> = serde_json::from_reader(file)?;
        Ok(Self::new(Permission::Granted, fixes, interval))
    }
}

#[async_trait]
impl Provider for Replay {
    async fn permission(&self) -> Result<Permission> {
        Ok(self.permission)
    }

    async fn current_fix(&self, _req: FixRequest) -> Result<Fix, WatchError> {
        self.fixes.first().copied().ok_or(WatchError::Timeout)
    }

    async fn watch(&self, _req: FixRequest) -> Result<Watch> {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        let fixes = self.fixes.clone();
        let interval = self.interval;

        let _replayer = tokio::spawn(async move {
            for fix in fixes.into_iter().skip(1) {
                tokio::select! {
                    _ = &mut cancel_rx => return,
                    () = time::sleep(interval) => {}
                }

                if events_tx.send(WatchEvent::Fix(fix)).await.is_err() {
                    return;
                }
            }
        });

        Ok(Watch::new(events_rx, cancel_tx))
    }
}
