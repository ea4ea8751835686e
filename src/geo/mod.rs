// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod city;
pub(crate) mod fix;
pub(crate) mod platform;
pub(crate) mod provider;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use tokio::{task, time};

use crate::error::{self, Result};

use fix::Fix;
use platform::Platform;
use provider::{FixRequest, Permission, Provider, Watch, WatchError, WatchEvent};

/// Facts about the hosting environment checked before the tracker touches
/// the platform capability.
#[derive(Clone, Debug)]
pub(crate) struct Environment {
    pub(crate) secure_context: bool,
    pub(crate) hostname: String,
    pub(crate) user_agent: String,
}

impl Environment {
    fn is_localhost(&self) -> bool {
        matches!(self.hostname.as_str(), "localhost" | "127.0.0.1" | "[::1]")
    }

    fn platform(&self) -> Platform {
        Platform::detect(&self.user_agent)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Phase {
    #[default]
    Uninitialized,
    CheckingPermission,
    /// Permission is denied or blocked; only the user can get us out of
    /// this, by following the remediation instructions.
    DeniedTerminal,
    Watching,
}

#[derive(Default)]
struct State {
    phase: Phase,
    fix: Option<Fix>,
    error: Option<String>,
    loading: bool,
}

/// A cheap snapshot function other components poll for the best-known fix,
/// for example to attach a location header to outgoing requests.
pub(crate) type LocationAccessor = Arc<dyn Fn() -> Option<Fix> + Send + Sync>;

/// Watches the device's physical position and publishes a debounced
/// best-known fix. Noisy position updates below the movement threshold are
/// discarded, and permission problems surface as remediation text instead of
/// errors.
pub(crate) struct Tracker {
    provider: Arc<dyn Provider>,
    environment: Environment,
    state: Arc<Mutex<State>>,
    worker: Option<task::JoinHandle<()>>,
}

impl Tracker {
    pub(crate) fn new(provider: Arc<dyn Provider>, environment: Environment) -> Self {
        Self {
            provider,
            environment,
            state: Arc::new(Mutex::new(State::default())),
            worker: None,
        }
    }

    /// Checks the environment and permission, requests one immediate fix,
    /// and starts the continuous watch. Denied or blocked permission is not
    /// an error here: it parks the tracker with remediation text published.
    pub(crate) async fn activate(&mut self) -> Result<()> {
        {
            let mut state = lock(&self.state);
            state.phase = Phase::CheckingPermission;
            state.loading = true;
        }

        if !self.environment.secure_context && !self.environment.is_localhost() {
            lock(&self.state).loading = false;
            return Err(error::Geo::InsecureContext.into());
        }

        if !self.provider.is_available() {
            lock(&self.state).loading = false;
            return Err(error::Geo::Unsupported.into());
        }

        let platform = self.environment.platform();

        let permission = match self.provider.permission().await {
            Ok(permission) => permission,
            Err(e) => {
                debug!("Permission query failed: {e}");
                self.park(blocked_message(platform));
                return Ok(());
            }
        };

        match permission {
            Permission::Denied => {
                self.park(denied_message(platform));
                return Ok(());
            }
            Permission::Granted | Permission::Prompt => {}
        }

        let initial = time::timeout(
            FixRequest::INITIAL.timeout,
            self.provider.current_fix(FixRequest::INITIAL),
        )
        .await
        .unwrap_or(Err(WatchError::Timeout));

        match initial {
            Ok(fix) => {
                let mut state = lock(&self.state);
                if fix::supersedes(state.fix.as_ref(), &fix) {
                    state.fix = Some(fix);
                }
                state.loading = false;
            }
            Err(WatchError::PermissionRevoked) => {
                self.park(denied_message(platform));
                return Ok(());
            }
            Err(e) => {
                let mut state = lock(&self.state);
                state.error = Some(e.to_string());
                state.loading = false;
            }
        }

        let watch = self.provider.watch(FixRequest::WATCH).await?;
        lock(&self.state).phase = Phase::Watching;
        self.worker = Some(tokio::spawn(watch_loop(
            watch,
            Arc::clone(&self.state),
            platform,
        )));
        Ok(())
    }

    /// Cancels the continuous watch. Also runs on drop, so a discarded
    /// tracker never leaks a platform watch handle.
    pub(crate) fn deactivate(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        lock(&self.state).phase = Phase::Uninitialized;
    }

    pub(crate) fn current_fix(&self) -> Option<Fix> {
        lock(&self.state).fix
    }

    pub(crate) fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    pub(crate) fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub(crate) fn phase(&self) -> Phase {
        lock(&self.state).phase
    }

    /// Acknowledges the published error.
    pub(crate) fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    pub(crate) fn location_accessor(&self) -> LocationAccessor {
        let state = Arc::clone(&self.state);
        Arc::new(move || lock(&state).fix)
    }

    /// Whether the continuous watch has ended, which happens once the
    /// provider closes its event stream (or none was ever established).
    pub(crate) fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(true, task::JoinHandle::is_finished)
    }

    fn park(&self, message: String) {
        let mut state = lock(&self.state);
        state.error = Some(message);
        state.phase = Phase::DeniedTerminal;
        state.loading = false;
    }

    /// Waits for the watch worker to finish on its own, which only happens
    /// once the provider's event stream ends.
    #[cfg(test)]
    async fn settled(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _result = worker.await;
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn watch_loop(mut watch: Watch, state: Arc<Mutex<State>>, platform: Platform) {
    while let Some(event) = watch.next_event().await {
        match event {
            WatchEvent::Fix(fix) => {
                let mut state = lock(&state);
                if fix::supersedes(state.fix.as_ref(), &fix) {
                    state.fix = Some(fix);
                } else {
                    debug!(
                        "Discarding a fix within {} m of the published one",
                        fix::MIN_MOVEMENT_METERS
                    );
                }
            }
            WatchEvent::Error(WatchError::Timeout) => {
                // The watch keeps running; a slow fix is not news.
                debug!("Position watch timed out, keeping the last known fix");
            }
            WatchEvent::Error(WatchError::PermissionRevoked) => {
                let mut state = lock(&state);
                state.error = Some(denied_message(platform));
                state.phase = Phase::DeniedTerminal;
                break;
            }
            WatchEvent::Error(error @ WatchError::Unavailable(_)) => {
                lock(&state).error = Some(error.to_string());
            }
        }
    }
}

fn lock(state: &Arc<Mutex<State>>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn denied_message(platform: Platform) -> String {
    format!(
        "Location access is denied, so your position cannot be tracked. {}",
        platform.remediation()
    )
}

fn blocked_message(platform: Platform) -> String {
    format!(
        "Location access is blocked on this device. {}",
        platform.remediation()
    )
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::atomic::{AtomicBool, Ordering},
    };

    use async_trait::async_trait;

    use crate::error::{Error, Result};

    use super::*;

    enum PermissionScript {
        State(Permission),
        Blocked,
    }

    struct Scripted {
        available: bool,
        permission: PermissionScript,
        initial: Result<Fix, WatchError>,
        events: Mutex<Vec<WatchEvent>>,
        watch_established: AtomicBool,
    }

    impl Scripted {
        fn new(
            permission: PermissionScript,
            initial: Result<Fix, WatchError>,
            events: Vec<WatchEvent>,
        ) -> Arc<Self> {
            Arc::new(Self {
                available: true,
                permission,
                initial,
                events: Mutex::new(events),
                watch_established: AtomicBool::new(false),
            })
        }

        fn watch_established(&self) -> bool {
            self.watch_established.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn permission(&self) -> Result<Permission> {
            match self.permission {
                PermissionScript::State(permission) => Ok(permission),
                PermissionScript::Blocked => Err(Error::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "blocked by policy",
                ))),
            }
        }

        async fn current_fix(&self, _req: FixRequest) -> Result<Fix, WatchError> {
            self.initial.clone()
        }

        async fn watch(&self, _req: FixRequest) -> Result<Watch> {
            self.watch_established.store(true, Ordering::SeqCst);

            let events = std::mem::take(
                &mut *self
                    .events
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            let (events_tx, events_rx) = tokio::sync::mpsc::channel(events.len().max(1));
            for event in events {
                events_tx.try_send(event).expect("scripted channel overflow");
            }
            let (cancel_tx, _cancel_rx) = tokio::sync::oneshot::channel();
            Ok(Watch::new(events_rx, cancel_tx))
        }
    }

    fn browser_environment() -> Environment {
        Environment {
            secure_context: true,
            hostname: "play.example.com".to_owned(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0"
                .to_owned(),
        }
    }

    const START: Fix = Fix::new(40.7128, -74.0060, Some(5.0));
    const JITTER: Fix = Fix::new(40.712_80, -74.006_02, Some(5.0));
    const MOVED: Fix = Fix::new(40.7150, -74.0060, Some(5.0));

    #[tokio::test]
    async fn denied_permission_parks_with_remediation() -> Result<()> {
        let provider = Scripted::new(
            PermissionScript::State(Permission::Denied),
            Err(WatchError::Timeout),
            vec![],
        );
        let mut tracker = Tracker::new(Arc::clone(&provider) as Arc<dyn Provider>, browser_environment());

        tracker.activate().await?;

        assert_eq!(tracker.phase(), Phase::DeniedTerminal);
        assert!(!tracker.is_loading());
        assert!(!provider.watch_established());
        let error = tracker.error().expect("expected a published error");
        assert!(error.contains("denied"));
        assert!(error.contains(Platform::FirefoxDesktop.remediation()));
        Ok(())
    }

    #[tokio::test]
    async fn blocked_policy_parks_with_remediation() -> Result<()> {
        let provider = Scripted::new(PermissionScript::Blocked, Err(WatchError::Timeout), vec![]);
        let mut tracker = Tracker::new(provider as Arc<dyn Provider>, browser_environment());

        tracker.activate().await?;

        assert_eq!(tracker.phase(), Phase::DeniedTerminal);
        let error = tracker.error().expect("expected a published error");
        assert!(error.contains("blocked"));
        Ok(())
    }

    #[tokio::test]
    async fn insecure_context_is_rejected_up_front() {
        let provider = Scripted::new(
            PermissionScript::State(Permission::Granted),
            Ok(START),
            vec![],
        );
        let mut environment = browser_environment();
        environment.secure_context = false;

        let mut tracker = Tracker::new(provider as Arc<dyn Provider>, environment);
        assert!(matches!(
            tracker.activate().await,
            Err(Error::Geo(error::Geo::InsecureContext))
        ));
        assert!(!tracker.is_loading());
    }

    #[tokio::test]
    async fn insecure_localhost_is_allowed() -> Result<()> {
        let provider = Scripted::new(
            PermissionScript::State(Permission::Granted),
            Ok(START),
            vec![],
        );
        let mut environment = browser_environment();
        environment.secure_context = false;
        environment.hostname = "localhost".to_owned();

        let mut tracker = Tracker::new(provider as Arc<dyn Provider>, environment);
        tracker.activate().await?;
        assert_eq!(tracker.current_fix(), Some(START));
        Ok(())
    }

    #[tokio::test]
    async fn missing_capability_is_rejected_up_front() {
        let provider = Arc::new(Scripted {
            available: false,
            permission: PermissionScript::State(Permission::Granted),
            initial: Ok(START),
            events: Mutex::new(vec![]),
            watch_established: AtomicBool::new(false),
        });

        let mut tracker = Tracker::new(provider as Arc<dyn Provider>, browser_environment());
        assert!(matches!(
            tracker.activate().await,
            Err(Error::Geo(error::Geo::Unsupported))
        ));
    }

    #[tokio::test]
    async fn the_watch_applies_the_acceptance_rule() -> Result<()> {
        let provider = Scripted::new(
            PermissionScript::State(Permission::Granted),
            Ok(START),
            vec![
                WatchEvent::Fix(JITTER),
                WatchEvent::Error(WatchError::Timeout),
                WatchEvent::Fix(MOVED),
            ],
        );
        let mut tracker = Tracker::new(provider as Arc<dyn Provider>, browser_environment());

        tracker.activate().await?;
        assert_eq!(tracker.phase(), Phase::Watching);
        tracker.settled().await;

        assert_eq!(tracker.current_fix(), Some(MOVED));
        // The watch timeout must not have produced an error.
        assert_eq!(tracker.error(), None);
        Ok(())
    }

    #[tokio::test]
    async fn revocation_during_the_watch_is_terminal() -> Result<()> {
        let provider = Scripted::new(
            PermissionScript::State(Permission::Granted),
            Ok(START),
            vec![WatchEvent::Error(WatchError::PermissionRevoked)],
        );
        let mut tracker = Tracker::new(provider as Arc<dyn Provider>, browser_environment());

        tracker.activate().await?;
        tracker.settled().await;

        assert_eq!(tracker.phase(), Phase::DeniedTerminal);
        let error = tracker.error().expect("expected a published error");
        assert!(error.contains(Platform::FirefoxDesktop.remediation()));
        Ok(())
    }

    #[tokio::test]
    async fn watch_timeouts_do_not_overwrite_an_earlier_error() -> Result<()> {
        let provider = Scripted::new(
            PermissionScript::State(Permission::Granted),
            Ok(START),
            vec![
                WatchEvent::Error(WatchError::Unavailable("gps is off".to_owned())),
                WatchEvent::Error(WatchError::Timeout),
            ],
        );
        let mut tracker = Tracker::new(provider as Arc<dyn Provider>, browser_environment());

        tracker.activate().await?;
        tracker.settled().await;

        let error = tracker.error().expect("expected a published error");
        assert!(error.contains("gps is off"));
        Ok(())
    }

    #[tokio::test]
    async fn an_initial_timeout_is_surfaced_but_the_watch_still_starts() -> Result<()> {
        let provider = Scripted::new(
            PermissionScript::State(Permission::Granted),
            Err(WatchError::Timeout),
            vec![WatchEvent::Fix(START)],
        );
        let mut tracker = Tracker::new(Arc::clone(&provider) as Arc<dyn Provider>, browser_environment());

        tracker.activate().await?;
        assert!(tracker.error().is_some());
        assert!(!tracker.is_loading());
        assert!(provider.watch_established());

        tracker.settled().await;
        assert_eq!(tracker.current_fix(), Some(START));

        tracker.clear_error();
        assert_eq!(tracker.error(), None);
        Ok(())
    }

    #[tokio::test]
    async fn the_accessor_tracks_the_published_fix() -> Result<()> {
        let provider = Scripted::new(
            PermissionScript::State(Permission::Granted),
            Ok(START),
            vec![],
        );
        let mut tracker = Tracker::new(provider as Arc<dyn Provider>, browser_environment());
        let accessor = tracker.location_accessor();
        assert_eq!(accessor(), None);

        tracker.activate().await?;
        assert_eq!(accessor(), Some(START));
        Ok(())
    }
}
