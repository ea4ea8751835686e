// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::{sync::mpsc, task};

use crate::geo::fix::Fix;

pub(crate) const DEFAULT_ZOOM: f64 = 16.0;

/// Camera changes reported by the map engine, user-driven or programmatic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum CameraEvent {
    Moved {
        latitude: f64,
        longitude: f64,
        zoom: f64,
    },
    Zoomed {
        zoom: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Camera {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// The rendering engine behind the viewport. Real deployments wrap a map
/// widget; tests and the CLI use lightweight stand-ins.
pub(crate) trait Engine: Send + Sync {
    fn set_center(&self, latitude: f64, longitude: f64);

    fn fly_to(&self, latitude: f64, longitude: f64, zoom: Option<f64>);

    /// Camera events, delivered for the lifetime of the engine instance.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<CameraEvent>;
}

#[derive(Default)]
struct ViewState {
    camera: Camera,
    initially_centered: bool,
}

/// Owns one engine instance's camera. The view recenters on the first
/// complete fix and never again, so later fixes don't fight the user's own
/// panning.
pub(crate) struct Viewport {
    engine: Option<Arc<dyn Engine>>,
    state: Arc<Mutex<ViewState>>,
    mirror: Option<task::JoinHandle<()>>,
}

impl Viewport {
    pub(crate) fn new() -> Self {
        Self {
            engine: None,
            state: Arc::new(Mutex::new(ViewState {
                camera: Camera::default(),
                initially_centered: false,
            })),
            mirror: None,
        }
    }

    /// Constructs the engine on first call; later calls keep the existing
    /// instance and its camera state.
    pub(crate) fn ensure_engine<F>(&mut self, build: F)
    where
        F: FnOnce() -> Arc<dyn Engine>,
    {
        if self.engine.is_some() {
            return;
        }

        let engine = build();
        let mut events = engine.subscribe();
        let state = Arc::clone(&self.state);
        self.mirror = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let mut state = lock(&state);
                match event {
                    CameraEvent::Moved {
                        latitude,
                        longitude,
                        zoom,
                    } => {
                        state.camera = Camera {
                            latitude,
                            longitude,
                            zoom,
                        };
                    }
                    CameraEvent::Zoomed { zoom } => state.camera.zoom = zoom,
                }
            }
        }));
        self.engine = Some(engine);
    }

    /// Feeds a location fix to the viewport. The first complete fix centers
    /// the camera; every later one leaves the camera alone.
    pub(crate) fn handle_fix(&self, fix: &Fix) {
        let Some((latitude, longitude)) = fix.coordinates() else {
            return;
        };
        let Some(engine) = self.engine.as_ref() else {
            return;
        };

        {
            let mut state = lock(&self.state);
            if state.initially_centered {
                return;
            }
            state.initially_centered = true;
        }
        engine.set_center(latitude, longitude);
    }

    pub(crate) fn set_center(&self, latitude: f64, longitude: f64) {
        if let Some(engine) = self.engine.as_ref() {
            engine.set_center(latitude, longitude);
        }
    }

    pub(crate) fn fly_to(&self, latitude: f64, longitude: f64, zoom: Option<f64>) {
        if let Some(engine) = self.engine.as_ref() {
            engine.fly_to(latitude, longitude, zoom);
        }
    }

    pub(crate) fn camera(&self) -> Camera {
        lock(&self.state).camera
    }

    pub(crate) fn is_initially_centered(&self) -> bool {
        lock(&self.state).initially_centered
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        if let Some(mirror) = self.mirror.take() {
            mirror.abort();
        }
    }
}

fn lock(state: &Arc<Mutex<ViewState>>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    struct FakeEngine {
        centers: Mutex<Vec<(f64, f64)>>,
        flights: Mutex<Vec<(f64, f64, Option<f64>)>>,
        events: Mutex<Option<mpsc::UnboundedReceiver<CameraEvent>>>,
    }

    impl FakeEngine {
        fn with_events() -> (Arc<Self>, mpsc::UnboundedSender<CameraEvent>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let engine = Arc::new(Self {
                centers: Mutex::new(Vec::new()),
                flights: Mutex::new(Vec::new()),
                events: Mutex::new(Some(rx)),
            });
            (engine, tx)
        }

        fn centers(&self) -> Vec<(f64, f64)> {
            self.centers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl Engine for FakeEngine {
        fn set_center(&self, latitude: f64, longitude: f64) {
            self.centers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((latitude, longitude));
        }

        fn fly_to(&self, latitude: f64, longitude: f64, zoom: Option<f64>) {
            self.flights
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((latitude, longitude, zoom));
        }

        fn subscribe(&self) -> mpsc::UnboundedReceiver<CameraEvent> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .expect("the fake engine supports a single subscriber")
        }
    }

    #[tokio::test]
    async fn the_engine_is_constructed_exactly_once() {
        let (engine, _events) = FakeEngine::with_events();
        let builds = AtomicUsize::new(0);

        let mut viewport = Viewport::new();
        viewport.ensure_engine(|| {
            let _count = builds.fetch_add(1, Ordering::SeqCst);
            Arc::clone(&engine) as Arc<dyn Engine>
        });
        viewport.ensure_engine(|| {
            let _count = builds.fetch_add(1, Ordering::SeqCst);
            Arc::clone(&engine) as Arc<dyn Engine>
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn only_the_first_complete_fix_centers_the_view() {
        let (engine, _events) = FakeEngine::with_events();
        let mut viewport = Viewport::new();
        viewport.ensure_engine(|| Arc::clone(&engine) as Arc<dyn Engine>);

        // An incomplete fix must not consume the one-time centering.
        viewport.handle_fix(&Fix::default());
        assert!(!viewport.is_initially_centered());

        viewport.handle_fix(&Fix::new(40.7128, -74.0060, None));
        viewport.handle_fix(&Fix::new(40.7150, -74.0060, None));

        assert!(viewport.is_initially_centered());
        assert_eq!(engine.centers(), vec![(40.7128, -74.0060)]);
    }

    #[tokio::test]
    async fn programmatic_camera_moves_do_not_consume_the_centering() {
        let (engine, _events) = FakeEngine::with_events();
        let mut viewport = Viewport::new();
        viewport.ensure_engine(|| Arc::clone(&engine) as Arc<dyn Engine>);

        viewport.set_center(10.0, 20.0);
        viewport.fly_to(30.0, 40.0, Some(12.0));
        assert!(!viewport.is_initially_centered());

        viewport.handle_fix(&Fix::new(40.7128, -74.0060, None));
        assert!(viewport.is_initially_centered());
        assert_eq!(engine.centers(), vec![(10.0, 20.0), (40.7128, -74.0060)]);
    }

    #[tokio::test]
    async fn engine_events_are_mirrored_into_the_camera() {
        let (engine, events) = FakeEngine::with_events();
        let mut viewport = Viewport::new();
        viewport.ensure_engine(|| Arc::clone(&engine) as Arc<dyn Engine>);

        assert_eq!(viewport.camera(), Camera::default());

        events
            .send(CameraEvent::Moved {
                latitude: 40.7128,
                longitude: -74.0060,
                zoom: 14.0,
            })
            .expect("the mirror task must be listening");
        events
            .send(CameraEvent::Zoomed { zoom: 12.0 })
            .expect("the mirror task must be listening");

        // Give the mirror task a chance to drain the channel.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let camera = viewport.camera();
        assert_eq!(camera.latitude, 40.7128);
        assert_eq!(camera.longitude, -74.0060);
        assert_eq!(camera.zoom, 12.0);
    }
}
