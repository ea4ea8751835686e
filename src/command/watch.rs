// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use clap::Parser;
use log::info;
use tokio::{sync::mpsc, time};

use crate::{
    error::Result,
    geo::{self, city, fix::Fix, provider::Replay},
    map::{CameraEvent, Engine, Viewport},
};

/// Replay a recorded track through the location pipeline, printing every
/// accepted position.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// A JSON file containing an array of fixes
    /// (objects with latitude, longitude, and optional accuracy).
    #[clap(value_hint = clap::ValueHint::FilePath)]
    fixes: PathBuf,

    /// Milliseconds between replayed fixes.
    #[clap(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Resolve and print the city each accepted position falls in.
    #[clap(long)]
    resolve_city: bool,
}

/// A map engine for the terminal: it has no screen, so it narrates camera
/// changes instead.
struct TraceEngine;

impl Engine for TraceEngine {
    fn set_center(&self, latitude: f64, longitude: f64) {
        info!("Map centered on {latitude}, {longitude}");
    }

    fn fly_to(&self, latitude: f64, longitude: f64, zoom: Option<f64>) {
        info!("Map flying to {latitude}, {longitude} (zoom {zoom:?})");
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<CameraEvent> {
        // No screen, no user-driven camera events.
        let (_tx, rx) = mpsc::unbounded_channel();
        rx
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, _ctx: super::Context) -> Result<()> {
        let provider = Arc::new(Replay::from_file(
            &self.fixes,
            Duration::from_millis(self.interval_ms),
        )?);
        let environment = geo::Environment {
            secure_context: true,
            hostname: "localhost".to_owned(),
            user_agent: String::new(),
        };

        let mut tracker = geo::Tracker::new(provider, environment);
        tracker.activate().await?;

        let mut viewport = Viewport::new();
        viewport.ensure_engine(|| Arc::new(TraceEngine) as Arc<dyn Engine>);

        let geocoder = reqwest::Client::new();
        let mut published: Option<Fix> = None;
        let mut reported_error: Option<String> = None;

        loop {
            let current = tracker.current_fix();
            if current != published {
                if let Some(fix) = current {
                    viewport.handle_fix(&fix);
                    self.report(&geocoder, &fix).await;
                }
                published = current;
            }

            let error = tracker.error();
            if error != reported_error {
                if let Some(message) = &error {
                    eprintln!("{message}");
                }
                reported_error = error;
            }

            if tracker.is_finished() {
                break;
            }
            time::sleep(Duration::from_millis(self.interval_ms.min(250))).await;
        }

        tracker.deactivate();
        Ok(())
    }
}

impl Command {
    async fn report(&self, geocoder: &reqwest::Client, fix: &Fix) {
        let Some((latitude, longitude)) = fix.coordinates() else {
            return;
        };

        let city = if self.resolve_city {
            city::city_name(geocoder, latitude, longitude).await
        } else {
            None
        };

        match (city, fix.accuracy) {
            (Some(city), Some(accuracy)) => {
                println!("{latitude}, {longitude} (±{accuracy} m, {city})");
            }
            (Some(city), None) => println!("{latitude}, {longitude} ({city})"),
            (None, Some(accuracy)) => println!("{latitude}, {longitude} (±{accuracy} m)"),
            (None, None) => println!("{latitude}, {longitude}"),
        }
    }
}
