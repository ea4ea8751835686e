// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// How far the device has to move before a new fix is worth publishing.
/// Position jitter below this threshold is discarded.
pub(crate) const MIN_MOVEMENT_METERS: f64 = 25.0;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A single reported geolocation reading. Platform providers may omit any of
/// the fields.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Fix {
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
    pub(crate) accuracy: Option<f64>,
}

impl Fix {
    pub(crate) const fn new(latitude: f64, longitude: f64, accuracy: Option<f64>) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            accuracy,
        }
    }

    /// Both coordinates, when the fix has both.
    pub(crate) fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// Great-circle distance in meters between two points given as
/// (latitude, longitude) degree pairs, using the haversine formula on a mean
/// Earth radius.
pub(crate) fn haversine_distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Whether an incoming fix should replace the currently published one. The
/// first fix ever received always wins; after that, a fix needs both
/// coordinates and at least [`MIN_MOVEMENT_METERS`] of movement.
pub(crate) fn supersedes(current: Option<&Fix>, next: &Fix) -> bool {
    let Some(current) = current else {
        return true;
    };

    let Some(to) = next.coordinates() else {
        return false;
    };

    // A published fix without coordinates carries no position to measure
    // against, so any complete fix replaces it.
    let Some(from) = current.coordinates() else {
        return true;
    };

    haversine_distance(from, to) >= MIN_MOVEMENT_METERS
}
