// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::retry;

const REVERSE_GEOCODE_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct Reverse {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    city: Option<String>,
}

/// Best-effort city name for a pair of coordinates. Lookup failures are
/// logged and read as "no city", never as an error.
pub(crate) async fn city_name(
    client: &reqwest::Client,
    latitude: f64,
    longitude: f64,
) -> Option<String> {
    let result = retry::with_backoff(MAX_ATTEMPTS, BASE_DELAY, || {
        let client = client.clone();
        async move {
            let response = client
                .get(REVERSE_GEOCODE_URL)
                .query(&[
                    ("lat", latitude.to_string()),
                    ("lon", longitude.to_string()),
                    ("format", "json".to_owned()),
                ])
                .send()
                .await?
                .error_for_status()?;

            Ok(response.json::<Reverse>().await?)
        }
    })
    .await;

    match result {
        Ok(reverse) => reverse.address.and_then(|address| address.city),
        Err(e) => {
            warn!("Reverse geocoding failed: {e}");
            None
        }
    }
}
