// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use log::warn;

/// Where the user currently is and how to send them somewhere else. In a
/// browser embedding this wraps the window location; the headless variant
/// below is what the CLI runs with.
pub(crate) trait Navigator: Send + Sync {
    fn current_path(&self) -> String;

    fn assign(&self, location: &str);
}

/// A navigator with nowhere to go. Its path is the root, which is always
/// reachable without a session, so an invalidated session never triggers a
/// redirect; the failing call itself is the signal.
pub(crate) struct Headless;

impl Navigator for Headless {
    fn current_path(&self) -> String {
        "/".to_owned()
    }

    fn assign(&self, location: &str) {
        warn!("Your session is no longer valid (a browser would now go to {location})");
    }
}
