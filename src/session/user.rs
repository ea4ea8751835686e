// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// The backend's view of an account. Held as a read-through cache: populated
/// when a persisted token is verified and replaced wholesale on login or
/// registration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct User {
    #[tabled(rename = "ID")]
    pub(crate) id: String,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[tabled(rename = "Phone Number")]
    pub(crate) phone_number: String,
    #[serde(default)]
    #[tabled(rename = "Username", display_with = "display_option")]
    pub(crate) username: Option<String>,
    #[serde(default)]
    #[tabled(skip)]
    pub(crate) profile_picture_url: Option<String>,
    #[serde(default)]
    #[tabled(rename = "Party", display_with = "display_option")]
    pub(crate) party_id: Option<String>,
}

fn display_option(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
