// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod watch;
pub(crate) mod whoami;

use std::{
    io::{self, Write as _},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::task;
use url::Url;

use crate::{
    error::Result,
    http::{self, navigate::Navigator, transport::Transport},
    session::{self, store::SharedStorage},
};

/// The dependencies every subcommand draws from, wired once at startup.
pub(crate) struct Context {
    pub(crate) base_url: Url,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) storage: SharedStorage,
    pub(crate) navigator: Arc<dyn Navigator>,
    pub(crate) unauthenticated_paths: Vec<String>,
    pub(crate) app_name: String,
    pub(crate) auth_prefix: String,
}

impl Context {
    pub(crate) fn client(&self) -> http::Client {
        http::Client::new(
            self.base_url.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.storage),
            Arc::clone(&self.navigator),
            self.unauthenticated_paths.clone(),
        )
    }

    pub(crate) fn auth(&self, client: Arc<http::Client>) -> session::Auth {
        session::Auth::new(
            client,
            Arc::clone(&self.storage),
            self.app_name.clone(),
            self.auth_prefix.clone(),
        )
    }
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, ctx: Context) -> Result<()>;
}

/// Reads one line of input from the terminal, trimmed.
pub(crate) async fn prompt(label: &str) -> Result<String> {
    let label = label.to_owned();
    task::spawn_blocking(move || -> Result<String> {
        print!("{label}");
        io::stdout().flush()?;
        let mut line = String::new();
        let _bytes = io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_owned())
    })
    .await?
}
