// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

/// Forget the session on this device.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let client = Arc::new(ctx.client());
        let auth = ctx.auth(client);

        auth.logout().await?;
        println!("Logged out.");
        Ok(())
    }
}
