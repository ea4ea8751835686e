// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tabled::{settings::Style, Table};

use crate::error::{self, Result};

/// Show the account the stored session belongs to.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let client = Arc::new(ctx.client());
        let auth = ctx.auth(client);

        match auth.restore().await? {
            Some(user) => {
                println!("{}", Table::new([user]).with(Style::rounded()));
                Ok(())
            }
            None => Err(error::Auth::NotAuthenticated.into()),
        }
    }
}
