// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

/// Log in (or sign up) with a phone number and a texted one-time code.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The phone number to authenticate, in E.164 format.
    #[clap(long)]
    phone_number: Option<String>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: super::Context) -> Result<()> {
        let client = Arc::new(ctx.client());
        let auth = ctx.auth(client);

        let phone_number = match self.phone_number {
            Some(phone_number) => phone_number,
            None => super::prompt("Phone number: ").await?,
        };

        auth.request_verification_code(&phone_number).await?;
        if auth.is_register() {
            println!("Looks like you're new here; we'll set up an account.");
        }

        let code = super::prompt("Verification code: ").await?;
        let name = if auth.is_register() {
            Some(super::prompt("Your name: ").await?)
        } else {
            None
        };

        let user = auth
            .logister(&phone_number, &code, name.as_deref())
            .await?;

        if auth.is_register() {
            println!("Welcome aboard, {}!", user.name);
        } else {
            println!("Welcome back, {}!", user.name);
        }
        Ok(())
    }
}
