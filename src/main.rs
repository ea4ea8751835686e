// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod command;
mod error;
mod geo;
mod http;
mod map;
mod metadata;
mod retry;
mod session;
mod storage;

use std::{process, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use futures_util::lock::Mutex;
use http::{navigate, transport::ReqwestTransport};
use log::{debug, error, warn};
use storage::IsPersistent as _;
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Logout(command::logout::Command),
    Watch(command::watch::Command),
    Whoami(command::whoami::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, ctx: command::Context) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx).await,
            Self::Watch(cmd) => cmd.execute(ctx).await,
            Self::Whoami(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the backend API.
    #[arg(long, env = "WAYFARER_URL", default_value = "http://127.0.0.1:8042", value_parser = Url::parse)]
    url: Url,

    /// The application display name, used to brand verification texts.
    #[arg(long, env = "WAYFARER_APP_NAME", default_value_t = metadata::CLIENT_DISPLAY_NAME.clone())]
    app_name: String,

    /// The path prefix the authentication endpoints live under.
    #[arg(long, env = "WAYFARER_AUTH_PREFIX", default_value = "/authenticator")]
    auth_prefix: String,

    /// Navigation paths reachable without a session, which therefore never
    /// trigger a login redirect. The root and login paths are always
    /// included.
    #[arg(long, env = "WAYFARER_UNAUTHENTICATED_PATHS", value_delimiter = ',')]
    unauthenticated_paths: Vec<String>,

    /// Keep the session in memory only instead of on disk.
    #[arg(long)]
    no_persist_session: bool,

    #[clap(subcommand)]
    command: Command,
}

fn get_session_storage(args: &Args) -> Box<dyn storage::Storage<session::data::Data>> {
    if !args.no_persist_session {
        if let Some(file_storage) = storage::File::in_project_dirs("session.json") {
            return Box::new(file_storage);
        }
        warn!("We need to fall back to in-memory session storage because no per-user data directory is available");
    }

    Box::new(storage::Memory::<session::data::Data>::new())
}

async fn run(args: Args) -> Result<()> {
    let session_storage = get_session_storage(&args);
    if !session_storage.is_persistent() {
        debug!("Sessions will be forgotten when this process exits");
    }

    let ctx = command::Context {
        base_url: args.url.clone(),
        transport: Arc::new(ReqwestTransport::new()),
        storage: Arc::new(Mutex::new(session_storage)),
        navigator: Arc::new(navigate::Headless),
        unauthenticated_paths: args.unauthenticated_paths.clone(),
        app_name: args.app_name.clone(),
        auth_prefix: args.auth_prefix.clone(),
    };

    command::Command::execute(args.command, ctx).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("WAYFARER_LOG", "warn")
        .write_style("WAYFARER_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
