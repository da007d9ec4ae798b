/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Ferry CLI - operator commands that act directly on the relay store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ferry::DispatcherConfig;
use std::time::Duration;
use tracing::Level;

mod commands;

/// Ferry - a brokered request relay
#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (can also be set via DATABASE_URL environment variable)
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands for managing the relay store
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Delete completed and timed-out requests past retention
    Purge {
        /// Delete requests completed longer ago than this (e.g., "30d", "7d", "24h")
        #[arg(long, default_value = "30d")]
        older_than: String,

        /// Only purge this category
        #[arg(long)]
        category: Option<String>,

        /// Preview what would be deleted without actually deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Create identifier counters for new categories
    Provision {
        /// Category names
        #[arg(required = true)]
        categories: Vec<String>,
    },

    /// List pending requests, oldest first
    Pending,

    /// Return requests claimed longer ago than the threshold to the pending pool
    ReleaseLocks {
        #[arg(long, default_value = "5m")]
        older_than: String,
    },

    /// Mark unclaimed requests older than the threshold as timed out
    ///
    /// Each originator is sent its timeout callback before the command exits.
    Escalate {
        #[arg(long, default_value = "10m")]
        older_than: String,

        /// Per-attempt callback timeout in seconds
        #[arg(long, default_value_t = 5)]
        callback_timeout: u64,

        /// Seconds to wait between callback attempts
        #[arg(long, default_value_t = 2)]
        callback_backoff: u64,

        /// Retries after the first failed callback attempt
        #[arg(long, default_value_t = 3)]
        callback_max_retries: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    ferry::init_logging(cli.verbose.then_some(Level::DEBUG));

    let database_url = cli
        .database_url
        .context("Database URL is required. Set --database-url or DATABASE_URL environment variable")?;

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Purge {
                older_than,
                category,
                dry_run,
            } => {
                commands::purge::run(&database_url, &older_than, category.as_deref(), dry_run)
                    .await?;
            }
            AdminCommands::Provision { categories } => {
                commands::provision::run(&database_url, &categories).await?;
            }
            AdminCommands::Pending => {
                commands::pending::run(&database_url).await?;
            }
            AdminCommands::ReleaseLocks { older_than } => {
                commands::release_locks::run(&database_url, &older_than).await?;
            }
            AdminCommands::Escalate {
                older_than,
                callback_timeout,
                callback_backoff,
                callback_max_retries,
            } => {
                let callbacks = DispatcherConfig::builder()
                    .request_timeout(Duration::from_secs(callback_timeout))
                    .backoff(Duration::from_secs(callback_backoff))
                    .max_retries(callback_max_retries)
                    .build();
                commands::escalate::run(&database_url, &older_than, callbacks).await?;
            }
        },
    }

    Ok(())
}
