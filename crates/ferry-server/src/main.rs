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

//! ferry-server - run the Ferry request relay.

use anyhow::{Context, Result};
use clap::Parser;
use ferry_server::config::{ConfigLoader, Validate};
use std::path::PathBuf;
use tracing::Level;

/// Ferry - a brokered request relay
#[derive(Parser)]
#[command(name = "ferry-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "FERRY_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL, overrides the configuration file
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Listen address, overrides the configuration file (e.g. 0.0.0.0:5000)
    #[arg(long)]
    bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env-backed arguments.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = ConfigLoader::new()
        .load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    config.validate().context("Invalid configuration")?;

    let level = cli.verbose.then_some(Level::DEBUG);
    if config.server.json_logs {
        ferry::init_json_logging(level);
    } else {
        ferry::init_logging(level);
    }

    ferry_server::serve(config, ferry_server::shutdown_signal()).await
}
