// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

use clap::Parser;
use sbmod::cli::Config;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    env_logger::Builder::new()
        .filter_level(config.log_level_filter())
        .parse_default_env()
        .init();
    sbmod::cli::run(config).await
}
