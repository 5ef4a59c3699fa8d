/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::path::PathBuf;

use clap::Parser;
use driver_importer::importer::{run_import, ImportSettings};
use shared::utils::logger::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bulk loads driver locations into the driver location service")]
struct Cli {
    /// CSV file with a `latitude,longitude` header.
    #[arg(long, default_value = "Coordinates.csv")]
    file: PathBuf,

    #[arg(long, env = "DRIVER_LOCATION_BASE_URL", default_value = "http://localhost:8086")]
    base_url: String,

    #[arg(long, env = "MATCHING_API_KEY", default_value = "changeme")]
    api_key: String,

    /// Drivers per request.
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Concurrent requests.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    log_level: LogLevel,
}

impl From<Cli> for ImportSettings {
    fn from(cli: Cli) -> Self {
        ImportSettings {
            file: cli.file,
            base_url: cli.base_url,
            api_key: cli.api_key,
            batch_size: cli.batch_size,
            workers: cli.workers,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let guard = setup_tracing(
        "driver-importer",
        LoggerConfig {
            level: cli.log_level,
            log_to_file: false,
        },
    );

    info!(tag = "[Import Started]", file = %cli.file.display(), base_url = %cli.base_url, batch_size = cli.batch_size, workers = cli.workers);

    match run_import(cli.into()).await {
        Ok(summary) => {
            info!(tag = "[Import Finished]", requested = summary.requested, success = summary.success, error = summary.error);
        }
        Err(err) => {
            error!(tag = "[Import Failed]", error = %err.message());
            drop(guard);
            std::process::exit(1);
        }
    }
}
