/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::env::var;

use actix_web::{web, App, HttpServer};
use matching_service::{
    domain::api,
    environment::{read_dhall_config, AppState},
    middleware::*,
    tools::{error::AppError, prometheus::prometheus_metrics},
};
use shared::utils::logger::*;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn start_server() -> std::io::Result<()> {
    let dhall_config_path = var("DHALL_CONFIG")
        .unwrap_or_else(|_| "./dhall_config/matching_service.dhall".to_string());
    let app_config = read_dhall_config(&dhall_config_path)
        .map(|config| config.apply_env_overrides())
        .unwrap_or_else(|err| {
            println!("Dhall Config Reading Error : {}", err);
            std::process::exit(1);
        });
    if let Err(err) = app_config.validate() {
        println!("Invalid Config : {}", err);
        std::process::exit(1);
    }

    let _guard = setup_tracing("matching-service", app_config.logger_cfg);

    let (host, port, workers) = (
        app_config.host.to_owned(),
        app_config.port,
        app_config.workers,
    );

    let data = web::Data::new(AppState::new(app_config));

    info!(tag = "[Server Start]", %host, port, workers);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _| {
                warn!(tag = "[Invalid Request Body]", error = %err);
                AppError::InvalidRequest("Invalid request body".to_string()).into()
            }))
            .wrap(JwtAuth)
            .wrap(CheckContentLength::default())
            .wrap(RequestTimeout::default())
            .wrap(IncomingRequestMetrics)
            .wrap(TracingLogger::<DomainRootSpanBuilder>::new())
            .wrap(prometheus_metrics())
            .configure(api::handler)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await?;

    info!(tag = "[Server Stopped]");

    Ok(())
}

fn main() {
    start_server().expect("Failed to start the server");
}
