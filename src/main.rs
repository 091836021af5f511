use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use auto_directory::config::AppConfig;
use auto_directory::handlers;
use auto_directory::provider::supabase::SupabaseFactory;
use auto_directory::state::AppState;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;
    let auth_cookie_name = config.auth_cookie_name()?;
    let factory = Arc::new(SupabaseFactory::new(&config));

    let state = web::Data::new(AppState {
        auth_cookie_name,
        secure_cookies: config.secure_cookies,
        provider: factory,
    });

    log::info!("auto directory API listening on {}", config.bind_addr);

    HttpServer::new(move || {
        // The browser front end is served separately; it talks to this API
        // cross-origin with credentials.
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}
