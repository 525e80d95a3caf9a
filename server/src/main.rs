use drive_registry::{AppConfig, AppContext};
use rocket::figment::Figment;
use rocket::{catchers, routes, Build, Rocket};
use tracing::info;

mod cors;
mod routes;

#[cfg(test)]
mod tests;

/// Rocket's own figment (Rocket.toml, ROCKET_* variables) plus a plain `PORT`.
fn figment() -> Figment {
    let figment = rocket::Config::figment();
    match std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        Some(port) => figment.merge(("port", port)),
        None => figment,
    }
}

fn build(figment: Figment, ctx: AppContext) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(ctx)
        .attach(cors::Cors)
        .mount(
            "/",
            routes![
                routes::upload,
                routes::grant_access,
                routes::files,
                routes::files_for_email,
                cors::preflight,
            ],
        )
        .register("/", catchers![routes::json_catcher])
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let figment = figment();
    let config: AppConfig = figment.extract()?;
    info!(
        folder_id = %config.folder_id,
        store = %config.store_path.display(),
        staging = %config.staging_dir.display(),
        "Starting upload registry"
    );

    let ctx = AppContext::from_config(config).await?;
    build(figment, ctx).launch().await?;
    Ok(())
}
