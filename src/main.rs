use std::error::Error;

use foodgram::{
    jwt::SessionKey,
    routes::{api, Context},
    Config, MIGRATOR,
};
use log::info;
use sqlx::postgres::PgPoolOptions;
use warp::Filter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;
    info!("Database migrated");

    let key = SessionKey::new(config.jwt_secret.as_bytes(), config.session_hours);
    let ctx = Context::new(pool, key);

    info!("Listening on {}", config.address());
    warp::serve(api(ctx).with(warp::log("foodgram")))
        .run(config.address())
        .await;

    Ok(())
}
