use std::convert::Infallible;

use sqlx::{Pool, Postgres};
use warp::{filters::BoxedFilter, reply::Response, Filter, Reply};

use crate::jwt::SessionKey;

pub mod catalog;
pub mod recipes;
pub mod reply;
pub mod users;

/// Upper bound for JSON bodies; recipe images travel inline as base64.
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// Everything a handler needs besides the request itself.
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub key: SessionKey,
}

impl Context {
    pub fn new(pool: Pool<Postgres>, key: SessionKey) -> Self {
        Self { pool, key }
    }
}

pub fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

pub fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// The whole HTTP API, with rejections rendered as JSON.
pub fn api(ctx: Context) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let routes: BoxedFilter<(Response,)> = recipes::routes(ctx.clone())
        .or(users::routes(ctx.clone()))
        .unify()
        .or(catalog::routes(ctx))
        .unify()
        .boxed();

    routes.recover(reply::handle_rejection)
}
