use serde::Deserialize;
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter};

use super::{json_body, reply::json_reply, with_context, Context};
use crate::{
    actions::{create_ingredient, create_tag, get_ingredient, get_tag, list_ingredients, list_tags},
    form::{IngredientForm, TagForm},
    jwt::SessionData,
    middleware::with_session,
    schema::Id,
};

#[derive(Deserialize, Debug, Default)]
struct IngredientSearch {
    name: Option<String>,
}

/// Tags and ingredients. Reads are public, creation is admin only.
pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    tags(ctx.clone()).or(ingredients(ctx)).unify().boxed()
}

fn tags(ctx: Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .then(|ctx: Context| async move { json_reply(list_tags(&ctx.pool).await, StatusCode::OK) });

    let detail = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .then(|id: Id, ctx: Context| async move {
            json_reply(get_tag(id, &ctx.pool).await, StatusCode::OK)
        });

    let create = warp::path!("tags")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(json_body::<TagForm>())
        .and(with_context(ctx))
        .then(|session: SessionData, form: TagForm, ctx: Context| async move {
            json_reply(create_tag(&session, form, &ctx.pool).await, StatusCode::CREATED)
        });

    list.or(detail).unify().or(create).unify().boxed()
}

fn ingredients(ctx: Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientSearch>())
        .and(with_context(ctx.clone()))
        .then(|search: IngredientSearch, ctx: Context| async move {
            json_reply(
                list_ingredients(search.name.as_deref(), &ctx.pool).await,
                StatusCode::OK,
            )
        });

    let detail = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .then(|id: Id, ctx: Context| async move {
            json_reply(get_ingredient(id, &ctx.pool).await, StatusCode::OK)
        });

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(json_body::<IngredientForm>())
        .and(with_context(ctx))
        .then(|session: SessionData, form: IngredientForm, ctx: Context| async move {
            json_reply(
                create_ingredient(&session, form, &ctx.pool).await,
                StatusCode::CREATED,
            )
        });

    list.or(detail).unify().or(create).unify().boxed()
}
