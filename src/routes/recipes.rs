use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reply::{self, Response},
    Filter, Reply,
};

use super::{
    json_body,
    reply::{empty_reply, error_reply, json_reply},
    with_context, Context,
};
use crate::{
    actions::{
        add_recipe_relation, create_recipe, delete_recipe, fetch_recipes, get_recipe_view,
        remove_recipe_relation, update_recipe, RecipeRelation,
    },
    constants::SHOPPING_LIST_FILENAME,
    filter::RecipeFilter,
    form::RecipeForm,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    schema::Id,
    shopping_list::build_shopping_list,
};

pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    list(ctx.clone())
        .or(create(ctx.clone()))
        .unify()
        .or(download_shopping_cart(ctx.clone()))
        .unify()
        .or(detail(ctx.clone()))
        .unify()
        .or(update(ctx.clone()))
        .unify()
        .or(remove(ctx.clone()))
        .unify()
        .or(relation(ctx.clone(), "favorite", RecipeRelation::Favorites))
        .unify()
        .or(relation(ctx, "shopping_cart", RecipeRelation::ShoppingCart))
        .unify()
        .boxed()
}

fn list(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("recipes")
        .and(warp::get())
        .and(with_possible_session(ctx.key.clone()))
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_context(ctx))
        .then(
            |session: Option<SessionData>, pairs: Vec<(String, String)>, ctx: Context| async move {
                let (filter, page) = match RecipeFilter::from_pairs(&pairs) {
                    Ok(parsed) => parsed,
                    Err(e) => return error_reply(e.into()),
                };
                let caller = session.map(|s| s.user_id);

                json_reply(
                    fetch_recipes(&filter, page, caller, "/recipes/", &ctx.pool).await,
                    StatusCode::OK,
                )
            },
        )
        .boxed()
}

fn create(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("recipes")
        .and(warp::post())
        .and(with_session(ctx.key.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_context(ctx))
        .then(|session: SessionData, form: RecipeForm, ctx: Context| async move {
            json_reply(
                create_recipe(&session, form, &ctx.pool).await,
                StatusCode::CREATED,
            )
        })
        .boxed()
}

fn download_shopping_cart(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .then(|session: SessionData, ctx: Context| async move {
            match build_shopping_list(&session, &ctx.pool).await {
                Ok(list) => reply::with_header(
                    list.render(),
                    "Content-Disposition",
                    format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
                )
                .into_response(),
                Err(e) => error_reply(e),
            }
        })
        .boxed()
}

fn detail(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx))
        .then(|id: Id, session: Option<SessionData>, ctx: Context| async move {
            let caller = session.map(|s| s.user_id);
            json_reply(get_recipe_view(id, caller, &ctx.pool).await, StatusCode::OK)
        })
        .boxed()
}

/// PUT replaces the recipe and needs every field, PATCH only touches
/// the fields present in the body.
fn update(ctx: Context) -> BoxedFilter<(Response,)> {
    let put = warp::put().map(|| false);
    let patch = warp::patch().map(|| true);

    warp::path!("recipes" / Id)
        .and(put.or(patch).unify())
        .and(with_session(ctx.key.clone()))
        .and(json_body::<RecipeForm>())
        .and(with_context(ctx))
        .then(
            |id: Id, partial: bool, session: SessionData, form: RecipeForm, ctx: Context| async move {
                json_reply(
                    update_recipe(&session, id, form, partial, &ctx.pool).await,
                    StatusCode::OK,
                )
            },
        )
        .boxed()
}

fn remove(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .then(|id: Id, session: SessionData, ctx: Context| async move {
            empty_reply(delete_recipe(&session, id, &ctx.pool).await)
        })
        .boxed()
}

/// `recipes/{id}/{segment}`: GET or POST adds, DELETE removes.
fn relation(ctx: Context, segment: &'static str, relation: RecipeRelation) -> BoxedFilter<(Response,)> {
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = path
        .clone()
        .and(warp::get().or(warp::post()).unify())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx.clone()))
        .then(move |id: Id, session: SessionData, ctx: Context| async move {
            json_reply(
                add_recipe_relation(relation, &session, id, &ctx.pool).await,
                StatusCode::CREATED,
            )
        });

    let remove = path
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .then(move |id: Id, session: SessionData, ctx: Context| async move {
            empty_reply(remove_recipe_relation(relation, &session, id, &ctx.pool).await)
        });

    add.or(remove).unify().boxed()
}
