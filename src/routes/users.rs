use serde::Deserialize;
use serde_json::json;
use warp::{filters::BoxedFilter, http::StatusCode, reply::Response, Filter};

use super::{
    json_body,
    reply::{empty_reply, error_reply, json_reply},
    with_context, Context,
};
use crate::{
    actions::{
        fetch_user_profiles, follow_user, get_user_profile, list_subscriptions, login_user,
        register_user, unfollow_user,
    },
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    form::{LoginForm, RegisterForm},
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageQuery,
    schema::Id,
};

#[derive(Deserialize, Debug, Default)]
struct SubscriptionQuery {
    page: Option<i64>,
    limit: Option<i64>,
    recipes_limit: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
struct RecipesLimitQuery {
    recipes_limit: Option<usize>,
}

pub fn routes(ctx: Context) -> BoxedFilter<(Response,)> {
    register(ctx.clone())
        .or(login(ctx.clone()))
        .unify()
        .or(list(ctx.clone()))
        .unify()
        .or(me(ctx.clone()))
        .unify()
        .or(subscriptions(ctx.clone()))
        .unify()
        .or(profile(ctx.clone()))
        .unify()
        .or(subscribe(ctx.clone()))
        .unify()
        .or(unsubscribe(ctx))
        .unify()
        .boxed()
}

fn register(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("users")
        .and(warp::post())
        .and(json_body::<RegisterForm>())
        .and(with_context(ctx))
        .then(|form: RegisterForm, ctx: Context| async move {
            json_reply(register_user(form, &ctx.pool).await, StatusCode::CREATED)
        })
        .boxed()
}

fn login(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body::<LoginForm>())
        .and(with_context(ctx))
        .then(|form: LoginForm, ctx: Context| async move {
            match login_user(&form.email, &form.password, &ctx.key, &ctx.pool).await {
                Ok(token) => json_reply(Ok(json!({ "auth_token": token })), StatusCode::OK),
                Err(e) => error_reply(e),
            }
        })
        .boxed()
}

fn list(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("users")
        .and(warp::get())
        .and(with_possible_session(ctx.key.clone()))
        .and(warp::query::<PageQuery>())
        .and(with_context(ctx))
        .then(|session: Option<SessionData>, page: PageQuery, ctx: Context| async move {
            let caller = session.map(|s| s.user_id);
            json_reply(
                fetch_user_profiles(caller, page, "/users/", &ctx.pool).await,
                StatusCode::OK,
            )
        })
        .boxed()
}

fn me(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .then(|session: SessionData, ctx: Context| async move {
            json_reply(
                get_user_profile(session.user_id, Some(session.user_id), &ctx.pool).await,
                StatusCode::OK,
            )
        })
        .boxed()
}

fn subscriptions(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_session(ctx.key.clone()))
        .and(warp::query::<SubscriptionQuery>())
        .and(with_context(ctx))
        .then(|session: SessionData, query: SubscriptionQuery, ctx: Context| async move {
            let page = PageQuery {
                page: query.page,
                limit: query.limit.or(Some(SUBSCRIPTION_COUNT_PER_PAGE)),
            };

            json_reply(
                list_subscriptions(
                    &session,
                    page,
                    query.recipes_limit,
                    "/users/subscriptions/",
                    &ctx.pool,
                )
                .await,
                StatusCode::OK,
            )
        })
        .boxed()
}

fn profile(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.key.clone()))
        .and(with_context(ctx))
        .then(|id: Id, session: Option<SessionData>, ctx: Context| async move {
            let caller = session.map(|s| s.user_id);
            json_reply(get_user_profile(id, caller, &ctx.pool).await, StatusCode::OK)
        })
        .boxed()
}

fn subscribe(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("users" / Id / "subscribe")
        .and(warp::get().or(warp::post()).unify())
        .and(with_session(ctx.key.clone()))
        .and(warp::query::<RecipesLimitQuery>())
        .and(with_context(ctx))
        .then(|id: Id, session: SessionData, query: RecipesLimitQuery, ctx: Context| async move {
            json_reply(
                follow_user(&session, id, query.recipes_limit, &ctx.pool).await,
                StatusCode::CREATED,
            )
        })
        .boxed()
}

fn unsubscribe(ctx: Context) -> BoxedFilter<(Response,)> {
    warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(ctx.key.clone()))
        .and(with_context(ctx))
        .then(|id: Id, session: SessionData, ctx: Context| async move {
            empty_reply(unfollow_user(&session, id, &ctx.pool).await)
        })
        .boxed()
}
