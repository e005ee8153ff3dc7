use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::error::ApiError;
use crate::handlers::{catalog, public};
use crate::middleware::authenticate;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let api = &state.config.api;

    let mut router = Router::new()
        .route(
            "/v1/healthcheck",
            get(public::healthcheck).fallback(method_not_allowed),
        )
        .merge(account_routes())
        .merge(group_routes())
        .merge(album_routes())
        .merge(song_routes())
        .fallback(not_found)
        // Global middleware. `authenticate` must wrap CORS, which replaces
        // any `Vary` header set inside it. Body size is capped by `JsonBody`.
        .layer(cors_layer(&state.config.security.cors_trusted_origins))
        .layer(from_fn_with_state(state.clone(), authenticate));

    if api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/users",
            post(public::register_user).fallback(method_not_allowed),
        )
        .route(
            "/v1/users/activated",
            put(public::activate_user).fallback(method_not_allowed),
        )
        .route(
            "/v1/tokens/login",
            post(public::create_authentication_token).fallback(method_not_allowed),
        )
}

fn group_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/groups",
            get(catalog::list_groups)
                .post(catalog::create_group)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/groups/:id",
            get(catalog::show_group)
                .put(catalog::update_group)
                .delete(catalog::delete_group)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/groups/:id/albums",
            get(catalog::list_group_albums).fallback(method_not_allowed),
        )
}

fn album_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/albums",
            get(catalog::list_albums)
                .post(catalog::create_album)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/albums/:id",
            get(catalog::show_album)
                .put(catalog::update_album)
                .delete(catalog::delete_album)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/albums/:id/songs",
            get(catalog::list_album_songs).fallback(method_not_allowed),
        )
}

fn song_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/songs",
            get(catalog::list_songs)
                .post(catalog::create_song)
                .fallback(method_not_allowed),
        )
        .route(
            "/v1/songs/:id",
            get(catalog::show_song)
                .put(catalog::update_song)
                .delete(catalog::delete_song)
                .fallback(method_not_allowed),
        )
}

fn cors_layer(trusted_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = trusted_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring unusable CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::OPTIONS, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::method_not_allowed(method.as_str())
}
