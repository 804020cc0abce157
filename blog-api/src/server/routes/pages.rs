use crate::server::{
    Result, ServerError, ServerRouter,
    context::{
        ContactsContext, FRESH_POSTS_LIMIT, IndexContext, MediaUrl, POPULAR_POSTS_LIMIT,
        POPULAR_TAGS_LIMIT, serialize_posts, serialize_tags,
    },
    json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blog_db::store::BlogStore;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_get(contacts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct IndexPath();

async fn index(
    IndexPath(): IndexPath,
    State(store): State<Arc<dyn BlogStore>>,
    State(media): State<MediaUrl>,
) -> Result<Json<IndexContext>> {
    let (most_popular_posts, page_posts, popular_tags) = tokio::try_join!(
        store.popular_posts(POPULAR_POSTS_LIMIT),
        store.fresh_posts(FRESH_POSTS_LIMIT),
        store.popular_tags(POPULAR_TAGS_LIMIT),
    )?;

    Ok(Json(IndexContext {
        most_popular_posts: serialize_posts(most_popular_posts, &media),
        page_posts: serialize_posts(page_posts, &media),
        popular_tags: serialize_tags(popular_tags),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/contacts/", rejection(ServerError))]
struct ContactsPath();

async fn contacts(ContactsPath(): ContactsPath) -> Json<ContactsContext> {
    Json(ContactsContext {})
}
