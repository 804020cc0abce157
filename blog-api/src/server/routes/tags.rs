use crate::server::{
    Result, ServerError, ServerRouter,
    context::{
        MediaUrl, POPULAR_POSTS_LIMIT, POPULAR_TAGS_LIMIT, TAG_POSTS_LIMIT, TagFilterContext,
        serialize_posts, serialize_tags,
    },
    json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blog_common::model::tag::TagTitle;
use blog_db::store::BlogStore;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(tag_filter)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/tags/{tag_title}/", rejection(ServerError))]
struct TagFilterPath {
    /// Lowercased on extraction, so `/tags/Rust/` finds `rust`.
    tag_title: TagTitle,
}

async fn tag_filter(
    TagFilterPath { tag_title }: TagFilterPath,
    State(store): State<Arc<dyn BlogStore>>,
    State(media): State<MediaUrl>,
) -> Result<Json<TagFilterContext>> {
    let tag = store
        .tag_by_title(&tag_title)
        .await?
        .ok_or(ServerError::TagByTitleNotFound(tag_title))?;

    let (posts, popular_tags, most_popular_posts) = tokio::try_join!(
        store.tag_posts(tag.id, TAG_POSTS_LIMIT),
        store.popular_tags(POPULAR_TAGS_LIMIT),
        store.popular_posts(POPULAR_POSTS_LIMIT),
    )?;

    Ok(Json(TagFilterContext {
        tag: tag.title.into_inner(),
        popular_tags: serialize_tags(popular_tags),
        posts: serialize_posts(posts, &media),
        most_popular_posts: serialize_posts(most_popular_posts, &media),
    }))
}
