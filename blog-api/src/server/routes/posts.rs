use crate::server::{
    Result, ServerError, ServerRouter,
    context::{
        ArchiveContext, MediaUrl, POPULAR_POSTS_LIMIT, POPULAR_TAGS_LIMIT, PostDetailContext,
        serialize_post_detail, serialize_posts, serialize_tags,
    },
    json::Json,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use blog_common::model::post::Slug;
use blog_db::store::BlogStore;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(post_detail)
        .typed_get(year_archive)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{slug}/", rejection(ServerError))]
struct PostDetailPath {
    slug: Slug,
}

async fn post_detail(
    PostDetailPath { slug }: PostDetailPath,
    State(store): State<Arc<dyn BlogStore>>,
    State(media): State<MediaUrl>,
) -> Result<Json<PostDetailContext>> {
    let detail = store
        .post_by_slug(&slug)
        .await?
        .ok_or(ServerError::PostBySlugNotFound(slug))?;
    let post_id = detail.post.id;

    let (tags, comments, popular_tags, most_popular_posts) = tokio::try_join!(
        store.post_tags(post_id),
        store.post_comments(post_id),
        store.popular_tags(POPULAR_TAGS_LIMIT),
        store.popular_posts(POPULAR_POSTS_LIMIT),
    )?;

    Ok(Json(PostDetailContext {
        post: serialize_post_detail(detail, comments, tags, &media),
        popular_tags: serialize_tags(popular_tags),
        most_popular_posts: serialize_posts(most_popular_posts, &media),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/archive/{year}/", rejection(ServerError))]
struct YearArchivePath {
    year: i32,
}

async fn year_archive(
    YearArchivePath { year }: YearArchivePath,
    State(store): State<Arc<dyn BlogStore>>,
    State(media): State<MediaUrl>,
) -> Result<Json<ArchiveContext>> {
    let (posts, popular_tags) = tokio::try_join!(
        store.posts_in_year(year),
        store.popular_tags(POPULAR_TAGS_LIMIT),
    )?;

    Ok(Json(ArchiveContext {
        year,
        posts: serialize_posts(posts, &media),
        popular_tags: serialize_tags(popular_tags),
    }))
}
