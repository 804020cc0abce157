//! Page contexts: the documents each page is rendered from.

use blog_common::model::{
    comment::CommentWithAuthor,
    post::{ImagePath, PostCard, PostDetail},
    tag::TagWithCount,
};
use serde::Serialize;
use std::sync::Arc;
use time::{OffsetDateTime, UtcDateTime};

pub const POPULAR_POSTS_LIMIT: usize = 5;
pub const FRESH_POSTS_LIMIT: usize = 5;
pub const POPULAR_TAGS_LIMIT: usize = 5;
pub const TAG_POSTS_LIMIT: usize = 20;

/// Prefix turning a stored image path into a public URL.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MediaUrl(Arc<str>);

impl MediaUrl {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self(prefix.into())
    }

    #[must_use]
    pub fn image_url(&self, image: Option<&ImagePath>) -> Option<String> {
        image.map(|image| format!("{}{image}", self.0))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct TagSummary {
    pub title: String,
    pub posts_with_tag: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostPreview {
    pub title: String,
    pub teaser_text: String,
    pub author: String,
    pub comments_amount: u64,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub slug: String,
    pub tags: Vec<TagSummary>,
    /// `None` for posts without tags.
    pub first_tag_title: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct CommentView {
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub author: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostView {
    pub title: String,
    pub text: String,
    pub author: String,
    pub comments: Vec<CommentView>,
    pub likes_amount: u64,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub slug: String,
    pub tags: Vec<TagSummary>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct IndexContext {
    pub most_popular_posts: Vec<PostPreview>,
    pub page_posts: Vec<PostPreview>,
    pub popular_tags: Vec<TagSummary>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostDetailContext {
    pub post: PostView,
    pub popular_tags: Vec<TagSummary>,
    pub most_popular_posts: Vec<PostPreview>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct TagFilterContext {
    pub tag: String,
    pub popular_tags: Vec<TagSummary>,
    pub posts: Vec<PostPreview>,
    pub most_popular_posts: Vec<PostPreview>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ArchiveContext {
    pub year: i32,
    pub posts: Vec<PostPreview>,
    pub popular_tags: Vec<TagSummary>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize)]
pub struct ContactsContext {}

fn offset(date_time: UtcDateTime) -> OffsetDateTime {
    OffsetDateTime::new_utc(date_time.date(), date_time.time())
}

#[must_use]
pub fn serialize_tag(tag: TagWithCount) -> TagSummary {
    TagSummary {
        title: tag.tag.title.into_inner(),
        posts_with_tag: tag.num_posts,
    }
}

#[must_use]
pub fn serialize_tags(tags: Vec<TagWithCount>) -> Vec<TagSummary> {
    tags.into_iter().map(serialize_tag).collect()
}

#[must_use]
pub fn serialize_post(card: PostCard, media: &MediaUrl) -> PostPreview {
    let PostCard {
        post,
        author,
        comments_count,
        tags,
        ..
    } = card;

    let tags = serialize_tags(tags);
    let first_tag_title = tags.first().map(|tag| tag.title.clone());

    PostPreview {
        teaser_text: post.teaser().to_owned(),
        image_url: media.image_url(post.image.as_ref()),
        published_at: offset(post.published_at),
        title: post.title.into_inner(),
        author: author.into_inner(),
        comments_amount: comments_count,
        slug: post.slug.into_inner(),
        tags,
        first_tag_title,
    }
}

#[must_use]
pub fn serialize_posts(cards: Vec<PostCard>, media: &MediaUrl) -> Vec<PostPreview> {
    cards
        .into_iter()
        .map(|card| serialize_post(card, media))
        .collect()
}

#[must_use]
pub fn serialize_comment(comment: CommentWithAuthor) -> CommentView {
    CommentView {
        text: comment.comment.text,
        published_at: offset(comment.comment.published_at),
        author: comment.author.into_inner(),
    }
}

#[must_use]
pub fn serialize_post_detail(
    detail: PostDetail,
    comments: Vec<CommentWithAuthor>,
    tags: Vec<TagWithCount>,
    media: &MediaUrl,
) -> PostView {
    let PostDetail {
        post,
        author,
        likes,
    } = detail;

    PostView {
        image_url: media.image_url(post.image.as_ref()),
        published_at: offset(post.published_at),
        title: post.title.into_inner(),
        text: post.text,
        author: author.into_inner(),
        comments: comments.into_iter().map(serialize_comment).collect(),
        likes_amount: likes,
        slug: post.slug.into_inner(),
        tags: serialize_tags(tags),
    }
}
