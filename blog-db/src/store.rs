use async_trait::async_trait;
use blog_common::model::{
    Id, ModelValidationError,
    comment::{Comment, CommentWithAuthor, CreateComment},
    post::{CreatePost, Post, PostCard, PostDetail, PostMarker, Slug},
    tag::{CreateTag, Tag, TagMarker, TagTitle, TagWithCount},
    user::{CreateUser, User, UserMarker, Username},
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A user named {0} already exists")]
    DuplicateUser(Username),
    #[error("A tag titled {0} already exists")]
    DuplicateTag(TagTitle),
    #[error("User with id {0} is not staff and cannot author posts")]
    AuthorNotStaff(Id<UserMarker>),
    #[error("User with id {0} does not exist")]
    UnknownUser(Id<UserMarker>),
    #[error("Post with id {0} does not exist")]
    UnknownPost(Id<PostMarker>),
    #[error("Tag with id {0} does not exist")]
    UnknownTag(Id<TagMarker>),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Storage of posts, tags, comments and likes.
///
/// Every listing returning [`PostCard`]s attaches the author name, the like
/// count, the comment count and the post's tags annotated with their post
/// counts, ordered by title.
#[async_trait]
pub trait BlogStore: Send + Sync {
    /// Most liked posts first.
    async fn popular_posts(&self, limit: usize) -> Result<Vec<PostCard>>;

    /// Newest posts first.
    async fn fresh_posts(&self, limit: usize) -> Result<Vec<PostCard>>;

    /// Posts published during the UTC calendar `year`, oldest first.
    async fn posts_in_year(&self, year: i32) -> Result<Vec<PostCard>>;

    /// Newest posts carrying the tag.
    async fn tag_posts(&self, tag_id: Id<TagMarker>, limit: usize) -> Result<Vec<PostCard>>;

    /// Tags annotated with their post counts, most used first.
    async fn popular_tags(&self, limit: usize) -> Result<Vec<TagWithCount>>;

    async fn tag_by_title(&self, title: &TagTitle) -> Result<Option<Tag>>;

    /// Slugs are not unique; the most recently published match wins.
    async fn post_by_slug(&self, slug: &Slug) -> Result<Option<PostDetail>>;

    /// Tags of one post, most used first.
    async fn post_tags(&self, post_id: Id<PostMarker>) -> Result<Vec<TagWithCount>>;

    /// Comments of one post, oldest first.
    async fn post_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<CommentWithAuthor>>;

    async fn create_user(&self, user: &CreateUser) -> Result<User>;

    /// Fails with [`DbError::AuthorNotStaff`] unless the author is staff.
    async fn create_post(&self, post: &CreatePost) -> Result<Post>;

    async fn create_tag(&self, tag: &CreateTag) -> Result<Tag>;

    /// Attaching a tag twice is a no-op.
    async fn tag_post(&self, post_id: Id<PostMarker>, tag_id: Id<TagMarker>) -> Result<()>;

    /// Liking a post twice is a no-op.
    async fn like_post(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()>;

    async fn unlike_post(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()>;

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment>;

    /// Removes the post with its comments, likes and tag links. Returns
    /// whether the post existed.
    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool>;
}
