use blog_common::model::{
    ModelValidationError,
    comment::{Comment, CommentWithAuthor},
    post::{ImagePath, Post, PostCard, PostDetail, PostTitle, Slug},
    tag::{Tag, TagTitle, TagWithCount},
    user::{User, Username},
};
use sqlx::FromRow;
use time::{PrimitiveDateTime, UtcDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: i64,
    pub title: String,
    pub text: String,
    pub slug: String,
    pub image: String,
    pub published_at: PrimitiveDateTime,
    pub author_id: i64,
}

/// A post joined with its author's name and annotated with its like count.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AnnotatedPostRecord {
    #[sqlx(flatten)]
    pub post: PostRecord,
    pub author_username: String,
    pub likes: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct TagRecord {
    pub tag_id: i64,
    pub title: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct TagWithCountRecord {
    #[sqlx(flatten)]
    pub tag: TagRecord,
    pub num_posts: i64,
}

/// A tag attached to one of several fetched posts.
#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostTagRecord {
    pub post_id: i64,
    #[sqlx(flatten)]
    pub tag: TagWithCountRecord,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub published_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentWithAuthorRecord {
    #[sqlx(flatten)]
    pub comment: CommentRecord,
    pub author_username: String,
    pub post_title: String,
}

pub(crate) fn count(value: i64) -> Result<u64, ModelValidationError> {
    u64::try_from(value).map_err(|_| ModelValidationError::NegativeCount(value))
}

pub(crate) fn to_primitive(value: UtcDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(value.date(), value.time())
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.cast_unsigned().into(),
            username: Username::new(value.username)?,
            is_staff: value.is_staff,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.cast_unsigned().into(),
            title: PostTitle::new(value.title)?,
            text: value.text,
            slug: Slug::new(value.slug)?,
            image: if value.image.is_empty() {
                None
            } else {
                Some(ImagePath::new(value.image)?)
            },
            published_at: value.published_at.as_utc(),
            author_id: value.author_id.cast_unsigned().into(),
        })
    }
}

impl TryFrom<AnnotatedPostRecord> for PostDetail {
    type Error = ModelValidationError;

    fn try_from(value: AnnotatedPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            post: value.post.try_into()?,
            author: Username::new(value.author_username)?,
            likes: count(value.likes)?,
        })
    }
}

impl AnnotatedPostRecord {
    pub(crate) fn into_card(
        self,
        comments_count: u64,
        tags: Vec<TagWithCount>,
    ) -> Result<PostCard, ModelValidationError> {
        let PostDetail {
            post,
            author,
            likes,
        } = self.try_into()?;

        Ok(PostCard {
            post,
            author,
            likes,
            comments_count,
            tags,
        })
    }
}

impl TryFrom<TagRecord> for Tag {
    type Error = ModelValidationError;

    fn try_from(value: TagRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.tag_id.cast_unsigned().into(),
            title: TagTitle::new(value.title)?,
        })
    }
}

impl TryFrom<TagWithCountRecord> for TagWithCount {
    type Error = ModelValidationError;

    fn try_from(value: TagWithCountRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            tag: value.tag.try_into()?,
            num_posts: count(value.num_posts)?,
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_id.cast_unsigned().into(),
            post_id: value.post_id.cast_unsigned().into(),
            author_id: value.author_id.cast_unsigned().into(),
            text: value.text,
            published_at: value.published_at.as_utc(),
        })
    }
}

impl TryFrom<CommentWithAuthorRecord> for CommentWithAuthor {
    type Error = ModelValidationError;

    fn try_from(value: CommentWithAuthorRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            comment: value.comment.try_into()?,
            author: Username::new(value.author_username)?,
            post_title: PostTitle::new(value.post_title)?,
        })
    }
}
