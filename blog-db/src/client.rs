use crate::{
    record::{
        AnnotatedPostRecord, CommentRecord, CommentWithAuthorRecord, PostRecord, PostTagRecord,
        TagRecord, TagWithCountRecord, UserRecord, count, to_primitive,
    },
    store::{BlogStore, DbError, Result},
};
use async_trait::async_trait;
use blog_common::model::{
    Id,
    comment::{Comment, CommentWithAuthor, CreateComment},
    post::{CreatePost, ImagePath, Post, PostCard, PostDetail, PostMarker, Slug},
    tag::{CreateTag, Tag, TagMarker, TagTitle, TagWithCount},
    user::{CreateUser, User, UserMarker},
};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar, raw_sql};
use std::collections::HashMap;
use time::{Date, Month, PrimitiveDateTime, Time};
use tracing::{debug, info};

/// Idempotent definition of every table the client queries.
pub const SCHEMA: &str = include_str!("../schema.sql");

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: PgPool,
}

fn sql_id<Marker>(id: Id<Marker>) -> i64 {
    id.get().cast_signed()
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Name of the constraint a failed statement violated, if any.
fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
        {
            db_err.constraint()
        }
        _ => None,
    }
}

/// Start of `year` and start of the following year. The upper bound is
/// `None` for the last representable year.
fn year_bounds(year: i32) -> Option<(PrimitiveDateTime, Option<PrimitiveDateTime>)> {
    let start = Date::from_calendar_date(year, Month::January, 1).ok()?;
    let end = year
        .checked_add(1)
        .and_then(|next| Date::from_calendar_date(next, Month::January, 1).ok());

    Some((
        PrimitiveDateTime::new(start, Time::MIDNIGHT),
        end.map(|end| PrimitiveDateTime::new(end, Time::MIDNIGHT)),
    ))
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn install_schema(&self) -> Result<()> {
        debug!("Installing database schema");
        raw_sql(SCHEMA).execute(&self.pool).await?;

        Ok(())
    }

    /// Attaches comment counts and tags to already fetched posts, keeping
    /// their order. Two grouped queries regardless of the number of posts.
    async fn attach_card_data(&self, records: Vec<AnnotatedPostRecord>) -> Result<Vec<PostCard>> {
        let post_ids: Vec<i64> = records.iter().map(|record| record.post.post_id).collect();

        let comment_counts: HashMap<i64, i64> = query_as::<_, (i64, i64)>(
            "
            SELECT
                comments.post_id,
                COUNT(*) AS comments_count
            FROM
                blog.comments
            WHERE
                comments.post_id = ANY($1)
            GROUP BY
                comments.post_id
            ",
        )
        .bind(post_ids.as_slice())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        let tag_records = query_as::<_, PostTagRecord>(
            "
            SELECT
                post_tags.post_id,
                tags.tag_id,
                tags.title,
                (
                    SELECT COUNT(*)
                    FROM blog.post_tags AS counted
                    WHERE counted.tag_id = tags.tag_id
                ) AS num_posts
            FROM
                blog.post_tags JOIN blog.tags ON tags.tag_id = post_tags.tag_id
            WHERE
                post_tags.post_id = ANY($1)
            ORDER BY
                tags.title
            ",
        )
        .bind(post_ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut tags_by_post: HashMap<i64, Vec<TagWithCount>> = HashMap::new();
        for record in tag_records {
            tags_by_post
                .entry(record.post_id)
                .or_default()
                .push(record.tag.try_into()?);
        }

        records
            .into_iter()
            .map(|record| -> Result<PostCard> {
                let post_id = record.post.post_id;
                let comments_count = count(comment_counts.get(&post_id).copied().unwrap_or(0))?;
                let tags = tags_by_post.remove(&post_id).unwrap_or_default();

                Ok(record.into_card(comments_count, tags)?)
            })
            .collect()
    }
}

#[async_trait]
impl BlogStore for DbClient {
    async fn popular_posts(&self, limit: usize) -> Result<Vec<PostCard>> {
        debug!(limit, "Fetching popular posts");
        let records = query_as::<_, AnnotatedPostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.text,
                posts.slug,
                posts.image,
                posts.published_at,
                posts.author_id,
                users.username AS author_username,
                (
                    SELECT COUNT(*)
                    FROM blog.post_likes
                    WHERE post_likes.post_id = posts.post_id
                ) AS likes
            FROM
                blog.posts JOIN blog.users ON users.user_id = posts.author_id
            ORDER BY
                likes DESC,
                posts.published_at DESC,
                posts.post_id DESC
            LIMIT $1
            ",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        self.attach_card_data(records).await
    }

    async fn fresh_posts(&self, limit: usize) -> Result<Vec<PostCard>> {
        debug!(limit, "Fetching fresh posts");
        let records = query_as::<_, AnnotatedPostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.text,
                posts.slug,
                posts.image,
                posts.published_at,
                posts.author_id,
                users.username AS author_username,
                (
                    SELECT COUNT(*)
                    FROM blog.post_likes
                    WHERE post_likes.post_id = posts.post_id
                ) AS likes
            FROM
                blog.posts JOIN blog.users ON users.user_id = posts.author_id
            ORDER BY
                posts.published_at DESC,
                posts.post_id DESC
            LIMIT $1
            ",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        self.attach_card_data(records).await
    }

    async fn posts_in_year(&self, year: i32) -> Result<Vec<PostCard>> {
        debug!(year, "Fetching posts of year");
        let Some((start, end)) = year_bounds(year) else {
            return Ok(Vec::new());
        };

        let records = query_as::<_, AnnotatedPostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.text,
                posts.slug,
                posts.image,
                posts.published_at,
                posts.author_id,
                users.username AS author_username,
                (
                    SELECT COUNT(*)
                    FROM blog.post_likes
                    WHERE post_likes.post_id = posts.post_id
                ) AS likes
            FROM
                blog.posts JOIN blog.users ON users.user_id = posts.author_id
            WHERE
                posts.published_at >= $1
                AND ($2::timestamp IS NULL OR posts.published_at < $2)
            ORDER BY
                posts.published_at,
                posts.post_id
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        self.attach_card_data(records).await
    }

    async fn tag_posts(&self, tag_id: Id<TagMarker>, limit: usize) -> Result<Vec<PostCard>> {
        debug!(%tag_id, limit, "Fetching posts with tag");
        let records = query_as::<_, AnnotatedPostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.text,
                posts.slug,
                posts.image,
                posts.published_at,
                posts.author_id,
                users.username AS author_username,
                (
                    SELECT COUNT(*)
                    FROM blog.post_likes
                    WHERE post_likes.post_id = posts.post_id
                ) AS likes
            FROM
                blog.posts
                JOIN blog.users ON users.user_id = posts.author_id
                JOIN blog.post_tags ON post_tags.post_id = posts.post_id
            WHERE
                post_tags.tag_id = $1
            ORDER BY
                posts.published_at DESC,
                posts.post_id DESC
            LIMIT $2
            ",
        )
        .bind(sql_id(tag_id))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        self.attach_card_data(records).await
    }

    async fn popular_tags(&self, limit: usize) -> Result<Vec<TagWithCount>> {
        debug!(limit, "Fetching popular tags");
        let records = query_as::<_, TagWithCountRecord>(
            "
            SELECT
                tags.tag_id,
                tags.title,
                COUNT(post_tags.post_id) AS num_posts
            FROM
                blog.tags LEFT JOIN blog.post_tags ON post_tags.tag_id = tags.tag_id
            GROUP BY
                tags.tag_id,
                tags.title
            ORDER BY
                num_posts DESC,
                tags.title
            LIMIT $1
            ",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        let tags = records
            .into_iter()
            .map(TagWithCount::try_from)
            .collect::<Result<_, _>>()?;
        Ok(tags)
    }

    async fn tag_by_title(&self, title: &TagTitle) -> Result<Option<Tag>> {
        debug!(%title, "Fetching tag by title");
        let record = query_as::<_, TagRecord>(
            "
            SELECT
                tags.tag_id,
                tags.title
            FROM
                blog.tags
            WHERE
                tags.title = $1
            ",
        )
        .bind(title.get())
        .fetch_optional(&self.pool)
        .await?;

        let tag = record.map(Tag::try_from).transpose()?;
        Ok(tag)
    }

    async fn post_by_slug(&self, slug: &Slug) -> Result<Option<PostDetail>> {
        debug!(%slug, "Fetching post by slug");
        let record = query_as::<_, AnnotatedPostRecord>(
            "
            SELECT
                posts.post_id,
                posts.title,
                posts.text,
                posts.slug,
                posts.image,
                posts.published_at,
                posts.author_id,
                users.username AS author_username,
                (
                    SELECT COUNT(*)
                    FROM blog.post_likes
                    WHERE post_likes.post_id = posts.post_id
                ) AS likes
            FROM
                blog.posts JOIN blog.users ON users.user_id = posts.author_id
            WHERE
                posts.slug = $1
            ORDER BY
                posts.published_at DESC,
                posts.post_id DESC
            LIMIT 1
            ",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(PostDetail::try_from).transpose()?;
        Ok(post)
    }

    async fn post_tags(&self, post_id: Id<PostMarker>) -> Result<Vec<TagWithCount>> {
        debug!(%post_id, "Fetching tags of post");
        let records = query_as::<_, TagWithCountRecord>(
            "
            SELECT
                tags.tag_id,
                tags.title,
                (
                    SELECT COUNT(*)
                    FROM blog.post_tags AS counted
                    WHERE counted.tag_id = tags.tag_id
                ) AS num_posts
            FROM
                blog.tags JOIN blog.post_tags ON post_tags.tag_id = tags.tag_id
            WHERE
                post_tags.post_id = $1
            ORDER BY
                num_posts DESC,
                tags.title
            ",
        )
        .bind(sql_id(post_id))
        .fetch_all(&self.pool)
        .await?;

        let tags = records
            .into_iter()
            .map(TagWithCount::try_from)
            .collect::<Result<_, _>>()?;
        Ok(tags)
    }

    async fn post_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<CommentWithAuthor>> {
        debug!(%post_id, "Fetching comments of post");
        let records = query_as::<_, CommentWithAuthorRecord>(
            "
            SELECT
                comments.comment_id,
                comments.post_id,
                comments.author_id,
                comments.text,
                comments.published_at,
                users.username AS author_username,
                posts.title AS post_title
            FROM
                blog.comments
                JOIN blog.users ON users.user_id = comments.author_id
                JOIN blog.posts ON posts.post_id = comments.post_id
            WHERE
                comments.post_id = $1
            ORDER BY
                comments.published_at,
                comments.comment_id
            ",
        )
        .bind(sql_id(post_id))
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(CommentWithAuthor::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO blog.users (username, is_staff)
            VALUES ($1, $2)
            RETURNING user_id, username, is_staff
            ",
        )
        .bind(user.username.get())
        .bind(user.is_staff)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match violated_constraint(&err) {
            Some("users_username_key") => DbError::DuplicateUser(user.username.clone()),
            _ => err.into(),
        })?;

        info!(username = %user.username, "Created user");
        Ok(record.try_into()?)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let is_staff = query_scalar::<_, bool>(
            "
            SELECT users.is_staff
            FROM blog.users
            WHERE users.user_id = $1
            ",
        )
        .bind(sql_id(post.author))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::UnknownUser(post.author))?;

        if !is_staff {
            return Err(DbError::AuthorNotStaff(post.author));
        }

        let record = query_as::<_, PostRecord>(
            "
            INSERT INTO blog.posts (title, text, slug, image, published_at, author_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING post_id, title, text, slug, image, published_at, author_id
            ",
        )
        .bind(post.title.get())
        .bind(&post.text)
        .bind(post.slug.get())
        .bind(post.image.as_ref().map_or("", ImagePath::get))
        .bind(to_primitive(post.published_at))
        .bind(sql_id(post.author))
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match violated_constraint(&err) {
            Some("posts_author_fk") => DbError::UnknownUser(post.author),
            _ => err.into(),
        })?;

        info!(slug = %post.slug, "Created post");
        Ok(record.try_into()?)
    }

    async fn create_tag(&self, tag: &CreateTag) -> Result<Tag> {
        let record = query_as::<_, TagRecord>(
            "
            INSERT INTO blog.tags (title)
            VALUES ($1)
            RETURNING tag_id, title
            ",
        )
        .bind(tag.title.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match violated_constraint(&err) {
            Some("tags_title_key") => DbError::DuplicateTag(tag.title.clone()),
            _ => err.into(),
        })?;

        info!(title = %tag.title, "Created tag");
        Ok(record.try_into()?)
    }

    async fn tag_post(&self, post_id: Id<PostMarker>, tag_id: Id<TagMarker>) -> Result<()> {
        query(
            "
            INSERT INTO blog.post_tags (post_id, tag_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(sql_id(post_id))
        .bind(sql_id(tag_id))
        .execute(&self.pool)
        .await
        .map_err(|err| match violated_constraint(&err) {
            Some("post_tags_post_fk") => DbError::UnknownPost(post_id),
            Some("post_tags_tag_fk") => DbError::UnknownTag(tag_id),
            _ => err.into(),
        })?;

        Ok(())
    }

    async fn like_post(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()> {
        query(
            "
            INSERT INTO blog.post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(sql_id(post_id))
        .bind(sql_id(user_id))
        .execute(&self.pool)
        .await
        .map_err(|err| match violated_constraint(&err) {
            Some("post_likes_post_fk") => DbError::UnknownPost(post_id),
            Some("post_likes_user_fk") => DbError::UnknownUser(user_id),
            _ => err.into(),
        })?;

        Ok(())
    }

    async fn unlike_post(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()> {
        query(
            "
            DELETE FROM blog.post_likes
            WHERE post_likes.post_id = $1 AND post_likes.user_id = $2
            ",
        )
        .bind(sql_id(post_id))
        .bind(sql_id(user_id))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let record = query_as::<_, CommentRecord>(
            "
            INSERT INTO blog.comments (post_id, author_id, text, published_at)
            VALUES ($1, $2, $3, $4)
            RETURNING comment_id, post_id, author_id, text, published_at
            ",
        )
        .bind(sql_id(comment.post))
        .bind(sql_id(comment.author))
        .bind(&comment.text)
        .bind(to_primitive(comment.published_at))
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match violated_constraint(&err) {
            Some("comments_post_fk") => DbError::UnknownPost(comment.post),
            Some("comments_author_fk") => DbError::UnknownUser(comment.author),
            _ => err.into(),
        })?;

        Ok(record.try_into()?)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query(
            "
            DELETE FROM blog.posts
            WHERE posts.post_id = $1
            ",
        )
        .bind(sql_id(post_id))
        .execute(&self.pool)
        .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(%post_id, "Deleted post");
        }
        Ok(deleted)
    }
}
