use crate::store::{BlogStore, DbError, Result};
use async_trait::async_trait;
use blog_common::{
    model::{
        Id,
        comment::{Comment, CommentWithAuthor, CreateComment},
        post::{CreatePost, Post, PostCard, PostDetail, PostMarker, Slug},
        tag::{CreateTag, Tag, TagMarker, TagTitle, TagWithCount},
        user::{CreateUser, User, UserMarker},
    },
    ranking::{by_freshness, by_popularity, chronological, tags_by_popularity},
};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A [`BlogStore`] keeping every table in process memory.
///
/// Orderings, annotations and cascades match the Postgres store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: u64,
    users: BTreeMap<Id<UserMarker>, User>,
    posts: BTreeMap<Id<PostMarker>, Post>,
    tags: BTreeMap<Id<TagMarker>, Tag>,
    comments: Vec<Comment>,
    post_tags: BTreeSet<(Id<PostMarker>, Id<TagMarker>)>,
    likes: BTreeSet<(Id<PostMarker>, Id<UserMarker>)>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn next_id<Marker>(&mut self) -> Id<Marker> {
        self.last_id += 1;
        self.last_id.into()
    }

    fn user(&self, id: Id<UserMarker>) -> Result<&User> {
        self.users.get(&id).ok_or(DbError::UnknownUser(id))
    }

    fn likes_of(&self, post_id: Id<PostMarker>) -> u64 {
        self.likes
            .iter()
            .filter(|(liked, _)| *liked == post_id)
            .count() as u64
    }

    fn tag_with_count(&self, tag: &Tag) -> TagWithCount {
        let num_posts = self
            .post_tags
            .iter()
            .filter(|(_, tag_id)| *tag_id == tag.id)
            .count() as u64;

        TagWithCount {
            tag: tag.clone(),
            num_posts,
        }
    }

    fn tags_of(&self, post_id: Id<PostMarker>) -> Vec<TagWithCount> {
        let mut tags: Vec<TagWithCount> = self
            .post_tags
            .iter()
            .filter(|(tagged, _)| *tagged == post_id)
            .filter_map(|(_, tag_id)| self.tags.get(tag_id))
            .map(|tag| self.tag_with_count(tag))
            .collect();
        tags.sort_by(|a, b| a.tag.title.cmp(&b.tag.title));
        tags
    }

    fn detail(&self, post: &Post) -> Result<PostDetail> {
        Ok(PostDetail {
            post: post.clone(),
            author: self.user(post.author_id)?.username.clone(),
            likes: self.likes_of(post.id),
        })
    }

    fn card(&self, post: &Post) -> Result<PostCard> {
        let PostDetail {
            post,
            author,
            likes,
        } = self.detail(post)?;
        let comments_count = self
            .comments
            .iter()
            .filter(|comment| comment.post_id == post.id)
            .count() as u64;
        let tags = self.tags_of(post.id);

        Ok(PostCard {
            post,
            author,
            likes,
            comments_count,
            tags,
        })
    }

    fn cards<'a>(&self, posts: impl IntoIterator<Item = &'a Post>) -> Result<Vec<PostCard>> {
        posts.into_iter().map(|post| self.card(post)).collect()
    }

    fn sorted_posts(&self, order: fn(&Post, &Post) -> std::cmp::Ordering) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.values().collect();
        posts.sort_by(|a, b| order(a, b));
        posts
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn popular_posts(&self, limit: usize) -> Result<Vec<PostCard>> {
        debug!(limit, "Fetching popular posts");
        let tables = self.tables.read().await;

        let mut cards = tables.cards(tables.posts.values())?;
        cards.sort_by(by_popularity);
        cards.truncate(limit);
        Ok(cards)
    }

    async fn fresh_posts(&self, limit: usize) -> Result<Vec<PostCard>> {
        debug!(limit, "Fetching fresh posts");
        let tables = self.tables.read().await;

        let posts = tables.sorted_posts(by_freshness);
        tables.cards(posts.into_iter().take(limit))
    }

    async fn posts_in_year(&self, year: i32) -> Result<Vec<PostCard>> {
        debug!(year, "Fetching posts of year");
        let tables = self.tables.read().await;

        let posts = tables
            .sorted_posts(chronological)
            .into_iter()
            .filter(|post| post.published_at.year() == year);
        tables.cards(posts)
    }

    async fn tag_posts(&self, tag_id: Id<TagMarker>, limit: usize) -> Result<Vec<PostCard>> {
        debug!(%tag_id, limit, "Fetching posts with tag");
        let tables = self.tables.read().await;

        let posts = tables
            .sorted_posts(by_freshness)
            .into_iter()
            .filter(|post| tables.post_tags.contains(&(post.id, tag_id)))
            .take(limit);
        tables.cards(posts)
    }

    async fn popular_tags(&self, limit: usize) -> Result<Vec<TagWithCount>> {
        debug!(limit, "Fetching popular tags");
        let tables = self.tables.read().await;

        let mut tags: Vec<TagWithCount> = tables
            .tags
            .values()
            .map(|tag| tables.tag_with_count(tag))
            .collect();
        tags.sort_by(tags_by_popularity);
        tags.truncate(limit);
        Ok(tags)
    }

    async fn tag_by_title(&self, title: &TagTitle) -> Result<Option<Tag>> {
        debug!(%title, "Fetching tag by title");
        let tables = self.tables.read().await;

        Ok(tables.tags.values().find(|tag| tag.title == *title).cloned())
    }

    async fn post_by_slug(&self, slug: &Slug) -> Result<Option<PostDetail>> {
        debug!(%slug, "Fetching post by slug");
        let tables = self.tables.read().await;

        tables
            .sorted_posts(by_freshness)
            .into_iter()
            .find(|post| post.slug == *slug)
            .map(|post| tables.detail(post))
            .transpose()
    }

    async fn post_tags(&self, post_id: Id<PostMarker>) -> Result<Vec<TagWithCount>> {
        debug!(%post_id, "Fetching tags of post");
        let tables = self.tables.read().await;

        let mut tags = tables.tags_of(post_id);
        tags.sort_by(tags_by_popularity);
        Ok(tags)
    }

    async fn post_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<CommentWithAuthor>> {
        debug!(%post_id, "Fetching comments of post");
        let tables = self.tables.read().await;

        let Some(post) = tables.posts.get(&post_id) else {
            return Ok(Vec::new());
        };

        let mut comments = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| -> Result<CommentWithAuthor> {
                Ok(CommentWithAuthor {
                    comment: comment.clone(),
                    author: tables.user(comment.author_id)?.username.clone(),
                    post_title: post.title.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        comments.sort_by_key(|comment| (comment.comment.published_at, comment.comment.id));
        Ok(comments)
    }

    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .values()
            .any(|existing| existing.username == user.username)
        {
            return Err(DbError::DuplicateUser(user.username.clone()));
        }

        let created = User {
            id: tables.next_id(),
            username: user.username.clone(),
            is_staff: user.is_staff,
        };
        tables.users.insert(created.id, created.clone());

        info!(username = %user.username, "Created user");
        Ok(created)
    }

    async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let mut tables = self.tables.write().await;

        if !tables.user(post.author)?.is_staff {
            return Err(DbError::AuthorNotStaff(post.author));
        }

        let created = Post {
            id: tables.next_id(),
            title: post.title.clone(),
            text: post.text.clone(),
            slug: post.slug.clone(),
            image: post.image.clone(),
            published_at: post.published_at,
            author_id: post.author,
        };
        tables.posts.insert(created.id, created.clone());

        info!(slug = %post.slug, "Created post");
        Ok(created)
    }

    async fn create_tag(&self, tag: &CreateTag) -> Result<Tag> {
        let mut tables = self.tables.write().await;

        if tables.tags.values().any(|existing| existing.title == tag.title) {
            return Err(DbError::DuplicateTag(tag.title.clone()));
        }

        let created = Tag {
            id: tables.next_id(),
            title: tag.title.clone(),
        };
        tables.tags.insert(created.id, created.clone());

        info!(title = %tag.title, "Created tag");
        Ok(created)
    }

    async fn tag_post(&self, post_id: Id<PostMarker>, tag_id: Id<TagMarker>) -> Result<()> {
        let mut tables = self.tables.write().await;

        if !tables.posts.contains_key(&post_id) {
            return Err(DbError::UnknownPost(post_id));
        }
        if !tables.tags.contains_key(&tag_id) {
            return Err(DbError::UnknownTag(tag_id));
        }

        tables.post_tags.insert((post_id, tag_id));
        Ok(())
    }

    async fn like_post(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()> {
        let mut tables = self.tables.write().await;

        if !tables.posts.contains_key(&post_id) {
            return Err(DbError::UnknownPost(post_id));
        }
        tables.user(user_id)?;

        tables.likes.insert((post_id, user_id));
        Ok(())
    }

    async fn unlike_post(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()> {
        let mut tables = self.tables.write().await;

        tables.likes.remove(&(post_id, user_id));
        Ok(())
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let mut tables = self.tables.write().await;

        if !tables.posts.contains_key(&comment.post) {
            return Err(DbError::UnknownPost(comment.post));
        }
        tables.user(comment.author)?;

        let created = Comment {
            id: tables.next_id(),
            post_id: comment.post,
            author_id: comment.author,
            text: comment.text.clone(),
            published_at: comment.published_at,
        };
        tables.comments.push(created.clone());

        Ok(created)
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut tables = self.tables.write().await;

        if tables.posts.remove(&post_id).is_none() {
            return Ok(false);
        }

        tables.comments.retain(|comment| comment.post_id != post_id);
        tables.post_tags.retain(|(tagged, _)| *tagged != post_id);
        tables.likes.retain(|(liked, _)| *liked != post_id);

        info!(%post_id, "Deleted post");
        Ok(true)
    }
}
