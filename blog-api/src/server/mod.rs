use axum::{
    Router,
    extract::{FromRef, Request, rejection::PathRejection},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use blog_common::model::{post::Slug, tag::TagTitle};
use blog_db::store::{BlogStore, DbError};
use context::MediaUrl;
use json::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub mod context;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn BlogStore>,
    pub media_url: MediaUrl,
}

pub fn routes() -> ServerRouter {
    routes::routes()
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(fallback)
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ServerError {
    ServerError::MethodNotAllowed(method, uri)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Method {0} not allowed for {1}")]
    MethodNotAllowed(Method, Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with slug {0} was not found.")]
    PostBySlugNotFound(Slug),
    #[error("Tag titled {0} was not found.")]
    TagByTitleNotFound(TagTitle),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostBySlugNotFound(_)
            | ServerError::TagByTitleNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::JsonResponse(_) | ServerError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::MethodNotAllowed(..) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::{ServerState, context::MediaUrl, routes};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use blog_common::model::{
        comment::CreateComment,
        post::{CreatePost, ImagePath, Post, PostTitle, Slug},
        tag::{CreateTag, TagTitle},
        user::{CreateUser, User, Username},
    };
    use blog_db::{memory::MemoryStore, store::BlogStore};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use time::{UtcDateTime, macros::utc_datetime};
    use tower::ServiceExt;

    async fn user(store: &MemoryStore, name: &str, is_staff: bool) -> User {
        store
            .create_user(&CreateUser {
                username: Username::new(name).unwrap(),
                is_staff,
            })
            .await
            .unwrap()
    }

    async fn post(store: &MemoryStore, author: &User, slug: &str, at: UtcDateTime) -> Post {
        store
            .create_post(&CreatePost {
                title: PostTitle::new(format!("Post {slug}")).unwrap(),
                text: format!("Body of {slug}"),
                slug: Slug::new(slug).unwrap(),
                image: Some(ImagePath::new(format!("{slug}.jpg")).unwrap()),
                published_at: at,
                author: author.id,
            })
            .await
            .unwrap()
    }

    /// Seven posts, two tags and a handful of likes and comments.
    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let admin = user(&store, "admin", true).await;
        let readers = [
            user(&store, "ann", false).await,
            user(&store, "ben", false).await,
            user(&store, "cid", false).await,
        ];

        let mut posts = Vec::new();
        for day in 1..=7 {
            let at = utc_datetime!(2024-03-01 12:00) + time::Duration::days(day);
            posts.push(post(&store, &admin, &format!("post-{day}"), at).await);
        }

        let travel = store
            .create_tag(&CreateTag {
                title: TagTitle::new("Travel").unwrap(),
            })
            .await
            .unwrap();
        let food = store
            .create_tag(&CreateTag {
                title: TagTitle::new("food").unwrap(),
            })
            .await
            .unwrap();
        for post in &posts[..3] {
            store.tag_post(post.id, travel.id).await.unwrap();
        }
        store.tag_post(posts[0].id, food.id).await.unwrap();

        for reader in &readers {
            store.like_post(posts[0].id, reader.id).await.unwrap();
        }
        store.like_post(posts[1].id, readers[0].id).await.unwrap();

        for (hour, reader) in readers.iter().enumerate().rev() {
            store
                .create_comment(&CreateComment {
                    post: posts[0].id,
                    author: reader.id,
                    text: format!("Comment by {}", reader.username),
                    published_at: utc_datetime!(2024-04-01 00:00)
                        + time::Duration::hours(i64::try_from(hour).unwrap()),
                })
                .await
                .unwrap();
        }

        store
    }

    async fn request(store: MemoryStore, method: Method, uri: &str) -> (StatusCode, Value) {
        let state = ServerState {
            store: Arc::new(store),
            media_url: MediaUrl::new("/media/"),
        };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = routes().with_state(state).oneshot(request).await.unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn get(store: MemoryStore, uri: &str) -> (StatusCode, Value) {
        request(store, Method::GET, uri).await
    }

    fn slugs(posts: &Value) -> Vec<&str> {
        posts
            .as_array()
            .unwrap()
            .iter()
            .map(|post| post["slug"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn index_lists_popular_and_fresh_posts() {
        let (status, body) = get(seeded_store().await, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            slugs(&body["most_popular_posts"]),
            ["post-1", "post-2", "post-7", "post-6", "post-5"]
        );
        assert_eq!(
            slugs(&body["page_posts"]),
            ["post-7", "post-6", "post-5", "post-4", "post-3"]
        );
        assert_eq!(
            body["popular_tags"],
            json!([
                { "title": "travel", "posts_with_tag": 3 },
                { "title": "food", "posts_with_tag": 1 },
            ])
        );

        let top = &body["most_popular_posts"][0];
        assert_eq!(top["comments_amount"], 3);
        assert_eq!(top["author"], "admin");
        assert_eq!(top["image_url"], "/media/post-1.jpg");
        assert_eq!(top["first_tag_title"], "food");
        assert_eq!(top["teaser_text"], "Body of post-1");
    }

    #[tokio::test]
    async fn index_of_empty_blog() {
        let (status, body) = get(MemoryStore::new(), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "most_popular_posts": [], "page_posts": [], "popular_tags": [] })
        );
    }

    #[tokio::test]
    async fn post_detail_for_existing_slug() {
        let (status, body) = get(seeded_store().await, "/posts/post-1/").await;

        assert_eq!(status, StatusCode::OK);

        let post = &body["post"];
        assert_eq!(post["title"], "Post post-1");
        assert_eq!(post["text"], "Body of post-1");
        assert_eq!(post["likes_amount"], 3);
        assert_eq!(post["published_at"], "2024-03-02T12:00:00Z");
        assert_eq!(
            post["tags"],
            json!([
                { "title": "travel", "posts_with_tag": 3 },
                { "title": "food", "posts_with_tag": 1 },
            ])
        );

        let authors: Vec<&str> = post["comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|comment| comment["author"].as_str().unwrap())
            .collect();
        assert_eq!(authors, ["ann", "ben", "cid"]);

        assert_eq!(body["most_popular_posts"].as_array().unwrap().len(), 5);
        assert_eq!(body["popular_tags"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn post_detail_for_unknown_slug() {
        let (status, body) = get(seeded_store().await, "/posts/nothing-here/").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "status": 404 }));

        let (status, _) = get(seeded_store().await, "/posts/not%20a%20slug/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tag_filter_lists_tagged_posts() {
        let (status, body) = get(seeded_store().await, "/tags/TRAVEL/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tag"], "travel");
        assert_eq!(slugs(&body["posts"]), ["post-3", "post-2", "post-1"]);
        assert_eq!(body["most_popular_posts"].as_array().unwrap().len(), 5);

        let (status, _) = get(seeded_store().await, "/tags/unknown/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn year_archive_is_chronological() {
        let (status, body) = get(seeded_store().await, "/archive/2024/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["year"], 2024);
        assert_eq!(slugs(&body["posts"]).len(), 7);
        assert_eq!(slugs(&body["posts"])[0], "post-1");

        let (_, body) = get(seeded_store().await, "/archive/2023/").await;
        assert_eq!(body["posts"], json!([]));
    }

    #[tokio::test]
    async fn contacts_and_unknown_routes() {
        let (status, body) = get(MemoryStore::new(), "/contacts/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));

        let (status, body) = get(MemoryStore::new(), "/admin/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "status": 404 }));
    }

    #[tokio::test]
    async fn wrong_method_on_known_route() {
        let (status, body) = request(MemoryStore::new(), Method::POST, "/").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "status": 405 }));

        let (status, body) = request(seeded_store().await, Method::DELETE, "/posts/post-1/").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "status": 405 }));
    }

    #[tokio::test]
    async fn listings_are_capped() {
        let store = MemoryStore::new();
        let admin = user(&store, "admin", true).await;

        let mut tags = Vec::new();
        for title in ["x", "t1", "t2", "t3", "t4", "t5", "t6"] {
            let tag = store
                .create_tag(&CreateTag {
                    title: TagTitle::new(title).unwrap(),
                })
                .await
                .unwrap();
            tags.push(tag);
        }

        for n in 0..25 {
            let at = utc_datetime!(2024-01-01 00:00) + time::Duration::hours(n);
            let post = post(&store, &admin, &format!("p{n:02}"), at).await;
            for tag in &tags {
                store.tag_post(post.id, tag.id).await.unwrap();
            }
        }

        let (status, body) = get(store, "/tags/x/").await;
        assert_eq!(status, StatusCode::OK);

        let expected: Vec<String> = (5..25).rev().map(|n| format!("p{n:02}")).collect();
        assert_eq!(slugs(&body["posts"]), expected);
        assert_eq!(body["popular_tags"].as_array().unwrap().len(), 5);
        assert_eq!(body["most_popular_posts"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn index_caps_popular_tags() {
        let store = MemoryStore::new();
        let admin = user(&store, "admin", true).await;
        let post = post(&store, &admin, "only", utc_datetime!(2024-01-01 00:00)).await;

        for title in ["a", "b", "c", "d", "e", "f", "g"] {
            let tag = store
                .create_tag(&CreateTag {
                    title: TagTitle::new(title).unwrap(),
                })
                .await
                .unwrap();
            store.tag_post(post.id, tag.id).await.unwrap();
        }

        let (_, body) = get(store, "/").await;
        let titles: Vec<&str> = body["popular_tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tag| tag["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["a", "b", "c", "d", "e"]);
    }
}
