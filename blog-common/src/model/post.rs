use crate::model::{
    Id, bounded,
    tag::TagWithCount,
    user::{UserMarker, Username},
    validated_string,
};
use std::fmt::{Display, Formatter};
use time::UtcDateTime;

pub const POST_TITLE_MAX_LEN: usize = 200;
pub const SLUG_MAX_LEN: usize = 200;
pub const TEASER_LEN: usize = 200;
pub const IMAGE_PATH_MAX_LEN: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

validated_string!(PostTitle => normalize_post_title);

validated_string!(
    /// URL slug of a post: ASCII letters, digits, `-` and `_`.
    ///
    /// Slugs are the external lookup key but are not unique.
    Slug => normalize_slug
);

validated_string!(
    /// Path of an uploaded image relative to the media root.
    ImagePath => normalize_image_path
);

fn normalize_post_title(value: &str) -> Option<String> {
    bounded(value, POST_TITLE_MAX_LEN)
}

fn normalize_image_path(value: &str) -> Option<String> {
    bounded(value, IMAGE_PATH_MAX_LEN)
}

fn normalize_slug(value: &str) -> Option<String> {
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid_chars {
        bounded(value, SLUG_MAX_LEN)
    } else {
        None
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: PostTitle,
    pub text: String,
    pub slug: Slug,
    pub image: Option<ImagePath>,
    pub published_at: UtcDateTime,
    pub author_id: Id<UserMarker>,
}

/// A post as shown in listings: author, tag and comment data attached.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostCard {
    pub post: Post,
    pub author: Username,
    pub likes: u64,
    pub comments_count: u64,
    /// Ordered by title.
    pub tags: Vec<TagWithCount>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostDetail {
    pub post: Post,
    pub author: Username,
    pub likes: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub title: PostTitle,
    pub text: String,
    pub slug: Slug,
    pub image: Option<ImagePath>,
    pub published_at: UtcDateTime,
    pub author: Id<UserMarker>,
}

impl Post {
    #[must_use]
    pub fn absolute_url(&self) -> String {
        format!("/posts/{}/", self.slug)
    }

    #[must_use]
    pub fn teaser(&self) -> &str {
        teaser(&self.text)
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.title, f)
    }
}

/// The first [`TEASER_LEN`] characters of `text`.
#[must_use]
pub fn teaser(text: &str) -> &str {
    match text.char_indices().nth(TEASER_LEN) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{
        IMAGE_PATH_MAX_LEN, ImagePath, Post, PostTitle, SLUG_MAX_LEN, Slug, TEASER_LEN, teaser,
    };
    use time::macros::utc_datetime;

    #[test]
    fn slug_validation() {
        assert!(Slug::new("hello-world_2").is_ok());
        assert!(Slug::new("").is_err());
        assert!(Slug::new("hello world").is_err());
        assert!(Slug::new("привет").is_err());
        assert!(Slug::new("a/b").is_err());
        assert!(Slug::new("s".repeat(SLUG_MAX_LEN)).is_ok());
        assert!(Slug::new("s".repeat(SLUG_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn image_path_fits_column() {
        assert!(ImagePath::new("covers/cat.jpg").is_ok());
        assert!(ImagePath::new("").is_err());
        assert!(ImagePath::new("i".repeat(IMAGE_PATH_MAX_LEN)).is_ok());
        assert!(ImagePath::new("i".repeat(IMAGE_PATH_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn teaser_counts_characters() {
        assert_eq!(teaser("short"), "short");

        let ascii = "a".repeat(TEASER_LEN + 50);
        assert_eq!(teaser(&ascii).len(), TEASER_LEN);

        let cyrillic = "ж".repeat(TEASER_LEN + 1);
        let cut = teaser(&cyrillic);
        assert_eq!(cut.chars().count(), TEASER_LEN);
        assert_eq!(cut.len(), TEASER_LEN * 'ж'.len_utf8());
    }

    #[test]
    fn post_url_and_display() {
        let post = Post {
            id: 1.into(),
            title: PostTitle::new("First steps").unwrap(),
            text: "Text".to_owned(),
            slug: Slug::new("first-steps").unwrap(),
            image: None,
            published_at: utc_datetime!(2024-03-01 12:00),
            author_id: 1.into(),
        };

        assert_eq!(post.absolute_url(), "/posts/first-steps/");
        assert_eq!(post.to_string(), "First steps");
        assert_eq!(post.teaser(), "Text");
    }
}
