//! Orderings shared by every store implementation.
//!
//! The SQL store encodes the same orderings in `ORDER BY` clauses; these
//! comparators are the reference for in-memory collections.

use crate::model::{
    post::{Post, PostCard},
    tag::TagWithCount,
};
use std::cmp::{Ordering, Reverse};

/// Most liked first, newest first among equally liked posts.
#[must_use]
pub fn by_popularity(a: &PostCard, b: &PostCard) -> Ordering {
    b.likes
        .cmp(&a.likes)
        .then_with(|| by_freshness(&a.post, &b.post))
}

/// Default post ordering: newest first.
#[must_use]
pub fn by_freshness(a: &Post, b: &Post) -> Ordering {
    (Reverse(a.published_at), Reverse(a.id)).cmp(&(Reverse(b.published_at), Reverse(b.id)))
}

/// Oldest first, used for year archives.
#[must_use]
pub fn chronological(a: &Post, b: &Post) -> Ordering {
    (a.published_at, a.id).cmp(&(b.published_at, b.id))
}

/// Most used tags first, alphabetical among equally used tags.
#[must_use]
pub fn tags_by_popularity(a: &TagWithCount, b: &TagWithCount) -> Ordering {
    b.num_posts
        .cmp(&a.num_posts)
        .then_with(|| a.tag.title.cmp(&b.tag.title))
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            post::{Post, PostCard, PostTitle, Slug},
            tag::{Tag, TagTitle, TagWithCount},
            user::Username,
        },
        ranking::{by_freshness, by_popularity, chronological, tags_by_popularity},
    };
    use time::{UtcDateTime, macros::utc_datetime};

    fn post(id: u64, published_at: UtcDateTime) -> Post {
        Post {
            id: id.into(),
            title: PostTitle::new(format!("Post {id}")).unwrap(),
            text: String::new(),
            slug: Slug::new(format!("post-{id}")).unwrap(),
            image: None,
            published_at,
            author_id: 1.into(),
        }
    }

    fn card(id: u64, published_at: UtcDateTime, likes: u64) -> PostCard {
        PostCard {
            post: post(id, published_at),
            author: Username::new("admin").unwrap(),
            likes,
            comments_count: 0,
            tags: Vec::new(),
        }
    }

    fn tag(id: u64, title: &str, num_posts: u64) -> TagWithCount {
        TagWithCount {
            tag: Tag {
                id: id.into(),
                title: TagTitle::new(title).unwrap(),
            },
            num_posts,
        }
    }

    #[test]
    fn popularity_prefers_likes_then_freshness() {
        let mut cards = vec![
            card(1, utc_datetime!(2024-01-01 00:00), 2),
            card(2, utc_datetime!(2024-02-01 00:00), 5),
            card(3, utc_datetime!(2024-03-01 00:00), 2),
        ];
        cards.sort_by(by_popularity);

        let ids: Vec<u64> = cards.iter().map(|card| card.post.id.get()).collect();
        assert_eq!(ids, [2, 3, 1]);
    }

    #[test]
    fn freshness_and_chronological_are_opposites() {
        let mut posts = vec![
            post(1, utc_datetime!(2024-05-01 00:00)),
            post(2, utc_datetime!(2023-05-01 00:00)),
            post(3, utc_datetime!(2025-05-01 00:00)),
        ];

        posts.sort_by(by_freshness);
        let ids: Vec<u64> = posts.iter().map(|post| post.id.get()).collect();
        assert_eq!(ids, [3, 1, 2]);

        posts.sort_by(chronological);
        let ids: Vec<u64> = posts.iter().map(|post| post.id.get()).collect();
        assert_eq!(ids, [2, 1, 3]);
    }

    #[test]
    fn tag_popularity_breaks_ties_by_title() {
        let mut tags = vec![tag(1, "rust", 3), tag(2, "go", 3), tag(3, "sql", 7)];
        tags.sort_by(tags_by_popularity);

        let titles: Vec<&str> = tags.iter().map(|tag| tag.tag.title.get()).collect();
        assert_eq!(titles, ["sql", "go", "rust"]);
    }
}
