use crate::model::{
    Id,
    post::{PostMarker, PostTitle},
    user::{UserMarker, Username},
};
use std::fmt::{Display, Formatter};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub text: String,
    pub published_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: Username,
    pub post_title: PostTitle,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub post: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub text: String,
    pub published_at: UtcDateTime,
}

impl Display for CommentWithAuthor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} under {}", self.author, self.post_title)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        comment::{Comment, CommentWithAuthor},
        post::PostTitle,
        user::Username,
    };
    use time::macros::utc_datetime;

    #[test]
    fn comment_display() {
        let comment = CommentWithAuthor {
            comment: Comment {
                id: 3.into(),
                post_id: 1.into(),
                author_id: 2.into(),
                text: "Nice".to_owned(),
                published_at: utc_datetime!(2024-03-02 08:00),
            },
            author: Username::new("bob").unwrap(),
            post_title: PostTitle::new("First steps").unwrap(),
        };

        assert_eq!(comment.to_string(), "bob under First steps");
    }
}
