use crate::model::{Id, validated_string};
use std::fmt::{Display, Formatter};

pub const TAG_TITLE_MAX_LEN: usize = 20;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct TagMarker;

validated_string!(
    /// Tag title. Always stored lowercased; at most [`TAG_TITLE_MAX_LEN`] characters.
    TagTitle => normalize_tag_title
);

fn normalize_tag_title(value: &str) -> Option<String> {
    let lowered = value.to_lowercase();
    let len = lowered.chars().count();

    (len > 0 && len <= TAG_TITLE_MAX_LEN).then_some(lowered)
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Tag {
    pub id: Id<TagMarker>,
    pub title: TagTitle,
}

/// A tag annotated with the number of posts carrying it.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct TagWithCount {
    pub tag: Tag,
    pub num_posts: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateTag {
    pub title: TagTitle,
}

impl Tag {
    #[must_use]
    pub fn absolute_url(&self) -> String {
        format!("/tags/{}/", self.title)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.title, f)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::tag::{TAG_TITLE_MAX_LEN, Tag, TagTitle};

    #[test]
    fn tag_title_is_lowercased() {
        assert_eq!(TagTitle::new("Rust").unwrap().get(), "rust");
        assert_eq!(TagTitle::new("ПРОГРАММИРОВАНИЕ").unwrap().get(), "программирование");
        assert_eq!("SQL".parse::<TagTitle>().unwrap().get(), "sql");
    }

    #[test]
    fn tag_title_length() {
        assert!(TagTitle::new("").is_err());
        assert!(TagTitle::new("x".repeat(TAG_TITLE_MAX_LEN)).is_ok());
        assert!(TagTitle::new("x".repeat(TAG_TITLE_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn tag_url_and_display() {
        let tag = Tag {
            id: 7.into(),
            title: TagTitle::new("Travel").unwrap(),
        };

        assert_eq!(tag.absolute_url(), "/tags/travel/");
        assert_eq!(tag.to_string(), "travel");
    }
}
