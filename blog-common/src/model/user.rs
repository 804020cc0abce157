use crate::model::{Id, bounded, validated_string};

pub const USERNAME_MAX_LEN: usize = 150;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

validated_string!(
    /// Login name of a user, at most [`USERNAME_MAX_LEN`] characters.
    Username => normalize_username
);

fn normalize_username(value: &str) -> Option<String> {
    bounded(value, USERNAME_MAX_LEN)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    /// Only staff users may author posts.
    pub is_staff: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub username: Username,
    pub is_staff: bool,
}
