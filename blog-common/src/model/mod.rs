pub mod comment;
pub mod post;
pub mod tag;
pub mod user;

use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    InvalidValue(#[from] InvalidValueError),
    #[error("Count column was negative: {0}")]
    NegativeCount(i64),
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("The {kind} is invalid: {value:?}")]
pub struct InvalidValueError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(u64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(value)
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

/// Declares a `String` newtype that can only be constructed through a
/// normalizing validator. `$normalize` returns `None` for rejected input.
macro_rules! validated_string {
    ($(#[$meta:meta])* $name:ident => $normalize:path) => {
        $(#[$meta])*
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, $crate::model::InvalidValueError> {
                let value = value.into();
                match $normalize(&value) {
                    Some(normalized) => Ok(Self(normalized)),
                    None => Err($crate::model::InvalidValueError {
                        kind: stringify!($name),
                        value,
                    }),
                }
            }

            #[must_use]
            pub fn get(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::InvalidValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let inner = <String as serde::Deserialize>::deserialize(deserializer)?;
                $name::new(inner).map_err(|err| {
                    serde::de::Error::invalid_value(
                        serde::de::Unexpected::Str(&err.value),
                        &stringify!($name),
                    )
                })
            }
        }
    };
}

pub(crate) use validated_string;

/// Accepts strings of `1..=max_len` characters unchanged.
pub(crate) fn bounded(value: &str, max_len: usize) -> Option<String> {
    let len = value.chars().count();
    (len > 0 && len <= max_len).then(|| value.to_owned())
}
