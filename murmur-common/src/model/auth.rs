use crate::model::{Id, user::UserMarker};
use serde::{
    Deserialize, Deserializer,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Debug, Formatter},
    str::FromStr,
};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum AuthTokenParseError {
    #[error("The auth token is empty")]
    Empty,
    #[error("The auth token contains whitespace")]
    Whitespace,
}

/// An opaque bearer credential issued by the backend.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub fn as_token_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("Bearer ").unwrap_or(s);

        if s.is_empty() {
            return Err(Self::Err::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(Self::Err::Whitespace);
        }

        Ok(Self(s.to_owned()))
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthToken").field(&"[redacted]").finish()
    }
}

impl<'de> Deserialize<'de> for AuthToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        inner
            .parse()
            .map_err(|_| Error::invalid_value(Unexpected::Other("malformed token"), &"AuthToken"))
    }
}

/// Identity of the signed-in user, handed to every component that talks to the backend.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Session {
    pub token: AuthToken,
    pub user: Option<Id<UserMarker>>,
}

impl Session {
    #[must_use]
    pub fn new(token: AuthToken, user: Option<Id<UserMarker>>) -> Self {
        Self { token, user }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::auth::{AuthToken, AuthTokenParseError, Session};

    #[test]
    fn parse_token() {
        let token: AuthToken = "abc.def.ghi".parse().unwrap();
        assert_eq!(token.as_token_str(), "abc.def.ghi");

        let prefixed: AuthToken = "Bearer abc.def.ghi".parse().unwrap();
        assert_eq!(prefixed, token);
    }

    #[test]
    fn reject_malformed_tokens() {
        assert_eq!("".parse::<AuthToken>(), Err(AuthTokenParseError::Empty));
        assert_eq!("Bearer ".parse::<AuthToken>(), Err(AuthTokenParseError::Empty));
        assert_eq!(
            "abc def".parse::<AuthToken>(),
            Err(AuthTokenParseError::Whitespace)
        );
    }

    #[test]
    fn debug_is_redacted() {
        let session = Session::new("s3cr3t".parse().unwrap(), Some(9.into()));
        let debug = format!("{session:?}");

        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("[redacted]"));
    }
}
