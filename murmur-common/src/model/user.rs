use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub name: Option<DisplayName>,
}

impl User {
    /// The display name, or a placeholder for authors the server sent without one.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map_or("unknown", DisplayName::get)
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The display name is invalid: {0:?}")]
pub struct InvalidDisplayNameError(String);

impl DisplayName {
    pub fn new(name: String) -> Result<Self, InvalidDisplayNameError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(InvalidDisplayNameError(name));
        }

        if trimmed.len() == name.len() {
            Ok(DisplayName(name))
        } else {
            Ok(DisplayName(trimmed.to_owned()))
        }
    }

    /// Like [`DisplayName::new`], but a blank name counts as absent.
    #[must_use]
    pub fn new_optional(name: Option<String>) -> Option<Self> {
        name.and_then(|name| Self::new(name).ok())
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

impl<'de> Deserialize<'de> for DisplayName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        DisplayName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"DisplayName"))
    }
}
