//! Wire records as the backend sends them.
//!
//! The backend has shipped the same fields under several names. Every record is
//! decoded leniently here and converted into the model in exactly one place, so
//! nothing past this module ever looks at a raw field name.

use murmur_common::{
    model::{
        Id, ModelValidationError,
        comment::{Comment, CommentContent},
        page::Page,
        post::{Likes, Media, Post, PostMarker},
        user::{DisplayName, User},
    },
    util::parse_timestamp,
};
use serde::{Deserialize, de::IgnoredAny};
use serde_json::Value;

/// A like count, or the list of likers some endpoints send instead.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CountRecord {
    Number(i64),
    List(Vec<IgnoredAny>),
}

impl CountRecord {
    fn get(&self) -> u64 {
        match self {
            CountRecord::Number(count) => (*count).max(0).cast_unsigned(),
            CountRecord::List(likers) => u64::try_from(likers.len()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LikeFields {
    liked_by_current_user: Option<bool>,
    is_liked: Option<bool>,
    liked: Option<bool>,
    liked_by_me: Option<bool>,
    has_liked: Option<bool>,
    like_count: Option<CountRecord>,
    likes_count: Option<CountRecord>,
    likes: Option<CountRecord>,
    total_likes: Option<CountRecord>,
}

impl LikeFields {
    pub(crate) fn normalize(&self) -> Likes {
        let liked = [
            self.liked_by_current_user,
            self.is_liked,
            self.liked,
            self.liked_by_me,
            self.has_liked,
        ]
        .into_iter()
        .flatten()
        .next()
        .unwrap_or(false);

        let count = [
            &self.like_count,
            &self.likes_count,
            &self.likes,
            &self.total_likes,
        ]
        .into_iter()
        .flatten()
        .next()
        .map_or(0, CountRecord::get);

        Likes::new(count, liked)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookmarkFields {
    bookmarked_by_current_user: Option<bool>,
    is_bookmarked: Option<bool>,
    bookmarked: Option<bool>,
    bookmarked_by_me: Option<bool>,
}

impl BookmarkFields {
    pub(crate) fn normalize(&self) -> Option<bool> {
        [
            self.bookmarked_by_current_user,
            self.is_bookmarked,
            self.bookmarked,
            self.bookmarked_by_me,
        ]
        .into_iter()
        .flatten()
        .next()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorRecord {
    id: u64,
    display_name: Option<String>,
    name: Option<String>,
    username: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorFields {
    author: Option<AuthorRecord>,
    user: Option<AuthorRecord>,
    author_id: Option<u64>,
    user_id: Option<u64>,
    author_name: Option<String>,
    display_name: Option<String>,
    author_username: Option<String>,
    username: Option<String>,
}

impl AuthorFields {
    pub(crate) fn normalize(self) -> Result<User, ModelValidationError> {
        let (id, name) = match self.author.or(self.user) {
            Some(nested) => (
                nested.id,
                nested.display_name.or(nested.name).or(nested.username),
            ),
            None => (
                self.author_id
                    .or(self.user_id)
                    .ok_or(ModelValidationError::MissingAuthor)?,
                self.author_name
                    .or(self.display_name)
                    .or(self.author_username)
                    .or(self.username),
            ),
        };

        Ok(User {
            id: id.into(),
            name: DisplayName::new_optional(name),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostRecord {
    id: u64,
    #[serde(flatten)]
    author: AuthorFields,
    content: Option<String>,
    text: Option<String>,
    image_url: Option<String>,
    video_url: Option<String>,
    pdf_url: Option<String>,
    #[serde(flatten)]
    likes: LikeFields,
    #[serde(flatten)]
    bookmark: BookmarkFields,
    created_at: String,
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            likes: value.likes.normalize(),
            bookmarked: value.bookmark.normalize().unwrap_or(false),
            author: value.author.normalize()?,
            content: value
                .content
                .or(value.text)
                .filter(|text| !text.trim().is_empty()),
            media: Media::pick(value.image_url, value.video_url, value.pdf_url),
            created_at: parse_timestamp(&value.created_at)?,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LikeRecord {
    #[serde(flatten)]
    likes: LikeFields,
}

impl From<LikeRecord> for Likes {
    fn from(value: LikeRecord) -> Self {
        value.likes.normalize()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BookmarkToggleRecord {
    Flag(bool),
    Object(BookmarkFields),
}

impl BookmarkToggleRecord {
    pub(crate) fn bookmarked(&self) -> Result<bool, ModelValidationError> {
        match self {
            BookmarkToggleRecord::Flag(bookmarked) => Ok(*bookmarked),
            BookmarkToggleRecord::Object(fields) => fields
                .normalize()
                .ok_or(ModelValidationError::MissingBookmarkFlag),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub(crate) struct IdRecord {
    id: u64,
}

/// One entry of the current user's bookmark list. Only the post id is used.
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookmarkEntryRecord {
    id: Option<u64>,
    post_id: Option<u64>,
    post: Option<IdRecord>,
}

impl BookmarkEntryRecord {
    pub(crate) fn post_id(self) -> Option<Id<PostMarker>> {
        self.post_id
            .or(self.post.map(|post| post.id))
            .or(self.id)
            .map(Id::new)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommentRecord {
    id: u64,
    post_id: Option<u64>,
    #[serde(flatten)]
    author: AuthorFields,
    content: Option<String>,
    text: Option<String>,
    created_at: String,
    edited: Option<bool>,
    is_edited: Option<bool>,
}

impl CommentRecord {
    /// Converts into a [`Comment`], falling back to `post` when the record does
    /// not name its parent.
    pub(crate) fn into_comment(self, post: Id<PostMarker>) -> Result<Comment, ModelValidationError> {
        let content = CommentContent::new(self.content.or(self.text).unwrap_or_default())?;

        Ok(Comment {
            id: self.id.into(),
            post: self.post_id.map_or(post, Id::new),
            author: self.author.normalize()?,
            content,
            created_at: parse_timestamp(&self.created_at)?,
            edited: self.edited.or(self.is_edited).unwrap_or(false),
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum ListShape {
    Flat(Vec<Value>),
    Page {
        content: Vec<Value>,
        last: Option<bool>,
    },
}

/// Splits a listing body into its raw entries. Accepts a bare JSON array, which
/// is the whole listing, or a page object with a `content` array.
pub(crate) fn decode_list(body: &[u8]) -> serde_json::Result<Page<Value>> {
    Ok(match serde_json::from_slice(body)? {
        ListShape::Flat(items) => Page {
            items,
            last: Some(true),
        },
        ListShape::Page { content, last } => Page {
            items: content,
            last,
        },
    })
}
