use crate::model::{Id, user::User};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub content: Option<String>,
    pub media: Option<Media>,
    pub likes: Likes,
    pub bookmarked: bool,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Media {
    Image(String),
    Video(String),
    Pdf(String),
}

impl Media {
    /// Picks the first non-blank of the image, video and pdf urls.
    #[must_use]
    pub fn pick(image: Option<String>, video: Option<String>, pdf: Option<String>) -> Option<Self> {
        let present = |url: &Option<String>| url.as_deref().is_some_and(|url| !url.trim().is_empty());

        if present(&image) {
            image.map(Media::Image)
        } else if present(&video) {
            video.map(Media::Video)
        } else if present(&pdf) {
            pdf.map(Media::Pdf)
        } else {
            None
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Media::Image(url) | Media::Video(url) | Media::Pdf(url) => url,
        }
    }
}

/// Like state of a post as seen by the current user.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Likes {
    pub count: u64,
    pub liked: bool,
}

impl Likes {
    #[must_use]
    pub fn new(count: u64, liked: bool) -> Self {
        Self { count, liked }
    }

    /// The state after the current user taps like once: the flag flips and the
    /// count follows. The count never drops below zero.
    #[must_use]
    pub fn toggled(self) -> Self {
        if self.liked {
            Self {
                count: self.count.saturating_sub(1),
                liked: false,
            }
        } else {
            Self {
                count: self.count.saturating_add(1),
                liked: true,
            }
        }
    }
}
