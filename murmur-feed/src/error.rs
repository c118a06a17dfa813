use murmur_client::client::ApiError;
use murmur_common::model::{
    Id,
    comment::{CommentMarker, EmptyContentError},
    post::PostMarker,
};
use thiserror::Error;

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    EmptyContent(#[from] EmptyContentError),
    #[error("Post {0} already has a change in flight")]
    MutationInFlight(Id<PostMarker>),
    #[error("Post with id {0} is not in the feed.")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment with id {0} is not in the open thread.")]
    CommentNotFound(Id<CommentMarker>),
    #[error("No comment thread is open")]
    NoActiveThread,
}

impl FeedError {
    /// Whether the failure never reached the network.
    #[must_use]
    pub fn is_local(&self) -> bool {
        !matches!(self, FeedError::Api(_))
    }
}
