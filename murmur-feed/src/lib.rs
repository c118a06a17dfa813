//! Local feed state kept consistent with the backend.
//!
//! [`feed::FeedStore`] holds the post list and applies like and bookmark
//! mutations, [`comments::CommentStore`] holds the comments of the one post
//! whose comment view is open.

pub mod comments;
pub mod error;
pub mod feed;

mod in_flight;
mod ticket;

#[cfg(test)]
mod fake;
