use crate::client::Result;
use murmur_common::model::{
    Id,
    comment::{Comment, CommentContent, CommentMarker},
    page::{Page, PageRequest},
    post::{Likes, Post, PostMarker},
};

/// The backend operations the feed and comment stores rely on.
///
/// [`ApiClient`](crate::client::ApiClient) implements this over HTTP.
pub trait FeedApi {
    /// One page of the feed. Entries the backend sent in an unusable shape are
    /// left out.
    fn fetch_posts(&self, page: &PageRequest) -> impl Future<Output = Result<Page<Post>>> + Send;

    /// One page of the ids of posts the current user has bookmarked.
    fn fetch_bookmarks(
        &self,
        page: &PageRequest,
    ) -> impl Future<Output = Result<Page<Id<PostMarker>>>> + Send;

    fn toggle_like(&self, post: Id<PostMarker>) -> impl Future<Output = Result<Likes>> + Send;

    /// Returns whether the post is bookmarked after the toggle.
    fn toggle_bookmark(&self, post: Id<PostMarker>) -> impl Future<Output = Result<bool>> + Send;

    fn fetch_comments(
        &self,
        post: Id<PostMarker>,
        page: &PageRequest,
    ) -> impl Future<Output = Result<Page<Comment>>> + Send;

    fn create_comment(
        &self,
        post: Id<PostMarker>,
        content: &CommentContent,
    ) -> impl Future<Output = Result<Comment>> + Send;

    fn update_comment(
        &self,
        comment: Id<CommentMarker>,
        content: &CommentContent,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_comment(&self, comment: Id<CommentMarker>) -> impl Future<Output = Result<()>> + Send;
}
