//! Scripted [`FeedApi`] for store tests.

use murmur_client::{
    api::FeedApi,
    client::{ApiError, Result},
};
use murmur_common::model::{
    Id,
    comment::{Comment, CommentContent, CommentMarker},
    page::{Page, PageRequest},
    post::{Likes, Post, PostMarker},
    user::User,
};
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::VecDeque;
use time::{Duration, macros::utc_datetime};
use tokio::sync::oneshot;

type Script<T> = Mutex<VecDeque<Result<T>>>;

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) enum Call {
    FetchPosts(u32),
    FetchBookmarks(u32),
    ToggleLike(Id<PostMarker>),
    ToggleBookmark(Id<PostMarker>),
    FetchComments(Id<PostMarker>, u32),
    CreateComment(Id<PostMarker>, String),
    UpdateComment(Id<CommentMarker>, String),
    DeleteComment(Id<CommentMarker>),
}

/// Answers each call with the next scripted response. A call that arrives
/// while a gate is set waits until the gate's sender fires.
#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    pub posts: Script<Page<Post>>,
    pub bookmarks: Script<Page<Id<PostMarker>>>,
    pub likes: Script<Likes>,
    pub bookmark_toggles: Script<bool>,
    pub comment_pages: Script<Page<Comment>>,
    pub created: Script<Comment>,
    pub updates: Script<()>,
    pub deletes: Script<()>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    /// Holds back the next call until the returned sender fires.
    pub(crate) fn gate(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        *self.gate.lock() = Some(receiver);
        sender
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    async fn answer<T>(&self, call: Call, script: &Script<T>) -> Result<T> {
        self.calls.lock().push(call.clone());
        let response = script
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted call {call:?}"));

        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.await.unwrap();
        }

        response
    }
}

impl FeedApi for FakeApi {
    async fn fetch_posts(&self, page: &PageRequest) -> Result<Page<Post>> {
        self.answer(Call::FetchPosts(page.page), &self.posts).await
    }

    async fn fetch_bookmarks(&self, page: &PageRequest) -> Result<Page<Id<PostMarker>>> {
        self.answer(Call::FetchBookmarks(page.page), &self.bookmarks)
            .await
    }

    async fn toggle_like(&self, post: Id<PostMarker>) -> Result<Likes> {
        self.answer(Call::ToggleLike(post), &self.likes).await
    }

    async fn toggle_bookmark(&self, post: Id<PostMarker>) -> Result<bool> {
        self.answer(Call::ToggleBookmark(post), &self.bookmark_toggles)
            .await
    }

    async fn fetch_comments(&self, post: Id<PostMarker>, page: &PageRequest) -> Result<Page<Comment>> {
        self.answer(Call::FetchComments(post, page.page), &self.comment_pages)
            .await
    }

    async fn create_comment(&self, post: Id<PostMarker>, content: &CommentContent) -> Result<Comment> {
        self.answer(
            Call::CreateComment(post, content.get().to_owned()),
            &self.created,
        )
        .await
    }

    async fn update_comment(
        &self,
        comment: Id<CommentMarker>,
        content: &CommentContent,
    ) -> Result<()> {
        self.answer(
            Call::UpdateComment(comment, content.get().to_owned()),
            &self.updates,
        )
        .await
    }

    async fn delete_comment(&self, comment: Id<CommentMarker>) -> Result<()> {
        self.answer(Call::DeleteComment(comment), &self.deletes)
            .await
    }
}

pub(crate) fn server_error() -> ApiError {
    ApiError::Status {
        endpoint: "fake",
        status: StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A post created `seconds` after the start of 2025.
pub(crate) fn post(id: u64, seconds: i64, likes: u64, liked: bool) -> Post {
    Post {
        id: id.into(),
        author: User {
            id: 100.into(),
            name: None,
        },
        content: Some(format!("post {id}")),
        media: None,
        likes: Likes::new(likes, liked),
        bookmarked: false,
        created_at: utc_datetime!(2025-01-01 00:00) + Duration::seconds(seconds),
    }
}

pub(crate) fn comment(id: u64, post: u64, text: &str) -> Comment {
    Comment {
        id: id.into(),
        post: post.into(),
        author: User {
            id: 100.into(),
            name: None,
        },
        content: CommentContent::new(text).unwrap(),
        created_at: utc_datetime!(2025-01-01 00:00) + Duration::seconds(id.cast_signed()),
        edited: false,
    }
}

pub(crate) fn page<T>(items: Vec<T>, last: Option<bool>) -> Page<T> {
    Page { items, last }
}

/// A page the server marked as the final one.
pub(crate) fn last_page<T>(items: Vec<T>) -> Page<T> {
    page(items, Some(true))
}

pub(crate) fn marks(ids: &[u64]) -> Page<Id<PostMarker>> {
    last_page(ids.iter().copied().map(Id::new).collect())
}
