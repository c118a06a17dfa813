use crate::{
    api::FeedApi,
    record::{
        BookmarkEntryRecord, BookmarkToggleRecord, CommentRecord, LikeRecord, PostRecord,
        decode_list,
    },
};
use murmur_common::model::{
    Id, ModelValidationError,
    auth::Session,
    comment::{Comment, CommentContent, CommentMarker},
    page::{Page, PageRequest},
    post::{Likes, Post, PostMarker},
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Could not build the HTTP client: {0}")]
    Build(reqwest::Error),
    #[error("Request {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[error("Request {endpoint} was rejected with status {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
    #[error("Response of {endpoint} could not be decoded: {source}")]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },
    #[error("Response of {endpoint} was invalid: {source}")]
    Data {
        endpoint: &'static str,
        source: ModelValidationError,
    },
}

impl ApiError {
    /// Whether repeating the same action later might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Build(_) | ApiError::Decode { .. } | ApiError::Data { .. } => false,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

const GET_POSTS: &str = "GET /posts";
const GET_BOOKMARKS: &str = "GET /bookmarks/my-bookmarks";
const POST_LIKE: &str = "POST /posts/{id}/like";
const POST_BOOKMARK: &str = "POST /bookmarks/{id}";
const GET_COMMENTS: &str = "GET /comments/posts/{id}/comments";
const POST_COMMENT: &str = "POST /comments/{id}";
const PUT_COMMENT: &str = "PUT /comments/{id}";
const DELETE_COMMENT: &str = "DELETE /comments/comments/{id}";

#[derive(Serialize)]
struct CommentBody<'a> {
    content: &'a CommentContent,
}

/// REST client for the backend. Every request carries the session's bearer token.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self> {
        let http = Client::builder().build().map_err(ApiError::Build)?;
        Ok(Self::with_http_client(http, base_url, session))
    }

    #[must_use]
    pub fn with_http_client(http: Client, base_url: &str, session: Session) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            session,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn receive<T>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
        decode: impl FnOnce(&[u8]) -> serde_json::Result<T>,
    ) -> Result<T> {
        debug!(endpoint, "Sending request");

        let response = request
            .bearer_auth(self.session.token.as_token_str())
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            debug!(endpoint, %status, "Request rejected");
            return Err(ApiError::Status { endpoint, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        decode(&body).map_err(|source| ApiError::Decode { endpoint, source })
    }

    async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> Result<()> {
        self.receive(endpoint, request, |_| Ok(())).await
    }
}

/// Converts the entries of one listing page. An entry that does not decode or
/// validate is logged and skipped, so one bad record never costs the whole page.
/// `last` is settled from the raw entry count before anything is skipped.
fn convert_page<R, T>(
    endpoint: &'static str,
    request: &PageRequest,
    listing: Page<Value>,
    mut convert: impl FnMut(R) -> Result<T, ModelValidationError>,
) -> Page<T>
where
    R: DeserializeOwned,
{
    let last = Some(listing.is_last(request));
    let items = listing
        .items
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => match convert(record) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(endpoint, index, error = %err, "Skipping invalid entry");
                    None
                }
            },
            Err(err) => {
                warn!(endpoint, index, error = %err, "Skipping undecodable entry");
                None
            }
        })
        .collect();

    Page { items, last }
}

impl FeedApi for ApiClient {
    async fn fetch_posts(&self, page: &PageRequest) -> Result<Page<Post>> {
        let request = self.http.get(self.url("/posts")).query(&page.query());
        let listing = self.receive(GET_POSTS, request, decode_list).await?;

        Ok(convert_page(GET_POSTS, page, listing, |record: PostRecord| {
            Post::try_from(record)
        }))
    }

    async fn fetch_bookmarks(&self, page: &PageRequest) -> Result<Page<Id<PostMarker>>> {
        let request = self
            .http
            .get(self.url("/bookmarks/my-bookmarks"))
            .query(&page.query());
        let listing = self.receive(GET_BOOKMARKS, request, decode_list).await?;

        Ok(convert_page(GET_BOOKMARKS, page, listing, |entry: BookmarkEntryRecord| {
            entry.post_id().ok_or(ModelValidationError::MissingPostId)
        }))
    }

    async fn toggle_like(&self, post: Id<PostMarker>) -> Result<Likes> {
        let request = self.http.post(self.url(&format!("/posts/{post}/like")));
        let record: LikeRecord = self
            .receive(POST_LIKE, request, |body| serde_json::from_slice(body))
            .await?;

        Ok(record.into())
    }

    async fn toggle_bookmark(&self, post: Id<PostMarker>) -> Result<bool> {
        let request = self.http.post(self.url(&format!("/bookmarks/{post}")));
        let record: BookmarkToggleRecord = self
            .receive(POST_BOOKMARK, request, |body| serde_json::from_slice(body))
            .await?;

        record.bookmarked().map_err(|source| ApiError::Data {
            endpoint: POST_BOOKMARK,
            source,
        })
    }

    async fn fetch_comments(
        &self,
        post: Id<PostMarker>,
        page: &PageRequest,
    ) -> Result<Page<Comment>> {
        let request = self
            .http
            .get(self.url(&format!("/comments/posts/{post}/comments")))
            .query(&page.query());
        let listing = self.receive(GET_COMMENTS, request, decode_list).await?;

        Ok(convert_page(GET_COMMENTS, page, listing, |record: CommentRecord| {
            record.into_comment(post)
        }))
    }

    async fn create_comment(
        &self,
        post: Id<PostMarker>,
        content: &CommentContent,
    ) -> Result<Comment> {
        let request = self
            .http
            .post(self.url(&format!("/comments/{post}")))
            .json(&CommentBody { content });
        let record: CommentRecord = self
            .receive(POST_COMMENT, request, |body| serde_json::from_slice(body))
            .await?;

        record
            .into_comment(post)
            .map_err(|source| ApiError::Data {
                endpoint: POST_COMMENT,
                source,
            })
    }

    async fn update_comment(
        &self,
        comment: Id<CommentMarker>,
        content: &CommentContent,
    ) -> Result<()> {
        let request = self
            .http
            .put(self.url(&format!("/comments/{comment}")))
            .json(&CommentBody { content });

        self.send(PUT_COMMENT, request).await
    }

    async fn delete_comment(&self, comment: Id<CommentMarker>) -> Result<()> {
        let request = self
            .http
            .delete(self.url(&format!("/comments/comments/{comment}")));

        self.send(DELETE_COMMENT, request).await
    }
}
