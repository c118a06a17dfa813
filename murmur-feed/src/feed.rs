use crate::{
    error::{FeedError, Result},
    in_flight::{InFlight, InFlightGuard},
    ticket::{Ticket, Tickets},
};
use murmur_client::{api::FeedApi, client::ApiError};
use murmur_common::model::{
    Id,
    page::{DEFAULT_PAGE_SIZE, Page, PageRequest},
    post::{Likes, Post, PostMarker},
};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    num::NonZeroU32,
    sync::Arc,
};
use tracing::{debug, warn};

/// Most pages a single refresh requests from one listing.
pub const MAX_REFRESH_PAGES: u32 = 100;

/// The post list of the feed.
///
/// Readers get cheap snapshots through [`FeedStore::posts`]. A snapshot is
/// never changed after the fact: refreshes and mutations swap in a new list.
#[derive(Debug)]
pub struct FeedStore<A> {
    api: A,
    page_size: NonZeroU32,
    feed: Mutex<Feed>,
    refreshes: Tickets,
    in_flight: InFlight<Id<PostMarker>>,
}

#[derive(Debug, Default)]
struct Feed {
    posts: Arc<Vec<Post>>,
    /// Latest refresh ticket at the moment a like was confirmed, per post.
    likes_confirmed: HashMap<Id<PostMarker>, Ticket>,
    bookmarks_confirmed: HashMap<Id<PostMarker>, Ticket>,
}

impl Feed {
    fn update<R>(&mut self, id: Id<PostMarker>, f: impl FnOnce(&mut Post) -> R) -> Option<R> {
        let index = self.posts.iter().position(|post| post.id == id)?;
        Some(f(&mut Arc::make_mut(&mut self.posts)[index]))
    }

    /// Carries the current like and bookmark state over to `fetched` for posts
    /// whose change was confirmed after refresh `ticket` started. Returns how
    /// many posts kept state.
    fn keep_confirmed(&mut self, ticket: Ticket, fetched: &mut [Post]) -> usize {
        self.likes_confirmed.retain(|_, at| *at >= ticket);
        self.bookmarks_confirmed.retain(|_, at| *at >= ticket);
        if self.likes_confirmed.is_empty() && self.bookmarks_confirmed.is_empty() {
            return 0;
        }

        let mut kept = 0;
        for post in fetched {
            let Some(known) = self.posts.iter().find(|known| known.id == post.id) else {
                continue;
            };
            let likes = self.likes_confirmed.contains_key(&post.id);
            let bookmark = self.bookmarks_confirmed.contains_key(&post.id);
            if likes {
                post.likes = known.likes;
            }
            if bookmark {
                post.bookmarked = known.bookmarked;
            }
            kept += usize::from(likes || bookmark);
        }
        kept
    }
}

impl<A: FeedApi> FeedStore<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self::with_page_size(api, DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn with_page_size(api: A, page_size: NonZeroU32) -> Self {
        Self {
            api,
            page_size,
            feed: Mutex::default(),
            refreshes: Tickets::default(),
            in_flight: InFlight::default(),
        }
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub fn posts(&self) -> Arc<Vec<Post>> {
        Arc::clone(&self.feed.lock().posts)
    }

    #[must_use]
    pub fn post(&self, id: Id<PostMarker>) -> Option<Post> {
        self.feed
            .lock()
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    /// Whether a like or bookmark request for the post is outstanding.
    #[must_use]
    pub fn is_pending(&self, id: Id<PostMarker>) -> bool {
        self.in_flight.contains(id)
    }

    /// Replaces the feed with every page of the server's posts, newest first,
    /// with bookmark membership merged in. On failure the previous list stays.
    ///
    /// Likes and bookmarks confirmed while the refresh was under way keep
    /// their confirmed state, since the fetched pages may predate them.
    pub async fn refresh(&self) -> Result<Arc<Vec<Post>>> {
        let ticket = self.refreshes.issue();

        let posts = fetch_all(PageRequest::feed(self.page_size), move |request| async move {
            self.api.fetch_posts(&request).await
        })
        .await?;
        let bookmarks: HashSet<_> =
            fetch_all(PageRequest::first(self.page_size), move |request| async move {
                self.api.fetch_bookmarks(&request).await
            })
            .await?
            .into_iter()
            .collect();
        let mut merged = merge_bookmarks(posts, &bookmarks);

        let mut feed = self.feed.lock();
        if !self.refreshes.try_commit(ticket) {
            debug!(?ticket, "Discarding refresh overtaken by a newer one");
            return Ok(Arc::clone(&feed.posts));
        }

        let kept = feed.keep_confirmed(ticket, &mut merged);
        feed.posts = Arc::new(merged);
        debug!(
            posts = feed.posts.len(),
            bookmarks = bookmarks.len(),
            kept,
            "Feed refreshed"
        );

        Ok(Arc::clone(&feed.posts))
    }

    /// Likes or unlikes a post.
    ///
    /// The flipped state is visible in the store before the request is sent.
    /// The server's answer then overwrites it, or on failure the previous
    /// state is restored.
    pub async fn toggle_like(&self, id: Id<PostMarker>) -> Result<Likes> {
        let _guard = self.claim(id)?;

        let (before, optimistic) = self
            .update_post(id, |post| {
                let before = post.likes;
                post.likes = before.toggled();
                (before, post.likes)
            })
            .ok_or(FeedError::PostNotFound(id))?;

        match self.api.toggle_like(id).await {
            Ok(confirmed) => {
                let mut feed = self.feed.lock();
                feed.likes_confirmed.insert(id, self.refreshes.latest());
                if feed.update(id, |post| post.likes = confirmed).is_none() {
                    debug!(post_id = %id, "Post left the feed before its like was confirmed");
                }
                Ok(confirmed)
            }
            Err(err) => {
                let reverted = self.update_post(id, |post| {
                    let untouched = post.likes == optimistic;
                    if untouched {
                        post.likes = before;
                    }
                    untouched
                });

                if reverted == Some(true) {
                    warn!(post_id = %id, error = %err, "Like failed, reverted");
                } else {
                    warn!(post_id = %id, error = %err, "Like failed, keeping newer post state");
                }
                Err(err.into())
            }
        }
    }

    /// Toggles the bookmark of a post. The store only changes once the server
    /// has answered.
    pub async fn toggle_bookmark(&self, id: Id<PostMarker>) -> Result<bool> {
        let _guard = self.claim(id)?;

        if !self.feed.lock().posts.iter().any(|post| post.id == id) {
            return Err(FeedError::PostNotFound(id));
        }

        let bookmarked = self
            .api
            .toggle_bookmark(id)
            .await
            .inspect_err(|err| warn!(post_id = %id, error = %err, "Bookmark failed"))?;

        let mut feed = self.feed.lock();
        feed.bookmarks_confirmed.insert(id, self.refreshes.latest());
        feed.update(id, |post| post.bookmarked = bookmarked);

        Ok(bookmarked)
    }

    fn claim(&self, id: Id<PostMarker>) -> Result<InFlightGuard<'_, Id<PostMarker>>> {
        self.in_flight.acquire(id).ok_or_else(|| {
            warn!(post_id = %id, "Dropping change while another one is in flight");
            FeedError::MutationInFlight(id)
        })
    }

    fn update_post<R>(&self, id: Id<PostMarker>, f: impl FnOnce(&mut Post) -> R) -> Option<R> {
        self.feed.lock().update(id, f)
    }
}

/// Requests pages starting at `first` until one is the last.
async fn fetch_all<T, F, Fut>(first: PageRequest, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    let mut request = first;
    let mut items = Vec::new();

    for _ in 0..MAX_REFRESH_PAGES {
        let page = fetch(request.clone()).await?;
        let last = page.is_last(&request);
        items.extend(page.items);
        if last {
            return Ok(items);
        }
        request = request.next();
    }

    warn!(pages = MAX_REFRESH_PAGES, "Stopped paging before the last page");
    Ok(items)
}

fn merge_bookmarks(posts: Vec<Post>, bookmarks: &HashSet<Id<PostMarker>>) -> Vec<Post> {
    // Pages can shift while they are walked, so a post may arrive twice.
    let mut seen = HashSet::new();
    let mut posts: Vec<Post> = posts
        .into_iter()
        .filter(|post| seen.insert(post.id))
        .collect();

    for post in &mut posts {
        post.bookmarked = bookmarks.contains(&post.id);
    }
    // Stable, so posts created at the same instant keep the server's order.
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}
