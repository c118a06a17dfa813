use crate::{
    error::{FeedError, Result},
    ticket::{Ticket, Tickets},
};
use murmur_client::api::FeedApi;
use murmur_common::model::{
    Id,
    comment::{Comment, CommentContent, CommentMarker},
    page::{DEFAULT_PAGE_SIZE, PageRequest},
    post::PostMarker,
};
use parking_lot::Mutex;
use std::num::NonZeroU32;
use tracing::{debug, warn};

/// Comments of the post whose comment view is open.
///
/// Only one thread is open at a time. Nothing is kept after [`close`](Self::close),
/// and every change is applied only once the server has confirmed it.
#[derive(Debug)]
pub struct CommentStore<A> {
    api: A,
    page_size: NonZeroU32,
    thread: Mutex<Option<Thread>>,
    opens: Tickets,
}

#[derive(Clone, Debug)]
struct Thread {
    opened: Ticket,
    post: Id<PostMarker>,
    comments: Vec<Comment>,
    next_page: PageRequest,
    exhausted: bool,
}

impl<A: FeedApi> CommentStore<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self::with_page_size(api, DEFAULT_PAGE_SIZE)
    }

    #[must_use]
    pub fn with_page_size(api: A, page_size: NonZeroU32) -> Self {
        Self {
            api,
            page_size,
            thread: Mutex::new(None),
            opens: Tickets::default(),
        }
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub fn active_post(&self) -> Option<Id<PostMarker>> {
        self.thread.lock().as_ref().map(|thread| thread.post)
    }

    /// Comments of the open thread, newest first. Empty when no thread is open.
    #[must_use]
    pub fn comments(&self) -> Vec<Comment> {
        self.thread
            .lock()
            .as_ref()
            .map(|thread| thread.comments.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|thread| !thread.exhausted)
    }

    /// Opens the comment thread of `post`, replacing whatever was open.
    pub async fn load(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let opened = self.opens.issue();
        let request = PageRequest::first(self.page_size);

        let page = self
            .api
            .fetch_comments(post, &request)
            .await
            .inspect_err(|err| warn!(post_id = %post, error = %err, "Loading comments failed"))?;

        if !self.opens.is_latest(opened) {
            debug!(post_id = %post, "Discarding comments of a thread that is no longer open");
            return Ok(self.comments());
        }

        let exhausted = page.is_last(&request);
        let comments = page.items;
        *self.thread.lock() = Some(Thread {
            opened,
            post,
            comments: comments.clone(),
            next_page: request.next(),
            exhausted,
        });

        Ok(comments)
    }

    /// Appends the next page of the open thread. Returns how many comments
    /// were added.
    pub async fn load_more(&self) -> Result<usize> {
        let (opened, post, request) = {
            let thread = self.thread.lock();
            let thread = thread.as_ref().ok_or(FeedError::NoActiveThread)?;
            if thread.exhausted {
                return Ok(0);
            }
            (thread.opened, thread.post, thread.next_page.clone())
        };

        let page = self
            .api
            .fetch_comments(post, &request)
            .await
            .inspect_err(|err| warn!(post_id = %post, error = %err, "Loading more comments failed"))?;

        let exhausted = page.is_last(&request);
        let added = self.with_thread(opened, |thread| {
            if thread.next_page != request {
                return 0;
            }

            let before = thread.comments.len();
            for comment in page.items {
                if !thread.comments.iter().any(|known| known.id == comment.id) {
                    thread.comments.push(comment);
                }
            }
            thread.next_page = request.next();
            thread.exhausted = exhausted;
            thread.comments.len() - before
        });

        Ok(added.unwrap_or(0))
    }

    /// Posts a comment on the open thread and puts it at the top.
    pub async fn add(&self, text: &str) -> Result<Comment> {
        let content = CommentContent::new(text)?;
        let (opened, post) = self.current()?;

        let comment = self
            .api
            .create_comment(post, &content)
            .await
            .inspect_err(|err| warn!(post_id = %post, error = %err, "Adding comment failed"))?;

        let inserted = comment.clone();
        if self
            .with_thread(opened, |thread| thread.comments.insert(0, inserted))
            .is_none()
        {
            debug!(post_id = %post, "Thread closed before the comment was confirmed");
        }

        Ok(comment)
    }

    /// Replaces the text of a comment and marks it as edited.
    pub async fn edit(&self, id: Id<CommentMarker>, text: &str) -> Result<Comment> {
        let content = CommentContent::new(text)?;
        let (opened, original) = self.find(id)?;

        self.api
            .update_comment(id, &content)
            .await
            .inspect_err(|err| warn!(comment_id = %id, error = %err, "Editing comment failed"))?;

        let edited = Comment {
            content,
            edited: true,
            ..original
        };
        self.with_thread(opened, |thread| {
            if let Some(comment) = thread.comments.iter_mut().find(|comment| comment.id == id) {
                comment.clone_from(&edited);
            }
        });

        Ok(edited)
    }

    /// Removes a comment once the server has deleted it.
    pub async fn delete(&self, id: Id<CommentMarker>) -> Result<()> {
        let (opened, _) = self.find(id)?;

        self.api
            .delete_comment(id)
            .await
            .inspect_err(|err| warn!(comment_id = %id, error = %err, "Deleting comment failed"))?;

        self.with_thread(opened, |thread| {
            thread.comments.retain(|comment| comment.id != id);
        });

        Ok(())
    }

    /// Closes the open thread. Loads still in flight are discarded when they land.
    pub fn close(&self) {
        self.opens.issue();
        *self.thread.lock() = None;
    }

    fn current(&self) -> Result<(Ticket, Id<PostMarker>)> {
        self.thread
            .lock()
            .as_ref()
            .map(|thread| (thread.opened, thread.post))
            .ok_or(FeedError::NoActiveThread)
    }

    fn find(&self, id: Id<CommentMarker>) -> Result<(Ticket, Comment)> {
        let thread = self.thread.lock();
        let thread = thread.as_ref().ok_or(FeedError::NoActiveThread)?;

        thread
            .comments
            .iter()
            .find(|comment| comment.id == id)
            .map(|comment| (thread.opened, comment.clone()))
            .ok_or(FeedError::CommentNotFound(id))
    }

    /// Runs `f` on the thread if it is still the one opened under `opened`.
    fn with_thread<R>(&self, opened: Ticket, f: impl FnOnce(&mut Thread) -> R) -> Option<R> {
        let mut thread = self.thread.lock();
        thread
            .as_mut()
            .filter(|thread| thread.opened == opened)
            .map(f)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        comments::CommentStore,
        error::FeedError,
        fake::{Call, FakeApi, comment, page, server_error},
    };
    use murmur_common::model::Id;
    use std::num::NonZeroU32;

    async fn open(comments: Vec<murmur_common::model::comment::Comment>) -> CommentStore<FakeApi> {
        let api = FakeApi::default();
        api.comment_pages.lock().push_back(Ok(page(comments, Some(true))));
        let store = CommentStore::new(api);
        store.load(Id::new(1)).await.unwrap();
        store
    }

    fn ids(store: &CommentStore<FakeApi>) -> Vec<u64> {
        store.comments().iter().map(|comment| comment.id.get()).collect()
    }

    #[tokio::test]
    async fn load_replaces_thread() {
        let store = open(vec![comment(1, 1, "a"), comment(2, 1, "b")]).await;
        assert_eq!(store.active_post(), Some(Id::new(1)));
        assert_eq!(ids(&store), vec![1, 2]);

        store
            .api()
            .comment_pages
            .lock()
            .push_back(Ok(page(vec![comment(7, 2, "c")], None)));
        store.load(Id::new(2)).await.unwrap();

        assert_eq!(store.active_post(), Some(Id::new(2)));
        assert_eq!(ids(&store), vec![7]);
    }

    #[tokio::test]
    async fn failed_load_keeps_open_thread() {
        let store = open(vec![comment(1, 1, "a")]).await;
        store.api().comment_pages.lock().push_back(Err(server_error()));

        assert!(store.load(Id::new(2)).await.is_err());
        assert_eq!(store.active_post(), Some(Id::new(1)));
        assert_eq!(ids(&store), vec![1]);
    }

    #[tokio::test]
    async fn load_landing_after_close_is_discarded() {
        let store = CommentStore::new(FakeApi::default());
        let gate = store.api().gate();
        store
            .api()
            .comment_pages
            .lock()
            .push_back(Ok(page(vec![comment(1, 1, "a")], None)));

        let (loaded, ()) = tokio::join!(store.load(Id::new(1)), async {
            store.close();
            gate.send(()).unwrap();
        });

        assert!(loaded.unwrap().is_empty());
        assert_eq!(store.active_post(), None);
    }

    #[tokio::test]
    async fn load_more_appends_until_exhausted() {
        let api = FakeApi::default();
        api.comment_pages.lock().extend([
            Ok(page(vec![comment(1, 1, "a"), comment(2, 1, "b")], None)),
            Ok(page(vec![comment(2, 1, "b"), comment(3, 1, "c")], None)),
            Ok(page(vec![comment(4, 1, "d")], None)),
        ]);
        let store = CommentStore::with_page_size(api, NonZeroU32::new(2).unwrap());

        store.load(Id::new(1)).await.unwrap();
        assert!(store.has_more());
        assert_eq!(store.load_more().await.unwrap(), 1);
        assert_eq!(store.load_more().await.unwrap(), 1);
        assert!(!store.has_more());
        assert_eq!(store.load_more().await.unwrap(), 0);

        assert_eq!(ids(&store), vec![1, 2, 3, 4]);
        assert_eq!(
            store.api().calls(),
            vec![
                Call::FetchComments(Id::new(1), 0),
                Call::FetchComments(Id::new(1), 1),
                Call::FetchComments(Id::new(1), 2),
            ]
        );
    }

    #[tokio::test]
    async fn add_prepends_server_record() {
        let store = open(vec![comment(1, 1, "a")]).await;
        store
            .api()
            .created
            .lock()
            .push_back(Ok(comment(5, 1, "hello")));

        let added = store.add("  hello ").await.unwrap();

        assert_eq!(added.id, Id::new(5));
        assert_eq!(ids(&store), vec![5, 1]);
        assert!(
            store
                .api()
                .calls()
                .contains(&Call::CreateComment(Id::new(1), "hello".to_owned()))
        );
    }

    #[tokio::test]
    async fn blank_comment_never_reaches_the_server() {
        let store = open(vec![comment(1, 1, "a")]).await;
        let calls = store.api().calls().len();

        for text in ["", "   ", "\n\t"] {
            let err = store.add(text).await.unwrap_err();
            assert!(matches!(err, FeedError::EmptyContent(_)));
            assert!(err.is_local());
        }

        assert_eq!(store.api().calls().len(), calls);
        assert_eq!(ids(&store), vec![1]);
    }

    #[tokio::test]
    async fn failed_add_leaves_list() {
        let store = open(vec![comment(1, 1, "a")]).await;
        store.api().created.lock().push_back(Err(server_error()));

        assert!(matches!(store.add("hi").await, Err(FeedError::Api(_))));
        assert_eq!(ids(&store), vec![1]);
    }

    #[tokio::test]
    async fn confirmation_after_switching_threads_is_ignored() {
        let store = open(vec![comment(1, 1, "a")]).await;
        let api = store.api();
        let gate = api.gate();
        api.created.lock().push_back(Ok(comment(5, 1, "late")));
        api.comment_pages
            .lock()
            .push_back(Ok(page(vec![comment(9, 2, "other")], Some(true))));

        let (added, ()) = tokio::join!(store.add("late"), async {
            store.load(Id::new(2)).await.unwrap();
            gate.send(()).unwrap();
        });

        assert_eq!(added.unwrap().id, Id::new(5));
        assert_eq!(store.active_post(), Some(Id::new(2)));
        assert_eq!(ids(&store), vec![9]);
    }

    #[tokio::test]
    async fn edit_sets_content_and_flag() {
        let store = open(vec![comment(1, 1, "a"), comment(2, 1, "b")]).await;
        store.api().updates.lock().push_back(Ok(()));

        let edited = store.edit(Id::new(2), "better").await.unwrap();

        assert_eq!(edited.content.get(), "better");
        assert!(edited.edited);
        let comments = store.comments();
        assert_eq!(comments[1], edited);
        assert!(!comments[0].edited);
    }

    #[tokio::test]
    async fn failed_edit_changes_nothing() {
        let store = open(vec![comment(1, 1, "a")]).await;
        let before = store.comments();
        store.api().updates.lock().push_back(Err(server_error()));

        assert!(store.edit(Id::new(1), "better").await.is_err());
        assert_eq!(store.comments(), before);
    }

    #[tokio::test]
    async fn edit_is_not_applied_before_confirmation() {
        let store = open(vec![comment(1, 1, "a")]).await;
        let gate = store.api().gate();
        store.api().updates.lock().push_back(Ok(()));

        let (edited, ()) = tokio::join!(store.edit(Id::new(1), "b"), async {
            assert_eq!(store.comments()[0].content.get(), "a");
            gate.send(()).unwrap();
        });

        assert!(edited.unwrap().edited);
    }

    #[tokio::test]
    async fn blank_edit_and_unknown_ids_are_local_errors() {
        let store = open(vec![comment(1, 1, "a")]).await;
        let calls = store.api().calls().len();

        assert!(matches!(
            store.edit(Id::new(1), " ").await,
            Err(FeedError::EmptyContent(_))
        ));
        assert!(matches!(
            store.edit(Id::new(8), "x").await,
            Err(FeedError::CommentNotFound(_))
        ));
        assert!(matches!(
            store.delete(Id::new(8)).await,
            Err(FeedError::CommentNotFound(_))
        ));
        assert_eq!(store.api().calls().len(), calls);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let store = open(vec![
            comment(1, 1, "a"),
            comment(2, 1, "b"),
            comment(3, 1, "c"),
        ])
        .await;
        store.api().deletes.lock().push_back(Ok(()));

        store.delete(Id::new(2)).await.unwrap();

        assert_eq!(ids(&store), vec![1, 3]);
    }

    #[tokio::test]
    async fn failed_delete_keeps_comment() {
        let store = open(vec![comment(1, 1, "a"), comment(2, 1, "b")]).await;
        store.api().deletes.lock().push_back(Err(server_error()));

        assert!(store.delete(Id::new(1)).await.is_err());
        assert_eq!(ids(&store), vec![1, 2]);
    }

    #[tokio::test]
    async fn operations_need_an_open_thread() {
        let store = open(vec![comment(1, 1, "a")]).await;
        store.close();

        assert!(store.comments().is_empty());
        assert!(!store.has_more());
        assert!(matches!(store.add("hi").await, Err(FeedError::NoActiveThread)));
        assert!(matches!(
            store.delete(Id::new(1)).await,
            Err(FeedError::NoActiveThread)
        ));
        assert!(matches!(
            store.load_more().await,
            Err(FeedError::NoActiveThread)
        ));
    }
}
