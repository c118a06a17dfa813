use clap::{Parser, Subcommand};
use murmur_client::client::ApiClient;
use murmur_common::model::{
    Id,
    comment::{Comment, CommentMarker},
    post::{Media, Post, PostMarker},
};
use murmur_feed::{comments::CommentStore, error::FeedError, feed::FeedStore};
use std::num::NonZeroU32;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing::info;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("Timestamp could not be formatted: {0}")]
    Format(#[from] time::error::Format),
}

impl CliError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            CliError::Feed(FeedError::Api(err)) => err.is_transient(),
            CliError::Feed(FeedError::MutationInFlight(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "murmur")]
#[command(about = "Feed, likes, bookmarks and comments from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the feed, newest first
    Feed,
    /// Like a post, or unlike it if already liked
    Like { post: Id<PostMarker> },
    /// Bookmark a post, or remove the bookmark
    Bookmark { post: Id<PostMarker> },
    /// Show the comments of a post
    Comments {
        post: Id<PostMarker>,
        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Add, edit or delete a comment
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CommentAction {
    Add {
        post: Id<PostMarker>,
        text: String,
    },
    Edit {
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        text: String,
    },
    Delete {
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    },
}

pub async fn run(command: Command, api: ApiClient, page_size: NonZeroU32) -> Result<(), CliError> {
    match command {
        Command::Feed => {
            let feed = FeedStore::with_page_size(api, page_size);
            for post in feed.refresh().await?.iter() {
                println!("{}", render_post(post)?);
            }
        }
        Command::Like { post } => {
            let feed = FeedStore::with_page_size(api, page_size);
            feed.refresh().await?;
            let likes = feed.toggle_like(post).await?;
            info!(post_id = %post, likes = likes.count, liked = likes.liked, "Like updated");
        }
        Command::Bookmark { post } => {
            let feed = FeedStore::with_page_size(api, page_size);
            feed.refresh().await?;
            let bookmarked = feed.toggle_bookmark(post).await?;
            info!(post_id = %post, bookmarked, "Bookmark updated");
        }
        Command::Comments { post, pages } => {
            let comments = CommentStore::with_page_size(api, page_size);
            comments.load(post).await?;
            for _ in 1..pages {
                if !comments.has_more() {
                    break;
                }
                comments.load_more().await?;
            }
            for comment in comments.comments() {
                println!("{}", render_comment(&comment)?);
            }
        }
        Command::Comment { action } => run_comment(action, api, page_size).await?,
    }

    Ok(())
}

async fn run_comment(
    action: CommentAction,
    api: ApiClient,
    page_size: NonZeroU32,
) -> Result<(), CliError> {
    let comments = CommentStore::with_page_size(api, page_size);

    match action {
        CommentAction::Add { post, text } => {
            comments.load(post).await?;
            let comment = comments.add(&text).await?;
            info!(post_id = %post, comment_id = %comment.id, "Comment added");
        }
        CommentAction::Edit {
            post,
            comment,
            text,
        } => {
            open_until_found(&comments, post, comment).await?;
            comments.edit(comment, &text).await?;
            info!(post_id = %post, comment_id = %comment, "Comment edited");
        }
        CommentAction::Delete { post, comment } => {
            open_until_found(&comments, post, comment).await?;
            comments.delete(comment).await?;
            info!(post_id = %post, comment_id = %comment, "Comment deleted");
        }
    }

    Ok(())
}

/// Opens the thread of `post` and pages through it until `comment` shows up.
async fn open_until_found(
    comments: &CommentStore<ApiClient>,
    post: Id<PostMarker>,
    comment: Id<CommentMarker>,
) -> Result<(), FeedError> {
    let contains = |comments: &CommentStore<ApiClient>| {
        comments.comments().iter().any(|known| known.id == comment)
    };

    comments.load(post).await?;
    while !contains(comments) && comments.has_more() {
        comments.load_more().await?;
    }

    Ok(())
}

pub fn render_post(post: &Post) -> Result<String, time::error::Format> {
    let mut line = format!(
        "#{} {} at {}  likes: {}",
        post.id,
        post.author.display_name(),
        post.created_at.format(&Rfc3339)?,
        post.likes.count,
    );
    if post.likes.liked {
        line.push_str(" (liked)");
    }
    if post.bookmarked {
        line.push_str(" [bookmarked]");
    }
    if let Some(content) = &post.content {
        line.push_str(&format!("\n    {content}"));
    }
    if let Some(media) = &post.media {
        let kind = match media {
            Media::Image(_) => "image",
            Media::Video(_) => "video",
            Media::Pdf(_) => "pdf",
        };
        line.push_str(&format!("\n    [{kind}] {}", media.url()));
    }

    Ok(line)
}

pub fn render_comment(comment: &Comment) -> Result<String, time::error::Format> {
    Ok(format!(
        "#{} {} at {}{}\n    {}",
        comment.id,
        comment.author.display_name(),
        comment.created_at.format(&Rfc3339)?,
        if comment.edited { " (edited)" } else { "" },
        comment.content,
    ))
}
