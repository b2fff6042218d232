//! Lens-first reads with a local fallback.
//!
//! Cursors carry their source (`lens:<cursor>` or `local:<id>`) so a page
//! never continues from a different backend than the one that produced it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::errors::ServiceError;
use crate::lens::{LensAuthor, LensClient, LensPage, LensPost};
use crate::pagination::{CursorPage, PageRequest};
use crate::social::{Author, MediaItem, PostFilter, PostView, Reply, SocialStore};

const LENS_PREFIX: &str = "lens:";
const LOCAL_PREFIX: &str = "local:";

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Lens,
    Local,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub author: Author,
    pub content: String,
    pub media: Vec<MediaItem>,
    pub created_at: Option<DateTime<Utc>>,
    pub reply_count: u32,
    pub like_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub source: FeedSource,
    pub items: Vec<FeedItem>,
    pub next_cursor: Option<String>,
    /// Why Lens was not used for a page that fell back to local data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens_error: Option<String>,
}

impl From<LensAuthor> for Author {
    fn from(a: LensAuthor) -> Self {
        Author { address: a.address, handle: a.handle, display_name: a.display_name, bio: None, avatar_url: a.avatar_url }
    }
}

impl From<LensPost> for FeedItem {
    fn from(p: LensPost) -> Self {
        FeedItem {
            lens_id: Some(p.id.clone()),
            id: p.id,
            author: p.author.into(),
            content: p.content,
            media: p.media.into_iter().map(|url| MediaItem { url, mime_type: None }).collect(),
            created_at: p.created_at,
            reply_count: p.comment_count,
            like_count: p.reaction_count,
            parent_id: p.comment_on,
        }
    }
}

impl From<PostView> for FeedItem {
    fn from(p: PostView) -> Self {
        FeedItem {
            id: p.id,
            author: p.author,
            content: p.content,
            media: p.media,
            created_at: Some(p.created_at),
            reply_count: p.reply_count,
            like_count: p.like_count,
            parent_id: None,
            lens_id: p.lens_id,
        }
    }
}

impl From<Reply> for FeedItem {
    fn from(r: Reply) -> Self {
        FeedItem {
            id: r.id,
            author: r.author,
            content: r.content,
            media: Vec::new(),
            created_at: Some(r.created_at),
            reply_count: 0,
            like_count: 0,
            parent_id: Some(r.post_id),
            lens_id: r.lens_id,
        }
    }
}

enum Cursor<'a> {
    Start,
    Lens(&'a str),
    Local(&'a str),
}

fn parse_cursor(raw: Option<&str>) -> Result<Cursor<'_>, ServiceError> {
    match raw.filter(|c| !c.is_empty()) {
        None => Ok(Cursor::Start),
        Some(c) => {
            if let Some(rest) = c.strip_prefix(LENS_PREFIX) {
                Ok(Cursor::Lens(rest))
            } else if let Some(rest) = c.strip_prefix(LOCAL_PREFIX) {
                Ok(Cursor::Local(rest))
            } else {
                Err(ServiceError::validation("unrecognized cursor"))
            }
        }
    }
}

fn lens_page(page: LensPage) -> FeedPage {
    FeedPage {
        source: FeedSource::Lens,
        items: page.items.into_iter().map(FeedItem::from).collect(),
        next_cursor: page.next_cursor.map(|c| format!("{LENS_PREFIX}{c}")),
        lens_error: None,
    }
}

fn local_page<T: Into<FeedItem>>(page: CursorPage<T>, lens_error: Option<String>) -> FeedPage {
    FeedPage {
        source: FeedSource::Local,
        items: page.items.into_iter().map(Into::into).collect(),
        next_cursor: page.next_cursor.map(|c| format!("{LOCAL_PREFIX}{c}")),
        lens_error,
    }
}

pub struct FeedService {
    lens: Arc<LensClient>,
    store: Arc<SocialStore>,
}

impl FeedService {
    pub fn new(lens: Arc<LensClient>, store: Arc<SocialStore>) -> Self {
        Self { lens, store }
    }

    async fn local_posts(
        &self,
        author: Option<&str>,
        cursor: Option<&str>,
        limit: Option<u32>,
        viewer: Option<&str>,
        lens_error: Option<String>,
    ) -> Result<FeedPage, ServiceError> {
        let filter = author.map_or(PostFilter::All, |a| PostFilter::Author(a.to_string()));
        let page = self.store.list_posts(&filter, &PageRequest::new(cursor.map(String::from), limit)).await?;
        Ok(local_page(page.map(|p| PostView::from_post(p, viewer)), lens_error))
    }

    /// Global or per-author feed.
    pub async fn posts(
        &self,
        cursor: Option<&str>,
        author: Option<&str>,
        limit: Option<u32>,
        viewer: Option<&str>,
    ) -> Result<FeedPage, ServiceError> {
        match parse_cursor(cursor)? {
            Cursor::Lens(c) => Ok(lens_page(self.lens.fetch_lens_posts(Some(c), author).await?)),
            Cursor::Local(c) => self.local_posts(author, Some(c), limit, viewer, None).await,
            Cursor::Start if !self.lens.is_enabled() => self.local_posts(author, None, limit, viewer, None).await,
            Cursor::Start => match self.lens.fetch_lens_posts(None, author).await {
                Ok(page) => Ok(lens_page(page)),
                Err(e) => {
                    warn!(error = %e, "lens feed unavailable, serving local posts");
                    self.local_posts(author, None, limit, viewer, Some(e.to_string())).await
                }
            },
        }
    }

    async fn local_replies(
        &self,
        post_id: &str,
        cursor: Option<&str>,
        limit: Option<u32>,
        lens_error: Option<String>,
    ) -> Result<FeedPage, ServiceError> {
        let page = self.store.list_replies(post_id, &PageRequest::new(cursor.map(String::from), limit)).await?;
        Ok(local_page(page, lens_error))
    }

    /// Replies to `post_id`, which may be a local post id or a Lens post id.
    pub async fn replies(&self, post_id: &str, cursor: Option<&str>, limit: Option<u32>) -> Result<FeedPage, ServiceError> {
        let local_post = self.store.get_post(post_id).await?;
        let lens_target = match &local_post {
            Some(p) => p.lens_id.clone(),
            None => Some(post_id.to_string()),
        };

        match parse_cursor(cursor)? {
            Cursor::Lens(c) => {
                let target = lens_target.ok_or_else(|| ServiceError::validation("post is not on lens"))?;
                Ok(lens_page(self.lens.fetch_lens_replies(&target, Some(c)).await?))
            }
            Cursor::Local(c) => self.local_replies(post_id, Some(c), limit, None).await,
            Cursor::Start => match lens_target.filter(|_| self.lens.is_enabled()) {
                None => self.local_replies(post_id, None, limit, None).await,
                Some(target) => match self.lens.fetch_lens_replies(&target, None).await {
                    Ok(page) => Ok(lens_page(page)),
                    Err(e) if local_post.is_some() => {
                        warn!(%post_id, error = %e, "lens replies unavailable, serving local replies");
                        self.local_replies(post_id, None, limit, Some(e.to_string())).await
                    }
                    Err(e) => Err(e.into()),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::LensError;
    use crate::social::NewPost;
    use crate::test_support::{FakeLens, ALICE_WALLET};
    use serde_json::json;
    use uuid::Uuid;

    async fn feed_with(fake: &FakeLens) -> anyhow::Result<(FeedService, Arc<SocialStore>)> {
        let path = std::env::temp_dir().join(format!("feed_{}.json", Uuid::new_v4()));
        let store = SocialStore::new(path, 4).await?;
        let lens = Arc::new(fake.client(&["https://lens.example/graphql"]));
        Ok((FeedService::new(lens, Arc::clone(&store)), store))
    }

    async fn seed(store: &SocialStore, n: usize) -> anyhow::Result<()> {
        for i in 0..n {
            store.create_post(ALICE_WALLET, NewPost { content: format!("post {i}"), media: vec![] }).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn lens_feed_prefixes_cursor() -> anyhow::Result<()> {
        let fake = FakeLens::new(|_| {
            Ok(json!({ "data": { "posts": {
                "items": [{ "id": "0x01", "metadata": { "content": "from lens" }, "stats": { "comments": 1, "reactions": 3 } }],
                "pageInfo": { "next": "abc" }
            } } }))
        });
        let (feed, _) = feed_with(&fake).await?;
        let page = feed.posts(None, None, None, None).await?;
        assert_eq!(page.source, FeedSource::Lens);
        assert_eq!(page.next_cursor.as_deref(), Some("lens:abc"));
        assert_eq!(page.items[0].like_count, 3);
        assert_eq!(page.items[0].lens_id.as_deref(), Some("0x01"));

        feed.posts(Some("lens:abc"), None, None, None).await?;
        assert_eq!(fake.calls()[1].variables["request"]["cursor"], "abc");
        Ok(())
    }

    #[tokio::test]
    async fn outage_falls_back_to_local_posts() -> anyhow::Result<()> {
        let fake = FakeLens::offline();
        let (feed, store) = feed_with(&fake).await?;
        seed(&store, 3).await?;

        let page = feed.posts(None, None, Some(2), Some(ALICE_WALLET)).await?;
        assert_eq!(page.source, FeedSource::Local);
        assert_eq!(page.items.len(), 2);
        assert!(page.lens_error.is_some());
        let next = page.next_cursor.clone().unwrap_or_default();
        assert!(next.starts_with("local:"));

        let calls_before = fake.calls().len();
        let rest = feed.posts(Some(&next), None, Some(2), None).await?;
        assert_eq!(rest.items.len(), 1);
        assert_eq!(rest.next_cursor, None);
        assert_eq!(fake.calls().len(), calls_before, "local cursor never touches lens");
        Ok(())
    }

    #[tokio::test]
    async fn lens_cursor_surfaces_lens_errors() -> anyhow::Result<()> {
        let fake = FakeLens::offline();
        let (feed, _) = feed_with(&fake).await?;
        let err = feed.posts(Some("lens:abc"), None, None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Lens(LensError::Unavailable { .. })));
        assert!(matches!(feed.posts(Some("bogus"), None, None, None).await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn replies_fall_back_only_for_local_posts() -> anyhow::Result<()> {
        let fake = FakeLens::offline();
        let (feed, store) = feed_with(&fake).await?;
        let post = store.create_post(ALICE_WALLET, NewPost { content: "hi".into(), media: vec![] }).await?;
        store.create_reply(ALICE_WALLET, &post.id, "first").await?;

        // local post without a lens id never asks lens
        let page = feed.replies(&post.id, None, None).await?;
        assert_eq!(page.source, FeedSource::Local);
        assert_eq!(page.items[0].parent_id.as_deref(), Some(post.id.as_str()));
        assert!(fake.calls().is_empty());

        store.set_post_lens_id(&post.id, "0xlens").await?;
        let page = feed.replies(&post.id, None, None).await?;
        assert_eq!(page.source, FeedSource::Local);
        assert!(page.lens_error.is_some());

        let err = feed.replies("0xunknown", None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Lens(_)));
        Ok(())
    }
}
