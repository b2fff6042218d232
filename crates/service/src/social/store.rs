use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::types::*;
use crate::content::{
    normalize_address, normalize_handle, sanitize_content, sanitize_field, validate_media_url,
    MAX_BIO_CHARS, MAX_DISPLAY_NAME_CHARS, MAX_POST_CHARS, MAX_REPLY_CHARS,
};
use crate::errors::ServiceError;
use crate::pagination::{paginate, CursorPage, PageRequest};
use crate::storage::json_doc_store::JsonDocStore;

/// Which posts a feed request wants.
#[derive(Clone, Debug, Default)]
pub enum PostFilter {
    #[default]
    All,
    Author(String),
    /// Posts by accounts the given address follows.
    FollowedBy(String),
}

/// Local store for posts, replies, follows, profiles and bookmarks.
///
/// Every mutating call reloads `social.json`, applies the change and writes
/// it back; callers pass already-authenticated actor addresses.
pub struct SocialStore {
    doc: Arc<JsonDocStore<SocialData>>,
    max_media_items: usize,
}

impl SocialStore {
    pub async fn new<P: Into<PathBuf>>(path: P, max_media_items: usize) -> Result<Arc<Self>, ServiceError> {
        let doc = JsonDocStore::<SocialData>::new(path).await?;
        Ok(Arc::new(Self { doc, max_media_items }))
    }

    fn author_for(data: &SocialData, address: &str) -> Author {
        data.profiles.get(address).cloned().unwrap_or_else(|| Author::bare(address))
    }

    // ---- posts ----

    pub async fn list_posts(&self, filter: &PostFilter, page: &PageRequest) -> Result<CursorPage<Post>, ServiceError> {
        let data = self.doc.load().await?;
        let mut posts: Vec<Post> = match filter {
            PostFilter::All => data.posts,
            PostFilter::Author(addr) => {
                let addr = normalize_address(addr)?;
                data.posts.into_iter().filter(|p| p.author.address == addr).collect()
            }
            PostFilter::FollowedBy(addr) => {
                let addr = normalize_address(addr)?;
                let followees: Vec<&str> = data
                    .follows
                    .iter()
                    .filter(|f| f.follower == addr)
                    .map(|f| f.followee.as_str())
                    .collect();
                data.posts
                    .iter()
                    .filter(|p| followees.contains(&p.author.address.as_str()))
                    .cloned()
                    .collect()
            }
        };
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        paginate(posts, page, |p| p.id.as_str())
    }

    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, ServiceError> {
        let data = self.doc.load().await?;
        Ok(data.posts.into_iter().find(|p| p.id == id))
    }

    /// Sanitize a new post and check its media against the per-post limit.
    /// Shared with posts that go straight to Lens.
    pub fn prepare_post(&self, input: NewPost) -> Result<(String, Vec<MediaItem>), ServiceError> {
        let content = sanitize_content(&input.content, MAX_POST_CHARS)?;
        if input.media.len() > self.max_media_items {
            return Err(ServiceError::validation(format!(
                "at most {} media items per post",
                self.max_media_items
            )));
        }
        let media = input
            .media
            .into_iter()
            .map(|m| Ok(MediaItem { url: validate_media_url(&m.url)?, mime_type: m.mime_type }))
            .collect::<Result<Vec<_>, ServiceError>>()?;
        if content.is_empty() && media.is_empty() {
            return Err(ServiceError::validation("post needs content or media"));
        }
        Ok((content, media))
    }

    #[instrument(skip(self, input), fields(media = input.media.len()))]
    pub async fn create_post(&self, actor: &str, input: NewPost) -> Result<Post, ServiceError> {
        let (content, media) = self.prepare_post(input)?;

        let post = self
            .doc
            .mutate(|data| {
                let post = Post {
                    id: Uuid::new_v4().to_string(),
                    author: Self::author_for(data, actor),
                    content,
                    media,
                    created_at: Utc::now(),
                    reply_count: 0,
                    liked_by: Vec::new(),
                    lens_id: None,
                };
                data.posts.push(post.clone());
                Ok(post)
            })
            .await?;
        info!(post_id = %post.id, author = %actor, "post created");
        Ok(post)
    }

    /// Delete a post together with its replies and any bookmarks of it.
    pub async fn delete_post(&self, actor: &str, id: &str) -> Result<(), ServiceError> {
        self.doc
            .mutate(|data| {
                let idx = data
                    .posts
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| ServiceError::not_found("post"))?;
                if data.posts[idx].author.address != actor {
                    return Err(ServiceError::Forbidden("only the author can delete a post".into()));
                }
                data.posts.remove(idx);
                data.replies.retain(|r| r.post_id != id);
                for list in data.bookmarks.values_mut() {
                    list.retain(|p| p != id);
                }
                Ok(())
            })
            .await?;
        info!(post_id = %id, author = %actor, "post deleted");
        Ok(())
    }

    pub async fn set_post_lens_id(&self, id: &str, lens_id: &str) -> Result<(), ServiceError> {
        self.doc
            .mutate(|data| {
                let post = data
                    .posts
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| ServiceError::not_found("post"))?;
                post.lens_id = Some(lens_id.to_string());
                Ok(())
            })
            .await
    }

    // ---- replies ----

    /// Replies oldest first.
    pub async fn list_replies(&self, post_id: &str, page: &PageRequest) -> Result<CursorPage<Reply>, ServiceError> {
        let data = self.doc.load().await?;
        if !data.posts.iter().any(|p| p.id == post_id) {
            return Err(ServiceError::not_found("post"));
        }
        let mut replies: Vec<Reply> = data.replies.into_iter().filter(|r| r.post_id == post_id).collect();
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        paginate(replies, page, |r| r.id.as_str())
    }

    pub async fn create_reply(&self, actor: &str, post_id: &str, content: &str) -> Result<Reply, ServiceError> {
        let content = sanitize_content(content, MAX_REPLY_CHARS)?;
        if content.is_empty() {
            return Err(ServiceError::validation("reply content is empty"));
        }
        let reply = self
            .doc
            .mutate(|data| {
                let author = Self::author_for(data, actor);
                let post = data
                    .posts
                    .iter_mut()
                    .find(|p| p.id == post_id)
                    .ok_or_else(|| ServiceError::not_found("post"))?;
                post.reply_count += 1;
                let reply = Reply {
                    id: Uuid::new_v4().to_string(),
                    post_id: post_id.to_string(),
                    author,
                    content,
                    created_at: Utc::now(),
                    lens_id: None,
                };
                data.replies.push(reply.clone());
                Ok(reply)
            })
            .await?;
        info!(reply_id = %reply.id, %post_id, author = %actor, "reply created");
        Ok(reply)
    }

    pub async fn set_reply_lens_id(&self, id: &str, lens_id: &str) -> Result<(), ServiceError> {
        self.doc
            .mutate(|data| {
                let reply = data
                    .replies
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| ServiceError::not_found("reply"))?;
                reply.lens_id = Some(lens_id.to_string());
                Ok(())
            })
            .await
    }

    // ---- likes ----

    pub async fn toggle_like(&self, actor: &str, post_id: &str) -> Result<LikeState, ServiceError> {
        self.doc
            .mutate(|data| {
                let post = data
                    .posts
                    .iter_mut()
                    .find(|p| p.id == post_id)
                    .ok_or_else(|| ServiceError::not_found("post"))?;
                let liked = match post.liked_by.iter().position(|a| a == actor) {
                    Some(i) => {
                        post.liked_by.remove(i);
                        false
                    }
                    None => {
                        post.liked_by.push(actor.to_string());
                        true
                    }
                };
                Ok(LikeState { liked, like_count: post.liked_by.len() as u32 })
            })
            .await
    }

    // ---- follows ----

    /// Follow `target`; following twice is a no-op returning the existing edge.
    pub async fn follow(&self, actor: &str, target: &str) -> Result<Follow, ServiceError> {
        let target = normalize_address(target)?;
        if target == actor {
            return Err(ServiceError::validation("cannot follow yourself"));
        }
        self.doc
            .mutate(|data| {
                if let Some(existing) = data.follows.iter().find(|f| f.follower == actor && f.followee == target) {
                    return Ok(existing.clone());
                }
                let follow = Follow { follower: actor.to_string(), followee: target.clone(), created_at: Utc::now() };
                data.follows.push(follow.clone());
                info!(follower = %actor, followee = %target, "follow created");
                Ok(follow)
            })
            .await
    }

    pub async fn unfollow(&self, actor: &str, target: &str) -> Result<bool, ServiceError> {
        let target = normalize_address(target)?;
        self.doc
            .mutate(|data| {
                let before = data.follows.len();
                data.follows.retain(|f| !(f.follower == actor && f.followee == target));
                Ok(data.follows.len() != before)
            })
            .await
    }

    pub async fn follow_summary(&self, address: &str, viewer: Option<&str>) -> Result<FollowSummary, ServiceError> {
        let address = normalize_address(address)?;
        let data = self.doc.load().await?;
        let followers: Vec<String> = data
            .follows
            .iter()
            .filter(|f| f.followee == address)
            .map(|f| f.follower.clone())
            .collect();
        let following: Vec<String> = data
            .follows
            .iter()
            .filter(|f| f.follower == address)
            .map(|f| f.followee.clone())
            .collect();
        let is_following = viewer.map(|v| followers.iter().any(|f| f == v));
        Ok(FollowSummary {
            follower_count: followers.len(),
            following_count: following.len(),
            address,
            followers,
            following,
            is_following,
        })
    }

    // ---- profiles ----

    pub async fn get_profile(&self, address: &str) -> Result<Author, ServiceError> {
        let address = normalize_address(address)?;
        let data = self.doc.load().await?;
        Ok(Self::author_for(&data, &address))
    }

    /// Apply a partial profile edit and refresh the author snapshot on the
    /// actor's posts and replies.
    pub async fn update_profile(&self, actor: &str, update: ProfileUpdate) -> Result<Author, ServiceError> {
        let handle = match update.handle.as_deref().map(str::trim) {
            None => None,
            Some("") => Some(None),
            Some(h) => Some(Some(normalize_handle(h)?)),
        };
        let display_name = update
            .display_name
            .as_deref()
            .map(|v| sanitize_field(v, MAX_DISPLAY_NAME_CHARS, "display name"))
            .transpose()?;
        let bio = update.bio.as_deref().map(|v| sanitize_field(v, MAX_BIO_CHARS, "bio")).transpose()?;
        let avatar_url = match update.avatar_url.as_deref().map(str::trim) {
            None => None,
            Some("") => Some(None),
            Some(url) => Some(Some(validate_media_url(url)?)),
        };

        let profile = self
            .doc
            .mutate(|data| {
                if let Some(Some(h)) = &handle {
                    let taken = data
                        .profiles
                        .values()
                        .any(|p| p.address != actor && p.handle.as_deref() == Some(h.as_str()));
                    if taken {
                        return Err(ServiceError::validation("handle already taken"));
                    }
                }

                let mut profile = Self::author_for(data, actor);
                if let Some(v) = handle { profile.handle = v; }
                if let Some(v) = display_name { profile.display_name = v; }
                if let Some(v) = bio { profile.bio = v; }
                if let Some(v) = avatar_url { profile.avatar_url = v; }

                for post in data.posts.iter_mut().filter(|p| p.author.address == actor) {
                    post.author = profile.clone();
                }
                for reply in data.replies.iter_mut().filter(|r| r.author.address == actor) {
                    reply.author = profile.clone();
                }
                data.profiles.insert(actor.to_string(), profile.clone());
                Ok(profile)
            })
            .await?;
        info!(address = %actor, "profile updated");
        Ok(profile)
    }

    // ---- bookmarks ----

    /// Bookmarked posts, most recently bookmarked first; deleted posts are skipped.
    pub async fn bookmarks(&self, actor: &str) -> Result<Vec<Post>, ServiceError> {
        let data = self.doc.load().await?;
        let ids = data.bookmarks.get(actor).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| data.posts.iter().find(|p| &p.id == id).cloned())
            .collect())
    }

    pub async fn add_bookmark(&self, actor: &str, post_id: &str) -> Result<(), ServiceError> {
        self.doc
            .mutate(|data| {
                if !data.posts.iter().any(|p| p.id == post_id) {
                    return Err(ServiceError::not_found("post"));
                }
                let list = data.bookmarks.entry(actor.to_string()).or_default();
                if !list.iter().any(|p| p == post_id) {
                    list.push(post_id.to_string());
                }
                Ok(())
            })
            .await
    }

    pub async fn remove_bookmark(&self, actor: &str, post_id: &str) -> Result<bool, ServiceError> {
        self.doc
            .mutate(|data| {
                let Some(list) = data.bookmarks.get_mut(actor) else {
                    return Ok(false);
                };
                let before = list.len();
                list.retain(|p| p != post_id);
                let removed = list.len() != before;
                if list.is_empty() {
                    data.bookmarks.remove(actor);
                }
                Ok(removed)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const BOB: &str = "0x00000000000000000000000000000000000000b2";
    const CAROL: &str = "0x00000000000000000000000000000000000000c3";

    async fn store() -> (Arc<SocialStore>, PathBuf) {
        let path = std::env::temp_dir().join(format!("social_store_{}.json", Uuid::new_v4()));
        (SocialStore::new(&path, 4).await.unwrap(), path)
    }

    fn text(s: &str) -> NewPost { NewPost { content: s.into(), media: vec![] } }

    #[tokio::test]
    async fn feed_is_newest_first_with_cursor() -> anyhow::Result<()> {
        let (s, path) = store().await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(s.create_post(ALICE, text(&format!("post {i}"))).await?.id);
        }
        let page = s.list_posts(&PostFilter::All, &PageRequest::new(None, Some(3))).await?;
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].id, ids[4]);
        let rest = s.list_posts(&PostFilter::All, &PageRequest::new(page.next_cursor, Some(3))).await?;
        assert_eq!(rest.items.len(), 2);
        assert_eq!(rest.items[1].id, ids[0]);
        assert!(rest.next_cursor.is_none());
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }

    #[tokio::test]
    async fn create_post_validates_input() -> anyhow::Result<()> {
        let (s, path) = store().await;
        assert!(matches!(s.create_post(ALICE, text("  <p></p> ")).await, Err(ServiceError::Validation(_))));

        let bad_media = NewPost {
            content: String::new(),
            media: vec![MediaItem { url: "javascript:alert(1)".into(), mime_type: None }],
        };
        assert!(s.create_post(ALICE, bad_media).await.is_err());

        let too_many = NewPost {
            content: "x".into(),
            media: (0..5)
                .map(|i| MediaItem { url: format!("https://cdn.example/{i}.png"), mime_type: None })
                .collect(),
        };
        assert!(s.create_post(ALICE, too_many).await.is_err());

        let media_only = NewPost {
            content: String::new(),
            media: vec![MediaItem { url: "ipfs://bafyabc".into(), mime_type: Some("image/png".into()) }],
        };
        let post = s.create_post(ALICE, media_only).await?;
        assert_eq!(post.media.len(), 1);
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }

    #[tokio::test]
    async fn only_author_deletes_and_cascade_applies() -> anyhow::Result<()> {
        let (s, path) = store().await;
        let post = s.create_post(ALICE, text("hello")).await?;
        s.create_reply(BOB, &post.id, "hi").await?;
        s.add_bookmark(BOB, &post.id).await?;

        assert!(matches!(s.delete_post(BOB, &post.id).await, Err(ServiceError::Forbidden(_))));
        s.delete_post(ALICE, &post.id).await?;
        assert!(s.get_post(&post.id).await?.is_none());
        assert!(s.bookmarks(BOB).await?.is_empty());
        assert!(matches!(s.delete_post(ALICE, &post.id).await, Err(ServiceError::NotFound(_))));
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }

    #[tokio::test]
    async fn replies_count_and_order() -> anyhow::Result<()> {
        let (s, path) = store().await;
        let post = s.create_post(ALICE, text("root")).await?;
        let first = s.create_reply(BOB, &post.id, "first").await?;
        s.create_reply(CAROL, &post.id, "second").await?;
        assert!(s.create_reply(BOB, &post.id, "   ").await.is_err());
        assert!(matches!(s.create_reply(BOB, "missing", "x").await, Err(ServiceError::NotFound(_))));

        let page = s.list_replies(&post.id, &PageRequest::default()).await?;
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, first.id);
        assert_eq!(s.get_post(&post.id).await?.unwrap().reply_count, 2);
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }

    #[tokio::test]
    async fn like_toggles() -> anyhow::Result<()> {
        let (s, path) = store().await;
        let post = s.create_post(ALICE, text("like me")).await?;
        assert_eq!(s.toggle_like(BOB, &post.id).await?, LikeState { liked: true, like_count: 1 });
        assert_eq!(s.toggle_like(CAROL, &post.id).await?, LikeState { liked: true, like_count: 2 });
        assert_eq!(s.toggle_like(BOB, &post.id).await?, LikeState { liked: false, like_count: 1 });
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }

    #[tokio::test]
    async fn follow_graph_and_following_feed() -> anyhow::Result<()> {
        let (s, path) = store().await;
        assert!(s.follow(ALICE, ALICE).await.is_err());
        s.follow(ALICE, BOB).await?;
        s.follow(ALICE, &BOB.to_ascii_uppercase().replacen("0X", "0x", 1)).await?;
        s.create_post(BOB, text("from bob")).await?;
        s.create_post(CAROL, text("from carol")).await?;

        let summary = s.follow_summary(BOB, Some(ALICE)).await?;
        assert_eq!(summary.followers, vec![ALICE.to_string()]);
        assert_eq!(summary.is_following, Some(true));

        let feed = s.list_posts(&PostFilter::FollowedBy(ALICE.into()), &PageRequest::default()).await?;
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].author.address, BOB);

        assert!(s.unfollow(ALICE, BOB).await?);
        assert!(!s.unfollow(ALICE, BOB).await?);
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }

    #[tokio::test]
    async fn profile_update_refreshes_snapshots() -> anyhow::Result<()> {
        let (s, path) = store().await;
        let post = s.create_post(ALICE, text("before")).await?;
        let profile = s
            .update_profile(
                ALICE,
                ProfileUpdate {
                    handle: Some("@Alice".into()),
                    display_name: Some("Alice <b>A</b>".into()),
                    bio: None,
                    avatar_url: Some("https://cdn.example/a.png".into()),
                },
            )
            .await?;
        assert_eq!(profile.handle.as_deref(), Some("alice"));
        assert_eq!(profile.display_name.as_deref(), Some("Alice A"));
        assert_eq!(s.get_post(&post.id).await?.unwrap().author, profile);

        let taken = s
            .update_profile(BOB, ProfileUpdate { handle: Some("alice".into()), ..Default::default() })
            .await;
        assert!(matches!(taken, Err(ServiceError::Validation(_))));

        let cleared = s
            .update_profile(ALICE, ProfileUpdate { avatar_url: Some(String::new()), ..Default::default() })
            .await?;
        assert!(cleared.avatar_url.is_none());
        assert_eq!(cleared.handle.as_deref(), Some("alice"));
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }

    #[tokio::test]
    async fn bookmarks_are_idempotent_and_ordered() -> anyhow::Result<()> {
        let (s, path) = store().await;
        let a = s.create_post(ALICE, text("a")).await?;
        let b = s.create_post(ALICE, text("b")).await?;
        s.add_bookmark(BOB, &a.id).await?;
        s.add_bookmark(BOB, &b.id).await?;
        s.add_bookmark(BOB, &a.id).await?;
        let list = s.bookmarks(BOB).await?;
        assert_eq!(list.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec![b.id.as_str(), a.id.as_str()]);
        assert!(s.remove_bookmark(BOB, &a.id).await?);
        assert!(!s.remove_bookmark(BOB, &a.id).await?);
        assert!(matches!(s.add_bookmark(BOB, "nope").await, Err(ServiceError::NotFound(_))));
        let _ = tokio::fs::remove_file(path).await;
        Ok(())
    }
}
