use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public identity shown next to posts and replies.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Author {
    pub fn bare(address: &str) -> Self {
        Self { address: address.to_string(), ..Default::default() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: Author,
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub liked_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub post_id: String,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub follower: String,
    pub followee: String,
    pub created_at: DateTime<Utc>,
}

/// The persisted document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialData {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(default)]
    pub follows: Vec<Follow>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Author>,
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Vec<String>>,
}

/// Client-facing post with derived counters.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author: Author,
    pub content: String,
    pub media: Vec<MediaItem>,
    pub created_at: DateTime<Utc>,
    pub reply_count: u32,
    pub like_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked_by_viewer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens_id: Option<String>,
}

impl PostView {
    pub fn from_post(post: Post, viewer: Option<&str>) -> Self {
        let liked_by_viewer = viewer.map(|v| post.liked_by.iter().any(|a| a == v));
        Self {
            like_count: post.liked_by.len() as u32,
            id: post.id,
            author: post.author,
            content: post.content,
            media: post.media,
            created_at: post.created_at,
            reply_count: post.reply_count,
            liked_by_viewer,
            lens_id: post.lens_id,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub like_count: u32,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FollowSummary {
    pub address: String,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub follower_count: usize,
    pub following_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

/// Partial profile edit; absent fields stay unchanged, empty strings clear.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}
