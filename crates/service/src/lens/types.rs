use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// ---- raw GraphQL shapes ----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUsername {
    #[serde(default)]
    local_name: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAccountMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAccount {
    #[serde(default)]
    address: String,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    username: Option<RawUsername>,
    #[serde(default)]
    metadata: Option<RawAccountMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMediaRef {
    #[serde(default)]
    item: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPostMetadata {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    image: Option<RawMediaRef>,
    #[serde(default)]
    video: Option<RawMediaRef>,
    #[serde(default)]
    attachments: Vec<RawMediaRef>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStats {
    #[serde(default)]
    comments: u32,
    #[serde(default, alias = "upvotes")]
    reactions: u32,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    id: String,
    #[serde(default)]
    author: RawAccount,
    #[serde(default, alias = "createdAt")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Option<RawPostMetadata>,
    #[serde(default)]
    stats: Option<RawStats>,
    #[serde(default)]
    comment_on: Option<RawRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageInfo {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    items: Vec<Value>,
    #[serde(default)]
    page_info: Option<RawPageInfo>,
}

// ---- normalized views ----

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LensAuthor {
    pub address: String,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LensPost {
    pub id: String,
    pub author: LensAuthor,
    pub content: String,
    pub media: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub comment_count: u32,
    pub reaction_count: u32,
    pub comment_on: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LensPage {
    pub items: Vec<LensPost>,
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LensAccount {
    pub address: String,
    pub owner: Option<String>,
    pub handle: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

fn handle_of(username: Option<RawUsername>) -> Option<String> {
    username.and_then(|u| {
        u.local_name.or_else(|| u.value.map(|v| v.rsplit('/').next().unwrap_or(&v).to_string()))
    })
}

impl From<RawAccount> for LensAuthor {
    fn from(a: RawAccount) -> Self {
        let meta = a.metadata.unwrap_or_default();
        LensAuthor {
            address: a.address.to_ascii_lowercase(),
            handle: handle_of(a.username),
            display_name: meta.name,
            avatar_url: meta.picture,
        }
    }
}

impl From<RawPost> for LensPost {
    fn from(p: RawPost) -> Self {
        let meta = p.metadata.unwrap_or_default();
        let media = meta
            .image
            .into_iter()
            .chain(meta.video)
            .chain(meta.attachments)
            .filter_map(|m| m.item)
            .collect();
        let stats = p.stats.unwrap_or_default();
        LensPost {
            id: p.id,
            author: p.author.into(),
            content: meta.content.unwrap_or_default(),
            media,
            created_at: p.timestamp,
            comment_count: stats.comments,
            reaction_count: stats.reactions,
            comment_on: p.comment_on.map(|r| r.id),
        }
    }
}

/// Parse a `{ items, pageInfo }` node. Items that are not posts (reposts,
/// hidden entries) are skipped.
pub fn parse_post_page(node: &Value) -> Result<LensPage, String> {
    let raw: RawPage = serde_json::from_value(node.clone()).map_err(|e| e.to_string())?;
    let total = raw.items.len();
    let items: Vec<LensPost> = raw
        .items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawPost>(item).ok())
        .map(LensPost::from)
        .collect();
    if items.len() < total {
        debug!(skipped = total - items.len(), "skipped non-post items");
    }
    Ok(LensPage { items, next_cursor: raw.page_info.and_then(|p| p.next) })
}

/// Parse an account node; `null` means the variant found no account.
pub fn parse_account(node: &Value) -> Result<Option<LensAccount>, String> {
    if node.is_null() {
        return Ok(None);
    }
    let raw: RawAccount = serde_json::from_value(node.clone()).map_err(|e| e.to_string())?;
    if raw.address.is_empty() {
        return Err("account without address".into());
    }
    let meta = raw.metadata.unwrap_or_default();
    Ok(Some(LensAccount {
        address: raw.address.to_ascii_lowercase(),
        owner: raw.owner.map(|o| o.to_ascii_lowercase()),
        handle: handle_of(raw.username),
        display_name: meta.name,
        bio: meta.bio,
        avatar_url: meta.picture,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_post_page_and_skips_reposts() {
        let node = json!({
            "items": [
                {
                    "__typename": "Post",
                    "id": "0x01-0x02",
                    "timestamp": "2025-03-01T10:00:00Z",
                    "author": {
                        "address": "0xAB00000000000000000000000000000000000001",
                        "username": { "localName": "alice", "value": "lens/alice" },
                        "metadata": { "name": "Alice", "picture": "https://cdn.example/a.png" }
                    },
                    "metadata": { "content": "gm", "image": { "item": "ipfs://img" } },
                    "stats": { "comments": 2, "reactions": 5 }
                },
                { "__typename": "Repost" }
            ],
            "pageInfo": { "next": "cursor-2" }
        });
        let page = parse_post_page(&node).unwrap();
        assert_eq!(page.items.len(), 1);
        let p = &page.items[0];
        assert_eq!(p.author.address, "0xab00000000000000000000000000000000000001");
        assert_eq!(p.author.handle.as_deref(), Some("alice"));
        assert_eq!(p.media, vec!["ipfs://img".to_string()]);
        assert_eq!((p.comment_count, p.reaction_count), (2, 5));
        assert_eq!(page.next_cursor.as_deref(), Some("cursor-2"));
    }

    #[test]
    fn minimal_post_shape_is_accepted() {
        let page = parse_post_page(&json!({ "items": [{ "id": "x", "metadata": { "content": "hi" } }] })).unwrap();
        assert_eq!(page.items[0].content, "hi");
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn page_without_items_is_an_error() {
        assert!(parse_post_page(&json!({ "nope": [] })).is_err());
    }

    #[test]
    fn account_parsing() {
        assert_eq!(parse_account(&Value::Null).unwrap(), None);
        let acc = parse_account(&json!({
            "address": "0xC0FFEE0000000000000000000000000000000001",
            "owner": "0xAA00000000000000000000000000000000000001",
            "username": { "value": "lens/bob" },
            "metadata": { "bio": "hi" }
        }))
        .unwrap()
        .unwrap();
        assert_eq!(acc.handle.as_deref(), Some("bob"));
        assert_eq!(acc.owner.as_deref(), Some("0xaa00000000000000000000000000000000000001"));
        assert!(parse_account(&json!({ "username": null })).is_err());
    }
}
