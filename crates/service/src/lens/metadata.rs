//! Lens metadata documents for posts and accounts.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::social::{Author, MediaItem};

const TEXT_ONLY_SCHEMA: &str = "https://json-schemas.lens.dev/posts/text-only/3.0.0.json";
const IMAGE_SCHEMA: &str = "https://json-schemas.lens.dev/posts/image/3.0.0.json";
const VIDEO_SCHEMA: &str = "https://json-schemas.lens.dev/posts/video/3.0.0.json";
const ACCOUNT_SCHEMA: &str = "https://json-schemas.lens.dev/account/1.0.0.json";

fn media_ref(item: &MediaItem, fallback_type: &str) -> Value {
    json!({ "item": item.url, "type": item.mime_type.as_deref().unwrap_or(fallback_type) })
}

/// Build post metadata; the first media item decides the content focus.
pub fn post_metadata(content: &str, media: &[MediaItem]) -> Value {
    let id = Uuid::new_v4().to_string();
    let Some((first, rest)) = media.split_first() else {
        return json!({
            "$schema": TEXT_ONLY_SCHEMA,
            "lens": { "id": id, "content": content, "locale": "en", "mainContentFocus": "TEXT_ONLY" }
        });
    };

    let attachments: Vec<Value> = rest.iter().map(|m| media_ref(m, "image/jpeg")).collect();
    let is_video = first.mime_type.as_deref().is_some_and(|m| m.starts_with("video/"));
    if is_video {
        json!({
            "$schema": VIDEO_SCHEMA,
            "lens": {
                "id": id, "content": content, "locale": "en", "mainContentFocus": "VIDEO",
                "video": media_ref(first, "video/mp4"), "attachments": attachments
            }
        })
    } else {
        json!({
            "$schema": IMAGE_SCHEMA,
            "lens": {
                "id": id, "content": content, "locale": "en", "mainContentFocus": "IMAGE",
                "image": media_ref(first, "image/jpeg"), "attachments": attachments
            }
        })
    }
}

pub fn account_metadata(profile: &Author) -> Value {
    let mut lens = json!({ "id": Uuid::new_v4().to_string() });
    if let Some(obj) = lens.as_object_mut() {
        if let Some(name) = &profile.display_name { obj.insert("name".into(), json!(name)); }
        if let Some(bio) = &profile.bio { obj.insert("bio".into(), json!(bio)); }
        if let Some(picture) = &profile.avatar_url { obj.insert("picture".into(), json!(picture)); }
    }
    json!({ "$schema": ACCOUNT_SCHEMA, "lens": lens })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, mime: Option<&str>) -> MediaItem {
        MediaItem { url: url.into(), mime_type: mime.map(String::from) }
    }

    #[test]
    fn text_only_without_media() {
        let m = post_metadata("gm", &[]);
        assert_eq!(m["$schema"], TEXT_ONLY_SCHEMA);
        assert_eq!(m["lens"]["content"], "gm");
        assert_eq!(m["lens"]["mainContentFocus"], "TEXT_ONLY");
    }

    #[test]
    fn first_media_item_picks_focus() {
        let m = post_metadata("pic", &[item("ipfs://a", Some("image/png")), item("ipfs://b", None)]);
        assert_eq!(m["lens"]["mainContentFocus"], "IMAGE");
        assert_eq!(m["lens"]["image"]["type"], "image/png");
        assert_eq!(m["lens"]["attachments"][0]["item"], "ipfs://b");

        let v = post_metadata("clip", &[item("https://cdn.example/v.mp4", Some("video/mp4"))]);
        assert_eq!(v["$schema"], VIDEO_SCHEMA);
        assert_eq!(v["lens"]["video"]["item"], "https://cdn.example/v.mp4");
    }

    #[test]
    fn account_metadata_skips_empty_fields() {
        let profile = Author { display_name: Some("Alice".into()), ..Author::bare("0x1") };
        let m = account_metadata(&profile);
        assert_eq!(m["lens"]["name"], "Alice");
        assert!(m["lens"].get("bio").is_none());
    }
}
