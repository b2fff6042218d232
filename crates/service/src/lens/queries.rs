//! Read query variants, most specific first.
//!
//! Lens has shipped several incompatible revisions of its read API; each
//! list below is walked in order until one variant answers with a shape we
//! can parse.

use serde_json::{json, Map, Value};

use super::transport::GraphqlRequest;

/// One candidate payload and where its result lives under `data`.
#[derive(Clone, Debug)]
pub struct QueryVariant {
    pub name: &'static str,
    pub request: GraphqlRequest,
    /// JSON pointer into `data`.
    pub result_path: &'static str,
}

const POST_FIELDS: &str = r#"
fragment PostFields on Post {
  id
  timestamp
  author {
    address
    username { localName value }
    metadata { name picture }
  }
  metadata {
    ... on TextOnlyMetadata { content }
    ... on ImageMetadata { content image { item } attachments { ... on MediaImage { item } } }
    ... on VideoMetadata { content video { item } }
    ... on ArticleMetadata { content }
  }
  stats { comments reactions }
  commentOn { id }
}
"#;

const MINIMAL_POST_FIELDS: &str = r#"
fragment MinimalPostFields on Post {
  id
  timestamp
  author { address username { localName } }
  metadata { ... on TextOnlyMetadata { content } ... on ImageMetadata { content image { item } } }
}
"#;

const POSTS_QUERY: &str = r#"
query Posts($request: PostsRequest!) {
  posts(request: $request) {
    items { __typename ... on Post { ...PostFields } }
    pageInfo { next }
  }
}
"#;

const POSTS_MINIMAL_QUERY: &str = r#"
query PostsMinimal($request: PostsRequest!) {
  posts(request: $request) {
    items { ... on Post { ...MinimalPostFields } }
    pageInfo { next }
  }
}
"#;

const EXPLORE_QUERY: &str = r#"
query ExplorePosts($request: ExplorePostsRequest!) {
  explorePosts(request: $request) {
    items { ...PostFields }
    pageInfo { next }
  }
}
"#;

const REFERENCES_QUERY: &str = r#"
query PostReferences($request: PostReferencesRequest!) {
  postReferences(request: $request) {
    items { __typename ... on Post { ...PostFields } }
    pageInfo { next }
  }
}
"#;

const ACCOUNT_QUERY: &str = r#"
query Account($request: AccountRequest!) {
  account(request: $request) {
    address
    owner
    username { localName value }
    metadata { name bio picture }
  }
}
"#;

const ACCOUNTS_AVAILABLE_QUERY: &str = r#"
query AccountsAvailable($request: AccountsAvailableRequest!) {
  accountsAvailable(request: $request) {
    items {
      ... on AccountManaged { account { address owner username { localName value } metadata { name bio picture } } }
      ... on AccountOwned { account { address owner username { localName value } metadata { name bio picture } } }
    }
  }
}
"#;

fn with_fragment(query: &str, fragment: &str) -> String {
    format!("{query}{fragment}")
}

fn request_object(entries: impl IntoIterator<Item = (&'static str, Option<Value>)>) -> Value {
    let map: Map<String, Value> = entries
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
        .collect();
    json!({ "request": Value::Object(map) })
}

/// Feed variants; `author` narrows to one account.
pub fn posts_variants(cursor: Option<&str>, author: Option<&str>, page_size: &str) -> Vec<QueryVariant> {
    let cursor_v = cursor.map(|c| json!(c));
    let authors = author.map(|a| json!([a]));

    let mut variants = vec![
        QueryVariant {
            name: "posts_root_filtered",
            request: GraphqlRequest::new(
                "Posts",
                &with_fragment(POSTS_QUERY, POST_FIELDS),
                request_object([
                    ("pageSize", Some(json!(page_size))),
                    ("cursor", cursor_v.clone()),
                    (
                        "filter",
                        Some(match &authors {
                            Some(a) => json!({ "authors": a, "postTypes": ["ROOT"] }),
                            None => json!({ "postTypes": ["ROOT"] }),
                        }),
                    ),
                ]),
            ),
            result_path: "/posts",
        },
        QueryVariant {
            name: "posts_unfiltered",
            request: GraphqlRequest::new(
                "Posts",
                &with_fragment(POSTS_QUERY, POST_FIELDS),
                request_object([
                    ("cursor", cursor_v.clone()),
                    ("filter", authors.clone().map(|a| json!({ "authors": a }))),
                ]),
            ),
            result_path: "/posts",
        },
        QueryVariant {
            name: "posts_minimal",
            request: GraphqlRequest::new(
                "PostsMinimal",
                &with_fragment(POSTS_MINIMAL_QUERY, MINIMAL_POST_FIELDS),
                request_object([
                    ("cursor", cursor_v.clone()),
                    ("filter", authors.map(|a| json!({ "authors": a }))),
                ]),
            ),
            result_path: "/posts",
        },
    ];

    if author.is_none() {
        variants.push(QueryVariant {
            name: "explore_posts",
            request: GraphqlRequest::new(
                "ExplorePosts",
                &with_fragment(EXPLORE_QUERY, POST_FIELDS),
                request_object([("pageSize", Some(json!(page_size))), ("cursor", cursor_v)]),
            ),
            result_path: "/explorePosts",
        });
    }
    variants
}

/// Comment variants for one post.
pub fn replies_variants(post_id: &str, cursor: Option<&str>, page_size: &str) -> Vec<QueryVariant> {
    let cursor_v = cursor.map(|c| json!(c));
    vec![
        QueryVariant {
            name: "post_references",
            request: GraphqlRequest::new(
                "PostReferences",
                &with_fragment(REFERENCES_QUERY, POST_FIELDS),
                request_object([
                    ("referencedPost", Some(json!(post_id))),
                    ("referenceTypes", Some(json!(["COMMENT_ON"]))),
                    ("pageSize", Some(json!(page_size))),
                    ("cursor", cursor_v.clone()),
                ]),
            ),
            result_path: "/postReferences",
        },
        QueryVariant {
            name: "post_references_default_page",
            request: GraphqlRequest::new(
                "PostReferences",
                &with_fragment(REFERENCES_QUERY, POST_FIELDS),
                request_object([
                    ("referencedPost", Some(json!(post_id))),
                    ("referenceTypes", Some(json!(["COMMENT_ON"]))),
                    ("cursor", cursor_v.clone()),
                ]),
            ),
            result_path: "/postReferences",
        },
        QueryVariant {
            name: "posts_comment_filter",
            request: GraphqlRequest::new(
                "Posts",
                &with_fragment(POSTS_QUERY, POST_FIELDS),
                request_object([
                    ("cursor", cursor_v),
                    ("filter", Some(json!({ "postTypes": ["COMMENT"], "commentOn": { "post": post_id } }))),
                ]),
            ),
            result_path: "/posts",
        },
    ]
}

/// Account lookup by account address, then by managing / owning wallet.
pub fn account_variants(address: &str) -> Vec<QueryVariant> {
    vec![
        QueryVariant {
            name: "account_by_address",
            request: GraphqlRequest::new("Account", ACCOUNT_QUERY, json!({ "request": { "address": address } })),
            result_path: "/account",
        },
        QueryVariant {
            name: "accounts_available",
            request: GraphqlRequest::new(
                "AccountsAvailable",
                ACCOUNTS_AVAILABLE_QUERY,
                json!({ "request": { "managedBy": address, "includeOwned": true } }),
            ),
            result_path: "/accountsAvailable/items/0/account",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_variants_shape() {
        let vs = posts_variants(Some("c1"), Some("0xabc"), "TEN");
        assert_eq!(vs.len(), 3, "explore is only offered for the global feed");
        let first = &vs[0].request.variables["request"];
        assert_eq!(first["cursor"], "c1");
        assert_eq!(first["pageSize"], "TEN");
        assert_eq!(first["filter"]["authors"][0], "0xabc");
        assert!(vs[0].request.query.contains("fragment PostFields"));

        let global = posts_variants(None, None, "TEN");
        assert_eq!(global.len(), 4);
        assert!(global[1].request.variables["request"].get("cursor").is_none());
        assert!(global[1].request.variables["request"].get("filter").is_none());
        assert_eq!(global[3].result_path, "/explorePosts");
    }

    #[test]
    fn replies_variants_reference_the_post() {
        let vs = replies_variants("0x01-0x02", None, "TEN");
        assert_eq!(vs[0].request.variables["request"]["referencedPost"], "0x01-0x02");
        assert_eq!(vs[2].request.variables["request"]["filter"]["commentOn"]["post"], "0x01-0x02");
    }
}
