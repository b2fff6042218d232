//! Write mutations and their result unions.

use serde_json::{json, Value};

use super::errors::LensError;
use super::transport::GraphqlRequest;

/// A mutation payload plus the `data` field holding its result union.
#[derive(Clone, Debug)]
pub struct LensMutation {
    pub field: &'static str,
    pub request: GraphqlRequest,
}

const POST_MUTATION: &str = r#"
mutation CreatePost($request: CreatePostRequest!) {
  post(request: $request) {
    __typename
    ... on PostResponse { hash }
    ... on SponsoredTransactionRequest { reason }
    ... on SelfFundedTransactionRequest { reason }
    ... on TransactionWillFail { reason }
  }
}
"#;

const ADD_REACTION_MUTATION: &str = r#"
mutation AddReaction($request: AddReactionRequest!) {
  addReaction(request: $request) {
    __typename
    ... on AddReactionResponse { success }
    ... on AddReactionFailure { reason }
  }
}
"#;

const UNDO_REACTION_MUTATION: &str = r#"
mutation UndoReaction($request: UndoReactionRequest!) {
  undoReaction(request: $request) {
    __typename
    ... on UndoReactionResponse { success }
    ... on UndoReactionFailure { reason }
  }
}
"#;

const FOLLOW_MUTATION: &str = r#"
mutation Follow($request: CreateFollowRequest!) {
  follow(request: $request) {
    __typename
    ... on FollowResponse { hash }
    ... on AccountFollowOperationValidationFailed { reason }
    ... on SponsoredTransactionRequest { reason }
    ... on SelfFundedTransactionRequest { reason }
    ... on TransactionWillFail { reason }
  }
}
"#;

const UNFOLLOW_MUTATION: &str = r#"
mutation Unfollow($request: CreateUnfollowRequest!) {
  unfollow(request: $request) {
    __typename
    ... on UnfollowResponse { hash }
    ... on AccountFollowOperationValidationFailed { reason }
    ... on SponsoredTransactionRequest { reason }
    ... on SelfFundedTransactionRequest { reason }
    ... on TransactionWillFail { reason }
  }
}
"#;

const SET_METADATA_MUTATION: &str = r#"
mutation SetAccountMetadata($request: SetAccountMetadataRequest!) {
  setAccountMetadata(request: $request) {
    __typename
    ... on SetAccountMetadataResponse { hash }
    ... on SponsoredTransactionRequest { reason }
    ... on SelfFundedTransactionRequest { reason }
    ... on TransactionWillFail { reason }
  }
}
"#;

const SWITCH_ACCOUNT_MUTATION: &str = r#"
mutation SwitchAccount($request: SwitchAccountRequest!) {
  switchAccount(request: $request) {
    __typename
    ... on AuthenticationTokens { accessToken refreshToken idToken }
    ... on ForbiddenError { reason }
  }
}
"#;

pub fn create_post(content_uri: &str) -> LensMutation {
    LensMutation {
        field: "post",
        request: GraphqlRequest::new("CreatePost", POST_MUTATION, json!({ "request": { "contentUri": content_uri } })),
    }
}

pub fn create_reply(content_uri: &str, parent_post: &str) -> LensMutation {
    LensMutation {
        field: "post",
        request: GraphqlRequest::new(
            "CreatePost",
            POST_MUTATION,
            json!({ "request": { "contentUri": content_uri, "commentOn": { "post": parent_post } } }),
        ),
    }
}

pub fn add_reaction(post: &str) -> LensMutation {
    LensMutation {
        field: "addReaction",
        request: GraphqlRequest::new(
            "AddReaction",
            ADD_REACTION_MUTATION,
            json!({ "request": { "post": post, "reaction": "UPVOTE" } }),
        ),
    }
}

pub fn undo_reaction(post: &str) -> LensMutation {
    LensMutation {
        field: "undoReaction",
        request: GraphqlRequest::new(
            "UndoReaction",
            UNDO_REACTION_MUTATION,
            json!({ "request": { "post": post, "reaction": "UPVOTE" } }),
        ),
    }
}

pub fn follow(account: &str) -> LensMutation {
    LensMutation {
        field: "follow",
        request: GraphqlRequest::new("Follow", FOLLOW_MUTATION, json!({ "request": { "account": account } })),
    }
}

pub fn unfollow(account: &str) -> LensMutation {
    LensMutation {
        field: "unfollow",
        request: GraphqlRequest::new("Unfollow", UNFOLLOW_MUTATION, json!({ "request": { "account": account } })),
    }
}

pub fn set_account_metadata(metadata_uri: &str) -> LensMutation {
    LensMutation {
        field: "setAccountMetadata",
        request: GraphqlRequest::new(
            "SetAccountMetadata",
            SET_METADATA_MUTATION,
            json!({ "request": { "metadataUri": metadata_uri } }),
        ),
    }
}

pub fn switch_account(account: &str) -> LensMutation {
    LensMutation {
        field: "switchAccount",
        request: GraphqlRequest::new(
            "SwitchAccount",
            SWITCH_ACCOUNT_MUTATION,
            json!({ "request": { "account": account } }),
        ),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationOutcome {
    pub typename: String,
    /// Transaction hash for on-chain writes; `None` for off-chain reactions.
    pub hash: Option<String>,
}

/// Interpret a mutation result union.
pub fn parse_outcome(node: &Value) -> Result<MutationOutcome, LensError> {
    let typename = node.get("__typename").and_then(Value::as_str).unwrap_or("Unknown").to_string();

    if let Some(hash) = node.get("hash").and_then(Value::as_str) {
        return Ok(MutationOutcome { typename, hash: Some(hash.to_string()) });
    }
    if node.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(MutationOutcome { typename, hash: None });
    }
    if let Some(reason) = node.get("reason").and_then(Value::as_str) {
        return Err(LensError::Rejected(format!("{typename}: {reason}")));
    }
    Err(LensError::Unexpected(format!("unrecognized mutation result {typename}")))
}

/// Pull the access token out of a `switchAccount` result.
pub fn parse_switch_tokens(node: &Value) -> Result<String, LensError> {
    if let Some(token) = node.get("accessToken").and_then(Value::as_str) {
        return Ok(token.to_string());
    }
    match node.get("reason").and_then(Value::as_str) {
        Some(reason) => Err(LensError::Rejected(format!("switchAccount: {reason}"))),
        None => Err(LensError::Unexpected("switchAccount returned no tokens".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_and_reply_share_the_post_field() {
        let post = create_post("https://social.example/media/metadata/a.json");
        assert_eq!(post.field, "post");
        assert_eq!(post.request.operation_name.as_deref(), Some("CreatePost"));
        assert!(post.request.query.contains("mutation CreatePost"));
        assert_eq!(
            post.request.variables,
            json!({ "request": { "contentUri": "https://social.example/media/metadata/a.json" } })
        );

        let reply = create_reply("uri", "0x01-0x02");
        assert_eq!(reply.request.variables["request"]["commentOn"]["post"], "0x01-0x02");
        assert_eq!(reply.request.variables["request"]["contentUri"], "uri");
    }

    #[test]
    fn reaction_follow_and_metadata_shapes() {
        let r = add_reaction("0x01");
        assert_eq!(r.field, "addReaction");
        assert_eq!(r.request.variables, json!({ "request": { "post": "0x01", "reaction": "UPVOTE" } }));
        assert_eq!(undo_reaction("0x01").field, "undoReaction");

        let f = follow("0xacc");
        assert_eq!(f.request.variables, json!({ "request": { "account": "0xacc" } }));
        assert!(f.request.query.contains("follow(request: $request)"));
        assert_eq!(unfollow("0xacc").field, "unfollow");

        let m = set_account_metadata("uri");
        assert_eq!(m.request.variables["request"]["metadataUri"], "uri");
        assert_eq!(switch_account("0xacc").request.variables["request"]["account"], "0xacc");
    }

    #[test]
    fn outcome_parsing() {
        let ok = parse_outcome(&json!({ "__typename": "PostResponse", "hash": "0xh" })).unwrap();
        assert_eq!(ok.hash.as_deref(), Some("0xh"));
        assert!(parse_outcome(&json!({ "__typename": "AddReactionResponse", "success": true })).is_ok());
        assert!(matches!(
            parse_outcome(&json!({ "__typename": "TransactionWillFail", "reason": "nope" })),
            Err(LensError::Rejected(_))
        ));
        assert!(matches!(parse_outcome(&json!({})), Err(LensError::Unexpected(_))));
    }

    #[test]
    fn switch_token_parsing() {
        assert_eq!(parse_switch_tokens(&json!({ "accessToken": "t2" })).unwrap(), "t2");
        assert!(matches!(parse_switch_tokens(&json!({ "reason": "forbidden" })), Err(LensError::Rejected(_))));
    }
}
