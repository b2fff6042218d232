//! Mirrors local writes to Lens.
//!
//! A mirror never fails the local write: every outcome is folded into a
//! `MirrorReport` that the route returns next to the local result.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::lens::metadata::{account_metadata, post_metadata};
use crate::lens::mutations::{self, LensMutation};
use crate::lens::{LensClient, LensError};
use crate::media::MediaStore;
use crate::social::{Author, Post, Reply};

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MirrorStatus {
    Mirrored,
    Skipped,
    Failed,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct MirrorReport {
    pub status: MirrorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Access token issued during an account switch; sent back as a header.
    #[serde(skip)]
    pub refreshed_token: Option<String>,
}

impl MirrorReport {
    pub fn skipped() -> Self {
        Self { status: MirrorStatus::Skipped, id: None, error: None, refreshed_token: None }
    }

    fn failed(error: impl ToString) -> Self {
        Self { status: MirrorStatus::Failed, id: None, error: Some(error.to_string()), refreshed_token: None }
    }
}

pub struct LensMirror {
    lens: Arc<LensClient>,
    media: Arc<MediaStore>,
}

impl LensMirror {
    pub fn new(lens: Arc<LensClient>, media: Arc<MediaStore>) -> Self {
        Self { lens, media }
    }

    /// The token to mirror with, or `None` when mirroring is off for this request.
    fn token<'a>(&self, token: Option<&'a str>) -> Option<&'a str> {
        if !self.lens.is_enabled() {
            return None;
        }
        token.filter(|t| !t.is_empty())
    }

    async fn execute(&self, actor: &str, token: &str, mutation: LensMutation) -> MirrorReport {
        match self.lens.execute(actor, &mutation, token).await {
            Ok(result) => {
                info!(%actor, field = mutation.field, hash = ?result.outcome.hash, "mirrored to lens");
                MirrorReport {
                    status: MirrorStatus::Mirrored,
                    id: result.outcome.hash,
                    error: None,
                    refreshed_token: result.refreshed_token,
                }
            }
            Err(e) => {
                warn!(%actor, field = mutation.field, error = %e, "lens mirror failed");
                MirrorReport::failed(e)
            }
        }
    }

    pub async fn post(&self, actor: &str, token: Option<&str>, post: &Post) -> MirrorReport {
        let Some(token) = self.token(token) else { return MirrorReport::skipped() };
        let uri = match self.media.save_metadata(&post_metadata(&post.content, &post.media)).await {
            Ok(uri) => uri,
            Err(e) => return MirrorReport::failed(e),
        };
        self.execute(actor, token, mutations::create_post(&uri)).await
    }

    /// Replies only mirror when the parent made it to Lens.
    pub async fn reply(&self, actor: &str, token: Option<&str>, parent: &Post, reply: &Reply) -> MirrorReport {
        let Some(token) = self.token(token) else { return MirrorReport::skipped() };
        let Some(parent_lens_id) = parent.lens_id.as_deref() else {
            debug!(post_id = %parent.id, "parent not on lens, reply stays local");
            return MirrorReport::skipped();
        };
        let uri = match self.media.save_metadata(&post_metadata(&reply.content, &[])).await {
            Ok(uri) => uri,
            Err(e) => return MirrorReport::failed(e),
        };
        self.execute(actor, token, mutations::create_reply(&uri, parent_lens_id)).await
    }

    pub async fn like(&self, actor: &str, token: Option<&str>, post: &Post, liked: bool) -> MirrorReport {
        let Some(token) = self.token(token) else { return MirrorReport::skipped() };
        let Some(lens_id) = post.lens_id.as_deref() else { return MirrorReport::skipped() };
        let mutation = if liked { mutations::add_reaction(lens_id) } else { mutations::undo_reaction(lens_id) };
        self.execute(actor, token, mutation).await
    }

    async fn follow_mutation(
        &self,
        target: &str,
        build: fn(&str) -> LensMutation,
    ) -> Result<LensMutation, LensError> {
        let account = self
            .lens
            .fetch_lens_account(target)
            .await?
            .ok_or_else(|| LensError::AccountNotFound(target.to_string()))?;
        Ok(build(&account.address))
    }

    pub async fn follow(&self, actor: &str, token: Option<&str>, target: &str) -> MirrorReport {
        let Some(token) = self.token(token) else { return MirrorReport::skipped() };
        match self.follow_mutation(target, mutations::follow).await {
            Ok(m) => self.execute(actor, token, m).await,
            Err(e) => MirrorReport::failed(e),
        }
    }

    pub async fn unfollow(&self, actor: &str, token: Option<&str>, target: &str) -> MirrorReport {
        let Some(token) = self.token(token) else { return MirrorReport::skipped() };
        match self.follow_mutation(target, mutations::unfollow).await {
            Ok(m) => self.execute(actor, token, m).await,
            Err(e) => MirrorReport::failed(e),
        }
    }

    pub async fn profile(&self, actor: &str, token: Option<&str>, profile: &Author) -> MirrorReport {
        let Some(token) = self.token(token) else { return MirrorReport::skipped() };
        let uri = match self.media.save_metadata(&account_metadata(profile)).await {
            Ok(uri) => uri,
            Err(e) => return MirrorReport::failed(e),
        };
        self.execute(actor, token, mutations::set_account_metadata(&uri)).await
    }
}
