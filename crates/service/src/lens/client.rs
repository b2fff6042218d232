use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::errors::LensError;
use super::mutations::{self, parse_outcome, parse_switch_tokens, LensMutation, MutationOutcome};
use super::queries::{self, QueryVariant};
use super::transport::{GraphqlRequest, GraphqlTransport, ReqwestTransport};
use super::types::{parse_account, parse_post_page, LensAccount, LensPage};
use crate::observability::{LENS_FAILOVERS_TOTAL, LENS_REQUESTS_TOTAL, LENS_VARIANT_FALLBACKS_TOTAL};

/// Result of a write, with the access token Lens issued if the client had
/// to switch accounts on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationResult {
    pub outcome: MutationOutcome,
    pub refreshed_token: Option<String>,
}

pub struct LensClient {
    transport: Arc<dyn GraphqlTransport>,
    endpoints: Vec<String>,
    enabled: bool,
    /// Index of the endpoint that answered last; the next request starts there.
    preferred: AtomicUsize,
    page_size: String,
    accounts: Cache<String, Option<LensAccount>>,
}

impl LensClient {
    pub fn new(transport: Arc<dyn GraphqlTransport>, cfg: &configs::LensConfig) -> Self {
        Self {
            transport,
            endpoints: cfg.endpoints.clone(),
            enabled: cfg.enabled && !cfg.endpoints.is_empty(),
            preferred: AtomicUsize::new(0),
            page_size: cfg.page_size.clone(),
            accounts: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(cfg.account_cache_ttl_secs))
                .build(),
        }
    }

    /// Client backed by reqwest with the configured timeout.
    pub fn from_config(cfg: &configs::LensConfig) -> Result<Self, LensError> {
        let transport = ReqwestTransport::new(Duration::from_secs(cfg.request_timeout_secs))?;
        Ok(Self::new(Arc::new(transport), cfg))
    }

    pub fn is_enabled(&self) -> bool { self.enabled }

    /// Send one GraphQL request, failing over across endpoints.
    ///
    /// Transport failures move on to the next endpoint. A GraphQL error
    /// body is an answer, so it is returned without trying the others.
    #[instrument(skip(self, request, access_token), fields(op = request.operation_name.as_deref().unwrap_or("-")))]
    pub async fn lens_request(&self, request: &GraphqlRequest, access_token: Option<&str>) -> Result<Value, LensError> {
        if !self.enabled {
            return Err(LensError::Disabled);
        }

        let n = self.endpoints.len();
        let start = self.preferred.load(Ordering::Relaxed) % n;
        let mut last = String::new();

        for i in 0..n {
            let idx = (start + i) % n;
            let endpoint = &self.endpoints[idx];
            LENS_REQUESTS_TOTAL.inc();

            match self.transport.post(endpoint, request, access_token).await {
                Ok(body) => {
                    self.preferred.store(idx, Ordering::Relaxed);
                    return extract_data(body);
                }
                Err(e) => {
                    warn!(%endpoint, error = %e, "lens endpoint failed, trying next");
                    LENS_FAILOVERS_TOTAL.inc();
                    last = format!("{endpoint}: {e}");
                }
            }
        }
        Err(LensError::Unavailable { attempts: n, last })
    }

    /// Walk `variants` until one parses. `parse` returning `Ok(None)` means
    /// the variant answered but had nothing; the chain continues and the
    /// overall result is `None` if no later variant has data either.
    async fn run_variants<T>(
        &self,
        operation: &'static str,
        variants: Vec<QueryVariant>,
        parse: impl Fn(&Value) -> Result<Option<T>, String>,
    ) -> Result<Option<T>, LensError> {
        let mut last = String::from("no variants");
        let mut answered_empty = false;

        for variant in variants {
            let outcome = match self.lens_request(&variant.request, None).await {
                Ok(data) => match data.pointer(variant.result_path) {
                    Some(node) => parse(node),
                    None if variant.result_path.matches('/').count() > 1 => Ok(None),
                    None => Err(format!("missing {}", variant.result_path)),
                },
                Err(e) if e.is_fatal_for_variants() => return Err(e),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(Some(value)) => {
                    debug!(operation, variant = variant.name, "query variant succeeded");
                    return Ok(Some(value));
                }
                Ok(None) => answered_empty = true,
                Err(reason) => {
                    debug!(operation, variant = variant.name, %reason, "query variant failed");
                    last = format!("{}: {reason}", variant.name);
                }
            }
            LENS_VARIANT_FALLBACKS_TOTAL.with_label_values(&[operation]).inc();
        }

        if answered_empty {
            return Ok(None);
        }
        Err(LensError::VariantsExhausted { operation, last })
    }

    /// Feed from Lens, optionally for a single author account.
    pub async fn fetch_lens_posts(&self, cursor: Option<&str>, author: Option<&str>) -> Result<LensPage, LensError> {
        let variants = queries::posts_variants(cursor, author, &self.page_size);
        let page = self.run_variants("posts", variants, |node| parse_post_page(node).map(Some)).await?;
        Ok(page.unwrap_or_default())
    }

    /// Comments on one Lens post.
    pub async fn fetch_lens_replies(&self, post_id: &str, cursor: Option<&str>) -> Result<LensPage, LensError> {
        let variants = queries::replies_variants(post_id, cursor, &self.page_size);
        let page = self
            .run_variants("replies", variants, |node| {
                let mut page = parse_post_page(node)?;
                // the generic posts filter may return comments on other posts
                page.items.retain(|p| p.comment_on.as_deref().map_or(true, |parent| parent == post_id));
                Ok(Some(page))
            })
            .await?;
        Ok(page.unwrap_or_default())
    }

    /// Account by account address or managing wallet; cached, misses included.
    pub async fn fetch_lens_account(&self, address: &str) -> Result<Option<LensAccount>, LensError> {
        let key = address.to_ascii_lowercase();
        if let Some(hit) = self.accounts.get(&key).await {
            return Ok(hit);
        }
        let account = self.run_variants("account", queries::account_variants(&key), parse_account).await?;
        self.accounts.insert(key, account.clone()).await;
        Ok(account)
    }

    async fn mutate_once(&self, mutation: &LensMutation, token: &str) -> Result<MutationOutcome, LensError> {
        let data = self.lens_request(&mutation.request, Some(token)).await?;
        let node = data
            .get(mutation.field)
            .ok_or_else(|| LensError::Unexpected(format!("missing {} in response", mutation.field)))?;
        parse_outcome(node)
    }

    /// Exchange the session for one acting as the actor's Lens account.
    async fn switch_account(&self, actor: &str, token: &str) -> Result<String, LensError> {
        let account = self
            .fetch_lens_account(actor)
            .await?
            .ok_or_else(|| LensError::AccountNotFound(actor.to_string()))?;
        let switch = mutations::switch_account(&account.address);
        let data = self.lens_request(&switch.request, Some(token)).await?;
        let node = data
            .get(switch.field)
            .ok_or_else(|| LensError::Unexpected("missing switchAccount in response".into()))?;
        parse_switch_tokens(node)
    }

    /// Run a write mutation. An onboarding-state rejection triggers one
    /// `switchAccount` and a single retry with the fresh token.
    #[instrument(skip(self, mutation, token), fields(field = mutation.field))]
    pub async fn execute(&self, actor: &str, mutation: &LensMutation, token: &str) -> Result<MutationResult, LensError> {
        match self.mutate_once(mutation, token).await {
            Ok(outcome) => Ok(MutationResult { outcome, refreshed_token: None }),
            Err(e) if e.is_onboarding() => {
                info!(%actor, error = %e, "account onboarding, switching account and retrying once");
                let fresh = self.switch_account(actor, token).await?;
                let outcome = self.mutate_once(mutation, &fresh).await?;
                Ok(MutationResult { outcome, refreshed_token: Some(fresh) })
            }
            Err(e) => Err(e),
        }
    }
}

/// Split a GraphQL body into `data` or a `GraphQl` error.
fn extract_data(mut body: Value) -> Result<Value, LensError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array).filter(|e| !e.is_empty()) {
        let messages = errors
            .iter()
            .map(|e| e.get("message").and_then(Value::as_str).unwrap_or("unknown error").to_string())
            .collect();
        return Err(LensError::GraphQl { messages });
    }
    match body.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(LensError::GraphQl { messages: vec!["response has no data".into()] }),
    }
}
