// src/pipeline/mod.rs
// The three gateway-facing steps of a mentor turn
//
// classify: does the student want content recommendations?
// recommend: which catalog items does the model pick?
// resolve: fetch full records for the picks, dropping whatever fails.
//
// Degradation policy: transport failures on classify/recommend abort the
// turn (the controller surfaces them); malformed model output and missing
// rows degrade silently to "fewer or no recommendations".

pub mod compose;

use anyhow::Result;
use futures::future;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::content::{ContentItem, ContentRef};
use crate::error::GatewayError;
use crate::gateway::{Gateway, GatewayRequest, StepType};
use crate::store::catalog;

/// The model is asked for at most this many picks; the parser enforces it
/// too so an over-long reply cannot widen the resolution fan-out.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Explicit per-user identity threaded into every pipeline entry point.
/// Replaces the ambient auth context the web client relied on. Email is
/// the identity the gateway and the history store both key on.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
}

impl Session {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Ask the gateway whether `message` is a request for content
/// recommendations. The reply must be exactly "true" (any case, any
/// surrounding whitespace); everything else - including explanatory text
/// and an empty stream - means no.
pub async fn classify(
    gateway: &dyn Gateway,
    session: &Session,
    message: &str,
    cancel: &CancellationToken,
) -> Result<bool, GatewayError> {
    let request = GatewayRequest::new(message, &session.email, StepType::RecommendationCheck);
    let reply = gateway.complete(request, cancel.clone()).await?;
    Ok(parse_bool_reply(&reply))
}

pub(crate) fn parse_bool_reply(reply: &str) -> bool {
    reply.trim().eq_ignore_ascii_case("true")
}

/// Fetch the published catalog and ask the model to pick the most relevant
/// items. A catalog-store failure or an unparseable model reply both
/// degrade to no recommendations; only a gateway transport failure
/// propagates.
pub async fn recommend(
    gateway: &dyn Gateway,
    pool: &SqlitePool,
    session: &Session,
    message: &str,
    cancel: &CancellationToken,
) -> Result<Vec<ContentRef>, GatewayError> {
    let catalog = tokio::select! {
        _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
        result = catalog::fetch_catalog(pool) => match result {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(error = %err, "catalog fetch failed, skipping recommendations");
                return Ok(Vec::new());
            }
        },
    };

    let mut request = GatewayRequest::new(message, &session.email, StepType::ContentAnalysis);
    request.content_data = Some(catalog);

    let reply = gateway.complete(request, cancel.clone()).await?;
    Ok(parse_recommendations(&reply))
}

pub(crate) fn parse_recommendations(reply: &str) -> Vec<ContentRef> {
    match serde_json::from_str::<Vec<ContentRef>>(reply.trim()) {
        Ok(mut refs) => {
            refs.truncate(MAX_RECOMMENDATIONS);
            refs
        }
        Err(err) => {
            debug!(error = %err, "recommendation reply was not a JSON array, treating as none");
            Vec::new()
        }
    }
}

/// Resolve recommended refs to full records. Lookups run independently;
/// a ref that errors or matches nothing is dropped without aborting the
/// rest, and surviving items keep the order of `refs`.
pub async fn resolve(
    pool: &SqlitePool,
    refs: &[ContentRef],
    cancel: &CancellationToken,
) -> Vec<ContentItem> {
    if refs.is_empty() {
        return Vec::new();
    }

    let lookups = refs.iter().map(|r| catalog::fetch_item(pool, r));
    let results = tokio::select! {
        _ = cancel.cancelled() => return Vec::new(),
        results = future::join_all(lookups) => results,
    };

    let mut items = Vec::new();
    for (content_ref, outcome) in refs.iter().zip(results) {
        match outcome {
            Ok(Some(item)) => items.push(item),
            Ok(None) => debug!(
                content_type = content_ref.content_type.as_str(),
                id = %content_ref.id,
                "recommended item not found, dropping"
            ),
            Err(err) => warn!(
                error = %err,
                id = %content_ref.id,
                "lookup failed, dropping recommended item"
            ),
        }
    }
    items
}
