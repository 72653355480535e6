//! Variant product wizard. The draft lives in the session store and is
//! persisted in one transaction on `finish`.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::auth::AdminUser;
use super::AppState;
use crate::domain::aggregates::wizard::VariantPreview;
use crate::domain::aggregates::{ProductDetail, ProductDetails, ProductDraft, VariantEdit, WizardError, WizardStep};
use crate::domain::services::pricing::PricingRules;
use crate::domain::services::structure::ValuesInput;
use crate::{Result, ShopError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/wizard/:session", get(get_draft).delete(cancel))
        .route("/admin/wizard/:session/basic-info", post(basic_info))
        .route("/admin/wizard/:session/options", post(options))
        .route("/admin/wizard/:session/values", post(values))
        .route("/admin/wizard/:session/rules", post(rules))
        .route("/admin/wizard/:session/preview", get(preview))
        .route("/admin/wizard/:session/variants", post(variants))
        .route("/admin/wizard/:session/back", post(back))
        .route("/admin/wizard/:session/finish", post(finish))
}

#[derive(Debug, Serialize)]
pub struct DraftView {
    pub draft: ProductDraft,
    /// Present once the review step is reached.
    pub variants: Option<Vec<VariantPreview>>,
}

impl DraftView {
    fn of(draft: ProductDraft) -> Result<Self> {
        let variants = match draft.step() {
            WizardStep::VariantReview => Some(draft.preview()?),
            _ => None,
        };
        Ok(Self { draft, variants })
    }
}

/// Runs `f` on the session's draft and returns the new state.
async fn with_draft(
    s: &AppState,
    session: &str,
    f: impl FnOnce(&mut ProductDraft) -> std::result::Result<(), WizardError>,
) -> Result<Json<DraftView>> {
    let draft = s
        .sessions
        .update(session, |data| {
            let draft = data.wizard.as_mut().ok_or(ShopError::NotFound("wizard"))?;
            f(draft)?;
            Ok::<_, ShopError>(draft.clone())
        })
        .await?;
    Ok(Json(DraftView::of(draft)?))
}

async fn get_draft(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>) -> Result<Json<DraftView>> {
    let draft = s.sessions.get(&session).await.and_then(|d| d.wizard).ok_or(ShopError::NotFound("wizard"))?;
    Ok(Json(DraftView::of(draft)?))
}

/// Starts a draft, or restates the basic info of the current one.
async fn basic_info(
    State(s): State<AppState>,
    _: AdminUser,
    Path(session): Path<String>,
    Json(details): Json<ProductDetails>,
) -> Result<Json<DraftView>> {
    let draft = s
        .sessions
        .update(&session, |data| {
            let draft = data.wizard.get_or_insert_with(ProductDraft::new);
            if draft.step() == WizardStep::Committed {
                *draft = ProductDraft::new();
            }
            draft.submit_basic_info(details)?;
            Ok::<_, WizardError>(draft.clone())
        })
        .await?;
    tracing::debug!(session = %session, "wizard started");
    Ok(Json(DraftView::of(draft)?))
}

#[derive(Debug, Deserialize)]
pub struct OptionsRequest {
    pub options: Vec<String>,
}

async fn options(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>, Json(r): Json<OptionsRequest>) -> Result<Json<DraftView>> {
    with_draft(&s, &session, |d| d.submit_options(&r.options)).await
}

#[derive(Debug, Deserialize)]
pub struct ValuesRequest {
    pub values: HashMap<String, ValuesInput>,
}

async fn values(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>, Json(r): Json<ValuesRequest>) -> Result<Json<DraftView>> {
    with_draft(&s, &session, |d| d.submit_values(&r.values)).await
}

async fn rules(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>, Json(r): Json<PricingRules>) -> Result<Json<DraftView>> {
    with_draft(&s, &session, |d| d.submit_rules(r)).await
}

async fn preview(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>) -> Result<Json<Vec<VariantPreview>>> {
    let draft = s.sessions.get(&session).await.and_then(|d| d.wizard).ok_or(ShopError::NotFound("wizard"))?;
    Ok(Json(draft.preview()?))
}

#[derive(Debug, Deserialize)]
pub struct VariantsRequest {
    pub variants: Vec<VariantEdit>,
}

async fn variants(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>, Json(r): Json<VariantsRequest>) -> Result<Json<DraftView>> {
    with_draft(&s, &session, |d| d.submit_variants(r.variants)).await
}

async fn back(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>) -> Result<Json<DraftView>> {
    with_draft(&s, &session, |d| d.back().map(|_| ())).await
}

/// Persists the draft. It is marked committed while the write runs so a
/// second `finish` is refused, and restored if the write fails.
async fn finish(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>) -> Result<(StatusCode, Json<ProductDetail>)> {
    let (commit, pending) = s
        .sessions
        .update(&session, |data| {
            let draft = data.wizard.as_mut().ok_or(ShopError::NotFound("wizard"))?;
            let commit = draft.finish()?;
            let pending = draft.clone();
            draft.mark_committed();
            Ok::<_, ShopError>((commit, pending))
        })
        .await?;

    match s.products.create_from_wizard(commit).await {
        Ok(detail) => {
            s.sessions.update(&session, |data| data.wizard = None).await;
            Ok((StatusCode::CREATED, Json(detail)))
        }
        Err(e) => {
            s.sessions.update(&session, |data| data.wizard = Some(pending)).await;
            Err(e)
        }
    }
}

async fn cancel(State(s): State<AppState>, _: AdminUser, Path(session): Path<String>) -> StatusCode {
    s.sessions.update(&session, |data| data.wizard = None).await;
    StatusCode::NO_CONTENT
}
