use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RelayError;
use crate::providers::pubmed::DEFAULT_RETTYPE;
use crate::server::AppState;
use crate::server::validation::{clamp_retmax, validate_pmid, validate_pmid_list, validate_term};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub term: Option<String>,
    // 保持字符串，非法数字走默认值而不是 400
    pub retmax: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdParams {
    pub id: Option<String>,
    pub rettype: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub pmid: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, RelayError> {
    query.map(|Query(params)| params).map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected query string");
        RelayError::InvalidRequest("invalid query string".into())
    })
}

pub async fn search(
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, RelayError> {
    let params = query_params(query)?;
    let term = validate_term(params.term.as_deref())?;
    let retmax = clamp_retmax(params.retmax.as_deref());

    let reply = app_state
        .pubmed
        .search(term, retmax)
        .await
        .map_err(|failure| failure.into_relay_error("PubMed search request failed"))?;

    Ok(reply.into_response())
}

pub async fn summary(
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<IdParams>, QueryRejection>,
) -> Result<Response, RelayError> {
    let params = query_params(query)?;
    let ids = validate_pmid_list(params.id.as_deref())?;

    let reply = app_state
        .pubmed
        .summary(ids)
        .await
        .map_err(|failure| failure.into_relay_error("PubMed summary request failed"))?;

    Ok(reply.into_response())
}

/// Past validation this route always answers 200; a failed fetch yields an
/// empty abstract instead of an error.
pub async fn fetch(
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<IdParams>, QueryRejection>,
) -> Result<Json<FetchResponse>, RelayError> {
    let params = query_params(query)?;
    let pmid = validate_pmid(params.id.as_deref())?.to_string();
    let rettype = params
        .rettype
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_RETTYPE);

    let abstract_text = match app_state.pubmed.fetch(&pmid, rettype).await {
        Ok(text) => text,
        Err(failure) => {
            tracing::warn!(pmid = %pmid, error = %failure, "PubMed fetch failed, returning empty abstract");
            String::new()
        }
    };

    Ok(Json(FetchResponse {
        pmid,
        abstract_text,
    }))
}
