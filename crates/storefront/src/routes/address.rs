//! Address reference data handlers.
//!
//! Read-only lookups against the locality dataset; no checkout session is
//! involved. County path parameters accept either the code or the free-text
//! name, diacritics-insensitive.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use taraba_checkout::address::{AddressResolver, COUNTIES};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// One county entry.
#[derive(Debug, Serialize)]
pub struct CountyView {
    pub code: &'static str,
    pub name: &'static str,
}

/// Commune list plus the auto-selected entry when there is exactly one.
#[derive(Debug, Serialize)]
pub struct CommunesView {
    pub communes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_selected: Option<String>,
}

fn resolve_county(county: &str) -> Result<&'static str> {
    AddressResolver::county_code_for(county)
        .ok_or_else(|| AppError::NotFound(format!("county {county}")))
}

/// GET /api/address/counties
#[instrument(skip_all)]
pub async fn counties() -> Json<Vec<CountyView>> {
    Json(
        COUNTIES
            .iter()
            .map(|&(code, name)| CountyView { code, name })
            .collect(),
    )
}

/// GET /api/address/counties/{county}/localities
#[instrument(skip_all, fields(county = %county))]
pub async fn localities(
    State(state): State<AppState>,
    Path(county): Path<String>,
) -> Result<Json<Vec<String>>> {
    let code = resolve_county(&county)?;
    Ok(Json(state.resolver().localities_for(code)))
}

/// GET /api/address/counties/{county}/localities/{locality}/communes
#[instrument(skip_all, fields(county = %county, locality = %locality))]
pub async fn communes(
    State(state): State<AppState>,
    Path((county, locality)): Path<(String, String)>,
) -> Result<Json<CommunesView>> {
    let code = resolve_county(&county)?;
    let communes = state.resolver().communes_for(code, &locality);
    let auto_selected = AddressResolver::auto_selected_commune(&communes).cloned();
    Ok(Json(CommunesView {
        communes,
        auto_selected,
    }))
}
