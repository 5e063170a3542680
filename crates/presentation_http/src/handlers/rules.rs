//! Control-plane rule management
//!
//! Rules travel as their string-typed config records. Construction errors
//! come back as 400 with the specific validation failure; they never touch
//! the registry.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::{Rule, RuleConfig};
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// How many rules an operation removed
#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: usize,
}

/// Add one rule
///
/// Returns the normalized config of the stored rule. Re-adding a
/// field-identical rule is a no-op and still answers 201.
pub async fn add_rule(
    State(state): State<AppState>,
    Json(config): Json<RuleConfig>,
) -> Result<(StatusCode, Json<RuleConfig>), ApiError> {
    let rule = Rule::from_config(&config)?;
    let normalized = rule.to_config();
    let added = state.registry.add(rule);
    info!(
        source = %normalized.source,
        dest = %normalized.dest,
        mtype = %normalized.mtype,
        added,
        "add rule"
    );
    Ok((StatusCode::CREATED, Json(normalized)))
}

/// Remove every rule field-identical to the given config
///
/// Removing nothing is 404; the registry is unchanged either way.
pub async fn remove_rules(
    State(state): State<AppState>,
    Json(config): Json<RuleConfig>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let target = Rule::from_config(&config)?;
    let removed = state.registry.remove_matching(|rule| *rule == target);
    if removed == 0 {
        return Err(ApiError::NotFound("no matching rule".to_string()));
    }
    Ok(Json(RemovedResponse { removed }))
}

/// List every stored rule as config records
pub async fn list_rules(State(state): State<AppState>) -> Json<Vec<RuleConfig>> {
    let configs = state
        .registry
        .snapshot()
        .iter()
        .map(|rule| rule.to_config())
        .collect();
    Json(configs)
}

/// Drop every rule
pub async fn reset_rules(State(state): State<AppState>) -> Json<RemovedResponse> {
    Json(RemovedResponse {
        removed: state.registry.reset(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_response_serializes() {
        let json = serde_json::to_string(&RemovedResponse { removed: 2 }).unwrap();
        assert_eq!(json, "{\"removed\":2}");
    }
}
