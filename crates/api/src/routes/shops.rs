//! Shop provisioning endpoint.

use std::time::Instant;

use axum::{extract::State, Json};
use tracing::info;
use validator::Validate;

use domain::models::{CreateShopRequest, CreateShopResponse};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_shop_provisioned, ProvisionOutcome};

/// Provision a new shop.
///
/// POST /create_shop
///
/// Can take several minutes on a cold deployment: the shared containers are
/// created, bootstrapped and installed before the tenant site is added.
pub async fn create_shop(
    State(state): State<AppState>,
    Json(request): Json<CreateShopRequest>,
) -> Result<Json<CreateShopResponse>, ApiError> {
    request.validate()?;
    request.tenant_mode().map_err(ApiError::Validation)?;

    let started = Instant::now();
    let result = state.provisioner.provision_shop(&request).await;
    record_shop_provisioned(ProvisionOutcome::of(&result), started.elapsed());

    let response = result?;
    info!(
        slug = %response.site.slug,
        url = %response.site.url,
        soft_failed = response.setup.iter().filter(|s| !s.outcome.is_ok()).count(),
        "Shop provisioned"
    );
    Ok(Json(response))
}
