use actix_web::{
    get,
    web::{self, Data, Json, Path},
};

use super::CustomError;

/// Versions of the running software.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize, utoipa::ToSchema)]
pub struct SoftwareVersions {
    /// Version of `gifts`.
    pub gifts: String,
    /// Version of the `actix-web` crate.
    pub actix_web: String,
}

impl SoftwareVersions {
    /// Create a new `SoftwareVersions` instance.
    pub fn new() -> Result<Self, anyhow::Error> {
        let gifts = crate::built_info::PKG_VERSION.to_string();
        let actix_web = crate::built_info::DEPENDENCIES
            .iter()
            .find(|(name, _)| name == &"actix-web")
            .map(|(_, version)| version.to_string())
            .ok_or_else(|| anyhow::anyhow!("Failed to find actix-web version"))?;

        Ok(Self { gifts, actix_web })
    }
}

/// Response of the `/api/v1/versionsInfo` endpoint.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize, utoipa::ToSchema)]
pub struct VersionsInfoResponse {
    /// Software versions.
    pub software: SoftwareVersions,
}

/// Query for the software versions.
#[allow(clippy::unused_async)]
#[utoipa::path(
    get,
    operation_id = "versionsInfo",
    responses(
        (status = 200, description = "Version information.", body = VersionsInfoResponse),
        (status = 500, description = "Internal server error.", body = CustomError)
    )
)]
#[get("/api/v1/versionsInfo")]
async fn handle(
    _data: Data<super::WebServerData>,
    _path: Path<()>,
    _query: web::Query<()>,
) -> actix_web::Result<Json<VersionsInfoResponse>, CustomError> {
    let software = SoftwareVersions::new()
        .map_err(|e| CustomError::new(anyhow::anyhow!("Problem determining version: {}", e)))?;
    Ok(Json(VersionsInfoResponse { software }))
}
