use actix_web::{
    get,
    web::{Data, Json, Path},
};

use super::CustomError;
use crate::jobs::JobStatus;

/// Response of `/jobs/{task_id}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    /// `PENDING`, `STARTED`, `SUCCESS`, `FAILURE`, `RETRY`, `REVOKED` or a custom state.
    #[schema(value_type = String)]
    pub status: JobStatus,
    pub info: String,
}

/// Poll the state of a submitted job.
#[utoipa::path(
    get,
    operation_id = "jobsGet",
    params(("task_id" = uuid::Uuid, Path, description = "Job id returned on submission")),
    responses(
        (status = 200, description = "Job state.", body = JobResponse),
        (status = 404, description = "Unknown job.", body = CustomError)
    )
)]
#[get("/jobs/{task_id}")]
async fn handle(
    data: Data<super::WebServerData>,
    path: Path<uuid::Uuid>,
) -> actix_web::Result<Json<JobResponse>, CustomError> {
    let state = data.jobs.poll(&path.into_inner())?;
    Ok(Json(JobResponse {
        status: state.status,
        info: state.info,
    }))
}
