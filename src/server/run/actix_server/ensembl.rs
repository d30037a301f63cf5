//! Ensembl load and provenance endpoints.

use actix_web::{
    get, post,
    web::{Data, Json, Path},
    HttpResponse,
};

use super::CustomError;
use crate::error::Error;
use crate::history;
use crate::jobs::JobStatus;
use crate::loader::{self, GenePayload, LoadTarget};
use crate::model::{Id, SpeciesHistory, Transcript};

/// Response of a load submission.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct LoadResponse {
    pub task_id: uuid::Uuid,
    #[schema(value_type = String)]
    pub status: JobStatus,
}

/// Response of `/ensembl/release/latest/{assembly_accession}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct LatestRelease {
    pub release: i32,
}

fn submit_load(
    data: &super::WebServerData,
    target: LoadTarget,
    body: serde_json::Value,
) -> actix_web::Result<HttpResponse, CustomError> {
    let batch = loader::parse_batch(body)?;
    let handle = data.dispatcher.dispatch(target, batch)?;
    Ok(HttpResponse::Created().json(LoadResponse {
        task_id: handle.task_id,
        status: handle.status,
    }))
}

/// Submit a batch of genes with their transcripts for loading.
#[utoipa::path(
    post,
    operation_id = "ensemblLoad",
    params(LoadTarget),
    request_body = Vec<GenePayload>,
    responses(
        (status = 201, description = "Load job submitted.", body = LoadResponse),
        (status = 400, description = "Batch failed validation.", body = CustomError),
        (status = 500, description = "Internal server error.", body = CustomError)
    )
)]
#[post("/ensembl/load/{species}/{assembly_accession}/{ensembl_tax_id}/{ensembl_release}")]
async fn handle_load(
    data: Data<super::WebServerData>,
    path: Path<LoadTarget>,
    body: Json<serde_json::Value>,
) -> actix_web::Result<HttpResponse, CustomError> {
    submit_load(&data, path.into_inner(), body.into_inner())
}

/// Legacy route of the load endpoint, without OpenAPI.
#[post("/genes/load/{species}/{assembly_accession}/{ensembl_tax_id}/{ensembl_release}")]
async fn handle_load_legacy(
    data: Data<super::WebServerData>,
    path: Path<LoadTarget>,
    body: Json<serde_json::Value>,
) -> actix_web::Result<HttpResponse, CustomError> {
    submit_load(&data, path.into_inner(), body.into_inner())
}

#[utoipa::path(
    get,
    operation_id = "ensemblLatestRelease",
    params(("assembly_accession" = String, Path, description = "Assembly accession, any case")),
    responses(
        (status = 200, description = "Latest completely loaded release.", body = LatestRelease),
        (status = 404, description = "No completed load for the assembly.", body = CustomError)
    )
)]
#[get("/ensembl/release/latest/{assembly_accession}")]
async fn handle_latest_release(
    data: Data<super::WebServerData>,
    path: Path<String>,
) -> actix_web::Result<Json<LatestRelease>, CustomError> {
    let release = history::latest_release(&data.engine.store, &path)?;
    Ok(Json(LatestRelease { release }))
}

#[utoipa::path(
    get,
    operation_id = "ensemblSpeciesHistory",
    params(("id" = u64, Path, description = "Species history id")),
    responses(
        (status = 200, description = "The species history.", body = SpeciesHistory),
        (status = 404, description = "Not found.", body = CustomError)
    )
)]
#[get("/ensembl/species_history/{id}")]
async fn handle_species_history(
    data: Data<super::WebServerData>,
    path: Path<Id>,
) -> actix_web::Result<Json<SpeciesHistory>, CustomError> {
    Ok(Json(
        data.engine
            .store
            .require::<SpeciesHistory>(path.into_inner())?,
    ))
}

/// Set the alignment status of a species history.
#[utoipa::path(
    post,
    operation_id = "ensemblAlignmentStatus",
    params(
        ("id" = u64, Path, description = "Species history id"),
        ("status" = String, Path, description = "New alignment status")
    ),
    responses(
        (status = 200, description = "The updated species history.", body = SpeciesHistory),
        (status = 400, description = "Unknown species history."),
        (status = 500, description = "Internal server error.", body = CustomError)
    )
)]
#[post("/ensembl/species_history/{id}/alignment_status/{status}")]
async fn handle_alignment_status(
    data: Data<super::WebServerData>,
    path: Path<(Id, String)>,
) -> actix_web::Result<HttpResponse, CustomError> {
    let (id, status) = path.into_inner();
    match history::set_alignment_status(&data.engine.store, id, &status) {
        Ok(history) => Ok(HttpResponse::Ok().json(history)),
        Err(Error::NotFound(_)) => Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Could not find species history {}", id)
        }))),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    get,
    operation_id = "ensemblTranscript",
    params(("id" = u64, Path, description = "Transcript id")),
    responses(
        (status = 200, description = "The transcript.", body = Transcript),
        (status = 404, description = "Not found.", body = CustomError)
    )
)]
#[get("/ensembl/transcript/{id}")]
async fn handle_transcript(
    data: Data<super::WebServerData>,
    path: Path<Id>,
) -> actix_web::Result<Json<Transcript>, CustomError> {
    Ok(Json(
        data.engine.store.require::<Transcript>(path.into_inner())?,
    ))
}

#[cfg(test)]
mod test {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use crate::server::run::actix_server::configure;
    use crate::server::run::actix_server::test::fixture_data;

    #[actix_web::test]
    async fn load_is_submitted() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let batch = json!([{
            "ensg_id": "ENSG00000012048",
            "gene_name": "BRCA1",
            "transcripts": [{"enst_id": "ENST00000357654"}]
        }]);
        for prefix in ["/ensembl/load", "/genes/load"] {
            let req = test::TestRequest::post()
                .uri(&format!("{}/homo_sapiens/GCA_000001405.27/9606/95", prefix))
                .set_json(&batch)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["status"], "PENDING");
            assert!(body["task_id"].is_string());
        }
    }

    #[actix_web::test]
    async fn invalid_load_is_rejected() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/ensembl/load/homo_sapiens/GCA_000001405.27/9606/95")
            .set_json(json!([{"transcripts": [{"biotype": "protein_coding"}]}]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["fields"],
            json!({"[0].transcripts[0].enst_id": ["This field is required."]})
        );
    }

    #[actix_web::test]
    async fn load_rejects_mistyped_values_per_field() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/ensembl/load/homo_sapiens/GCA_000001405.27/9606/95")
            .set_json(json!([{
                "ensg_id": "ENSG00000141510",
                "transcripts": [{"enst_id": "ENST00000269305", "enst_version": "eight"}]
            }]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        let fields = body["fields"].as_object().unwrap();
        assert_eq!(
            fields.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["[0].transcripts[0].enst_version"]
        );

        let req = test::TestRequest::post()
            .uri("/genes/load/homo_sapiens/GCA_000001405.27/9606/95")
            .set_json(json!({"ensg_id": "ENSG00000141510"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["fields"]["non_field_errors"].is_array());

        let req = test::TestRequest::post()
            .uri("/ensembl/load/homo_sapiens/GCA_000001405.27/9606/95")
            .insert_header(("content-type", "application/json"))
            .set_payload("[{\"ensg_id\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["fields"]["non_field_errors"].is_array());
    }

    #[actix_web::test]
    async fn latest_release() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/ensembl/release/latest/gca_000001635.8")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"release": 94}));

        let req = test::TestRequest::get()
            .uri("/ensembl/release/latest/GCA_000000000.1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn alignment_status() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/ensembl/species_history/2/alignment_status/ALIGNMENT_STARTED")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["alignment_status"], "ALIGNMENT_STARTED");

        let req = test::TestRequest::get()
            .uri("/ensembl/species_history/2")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["alignment_status"], "ALIGNMENT_STARTED");

        let req = test::TestRequest::post()
            .uri("/ensembl/species_history/42/alignment_status/ALIGNMENT_STARTED")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({"error": "Could not find species history 42"})
        );
    }

    #[actix_web::test]
    async fn transcript_by_id() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/ensembl/transcript/3")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["enst_id"], "ENST00000269305");

        let req = test::TestRequest::get()
            .uri("/ensembl/transcript/30")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
