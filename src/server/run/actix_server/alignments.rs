//! Alignment run, alignment, and alignment string endpoints.

use actix_web::{
    get, post, put,
    web::{self, Data, Json, Path},
    HttpResponse,
};

use super::CustomError;
use crate::alignments;
use crate::common::split_list;
use crate::error::{Error, Result};
use crate::mapping::search::{PAGE_SIZE_DEFAULT, PAGE_SIZE_MAX};
use crate::model::{Alignment, AlignmentRun, EnspUCigar, Id};

/// One page of alignments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, utoipa::ToSchema)]
pub struct AlignmentPage {
    pub count: usize,
    pub results: Vec<Alignment>,
}

impl AlignmentPage {
    fn new(all: Vec<Alignment>, limit: Option<usize>, offset: Option<usize>) -> Self {
        let limit = limit.unwrap_or(PAGE_SIZE_DEFAULT).min(PAGE_SIZE_MAX);
        let count = all.len();
        let results = all
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit)
            .collect();
        Self { count, results }
    }
}

/// Parameters of `/alignments/alignment_run/{id}/alignments`.
#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RunAlignmentsQuery {
    /// Comma-separated mapping ids to restrict to.
    pub mapping_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl RunAlignmentsQuery {
    fn mapping_ids(&self) -> Result<Option<Vec<Id>>> {
        let Some(value) = self.mapping_id.as_deref() else {
            return Ok(None);
        };
        split_list(value)
            .map(|id| {
                id.parse::<Id>().map_err(|_| {
                    Error::invalid("mapping_id", format!("not a mapping id: {}", id))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

/// Parameters of `/alignments/latest/assembly/{assembly_accession}`.
#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestQuery {
    /// `perfect_match` (default) or `identity`.
    #[serde(rename = "type")]
    pub score_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[utoipa::path(
    post,
    operation_id = "alignmentRunCreate",
    request_body = AlignmentRun,
    responses(
        (status = 201, description = "Run stored.", body = AlignmentRun),
        (status = 400, description = "Invalid run.", body = CustomError)
    )
)]
#[post("/alignments/alignment_run")]
async fn handle_create_run(
    data: Data<super::WebServerData>,
    body: Json<AlignmentRun>,
) -> actix_web::Result<HttpResponse, CustomError> {
    let run = alignments::create_run(&data.engine.store, body.into_inner())?;
    Ok(HttpResponse::Created().json(run))
}

#[utoipa::path(
    get,
    operation_id = "alignmentRunGet",
    params(("id" = u64, Path, description = "Alignment run id")),
    responses(
        (status = 200, description = "The run.", body = AlignmentRun),
        (status = 404, description = "Not found.", body = CustomError)
    )
)]
#[get("/alignments/alignment_run/{id}")]
async fn handle_get_run(
    data: Data<super::WebServerData>,
    path: Path<Id>,
) -> actix_web::Result<Json<AlignmentRun>, CustomError> {
    Ok(Json(
        data.engine
            .store
            .require::<AlignmentRun>(path.into_inner())?,
    ))
}

/// Alignments of a run, ordered by id.
#[utoipa::path(
    get,
    operation_id = "alignmentRunAlignments",
    params(("id" = u64, Path, description = "Alignment run id"), RunAlignmentsQuery),
    responses(
        (status = 200, description = "Page of alignments.", body = AlignmentPage),
        (status = 400, description = "Malformed mapping ids.", body = CustomError),
        (status = 404, description = "Unknown run.", body = CustomError)
    )
)]
#[get("/alignments/alignment_run/{id}/alignments")]
async fn handle_run_alignments(
    data: Data<super::WebServerData>,
    path: Path<Id>,
    query: web::Query<RunAlignmentsQuery>,
) -> actix_web::Result<Json<AlignmentPage>, CustomError> {
    let mapping_ids = query.mapping_ids()?;
    let all = alignments::alignments_for_run(
        &data.engine.store,
        path.into_inner(),
        mapping_ids.as_deref(),
    )?;
    Ok(Json(AlignmentPage::new(all, query.limit, query.offset)))
}

/// Store an alignment; an existing one for the same run and mapping is returned as is.
#[utoipa::path(
    post,
    operation_id = "alignmentCreate",
    request_body = Alignment,
    responses(
        (status = 201, description = "Alignment stored or already present.", body = Alignment),
        (status = 400, description = "Invalid alignment.", body = CustomError)
    )
)]
#[post("/alignments/alignment")]
async fn handle_create_alignment(
    data: Data<super::WebServerData>,
    body: Json<Alignment>,
) -> actix_web::Result<HttpResponse, CustomError> {
    let (alignment, created) =
        alignments::create_alignment(&data.engine.store, body.into_inner())?;
    if !created {
        tracing::debug!("alignment {} already present", alignment.alignment_id);
    }
    Ok(HttpResponse::Created().json(alignment))
}

#[utoipa::path(
    get,
    operation_id = "alignmentGet",
    params(("id" = u64, Path, description = "Alignment id")),
    responses(
        (status = 200, description = "The alignment.", body = Alignment),
        (status = 404, description = "Not found.", body = CustomError)
    )
)]
#[get("/alignments/alignment/{id}")]
async fn handle_get_alignment(
    data: Data<super::WebServerData>,
    path: Path<Id>,
) -> actix_web::Result<Json<Alignment>, CustomError> {
    Ok(Json(
        data.engine.store.require::<Alignment>(path.into_inner())?,
    ))
}

/// Alignments of the latest run of a score type for an assembly.
#[utoipa::path(
    get,
    operation_id = "alignmentLatest",
    params(
        ("assembly_accession" = String, Path, description = "Assembly accession, any case"),
        LatestQuery
    ),
    responses(
        (status = 200, description = "Page of alignments.", body = AlignmentPage),
        (status = 404, description = "Unknown type or no run.", body = CustomError)
    )
)]
#[get("/alignments/latest/assembly/{assembly_accession}")]
async fn handle_latest(
    data: Data<super::WebServerData>,
    path: Path<String>,
    query: web::Query<LatestQuery>,
) -> actix_web::Result<Json<AlignmentPage>, CustomError> {
    let score_type = query.score_type.as_deref().unwrap_or("perfect_match");
    let all = alignments::latest_alignments(&data.engine.store, &path, score_type)?;
    Ok(Json(AlignmentPage::new(all, query.limit, query.offset)))
}

/// New strings for `PUT /ensembl/cigar/align/{id}`.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct CigarUpdate {
    pub cigarplus: String,
    pub mdz: String,
}

#[utoipa::path(
    post,
    operation_id = "cigarCreate",
    request_body = EnspUCigar,
    responses(
        (status = 201, description = "Alignment strings stored.", body = EnspUCigar),
        (status = 400, description = "Invalid or duplicate.", body = CustomError)
    )
)]
#[post("/ensembl/cigar")]
async fn handle_create_cigar(
    data: Data<super::WebServerData>,
    body: Json<EnspUCigar>,
) -> actix_web::Result<HttpResponse, CustomError> {
    let cigar = alignments::create_cigar(&data.engine.store, body.into_inner())?;
    Ok(HttpResponse::Created().json(cigar))
}

/// Alignment strings of a run's alignment between a UniProt sequence version and a
/// transcript.
#[utoipa::path(
    get,
    operation_id = "cigarFetch",
    params(
        ("run" = u64, Path, description = "Alignment run id"),
        ("acc" = String, Path, description = "UniProt accession"),
        ("seq_version" = i32, Path, description = "Sequence version"),
        ("enst_id" = String, Path, description = "Ensembl transcript id")
    ),
    responses(
        (status = 200, description = "The alignment strings.", body = EnspUCigar),
        (status = 404, description = "Not found.", body = CustomError)
    )
)]
#[get("/ensembl/cigar/{run}/{acc}/{seq_version}/{enst_id}")]
async fn handle_fetch_cigar(
    data: Data<super::WebServerData>,
    path: Path<(Id, String, i32, String)>,
) -> actix_web::Result<Json<EnspUCigar>, CustomError> {
    let (run, acc, seq_version, enst_id) = path.into_inner();
    Ok(Json(alignments::fetch_cigar(
        &data.engine.store,
        run,
        &acc,
        seq_version,
        &enst_id,
    )?))
}

#[utoipa::path(
    get,
    operation_id = "cigarByAlignment",
    params(("id" = u64, Path, description = "Alignment id")),
    responses(
        (status = 200, description = "The alignment strings.", body = EnspUCigar),
        (status = 404, description = "Not found.", body = CustomError)
    )
)]
#[get("/ensembl/cigar/align/{id}")]
async fn handle_cigar_by_alignment(
    data: Data<super::WebServerData>,
    path: Path<Id>,
) -> actix_web::Result<Json<EnspUCigar>, CustomError> {
    Ok(Json(alignments::cigar_by_alignment(
        &data.engine.store,
        path.into_inner(),
    )?))
}

#[utoipa::path(
    put,
    operation_id = "cigarUpdateByAlignment",
    params(("id" = u64, Path, description = "Alignment id")),
    request_body = CigarUpdate,
    responses(
        (status = 200, description = "Updated alignment strings.", body = EnspUCigar),
        (status = 400, description = "Blank strings.", body = CustomError),
        (status = 404, description = "Not found.", body = CustomError)
    )
)]
#[put("/ensembl/cigar/align/{id}")]
async fn handle_update_cigar(
    data: Data<super::WebServerData>,
    path: Path<Id>,
    body: Json<CigarUpdate>,
) -> actix_web::Result<Json<EnspUCigar>, CustomError> {
    let CigarUpdate { cigarplus, mdz } = body.into_inner();
    Ok(Json(alignments::update_cigar(
        &data.engine.store,
        path.into_inner(),
        cigarplus,
        mdz,
    )?))
}

#[cfg(test)]
mod test {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use crate::server::run::actix_server::configure;
    use crate::server::run::actix_server::test::fixture_data;

    fn ids(page: &Value) -> Vec<u64> {
        page["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["alignment_id"].as_u64().unwrap())
            .collect()
    }

    #[actix_web::test]
    async fn run_alignments_filtered_and_paged() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/alignments/alignment_run/1/alignments?mapping_id=3,1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec![1, 2]);

        let req = test::TestRequest::get()
            .uri("/alignments/alignment_run/1/alignments?limit=1&offset=1")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 2);
        assert_eq!(ids(&body), vec![2]);

        let req = test::TestRequest::get()
            .uri("/alignments/alignment_run/1/alignments?mapping_id=x")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/alignments/alignment_run/8/alignments")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn create_run_and_alignment() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/alignments/alignment_run")
            .set_json(json!({
                "score1_type": "identity",
                "mapping_history_id": 2,
                "ensembl_release": 94
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let run: Value = test::read_body_json(resp).await;
        assert_eq!(run["alignment_run_id"], 3);

        let alignment = json!({"alignment_run_id": 3, "mapping_id": 4, "score1": 0.98});
        let mut seen = vec![];
        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/alignments/alignment")
                .set_json(&alignment)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            seen.push(body["alignment_id"].as_u64().unwrap());
        }
        assert_eq!(seen, vec![4, 4]);

        let req = test::TestRequest::get()
            .uri("/alignments/latest/assembly/GCA_000001635.8?type=identity")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec![4]);

        let req = test::TestRequest::get()
            .uri("/alignments/alignment/4")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["mapping_id"], 4);
    }

    #[actix_web::test]
    async fn cigar_create_fetch_update() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/ensembl/cigar")
            .set_json(json!({"alignment_id": 2, "cigarplus": "393M", "mdz": "393"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/ensembl/cigar")
            .set_json(json!({"alignment_id": 2, "cigarplus": "1M", "mdz": "1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["fields"]["alignment_id"].is_array());

        let req = test::TestRequest::get()
            .uri("/ensembl/cigar/1/P04637/4/ENST00000269305")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cigarplus"], "393M");

        let req = test::TestRequest::put()
            .uri("/ensembl/cigar/align/2")
            .set_json(json!({"cigarplus": "390M3I", "mdz": "390"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/ensembl/cigar/align/2")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["cigarplus"], "390M3I");
        assert_eq!(body["mdz"], "390");

        for uri in ["/ensembl/cigar/align/1", "/ensembl/cigar/1/P04637/3/ENST00000269305"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn latest_defaults_to_perfect_match() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/alignments/latest/assembly/GCA_000001405.27")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(ids(&body), vec![1, 2]);

        let req = test::TestRequest::get()
            .uri("/alignments/latest/assembly/GCA_000001405.27?type=blast")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
