//! Mapping search, detail and curation endpoints.

use actix_web::{
    get, post,
    web::{self, Data, Json, Path},
    HttpRequest, HttpResponse,
};

use super::{request_context, CustomError};
use crate::mapping::curation::MappingComments;
use crate::mapping::status::EventView;
use crate::mapping::{MappingDetail, SearchPage, SearchQuery};
use crate::model::Id;

/// Body of `POST /mappings/{id}/status`.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct StatusRequest {
    /// Status description, e.g. `REVIEWED`.
    pub status: String,
}

/// Body of `POST /mappings/{id}/comments`.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct CommentRequest {
    pub text: String,
}

/// Body of `POST /mappings/{id}/labels`.
#[derive(Debug, Clone, serde::Deserialize, utoipa::ToSchema)]
pub struct LabelRequest {
    /// Label description, e.g. `Fragment`.
    pub label: String,
}

/// Search mappings by term and facets.
#[utoipa::path(
    get,
    operation_id = "mappingsList",
    params(SearchQuery),
    responses(
        (status = 200, description = "Page of matching mappings.", body = SearchPage),
        (status = 400, description = "Malformed facets.", body = CustomError),
        (status = 404, description = "Unknown mapping id.", body = CustomError),
        (status = 500, description = "Internal server error.", body = CustomError)
    )
)]
#[get("/mappings")]
async fn handle_list(
    data: Data<super::WebServerData>,
    req: HttpRequest,
    query: web::Query<SearchQuery>,
) -> actix_web::Result<Json<SearchPage>, CustomError> {
    let ctx = request_context(&req);
    Ok(Json(data.engine.search(&ctx, &query.into_inner()).await?))
}

/// A mapping with its taxonomy and related mappings.
#[utoipa::path(
    get,
    operation_id = "mappingsGet",
    params(("id" = u64, Path, description = "Mapping id")),
    responses(
        (status = 200, description = "The mapping.", body = MappingDetail),
        (status = 404, description = "Mapping or one of its links not found.", body = CustomError),
        (status = 502, description = "Sequence service unavailable.", body = CustomError),
        (status = 500, description = "Internal server error.", body = CustomError)
    )
)]
#[get("/mappings/{id}")]
async fn handle_get(
    data: Data<super::WebServerData>,
    req: HttpRequest,
    path: Path<Id>,
) -> actix_web::Result<Json<MappingDetail>, CustomError> {
    let ctx = request_context(&req);
    Ok(Json(
        data.engine.mapping_detail(&ctx, path.into_inner()).await?,
    ))
}

/// Status, comments and labels of a mapping's pair.
#[utoipa::path(
    get,
    operation_id = "mappingsComments",
    params(("id" = u64, Path, description = "Mapping id")),
    responses(
        (status = 200, description = "Curation history.", body = MappingComments),
        (status = 404, description = "Mapping not found.", body = CustomError),
        (status = 500, description = "Internal server error.", body = CustomError)
    )
)]
#[get("/mappings/{id}/comments")]
async fn handle_comments(
    data: Data<super::WebServerData>,
    path: Path<Id>,
) -> actix_web::Result<Json<MappingComments>, CustomError> {
    Ok(Json(data.engine.mapping_comments(path.into_inner())?))
}

#[utoipa::path(
    post,
    operation_id = "mappingsAddComment",
    params(("id" = u64, Path, description = "Mapping id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment added.", body = EventView),
        (status = 400, description = "Blank comment.", body = CustomError),
        (status = 404, description = "Mapping not found.", body = CustomError)
    )
)]
#[post("/mappings/{id}/comments")]
async fn handle_add_comment(
    data: Data<super::WebServerData>,
    req: HttpRequest,
    path: Path<Id>,
    body: Json<CommentRequest>,
) -> actix_web::Result<HttpResponse, CustomError> {
    let ctx = request_context(&req);
    let event = data
        .engine
        .add_comment(&ctx, path.into_inner(), &body.text)?;
    Ok(HttpResponse::Created().json(event))
}

#[utoipa::path(
    post,
    operation_id = "mappingsAddStatus",
    params(("id" = u64, Path, description = "Mapping id")),
    request_body = StatusRequest,
    responses(
        (status = 201, description = "Status set.", body = EventView),
        (status = 400, description = "Unknown status.", body = CustomError),
        (status = 404, description = "Mapping not found.", body = CustomError)
    )
)]
#[post("/mappings/{id}/status")]
async fn handle_add_status(
    data: Data<super::WebServerData>,
    req: HttpRequest,
    path: Path<Id>,
    body: Json<StatusRequest>,
) -> actix_web::Result<HttpResponse, CustomError> {
    let ctx = request_context(&req);
    let event = data
        .engine
        .add_status(&ctx, path.into_inner(), &body.status)?;
    Ok(HttpResponse::Created().json(event))
}

#[utoipa::path(
    post,
    operation_id = "mappingsAddLabel",
    params(("id" = u64, Path, description = "Mapping id")),
    request_body = LabelRequest,
    responses(
        (status = 201, description = "Label attached.", body = EventView),
        (status = 400, description = "Unknown label.", body = CustomError),
        (status = 404, description = "Mapping not found.", body = CustomError)
    )
)]
#[post("/mappings/{id}/labels")]
async fn handle_add_label(
    data: Data<super::WebServerData>,
    req: HttpRequest,
    path: Path<Id>,
    body: Json<LabelRequest>,
) -> actix_web::Result<HttpResponse, CustomError> {
    let ctx = request_context(&req);
    let event = data
        .engine
        .add_label(&ctx, path.into_inner(), &body.label)?;
    Ok(HttpResponse::Created().json(event))
}

#[cfg(test)]
mod test {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use crate::server::run::actix_server::test::fixture_data;
    use crate::server::run::actix_server::{configure, USER_HEADER};

    #[actix_web::test]
    async fn list_with_facets() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/mappings?searchTerm=ENSG00000139618&facets=status:REVIEWED")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["count"], 2);
        let ids = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["mapping"]["mappingId"].as_u64().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(body["results"][0]["taxonomy"]["ensemblTaxId"], 9606);
    }

    #[actix_web::test]
    async fn list_rejects_bad_organism() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/mappings?facets=organism:human")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["fields"]["facets"].is_array());
    }

    #[actix_web::test]
    async fn get_mapping_with_related() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::get().uri("/mappings/1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["mapping"]["mappingId"], 1);
        assert_eq!(body["mapping"]["status"], "REVIEWED");
        assert_eq!(body["relatedMappings"][0]["mappingId"], 5);

        let req = test::TestRequest::get().uri("/mappings/99").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn curation_round() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/mappings/3/status")
            .insert_header((USER_HEADER, "carol"))
            .set_json(serde_json::json!({"status": "REJECTED"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"], "carol");

        let req = test::TestRequest::post()
            .uri("/mappings/3/comments")
            .set_json(serde_json::json!({"text": "Wrong gene model."}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/mappings/3/labels")
            .set_json(serde_json::json!({"label": "no such label"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/mappings/3/comments")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["mappingId"], 3);
        assert_eq!(body["status"], "REJECTED");
        assert_eq!(body["comments"][0]["text"], "Wrong gene model.");
        assert_eq!(body["comments"][0]["user"], "anonymous");
        assert_eq!(body["labels"], serde_json::json!([]));
    }
}
