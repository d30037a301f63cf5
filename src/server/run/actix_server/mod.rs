//! Run the server.

use std::sync::Arc;

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::web::{self, ServiceConfig};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use utoipa::OpenApi as _;

use crate::error::{Error, ValidationErrors};
use crate::jobs::JobQueue;
use crate::loader::Dispatcher;
use crate::mapping::{Engine, RequestContext, ANONYMOUS};

pub mod alignments;
pub mod ensembl;
pub mod jobs;
pub mod mappings;
pub mod service;
pub mod versions;

/// Header naming the user stamp of write requests.
pub const USER_HEADER: &str = "X-User";

/// Upper limit of JSON request bodies; load batches can be large.
const JSON_LIMIT: usize = 256 * 1024 * 1024;

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct CustomError {
    err: String,
    /// Messages per field for rejected input.
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<ValidationErrors>,
    #[serde(skip)]
    status: StatusCode,
}

impl std::fmt::Display for CustomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.err)
    }
}

impl CustomError {
    fn new(err: anyhow::Error) -> Self {
        CustomError {
            err: err.to_string(),
            fields: None,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for CustomError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Integrity(_) | Error::MultipleRows(_) | Error::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("{}", err);
        }
        let fields = match &err {
            Error::Validation(errors) => Some(errors.clone()),
            _ => None,
        };
        CustomError {
            err: err.to_string(),
            fields,
            status,
        }
    }
}

impl ResponseError for CustomError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(self)
    }
}

/// Data structure for the web server data.
#[derive(derivative::Derivative)]
#[derivative(Debug)]
pub struct WebServerData {
    /// Mapping resolution over the store.
    pub engine: Engine,
    /// Validation and submission of load batches.
    pub dispatcher: Dispatcher,
    /// Queue the dispatcher submits to; polled by `/jobs`.
    #[derivative(Debug = "ignore")]
    pub jobs: Arc<dyn JobQueue>,
}

/// Per-request context with the user stamp from [`USER_HEADER`].
pub fn request_context(req: &HttpRequest) -> RequestContext {
    let user = req
        .headers()
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS);
    RequestContext::new(user)
}

/// Report unreadable JSON bodies in the same shape as rejected input.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let status = err.status_code();
    let mut custom = CustomError::from(Error::invalid("non_field_errors", err.to_string()));
    custom.status = status;
    custom.into()
}

/// Register all endpoints.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(json_error_handler),
    )
        .service(mappings::handle_list)
        .service(mappings::handle_get)
        .service(mappings::handle_comments)
        .service(mappings::handle_add_comment)
        .service(mappings::handle_add_status)
        .service(mappings::handle_add_label)
        .service(ensembl::handle_load)
        .service(ensembl::handle_load_legacy)
        .service(ensembl::handle_latest_release)
        .service(ensembl::handle_species_history)
        .service(ensembl::handle_alignment_status)
        .service(ensembl::handle_transcript)
        .service(jobs::handle)
        .service(alignments::handle_create_run)
        .service(alignments::handle_get_run)
        .service(alignments::handle_run_alignments)
        .service(alignments::handle_create_alignment)
        .service(alignments::handle_get_alignment)
        .service(alignments::handle_latest)
        .service(alignments::handle_create_cigar)
        .service(alignments::handle_fetch_cigar)
        .service(alignments::handle_cigar_by_alignment)
        .service(alignments::handle_update_cigar)
        .service(service::handle_status)
        .service(service::handle_flags)
        .service(versions::handle);
}

/// Main entry point for running the REST server.
#[allow(clippy::unused_async)]
pub async fn main(
    args: &super::Args,
    data: actix_web::web::Data<WebServerData>,
) -> std::io::Result<()> {
    actix_web::HttpServer::new(move || {
        actix_web::App::new()
            .app_data(data.clone())
            .configure(configure)
            .service(
                utoipa_swagger_ui::SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", super::openapi::ApiDoc::openapi()),
            )
            .wrap(actix_web::middleware::Logger::default())
    })
    .bind((args.listen_host.as_str(), args.listen_port))?
    .run()
    .await
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::web::Data;
    use actix_web::ResponseError as _;
    use pretty_assertions::assert_eq;
    use temp_testdir::TempDir;

    use super::{CustomError, WebServerData};
    use crate::error::Error;
    use crate::jobs::{JobQueue, LocalJobQueue};
    use crate::loader::Dispatcher;
    use crate::mapping::test::fixture_engine;

    /// Server data over the fixture store.
    pub(crate) fn fixture_data() -> (TempDir, Data<WebServerData>) {
        let (temp, engine, _sequences) = fixture_engine();
        let jobs: Arc<dyn JobQueue> = Arc::new(LocalJobQueue::default());
        let dispatcher = Dispatcher::new(engine.store.clone(), jobs.clone());
        let data = WebServerData {
            engine,
            dispatcher,
            jobs,
        };
        (temp, Data::new(data))
    }

    #[rstest::rstest]
    #[case(Error::not_found("mapping 9"), StatusCode::NOT_FOUND)]
    #[case(Error::invalid("text", "blank"), StatusCode::BAD_REQUEST)]
    #[case(Error::Upstream("timeout".into()), StatusCode::BAD_GATEWAY)]
    #[case(Error::Integrity("count".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(Error::MultipleRows("gene".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn error_status(#[case] err: Error, #[case] status: StatusCode) {
        assert_eq!(CustomError::from(err).status_code(), status);
    }

    #[test]
    fn validation_body_has_fields() {
        let err = CustomError::from(Error::invalid("[0].enst_id", "This field is required."));
        insta::assert_snapshot!(
            serde_json::to_string(&err).unwrap(),
            @r#"{"err":"validation failed: [0].enst_id: This field is required.","fields":{"[0].enst_id":["This field is required."]}}"#
        );
    }

    #[test]
    fn other_body_has_no_fields() {
        let err = CustomError::from(Error::not_found("mapping 9"));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"err": "not found: mapping 9"})
        );
    }
}
