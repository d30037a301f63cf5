use actix_web::{
    get,
    web::{Data, Json},
};

use super::CustomError;
use crate::history::{self, ServiceFlags};

/// Response of `/service/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct Ping {
    pub ping: u8,
}

/// Liveness probe.
#[utoipa::path(
    get,
    operation_id = "serviceStatus",
    responses((status = 200, description = "Server is up.", body = Ping))
)]
#[get("/service/status")]
async fn handle_status() -> Json<Ping> {
    Json(Ping { ping: 0 })
}

/// Whether loads or alignments of the latest releases are still running.
#[utoipa::path(
    get,
    operation_id = "serviceFlags",
    responses(
        (status = 200, description = "Pipeline flags.", body = ServiceFlags),
        (status = 500, description = "Internal server error.", body = CustomError)
    )
)]
#[get("/service/flags")]
async fn handle_flags(
    data: Data<super::WebServerData>,
) -> actix_web::Result<Json<ServiceFlags>, CustomError> {
    Ok(Json(history::service_flags(&data.engine.store)?))
}

#[cfg(test)]
mod test {
    use actix_web::{test, App};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use crate::server::run::actix_server::configure;
    use crate::server::run::actix_server::test::fixture_data;

    #[actix_web::test]
    async fn status_and_flags() {
        let (_temp, data) = fixture_data();
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::get().uri("/service/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"ping": 0}));

        let req = test::TestRequest::get().uri("/service/flags").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!({
                "ensembl_load_running": false,
                "uniprot_load_running": false,
                "ensembl_alignments_running": true
            })
        );
    }
}
