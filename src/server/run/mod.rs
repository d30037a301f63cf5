use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::jobs::{JobQueue, LocalJobQueue};
use crate::loader::Dispatcher;
use crate::mapping::Engine;
use crate::sequence::{HttpSequenceService, SequenceServiceConfigBuilder};
use crate::store::Store;

/// Implementation of Actix server.
pub mod actix_server;

/// Module with OpenAPI documentation.
pub mod openapi {
    use crate::error::ValidationErrors;
    use crate::history::ServiceFlags;
    use crate::loader::{GenePayload, TranscriptPayload};
    use crate::mapping::assemble::{EnsemblTranscriptView, UniprotEntryView};
    use crate::mapping::curation::MappingComments;
    use crate::mapping::status::EventView;
    use crate::mapping::{MappingDetail, MappingSummary, MappingView, SearchPage, Taxonomy};
    use crate::model::{Alignment, AlignmentRun, EnspUCigar, SpeciesHistory, Transcript};
    use crate::server::run::actix_server::alignments::{AlignmentPage, CigarUpdate};
    use crate::server::run::actix_server::ensembl::{LatestRelease, LoadResponse};
    use crate::server::run::actix_server::jobs::JobResponse;
    use crate::server::run::actix_server::mappings::{
        CommentRequest, LabelRequest, StatusRequest,
    };
    use crate::server::run::actix_server::service::Ping;
    use crate::server::run::actix_server::versions::{SoftwareVersions, VersionsInfoResponse};

    use super::actix_server::{
        alignments, ensembl, jobs, mappings, service, versions, CustomError,
    };

    /// Utoipa-based `OpenAPI` generation helper.
    #[derive(utoipa::OpenApi)]
    #[openapi(
        paths(
            versions::handle,
            mappings::handle_list,
            mappings::handle_get,
            mappings::handle_comments,
            mappings::handle_add_comment,
            mappings::handle_add_status,
            mappings::handle_add_label,
            ensembl::handle_load,
            ensembl::handle_latest_release,
            ensembl::handle_species_history,
            ensembl::handle_alignment_status,
            ensembl::handle_transcript,
            jobs::handle,
            alignments::handle_create_run,
            alignments::handle_get_run,
            alignments::handle_run_alignments,
            alignments::handle_create_alignment,
            alignments::handle_get_alignment,
            alignments::handle_latest,
            alignments::handle_create_cigar,
            alignments::handle_fetch_cigar,
            alignments::handle_cigar_by_alignment,
            alignments::handle_update_cigar,
            service::handle_status,
            service::handle_flags,
        ),
        components(schemas(
            CustomError,
            ValidationErrors,
            VersionsInfoResponse,
            SoftwareVersions,
            SearchPage,
            MappingSummary,
            MappingDetail,
            MappingView,
            Taxonomy,
            UniprotEntryView,
            EnsemblTranscriptView,
            MappingComments,
            EventView,
            StatusRequest,
            CommentRequest,
            LabelRequest,
            GenePayload,
            TranscriptPayload,
            LoadResponse,
            LatestRelease,
            SpeciesHistory,
            Transcript,
            JobResponse,
            AlignmentRun,
            Alignment,
            AlignmentPage,
            EnspUCigar,
            CigarUpdate,
            Ping,
            ServiceFlags,
        ))
    )]
    pub struct ApiDoc;
}

/// Command line arguments for `server run` sub command.
#[derive(clap::Parser, Debug)]
#[command(about = "Run GIFTs REST API server", long_about = None)]
pub struct Args {
    /// Path to the RocksDB entity store, created with `db init`.
    #[arg(long)]
    pub path_db: PathBuf,

    /// Base URL of the Ensembl sequence service.
    #[arg(long, default_value = "http://localhost:8081")]
    pub sequence_service_url: String,

    /// Timeout of sequence service requests in seconds.
    #[arg(long, default_value_t = 10)]
    pub sequence_timeout_secs: u64,

    /// Number of mappings assembled concurrently per request.
    #[arg(long, default_value_t = 8)]
    pub assembly_concurrency: usize,

    /// Whether to suppress printing hints.
    #[arg(long, default_value_t = false)]
    pub suppress_hints: bool,

    /// IP to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    pub listen_host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    pub listen_port: u16,
}

/// Print some hints via `tracing::info!`.
fn print_hints(args: &Args) {
    tracing::info!(
        "Launching server main on http://{}:{} ...",
        args.listen_host.as_str(),
        args.listen_port
    );

    if args.suppress_hints {
        return;
    }

    let examples = [
        "mappings?searchTerm=ENSG00000139618",
        "mappings?searchTerm=P51587&facets=organism:9606,status:REVIEWED",
        "mappings/1",
        "mappings/1/comments",
        "ensembl/release/latest/GCA_000001405.27",
        "service/flags",
        "swagger-ui/",
    ];
    for example in examples {
        tracing::info!(
            "  try: http://{}:{}/{}",
            args.listen_host,
            args.listen_port,
            example
        );
    }
}

/// Build the server data from the command line.
fn web_server_data(args: &Args) -> Result<actix_server::WebServerData, anyhow::Error> {
    let store = Store::open(&args.path_db)?;
    let config = SequenceServiceConfigBuilder::default()
        .base_url(args.sequence_service_url.clone())
        .timeout(Duration::from_secs(args.sequence_timeout_secs))
        .build()?;
    let sequences = Arc::new(HttpSequenceService::new(config)?);
    let engine = Engine::new(store.clone(), sequences, args.assembly_concurrency);
    let jobs: Arc<dyn JobQueue> = Arc::new(LocalJobQueue::default());
    let dispatcher = Dispatcher::new(store, jobs.clone());
    Ok(actix_server::WebServerData {
        engine,
        dispatcher,
        jobs,
    })
}

/// Main entry point for `server run` sub command.
///
/// # Errors
///
/// In the case that there is an error running the server.
pub async fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    if let Some(log::Level::Trace | log::Level::Debug) = args_common.verbose.log_level() {
        // SAFETY: This environment variable is set during server initialization,
        // before any worker threads are spawned. At this point, only the main thread
        // is running, making this operation thread-safe.
        unsafe { std::env::set_var("RUST_LOG", "debug") };
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    tracing::info!("Opening store at {}...", args.path_db.display());
    let before_loading = std::time::Instant::now();
    let data = actix_web::web::Data::new(web_server_data(args)?);
    tracing::info!("... done opening store {:?}", before_loading.elapsed());

    // Print the server URL and some hints (the latter: unless suppressed).
    print_hints(args);
    // Launch the Actix web server.
    actix_server::main(args, data).await?;

    tracing::info!("All done. Have a nice day!");
    Ok(())
}
