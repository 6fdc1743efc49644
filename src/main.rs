//! Binary entrypoint: wires configuration, the document store, the PDF
//! parser, and the Vertex generation client into the HTTP service.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use doc_qa::config::Config;
use doc_qa::extract::{DocumentParser, PdfParser};
use doc_qa::generate::{GenerativeClient, VertexClient};
use doc_qa::ingest::Ingestor;
use doc_qa::origin::OriginPolicy;
use doc_qa::server::{build_router, AppState};
use doc_qa::store::DocumentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("doc_qa=info,warn")),
        )
        .init();

    let config = Config::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("doc-qa/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let store = Arc::new(DocumentStore::new());
    let parser: Arc<dyn DocumentParser> = Arc::new(PdfParser);
    let model: Arc<dyn GenerativeClient> =
        Arc::new(VertexClient::from_config(http.clone(), &config));
    let state = AppState {
        store: store.clone(),
        ingestor: Arc::new(Ingestor::new(http, parser, store)),
        model,
        policy: Arc::new(OriginPolicy::new(config.allowed_origins.clone())),
    };

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, model = %config.model_name, "Document Question Answering Service listening");
    axum::serve(listener, app).await?;
    Ok(())
}
