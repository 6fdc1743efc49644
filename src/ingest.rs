//! Document ingestion pipeline.
//!
//! Fetches raw bytes for the source and target references, hands them to the
//! parser, and only once *both* documents have fetched and parsed publishes
//! the result into the [`DocumentStore`] as one atomic replace. Any failure
//! along the way leaves the store exactly as it was.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::extract::{DocumentParser, ParseError};
use crate::store::{DocumentPair, DocumentStore};

/// Why an ingestion failed. Fetch and parse failures name the reference
/// they were working on so the caller can tell which document broke.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),
    #[error("failed to fetch document from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to parse document from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },
}

/// Fetch-and-parse pipeline bound to a store and a parser.
pub struct Ingestor {
    http: reqwest::Client,
    parser: Arc<dyn DocumentParser>,
    store: Arc<DocumentStore>,
}

impl Ingestor {
    pub fn new(
        http: reqwest::Client,
        parser: Arc<dyn DocumentParser>,
        store: Arc<DocumentStore>,
    ) -> Self {
        Self {
            http,
            parser,
            store,
        }
    }

    /// Ingests both documents and publishes the resulting pair.
    ///
    /// Validation happens before any network activity; no retries — a
    /// failed ingestion is reported to the caller and the previous pair
    /// stays current.
    pub async fn ingest(
        &self,
        source_ref: &str,
        target_ref: &str,
    ) -> Result<DocumentPair, IngestError> {
        if source_ref.is_empty() || target_ref.is_empty() {
            return Err(IngestError::Validation(
                "Both source_document_url and target_document_url are required.".to_string(),
            ));
        }

        info!(source = %source_ref, target = %target_ref, "downloading and parsing documents");

        let source_text = self.fetch_and_parse(source_ref).await?;
        let target_text = self.fetch_and_parse(target_ref).await?;

        let pair = DocumentPair {
            source_text,
            target_text,
            source_ref: source_ref.to_string(),
            target_ref: target_ref.to_string(),
        };
        self.store.replace(pair.clone());
        info!("documents parsed and published");
        Ok(pair)
    }

    async fn fetch_and_parse(&self, url: &str) -> Result<String, IngestError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| IngestError::Fetch {
                url: url.to_string(),
                source,
            })?;
        let bytes = response.bytes().await.map_err(|source| IngestError::Fetch {
            url: url.to_string(),
            source,
        })?;
        self.parser
            .parse(&bytes)
            .map_err(|source| IngestError::Parse {
                url: url.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ParseError;

    struct Utf8Parser;
    impl DocumentParser for Utf8Parser {
        fn parse(&self, bytes: &[u8]) -> Result<String, ParseError> {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    fn ingestor(store: Arc<DocumentStore>) -> Ingestor {
        Ingestor::new(reqwest::Client::new(), Arc::new(Utf8Parser), store)
    }

    #[tokio::test]
    async fn empty_source_ref_fails_validation() {
        let store = Arc::new(DocumentStore::new());
        let err = ingestor(store.clone())
            .ingest("", "https://example.com/t.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
        assert_eq!(store.snapshot(), DocumentPair::default());
    }

    #[tokio::test]
    async fn empty_target_ref_fails_validation() {
        let store = Arc::new(DocumentStore::new());
        let err = ingestor(store.clone())
            .ingest("https://example.com/s.pdf", "")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[tokio::test]
    async fn fetch_failure_names_the_ref_and_leaves_store_unchanged() {
        let store = Arc::new(DocumentStore::new());
        let previous = DocumentPair {
            source_text: "old source".into(),
            target_text: "old target".into(),
            source_ref: "https://example.com/old-s.pdf".into(),
            target_ref: "https://example.com/old-t.pdf".into(),
        };
        store.replace(previous.clone());

        // Port 1 on loopback refuses connections immediately.
        let bad = "http://127.0.0.1:1/t.pdf";
        let err = ingestor(store.clone())
            .ingest("http://127.0.0.1:1/s.pdf", bad)
            .await
            .unwrap_err();
        match err {
            IngestError::Fetch { url, .. } => assert_eq!(url, "http://127.0.0.1:1/s.pdf"),
            other => panic!("expected fetch error, got {other:?}"),
        }
        assert_eq!(store.snapshot(), previous);
    }
}
