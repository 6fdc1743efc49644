//! Prompt construction and streamed answer assembly.
//!
//! The generative model is a collaborator behind [`GenerativeClient`]: it
//! takes a prompt and yields a lazy, finite, non-restartable sequence of
//! [`Chunk`]s. [`collect_answer`] folds that sequence into one answer
//! string, preserving arrival order and surfacing mid-stream failures as
//! [`GenerationError::Interrupted`] so a truncated answer is never mistaken
//! for a complete one.
//!
//! The production client calls the Vertex AI `streamGenerateContent`
//! endpoint in SSE mode and decodes each `data:` line into a [`Chunk`].

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::store::DocumentPair;

/// One incremental unit of a streamed model response.
///
/// Mirrors the generation service's candidate/content/parts shape; every
/// level is optional, so a metadata-only chunk simply carries no text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Chunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl Chunk {
    /// The chunk's text fragment, if it carries one.
    pub fn text(&self) -> Option<&str> {
        self.candidates.first()?.content.parts.first()?.text.as_deref()
    }

    /// A chunk carrying the given fragment. Mostly useful for tests and
    /// mock clients.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part {
                        text: Some(text.into()),
                    }],
                },
            }],
        }
    }

    /// A chunk with no extractable text.
    pub fn metadata_only() -> Self {
        Self::default()
    }
}

/// Failure of the generation call or its stream.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("malformed generation chunk: {0}")]
    Malformed(String),
    /// The upstream stream broke before completing. `partial` holds
    /// everything accumulated up to the failure.
    #[error("generation stream interrupted: {cause}")]
    Interrupted { partial: String, cause: String },
}

/// The chunk sequence a generation call yields.
pub type CompletionStream = BoxStream<'static, Result<Chunk, GenerationError>>;

/// Streaming text-completion collaborator.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn stream_generate(&self, prompt: &str) -> Result<CompletionStream, GenerationError>;
}

/// Why a question could not be answered.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("Question is required.")]
    Validation,
    #[error("Documents have not been uploaded and parsed yet. Call /upload-documents first.")]
    NotReady,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Builds the prompt for one question over the current pair.
///
/// Pure: the output depends only on the three inputs. The wording keeps the
/// compliance-reviewer framing the service was built around.
pub fn build_prompt(source_text: &str, target_text: &str, question: &str) -> String {
    format!(
        "You are a compliance expert joining a new bank. You need to familiarize yourself \
         with the bank's Anti-Money Laundering (AML) policy (source document) and then use it \
         to review a client's AML policy target document. All your output must be nicely formatted.\n\
         Both documents will be from Financial Institutions. The first document will be from the \
         source bank and the second document will be from a target bank who is a client of yours.\n\
         **Verify that the uploaded files are Policy Documents**\n\
         Carefully parse the documents and check if both of the documents are AML policies. If the \
         documents contain something other than AML policies warn the user and stop further \
         processing. In this instance the **Output** should be **Sorry I cannot process this \
         document as I am trained on AML policies**\n\
         You have access to the content of two documents, a source document and a target document. \
         Use the information in these documents to answer the following question.\n\
         **Analyze the Bank's AML Policy**\n\
         Carefully analyse the provided Bank's AML policy document (source document) and \
         understand to the answer the questions.\n\
         **The following information is just for your understanding. Do not add it in your response\n\n\
         Source Document Content: {source_text}\n\
         Target Document Content: {target_text}\n\
         **\n\
         Question: {question}"
    )
}

/// Answers `question` against `pair` via `client`.
///
/// Validation happens before any network activity: an empty question or a
/// not-yet-ingested pair never reaches the model.
pub async fn answer(
    question: &str,
    pair: &DocumentPair,
    client: &dyn GenerativeClient,
) -> Result<String, AnswerError> {
    if question.is_empty() {
        return Err(AnswerError::Validation);
    }
    if !pair.is_ready() {
        return Err(AnswerError::NotReady);
    }

    let prompt = build_prompt(&pair.source_text, &pair.target_text, question);
    info!(question = %question, "sending question to the generative model");
    let stream = client.stream_generate(&prompt).await?;
    let answer = collect_answer(stream).await?;
    info!(answer_chars = answer.len(), "answer assembled from stream");
    Ok(answer)
}

/// Concatenates every text fragment in arrival order.
///
/// A chunk with no text contributes nothing. If the stream fails before
/// ending, the error carries the partial answer accumulated so far.
pub async fn collect_answer(mut stream: CompletionStream) -> Result<String, GenerationError> {
    let mut answer = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if let Some(text) = chunk.text() {
                    answer.push_str(text);
                }
            }
            Err(e) => {
                return Err(GenerationError::Interrupted {
                    partial: answer,
                    cause: e.to_string(),
                })
            }
        }
    }
    Ok(answer)
}

/// Production client for the Vertex AI streaming generation endpoint.
pub struct VertexClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    max_output_tokens: u32,
}

impl VertexClient {
    pub fn from_config(http: reqwest::Client, config: &Config) -> Self {
        let endpoint = format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:streamGenerateContent?alt=sse",
            location = config.location,
            project = config.project_id,
            model = config.model_name,
        );
        Self {
            http,
            endpoint,
            access_token: config.access_token.clone(),
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[async_trait]
impl GenerativeClient for VertexClient {
    async fn stream_generate(&self, prompt: &str) -> Result<CompletionStream, GenerationError> {
        let Some(token) = self.access_token.as_deref() else {
            return Err(GenerationError::Request(
                "VERTEX_ACCESS_TOKEN not set".to_string(),
            ));
        };

        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": self.max_output_tokens },
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        Ok(sse_chunk_stream(response.bytes_stream()))
    }
}

/// Decodes an SSE byte stream into chunks.
///
/// Buffers bytes until a full line is available, then parses `data:` lines
/// as JSON chunks. Transport errors pass through as stream items so the
/// consumer can report how much text arrived before the break.
fn sse_chunk_stream<S>(bytes: S) -> CompletionStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let mut buf = String::new();
    bytes
        .map(move |item| {
            let events = match item {
                Ok(chunk) => {
                    buf.push_str(&String::from_utf8_lossy(&chunk));
                    drain_sse_events(&mut buf)
                }
                Err(e) => vec![Err(GenerationError::Request(e.to_string()))],
            };
            stream::iter(events)
        })
        .flatten()
        .boxed()
}

/// Parses every complete line in `buf`, leaving any unterminated tail for
/// the next read.
fn drain_sse_events(buf: &mut String) -> Vec<Result<Chunk, GenerationError>> {
    let mut events = Vec::new();
    while let Some(pos) = buf.find('\n') {
        let line = buf[..pos].trim_end_matches('\r').to_string();
        buf.drain(..=pos);
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() || payload == "[DONE]" {
            continue;
        }
        match serde_json::from_str::<Chunk>(payload) {
            Ok(chunk) => events.push(Ok(chunk)),
            Err(e) => events.push(Err(GenerationError::Malformed(e.to_string()))),
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed chunk sequence.
    struct ScriptedClient {
        script: Mutex<Option<Vec<Result<Chunk, GenerationError>>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<Chunk, GenerationError>>) -> Self {
            Self {
                script: Mutex::new(Some(script)),
            }
        }
    }

    #[async_trait]
    impl GenerativeClient for ScriptedClient {
        async fn stream_generate(
            &self,
            _prompt: &str,
        ) -> Result<CompletionStream, GenerationError> {
            let script = self
                .script
                .lock()
                .unwrap()
                .take()
                .expect("stream is not restartable");
            Ok(stream::iter(script).boxed())
        }
    }

    /// Fails the test if the model is ever reached.
    struct UnreachableClient;

    #[async_trait]
    impl GenerativeClient for UnreachableClient {
        async fn stream_generate(
            &self,
            _prompt: &str,
        ) -> Result<CompletionStream, GenerationError> {
            panic!("validation must reject before any model call");
        }
    }

    fn ready_pair() -> DocumentPair {
        DocumentPair {
            source_text: "source policy text".into(),
            target_text: "target policy text".into(),
            source_ref: "https://example.com/s.pdf".into(),
            target_ref: "https://example.com/t.pdf".into(),
        }
    }

    #[tokio::test]
    async fn fragments_concatenate_in_arrival_order() {
        let stream = stream::iter(vec![
            Ok(Chunk::from_text("Analysis: ")),
            Ok(Chunk::metadata_only()),
            Ok(Chunk::from_text("ok")),
        ])
        .boxed();
        assert_eq!(collect_answer(stream).await.unwrap(), "Analysis: ok");
    }

    #[tokio::test]
    async fn mid_stream_failure_carries_partial_text() {
        let stream = stream::iter(vec![
            Ok(Chunk::from_text("partial ")),
            Err(GenerationError::Request("connection reset".into())),
            Ok(Chunk::from_text("never seen")),
        ])
        .boxed();
        match collect_answer(stream).await.unwrap_err() {
            GenerationError::Interrupted { partial, cause } => {
                assert_eq!(partial, "partial ");
                assert!(cause.contains("connection reset"));
            }
            other => panic!("expected interruption, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_question_fails_before_any_model_call() {
        let err = answer("", &ready_pair(), &UnreachableClient)
            .await
            .unwrap_err();
        assert!(matches!(err, AnswerError::Validation));
    }

    #[tokio::test]
    async fn unready_pair_fails_before_any_model_call() {
        let err = answer("x", &DocumentPair::default(), &UnreachableClient)
            .await
            .unwrap_err();
        assert!(matches!(err, AnswerError::NotReady));
    }

    #[tokio::test]
    async fn answer_collects_the_scripted_stream() {
        let client = ScriptedClient::new(vec![
            Ok(Chunk::from_text("The policies ")),
            Ok(Chunk::from_text("are aligned.")),
        ]);
        let out = answer("Do the policies align?", &ready_pair(), &client)
            .await
            .unwrap();
        assert_eq!(out, "The policies are aligned.");
    }

    #[test]
    fn prompt_embeds_documents_and_question() {
        let prompt = build_prompt("SRC-TEXT", "TGT-TEXT", "What changed?");
        assert!(prompt.contains("Source Document Content: SRC-TEXT"));
        assert!(prompt.contains("Target Document Content: TGT-TEXT"));
        assert!(prompt.contains("Question: What changed?"));
        // Pure function: same inputs, same prompt.
        assert_eq!(prompt, build_prompt("SRC-TEXT", "TGT-TEXT", "What changed?"));
    }

    #[test]
    fn chunk_decoding_tolerates_missing_levels() {
        let with_text: Chunk =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"hi"}]}}]}"#)
                .unwrap();
        assert_eq!(with_text.text(), Some("hi"));

        let metadata: Chunk =
            serde_json::from_str(r#"{"usageMetadata":{"totalTokenCount":12}}"#).unwrap();
        assert_eq!(metadata.text(), None);

        let partless: Chunk =
            serde_json::from_str(r#"{"candidates":[{"content":{}}]}"#).unwrap();
        assert_eq!(partless.text(), None);
    }

    #[test]
    fn sse_lines_split_across_reads_still_decode() {
        let mut buf = String::new();
        buf.push_str("data: {\"candidates\":[{\"content\":{\"parts\":[{\"te");
        assert!(drain_sse_events(&mut buf).is_empty());

        buf.push_str("xt\":\"hello\"}]}}]}\n\ndata: [DONE]\n");
        let events = drain_sse_events(&mut buf);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().text(), Some("hello"));
        assert!(buf.is_empty());
    }

    #[test]
    fn malformed_sse_payload_surfaces_as_error() {
        let mut buf = String::from("data: {not json}\n");
        let events = drain_sse_events(&mut buf);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Err(GenerationError::Malformed(_))
        ));
    }
}
