//! Progress records streamed by the daemon during pull and push
//!
//! The daemon answers `images/create` and `images/{name}/push` with a body of
//! JSON objects, one per progress event. Objects may be split across chunks or
//! concatenated without a separator, so decoding works on a growing buffer.

use crate::error::{MoverError, Result};
use crate::logging::Logger;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::pin::Pin;

/// Lazy, finite, non-restartable sequence of progress records
pub type ProgressStream = BoxStream<'static, Result<ProgressRecord>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// One JSON progress message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(
        default,
        rename = "progressDetail",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress_detail: Option<ProgressDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        default,
        rename = "errorDetail",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_detail: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux: Option<Value>,
    /// Fields the daemon may add that this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressRecord {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn with_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: Some(message.clone()),
            error_detail: Some(ErrorDetail {
                code: None,
                message,
            }),
            ..Default::default()
        }
    }

    /// Message of an in-stream failure, if this record reports one
    pub fn failure_message(&self) -> Option<&str> {
        self.error_detail
            .as_ref()
            .map(|detail| detail.message.as_str())
            .filter(|message| !message.is_empty())
            .or(self.error.as_deref())
    }

    /// Image digest announced by this record, if any
    ///
    /// Pull reports `Digest: sha256:…`; push reports an `aux` object and a
    /// status of the form `{tag}: digest: sha256:… size: N`.
    pub fn digest(&self) -> Option<String> {
        if let Some(digest) = self
            .aux
            .as_ref()
            .and_then(|aux| aux.get("Digest"))
            .and_then(Value::as_str)
        {
            return Some(digest.to_string());
        }

        let status = self.status.as_deref()?;
        if let Some(digest) = status.strip_prefix("Digest: ") {
            return Some(digest.trim().to_string());
        }
        status
            .split_once("digest: ")
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .map(str::to_string)
    }
}

/// Which operation a progress stream belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Pull,
    Push,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::Pull => write!(f, "pull"),
            TransferKind::Push => write!(f, "push"),
        }
    }
}

impl TransferKind {
    /// True when the record signals that the whole operation succeeded
    pub fn is_completion(&self, record: &ProgressRecord) -> bool {
        match self {
            TransferKind::Pull => record.status.as_deref().is_some_and(|status| {
                status.starts_with("Status: Downloaded newer image for")
                    || status.starts_with("Status: Image is up to date for")
            }),
            TransferKind::Push => {
                record
                    .aux
                    .as_ref()
                    .is_some_and(|aux| aux.get("Digest").is_some())
                    || record
                        .status
                        .as_deref()
                        .is_some_and(|status| status.contains(": digest: sha256:"))
            }
        }
    }

    /// Map an in-stream failure message onto the error taxonomy
    pub fn classify_failure(&self, reference: &str, message: &str) -> MoverError {
        let lower = message.to_lowercase();
        match self {
            TransferKind::Pull
                if lower.contains("not found")
                    || lower.contains("manifest unknown")
                    || lower.contains("does not exist")
                    || lower.contains("pull access denied") =>
            {
                MoverError::NotFound(format!("{}: {}", reference, message))
            }
            TransferKind::Push
                if lower.contains("denied")
                    || lower.contains("unauthorized")
                    || lower.contains("forbidden")
                    || lower.contains("insufficient_scope") =>
            {
                MoverError::Permission(format!("{}: {}", reference, message))
            }
            _ => MoverError::Transfer(format!("{} of {} failed: {}", self, reference, message)),
        }
    }
}

/// What a fully consumed progress stream reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub records: usize,
    pub digest: Option<String>,
}

/// Consume a progress stream to its end, echoing every record.
///
/// In-stream failure records and an end of stream without a completion record
/// are both errors.
pub async fn drain_progress(
    mut stream: ProgressStream,
    kind: TransferKind,
    reference: &str,
    logger: &Logger,
) -> Result<TransferSummary> {
    let mut summary = TransferSummary::default();
    let mut completed = false;

    while let Some(item) = stream.next().await {
        let record = item?;
        summary.records += 1;
        logger.record(&record);

        if let Some(message) = record.failure_message() {
            return Err(kind.classify_failure(reference, message));
        }
        if let Some(digest) = record.digest() {
            summary.digest = Some(digest);
        }
        if kind.is_completion(&record) {
            completed = true;
        }
    }

    if !completed {
        return Err(MoverError::Transfer(format!(
            "{} stream for {} ended before completion after {} records",
            kind, reference, summary.records
        )));
    }

    Ok(summary)
}

/// Turn a stream of body chunks into a [`ProgressStream`]
pub fn decode_records<S, B>(chunks: S) -> ProgressStream
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let decoder = RecordDecoder {
        chunks: Box::pin(chunks),
        buffer: Vec::new(),
        finished: false,
    };

    stream::unfold(decoder, |mut decoder| async move {
        decoder.next_record().await.map(|item| (item, decoder))
    })
    .boxed()
}

struct RecordDecoder<B> {
    chunks: Pin<Box<dyn Stream<Item = Result<B>> + Send>>,
    buffer: Vec<u8>,
    finished: bool,
}

impl<B: AsRef<[u8]>> RecordDecoder<B> {
    async fn next_record(&mut self) -> Option<Result<ProgressRecord>> {
        loop {
            match self.take_buffered() {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {}
                Err(e) => return Some(Err(self.fail(e))),
            }

            if self.finished {
                if self.buffer.iter().any(|b| !b.is_ascii_whitespace()) {
                    let e = MoverError::Transfer(
                        "progress stream ended in the middle of a record".to_string(),
                    );
                    return Some(Err(self.fail(e)));
                }
                return None;
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => return Some(Err(self.fail(e))),
                None => self.finished = true,
            }
        }
    }

    /// Decode one complete record from the front of the buffer
    fn take_buffered(&mut self) -> Result<Option<ProgressRecord>> {
        let (outcome, consumed) = {
            let mut records =
                serde_json::Deserializer::from_slice(&self.buffer).into_iter::<ProgressRecord>();
            let outcome = records.next();
            (outcome, records.byte_offset())
        };

        match outcome {
            Some(Ok(record)) => {
                self.buffer.drain(..consumed);
                Ok(Some(record))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => Err(MoverError::Transfer(format!(
                "malformed progress record: {}",
                e
            ))),
            // only whitespace left
            None => {
                self.buffer.clear();
                Ok(None)
            }
        }
    }

    // A failed stream yields its error once and then ends.
    fn fail(&mut self, error: MoverError) -> MoverError {
        self.finished = true;
        self.buffer.clear();
        error
    }
}
