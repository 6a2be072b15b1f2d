use crate::store::{JsonStore, StoreError};
use facereg_core::decode::{decode_base64_image, DecodeError};
use facereg_core::{Encoding, EncoderError, EuclideanMatcher, FaceEncoder, FaceRecord, Matcher};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending requests buffered ahead of the engine thread.
const ENGINE_QUEUE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid image data: {0}")]
    Decode(#[from] DecodeError),
    #[error("no face found in image")]
    NoFaceDetected,
    #[error("face encoding failed: {0}")]
    Encoder(#[from] EncoderError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored encoding has {stored} dimensions, probe has {probe}")]
    DimensionMismatch { stored: usize, probe: usize },
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Outcome of a registration.
#[derive(Debug)]
pub struct Registered {
    pub name: String,
    pub encoding: Encoding,
}

/// Match outcome for one face found in a recognition image.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    /// Registered name, when the nearest record is within the threshold.
    pub name: Option<String>,
    /// Distance to the nearest record; `None` when nothing is registered.
    pub distance: Option<f32>,
    /// The face's own encoding.
    pub encoding: Encoding,
}

/// Snapshot of engine state for the status endpoint.
#[derive(Debug)]
pub struct EngineStatus {
    pub encoder: String,
    pub threshold: f32,
    /// `None` when the store file does not exist yet.
    pub records: Option<usize>,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Register {
        image: String,
        name: String,
        reply: oneshot::Sender<Result<Registered, EngineError>>,
    },
    Recognize {
        image: String,
        reply: oneshot::Sender<Result<Vec<FaceMatch>, EngineError>>,
    },
    Status {
        reply: oneshot::Sender<Result<EngineStatus, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Decode, encode the first detected face, and append it to the store.
    pub async fn register(&self, image: String, name: String) -> Result<Registered, EngineError> {
        self.call(|reply| EngineRequest::Register { image, name, reply })
            .await
    }

    /// Decode, encode every detected face, and match each against the store.
    pub async fn recognize(&self, image: String) -> Result<Vec<FaceMatch>, EngineError> {
        self.call(|reply| EngineRequest::Recognize { image, reply }).await
    }

    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        self.call(|reply| EngineRequest::Status { reply }).await
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, EngineError>>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The engine owns the face encoder and the store. Requests are handled one
/// at a time, so registrations never interleave their read-modify-write of
/// the store file.
pub fn spawn_engine(
    encoder: Box<dyn FaceEncoder + Send>,
    store: JsonStore,
    threshold: f32,
) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(ENGINE_QUEUE_DEPTH);
    let mut engine = Engine {
        encoder,
        store,
        threshold,
    };

    std::thread::Builder::new()
        .name("facereg-engine".into())
        .spawn(move || {
            tracing::info!(
                encoder = engine.encoder.model_version(),
                store = %engine.store.path().display(),
                threshold = engine.threshold,
                "engine thread started"
            );
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Register { image, name, reply } => {
                        let _ = reply.send(engine.register(&image, name));
                    }
                    EngineRequest::Recognize { image, reply } => {
                        let _ = reply.send(engine.recognize(&image));
                    }
                    EngineRequest::Status { reply } => {
                        let _ = reply.send(engine.status());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}

struct Engine {
    encoder: Box<dyn FaceEncoder + Send>,
    store: JsonStore,
    threshold: f32,
}

impl Engine {
    fn encode(&mut self, image_b64: &str) -> Result<Vec<Encoding>, EngineError> {
        let image = decode_base64_image(image_b64).map_err(|e| {
            tracing::warn!(error = %e, "failed to decode image");
            e
        })?;
        Ok(self.encoder.encode_faces(&image)?)
    }

    fn register(&mut self, image_b64: &str, name: String) -> Result<Registered, EngineError> {
        let encoding = self
            .encode(image_b64)?
            .into_iter()
            .next()
            .ok_or(EngineError::NoFaceDetected)?;

        let total_records = self.store.append(FaceRecord {
            name: name.clone(),
            encoding: encoding.clone(),
        })?;

        tracing::info!(name = %name, total_records, "face registered");
        Ok(Registered { name, encoding })
    }

    fn recognize(&mut self, image_b64: &str) -> Result<Vec<FaceMatch>, EngineError> {
        let probes = self.encode(image_b64)?;
        let gallery = self.store.load()?;

        let mut matches = Vec::with_capacity(probes.len());
        for probe in probes {
            if let Some(stored) = gallery.iter().find(|r| r.encoding.len() != probe.len()) {
                return Err(EngineError::DimensionMismatch {
                    stored: stored.encoding.len(),
                    probe: probe.len(),
                });
            }

            let result = EuclideanMatcher.compare(&probe, &gallery, self.threshold);
            tracing::debug!(name = ?result.name, distance = ?result.distance, "face compared");
            matches.push(FaceMatch {
                name: result.name,
                distance: result.distance,
                encoding: probe,
            });
        }

        tracing::info!(
            faces = matches.len(),
            recognized = matches.iter().filter(|m| m.name.is_some()).count(),
            known = gallery.len(),
            "recognition complete"
        );
        Ok(matches)
    }

    fn status(&self) -> Result<EngineStatus, EngineError> {
        let records = if self.store.exists() {
            Some(self.store.load()?.len())
        } else {
            None
        };
        Ok(EngineStatus {
            encoder: self.encoder.model_version().to_string(),
            threshold: self.threshold,
            records,
        })
    }
}
