use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("could not decode image payload ({bytes} bytes)")]
    ImageDecode { bytes: usize },
    #[error("inference failed: {0}")]
    Inference(String),
}
