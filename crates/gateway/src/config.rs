use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_path: String,
    pub labels_path: String,
    pub stream_url: String,
    pub frame_skip: u32,
    pub save_images: bool,
    pub images_dir: String,
}

/// Defaults overridden by SORTER_-prefixed environment variables
/// (e.g. SORTER_STREAM_URL, SORTER_FRAME_SKIP). All values are fixed at
/// process start; there is no hot reload.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5001_i64)?
        .set_default("model_path", "model/model.onnx")?
        .set_default("labels_path", "model/labels.txt")?
        .set_default("stream_url", "http://192.168.1.76:81/stream")?
        .set_default("frame_skip", 5_i64)?
        .set_default("save_images", false)?
        .set_default("images_dir", "saved_images")?
        .add_source(
            config::Environment::with_prefix("SORTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize::<Config>()
}
