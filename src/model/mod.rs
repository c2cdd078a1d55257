pub mod model_metadata;
pub mod model_storage;
pub mod config;

pub use model_metadata::{ModelMetadata, ARCHITECTURE, MAX_BASE_FILTERS, MAX_CLASSES, MAX_INPUT_SIZE};
pub use model_storage::{bundle_to_bytes, read_bundle, read_metadata, write_bundle, DEFAULT_MODEL_FILE};
pub use config::{AppConfig, CameraSettings, DeviceType, ModelSettings, StorageSettings};
