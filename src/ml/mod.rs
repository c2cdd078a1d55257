pub mod ml_model;
pub mod preprocess;
pub mod inference;
pub mod backend;

pub use ml_model::{MiteClassifier, ModelConfig, INPUT_CHANNELS, INPUT_LEN, INPUT_SIZE};
pub use preprocess::{normalize_image, preprocess, resize_to_input, InputTensor};
pub use inference::{export_bundle, random_bundle, save_random_bundle, Classifier, ImageClassifier, ModelSlot};
pub use backend::{CpuBackend, Engine};
