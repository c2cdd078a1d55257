pub mod types;
pub mod error;
pub mod logging;

pub mod model;
pub mod ml;
pub mod acquire;
pub mod session;
pub mod batch;
pub mod commands;

pub use error::{ScanError, ScanResult};
pub use session::{ClassificationView, ScanSession, View};
pub use types::{ImageSource, Label, MediaHandle, ScorePair};
