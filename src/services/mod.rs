//! Services separating file handling, encoding and progress from editing logic

pub mod format;
pub mod io;
pub mod progress;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
pub use progress::{
    NoOpProgressReporter, ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
    TracingProgressReporter,
};
