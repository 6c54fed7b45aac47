pub mod cli;
pub mod detectors;
pub mod engine;
pub mod modality;
pub mod models;
pub mod scanner;
pub mod utils;

pub use detectors::{Detections, FieldDetector, SyllabusEngine};
pub use engine::{DetectionResult, Document, EngineConfig};
pub use models::{DocumentReport, ExtraData, FieldName, Header, Output, SystemEnvironment};
pub use scanner::{ProcessResult, count, process, process_document};
