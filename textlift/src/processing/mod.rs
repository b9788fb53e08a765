mod pipeline;

pub use pipeline::{Extraction, ExtractionPipeline};
