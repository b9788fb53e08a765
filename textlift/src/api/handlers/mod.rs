mod download;
mod extract;
mod health;

pub use download::download_file;
pub use extract::{extract_text, ExtractResponse, NO_TEXT_WARNING};
pub use health::health_check;
