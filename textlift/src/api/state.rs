use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::ocr::TextReader;
use crate::processing::ExtractionPipeline;
use crate::storage::{Janitor, UploadStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: UploadStore,
    pub janitor: Janitor,
    pub pipeline: ExtractionPipeline,
}

impl AppState {
    pub fn new(config: Config, reader: Arc<dyn TextReader>) -> Self {
        let config = Arc::new(config);
        let store = UploadStore::new(config.storage.upload_dir.clone());
        let janitor = store.janitor(
            Duration::from_secs(config.storage.max_age_secs),
            config.storage.janitor_interval_secs,
        );
        let pipeline = ExtractionPipeline::new(reader);

        Self {
            config,
            store,
            janitor,
            pipeline,
        }
    }
}
