use crate::models::SiteData;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub data: Arc<Mutex<SiteData>>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, data: SiteData) -> Self {
        Self {
            data_dir,
            data: Arc::new(Mutex::new(data)),
        }
    }
}
