use std::sync::Arc;

use crate::engine::ResponseEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ResponseEngine>,
}

impl AppState {
    pub fn new(engine: ResponseEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
