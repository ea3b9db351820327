use std::sync::Arc;

use crate::services::{delivery::DeliverySink, dispatcher::JobDispatcher};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub bot_token: Arc<str>,
    pub dispatcher: Arc<JobDispatcher>,
    pub sink: Arc<dyn DeliverySink>,
}

impl AppState {
    pub fn new(bot_token: &str, dispatcher: JobDispatcher, sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            bot_token: Arc::from(bot_token),
            dispatcher: Arc::new(dispatcher),
            sink,
        }
    }
}
