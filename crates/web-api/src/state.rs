use std::sync::Arc;

use application::{ChatProjection, Clock, EventPublisher, FanOutHub};

#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn EventPublisher>,
    pub projection: Arc<ChatProjection>,
    pub hub: Arc<FanOutHub>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        projection: Arc<ChatProjection>,
        hub: Arc<FanOutHub>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            publisher,
            projection,
            hub,
            clock,
        }
    }
}
