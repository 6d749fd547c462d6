use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::modules::transcode::processor::JobProcessor;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub queue: RabbitMqService,
    pub processor: Arc<JobProcessor>,
}

impl AppState {
    pub fn new(config: AppConfig, queue: RabbitMqService, processor: Arc<JobProcessor>) -> Self {
        Self {
            config,
            queue,
            processor,
        }
    }
}
