//! Control handler mapping protocol commands onto the engine.

use std::sync::Arc;

use async_trait::async_trait;
use courier_control::{Command, CommandHandler, ControlError, Response, ResponseData};

use crate::engine::Engine;

/// Executes control commands against a running engine.
pub struct EngineControlHandler {
    engine: Arc<Engine>,
}

impl EngineControlHandler {
    #[must_use]
    pub const fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl CommandHandler for EngineControlHandler {
    async fn handle(&self, command: Command) -> courier_control::Result<Response> {
        match command {
            Command::Ping => Ok(Response::ok()),

            Command::Status => Ok(Response::data(ResponseData::Status(self.engine.status()))),

            Command::Reserve { requested } => {
                let admission = self
                    .engine
                    .reserve(requested)
                    .await
                    .map_err(|e| ControlError::ServerError(e.to_string()))?;
                Ok(Response::data(ResponseData::Admission(admission)))
            }

            Command::Dispatch { campaign_id } => {
                let summary = self
                    .engine
                    .dispatch(&campaign_id)
                    .await
                    .map_err(|e| ControlError::ServerError(e.to_string()))?;
                Ok(Response::data(ResponseData::Dispatch(summary)))
            }

            Command::Tick => {
                let summaries = self
                    .engine
                    .tick()
                    .await
                    .map_err(|e| ControlError::ServerError(e.to_string()))?;
                Ok(Response::data(ResponseData::Tick(summaries)))
            }

            Command::ProcessJob => {
                let summary = self
                    .engine
                    .process_job()
                    .await
                    .map_err(|e| ControlError::ServerError(e.to_string()))?;
                Ok(Response::data(ResponseData::Job(summary)))
            }
        }
    }
}
