//! Scripted `FoundationModelService` for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{EmbedderError, Result};
use crate::service::{
    EmbedTextRequest, EmbedTextResponse, FoundationModelService, ListModelSpecsRequest,
    ModelSpecsResponse,
};

/// Replays queued responses and records every request
#[derive(Default)]
pub struct MockService {
    embed_responses: Mutex<VecDeque<Result<EmbedTextResponse>>>,
    embed_requests: Mutex<Vec<EmbedTextRequest>>,
    catalog_response: Mutex<Option<Result<ModelSpecsResponse>>>,
    catalog_requests: Mutex<Vec<ListModelSpecsRequest>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next `embed_text` call
    pub fn with_embed(self, response: Result<EmbedTextResponse>) -> Self {
        self.embed_responses.lock().unwrap().push_back(response);
        self
    }

    /// Queue `n` failures
    pub fn with_embed_failures(mut self, n: usize, message: &str) -> Self {
        for _ in 0..n {
            self = self.with_embed(Err(EmbedderError::Transport(message.to_string())));
        }
        self
    }

    /// Response for every `list_foundation_model_specs` call
    pub fn with_catalog(self, response: Result<ModelSpecsResponse>) -> Self {
        *self.catalog_response.lock().unwrap() = Some(response);
        self
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_requests.lock().unwrap().len()
    }

    pub fn embed_requests(&self) -> Vec<EmbedTextRequest> {
        self.embed_requests.lock().unwrap().clone()
    }

    pub fn catalog_requests(&self) -> Vec<ListModelSpecsRequest> {
        self.catalog_requests.lock().unwrap().clone()
    }
}

/// Errors are not `Clone`; rebuild an equivalent one for repeated replies
fn replay(error: &EmbedderError) -> EmbedderError {
    match error {
        EmbedderError::Api { status, message } => EmbedderError::Api {
            status: *status,
            message: message.clone(),
        },
        EmbedderError::Timeout => EmbedderError::Timeout,
        other => EmbedderError::Transport(other.to_string()),
    }
}

#[async_trait]
impl FoundationModelService for MockService {
    async fn embed_text(&self, request: EmbedTextRequest) -> Result<EmbedTextResponse> {
        self.embed_requests.lock().unwrap().push(request);
        self.embed_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(EmbedderError::Transport("no scripted response".into())))
    }

    async fn list_foundation_model_specs(
        &self,
        request: ListModelSpecsRequest,
    ) -> Result<ModelSpecsResponse> {
        self.catalog_requests.lock().unwrap().push(request);
        match self.catalog_response.lock().unwrap().as_ref() {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(error)) => Err(replay(error)),
            None => Err(EmbedderError::Transport("no scripted catalog".into())),
        }
    }
}
