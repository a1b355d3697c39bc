//! Scripted completion backend
//!
//! Stands in for the generative API. Replies are produced by a responder
//! closure; every request is recorded for later assertions.

use async_trait::async_trait;
use cvdict_ingest::services::{CompletionBackend, CompletionRequest, EnrichError, EnrichmentClient};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, EnrichError> + Send + Sync>;

pub struct ScriptedBackend {
    responder: Responder,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&CompletionRequest) -> Result<String, EnrichError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Well-formed, prose-wrapped answers for every request kind
    pub fn well_formed() -> Arc<Self> {
        Self::new(|request| {
            let reply = if request.prompt.contains("pinyin_tones") {
                "Here is the pronunciation:\n{\"pinyin_numbers\": \"xue2 sheng5\", \"zhuyin\": \"ㄒㄩㄝˊ ˙ㄕㄥ\", \"hanviet\": \"học sinh\"}"
            } else if request.prompt.contains("Vietnamese translation") {
                "học sinh"
            } else if request.prompt.contains("JSON array") {
                "```json\n[{\"chinese\": \"他是学生。\", \"pinyin\": \"tā shì xuésheng.\", \"vietnamese\": \"Anh ấy là học sinh.\", \"english\": \"He is a student.\"}]\n```"
            } else {
                "{\"part_of_speech\": \"noun\", \"formality\": \"neutral\"}"
            };
            Ok(reply.to_string())
        })
    }

    /// The same text for every request
    pub fn replying(text: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(text.to_string()))
    }

    /// Network failure for every request
    pub fn unreachable() -> Arc<Self> {
        Self::new(|_| Err(EnrichError::Network("connection refused".to_string())))
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Client over this backend with no delay between calls
    pub fn client(self: &Arc<Self>) -> EnrichmentClient {
        EnrichmentClient::new(self.clone(), Duration::ZERO, 0.3)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, EnrichError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}
