use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::types::{
    EmbeddingRequest, EmbeddingResponse, FileObject, InputMessage, Message, MessageList,
    ResponseObject, ResponseRequest, Run, Thread,
};
use crate::config::DEFAULT_BASE_URL;
use crate::error::{Error, Result};

const BETA_HEADER: &str = "OpenAI-Beta";
const ASSISTANTS_V2: &str = "assistants=v2";
const POLL_AFTER_HEADER: &str = "openai-poll-after-ms";

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAIClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url).bearer_auth(&self.api_key);
        if path.starts_with("/threads") {
            builder.header(BETA_HEADER, ASSISTANTS_V2)
        } else {
            builder
        }
    }

    /// Fails with [`Error::Api`] for non-success statuses, preferring the
    /// `error.message` field of a JSON error body.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);
        Err(Error::Api { status: status.as_u16(), message })
    }

    async fn post_request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!("POST {}", path);
        let response = self.request(Method::POST, path).json(body).send().await?;
        Ok(Self::check(response).await?.json::<T>().await?)
    }

    async fn get_request<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {}", path);
        let response = self.request(Method::GET, path).send().await?;
        Ok(Self::check(response).await?.json::<T>().await?)
    }

    pub async fn create_thread(&self) -> Result<Thread> {
        self.post_request("/threads", &json!({})).await
    }

    pub async fn create_message(&self, thread_id: &str, content: &str) -> Result<Message> {
        let path = format!("/threads/{thread_id}/messages");
        self.post_request(&path, &json!({ "role": "user", "content": content })).await
    }

    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let path = format!("/threads/{thread_id}/runs");
        self.post_request(&path, &json!({ "assistant_id": assistant_id })).await
    }

    /// Fetches a run along with the server's suggested wait before the next poll.
    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<(Run, Option<Duration>)> {
        let path = format!("/threads/{thread_id}/runs/{run_id}");
        debug!("GET {}", path);
        let response = Self::check(self.request(Method::GET, &path).send().await?).await?;
        let poll_after = response
            .headers()
            .get(POLL_AFTER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis);
        Ok((response.json::<Run>().await?, poll_after))
    }

    /// Creates a run and polls it until it reaches a terminal status.
    pub async fn create_and_poll_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        poll_interval: Duration,
    ) -> Result<Run> {
        let mut run = self.create_run(thread_id, assistant_id).await?;
        let mut wait = poll_interval;
        while !run.status.is_terminal() {
            debug!("Run {} is {}; next poll in {:?}", run.id, run.status, wait);
            tokio::time::sleep(wait).await;
            let (next, hint) = self.retrieve_run(thread_id, &run.id).await?;
            run = next;
            wait = hint.unwrap_or(poll_interval);
        }
        Ok(run)
    }

    /// Lists the newest `limit` messages of a thread, newest first.
    pub async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<Message>> {
        let path = format!("/threads/{thread_id}/messages?order=desc&limit={limit}");
        let list: MessageList = self.get_request(&path).await?;
        Ok(list.data)
    }

    pub async fn retrieve_file(&self, file_id: &str) -> Result<FileObject> {
        self.get_request(&format!("/files/{file_id}")).await
    }

    pub async fn file_content(&self, file_id: &str) -> Result<Vec<u8>> {
        let path = format!("/files/{file_id}/content");
        debug!("GET {}", path);
        let response = Self::check(self.request(Method::GET, &path).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Raw embedding vectors for `input`, in input order.
    pub async fn create_embeddings(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let response: EmbeddingResponse =
            self.post_request("/embeddings", &EmbeddingRequest { model, input }).await?;

        let mut data = response.data;
        if data.len() != input.len() {
            return Err(Error::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                input.len(),
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        if let Some((position, d)) = data.iter().enumerate().find(|(i, d)| d.index != *i) {
            return Err(Error::MalformedResponse(format!(
                "embedding index {} at position {}",
                d.index, position
            )));
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    /// Sends a single user message to the Responses API and returns its output text.
    pub async fn create_response(&self, model: &str, prompt: &str) -> Result<String> {
        let request = ResponseRequest {
            model,
            input: vec![InputMessage { role: "user", content: prompt }],
        };
        let response: ResponseObject = self.post_request("/responses", &request).await?;
        Ok(response.output_text())
    }
}
