pub mod frame;

use futures::{Stream, StreamExt};
use log::info;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::ProxyError;
use crate::models::chat::{ChatCompletionRequest, ChatProxyRequest};
use self::frame::FrameAccumulator;

/// Closed set of agent identifiers a chat turn can address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    General,
    Trading,
    Research,
    Memes,
}

impl ChatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::General => "general",
            ChatType::Trading => "trading",
            ChatType::Research => "research",
            ChatType::Memes => "memes",
        }
    }
}

/// Client side of the streaming chat pipeline: issues one request to the
/// local proxy endpoint and republishes the growing response text as frames
/// arrive.
pub struct ChatProxyClient {
    http: HttpClient,
    base_url: String,
}

impl ChatProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Runs one chat completion, invoking `on_progress` with the full
    /// accumulated text after every successfully parsed frame. Returns the
    /// final text at end-of-stream. No retries: any failure is terminal.
    pub async fn run_chat_completion<F>(
        &self,
        chat_type: ChatType,
        request: ChatCompletionRequest,
        mut on_progress: F,
    ) -> Result<String, ProxyError>
    where
        F: FnMut(&str),
    {
        let url = format!("{}/api/v1/chat/completions", self.base_url);
        let body = ChatProxyRequest {
            chat_type,
            chat_completion_request: request,
        };

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProxyError::RequestFailed(status));
        }

        let mut stream = resp.bytes_stream();
        let mut acc = FrameAccumulator::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ProxyError::StreamUnavailable)?;
            for snapshot in acc.push_chunk(&chunk) {
                on_progress(&snapshot);
            }
        }
        if let Some(snapshot) = acc.finish() {
            on_progress(&snapshot);
        }

        info!("chat completion finished ({} chars)", acc.text().len());
        Ok(acc.into_text())
    }

    /// Observable form of [`run_chat_completion`]: yields one full-buffer
    /// snapshot per parsed frame. Dropping the returned stream cancels the
    /// producer task and releases the outstanding network read.
    ///
    /// [`run_chat_completion`]: ChatProxyClient::run_chat_completion
    pub async fn stream_chat_completion(
        &self,
        chat_type: ChatType,
        request: ChatCompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String, ProxyError>> + Send>>, ProxyError> {
        let url = format!("{}/api/v1/chat/completions", self.base_url);
        let body = ChatProxyRequest {
            chat_type,
            chat_completion_request: request,
        };

        let (tx, rx) = mpsc::channel(32);
        let client = self.http.clone();

        tokio::spawn(async move {
            let resp = match client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(ProxyError::Transport(e))).await;
                    return;
                }
            };
            let status = resp.status();
            if !status.is_success() {
                let _ = tx.send(Err(ProxyError::RequestFailed(status))).await;
                return;
            }

            let mut stream = resp.bytes_stream();
            let mut acc = FrameAccumulator::new();

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(chunk) => {
                        for snapshot in acc.push_chunk(&chunk) {
                            if tx.send(Ok(snapshot)).await.is_err() {
                                // Receiver dropped: stop reading.
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ProxyError::StreamUnavailable(e))).await;
                        return;
                    }
                }
            }
            if let Some(snapshot) = acc.finish() {
                let _ = tx.send(Ok(snapshot)).await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::{ChatMessage, Role};
    use axum::{body::Body, http::header, response::Response, routing::post, Router};

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            messages: vec![ChatMessage {
                role: Role::User,
                content: "hi".to_string(),
            }],
            stream: true,
            model: "agent-v1".to_string(),
            temperature: Some(0.7),
        }
    }

    async fn spawn_stream_server(frames: &'static str, status: u16) -> String {
        let app = Router::new().route(
            "/api/v1/chat/completions",
            post(move || async move {
                Response::builder()
                    .status(status)
                    .header(header::CONTENT_TYPE, "text/event-stream")
                    .body(Body::from(frames))
                    .unwrap()
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn run_chat_completion_accumulates_and_reports_progress() {
        let frames = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
                      data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
                      data: [DONE]\n";
        let base = spawn_stream_server(frames, 200).await;
        let client = ChatProxyClient::new(base);

        let mut seen = Vec::new();
        let text = client
            .run_chat_completion(ChatType::General, request(), |snap| {
                seen.push(snap.to_string())
            })
            .await
            .unwrap();

        assert_eq!(text, "Hello");
        assert_eq!(seen, vec!["Hel".to_string(), "Hello".to_string()]);
    }

    #[tokio::test]
    async fn non_success_status_fails_without_progress() {
        let base = spawn_stream_server("nope\n", 502).await;
        let client = ChatProxyClient::new(base);

        let mut calls = 0;
        let err = client
            .run_chat_completion(ChatType::Trading, request(), |_| calls += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::RequestFailed(s) if s.as_u16() == 502));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn stream_chat_completion_yields_snapshots_in_order() {
        let frames = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\
                      data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\
                      data: [DONE]\n";
        let base = spawn_stream_server(frames, 200).await;
        let client = ChatProxyClient::new(base);

        let mut stream = client
            .stream_chat_completion(ChatType::Memes, request())
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Some(item) = stream.next().await {
            seen.push(item.unwrap());
        }
        assert_eq!(seen, vec!["a".to_string(), "ab".to_string()]);
    }
}
