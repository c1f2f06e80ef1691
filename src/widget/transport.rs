//! Client side of the chat stream
//!
//! `HttpChatTransport` POSTs the conversation to the relay and decodes the UI
//! message stream. `drive_turn` feeds the decoded chunks into a controller.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use url::Url;

use super::{Effect, WidgetConfig, WidgetController, WidgetError};
use crate::llm::streaming::{is_done, SseDecoder};
use crate::protocol::{ChatRequestBody, UIStreamEvent};

/// Decoded chunks of one response
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<UIStreamEvent, WidgetError>> + Send>>;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a request; errors before the body starts are returned here
    async fn send(&self, request: &ChatRequestBody) -> Result<ChunkStream, WidgetError>;
}

pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpChatTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Result<Self, WidgetError> {
        Ok(Self::new(config.validate()?))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, request: &ChatRequestBody) -> Result<ChunkStream, WidgetError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            messages = request.messages.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(WidgetError::Http { status, body });
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            let mut ended = false;
            while !ended {
                let payloads = match bytes.next().await {
                    Some(Ok(chunk)) => decoder.push(&chunk),
                    Some(Err(e)) => {
                        yield Err(WidgetError::from(e));
                        return;
                    }
                    None => {
                        ended = true;
                        decoder.finish()
                    }
                };
                for payload in payloads {
                    if is_done(&payload) {
                        return;
                    }
                    match serde_json::from_str::<UIStreamEvent>(&payload) {
                        Ok(event) => yield Ok(event),
                        Err(e) => tracing::warn!("Skipping malformed stream chunk: {}", e),
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Run one request/response turn against `controller`
///
/// Effects produced by stream chunks are handed to `on_effect` as they
/// happen. Failures are recorded on the controller and returned.
pub async fn drive_turn<F>(
    controller: &mut WidgetController,
    transport: &dyn ChatTransport,
    request: &ChatRequestBody,
    mut on_effect: F,
) -> Result<(), WidgetError>
where
    F: FnMut(&WidgetController, &Effect),
{
    let mut stream = match transport.send(request).await {
        Ok(stream) => stream,
        Err(e) => {
            controller.on_transport_error(&e);
            return Err(e);
        }
    };
    controller.on_stream_open();

    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => {
                for effect in controller.on_stream_event(&event) {
                    on_effect(controller, &effect);
                }
            }
            Err(e) => {
                controller.on_transport_error(&e);
                return Err(e);
            }
        }
    }
    controller.on_stream_end();

    match controller.error() {
        Some(message) => Err(WidgetError::Stream(message.to_string())),
        None => Ok(()),
    }
}

/// Submit `text` and drive the resulting turn to completion
///
/// Blank text does nothing. Non-request effects go to `on_effect`.
pub async fn send_message<F>(
    controller: &mut WidgetController,
    transport: &dyn ChatTransport,
    text: &str,
    mut on_effect: F,
) -> Result<(), WidgetError>
where
    F: FnMut(&WidgetController, &Effect),
{
    let mut request = None;
    for effect in controller.submit(text)? {
        match effect {
            Effect::SendRequest(body) => request = Some(body),
            other => on_effect(controller, &other),
        }
    }

    match request {
        Some(body) => drive_turn(controller, transport, &body, on_effect).await,
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::ChatStatus;

    struct CannedTransport(Vec<Result<UIStreamEvent, WidgetError>>);

    #[async_trait]
    impl ChatTransport for CannedTransport {
        async fn send(&self, _request: &ChatRequestBody) -> Result<ChunkStream, WidgetError> {
            Ok(Box::pin(futures::stream::iter(self.0.clone())))
        }
    }

    struct RejectingTransport;

    #[async_trait]
    impl ChatTransport for RejectingTransport {
        async fn send(&self, _request: &ChatRequestBody) -> Result<ChunkStream, WidgetError> {
            Err(WidgetError::Http {
                status: 400,
                body: r#"{"error":"Messages array is required"}"#.into(),
            })
        }
    }

    fn controller() -> WidgetController {
        WidgetController::new(WidgetConfig::new("http://localhost:3000/api/chat"))
    }

    #[tokio::test]
    async fn test_send_message_streams_reply() {
        let transport = CannedTransport(vec![
            Ok(UIStreamEvent::message_start("m1")),
            Ok(UIStreamEvent::text_start("txt_0")),
            Ok(UIStreamEvent::text_delta("txt_0", "Halo, ")),
            Ok(UIStreamEvent::text_delta("txt_0", "Bapak/Ibu!")),
            Ok(UIStreamEvent::text_end("txt_0")),
            Ok(UIStreamEvent::finish_with_reason("stop")),
        ]);
        let mut c = controller();
        let mut seen = Vec::new();

        send_message(&mut c, &transport, "Halo", |ctl, effect| {
            seen.push((effect.clone(), ctl.messages().len()));
        })
        .await
        .unwrap();

        assert_eq!(c.status(), &ChatStatus::Ready);
        assert_eq!(c.messages()[1].text_content(), "Halo, Bapak/Ibu!");
        assert!(seen.iter().all(|(e, _)| *e == Effect::ScrollToBottom));
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn test_http_rejection_sets_error() {
        let mut c = controller();
        let err = send_message(&mut c, &RejectingTransport, "Halo", |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, WidgetError::Http { status: 400, .. }));
        assert!(c.error().unwrap().contains("Messages array is required"));
    }

    #[tokio::test]
    async fn test_in_band_error_is_returned() {
        let transport = CannedTransport(vec![
            Ok(UIStreamEvent::message_start("m1")),
            Ok(UIStreamEvent::error("Rate limited")),
        ]);
        let mut c = controller();
        let err = send_message(&mut c, &transport, "Halo", |_, _| {})
            .await
            .unwrap_err();
        assert_eq!(err, WidgetError::Stream("Rate limited".into()));
    }

    #[tokio::test]
    async fn test_blank_message_sends_nothing() {
        let mut c = controller();
        send_message(&mut c, &RejectingTransport, "   ", |_, _| {})
            .await
            .unwrap();
        assert!(c.messages().is_empty());
    }
}
