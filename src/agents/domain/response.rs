//! Model turn results and the caller-facing chunk stream

use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ToolCall, ToolInvocation};
use crate::agents::error::{AgentError, AgentResult};
use crate::domain::ChatHistory;

/// Reason a model turn stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    #[default]
    Stop,
    /// Content filtered by the provider
    ContentFilter,
    /// Tool call requested
    ToolCalls,
    /// Hit max tokens
    Length,
    /// Anything the provider reports outside the known set
    Unknown,
}

impl FinishReason {
    /// Parse the provider's finish reason tag
    pub fn parse(tag: &str) -> Self {
        match tag {
            "stop" => FinishReason::Stop,
            "content_filter" => FinishReason::ContentFilter,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            _ => FinishReason::Unknown,
        }
    }
}

/// One typed part of a model message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text shown to the user
    Text { text: String },
    /// Function the model wants to call
    ToolCall(ToolCall),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Concatenate every text part in order
    pub fn collect_text(parts: &[ContentPart]) -> String {
        parts.iter().fold(String::new(), |mut acc, part| {
            if let ContentPart::Text { text } = part {
                acc.push_str(text);
            }
            acc
        })
    }

    /// Collect every tool call part in order
    pub fn collect_tool_calls(parts: &[ContentPart]) -> Vec<ToolCall> {
        parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(call) => Some(call.clone()),
                ContentPart::Text { .. } => None,
            })
            .collect()
    }
}

/// Outcome of one answered chat request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    /// Final assistant text (after content-filter substitution)
    pub text: String,
    /// Finish reason of the last model turn
    pub finish_reason: FinishReason,
    /// Tool calls observed while answering, in order
    pub tool_invocations: Vec<ToolInvocation>,
    /// Caller history with the user and assistant turns appended
    pub history: ChatHistory,
}

/// Item of the relay queue between a background task and its consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatChunk {
    /// A text fragment, forwarded as produced
    Text(String),
    /// Sentinel written once the producer is done
    EndOfStream,
}

/// Write end of the relay queue, owned by the producing task
#[derive(Debug, Clone)]
pub struct ChunkSender {
    sender: mpsc::UnboundedSender<ChatChunk>,
}

impl ChunkSender {
    /// Forward a text fragment; fails once the consumer has gone away
    pub fn send_text(&self, text: impl Into<String>) -> AgentResult<()> {
        self.sender
            .send(ChatChunk::Text(text.into()))
            .map_err(|_| AgentError::Cancelled)
    }

    fn end_of_stream(&self) {
        let _ = self.sender.send(ChatChunk::EndOfStream);
    }
}

/// Stream of text chunks produced by a background orchestration task.
///
/// Chunks are yielded in production order. After the end-of-stream sentinel the
/// task's result is collected: failures surface as a final `Err` item, success
/// makes [`ChatStream::completion`] available. Dropping the stream early aborts
/// the task.
pub struct ChatStream {
    receiver: mpsc::UnboundedReceiver<ChatChunk>,
    task: Option<JoinHandle<AgentResult<ChatCompletion>>>,
    completion: Option<ChatCompletion>,
    draining: bool,
    done: bool,
}

impl ChatStream {
    /// Run `producer` as a background task that writes into a fresh relay queue
    pub fn spawn<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(ChunkSender) -> Fut,
        Fut: Future<Output = AgentResult<ChatCompletion>> + Send + 'static,
    {
        let (tx, receiver) = mpsc::unbounded_channel();
        let sender = ChunkSender { sender: tx };
        let end = sender.clone();
        let work = producer(sender);

        let task = tokio::spawn(async move {
            let result = work.await;
            end.end_of_stream();
            result
        });

        Self {
            receiver,
            task: Some(task),
            completion: None,
            draining: false,
            done: false,
        }
    }

    /// The finished request, available once the stream has ended successfully
    pub fn completion(&self) -> Option<&ChatCompletion> {
        self.completion.as_ref()
    }

    /// Discard remaining chunks and wait for the task's result
    pub async fn into_completion(mut self) -> AgentResult<ChatCompletion> {
        use futures::StreamExt;

        while let Some(item) = self.next().await {
            item?;
        }

        self.completion.take().ok_or(AgentError::Cancelled)
    }

    /// Abort the background task and wait until it has stopped.
    ///
    /// Cancellation of the task is not an error; any other failure it ended
    /// with is returned.
    pub async fn cancel(mut self) -> AgentResult<()> {
        self.done = true;
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        task.abort();
        match task.await {
            Ok(Ok(_)) | Ok(Err(AgentError::Cancelled)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Stream for ChatStream {
    type Item = AgentResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        if !this.draining {
            match ready!(this.receiver.poll_recv(cx)) {
                Some(ChatChunk::Text(text)) => return Poll::Ready(Some(Ok(text))),
                Some(ChatChunk::EndOfStream) | None => this.draining = true,
            }
        }

        let Some(task) = this.task.as_mut() else {
            this.done = true;
            return Poll::Ready(None);
        };

        let joined = ready!(Pin::new(task).poll(cx));
        this.task = None;
        this.done = true;

        match joined {
            Ok(Ok(completion)) => {
                this.completion = Some(completion);
                Poll::Ready(None)
            }
            Ok(Err(AgentError::Cancelled)) => Poll::Ready(None),
            Ok(Err(e)) => Poll::Ready(Some(Err(e))),
            Err(e) if e.is_cancelled() => Poll::Ready(None),
            Err(e) => Poll::Ready(Some(Err(e.into()))),
        }
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        if task.is_finished() {
            return;
        }

        task.abort();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                match task.await {
                    Err(e) if e.is_cancelled() => {
                        tracing::debug!("Chat stream abandoned, background task cancelled");
                    }
                    Err(e) => tracing::warn!(error = %e, "Background task failed during shutdown"),
                    Ok(Err(e)) => tracing::debug!(error = %e, "Background task ended after abandon"),
                    Ok(Ok(_)) => {}
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn completion(text: &str) -> ChatCompletion {
        ChatCompletion {
            text: text.to_string(),
            finish_reason: FinishReason::Stop,
            tool_invocations: Vec::new(),
            history: ChatHistory::new(),
        }
    }

    #[test]
    fn test_finish_reason_parse() {
        assert_eq!(FinishReason::parse("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::parse("content_filter"), FinishReason::ContentFilter);
        assert_eq!(FinishReason::parse("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::parse("length"), FinishReason::Length);
        assert_eq!(FinishReason::parse("something_new"), FinishReason::Unknown);
    }

    #[test]
    fn test_content_parts_fold() {
        let parts = vec![
            ContentPart::text("The weather "),
            ContentPart::ToolCall(ToolCall::new("c1", "Weather-get_weather", json!({}))),
            ContentPart::text("is mild."),
        ];
        assert_eq!(ContentPart::collect_text(&parts), "The weather is mild.");
        let calls = ContentPart::collect_tool_calls(&parts);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "Weather-get_weather");
    }

    async fn produce_words(sender: ChunkSender, words: &'static [&'static str]) -> AgentResult<ChatCompletion> {
        for word in words {
            sender.send_text(*word)?;
        }
        Ok(completion(&words.concat()))
    }

    async fn produce_then_fail(sender: ChunkSender) -> AgentResult<ChatCompletion> {
        sender.send_text("partial")?;
        Err(AgentError::Internal("boom".to_string()))
    }

    async fn tick_forever(sender: ChunkSender, counter: Arc<AtomicUsize>) -> AgentResult<ChatCompletion> {
        loop {
            sender.send_text("tick")?;
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_stream_relays_in_order_then_completes() {
        let mut stream = ChatStream::spawn(|sender| produce_words(sender, &["a", "b", "c"]));

        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            chunks.push(item.unwrap());
        }
        assert_eq!(chunks, vec!["a", "b", "c"]);
        assert_eq!(stream.completion().unwrap().text, "abc");
    }

    #[tokio::test]
    async fn test_stream_surfaces_task_error_last() {
        let mut stream = ChatStream::spawn(produce_then_fail);

        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, AgentError::Internal(_)));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_producer() {
        let written = Arc::new(AtomicUsize::new(0));
        let counter = written.clone();

        let mut stream = ChatStream::spawn(move |sender| tick_forever(sender, counter));

        assert_eq!(stream.next().await.unwrap().unwrap(), "tick");
        stream.cancel().await.unwrap();

        let after_cancel = written.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(written.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test]
    async fn test_into_completion_discards_chunks() {
        let stream = ChatStream::spawn(|sender| produce_words(sender, &["x"]));
        let done = stream.into_completion().await.unwrap();
        assert_eq!(done.text, "x");
    }
}
