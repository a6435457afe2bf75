//! OpenAI-compatible streaming for the voice gateway: the finished reply is
//! re-chunked word by word so speech can start before the last word arrives.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde_json::{json, Value};
use uuid::Uuid;

const STREAM_MODEL: &str = "fractional-agent";
const WORD_DELAY: Duration = Duration::from_millis(10);
const DONE: &str = "[DONE]";

pub fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// One chunk per space-separated word (the space is kept on every word but
/// the last), then a `finish_reason: "stop"` chunk. Only the first chunk
/// carries `role`.
pub fn completion_chunks(content: &str, id: &str, created: i64) -> Vec<Value> {
    let words: Vec<&str> = content.split(' ').collect();
    let last = words.len() - 1;

    let mut chunks: Vec<Value> = words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let text = if i < last {
                format!("{word} ")
            } else {
                word.to_string()
            };
            json!({
                "id": id,
                "object": "chat.completion.chunk",
                "created": created,
                "model": STREAM_MODEL,
                "choices": [{
                    "index": 0,
                    "delta": {
                        "content": text,
                        "role": if i == 0 { Some("assistant") } else { None },
                    },
                    "finish_reason": null,
                }],
            })
        })
        .collect();

    chunks.push(json!({
        "id": id,
        "object": "chat.completion.chunk",
        "created": created,
        "model": STREAM_MODEL,
        "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }],
    }));
    chunks
}

/// SSE response streaming `content`, terminated by `data: [DONE]`.
pub fn stream_reply(content: &str) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = completion_id();
    let created = chrono::Utc::now().timestamp();

    let events: Vec<String> = completion_chunks(content, &id, created)
        .into_iter()
        .map(|chunk| chunk.to_string())
        .chain(std::iter::once(DONE.to_string()))
        .collect();

    let stream = stream::iter(events).then(|data| async move {
        tokio::time::sleep(WORD_DELAY).await;
        Ok(Event::default().data(data))
    });
    Sse::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_of(chunk: &Value) -> &str {
        chunk["choices"][0]["delta"]["content"].as_str().unwrap_or("")
    }

    #[test]
    fn test_words_rejoin_to_reply() {
        let chunks = completion_chunks("Hello there Jane", "chatcmpl-1", 1);
        assert_eq!(chunks.len(), 4);
        let text: String = chunks.iter().map(content_of).collect();
        assert_eq!(text, "Hello there Jane");
        assert_eq!(content_of(&chunks[2]), "Jane");
    }

    #[test]
    fn test_role_only_on_first_chunk() {
        let chunks = completion_chunks("a b", "id", 1);
        assert_eq!(chunks[0]["choices"][0]["delta"]["role"], "assistant");
        assert!(chunks[1]["choices"][0]["delta"]["role"].is_null());
        assert_eq!(chunks[0]["object"], "chat.completion.chunk");
        assert_eq!(chunks[0]["model"], "fractional-agent");
    }

    #[test]
    fn test_final_chunk_stops() {
        let chunks = completion_chunks("", "id", 1);
        assert_eq!(chunks.len(), 2);
        let last = chunks.last().unwrap();
        assert_eq!(last["choices"][0]["finish_reason"], "stop");
        assert_eq!(last["choices"][0]["delta"], json!({}));
    }

    #[test]
    fn test_completion_id_prefix() {
        let id = completion_id();
        assert!(id.starts_with("chatcmpl-"));
        assert_ne!(id, completion_id());
    }
}
