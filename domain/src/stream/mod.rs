//! Streaming chunks emitted while a run is in flight.
//!
//! A [`StreamChunk`] is a piece of partial output (model tokens, tool
//! progress) tagged with the stream it belongs to and, optionally, a topic.
//! The `source` path identifies the emitting context in the run tree as
//! `parent-path/name/iteration`; it is stamped on emission when absent.

use serde::{Deserialize, Serialize};

/// A unit of partial output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Stream identifier (e.g. one model response).
    pub stream_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub content: String,
    /// Marks the last chunk of `stream_id`.
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn new(stream_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            topic: None,
            source: None,
            content: content.into(),
            done: false,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn finished(mut self) -> Self {
        self.done = true;
        self
    }
}

/// Which chunks a subscriber wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkFilter {
    All,
    Stream(String),
    Topic(String),
}

impl ChunkFilter {
    pub fn matches(&self, chunk: &StreamChunk) -> bool {
        match self {
            ChunkFilter::All => true,
            ChunkFilter::Stream(id) => chunk.stream_id == *id,
            ChunkFilter::Topic(topic) => chunk.topic.as_deref() == Some(topic.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters() {
        let chunk = StreamChunk::new("s1", "hello").with_topic("thoughts");
        assert!(ChunkFilter::All.matches(&chunk));
        assert!(ChunkFilter::Stream("s1".into()).matches(&chunk));
        assert!(!ChunkFilter::Stream("s2".into()).matches(&chunk));
        assert!(ChunkFilter::Topic("thoughts".into()).matches(&chunk));
        assert!(!ChunkFilter::Topic("answer".into()).matches(&StreamChunk::new("s1", "x")));
    }
}
