use serde::{Deserialize, Serialize};

/// Data payload that marks the normal end of a relay stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One element of the relay event stream sent to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// An incremental piece of assistant text
    Chunk(String),
    /// The turn failed; no further events follow
    Error(String),
    /// The turn completed normally
    Done,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EventPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chunk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RelayEvent {
    /// Serialized `data:` payload for this event.
    pub fn data(&self) -> Result<String, serde_json::Error> {
        let payload = match self {
            RelayEvent::Done => return Ok(DONE_SENTINEL.to_string()),
            RelayEvent::Chunk(text) => EventPayload {
                chunk: Some(text.clone()),
                error: None,
            },
            RelayEvent::Error(message) => EventPayload {
                chunk: None,
                error: Some(message.clone()),
            },
        };
        serde_json::to_string(&payload)
    }

    /// Complete wire frame, delimiter included.
    pub fn frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", self.data()?))
    }

    /// Decodes one `data:` payload.
    ///
    /// A payload may carry both a chunk and an error, in which case the
    /// chunk comes first. Empty chunks are dropped.
    pub fn parse(data: &str) -> Result<Vec<RelayEvent>, serde_json::Error> {
        if data == DONE_SENTINEL {
            return Ok(vec![RelayEvent::Done]);
        }
        let payload: EventPayload = serde_json::from_str(data)?;
        let mut events = Vec::with_capacity(2);
        if let Some(chunk) = payload.chunk.filter(|c| !c.is_empty()) {
            events.push(RelayEvent::Chunk(chunk));
        }
        if let Some(error) = payload.error {
            events.push(RelayEvent::Error(error));
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_match_wire_format() {
        assert_eq!(
            RelayEvent::Chunk("Hi ".into()).frame().unwrap(),
            "data: {\"chunk\":\"Hi \"}\n\n"
        );
        assert_eq!(
            RelayEvent::Error("Invalid API key".into()).frame().unwrap(),
            "data: {\"error\":\"Invalid API key\"}\n\n"
        );
        assert_eq!(RelayEvent::Done.frame().unwrap(), "data: [DONE]\n\n");
    }

    #[test]
    fn parse_orders_chunk_before_error() {
        let events = RelayEvent::parse(r#"{"error":"boom","chunk":"tail"}"#).unwrap();
        assert_eq!(
            events,
            vec![
                RelayEvent::Chunk("tail".into()),
                RelayEvent::Error("boom".into())
            ]
        );
    }

    #[test]
    fn parse_drops_empty_chunks_and_rejects_garbage() {
        assert!(RelayEvent::parse(r#"{"chunk":""}"#).unwrap().is_empty());
        assert!(RelayEvent::parse("{not json").is_err());
    }
}
