//! Conversion of local conversation history into provider turns.

use crate::error::RelayError;
use crate::provider::{Content, Part};

use super::message::{Sender, Turn};

pub const USER_ROLE: &str = "user";
pub const MODEL_ROLE: &str = "model";

/// Provider role for a local sender.
pub fn provider_role(sender: Sender) -> &'static str {
    match sender {
        Sender::User => USER_ROLE,
        Sender::Assistant => MODEL_ROLE,
    }
}

/// Encodes `history` one-to-one into provider contents, preserving order.
pub fn encode(history: &[Turn]) -> Result<Vec<Content>, RelayError> {
    history
        .iter()
        .enumerate()
        .map(|(idx, turn)| {
            if turn.text.is_empty() {
                return Err(RelayError::InvalidInput(format!(
                    "History entry {idx} has empty text"
                )));
            }
            Ok(Content {
                role: Some(provider_role(turn.sender).to_string()),
                parts: vec![Part {
                    text: Some(turn.text.clone()),
                }],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arb_turn() -> impl Strategy<Value = Turn> {
        (".{1,40}", any::<bool>()).prop_map(|(text, is_user)| {
            if is_user {
                Turn::user(text)
            } else {
                Turn::assistant(text)
            }
        })
    }

    #[test]
    fn maps_assistant_to_model() {
        let encoded = encode(&[Turn::user("hi"), Turn::assistant("hello")]).unwrap();
        assert_eq!(encoded[0].role.as_deref(), Some("user"));
        assert_eq!(encoded[1].role.as_deref(), Some("model"));
        assert_eq!(encoded[1].parts.len(), 1);
        assert_eq!(encoded[1].parts[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn rejects_empty_entries() {
        let err = encode(&[Turn::user("ok"), Turn::assistant("")]).unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
    }

    proptest! {
        #[test]
        fn encoding_preserves_length_order_and_text(history in prop::collection::vec(arb_turn(), 0..16)) {
            let encoded = encode(&history).unwrap();
            prop_assert_eq!(encoded.len(), history.len());
            for (turn, content) in history.iter().zip(&encoded) {
                prop_assert_eq!(content.role.as_deref(), Some(provider_role(turn.sender)));
                prop_assert_eq!(content.parts.len(), 1);
                prop_assert_eq!(content.parts[0].text.as_deref(), Some(turn.text.as_str()));
            }
        }
    }
}
