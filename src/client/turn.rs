//! Drives one submitted turn against a relay server, applying what arrives
//! to a [`ChatSession`].

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chat::{input_violation, ChatSession, SessionError, Turn};
use crate::error::RelayError;
use crate::relay::RelayRequest;

use super::consumer::ConsumerEvent;
use super::http::ChatClient;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply was recorded; `None` when it carried no text.
    Completed(Option<String>),
    /// An error turn with this message was recorded.
    Failed(String),
    /// Stopped before a terminal event; nothing was recorded for the reply.
    Cancelled,
}

/// Clears the in-flight buffer however the turn future ends.
struct StreamGuard<'a> {
    session: &'a mut ChatSession,
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        if self.session.cancel_stream() {
            log::debug!("discarded unfinished reply");
        }
    }
}

/// Message shown to the user for a failed turn.
pub fn failure_message(err: &RelayError) -> String {
    match err {
        RelayError::Remote(msg) | RelayError::Transport(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn begin(session: &mut ChatSession, text: &str) -> Result<Vec<Turn>, SessionError> {
    if session.is_streaming() {
        return Err(SessionError::StreamActive);
    }
    if let Some(violation) = input_violation(text) {
        return Err(SessionError::InvalidInput(violation));
    }
    let history = session.history();
    session.append_turn(Turn::user(text))?;
    Ok(history)
}

/// Submits `text` as a streamed turn.
///
/// The user turn is appended before the request goes out. `on_partial`
/// receives the reply text accumulated so far after every fragment.
/// Cancelling `cancel`, or dropping the returned future, stops all
/// mutation of the reply and leaves the session idle.
pub async fn run_turn<F>(
    client: &ChatClient,
    session: &mut ChatSession,
    text: &str,
    cancel: &CancellationToken,
    on_partial: F,
) -> Result<TurnOutcome, SessionError>
where
    F: FnMut(&str),
{
    let history = begin(session, text)?;
    session.begin_stream()?;
    let guard = StreamGuard { session };
    let request = RelayRequest::new(text, history);

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        outcome = drive(client, &request, &mut *guard.session, on_partial) => Some(outcome),
    };

    match result {
        Some(outcome) => outcome,
        None => {
            log::info!("turn cancelled");
            Ok(TurnOutcome::Cancelled)
        }
    }
}

async fn drive<F>(
    client: &ChatClient,
    request: &RelayRequest,
    session: &mut ChatSession,
    mut on_partial: F,
) -> Result<TurnOutcome, SessionError>
where
    F: FnMut(&str),
{
    let mut stream = match client.open_stream(request).await {
        Ok(stream) => stream,
        Err(err) => {
            let message = failure_message(&err);
            session.fail_stream(&message)?;
            return Ok(TurnOutcome::Failed(message));
        }
    };

    while let Some(event) = stream.next_event().await {
        match event {
            ConsumerEvent::Fragment(fragment) => {
                let partial = session.append_fragment(&fragment)?;
                on_partial(partial);
            }
            ConsumerEvent::Completed => break,
            ConsumerEvent::Failed(message) => {
                session.fail_stream(&message)?;
                return Ok(TurnOutcome::Failed(message));
            }
        }
    }

    let reply = session.finalize_stream()?.map(|turn| turn.text.clone());
    Ok(TurnOutcome::Completed(reply))
}

/// Submits `text` and waits for the whole reply, without streaming.
pub async fn send_turn(
    client: &ChatClient,
    session: &mut ChatSession,
    text: &str,
) -> Result<TurnOutcome, SessionError> {
    let history = begin(session, text)?;
    let request = RelayRequest::new(text, history);

    match client.send_message(&request).await {
        Ok(reply) if reply.is_empty() => Ok(TurnOutcome::Completed(None)),
        Ok(reply) => {
            session.append_turn(Turn::assistant(reply.clone()))?;
            Ok(TurnOutcome::Completed(Some(reply)))
        }
        Err(err) => {
            let message = failure_message(&err);
            session.append_turn(Turn::error(&message))?;
            Ok(TurnOutcome::Failed(message))
        }
    }
}

/// Waits for `turn`, refusing every input line that arrives meanwhile.
///
/// Refused lines are handed to `on_refused` and never queued for later.
pub async fn attend_turn<F, R>(
    turn: F,
    input: &mut mpsc::Receiver<String>,
    mut on_refused: R,
) -> F::Output
where
    F: Future,
    R: FnMut(&str),
{
    tokio::pin!(turn);
    loop {
        tokio::select! {
            outcome = &mut turn => return outcome,
            Some(line) = input.recv() => {
                log::debug!("refused input while a turn is in flight");
                on_refused(&line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Sender;

    #[test]
    fn failure_message_unwraps_client_side_errors() {
        assert_eq!(
            failure_message(&RelayError::Remote("Invalid API key".into())),
            "Invalid API key"
        );
        assert_eq!(
            failure_message(&RelayError::Transport("API error 502: bad gateway".into())),
            "API error 502: bad gateway"
        );
    }

    #[tokio::test]
    async fn refuses_a_second_turn_while_streaming() {
        let client = ChatClient::new("http://127.0.0.1:9/api");
        let mut session = ChatSession::new();
        session.begin_stream().unwrap();

        let outcome = run_turn(&client, &mut session, "hi", &CancellationToken::new(), |_| {}).await;
        assert_eq!(outcome, Err(SessionError::StreamActive));
        assert!(session.turns().is_empty());
    }

    #[tokio::test]
    async fn invalid_input_never_touches_the_session() {
        let client = ChatClient::new("http://127.0.0.1:9/api");
        let mut session = ChatSession::new();

        let outcome = run_turn(&client, &mut session, "   ", &CancellationToken::new(), |_| {}).await;
        assert!(matches!(outcome, Err(SessionError::InvalidInput(_))));
        assert!(session.turns().is_empty());
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn cancelled_turn_keeps_only_the_user_turn() {
        let client = ChatClient::new("http://127.0.0.1:9/api");
        let mut session = ChatSession::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run_turn(&client, &mut session, "hi", &cancel, |_| {}).await;
        assert_eq!(outcome, Ok(TurnOutcome::Cancelled));
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.turns()[0].sender, Sender::User);
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn lines_typed_during_a_turn_are_refused_not_queued() {
        let (tx, mut input) = mpsc::channel(8);
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

        let typist = tokio::spawn(async move {
            tx.send("second question".to_string()).await.unwrap();
            tx.send("third".to_string()).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            done_tx.send(()).unwrap();
            tx
        });

        let mut refused = Vec::new();
        let outcome = attend_turn(
            async {
                done_rx.await.unwrap();
                TurnOutcome::Completed(Some("reply".into()))
            },
            &mut input,
            |line| refused.push(line.to_string()),
        )
        .await;

        assert_eq!(outcome, TurnOutcome::Completed(Some("reply".into())));
        assert_eq!(refused, vec!["second question", "third"]);
        let _tx = typist.await.unwrap();
        assert!(input.try_recv().is_err());
    }
}
