//! User input feeding the event loop.
//!
//! Buttons are read wherever the platform delivers them and forwarded as
//! [`UserIntent`]s over a bounded channel to the task running the loop.

use tokio::sync::mpsc;
use tracing::trace;

use crate::{Result, VarioError};

/// Intents the loop acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserIntent {
    /// Start flight logging
    Start,
    /// Stop flight logging
    Stop,
}

/// Physical buttons on the watch face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Select,
}

impl UserIntent {
    /// Intent bound to a button, if any.
    pub fn from_button(button: Button) -> Option<Self> {
        match button {
            Button::Up => Some(UserIntent::Start),
            Button::Down => Some(UserIntent::Stop),
            Button::Select => None,
        }
    }
}

/// Sending half of the input channel.
#[derive(Debug, Clone)]
pub struct InputHandle {
    intents: mpsc::Sender<UserIntent>,
}

/// Create an input channel holding up to `depth` unprocessed intents.
pub fn channel(depth: usize) -> (InputHandle, mpsc::Receiver<UserIntent>) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (InputHandle { intents: tx }, rx)
}

impl InputHandle {
    pub async fn user_requested_start(&self) -> Result<()> {
        self.submit(UserIntent::Start).await
    }

    pub async fn user_requested_stop(&self) -> Result<()> {
        self.submit(UserIntent::Stop).await
    }

    /// Forward a button press. Unbound buttons are ignored.
    pub async fn press(&self, button: Button) -> Result<()> {
        match UserIntent::from_button(button) {
            Some(intent) => self.submit(intent).await,
            None => {
                trace!(?button, "Button has no action");
                Ok(())
            }
        }
    }

    /// Forward an intent, waiting while the loop is behind.
    pub async fn submit(&self, intent: UserIntent) -> Result<()> {
        self.intents
            .send(intent)
            .await
            .map_err(|_| VarioError::send_failed("event loop is no longer running"))
    }

    /// Whether the loop has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.intents.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_mapping() {
        assert_eq!(UserIntent::from_button(Button::Up), Some(UserIntent::Start));
        assert_eq!(UserIntent::from_button(Button::Down), Some(UserIntent::Stop));
        assert_eq!(UserIntent::from_button(Button::Select), None);
    }

    #[tokio::test]
    async fn presses_arrive_in_order() {
        let (input, mut rx) = channel(4);

        input.press(Button::Select).await.unwrap();
        input.press(Button::Up).await.unwrap();
        input.user_requested_stop().await.unwrap();

        assert_eq!(rx.recv().await, Some(UserIntent::Start));
        assert_eq!(rx.recv().await, Some(UserIntent::Stop));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_loop_is_reported() {
        let (input, rx) = channel(1);
        drop(rx);

        assert!(input.is_closed());
        assert!(input.user_requested_start().await.is_err());
    }
}
