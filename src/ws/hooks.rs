use std::fmt;

use super::error::WsError;
use super::transport::CloseEvent;

type OpenHook = Box<dyn FnMut() + Send>;
type CloseHook = Box<dyn FnMut(&CloseEvent) + Send>;
type MessageHook = Box<dyn FnMut(&str) + Send>;
type ErrorHook = Box<dyn FnMut(&WsError) + Send>;
type ExhaustedHook = Box<dyn FnMut() + Send>;

/// Consumer callbacks for a [`ChannelManager`](super::ChannelManager).
///
/// Every slot is optional and defaults to a no-op. All hooks of one manager run on that
/// manager's task, one at a time, so a hook never overlaps another hook of the same manager.
///
/// A hook that panics takes the manager's task down with it.
///
/// ```
/// use ath_realtime::ws::Hooks;
///
/// let hooks = Hooks::new()
///     .on_open(|| println!("connected"))
///     .on_message(|text| println!("received {text}"))
///     .on_exhausted(|| println!("giving up"));
/// ```
#[derive(Default)]
pub struct Hooks {
    on_open: Option<OpenHook>,
    on_close: Option<CloseHook>,
    on_message: Option<MessageHook>,
    on_error: Option<ErrorHook>,
    on_exhausted: Option<ExhaustedHook>,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after every successful open.
    #[must_use]
    pub fn on_open<F: FnMut() + Send + 'static>(mut self, hook: F) -> Self {
        self.on_open = Some(Box::new(hook));
        self
    }

    /// Called once per closed connection, clean or not, before a reconnect is scheduled.
    #[must_use]
    pub fn on_close<F: FnMut(&CloseEvent) + Send + 'static>(mut self, hook: F) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    /// Called with the raw text of every inbound data frame, in arrival order.
    #[must_use]
    pub fn on_message<F: FnMut(&str) + Send + 'static>(mut self, hook: F) -> Self {
        self.on_message = Some(Box::new(hook));
        self
    }

    /// Called on transport failures, including failed connection attempts. Always followed by
    /// exactly one `on_close`.
    #[must_use]
    pub fn on_error<F: FnMut(&WsError) + Send + 'static>(mut self, hook: F) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Called once when the reconnection budget is spent and the manager goes idle.
    #[must_use]
    pub fn on_exhausted<F: FnMut() + Send + 'static>(mut self, hook: F) -> Self {
        self.on_exhausted = Some(Box::new(hook));
        self
    }

    pub(crate) fn open(&mut self) {
        if let Some(hook) = &mut self.on_open {
            hook();
        }
    }

    pub(crate) fn close(&mut self, event: &CloseEvent) {
        if let Some(hook) = &mut self.on_close {
            hook(event);
        }
    }

    pub(crate) fn message(&mut self, text: &str) {
        if let Some(hook) = &mut self.on_message {
            hook(text);
        }
    }

    pub(crate) fn error(&mut self, error: &WsError) {
        if let Some(hook) = &mut self.on_error {
            hook(error);
        }
    }

    pub(crate) fn exhausted(&mut self) {
        if let Some(hook) = &mut self.on_exhausted {
            hook();
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_exhausted", &self.on_exhausted.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn unset_hooks_are_no_ops() {
        let mut hooks = Hooks::new();

        hooks.open();
        hooks.close(&CloseEvent::abnormal());
        hooks.message("ignored");
        hooks.error(&WsError::ConnectionClosed);
        hooks.exhausted();
    }

    #[test]
    fn message_hook_receives_raw_text() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let mut hooks = Hooks::new().on_message(move |text| {
            sink.lock().unwrap().push(text.to_owned());
        });

        hooks.message(r#"{"type":"BATTLE_RESULT"}"#);
        hooks.message("not json");

        assert_eq!(
            *received.lock().unwrap(),
            vec![r#"{"type":"BATTLE_RESULT"}"#.to_owned(), "not json".to_owned()]
        );
    }

    #[test]
    fn debug_lists_configured_slots() {
        let hooks = Hooks::new().on_open(|| {});
        let debug = format!("{hooks:?}");

        assert!(debug.contains("on_open: true"), "{debug}");
        assert!(debug.contains("on_close: false"), "{debug}");
    }
}
