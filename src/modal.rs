use std::time::{Duration, Instant};

pub const INVALID_INPUT_MESSAGE: &str = "Data must be a valid Positive Number!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalKind {
    /// Offers to delete all stored workouts.
    ResetPrompt,
    /// Error message; the delete button is hidden.
    Alert(String),
}

impl ModalKind {
    pub fn header(&self) -> &str {
        match self {
            ModalKind::ResetPrompt => "Do you want to delete all your workouts?",
            ModalKind::Alert(msg) => msg,
        }
    }

    pub fn shows_delete(&self) -> bool {
        matches!(self, ModalKind::ResetPrompt)
    }
}

/// What closed the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTrigger {
    Button,
    Overlay,
    Escape,
}

/// Modal dialog with an optional delayed opening.
///
/// A scheduled dialog opens once its deadline passes and no other dialog is
/// showing; opening or closing other dialogs does not cancel it.
#[derive(Debug, Default)]
pub struct Modal {
    open: Option<ModalKind>,
    scheduled: Option<(ModalKind, Instant)>,
}

impl Modal {
    pub fn open(&mut self, kind: ModalKind) {
        self.open = Some(kind);
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.open(ModalKind::Alert(message.into()));
    }

    pub fn schedule(&mut self, kind: ModalKind, now: Instant, delay: Duration) {
        self.scheduled = Some((kind, now + delay));
    }

    /// Drop a scheduled dialog that has not opened yet.
    pub fn cancel_scheduled(&mut self) {
        self.scheduled = None;
    }

    /// Open the scheduled dialog if it is due. Returns the time left until
    /// it is, so the caller can ask for a repaint.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        let (_, at) = self.scheduled.as_ref()?;
        let at = *at;
        if now < at {
            return Some(at - now);
        }
        if self.open.is_none() {
            if let Some((kind, _)) = self.scheduled.take() {
                self.open = Some(kind);
            }
            return None;
        }
        Some(Duration::ZERO)
    }

    pub fn close(&mut self, trigger: CloseTrigger) {
        if self.open.take().is_some() {
            log::debug!("Modal closed via {trigger:?}");
        }
    }

    pub fn current(&self) -> Option<&ModalKind> {
        self.open.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_prompt_opens_after_delay() {
        let start = Instant::now();
        let mut modal = Modal::default();
        modal.schedule(ModalKind::ResetPrompt, start, Duration::from_secs(10));

        assert_eq!(
            modal.tick(start + Duration::from_secs(4)),
            Some(Duration::from_secs(6))
        );
        assert!(!modal.is_open());

        assert_eq!(modal.tick(start + Duration::from_secs(10)), None);
        assert_eq!(modal.current(), Some(&ModalKind::ResetPrompt));
        assert!(modal.current().unwrap().shows_delete());
    }

    #[test]
    fn alert_does_not_cancel_scheduled_prompt() {
        let start = Instant::now();
        let mut modal = Modal::default();
        modal.schedule(ModalKind::ResetPrompt, start, Duration::from_secs(10));
        modal.alert(INVALID_INPUT_MESSAGE);

        let later = start + Duration::from_secs(11);
        assert_eq!(modal.tick(later), Some(Duration::ZERO));
        assert_eq!(modal.current().unwrap().header(), INVALID_INPUT_MESSAGE);
        assert!(!modal.current().unwrap().shows_delete());

        modal.close(CloseTrigger::Escape);
        modal.tick(later);
        assert_eq!(modal.current(), Some(&ModalKind::ResetPrompt));
    }

    #[test]
    fn cancelled_prompt_never_opens() {
        let start = Instant::now();
        let mut modal = Modal::default();
        modal.schedule(ModalKind::ResetPrompt, start, Duration::from_secs(10));
        modal.cancel_scheduled();
        assert_eq!(modal.tick(start + Duration::from_secs(11)), None);
        assert!(!modal.is_open());
    }

    #[test]
    fn close_triggers() {
        for trigger in [CloseTrigger::Button, CloseTrigger::Overlay, CloseTrigger::Escape] {
            let mut modal = Modal::default();
            modal.alert("x");
            modal.close(trigger);
            assert!(!modal.is_open());
        }
        let mut modal = Modal::default();
        assert_eq!(modal.tick(Instant::now()), None);
    }
}
