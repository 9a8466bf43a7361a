//! Widget configuration.

use chrono::TimeDelta;

/// Typing indicators are never auto-cleared unless configured.
///
/// The channel producer is the only authority for turning the indicator
/// off. A producer that never sends the closing event leaves it on.
pub const DEFAULT_TYPING_TIMEOUT: Option<TimeDelta> = None;

/// Quick-action menus are offered by default.
pub const DEFAULT_QUICK_ACTIONS: bool = true;

/// Widget configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Clear the typing indicator if no `typing=true` event arrived for this
    /// long. `None` keeps it on until the producer turns it off.
    pub typing_timeout: Option<TimeDelta>,
    /// Offer the context's quick-action menu.
    pub quick_actions: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self { typing_timeout: DEFAULT_TYPING_TIMEOUT, quick_actions: DEFAULT_QUICK_ACTIONS }
    }
}

impl WidgetConfig {
    /// Enable the typing safety timeout.
    #[must_use]
    pub fn with_typing_timeout(mut self, timeout: TimeDelta) -> Self {
        self.typing_timeout = Some(timeout);
        self
    }

    /// Hide the quick-action menu.
    #[must_use]
    pub fn without_quick_actions(mut self) -> Self {
        self.quick_actions = false;
        self
    }
}
