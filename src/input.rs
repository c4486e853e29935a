// Keyboard input classification
// Decides which key presses are window-dismissal shortcuts that must be swallowed

use smithay_client_toolkit::seat::keyboard::{Keysym, Modifiers};

/// Modifier keys relevant to dismissal shortcuts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub ctrl: bool,
    pub alt: bool,
}

impl From<Modifiers> for ModifierState {
    fn from(modifiers: Modifiers) -> Self {
        Self {
            ctrl: modifiers.ctrl,
            alt: modifiers.alt,
        }
    }
}

/// Shortcuts that would normally close or escape the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissShortcut {
    /// Alt+F4
    ForceClose,
    /// Ctrl+W
    CloseWindow,
    /// Escape
    Escape,
}

/// Classify a key press. Returns the dismissal shortcut it matches, if any.
pub fn dismiss_shortcut(keysym: Keysym, modifiers: ModifierState) -> Option<DismissShortcut> {
    if keysym == Keysym::Escape {
        return Some(DismissShortcut::Escape);
    }
    if modifiers.alt && keysym == Keysym::F4 {
        return Some(DismissShortcut::ForceClose);
    }
    if modifiers.ctrl && (keysym == Keysym::w || keysym == Keysym::W) {
        return Some(DismissShortcut::CloseWindow);
    }
    None
}
