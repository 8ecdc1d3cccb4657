use std::collections::HashSet;

use super::types::Key;

/// Keys that went down since the previous frame. Auto-repeat does not count.
///
/// Cleared by the runtime after each frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    keys_pressed: HashSet<Key>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.keys_pressed.clear();
    }

    pub(crate) fn record_press(&mut self, key: Key) {
        self.keys_pressed.insert(key);
    }

    /// Whether `key` went down this frame.
    pub fn pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }
}
