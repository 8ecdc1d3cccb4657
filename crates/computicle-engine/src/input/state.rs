use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState};

/// Keys currently held, used to turn platform key events into press edges.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
}

impl InputState {
    /// Applies `ev`, recording a press into `frame` only on an up→down edge.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match ev {
            // Releases are not delivered while unfocused.
            InputEvent::Focused(false) => self.held.clear(),
            InputEvent::Focused(true) => {}

            InputEvent::Key { key, state, .. } => match state {
                KeyState::Pressed => {
                    if self.held.insert(key) {
                        frame.record_press(key);
                    }
                }
                KeyState::Released => {
                    self.held.remove(&key);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState, repeat: bool) -> InputEvent {
        InputEvent::Key { key, state, repeat }
    }

    #[test]
    fn press_is_edge_triggered() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, key(Key::Space, KeyState::Pressed, false));
        assert!(f.pressed(Key::Space));

        f.clear();
        s.apply_event(&mut f, key(Key::Space, KeyState::Pressed, true));
        assert!(!f.pressed(Key::Space), "auto-repeat is not a new press");
    }

    #[test]
    fn release_then_press_is_a_new_edge() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, key(Key::R, KeyState::Pressed, false));
        s.apply_event(&mut f, key(Key::R, KeyState::Released, false));

        f.clear();
        s.apply_event(&mut f, key(Key::R, KeyState::Pressed, false));
        assert!(f.pressed(Key::R));
    }

    #[test]
    fn focus_loss_forgets_held_keys() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();
        s.apply_event(&mut f, key(Key::Escape, KeyState::Pressed, false));
        s.apply_event(&mut f, InputEvent::Focused(false));

        // The release was never seen; the next press still counts.
        f.clear();
        s.apply_event(&mut f, key(Key::Escape, KeyState::Pressed, false));
        assert!(f.pressed(Key::Escape));
    }
}
