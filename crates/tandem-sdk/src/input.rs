// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Polled input state of one window.

use std::collections::HashSet;
use tandem_core::platform::{InputEvent, MouseButton};

/// Keys, buttons and cursor of a window, as seen by the current frame.
///
/// Fed by forwarded input events; "just pressed" state and scroll deltas
/// last for one frame.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys: HashSet<String>,
    just_pressed_keys: HashSet<String>,
    buttons: HashSet<MouseButton>,
    just_pressed_buttons: HashSet<MouseButton>,
    cursor: (f32, f32),
    scroll: (f32, f32),
    cursor_inside: bool,
}

impl InputState {
    /// Folds one event into the state.
    pub fn apply(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyPressed { key_code } => {
                if self.keys.insert(key_code.clone()) {
                    self.just_pressed_keys.insert(key_code.clone());
                }
            }
            InputEvent::KeyReleased { key_code } => {
                self.keys.remove(key_code);
            }
            InputEvent::MouseButtonPressed { button } => {
                if self.buttons.insert(*button) {
                    self.just_pressed_buttons.insert(*button);
                }
            }
            InputEvent::MouseButtonReleased { button } => {
                self.buttons.remove(button);
            }
            InputEvent::MouseMoved { x, y } => self.cursor = (*x, *y),
            InputEvent::MouseWheelScrolled { delta_x, delta_y } => {
                self.scroll.0 += delta_x;
                self.scroll.1 += delta_y;
            }
        }
    }

    pub(crate) fn set_cursor_inside(&mut self, inside: bool) {
        self.cursor_inside = inside;
    }

    /// Clears per-frame state. Called after every frame.
    pub(crate) fn prepare_next(&mut self) {
        self.just_pressed_keys.clear();
        self.just_pressed_buttons.clear();
        self.scroll = (0.0, 0.0);
    }

    /// Forgets everything, e.g. after a fullscreen switch swallowed the releases.
    pub(crate) fn reset(&mut self) {
        let inside = self.cursor_inside;
        *self = Self {
            cursor_inside: inside,
            ..Self::default()
        };
    }

    /// Returns `true` while `key_code` is held.
    pub fn is_key_pressed(&self, key_code: &str) -> bool {
        self.keys.contains(key_code)
    }

    /// Returns `true` if `key_code` went down this frame.
    pub fn is_key_just_pressed(&self, key_code: &str) -> bool {
        self.just_pressed_keys.contains(key_code)
    }

    /// Returns `true` while `button` is held.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    /// Returns `true` if `button` went down this frame.
    pub fn is_button_just_pressed(&self, button: MouseButton) -> bool {
        self.just_pressed_buttons.contains(&button)
    }

    /// Last cursor position in logical units.
    pub fn cursor_position(&self) -> (f32, f32) {
        self.cursor
    }

    /// Scroll accumulated this frame.
    pub fn scroll_delta(&self) -> (f32, f32) {
        self.scroll
    }

    /// Returns `true` while the cursor is over the window.
    pub fn is_cursor_inside(&self) -> bool {
        self.cursor_inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str, pressed: bool) -> InputEvent {
        let key_code = code.to_string();
        if pressed {
            InputEvent::KeyPressed { key_code }
        } else {
            InputEvent::KeyReleased { key_code }
        }
    }

    #[test]
    fn just_pressed_lasts_one_frame() {
        let mut input = InputState::default();
        input.apply(&key("Space", true));
        assert!(input.is_key_pressed("Space"));
        assert!(input.is_key_just_pressed("Space"));

        input.prepare_next();
        assert!(input.is_key_pressed("Space"));
        assert!(!input.is_key_just_pressed("Space"));

        input.apply(&key("Space", false));
        assert!(!input.is_key_pressed("Space"));
    }

    #[test]
    fn scroll_accumulates_until_the_next_frame() {
        let mut input = InputState::default();
        input.apply(&InputEvent::MouseWheelScrolled {
            delta_x: 0.0,
            delta_y: 1.0,
        });
        input.apply(&InputEvent::MouseWheelScrolled {
            delta_x: 0.5,
            delta_y: 2.0,
        });
        assert_eq!(input.scroll_delta(), (0.5, 3.0));
        input.prepare_next();
        assert_eq!(input.scroll_delta(), (0.0, 0.0));
    }

    #[test]
    fn reset_keeps_only_hover_state() {
        let mut input = InputState::default();
        input.set_cursor_inside(true);
        input.apply(&InputEvent::MouseButtonPressed {
            button: MouseButton::Left,
        });
        input.apply(&InputEvent::MouseMoved { x: 3.0, y: 4.0 });

        input.reset();
        assert!(!input.is_button_pressed(MouseButton::Left));
        assert_eq!(input.cursor_position(), (0.0, 0.0));
        assert!(input.is_cursor_inside());
    }
}
