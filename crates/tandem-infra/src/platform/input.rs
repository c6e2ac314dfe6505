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

//! Translation from `winit` input events to the engine's backend-agnostic [`InputEvent`].
//!
//! Cursor positions arrive in physical pixels and are converted to logical
//! units here, so the render thread only ever sees one coordinate space.

use tandem_core::platform::{InputEvent, MouseButton};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Translates a `winit` window event into an [`InputEvent`].
///
/// Returns `None` for anything that is not a direct user input action
/// (resizes, focus changes, key repeats, zero scrolls).
pub fn translate_winit_input(event: &WindowEvent, scale_factor: f64) -> Option<InputEvent> {
    match event {
        WindowEvent::KeyboardInput {
            event: key_event, ..
        } => {
            let PhysicalKey::Code(keycode) = key_event.physical_key else {
                return None;
            };
            let key_code = map_keycode_to_string(keycode);
            match key_event.state {
                ElementState::Pressed if !key_event.repeat => Some(InputEvent::KeyPressed { key_code }),
                ElementState::Released => Some(InputEvent::KeyReleased { key_code }),
                _ => None,
            }
        }
        WindowEvent::CursorMoved { position, .. } => {
            let logical = position.to_logical::<f64>(scale_factor);
            Some(InputEvent::MouseMoved {
                x: logical.x as f32,
                y: logical.y as f32,
            })
        }
        WindowEvent::MouseInput { state, button, .. } => {
            let button = map_mouse_button(*button);
            Some(match state {
                ElementState::Pressed => InputEvent::MouseButtonPressed { button },
                ElementState::Released => InputEvent::MouseButtonReleased { button },
            })
        }
        WindowEvent::MouseWheel { delta, .. } => {
            let (delta_x, delta_y) = match delta {
                MouseScrollDelta::LineDelta(x, y) => (*x, *y),
                MouseScrollDelta::PixelDelta(pos) => {
                    let logical = pos.to_logical::<f64>(scale_factor);
                    (logical.x as f32, logical.y as f32)
                }
            };
            (delta_x != 0.0 || delta_y != 0.0).then_some(InputEvent::MouseWheelScrolled { delta_x, delta_y })
        }
        _ => None,
    }
}

fn map_keycode_to_string(keycode: KeyCode) -> String {
    format!("{keycode:?}")
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    match button {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(id) => MouseButton::Other(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::{DeviceId, TouchPhase};

    #[test]
    fn keycodes_use_their_debug_name() {
        assert_eq!(map_keycode_to_string(KeyCode::KeyA), "KeyA");
        assert_eq!(map_keycode_to_string(KeyCode::Escape), "Escape");
    }

    #[test]
    fn mouse_buttons_map_one_to_one() {
        assert_eq!(map_mouse_button(WinitMouseButton::Left), MouseButton::Left);
        assert_eq!(map_mouse_button(WinitMouseButton::Back), MouseButton::Back);
        assert_eq!(
            map_mouse_button(WinitMouseButton::Other(9)),
            MouseButton::Other(9)
        );
    }

    #[test]
    fn button_release_is_translated() {
        let event = WindowEvent::MouseInput {
            device_id: DeviceId::dummy(),
            state: ElementState::Released,
            button: WinitMouseButton::Right,
        };
        assert_eq!(
            translate_winit_input(&event, 1.0),
            Some(InputEvent::MouseButtonReleased {
                button: MouseButton::Right
            })
        );
    }

    #[test]
    fn cursor_position_is_logical() {
        let event = WindowEvent::CursorMoved {
            device_id: DeviceId::dummy(),
            position: PhysicalPosition::new(200.0, 100.0),
        };
        assert_eq!(
            translate_winit_input(&event, 2.0),
            Some(InputEvent::MouseMoved { x: 100.0, y: 50.0 })
        );
    }

    #[test]
    fn zero_scroll_is_dropped() {
        let event = WindowEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::LineDelta(0.0, 0.0),
            phase: TouchPhase::Moved,
        };
        assert_eq!(translate_winit_input(&event, 1.0), None);

        let event = WindowEvent::MouseWheel {
            device_id: DeviceId::dummy(),
            delta: MouseScrollDelta::PixelDelta(PhysicalPosition::new(4.0, -8.0)),
            phase: TouchPhase::Moved,
        };
        assert_eq!(
            translate_winit_input(&event, 2.0),
            Some(InputEvent::MouseWheelScrolled {
                delta_x: 2.0,
                delta_y: -4.0
            })
        );
    }

    #[test]
    fn window_events_are_not_input() {
        assert_eq!(translate_winit_input(&WindowEvent::Focused(true), 1.0), None);
        assert_eq!(translate_winit_input(&WindowEvent::CloseRequested, 1.0), None);
    }
}
