/// Input handling
/// Turns mouse events into camera look/zoom actions and pick requests
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Pointer travel, in pixels, before a press counts as a drag instead of a click
pub const CLICK_THRESHOLD_PX: f32 = 4.0;
/// Field-of-view change per wheel line
pub const ZOOM_STEP_DEG: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    Look { turn_deg: f32, tilt_deg: f32 },
    Zoom(f32),
    Pick { x: f32, y: f32 },
}

pub struct InputHandler {
    mouse_sensitivity: f32,
    cursor: (f32, f32),
    press_origin: Option<(f32, f32)>,
    dragging: bool,
}

impl InputHandler {
    pub fn new() -> Self {
        Self {
            mouse_sensitivity: 0.1,
            cursor: (0.0, 0.0),
            press_origin: None,
            dragging: false,
        }
    }

    pub fn with_sensitivity(mut self, degrees_per_pixel: f32) -> Self {
        self.mouse_sensitivity = degrees_per_pixel;
        self
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputAction> {
        match event {
            WindowEvent::MouseInput { state, button, .. } => self.mouse_button(*state, *button),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x as f32, position.y as f32)
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll(lines)
            }
            _ => None,
        }
    }

    pub fn mouse_button(&mut self, state: ElementState, button: MouseButton) -> Option<InputAction> {
        if button != MouseButton::Left {
            return None;
        }

        match state {
            ElementState::Pressed => {
                self.press_origin = Some(self.cursor);
                self.dragging = false;
                None
            }
            ElementState::Released => {
                let was_press = self.press_origin.take().is_some();
                let was_drag = std::mem::replace(&mut self.dragging, false);
                if was_press && !was_drag {
                    Some(InputAction::Pick {
                        x: self.cursor.0,
                        y: self.cursor.1,
                    })
                } else {
                    None
                }
            }
        }
    }

    /// Dragging grabs the sky: moving the pointer right swings the view left
    pub fn cursor_moved(&mut self, x: f32, y: f32) -> Option<InputAction> {
        let (last_x, last_y) = std::mem::replace(&mut self.cursor, (x, y));
        let origin = self.press_origin?;

        if !self.dragging {
            let travel = ((x - origin.0).powi(2) + (y - origin.1).powi(2)).sqrt();
            if travel <= CLICK_THRESHOLD_PX {
                return None;
            }
            self.dragging = true;
        }

        Some(InputAction::Look {
            turn_deg: -(x - last_x) * self.mouse_sensitivity,
            tilt_deg: (y - last_y) * self.mouse_sensitivity,
        })
    }

    /// Wheel up narrows the field of view
    pub fn scroll(&mut self, lines: f32) -> Option<InputAction> {
        if lines == 0.0 {
            return None;
        }
        Some(InputAction::Zoom(lines * ZOOM_STEP_DEG))
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}
