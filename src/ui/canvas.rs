use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Program};
use iced::{Point, Rectangle, Renderer, Theme};

use crate::Message;

/// Transparent overlay that turns mouse input on the viewport into orbit
/// control messages. The rendered light field is drawn underneath.
pub struct OrbitOverlay;

impl Program<Message> for OrbitOverlay {
    type State = DragState;

    fn draw(
        &self,
        _state: &Self::State,
        _renderer: &Renderer,
        _theme: &Theme,
        _bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        vec![]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        match event {
            // Mouse wheel for zooming
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if cursor.position_in(bounds).is_none() {
                    return (canvas::event::Status::Ignored, None);
                }
                let lines = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => y,
                    mouse::ScrollDelta::Pixels { y, .. } => y / 50.0,
                };
                return (canvas::event::Status::Captured, Some(Message::Zoom(lines)));
            }

            // Left rotates, right pans
            canvas::Event::Mouse(mouse::Event::ButtonPressed(button @ (mouse::Button::Left | mouse::Button::Right))) => {
                if let Some(pos) = cursor.position_in(bounds) {
                    state.button = Some(button);
                    state.last_position = Some(pos);
                    return (canvas::event::Status::Captured, None);
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(button)) => {
                if state.button == Some(button) {
                    state.button = None;
                    state.last_position = None;
                    return (canvas::event::Status::Captured, None);
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if let (Some(button), Some(last_pos), Some(current_pos)) =
                    (state.button, state.last_position, cursor.position())
                {
                    let dx = current_pos.x - last_pos.x;
                    let dy = current_pos.y - last_pos.y;
                    state.last_position = Some(current_pos);

                    let message = match button {
                        mouse::Button::Right => Message::Pan { dx, dy },
                        _ => Message::Rotate { dx, dy },
                    };
                    return (canvas::event::Status::Captured, Some(message));
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }
}

/// State for drag interactions
#[derive(Debug, Clone, Default)]
pub struct DragState {
    pub button: Option<mouse::Button>,
    pub last_position: Option<Point>,
}
