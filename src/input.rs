//! Keyboard and mouse handling.
//!
//! [`Input`] follows the winit event stream, remembering the pointer position,
//! the modifier keys and the left button, and reduces each event to an
//! [`InputEvent`] the viewer acts on. Characters map either to a camera
//! [`Command`] or to a flip of the matching entry in [`Toggles`].

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{Key, ModifiersState, NamedKey};

use crate::camera::Camera;

/// Distance moved per `w`/`s`/`a`/`d` press.
pub const MOVE_STEP: f32 = 0.1;
/// Field-of-view change per `z`/`Z` press, in degrees.
pub const ZOOM_STEP_DEGREES: f32 = 1.0;

/// Toggle that enables back-face culling.
pub const TOGGLE_CULL: char = 'c';
/// Toggle that draws triangle edges only.
pub const TOGGLE_WIREFRAME: char = 't';
/// Toggle that pauses the pulse animation.
pub const TOGGLE_ANIMATION: char = ' ';

/// A camera motion bound to a character key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// `w`
    MoveForward,
    /// `s`
    MoveBack,
    /// `a`
    StrafeLeft,
    /// `d`
    StrafeRight,
    /// `z`, narrows the field of view.
    ZoomIn,
    /// `Z`, widens the field of view.
    ZoomOut,
}

impl Command {
    /// The command bound to `ch`, if any. Only `Z` is bound in upper case.
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            'w' => Some(Self::MoveForward),
            's' => Some(Self::MoveBack),
            'a' => Some(Self::StrafeLeft),
            'd' => Some(Self::StrafeRight),
            'z' => Some(Self::ZoomIn),
            'Z' => Some(Self::ZoomOut),
            _ => None,
        }
    }

    /// Move or zoom `camera`.
    pub fn apply(self, camera: &mut Camera) {
        match self {
            Self::MoveForward => camera.move_dir(MOVE_STEP),
            Self::MoveBack => camera.move_dir(-MOVE_STEP),
            Self::StrafeLeft => camera.move_side(-MOVE_STEP),
            Self::StrafeRight => camera.move_side(MOVE_STEP),
            Self::ZoomIn => camera.zoom(-ZOOM_STEP_DEGREES),
            Self::ZoomOut => camera.zoom(ZOOM_STEP_DEGREES),
        }
    }
}

/// On/off flags keyed by character. Every flag starts off.
#[derive(Clone, Debug, Default)]
pub struct Toggles {
    on: HashSet<char>,
}

impl Toggles {
    /// All flags off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the flag for `ch` and return its new state.
    pub fn flip(&mut self, ch: char) -> bool {
        if self.on.remove(&ch) {
            false
        } else {
            self.on.insert(ch);
            true
        }
    }

    /// Current state of the flag for `ch`.
    pub fn is_on(&self, ch: char) -> bool {
        self.on.contains(&ch)
    }
}

/// When pointer motion turns the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LookGate {
    /// Every pointer motion turns the camera.
    #[default]
    Always,
    /// Only motion with the left button held turns the camera.
    WhileDragging,
}

impl LookGate {
    /// Whether motion should reach the camera given the button state.
    pub fn allows(self, left_down: bool) -> bool {
        match self {
            Self::Always => true,
            Self::WhileDragging => left_down,
        }
    }
}

/// A window event reduced to what the viewer reacts to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Left button went down at `position`, with the modifiers held then.
    Pressed {
        /// Pointer position in window pixels.
        position: Vec2,
        /// Shift held.
        shift: bool,
        /// Control held.
        ctrl: bool,
        /// Alt held.
        alt: bool,
    },
    /// Pointer moved to `position`.
    Moved {
        /// Pointer position in window pixels.
        position: Vec2,
        /// Left button held.
        left_down: bool,
    },
    /// A character key was pressed.
    Char {
        /// The character, with shift applied.
        ch: char,
        /// True for auto-repeat presses.
        repeat: bool,
    },
    /// Escape was pressed.
    Escape,
}

/// Pointer and modifier state tracked across events.
#[derive(Clone, Debug, Default)]
pub struct Input {
    pointer: Vec2,
    modifiers: ModifiersState,
    left_down: bool,
}

impl Input {
    /// No buttons or modifiers held, pointer at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update state from `event` and return what it means to the viewer.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
                None
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.left_button(*state == ElementState::Pressed),
            WindowEvent::CursorMoved { position, .. } => {
                Some(self.pointer_moved(Vec2::new(position.x as f32, position.y as f32)))
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match &event.logical_key {
                    Key::Named(NamedKey::Escape) => Some(InputEvent::Escape),
                    Key::Named(NamedKey::Space) => Some(InputEvent::Char {
                        ch: ' ',
                        repeat: event.repeat,
                    }),
                    Key::Character(text) => text.chars().next().map(|ch| InputEvent::Char {
                        ch,
                        repeat: event.repeat,
                    }),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Record a left button change. Returns a press event when it went down.
    pub fn left_button(&mut self, pressed: bool) -> Option<InputEvent> {
        self.left_down = pressed;
        pressed.then(|| InputEvent::Pressed {
            position: self.pointer,
            shift: self.modifiers.shift_key(),
            ctrl: self.modifiers.control_key(),
            alt: self.modifiers.alt_key(),
        })
    }

    /// Record a pointer move.
    pub fn pointer_moved(&mut self, position: Vec2) -> InputEvent {
        self.pointer = position;
        InputEvent::Moved {
            position,
            left_down: self.left_down,
        }
    }

    /// Replace the held modifiers.
    pub fn set_modifiers(&mut self, modifiers: ModifiersState) {
        self.modifiers = modifiers;
    }

    /// True while the left button is held.
    pub fn left_down(&self) -> bool {
        self.left_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn movement_keys() {
        assert_eq!(Command::from_char('w'), Some(Command::MoveForward));
        assert_eq!(Command::from_char('s'), Some(Command::MoveBack));
        assert_eq!(Command::from_char('a'), Some(Command::StrafeLeft));
        assert_eq!(Command::from_char('d'), Some(Command::StrafeRight));
        assert_eq!(Command::from_char('z'), Some(Command::ZoomIn));
        assert_eq!(Command::from_char('Z'), Some(Command::ZoomOut));
        assert_eq!(Command::from_char('c'), None);
        assert_eq!(Command::from_char(' '), None);
    }

    #[test]
    fn upper_case_movement_letters_are_unbound() {
        for ch in ['W', 'S', 'A', 'D'] {
            assert_eq!(Command::from_char(ch), None, "{ch}");
        }
    }

    #[test]
    fn forward_then_back_returns_home() {
        let mut camera = Camera::new().yaw(0.7);
        let start = camera.world_pos;
        Command::MoveForward.apply(&mut camera);
        assert!(camera.world_pos.distance(start) > 0.09);
        Command::MoveBack.apply(&mut camera);
        assert!(camera.world_pos.abs_diff_eq(start, 1e-6));
    }

    #[test]
    fn strafing_is_sideways() {
        let mut camera = Camera::new();
        let start = camera.world_pos;
        Command::StrafeRight.apply(&mut camera);
        let moved = camera.world_pos - start;
        assert!(moved.dot(camera.heading()).abs() < 1e-6);
        assert_eq!(moved.y, 0.0);
        Command::StrafeLeft.apply(&mut camera);
        assert!(camera.world_pos.abs_diff_eq(start, 1e-6));
    }

    #[test]
    fn zoom_keys_step_one_degree() {
        let mut camera = Camera::new();
        Command::ZoomIn.apply(&mut camera);
        assert!((camera.fovy_degrees() - 44.0).abs() < 1e-4);
        Command::ZoomOut.apply(&mut camera);
        Command::ZoomOut.apply(&mut camera);
        assert!((camera.fovy_degrees() - 46.0).abs() < 1e-4);
    }

    #[test]
    fn toggles_flip() {
        let mut toggles = Toggles::new();
        assert!(!toggles.is_on(TOGGLE_CULL));
        assert!(toggles.flip(TOGGLE_CULL));
        assert!(toggles.is_on(TOGGLE_CULL));
        assert!(!toggles.is_on(TOGGLE_WIREFRAME));
        assert!(!toggles.flip(TOGGLE_CULL));
        assert!(!toggles.is_on(TOGGLE_CULL));
    }

    #[test]
    fn look_gate() {
        assert!(LookGate::Always.allows(false));
        assert!(LookGate::Always.allows(true));
        assert!(!LookGate::WhileDragging.allows(false));
        assert!(LookGate::WhileDragging.allows(true));
        assert_eq!(LookGate::default(), LookGate::Always);
    }

    #[test]
    fn press_reports_pointer_and_modifiers() {
        let mut input = Input::new();
        input.pointer_moved(Vec2::new(30.0, 40.0));
        input.set_modifiers(ModifiersState::SHIFT);

        let event = input.left_button(true);
        assert_eq!(
            event,
            Some(InputEvent::Pressed {
                position: Vec2::new(30.0, 40.0),
                shift: true,
                ctrl: false,
                alt: false,
            })
        );
        assert!(input.left_down());
        assert_eq!(
            input.pointer_moved(Vec2::new(31.0, 40.0)),
            InputEvent::Moved {
                position: Vec2::new(31.0, 40.0),
                left_down: true,
            }
        );

        assert_eq!(input.left_button(false), None);
        assert!(!input.left_down());
    }

    #[test]
    fn movement_keeps_height() {
        let mut camera = Camera::new().pitch(0.8);
        let y = camera.world_pos.y;
        for command in [Command::MoveForward, Command::StrafeLeft] {
            command.apply(&mut camera);
        }
        assert_eq!(camera.world_pos.y, y);
        assert_ne!(camera.world_pos, Vec3::new(1.0, y, 1.0));
    }
}
