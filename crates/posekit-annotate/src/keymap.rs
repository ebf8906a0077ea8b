use std::str::FromStr;

use crate::{
    error::AnnotationError,
    movement::{Axis, MovementStep, MovementSteps, Nudge},
    pose_update::PoseUpdate,
};

/// Keys with a binding in the annotator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// `I`
    I,
    /// `J`
    J,
    /// `K`
    K,
    /// `L`
    L,
    /// `U`
    U,
    /// `M`
    M,
    /// `,`
    Comma,
    /// `R`
    R,
    /// `F`
    F,
}

impl FromStr for Key {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.to_ascii_lowercase().as_str() {
            "i" => Key::I,
            "j" => Key::J,
            "k" => Key::K,
            "l" => Key::L,
            "u" => Key::U,
            "m" => Key::M,
            "," | "comma" => Key::Comma,
            "r" => Key::R,
            "f" => Key::F,
            _ => return Err(AnnotationError::UnknownKey(s.to_string())),
        };
        Ok(key)
    }
}

/// State of the modifier keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Rotation mode (left shift held), translation mode otherwise.
    pub rotate: bool,
    /// Coarse steps (left control held).
    pub coarse: bool,
}

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Move the selected object.
    Nudge(Nudge),
    /// Refine the selected object with ICP.
    RefineIcp,
    /// Align the selected object on the picked point pairs.
    SolvePicked,
}

/// Resolve a key press under the given modifiers.
///
/// | key | translation | rotation |
/// |-----|-------------|----------|
/// | `L` | +x | |
/// | `J` | -x | +y |
/// | `K` | +y | -y |
/// | `I` | -y | -x |
/// | `U` | +z | +x |
/// | `M` | -z | +z |
/// | `,` | | -z |
///
/// `R` and `F` ignore the modifiers.
pub fn resolve_key(key: Key, modifiers: Modifiers) -> Option<Command> {
    let nudge = match (key, modifiers.rotate) {
        (Key::R, _) => return Some(Command::RefineIcp),
        (Key::F, _) => return Some(Command::SolvePicked),

        (Key::L, false) => translate(Axis::X, true),
        (Key::J, false) => translate(Axis::X, false),
        (Key::K, false) => translate(Axis::Y, true),
        (Key::I, false) => translate(Axis::Y, false),
        (Key::U, false) => translate(Axis::Z, true),
        (Key::M, false) => translate(Axis::Z, false),

        // rotation mode has its own layout
        (Key::M, true) => rotate(Axis::Z, true),
        (Key::Comma, true) => rotate(Axis::Z, false),
        (Key::J, true) => rotate(Axis::Y, true),
        (Key::K, true) => rotate(Axis::Y, false),
        (Key::U, true) => rotate(Axis::X, true),
        (Key::I, true) => rotate(Axis::X, false),

        (Key::Comma, false) | (Key::L, true) => return None,
    };
    Some(Command::Nudge(nudge))
}

fn translate(axis: Axis, positive: bool) -> Nudge {
    Nudge::Translate { axis, positive }
}

fn rotate(axis: Axis, positive: bool) -> Nudge {
    Nudge::Rotate { axis, positive }
}

/// Tracks the modifier keys and the movement step they select.
///
/// The step starts at `initial`; pressing the coarse modifier switches to `coarse` and
/// releasing it to `fine`.
#[derive(Debug, Clone)]
pub struct KeyboardState {
    modifiers: Modifiers,
    steps: MovementSteps,
    step: MovementStep,
}

impl KeyboardState {
    /// Create a keyboard state with no modifier held.
    pub fn new(steps: MovementSteps) -> Self {
        Self {
            modifiers: Modifiers::default(),
            steps,
            step: steps.initial,
        }
    }

    /// Press or release the rotation modifier.
    pub fn set_rotate(&mut self, down: bool) {
        self.modifiers.rotate = down;
    }

    /// Press or release the coarse modifier.
    pub fn set_coarse(&mut self, down: bool) {
        self.modifiers.coarse = down;
        self.step = if down {
            self.steps.coarse
        } else {
            self.steps.fine
        };
    }

    /// The modifiers currently held.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// The step a nudge would use now.
    pub fn step(&self) -> MovementStep {
        self.step
    }

    /// Resolve a key press into a command under the current modifiers.
    pub fn resolve(&self, key: Key) -> Option<Command> {
        resolve_key(key, self.modifiers)
    }

    /// Resolve a key press into a pose update when it does not need picked points.
    pub fn pose_update(&self, key: Key) -> Option<PoseUpdate> {
        match self.resolve(key)? {
            Command::Nudge(nudge) => Some(PoseUpdate::Nudge(nudge, self.step)),
            Command::RefineIcp => Some(PoseUpdate::Icp),
            Command::SolvePicked => None,
        }
    }
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self::new(MovementSteps::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSLATE: Modifiers = Modifiers {
        rotate: false,
        coarse: false,
    };
    const ROTATE: Modifiers = Modifiers {
        rotate: true,
        coarse: false,
    };

    #[test]
    fn test_translation_mode() {
        let cases = [
            (Key::L, Axis::X, true),
            (Key::J, Axis::X, false),
            (Key::K, Axis::Y, true),
            (Key::I, Axis::Y, false),
            (Key::U, Axis::Z, true),
            (Key::M, Axis::Z, false),
        ];
        for (key, axis, positive) in cases {
            assert_eq!(
                resolve_key(key, TRANSLATE),
                Some(Command::Nudge(Nudge::Translate { axis, positive })),
                "{key:?}"
            );
        }
        assert_eq!(resolve_key(Key::Comma, TRANSLATE), None);
    }

    #[test]
    fn test_rotation_mode() {
        let cases = [
            (Key::U, Axis::X, true),
            (Key::I, Axis::X, false),
            (Key::J, Axis::Y, true),
            (Key::K, Axis::Y, false),
            (Key::M, Axis::Z, true),
            (Key::Comma, Axis::Z, false),
        ];
        for (key, axis, positive) in cases {
            assert_eq!(
                resolve_key(key, ROTATE),
                Some(Command::Nudge(Nudge::Rotate { axis, positive })),
                "{key:?}"
            );
        }
        assert_eq!(resolve_key(Key::L, ROTATE), None);
    }

    #[test]
    fn test_refine_and_solve_ignore_modifiers() {
        for modifiers in [TRANSLATE, ROTATE] {
            assert_eq!(resolve_key(Key::R, modifiers), Some(Command::RefineIcp));
            assert_eq!(resolve_key(Key::F, modifiers), Some(Command::SolvePicked));
        }
    }

    #[test]
    fn test_step_selection() {
        let mut keyboard = KeyboardState::default();
        assert_eq!(keyboard.step(), MovementStep::INITIAL);

        keyboard.set_coarse(true);
        assert_eq!(keyboard.step(), MovementStep::COARSE);
        assert!(keyboard.modifiers().coarse);

        keyboard.set_coarse(false);
        assert_eq!(keyboard.step(), MovementStep::FINE);

        keyboard.set_rotate(true);
        assert_eq!(
            keyboard.pose_update(Key::M),
            Some(PoseUpdate::Nudge(
                Nudge::Rotate {
                    axis: Axis::Z,
                    positive: true
                },
                MovementStep::FINE
            ))
        );
        assert_eq!(keyboard.pose_update(Key::R), Some(PoseUpdate::Icp));
        assert_eq!(keyboard.pose_update(Key::F), None);
    }

    #[test]
    fn test_parse_key() -> Result<(), AnnotationError> {
        assert_eq!("L".parse::<Key>()?, Key::L);
        assert_eq!(",".parse::<Key>()?, Key::Comma);
        assert_eq!("comma".parse::<Key>()?, Key::Comma);
        assert!(matches!(
            "q".parse::<Key>(),
            Err(AnnotationError::UnknownKey(_))
        ));
        Ok(())
    }
}
