use std::path::PathBuf;

use glam::Vec2;

use super::timers::TimerId;

/// Everything that can happen to the pet. The shell (or a test) feeds these
/// into [`PetCore::handle`](super::PetCore::handle); nothing else mutates
/// core state.
///
/// Pointer positions are absolute screen coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Fixed-period update tick. Advances the virtual clock, fires due
    /// timers, integrates motion, and cycles the animation frame.
    Tick,
    /// Left button pressed on the sprite.
    PointerDown(Vec2),
    /// Pointer moved while the left button is held on the sprite.
    PointerMove(Vec2),
    /// Left button released.
    PointerUp(Vec2),
    /// Pointer moved anywhere on screen (idle tracking / follow cancel).
    GlobalPointerMove(Vec2),
    /// A context-menu selection.
    MenuCommand(MenuCommand),
    /// A timer armed by the core came due. Synthesized internally on `Tick`;
    /// stale ids are ignored.
    TimerFired(TimerId),
    /// The shell finished decoding the sequence requested by the last
    /// `PlayAnimation` effect.
    AnimationLoaded { frames: usize, size: Vec2 },
}

/// Selections from the right-click menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    SwitchCharacter(String),
    Quit,
}

/// Side effects requested by the core. The shell applies them to the real
/// window; tests assert on them directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Move the window so its top-left corner sits at the given screen
    /// position.
    MoveWindow(Vec2),
    /// Decode and display the animation at this path, looping.
    PlayAnimation(PathBuf),
    /// Exit the process.
    Quit,
}
