pub mod behavior;
pub mod events;
pub mod motion;
pub mod scheduler;
pub mod timers;

pub use events::{Effect, Event, MenuCommand};

use std::path::{Path, PathBuf};

use glam::Vec2;

use crate::config::{CharacterCatalog, Config, Settings};
use timers::{TimerId, TimerQueue};

/// Fixed simulation tick period in milliseconds.
pub const TICK_MS: u64 = 30;
/// Window edge length before the first animation is decoded, px.
pub const INITIAL_WINDOW_SIZE: f32 = 100.0;

// ---------------------------------------------------------------------------
// Behavior states
// ---------------------------------------------------------------------------

/// Discrete behavior states. Exactly one is active at a time; entering a
/// state swaps the animation if the active character maps one for it.
///
/// `Sleeping` can be mapped in the config but no transition currently enters
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PetState {
    Idle = 0,
    Moving = 1,
    Dragging = 2,
    Sleeping = 3,
    Falling = 4,
    Angry = 5,
    ByeBye = 6,
    FollowingMouse = 7,
}

impl PetState {
    pub const ALL: [PetState; 8] = [
        Self::Idle,
        Self::Moving,
        Self::Dragging,
        Self::Sleeping,
        Self::Falling,
        Self::Angry,
        Self::ByeBye,
        Self::FollowingMouse,
    ];

    /// The lower-cased key this state goes by in the config file.
    pub fn key(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Moving => "moving",
            Self::Dragging => "dragging",
            Self::Sleeping => "sleeping",
            Self::Falling => "falling",
            Self::Angry => "angry",
            Self::ByeBye => "byebye",
            Self::FollowingMouse => "following_mouse",
        }
    }

    /// Inverse of [`key`](Self::key). Expects `key` already lower-cased.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.key() == key)
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// The single on-screen pet.
pub struct Pet {
    pub state: PetState,
    /// Index into the character catalog.
    pub character: usize,
    /// Window top-left corner in screen px.
    pub pos: Vec2,
    /// Sprite (and window) size in px.
    pub size: Vec2,
    /// Frames in the sequence the shell is currently displaying.
    pub frame_count: usize,
    /// Which frame of that sequence is showing.
    pub frame_cursor: usize,
    frame_accum_ms: u64,
    /// Where `Moving` is headed, if anywhere.
    pub target: Option<Vec2>,
    /// Current fall speed, px per tick.
    pub fall_velocity: f32,
    /// Set when the pointer has gone idle; cleared on the next pointer move.
    /// Outlives the `FollowingMouse` state itself.
    pub following: bool,
    /// Last deduplicated pointer position seen, screen px.
    pub last_pointer: Option<Vec2>,
    /// Left clicks inside the current decay window.
    pub clicks: u32,
    /// Character name queued behind the ByeBye transition.
    pub pending_character: Option<String>,

    // One cancellable handle per timed concern.
    pub next_action_timer: Option<TimerId>,
    pub idle_timer: Option<TimerId>,
    pub click_reset_timer: Option<TimerId>,
    pub angry_revert_timer: Option<TimerId>,
    pub character_swap_timer: Option<TimerId>,
}

/// Live pointer-drag bookkeeping, pointer-down to pointer-up.
pub struct DragSession {
    /// Pointer position at press, screen px.
    pub pointer_start: Vec2,
    /// Window position at press, screen px.
    pub window_start: Vec2,
    /// True once cumulative displacement crossed the drag threshold.
    pub committed: bool,
    /// Set by the long-drag timer; decides anger on release.
    pub long_drag: bool,
    pub long_drag_timer: TimerId,
}

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

/// The single-threaded behavior core.
///
/// The shell feeds [`Event`]s in and applies the [`Effect`]s that come out;
/// nothing in here touches a real window, clock, or file, which is what
/// makes the whole state machine testable with synthetic ticks.
pub struct PetCore {
    pub settings: Settings,
    pub catalog: CharacterCatalog,
    /// Primary screen size, px.
    pub screen: Vec2,
    pub pet: Pet,
    pub drag: Option<DragSession>,
    pub timers: TimerQueue,
    pub rng: fastrand::Rng,
    fired: Vec<TimerId>,
}

impl PetCore {
    pub fn new(config: Config, screen: Vec2, rng: fastrand::Rng) -> Self {
        let size = Vec2::splat(INITIAL_WINDOW_SIZE);
        let pos = ((screen - size) * 0.5).max(Vec2::ZERO);
        Self {
            settings: config.settings,
            catalog: config.catalog,
            screen,
            pet: Pet {
                state: PetState::Idle,
                character: 0,
                pos,
                size,
                frame_count: 0,
                frame_cursor: 0,
                frame_accum_ms: 0,
                target: None,
                fall_velocity: 0.0,
                following: false,
                last_pointer: None,
                clicks: 0,
                pending_character: None,
                next_action_timer: None,
                idle_timer: None,
                click_reset_timer: None,
                angry_revert_timer: None,
                character_swap_timer: None,
            },
            drag: None,
            timers: TimerQueue::new(),
            rng,
            fired: Vec::with_capacity(4),
        }
    }

    /// Kick off the initial animation, the pointer-idle watchdog and the
    /// first autonomous action.
    pub fn boot(&mut self, effects: &mut Vec<Effect>) {
        if let Some(path) = self.active_asset(self.pet.state) {
            effects.push(Effect::PlayAnimation(path));
        }
        self.reset_idle_timer();
        scheduler::schedule_next(self);
        log::info!(
            "pet ready: character {:?}, {} in catalog",
            self.catalog.get(0).map(|c| c.name.as_str()).unwrap_or("?"),
            self.catalog.len()
        );
    }

    /// Process one event, pushing any resulting effects.
    pub fn handle(&mut self, event: Event, effects: &mut Vec<Effect>) {
        match event {
            Event::Tick => self.tick(effects),
            Event::PointerDown(pos) => behavior::pointer_down(self, pos, effects),
            Event::PointerMove(pos) => behavior::pointer_move(self, pos, effects),
            Event::PointerUp(pos) => behavior::pointer_up(self, pos, effects),
            Event::GlobalPointerMove(pos) => behavior::global_pointer_move(self, pos, effects),
            Event::MenuCommand(command) => behavior::menu_command(self, command, effects),
            Event::TimerFired(id) => behavior::timer_fired(self, id, effects),
            Event::AnimationLoaded { frames, size } => self.animation_loaded(frames, size),
        }
    }

    /// One fixed 30 ms step: expire timers, integrate motion, advance the
    /// frame clock.
    fn tick(&mut self, effects: &mut Vec<Effect>) {
        let mut fired = std::mem::take(&mut self.fired);
        self.timers.advance(TICK_MS, &mut fired);
        for id in fired.drain(..) {
            behavior::timer_fired(self, id, effects);
        }
        self.fired = fired;

        motion::integrate(self, effects);
        self.advance_frame();
    }

    /// Commit a state change. Same-state calls are a no-op; a state the
    /// active character maps no animation for keeps the current one.
    pub fn set_state(&mut self, new: PetState, effects: &mut Vec<Effect>) {
        if self.pet.state == new {
            return;
        }
        log::debug!("state {:?} -> {:?}", self.pet.state, new);
        self.pet.state = new;
        if let Some(path) = self.active_asset(new) {
            effects.push(Effect::PlayAnimation(path));
        }
    }

    /// The animation the active character maps to `state`.
    fn active_asset(&self, state: PetState) -> Option<PathBuf> {
        self.catalog
            .get(self.pet.character)
            .and_then(|c| c.asset_for(state))
            .map(Path::to_path_buf)
    }

    /// Cancel-then-arm the pointer-idle watchdog.
    pub fn reset_idle_timer(&mut self) {
        if let Some(id) = self.pet.idle_timer.take() {
            self.timers.cancel(id);
        }
        self.pet.idle_timer = Some(
            self.timers
                .arm(self.settings.mouse_idle_time_before_action),
        );
    }

    fn animation_loaded(&mut self, frames: usize, size: Vec2) {
        self.pet.frame_count = frames;
        self.pet.frame_cursor = 0;
        self.pet.frame_accum_ms = 0;
        self.pet.size = size;
    }

    /// Advance the animation cursor on its own cadence, independent of the
    /// tick rate.
    fn advance_frame(&mut self) {
        if self.pet.frame_count == 0 {
            return;
        }
        self.pet.frame_accum_ms += TICK_MS;
        let period = self.settings.animation_speed.max(1);
        while self.pet.frame_accum_ms >= period {
            self.pet.frame_accum_ms -= period;
            self.pet.frame_cursor = (self.pet.frame_cursor + 1) % self.pet.frame_count;
        }
    }
}

// ---------------------------------------------------------------------------
// Test fixtures shared by the pet submodules
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::testkit::*;
    use super::*;

    #[test]
    fn boot_plays_idle_and_arms_both_watchdogs() {
        let mut core = core();
        let mut effects = Vec::new();
        core.boot(&mut effects);
        assert_eq!(effects, vec![anim("mimi/idle.gif")]);
        assert!(core.pet.idle_timer.is_some());
        assert!(core.pet.next_action_timer.is_some());
        assert_eq!(core.timers.live_count(), 2);
    }

    #[test]
    fn same_state_commit_is_idempotent() {
        let mut core = core();
        let mut effects = Vec::new();
        core.set_state(PetState::Moving, &mut effects);
        assert_eq!(effects, vec![anim("mimi/moving.gif")]);
        core.set_state(PetState::Moving, &mut effects);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn unmapped_state_keeps_the_current_animation() {
        let mut core = core();
        let mut effects = Vec::new();
        core.set_state(PetState::Sleeping, &mut effects);
        assert_eq!(core.pet.state, PetState::Sleeping);
        assert!(effects.is_empty());
    }

    #[test]
    fn state_keys_round_trip() {
        for state in PetState::ALL {
            assert_eq!(PetState::from_key(state.key()), Some(state));
        }
        assert_eq!(PetState::from_key("dancing"), None);
    }

    #[test]
    fn frame_clock_advances_at_animation_speed() {
        let mut core = core();
        feed(
            &mut core,
            Event::AnimationLoaded {
                frames: 4,
                size: Vec2::new(64.0, 64.0),
            },
        );
        assert_eq!(core.pet.size, Vec2::new(64.0, 64.0));
        assert_eq!(core.pet.frame_cursor, 0);

        // animation_speed is 120 ms, so one frame every four 30 ms ticks
        run_ms(&mut core, 90);
        assert_eq!(core.pet.frame_cursor, 0);
        run_ms(&mut core, 30);
        assert_eq!(core.pet.frame_cursor, 1);

        // and it wraps
        run_ms(&mut core, 120 * 3);
        assert_eq!(core.pet.frame_cursor, 0);
    }

    #[test]
    fn animation_reload_resets_the_cursor() {
        let mut core = core();
        feed(
            &mut core,
            Event::AnimationLoaded {
                frames: 4,
                size: Vec2::new(64.0, 64.0),
            },
        );
        run_ms(&mut core, 240);
        assert_eq!(core.pet.frame_cursor, 2);
        feed(
            &mut core,
            Event::AnimationLoaded {
                frames: 2,
                size: Vec2::new(32.0, 32.0),
            },
        );
        assert_eq!(core.pet.frame_cursor, 0);
        assert_eq!(core.pet.frame_count, 2);
    }
}
