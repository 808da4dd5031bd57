//! Pointer and timer driven transitions: click storms, drag sessions,
//! pointer-follow and the good-bye character switch.

use glam::Vec2;

use super::scheduler;
use super::timers::TimerId;
use super::{DragSession, Effect, MenuCommand, PetCore, PetState};

/// Held drag duration after which release angers the pet, ms.
const LONG_DRAG_MS: u64 = 1000;
/// Click-counter decay window, ms.
const CLICK_RESET_MS: u64 = 1000;
/// Clicks inside one decay window that trigger anger.
const ANGRY_CLICK_COUNT: u32 = 3;
/// How long anger lasts before reverting to idle, ms.
const ANGRY_REVERT_MS: u64 = 2000;
/// ByeBye duration before a character swap lands, ms.
const CHARACTER_SWAP_MS: u64 = 2000;

// ---------------------------------------------------------------------------
// Pointer events
// ---------------------------------------------------------------------------

/// Left button pressed on the sprite: open a drag session and count the
/// click. Angry and ByeBye shrug the pointer off entirely.
pub fn pointer_down(core: &mut PetCore, pos: Vec2, effects: &mut Vec<Effect>) {
    core.reset_idle_timer();

    if matches!(core.pet.state, PetState::Angry | PetState::ByeBye) {
        return;
    }

    if let Some(stale) = core.drag.take() {
        core.timers.cancel(stale.long_drag_timer);
    }
    let long_drag_timer = core.timers.arm(LONG_DRAG_MS);
    core.drag = Some(DragSession {
        pointer_start: pos,
        window_start: core.pet.pos,
        committed: false,
        long_drag: false,
        long_drag_timer,
    });

    count_click(core, effects);
}

/// Pointer motion while the left button is held. Runs the global-move
/// bookkeeping first, then commits the session once displacement crosses the
/// threshold and drags the window 1:1 from there on.
pub fn pointer_move(core: &mut PetCore, pos: Vec2, effects: &mut Vec<Effect>) {
    global_pointer_move(core, pos, effects);

    let Some(session) = &core.drag else {
        return;
    };
    let pointer_start = session.pointer_start;
    let window_start = session.window_start;
    let committed = session.committed;

    if !committed {
        if (pos - pointer_start).length() < core.settings.drag_threshold {
            return;
        }
        if matches!(core.pet.state, PetState::Angry | PetState::ByeBye) {
            return;
        }
        scheduler::cancel_next(core);
        core.set_state(PetState::Dragging, effects);
        if let Some(session) = &mut core.drag {
            session.committed = true;
        }
    }

    core.pet.pos = window_start + (pos - pointer_start);
    effects.push(Effect::MoveWindow(core.pet.pos));
}

/// Left button released: close the session and decide what the pet does
/// next. An uncommitted session was a pure click and changes nothing.
pub fn pointer_up(core: &mut PetCore, _pos: Vec2, effects: &mut Vec<Effect>) {
    let Some(session) = core.drag.take() else {
        return;
    };
    core.timers.cancel(session.long_drag_timer);
    core.reset_idle_timer();

    if !session.committed {
        return;
    }

    if session.long_drag {
        enter_angry(core, "dragged around for too long", effects);
    } else if near_edge(core) {
        core.pet.fall_velocity = core.settings.begin_fall_velocity;
        core.set_state(PetState::Falling, effects);
    } else if !matches!(core.pet.state, PetState::Angry | PetState::ByeBye) {
        core.set_state(PetState::Idle, effects);
        scheduler::schedule_next(core);
    }
}

/// Any pointer motion, anywhere on screen. Deduplicates repeats, feeds the
/// idle watchdog and cancels an active follow.
pub fn global_pointer_move(core: &mut PetCore, pos: Vec2, effects: &mut Vec<Effect>) {
    // virtual desktops can report positions past the bottom edge
    let pos = Vec2::new(pos.x, pos.y.min(core.screen.y));
    if core.pet.last_pointer == Some(pos) {
        return;
    }
    core.pet.last_pointer = Some(pos);
    core.reset_idle_timer();

    if core.pet.following {
        log::debug!("pointer moved, follow cancelled");
        core.pet.following = false;
        if core.pet.state == PetState::FollowingMouse {
            core.set_state(PetState::Idle, effects);
        }
        scheduler::schedule_next(core);
    }
}

/// True when any side of the window sits within the fall zone of a screen
/// edge.
fn near_edge(core: &PetCore) -> bool {
    let pos = core.pet.pos;
    let size = core.pet.size;
    let margin = core.settings.fall_zoom_size;
    pos.x < margin
        || pos.y < margin
        || pos.x + size.x > core.screen.x - margin
        || pos.y + size.y > core.screen.y - margin
}

fn count_click(core: &mut PetCore, effects: &mut Vec<Effect>) {
    core.pet.clicks += 1;
    if let Some(id) = core.pet.click_reset_timer.take() {
        core.timers.cancel(id);
    }
    core.pet.click_reset_timer = Some(core.timers.arm(CLICK_RESET_MS));
    if core.pet.clicks >= ANGRY_CLICK_COUNT {
        enter_angry(core, "clicked three times in a row", effects);
    }
}

fn enter_angry(core: &mut PetCore, reason: &str, effects: &mut Vec<Effect>) {
    log::info!("pet got angry: {reason}");
    core.pet.clicks = 0;
    scheduler::cancel_next(core);
    core.set_state(PetState::Angry, effects);
    if let Some(id) = core.pet.angry_revert_timer.take() {
        core.timers.cancel(id);
    }
    core.pet.angry_revert_timer = Some(core.timers.arm(ANGRY_REVERT_MS));
}

// ---------------------------------------------------------------------------
// Timers and menu
// ---------------------------------------------------------------------------

/// Route an expired timer to its owner. Stale ids (cancelled or already
/// fired) match nothing and fall through.
pub fn timer_fired(core: &mut PetCore, id: TimerId, effects: &mut Vec<Effect>) {
    if core.pet.next_action_timer == Some(id) {
        core.pet.next_action_timer = None;
        scheduler::perform_random_action(core, effects);
    } else if core.pet.idle_timer == Some(id) {
        core.pet.idle_timer = None;
        pointer_idle(core, effects);
    } else if core.pet.click_reset_timer == Some(id) {
        core.pet.click_reset_timer = None;
        core.pet.clicks = 0;
    } else if core.pet.angry_revert_timer == Some(id) {
        core.pet.angry_revert_timer = None;
        // a character switch may have moved the state on; only Angry reverts
        if core.pet.state == PetState::Angry {
            core.set_state(PetState::Idle, effects);
        }
    } else if core.pet.character_swap_timer == Some(id) {
        core.pet.character_swap_timer = None;
        finish_character_switch(core, effects);
    } else if core.drag.as_ref().is_some_and(|s| s.long_drag_timer == id) {
        log::debug!("long drag detected");
        if let Some(session) = &mut core.drag {
            session.long_drag = true;
        }
    }
}

/// The pointer has sat still long enough: chase it. Not while the pet is
/// held or falling.
fn pointer_idle(core: &mut PetCore, effects: &mut Vec<Effect>) {
    if matches!(core.pet.state, PetState::Dragging | PetState::Falling) {
        return;
    }
    log::info!("pointer idle, following it");
    core.pet.following = true;
    scheduler::cancel_next(core);
    core.set_state(PetState::FollowingMouse, effects);
}

pub fn menu_command(core: &mut PetCore, command: MenuCommand, effects: &mut Vec<Effect>) {
    match command {
        MenuCommand::SwitchCharacter(name) => switch_character(core, name, effects),
        MenuCommand::Quit => effects.push(Effect::Quit),
    }
}

/// Start a character switch: wave good-bye now, swap after the ByeBye
/// animation has run. Ignored while a switch is already in flight.
fn switch_character(core: &mut PetCore, name: String, effects: &mut Vec<Effect>) {
    if core.pet.state == PetState::ByeBye {
        return;
    }
    log::info!("switching character to {name:?}");
    core.pet.pending_character = Some(name);
    core.set_state(PetState::ByeBye, effects);
    if let Some(id) = core.pet.character_swap_timer.take() {
        core.timers.cancel(id);
    }
    core.pet.character_swap_timer = Some(core.timers.arm(CHARACTER_SWAP_MS));
}

/// Land the queued swap. An unknown target keeps the current character and
/// just settles back to idle.
fn finish_character_switch(core: &mut PetCore, effects: &mut Vec<Effect>) {
    let target = core.pet.pending_character.take();
    match target.as_deref().and_then(|name| core.catalog.index_of(name)) {
        Some(index) => {
            core.pet.character = index;
            log::info!("character switched to {target:?}");
        }
        None => {
            log::warn!("character switch target {target:?} unknown, keeping the current one");
        }
    }
    core.set_state(PetState::Idle, effects);
}

#[cfg(test)]
mod tests {
    use super::super::testkit::*;
    use super::*;
    use crate::pet::Event;

    const CENTER: Vec2 = Vec2::new(960.0, 540.0);

    fn booted() -> PetCore {
        let mut core = core();
        let mut effects = Vec::new();
        core.boot(&mut effects);
        core
    }

    fn click(core: &mut PetCore, pos: Vec2) {
        feed(core, Event::PointerDown(pos));
        feed(core, Event::PointerUp(pos));
    }

    #[test]
    fn three_quick_clicks_anger_the_pet() {
        let mut core = booted();
        for _ in 0..3 {
            click(&mut core, CENTER);
        }
        assert_eq!(core.pet.state, PetState::Angry);
        // autonomous actions stop while angry
        assert!(core.pet.next_action_timer.is_none());

        let effects = run_ms(&mut core, 2010);
        assert_eq!(core.pet.state, PetState::Idle);
        assert!(effects.contains(&anim("mimi/idle.gif")));
    }

    #[test]
    fn slow_clicks_never_anger() {
        let mut core = booted();
        for _ in 0..3 {
            click(&mut core, CENTER);
            // let the click counter decay between clicks
            run_ms(&mut core, 1050);
        }
        assert_ne!(core.pet.state, PetState::Angry);
        assert!(core.pet.clicks <= 1);
    }

    #[test]
    fn clicks_are_ignored_while_angry() {
        let mut core = booted();
        for _ in 0..3 {
            click(&mut core, CENTER);
        }
        assert_eq!(core.pet.state, PetState::Angry);

        feed(&mut core, Event::PointerDown(CENTER));
        assert!(core.drag.is_none());
        assert_eq!(core.pet.clicks, 0);
        assert_eq!(core.pet.state, PetState::Angry);
    }

    #[test]
    fn sub_threshold_drag_is_a_pure_click() {
        let mut core = booted();
        let start = core.pet.pos;
        let mut effects = feed(&mut core, Event::PointerDown(CENTER));
        effects.extend(feed(
            &mut core,
            Event::PointerMove(CENTER + Vec2::new(2.0, 1.0)),
        ));
        effects.extend(feed(
            &mut core,
            Event::PointerUp(CENTER + Vec2::new(2.0, 1.0)),
        ));

        assert_eq!(core.pet.state, PetState::Idle);
        assert_eq!(core.pet.pos, start);
        assert!(core.drag.is_none());
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::MoveWindow(_))));
    }

    #[test]
    fn committed_drag_moves_the_window_one_to_one() {
        let mut core = booted();
        let start = core.pet.pos;
        feed(&mut core, Event::PointerDown(CENTER));
        let effects = feed(&mut core, Event::PointerMove(CENTER + Vec2::new(20.0, 0.0)));

        assert_eq!(core.pet.state, PetState::Dragging);
        assert!(core.pet.next_action_timer.is_none());
        assert!(effects.contains(&Effect::MoveWindow(start + Vec2::new(20.0, 0.0))));

        feed(&mut core, Event::PointerMove(CENTER + Vec2::new(40.0, 10.0)));
        assert_eq!(core.pet.pos, start + Vec2::new(40.0, 10.0));

        feed(&mut core, Event::PointerUp(CENTER + Vec2::new(40.0, 10.0)));
        assert_eq!(core.pet.state, PetState::Idle);
        assert!(core.pet.next_action_timer.is_some());
    }

    #[test]
    fn long_drag_release_angers() {
        let mut core = booted();
        feed(&mut core, Event::PointerDown(CENTER));
        feed(&mut core, Event::PointerMove(CENTER + Vec2::new(30.0, 0.0)));
        run_ms(&mut core, 1020);
        assert!(core.drag.as_ref().is_some_and(|s| s.long_drag));

        feed(&mut core, Event::PointerUp(CENTER + Vec2::new(30.0, 0.0)));
        assert_eq!(core.pet.state, PetState::Angry);

        run_ms(&mut core, 2010);
        assert_eq!(core.pet.state, PetState::Idle);
        // anger does not re-arm the scheduler on its own
        assert!(core.pet.next_action_timer.is_none());
    }

    #[test]
    fn release_near_an_edge_starts_a_fall() {
        let mut core = booted();
        core.pet.pos = Vec2::new(100.0, 500.0);
        let grab = Vec2::new(110.0, 510.0);
        feed(&mut core, Event::PointerDown(grab));
        feed(&mut core, Event::PointerMove(grab + Vec2::new(10.0, 0.0)));
        feed(&mut core, Event::PointerUp(grab + Vec2::new(10.0, 0.0)));

        assert_eq!(core.pet.state, PetState::Falling);
        assert_eq!(core.pet.fall_velocity, 200.0);
    }

    #[test]
    fn idle_pointer_starts_follow_and_motion_cancels_it() {
        // bare core: no wander scheduled, so the pet holds still while the
        // watchdog runs down
        let mut core = core();
        feed(&mut core, Event::GlobalPointerMove(Vec2::new(800.0, 600.0)));
        run_ms(&mut core, 30_000);

        assert_eq!(core.pet.state, PetState::FollowingMouse);
        assert!(core.pet.following);
        assert!(core.pet.next_action_timer.is_none());

        feed(&mut core, Event::GlobalPointerMove(Vec2::new(801.0, 600.0)));
        assert!(!core.pet.following);
        assert_eq!(core.pet.state, PetState::Idle);
        assert!(core.pet.next_action_timer.is_some());
    }

    #[test]
    fn duplicate_pointer_positions_do_not_reset_the_watchdog() {
        let mut core = core();
        feed(&mut core, Event::GlobalPointerMove(Vec2::new(800.0, 600.0)));
        // same position every second; the watchdog must still fire
        for _ in 0..35 {
            run_ms(&mut core, 1000);
            feed(&mut core, Event::GlobalPointerMove(Vec2::new(800.0, 600.0)));
            if core.pet.state == PetState::FollowingMouse {
                return;
            }
        }
        panic!("idle watchdog never fired");
    }

    #[test]
    fn character_switch_waves_goodbye_then_swaps() {
        let mut core = booted();
        let effects = feed(
            &mut core,
            Event::MenuCommand(MenuCommand::SwitchCharacter("tom".into())),
        );
        assert_eq!(core.pet.state, PetState::ByeBye);
        assert!(effects.contains(&anim("mimi/byebye.gif")));

        // a second request during ByeBye is ignored
        feed(
            &mut core,
            Event::MenuCommand(MenuCommand::SwitchCharacter("mimi".into())),
        );
        assert_eq!(core.pet.pending_character.as_deref(), Some("tom"));

        let effects = run_ms(&mut core, 2010);
        assert_eq!(core.pet.character, 1);
        assert_eq!(core.pet.state, PetState::Idle);
        assert!(effects.contains(&anim("tom/idle.gif")));
    }

    #[test]
    fn unknown_switch_target_settles_back_to_idle() {
        let mut core = booted();
        feed(
            &mut core,
            Event::MenuCommand(MenuCommand::SwitchCharacter("ghost".into())),
        );
        run_ms(&mut core, 2010);
        assert_eq!(core.pet.character, 0);
        assert_eq!(core.pet.state, PetState::Idle);
    }

    #[test]
    fn pointer_is_ignored_during_byebye() {
        let mut core = booted();
        feed(
            &mut core,
            Event::MenuCommand(MenuCommand::SwitchCharacter("tom".into())),
        );
        feed(&mut core, Event::PointerDown(CENTER));
        assert!(core.drag.is_none());
        assert_eq!(core.pet.state, PetState::ByeBye);
    }

    #[test]
    fn quit_command_surfaces_as_an_effect() {
        let mut core = booted();
        let effects = feed(&mut core, Event::MenuCommand(MenuCommand::Quit));
        assert_eq!(effects, vec![Effect::Quit]);
    }

    #[test]
    fn stale_timer_ids_fall_through() {
        let mut core = booted();
        let stale = core.timers.arm(50);
        core.timers.cancel(stale);
        let effects = feed(&mut core, Event::TimerFired(stale));
        assert!(effects.is_empty());
        assert_eq!(core.pet.state, PetState::Idle);
    }
}
