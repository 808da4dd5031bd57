//! Per-tick position integration for the self-propelled states.
//!
//! Only one of these runs per tick, decided by the current state; drag
//! motion is applied directly by the pointer handlers and never overlaps.

use glam::Vec2;

use super::scheduler;
use super::{Effect, PetCore, PetState};

/// Hard cap on fall speed, px per tick.
const MAX_FALL_SPEED: f32 = 20.0;

/// Advance the pet position for one fixed tick.
pub fn integrate(core: &mut PetCore, effects: &mut Vec<Effect>) {
    match core.pet.state {
        PetState::Moving => move_toward_target(core, effects),
        PetState::FollowingMouse => follow_pointer(core, effects),
        PetState::Falling => fall_toward_edge(core, effects),
        _ => {}
    }
}

/// Constant-speed bearing toward the wander target; snap when the remaining
/// distance dips under one step.
fn move_toward_target(core: &mut PetCore, effects: &mut Vec<Effect>) {
    let Some(target) = core.pet.target else {
        // wandering with nowhere to go
        core.set_state(PetState::Idle, effects);
        return;
    };
    let to_target = target - core.pet.pos;
    let distance = to_target.length();
    let speed = core.settings.movement_speed;
    if distance < speed {
        core.pet.pos = target;
        effects.push(Effect::MoveWindow(target));
        core.pet.target = None;
        core.set_state(PetState::Idle, effects);
        scheduler::schedule_next(core);
    } else {
        core.pet.pos += to_target / distance * speed;
        effects.push(Effect::MoveWindow(core.pet.pos));
    }
}

/// Chase the last observed pointer position, recomputed every tick so the
/// target tracks a moving pointer. The window center aims at the pointer,
/// clamped so the sprite stays fully on screen.
fn follow_pointer(core: &mut PetCore, effects: &mut Vec<Effect>) {
    let Some(pointer) = core.pet.last_pointer else {
        return;
    };
    let pointer = pointer.clamp(Vec2::ZERO, core.screen);
    let limit = (core.screen - core.pet.size).max(Vec2::ZERO);
    let target = (pointer - core.pet.size * 0.5).clamp(Vec2::ZERO, limit);

    let to_target = target - core.pet.pos;
    let distance = to_target.length();
    let speed = core.settings.mouse_follow_speed;
    if distance < speed {
        core.pet.pos = target;
        effects.push(Effect::MoveWindow(target));
        core.set_state(PetState::Idle, effects);
        log::debug!("caught up with the pointer");
    } else {
        core.pet.pos += to_target / distance * speed;
        effects.push(Effect::MoveWindow(core.pet.pos));
    }
}

/// Accelerate toward the nearest screen edge and snap onto it once inside
/// the margin. Landing re-arms the action scheduler.
fn fall_toward_edge(core: &mut PetCore, effects: &mut Vec<Effect>) {
    let pos = core.pet.pos;
    let size = core.pet.size;
    let screen = core.screen;

    // nearest edge wins; ties resolve left, right, top, bottom
    let candidates = [
        (pos.x, Vec2::new(0.0, pos.y)),
        (screen.x - (pos.x + size.x), Vec2::new(screen.x - size.x, pos.y)),
        (pos.y, Vec2::new(pos.x, 0.0)),
        (screen.y - (pos.y + size.y), Vec2::new(pos.x, screen.y - size.y)),
    ];
    let mut nearest = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.0 < nearest.0 {
            nearest = *candidate;
        }
    }
    let target = nearest.1;

    let to_target = target - pos;
    let distance = to_target.length();
    if distance < core.settings.edge_snap_margin {
        core.pet.pos = target;
        effects.push(Effect::MoveWindow(target));
        core.pet.fall_velocity = 0.0;
        core.set_state(PetState::Idle, effects);
        scheduler::schedule_next(core);
        return;
    }

    let velocity = (core.pet.fall_velocity + core.settings.gravity).min(MAX_FALL_SPEED);
    core.pet.fall_velocity = velocity;
    let step = velocity.min(distance);
    core.pet.pos += to_target / distance * step;
    effects.push(Effect::MoveWindow(core.pet.pos));
}
