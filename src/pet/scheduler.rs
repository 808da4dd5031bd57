//! Autonomous action scheduling: a single pending timer picks the next
//! moment the pet acts on its own, and a weighted coin decides what it does.

use glam::Vec2;

use super::{Effect, PetCore, PetState};

/// Probability that a scheduled action is "sit still"; the rest wander.
const IDLE_WEIGHT: f32 = 0.6;

/// Arm the next autonomous action at a uniform random delay inside the
/// configured interval. Cancel-then-arm keeps at most one pending. No-op
/// while the pet is following the pointer.
pub fn schedule_next(core: &mut PetCore) {
    if core.pet.following {
        return;
    }
    cancel_next(core);
    let min = core.settings.action_interval_min;
    let max = core.settings.action_interval_max.max(min);
    let delay = core.rng.u64(min..=max);
    log::debug!("next action in {delay} ms (t={} ms)", core.timers.now_ms());
    core.pet.next_action_timer = Some(core.timers.arm(delay));
}

/// Drop the pending action, if any.
pub fn cancel_next(core: &mut PetCore) {
    if let Some(id) = core.pet.next_action_timer.take() {
        core.timers.cancel(id);
    }
}

/// The action timer fired. A busy pet (held, angry, waving good-bye,
/// falling or following) skips the action but always reschedules.
pub fn perform_random_action(core: &mut PetCore, effects: &mut Vec<Effect>) {
    let busy = matches!(
        core.pet.state,
        PetState::Dragging | PetState::Angry | PetState::ByeBye | PetState::Falling
    ) || core.pet.following;
    if !busy {
        if core.rng.f32() < IDLE_WEIGHT {
            idle_action(core, effects);
        } else {
            wander(core, effects);
        }
    }
    schedule_next(core);
}

fn idle_action(core: &mut PetCore, effects: &mut Vec<Effect>) {
    log::debug!("action: sit still");
    core.set_state(PetState::Idle, effects);
    core.pet.target = None;
}

/// Pick a uniform random on-screen target and head there.
fn wander(core: &mut PetCore, effects: &mut Vec<Effect>) {
    core.set_state(PetState::Moving, effects);
    let range = (core.screen - core.pet.size).max(Vec2::ZERO);
    let target = Vec2::new(core.rng.f32() * range.x, core.rng.f32() * range.y);
    core.pet.target = Some(target);
    log::debug!("action: wander to ({:.0}, {:.0})", target.x, target.y);
}

#[cfg(test)]
mod tests {
    use super::super::testkit::*;
    use super::*;

    #[test]
    fn schedule_twice_keeps_a_single_live_timer() {
        let mut core = core();
        schedule_next(&mut core);
        let first = core.pet.next_action_timer.unwrap();
        assert_eq!(core.timers.live_count(), 1);

        schedule_next(&mut core);
        let second = core.pet.next_action_timer.unwrap();
        assert_ne!(first, second);
        assert_eq!(core.timers.live_count(), 1);
    }

    #[test]
    fn no_scheduling_while_following() {
        let mut core = core();
        core.pet.following = true;
        schedule_next(&mut core);
        assert!(core.pet.next_action_timer.is_none());
        assert_eq!(core.timers.live_count(), 0);
    }

    #[test]
    fn action_delay_respects_the_interval_bounds() {
        let mut core = core();
        schedule_next(&mut core);
        let armed = core.pet.next_action_timer.unwrap();

        // not a tick before action_interval_min (3000 ms)...
        run_ms(&mut core, 2970);
        assert_eq!(core.pet.next_action_timer, Some(armed));

        // ...but certainly by action_interval_max (8000 ms), after which a
        // fresh timer is pending
        run_ms(&mut core, 8010 - 2970);
        assert_ne!(core.pet.next_action_timer, Some(armed));
        assert!(core.pet.next_action_timer.is_some());
    }

    #[test]
    fn busy_pet_reschedules_without_acting() {
        let mut core = core();
        let mut effects = Vec::new();
        core.set_state(PetState::Falling, &mut effects);

        perform_random_action(&mut core, &mut effects);
        assert_eq!(core.pet.state, PetState::Falling);
        assert!(core.pet.target.is_none());
        assert!(core.pet.next_action_timer.is_some());
    }

    #[test]
    fn wander_targets_stay_on_screen() {
        let mut core = core();
        let mut effects = Vec::new();
        let limit = SCREEN - core.pet.size;
        let mut wanders = 0;

        for _ in 0..50 {
            core.set_state(PetState::Idle, &mut effects);
            core.pet.target = None;
            perform_random_action(&mut core, &mut effects);
            if let Some(target) = core.pet.target {
                wanders += 1;
                assert!(target.x >= 0.0 && target.x <= limit.x);
                assert!(target.y >= 0.0 && target.y <= limit.y);
            }
        }
        // with a 40% wander weight, 50 draws hit both branches
        assert!(wanders > 0 && wanders < 50);
    }
}
