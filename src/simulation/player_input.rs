use nalgebra::zero;

use crate::{floating_type_mod::FT, V2};

/**
 * Latest known input vector per player. The host's poller writes whenever a
 * fetch completes; the solver only ever reads the last completed value, so
 * stepping never blocks on input. Inputs older than the configured maximum
 * age sample as zero, same as a player that never sent anything.
 */
pub struct InputBuffer {
    inputs: Vec<V2>,
    last_update: Vec<FT>,
}

impl InputBuffer {
    pub fn new(player_count: usize) -> InputBuffer {
        InputBuffer {
            inputs: vec![zero(); player_count],
            last_update: vec![FT::NEG_INFINITY; player_count],
        }
    }

    pub fn player_count(&self) -> usize {
        self.inputs.len()
    }

    /// Store a player's input, clamped to [-1, 1] per axis. An out-of-range
    /// player id is a configuration error (input array length must match the
    /// player count), not something to tolerate per frame.
    pub fn set(&mut self, player: usize, value: V2, now: FT) {
        assert!(
            player < self.inputs.len(),
            "input for player {} but only {} players configured",
            player,
            self.inputs.len()
        );
        self.inputs[player] = V2::new(value.x.clamp(-1., 1.), value.y.clamp(-1., 1.));
        self.last_update[player] = now;
    }

    /// Resolve the per-player inputs for this frame; stale entries become zero.
    pub fn sampled(&self, now: FT, max_age: FT) -> Vec<V2> {
        self.inputs
            .iter()
            .zip(self.last_update.iter())
            .map(|(&input, &updated)| if now - updated <= max_age { input } else { zero() })
            .collect()
    }
}
