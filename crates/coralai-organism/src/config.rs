use coralai_core::ChannelKey;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::OrganismError;

/// Number of actuator outputs consumed as liquidate/invest/explore weights.
pub(crate) const ACTION_COUNT: usize = 3;

/// Channel wiring and sizing of a coral organism.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrganismConfig {
    /// Channels fed into the transform, concatenated in order.
    pub sensors: Vec<ChannelKey>,
    /// Channels receiving the actuator outputs beyond the three actions.
    pub signals: Vec<ChannelKey>,
    pub n_actuators: usize,
    /// Width of the hidden stages; defaults to half of sensors plus actuators.
    pub latent_size: Option<usize>,
    /// Optional RNG seed for reproducible weights and entropy noise.
    pub rng_seed: Option<u64>,
    pub energy: ChannelKey,
    pub infra: ChannelKey,
    pub last_move: ChannelKey,
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            sensors: vec![
                ChannelKey::id("energy"),
                ChannelKey::id("infra"),
                ChannelKey::id("last_move"),
                ChannelKey::id("com"),
            ],
            signals: vec![ChannelKey::id("com")],
            n_actuators: 7,
            latent_size: None,
            rng_seed: None,
            energy: ChannelKey::id("energy"),
            infra: ChannelKey::id("infra"),
            last_move: ChannelKey::id("last_move"),
        }
    }
}

impl OrganismConfig {
    pub fn validate(&self) -> Result<(), OrganismError> {
        if self.sensors.is_empty() {
            return Err(OrganismError::InvalidConfig(
                "at least one sensor channel is required",
            ));
        }
        if self.n_actuators < ACTION_COUNT {
            return Err(OrganismError::InvalidConfig(
                "n_actuators must cover the liquidate, invest and explore outputs",
            ));
        }
        if self.latent_size == Some(0) {
            return Err(OrganismError::InvalidConfig("latent_size must be positive"));
        }
        Ok(())
    }

    /// Hidden width for a transform with `n_sensors` inputs.
    #[must_use]
    pub fn resolved_latent_size(&self, n_sensors: usize) -> usize {
        self.latent_size
            .unwrap_or(((n_sensors + self.n_actuators) / 2).max(1))
    }

    /// Returns the configured RNG seed, generating one from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}
