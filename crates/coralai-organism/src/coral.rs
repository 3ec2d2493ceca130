//! The coral organism: a torus conv transform driving an energy/infrastructure economy.

use coralai_core::{ChannelKey, GridLayout, World};
use rand::rngs::SmallRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{ACTION_COUNT, OrganismConfig};
use crate::kernels::{self, ActionPlanes, CellFields};
use crate::nn::{self, FeatureMap, Weights};
use crate::{Organism, OrganismError};

/// Actuator plane holding the liquidate weight.
pub const LIQUIDATE: usize = 0;
/// Actuator plane holding the invest weight.
pub const INVEST: usize = 1;
/// Actuator plane holding the explore weight.
pub const EXPLORE: usize = 2;

/// Per-step totals reported by [`CoralOrganism::forward`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct StepSummary {
    pub step: u64,
    pub total_energy: f64,
    pub total_infra: f64,
    /// Cells whose arg-max action was liquidate, invest and explore respectively.
    pub action_counts: [usize; 3],
    pub explorers: usize,
    pub migrations: usize,
}

/// Channel wiring resolved against one allocated world.
#[derive(Debug, Clone)]
struct Wiring {
    layout: GridLayout,
    sensors: Vec<usize>,
    signals: Vec<usize>,
    fields: CellFields,
    last_move: usize,
}

impl Wiring {
    fn resolve(world: &World<f32>, config: &OrganismConfig) -> Result<Self, OrganismError> {
        let sensors = world.indices_for(&config.sensors)?;
        let signals = world.indices_for(&config.signals)?;
        let expected = config.n_actuators - ACTION_COUNT;
        if signals.len() != expected {
            return Err(OrganismError::ActuatorMismatch {
                expected,
                actual: signals.len(),
            });
        }
        let fields = CellFields {
            energy: single_index(world, &config.energy)?,
            infra: single_index(world, &config.infra)?,
        };
        let last_move = single_index(world, &config.last_move)?;

        let mut written: Vec<(usize, String)> = Vec::with_capacity(signals.len() + 3);
        let targets = signals
            .iter()
            .map(|&index| (index, "signals".to_string()))
            .chain([
                (fields.energy, config.energy.to_string()),
                (fields.infra, config.infra.to_string()),
                (last_move, config.last_move.to_string()),
            ]);
        for (index, name) in targets {
            if let Some((_, first)) = written.iter().find(|(taken, _)| *taken == index) {
                return Err(OrganismError::OverlappingWiring {
                    index,
                    first: first.clone(),
                    second: name,
                });
            }
            written.push((index, name));
        }

        Ok(Self {
            layout: world.layout(),
            sensors,
            signals,
            fields,
            last_move,
        })
    }
}

fn single_index(world: &World<f32>, key: &ChannelKey) -> Result<usize, OrganismError> {
    match world.indices(key)?.as_slice() {
        [index] => Ok(*index),
        other => Err(OrganismError::ChannelDepth {
            key: key.to_string(),
            depth: other.len(),
        }),
    }
}

/// Engine for the coral economy.
#[derive(Debug, Clone)]
pub struct CoralOrganism {
    config: OrganismConfig,
    wiring: Wiring,
    weights: Weights,
    rng: SmallRng,
    steps: u64,
}

impl CoralOrganism {
    /// Wire the configured channels against an allocated `world` and draw initial weights.
    pub fn new(world: &World<f32>, config: OrganismConfig) -> Result<Self, OrganismError> {
        config.validate()?;
        let wiring = Wiring::resolve(world, &config)?;
        let latent_size = config.resolved_latent_size(wiring.sensors.len());
        let mut rng = config.seeded_rng();
        let weights = Weights::random(
            wiring.sensors.len(),
            latent_size,
            config.n_actuators,
            &mut rng,
        );
        Ok(Self {
            config,
            wiring,
            weights,
            rng,
            steps: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &OrganismConfig {
        &self.config
    }

    #[must_use]
    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Replace the weights with a set of identical stage shapes.
    pub fn set_weights(&mut self, weights: Weights) -> Result<(), OrganismError> {
        if weights.shapes() != self.weights.shapes() {
            return Err(OrganismError::WeightShape {
                expected: self.weights.shapes(),
                actual: weights.shapes(),
            });
        }
        self.weights = weights;
        Ok(())
    }

    #[must_use]
    pub fn n_sensors(&self) -> usize {
        self.wiring.sensors.len()
    }

    #[must_use]
    pub fn latent_size(&self) -> usize {
        self.weights.stages()[0].out_channels()
    }

    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Run the transform on the current sensor channels without touching the world.
    pub fn actuate(&self, world: &World<f32>) -> Result<FeatureMap, OrganismError> {
        let buffer = self.checked_buffer(world)?;
        let sensors = FeatureMap::gather(buffer, self.wiring.layout, &self.wiring.sensors);
        self.weights.forward(&sensors)
    }

    fn checked_buffer<'w>(&self, world: &'w World<f32>) -> Result<&'w [f32], OrganismError> {
        let actual = world.layout();
        if actual != self.wiring.layout {
            return Err(OrganismError::WorldMismatch {
                expected: self.wiring.layout,
                actual,
            });
        }
        Ok(world.buffer()?)
    }

    /// Compute the next buffer from `current`; nothing outside `next` is written.
    fn step(&mut self, current: &[f32], mut actions: FeatureMap) -> (Vec<f32>, StepSummary) {
        let Wiring {
            layout,
            ref signals,
            fields,
            last_move,
            ..
        } = self.wiring;
        let mut next = current.to_vec();

        kernels::entropy(&mut next, layout, fields, &mut self.rng);

        let winners = nn::softmax_actions(&mut actions);
        let mut action_counts = [0usize; 3];
        for &winner in &winners {
            action_counts[usize::from(winner)] += 1;
        }
        next.par_chunks_mut(layout.depth())
            .zip(winners.par_iter())
            .for_each(|(cell, &winner)| cell[last_move] = f32::from(winner) / 2.0);

        for (offset, &k) in signals.iter().enumerate() {
            let plane = actions.plane_mut(ACTION_COUNT + offset);
            nn::normalize_plane(plane);
            nn::relu(plane);
            nn::sigmoid(plane);
            actions.scatter_plane(ACTION_COUNT + offset, &mut next, layout, k);
        }

        let planes = ActionPlanes {
            liquidate: actions.plane(LIQUIDATE),
            invest: actions.plane(INVEST),
            explore: actions.plane(EXPLORE),
        };
        kernels::economics(&mut next, layout, fields, planes);
        let explorers = kernels::explore(&mut next, layout, fields, planes);
        let migrations = kernels::distribute_energy(&mut next, layout, fields);

        self.steps += 1;
        let summary = StepSummary {
            step: self.steps,
            total_energy: sum_field(&next, layout, fields.energy),
            total_infra: sum_field(&next, layout, fields.infra),
            action_counts,
            explorers,
            migrations,
        };
        (next, summary)
    }
}

/// Summed in cell order; totals must not vary with the thread count.
fn sum_field(buffer: &[f32], layout: GridLayout, k: usize) -> f64 {
    buffer
        .chunks_exact(layout.depth())
        .map(|cell| f64::from(cell[k]))
        .sum()
}

impl Organism for CoralOrganism {
    fn kind(&self) -> &'static str {
        "coral"
    }

    fn forward(&mut self, world: &mut World<f32>) -> Result<StepSummary, OrganismError> {
        let actions = self.actuate(world)?;
        let current = self.checked_buffer(world)?;
        let (next, summary) = self.step(current, actions);
        world.buffer_mut()?.copy_from_slice(&next);
        Ok(summary)
    }

    fn perturb_weights(&mut self, strength: f32) -> Result<(), OrganismError> {
        self.weights = self.weights.perturbed(strength, &mut self.rng)?;
        trace!(strength, weights = self.weights.len(), "perturbed organism weights");
        Ok(())
    }
}
