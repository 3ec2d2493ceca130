//! Headless session: build the world, step the organism on schedule and collect summaries.

use std::collections::BTreeMap;

use coralai_core::{ChannelKey, ChannelStats, World};
use coralai_organism::{CoralOrganism, Organism, StepSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{AppConfig, ConfigError};

/// Named depth index of the buffer, as shown in channel legends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelSlot {
    pub index: usize,
    pub channel: String,
    pub subchannel: Option<String>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub steps: u64,
    pub layout: Vec<ChannelSlot>,
    /// Summaries emitted at every log interval and after the final step.
    pub summaries: Vec<StepSummary>,
    pub final_stats: BTreeMap<String, ChannelStats>,
}

/// A world and the organism stepping it.
pub struct Session {
    config: AppConfig,
    world: World<f32>,
    organism: CoralOrganism,
}

impl Session {
    /// Declare, allocate and paint the world, then wire the organism against it.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = config.world.build::<f32>()?;
        world.allocate()?;
        for brush in &config.run.brushes {
            let painted =
                world.paint_disc(brush.key.clone(), brush.x, brush.y, brush.radius, brush.value)?;
            debug!(key = %brush.key, painted, "applied brush");
        }
        let organism = CoralOrganism::new(&world, config.organism.clone())?;
        info!(
            width = world.width(),
            height = world.height(),
            depth = world.depth(),
            sensors = organism.n_sensors(),
            latent = organism.latent_size(),
            "session ready"
        );
        Ok(Self {
            config,
            world,
            organism,
        })
    }

    #[must_use]
    pub fn world(&self) -> &World<f32> {
        &self.world
    }

    #[must_use]
    pub fn organism(&self) -> &CoralOrganism {
        &self.organism
    }

    /// Advance one step, honouring scheduled clears and perturbations.
    pub fn step(&mut self) -> Result<StepSummary, ConfigError> {
        let next = self.organism.steps() + 1;
        let run = &self.config.run;
        if run.clear_at.contains(&next) {
            self.world.clear()?;
            debug!(step = next, "cleared world memory");
        }
        if run.perturb_interval.is_some_and(|interval| next % interval == 0) {
            self.organism.perturb_weights(run.perturb_strength)?;
        }
        Ok(self.organism.forward(&mut self.world)?)
    }

    /// Run the configured number of steps and report.
    pub fn run(&mut self) -> Result<RunReport, ConfigError> {
        let steps = self.config.run.steps;
        let interval = self.config.run.log_interval;
        let mut summaries = Vec::new();
        for _ in 0..steps {
            let summary = self.step()?;
            if summary.step % interval == 0 || summary.step == steps {
                info!(
                    step = summary.step,
                    energy = summary.total_energy,
                    infra = summary.total_infra,
                    liquidate = summary.action_counts[0],
                    invest = summary.action_counts[1],
                    explore = summary.action_counts[2],
                    migrations = summary.migrations,
                    "step summary"
                );
                summaries.push(summary);
            }
        }
        self.report(summaries)
    }

    fn report(&self, summaries: Vec<StepSummary>) -> Result<RunReport, ConfigError> {
        let depth = self.world.depth();
        let layout = (0..depth)
            .filter_map(|index| {
                self.world
                    .channel_at(index)
                    .map(|(channel, subchannel)| ChannelSlot {
                        index,
                        channel: channel.to_string(),
                        subchannel: subchannel.map(str::to_string),
                    })
            })
            .collect();
        let mut final_stats = BTreeMap::new();
        for channel in self.world.channels() {
            let stats = self.world.stats(ChannelKey::id(channel.id()))?;
            final_stats.insert(channel.id().to_string(), stats);
        }
        Ok(RunReport {
            width: self.world.width(),
            height: self.world.height(),
            depth,
            steps: self.organism.steps(),
            layout,
            summaries,
            final_stats,
        })
    }
}
