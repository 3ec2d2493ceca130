//! Update engines for coralai worlds.
//!
//! An [`Organism`] reads named sensor channels out of a [`World`], runs a learned local
//! transform over the torus and commits the resulting actions back into the buffer. The
//! [`CoralOrganism`] implements the coral economy: entropy, softmax actions, signal channels,
//! invest/liquidate economics and the explore and distribute-energy scatter kernels.

mod config;
pub mod coral;
pub mod kernels;
pub mod nn;

use coralai_core::{GridLayout, World, WorldError};
use thiserror::Error;

pub use config::OrganismConfig;
pub use coral::{CoralOrganism, EXPLORE, INVEST, LIQUIDATE, StepSummary};
pub use kernels::CellFields;
pub use nn::{FeatureMap, TorusConv, Weights};

/// Shared interface implemented by every world update engine.
pub trait Organism {
    /// Immutable engine identifier.
    fn kind(&self) -> &'static str;

    /// Advance `world` by one step; the buffer is either fully updated or left untouched.
    fn forward(&mut self, world: &mut World<f32>) -> Result<StepSummary, OrganismError>;

    /// Add zero-mean Gaussian noise scaled by `strength` to every weight.
    fn perturb_weights(&mut self, strength: f32) -> Result<(), OrganismError>;
}

/// Errors raised while building or stepping an organism.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrganismError {
    #[error(transparent)]
    World(#[from] WorldError),
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Signal channels must absorb every actuator output beyond the three actions.
    #[error("signal channels have depth {actual}, but the actuators produce {expected} signal outputs")]
    ActuatorMismatch { expected: usize, actual: usize },
    #[error("channel `{key}` must address exactly one scalar per cell, found {depth}")]
    ChannelDepth { key: String, depth: usize },
    /// Two output targets (signals, energy, infra or last_move) share a depth index.
    #[error("depth index {index} is written by both `{first}` and `{second}`")]
    OverlappingWiring {
        index: usize,
        first: String,
        second: String,
    },
    #[error("world layout {actual:?} differs from the layout {expected:?} this organism was built for")]
    WorldMismatch {
        expected: GridLayout,
        actual: GridLayout,
    },
    #[error("transform stage expects {expected} input channels, got {actual}")]
    InputChannels { expected: usize, actual: usize },
    #[error("weight shapes {actual:?} do not match {expected:?}")]
    WeightShape {
        expected: Vec<(usize, usize)>,
        actual: Vec<(usize, usize)>,
    },
}
