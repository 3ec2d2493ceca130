//! Serializable world layouts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::channel::{Channel, ChannelData, ChannelValues};
use crate::world::World;
use crate::{DType, Element, WorldError};

/// Declarative description of one channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelSpec {
    pub id: String,
    pub dtype: DType,
    /// Per-cell depth of a leaf channel; ignored when `subchannels` is non-empty.
    pub depth: usize,
    pub bounds: Option<[f64; 2]>,
    pub reserved: bool,
    /// Constant initial value; zero when absent.
    pub fill: Option<f64>,
    pub subchannels: Vec<ChannelSpec>,
    pub metadata: BTreeMap<String, Value>,
}

impl Default for ChannelSpec {
    fn default() -> Self {
        Self {
            id: String::new(),
            dtype: DType::F32,
            depth: 1,
            bounds: None,
            reserved: false,
            fill: None,
            subchannels: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

impl ChannelSpec {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn with_subchannels<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subchannels = ids.into_iter().map(ChannelSpec::new).collect();
        self
    }

    fn validate(&self) -> Result<(), WorldError> {
        if self.id.is_empty() {
            return Err(WorldError::InvalidConfig("channel ids must be non-empty"));
        }
        if self.subchannels.is_empty() && self.depth == 0 {
            return Err(WorldError::InvalidConfig("channel depth must be at least 1"));
        }
        if let Some([lo, hi]) = self.bounds {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(WorldError::InvalidConfig(
                    "channel bounds must be ordered [lo, hi]",
                ));
            }
        }
        if self.fill.is_some_and(|value| !value.is_finite()) {
            return Err(WorldError::InvalidConfig("channel fill must be finite"));
        }
        self.subchannels.iter().try_for_each(ChannelSpec::validate)
    }

    fn to_channel(&self, extent: (usize, usize)) -> Channel {
        let mut channel = Channel::new(self.id.clone()).with_dtype(self.dtype);
        if let Some([lo, hi]) = self.bounds {
            channel = channel.with_bounds(lo, hi);
        }
        if self.reserved {
            channel = channel.reserved();
        }
        for (key, value) in &self.metadata {
            channel = channel.with_metadata(key.clone(), value.clone());
        }
        if !self.subchannels.is_empty() {
            return self
                .subchannels
                .iter()
                .fold(channel, |parent, sub| parent.with_subchannel(sub.to_channel(extent)));
        }
        match self.fill {
            Some(value) if value != 0.0 => {
                let shape = vec![extent.0, extent.1, self.depth];
                let len = extent.0 * extent.1 * self.depth;
                channel.with_data(ChannelData::new(shape, constant_values(self.dtype, len, value)))
            }
            _ => channel.with_depth(self.depth),
        }
    }
}

fn constant_values(dtype: DType, len: usize, value: f64) -> ChannelValues {
    match dtype {
        DType::F32 => vec![value as f32; len].into(),
        DType::F64 => vec![value; len].into(),
        DType::I32 => vec![value as i32; len].into(),
        DType::U8 => vec![value as u8; len].into(),
    }
}

/// Extent, storage type and channel layout of a world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub width: usize,
    pub height: usize,
    pub dtype: DType,
    pub channels: Vec<ChannelSpec>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::coral(128, 128)
    }
}

impl WorldConfig {
    /// The standard coral layout: `energy`, `infra`, `last_move` and a 4-wide `com` group.
    #[must_use]
    pub fn coral(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            dtype: DType::F32,
            channels: vec![
                ChannelSpec::new("energy"),
                ChannelSpec::new("infra"),
                ChannelSpec::new("last_move"),
                ChannelSpec::new("com").with_subchannels(["a", "b", "c", "d"]),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldError::InvalidConfig("world dimensions must be non-zero"));
        }
        if self.channels.is_empty() {
            return Err(WorldError::InvalidConfig("at least one channel must be configured"));
        }
        self.channels.iter().try_for_each(ChannelSpec::validate)
    }

    /// Build an unallocated world with every configured channel declared.
    pub fn build<T: Element>(&self) -> Result<World<T>, WorldError> {
        self.validate()?;
        if self.dtype != T::DTYPE {
            return Err(WorldError::InvalidConfig(
                "configured dtype does not match the world element type",
            ));
        }
        let extent = (self.width, self.height);
        let mut world = World::new(self.width, self.height)?;
        world.declare_channels(self.channels.iter().map(|spec| spec.to_channel(extent)))?;
        Ok(world)
    }
}
