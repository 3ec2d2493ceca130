//! Core types for coralai worlds: channel declarations, the index tree and the unified cell buffer.
//!
//! A [`World`] owns one dense buffer of shape `(width, height, depth)`. Every declared
//! [`Channel`] is resolved once, at allocation time, into a contiguous depth range recorded in
//! the [`IndexTree`]. Callers address the buffer by name through [`ChannelKey`] lookups that
//! return read-only [`View`]s; all mutation goes through explicit in-place operations on the
//! world.

mod channel;
mod config;
mod grid;
mod index;
mod world;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use channel::{Channel, ChannelData, ChannelValues, UNBOUNDED};
pub use config::{ChannelSpec, WorldConfig};
pub use grid::GridLayout;
pub use index::{ChannelKey, IndexNode, IndexTree};
pub use world::{AllocationState, ChannelStats, View, World};

/// Numeric storage types understood by the allocator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    #[default]
    F32,
    F64,
    I32,
    U8,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I32 => "i32",
            Self::U8 => "u8",
        };
        f.write_str(name)
    }
}

/// Scalar element stored in a world buffer.
pub trait Element: Copy + Default + PartialOrd + Send + Sync + fmt::Debug + 'static {
    /// Storage type tag matching this element.
    const DTYPE: DType;

    /// Lossy conversion used when casting declared data into the buffer.
    fn from_f64(value: f64) -> Self;

    /// Widening conversion used for statistics and brush edits.
    fn to_f64(self) -> f64;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

/// Errors raised while declaring, allocating or addressing world memory.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorldError {
    /// Channel declarations are closed once memory has been allocated.
    #[error("cannot declare channel `{id}` after world memory is allocated")]
    AlreadyAllocated { id: String },
    /// Channel shape does not fit the world extent or has the wrong rank.
    #[error("channel `{id}` has invalid shape {shape:?}: {reason}")]
    InvalidShape {
        id: String,
        shape: Vec<usize>,
        reason: &'static str,
    },
    /// Subchannels may only be nested one level below a top-level channel.
    #[error("channel `{id}` nests subchannels deeper than one level")]
    UnsupportedDepth { id: String },
    /// Allocation is a one-time transition.
    #[error("world memory can only be allocated once")]
    DoubleAllocation,
    /// Named accessors are read-only.
    #[error("view `{key}` is read-only; mutate the buffer through in-place world operations")]
    ImmutableView { key: String },
    /// Data was requested before the channel was bound to the buffer.
    #[error("`{id}` has not been allocated yet")]
    NotAllocated { id: String },
    /// A channel can only be bound to one depth range.
    #[error("channel `{id}` is already bound to depth range {start}..{end}")]
    AlreadyBound { id: String, start: usize, end: usize },
    #[error("unknown channel `{id}`")]
    UnknownChannel { id: String },
    #[error("channel `{channel}` has no subchannel `{subchannel}`")]
    UnknownSubchannel { channel: String, subchannel: String },
    #[error("channel `{id}` is already declared")]
    DuplicateChannel { id: String },
    #[error("`{key}` expects {expected} values, got {actual}")]
    LengthMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
