//! Channel descriptors: named logical slices of per-cell data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::world::{View, World};
use crate::{DType, Element, WorldError};

/// Value bounds used when a channel declares none.
pub const UNBOUNDED: (f64, f64) = (f64::NEG_INFINITY, f64::INFINITY);

/// Typed storage for initial channel data prior to allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelValues {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    U8(Vec<u8>),
}

impl ChannelValues {
    #[must_use]
    pub const fn dtype(&self) -> DType {
        match self {
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
            Self::I32(_) => DType::I32,
            Self::U8(_) => DType::U8,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(values) => values.len(),
            Self::F64(values) => values.len(),
            Self::I32(values) => values.len(),
            Self::U8(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value_at(&self, index: usize) -> f64 {
        match self {
            Self::F32(values) => f64::from(values[index]),
            Self::F64(values) => values[index],
            Self::I32(values) => f64::from(values[index]),
            Self::U8(values) => f64::from(values[index]),
        }
    }
}

impl From<Vec<f32>> for ChannelValues {
    fn from(values: Vec<f32>) -> Self {
        Self::F32(values)
    }
}

impl From<Vec<f64>> for ChannelValues {
    fn from(values: Vec<f64>) -> Self {
        Self::F64(values)
    }
}

impl From<Vec<i32>> for ChannelValues {
    fn from(values: Vec<i32>) -> Self {
        Self::I32(values)
    }
}

impl From<Vec<u8>> for ChannelValues {
    fn from(values: Vec<u8>) -> Self {
        Self::U8(values)
    }
}

/// Initial data for a channel: a `(w, h)` or `(w, h, depth)` array laid out x-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelData {
    shape: Vec<usize>,
    values: ChannelValues,
}

impl ChannelData {
    #[must_use]
    pub fn new(shape: Vec<usize>, values: impl Into<ChannelValues>) -> Self {
        Self {
            shape,
            values: values.into(),
        }
    }

    /// Uniform `f64` data of the given shape.
    #[must_use]
    pub fn constant(shape: Vec<usize>, value: f64) -> Self {
        let len = shape.iter().product();
        Self::new(shape, vec![value; len])
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn values(&self) -> &ChannelValues {
        &self.values
    }

    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.values.dtype()
    }

    pub(crate) fn value_at(&self, index: usize) -> f64 {
        self.values.value_at(index)
    }
}

/// Rank and extent check shared by channel declaration and [`World::validate_shape`].
///
/// Returns the per-cell depth: 1 for a bare `(w, h)` shape, else the trailing dimension.
pub(crate) fn depth_from_shape(
    id: &str,
    shape: &[usize],
    extent: (usize, usize),
) -> Result<usize, WorldError> {
    let invalid = |reason| WorldError::InvalidShape {
        id: id.to_string(),
        shape: shape.to_vec(),
        reason,
    };
    if shape.len() < 2 || shape.len() > 3 {
        return Err(invalid("shape must be 2 or 3 dimensional"));
    }
    if (shape[0], shape[1]) != extent {
        return Err(invalid("leading dimensions must match the world (width, height)"));
    }
    match shape.get(2) {
        None => Ok(1),
        Some(0) => Err(invalid("depth must be at least 1")),
        Some(&depth) => Ok(depth),
    }
}

/// Descriptor for one named slice of the world buffer.
///
/// Channels are declared before allocation and bound to a depth range exactly once by
/// [`World::allocate`]; after that only the data they address changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    id: String,
    dtype: DType,
    bounds: (f64, f64),
    depth: usize,
    data: Option<ChannelData>,
    subchannels: Vec<Channel>,
    parent: Option<String>,
    reserved: bool,
    metadata: BTreeMap<String, Value>,
    range: Option<Range<usize>>,
}

impl Channel {
    /// A depth-1, unbounded `f32` channel with zero initial data.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dtype: DType::F32,
            bounds: UNBOUNDED,
            depth: 1,
            data: None,
            subchannels: Vec::new(),
            parent: None,
            reserved: false,
            metadata: BTreeMap::new(),
            range: None,
        }
    }

    /// Declare a channel from a full `(w, h)` or `(w, h, depth)` shape, checked against `extent`.
    pub fn declare(
        id: impl Into<String>,
        dtype: DType,
        shape: &[usize],
        extent: (usize, usize),
    ) -> Result<Self, WorldError> {
        let id = id.into();
        let depth = depth_from_shape(&id, shape, extent)?;
        Ok(Self::new(id).with_dtype(dtype).with_depth(depth))
    }

    #[must_use]
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, lo: f64, hi: f64) -> Self {
        self.bounds = (lo, hi);
        self
    }

    /// Attach initial data; the channel depth follows the data shape.
    #[must_use]
    pub fn with_data(mut self, data: ChannelData) -> Self {
        self.apply_data(data);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Lay this channel out ahead of every non-reserved channel.
    #[must_use]
    pub fn reserved(mut self) -> Self {
        self.reserved = true;
        self
    }

    /// Builder form of [`Channel::add_subchannel`] for a fully described child.
    ///
    /// Nesting is not checked here; [`World::allocate`] rejects children that carry their
    /// own subchannels.
    #[must_use]
    pub fn with_subchannel(mut self, mut child: Channel) -> Self {
        child.parent = Some(self.id.clone());
        self.subchannels.push(child);
        self
    }

    /// Append a depth-1 child slice and return it for further configuration.
    pub fn add_subchannel(&mut self, id: impl Into<String>) -> Result<&mut Channel, WorldError> {
        if self.parent.is_some() {
            return Err(WorldError::UnsupportedDepth {
                id: self.id.clone(),
            });
        }
        self.ensure_unbound()?;
        let id = id.into();
        if self.subchannels.iter().any(|sub| sub.id == id) {
            return Err(WorldError::DuplicateChannel {
                id: format!("{}.{id}", self.id),
            });
        }
        let mut child = Channel::new(id).with_dtype(self.dtype);
        child.parent = Some(self.id.clone());
        self.subchannels.push(child);
        let last = self.subchannels.len() - 1;
        Ok(&mut self.subchannels[last])
    }

    /// Set the depth of a child created through [`Channel::add_subchannel`].
    pub fn set_depth(&mut self, depth: usize) -> Result<(), WorldError> {
        self.ensure_unbound()?;
        self.depth = depth;
        Ok(())
    }

    /// Replace the initial data of an unbound channel.
    pub fn set_data(&mut self, data: ChannelData) -> Result<(), WorldError> {
        self.ensure_unbound()?;
        self.apply_data(data);
        Ok(())
    }

    fn apply_data(&mut self, data: ChannelData) {
        match data.shape() {
            [_, _] => self.depth = 1,
            [_, _, depth] => self.depth = *depth,
            _ => {}
        }
        self.data = Some(data);
    }

    fn ensure_unbound(&self) -> Result<(), WorldError> {
        match &self.range {
            Some(range) => Err(WorldError::AlreadyBound {
                id: self.id.clone(),
                start: range.start,
                end: range.end,
            }),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub const fn bounds(&self) -> (f64, f64) {
        self.bounds
    }

    /// Per-cell depth; for a grouped channel, the sum of its children.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.subchannels.is_empty() {
            self.depth
        } else {
            self.subchannels.iter().map(Channel::depth).sum()
        }
    }

    #[must_use]
    pub fn subchannels(&self) -> &[Channel] {
        &self.subchannels
    }

    #[must_use]
    pub fn subchannel(&self, id: &str) -> Option<&Channel> {
        self.subchannels.iter().find(|sub| sub.id == id)
    }

    pub fn subchannel_mut(&mut self, id: &str) -> Option<&mut Channel> {
        self.subchannels.iter_mut().find(|sub| sub.id == id)
    }

    /// Id of the owning channel when this is a subchannel.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        self.reserved
    }

    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    #[must_use]
    pub fn data(&self) -> Option<&ChannelData> {
        self.data.as_ref()
    }

    /// Depth range bound by the allocator, if any.
    #[must_use]
    pub fn range(&self) -> Option<Range<usize>> {
        self.range.clone()
    }

    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.range.is_some()
    }

    /// Read-through view of this channel's slice of `world`.
    pub fn read<'w, T: Element>(&self, world: &'w World<T>) -> Result<View<'w, T>, WorldError> {
        let range = self.range.clone().ok_or_else(|| WorldError::NotAllocated {
            id: self.qualified_id(),
        })?;
        world.view_range(range)
    }

    pub(crate) fn qualified_id(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{parent}.{}", self.id),
            None => self.id.clone(),
        }
    }

    pub(crate) fn bind(&mut self, range: Range<usize>) {
        debug_assert!(self.range.is_none(), "channel {} bound twice", self.id);
        self.range = Some(range);
    }

    pub(crate) fn subchannels_mut(&mut self) -> &mut [Channel] {
        &mut self.subchannels
    }

    pub(crate) fn take_data(&mut self) -> Option<ChannelData> {
        self.data.take()
    }

    /// Validate shape, data and nesting, returning the resolved per-cell depth.
    pub(crate) fn resolve_depth(&self, extent: (usize, usize)) -> Result<usize, WorldError> {
        if let Some(range) = &self.range {
            return Err(WorldError::AlreadyBound {
                id: self.qualified_id(),
                start: range.start,
                end: range.end,
            });
        }
        if self.subchannels.is_empty() {
            return self.resolve_leaf_depth(extent);
        }
        if self.parent.is_some() {
            return Err(WorldError::UnsupportedDepth {
                id: self.qualified_id(),
            });
        }
        if let Some(data) = &self.data {
            return Err(WorldError::InvalidShape {
                id: self.id.clone(),
                shape: data.shape().to_vec(),
                reason: "a grouped channel takes its data from its subchannels",
            });
        }
        let mut total = 0;
        for sub in &self.subchannels {
            if !sub.subchannels.is_empty() {
                return Err(WorldError::UnsupportedDepth {
                    id: sub.qualified_id(),
                });
            }
            total += sub.resolve_depth(extent)?;
        }
        Ok(total)
    }

    fn resolve_leaf_depth(&self, extent: (usize, usize)) -> Result<usize, WorldError> {
        let id = self.qualified_id();
        let Some(data) = &self.data else {
            if self.depth == 0 {
                return Err(WorldError::InvalidShape {
                    id,
                    shape: vec![extent.0, extent.1, 0],
                    reason: "depth must be at least 1",
                });
            }
            return Ok(self.depth);
        };
        let depth = depth_from_shape(&id, data.shape(), extent)?;
        if data.values().len() != extent.0 * extent.1 * depth {
            return Err(WorldError::InvalidShape {
                id,
                shape: data.shape().to_vec(),
                reason: "data length does not match its shape",
            });
        }
        Ok(depth)
    }
}
