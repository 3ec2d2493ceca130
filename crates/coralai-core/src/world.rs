//! The world: channel registry, unified buffer and named addressing.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::{debug, warn};

use crate::channel::{Channel, ChannelData, depth_from_shape};
use crate::grid::GridLayout;
use crate::index::{ChannelKey, IndexNode, IndexTree};
use crate::{DType, Element, WorldError};

/// Allocation lifecycle of a world.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AllocationState {
    #[default]
    Unallocated,
    Allocated,
}

/// Summary statistics over an addressed slice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChannelStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
}

/// Read-through view of a set of depth indices across every cell of the live buffer.
#[derive(Clone)]
pub struct View<'w, T> {
    buffer: &'w [T],
    layout: GridLayout,
    indices: Vec<usize>,
}

impl<T> fmt::Debug for View<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("layout", &self.layout)
            .field("indices", &self.indices)
            .finish_non_exhaustive()
    }
}

impl<'w, T: Element> View<'w, T> {
    /// Number of scalars per cell in this view.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.layout.width()
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.layout.height()
    }

    /// Buffer depth indices this view reads, in request order.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Value of the `k`-th viewed scalar at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize, k: usize) -> Option<T> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let index = *self.indices.get(k)?;
        Some(self.buffer[self.layout.offset(x, y, index)])
    }

    /// Viewed scalars of a single cell, or `None` outside the grid.
    pub fn cell(&self, x: usize, y: usize) -> Option<impl Iterator<Item = T> + '_> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let base = self.layout.offset(x, y, 0);
        Some(self.indices.iter().map(move |&k| self.buffer[base + k]))
    }

    /// All viewed values, cell by cell.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.buffer
            .chunks_exact(self.layout.depth())
            .flat_map(move |cell| self.indices.iter().map(move |&k| cell[k]))
    }

    /// Spatial plane of the `k`-th viewed scalar, x-major.
    #[must_use]
    pub fn plane(&self, k: usize) -> Option<Vec<T>> {
        let index = *self.indices.get(k)?;
        Some(
            self.buffer
                .chunks_exact(self.layout.depth())
                .map(|cell| cell[index])
                .collect(),
        )
    }

    /// Owned copy of the viewed values, cell by cell.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

/// Validated placement of one top-level channel, computed before any state changes.
struct Placement {
    position: usize,
    range: Range<usize>,
    subranges: Vec<Range<usize>>,
}

/// Owner of the unified `(width, height, depth)` buffer and its channel registry.
pub struct World<T: Element = f32> {
    width: usize,
    height: usize,
    channels: Vec<Channel>,
    state: AllocationState,
    buffer: Vec<T>,
    index: Option<IndexTree>,
}

impl<T: Element> fmt::Debug for World<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dtype", &T::DTYPE)
            .field("state", &self.state)
            .field("channel_count", &self.channels.len())
            .field("depth", &self.depth())
            .finish()
    }
}

impl<T: Element> World<T> {
    /// Create an empty, unallocated world of the given extent.
    pub fn new(width: usize, height: usize) -> Result<Self, WorldError> {
        if width == 0 || height == 0 {
            return Err(WorldError::InvalidConfig("world dimensions must be non-zero"));
        }
        Ok(Self {
            width,
            height,
            channels: Vec::new(),
            state: AllocationState::Unallocated,
            buffer: Vec::new(),
            index: None,
        })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn extent(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[must_use]
    pub const fn dtype(&self) -> DType {
        T::DTYPE
    }

    #[must_use]
    pub const fn state(&self) -> AllocationState {
        self.state
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.state == AllocationState::Allocated
    }

    /// Per-cell depth of the buffer; zero until allocated.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.index.as_ref().map_or(0, IndexTree::depth)
    }

    #[must_use]
    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.width, self.height, self.depth())
    }

    /// Rank and extent check for a channel shape, returning its per-cell depth.
    pub fn validate_shape(&self, id: &str, shape: &[usize]) -> Result<usize, WorldError> {
        depth_from_shape(id, shape, self.extent())
    }

    /// Register a channel; its shape, data and nesting are validated immediately.
    pub fn declare_channel(&mut self, channel: Channel) -> Result<&mut Channel, WorldError> {
        self.check_declarable(&channel)?;
        self.channels.push(channel);
        let last = self.channels.len() - 1;
        Ok(&mut self.channels[last])
    }

    /// Register several channels; nothing is registered unless all of them are valid.
    pub fn declare_channels<I>(&mut self, channels: I) -> Result<(), WorldError>
    where
        I: IntoIterator<Item = Channel>,
    {
        let staged: Vec<Channel> = channels.into_iter().collect();
        for (pos, channel) in staged.iter().enumerate() {
            self.check_declarable(channel)?;
            if staged[..pos].iter().any(|other| other.id() == channel.id()) {
                return Err(WorldError::DuplicateChannel {
                    id: channel.id().to_string(),
                });
            }
        }
        self.channels.extend(staged);
        Ok(())
    }

    fn check_declarable(&self, channel: &Channel) -> Result<(), WorldError> {
        if self.is_allocated() {
            return Err(WorldError::AlreadyAllocated {
                id: channel.id().to_string(),
            });
        }
        if self.channels.iter().any(|other| other.id() == channel.id()) {
            return Err(WorldError::DuplicateChannel {
                id: channel.id().to_string(),
            });
        }
        channel.resolve_depth(self.extent())?;
        Ok(())
    }

    #[must_use]
    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.id() == id)
    }

    /// Mutable handle for adding subchannels before allocation.
    pub fn channel_mut(&mut self, id: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|channel| channel.id() == id)
    }

    /// Channels in declaration order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> + '_ {
        self.channels.iter()
    }

    /// One-time transition to the allocated state.
    ///
    /// Every channel is validated and placed before the world is touched, so a failed call
    /// leaves the world exactly as it was.
    pub fn allocate(&mut self) -> Result<&IndexTree, WorldError> {
        if self.is_allocated() {
            return Err(WorldError::DoubleAllocation);
        }
        let (placements, tree) = self.plan_layout()?;
        self.commit(placements, tree);
        self.index()
    }

    fn plan_layout(&self) -> Result<(Vec<Placement>, IndexTree), WorldError> {
        let extent = self.extent();
        let reserved = self.channels.iter().enumerate().filter(|(_, c)| c.is_reserved());
        let regular = self.channels.iter().enumerate().filter(|(_, c)| !c.is_reserved());

        let mut cursor = 0;
        let mut placements = Vec::with_capacity(self.channels.len());
        let mut entries = Vec::with_capacity(self.channels.len());
        for (position, channel) in reserved.chain(regular) {
            let depth = channel.resolve_depth(extent)?;
            let range = cursor..cursor + depth;
            let mut subranges = Vec::with_capacity(channel.subchannels().len());
            let mut children = Vec::with_capacity(channel.subchannels().len());
            let mut sub_cursor = cursor;
            for sub in channel.subchannels() {
                let sub_depth = sub.resolve_depth(extent)?;
                let subrange = sub_cursor..sub_cursor + sub_depth;
                children.push((sub.id().to_string(), IndexNode::leaf(subrange.clone())));
                subranges.push(subrange);
                sub_cursor += sub_depth;
            }
            let node = if children.is_empty() {
                IndexNode::leaf(range.clone())
            } else {
                IndexNode::group(range.clone(), children)
            };
            entries.push((channel.id().to_string(), node));
            placements.push(Placement {
                position,
                range,
                subranges,
            });
            cursor += depth;
        }
        if cursor == 0 {
            return Err(WorldError::InvalidConfig("world has no channels to allocate"));
        }
        Ok((placements, IndexTree::new(entries, cursor)))
    }

    fn commit(&mut self, placements: Vec<Placement>, tree: IndexTree) {
        let layout = GridLayout::new(self.width, self.height, tree.depth());
        let mut buffer = vec![T::default(); layout.len()];
        for placement in placements {
            let channel = &mut self.channels[placement.position];
            if placement.subranges.is_empty() {
                let data = channel.take_data();
                write_initial(&mut buffer, layout, &placement.range, data, channel.id());
            } else {
                let parent = channel.id().to_string();
                let subs = channel.subchannels_mut().iter_mut();
                for (sub, subrange) in subs.zip(&placement.subranges) {
                    let data = sub.take_data();
                    let name = format!("{parent}.{}", sub.id());
                    write_initial(&mut buffer, layout, subrange, data, &name);
                    sub.bind(subrange.clone());
                }
            }
            channel.bind(placement.range);
        }
        debug!(
            width = self.width,
            height = self.height,
            depth = tree.depth(),
            channels = self.channels.len(),
            "allocated world memory"
        );
        self.buffer = buffer;
        self.index = Some(tree);
        self.state = AllocationState::Allocated;
    }

    /// The frozen index tree.
    pub fn index(&self) -> Result<&IndexTree, WorldError> {
        self.index.as_ref().ok_or_else(|| WorldError::NotAllocated {
            id: "world".to_string(),
        })
    }

    /// Depth indices addressed by `key`.
    pub fn indices(&self, key: &ChannelKey) -> Result<Vec<usize>, WorldError> {
        self.index()?.indices(key)
    }

    /// Concatenated depth indices for a heterogeneous list of keys, in request order.
    pub fn indices_for(&self, keys: &[ChannelKey]) -> Result<Vec<usize>, WorldError> {
        self.index()?.indices_for(keys)
    }

    /// Read-only view of one named slice.
    pub fn view(&self, key: impl Into<ChannelKey>) -> Result<View<'_, T>, WorldError> {
        let indices = self.indices(&key.into())?;
        Ok(self.view_indices(indices))
    }

    /// Read-only view concatenating several named slices.
    pub fn view_many(&self, keys: &[ChannelKey]) -> Result<View<'_, T>, WorldError> {
        let indices = self.indices_for(keys)?;
        Ok(self.view_indices(indices))
    }

    pub(crate) fn view_range(&self, range: Range<usize>) -> Result<View<'_, T>, WorldError> {
        self.index()?;
        Ok(self.view_indices(range.collect()))
    }

    fn view_indices(&self, indices: Vec<usize>) -> View<'_, T> {
        View {
            buffer: &self.buffer,
            layout: self.layout(),
            indices,
        }
    }

    /// Assignment through a named accessor; views are read-only, so this always fails.
    ///
    /// Use [`World::copy_into`], [`World::fill`] or [`World::map_inplace`] instead.
    pub fn assign(&mut self, key: impl Into<ChannelKey>, _values: &[T]) -> Result<(), WorldError> {
        let key = key.into();
        self.index()?;
        Err(WorldError::ImmutableView {
            key: key.to_string(),
        })
    }

    /// The whole live buffer, cell-major.
    pub fn buffer(&self) -> Result<&[T], WorldError> {
        self.index()?;
        Ok(&self.buffer)
    }

    /// Mutable access to the whole live buffer for in-place kernels.
    pub fn buffer_mut(&mut self) -> Result<&mut [T], WorldError> {
        self.index()?;
        Ok(&mut self.buffer)
    }

    /// Apply `f` to every scalar addressed by `key`, in place.
    pub fn map_inplace<F>(&mut self, key: impl Into<ChannelKey>, f: F) -> Result<(), WorldError>
    where
        F: Fn(T) -> T + Send + Sync,
    {
        let indices = self.indices(&key.into())?;
        let depth = self.depth();
        self.buffer.par_chunks_mut(depth).for_each(|cell| {
            for &k in &indices {
                cell[k] = f(cell[k]);
            }
        });
        Ok(())
    }

    /// Set every scalar addressed by `key` to `value`.
    pub fn fill(&mut self, key: impl Into<ChannelKey>, value: T) -> Result<(), WorldError> {
        self.map_inplace(key, move |_| value)
    }

    /// Overwrite the slice addressed by `key` with cell-major `values`.
    pub fn copy_into(&mut self, key: impl Into<ChannelKey>, values: &[T]) -> Result<(), WorldError> {
        let key = key.into();
        let indices = self.indices(&key)?;
        let expected = self.width * self.height * indices.len();
        if values.len() != expected {
            return Err(WorldError::LengthMismatch {
                key: key.to_string(),
                expected,
                actual: values.len(),
            });
        }
        let depth = self.depth();
        let width = indices.len();
        self.buffer
            .par_chunks_mut(depth)
            .zip(values.par_chunks(width))
            .for_each(|(cell, source)| {
                for (&k, &value) in indices.iter().zip(source) {
                    cell[k] = value;
                }
            });
        Ok(())
    }

    /// Brush edit: add `value` inside a wrap-around disc centred on `(cx, cy)`.
    ///
    /// Offsets `(i, j)` in `[-radius, radius)` with `i² + j² < radius²` are painted.
    pub fn paint_disc(
        &mut self,
        key: impl Into<ChannelKey>,
        cx: usize,
        cy: usize,
        radius: usize,
        value: T,
    ) -> Result<usize, WorldError> {
        let indices = self.indices(&key.into())?;
        let layout = self.layout();
        let r = radius as isize;
        let mut painted = 0;
        for i in -r..r {
            for j in -r..r {
                if i * i + j * j >= r * r {
                    continue;
                }
                let (x, y) = layout.wrap(cx % self.width, cy % self.height, i, j);
                for &k in &indices {
                    let offset = layout.offset(x, y, k);
                    let current = self.buffer[offset].to_f64();
                    self.buffer[offset] = T::from_f64(current + value.to_f64());
                }
                painted += 1;
            }
        }
        Ok(painted)
    }

    /// Zero the whole buffer in place.
    pub fn clear(&mut self) -> Result<(), WorldError> {
        self.buffer_mut()?.fill(T::default());
        Ok(())
    }

    /// Name of the channel (and subchannel) occupying a buffer depth index.
    #[must_use]
    pub fn channel_at(&self, index: usize) -> Option<(&str, Option<&str>)> {
        self.index.as_ref()?.name_at(index)
    }

    /// Min, max, mean and sum over the slice addressed by `key`.
    pub fn stats(&self, key: impl Into<ChannelKey>) -> Result<ChannelStats, WorldError> {
        let view = self.view(key)?;
        let (min, max, sum, count) = view.iter().map(Element::to_f64).fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0, 0usize),
            |(min, max, sum, count), value| (min.min(value), max.max(value), sum + value, count + 1),
        );
        let mean = if count == 0 { 0.0 } else { sum / count as f64 };
        Ok(ChannelStats {
            min,
            max,
            mean,
            sum,
        })
    }

    /// Clamp every channel (and subchannel) to its declared bounds.
    pub fn clamp_to_bounds(&mut self) -> Result<(), WorldError> {
        self.index()?;
        let mut limits = Vec::new();
        for channel in &self.channels {
            if channel.subchannels().is_empty() {
                limits.extend(bounded_range(channel));
            } else {
                limits.extend(channel.subchannels().iter().filter_map(bounded_range));
            }
        }
        if limits.is_empty() {
            return Ok(());
        }
        let depth = self.depth();
        self.buffer.par_chunks_mut(depth).for_each(|cell| {
            for (range, lo, hi) in &limits {
                for value in &mut cell[range.clone()] {
                    let clamped = value.to_f64().clamp(*lo, *hi);
                    *value = T::from_f64(clamped);
                }
            }
        });
        Ok(())
    }
}

fn bounded_range(channel: &Channel) -> Option<(Range<usize>, f64, f64)> {
    let (lo, hi) = channel.bounds();
    if lo == f64::NEG_INFINITY && hi == f64::INFINITY {
        return None;
    }
    channel.range().map(|range| (range, lo, hi))
}

/// Copy declared data into its depth range, casting to the world's element type.
fn write_initial<T: Element>(
    buffer: &mut [T],
    layout: GridLayout,
    range: &Range<usize>,
    data: Option<ChannelData>,
    name: &str,
) {
    let Some(data) = data else {
        return;
    };
    if let Some(source) = cast_source::<T>(&data) {
        warn!(
            channel = name,
            declared = %source,
            world = %T::DTYPE,
            "channel data dtype does not match world dtype; casting"
        );
    }
    let depth = range.len();
    for cell in 0..layout.cells() {
        for k in 0..depth {
            buffer[layout.cell_offset(cell, range.start + k)] =
                T::from_f64(data.value_at(cell * depth + k));
        }
    }
}

/// Storage type of `data` when it differs from the world element type.
fn cast_source<T: Element>(data: &ChannelData) -> Option<DType> {
    (data.dtype() != T::DTYPE).then(|| data.dtype())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coral_world() -> World<f32> {
        let mut world = World::new(4, 3).expect("world");
        world
            .declare_channels([
                Channel::new("energy"),
                Channel::new("infra"),
                Channel::new("last_move"),
            ])
            .expect("declare");
        let com = world.declare_channel(Channel::new("com")).expect("com");
        com.add_subchannel("a").expect("a");
        com.add_subchannel("b").expect("b").set_depth(2).expect("depth");
        world
    }

    #[test]
    fn allocate_packs_channels_in_declaration_order() {
        let mut world = coral_world();
        let tree = world.allocate().expect("allocate");
        assert_eq!(tree.depth(), 6);
        assert_eq!(tree.node("energy").map(IndexNode::indices), Some(0..1));
        assert_eq!(tree.node("com").map(IndexNode::indices), Some(3..6));
        assert_eq!(world.buffer().expect("buffer").len(), 4 * 3 * 6);
        assert_eq!(world.channel("com").and_then(Channel::range), Some(3..6));
        assert_eq!(
            world
                .channel("com")
                .and_then(|c| c.subchannel("b"))
                .and_then(Channel::range),
            Some(4..6)
        );
    }

    #[test]
    fn reserved_channels_are_laid_out_first() {
        let mut world = World::<f32>::new(2, 2).expect("world");
        world
            .declare_channels([Channel::new("energy"), Channel::new("rgb").with_depth(3).reserved()])
            .expect("declare");
        let tree = world.allocate().expect("allocate");
        assert_eq!(tree.node("rgb").map(IndexNode::indices), Some(0..3));
        assert_eq!(tree.node("energy").map(IndexNode::indices), Some(3..4));
    }

    #[test]
    fn initial_data_is_cast_into_place() {
        let mut world = World::<f32>::new(2, 2).expect("world");
        world
            .declare_channels([
                Channel::new("energy"),
                Channel::new("infra").with_data(ChannelData::new(vec![2, 2], vec![1_i32, 2, 3, 4])),
            ])
            .expect("declare");
        world.allocate().expect("allocate");
        assert_eq!(world.view("infra").expect("view").to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(world.view("energy").expect("view").to_vec(), vec![0.0; 4]);
    }

    #[test]
    fn failed_allocation_leaves_world_unallocated() {
        let mut world = World::<f32>::new(2, 2).expect("world");
        world.declare_channel(Channel::new("energy")).expect("energy");
        let grouped = world.declare_channel(Channel::new("com")).expect("com");
        grouped.add_subchannel("a").expect("a").set_depth(0).expect("depth");
        assert!(matches!(world.allocate(), Err(WorldError::InvalidShape { .. })));
        assert_eq!(world.state(), AllocationState::Unallocated);
        assert!(world.channel("energy").is_some_and(|c| !c.is_bound()));
        assert!(world.buffer().is_err());
    }

    #[test]
    fn views_read_through_and_refuse_assignment() {
        let mut world = coral_world();
        world.allocate().expect("allocate");
        world.fill(("com", "b"), 0.5).expect("fill");
        let view = world.view(("com", ["b", "a"])).expect("view");
        assert_eq!(view.depth(), 3);
        assert_eq!(
            view.cell(1, 1).map(|cell| cell.collect::<Vec<_>>()),
            Some(vec![0.5, 0.5, 0.0])
        );
        // (0, 3) would alias (1, 0) on a 4x3 grid without the bounds check.
        assert!(view.cell(0, 3).is_none());
        assert!(view.cell(4, 0).is_none());
        assert_eq!(view.plane(2), Some(vec![0.0; 12]));
        assert_eq!(view.plane(3), None);
        assert_eq!(
            world.assign("energy", &[1.0; 12]),
            Err(WorldError::ImmutableView {
                key: "energy".to_string()
            })
        );
    }

    #[test]
    fn only_declared_data_of_another_dtype_is_cast() {
        let shape = vec![2, 2];
        assert_eq!(
            cast_source::<f64>(&ChannelData::new(shape.clone(), vec![1.0_f32; 4])),
            Some(DType::F32)
        );
        assert_eq!(cast_source::<f64>(&ChannelData::constant(shape.clone(), 1.0)), None);

        let mut world = World::<f64>::new(2, 2).expect("world");
        world
            .declare_channels([
                Channel::new("energy"),
                Channel::new("infra").with_data(ChannelData::new(shape, vec![1_u8, 2, 3, 4])),
            ])
            .expect("declare");
        world.allocate().expect("allocate");
        assert_eq!(world.view("infra").expect("view").to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn copy_into_checks_length() {
        let mut world = coral_world();
        world.allocate().expect("allocate");
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        world.copy_into("infra", &values).expect("copy");
        assert_eq!(world.view("infra").expect("view").to_vec(), values);
        assert!(matches!(
            world.copy_into("infra", &values[..5]),
            Err(WorldError::LengthMismatch { expected: 12, actual: 5, .. })
        ));
    }

    #[test]
    fn paint_disc_wraps_and_stats_report() {
        let mut world = coral_world();
        world.allocate().expect("allocate");
        let painted = world.paint_disc("energy", 0, 0, 1, 2.0).expect("paint");
        assert_eq!(painted, 1);
        assert_eq!(world.view("energy").expect("view").get(0, 0, 0), Some(2.0));

        let painted = world.paint_disc("infra", 0, 0, 2, 1.0).expect("paint");
        assert_eq!(painted, 9);
        let stats = world.stats("infra").expect("stats");
        assert!((stats.sum - 9.0).abs() < 1e-9);
        assert_eq!(stats.max, 1.0);
        assert_eq!(world.channel_at(4), Some(("com", Some("b"))));
    }

    #[test]
    fn clamp_to_bounds_respects_declarations() {
        let mut world = World::<f32>::new(2, 1).expect("world");
        world
            .declare_channels([Channel::new("energy").with_bounds(0.0, 1.0), Channel::new("free")])
            .expect("declare");
        world.allocate().expect("allocate");
        world.copy_into("energy", &[-1.0, 3.0]).expect("copy");
        world.copy_into("free", &[-1.0, 3.0]).expect("copy");
        world.clamp_to_bounds().expect("clamp");
        assert_eq!(world.view("energy").expect("view").to_vec(), vec![0.0, 1.0]);
        assert_eq!(world.view("free").expect("view").to_vec(), vec![-1.0, 3.0]);
    }
}
