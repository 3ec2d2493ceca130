//! Torus convolution stages and the per-channel activations used by the coral transform.

use coralai_core::GridLayout;
use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::OrganismError;

/// Variance floor used by [`ch_norm`].
pub const NORM_EPS: f32 = 1e-5;

/// 3×3 kernel taps, dx-major.
const TAPS: [(isize, isize); 9] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 0),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Channel-major stack of spatial planes; each plane is laid out x-major like the world.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMap {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl FeatureMap {
    #[must_use]
    pub fn zeroed(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    /// Wrap channel-major `data`; its length must be `width * height * channels`.
    pub fn from_planes(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self, OrganismError> {
        if data.len() != width * height * channels {
            return Err(OrganismError::InvalidConfig(
                "feature data length must equal width * height * channels",
            ));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Copy the depth `indices` of a cell-major world buffer into planes, in index order.
    #[must_use]
    pub fn gather(buffer: &[f32], layout: GridLayout, indices: &[usize]) -> Self {
        let cells = layout.cells();
        let mut map = Self::zeroed(layout.width(), layout.height(), indices.len());
        map.data
            .par_chunks_mut(cells)
            .zip(indices.par_iter())
            .for_each(|(plane, &k)| {
                for (cell, value) in plane.iter_mut().enumerate() {
                    *value = buffer[layout.cell_offset(cell, k)];
                }
            });
        map
    }

    /// Write plane `channel` into depth index `k` of a cell-major world buffer.
    pub fn scatter_plane(&self, channel: usize, buffer: &mut [f32], layout: GridLayout, k: usize) {
        let plane = self.plane(channel);
        buffer
            .par_chunks_mut(layout.depth())
            .zip(plane.par_iter())
            .for_each(|(cell, &value)| cell[k] = value);
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
    pub const fn channels(&self) -> usize {
        self.channels
    }

    #[must_use]
    pub const fn cells(&self) -> usize {
        self.width * self.height
    }

    #[must_use]
    pub fn plane(&self, channel: usize) -> &[f32] {
        let cells = self.cells();
        &self.data[channel * cells..(channel + 1) * cells]
    }

    pub fn plane_mut(&mut self, channel: usize) -> &mut [f32] {
        let cells = self.cells();
        &mut self.data[channel * cells..(channel + 1) * cells]
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    fn layout(&self) -> GridLayout {
        GridLayout::new(self.width, self.height, 1)
    }
}

/// Bias-free 3×3 convolution with wrap-around padding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorusConv {
    in_channels: usize,
    out_channels: usize,
    /// `[out][in][tap]` with taps ordered dx-major.
    weights: Vec<f32>,
}

impl TorusConv {
    /// Uniform init in `±1/√(in_channels·9)`.
    pub fn random(in_channels: usize, out_channels: usize, rng: &mut dyn RngCore) -> Self {
        let bound = 1.0 / ((in_channels * TAPS.len()) as f32).sqrt();
        let weights = (0..out_channels * in_channels * TAPS.len())
            .map(|_| rng.random_range(-bound..bound))
            .collect();
        Self {
            in_channels,
            out_channels,
            weights,
        }
    }

    pub fn from_weights(
        in_channels: usize,
        out_channels: usize,
        weights: Vec<f32>,
    ) -> Result<Self, OrganismError> {
        if weights.len() != out_channels * in_channels * TAPS.len() {
            return Err(OrganismError::InvalidConfig(
                "conv weights must hold out_channels * in_channels * 9 values",
            ));
        }
        Ok(Self {
            in_channels,
            out_channels,
            weights,
        })
    }

    #[must_use]
    pub const fn in_channels(&self) -> usize {
        self.in_channels
    }

    #[must_use]
    pub const fn out_channels(&self) -> usize {
        self.out_channels
    }

    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.in_channels, self.out_channels)
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    fn kernel(&self, out: usize, input: usize) -> &[f32] {
        let start = (out * self.in_channels + input) * TAPS.len();
        &self.weights[start..start + TAPS.len()]
    }

    pub fn forward(&self, input: &FeatureMap) -> Result<FeatureMap, OrganismError> {
        if input.channels() != self.in_channels {
            return Err(OrganismError::InputChannels {
                expected: self.in_channels,
                actual: input.channels(),
            });
        }
        let layout = input.layout();
        let cells = input.cells();
        let neighbourhoods: Vec<[usize; 9]> = (0..cells)
            .into_par_iter()
            .map(|cell| {
                let (x, y) = layout.coords(cell);
                TAPS.map(|(dx, dy)| {
                    let (nx, ny) = layout.wrap(x, y, dx, dy);
                    layout.cell(nx, ny)
                })
            })
            .collect();

        let mut output = FeatureMap::zeroed(input.width(), input.height(), self.out_channels);
        output
            .data
            .par_chunks_mut(cells)
            .enumerate()
            .for_each(|(out, plane)| {
                for channel in 0..self.in_channels {
                    let kernel = self.kernel(out, channel);
                    let source = input.plane(channel);
                    for (value, taps) in plane.iter_mut().zip(&neighbourhoods) {
                        *value += kernel
                            .iter()
                            .zip(taps)
                            .map(|(w, &cell)| w * source[cell])
                            .sum::<f32>();
                    }
                }
            });
        Ok(output)
    }

    /// Copy of this stage with `strength · N(0, 1)` added to every weight.
    #[must_use]
    pub fn perturbed(&self, strength: f32, rng: &mut dyn RngCore) -> Self {
        let weights = self
            .weights
            .iter()
            .map(|&w| {
                let noise: f32 = StandardNormal.sample(rng);
                w + strength * noise
            })
            .collect();
        Self {
            in_channels: self.in_channels,
            out_channels: self.out_channels,
            weights,
        }
    }
}

/// The three-stage coral transform: sensors → latent → latent → actuators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    stages: [TorusConv; 3],
}

impl Weights {
    pub fn random(
        n_sensors: usize,
        latent_size: usize,
        n_actuators: usize,
        rng: &mut dyn RngCore,
    ) -> Self {
        Self {
            stages: [
                TorusConv::random(n_sensors, latent_size, rng),
                TorusConv::random(latent_size, latent_size, rng),
                TorusConv::random(latent_size, n_actuators, rng),
            ],
        }
    }

    #[must_use]
    pub fn stages(&self) -> &[TorusConv; 3] {
        &self.stages
    }

    /// `(in, out)` channel counts per stage.
    #[must_use]
    pub fn shapes(&self) -> Vec<(usize, usize)> {
        self.stages.iter().map(TorusConv::shape).collect()
    }

    /// Total number of scalar weights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.iter().map(|stage| stage.weights.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inference pass; the two hidden stages are followed by ReLU, [`ch_norm`] and sigmoid.
    pub fn forward(&self, input: &FeatureMap) -> Result<FeatureMap, OrganismError> {
        let [first, second, last] = &self.stages;
        let mut x = first.forward(input)?;
        hidden_activation(&mut x);
        let mut x = second.forward(&x)?;
        hidden_activation(&mut x);
        last.forward(&x)
    }

    /// Pure perturbation operator: a new weight set with Gaussian noise of scale `strength`.
    pub fn perturbed(&self, strength: f32, rng: &mut dyn RngCore) -> Result<Self, OrganismError> {
        if !strength.is_finite() || strength < 0.0 {
            return Err(OrganismError::InvalidConfig(
                "perturbation strength must be finite and non-negative",
            ));
        }
        let [first, second, last] = &self.stages;
        Ok(Self {
            stages: [
                first.perturbed(strength, rng),
                second.perturbed(strength, rng),
                last.perturbed(strength, rng),
            ],
        })
    }
}

fn hidden_activation(x: &mut FeatureMap) {
    relu(&mut x.data);
    ch_norm(x);
    sigmoid(&mut x.data);
}

pub fn relu(values: &mut [f32]) {
    values.par_iter_mut().for_each(|v| *v = v.max(0.0));
}

pub fn sigmoid(values: &mut [f32]) {
    values
        .par_iter_mut()
        .for_each(|v| *v = 1.0 / (1.0 + (-*v).exp()));
}

/// Normalize every plane to zero mean and unit population variance.
pub fn ch_norm(map: &mut FeatureMap) {
    let cells = map.cells();
    map.data.par_chunks_mut(cells).for_each(normalize_plane);
}

pub(crate) fn normalize_plane(plane: &mut [f32]) {
    let n = plane.len() as f32;
    let mean = plane.iter().sum::<f32>() / n;
    let var = plane.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let scale = 1.0 / (var + NORM_EPS).sqrt();
    for v in plane {
        *v = (*v - mean) * scale;
    }
}

/// Softmax across the first three planes of every cell, returning each cell's arg-max.
///
/// Ties resolve to the lowest plane index.
pub fn softmax_actions(map: &mut FeatureMap) -> Vec<u8> {
    let cells = map.cells();
    let (first, rest) = map.data.split_at_mut(cells);
    let (second, rest) = rest.split_at_mut(cells);
    let third = &mut rest[..cells];
    first
        .par_iter_mut()
        .zip(second.par_iter_mut())
        .zip(third.par_iter_mut())
        .map(|((a, b), c)| {
            let max = a.max(*b).max(*c);
            let (ea, eb, ec) = ((*a - max).exp(), (*b - max).exp(), (*c - max).exp());
            let total = ea + eb + ec;
            *a = ea / total;
            *b = eb / total;
            *c = ec / total;
            let mut best = 0u8;
            let mut best_value = *a;
            for (index, value) in [(1u8, *b), (2u8, *c)] {
                if value > best_value {
                    best = index;
                    best_value = value;
                }
            }
            best
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn identity_tap(in_channels: usize, out_channels: usize, tap: usize) -> TorusConv {
        let mut weights = vec![0.0; in_channels * out_channels * 9];
        for o in 0..out_channels.min(in_channels) {
            weights[(o * in_channels + o) * 9 + tap] = 1.0;
        }
        TorusConv::from_weights(in_channels, out_channels, weights).expect("weights")
    }

    #[test]
    fn conv_wraps_around_the_torus() {
        let mut input = FeatureMap::zeroed(3, 2, 1);
        let layout = GridLayout::new(3, 2, 1);
        input.plane_mut(0)[layout.cell(0, 0)] = 1.0;
        // tap (dx, dy) = (-1, -1) reads the upper-left neighbour.
        let conv = identity_tap(1, 1, 0);
        let out = conv.forward(&input).expect("forward");
        assert_eq!(out.plane(0)[layout.cell(1, 1)], 1.0);
        assert_eq!(out.plane(0).iter().sum::<f32>(), 1.0);
    }

    #[test]
    fn conv_rejects_wrong_channel_count() {
        let conv = identity_tap(2, 1, 4);
        let input = FeatureMap::zeroed(2, 2, 3);
        assert_eq!(
            conv.forward(&input),
            Err(OrganismError::InputChannels {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn ch_norm_centres_and_scales() {
        let mut map =
            FeatureMap::from_planes(2, 2, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0])
                .expect("map");
        ch_norm(&mut map);
        let plane = map.plane(0);
        assert!(plane.iter().sum::<f32>().abs() < 1e-5);
        let var = plane.iter().map(|v| v * v).sum::<f32>() / 4.0;
        assert!((var - 1.0).abs() < 1e-4);
        assert!(map.plane(1).iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn softmax_picks_lowest_index_on_ties() {
        let mut map = FeatureMap::from_planes(
            2,
            1,
            3,
            vec![0.0, 1.0, 0.0, 3.0, 0.0, 3.0],
        )
        .expect("map");
        let winners = softmax_actions(&mut map);
        assert_eq!(winners, vec![0, 1]);
        let sum: f32 = (0..3).map(|c| map.plane(c)[1]).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!((map.plane(0)[0] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn random_init_respects_fan_in_bound() {
        let mut rng = SmallRng::seed_from_u64(3);
        let conv = TorusConv::random(4, 2, &mut rng);
        let bound = 1.0 / 36.0_f32.sqrt();
        assert_eq!(conv.weights().len(), 72);
        assert!(conv.weights().iter().all(|w| w.abs() <= bound));
    }

    #[test]
    fn perturbation_preserves_shapes() {
        let mut rng = SmallRng::seed_from_u64(11);
        let weights = Weights::random(7, 7, 7, &mut rng);
        let same = weights.perturbed(0.0, &mut rng).expect("zero");
        assert_eq!(same, weights);

        let moved = weights.perturbed(0.1, &mut rng).expect("perturb");
        assert_eq!(moved.shapes(), weights.shapes());
        let changed = moved
            .stages()
            .iter()
            .zip(weights.stages())
            .flat_map(|(a, b)| a.weights().iter().zip(b.weights()))
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(changed, weights.len());

        assert!(weights.perturbed(-1.0, &mut rng).is_err());
        assert!(weights.perturbed(f32::NAN, &mut rng).is_err());
    }

    #[test]
    fn forward_produces_actuator_planes() {
        let mut rng = SmallRng::seed_from_u64(5);
        let weights = Weights::random(3, 4, 6, &mut rng);
        let input = FeatureMap::from_planes(4, 4, 3, (0..48).map(|v| v as f32 / 48.0).collect())
            .expect("input");
        let out = weights.forward(&input).expect("forward");
        assert_eq!(out.channels(), 6);
        assert_eq!(out.cells(), 16);
        assert!(out.data().iter().all(|v| v.is_finite()));
    }
}
