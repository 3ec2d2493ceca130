//! Per-cell update rules over a cell-major world buffer.
//!
//! Every kernel reads a snapshot of the fields it depends on, computes per-cell results in
//! parallel and commits them in one pass, so the outcome never depends on iteration order.
//! Transfers into neighbouring cells are gathered by the receiving cell in Moore scan order,
//! which keeps every float sum in a fixed order regardless of thread scheduling.

use coralai_core::GridLayout;
use rand::{Rng, RngCore};
use rayon::prelude::*;

/// Energy and infrastructure retained per step.
pub const DECAY: f32 = 0.99;
/// Upper bound of the uniform energy noise added per step.
pub const ENERGY_NOISE: f32 = 0.01;
/// Share of explored energy that arrives as neighbour infrastructure.
pub const EXPLORE_EFFICIENCY: f32 = 0.95;

/// Depth indices of the resource channels inside a world buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFields {
    pub energy: usize,
    pub infra: usize,
}

/// Per-cell action weights, one x-major plane each.
#[derive(Debug, Clone, Copy)]
pub struct ActionPlanes<'a> {
    pub liquidate: &'a [f32],
    pub invest: &'a [f32],
    pub explore: &'a [f32],
}

/// Parallel for over every cell, passing `(cell, x, y)` and collecting the results in cell order.
pub fn map_cells<R, F>(layout: GridLayout, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize, usize, usize) -> R + Sync + Send,
{
    (0..layout.cells())
        .into_par_iter()
        .map(|cell| {
            let (x, y) = layout.coords(cell);
            f(cell, x, y)
        })
        .collect()
}

/// Copy one depth index of the buffer out as an x-major plane.
#[must_use]
pub fn plane(buffer: &[f32], layout: GridLayout, k: usize) -> Vec<f32> {
    buffer
        .par_chunks_exact(layout.depth())
        .map(|cell| cell[k])
        .collect()
}

/// Decay energy and infrastructure, then add fresh uniform noise to energy.
///
/// Noise is drawn sequentially from `rng` so a seeded run is reproducible.
pub fn entropy(buffer: &mut [f32], layout: GridLayout, fields: CellFields, rng: &mut dyn RngCore) {
    let noise: Vec<f32> = (0..layout.cells())
        .map(|_| rng.random::<f32>() * ENERGY_NOISE)
        .collect();
    buffer
        .par_chunks_mut(layout.depth())
        .zip(noise.par_iter())
        .for_each(|(cell, &noise)| {
            cell[fields.energy] = cell[fields.energy] * DECAY + noise;
            cell[fields.infra] *= DECAY;
        });
}

/// Simultaneous invest/liquidate exchange between energy and infrastructure.
///
/// Both flows are computed from the values before the exchange, so their sum is conserved.
pub fn economics(
    buffer: &mut [f32],
    layout: GridLayout,
    fields: CellFields,
    actions: ActionPlanes<'_>,
) {
    buffer
        .par_chunks_mut(layout.depth())
        .zip(actions.invest.par_iter().zip(actions.liquidate.par_iter()))
        .for_each(|(cell, (&invest_weight, &liquidate_weight))| {
            let energy = cell[fields.energy];
            let infra = cell[fields.infra];
            let invest = invest_weight * energy;
            let liquidate = liquidate_weight * infra;
            cell[fields.energy] = energy + liquidate - invest;
            cell[fields.infra] = infra + invest - liquidate;
        });
}

/// Cells whose explore weight strictly dominates spread a share of their energy to their
/// eight neighbours as infrastructure, losing 5% on the way. Returns the number of explorers.
pub fn explore(
    buffer: &mut [f32],
    layout: GridLayout,
    fields: CellFields,
    actions: ActionPlanes<'_>,
) -> usize {
    let energy = plane(buffer, layout, fields.energy);
    let shares = map_cells(layout, |cell, _, _| {
        let weight = actions.explore[cell];
        let dominant = weight > actions.invest[cell].max(actions.liquidate[cell]);
        dominant.then(|| weight * energy[cell] / 8.0)
    });
    // Moore offsets are symmetric, so a cell's neighbours are exactly the explorers sending to it.
    let infra_gain = map_cells(layout, |_, x, y| {
        layout
            .moore(x, y)
            .iter()
            .filter_map(|&source| shares[source])
            .fold(0.0, |gain, share| gain + share * EXPLORE_EFFICIENCY)
    });
    let explorers = shares.iter().filter(|share| share.is_some()).count();

    buffer
        .par_chunks_mut(layout.depth())
        .zip(shares.par_iter().zip(infra_gain.par_iter()))
        .for_each(|(cell, (share, &gain))| {
            if let Some(share) = share {
                cell[fields.energy] -= share * 8.0;
            }
            cell[fields.infra] += gain;
        });
    explorers
}

/// Every cell hands all of its energy to the neighbour holding the unique strict maximum of
/// infrastructure in its closed Moore neighbourhood. Returns the number of cells that moved.
///
/// Ties, or the cell itself holding the maximum, leave the cell unchanged. Reads use the
/// energy and infrastructure at the start of the pass.
pub fn distribute_energy(buffer: &mut [f32], layout: GridLayout, fields: CellFields) -> usize {
    let energy = plane(buffer, layout, fields.energy);
    let infra = plane(buffer, layout, fields.infra);
    let targets = map_cells(layout, |cell, x, y| {
        let (candidates, len) = layout.closed_moore(x, y);
        let mut best = cell;
        let mut best_infra = infra[cell];
        let mut holders = 1;
        for &candidate in &candidates[1..len] {
            let value = infra[candidate];
            if value > best_infra {
                best = candidate;
                best_infra = value;
                holders = 1;
            } else if value == best_infra {
                holders += 1;
            }
        }
        (best != cell && holders == 1).then_some(best)
    });
    let received = map_cells(layout, |cell, x, y| {
        let (candidates, len) = layout.closed_moore(x, y);
        candidates[1..len]
            .iter()
            .filter(|&&source| targets[source] == Some(cell))
            .fold(0.0, |gain, &source| gain + energy[source])
    });
    let movers = targets.iter().filter(|target| target.is_some()).count();

    buffer
        .par_chunks_mut(layout.depth())
        .zip(targets.par_iter().zip(received.par_iter()))
        .for_each(|(cell, (target, &gain))| {
            if target.is_some() {
                cell[fields.energy] = 0.0;
            }
            cell[fields.energy] += gain;
        });
    movers
}
