// geoadjust_core/src/network/adjust.rs

use crate::config::NetworkSettings;
use crate::error::{AdjustError, Result};
use crate::linalg::{error_matrix, normal_equation, rmse, InverseCascade, InverseSolver};
use crate::network::{EdgeKind, Network};
use crate::types::{Matrix, ObservationId, StationId, Vector};

/// Per-run bijection between free stations and design-matrix columns, and
/// between observations and design-matrix rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexMap {
    columns: Vec<Option<usize>>,
    rows: Vec<Option<usize>>,
    column_stations: Vec<StationId>,
    row_observations: Vec<ObservationId>,
}

impl IndexMap {
    /// Gives every non-control station the next free column, in insertion order.
    fn assign_columns(network: &Network) -> Self {
        let mut map = Self {
            columns: vec![None; network.stations().len()],
            rows: vec![None; network.observations().len()],
            ..Self::default()
        };
        for id in network.station_ids() {
            if !network.station(id).is_control {
                map.columns[id.0] = Some(map.column_stations.len());
                map.column_stations.push(id);
            }
        }
        map
    }

    fn assign_row(&mut self, observation: ObservationId) -> usize {
        let row = self.row_observations.len();
        self.rows[observation.0] = Some(row);
        self.row_observations.push(observation);
        row
    }

    pub fn column(&self, station: StationId) -> Option<usize> {
        self.columns.get(station.0).copied().flatten()
    }

    pub fn row(&self, observation: ObservationId) -> Option<usize> {
        self.rows.get(observation.0).copied().flatten()
    }

    /// Station estimated in column `col`.
    pub fn station_at(&self, col: usize) -> StationId {
        self.column_stations[col]
    }

    /// Observation filling row `row`.
    pub fn observation_at(&self, row: usize) -> ObservationId {
        self.row_observations[row]
    }

    /// `t`, the number of unknowns.
    pub fn unknowns(&self) -> usize {
        self.column_stations.len()
    }

    /// Number of rows assigned so far.
    pub fn assigned_rows(&self) -> usize {
        self.row_observations.len()
    }
}

/// Outcome of a network adjustment. The adjusted values themselves are
/// written back into the network.
#[derive(Debug, Clone)]
pub struct NetworkAdjustment {
    /// Unit-weight standard deviation, in the network's own unit.
    pub rmse: f64,
    /// Standard error of each unknown, in column order.
    pub error: Vector,
    /// Correction `x` added to each provisional value, in column order.
    pub corrections: Vector,
    /// Residual `V` added to each observation, in row order.
    pub residuals: Vector,
    pub index: IndexMap,
}

impl NetworkAdjustment {
    pub fn error_of(&self, station: StationId) -> Option<f64> {
        self.index.column(station).map(|col| self.error[col])
    }

    pub fn residual_of(&self, observation: ObservationId) -> Option<f64> {
        self.index.row(observation).map(|row| self.residuals[row])
    }

    /// Observations minus unknowns.
    pub fn redundancy(&self) -> usize {
        self.residuals.len().saturating_sub(self.corrections.len())
    }
}

/// Adjusts `network` in place with the default inversion cascade.
pub fn adjust_network(network: &mut Network, settings: &NetworkSettings) -> Result<NetworkAdjustment> {
    adjust_network_with(network, settings, &InverseCascade::default())
}

/// Adjusts `network` in place by indirect (parametric) least squares.
///
/// The design system is filled while walking the network breadth-first from
/// its control stations. Nothing is written back unless the run succeeds.
pub fn adjust_network_with(
    network: &mut Network,
    settings: &NetworkSettings,
    inverse: &dyn InverseSolver,
) -> Result<NetworkAdjustment> {
    check_settings(settings)?;

    // --- 1. Index assignment and validation ---
    let mut index = IndexMap::assign_columns(network);
    let n = network.observations().len();
    let t = index.unknowns();

    if n < t {
        return Err(AdjustError::UnderDetermined {
            observations: n,
            unknowns: t,
        });
    }
    if let Some(obs) = network.observations().iter().find(|o| o.from == o.to) {
        return Err(AdjustError::SelfLoopDetected {
            observation: obs.name.clone(),
            station: network.station(obs.from).name.clone(),
        });
    }
    if network.control_stations().next().is_none() {
        return Err(AdjustError::NoControlStation);
    }

    // --- 2. Traverse and fill A, P, L ---
    let scale = settings.working_scale;
    let mut provisional: Vec<f64> = network.stations().iter().map(|s| s.value).collect();
    let mut a = Matrix::zeros(n, t);
    let mut p = Matrix::zeros(n, n);
    let mut l = Matrix::zeros(n, 1);

    let mut traversal = network.breadth_first();
    for step in traversal.by_ref() {
        let obs = network.observation(step.observation);
        debug_assert!(!step.is_self_loop());

        let (u, v) = (step.from, step.to);
        if step.kind == EdgeKind::Tree {
            provisional[v.0] = provisional[u.0] + obs.measured_difference;
        }

        let row = index.assign_row(step.observation);
        p[(row, row)] = settings.unit_weight / obs.weight_basis;
        l[(row, 0)] = (obs.measured_difference + provisional[u.0] - provisional[v.0]) * scale;
        if let Some(col) = index.column(u) {
            a[(row, col)] = -1.0;
        }
        if let Some(col) = index.column(v) {
            a[(row, col)] = 1.0;
        }
    }

    if let Some(unreached) = network.station_ids().find(|&id| !traversal.is_discovered(id)) {
        return Err(AdjustError::UnreachableStation {
            station: network.station(unreached).name.clone(),
        });
    }
    debug_assert_eq!(index.assigned_rows(), n);

    // --- 3. Solve the normal equations ---
    let normal_inverse = inverse.invert(&normal_equation(&a, Some(&p)));
    let x = &normal_inverse * (a.transpose() * &p * &l) / scale;
    let residuals = &a * &x - &l / scale;

    // --- 4. Write corrections back ---
    for (sid, value) in provisional.iter().enumerate() {
        let id = StationId(sid);
        let correction = index.column(id).map(|col| x[(col, 0)]);
        let station = network.station_mut(id);
        if let Some(dx) = correction {
            station.value = value + dx;
        }
        station.is_initialized = true;
    }
    for row in 0..n {
        let observation = index.observation_at(row);
        network.observation_mut(observation).measured_difference += residuals[(row, 0)];
    }

    // --- 5. Precision ---
    let sigma0 = rmse(&residuals, n, t, Some(&p));
    let error = error_matrix(sigma0, &normal_inverse);

    tracing::info!(
        "network adjusted: {} observations, {} unknowns, rmse {:.6}",
        n,
        t,
        sigma0
    );

    Ok(NetworkAdjustment {
        rmse: sigma0,
        error,
        corrections: x.column(0).into_owned(),
        residuals: residuals.column(0).into_owned(),
        index,
    })
}

fn check_settings(settings: &NetworkSettings) -> Result<()> {
    let fields = [
        ("unit_weight", settings.unit_weight),
        ("working_scale", settings.working_scale),
    ];
    for (setting, value) in fields {
        if !value.is_finite() || value <= 0.0 {
            return Err(AdjustError::InvalidSetting { setting, value });
        }
    }
    Ok(())
}
