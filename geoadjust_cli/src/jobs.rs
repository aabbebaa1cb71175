// geoadjust_cli/src/jobs.rs

//! The job file: optional `[settings]` followed by any number of `[[jobs]]`.

use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Format, Toml},
    Figment,
};
use nalgebra::{Point2, Point3};
use serde::Deserialize;

use geoadjust_core::prelude::*;

// =========================================================================
// == Top-Level Job File ==
// =========================================================================

/// # JobFile
/// Root of a `job.toml` document.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct JobFile {
    #[serde(default)] // Use defaults if the [settings] section is missing
    pub settings: AdjustmentConfig,

    // The TOML has `[[jobs]]`, which becomes a Vec of Job values.
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self> {
        // Figment skips missing files silently.
        if !path.is_file() {
            anyhow::bail!("job file {} does not exist", path.display());
        }
        Figment::new()
            .merge(Toml::file(path))
            .extract()
            .with_context(|| format!("failed to load job file {}", path.display()))
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Figment::new()
            .merge(Toml::string(source))
            .extract()
            .context("failed to parse job document")
    }
}

// =========================================================================
// == Jobs ==
// =========================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")] // `type = "..."` picks the variant
#[serde(rename_all = "PascalCase")] // "ClosedLeveling" in TOML maps to `ClosedLeveling`
pub enum Job {
    Network(NetworkJob),
    Resection(ResectionJob),
    Intersection(IntersectionJob),
    ClosedLeveling(ClosedLevelingJob),
    AttachedLeveling(AttachedLevelingJob),
}

impl Job {
    pub fn get_type_str(&self) -> &str {
        match self {
            Job::Network(_) => "Network",
            Job::Resection(_) => "Resection",
            Job::Intersection(_) => "Intersection",
            Job::ClosedLeveling(_) => "ClosedLeveling",
            Job::AttachedLeveling(_) => "AttachedLeveling",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Job::Network(j) => j.name.as_deref(),
            Job::Resection(j) => j.name.as_deref(),
            Job::Intersection(j) => j.name.as_deref(),
            Job::ClosedLeveling(j) => j.name.as_deref(),
            Job::AttachedLeveling(j) => j.name.as_deref(),
        }
    }
}

// --- Leveling network ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkJob {
    #[serde(default)]
    pub name: Option<String>,
    pub stations: Vec<StationSpec>,
    pub observations: Vec<ObservationSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationSpec {
    pub name: String,
    /// A known elevation makes the station a control station.
    #[serde(default)]
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservationSpec {
    pub name: String,
    pub from: String,
    pub to: String,
    /// Measured `elevation(to) − elevation(from)` in m.
    pub difference: f64,
    /// Line length in km.
    pub length: f64,
}

impl NetworkJob {
    /// Builds the arena, resolving station names.
    pub fn build_network(&self) -> Result<Network> {
        let mut network = Network::new();
        for station in &self.stations {
            match station.elevation {
                Some(h) => network.add_control(station.name.as_str(), h),
                None => network.add_unknown(station.name.as_str()),
            };
        }

        let lookup = |network: &Network, name: &str| {
            network
                .find_station(name)
                .with_context(|| format!("observation refers to unknown station `{name}`"))
        };
        for obs in &self.observations {
            let from = lookup(&network, &obs.from)?;
            let to = lookup(&network, &obs.to)?;
            network
                .add_observation(obs.name.as_str(), from, to, obs.difference, obs.length)
                .with_context(|| format!("invalid observation `{}`", obs.name))?;
        }
        Ok(network)
    }
}

// --- Photogrammetry ---

/// Image coordinates share the focal length's unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResectionJob {
    #[serde(default)]
    pub name: Option<String>,
    pub interior: Interior,
    pub points: Vec<ControlPointSpec>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlPointSpec {
    pub image: [f64; 2],
    pub object: [f64; 3],
}

impl ResectionJob {
    pub fn image_points(&self) -> Vec<Point2<f64>> {
        self.points.iter().map(|p| Point2::from(p.image)).collect()
    }

    pub fn object_points(&self) -> Vec<Point3<f64>> {
        self.points.iter().map(|p| Point3::from(p.object)).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntersectionJob {
    #[serde(default)]
    pub name: Option<String>,
    pub views: Vec<ViewSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewSpec {
    pub interior: Interior,
    pub exterior: Exterior,
    pub image_points: Vec<[f64; 2]>,
}

impl IntersectionJob {
    pub fn image_views(&self) -> Vec<ImageView> {
        self.views
            .iter()
            .map(|v| ImageView {
                interior: v.interior,
                exterior: v.exterior,
                image_points: v.image_points.iter().copied().map(Point2::from).collect(),
            })
            .collect()
    }
}

// --- Leveling lines ---

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClosedLevelingJob {
    #[serde(default)]
    pub name: Option<String>,
    /// Section lengths in km.
    pub distances: Vec<f64>,
    /// Section elevation differences in m.
    pub differences: Vec<f64>,
    pub start: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachedLevelingJob {
    #[serde(default)]
    pub name: Option<String>,
    pub distances: Vec<f64>,
    pub differences: Vec<f64>,
    pub start: f64,
    pub end: f64,
}
