// geoadjust_core/src/lib.rs

// Least-squares adjustment for leveling networks and photogrammetry.
pub mod config;
pub mod error;
pub mod leveling;
pub mod linalg;
pub mod network;
pub mod photogrammetry;
pub mod prelude;
pub mod types;
