// geoadjust_cli/src/report.rs

//! Plain-text reports. Precision is fixed per quantity: elevations and
//! corrections in mm-resolution metres, angles in radians to 1e-6.

use std::fmt::Write;

use geoadjust_core::prelude::*;

pub fn network(out: &mut String, network: &Network, result: &NetworkAdjustment) -> std::fmt::Result {
    writeln!(out, "{:<10} {:>12} {:>10}", "station", "elevation", "σ")?;
    for id in network.station_ids() {
        let station = network.station(id);
        match result.error_of(id) {
            Some(sigma) => writeln!(out, "{:<10} {:>12.4} {:>10.4}", station.name, station.value, sigma)?,
            None => writeln!(out, "{:<10} {:>12.4} {:>10}", station.name, station.value, "fixed")?,
        }
    }
    writeln!(out, "{:<10} {:>12} {:>10}", "obs", "adjusted", "v [mm]")?;
    for id in network.observation_ids() {
        let obs = network.observation(id);
        let v = result.residual_of(id).unwrap_or(0.0);
        writeln!(out, "{:<10} {:>12.4} {:>10.1}", obs.name, obs.measured_difference, v * 1000.0)?;
    }
    writeln!(
        out,
        "rmse = {:.4}, redundancy = {}",
        result.rmse,
        result.redundancy()
    )
}

pub fn resection(out: &mut String, result: &SpaceResection) -> std::fmt::Result {
    let e = &result.exterior;
    writeln!(out, "state = {:?} after {} iteration(s)", result.state, result.iterations)?;
    writeln!(out, "Xs = {:.4}, Ys = {:.4}, Zs = {:.4}", e.x, e.y, e.z)?;
    writeln!(out, "φ = {:.6}, ω = {:.6}, κ = {:.6}", e.phi, e.omega, e.kappa)?;
    if let (Some(rmse), Some(error)) = (result.rmse, &result.error) {
        writeln!(out, "rmse = {:.3e}", rmse)?;
        let labels = ["Xs", "Ys", "Zs", "φ", "ω", "κ"];
        for (label, sigma) in labels.iter().zip(error.iter()) {
            writeln!(out, "  σ({label}) = {sigma:.3e}")?;
        }
    }
    Ok(())
}

pub fn intersection(out: &mut String, result: &SpaceIntersection) -> std::fmt::Result {
    writeln!(out, "state = {:?} after {} iteration(s)", result.state, result.iterations)?;
    writeln!(out, "{:<6} {:>14} {:>14} {:>12}", "point", "X", "Y", "Z")?;
    for (i, p) in result.points.iter().enumerate() {
        writeln!(out, "{:<6} {:>14.4} {:>14.4} {:>12.4}", i + 1, p.x, p.y, p.z)?;
    }
    if let Some(rmse) = result.rmse {
        writeln!(out, "rmse = {:.3e}", rmse)?;
    }
    Ok(())
}

pub fn leveling(out: &mut String, result: &LevelingAdjustment) -> std::fmt::Result {
    writeln!(
        out,
        "{:<4} {:>8} {:>10} {:>8} {:>10} {:>10}",
        "#", "L [km]", "h [m]", "v [mm]", "h' [m]", "H [m]"
    )?;
    writeln!(out, "{:<4} {:>50.3}", 0, result.elevations[0])?;
    for (i, s) in result.sections.iter().enumerate() {
        writeln!(
            out,
            "{:<4} {:>8.2} {:>10.3} {:>8.0} {:>10.3} {:>10.3}",
            i + 1,
            s.distance,
            s.difference,
            s.correction * 1000.0,
            s.corrected_difference,
            result.elevations[i + 1]
        )?;
    }
    let summary = &result.summary;
    writeln!(
        out,
        "Σ    {:>8.2} {:>10.3} {:>8.0} {:>10.3}",
        summary.distance_sum,
        summary.difference_sum,
        summary.correction_sum * 1000.0,
        summary.corrected_difference_sum
    )?;
    writeln!(
        out,
        "f = {:.0} mm, allowed ±{:.0} mm ({}), {:.0} mm/km",
        summary.closure * 1000.0,
        summary.tolerance * 1000.0,
        if summary.within_tolerance { "ok" } else { "exceeded" },
        summary.mean_correction * 1000.0
    )
}
