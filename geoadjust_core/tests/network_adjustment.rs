use approx::assert_abs_diff_eq;
use geoadjust_core::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Benchmark A and three new stations joined by five leveling lines
/// (difference in m, length in km).
fn example_network() -> Network {
    let mut net = Network::new();
    let a = net.add_control("A", 237.483);
    let b = net.add_unknown("B");
    let c = net.add_unknown("C");
    let d = net.add_unknown("D");
    for (name, from, to, diff, length) in [
        ("1", a, b, 5.835, 3.5),
        ("2", b, c, 3.782, 2.7),
        ("3", a, c, 9.640, 4.0),
        ("4", d, c, 7.384, 3.0),
        ("5", a, d, 2.270, 2.5),
    ] {
        net.add_observation(name, from, to, diff, length).unwrap();
    }
    net
}

#[test]
fn example_network_matches_hand_solution() {
    let mut net = example_network();
    let result = adjust_network(&mut net, &NetworkSettings::default()).unwrap();

    let value = |name: &str| net.station(net.find_station(name).unwrap()).value;
    assert_abs_diff_eq!(value("A"), 237.483);
    assert_abs_diff_eq!(value("B"), 243.329876, epsilon = 1e-6);
    assert_abs_diff_eq!(value("C"), 247.121037, epsilon = 1e-6);
    assert_abs_diff_eq!(value("D"), 239.745744, epsilon = 1e-6);

    assert!(result.rmse.is_finite());
    assert_abs_diff_eq!(result.rmse, 0.0077030, epsilon = 1e-6);
    assert_eq!(result.redundancy(), 2);
    let b = net.find_station("B").unwrap();
    assert_abs_diff_eq!(result.error_of(b).unwrap(), 0.0110600, epsilon = 1e-6);

    let first = net.find_observation("1").unwrap();
    assert_abs_diff_eq!(result.residual_of(first).unwrap(), 0.0118758, epsilon = 1e-6);
    assert!(net.stations().iter().all(|s| s.is_initialized));
}

#[test]
fn adjusted_observations_close_every_loop() {
    let mut net = example_network();
    let original: Vec<f64> = net.observations().iter().map(|o| o.measured_difference).collect();
    let result = adjust_network(&mut net, &NetworkSettings::default()).unwrap();

    // Each adjusted difference is the difference of adjusted heights.
    for obs in net.observations() {
        let rise = net.station(obs.to).value - net.station(obs.from).value;
        assert_abs_diff_eq!(obs.measured_difference, rise, epsilon = 1e-9);
    }

    // Loop A→B→C←A: residuals cancel the original misclosure.
    let misclosure = original[0] + original[1] - original[2];
    let v = &result.residuals;
    let row = |name: &str| result.index.row(net.find_observation(name).unwrap()).unwrap();
    assert_abs_diff_eq!(v[row("1")] + v[row("2")] - v[row("3")], -misclosure, epsilon = 1e-9);
}

#[test]
fn rows_follow_breadth_first_order() {
    let mut net = example_network();
    let result = adjust_network(&mut net, &NetworkSettings::default()).unwrap();
    let order: Vec<&str> = (0..5)
        .map(|row| net.observation(result.index.observation_at(row)).name.as_str())
        .collect();
    assert_eq!(order, ["1", "3", "5", "2", "4"]);
    assert_eq!(net.station(result.index.station_at(0)).name, "B");
}

#[test]
fn noisy_level_grid_recovers_true_heights() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    // 1 mm per sqrt(km), scaled by each line's length below.
    let noise = Normal::new(0.0, 0.001).unwrap();

    let truth = [100.0, 101.250, 99.870, 102.415, 100.930, 103.002];
    let mut net = Network::new();
    let ids: Vec<StationId> = truth
        .iter()
        .enumerate()
        .map(|(i, &h)| {
            if i == 0 {
                net.add_control("BM0", h)
            } else {
                net.add_unknown(format!("P{i}"))
            }
        })
        .collect();

    let lines = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 2), (1, 3), (2, 4), (3, 5), (1, 4)];
    for (k, &(i, j)) in lines.iter().enumerate() {
        let length = 1.0 + (k % 3) as f64;
        let measured = truth[j] - truth[i] + noise.sample(&mut rng) * length.sqrt();
        net.add_observation(format!("L{k}"), ids[i], ids[j], measured, length).unwrap();
    }

    let result = adjust_network(&mut net, &NetworkSettings::default()).unwrap();
    for (id, h) in ids.iter().zip(truth) {
        assert_abs_diff_eq!(net.station(*id).value, h, epsilon = 0.01);
    }
    assert!(result.rmse > 0.0 && result.rmse < 0.01);
    assert!(result.error.iter().all(|e| e.is_finite() && *e > 0.0));
}

#[test]
fn two_control_stations_seed_the_traversal() {
    let mut net = Network::new();
    let a = net.add_control("A", 10.0);
    let z = net.add_control("Z", 20.0);
    let m = net.add_unknown("M");
    net.add_observation("am", a, m, 5.01, 1.0).unwrap();
    net.add_observation("zm", z, m, -4.99, 1.0).unwrap();

    adjust_network(&mut net, &NetworkSettings::default()).unwrap();
    assert_abs_diff_eq!(net.station(m).value, 15.01, epsilon = 1e-9);
}
