use approx::assert_relative_eq;
use ferric_rv::aad::Graph;
use ferric_rv::core::GraphSettings;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

fn uniform_grid(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| -1.0 + 2.0 * i as f64 / (n - 1) as f64)
        .collect()
}

fn graph_with_width(width: f64) -> Graph {
    let settings = GraphSettings::builder()
        .barrier_smoothing_width(width)
        .build()
        .expect("width should be valid");
    Graph::with_settings(settings).expect("settings should be valid")
}

#[test]
fn shrinking_window_converges_to_indicator_derivative() {
    let grid = uniform_grid(2001);
    let mut previous_support = usize::MAX;

    for width in [0.2, 0.1, 0.05, 0.01] {
        let graph = graph_with_width(width);
        let x = graph.stochastic(0.0, grid.clone());
        let digital = x.choose(1.0, 0.0).unwrap();
        let gradient = digital.gradient().unwrap();
        let dx = gradient.get(&x).unwrap();

        let epsilon = width * x.values().standard_deviation();
        let mut support = 0;
        for (path, &value) in grid.iter().enumerate() {
            let d = dx.get(path);
            assert!(d.is_finite(), "width={width} x={value} d={d}");
            if value.abs() > 0.5 * epsilon {
                // Away from the kink the indicator's derivative is exactly zero.
                assert_eq!(d, 0.0, "width={width} x={value}");
            }
            if d != 0.0 {
                assert_relative_eq!(d, 1.0 / epsilon, max_relative = 1e-12);
                support += 1;
            }
        }

        // The kink itself always carries a finite spike.
        assert!(dx.get(1000) > 0.0);
        assert!(support <= previous_support, "width={width} support={support}");
        previous_support = support;

        // The mass of the smoothed delta approximates the density of x at 0.
        let mass = dx.average();
        assert!((mass - 0.5).abs() < 0.1, "width={width} mass={mass}");
    }
}

#[test]
fn default_width_is_point_two_of_the_trigger_stdev() {
    let grid = uniform_grid(11);
    let graph = Graph::new();
    let x = graph.stochastic(0.0, grid);
    let gradient = x.choose(2.0, -1.0).unwrap().gradient().unwrap();
    let epsilon = 0.2 * x.values().standard_deviation();
    // Jump size 3 over the window, only at the origin path.
    assert_relative_eq!(gradient.get(&x).unwrap().get(5), 3.0 / epsilon, max_relative = 1e-12);
    assert_eq!(gradient.get(&x).unwrap().get(0), 0.0);
}

#[test]
fn branches_receive_indicator_gradients() {
    let graph = Graph::new();
    let trigger = graph.stochastic(0.0, vec![-1.0, 0.0, 1.0]);
    let up = graph.constant(5.0);
    let down = graph.constant(-5.0);
    let chosen = trigger.choose(&up, &down).unwrap();
    assert_eq!(chosen.values().to_vec(), vec![-5.0, 5.0, 5.0]);

    let gradient = chosen.gradient().unwrap();
    assert_eq!(gradient.get(&up).unwrap().to_vec(), vec![0.0, 1.0, 1.0]);
    assert_eq!(gradient.get(&down).unwrap().to_vec(), vec![1.0, 0.0, 0.0]);
}

#[test]
fn digital_delta_matches_black_scholes() {
    const PATHS: usize = 100_000;
    let (spot, strike, sigma, maturity) = (100.0_f64, 100.0_f64, 0.2_f64, 1.0_f64);

    let mut rng = StdRng::seed_from_u64(42);
    let growth: Vec<f64> = (0..PATHS)
        .map(|_| {
            let z: f64 = StandardNormal.sample(&mut rng);
            (-0.5 * sigma * sigma * maturity + sigma * maturity.sqrt() * z).exp()
        })
        .collect();

    let graph = Graph::new();
    let s0 = graph.constant(spot);
    let growth = graph.stochastic(maturity, growth);
    let terminal = s0.mult(&growth).unwrap();
    let price = terminal.sub(strike).unwrap().choose(1.0, 0.0).unwrap().average();
    let gradient = price.gradient().unwrap();
    let delta = gradient.get(&s0).unwrap().average();

    let d2 = ((spot / strike).ln() - 0.5 * sigma * sigma * maturity) / (sigma * maturity.sqrt());
    let pdf = (-0.5 * d2 * d2).exp() / (2.0 * std::f64::consts::PI).sqrt();
    let expected = pdf / (spot * sigma * maturity.sqrt());

    assert!(
        (delta - expected).abs() / expected < 0.05,
        "delta={delta} expected={expected}"
    );
}
