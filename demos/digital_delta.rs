//! Monte Carlo delta and vega of a cash-or-nothing digital call via the
//! smoothed barrier derivative, compared with Black-Scholes.
//!
//! Run with `RUST_LOG=ferric_rv=debug` to see the backward-pass spans.

use ferric_rv::aad::Graph;
use ferric_rv::core::{GraphSettings, RandomVariableError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PATHS: usize = 200_000;

fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

fn main() -> Result<(), RandomVariableError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "digital_delta=info,ferric_rv=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (spot, strike, rate, vol, maturity): (f64, f64, f64, f64, f64) =
        (100.0, 105.0, 0.02, 0.25, 1.0);

    let mut rng = StdRng::seed_from_u64(2024);
    let shocks: Vec<f64> = (0..PATHS).map(|_| StandardNormal.sample(&mut rng)).collect();

    for width in [0.2, 0.1, 0.05] {
        let settings = GraphSettings::builder()
            .barrier_smoothing_width(width)
            .build()?;
        let graph = Graph::with_settings(settings)?;

        let s0 = graph.constant(spot);
        let sigma = graph.constant(vol);
        let z = graph.stochastic(maturity, shocks.clone());

        // S_T = S_0 exp((r - sigma^2 / 2) T + sigma sqrt(T) Z)
        let log_growth = sigma
            .squared()
            .mult(-0.5 * maturity)?
            .add(rate * maturity)?
            .add(&sigma.mult(maturity.sqrt())?.mult(&z)?)?;
        let terminal = s0.mult(&log_growth.exp())?;
        let payoff = terminal.sub(strike)?.choose(1.0, 0.0)?;
        let price = payoff.mult((-rate * maturity).exp())?.average();

        let gradient = price.gradient()?;
        let delta = gradient.get(&s0).map_or(0.0, |d| d.average());
        let vega = gradient.get(&sigma).map_or(0.0, |d| d.average());

        info!(
            width,
            price = price.values().get(0),
            delta,
            vega,
            "monte carlo digital"
        );
    }

    let sqrt_t = maturity.sqrt();
    let d2 = ((spot / strike).ln() + (rate - 0.5 * vol * vol) * maturity) / (vol * sqrt_t);
    let d1 = d2 + vol * sqrt_t;
    let discount = (-rate * maturity).exp();
    info!(
        delta = discount * normal_pdf(d2) / (spot * vol * sqrt_t),
        vega = -discount * normal_pdf(d2) * d1 / vol,
        "black-scholes digital"
    );
    Ok(())
}
