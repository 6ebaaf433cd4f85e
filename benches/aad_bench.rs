use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ferric_rv::aad::{DifferentiableRandomVariable, Graph};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use std::hint::black_box;

fn normals(paths: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..paths).map(|_| StandardNormal.sample(&mut rng)).collect()
}

/// Log-Euler path of a Black-Scholes spot, priced as an arithmetic Asian call.
fn asian_call(
    graph: &Graph,
    spot: &DifferentiableRandomVariable,
    vol: &DifferentiableRandomVariable,
    shocks: &[Vec<f64>],
    dt: f64,
) -> DifferentiableRandomVariable {
    let drift = vol.squared().mult(-0.5 * dt).expect("drift");
    let diffusion = vol.mult(dt.sqrt()).expect("diffusion");
    let mut s = spot.clone();
    let mut sum = graph.constant(0.0);
    for (step, z) in shocks.iter().enumerate() {
        let z = graph.stochastic(step as f64 * dt, z.clone());
        let increment = diffusion.mult(&z).expect("shock").add(&drift).expect("log step");
        s = s.mult(&increment.exp()).expect("spot step");
        sum = sum.add(&s).expect("running sum");
    }
    sum.div(shocks.len() as f64)
        .expect("average")
        .sub(100.0)
        .expect("strike")
        .floor(0.0)
        .expect("payoff")
        .average()
}

fn bench_asian_build_and_backward(c: &mut Criterion) {
    const STEPS: usize = 12;
    let mut group = c.benchmark_group("aad_asian_call");
    for paths in [1_000usize, 10_000, 50_000] {
        let shocks: Vec<Vec<f64>> = (0..STEPS)
            .map(|step| normals(paths, 7 + step as u64))
            .collect();

        group.bench_with_input(BenchmarkId::new("build", paths), &shocks, |b, shocks| {
            b.iter(|| {
                let graph = Graph::new();
                let spot = graph.constant(100.0);
                let vol = graph.constant(0.2);
                black_box(asian_call(&graph, &spot, &vol, shocks, 1.0 / STEPS as f64))
            })
        });

        group.bench_with_input(BenchmarkId::new("build_and_gradient", paths), &shocks, |b, shocks| {
            b.iter(|| {
                let graph = Graph::new();
                let spot = graph.constant(100.0);
                let vol = graph.constant(0.2);
                let price = asian_call(&graph, &spot, &vol, shocks, 1.0 / STEPS as f64);
                let gradient = price.gradient().expect("gradient");
                black_box((
                    gradient.get(&spot).map(|d| d.average()),
                    gradient.get(&vol).map(|d| d.average()),
                ))
            })
        });
    }
    group.finish();
}

fn bench_deep_scalar_chain(c: &mut Criterion) {
    const DEPTH: usize = 10_000;
    c.bench_function("aad_deterministic_chain_10k", |b| {
        b.iter(|| {
            let graph = Graph::new();
            let x = graph.constant(0.5);
            let mut y = x.clone();
            for _ in 0..DEPTH {
                y = y.mult(&x).expect("mult").sin();
            }
            let gradient = y.gradient().expect("gradient");
            black_box(gradient.get(&x).and_then(|d| d.deterministic_value()))
        })
    });
}

criterion_group!(
    aad_benches,
    bench_asian_build_and_backward,
    bench_deep_scalar_chain
);
criterion_main!(aad_benches);
