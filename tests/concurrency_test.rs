use std::collections::HashSet;
use std::sync::mpsc;
use std::thread;

use ferric_rv::aad::{DifferentiableRandomVariable, Graph, NodeId, batch_gradients};

fn assert_arguments_precede(value: &DifferentiableRandomVariable) {
    for id in value.node().argument_ids().into_iter().flatten() {
        assert!(id < value.id(), "argument {id} not older than {}", value.id());
    }
}

#[test]
fn concurrent_construction_yields_unique_ordered_ids() {
    const THREADS: usize = 8;
    const STEPS: usize = 500;

    let graph = Graph::new();
    let seed = graph.stochastic(0.0, vec![0.1, 0.2, 0.3]);

    let chains: Vec<Vec<DifferentiableRandomVariable>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let seed = seed.clone();
                scope.spawn(move || {
                    let mut chain = Vec::with_capacity(STEPS);
                    let mut current = seed.mult(1.0 + t as f64).unwrap();
                    for _ in 0..STEPS {
                        let next = current.add(&seed).unwrap().sin();
                        chain.push(current);
                        current = next;
                    }
                    chain.push(current);
                    chain
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker should not panic"))
            .collect()
    });

    let mut seen: HashSet<NodeId> = HashSet::new();
    for chain in &chains {
        for value in chain {
            assert_arguments_precede(value);
            seen.insert(value.id());
        }
        for pair in chain.windows(2) {
            assert!(pair[0].id() < pair[1].id());
        }
    }
    // Each step records an add and a sin node; only the sin results are kept.
    assert_eq!(seen.len(), THREADS * (STEPS + 1));
    assert_eq!(graph.nodes_created() as usize, 1 + THREADS * (1 + 2 * STEPS));
}

#[test]
fn values_handed_across_threads_stay_older_than_their_consumers() {
    let graph = Graph::new();
    let (sender, receiver) = mpsc::channel();

    thread::scope(|scope| {
        let producer_graph = graph.clone();
        scope.spawn(move || {
            let mut x = producer_graph.constant(1.0);
            for _ in 0..100 {
                x = x.mult(1.01).unwrap();
                sender.send(x.clone()).expect("receiver alive");
            }
        });

        let consumer_graph = graph.clone();
        scope.spawn(move || {
            let offset = consumer_graph.constant(2.0);
            for received in receiver {
                let combined = received.add(&offset).unwrap();
                assert!(combined.id() > received.id());
                assert_arguments_precede(&combined);
            }
        });
    });
}

#[test]
fn gradients_of_concurrently_built_roots_are_independent() {
    let graph = Graph::new();
    let x = graph.stochastic(0.0, vec![0.5, 1.0, 2.0]);

    let roots: Vec<DifferentiableRandomVariable> = thread::scope(|scope| {
        let handles: Vec<_> = (1..=4)
            .map(|k| {
                let x = x.clone();
                scope.spawn(move || x.pow(k as f64))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker should not panic"))
            .collect()
    });

    let gradients = batch_gradients(&roots).unwrap();
    for (k, gradient) in (1..=4).zip(&gradients) {
        let k = k as f64;
        for (path, value) in [0.5_f64, 1.0, 2.0].into_iter().enumerate() {
            let expected = k * value.powf(k - 1.0);
            assert!((gradient.get(&x).unwrap().get(path) - expected).abs() < 1e-12);
        }
    }
}

#[test]
fn very_deep_chains_differentiate_and_drop_without_recursion() {
    const DEPTH: usize = 200_000;

    let graph = Graph::new();
    let x = graph.stochastic(0.0, vec![1.0, 2.0]);
    let mut y = x.clone();
    for _ in 0..DEPTH {
        y = y.add(1.0e-6).unwrap();
    }
    let gradient = y.gradient().unwrap();
    assert_eq!(gradient.get(&x).unwrap().to_vec(), vec![1.0, 1.0]);
    drop(y);
}
