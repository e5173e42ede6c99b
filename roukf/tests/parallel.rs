use std::thread;

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use roukf::{
    FilterOptions, FilterSetup, LocalRank, OperatorStatus, Partition, RoukfFilter,
    SigmaDistribution,
};

/// Damped oscillator with unknown stiffness and damping.
fn oscillator(state: &mut [f64], parameters: &mut [f64]) -> OperatorStatus {
    let dt = 0.1;
    let (k, c) = (parameters[0], parameters[1]);
    let (x, v) = (state[0], state[1]);
    state[0] = x + dt * v;
    state[1] = v - dt * (k * x + c * v);
    OperatorStatus::Success
}

fn position(state: &[f64], z: &mut [f64]) {
    z[0] = state[0];
}

fn truth(steps: usize) -> Vec<f64> {
    let mut state = [1.0, 0.0];
    let mut params = [4.0, 0.3];
    (0..steps)
        .map(|_| {
            oscillator(&mut state, &mut params);
            state[0]
        })
        .collect()
}

fn setup(distribution: SigmaDistribution) -> FilterSetup<f64> {
    FilterSetup::new(1, 2, 2, vec![0.01, 0.01], vec![4.0, 0.25], distribution)
        .with_observation_uncertainty(vec![1e-4])
}

type Snapshot = (Vec<f64>, Vec<f64>, DMatrix<f64>);

fn run(mut filter: RoukfFilter, observations: &[f64]) -> Snapshot {
    filter.set_state(&[1.0, 0.0]).unwrap();
    filter.set_parameters(&[2.0, 0.0]).unwrap();
    for z in observations {
        filter.execute_step(&[*z], &oscillator, &position).unwrap();
    }
    (
        filter.state().unwrap(),
        filter.parameters().unwrap(),
        filter.covariance().unwrap(),
    )
}

#[test]
fn thread_count_does_not_change_the_estimate() {
    let observations = truth(20);
    for distribution in [SigmaDistribution::Canonic, SigmaDistribution::Simplex] {
        let serial = run(RoukfFilter::new(setup(distribution)).unwrap(), &observations);
        for threads in [2, 3, 4, 9] {
            for partition in [Partition::Contiguous, Partition::RoundRobin] {
                let options = FilterOptions::default()
                    .with_threads(threads)
                    .with_partition(partition);
                let filter = RoukfFilter::new(setup(distribution))
                    .unwrap()
                    .with_options(options)
                    .unwrap();
                assert_eq!(run(filter, &observations), serial, "{threads} threads, {partition:?}");
            }
        }
    }
}

#[test]
fn ranks_agree_with_a_single_process() {
    let observations = truth(15);
    let serial = run(
        RoukfFilter::new(setup(SigmaDistribution::Canonic)).unwrap(),
        &observations,
    );

    for size in [2, 3, 5] {
        let handles: Vec<_> = LocalRank::<f64>::group(size)
            .into_iter()
            .map(|comm| {
                let observations = observations.clone();
                thread::spawn(move || {
                    let options = FilterOptions::default().with_threads(2);
                    let filter = RoukfFilter::new(setup(SigmaDistribution::Canonic))
                        .unwrap()
                        .with_options(options)
                        .unwrap()
                        .with_communicator(comm);
                    let root = filter.is_root();
                    (root, run(filter, &observations))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|(root, _)| *root).count(), 1);
        for (_, snapshot) in &results {
            assert_eq!(snapshot, &serial, "{size} ranks");
        }
    }
}

#[test]
fn oscillator_parameters_are_recovered() {
    let observations = truth(150);
    let (_, params, _) = run(
        RoukfFilter::new(setup(SigmaDistribution::Simplex)).unwrap(),
        &observations,
    );
    assert_relative_eq!(params[0], 4.0, epsilon = 0.05);
    assert_relative_eq!(params[1], 0.3, epsilon = 0.05);
}
