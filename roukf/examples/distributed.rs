//! Run one filter per rank of an in-process group; every rank propagates
//! its share of the sigma points on two threads.

use std::thread;

use roukf::{FilterOptions, FilterSetup, LocalRank, OperatorStatus, RoukfFilter, SigmaDistribution};

const RANKS: usize = 3;

fn logistic(x: &mut [f64], p: &mut [f64]) -> OperatorStatus {
    x[0] += 0.1 * p[0] * x[0] * (1.0 - x[0] / p[1]);
    OperatorStatus::Success
}

fn observe(x: &[f64], z: &mut [f64]) {
    z[0] = x[0];
}

fn main() {
    env_logger::init();

    let mut truth = vec![0.1];
    let mut true_params = vec![0.8, 5.0];
    let observations: Vec<f64> = (0..120)
        .map(|_| {
            logistic(&mut truth, &mut true_params);
            truth[0]
        })
        .collect();

    let handles: Vec<_> = LocalRank::<f64>::group(RANKS)
        .into_iter()
        .map(|comm| {
            let observations = observations.clone();
            thread::spawn(move || -> roukf::Result<Option<Vec<f64>>> {
                let setup = FilterSetup::new(1, 1, 2, vec![0.01], vec![0.25, 4.0], SigmaDistribution::Canonic)
                    .with_observation_uncertainty(vec![1e-6]);
                let mut filter = RoukfFilter::new(setup)?
                    .with_options(FilterOptions::default().with_threads(2))?
                    .with_communicator(comm);
                filter.set_state(&[0.1])?;
                filter.set_parameters(&[0.5, 3.0])?;

                for z in &observations {
                    filter.execute_step(&[*z], &logistic, &observe)?;
                }
                if filter.is_root() {
                    Ok(Some(filter.parameters()?))
                } else {
                    Ok(None)
                }
            })
        })
        .collect();

    for handle in handles {
        match handle.join() {
            Ok(Ok(Some(params))) => {
                println!("growth rate {:.4}, capacity {:.4}", params[0], params[1])
            }
            Ok(Ok(None)) => {}
            Ok(Err(err)) => eprintln!("rank failed: {err}"),
            Err(_) => eprintln!("rank panicked"),
        }
    }
}
