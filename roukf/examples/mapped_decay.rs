//! Recover a positive decay constant and a bounded source term, each
//! estimated in an unconstrained space.

use roukf::{
    CompositeMapper, ExponentialMapper, FailurePolicy, FilterOptions, FilterSetup,
    OperatorStatus, RoukfFilter, SigmaDistribution, SigmoidMapper,
};

const DT: f64 = 0.05;

/// dx/dt = -lambda x + s, one explicit Euler step.
fn step(x: f64, lambda: f64, source: f64) -> f64 {
    x + DT * (source - lambda * x)
}

fn main() -> roukf::Result<()> {
    env_logger::init();

    let (true_lambda, true_source) = (1.7, 0.4);
    let mapper = CompositeMapper::new()
        .with_block(1, ExponentialMapper)
        .with_block(1, SigmoidMapper::new(0.0, 1.0).expect("valid bounds"));

    let setup = FilterSetup::new(1, 1, 2, vec![0.0], vec![1.0, 1.0], SigmaDistribution::Simplex)
        .with_observation_uncertainty(vec![1e-6]);
    let mut filter = RoukfFilter::new(setup)?
        .with_options(FilterOptions::default().with_failure_policy(FailurePolicy::DropAndRenormalize))?
        .with_parameter_mapper(mapper)?;
    filter.set_state(&[2.0])?;
    filter.set_parameters(&[0.5, 0.5])?;

    let forward = |x: &mut [f64], p: &mut [f64]| {
        x[0] = step(x[0], p[0], p[1]);
        OperatorStatus::from(x[0].is_finite())
    };
    let observe = |x: &[f64], z: &mut [f64]| z[0] = x[0];

    let mut truth = 2.0;
    for _ in 0..200 {
        truth = step(truth, true_lambda, true_source);
        let status = filter.execute_step(&[truth], &forward, &observe)?;
        if status.is_degraded() {
            println!("step {}: dropped {:?}", status.iteration(), status.failed_points());
        }
    }

    let p = filter.parameters()?;
    println!("lambda = {:.4} (true {true_lambda})", p[0]);
    println!("source = {:.4} (true {true_source})", p[1]);
    Ok(())
}
