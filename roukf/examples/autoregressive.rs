//! Estimate the coefficient of a noisy first-order autoregressive process.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roukf::{
    Convergence, FilterOptions, FilterSetup, OperatorStatus, RoukfFilter, SigmaDistribution,
};

fn main() -> roukf::Result<()> {
    env_logger::init();

    let true_rate = 0.85;
    let noise = 0.01;
    let mut rng = StdRng::seed_from_u64(7);

    let setup = FilterSetup::new(1, 1, 1, vec![0.1], vec![1.0], SigmaDistribution::Canonic)
        .with_observation_uncertainty(vec![noise * noise]);
    let mut filter = RoukfFilter::new(setup)?.with_options(
        FilterOptions::default()
            .with_convergence_tolerance(1e-6)
            .with_max_iterations(200),
    )?;
    filter.set_state(&[2.0])?;
    filter.set_parameters(&[0.5])?;

    let forward = |x: &mut [f64], a: &mut [f64]| {
        x[0] = a[0] * x[0] + 0.5;
        OperatorStatus::Success
    };
    let observe = |x: &[f64], z: &mut [f64]| z[0] = x[0];

    let mut truth = 2.0;
    while !filter.iterations_exhausted() {
        truth = true_rate * truth + 0.5;
        let measured = truth + rng.gen_range(-noise..noise);
        let status = filter.execute_step(&[measured], &forward, &observe)?;

        if status.iteration() % 20 == 0 {
            println!(
                "step {:3}: rate = {:.5} ± {:.5}, |innovation| = {:.2e}",
                status.iteration(),
                filter.parameters()?[0],
                filter.parameter_std()?[0],
                status.error()
            );
        }
        if filter.has_converged(Convergence::Relative) {
            println!("converged after {} steps", status.iteration());
            break;
        }
    }

    println!("estimated rate {:.5} (true {true_rate})", filter.parameters()?[0]);
    Ok(())
}
