//! Drive a filter from a JSON description.
//!
//! ```text
//! cargo run --example from_config -- roukf/examples/data/decay.json
//! ```

use std::env;

use roukf::{Convergence, FilterConfig, OperatorStatus};

fn main() -> roukf::Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/examples/data/decay.json").into());
    let config = FilterConfig::from_path(&path)?;
    let mut filter = config.build()?;
    let target = config.observations()?.to_vec();

    // the state relaxes towards the parameter at rate one half
    let forward = |x: &mut [f64], p: &mut [f64]| {
        x[0] += 0.5 * (p[0] - x[0]);
        OperatorStatus::Success
    };
    let observe = |x: &[f64], z: &mut [f64]| z[0] = x[0];

    while !filter.has_converged(Convergence::Absolute) && !filter.iterations_exhausted() {
        filter.execute_step(&target, &forward, &observe)?;
    }

    println!(
        "after {} steps: state {:?}, parameters {:?} ± {:?}",
        filter.iteration(),
        filter.state()?,
        filter.parameters()?,
        filter.parameter_std()?
    );
    Ok(())
}
