//! VQE on a 2-qubit transverse-field Ising model.
//!
//! H = −Z₀Z₁ − 0.5·(X₀ + X₁), whose ground energy is −√2.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use alsvid_adapter_sim::StatevectorBackend;
use alsvid_eval::GradientMethod;
use alsvid_expr::Expr;
use alsvid_vqe::{EfficientAnsatz, Eigenstate, GradientDescent, Vqe};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let hamiltonian = Expr::pauli_sum(&[(-1.0, "ZZ"), (-0.5, "XI"), (-0.5, "IX")])?;
    println!("H = {hamiltonian}");

    let mut vqe = Vqe::new(
        EfficientAnsatz::new(2, 1),
        GradientDescent::new(300).with_learning_rate(0.2),
        StatevectorBackend::new(),
    )
    .with_operator(hamiltonian)
    .with_gradient(GradientMethod::ParameterShift)
    .with_aux_operator("magnetization", Expr::pauli_sum(&[(0.5, "ZI"), (0.5, "IZ")])?)
    .with_seed(1234)
    .with_callback(Box::new(|count, _params, mean, _std| {
        if count % 25 == 0 {
            println!("  eval {count:4}: E = {mean:+.6}");
        }
    }));

    let outcome = vqe.run()?;

    println!();
    println!("optimal energy : {:+.6}", outcome.optimal_value);
    println!("exact energy   : {:+.6}", -(2.0_f64).sqrt());
    println!("evaluations    : {}", outcome.cost_function_evals);
    println!("optimizer time : {:?}", outcome.optimizer_time);
    for (name, value) in &outcome.aux_values {
        println!("⟨{name}⟩ = {value:+.6}");
    }
    if let Eigenstate::Vector(amplitudes) = &outcome.eigenstate {
        println!("eigenstate amplitudes:");
        for (i, amp) in amplitudes.iter().enumerate() {
            if amp.norm_sqr() > 1e-6 {
                println!("  |{i:02b}⟩: {amp:.4}");
            }
        }
    }

    Ok(())
}
