//! Shared 1-D Newton/secant root-finder (spec.md §4.3/§4.4/§4.5).
//!
//! The basic, layer, and cluster step runners all solve the same shape of
//! problem: find `x` such that a monotone-decreasing scalar function
//! `force(x)` falls within `max_force_error` of zero, given `derivative(x)`.
//! This module factors out that search so each runner only supplies its own
//! evaluator.

use num_traits::Float;

/// Safety cap on the inner loops so a pathological, float-resolution-starved
/// input cannot hang instead of panicking (spec.md §4.3's "implementations
/// may treat these as bounded-iteration caps rather than panics").
const MAX_ITERATIONS: u32 = 256;

/// `(force, derivative)` at some point `x`, relative to whatever quantity
/// the caller is solving for (a potential, or a layer/cluster offset).
pub(crate) type Evaluation<F> = (F, F);

/// Runs the Newton-then-secant hybrid of spec.md §4.3 starting from
/// `start_x`, returning the accepted `x` once `|force(x)| <= max_force_error`.
///
/// `eval(x)` must return `(force, derivative)`; `force` is assumed monotone
/// non-increasing in `x` (so `derivative <= 0` throughout).
pub(crate) fn find_root<F: Float>(
    start_x: F,
    start_eval: Evaluation<F>,
    max_force_error: F,
    mut eval: impl FnMut(F) -> Evaluation<F>,
) -> F {
    let (start_force, start_derivative) = start_eval;
    let start_sign = start_force.is_sign_negative();

    let mut cur_x = start_x;
    let mut cur_force = start_force;
    let mut cur_derivative = start_derivative;

    let mut next_x = newton_step(cur_x, cur_force, cur_derivative);
    let (mut next_force, mut next_derivative) = eval(next_x);
    if next_force.abs() <= max_force_error {
        return next_x;
    }

    let mut guard = 0u32;
    while next_force.is_sign_negative() == start_sign {
        cur_x = next_x;
        cur_force = next_force;
        cur_derivative = next_derivative;
        next_x = newton_step(cur_x, cur_force, cur_derivative);
        let (f, d) = eval(next_x);
        next_force = f;
        next_derivative = d;
        debug_assert!(cur_x != next_x, "Newton step stalled without converging");
        if next_force.abs() <= max_force_error {
            return next_x;
        }
        guard += 1;
        if guard >= MAX_ITERATIONS {
            return next_x;
        }
    }

    // `cur_x` and `next_x` now bracket the root (opposite signs).
    loop {
        let mid_x = cur_x - cur_force * (next_x - cur_x) / (next_force - cur_force);
        let (mid_force, mid_derivative) = eval(mid_x);
        debug_assert!(mid_x != cur_x && mid_x != next_x, "secant step stalled");
        if mid_force.abs() <= max_force_error {
            return mid_x;
        }
        if mid_force.is_sign_negative() == start_sign {
            cur_x = mid_x;
            cur_force = mid_force;
            let _ = mid_derivative;
        } else {
            next_x = mid_x;
            next_force = mid_force;
        }
        guard += 1;
        if guard >= MAX_ITERATIONS {
            return mid_x;
        }
    }
}

fn newton_step<F: Float>(x: F, force: F, derivative: F) -> F {
    x - force / derivative
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `force(x) = -2x + 10`, root at `x = 5`, derivative constant `-2`.
    #[test]
    fn converges_on_a_linear_function() {
        let eval = |x: f64| (-2.0 * x + 10.0, -2.0);
        let start = eval(0.0);
        let root = find_root(0.0, start, 1e-9, eval);
        assert!((root - 5.0).abs() < 1e-6);
    }

    /// A kinked, piecewise-linear monotone function like the node force law.
    #[test]
    fn converges_on_a_piecewise_linear_function() {
        let eval = |x: f64| {
            if x >= 1.0 {
                (-1.0 * (x - 1.0) - 3.0, -1.0)
            } else {
                (-5.0 * (x - 1.0) - 3.0, -5.0)
            }
        };
        let start = eval(0.0);
        let root = find_root(0.0, start, 1e-9, eval);
        let (force, _) = eval(root);
        assert!(force.abs() <= 1e-9);
    }
}
