use itertools::Itertools;

use crate::config::ParameterDeclaration;
use crate::error::ConfigError;

/// Upper bound on the invocations of one sweep, per parameter and overall.
pub const MAX_INVOCATIONS: usize = 10_000_000;

/// How many values `param` takes, computed without materializing them.
pub fn value_count(param: &ParameterDeclaration) -> Result<usize, ConfigError> {
    let ParameterDeclaration { from, to, step, .. } = *param;
    if !(from.is_finite() && to.is_finite() && step.is_finite()) || step <= 0.0 || from > to {
        return Err(ConfigError::SweepBounds {
            name: param.name.clone(),
            from,
            to,
            step,
        });
    }
    // tolerate accumulated error so `0.1..=0.5 step 0.1` still reaches 0.5
    let steps = ((to - from) / step + 1e-9).floor();
    if steps >= MAX_INVOCATIONS as f64 {
        return Err(ConfigError::SweepTooLarge {
            name: param.name.clone(),
            limit: MAX_INVOCATIONS,
        });
    }
    Ok(steps as usize + 1)
}

/// Values a parameter takes during a sweep: `from, from + step, ...` up to
/// and including `to`.
pub fn sweep_values(param: &ParameterDeclaration) -> Result<Vec<f64>, ConfigError> {
    let n = value_count(param)?;
    Ok((0..n).map(|i| param.from + i as f64 * param.step).collect())
}

/// Cartesian product of every parameter's sweep values, first declared
/// parameter outermost. An operation without parameters runs once.
pub fn build_combinations(params: &[ParameterDeclaration]) -> Result<Vec<Vec<f64>>, ConfigError> {
    combination_count(params)?;
    if params.is_empty() {
        return Ok(vec![Vec::new()]);
    }
    let ranges = params
        .iter()
        .map(sweep_values)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ranges.into_iter().multi_cartesian_product().collect())
}

/// Number of invocations one sweep over `params` performs.
pub fn combination_count(params: &[ParameterDeclaration]) -> Result<usize, ConfigError> {
    let total = params
        .iter()
        .map(value_count)
        .fold_ok(Some(1usize), |acc, n| acc.and_then(|a| a.checked_mul(n)))?;
    match total {
        Some(n) if n <= MAX_INVOCATIONS => Ok(n),
        _ => Err(ConfigError::SweepTooLarge {
            name: params.iter().map(|p| p.name.as_str()).join(" x "),
            limit: MAX_INVOCATIONS,
        }),
    }
}
