use ordered_float::OrderedFloat;
use serde::Serialize;
use std::fmt;

use crate::config::{AxisRole, ParameterDeclaration};
use crate::data::decoder::ObservationDescriptor;
use crate::error::ConfigError;

/// Parameter indices of one operation, split by axis role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AxisRoles {
    pub x: usize,
    /// Declaration order; this is also the label order of series keys.
    pub series: Vec<usize>,
    pub page: Vec<usize>,
}

/// Route every parameter index to its role. `operation` only shows up in errors.
pub fn classify(operation: &str, params: &[ParameterDeclaration]) -> Result<AxisRoles, ConfigError> {
    let mut x: Option<usize> = None;
    let mut series = Vec::new();
    let mut page = Vec::new();

    for (i, p) in params.iter().enumerate() {
        match p.role {
            AxisRole::X => {
                if let Some(first) = x {
                    return Err(ConfigError::MultipleXAxes {
                        operation: operation.to_string(),
                        first: params[first].name.clone(),
                        second: p.name.clone(),
                    });
                }
                x = Some(i);
            }
            AxisRole::Series => series.push(i),
            AxisRole::Page => page.push(i),
        }
    }

    let x = x.ok_or_else(|| ConfigError::NoXAxis(operation.to_string()))?;
    Ok(AxisRoles { x, series, page })
}

/// A parameter name and the value it had for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParamValue {
    pub name: String,
    pub value: OrderedFloat<f64>,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Identity of a page or a series. Compared and hashed by value, so two
/// keys built from the same names and values always land in the same group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AxisKey(Vec<ParamValue>);

impl AxisKey {
    /// The key of a level with no parameters.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, value)| ParamValue {
                    name: name.into(),
                    value: OrderedFloat(value),
                })
                .collect(),
        )
    }

    /// `(name, value)` for each index of `indices`, in that order.
    pub fn build(
        descriptor: &ObservationDescriptor,
        params: &[ParameterDeclaration],
        indices: &[usize],
    ) -> Self {
        Self(
            indices
                .iter()
                .map(|&i| ParamValue {
                    name: params[i].name.clone(),
                    value: OrderedFloat(descriptor.values()[i]),
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[ParamValue] {
        &self.0
    }

    /// Legend/heading text; `None` for the unlabeled default group.
    pub fn label(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for AxisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pv) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", pv)?;
        }
        Ok(())
    }
}
