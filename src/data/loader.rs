use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::config::ParameterDeclaration;
use crate::data::axis::{classify, AxisRoles};
use crate::data::utils::combination_count;
use crate::error::Result;

/// A benchmark operation as declared in a JSON file: identity and parameters,
/// no body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationDecl {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParameterDeclaration>,
}

/// What a declaration turns into without running anything.
#[derive(Clone, Debug, PartialEq)]
pub struct DeclSummary {
    pub roles: AxisRoles,
    pub invocations: usize,
}

impl OperationDecl {
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Check axis roles and sweep bounds.
    pub fn validate(&self) -> Result<DeclSummary> {
        let roles = classify(&self.qualified_name(), &self.params)?;
        let invocations = combination_count(&self.params)?;
        Ok(DeclSummary { roles, invocations })
    }
}

/// Load a JSON array of operation declarations.
pub fn load_operations(path: impl AsRef<Path>) -> Result<Vec<OperationDecl>> {
    let file = File::open(path)?;
    let decls: Vec<OperationDecl> = serde_json::from_reader(file)?;
    Ok(decls)
}
