//! Operation Selector
//!
//! Maps the selected import option to the chain or operation to run.

use crate::models::{ImportOption, OperationTarget, CHAIN_ID_PROPERTY, OPERATION_ID_PROPERTY};

/// Resolve the automation target of an import option
///
/// **Resolution order:**
/// 1. `chainId` property
/// 2. `operationId` property
/// 3. the option's own id, as an operation id
///
/// A present-but-empty property still wins; the runner rejects it later.
pub fn resolve_target(option: &ImportOption) -> OperationTarget {
    let target = option
        .property(CHAIN_ID_PROPERTY)
        .or_else(|| option.property(OPERATION_ID_PROPERTY))
        .unwrap_or(option.id.as_str());

    tracing::debug!(option = %option.id, resolved = %target, "Resolved import target");
    OperationTarget::new(target)
}
