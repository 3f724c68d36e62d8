//! Constant-status sentinels.

use cmdflow_types::error::ExecutionError;

use super::Command;

/// Always answers `true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTrue;

/// Always answers `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFalse;

impl<C> Command<C> for AlwaysTrue {
    fn execute(&self, _context: &mut C) -> Result<bool, ExecutionError> {
        Ok(true)
    }

    fn kind(&self) -> &'static str {
        "AlwaysTrue"
    }
}

impl<C> Command<C> for AlwaysFalse {
    fn execute(&self, _context: &mut C) -> Result<bool, ExecutionError> {
        Ok(false)
    }

    fn kind(&self) -> &'static str {
        "AlwaysFalse"
    }
}
