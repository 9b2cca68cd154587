use thiserror::Error;

/// Contract violations raised by kernel operations.
///
/// These are programming errors on the caller's side (bad dimensions, duplicate
/// or out-of-range ids, a variable in the wrong basic/nonbasic role) or a request
/// that needs a factorized basis when none exists. Numerically meaningful outcomes
/// such as a singular basis are reported through typed statuses instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LpError {
    #[error("{op}: {msg}")]
    InvariantViolation { op: &'static str, msg: String },
    #[error("{op}: LP basis is not available")]
    BasisUnavailable { op: &'static str },
}

impl LpError {
    pub(crate) fn invalid(op: &'static str, msg: impl Into<String>) -> Self {
        LpError::InvariantViolation { op, msg: msg.into() }
    }

    /// Name of the operation that rejected its input.
    pub fn op(&self) -> &'static str {
        match self {
            LpError::InvariantViolation { op, .. } | LpError::BasisUnavailable { op } => op,
        }
    }
}

pub type LpResult<T> = Result<T, LpError>;

/// Return an `InvariantViolation` from the enclosing function unless `cond` holds.
macro_rules! ensure {
    ($cond:expr, $op:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::LpError::invalid($op, format!($($arg)+)));
        }
    };
}

pub(crate) use ensure;
