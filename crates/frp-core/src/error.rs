//! Error type for misuse of the reactive primitives.

use thiserror::Error;

use crate::kind::Origin;

pub type Result<T> = std::result::Result<T, FrpError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrpError {
    /// `at` was asked to project a Behavior that has no discrete updates.
    #[error("behavior has no discrete updates to project (origin: {origin})")]
    NotStreamOrigin { origin: Origin },
}

impl FrpError {
    #[must_use]
    pub fn not_stream_origin(origin: Origin) -> Self {
        Self::NotStreamOrigin { origin }
    }

    /// The origin of the Behavior involved in the failed call.
    #[must_use]
    pub fn origin(&self) -> Origin {
        match self {
            Self::NotStreamOrigin { origin } => *origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_origin() {
        let err = FrpError::not_stream_origin(Origin::Function);
        assert_eq!(
            err.to_string(),
            "behavior has no discrete updates to project (origin: function)"
        );
        assert_eq!(err.origin(), Origin::Function);
    }
}
