use thiserror::Error;

use crate::generator::GenerationError;
use crate::model::{AnswerError, OperationError, SessionResultError, SettingsError};

/// Any error raised by the core crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    SessionResult(#[from] SessionResultError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Operation, parse_answer};

    fn parse_pair(op: &str, raw: &str) -> Result<(Operation, f64), Error> {
        Ok((op.parse()?, parse_answer(raw)?))
    }

    #[test]
    fn component_errors_convert() {
        assert!(matches!(
            parse_pair("modulo", "1"),
            Err(Error::Operation(OperationError::UnknownOperation(_)))
        ));
        assert!(matches!(
            parse_pair("addition", "x"),
            Err(Error::Answer(_))
        ));
        assert_eq!(parse_pair("+", " 7 ").unwrap().1, 7.0);
    }
}
