//! CLI entry point for mangadl.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;
mod output;

/// Process outcome, mapped to the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Everything requested succeeded.
    Success,
    /// Fatal error before or outside the batch.
    Failure,
    /// Some chapters failed.
    Partial,
    /// Every selected chapter failed.
    TotalFailure,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
            Self::TotalFailure => 3,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let outcome = match app::runtime::run().await {
        Ok(outcome) => outcome,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ProcessExit::Failure
        }
    };
    ExitCode::from(outcome.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            ProcessExit::Success.code(),
            ProcessExit::Failure.code(),
            ProcessExit::Partial.code(),
            ProcessExit::TotalFailure.code(),
        ];
        assert_eq!(codes, [0, 1, 2, 3]);
    }
}
