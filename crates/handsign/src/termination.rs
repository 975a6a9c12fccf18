//! Defines the [`Termination`] trait.

use std::{convert::Infallible, fmt::Debug, process};

/// Extends [`std::process::Termination`] with a way to inspect the outcome.
///
/// The window event loop owns the main thread and never returns, so the process is exited from the
/// application thread instead, with a status code derived from the value returned by the user's
/// `main` function.
pub trait Termination: process::Termination {
    fn is_success(&self) -> bool;
}

impl Termination for Infallible {
    fn is_success(&self) -> bool {
        match *self {}
    }
}

impl Termination for () {
    fn is_success(&self) -> bool {
        true
    }
}

impl<T: Termination, E: Debug> Termination for Result<T, E> {
    fn is_success(&self) -> bool {
        match self {
            Ok(term) => term.is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_report_outcome() {
        assert!(().is_success());
        assert!(Ok::<(), anyhow::Error>(()).is_success());
        assert!(!Err::<(), _>(anyhow::anyhow!("camera unplugged")).is_success());
        assert!(!Ok::<Result<(), &str>, &str>(Err("nested")).is_success());
    }
}
