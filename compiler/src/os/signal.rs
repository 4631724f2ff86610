// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use thiserror::Error;

/// A signal that terminated a compiled program, numbered as on Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Signal {
    #[error("unknown signal {0}")]
    Other(i32),

    #[error("terminal line hangup")]
    SIGHUP,

    #[error("interrupt program")]
    SIGINT,

    #[error("quit program")]
    SIGQUIT,

    #[error("illegal instruction")]
    SIGILL,

    #[error("trace trap")]
    SIGTRAP,

    #[error("abort program")]
    SIGABRT,

    #[error("bus error")]
    SIGBUS,

    #[error("floating-point exception, such as a division by zero")]
    SIGFPE,

    #[error("kill program")]
    SIGKILL,

    #[error("User defined signal 1")]
    SIGUSR1,

    #[error("segmentation violation, such as a null pointer dereference")]
    SIGSEGV,

    #[error("User defined signal 2")]
    SIGUSR2,

    #[error("write on a pipe with no reader")]
    SIGPIPE,

    #[error("real-time timer expired")]
    SIGALRM,

    #[error("software termination signal")]
    SIGTERM,
}

impl Signal {
    #[must_use]
    pub const fn new(num: i32) -> Self {
        match num {
            1 => Self::SIGHUP,
            2 => Self::SIGINT,
            3 => Self::SIGQUIT,
            4 => Self::SIGILL,
            5 => Self::SIGTRAP,
            6 => Self::SIGABRT,
            7 => Self::SIGBUS,
            8 => Self::SIGFPE,
            9 => Self::SIGKILL,
            10 => Self::SIGUSR1,
            11 => Self::SIGSEGV,
            12 => Self::SIGUSR2,
            13 => Self::SIGPIPE,
            14 => Self::SIGALRM,
            15 => Self::SIGTERM,

            _ => Self::Other(num),
        }
    }
}

impl From<i32> for Signal {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(8, Signal::SIGFPE)]
    #[case(11, Signal::SIGSEGV)]
    #[case(64, Signal::Other(64))]
    fn numbers(#[case] num: i32, #[case] expected: Signal) {
        assert_eq!(Signal::new(num), expected);
    }
}
