// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::str::FromStr;

use strum::AsRefStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    Windows,
}

impl OperatingSystem {
    #[must_use]
    pub const fn executable_extension(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Linux => "",
        }
    }

    #[must_use]
    pub const fn object_extension(&self) -> &'static str {
        match self {
            Self::Linux => "o",
            Self::Windows => "obj",
        }
    }

    /// The output format passed to `nasm -f`.
    #[must_use]
    pub const fn nasm_format(&self) -> &'static str {
        match self {
            Self::Linux => "elf64",
            Self::Windows => "win64",
        }
    }

    #[must_use]
    pub const fn read_only_section(&self) -> &'static str {
        match self {
            Self::Linux => ".rodata",
            Self::Windows => ".rdata",
        }
    }
}

/// The convention used when calling into C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum CallingConvention {
    /// <https://learn.microsoft.com/en-us/cpp/build/x64-calling-convention>
    MicrosoftX64,

    /// <https://gitlab.com/x86-psABIs/x86-64-ABI>
    SystemV,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    operating_system: OperatingSystem,
    calling_convention: CallingConvention,
}

impl Platform {
    #[must_use]
    pub const fn linux() -> Self {
        Self::new(OperatingSystem::Linux, CallingConvention::SystemV)
    }

    #[must_use]
    pub const fn windows() -> Self {
        Self::new(OperatingSystem::Windows, CallingConvention::MicrosoftX64)
    }

    #[must_use]
    pub fn host_platform() -> Self {
        if cfg!(target_os = "windows") {
            Self::windows()
        } else {
            Self::linux()
        }
    }

    #[must_use]
    pub const fn new(operating_system: OperatingSystem, calling_convention: CallingConvention) -> Self {
        Self {
            operating_system,
            calling_convention,
        }
    }

    #[must_use]
    pub const fn operating_system(&self) -> OperatingSystem {
        self.operating_system
    }

    #[must_use]
    pub const fn calling_convention(&self) -> CallingConvention {
        self.calling_convention
    }

    #[must_use]
    pub const fn is_windows(&self) -> bool {
        matches!(self.operating_system, OperatingSystem::Windows)
    }
}

impl FromStr for Platform {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Self::linux()),
            "win" | "windows" => Ok(Self::windows()),
            _ => Err(PlatformParseError::Unknown(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformParseError {
    #[error("unknown platform `{0}`, expected `win` or `linux`")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("linux", OperatingSystem::Linux, CallingConvention::SystemV)]
    #[case("win", OperatingSystem::Windows, CallingConvention::MicrosoftX64)]
    #[case("windows", OperatingSystem::Windows, CallingConvention::MicrosoftX64)]
    fn parse_platform(#[case] input: &str, #[case] os: OperatingSystem, #[case] convention: CallingConvention) {
        let platform: Platform = input.parse().unwrap();
        assert_eq!(platform.operating_system(), os);
        assert_eq!(platform.calling_convention(), convention);
    }

    #[test]
    fn unknown_platform() {
        assert!("macos".parse::<Platform>().is_err());
    }
}
