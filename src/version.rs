//! Build and version information reported by `--version`.

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;

/// Value of the `--version` flag. A bare `--version` means `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum VersionFlag {
    #[default]
    False,
    True,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_date: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

/// Version of the running binary. `GIT_COMMIT` and `BUILD_DATE` are read
/// from the build environment when set.
pub fn get() -> VersionInfo {
    VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        git_commit: option_env!("GIT_COMMIT").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (commit {}, built {}, {}/{})",
            self.name, self.version, self.git_commit, self.build_date, self.os, self.arch
        )
    }
}

/// Text to print for the flag, or `None` when startup should continue.
pub fn render(flag: VersionFlag) -> Option<String> {
    let info = get();
    match flag {
        VersionFlag::False => None,
        VersionFlag::True => Some(info.to_string()),
        VersionFlag::Raw => Some(format!("{:#?}", info)),
    }
}
