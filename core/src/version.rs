//! Version information for the console
//!
//! This module provides version constants for banners and the dashboard.

/// Console version (semver format)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Major version (breaking changes)
pub const VERSION_MAJOR: u32 = 0;

/// Minor version (new features)
pub const VERSION_MINOR: u32 = 1;

/// Patch version (bug fixes)
pub const VERSION_PATCH: u32 = 0;

/// Git commit hash (if available)
pub const GIT_HASH: Option<&str> = option_env!("GIT_HASH");

/// Build profile (debug/release)
pub const BUILD_PROFILE: &str = if cfg!(debug_assertions) {
    "debug"
} else {
    "release"
};

/// First eight characters of a commit hash
fn short_hash(hash: &str) -> String {
    hash.chars().take(8).collect()
}

/// Full version string with metadata
pub fn version_string() -> String {
    let mut version = format!("Console v{}", VERSION);

    if let Some(hash) = GIT_HASH {
        version.push_str(&format!(" ({})", short_hash(hash)));
    }

    if BUILD_PROFILE == "debug" {
        version.push_str(" [debug]");
    }

    version
}
