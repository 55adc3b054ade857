//! Release channels.
//!
//! The channel decides the Windows application user model ID and the
//! profile directory name the browser is expected to run with.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, CoordinatorErrorKind};

/// Release track of the running build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Nightly builds.
    Nightly,
    /// Developer preview builds.
    Developer,
    /// Beta builds.
    Beta,
    /// Local development builds.
    ///
    /// This channel never gets its profile directory normalized.
    Dev,
    /// Stable release builds.
    #[default]
    Release,
}

impl Channel {
    /// All channels in a fixed order.
    pub const ALL: [Channel; 5] = [
        Self::Nightly,
        Self::Developer,
        Self::Beta,
        Self::Dev,
        Self::Release,
    ];

    /// Returns the lowercase channel name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nightly => "nightly",
            Self::Developer => "developer",
            Self::Beta => "beta",
            Self::Dev => "dev",
            Self::Release => "release",
        }
    }

    /// Returns the application user model ID set on the process before the
    /// application shell finishes launching.
    pub fn app_user_model_id(&self) -> &'static str {
        match self {
            Self::Nightly => "com.squirrel.BraveNightly.BraveNightly",
            Self::Developer => "com.squirrel.BraveDeveloper.BraveDeveloper",
            Self::Beta => "com.squirrel.BraveBeta.BraveBeta",
            Self::Dev | Self::Release => "com.squirrel.brave.Brave",
        }
    }

    /// Returns the `--user-data-dir-name=brave-<channel>` switch.
    pub fn user_data_dir_switch(&self) -> String {
        format!("--user-data-dir-name=brave-{}", self.as_str())
    }

    /// Returns whether the channel is exempt from profile normalization.
    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = CoordinatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.as_str() == s)
            .ok_or_else(|| {
                CoordinatorError::new(CoordinatorErrorKind::InvalidChannel)
                    .with_context(format!("unknown channel {s:?}"))
            })
    }
}

/// Source of the release channel for the current build.
///
/// The coordinator asks exactly once per invocation.
pub trait ChannelResolver {
    /// Returns the channel of the running build.
    fn channel(&self) -> Channel;
}

impl ChannelResolver for Channel {
    fn channel(&self) -> Channel {
        *self
    }
}

impl<F> ChannelResolver for F
where
    F: Fn() -> Channel,
{
    fn channel(&self) -> Channel {
        self()
    }
}
