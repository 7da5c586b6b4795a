use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Example YAML:
/// ```yaml
/// data_file: ~/comps/winter-league.json
/// color: auto
/// leaderboard:
///   show_completed: true
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where competition state is stored (default: ~/.config/boulder-tally/state.json)
    #[serde(default)]
    pub data_file: Option<String>,

    #[serde(default)]
    pub color: ColorMode,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Colors when stdout is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LeaderboardConfig {
    /// Show the completed-route count column
    #[serde(default = "default_true")]
    pub show_completed: bool,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            show_completed: true,
        }
    }
}

fn default_true() -> bool {
    true
}
