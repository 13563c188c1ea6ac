//! Detects whether dx may draw spinners and styled output

use std::io::IsTerminal;

/// Environment variables set by common CI providers
const CI_VARS: [&str; 9] = [
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
];

/// Output behavior for one dx invocation
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment.
    ///
    /// All UI goes to stderr, so stderr decides; stdout belongs to the
    /// dispatched command and may well be piped.
    pub fn detect() -> Self {
        let in_ci = CI_VARS.iter().any(|v| std::env::var_os(v).is_some());
        Self {
            interactive: std::io::stderr().is_terminal() && !in_ci,
        }
    }

    /// Plain output regardless of the terminal
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Whether to draw spinners and styled logs
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
