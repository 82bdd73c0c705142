// Device configuration and environment overrides.
//
// All env-var reads go through env_var_truthy / env_var_positive_usize so the
// parsing rules live in one place.

/// Default depth of the pending histogram events list.
pub const DEFAULT_EVENT_QUEUE_DEPTH: usize = 16;

const ENV_EVENT_QUEUE_DEPTH: &str = "DQE_EVENT_QUEUE_DEPTH";
const ENV_VERBOSE_HIST: &str = "DQE_VERBOSE_HIST";
const ENV_FORCE_DISABLED: &str = "DQE_FORCE_DISABLED";

/// Static configuration of a [`DqeDevice`](crate::dqe::DqeDevice).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DqeConfig {
    /// Maximum number of undelivered histogram events kept for polling.
    /// When full, the oldest event is dropped.
    pub event_queue_depth: usize,
    /// Log every delivered histogram at info level.
    pub verbose_hist: bool,
    /// Start with the enhancement block forced off.
    pub force_disabled: bool,
}

impl Default for DqeConfig {
    fn default() -> Self {
        Self {
            event_queue_depth: DEFAULT_EVENT_QUEUE_DEPTH,
            verbose_hist: false,
            force_disabled: false,
        }
    }
}

impl DqeConfig {
    /// Default configuration adjusted by `DQE_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            event_queue_depth: env_var_positive_usize(ENV_EVENT_QUEUE_DEPTH)
                .unwrap_or(defaults.event_queue_depth),
            verbose_hist: env_var_truthy(ENV_VERBOSE_HIST),
            force_disabled: env_var_truthy(ENV_FORCE_DISABLED),
        }
    }
}

/// Returns `true` when the environment variable is set to `1`, `true`, `yes`
/// or `on` (case-insensitive, trimmed).
fn env_var_truthy(var_name: &str) -> bool {
    std::env::var(var_name)
        .map(|raw| parse_truthy(&raw))
        .unwrap_or(false)
}

fn env_var_positive_usize(var_name: &str) -> Option<usize> {
    std::env::var(var_name)
        .ok()
        .and_then(|raw| parse_positive(&raw))
}

fn parse_truthy(raw: &str) -> bool {
    let normalized = raw.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}

fn parse_positive(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|value| *value > 0)
}
