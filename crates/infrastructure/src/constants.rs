// ── Paths ──────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/netguard/config.yaml";

// ── Replay ─────────────────────────────────────────────────────────

/// Longest frame accepted from a replay file (jumbo MTU plus link header).
pub const MAX_REPLAY_FRAME_LEN: usize = 9_216 + 14;

/// Frames read from one replay file before the run is aborted.
pub const MAX_REPLAY_FRAMES: usize = 1_000_000;

// ── Thresholds ─────────────────────────────────────────────────────

/// Fill ratio of the active stats map above which `check` warns.
pub const STATS_MAP_FILL_WARN_THRESHOLD: f32 = 0.80;
