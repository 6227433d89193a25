//! Runtime configuration read from the environment at start-up

use std::path::PathBuf;
use std::str::FromStr;

use crate::answer::matcher::{DEFAULT_ACCEPT_THRESHOLD, DEFAULT_GUESS_TOLERANCE};
use crate::answer::AnswerMatcher;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CONTENT_PATH: &str = "data/content.json";
/// Longest accepted time budget (one week)
pub const MAX_TIME_LIMIT_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Timing of a mini-game session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub countdown_seconds: u64,
    /// How long clients show feedback before the next question appears
    pub feedback_window_ms: u64,
    /// Time budget of the active phase, `None` for unlimited
    pub time_limit_seconds: Option<u64>,
    /// Delay between the results screen and the redirect
    pub game_over_delay_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 3,
            feedback_window_ms: 500,
            time_limit_seconds: None,
            game_over_delay_seconds: 5,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut time_limit = env_or("GAME_TIME_LIMIT_SECONDS", 0u64);
        if time_limit > MAX_TIME_LIMIT_SECONDS {
            tracing::warn!(
                "GAME_TIME_LIMIT_SECONDS={} too large, capping at {}",
                time_limit,
                MAX_TIME_LIMIT_SECONDS
            );
            time_limit = MAX_TIME_LIMIT_SECONDS;
        }
        Self {
            countdown_seconds: env_or("COUNTDOWN_SECONDS", defaults.countdown_seconds),
            feedback_window_ms: env_or("FEEDBACK_WINDOW_MS", defaults.feedback_window_ms),
            time_limit_seconds: (time_limit > 0).then_some(time_limit),
            game_over_delay_seconds: env_or(
                "GAME_OVER_DELAY_SECONDS",
                defaults.game_over_delay_seconds,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub content_path: PathBuf,
    pub accept_threshold: f64,
    pub guess_tolerance: f64,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            content_path: PathBuf::from(DEFAULT_CONTENT_PATH),
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            guess_tolerance: DEFAULT_GUESS_TOLERANCE,
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let content_path = std::env::var("CONTENT_PATH")
            .ok()
            .and_then(|p| {
                let trimmed = p.trim();
                (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
            })
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_PATH));

        let accept_threshold = env_finite("ANSWER_ACCEPT_THRESHOLD", DEFAULT_ACCEPT_THRESHOLD);
        if !(0.0..=1.0).contains(&accept_threshold) {
            tracing::warn!(
                "ANSWER_ACCEPT_THRESHOLD={} outside [0, 1], clamping",
                accept_threshold
            );
        }

        Self {
            port: env_or("QUIZPARTY_PORT", DEFAULT_PORT),
            content_path,
            accept_threshold,
            guess_tolerance: env_finite("GUESS_TOLERANCE", DEFAULT_GUESS_TOLERANCE),
            session: SessionConfig::from_env(),
        }
    }

    pub fn matcher(&self) -> AnswerMatcher {
        AnswerMatcher::new(self.accept_threshold, self.guess_tolerance)
    }
}

/// Parse an env var, keeping the default when unset or invalid
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid {}={:?}, using default {}", key, raw, default);
                default
            }
        },
        _ => default,
    }
}

/// Like [`env_or`], but NaN and infinities count as invalid
fn env_finite(key: &str, default: f64) -> f64 {
    let value = env_or(key, default);
    if value.is_finite() {
        value
    } else {
        tracing::warn!("Invalid {}={}, using default {}", key, value, default);
        default
    }
}
