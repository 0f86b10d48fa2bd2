//! Centralized constants for the mission engine.
//!
//! Scoring and tier defaults live here so every deployment starts from the
//! same numbers; per-deployment overrides go through `MissionConfig`.

// Scoring ------------------------------------------------------------------
pub(crate) const DEFAULT_SCORE_STEP: i32 = 10;
pub(crate) const CONVENTIONAL_SCORES: [i32; 3] = [-10, 0, 10];
pub(crate) const MAX_SCORE_STEP: i32 = 100;
pub(crate) const MAX_ABS_CHOICE_SCORE: i32 = 100;

// Tier defaults ------------------------------------------------------------
pub(crate) const DEFAULT_HIGH_THRESHOLD: u8 = 80;
pub(crate) const DEFAULT_MEDIUM_THRESHOLD: u8 = 50;
pub(crate) const DEFAULT_HIGH_MESSAGE: &str = "Mission accomplished! Your responses matched the plan almost every time. The wizard is beaming.";
pub(crate) const DEFAULT_MEDIUM_MESSAGE: &str = "Solid effort. Several choices followed the plan, but a few drifted. Review the feedback and try again.";
pub(crate) const DEFAULT_LOW_MESSAGE: &str = "The plan got away from you this time. Revisit the reinforcement strategies and give it another go.";

// Node labels --------------------------------------------------------------
pub(crate) const DEFAULT_PLAY_AGAIN_LABEL: &str = "Play again";

// PRNG ---------------------------------------------------------------------
pub(crate) const XORSHIFT_DEFAULT_SEED: u32 = 2_463_534_242;
pub(crate) const XORSHIFT_SCALE: f64 = 4_294_967_296.0;

// Session ids --------------------------------------------------------------
pub(crate) const SESSION_SUFFIX_LEN: usize = 6;
pub(crate) const SESSION_SUFFIX_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// Stream derivation --------------------------------------------------------
pub(crate) const DISPLAY_STREAM_TAG: &[u8] = b"display";

// Lineup defaults ----------------------------------------------------------
pub(crate) const DEFAULT_LINEUP: [(&str, usize); 3] = [("daily", 2), ("crisis", 1), ("wildcard", 1)];
