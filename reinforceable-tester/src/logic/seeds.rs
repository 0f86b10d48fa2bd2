use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use regex::Regex;
use reinforceable_game::seed_from_date;
use std::collections::HashSet;
use std::sync::LazyLock;

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid date regex"));

/// Daily seed plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u32,
    pub date: Option<NaiveDate>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u32) -> Self {
        Self { seed, date: None }
    }

    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            seed: seed_from_date(date),
            date: Some(date),
        }
    }

    /// Human label: the date when known, otherwise the raw seed.
    #[must_use]
    pub fn label(&self) -> String {
        self.date
            .map_or_else(|| format!("seed {}", self.seed), |date| date.to_string())
    }
}

/// Resolve CLI date tokens into daily seeds.
///
/// Supports `today`, `YYYY-MM-DD` (month and day may be unpadded) and literal
/// non-negative 32-bit integers. Duplicate seeds keep their first occurrence; no tokens means today.
pub fn resolve_seed_inputs(tokens: &[String], today: NaiveDate) -> Result<Vec<SeedInfo>> {
    let mut resolved: Vec<SeedInfo> = Vec::new();
    let mut seen: HashSet<u32> = HashSet::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let info = parse_token(token, today)?;
        if seen.insert(info.seed) {
            resolved.push(info);
        }
    }

    if resolved.is_empty() {
        resolved.push(SeedInfo::from_date(today));
    }

    Ok(resolved)
}

fn parse_token(token: &str, today: NaiveDate) -> Result<SeedInfo> {
    if token.eq_ignore_ascii_case("today") {
        return Ok(SeedInfo::from_date(today));
    }

    if let Some(caps) = DATE_TOKEN.captures(token) {
        let year: i32 = caps[1].parse()?;
        let month: u32 = caps[2].parse()?;
        let day: u32 = caps[3].parse()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .with_context(|| format!("not a calendar date: {token}"))?;
        return Ok(SeedInfo::from_date(date));
    }

    if let Ok(value) = token.parse::<u32>() {
        return Ok(SeedInfo::from_numeric(value));
    }

    if let Ok(value) = token.parse::<i64>() {
        if value < 0 {
            bail!("seeds must not be negative: {token}");
        }
        bail!("seed out of 32-bit range: {token}");
    }

    bail!("Unrecognized date or seed token: {token}");
}
