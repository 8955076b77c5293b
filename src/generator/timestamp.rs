//! Timestamp bounds: `now`, relative offsets and absolute dates.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static OFFSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([+-]?)(\d+)\s*([smhdwy])$").unwrap());

/// One end of a timestamp range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    Now,
    Offset(Duration),
    Absolute(NaiveDateTime),
}

impl TimeBound {
    /// Parse `now`, `[+-]N{s,m,h,d,w,y}` or `YYYY-MM-DD[ HH:MM:SS]`
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("now") {
            return Ok(TimeBound::Now);
        }

        if let Some(caps) = OFFSET_RE.captures(text) {
            let amount: i64 = caps[2]
                .parse()
                .map_err(|_| format!("offset out of range: {}", text))?;
            let amount = if &caps[1] == "-" { -amount } else { amount };
            let seconds = match &caps[3] {
                "s" => 1,
                "m" => 60,
                "h" => 3_600,
                "d" => 86_400,
                "w" => 604_800,
                _ => 31_536_000,
            };
            let total = amount
                .checked_mul(seconds)
                .ok_or_else(|| format!("offset out of range: {}", text))?;
            return Duration::try_seconds(total)
                .map(TimeBound::Offset)
                .ok_or_else(|| format!("offset out of range: {}", text));
        }

        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            return Ok(TimeBound::Absolute(dt));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(TimeBound::Absolute(dt));
            }
        }

        Err(format!("unrecognised time bound: {}", text))
    }

    pub fn resolve(&self, anchor: NaiveDateTime) -> NaiveDateTime {
        match self {
            TimeBound::Now => anchor,
            TimeBound::Offset(d) => anchor.checked_add_signed(*d).unwrap_or(anchor),
            TimeBound::Absolute(dt) => *dt,
        }
    }
}
