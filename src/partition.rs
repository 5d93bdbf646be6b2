//! Computing partition values: today shifted by an offset, formatted, then
//! optionally sliced.
use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{Days, NaiveDate, NaiveTime};

use crate::error::ScriptError;
use crate::model::PartitionValue;

impl PartitionValue {
    /// The value this partition resolves to on `today`.
    pub fn real_value(&self, today: NaiveDate) -> Result<String, ScriptError> {
        let date = shift_days(today, self.forward_days.unwrap_or(0))?;
        let formatted = format_date(date, &self.format_date)?;
        match self.slice_format.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let (start, end) = parse_slice(raw)?;
                Ok(slice_chars(&formatted, start, end))
            }
            _ => Ok(formatted),
        }
    }
}

fn shift_days(today: NaiveDate, offset: i64) -> Result<NaiveDate, ScriptError> {
    let days = Days::new(offset.unsigned_abs());
    let shifted = if offset < 0 {
        today.checked_sub_days(days)
    } else {
        today.checked_add_days(days)
    };
    shifted.ok_or_else(|| ScriptError::Format(format!("day offset {offset} out of range")))
}

fn format_date(date: NaiveDate, fmt: &str) -> Result<String, ScriptError> {
    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(ScriptError::Format(format!("bad date format '{fmt}'")));
    }
    let mut out = String::new();
    write!(
        out,
        "{}",
        date.and_time(NaiveTime::MIN)
            .format_with_items(StrftimeItems::new(fmt))
    )
    .map_err(|_| ScriptError::Format(format!("date format '{fmt}' cannot render a plain date")))?;
    Ok(out)
}

/// Parses `start:end` into two signed indices.
pub fn parse_slice(raw: &str) -> Result<(i64, i64), ScriptError> {
    let bad = || ScriptError::Format(format!("bad slice '{raw}', expected start:end"));
    let (start, end) = raw.split_once(':').ok_or_else(bad)?;
    let start = start.trim().parse::<i64>().map_err(|_| bad())?;
    let end = end.trim().parse::<i64>().map_err(|_| bad())?;
    Ok((start, end))
}

/// Character slice `[start:end)`; negative indices count from the end and
/// out-of-range bounds clamp, so the result is never an error.
pub fn slice_chars(s: &str, start: i64, end: i64) -> String {
    let len = s.chars().count() as i64;
    let clamp = |i: i64| if i < 0 { (i + len).max(0) } else { i.min(len) };
    let (start, end) = (clamp(start), clamp(end));
    if start >= end {
        return String::new();
    }
    s.chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect()
}
