use std::fmt::Write as _;

use anyhow::anyhow;
use chrono::format::{
  Item,
  StrftimeItems
};
use chrono::{
  Datelike,
  Duration,
  Local,
  NaiveDate,
  Weekday
};
use ticklist_shared::date_only;

pub const DEFAULT_DISPLAY_FORMAT: &str =
  "%d/%m/%Y";

/// Today's calendar date on this
/// machine. Only used to resolve
/// relative input and highlight overdue
/// tasks; stored dates never pass
/// through a timezone.
#[must_use]
pub fn today_local() -> NaiveDate {
  Local::now().date_naive()
}

/// Formats a due date for display. A
/// format chrono cannot render falls
/// back to `YYYY-MM-DD`.
#[must_use]
pub fn format_due(
  date: NaiveDate,
  display_format: &str
) -> String {
  let mut out = String::new();
  if write!(
    out,
    "{}",
    date.format(display_format)
  )
  .is_err()
  {
    return date_only::format(date);
  }
  out
}

/// Rejects strftime patterns chrono
/// cannot render, such as unknown
/// `%` specifiers.
pub fn check_display_format(
  display_format: &str
) -> anyhow::Result<()> {
  if display_format.trim().is_empty() {
    return Err(anyhow!(
      "display.date_format cannot \
       be empty"
    ));
  }
  if StrftimeItems::new(display_format)
    .any(|item| {
      matches!(item, Item::Error)
    })
  {
    return Err(anyhow!(
      "display.date_format is not a \
       valid strftime pattern: \
       {display_format}"
    ));
  }
  Ok(())
}

/// Parses a due date typed by a user.
///
/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY`,
/// `today`, `tomorrow`, weekday names
/// (next occurrence, never today) and
/// `+Nd` / `+Nw` offsets.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_due_input(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower = token.to_ascii_lowercase();

  if lower.is_empty() {
    return Err(anyhow!(
      "due date cannot be empty"
    ));
  }

  match lower.as_str() {
    | "today" => return Ok(today),
    | "tomorrow" => {
      return Ok(
        today + Duration::days(1)
      );
    }
    | _ => {}
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token,
      date_only::WIRE_FORMAT
    )
  {
    return Ok(date);
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%d/%m/%Y"
    )
  {
    return Ok(date);
  }

  if let Some(weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, weekday
    ));
  }

  if let Some(offset) =
    lower.strip_prefix('+')
  {
    return parse_offset(offset, today);
  }

  Err(anyhow!(
    "unrecognized due date: {token} \
     (expected YYYY-MM-DD or \
     DD/MM/YYYY)"
  ))
}

fn parse_offset(
  offset: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let invalid = || {
    anyhow!(
      "invalid due date offset: \
       +{offset} (use +Nd or +Nw)"
    )
  };

  let (split, _) = offset
    .char_indices()
    .last()
    .ok_or_else(invalid)?;
  let (amount, unit) =
    offset.split_at(split);
  let amount: i64 = amount
    .parse()
    .map_err(|_| invalid())?;

  let days = match unit {
    | "d" => Some(amount),
    | "w" => amount.checked_mul(7),
    | _ => None
  }
  .ok_or_else(invalid)?;

  Duration::try_days(days)
    .and_then(|delta| {
      today.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "due date offset out of \
         range: +{offset}"
      )
    })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  today: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let current = today
    .weekday()
    .num_days_from_monday()
    as i64;
  let wanted =
    target.num_days_from_monday() as i64;
  let mut delta = (wanted - current)
    .rem_euclid(7);
  if delta == 0 {
    delta = 7;
  }
  today + Duration::days(delta)
}
