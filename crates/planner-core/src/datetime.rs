use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use tracing::{
  debug,
  warn
};

pub const TIMEZONE_ENV_VAR: &str =
  "PLANNER_TIMEZONE";
pub const DEFAULT_TIMEZONE: &str =
  "UTC";

/// Resolves the timezone used to
/// decide what "today" is. The
/// environment wins over the config
/// value.
pub fn resolve_timezone(
  configured: Option<&str>
) -> anyhow::Result<Tz> {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && !raw.trim().is_empty()
  {
    debug!(timezone = %raw, "timezone from environment");
    return parse_timezone(&raw);
  }

  match configured {
    | Some(name) => {
      parse_timezone(name)
    }
    | None => {
      parse_timezone(DEFAULT_TIMEZONE)
    }
  }
}

fn parse_timezone(
  raw: &str
) -> anyhow::Result<Tz> {
  raw.trim().parse::<Tz>().map_err(
    |err| {
      anyhow!(
        "invalid timezone {raw:?}: \
         {err}"
      )
    }
  )
}

#[must_use]
pub fn local_date(
  now: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  now.with_timezone(&tz).date_naive()
}

/// Header clock, e.g. `09:05 PM`.
pub fn format_clock_time(
  now: DateTime<Utc>,
  tz: Tz
) -> String {
  now
    .with_timezone(&tz)
    .format("%I:%M %p")
    .to_string()
}

/// Header date, e.g. `Wed, Jan 15`.
pub fn format_header_date(
  now: DateTime<Utc>,
  tz: Tz
) -> String {
  let local = now.with_timezone(&tz);
  format!(
    "{}, {} {}",
    local.format("%a"),
    local.format("%b"),
    local.day()
  )
}

#[tracing::instrument(skip(today))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "" => {
      return Err(anyhow!(
        "date cannot be empty"
      ));
    }
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(
        today + Duration::days(1)
      );
    }
    | "yesterday" => {
      return Ok(
        today - Duration::days(1)
      );
    }
    | _ => {}
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Ok(date);
  }

  if let Some(offset) =
    parse_relative_offset(&lower)
  {
    return today
      .checked_add_signed(offset)
      .ok_or_else(|| {
        anyhow!(
          "date out of range: {token}"
        )
      });
  }

  if let Some(weekday) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, weekday
    ));
  }

  if let Some(month) =
    parse_month_name(&lower)
  {
    let year = if month > today.month()
    {
      today.year()
    } else {
      today.year() + 1
    };
    return NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid month date: {token}"
      )
    });
  }

  warn!(input = %token, "unrecognized date expression");
  Err(anyhow!(
    "unrecognized date: {token} \
     (expected YYYY-MM-DD, today, \
     tomorrow, a weekday or +Nd)"
  ))
}

/// Normalizes a time of day to
/// `HH:MM`.
pub fn normalize_time(
  input: &str
) -> anyhow::Result<String> {
  let (hour, minute) =
    parse_clock_time(input)
      .with_context(|| {
        format!(
          "unrecognized time: {}",
          input.trim()
        )
      })?;
  Ok(format!("{hour:02}:{minute:02}"))
}

fn parse_relative_offset(
  token: &str
) -> Option<Duration> {
  let offset_re = Regex::new(
    r"^(?P<sign>[+-])(?P<count>\d{1,4})(?P<unit>[dw])$",
  )
  .ok()?;
  let captures =
    offset_re.captures(token)?;

  let count = captures
    .name("count")?
    .as_str()
    .parse::<i64>()
    .ok()?;
  let days = match captures
    .name("unit")?
    .as_str()
  {
    | "w" => count * 7,
    | _ => count
  };

  match captures.name("sign")?.as_str()
  {
    | "-" => Some(Duration::days(-days)),
    | _ => Some(Duration::days(days))
  }
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

/// Next occurrence strictly after
/// `from`.
fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let current = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let wanted =
    target.num_days_from_monday() as i64;
  let mut delta =
    (wanted - current).rem_euclid(7);
  if delta == 0 {
    delta = 7;
  }
  from + Duration::days(delta)
}

fn parse_clock_time(
  token: &str
) -> Option<(u32, u32)> {
  let clock_re = Regex::new(
    r"(?i)^(?P<hour>\d{1,2})(:(?P<minute>\d{2}))?\s*(?P<ampm>[ap]m)?$",
  )
  .ok()?;
  let captures =
    clock_re.captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = match captures
    .name("minute")
  {
    | Some(m) => {
      m.as_str().parse::<u32>().ok()?
    }
    | None => {
      // a bare hour needs am/pm
      captures.name("ampm")?;
      0
    }
  };
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    let ampm = ampm_match
      .as_str()
      .to_ascii_lowercase();
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    match ampm.as_str() {
      | "am" => {
        if raw_hour == 12 {
          0
        } else {
          raw_hour
        }
      }
      | "pm" => {
        if raw_hour == 12 {
          12
        } else {
          raw_hour + 12
        }
      }
      | _ => return None
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  Some((hour, minute))
}

fn parse_month_name(
  token: &str
) -> Option<u32> {
  match token.trim() {
    | "january" | "jan" => Some(1),
    | "february" | "feb" => Some(2),
    | "march" | "mar" => Some(3),
    | "april" | "apr" => Some(4),
    | "may" => Some(5),
    | "june" | "jun" => Some(6),
    | "july" | "jul" => Some(7),
    | "august" | "aug" => Some(8),
    | "september" | "sep" | "sept" => {
      Some(9)
    }
    | "october" | "oct" => Some(10),
    | "november" | "nov" => Some(11),
    | "december" | "dec" => Some(12),
    | _ => None
  }
}
