use std::fmt;

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl std::str::FromStr for TaskId {
  type Err = std::num::ParseIntError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    s.trim().parse::<u64>().map(TaskId)
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id:           TaskId,
  #[serde(default)]
  pub title:        String,
  #[serde(default)]
  pub is_completed: bool,
  #[serde(
    default,
    with = "date_only::option"
  )]
  pub due_date:     Option<NaiveDate>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub created_at:
    Option<DateTime<Utc>>
}

impl Task {
  pub fn is_overdue(
    &self,
    today: NaiveDate
  ) -> bool {
    !self.is_completed
      && self
        .due_date
        .is_some_and(|due| due < today)
  }
}

/// Body of `POST /todos`. `dueDate` is
/// always present on the wire, `null`
/// when unset.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
  pub title:        String,
  pub is_completed: bool,
  #[serde(
    default,
    with = "date_only::option"
  )]
  pub due_date:     Option<NaiveDate>
}

impl NewTask {
  pub fn new(
    title: impl Into<String>,
    due_date: Option<NaiveDate>
  ) -> Self {
    Self {
      title: title.into(),
      is_completed: false,
      due_date
    }
  }
}

/// Body of `PUT /todos/{id}`. Only set
/// fields are serialized; the id lives
/// in the path.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub is_completed: Option<bool>
}

impl TaskPatch {
  pub fn completion(
    is_completed: bool
  ) -> Self {
    Self {
      is_completed: Some(is_completed)
    }
  }

  pub fn apply_to(
    &self,
    task: &mut Task
  ) {
    if let Some(done) = self.is_completed
    {
      task.is_completed = done;
    }
  }
}

/// Calendar dates on the wire.
///
/// Dates are written as `YYYY-MM-DD`.
/// On read, a bare date is taken as-is
/// and a full timestamp contributes only
/// its leading date, so a value never
/// moves a day when the reader sits in a
/// different timezone than the writer.
pub mod date_only {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub const WIRE_FORMAT: &str =
    "%Y-%m-%d";

  pub fn format(
    date: NaiveDate
  ) -> String {
    date.format(WIRE_FORMAT).to_string()
  }

  /// Lenient reader for values coming
  /// off the wire. User input should be
  /// matched against `WIRE_FORMAT`
  /// directly.
  pub fn parse(
    raw: &str
  ) -> Result<NaiveDate, chrono::ParseError>
  {
    let raw = raw.trim();
    let date_part = match raw
      .char_indices()
      .find(|(_, ch)| {
        *ch == 'T' || *ch == ' '
      }) {
      | Some((idx, _)) => &raw[..idx],
      | None => raw
    };
    NaiveDate::parse_from_str(
      date_part,
      WIRE_FORMAT
    )
  }

  pub fn serialize<S>(
    date: &NaiveDate,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer
      .serialize_str(&format(*date))
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDate, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    parse(&raw)
      .map_err(serde::de::Error::custom)
  }

  pub mod option {
    use chrono::NaiveDate;
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    pub fn serialize<S>(
      date: &Option<NaiveDate>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match date {
        | Some(value) => {
          super::serialize(
            value, serializer
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<
      Option<NaiveDate>,
      D::Error
    >
    where
      D: Deserializer<'de>
    {
      let opt =
        Option::<String>::deserialize(
          deserializer
        )?;
      match opt {
        | Some(raw)
          if raw.trim().is_empty() =>
        {
          Ok(None)
        }
        | Some(raw) => super::parse(&raw)
          .map(Some)
          .map_err(
            serde::de::Error::custom
          ),
        | None => Ok(None)
      }
    }
  }
}
