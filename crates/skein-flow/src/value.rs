use std::fmt;

use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::message::Message;

/// The engine's runtime tagged value.
///
/// Every operation on a `FlowValue` is total: a type mismatch degrades to
/// a string or numeric projection instead of failing. Comparison is
/// deliberately loose so heterogeneous authored values compare sensibly:
/// equality goes through the string projection, ordering through the
/// numeric one. Strict equality (`PartialEq`) exists for round-trip
/// checks, not for condition evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FlowValue {
  #[default]
  Null,
  String(String),
  Number(f64),
  Array(Vec<FlowValue>),
  Message(Message),
}

impl FlowValue {
  /// Numeric projection: numbers as-is, null as 0, everything else parsed
  /// from the string projection, defaulting to 0.
  pub fn number(&self) -> f64 {
    match self {
      FlowValue::Null => 0.0,
      FlowValue::Number(n) => *n,
      other => other.to_string().trim().parse().unwrap_or(0.0),
    }
  }

  /// Loose equality on the string projection.
  pub fn loose_equals(&self, other: &FlowValue) -> bool {
    self.to_string() == other.to_string()
  }

  pub fn greater_than(&self, other: &FlowValue) -> bool {
    self.number() > other.number()
  }

  pub fn greater_than_or_equal(&self, other: &FlowValue) -> bool {
    self.number() >= other.number()
  }

  pub fn less_than(&self, other: &FlowValue) -> bool {
    self.number() < other.number()
  }

  pub fn less_than_or_equal(&self, other: &FlowValue) -> bool {
    self.number() <= other.number()
  }

  /// Substring containment on the string projections.
  pub fn contains(&self, other: &FlowValue) -> bool {
    self.to_string().contains(&other.to_string())
  }

  /// Whether this value embeds a `{{ ... }}` template expression.
  ///
  /// Only string-typed values are template-scanned.
  pub fn contains_variable(&self) -> bool {
    matches!(self, FlowValue::String(s) if s.contains("{{"))
  }

  /// Rewrite a string-typed value in place with the resolver's output.
  /// Values of any other type pass through unchanged.
  pub fn resolve_variables<E>(
    &mut self,
    resolve: impl FnOnce(&str) -> Result<String, E>,
  ) -> Result<(), E> {
    if let FlowValue::String(s) = self {
      if s.contains("{{") {
        *self = FlowValue::String(resolve(s)?);
      }
    }
    Ok(())
  }

  /// JSON projection used for template binding contexts.
  pub fn as_json(&self) -> serde_json::Value {
    match self {
      FlowValue::Null => serde_json::Value::Null,
      FlowValue::String(s) => serde_json::Value::String(s.clone()),
      // Integral numbers project as JSON integers so template output
      // matches the display projection ("3", not "3.0").
      FlowValue::Number(n) if n.is_finite() && n.fract() == 0.0
        && n.abs() < 9_007_199_254_740_992.0 =>
      {
        serde_json::Value::Number(serde_json::Number::from(*n as i64))
      }
      FlowValue::Number(n) => serde_json::Number::from_f64(*n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null),
      FlowValue::Array(items) => {
        serde_json::Value::Array(items.iter().map(FlowValue::as_json).collect())
      }
      FlowValue::Message(m) => serde_json::json!({
        "id": m.id,
        "channel_id": m.channel_id,
        "content": m.content,
      }),
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, FlowValue::Null)
  }
}

impl fmt::Display for FlowValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FlowValue::Null => f.write_str("null"),
      FlowValue::String(s) => f.write_str(s),
      FlowValue::Number(n) => {
        // Integral values render without a fractional part so that
        // authored numbers like 5 compare equal to the string "5".
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
          write!(f, "{}", *n as i64)
        } else {
          write!(f, "{n:.6}")
        }
      }
      FlowValue::Array(items) => {
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{item}")?;
        }
        Ok(())
      }
      FlowValue::Message(m) => f.write_str(&m.id),
    }
  }
}

// Scalars serialize to their bare JSON forms so authored graphs stay
// readable; array and message values carry an explicit type tag.
impl Serialize for FlowValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      FlowValue::Null => serializer.serialize_unit(),
      FlowValue::String(s) => serializer.serialize_str(s),
      FlowValue::Number(n) => serializer.serialize_f64(*n),
      FlowValue::Array(items) => {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "array")?;
        map.serialize_entry("value", items)?;
        map.end()
      }
      FlowValue::Message(m) => {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "message")?;
        map.serialize_entry("value", m)?;
        map.end()
      }
    }
  }
}

impl<'de> Deserialize<'de> for FlowValue {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    from_raw(raw).map_err(D::Error::custom)
  }
}

fn from_raw(raw: serde_json::Value) -> Result<FlowValue, String> {
  match raw {
    serde_json::Value::Null => Ok(FlowValue::Null),
    serde_json::Value::String(s) => Ok(FlowValue::String(s)),
    serde_json::Value::Number(n) => Ok(FlowValue::Number(n.as_f64().unwrap_or(0.0))),
    serde_json::Value::Object(mut obj) => {
      let tag = obj
        .remove("type")
        .and_then(|t| t.as_str().map(str::to_owned))
        .ok_or_else(|| "flow value object missing type tag".to_string())?;
      // The payload defaults to the tag's zero value so that type and
      // payload can never disagree.
      let payload = obj.remove("value").unwrap_or(serde_json::Value::Null);
      match tag.as_str() {
        "null" => Ok(FlowValue::Null),
        "string" => match payload {
          serde_json::Value::Null => Ok(FlowValue::String(String::new())),
          serde_json::Value::String(s) => Ok(FlowValue::String(s)),
          other => Err(format!("expected string payload, got {other}")),
        },
        "number" => match payload {
          serde_json::Value::Null => Ok(FlowValue::Number(0.0)),
          serde_json::Value::Number(n) => Ok(FlowValue::Number(n.as_f64().unwrap_or(0.0))),
          other => Err(format!("expected number payload, got {other}")),
        },
        "array" => match payload {
          serde_json::Value::Null => Ok(FlowValue::Array(Vec::new())),
          serde_json::Value::Array(items) => Ok(FlowValue::Array(
            items.into_iter().map(from_raw).collect::<Result<_, _>>()?,
          )),
          other => Err(format!("expected array payload, got {other}")),
        },
        "message" => match payload {
          serde_json::Value::Null => Ok(FlowValue::Message(Message::default())),
          other => serde_json::from_value(other)
            .map(FlowValue::Message)
            .map_err(|e| format!("invalid message payload: {e}")),
        },
        other => Err(format!("unknown flow value type: {other}")),
      }
    }
    other => Err(format!("invalid flow value: {other}")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_projections() {
    assert_eq!(FlowValue::Null.to_string(), "null");
    assert_eq!(FlowValue::String("abc".into()).to_string(), "abc");
    assert_eq!(FlowValue::Number(5.0).to_string(), "5");
    assert_eq!(FlowValue::Number(1.5).to_string(), "1.500000");
    assert_eq!(
      FlowValue::Array(vec![FlowValue::Number(1.0), FlowValue::String("a".into())]).to_string(),
      "1, a"
    );
    let msg = Message {
      id: "42".into(),
      channel_id: "7".into(),
      content: "hi".into(),
    };
    assert_eq!(FlowValue::Message(msg).to_string(), "42");
  }

  #[test]
  fn number_projection_is_total() {
    assert_eq!(FlowValue::Null.number(), 0.0);
    assert_eq!(FlowValue::Number(2.5).number(), 2.5);
    assert_eq!(FlowValue::String("3".into()).number(), 3.0);
    assert_eq!(FlowValue::String("not a number".into()).number(), 0.0);
  }

  #[test]
  fn loose_comparison_crosses_types() {
    assert!(FlowValue::Number(5.0).loose_equals(&FlowValue::String("5".into())));
    assert!(FlowValue::String("10".into()).greater_than(&FlowValue::Number(9.0)));
    assert!(FlowValue::Number(1.0).less_than_or_equal(&FlowValue::String("1".into())));
    assert!(FlowValue::String("hello world".into()).contains(&FlowValue::String("world".into())));
    assert!(!FlowValue::Null.greater_than(&FlowValue::Number(0.0)));
  }

  #[test]
  fn json_projection_keeps_integral_numbers_integral() {
    assert_eq!(FlowValue::Number(3.0).as_json(), serde_json::json!(3));
    assert_eq!(FlowValue::Number(-7.0).as_json(), serde_json::json!(-7));
    assert_eq!(FlowValue::Number(2.5).as_json(), serde_json::json!(2.5));
    assert_eq!(FlowValue::Number(f64::NAN).as_json(), serde_json::Value::Null);
    assert_eq!(
      FlowValue::Array(vec![FlowValue::Number(1.0)]).as_json(),
      serde_json::json!([1])
    );
  }

  #[test]
  fn contains_variable_only_scans_strings() {
    assert!(FlowValue::String("hi {{ Variables.name }}".into()).contains_variable());
    assert!(!FlowValue::String("plain".into()).contains_variable());
    assert!(!FlowValue::Number(5.0).contains_variable());
    assert!(!FlowValue::Null.contains_variable());
  }

  #[test]
  fn resolve_variables_rewrites_strings_in_place() {
    let mut v = FlowValue::String("{{ x }}".into());
    v.resolve_variables(|_| Ok::<_, ()>("resolved".into())).unwrap();
    assert_eq!(v, FlowValue::String("resolved".into()));

    let mut n = FlowValue::Number(2.0);
    n.resolve_variables(|_| Ok::<_, ()>("nope".into())).unwrap();
    assert_eq!(n, FlowValue::Number(2.0));
  }

  #[test]
  fn serde_round_trip_is_strict_equal() {
    let values = vec![
      FlowValue::Null,
      FlowValue::String("hello".into()),
      FlowValue::Number(3.25),
      FlowValue::Array(vec![FlowValue::Number(1.0), FlowValue::String("x".into())]),
      FlowValue::Message(Message {
        id: "1".into(),
        channel_id: "2".into(),
        content: "hey".into(),
      }),
    ];

    for value in values {
      let json = serde_json::to_string(&value).unwrap();
      let back: FlowValue = serde_json::from_str(&json).unwrap();
      assert_eq!(back, value, "round trip of {json}");
    }
  }

  #[test]
  fn deserialize_accepts_bare_scalars() {
    assert_eq!(
      serde_json::from_str::<FlowValue>("\"hi\"").unwrap(),
      FlowValue::String("hi".into())
    );
    assert_eq!(
      serde_json::from_str::<FlowValue>("4").unwrap(),
      FlowValue::Number(4.0)
    );
    assert_eq!(serde_json::from_str::<FlowValue>("null").unwrap(), FlowValue::Null);
  }

  #[test]
  fn deserialize_zero_fills_missing_payload() {
    assert_eq!(
      serde_json::from_str::<FlowValue>(r#"{"type": "string"}"#).unwrap(),
      FlowValue::String(String::new())
    );
    assert_eq!(
      serde_json::from_str::<FlowValue>(r#"{"type": "array", "value": null}"#).unwrap(),
      FlowValue::Array(Vec::new())
    );
    assert_eq!(
      serde_json::from_str::<FlowValue>(r#"{"type": "message"}"#).unwrap(),
      FlowValue::Message(Message::default())
    );
  }

  #[test]
  fn deserialize_rejects_mismatched_payload() {
    assert!(serde_json::from_str::<FlowValue>(r#"{"type": "number", "value": "abc"}"#).is_err());
    assert!(serde_json::from_str::<FlowValue>(r#"{"type": "wat", "value": 1}"#).is_err());
    assert!(serde_json::from_str::<FlowValue>("true").is_err());
  }
}
