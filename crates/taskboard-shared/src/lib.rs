//! Wire shapes exchanged with the taskboard server.
//!
//! `GET /board` returns a [`BoardDto`], `GET /state` returns a
//! [`StateDto`], and `POST /state` takes the form body produced by
//! [`StateWrite::to_form_body`]. Parsing is lenient: missing sections
//! default to empty and ids may arrive as JSON numbers.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{
  self,
  IgnoredAny,
  MapAccess,
  SeqAccess,
  Visitor
};
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};

/// Tab or cell id as it appears on the
/// wire. Integers are normalized to their
/// decimal text so `1` and `"1"` name the
/// same cell.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
)]
#[serde(transparent)]
pub struct WireId(pub String);

impl WireId {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for WireId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl fmt::Display for WireId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
  Text(String),
  Int(i64),
  Float(f64),
  Flag(bool),
  Other(IgnoredAny)
}

impl RawText {
  fn into_text(self) -> String {
    match self {
      | RawText::Text(text) => text,
      | RawText::Int(n) => n.to_string(),
      | RawText::Float(f) => f.to_string(),
      | RawText::Flag(b) => b.to_string(),
      | RawText::Other(_) => String::new()
    }
  }
}

impl<'de> Deserialize<'de> for WireId {
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    Ok(Self(
      RawText::deserialize(deserializer)?
        .into_text()
    ))
  }
}

fn lenient_labels<'de, D>(
  deserializer: D
) -> Result<BTreeMap<String, String>, D::Error>
where
  D: Deserializer<'de>
{
  let raw = Option::<
    BTreeMap<String, RawText>
  >::deserialize(deserializer)?;
  Ok(
    raw
      .unwrap_or_default()
      .into_iter()
      .map(|(id, label)| {
        (id, label.into_text())
      })
      .collect()
  )
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct TabsDto {
  #[serde(default)]
  pub order:  Vec<WireId>,
  #[serde(
    default,
    deserialize_with = "lenient_labels"
  )]
  pub labels: BTreeMap<String, String>
}

#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct CellsDto {
  #[serde(default)]
  pub layout: Vec<Vec<WireId>>,
  #[serde(
    default,
    deserialize_with = "lenient_labels"
  )]
  pub labels: BTreeMap<String, String>
}

/// Payload of `GET /board`.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Serialize,
  Deserialize,
)]
pub struct BoardDto {
  #[serde(default)]
  pub tabs:  TabsDto,
  #[serde(default)]
  pub cells: CellsDto
}

/// One stored cell value. Anything the
/// server holds that is neither a boolean
/// nor a number reads as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireValue {
  Flag(bool),
  Int(i64),
  Float(f64),
  Unknown
}

impl WireValue {
  /// JSON literal used in the form body;
  /// the server runs it through a JSON
  /// decoder.
  pub fn literal(&self) -> String {
    match self {
      | WireValue::Flag(b) => b.to_string(),
      | WireValue::Int(n) => n.to_string(),
      | WireValue::Float(f) => f.to_string(),
      | WireValue::Unknown => {
        "null".to_string()
      }
    }
  }
}

impl Serialize for WireValue {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match self {
      | WireValue::Flag(b) => {
        serializer.serialize_bool(*b)
      }
      | WireValue::Int(n) => {
        serializer.serialize_i64(*n)
      }
      | WireValue::Float(f) => {
        serializer.serialize_f64(*f)
      }
      | WireValue::Unknown => {
        serializer.serialize_unit()
      }
    }
  }
}

struct WireValueVisitor;

impl<'de> Visitor<'de> for WireValueVisitor {
  type Value = WireValue;

  fn expecting(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str("a cell state value")
  }

  fn visit_bool<E>(
    self,
    v: bool
  ) -> Result<WireValue, E>
  where
    E: de::Error
  {
    Ok(WireValue::Flag(v))
  }

  fn visit_i64<E>(
    self,
    v: i64
  ) -> Result<WireValue, E>
  where
    E: de::Error
  {
    Ok(WireValue::Int(v))
  }

  fn visit_u64<E>(
    self,
    v: u64
  ) -> Result<WireValue, E>
  where
    E: de::Error
  {
    Ok(WireValue::Int(
      i64::try_from(v).unwrap_or(i64::MAX)
    ))
  }

  fn visit_f64<E>(
    self,
    v: f64
  ) -> Result<WireValue, E>
  where
    E: de::Error
  {
    Ok(WireValue::Float(v))
  }

  fn visit_str<E>(
    self,
    _v: &str
  ) -> Result<WireValue, E>
  where
    E: de::Error
  {
    Ok(WireValue::Unknown)
  }

  fn visit_unit<E>(
    self
  ) -> Result<WireValue, E>
  where
    E: de::Error
  {
    Ok(WireValue::Unknown)
  }

  fn visit_none<E>(
    self
  ) -> Result<WireValue, E>
  where
    E: de::Error
  {
    Ok(WireValue::Unknown)
  }

  fn visit_some<D>(
    self,
    deserializer: D
  ) -> Result<WireValue, D::Error>
  where
    D: Deserializer<'de>
  {
    deserializer.deserialize_any(self)
  }

  fn visit_seq<A>(
    self,
    mut seq: A
  ) -> Result<WireValue, A::Error>
  where
    A: SeqAccess<'de>
  {
    while seq
      .next_element::<IgnoredAny>()?
      .is_some()
    {}
    Ok(WireValue::Unknown)
  }

  fn visit_map<A>(
    self,
    mut map: A
  ) -> Result<WireValue, A::Error>
  where
    A: MapAccess<'de>
  {
    while map
      .next_entry::<IgnoredAny, IgnoredAny>()?
      .is_some()
    {}
    Ok(WireValue::Unknown)
  }
}

impl<'de> Deserialize<'de> for WireValue {
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    deserializer
      .deserialize_any(WireValueVisitor)
  }
}

/// Payload of `GET /state`: tab id to cell
/// id to value.
pub type StateDto = BTreeMap<
  String,
  BTreeMap<String, WireValue>
>;

/// A single-cell update for `POST /state`.
#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct StateWrite {
  pub tab_id:  String,
  pub cell_id: String,
  pub value:   WireValue
}

impl StateWrite {
  pub fn new(
    tab_id: impl Into<String>,
    cell_id: impl Into<String>,
    value: WireValue
  ) -> Self {
    Self {
      tab_id: tab_id.into(),
      cell_id: cell_id.into(),
      value
    }
  }

  /// `tid=<tab>&<cell>=<json literal>`,
  /// ids percent-encoded.
  pub fn to_form_body(&self) -> String {
    format!(
      "tid={}&{}={}",
      urlencoding::encode(&self.tab_id),
      urlencoding::encode(&self.cell_id),
      urlencoding::encode(
        &self.value.literal()
      )
    )
  }
}

/// Content type for [`StateWrite::to_form_body`].
pub const FORM_CONTENT_TYPE: &str =
  "application/x-www-form-urlencoded";

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn board_accepts_numeric_ids_and_missing_sections()
   {
    let raw = r#"{
      "tabs": {"order": ["S1", 2]},
      "cells": {
        "layout": [[1, 2], [], ["c1"], ["r1"]],
        "labels": {"1": "IV bag needed", "c1": "Beds", "2": null}
      }
    }"#;
    let board: BoardDto =
      serde_json::from_str(raw).unwrap();

    assert_eq!(
      board.tabs.order,
      vec![
        WireId::from("S1"),
        WireId::from("2")
      ]
    );
    assert!(board.tabs.labels.is_empty());
    assert_eq!(board.cells.layout.len(), 4);
    assert_eq!(
      board.cells.layout[0][0].as_str(),
      "1"
    );
    assert_eq!(
      board.cells.labels["1"],
      "IV bag needed"
    );
    assert_eq!(board.cells.labels["2"], "");
  }

  #[test]
  fn empty_object_is_an_empty_board() {
    let board: BoardDto =
      serde_json::from_str("{}").unwrap();
    assert_eq!(board, BoardDto::default());
  }

  #[test]
  fn state_values_tolerate_junk() {
    let raw = r#"{
      "1": {"a": true, "c1": 3, "b": "yes", "d": null, "e": [1], "f": 1.5},
      "2": {}
    }"#;
    let state: StateDto =
      serde_json::from_str(raw).unwrap();

    let tab = &state["1"];
    assert_eq!(tab["a"], WireValue::Flag(true));
    assert_eq!(tab["c1"], WireValue::Int(3));
    assert_eq!(tab["b"], WireValue::Unknown);
    assert_eq!(tab["d"], WireValue::Unknown);
    assert_eq!(tab["e"], WireValue::Unknown);
    assert_eq!(tab["f"], WireValue::Float(1.5));
    assert!(state["2"].is_empty());
  }

  #[test]
  fn form_body_encodes_ids_and_literals() {
    let write = StateWrite::new(
      "S 1",
      "c&1",
      WireValue::Int(4)
    );
    assert_eq!(
      write.to_form_body(),
      "tid=S%201&c%261=4"
    );

    let toggle = StateWrite::new(
      "P2",
      "7",
      WireValue::Flag(false)
    );
    assert_eq!(
      toggle.to_form_body(),
      "tid=P2&7=false"
    );
  }
}
