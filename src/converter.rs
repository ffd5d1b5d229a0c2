//! Conversion between the two scenario layouts for headers and params.
//!
//! Compact form writes them as a JSON object, expanded form as a list of
//! `{"name": ..., "value": ...}` objects. Objects keep their member order and
//! duplicate names, so repeated headers survive both directions.

use crate::error::ConverterError;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

const CONVERTED_MEMBERS: [&str; 2] = ["headers", "params"];

/// JSON value whose objects are ordered lists of members.
#[derive(Debug, Clone, PartialEq)]
enum JsonNode {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<JsonNode>),
    Object(Vec<(String, JsonNode)>),
}

impl Serialize for JsonNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JsonNode::Null => serializer.serialize_unit(),
            JsonNode::Bool(b) => serializer.serialize_bool(*b),
            JsonNode::Number(n) => n.serialize(serializer),
            JsonNode::String(s) => serializer.serialize_str(s),
            JsonNode::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            JsonNode::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (name, value) in members {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for JsonNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = JsonNode;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<JsonNode, E> {
        Ok(JsonNode::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<JsonNode, E> {
        Ok(JsonNode::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<JsonNode, D::Error> {
        JsonNode::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<JsonNode, E> {
        Ok(JsonNode::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<JsonNode, E> {
        Ok(JsonNode::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<JsonNode, E> {
        Ok(JsonNode::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<JsonNode, E> {
        Ok(serde_json::Number::from_f64(v).map_or(JsonNode::Null, JsonNode::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<JsonNode, E> {
        Ok(JsonNode::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<JsonNode, E> {
        Ok(JsonNode::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<JsonNode, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(JsonNode::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<JsonNode, A::Error> {
        let mut members = Vec::new();
        while let Some(entry) = map.next_entry::<String, JsonNode>()? {
            members.push(entry);
        }
        Ok(JsonNode::Object(members))
    }
}

/// Converts scenario JSON between compact and expanded layouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatConverter;

impl JsonFormatConverter {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite expanded header/param lists as objects.
    pub fn compact(&self, input: &str) -> Result<String, ConverterError> {
        let node: JsonNode = serde_json::from_str(input)?;
        let node = transform(node, &compact_members)?;
        Ok(serde_json::to_string_pretty(&node)?)
    }

    /// Rewrite header/param objects as `{name, value}` lists.
    pub fn expand(&self, input: &str) -> Result<String, ConverterError> {
        let node: JsonNode = serde_json::from_str(input)?;
        let node = transform(node, &expand_members)?;
        Ok(serde_json::to_string_pretty(&node)?)
    }
}

type MemberRewrite = dyn Fn(&'static str, JsonNode) -> Result<JsonNode, ConverterError>;

/// Walk the tree, handing `headers` and `params` members to `rewrite`.
fn transform(node: JsonNode, rewrite: &MemberRewrite) -> Result<JsonNode, ConverterError> {
    match node {
        JsonNode::Array(items) => items
            .into_iter()
            .map(|item| transform(item, rewrite))
            .collect::<Result<_, _>>()
            .map(JsonNode::Array),
        JsonNode::Object(members) => members
            .into_iter()
            .map(|(name, value)| -> Result<(String, JsonNode), ConverterError> {
                let value = match CONVERTED_MEMBERS.iter().find(|m| **m == name) {
                    Some(member) => rewrite(*member, value)?,
                    None => transform(value, rewrite)?,
                };
                Ok((name, value))
            })
            .collect::<Result<_, _>>()
            .map(JsonNode::Object),
        other => Ok(other),
    }
}

fn compact_members(member: &'static str, value: JsonNode) -> Result<JsonNode, ConverterError> {
    let entries = match value {
        JsonNode::Array(entries) => entries,
        other => return Ok(other),
    };
    entries
        .into_iter()
        .map(|entry| {
            let JsonNode::Object(fields) = entry else {
                return Err(ConverterError::InvalidEntry(member));
            };
            let mut name = None;
            let mut value = JsonNode::Null;
            for (key, field) in fields {
                match (key.as_str(), field) {
                    ("name", JsonNode::String(s)) => name = Some(s),
                    ("value", field) => value = field,
                    _ => {}
                }
            }
            let name = name.ok_or(ConverterError::InvalidEntry(member))?;
            Ok((name, value))
        })
        .collect::<Result<_, _>>()
        .map(JsonNode::Object)
}

fn expand_members(_member: &'static str, value: JsonNode) -> Result<JsonNode, ConverterError> {
    let pairs = match value {
        JsonNode::Object(pairs) => pairs,
        other => return Ok(other),
    };
    let entries = pairs
        .into_iter()
        .map(|(name, value)| {
            JsonNode::Object(vec![
                ("name".to_string(), JsonNode::String(name)),
                ("value".to_string(), value),
            ])
        })
        .collect();
    Ok(JsonNode::Array(entries))
}
