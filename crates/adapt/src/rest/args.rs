// crates/adapt/src/rest/args.rs

//! Registered endpoint arguments: declaration, coercion and validation.
//!
//! Values arrive as JSON from a body or as strings from a query string, so
//! every kind accepts the string spelling of its values. Parameters that are
//! not registered are left untouched.

use super::dates::parse_datetime;
use crate::core::{RestError, RestRequest};
use serde_json::{json, Map, Value as Json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Non-negative integers; `1,2`, `[1, 2]` or a single id.
    IdList,
    StringList,
    DateTime,
    /// A string, or an object carrying a `raw` string.
    Text,
    Object,
    Any,
}

impl ArgKind {
    pub fn type_name(&self) -> Json {
        match self {
            ArgKind::String | ArgKind::DateTime => json!("string"),
            ArgKind::Integer => json!("integer"),
            ArgKind::Number => json!("number"),
            ArgKind::Boolean => json!("boolean"),
            ArgKind::IdList | ArgKind::StringList => json!("array"),
            ArgKind::Text => json!(["string", "object"]),
            ArgKind::Object => json!("object"),
            ArgKind::Any => json!(["string", "integer", "number", "boolean", "array", "object", "null"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub name: String,
    pub kind: ArgKind,
    pub description: String,
    pub required: bool,
    pub nullable: bool,
    pub default: Option<Json>,
    /// Allowed values; empty means unrestricted.
    pub choices: Vec<String>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl ArgSpec {
    pub fn new(name: &str, kind: ArgKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: String::new(),
            required: false,
            nullable: false,
            default: None,
            choices: Vec::new(),
            minimum: None,
            maximum: None,
        }
    }

    pub fn describe(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Json>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn range(mut self, minimum: Option<i64>, maximum: Option<i64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    /// Public description used by the schema endpoint.
    pub fn to_json(&self) -> Json {
        let mut obj = Map::new();
        obj.insert("type".into(), self.kind.type_name());
        if !self.description.is_empty() {
            obj.insert("description".into(), json!(self.description));
        }
        if let Some(d) = &self.default {
            obj.insert("default".into(), d.clone());
        }
        if !self.choices.is_empty() {
            let choices = json!(self.choices);
            match self.kind {
                ArgKind::StringList => {
                    obj.insert("items".into(), json!({"type": "string", "enum": choices}));
                }
                _ => {
                    obj.insert("enum".into(), choices);
                }
            }
        } else if self.kind == ArgKind::IdList {
            obj.insert("items".into(), json!({"type": "integer"}));
        }
        if let Some(min) = self.minimum {
            obj.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.maximum {
            obj.insert("maximum".into(), json!(max));
        }
        obj.insert("required".into(), json!(self.required));
        Json::Object(obj)
    }

    /// Coerce a supplied value into its canonical JSON form.
    pub fn coerce(&self, raw: &Json) -> Result<Json, String> {
        let name = &self.name;
        if raw.is_null() && self.nullable {
            return Ok(Json::Null);
        }
        let value = match self.kind {
            ArgKind::String => {
                let s = match raw {
                    Json::String(s) => s.clone(),
                    Json::Number(n) => n.to_string(),
                    Json::Bool(b) => b.to_string(),
                    _ => return Err(format!("{name} is not of type string.")),
                };
                self.check_choice(&s, name)?;
                Json::String(s)
            }
            ArgKind::Integer => {
                let n = parse_int(raw).ok_or_else(|| format!("{name} is not of type integer."))?;
                if let Some(min) = self.minimum.filter(|min| n < *min) {
                    return Err(format!("{name} must be greater than or equal to {min}"));
                }
                if let Some(max) = self.maximum.filter(|max| n > *max) {
                    return Err(format!("{name} must be less than or equal to {max}"));
                }
                json!(n)
            }
            ArgKind::Number => {
                let n = match raw {
                    Json::Number(n) => n.as_f64(),
                    Json::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| format!("{name} is not of type number."))?;
                json!(n)
            }
            ArgKind::Boolean => Json::Bool(parse_bool(raw).map_err(|_| format!("{name} is not of type boolean."))?),
            ArgKind::IdList => json!(parse_id_list(raw).map_err(|bad| format!("{name}[{bad}] is not of type integer."))?),
            ArgKind::StringList => {
                let list = parse_string_list(raw).map_err(|_| format!("{name} is not of type array."))?;
                for (i, s) in list.iter().enumerate() {
                    self.check_choice(s, &format!("{name}[{i}]"))?;
                }
                json!(list)
            }
            ArgKind::DateTime => match raw {
                Json::String(s) if parse_datetime(s).is_some() => raw.clone(),
                _ => return Err("Invalid date.".to_string()),
            },
            ArgKind::Text => match raw {
                Json::String(_) => raw.clone(),
                Json::Object(o) if o.get("raw").map(|r| r.is_string()).unwrap_or(true) => raw.clone(),
                _ => return Err(format!("{name} is not of type string,object.")),
            },
            ArgKind::Object => match raw {
                Json::Object(_) => raw.clone(),
                _ => return Err(format!("{name} is not of type object.")),
            },
            ArgKind::Any => raw.clone(),
        };
        Ok(value)
    }

    fn check_choice(&self, value: &str, label: &str) -> Result<(), String> {
        if self.choices.is_empty() || self.choices.iter().any(|c| c == value) {
            Ok(())
        } else {
            Err(format!("{label} is not one of {}.", self.choices.join(", ")))
        }
    }
}

/// Validate and coerce every registered argument in place, then fill in
/// defaults for the ones the client left out.
pub fn validate(args: &[ArgSpec], req: &mut RestRequest) -> Result<(), RestError> {
    let mut missing = Vec::new();
    let mut invalid = Map::new();

    for spec in args {
        if !req.has_param(&spec.name) {
            if spec.required {
                missing.push(spec.name.clone());
            } else if let Some(d) = &spec.default {
                // A default set by the server itself wins over the registered one.
                req.defaults
                    .entry(spec.name.clone())
                    .or_insert_with(|| d.clone());
            }
            continue;
        }
        let raw = req.param(&spec.name).cloned().unwrap_or(Json::Null);
        match spec.coerce(&raw) {
            Ok(v) => req.set_param(&spec.name, v),
            Err(msg) => {
                invalid.insert(spec.name.clone(), Json::String(msg));
            }
        }
    }

    if !missing.is_empty() {
        return Err(RestError::bad_request(
            "rest_missing_callback_param",
            format!("Missing parameter(s): {}", missing.join(", ")),
        )
        .with_data("params", json!(missing)));
    }
    if !invalid.is_empty() {
        let names: Vec<&str> = invalid.keys().map(String::as_str).collect();
        return Err(RestError::bad_request(
            "rest_invalid_param",
            format!("Invalid parameter(s): {}", names.join(", ")),
        )
        .with_data("params", Json::Object(invalid)));
    }
    Ok(())
}

fn parse_int(raw: &Json) -> Option<i64> {
    match raw {
        Json::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn parse_bool(raw: &Json) -> Result<bool, ()> {
    match raw {
        Json::Bool(b) => Ok(*b),
        Json::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(()),
        },
        Json::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(()),
        },
        _ => Err(()),
    }
}

/// Err carries the index of the first bad element.
pub(crate) fn parse_id_list(raw: &Json) -> Result<Vec<u64>, usize> {
    let parts: Vec<Json> = match raw {
        Json::Array(a) => a.clone(),
        Json::String(s) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .map(|p| Json::String(p.to_string()))
            .collect(),
        Json::Number(_) => vec![raw.clone()],
        _ => return Err(0),
    };
    parts
        .iter()
        .enumerate()
        .map(|(i, v)| {
            parse_int(v)
                .and_then(|n| u64::try_from(n).ok())
                .ok_or(i)
        })
        .collect()
}

pub(crate) fn parse_string_list(raw: &Json) -> Result<Vec<String>, ()> {
    match raw {
        Json::Array(a) => a
            .iter()
            .map(|v| match v {
                Json::String(s) => Ok(s.clone()),
                Json::Number(n) => Ok(n.to_string()),
                _ => Err(()),
            })
            .collect(),
        Json::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()),
        _ => Err(()),
    }
}
