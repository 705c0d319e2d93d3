//! Interface descriptions and the method schema derived from them.
//!
//! An IDL is a JSON document describing a service: its user-defined types,
//! its constructor, and its callable functions. [`Schema::from_idl`] turns it
//! into a map of [`MethodSignature`]s, rejecting anything the codec could not
//! later encode (unknown types, duplicate names, selector collisions).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use dg_domain::error::{Error, Result};

use crate::selector::Selector;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Raw IDL document
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The interface description as published alongside a service.
///
/// Type positions are kept as raw JSON here; they are only interpreted
/// when building a [`Schema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Idl {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub type_defs: Vec<TypeDef>,
    #[serde(default)]
    pub constructor: Option<Constructor>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Idl {
    pub fn from_json(value: Json) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Schema(format!("malformed idl: {e}")))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Schema(format!("malformed idl: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypeDef {
    Struct {
        name: String,
        #[serde(default)]
        fields: Vec<Field>,
    },
    Enum {
        name: String,
        #[serde(default)]
        variants: Vec<String>,
    },
    Event {
        name: String,
        #[serde(default)]
        fields: Vec<EventField>,
    },
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Struct { name, .. } | TypeDef::Enum { name, .. } | TypeDef::Event { name, .. } => {
                name
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Json,
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constructor {
    #[serde(default)]
    pub inputs: Vec<Field>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub inputs: Vec<Field>,
    #[serde(default)]
    pub output: Option<Json>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Immutable,
    #[default]
    Mutable,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    U128,
    I128,
    F32,
    F64,
    String,
    Bytes,
    Address,
    Balance,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::U8 => "u8",
            Primitive::I8 => "i8",
            Primitive::U16 => "u16",
            Primitive::I16 => "i16",
            Primitive::U32 => "u32",
            Primitive::I32 => "i32",
            Primitive::U64 => "u64",
            Primitive::I64 => "i64",
            Primitive::U128 => "u128",
            Primitive::I128 => "i128",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::String => "string",
            Primitive::Bytes => "bytes",
            Primitive::Address => "address",
            Primitive::Balance => "balance",
        }
    }
}

impl FromStr for Primitive {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "bool" => Primitive::Bool,
            "u8" => Primitive::U8,
            "i8" => Primitive::I8,
            "u16" => Primitive::U16,
            "i16" => Primitive::I16,
            "u32" => Primitive::U32,
            "i32" => Primitive::I32,
            "u64" => Primitive::U64,
            "i64" => Primitive::I64,
            "u128" => Primitive::U128,
            "i128" => Primitive::I128,
            "f32" => Primitive::F32,
            "f64" => Primitive::F64,
            "string" => Primitive::String,
            "bytes" => Primitive::Bytes,
            "address" => Primitive::Address,
            "balance" => Primitive::Balance,
            other => return Err(Error::Schema(format!("unrecognized type {other:?}"))),
        })
    }
}

/// A resolved IDL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Primitive(Primitive),
    Defined(String),
    List(Box<Type>),
    Set(Box<Type>),
    Optional(Box<Type>),
    Array(Box<Type>, u64),
    Tuple(Vec<Type>),
    Map(Box<Type>, Box<Type>),
    Result(Box<Type>, Box<Type>),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => f.write_str(p.as_str()),
            Type::Defined(name) => f.write_str(name),
            Type::List(t) => write!(f, "Vec<{t}>"),
            Type::Set(t) => write!(f, "Set<{t}>"),
            Type::Optional(t) => write!(f, "Option<{t}>"),
            Type::Array(t, n) => write!(f, "[{t};{n}]"),
            Type::Tuple(ts) => {
                let inner: Vec<String> = ts.iter().map(ToString::to_string).collect();
                write!(f, "({})", inner.join(","))
            }
            Type::Map(k, v) => write!(f, "Map<{k},{v}>"),
            Type::Result(ok, err) => write!(f, "Result<{ok},{err}>"),
        }
    }
}

/// Resolve a raw JSON type against the set of declared type names.
fn parse_type(raw: &Json, defined: &BTreeSet<String>) -> Result<Type> {
    match raw {
        Json::String(s) => Ok(Type::Primitive(s.parse()?)),
        Json::Object(obj) => {
            let kind = obj
                .get("type")
                .and_then(Json::as_str)
                .ok_or_else(|| Error::Schema(format!("type object without \"type\": {raw}")))?;
            let params = obj.get("params").unwrap_or(&Json::Null);
            match kind {
                "defined" => {
                    let name = params
                        .get("type")
                        .and_then(Json::as_str)
                        .or_else(|| params.as_str())
                        .ok_or_else(|| Error::Schema(format!("defined type without name: {raw}")))?;
                    if !defined.contains(name) {
                        return Err(Error::Schema(format!("unrecognized type {name:?}")));
                    }
                    Ok(Type::Defined(name.to_string()))
                }
                "list" => Ok(Type::List(Box::new(parse_type(params, defined)?))),
                "set" => Ok(Type::Set(Box::new(parse_type(params, defined)?))),
                "optional" => Ok(Type::Optional(Box::new(parse_type(params, defined)?))),
                "array" => {
                    let (inner, len) = match params.as_array().map(Vec::as_slice) {
                        Some([inner, len]) => (inner, len),
                        _ => return Err(Error::Schema(format!("array needs [type, len]: {raw}"))),
                    };
                    let len = len
                        .as_u64()
                        .ok_or_else(|| Error::Schema(format!("array length must be an integer: {raw}")))?;
                    Ok(Type::Array(Box::new(parse_type(inner, defined)?), len))
                }
                "tuple" => {
                    let items = params
                        .as_array()
                        .ok_or_else(|| Error::Schema(format!("tuple needs a list of types: {raw}")))?;
                    let types = items
                        .iter()
                        .map(|t| parse_type(t, defined))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Type::Tuple(types))
                }
                "map" | "result" => {
                    let (a, b) = match params.as_array().map(Vec::as_slice) {
                        Some([a, b]) => (parse_type(a, defined)?, parse_type(b, defined)?),
                        _ => return Err(Error::Schema(format!("{kind} needs two type params: {raw}"))),
                    };
                    if kind == "map" {
                        Ok(Type::Map(Box::new(a), Box::new(b)))
                    } else {
                        Ok(Type::Result(Box::new(a), Box::new(b)))
                    }
                }
                other => Err(Error::Schema(format!("unrecognized type {other:?}"))),
            }
        }
        other => Err(Error::Schema(format!("unrecognized type {other}"))),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Schema
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// One callable method of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub inputs: Vec<Param>,
    pub output: Option<Type>,
    pub mutability: Mutability,
    pub selector: Selector,
}

impl MethodSignature {
    /// Typed rendering, e.g. `the(DefTy,bytes)->u64`. Diagnostics only; the
    /// selector is derived from the name (see [`Selector::for_method`]).
    pub fn canonical(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(|p| p.ty.to_string()).collect();
        match &self.output {
            Some(out) => format!("{}({})->{out}", self.name, inputs.join(",")),
            None => format!("{}({})", self.name, inputs.join(",")),
        }
    }

    pub fn arity(&self) -> usize {
        self.inputs.len()
    }
}

/// The checked method surface of one IDL.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub methods: BTreeMap<String, MethodSignature>,
    /// Constructor inputs, empty when the IDL declares none.
    pub constructor: Vec<Param>,
    /// Names of the declared event types.
    pub events: Vec<String>,
}

impl Schema {
    /// Build the schema, validating every type position.
    ///
    /// Fails with [`Error::Schema`] on duplicate function names, unknown
    /// types, or two methods hashing to the same selector.
    pub fn from_idl(idl: &Idl) -> Result<Self> {
        let mut defined = BTreeSet::new();
        for def in &idl.type_defs {
            if !defined.insert(def.name().to_string()) {
                return Err(Error::Schema(format!("duplicate type {:?}", def.name())));
            }
        }

        for def in &idl.type_defs {
            match def {
                TypeDef::Struct { fields, .. } => {
                    for field in fields {
                        parse_type(&field.ty, &defined)?;
                    }
                }
                TypeDef::Event { fields, .. } => {
                    for field in fields {
                        parse_type(&field.ty, &defined)?;
                    }
                }
                TypeDef::Enum { .. } => {}
            }
        }

        let mut methods = BTreeMap::new();
        let mut selectors: BTreeMap<Selector, String> = BTreeMap::new();

        for func in &idl.functions {
            if methods.contains_key(&func.name) {
                return Err(Error::Schema(format!("duplicate function {:?}", func.name)));
            }
            let inputs = parse_params(&func.inputs, &defined)?;
            let output = func
                .output
                .as_ref()
                .map(|t| parse_type(t, &defined))
                .transpose()?;

            let selector = Selector::for_method(&func.name);
            if let Some(existing) = selectors.insert(selector, func.name.clone()) {
                return Err(Error::Schema(format!(
                    "selector {selector} of {:?} collides with {existing:?}",
                    func.name
                )));
            }

            methods.insert(
                func.name.clone(),
                MethodSignature {
                    name: func.name.clone(),
                    inputs,
                    output,
                    mutability: func.mutability,
                    selector,
                },
            );
        }

        let constructor = match &idl.constructor {
            Some(c) => parse_params(&c.inputs, &defined)?,
            None => Vec::new(),
        };

        let events = idl
            .type_defs
            .iter()
            .filter_map(|d| match d {
                TypeDef::Event { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();

        tracing::debug!(idl = %idl.name, methods = methods.len(), "schema built");

        Ok(Self {
            name: idl.name.clone(),
            methods,
            constructor,
            events,
        })
    }

    pub fn get(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.get(name)
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }
}

fn parse_params(fields: &[Field], defined: &BTreeSet<String>) -> Result<Vec<Param>> {
    fields
        .iter()
        .map(|f| {
            Ok(Param {
                name: f.name.clone(),
                ty: parse_type(&f.ty, defined)?,
            })
        })
        .collect()
}

/// Parse an IDL JSON document straight into a [`Schema`].
pub fn build_schema(description: &Json) -> Result<Schema> {
    Schema::from_idl(&Idl::from_json(description.clone())?)
}
