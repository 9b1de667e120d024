//! Unit image: a JSON container for shipping verified units between processes.
//!
//! Layout is `{"magic":"BVMU","version":1,"unit":{...}}`. Nested prototypes
//! are stored inline. Decoding rebuilds every unit through verification, so a
//! tampered image is rejected the same way a broken compiler output would be.

use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::val::Val;

use super::bytecode::{Op, Unit, UnitParts};

const MAGIC: &str = "BVMU";
pub const IMAGE_VERSION: u16 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Image {
    magic: String,
    version: u16,
    unit: UnitImage,
}

#[derive(Debug, Serialize, Deserialize)]
struct UnitImage {
    name: String,
    arity: u16,
    n_locals: u16,
    #[serde(default)]
    n_captures: u16,
    code: Vec<Op>,
    #[serde(default)]
    consts: Vec<ConstImage>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    protos: Vec<UnitImage>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
enum ConstImage {
    Nil,
    Bool(bool),
    Int(i64),
    /// IEEE-754 bit pattern; JSON numbers do not round-trip every f64.
    Float(u64),
    Str(String),
}

impl ConstImage {
    fn encode(val: &Val) -> Result<Self> {
        Ok(match val {
            Val::Nil => ConstImage::Nil,
            Val::Bool(b) => ConstImage::Bool(*b),
            Val::Int(i) => ConstImage::Int(*i),
            Val::Float(f) => ConstImage::Float(f.to_bits()),
            Val::Str(s) => ConstImage::Str(s.to_string()),
            other => bail!("constant of type {} cannot be stored in a unit image", other.type_name()),
        })
    }

    fn decode(self) -> Val {
        match self {
            ConstImage::Nil => Val::Nil,
            ConstImage::Bool(b) => Val::Bool(b),
            ConstImage::Int(i) => Val::Int(i),
            ConstImage::Float(bits) => Val::Float(f64::from_bits(bits)),
            ConstImage::Str(s) => Val::from(s),
        }
    }
}

impl UnitImage {
    fn encode(unit: &Unit) -> Result<Self> {
        let consts = unit
            .consts()
            .iter()
            .enumerate()
            .map(|(idx, val)| ConstImage::encode(val).with_context(|| format!("unit '{}' constant {}", unit.name(), idx)))
            .collect::<Result<Vec<_>>>()?;
        let protos = unit
            .protos()
            .iter()
            .map(|proto| UnitImage::encode(proto))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: unit.name().to_string(),
            arity: unit.arity(),
            n_locals: unit.n_locals(),
            n_captures: unit.n_captures(),
            code: unit.code().to_vec(),
            consts,
            names: unit.names().iter().map(str::to_string).collect(),
            protos,
        })
    }

    fn decode(self) -> Result<Arc<Unit>> {
        let protos = self
            .protos
            .into_iter()
            .map(UnitImage::decode)
            .collect::<Result<Vec<_>>>()?;
        let name = self.name;
        Unit::new(UnitParts {
            name: name.clone(),
            arity: self.arity,
            n_locals: self.n_locals,
            n_captures: self.n_captures,
            code: self.code,
            consts: self.consts.into_iter().map(ConstImage::decode).collect(),
            names: self.names,
            protos,
        })
        .with_context(|| format!("unit '{name}' failed verification"))
    }
}

impl Unit {
    /// Serialize this unit and its prototypes into an image.
    pub fn to_image(&self) -> Result<String> {
        let image = Image {
            magic: MAGIC.to_string(),
            version: IMAGE_VERSION,
            unit: UnitImage::encode(self)?,
        };
        Ok(serde_json::to_string(&image)?)
    }

    /// Decode and re-verify an image produced by [`Unit::to_image`].
    pub fn from_image(text: &str) -> Result<Arc<Unit>> {
        let image: Image = serde_json::from_str(text).context("malformed unit image")?;
        ensure!(image.magic == MAGIC, "bad unit image magic '{}'", image.magic);
        ensure!(
            image.version == IMAGE_VERSION,
            "unsupported unit image version {} (expected {})",
            image.version,
            IMAGE_VERSION
        );
        image.unit.decode()
    }
}
