//! Wire form of transformations: `{name, kwargs {mode, axes, ...}}`.
//!
//! The layout is the same in every generation that carries explicit
//! transformations; only the ScaleMinMax name and its reference key differ.

use serde_yaml::{Mapping, Value};

use super::common::Dialect;
use super::fields::{Emitter, FieldPath, Fields};
use crate::document::kind_of;
use crate::error::CodecError;
use crate::transformation::{
    Binarize, Clip, Mode, Percentile, ScaleLinear, ScaleMinMax, Transformation,
    TransformationKind, ZeroMeanUnitVariance,
};

const NAME: &str = "name";
const KWARGS: &str = "kwargs";
const MODE: &str = "mode";
const AXES: &str = "axes";

impl Dialect {
    /// Wire name of `kind` in this dialect.
    pub fn transformation_name(self, kind: TransformationKind) -> &'static str {
        match kind {
            TransformationKind::ScaleLinear => "scale_linear",
            TransformationKind::ZeroMeanUnitVariance => "zero_mean_unit_variance",
            TransformationKind::ScaleMinMax if self == Dialect::V4 => "scale_range",
            TransformationKind::ScaleMinMax => "scale_min_max",
            TransformationKind::Percentile => "percentile",
            TransformationKind::Binarize => "binarize",
            TransformationKind::Clip => "clip",
        }
    }

    pub fn transformation_kind(self, name: &str) -> Option<TransformationKind> {
        TransformationKind::ALL
            .into_iter()
            .find(|kind| self.transformation_name(*kind) == name)
    }
}

/// Decode the transformation list at `key` of a node.
pub fn decode_list(
    node: Fields<'_>,
    key: &str,
    dialect: Dialect,
) -> Result<Option<Vec<Transformation>>, CodecError> {
    let Some(items) = node.list(key)? else {
        return Ok(None);
    };
    let mut steps = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = node.element_path(key, i);
        let map = item.as_mapping().ok_or_else(|| {
            CodecError::invalid(
                path.as_str(),
                format!("expected a mapping, found {}", kind_of(item)),
            )
        })?;
        steps.push(decode(Fields::nested(map, &path), dialect)?);
    }
    Ok(Some(steps))
}

/// Decode one `{name, kwargs}` record.
pub fn decode(fields: Fields<'_>, dialect: Dialect) -> Result<Transformation, CodecError> {
    let name = fields.required_string(NAME)?;
    let kind = dialect
        .transformation_kind(&name)
        .ok_or(CodecError::UnknownTransformationKind { kind: name })?;

    let empty = Mapping::new();
    let kwargs_path: FieldPath = fields.path_of(KWARGS);
    let kwargs = Fields::nested(fields.mapping(KWARGS)?.unwrap_or(&empty), &kwargs_path);

    let mode = decode_mode(kwargs)?;
    let axes = kwargs.string(AXES)?;

    let step = match kind {
        TransformationKind::ScaleLinear => Transformation::ScaleLinear(ScaleLinear {
            gain: kwargs.number("gain")?,
            offset: kwargs.number("offset")?,
            mode,
            axes,
        }),
        TransformationKind::ZeroMeanUnitVariance => {
            Transformation::ZeroMeanUnitVariance(ZeroMeanUnitVariance {
                mean: kwargs.number("mean")?,
                std: kwargs.number("std")?,
                mode,
                axes,
            })
        }
        TransformationKind::ScaleMinMax => Transformation::ScaleMinMax(ScaleMinMax {
            reference_input: kwargs.string(dialect.reference_key())?,
            min_percentile: kwargs.number("min_percentile")?,
            max_percentile: kwargs.number("max_percentile")?,
            mode,
            axes,
        }),
        TransformationKind::Percentile => Transformation::Percentile(Percentile {
            min_percentile: kwargs.number("min_percentile")?,
            max_percentile: kwargs.number("max_percentile")?,
            mode,
            axes,
        }),
        TransformationKind::Binarize => Transformation::Binarize(Binarize {
            threshold: kwargs.number("threshold")?,
            mode,
            axes,
        }),
        TransformationKind::Clip => Transformation::Clip(Clip {
            min: kwargs.number("min")?,
            max: kwargs.number("max")?,
            mode,
            axes,
        }),
    };
    Ok(step)
}

fn decode_mode(kwargs: Fields<'_>) -> Result<Option<Mode>, CodecError> {
    match kwargs.string(MODE)? {
        None => Ok(None),
        Some(mode) => mode
            .parse()
            .map(Some)
            .map_err(|reason| CodecError::invalid(kwargs.path_of(MODE).as_str(), reason)),
    }
}

/// Encode a transformation list; absent stays absent, empty stays empty.
pub fn encode_list(steps: Option<&[Transformation]>, dialect: Dialect) -> Option<Value> {
    steps.map(|steps| Value::Sequence(steps.iter().map(|t| encode(t, dialect)).collect()))
}

/// Encode one transformation. Parameters are always written as scalars.
pub fn encode(step: &Transformation, dialect: Dialect) -> Value {
    let mut kwargs = Emitter::new();
    kwargs.put_str(MODE, step.mode().map(|m| m.as_str()));
    match step {
        Transformation::ScaleLinear(t) => {
            kwargs.put_number("gain", t.gain).put_number("offset", t.offset);
        }
        Transformation::ZeroMeanUnitVariance(t) => {
            kwargs.put_number("mean", t.mean).put_number("std", t.std);
        }
        Transformation::ScaleMinMax(t) => {
            kwargs
                .put_str(dialect.reference_key(), t.reference_input.as_deref())
                .put_number("min_percentile", t.min_percentile)
                .put_number("max_percentile", t.max_percentile);
        }
        Transformation::Percentile(t) => {
            kwargs
                .put_number("min_percentile", t.min_percentile)
                .put_number("max_percentile", t.max_percentile);
        }
        Transformation::Binarize(t) => {
            kwargs.put_number("threshold", t.threshold);
        }
        Transformation::Clip(t) => {
            kwargs.put_number("min", t.min).put_number("max", t.max);
        }
    }
    kwargs.put_str(AXES, step.axes());

    let mut out = Emitter::new();
    out.put(NAME, dialect.transformation_name(step.kind()));
    out.put(KWARGS, Value::Mapping(kwargs.finish()));
    Value::Mapping(out.finish())
}
