//! Generation 4 (`format_version: 0.4.*`), the newest layout.

use serde_yaml::Value;

use super::common::{self, Dialect};
use super::fields::{Emitter, Fields};
use super::v3::decode_common;
use super::{SchemaCodec, ensure_decodable, ensure_encodable, version};
use crate::document::{Document, kind_of};
use crate::error::CodecError;
use crate::model::{Badge, ModelDescriptor, NEWEST_FORMAT_VERSION};

/// Generation 4 keeps no legacy fields at the top level, so it needs no
/// [`CodecOptions`](super::CodecOptions).
#[derive(Debug, Clone, Copy, Default)]
pub struct V4Codec;

fn decode_badges(root: Fields<'_>) -> Result<Option<Vec<Badge>>, CodecError> {
    let Some(items) = root.list("badges")? else {
        return Ok(None);
    };
    let mut badges = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = root.element_path("badges", i);
        let map = item.as_mapping().ok_or_else(|| {
            CodecError::invalid(
                path.as_str(),
                format!("expected a mapping, found {}", kind_of(item)),
            )
        })?;
        let f = Fields::nested(map, &path);
        badges.push(Badge {
            label: f.required_string("label")?,
            icon: f.string("icon")?,
            url: f.string("url")?,
        });
    }
    Ok(Some(badges))
}

fn encode_badges(badges: Option<&[Badge]>) -> Option<Value> {
    badges.map(|badges| {
        Value::Sequence(
            badges
                .iter()
                .map(|b| {
                    let mut out = Emitter::new();
                    out.put("label", b.label.as_str())
                        .put_str("icon", b.icon.as_deref())
                        .put_str("url", b.url.as_deref());
                    Value::Mapping(out.finish())
                })
                .collect(),
        )
    })
}

impl SchemaCodec for V4Codec {
    fn generation(&self) -> u32 {
        4
    }

    fn canonical_version(&self) -> &'static str {
        NEWEST_FORMAT_VERSION
    }

    fn accepts_version(&self, version: &str) -> bool {
        version::in_series(version, 0, 4)
    }

    fn decode(&self, doc: &Document) -> Result<ModelDescriptor, CodecError> {
        ensure_decodable(self, doc)?;
        let root = Fields::root(doc);
        let mut d = ModelDescriptor::with_format_version(root.required_string("format_version")?);
        decode_common(root, &mut d, Dialect::V4)?;
        d.set_badges(decode_badges(root)?);
        Ok(d)
    }

    fn encode(&self, d: &ModelDescriptor) -> Result<Document, CodecError> {
        ensure_encodable(self, d)?;
        let mut out = Emitter::new();
        out.put("format_version", d.format_version())
            .put_str("type", d.model_type())
            .put_str("name", d.name())
            .put_str("version", d.version())
            .put_str("timestamp", d.timestamp())
            .put_str("description", d.description())
            .put_opt("authors", common::encode_authors(d.authors(), true))
            .put_opt("cite", common::encode_citation_list(d.citations(), true))
            .put_str("documentation", d.documentation())
            .put_opt("tags", common::encode_str_list(d.tags()))
            .put_str("license", d.license())
            .put_opt("badges", encode_badges(d.badges()))
            .put_opt("covers", common::encode_str_list(d.covers()))
            .put_str("source", d.source())
            .put_str("execution_model", d.execution_model())
            .put_str("git_repo", d.git_repo())
            .put_string_map("attachments", d.attachments())
            .put_opt("test_inputs", common::encode_str_list(d.test_inputs()))
            .put_opt("test_outputs", common::encode_str_list(d.test_outputs()))
            .put_opt("sample_inputs", common::encode_str_list(d.sample_inputs()))
            .put_opt("sample_outputs", common::encode_str_list(d.sample_outputs()))
            .put_str("packaged_by", d.packaged_by())
            .put_str("dependencies", d.dependencies())
            .put_str("sha256", d.hash())
            .put_opt("parent", common::encode_parent(d.parent()));
        common::encode_nodes(d, &mut out, Dialect::V4);
        out.put_opt("weights", common::encode_weights_map(d, Dialect::V4))
            .put_opt("config", d.config().cloned().map(Value::Mapping));
        Ok(out.finish())
    }
}
