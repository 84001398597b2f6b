//! Property-based tests for dispatch and codecs using proptest.

use proptest::prelude::*;

use modelspec_core::document::parse_str;
use modelspec_core::{Author, CodecRegistry, ModelDescriptor, Transformation};

// --- Dispatch properties ---

proptest! {
    #[test]
    fn at_most_one_codec_accepts_semver(
        major in 0u32..3,
        minor in 0u32..12,
        patch in 0u32..20,
        pre in proptest::option::of("[a-z]{1,8}"),
    ) {
        let version = match pre {
            Some(pre) => format!("{}.{}.{}-{}", major, minor, patch, pre),
            None => format!("{}.{}.{}", major, minor, patch),
        };
        let registry = CodecRegistry::default();
        let accepting = registry.codecs().filter(|c| c.accepts_version(&version)).count();
        prop_assert!(accepting <= 1, "{} accepted {} times", version, accepting);
    }

    #[test]
    fn at_most_one_codec_accepts_any_string(version in "\\PC{0,16}") {
        let registry = CodecRegistry::default();
        prop_assert!(registry.codecs().filter(|c| c.accepts_version(&version)).count() <= 1);
    }

    #[test]
    fn series_versions_dispatch_to_their_generation(minor in 3u32..5, patch in 0u32..50) {
        let version = format!("0.{}.{}", minor, patch);
        let registry = CodecRegistry::default();
        let generation = registry.codec_for_version(&version).map(|c| c.generation());
        prop_assert_eq!(generation, Some(minor));
    }
}

// --- Codec properties ---

proptest! {
    #[test]
    fn scalar_and_single_element_list_agree(gain in -1.0e4f64..1.0e4, offset in -1.0e4f64..1.0e4) {
        let doc = |g: String, o: String| {
            parse_str(&format!(
                "format_version: 0.3.6\noutputs:\n  - name: y\n    postprocessing:\n      - name: scale_linear\n        kwargs: {{gain: {}, offset: {}, mode: fixed}}\n",
                g, o
            ))
            .unwrap()
        };
        let registry = CodecRegistry::default();
        let scalar = registry.decode_any(&doc(gain.to_string(), offset.to_string())).unwrap();
        let listed = registry
            .decode_any(&doc(format!("[{}]", gain), format!("[{}]", offset)))
            .unwrap();
        prop_assert_eq!(&scalar, &listed);
        prop_assert_eq!(
            scalar.output("y").unwrap().postprocessing().unwrap(),
            &[Transformation::scale_linear(gain, offset)][..]
        );
    }

    #[test]
    fn set_tags_keeps_first_occurrences(tags in proptest::collection::vec("[a-c]{1,2}", 0..12)) {
        let mut d = ModelDescriptor::new();
        d.set_tags(Some(tags.clone()));
        let kept = d.tags().unwrap_or_default();
        let mut expected: Vec<String> = Vec::new();
        for tag in tags {
            if !expected.contains(&tag) {
                expected.push(tag);
            }
        }
        prop_assert_eq!(kept, &expected[..]);
    }

    #[test]
    fn descriptors_round_trip_in_every_generation(
        name in "[A-Za-z][A-Za-z0-9 _-]{0,24}",
        authors in proptest::collection::vec("[A-Z][a-z]{1,10}", 1..4),
        tags in proptest::collection::btree_set("[a-z]{2,8}", 0..5),
        version_index in 0usize..4,
    ) {
        let version = ["0.1.0", "0.2.0", "0.3.6", "0.4.0"][version_index];
        let mut d = ModelDescriptor::with_format_version(version);
        d.set_name(Some(name));
        d.set_authors(Some(authors.into_iter().map(Author::new).collect()));
        d.set_tags(Some(tags.into_iter().collect()));
        if version_index < 2 {
            // implied weights entry of the oldest generations
            d.add_weights(modelspec_core::WeightsEntry::tensorflow_saved_model_bundle());
        }

        let registry = CodecRegistry::default();
        let doc = registry.encode_for(&d).unwrap();
        prop_assert_eq!(registry.decode_any(&doc).unwrap(), d);
    }
}
