//! Sub-decoders for vendor annotation payloads carried in a single INFO field.
//!
//! A sub-decoder is bound to one INFO identifier. It turns the comma-split values of that
//! field into [`AnnotationSubRecord`]s and decides which allele each sub-record describes.
//! Fields without a registered sub-decoder are decoded like any other INFO field.

pub mod snpeff;
pub mod vep;

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Issue;
use crate::record::AlleleKey;
use crate::types::Header;

pub use snpeff::SnpEffDecoder;
pub use vep::VepDecoder;

/// A converted sub-field value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Raw(String),
    Integer(i32),
    List(Vec<String>),
    IntegerList(Vec<i32>),
    /// allele → frequency, e.g. from `A:0.1&T:0.2`
    Frequencies(IndexMap<String, f32>),
}

impl AnnotationValue {
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            AnnotationValue::Raw(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            AnnotationValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// One transcript or feature entry of an annotation payload, keyed by sub-field name in
/// schema order. Empty sub-fields are left out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationSubRecord(IndexMap<String, AnnotationValue>);

impl AnnotationSubRecord {
    /// Zips `tokens` with `schema`, converting each non-empty token with `convert`.
    pub fn from_tokens<'a, I, F>(schema: &[String], tokens: I, convert: F) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        F: Fn(&str, &str) -> AnnotationValue,
    {
        AnnotationSubRecord(
            schema
                .iter()
                .zip(tokens)
                .filter(|(_, token)| !token.is_empty())
                .map(|(name, token)| (name.clone(), convert(name, token)))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnnotationValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a sub-decoder may consult when attributing a sub-record to an allele.
#[derive(Debug, Clone, Copy)]
pub struct AlleleContext<'a> {
    pub reference: &'a str,
    pub alternates: &'a [String],
}

pub trait AnnotationDecoder: fmt::Debug + Send + Sync {
    /// The INFO identifier this decoder is bound to.
    fn field(&self) -> &str;

    /// The ordered sub-field names.
    fn schema(&self) -> &[String];

    /// Decodes the comma-split values of the field, one sub-record per value.
    fn decode(&self, values: &[&str]) -> Vec<AnnotationSubRecord>;

    /// The allele `entry` describes, or the reason it cannot be told.
    fn attribute_allele(
        &self,
        entry: &AnnotationSubRecord,
        context: &AlleleContext<'_>,
    ) -> Result<AlleleKey, String>;
}

/// The registry of annotation sub-decoders, keyed by INFO identifier.
#[derive(Debug, Default)]
pub struct AnnotationDecoders {
    decoders: IndexMap<String, Box<dyn AnnotationDecoder>>,
}

impl AnnotationDecoders {
    /// An empty registry; every INFO field is decoded generically.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the VEP (`CSQ`) and snpEff (`EFF`) decoders, their schemas taken from
    /// the header where declared.
    pub fn from_header(header: &Header) -> Self {
        let mut decoders = Self::new();
        decoders.register(VepDecoder::from_header(header));
        decoders.register(SnpEffDecoder::from_header(header));
        decoders
    }

    /// Registers `decoder` for its field, returning the decoder it replaces.
    pub fn register<D: AnnotationDecoder + 'static>(
        &mut self,
        decoder: D,
    ) -> Option<Box<dyn AnnotationDecoder>> {
        debug!(field = decoder.field(), schema = ?decoder.schema(), "registering annotation decoder");
        self.decoders
            .insert(decoder.field().to_owned(), Box::new(decoder))
    }

    pub fn get(&self, field: &str) -> Option<&dyn AnnotationDecoder> {
        self.decoders.get(field).map(|d| &**d)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }
}

/// Decodes `raw` with `decoder` and groups the sub-records by allele, keeping their order of
/// appearance. Unattributable entries go to the shared bucket.
pub(crate) fn decode_attributed(
    decoder: &dyn AnnotationDecoder,
    raw: &str,
    context: &AlleleContext<'_>,
    issues: &mut Vec<Issue>,
) -> IndexMap<AlleleKey, Vec<AnnotationSubRecord>> {
    let values: Vec<&str> = raw.split(',').collect();
    let mut attributed: IndexMap<AlleleKey, Vec<AnnotationSubRecord>> = IndexMap::new();
    for (index, entry) in decoder.decode(&values).into_iter().enumerate() {
        let key = match decoder.attribute_allele(&entry, context) {
            Ok(key) => key,
            Err(reason) => {
                issues.push(Issue::UnattributableAnnotation {
                    field: decoder.field().to_owned(),
                    index,
                    reason,
                });
                AlleleKey::Shared
            }
        };
        attributed.entry(key).or_default().push(entry);
    }
    attributed
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Attributes every entry by its `Allele` sub-field, or fails.
    #[derive(Debug)]
    struct Simple {
        schema: Vec<String>,
    }

    impl AnnotationDecoder for Simple {
        fn field(&self) -> &str {
            "SIMPLE"
        }

        fn schema(&self) -> &[String] {
            &self.schema
        }

        fn decode(&self, values: &[&str]) -> Vec<AnnotationSubRecord> {
            values
                .iter()
                .map(|v| {
                    AnnotationSubRecord::from_tokens(&self.schema, v.split(':'), |_, t| {
                        AnnotationValue::Raw(t.into())
                    })
                })
                .collect()
        }

        fn attribute_allele(
            &self,
            entry: &AnnotationSubRecord,
            _context: &AlleleContext<'_>,
        ) -> Result<AlleleKey, String> {
            entry
                .get("Allele")
                .and_then(AnnotationValue::as_raw)
                .map(|a| AlleleKey::Alternate(a.into()))
                .ok_or_else(|| "no allele".into())
        }
    }

    #[test]
    fn test_registry() {
        let mut decoders = AnnotationDecoders::new();
        assert!(decoders.get("SIMPLE").is_none());
        let schema = vec!["Allele".to_string(), "Name".to_string()];
        assert!(decoders.register(Simple { schema: schema.clone() }).is_none());
        assert!(decoders.register(Simple { schema }).is_some());
        assert_eq!(decoders.fields().collect::<Vec<_>>(), vec!["SIMPLE"]);
    }

    #[test]
    fn test_decode_attributed_keeps_order() {
        let decoder = Simple {
            schema: vec!["Allele".to_string(), "Name".to_string()],
        };
        let alternates = vec!["A".to_string(), "G".to_string()];
        let context = AlleleContext {
            reference: "C",
            alternates: &alternates,
        };
        let mut issues = vec![];
        let attributed =
            decode_attributed(&decoder, "A:one,G:two,:three,A:four", &context, &mut issues);

        let names = |key: &AlleleKey| -> Vec<&str> {
            attributed[key]
                .iter()
                .map(|e| e.get("Name").and_then(AnnotationValue::as_raw).unwrap())
                .collect()
        };
        assert_eq!(names(&AlleleKey::Alternate("A".into())), vec!["one", "four"]);
        assert_eq!(names(&AlleleKey::Alternate("G".into())), vec!["two"]);
        assert_eq!(names(&AlleleKey::Shared), vec!["three"]);
        assert_eq!(
            issues,
            vec![Issue::UnattributableAnnotation {
                field: "SIMPLE".into(),
                index: 2,
                reason: "no allele".into()
            }]
        );
    }

    #[test]
    fn test_from_tokens_skips_empty() {
        let schema = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let entry = AnnotationSubRecord::from_tokens(&schema, vec!["1", "", "3", "4"], |_, t| {
            AnnotationValue::Raw(t.into())
        });
        assert_eq!(entry.len(), 2);
        assert!(entry.get("b").is_none());
        assert_eq!(entry.get("c"), Some(&AnnotationValue::Raw("3".into())));
    }
}
