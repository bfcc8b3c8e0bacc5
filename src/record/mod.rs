pub mod arity;
mod decoder;
pub mod genotype;
mod sample;
pub mod value;

use getset::Getters;
use indexmap::IndexMap;

use crate::annotation::AnnotationSubRecord;
use crate::types::Sample;
pub use decoder::{decode, Decoded, Decoder};
use genotype::Genotype;
pub use sample::decode_samples;
use value::Value;

/// The bucket an INFO value is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlleleKey {
    /// Values that describe the site rather than one allele.
    Shared,
    /// The reference allele; only `Number=R` fields attribute values to it.
    Reference,
    /// An alternate allele, spelled as in ALT.
    Alternate(String),
}

/// A decoded field: one value, a list of values, a genotype or annotation sub-records.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Single(Value),
    List(Vec<Value>),
    Genotype(Genotype),
    Annotations(Vec<AnnotationSubRecord>),
}

impl FieldValue {
    /// A single value stays single; anything else becomes a list.
    pub(crate) fn from_values(mut values: Vec<Value>) -> Self {
        if values.len() == 1 {
            FieldValue::Single(values.remove(0))
        } else {
            FieldValue::List(values)
        }
    }

    pub fn single(&self) -> Option<&Value> {
        match self {
            FieldValue::Single(v) => Some(v),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&[Value]> {
        match self {
            FieldValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn genotype(&self) -> Option<&Genotype> {
        match self {
            FieldValue::Genotype(gt) => Some(gt),
            _ => None,
        }
    }

    pub fn annotations(&self) -> Option<&[AnnotationSubRecord]> {
        match self {
            FieldValue::Annotations(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Single(Value::Missing))
    }
}

/// Field identifier → decoded value, in order of appearance.
pub type Fields = IndexMap<String, FieldValue>;

/// INFO values grouped by the allele they describe.
///
/// The shared bucket and one bucket per ALT allele always exist; the reference bucket only
/// once a `Number=R` field put a value into it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Info {
    shared: Fields,
    alleles: IndexMap<AlleleKey, Fields>,
}

impl Info {
    pub(crate) fn new(alt_alleles: &[String]) -> Self {
        Info {
            shared: Fields::new(),
            alleles: alt_alleles
                .iter()
                .map(|allele| (AlleleKey::Alternate(allele.clone()), Fields::new()))
                .collect(),
        }
    }

    pub(crate) fn insert(&mut self, key: AlleleKey, id: &str, value: FieldValue) {
        let bucket = match key {
            AlleleKey::Shared => &mut self.shared,
            key => self.alleles.entry(key).or_default(),
        };
        bucket.insert(id.to_owned(), value);
    }

    pub fn bucket(&self, key: &AlleleKey) -> Option<&Fields> {
        match key {
            AlleleKey::Shared => Some(&self.shared),
            key => self.alleles.get(key),
        }
    }

    pub fn shared(&self) -> &Fields {
        &self.shared
    }

    /// Looks `id` up in the bucket of `key`, falling back to the shared bucket.
    pub fn get(&self, key: &AlleleKey, id: &str) -> Option<&FieldValue> {
        self.bucket(key)
            .and_then(|fields| fields.get(id))
            .or_else(|| self.shared.get(id))
    }

    /// All buckets, the shared one first.
    pub fn buckets(&self) -> impl Iterator<Item = (&AlleleKey, &Fields)> {
        std::iter::once((&AlleleKey::Shared, &self.shared)).chain(self.alleles.iter())
    }
}

/// The FILTER column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `.`
    Missing,
    /// `PASS`
    Pass,
    /// The filters that failed.
    Failed(Vec<String>),
}

impl Filter {
    pub(crate) fn parse(column: &str) -> Self {
        match column {
            crate::types::MISSING => Filter::Missing,
            "PASS" => Filter::Pass,
            failed => Filter::Failed(failed.split(';').map(str::to_owned).collect()),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Filter::Missing => vec![],
            Filter::Pass => vec!["PASS"],
            Filter::Failed(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// A fully decoded record line.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct Record {
    chrom: String,
    /// 1-based
    pos: u64,
    id: Option<String>,
    ref_allele: String,
    alt_alleles: Vec<String>,
    qual: Option<f32>,
    filter: Filter,
    info: Info,
    samples: IndexMap<Sample, Fields>,
}

impl Record {
    /// For a given INFO tag and allele, return its contents, falling back to values shared by
    /// all alleles.
    pub fn info_value(&self, key: &AlleleKey, tag: &str) -> Option<&FieldValue> {
        self.info.get(key, tag)
    }

    pub fn has_flag(&self, tag: &str) -> bool {
        matches!(
            self.info.shared().get(tag),
            Some(FieldValue::Single(Value::Flag(true)))
        )
    }

    /// For a given FORMAT tag, return its value in every sample, in sample order.
    pub fn format(&self, tag: &str) -> Vec<Option<&FieldValue>> {
        self.samples.values().map(|fields| fields.get(tag)).collect()
    }

    pub fn genotypes(&self) -> Vec<Option<&Genotype>> {
        self.format("GT")
            .into_iter()
            .map(|value| value.and_then(FieldValue::genotype))
            .collect()
    }
}
