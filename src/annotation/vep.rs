//! Ensembl VEP consequence annotations (`CSQ`).
//!
//! Each comma-separated entry is a `|`-delimited list of sub-fields whose first sub-field is
//! the allele the entry describes.

use indexmap::IndexMap;
use tracing::debug;

use crate::annotation::{AlleleContext, AnnotationDecoder, AnnotationSubRecord, AnnotationValue};
use crate::record::AlleleKey;
use crate::types::{FieldClass, Header};

pub const VEP_FIELD: &str = "CSQ";

const FORMAT_MARKER: &str = "Format: ";

/// Sub-fields of VEP's default `--vcf` output.
pub const DEFAULT_VEP_SCHEMA: &[&str] = &[
    "Allele",
    "Consequence",
    "IMPACT",
    "SYMBOL",
    "Gene",
    "Feature_type",
    "Feature",
    "BIOTYPE",
    "EXON",
    "INTRON",
    "HGVSc",
    "HGVSp",
    "cDNA_position",
    "CDS_position",
    "Protein_position",
    "Amino_acids",
    "Codons",
    "Existing_variation",
    "DISTANCE",
    "STRAND",
    "FLAGS",
    "SYMBOL_SOURCE",
    "HGNC_ID",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VepDecoder {
    field: String,
    schema: Vec<String>,
}

impl Default for VepDecoder {
    fn default() -> Self {
        Self::with_schema(
            VEP_FIELD,
            DEFAULT_VEP_SCHEMA.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl VepDecoder {
    pub fn with_schema<F: Into<String>>(field: F, schema: Vec<String>) -> Self {
        Self {
            field: field.into(),
            schema,
        }
    }

    /// Reads the schema from the `Format: A|B|C` part of the `CSQ` description, falling back
    /// to [`DEFAULT_VEP_SCHEMA`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_vcf_decode::annotation::{AnnotationDecoder, VepDecoder};
    /// use rust_vcf_decode::types::Header;
    ///
    /// let header = Header::from_lines(vec![
    ///     r#"##INFO=<ID=CSQ,Number=.,Type=String,Description="Consequence annotations from Ensembl VEP. Format: Allele|Gene|Feature">"#,
    /// ]);
    /// let vep = VepDecoder::from_header(&header);
    /// assert_eq!(vep.schema(), &["Allele", "Gene", "Feature"]);
    /// ```
    pub fn from_header(header: &Header) -> Self {
        let schema = header
            .lookup(FieldClass::Info, VEP_FIELD)
            .and_then(|definition| parse_schema(definition.description()));
        match schema {
            Some(schema) => {
                debug!(?schema, "read VEP schema from header");
                Self::with_schema(VEP_FIELD, schema)
            }
            None => Self::default(),
        }
    }
}

fn parse_schema(description: &str) -> Option<Vec<String>> {
    let (_, format) = description.split_once(FORMAT_MARKER)?;
    let schema: Vec<String> = format
        .trim()
        .split('|')
        .map(|name| name.trim().to_owned())
        .collect();
    if schema.iter().all(String::is_empty) {
        None
    } else {
        Some(schema)
    }
}

fn is_frequency(name: &str) -> bool {
    name == "GMAF" || name.ends_with("_MAF")
}

/// Parses `A:0.1&T:0.2` style frequencies, skipping pairs that do not parse.
fn frequencies(token: &str) -> IndexMap<String, f32> {
    token
        .split('&')
        .filter_map(|pair| {
            let (allele, frequency) = pair.split_once(':')?;
            frequency.parse().ok().map(|f| (allele.to_owned(), f))
        })
        .collect()
}

fn convert(name: &str, token: &str) -> AnnotationValue {
    let raw = || AnnotationValue::Raw(token.to_owned());
    match name {
        "ALLELE_NUM" | "DISTANCE" | "STRAND" => token
            .parse()
            .map(AnnotationValue::Integer)
            .unwrap_or_else(|_| raw()),
        "Consequence" | "Existing_variation" => {
            AnnotationValue::List(token.split('&').map(str::to_owned).collect())
        }
        "PUBMED" => token
            .split('&')
            .map(str::parse)
            .collect::<Result<Vec<i32>, _>>()
            .map(AnnotationValue::IntegerList)
            .unwrap_or_else(|_| raw()),
        name if is_frequency(name) => {
            let frequencies = frequencies(token);
            if frequencies.is_empty() {
                raw()
            } else {
                AnnotationValue::Frequencies(frequencies)
            }
        }
        _ => raw(),
    }
}

/// The allele spelling VEP uses when all alleles share their first base: that base is
/// dropped, and an empty remainder is written as `-`.
fn trimmed<'a>(allele: &'a str, first: char) -> &'a str {
    match &allele[first.len_utf8()..] {
        "" => "-",
        rest => rest,
    }
}

impl AnnotationDecoder for VepDecoder {
    fn field(&self) -> &str {
        &self.field
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn decode(&self, values: &[&str]) -> Vec<AnnotationSubRecord> {
        values
            .iter()
            .map(|entry| AnnotationSubRecord::from_tokens(&self.schema, entry.split('|'), convert))
            .collect()
    }

    fn attribute_allele(
        &self,
        entry: &AnnotationSubRecord,
        context: &AlleleContext<'_>,
    ) -> Result<AlleleKey, String> {
        let allele = self
            .schema
            .first()
            .and_then(|name| entry.get(name))
            .and_then(AnnotationValue::as_raw);

        if let Some(allele) = allele {
            if let Some(alt) = context.alternates.iter().find(|alt| *alt == allele) {
                return Ok(AlleleKey::Alternate(alt.clone()));
            }
            if let Some(first) = context.reference.chars().next() {
                if context.alternates.iter().all(|alt| alt.starts_with(first)) {
                    if let Some(alt) = context
                        .alternates
                        .iter()
                        .find(|alt| trimmed(alt, first) == allele)
                    {
                        return Ok(AlleleKey::Alternate(alt.clone()));
                    }
                }
            }
        }

        // a lone ALT allele owns every entry
        if let [only] = context.alternates {
            return Ok(AlleleKey::Alternate(only.clone()));
        }

        match allele {
            Some(allele) => Err(format!("allele {:?} is not among the ALT alleles", allele)),
            None => Err("entry has no allele".to_string()),
        }
    }
}
