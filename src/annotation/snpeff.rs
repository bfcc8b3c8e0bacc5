//! snpEff effect annotations (`EFF`).
//!
//! Entries look like `EFFECT(IMPACT|CLASS|...|GENOTYPE_NUMBER|ERRORS)`. The genotype number is
//! a 1-based index into the ALT alleles.

use std::convert::TryFrom;

use tracing::debug;

use crate::annotation::{AlleleContext, AnnotationDecoder, AnnotationSubRecord, AnnotationValue};
use crate::record::AlleleKey;
use crate::types::{FieldClass, Header};

pub const SNPEFF_FIELD: &str = "EFF";

const FORMAT_MARKER: &str = "Format: '";
const OPTIONAL_TRAILER: &str = "[ | ERRORS | WARNINGS ]";
const TRAILING_FIELDS: [&str; 2] = ["ERRORS", "WARNINGS"];
const GENOTYPE_FIELDS: [&str; 3] = ["Genotype_Number", "GenotypeNum", "Genotype"];
const INTEGER_FIELDS: [&str; 3] = ["Exon_Rank", "Amino_Acid_length", "Amino_Acid_Length"];

pub const DEFAULT_SNPEFF_SCHEMA: &[&str] = &[
    "Effect",
    "Effect_Impact",
    "Functional_Class",
    "Codon_Change",
    "Amino_Acid_Change",
    "Amino_Acid_length",
    "Gene_Name",
    "Transcript_BioType",
    "Gene_Coding",
    "Transcript_ID",
    "Exon_Rank",
    "Genotype_Number",
    "ERRORS",
    "WARNINGS",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnpEffDecoder {
    field: String,
    schema: Vec<String>,
    // name of the sub-field holding the genotype number
    genotype_field: Option<String>,
}

impl Default for SnpEffDecoder {
    fn default() -> Self {
        Self::with_schema(
            SNPEFF_FIELD,
            DEFAULT_SNPEFF_SCHEMA.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl SnpEffDecoder {
    /// The genotype number is looked up by name, or else taken to be the last sub-field
    /// before the error and warning trailer.
    pub fn with_schema<F: Into<String>>(field: F, schema: Vec<String>) -> Self {
        let genotype_field = schema
            .iter()
            .find(|name| GENOTYPE_FIELDS.contains(&name.as_str()))
            .or_else(|| {
                schema
                    .iter()
                    .rev()
                    .find(|name| !TRAILING_FIELDS.contains(&name.as_str()))
            })
            .cloned();
        Self {
            field: field.into(),
            schema,
            genotype_field,
        }
    }

    /// Reads the schema from the `Format: 'Effect ( A | B | ... )'` part of the `EFF`
    /// description, falling back to [`DEFAULT_SNPEFF_SCHEMA`].
    pub fn from_header(header: &Header) -> Self {
        let schema = header
            .lookup(FieldClass::Info, SNPEFF_FIELD)
            .and_then(|definition| parse_schema(definition.description()));
        match schema {
            Some(schema) => {
                debug!(?schema, "read snpEff schema from header");
                Self::with_schema(SNPEFF_FIELD, schema)
            }
            None => Self::default(),
        }
    }

    pub fn genotype_field(&self) -> Option<&str> {
        self.genotype_field.as_deref()
    }

    fn convert(&self, name: &str, token: &str) -> AnnotationValue {
        let is_integer = INTEGER_FIELDS.contains(&name) || self.genotype_field() == Some(name);
        match token.parse() {
            Ok(i) if is_integer => AnnotationValue::Integer(i),
            _ => AnnotationValue::Raw(token.to_owned()),
        }
    }
}

fn parse_schema(description: &str) -> Option<Vec<String>> {
    let (_, format) = description.split_once(FORMAT_MARKER)?;
    let format = format.split('\'').next().unwrap_or_default();
    let mut schema: Vec<String> = format
        .replace(OPTIONAL_TRAILER, "")
        .replace('(', "|")
        .replace(')', "")
        .split('|')
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .collect();
    if schema.is_empty() {
        return None;
    }
    for trailer in TRAILING_FIELDS.iter() {
        if !schema.iter().any(|name| name == trailer) {
            schema.push(trailer.to_string());
        }
    }
    Some(schema)
}

/// Splits `EFFECT(a|b|c)` into `[EFFECT, a, b, c]`.
fn tokens(entry: &str) -> Vec<&str> {
    match entry.split_once('(') {
        Some((effect, rest)) => {
            let rest = rest.strip_suffix(')').unwrap_or(rest);
            std::iter::once(effect.trim()).chain(rest.split('|')).collect()
        }
        None => vec![entry.trim()],
    }
}

impl AnnotationDecoder for SnpEffDecoder {
    fn field(&self) -> &str {
        &self.field
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }

    fn decode(&self, values: &[&str]) -> Vec<AnnotationSubRecord> {
        values
            .iter()
            .map(|entry| {
                AnnotationSubRecord::from_tokens(&self.schema, tokens(entry), |name, token| {
                    self.convert(name, token)
                })
            })
            .collect()
    }

    fn attribute_allele(
        &self,
        entry: &AnnotationSubRecord,
        context: &AlleleContext<'_>,
    ) -> Result<AlleleKey, String> {
        let number = self
            .genotype_field()
            .and_then(|name| entry.get(name))
            .ok_or_else(|| "entry has no genotype number".to_string())?;
        let number = number
            .as_integer()
            .ok_or_else(|| format!("genotype number {:?} is not an integer", number))?;
        // genotype numbers count alternate alleles only, starting at 1
        let index = usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|&i| i < context.alternates.len())
            .ok_or_else(|| {
                format!(
                    "genotype number {} is outside 1..={}",
                    number,
                    context.alternates.len()
                )
            })?;
        let allele = &context.alternates[index];
        if context.alternates.iter().filter(|alt| *alt == allele).count() > 1 {
            return Err(format!("allele {:?} occurs more than once in ALT", allele));
        }
        Ok(AlleleKey::Alternate(allele.clone()))
    }
}
