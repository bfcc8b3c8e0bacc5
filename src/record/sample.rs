use indexmap::IndexMap;

use crate::error::Issue;
use crate::record::arity;
use crate::record::genotype::Genotype;
use crate::record::value::{coerce_or_missing, Value};
use crate::record::{FieldValue, Fields};
use crate::types::{FieldClass, Header, Sample, MISSING};

const GENOTYPE: &str = "GT";

/// Decodes the sample columns of a record against its FORMAT column.
///
/// Sample columns are paired with `sample_names` by position. Trailing fields a sample leaves
/// out decode as if they were `.`, padded to their declared count; surplus fields are dropped
/// and reported.
pub fn decode_samples(
    format_column: &str,
    sample_columns: &[&str],
    sample_names: &[Sample],
    header: &Header,
    alt_alleles: &[String],
    issues: &mut Vec<Issue>,
) -> IndexMap<Sample, Fields> {
    if sample_columns.len() != sample_names.len() {
        issues.push(Issue::ArityMismatch {
            field: "SAMPLES".into(),
            expected: sample_names.len(),
            found: sample_columns.len(),
        });
    }

    let definitions: Vec<_> = format_column
        .split(':')
        .map(|id| header.definition(FieldClass::Format, id))
        .collect();

    sample_names
        .iter()
        .zip(sample_columns)
        .map(|(name, column)| {
            let tokens: Vec<&str> = column.split(':').collect();
            if tokens.len() > definitions.len() {
                issues.push(Issue::ArityMismatch {
                    field: format!("FORMAT[{}]", name),
                    expected: definitions.len(),
                    found: tokens.len(),
                });
            }

            let fields = definitions
                .iter()
                .enumerate()
                .map(|(i, definition)| {
                    let id = definition.id();
                    let token = tokens.get(i).copied().unwrap_or(MISSING);
                    let value = if id == GENOTYPE {
                        genotype(token, issues)
                    } else {
                        let split = arity::split(token, *definition.number(), alt_alleles);
                        if let Some((expected, found)) = split.mismatch {
                            issues.push(Issue::ArityMismatch {
                                field: id.clone(),
                                expected,
                                found,
                            });
                        }
                        let values = split
                            .attribution
                            .into_tokens()
                            .into_iter()
                            .map(|t| coerce_or_missing(id, t, *definition.kind(), issues))
                            .collect();
                        FieldValue::from_values(values)
                    };
                    (id.clone(), value)
                })
                .collect();
            (name.clone(), fields)
        })
        .collect()
}

fn genotype(token: &str, issues: &mut Vec<Issue>) -> FieldValue {
    if token == MISSING {
        return FieldValue::Single(Value::Missing);
    }
    match token.parse::<Genotype>() {
        Ok(gt) => FieldValue::Genotype(gt),
        Err(reason) => {
            issues.push(Issue::InvalidFieldValue {
                field: GENOTYPE.into(),
                token: token.into(),
                reason,
            });
            FieldValue::Single(Value::Missing)
        }
    }
}
