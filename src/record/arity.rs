//! Splitting of comma-joined values by their declared arity, and attribution of the parts
//! to alleles.

use std::iter;

use crate::record::AlleleKey;
use crate::types::{InfoNumber, MISSING};

/// Ploidy assumed for `Number=G` fields.
pub const DEFAULT_PLOIDY: usize = 2;

/// The sub-values of one field, attributed to alleles where the arity says so.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution<'a> {
    /// Values that belong to the site as a whole, in their original order.
    Shared(Vec<&'a str>),
    /// One value per allele key.
    PerAllele(Vec<(AlleleKey, &'a str)>),
}

impl<'a> Attribution<'a> {
    /// The sub-values in order, without their attribution.
    pub fn into_tokens(self) -> Vec<&'a str> {
        match self {
            Attribution::Shared(tokens) => tokens,
            Attribution::PerAllele(values) => values.into_iter().map(|(_, token)| token).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split<'a> {
    pub attribution: Attribution<'a>,
    /// `(expected, found)` if the number of sub-values had to be corrected.
    pub mismatch: Option<(usize, usize)>,
}

/// Number of values a field of the given arity must have at a site with `n_alt` alternate
/// alleles, or `None` if the arity is variable.
pub fn expected_count(number: InfoNumber, n_alt: usize) -> Option<usize> {
    match number {
        InfoNumber::Count(n) => Some(n),
        InfoNumber::AlternateAlleles => Some(n_alt),
        InfoNumber::Alleles => Some(n_alt + 1),
        InfoNumber::Genotypes => Some(genotype_count(n_alt + 1, DEFAULT_PLOIDY)),
        InfoNumber::Unknown => None,
    }
}

/// Number of unordered genotypes of the given ploidy over `n_alleles` alleles.
pub fn genotype_count(n_alleles: usize, ploidy: usize) -> usize {
    // binomial(n_alleles + ploidy - 1, ploidy)
    (1..=ploidy).fold(1, |acc, k| acc * (n_alleles + k - 1) / k)
}

/// Enumerates the genotypes over `n_alleles` alleles in the canonical VCF order.
///
/// For diploid calls this is `0/0, 0/1, 1/1, 0/2, 1/2, 2/2, ...`, i.e. the genotype `j/k`
/// (`j <= k`) is found at index `k * (k + 1) / 2 + j`.
///
/// # Examples
///
/// ```
/// use rust_vcf_decode::record::arity::genotype_order;
///
/// assert_eq!(
///     genotype_order(3, 2),
///     vec![vec![0, 0], vec![0, 1], vec![1, 1], vec![0, 2], vec![1, 2], vec![2, 2]]
/// );
/// ```
pub fn genotype_order(n_alleles: usize, ploidy: usize) -> Vec<Vec<u32>> {
    fn extend(n_alleles: usize, ploidy: usize) -> Vec<Vec<u32>> {
        if ploidy == 0 {
            return vec![vec![]];
        }
        (0..n_alleles)
            .flat_map(|last| {
                extend(last + 1, ploidy - 1).into_iter().map(move |mut prefix| {
                    prefix.push(last as u32);
                    prefix
                })
            })
            .collect()
    }
    extend(n_alleles, ploidy)
}

/// Splits `raw` on commas and attributes the parts according to `number`.
///
/// Fields with a computable count are padded with missing values or truncated to that count;
/// a raw value that is just `.` stands for all values missing.
///
/// # Examples
///
/// ```
/// use rust_vcf_decode::record::arity::{split, Attribution};
/// use rust_vcf_decode::record::AlleleKey;
/// use rust_vcf_decode::types::InfoNumber;
///
/// let alts = vec!["A".to_string(), "G".to_string()];
/// let split = split("5,9", InfoNumber::AlternateAlleles, &alts);
/// assert_eq!(
///     split.attribution,
///     Attribution::PerAllele(vec![
///         (AlleleKey::Alternate("A".into()), "5"),
///         (AlleleKey::Alternate("G".into()), "9"),
///     ])
/// );
/// assert_eq!(split.mismatch, None);
/// ```
pub fn split<'a>(raw: &'a str, number: InfoNumber, alt_alleles: &[String]) -> Split<'a> {
    let mut tokens: Vec<&'a str> = raw.split(',').collect();
    let mut mismatch = None;
    if let Some(n) = expected_count(number, alt_alleles.len()) {
        if raw == MISSING {
            tokens = vec![MISSING; n];
        } else if tokens.len() != n {
            mismatch = Some((n, tokens.len()));
            tokens.resize(n, MISSING);
        }
    }

    let alternates = alt_alleles
        .iter()
        .map(|allele| AlleleKey::Alternate(allele.clone()));
    let attribution = match number {
        InfoNumber::AlternateAlleles => Attribution::PerAllele(alternates.zip(tokens).collect()),
        InfoNumber::Alleles => Attribution::PerAllele(
            iter::once(AlleleKey::Reference)
                .chain(alternates)
                .zip(tokens)
                .collect(),
        ),
        InfoNumber::Count(_) | InfoNumber::Genotypes | InfoNumber::Unknown => {
            Attribution::Shared(tokens)
        }
    };
    Split {
        attribution,
        mismatch,
    }
}
