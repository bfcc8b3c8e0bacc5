use std::fmt;
use std::str::FromStr;

use nom::combinator::all_consuming;

use crate::parser;

/// Phased or unphased alleles, represented as indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenotypeAllele {
    Unphased(u32),
    Phased(u32),
    UnphasedMissing,
    PhasedMissing,
}

impl GenotypeAllele {
    pub(crate) fn new(index: Option<u32>, phased: bool) -> Self {
        match (index, phased) {
            (Some(i), false) => GenotypeAllele::Unphased(i),
            (Some(i), true) => GenotypeAllele::Phased(i),
            (None, false) => GenotypeAllele::UnphasedMissing,
            (None, true) => GenotypeAllele::PhasedMissing,
        }
    }

    /// Get the index into the list of alleles (0 is the reference).
    pub fn index(self) -> Option<u32> {
        match self {
            GenotypeAllele::Unphased(i) | GenotypeAllele::Phased(i) => Some(i),
            GenotypeAllele::UnphasedMissing | GenotypeAllele::PhasedMissing => None,
        }
    }

    pub fn is_phased(self) -> bool {
        matches!(
            self,
            GenotypeAllele::Phased(_) | GenotypeAllele::PhasedMissing
        )
    }
}

/// A decoded GT value.
///
/// The phasing of each allele is the separator preceding it; the first allele is unphased
/// unless the value starts with an explicit `|`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Genotype(Vec<GenotypeAllele>);

impl Genotype {
    pub(crate) fn new(alleles: Vec<GenotypeAllele>) -> Self {
        Genotype(alleles)
    }

    pub fn alleles(&self) -> &[GenotypeAllele] {
        &self.0
    }

    pub fn indices(&self) -> Vec<Option<u32>> {
        self.0.iter().map(|a| a.index()).collect()
    }

    pub fn ploidy(&self) -> usize {
        self.0.len()
    }

    /// A genotype is phased when every allele after the first was joined with `|`.
    pub fn is_phased(&self) -> bool {
        self.0.len() > 1 && self.0[1..].iter().all(|a| a.is_phased())
    }
}

impl FromStr for Genotype {
    type Err = String;

    /// # Examples
    ///
    /// ```
    /// use rust_vcf_decode::record::genotype::{Genotype, GenotypeAllele};
    ///
    /// let gt: Genotype = "0|1".parse().unwrap();
    /// assert_eq!(gt.alleles(), &[GenotypeAllele::Unphased(0), GenotypeAllele::Phased(1)]);
    /// assert!(gt.is_phased());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(parser::genotype)(s)
            .map(|(_, gt)| gt)
            .map_err(|_| format!("invalid genotype {:?}", s))
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, allele) in self.0.iter().enumerate() {
            if i > 0 || allele.is_phased() {
                write!(f, "{}", if allele.is_phased() { '|' } else { '/' })?;
            }
            match allele.index() {
                Some(index) => write!(f, "{}", index)?,
                None => write!(f, ".")?,
            }
        }
        Ok(())
    }
}
