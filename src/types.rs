use std::borrow::Cow;
use std::str::FromStr;

use getset::Getters;
use indexmap::IndexMap;
use itertools::Itertools;
use multimap::MultiMap;
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::Issue;
use crate::parser::{self, MetaValue};

/// The missing-value marker, valid in any column or sub-value position.
pub const MISSING: &str = ".";

/// Largest `Number` accepted as a fixed count; larger declarations are treated as malformed.
pub const MAX_FIXED_COUNT: usize = 1 << 16;

/// Number of fixed columns preceding FORMAT in the `#CHROM` line and in every record.
pub(crate) const N_FIXED_COLUMNS: usize = 8;

/// The class of a header field declaration.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
pub enum FieldClass {
    #[strum(serialize = "INFO")]
    Info,
    #[strum(serialize = "FORMAT")]
    Format,
    #[strum(serialize = "FILTER")]
    Filter,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumString, Display)]
pub enum InfoType {
    Integer,
    // older VEP and GATK headers use these spellings
    #[strum(to_string = "Float", serialize = "Double", serialize = "Number")]
    Float,
    Flag,
    Character,
    String,
}

/// The arity rule of a field, i.e. its `Number` attribute.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum InfoNumber {
    /// A fixed number of values.
    Count(usize),
    /// One value per allele, including the reference (`R`).
    Alleles,
    /// One value per alternate allele (`A`).
    AlternateAlleles,
    /// One value per possible genotype (`G`).
    Genotypes,
    /// Any number of values (`.`).
    Unknown,
}

impl FromStr for InfoNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match nom::combinator::all_consuming(parser::info_number)(s) {
            Ok((_, number)) => Ok(number),
            Err(_) => Err(format!("unknown Number {:?}", s)),
        }
    }
}

impl std::fmt::Display for InfoNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfoNumber::Count(n) => write!(f, "{}", n),
            InfoNumber::Alleles => write!(f, "R"),
            InfoNumber::AlternateAlleles => write!(f, "A"),
            InfoNumber::Genotypes => write!(f, "G"),
            InfoNumber::Unknown => write!(f, "."),
        }
    }
}

/// A single INFO, FORMAT or FILTER declaration.
#[derive(Debug, Clone, Eq, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct FieldDefinition {
    id: String,
    number: InfoNumber,
    kind: InfoType,
    description: String,
    // may be absent
    source: Option<String>,
    // may be absent
    version: Option<String>,
    additional: IndexMap<String, String>,
}

impl FieldDefinition {
    pub fn new<I: Into<String>, D: Into<String>>(
        id: I,
        number: InfoNumber,
        kind: InfoType,
        description: D,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            kind,
            description: description.into(),
            source: None,
            version: None,
            additional: IndexMap::new(),
        }
    }

    /// The definition assumed for fields the header does not declare: a variable number of
    /// strings.
    pub fn lenient<I: Into<String>>(id: I) -> Self {
        Self::new(id, InfoNumber::Unknown, InfoType::String, "")
    }

    fn from_attributes(
        class: FieldClass,
        attributes: Vec<(String, String)>,
        issues: &mut Vec<Issue>,
    ) -> Option<Self> {
        let mut h: IndexMap<String, String> = attributes.into_iter().collect();
        let id = match h.shift_remove("ID") {
            Some(id) => id,
            None => {
                issues.push(Issue::MalformedHeaderField {
                    class,
                    id: String::new(),
                    reason: "missing ID".into(),
                });
                return None;
            }
        };

        let (number, kind) = if class == FieldClass::Filter {
            (InfoNumber::Count(0), InfoType::Flag)
        } else {
            let number = h
                .shift_remove("Number")
                .ok_or_else(|| "missing Number".to_string())
                .and_then(|n| n.parse::<InfoNumber>())
                .and_then(|n| match n {
                    InfoNumber::Count(c) if c > MAX_FIXED_COUNT => {
                        Err(format!("Number {} exceeds {}", c, MAX_FIXED_COUNT))
                    }
                    n => Ok(n),
                });
            let kind = h
                .shift_remove("Type")
                .ok_or_else(|| "missing Type".to_string())
                .and_then(|t| InfoType::from_str(&t).map_err(|_| format!("unknown Type {:?}", t)));
            match (number, kind) {
                (Ok(number), Ok(kind)) => (number, kind),
                (number, kind) => {
                    let reason = [number.err(), kind.err()].iter().flatten().join(", ");
                    debug!(%class, %id, %reason, "falling back to Number=. and Type=String");
                    issues.push(Issue::MalformedHeaderField {
                        class,
                        id: id.clone(),
                        reason,
                    });
                    (InfoNumber::Unknown, InfoType::String)
                }
            }
        };

        Some(FieldDefinition {
            id,
            number,
            kind,
            description: h.shift_remove("Description").unwrap_or_default(),
            source: h.shift_remove("Source"),
            version: h.shift_remove("Version"),
            additional: h,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct HeaderContig {
    id: String,
    length: Option<u64>,
    additional: IndexMap<String, String>,
}

impl HeaderContig {
    fn from_attributes(attributes: Vec<(String, String)>) -> Option<Self> {
        let mut h: IndexMap<String, String> = attributes.into_iter().collect();
        Some(HeaderContig {
            id: h.shift_remove("ID")?,
            length: h.shift_remove("length").and_then(|s| s.parse().ok()),
            additional: h,
        })
    }
}

pub type Sample = String;

/// The field registry of a VCF header.
///
/// Built once from the meta-lines (and the `#CHROM` line) and shared read-only by every
/// record decode afterwards.
#[derive(Debug, Clone, Default, Getters)]
#[getset(get = "pub")]
pub struct Header {
    file_format: Option<String>,
    /// meta-lines other than INFO, FORMAT, FILTER and contig, by key
    meta: MultiMap<String, String>,
    info: IndexMap<String, FieldDefinition>,
    format: IndexMap<String, FieldDefinition>,
    filter: IndexMap<String, FieldDefinition>,
    contigs: Vec<HeaderContig>,
    samples: Vec<Sample>,
    /// declarations that had to be recovered while building the registry
    issues: Vec<Issue>,
}

impl Header {
    /// Builds the registry from raw header lines.
    ///
    /// A malformed declaration never prevents the remaining ones from being registered; it is
    /// either registered leniently or skipped, and reported in [`Header::issues`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_vcf_decode::types::{FieldClass, Header, InfoNumber, InfoType};
    ///
    /// let header = Header::from_lines(vec![
    ///     "##fileformat=VCFv4.2",
    ///     r#"##INFO=<ID=AF,Number=A,Type=Float,Description="Allele Frequency">"#,
    ///     "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA00001",
    /// ]);
    ///
    /// let af = header.lookup(FieldClass::Info, "AF").unwrap();
    /// assert_eq!(af.number(), &InfoNumber::AlternateAlleles);
    /// assert_eq!(af.kind(), &InfoType::Float);
    /// assert_eq!(header.samples(), &vec!["NA00001".to_string()]);
    /// ```
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut header = Header::default();
        for line in lines {
            let line = line.as_ref().trim_end_matches(|c: char| c == '\n' || c == '\r');
            if let Some(meta) = line.strip_prefix("##") {
                header.add_meta_line(meta);
            } else if line.starts_with('#') {
                header.samples = line
                    .split('\t')
                    .skip(N_FIXED_COLUMNS + 1)
                    .map(str::to_owned)
                    .collect();
            } else if !line.is_empty() {
                debug!(line, "ignoring non-header line");
            }
        }
        header
    }

    fn add_meta_line(&mut self, line: &str) {
        let (key, value) = match parser::meta_line(line) {
            Ok((_, entry)) => entry,
            Err(_) => {
                let key = line.split('=').next().unwrap_or_default();
                if let Ok(class) = FieldClass::from_str(key) {
                    self.issues.push(Issue::MalformedHeaderField {
                        class,
                        id: String::new(),
                        reason: format!("unparseable declaration {:?}", line),
                    });
                } else {
                    debug!(line, "ignoring unparseable meta-line");
                }
                return;
            }
        };

        match (FieldClass::from_str(key), value) {
            (Ok(class), MetaValue::Structured(attributes)) => {
                if let Some(definition) =
                    FieldDefinition::from_attributes(class, attributes, &mut self.issues)
                {
                    let registry = match class {
                        FieldClass::Info => &mut self.info,
                        FieldClass::Format => &mut self.format,
                        FieldClass::Filter => &mut self.filter,
                    };
                    registry.insert(definition.id.clone(), definition);
                }
            }
            (Ok(class), MetaValue::Plain(value)) => {
                self.issues.push(Issue::MalformedHeaderField {
                    class,
                    id: String::new(),
                    reason: format!("expected <...> declaration, found {:?}", value),
                });
            }
            (Err(_), MetaValue::Structured(attributes)) if key == "contig" => {
                if let Some(contig) = HeaderContig::from_attributes(attributes) {
                    self.contigs.push(contig);
                }
            }
            (Err(_), MetaValue::Structured(attributes)) => {
                let value = attributes
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .join(",");
                self.meta.insert(key.into(), value);
            }
            (Err(_), MetaValue::Plain(value)) => {
                if key == "fileformat" {
                    self.file_format = Some(value.into());
                }
                self.meta.insert(key.into(), value.into());
            }
        }
    }

    /// Returns the declaration of `id` in the given field class, if any.
    pub fn lookup(&self, class: FieldClass, id: &str) -> Option<&FieldDefinition> {
        match class {
            FieldClass::Info => self.info.get(id),
            FieldClass::Format => self.format.get(id),
            FieldClass::Filter => self.filter.get(id),
        }
    }

    /// Like [`Header::lookup`], but undeclared fields resolve to [`FieldDefinition::lenient`].
    pub fn definition(&self, class: FieldClass, id: &str) -> Cow<'_, FieldDefinition> {
        self.lookup(class, id)
            .map(Cow::Borrowed)
            .unwrap_or_else(|| Cow::Owned(FieldDefinition::lenient(id)))
    }
}
