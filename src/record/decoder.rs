#[cfg(not(feature = "sync"))]
use std::rc::Rc;
#[cfg(feature = "sync")]
use std::sync::Arc;

use tracing::trace;

use crate::annotation::{decode_attributed, AlleleContext, AnnotationDecoders};
use crate::error::{DecodeError, Issue};
use crate::record::arity::{self, Attribution};
use crate::record::sample::decode_samples;
use crate::record::value::{coerce_or_missing, Value};
use crate::record::{AlleleKey, FieldValue, Filter, Info, Record};
use crate::types::{FieldClass, Header, InfoNumber, InfoType, MISSING, N_FIXED_COLUMNS};

/// A decoded record together with the issues recovered while decoding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub record: Record,
    pub issues: Vec<Issue>,
}

/// Decodes one record line.
///
/// Only a line that lacks the fixed columns, has an unparseable POS or contains a line break
/// fails; everything else is recovered and reported in [`Decoded::issues`].
///
/// # Examples
///
/// ```
/// use rust_vcf_decode::annotation::AnnotationDecoders;
/// use rust_vcf_decode::record::{decode, AlleleKey, FieldValue};
/// use rust_vcf_decode::record::value::Value;
/// use rust_vcf_decode::types::Header;
///
/// let header = Header::from_lines(vec![
///     r#"##INFO=<ID=AC,Number=A,Type=Integer,Description="Allele count">"#,
/// ]);
/// let decoded = decode(
///     "1\t100\t.\tC\tA,G\t.\t.\tAC=5,9",
///     &header,
///     &AnnotationDecoders::new(),
/// )
/// .unwrap();
/// let ac = decoded
///     .record
///     .info_value(&AlleleKey::Alternate("G".into()), "AC");
/// assert_eq!(ac, Some(&FieldValue::Single(Value::Integer(9))));
/// assert!(decoded.issues.is_empty());
/// ```
pub fn decode(
    line: &str,
    header: &Header,
    annotations: &AnnotationDecoders,
) -> Result<Decoded, DecodeError> {
    let line = line
        .strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line);
    if let Some(position) = line.find(|c: char| c == '\n' || c == '\r') {
        return Err(DecodeError::EmbeddedLineBreak(position));
    }

    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < N_FIXED_COLUMNS {
        return Err(DecodeError::MissingColumns {
            expected: N_FIXED_COLUMNS,
            found: columns.len(),
        });
    }

    let mut issues = Vec::new();
    let chrom = columns[0].to_owned();
    let pos = columns[1]
        .parse()
        .map_err(|_| DecodeError::InvalidPosition(columns[1].into()))?;
    let id = Some(columns[2])
        .filter(|&id| id != MISSING)
        .map(str::to_owned);
    let ref_allele = columns[3].to_owned();
    let alt_alleles: Vec<String> = match columns[4] {
        MISSING => vec![],
        alt => alt.split(',').map(str::to_owned).collect(),
    };
    let qual = qual(columns[5], &mut issues);
    let filter = Filter::parse(columns[6]);
    let info = decode_info(
        columns[7],
        header,
        annotations,
        &ref_allele,
        &alt_alleles,
        &mut issues,
    );
    let samples = match columns.get(N_FIXED_COLUMNS) {
        Some(format_column) => decode_samples(
            format_column,
            &columns[N_FIXED_COLUMNS + 1..],
            header.samples(),
            header,
            &alt_alleles,
            &mut issues,
        ),
        None => Default::default(),
    };

    trace!(%chrom, pos, n_issues = issues.len(), "decoded record");
    Ok(Decoded {
        record: Record {
            chrom,
            pos,
            id,
            ref_allele,
            alt_alleles,
            qual,
            filter,
            info,
            samples,
        },
        issues,
    })
}

fn qual(column: &str, issues: &mut Vec<Issue>) -> Option<f32> {
    match coerce_or_missing("QUAL", column, InfoType::Float, issues) {
        Value::Float(q) => Some(q),
        _ => None,
    }
}

fn decode_info(
    column: &str,
    header: &Header,
    annotations: &AnnotationDecoders,
    ref_allele: &str,
    alt_alleles: &[String],
    issues: &mut Vec<Issue>,
) -> Info {
    let mut info = Info::new(alt_alleles);
    if column == MISSING {
        return info;
    }

    for entry in column.split(';').filter(|entry| !entry.is_empty()) {
        let (id, raw) = match entry.split_once('=') {
            Some((id, raw)) => (id, Some(raw)),
            None => (entry, None),
        };
        let definition = header.definition(FieldClass::Info, id);

        let is_flag = *definition.kind() == InfoType::Flag
            || *definition.number() == InfoNumber::Count(0);
        let raw = match raw {
            Some(raw) if !is_flag => raw,
            // presence alone sets a flag, whatever value it carries
            _ => {
                info.insert(AlleleKey::Shared, id, FieldValue::Single(Value::Flag(true)));
                continue;
            }
        };

        if let Some(decoder) = annotations.get(id) {
            if raw == MISSING {
                info.insert(AlleleKey::Shared, id, FieldValue::Single(Value::Missing));
                continue;
            }
            let context = AlleleContext {
                reference: ref_allele,
                alternates: alt_alleles,
            };
            for (key, entries) in decode_attributed(decoder, raw, &context, issues) {
                info.insert(key, id, FieldValue::Annotations(entries));
            }
            continue;
        }

        let split = arity::split(raw, *definition.number(), alt_alleles);
        if let Some((expected, found)) = split.mismatch {
            issues.push(Issue::ArityMismatch {
                field: id.to_owned(),
                expected,
                found,
            });
        }
        let kind = *definition.kind();
        match split.attribution {
            Attribution::Shared(tokens) => {
                let values = tokens
                    .into_iter()
                    .map(|token| coerce_or_missing(id, token, kind, issues))
                    .collect();
                info.insert(AlleleKey::Shared, id, FieldValue::from_values(values));
            }
            Attribution::PerAllele(values) => {
                for (key, token) in values {
                    let value = coerce_or_missing(id, token, kind, issues);
                    info.insert(key, id, FieldValue::Single(value));
                }
            }
        }
    }
    info
}

/// Decodes record lines against a fixed header and set of annotation decoders.
///
/// Both are shared read-only between clones, so a decoder can be handed to several consumers
/// cheaply. With the `sync` feature the sharing is thread-safe.
#[derive(Debug, Clone)]
pub struct Decoder {
    #[cfg(not(feature = "sync"))]
    header: Rc<Header>,
    #[cfg(feature = "sync")]
    header: Arc<Header>,
    #[cfg(not(feature = "sync"))]
    annotations: Rc<AnnotationDecoders>,
    #[cfg(feature = "sync")]
    annotations: Arc<AnnotationDecoders>,
}

impl Decoder {
    pub fn new(header: Header, annotations: AnnotationDecoders) -> Self {
        Self {
            #[cfg(not(feature = "sync"))]
            header: Rc::new(header),
            #[cfg(feature = "sync")]
            header: Arc::new(header),
            #[cfg(not(feature = "sync"))]
            annotations: Rc::new(annotations),
            #[cfg(feature = "sync")]
            annotations: Arc::new(annotations),
        }
    }

    /// A decoder with the VEP and snpEff annotation decoders configured from `header`.
    pub fn from_header(header: Header) -> Self {
        let annotations = AnnotationDecoders::from_header(&header);
        Self::new(header, annotations)
    }

    pub fn header(&self) -> &Header {
        self.header.as_ref()
    }

    pub fn annotations(&self) -> &AnnotationDecoders {
        self.annotations.as_ref()
    }

    pub fn decode(&self, line: &str) -> Result<Decoded, DecodeError> {
        decode(line, self.header(), self.annotations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationValue, VepDecoder};
    use crate::record::genotype::GenotypeAllele;

    const HEADER: &str = r#"##fileformat=VCFv4.1
##INFO=<ID=NS,Number=1,Type=Integer,Description="Number of Samples With Data">
##INFO=<ID=DP,Number=1,Type=Integer,Description="Total Depth">
##INFO=<ID=AF,Number=A,Type=Float,Description="Allele Frequency">
##INFO=<ID=AC,Number=A,Type=Integer,Description="Allele Count">
##INFO=<ID=AD,Number=R,Type=Integer,Description="Allelic Depths">
##INFO=<ID=AA,Number=1,Type=String,Description="Ancestral Allele">
##INFO=<ID=DB,Number=0,Type=Flag,Description="dbSNP membership, build 129">
##INFO=<ID=H2,Number=0,Type=Flag,Description="HapMap2 membership">
##INFO=<ID=CSQ,Number=.,Type=String,Description="Consequence annotations from Ensembl VEP. Format: Allele|Consequence|SYMBOL">
##INFO=<ID=EFF,Number=.,Type=String,Description="Predicted effects for this variant.Format: 'Effect ( Effect_Impact | Functional_Class | Codon_Change | Amino_Acid_Change| Amino_Acid_Length | Gene_Name | Transcript_BioType | Gene_Coding | Transcript_ID | Exon_Rank  | Genotype_Number [ | ERRORS | WARNINGS ] )' ">
##FILTER=<ID=q10,Description="Quality below 10">
##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype Quality">
##FORMAT=<ID=DP,Number=1,Type=Integer,Description="Read Depth">
##FORMAT=<ID=HQ,Number=2,Type=Integer,Description="Haplotype Quality">
#CHROM	POS	ID	REF	ALT	QUAL	FILTER	INFO	FORMAT	NA00001	NA00002	NA00003"#;

    const RECORD: &str = "20\t14370\trs6054257\tG\tA\t29\tPASS\tNS=3;DP=14;AF=0.5;DB;H2\tGT:GQ:DP:HQ\t0|0:48:1:51,51\t1|0:48:8:51,51\t1/1:43:5:.,.";

    fn decoder() -> Decoder {
        Decoder::from_header(Header::from_lines(HEADER.lines()))
    }

    fn alt(allele: &str) -> AlleleKey {
        AlleleKey::Alternate(allele.into())
    }

    fn single(value: Value) -> FieldValue {
        FieldValue::Single(value)
    }

    #[test]
    fn test_record() {
        let Decoded { record, issues } = decoder().decode(RECORD).unwrap();
        assert!(issues.is_empty(), "{:?}", issues);
        assert_eq!(record.chrom(), "20");
        assert_eq!(*record.pos(), 14370);
        assert_eq!(record.id().as_deref(), Some("rs6054257"));
        assert_eq!(record.ref_allele(), "G");
        assert_eq!(record.alt_alleles(), &vec!["A".to_string()]);
        assert_eq!(*record.qual(), Some(29.));
        assert_eq!(*record.filter(), Filter::Pass);

        assert_eq!(record.info_value(&AlleleKey::Shared, "NS"), Some(&single(Value::Integer(3))));
        assert_eq!(record.info_value(&alt("A"), "DP"), Some(&single(Value::Integer(14))));
        assert_eq!(record.info_value(&alt("A"), "AF"), Some(&single(Value::Float(0.5))));
        assert!(record.info().shared().get("AF").is_none());
        assert!(record.has_flag("DB"));
        assert!(record.has_flag("H2"));
        assert!(!record.has_flag("AA"));
        // flags are visible from every allele
        assert_eq!(record.info_value(&alt("A"), "DB"), Some(&single(Value::Flag(true))));

        let genotypes = record.genotypes();
        assert_eq!(genotypes.len(), 3);
        assert!(genotypes[0].unwrap().is_phased());
        assert_eq!(
            genotypes[1].unwrap().alleles(),
            &[GenotypeAllele::Unphased(1), GenotypeAllele::Phased(0)]
        );
        assert_eq!(genotypes[2].unwrap().indices(), vec![Some(1), Some(1)]);
        assert!(!genotypes[2].unwrap().is_phased());

        let dp = record.format("DP");
        assert_eq!(dp[1], Some(&single(Value::Integer(8))));
        assert_eq!(
            record.samples()["NA00003"]["HQ"],
            FieldValue::List(vec![Value::Missing, Value::Missing])
        );
    }

    #[test]
    fn test_decode_is_idempotent() {
        let decoder = decoder();
        assert_eq!(decoder.decode(RECORD), decoder.decode(RECORD));
        assert_eq!(
            decoder.decode(RECORD),
            decoder.decode(&format!("{}\r\n", RECORD))
        );
    }

    #[test]
    fn test_per_alt_allele_attribution() {
        let Decoded { record, issues } = decoder()
            .decode("1\t100\t.\tC\tA,G\t.\tq10\tAC=5,9;AF=0.1,.;AD=20,5,9")
            .unwrap();
        assert!(issues.is_empty());
        assert_eq!(record.info_value(&alt("A"), "AC"), Some(&single(Value::Integer(5))));
        assert_eq!(record.info_value(&alt("G"), "AC"), Some(&single(Value::Integer(9))));
        assert_eq!(record.info_value(&alt("G"), "AF"), Some(&single(Value::Missing)));
        assert_eq!(
            record.info_value(&AlleleKey::Reference, "AD"),
            Some(&single(Value::Integer(20)))
        );
        assert_eq!(record.info_value(&alt("G"), "AD"), Some(&single(Value::Integer(9))));
        assert_eq!(record.id(), &None);
        assert_eq!(record.qual(), &None);
        assert_eq!(record.filter(), &Filter::Failed(vec!["q10".into()]));
        assert!(record.samples().is_empty());

        for key in &[alt("A"), alt("G")] {
            let bucket = record.info().bucket(key).unwrap();
            assert_eq!(bucket.len(), 3);
        }
        assert_eq!(record.info().bucket(&AlleleKey::Reference).unwrap().len(), 1);
    }

    #[test]
    fn test_recovered_issues() {
        let Decoded { record, issues } = decoder()
            .decode("1\t100\t.\tC\tA,G\tlow\t.\tAC=5;DP=x;DB=1")
            .unwrap();
        assert_eq!(
            issues,
            vec![
                Issue::InvalidFieldValue {
                    field: "QUAL".into(),
                    token: "low".into(),
                    reason: "not a Float: invalid float literal".into()
                },
                Issue::ArityMismatch {
                    field: "AC".into(),
                    expected: 2,
                    found: 1
                },
                Issue::InvalidFieldValue {
                    field: "DP".into(),
                    token: "x".into(),
                    reason: "not an Integer: invalid digit found in string".into()
                },
            ]
        );
        assert_eq!(record.qual(), &None);
        assert_eq!(record.info_value(&alt("G"), "AC"), Some(&single(Value::Missing)));
        assert_eq!(record.info_value(&AlleleKey::Shared, "DP"), Some(&single(Value::Missing)));
        assert!(record.has_flag("DB"));
        assert_eq!(record.filter(), &Filter::Missing);
    }

    #[test]
    fn test_vep_annotations() {
        let Decoded { record, issues } = decoder()
            .decode("1\t100\t.\tC\tA,G\t.\t.\tCSQ=A|missense_variant|BRCA2,G|intron_variant|BRCA2,A|upstream_gene_variant|ZAR1")
            .unwrap();
        assert!(issues.is_empty());

        let a = record.info_value(&alt("A"), "CSQ").unwrap().annotations().unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(
            a[0].get("Consequence"),
            Some(&AnnotationValue::List(vec!["missense_variant".into()]))
        );
        assert_eq!(a[1].get("SYMBOL"), Some(&AnnotationValue::Raw("ZAR1".into())));

        let g = record.info_value(&alt("G"), "CSQ").unwrap().annotations().unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(
            g[0].get("Consequence"),
            Some(&AnnotationValue::List(vec!["intron_variant".into()]))
        );
        assert!(record.info().shared().get("CSQ").is_none());
    }

    #[test]
    fn test_snpeff_annotations() {
        let Decoded { record, issues } = decoder()
            .decode("1\t100\t.\tC\tA,G\t.\t.\tEFF=DOWNSTREAM(MODIFIER|||||GENE1|||ENST1||2),INTERGENIC(MODIFIER||||||||||)")
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0],
            Issue::UnattributableAnnotation { field, index: 1, .. } if field == "EFF"
        ));

        let g = record.info().bucket(&alt("G")).unwrap()["EFF"].annotations().unwrap();
        assert_eq!(g[0].get("Gene_Name"), Some(&AnnotationValue::Raw("GENE1".into())));
        assert!(record.info().bucket(&alt("A")).unwrap().get("EFF").is_none());

        let shared = record.info().shared()["EFF"].annotations().unwrap();
        assert_eq!(
            shared[0].get("Effect"),
            Some(&AnnotationValue::Raw("INTERGENIC".into()))
        );
    }

    #[test]
    fn test_missing_annotation_payload() {
        let Decoded { record, issues } = decoder()
            .decode("1\t100\t.\tC\tA,G\t.\t.\tCSQ=.;EFF=.;DP=.")
            .unwrap();
        assert!(issues.is_empty(), "{:?}", issues);
        for field in &["CSQ", "EFF", "DP"] {
            assert_eq!(
                record.info().shared().get(*field),
                Some(&single(Value::Missing))
            );
        }
        for key in &[alt("A"), alt("G")] {
            let bucket = record.info().bucket(key).unwrap();
            assert!(bucket.get("CSQ").is_none());
            assert!(bucket.get("EFF").is_none());
        }
    }

    #[test]
    fn test_oversized_declared_count() {
        let header = Header::from_lines(vec![
            r#"##INFO=<ID=XX,Number=99999999999999,Type=Integer,Description="Huge">"#,
            r#"##INFO=<ID=DP,Number=1,Type=Integer,Description="Depth">"#,
        ]);
        assert_eq!(header.issues().len(), 1);
        let Decoded { record, issues } = Decoder::new(header, AnnotationDecoders::new())
            .decode("1\t100\t.\tC\tA\t.\t.\tXX=1;DP=4")
            .unwrap();
        assert!(issues.is_empty());
        assert_eq!(
            record.info_value(&AlleleKey::Shared, "XX"),
            Some(&single(Value::String("1".into())))
        );
        assert_eq!(
            record.info_value(&AlleleKey::Shared, "DP"),
            Some(&single(Value::Integer(4)))
        );
    }

    #[test]
    fn test_unregistered_annotation_field() {
        let header = Header::from_lines(HEADER.lines());
        let decoder = Decoder::new(header, AnnotationDecoders::new());
        let Decoded { record, issues } = decoder
            .decode("1\t100\t.\tC\tA\t.\t.\tCSQ=A|missense_variant|BRCA2;ANN=A|x|y")
            .unwrap();
        assert!(issues.is_empty());
        assert_eq!(
            record.info_value(&AlleleKey::Shared, "CSQ"),
            Some(&single(Value::String("A|missense_variant|BRCA2".into())))
        );
        assert_eq!(
            record.info_value(&AlleleKey::Shared, "ANN"),
            Some(&single(Value::String("A|x|y".into())))
        );
    }

    #[test]
    fn test_custom_annotation_field() {
        let header = Header::from_lines(HEADER.lines());
        let mut annotations = AnnotationDecoders::new();
        annotations.register(VepDecoder::with_schema(
            "VEP2",
            vec!["Allele".into(), "Impact".into()],
        ));
        let decoder = Decoder::new(header, annotations);
        let Decoded { record, .. } = decoder
            .decode("1\t100\t.\tC\tT\t.\t.\tVEP2=T|HIGH")
            .unwrap();
        let entries = record.info_value(&alt("T"), "VEP2").unwrap().annotations().unwrap();
        assert_eq!(entries[0].get("Impact"), Some(&AnnotationValue::Raw("HIGH".into())));
    }

    #[test]
    fn test_non_variant_site() {
        let Decoded { record, issues } = decoder()
            .decode("1\t100\t.\tC\t.\t.\t.\t.\tGT\t0/0\t0/0\t./.")
            .unwrap();
        assert!(issues.is_empty());
        assert!(record.alt_alleles().is_empty());
        assert_eq!(record.info().buckets().count(), 1);
        assert_eq!(
            record.genotypes()[2].unwrap().indices(),
            vec![None, None]
        );
    }

    #[cfg(feature = "sync")]
    #[test]
    fn test_decode_across_threads() {
        let decoder = decoder();
        let expected = decoder.decode(RECORD).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let decoder = decoder.clone();
                std::thread::spawn(move || decoder.decode(RECORD).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_structural_errors() {
        let decoder = decoder();
        assert_eq!(
            decoder.decode("1\t100\t.\tC\tA"),
            Err(DecodeError::MissingColumns {
                expected: 8,
                found: 5
            })
        );
        assert_eq!(
            decoder.decode("1\tfoo\t.\tC\tA\t.\t.\t."),
            Err(DecodeError::InvalidPosition("foo".into()))
        );
        assert_eq!(
            decoder.decode("1\t100\t.\tC\tA\t.\t.\tDP=1\n1\t101\t.\tC\tA\t.\t.\t."),
            Err(DecodeError::EmbeddedLineBreak(20))
        );
    }
}
