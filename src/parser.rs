use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, take_while};
use nom::character::complete::{char, digit1, none_of, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, rest, value};
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, separated_pair};
use nom::IResult;

use crate::record::genotype::{Genotype, GenotypeAllele};
use crate::types::InfoNumber;

/// The value part of a `##key=value` meta-line.
#[derive(Debug, PartialEq)]
pub(crate) enum MetaValue<'a> {
    /// `<ID=..,Number=..,...>`
    Structured(Vec<(String, String)>),
    Plain(&'a str),
}

pub(crate) fn info_number(input: &str) -> IResult<&str, InfoNumber> {
    alt((
        map_res(digit1, |d: &str| d.parse::<usize>().map(InfoNumber::Count)),
        value(InfoNumber::AlternateAlleles, char('A')),
        value(InfoNumber::Alleles, char('R')),
        value(InfoNumber::Genotypes, char('G')),
        value(InfoNumber::Unknown, char('.')),
    ))(input)
}

fn string(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                none_of("\\\""),
                '\\',
                alt((value('\\', char('\\')), value('"', char('"')))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn key_value(input: &str) -> IResult<&str, (String, String)> {
    separated_pair(
        map(is_not("<,=>"), |key: &str| key.trim().to_owned()),
        char('='),
        alt((
            string,
            map(take_while(|c: char| c != ',' && c != '>'), str::to_owned),
        )),
    )(input)
}

fn keys_and_values(input: &str) -> IResult<&str, Vec<(String, String)>> {
    separated_list0(char(','), key_value)(input)
}

/// Parses a meta-line with its leading `##` already removed.
pub(crate) fn meta_line(input: &str) -> IResult<&str, (&str, MetaValue<'_>)> {
    let (input, (key, raw)) = separated_pair(is_not("="), char('='), rest)(input)?;
    let raw = raw.trim_end();
    let value = if raw.starts_with('<') {
        let (_, mapping) = all_consuming(delimited(char('<'), keys_and_values, char('>')))(raw)?;
        MetaValue::Structured(mapping)
    } else {
        MetaValue::Plain(raw)
    };
    Ok((input, (key, value)))
}

fn allele_index(input: &str) -> IResult<&str, Option<u32>> {
    alt((
        map_res(digit1, |d: &str| d.parse::<u32>().map(Some)),
        value(None, char('.')),
    ))(input)
}

/// Parses a GT value such as `0/1`, `1|0`, `./.` or `|0|1`.
pub(crate) fn genotype(input: &str) -> IResult<&str, Genotype> {
    let (input, (first_phase, first)) = pair(opt(one_of("/|")), allele_index)(input)?;
    let (input, others) = many0(pair(one_of("/|"), allele_index))(input)?;
    let alleles = std::iter::once((first_phase.unwrap_or('/'), first))
        .chain(others)
        .map(|(separator, index)| GenotypeAllele::new(index, separator == '|'))
        .collect();
    Ok((input, Genotype::new(alleles)))
}
