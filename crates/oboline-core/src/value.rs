//! Tag value grammar.
//!
//! OBO tag lines carry a small, idiosyncratic set of value shapes: quoted
//! strings with backslash escapes, unquoted words, free text with an
//! optional trailing `[dbxref, ...]` list and `!` comment, and structured
//! shapes for synonyms, cross-references and relations.
//!
//! Each shape gets one pure function taking the tag name (for diagnostics)
//! and a [`SourcedValue`]; a mismatch returns
//! [`OboError::InvalidFormat`] naming the tag and its location. Callers
//! never see a partially-parsed value.
//!
//! Escaping is symmetric with the serializer: `\n`/`\t`/`\r` decode to the
//! control character, any other escaped character decodes to itself, and a
//! bare backslash at the end of a value is a format error.

use nom::{
    branch::alt,
    bytes::complete::tag as kw,
    character::complete::{anychar, char as pchar, multispace0, multispace1, none_of},
    combinator::{all_consuming, opt, peek, recognize, rest, value as pvalue},
    multi::{many0, many1},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::error::{Location, OboError};

/// A parsed value together with the source and line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedValue<T> {
    pub value: T,
    pub location: Location,
}

impl<T> SourcedValue<T> {
    pub fn new(location: Location, value: T) -> Self {
        Self { value, location }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for SourcedValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Synonym scope keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Exact,
    Broad,
    Narrow,
    Related,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Exact => "EXACT",
            Scope::Broad => "BROAD",
            Scope::Narrow => "NARROW",
            Scope::Related => "RELATED",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-reference match qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XRefMatch {
    NoMatch,
    MatchName,
    MatchSynonym,
}

impl XRefMatch {
    pub fn as_str(self) -> &'static str {
        match self {
            XRefMatch::NoMatch => "NO MATCH",
            XRefMatch::MatchName => "MATCH NAME",
            XRefMatch::MatchSynonym => "MATCH SYNONYM",
        }
    }
}

impl std::fmt::Display for XRefMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed `synonym:` value before scope defaulting (the reader supplies the
/// default scope from the synonym type's declaration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymValue {
    pub text: String,
    pub scope: Option<Scope>,
    pub type_name: Option<String>,
    pub dbxrefs: Option<String>,
}

/// Parsed `xref:` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XRefValue {
    pub target: String,
    pub description: Option<String>,
    pub qualifier: Option<XRefMatch>,
    pub matched: Option<String>,
}

/// Parsed `def:` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionValue {
    pub text: String,
    pub dbxrefs: Option<String>,
}

// ============================================================================
// Escaping
// ============================================================================

/// Decode backslash escapes: `\n`/`\t`/`\r` to the control character, any
/// other escaped character to itself.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Encode a value for output: backslash, brackets and braces are escaped,
/// newline and carriage return become `\n`, tab becomes `\t`.
pub(crate) fn escape_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' | '\r' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '[' => out.push_str("\\["),
            ']' => out.push_str("\\]"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            other => out.push(other),
        }
    }
    out
}

/// [`escape_value`] plus quote escaping, for values written inside `"..."`.
pub(crate) fn escape_quoted(s: &str) -> String {
    escape_value(s).replace('"', "\\\"")
}

// ============================================================================
// Grammar primitives
// ============================================================================

fn escaped_char(input: &str) -> IResult<&str, &str> {
    recognize(preceded(pchar('\\'), anychar))(input)
}

/// One unquoted word: escaped or plain characters, stopping at whitespace,
/// brackets, comments, and bare backslashes.
fn word(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((escaped_char, recognize(none_of("\\[] \t!"))))))(input)
}

/// Whitespace-separated words (xref matched phrase).
fn phrase(input: &str) -> IResult<&str, &str> {
    recognize(tuple((word, many0(preceded(multispace1, word)))))(input)
}

/// Text between double quotes; `\"` does not terminate the string.
fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(
        pchar('"'),
        recognize(many0(alt((escaped_char, recognize(none_of("\"\\")))))),
        pchar('"'),
    )(input)
}

/// A bracketed cross-reference list, preceded by whitespace. Returns the
/// raw list body.
fn dbxref_list(input: &str) -> IResult<&str, &str> {
    preceded(
        multispace1,
        delimited(
            pchar('['),
            recognize(many0(alt((escaped_char, recognize(none_of("[]\\")))))),
            pchar(']'),
        ),
    )(input)
}

/// Optional whitespace and `! ...` trailing comment, ending the value.
fn terminal_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(preceded(pchar('!'), rest))(input)?;
    Ok((input, ()))
}

/// Free text: escaped or plain characters up to a dbxref list or comment.
/// Interior whitespace belongs to the value; the gap before `[`, `!` or the
/// end of the line does not.
fn free_text(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((
        escaped_char,
        recognize(none_of("\\![] \t")),
        recognize(terminated(multispace1, peek(none_of("![")))),
    ))))(input)
}

fn scope_keyword(input: &str) -> IResult<&str, Scope> {
    let (tail, w) = word(input)?;
    match w {
        "EXACT" => Ok((tail, Scope::Exact)),
        "BROAD" => Ok((tail, Scope::Broad)),
        "NARROW" => Ok((tail, Scope::Narrow)),
        "RELATED" => Ok((tail, Scope::Related)),
        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        ))),
    }
}

fn match_qualifier(input: &str) -> IResult<&str, XRefMatch> {
    alt((
        pvalue(XRefMatch::NoMatch, kw("NO MATCH")),
        pvalue(XRefMatch::MatchName, kw("MATCH NAME")),
        pvalue(XRefMatch::MatchSynonym, kw("MATCH SYNONYM")),
    ))(input)
}

fn run<'a, O>(
    tag: &str,
    value: &'a SourcedValue<String>,
    parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> Result<O, OboError> {
    all_consuming(parser)(value.value.as_str())
        .map(|(_, out)| out)
        .map_err(|_| OboError::InvalidFormat {
            location: value.location.clone(),
            tag: tag.to_string(),
        })
}

// ============================================================================
// Value shapes, one function per shape
// ============================================================================

/// `"text"` with an optional trailing comment.
pub fn quoted_value(tag: &str, value: &SourcedValue<String>) -> Result<String, OboError> {
    fn parser(input: &str) -> IResult<&str, &str> {
        terminated(quoted, terminal_comment)(input)
    }
    run(tag, value, parser).map(unescape)
}

/// A single identifier token with an optional trailing comment.
pub fn id_value(tag: &str, value: &SourcedValue<String>) -> Result<String, OboError> {
    fn parser(input: &str) -> IResult<&str, &str> {
        terminated(word, terminal_comment)(input)
    }
    run(tag, value, parser).map(unescape)
}

/// Literal `true` or `false`.
pub fn boolean_value(tag: &str, value: &SourcedValue<String>) -> Result<bool, OboError> {
    fn parser(input: &str) -> IResult<&str, bool> {
        terminated(
            alt((pvalue(true, kw("true")), pvalue(false, kw("false")))),
            terminal_comment,
        )(input)
    }
    run(tag, value, parser)
}

/// Unquoted free text, trimmed and unescaped. A trailing dbxref list is
/// accepted and dropped, as the format allows one after most free values.
pub fn free_value(tag: &str, value: &SourcedValue<String>) -> Result<String, OboError> {
    fn parser(input: &str) -> IResult<&str, &str> {
        terminated(free_text, tuple((opt(dbxref_list), terminal_comment)))(input)
    }
    run(tag, value, parser).map(|raw| unescape(raw.trim()))
}

/// `"definition" [dbxref, ...]`.
pub fn definition_value(
    tag: &str,
    value: &SourcedValue<String>,
) -> Result<DefinitionValue, OboError> {
    fn parser(input: &str) -> IResult<&str, (&str, Option<&str>)> {
        let (input, text) = quoted(input)?;
        let (input, dbxrefs) = opt(dbxref_list)(input)?;
        let (input, _) = terminal_comment(input)?;
        Ok((input, (text, dbxrefs)))
    }
    run(tag, value, parser).map(|(text, dbxrefs)| DefinitionValue {
        text: unescape(text),
        dbxrefs: dbxrefs.map(str::to_string),
    })
}

/// `"text" SCOPE? type? [dbxref, ...]?`.
pub fn synonym_value(tag: &str, value: &SourcedValue<String>) -> Result<SynonymValue, OboError> {
    #[allow(clippy::type_complexity)]
    fn parser(input: &str) -> IResult<&str, (&str, Option<Scope>, Option<&str>, Option<&str>)> {
        let (input, text) = quoted(input)?;
        let (input, scope) = opt(preceded(multispace1, scope_keyword))(input)?;
        let (input, type_name) = opt(preceded(multispace1, word))(input)?;
        let (input, dbxrefs) = opt(dbxref_list)(input)?;
        let (input, _) = terminal_comment(input)?;
        Ok((input, (text, scope, type_name, dbxrefs)))
    }
    run(tag, value, parser).map(|(text, scope, type_name, dbxrefs)| SynonymValue {
        text: unescape(text),
        scope,
        type_name: type_name.map(unescape),
        dbxrefs: dbxrefs.map(str::to_string),
    })
}

/// Deprecated synonym tags (`exact_synonym`, ...) take no scope keyword;
/// the scope comes from the tag name.
pub fn deprecated_synonym_value(
    tag: &str,
    value: &SourcedValue<String>,
) -> Result<SynonymValue, OboError> {
    fn parser(input: &str) -> IResult<&str, (&str, Option<&str>, Option<&str>)> {
        let (input, text) = quoted(input)?;
        let (input, type_name) = opt(preceded(multispace1, word))(input)?;
        let (input, dbxrefs) = opt(dbxref_list)(input)?;
        let (input, _) = terminal_comment(input)?;
        Ok((input, (text, type_name, dbxrefs)))
    }
    run(tag, value, parser).map(|(text, type_name, dbxrefs)| SynonymValue {
        text: unescape(text),
        scope: None,
        type_name: type_name.map(unescape),
        dbxrefs: dbxrefs.map(str::to_string),
    })
}

/// `target "description"? (NO MATCH|MATCH NAME|MATCH SYNONYM)? phrase?`.
pub fn xref_value(tag: &str, value: &SourcedValue<String>) -> Result<XRefValue, OboError> {
    #[allow(clippy::type_complexity)]
    fn parser(
        input: &str,
    ) -> IResult<&str, (&str, Option<&str>, Option<XRefMatch>, Option<&str>)> {
        let (input, target) = word(input)?;
        let (input, description) = opt(preceded(multispace1, quoted))(input)?;
        let (input, qualifier) = opt(preceded(multispace1, match_qualifier))(input)?;
        let (input, matched) = if qualifier.is_some() {
            opt(preceded(multispace1, phrase))(input)?
        } else {
            (input, None)
        };
        let (input, _) = terminal_comment(input)?;
        Ok((input, (target, description, qualifier, matched)))
    }
    run(tag, value, parser).map(|(target, description, qualifier, matched)| XRefValue {
        target: unescape(target),
        description: description.map(unescape),
        qualifier,
        matched: matched.map(str::to_string),
    })
}

/// `rel target`.
pub fn relationship_value(
    tag: &str,
    value: &SourcedValue<String>,
) -> Result<(String, String), OboError> {
    fn parser(input: &str) -> IResult<&str, (&str, &str)> {
        let (input, rel) = word(input)?;
        let (input, _) = multispace1(input)?;
        let (input, target) = word(input)?;
        let (input, _) = terminal_comment(input)?;
        Ok((input, (rel, target)))
    }
    run(tag, value, parser).map(|(rel, target)| (unescape(rel), unescape(target)))
}

/// `rel? target`; the relation defaults to `is_a`.
pub fn intersection_value(
    tag: &str,
    value: &SourcedValue<String>,
) -> Result<(String, String), OboError> {
    fn parser(input: &str) -> IResult<&str, (Option<&str>, &str)> {
        let (input, rel) = opt(terminated(word, multispace1))(input)?;
        let (input, target) = word(input)?;
        let (input, _) = terminal_comment(input)?;
        Ok((input, (rel, target)))
    }
    run(tag, value, parser).map(|(rel, target)| {
        (
            rel.map(unescape).unwrap_or_else(|| "is_a".to_string()),
            unescape(target),
        )
    })
}

/// `rel "literal"? target` (Instance `property_value`).
pub fn property_value(
    tag: &str,
    value: &SourcedValue<String>,
) -> Result<(String, Option<String>, String), OboError> {
    fn parser(input: &str) -> IResult<&str, (&str, Option<&str>, &str)> {
        let (input, rel) = word(input)?;
        let (input, literal) = opt(preceded(multispace1, quoted))(input)?;
        let (input, _) = multispace1(input)?;
        let (input, target) = word(input)?;
        let (input, _) = terminal_comment(input)?;
        Ok((input, (rel, literal, target)))
    }
    run(tag, value, parser)
        .map(|(rel, literal, target)| (unescape(rel), literal.map(unescape), unescape(target)))
}

/// `name "description"` (header `subsetdef`).
pub fn subsetdef_value(
    tag: &str,
    value: &SourcedValue<String>,
) -> Result<(String, String), OboError> {
    fn parser(input: &str) -> IResult<&str, (&str, &str)> {
        let (input, name) = word(input)?;
        let (input, _) = multispace1(input)?;
        let (input, description) = quoted(input)?;
        let (input, _) = terminal_comment(input)?;
        Ok((input, (name, description)))
    }
    run(tag, value, parser).map(|(name, description)| (unescape(name), unescape(description)))
}

/// `name "description" SCOPE?` (header `synonymtypedef`); the scope
/// defaults to RELATED.
pub fn synonymtypedef_value(
    tag: &str,
    value: &SourcedValue<String>,
) -> Result<(String, String, Scope), OboError> {
    fn parser(input: &str) -> IResult<&str, (&str, &str, Option<Scope>)> {
        let (input, name) = word(input)?;
        let (input, _) = multispace1(input)?;
        let (input, description) = quoted(input)?;
        let (input, scope) = opt(preceded(multispace1, scope_keyword))(input)?;
        let (input, _) = terminal_comment(input)?;
        Ok((input, (name, description, scope)))
    }
    run(tag, value, parser).map(|(name, description, scope)| {
        (
            unescape(name),
            unescape(description),
            scope.unwrap_or(Scope::Related),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sv(text: &str) -> SourcedValue<String> {
        SourcedValue::new(Location::new("<test>", 1), text.to_string())
    }

    #[test]
    fn quoted_value_handles_escaped_quotes() {
        let v = quoted_value("def", &sv(r#""a \"quoted\" word""#)).expect("quoted");
        assert_eq!(v, r#"a "quoted" word"#);
    }

    #[test]
    fn quoted_value_rejects_unterminated_string() {
        let err = quoted_value("def", &sv(r#""open ended"#)).unwrap_err();
        assert!(matches!(err, OboError::InvalidFormat { tag, .. } if tag == "def"));
    }

    #[test]
    fn free_value_trims_and_ignores_comment() {
        let v = free_value("name", &sv("cell nucleus   ! the organelle")).expect("free");
        assert_eq!(v, "cell nucleus");
    }

    #[test]
    fn free_value_accepts_and_drops_dbxref_list() {
        let v = free_value("name", &sv("mitochondrion [GO:curators]")).expect("free");
        assert_eq!(v, "mitochondrion");
    }

    #[test]
    fn free_value_rejects_unbracketed_bracket() {
        assert!(free_value("name", &sv("odd]name")).is_err());
        // no whitespace before the list means the bracket is part of the value,
        // which the grammar forbids
        assert!(free_value("name", &sv("odd[X:1]")).is_err());
    }

    #[test]
    fn free_value_rejects_trailing_backslash() {
        assert!(free_value("id", &sv("A:1\\")).is_err());
    }

    #[test]
    fn free_value_decodes_escapes() {
        let v = free_value("name", &sv(r"two\nlines and a \[bracket\]")).expect("free");
        assert_eq!(v, "two\nlines and a [bracket]");
    }

    #[test]
    fn id_value_is_one_token() {
        assert_eq!(id_value("is_a", &sv("GO:1 ! nucleus")).expect("id"), "GO:1");
        assert!(id_value("is_a", &sv("GO:1 GO:2")).is_err());
    }

    #[test]
    fn boolean_value_accepts_literals_only() {
        assert!(boolean_value("is_obsolete", &sv("true")).expect("bool"));
        assert!(!boolean_value("is_obsolete", &sv("false ! why")).expect("bool"));
        assert!(boolean_value("is_obsolete", &sv("yes")).is_err());
    }

    #[test]
    fn synonym_value_full_form() {
        let v = synonym_value("synonym", &sv(r#""nucleus" EXACT greek [FOO:1, FOO:2]"#))
            .expect("synonym");
        assert_eq!(v.text, "nucleus");
        assert_eq!(v.scope, Some(Scope::Exact));
        assert_eq!(v.type_name.as_deref(), Some("greek"));
        assert_eq!(v.dbxrefs.as_deref(), Some("FOO:1, FOO:2"));
    }

    #[test]
    fn synonym_value_scope_and_empty_dbxrefs() {
        let v = synonym_value("synonym", &sv(r#""foo" EXACT []"#)).expect("synonym");
        assert_eq!(v.scope, Some(Scope::Exact));
        assert_eq!(v.type_name, None);
        assert_eq!(v.dbxrefs.as_deref(), Some(""));
    }

    #[test]
    fn synonym_value_type_resembling_scope_is_a_type() {
        let v = synonym_value("synonym", &sv(r#""foo" EXACTLY"#)).expect("synonym");
        assert_eq!(v.scope, None);
        assert_eq!(v.type_name.as_deref(), Some("EXACTLY"));
    }

    #[test]
    fn xref_value_with_qualifier_and_matched_phrase() {
        let v = xref_value("xref", &sv(r#"UMLS:C0007634 "cell" MATCH NAME cell body ! ok"#))
            .expect("xref");
        assert_eq!(v.target, "UMLS:C0007634");
        assert_eq!(v.description.as_deref(), Some("cell"));
        assert_eq!(v.qualifier, Some(XRefMatch::MatchName));
        assert_eq!(v.matched.as_deref(), Some("cell body"));
    }

    #[test]
    fn relationship_value_needs_two_words() {
        assert_eq!(
            relationship_value("relationship", &sv("part_of GO:1")).expect("rel"),
            ("part_of".to_string(), "GO:1".to_string())
        );
        assert!(relationship_value("relationship", &sv("part_of")).is_err());
    }

    #[test]
    fn intersection_value_defaults_to_is_a() {
        assert_eq!(
            intersection_value("intersection_of", &sv("GO:1")).expect("intersection"),
            ("is_a".to_string(), "GO:1".to_string())
        );
        assert_eq!(
            intersection_value("intersection_of", &sv("part_of GO:1")).expect("intersection"),
            ("part_of".to_string(), "GO:1".to_string())
        );
    }

    #[test]
    fn property_value_optional_literal() {
        assert_eq!(
            property_value("property_value", &sv(r#"shoe_size "8" IDS:1"#)).expect("pv"),
            (
                "shoe_size".to_string(),
                Some("8".to_string()),
                "IDS:1".to_string()
            )
        );
        assert_eq!(
            property_value("property_value", &sv("married_to IDS:2")).expect("pv"),
            ("married_to".to_string(), None, "IDS:2".to_string())
        );
    }

    #[test]
    fn synonymtypedef_value_scope_defaults_to_related() {
        let (name, descr, scope) =
            synonymtypedef_value("synonymtypedef", &sv(r#"UK_SPELLING "UK spelling""#))
                .expect("typedef");
        assert_eq!(name, "UK_SPELLING");
        assert_eq!(descr, "UK spelling");
        assert_eq!(scope, Scope::Related);
    }

    proptest! {
        #[test]
        fn escape_then_unescape_is_identity(s in "[^\r]*") {
            prop_assert_eq!(unescape(&escape_value(&s)), s);
        }

        #[test]
        fn free_values_never_end_in_a_bare_backslash(s in "[a-z :]{0,12}") {
            let doc = format!("{s}\\");
            prop_assert!(free_value("name", &sv(&doc)).is_err());
        }

        #[test]
        fn escaped_quoted_values_reparse(s in "[^\r]*") {
            let doc = format!("\"{}\"", escape_quoted(&s));
            let parsed = quoted_value("def", &sv(&doc)).expect("reparse");
            prop_assert_eq!(parsed, s);
        }
    }
}
