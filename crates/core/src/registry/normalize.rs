//! Record extraction from the upstream XML register.
//!
//! The document is tokenized into a generic element tree, then a fixed
//! priority list of known container layouts is probed for producer entries.
//! Upstream has renamed both the container path and the per-field element
//! names across schema versions, so both tables are data-driven: a new
//! variant is one more row, not a new branch.
//!
//! An unrecognized layout is NOT an error. It degrades to an empty record
//! list, which turns total schema drift into "not found" for every query
//! instead of an outage. Only syntactic corruption that the tokenizer itself
//! rejects surfaces as [`ParseError::Malformed`].

use quick_xml::Reader;
use quick_xml::events::Event;

use super::Record;

/// Container layouts observed in upstream schema versions, probed in order.
/// The leading segments name nested containers, the last names one entry.
const CONTAINER_PATHS: &[&[&str]] = &[
    &["Root", "ListOfProducers", "Producer"],
    &["producers", "producer"],
    &["RegisterExcerpt", "Producer"],
    &["Producers", "Producer"],
];

/// Candidate element names per logical field; first non-empty value wins.
const REGISTRATION_NUMBER: &[&str] = &[
    "RegistrationNumber",
    "registrationNumber",
    "RegisterNumber",
    "Number",
];
const COMPANY_NAME: &[&str] = &["CompanyName", "Name", "ProducerName"];
const VAT_NUMBER: &[&str] = &["VatNumber", "VatId", "vatNumber"];
const TAX_NUMBER: &[&str] = &["TaxNumber", "TaxId", "taxNumber"];
const ADDRESS: &[&str] = &["Address", "Street", "address"];
const CITY: &[&str] = &["City", "Town", "city"];
const POSTAL_CODE: &[&str] = &["PostalCode", "Zip", "postalCode"];

/// Errors from the syntactic parse step.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The document cannot be tokenized at all. Schema drift is not
    /// malformed; this covers truncation, mismatched tags, and the like.
    #[error("malformed document: {0}")]
    Malformed(String),
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

/// Extract the uniform record shape from a raw register document.
///
/// Identical input bytes always yield the identical record list. Entries
/// lacking a non-empty registration number under every known alias are
/// dropped, since they cannot be indexed.
pub fn normalize(raw: &[u8]) -> Result<Vec<Record>, ParseError> {
    let tree = parse_tree(raw)?;

    let entries = CONTAINER_PATHS
        .iter()
        .map(|path| find_entries(&tree, path))
        .find(|entries| !entries.is_empty())
        .unwrap_or_default();

    let mut records = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;
    for entry in entries {
        let registration_number = field(entry, REGISTRATION_NUMBER);
        if registration_number.is_empty() {
            dropped += 1;
            continue;
        }
        records.push(Record {
            registration_number,
            company_name: field(entry, COMPANY_NAME),
            vat_number: field(entry, VAT_NUMBER),
            tax_number: field(entry, TAX_NUMBER),
            address: field(entry, ADDRESS),
            city: field(entry, CITY),
            postal_code: field(entry, POSTAL_CODE),
        });
    }

    if dropped > 0 {
        tracing::debug!(dropped, "dropped entries without a registration number");
    }

    Ok(records)
}

/// Tokenize the document into a tree under a synthetic root element.
fn parse_tree(raw: &[u8]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(raw);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Element::default()];
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                stack.push(Element {
                    name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                    ..Default::default()
                });
            }
            Ok(Event::Empty(start)) => {
                let element = Element {
                    name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                    ..Default::default()
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Malformed("closing tag without opening".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Err(ParseError::Malformed("closing tag without opening".into())),
                }
            }
            Ok(Event::Text(text)) => {
                let value = text
                    .unescape()
                    .map_err(|e| ParseError::Malformed(e.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&value);
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ParseError::Malformed(e.to_string())),
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(ParseError::Malformed("unclosed element at end of document".into()));
    }
    stack
        .pop()
        .ok_or_else(|| ParseError::Malformed("empty document".into()))
}

/// Navigate the container segments of `path`, then collect every child
/// matching the entry segment. A missing container yields no entries.
fn find_entries<'a>(root: &'a Element, path: &[&str]) -> Vec<&'a Element> {
    let (containers, entry) = match path.split_last() {
        Some((entry, containers)) => (containers, entry),
        None => return Vec::new(),
    };

    let mut scope = root;
    for name in containers {
        match scope.children.iter().find(|child| child.name == *name) {
            Some(child) => scope = child,
            None => return Vec::new(),
        }
    }
    scope
        .children
        .iter()
        .filter(|child| child.name == *entry)
        .collect()
}

/// Evaluate the alias list for one logical field; first non-empty wins.
fn field(entry: &Element, aliases: &[&str]) -> String {
    for alias in aliases {
        if let Some(child) = entry.children.iter().find(|child| child.name == *alias) {
            let value = child.text.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARIANT_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <Root>
            <ListOfProducers>
                <Producer>
                    <RegistrationNumber>DE111</RegistrationNumber>
                    <CompanyName>Acme GmbH</CompanyName>
                    <VatNumber>DE999999999</VatNumber>
                    <City>Berlin</City>
                </Producer>
                <Producer>
                    <RegistrationNumber>DE222</RegistrationNumber>
                    <CompanyName>Beta AG</CompanyName>
                </Producer>
            </ListOfProducers>
        </Root>"#;

    const VARIANT_B: &str = r#"<?xml version="1.0"?>
        <producers>
            <producer>
                <RegistrationNumber>DE111</RegistrationNumber>
                <CompanyName>Acme GmbH</CompanyName>
                <VatNumber>DE999999999</VatNumber>
                <City>Berlin</City>
            </producer>
            <producer>
                <RegistrationNumber>DE222</RegistrationNumber>
                <CompanyName>Beta AG</CompanyName>
            </producer>
        </producers>"#;

    #[test]
    fn test_extracts_records_from_primary_layout() {
        let records = normalize(VARIANT_A.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].registration_number, "DE111");
        assert_eq!(records[0].company_name, "Acme GmbH");
        assert_eq!(records[0].vat_number, "DE999999999");
        assert_eq!(records[0].city, "Berlin");
        assert_eq!(records[0].tax_number, "");
        assert_eq!(records[1].registration_number, "DE222");
    }

    #[test]
    fn test_layout_variants_extract_equivalently() {
        let a = normalize(VARIANT_A.as_bytes()).unwrap();
        let b = normalize(VARIANT_B.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_register_excerpt_and_bare_layouts() {
        let excerpt = r#"<RegisterExcerpt>
            <Producer><RegistrationNumber>DE1</RegistrationNumber></Producer>
        </RegisterExcerpt>"#;
        assert_eq!(normalize(excerpt.as_bytes()).unwrap().len(), 1);

        let bare = r#"<Producers>
            <Producer><RegistrationNumber>DE2</RegistrationNumber></Producer>
        </Producers>"#;
        assert_eq!(normalize(bare.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn test_idempotent_on_identical_bytes() {
        let first = normalize(VARIANT_A.as_bytes()).unwrap();
        let second = normalize(VARIANT_A.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_registration_number_alias_fallback() {
        let doc = r#"<Producers>
            <Producer><registrationNumber>DE10</registrationNumber></Producer>
            <Producer><RegisterNumber>DE11</RegisterNumber></Producer>
            <Producer><Number>DE12</Number></Producer>
        </Producers>"#;
        let records = normalize(doc.as_bytes()).unwrap();
        let numbers: Vec<_> = records.iter().map(|r| r.registration_number.as_str()).collect();
        assert_eq!(numbers, ["DE10", "DE11", "DE12"]);
    }

    #[test]
    fn test_alias_priority_first_non_empty_wins() {
        let doc = r#"<Producers>
            <Producer>
                <RegistrationNumber>  </RegistrationNumber>
                <Number>DE42</Number>
                <CompanyName></CompanyName>
                <Name>Fallback Name</Name>
            </Producer>
        </Producers>"#;
        let records = normalize(doc.as_bytes()).unwrap();
        assert_eq!(records[0].registration_number, "DE42");
        assert_eq!(records[0].company_name, "Fallback Name");
    }

    #[test]
    fn test_entry_without_registration_number_is_dropped() {
        let doc = r#"<Producers>
            <Producer><CompanyName>No Number Ltd</CompanyName></Producer>
            <Producer><RegistrationNumber>DE1</RegistrationNumber></Producer>
        </Producers>"#;
        let records = normalize(doc.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].registration_number, "DE1");
    }

    #[test]
    fn test_unknown_container_yields_empty_not_error() {
        let doc = r#"<SomethingElse><Entry><Id>1</Id></Entry></SomethingElse>"#;
        let records = normalize(doc.as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        let doc = r#"<Producers><Producer><RegistrationNumber>DE1"#;
        let result = normalize(doc.as_bytes());
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let doc = r#"<Producers><Producer></Wrong></Producers>"#;
        let result = normalize(doc.as_bytes());
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_fields_stay_opaque_text() {
        let doc = r#"<Producers>
            <Producer>
                <RegistrationNumber> de77 </RegistrationNumber>
                <PostalCode>01067</PostalCode>
            </Producer>
        </Producers>"#;
        let records = normalize(doc.as_bytes()).unwrap();
        // surrounding whitespace is trimmed per field, but no key
        // normalization happens here
        assert_eq!(records[0].registration_number, "de77");
        assert_eq!(records[0].postal_code, "01067");
    }
}
