//! Integration tests for recovery from damaged files

use pdfgraph::parser::{DocumentParser, ParseError};
use pdfgraph::structure;
use pdfgraph::{
    parse_document, parse_document_with_options, save, Object, ObjectId, ParseOptions, WriterConfig,
};
use pretty_assertions::assert_eq;

const CATALOG: &str = "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n";
const PAGES: &str = "2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n";
const PAGE: &str = "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\n";

/// Header, the given bodies, and a correct classic xref section.
fn with_xref(bodies: &[&str], trailer: &str) -> Vec<u8> {
    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for body in bodies {
        offsets.push(pdf.len());
        pdf.extend_from_slice(body.as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", bodies.len() + 1).as_bytes());
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(format!("trailer\n{trailer}\nstartxref\n{xref}\n%%EOF\n").as_bytes());
    pdf
}

#[test]
fn test_no_xref_at_all() {
    let pdf = format!("%PDF-1.4\n{CATALOG}{PAGES}{PAGE}trailer\n<< /Root 1 0 R >>\n%%EOF\n");
    let context = parse_document(pdf.as_bytes()).unwrap();
    assert_eq!(context.trailer_info().root, Some(ObjectId::new(1, 0)));
    assert_eq!(structure::page_count(&context).unwrap(), 1);
}

#[test]
fn test_startxref_points_nowhere() {
    let mut pdf = with_xref(&[CATALOG, PAGES, PAGE], "<< /Size 4 /Root 1 0 R >>");
    let marker = pdf.len() - "%%EOF\n".len();
    let tail = format!("startxref\n{}\n%%EOF\n", 999_999);
    let cut = pdf[..marker]
        .windows(b"startxref".len())
        .rposition(|window| window == b"startxref")
        .unwrap();
    pdf.truncate(cut);
    pdf.extend_from_slice(tail.as_bytes());

    let context = parse_document(&pdf).unwrap();
    assert_eq!(structure::page_count(&context).unwrap(), 1);
}

#[test]
fn test_stale_stream_length() {
    let content = "4 0 obj\n<< /Length 999 >>\nstream\nBT /F1 12 Tf ET\nendstream\nendobj\n";
    let pdf = with_xref(&[CATALOG, PAGES, PAGE, content], "<< /Size 5 /Root 1 0 R >>");
    let context = parse_document(&pdf).unwrap();
    let stream = context.lookup_stream(ObjectId::new(4, 0)).unwrap();
    assert_eq!(stream.decoded_data().unwrap(), b"BT /F1 12 Tf ET");
    assert_eq!(stream.operators().unwrap().len(), 3);
}

#[test]
fn test_one_generation_per_object_number() {
    let pdf = format!(
        "%PDF-1.4\n{CATALOG}{PAGES}{PAGE}\
         5 0 obj\n(old)\nendobj\n5 1 obj\n(new)\nendobj\n\
         6 2 obj\n(kept)\nendobj\n6 1 obj\n(stale)\nendobj\n\
         trailer\n<< /Root 1 0 R >>\nstartxref\n999999\n%%EOF\n"
    );
    let context = parse_document(pdf.as_bytes()).unwrap();
    assert!(!context.contains(ObjectId::new(5, 0)));
    assert_eq!(context.lookup(ObjectId::new(5, 1)).unwrap(), &Object::string("new"));
    assert!(!context.contains(ObjectId::new(6, 1)));
    assert_eq!(context.lookup(ObjectId::new(6, 2)).unwrap(), &Object::string("kept"));
    assert_eq!(context.object_count(), 5);

    for config in [
        WriterConfig::default(),
        WriterConfig::default().with_object_streams(true),
    ] {
        let bytes = save(&context, &config).unwrap();
        let reparsed = parse_document(&bytes).unwrap();
        assert_eq!(reparsed.lookup(ObjectId::new(5, 1)).unwrap(), &Object::string("new"));
        assert_eq!(reparsed.lookup(ObjectId::new(6, 2)).unwrap(), &Object::string("kept"));
        assert_eq!(structure::page_count(&reparsed).unwrap(), 1);
    }
}

#[test]
fn test_hostile_xref_stream_predictor_falls_back_to_scan() {
    let data = pdfgraph::compression::compress(&[2, 0, 0, 0, 2, 0, 9, 0]).unwrap();
    let mut pdf = format!("%PDF-1.5\n{CATALOG}{PAGES}{PAGE}").into_bytes();
    let xref_offset = pdf.len();
    pdf.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /XRef /Size 5 /Root 1 0 R /W [1 2 1] /Filter /FlateDecode \
             /DecodeParms << /Predictor 12 /Columns 1099511627776 /Colors 4 >> /Length {} >>\nstream\n",
            data.len()
        )
        .as_bytes(),
    );
    pdf.extend_from_slice(&data);
    pdf.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes());

    let context = parse_document(&pdf).unwrap();
    assert_eq!(context.object_count(), 3);
    assert_eq!(structure::page_count(&context).unwrap(), 1);
}

#[test]
fn test_broken_object_stream_member_keeps_siblings() {
    let payload = "7 0 8 6 9 14 (one) << /A ] (three)";
    let pdf = format!(
        "%PDF-1.5\n{CATALOG}{PAGES}{PAGE}\
         4 0 obj\n<< /Type /ObjStm /N 3 /First 13 /Length {} >>\nstream\n{payload}\nendstream\nendobj\n\
         trailer\n<< /Root 1 0 R >>\n",
        payload.len()
    );
    let context = parse_document(pdf.as_bytes()).unwrap();
    assert_eq!(context.lookup(ObjectId::new(7, 0)).unwrap(), &Object::string("one"));
    assert_eq!(
        context.lookup(ObjectId::new(8, 0)).unwrap(),
        &Object::Invalid(b"<< /A ]".to_vec())
    );
    assert_eq!(context.lookup(ObjectId::new(9, 0)).unwrap(), &Object::string("three"));
    assert!(!context.contains(ObjectId::new(4, 0)));
}

#[test]
fn test_junk_between_objects() {
    let pdf = format!(
        "%PDF-1.4\n{CATALOG}@@@ not pdf @@@\n{PAGES}\x00\x01\x02 garbage ] >> \n{PAGE}trailer\n<< /Root 1 0 R >>\n"
    );
    let context = parse_document(pdf.as_bytes()).unwrap();
    assert_eq!(context.object_count(), 3);
    assert_eq!(structure::page_count(&context).unwrap(), 1);
}

#[test]
fn test_broken_object_kept_as_invalid() {
    let broken = "4 0 obj\n<< /Key ] >>\nendobj\n";
    let pdf = with_xref(&[CATALOG, PAGES, PAGE, broken], "<< /Size 5 /Root 1 0 R >>");

    let context = parse_document(&pdf).unwrap();
    assert_eq!(
        context.lookup(ObjectId::new(4, 0)).unwrap(),
        &Object::Invalid(b"<< /Key ] >>".to_vec())
    );

    let strict = parse_document_with_options(&pdf, ParseOptions::strict());
    assert!(strict.is_err());
}

#[test]
fn test_root_recovered_from_newest_catalog() {
    let newer = "4 0 obj\n<< /Type /Catalog /Pages 2 0 R /Lang (en) >>\nendobj\n";
    let pdf = format!("%PDF-1.4\n{CATALOG}{PAGES}{PAGE}{newer}%%EOF\n");
    let context = parse_document(pdf.as_bytes()).unwrap();
    assert_eq!(context.trailer_info().root, Some(ObjectId::new(4, 0)));
}

#[test]
fn test_dangling_root_falls_back_to_catalog() {
    let pdf = with_xref(&[CATALOG, PAGES, PAGE], "<< /Size 4 /Root 9 0 R >>");
    let context = parse_document(&pdf).unwrap();
    assert_eq!(context.trailer_info().root, Some(ObjectId::new(1, 0)));
}

#[test]
fn test_no_catalog_is_an_error() {
    let pdf = format!("%PDF-1.4\n{PAGES}{PAGE}%%EOF\n");
    assert!(matches!(
        parse_document(pdf.as_bytes()),
        Err(ParseError::MissingRoot)
    ));
}

#[test]
fn test_header_after_leading_junk() {
    let mut pdf = b"JUNKJUNK\n".to_vec();
    pdf.extend_from_slice(&with_xref(&[CATALOG, PAGES, PAGE], "<< /Size 4 /Root 1 0 R >>"));
    let context = parse_document(&pdf).unwrap();
    assert_eq!(structure::page_count(&context).unwrap(), 1);
}

#[test]
fn test_parser_yields_while_loading() {
    let pdf = with_xref(&[CATALOG, PAGES, PAGE], "<< /Size 4 /Root 1 0 R >>");
    let mut ticks = Vec::new();
    let options = ParseOptions {
        objects_per_tick: 1,
        ..ParseOptions::default()
    };
    DocumentParser::new(&pdf, options)
        .with_yield_hook(|tick| ticks.push(tick))
        .parse()
        .unwrap();
    assert_eq!(ticks, vec![1, 2, 3]);
}
