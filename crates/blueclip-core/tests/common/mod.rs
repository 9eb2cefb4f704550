//! Helpers for building small vector PDFs in tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, Object, Stream};

pub const LETTER_WIDTH: i64 = 612;
pub const LETTER_HEIGHT: i64 = 792;

/// A PDF with one Letter page per content stream.
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for content in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(LETTER_WIDTH),
                Object::Integer(LETTER_HEIGHT),
            ],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Write [`pdf_bytes`] into `dir`.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pdf_bytes(pages)).unwrap();
    path
}

/// Two line clusters, one degenerate two-point cluster and nothing else,
/// separated by far more than 20pt.
pub const CLUSTERED_PAGE: &str = "\
10 10 m 30 30 l S
20 10 m 10 30 l S
400 400 m 410 415 l S
200 700 m 210 700 l S
";

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-3
}
