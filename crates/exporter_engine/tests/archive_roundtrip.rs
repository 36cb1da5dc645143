use std::io::{Cursor, Read};

use exporter_engine::{checksum, ArchiveBuilder, ArchiveEntry, StoreCompressor};
use pretty_assertions::assert_eq;
use zip::ZipArchive;

fn read_entry(bytes: &[u8], name: &str) -> (String, u32, zip::CompressionMethod) {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("archive parses");
    let mut file = archive.by_name(name).expect("entry present");
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    (content, file.crc32(), file.compression())
}

#[test]
fn deflated_entry_extracts_with_zip_reader() {
    let mut builder = ArchiveBuilder::new();
    builder.add("a.md", "hello");
    let bytes = builder.to_bytes().unwrap();

    let (content, crc, method) = read_entry(&bytes, "a.md");
    assert_eq!(content, "hello");
    assert_eq!(crc, checksum(b"hello"));
    assert_eq!(method, zip::CompressionMethod::Deflated);
}

#[test]
fn stored_entry_extracts_with_zip_reader() {
    let mut builder = ArchiveBuilder::new();
    builder.set_compression(false).add("a.md", "hello");
    let bytes = builder.to_bytes().unwrap();

    let (content, crc, method) = read_entry(&bytes, "a.md");
    assert_eq!(content, "hello");
    assert_eq!(crc, checksum(b"hello"));
    assert_eq!(method, zip::CompressionMethod::Stored);
}

#[test]
fn missing_compressor_falls_back_to_stored() {
    let mut builder = ArchiveBuilder::with_compressor(StoreCompressor);
    builder.add("a.md", "hello");
    let bytes = builder.to_bytes().unwrap();

    let (content, _, method) = read_entry(&bytes, "a.md");
    assert_eq!(content, "hello");
    assert_eq!(method, zip::CompressionMethod::Stored);
}

#[test]
fn many_entries_keep_order_and_names() {
    let mut builder = ArchiveBuilder::new();
    let body = "line\n".repeat(500);
    builder
        .add("1.first.md", body.clone())
        .add("2.second.md", "")
        .add_entry(ArchiveEntry::new("3.résumé.md", "unicode").with_compression(false));
    let bytes = builder.to_bytes().unwrap();

    let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    assert_eq!(archive.len(), 3);
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["1.first.md", "2.second.md", "3.résumé.md"]);

    assert_eq!(read_entry(&bytes, "1.first.md").0, body);
    assert_eq!(read_entry(&bytes, "2.second.md").0, "");
    assert_eq!(read_entry(&bytes, "3.résumé.md").0, "unicode");
}
