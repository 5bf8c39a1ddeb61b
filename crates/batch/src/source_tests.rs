use super::*;

use std::io::{self, Read, Write};

fn source(text: &str) -> RecordSource<&[u8]> {
    RecordSource::from_reader(text.as_bytes(), RecordParser::new("1"))
}

/// First item read from a one-row input.
fn first(text: &str) -> Option<Result<Record>> {
    source(text).next()
}

#[test]
fn parse_prefixes_agency_and_keeps_field_order() {
    let mut src = RecordSource::from_reader(
        "Santiago Lionel,Lorca,30904465,1999-03-17,7574\n".as_bytes(),
        RecordParser::new("3"),
    );
    let record = src.next().expect("item").expect("record");

    assert_eq!(
        record.fields(),
        ["3", "Santiago Lionel", "Lorca", "30904465", "1999-03-17", "7574"]
    );
}

#[test]
fn row_cases() {
    let cases: &[(&str, Option<bool>)] = &[
        // (input, Some(true) = record, Some(false) = nothing yielded, None = error)
        ("a,b,c,d,e\n", Some(true)),
        ("a,b,c,d,e\r\n", Some(true)),
        ("a,b,c,d,e", Some(true)),
        ("\"a\",b,c,d,e\n", Some(true)),
        ("\"a, b\",c,d,e,f\n", Some(true)),
        ("\n", Some(false)),
        ("   \n", Some(false)),
        ("a,b,c,d\n", None),
        ("a,b,c,d,e,f\n", None),
        ("a,b|x,c,d,e\n", None),
        ("\"a\nb\",c,d,e,f\n", None),
    ];

    for (input, expected) in cases {
        let got = first(input);
        match expected {
            Some(true) => assert!(matches!(got, Some(Ok(_))), "{input:?}: got {got:?}"),
            Some(false) => assert!(got.is_none(), "{input:?}: got {got:?}"),
            None => assert!(
                matches!(got, Some(Err(Error::MalformedRecord { line: 1, .. }))),
                "{input:?}: got {got:?}"
            ),
        }
    }
}

#[test]
fn quoted_fields_lose_their_quotes() {
    let record = first("\"Ana\",Diaz,30904465,1990-01-01,7574\n")
        .expect("item")
        .expect("record");
    assert_eq!(record.first_name, "Ana");

    let record = first("\"Perez, Juan\",Diaz,30904465,1990-01-01,7574\n")
        .expect("item")
        .expect("record");
    assert_eq!(record.first_name, "Perez, Juan");
    assert_eq!(record.last_name, "Diaz");

    let record = first("\"O\"\"Brien\",Diaz,30904465,1990-01-01,7574\n")
        .expect("item")
        .expect("record");
    assert_eq!(record.first_name, "O\"Brien");
}

#[test]
fn carriage_return_is_not_part_of_the_number() {
    let record = first("a,b,c,d,42\r\n").expect("item").expect("record");
    assert_eq!(record.number, "42");
}

#[test]
fn source_skips_blank_lines() {
    let text = "a,b,c,1,10\n\nd,e,f,2,20\n";
    let documents: Vec<String> = source(text)
        .map(|r| r.expect("record").document)
        .collect();

    assert_eq!(documents, vec!["1", "2"]);
}

#[test]
fn malformed_line_reports_its_line_number() {
    let text = "a,b,c,1,10\nbroken\n";
    let items: Vec<Result<Record>> = source(text).collect();

    assert!(items[0].is_ok());
    assert!(
        matches!(items[1], Err(Error::MalformedRecord { line: 2, .. })),
        "got {:?}",
        items[1]
    );
}

#[test]
fn invalid_utf8_is_malformed() {
    let bytes: &[u8] = b"a,b,c,1,10\n\xff,b,c,2,20\n";
    let items: Vec<Result<Record>> =
        RecordSource::from_reader(bytes, RecordParser::new("1")).collect();

    assert!(items[0].is_ok());
    assert!(
        matches!(items[1], Err(Error::MalformedRecord { line: 2, .. })),
        "got {:?}",
        items[1]
    );
}

/// Hands out `data` once, then fails every read.
struct FailingReader {
    data: Option<Vec<u8>>,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.take() {
            Some(data) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            None => Err(io::Error::new(io::ErrorKind::ConnectionReset, "disk went away")),
        }
    }
}

#[test]
fn read_errors_surface_as_io() {
    let reader = FailingReader {
        data: Some(b"a,b,c,1,10\n".to_vec()),
    };
    let mut src = RecordSource::from_reader(reader, RecordParser::new("5"));

    assert!(src.next().expect("item").is_ok());
    assert!(matches!(src.next(), Some(Err(Error::Io(_)))));
}

#[test]
fn open_reads_a_file_lazily() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "Santiago Lionel,Lorca,30904465,1999-03-17,7574").expect("write");
    writeln!(file, "\"Lopez, Joaquin\",Lopez,29000111,1987-11-02,42").expect("write");
    file.flush().expect("flush");

    let src = RecordSource::open(file.path(), RecordParser::new("2")).expect("open");
    let records: Vec<Record> = src.collect::<Result<_>>().expect("records");

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].agency, "2");
    assert_eq!(records[1].first_name, "Lopez, Joaquin");
    assert_eq!(records[1].number, "42");
}

#[test]
fn open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let got = RecordSource::open(&dir.path().join("missing.csv"), RecordParser::new("1"));
    assert!(matches!(got, Err(Error::Io(_))));
}
