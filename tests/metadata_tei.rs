use doc_convoy::metadata::{clean_text, parse_header_tei, parse_references_tei};

const HEADER_TEI: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt>
        <title level="a" type="main">Attention Is   All You Need</title>
      </titleStmt>
      <sourceDesc>
        <biblStruct>
          <analytic>
            <author>
              <persName><forename type="first">Ashish</forename> <surname>Vaswani</surname></persName>
            </author>
            <author>
              <persName><forename type="first">Noam</forename> <surname>Shazeer</surname></persName>
            </author>
            <idno type="DOI">10.48550/arXiv.1706.03762</idno>
          </analytic>
        </biblStruct>
      </sourceDesc>
    </fileDesc>
    <profileDesc>
      <abstract>
        <p>The dominant sequence transduction models are based on complex
        recurrent networks.</p>
      </abstract>
    </profileDesc>
  </teiHeader>
</TEI>"#;

#[test]
fn header_fields_are_extracted() {
    let record = parse_header_tei(HEADER_TEI);
    assert_eq!(record.title.as_deref(), Some("Attention Is All You Need"));
    assert_eq!(record.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
    assert_eq!(record.doi.as_deref(), Some("10.48550/arXiv.1706.03762"));
    assert!(record
        .abstract_text
        .as_deref()
        .unwrap()
        .starts_with("The dominant sequence transduction"));
}

#[test]
fn references_are_flattened_per_entry() {
    let tei = r#"<listBibl>
      <biblStruct xml:id="b0"><analytic><title>First cited work</title></analytic></biblStruct>
      <biblStruct xml:id="b1"><analytic><title>Second cited work</title></analytic></biblStruct>
    </listBibl>"#;
    let refs = parse_references_tei(tei);
    assert_eq!(refs.len(), 2);
    assert_eq!(refs[0], "First cited work");
}

#[test]
fn missing_fields_come_back_empty() {
    let record = parse_header_tei("<TEI></TEI>");
    assert!(record.title.is_none());
    assert!(record.authors.is_empty());
    assert!(record.doi.is_none());
}

#[test]
fn clean_text_strips_tags_and_normalizes() {
    // U+FB01 is the "fi" ligature; NFKC expands it.
    let cleaned = clean_text("<p>e\u{FB01}cient   <hi>models</hi></p>");
    assert_eq!(cleaned, "efficient models");
}
