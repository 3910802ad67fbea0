//! ParsCit backend.
//!
//! `parseRefStrings.pl -` reads reference strings on stdin and prints an XML
//! document with one `<citation>` per reference it recognised:
//!
//! ```xml
//! <algorithms><algorithm name="ParsCit"><citationList>
//!   <citation valid="true">
//!     <authors><author>J. Doe</author><author>R. Roe</author></authors>
//!     <title>Scoring document trees</title>
//!     <date>2009</date>
//!     <booktitle>Proceedings of WWW</booktitle>
//!   </citation>
//! </citationList></algorithm></algorithms>
//! ```

use super::ReferenceParser;
use crate::config::ReferenceParserConfig;
use crate::types::Citation;
use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

pub struct ParsCitParser {
    command: String,
    args: Vec<String>,
}

impl ParsCitParser {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &ReferenceParserConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }

    fn run(&self, text: &str) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start reference parser {}", self.command))?;

        // Feed stdin from another thread so a chatty child cannot fill its
        // stdout pipe while we are still writing
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Reference parser stdin unavailable"))?;
        let input = text.as_bytes().to_vec();
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .context("Failed to read reference parser output")?;
        writer
            .join()
            .map_err(|_| anyhow!("Reference parser stdin writer panicked"))?
            .context("Failed to write to reference parser")?;

        if !output.status.success() {
            debug!(status = %output.status, "reference parser exited unsuccessfully");
        }
        Ok(output.stdout)
    }
}

impl ReferenceParser for ParsCitParser {
    fn parse(&self, text: &str) -> Result<Vec<Citation>> {
        let xml = self.run(text)?;
        Ok(parse_citation_xml(&xml))
    }

    fn name(&self) -> &str {
        "ParsCit"
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Author,
    Title,
    Venue,
    Date,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"author" => Some(Field::Author),
            b"title" => Some(Field::Title),
            b"booktitle" | b"journal" => Some(Field::Venue),
            b"date" => Some(Field::Date),
            _ => None,
        }
    }
}

/// Convert ParsCit XML into citations. Output that is not well-formed XML
/// yields no citations. Citations with neither author nor title are dropped.
pub fn parse_citation_xml(xml: &[u8]) -> Vec<Citation> {
    let xml = String::from_utf8_lossy(xml);
    match read_citations(&xml) {
        Ok(citations) => citations,
        Err(err) => {
            debug!("unparseable reference parser output: {err}");
            Vec::new()
        }
    }
}

fn read_citations(xml: &str) -> Result<Vec<Citation>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut citations = Vec::new();
    let mut current: Option<Citation> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                if name.as_ref() == b"citation" {
                    current = Some(Citation::default());
                } else if current.is_some() {
                    field = Field::from_tag(name.as_ref());
                    text.clear();
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == b"citation" {
                    if let Some(citation) = current.take() {
                        if citation.has_content() {
                            citations.push(citation);
                        }
                    }
                } else if let (Some(citation), Some(f)) = (current.as_mut(), field) {
                    if Field::from_tag(name.as_ref()) == Some(f) {
                        store_field(citation, f, text.trim());
                        field = None;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(citations)
}

fn store_field(citation: &mut Citation, field: Field, value: &str) {
    if value.is_empty() {
        return;
    }
    match field {
        Field::Author => citation.author.push(value.to_string()),
        Field::Title => citation.title = Some(value.to_string()),
        Field::Venue => citation.venue = Some(value.to_string()),
        Field::Date => {
            if let Ok(year) = value.parse::<i32>() {
                citation.year = Some(year);
            }
        }
    }
}
