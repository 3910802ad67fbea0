use crate::types::*;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One pretty-printed JSON array
    #[default]
    Json,
    /// One JSON object per line
    Jsonl,
    /// Plain text, one item per line
    Text,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            "text" | "txt" => Ok(OutputFormat::Text),
            other => bail!("Unknown output format '{other}' (expected json, jsonl or text)"),
        }
    }
}

/// Single-line human readable rendering
pub trait TextLine {
    fn text_line(&self) -> String;
}

impl TextLine for CandidateRecord {
    fn text_line(&self) -> String {
        match &self.filename {
            Some(filename) => format!("{filename}\t{}", self.citation),
            None => self.citation.clone(),
        }
    }
}

impl TextLine for ScoredElement {
    fn text_line(&self) -> String {
        let preview: String = self.text.chars().take(120).collect();
        format!("{:>10.2}\t<{}>\t{}", self.score, self.tag, preview)
    }
}

impl TextLine for Citation {
    fn text_line(&self) -> String {
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();
        format!(
            "{year}\t{}\t{}\t{}",
            self.author.join("; "),
            self.title.as_deref().unwrap_or(""),
            self.venue.as_deref().unwrap_or("")
        )
    }
}

pub fn write_items<T, W>(items: &[T], format: OutputFormat, mut writer: W) -> Result<()>
where
    T: Serialize + TextLine,
    W: Write,
{
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, items)?;
            writeln!(writer)?;
        }
        OutputFormat::Jsonl => {
            for item in items {
                serde_json::to_writer(&mut writer, item)?;
                writeln!(writer)?;
            }
        }
        OutputFormat::Text => {
            for item in items {
                writeln!(writer, "{}", item.text_line())?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn save_with_format<T>(items: &[T], path: &str, format: OutputFormat) -> Result<()>
where
    T: Serialize + TextLine,
{
    let file =
        std::fs::File::create(path).with_context(|| format!("Failed to create {path}"))?;
    write_items(items, format, std::io::BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<CandidateRecord> {
        vec![
            CandidateRecord {
                filename: Some("a.html".to_string()),
                citation: "Doe. Paper one. 2009.".to_string(),
                score: 150.0,
                tag: "li".to_string(),
            },
            CandidateRecord {
                filename: None,
                citation: "Roe. Paper two. 2011.".to_string(),
                score: 120.0,
                tag: "li".to_string(),
            },
        ]
    }

    fn render<T: Serialize + TextLine>(items: &[T], format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_items(items, format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("jsonl".parse::<OutputFormat>().unwrap(), OutputFormat::Jsonl);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("graph".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_json_records_carry_only_filename_and_citation() {
        let json = render(&records(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"filename": "a.html", "citation": "Doe. Paper one. 2009."},
                {"citation": "Roe. Paper two. 2011."}
            ])
        );
    }

    #[test]
    fn test_jsonl_is_one_object_per_line() {
        let jsonl = render(&records(), OutputFormat::Jsonl);
        let lines: Vec<&str> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            assert!(serde_json::from_str::<serde_json::Value>(line).unwrap().is_object());
        }
    }

    #[test]
    fn test_text_lines() {
        let text = render(&records(), OutputFormat::Text);
        assert_eq!(text, "a.html\tDoe. Paper one. 2009.\nRoe. Paper two. 2011.\n");

        let citation = Citation {
            author: vec!["J Doe".to_string(), "R Roe".to_string()],
            title: Some("Paper".to_string()),
            year: Some(2009),
            ..Citation::default()
        };
        assert_eq!(citation.text_line(), "2009\tJ Doe; R Roe\tPaper\t");
    }
}
