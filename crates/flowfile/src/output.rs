use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use flowfile_codec::{Attributes, FlowFile, FlowFileV3};

use crate::exit::{io_error, CliResult};
use serde::Serialize;

const PREVIEW_LIMIT: usize = 64;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    index: u64,
    attributes: BTreeMap<Cow<'a, str>, Cow<'a, str>>,
    content_size: usize,
    content: String,
    wire_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted_to: Option<&'a str>,
}

/// Print one unpacked record. `extracted_to` is where its content was
/// written, if anywhere.
pub fn print_record(
    index: u64,
    flowfile: &FlowFileV3,
    extracted_to: Option<&str>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let out = RecordOutput {
                index,
                attributes: text_attributes(flowfile.attributes()),
                content_size: flowfile.content().len(),
                content: content_preview(flowfile.content()),
                wire_size: flowfile.wire_size(),
                extracted_to,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![format!("RECORD {index}"), "VALUE".to_string()]);
            for (key, value) in text_attributes(flowfile.attributes()) {
                table.add_row(vec![key.into_owned(), value.into_owned()]);
            }
            table.add_row(vec![
                "<content>".to_string(),
                format!(
                    "{} bytes: {}",
                    flowfile.content().len(),
                    content_preview(flowfile.content())
                ),
            ]);
            if let Some(path) = extracted_to {
                table.add_row(vec!["<extracted>".to_string(), path.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "record={} attributes={} size={}",
                index,
                flowfile.attributes().len(),
                flowfile.content().len()
            );
            for (key, value) in text_attributes(flowfile.attributes()) {
                println!("  {key}={value}");
            }
            println!("  content={}", content_preview(flowfile.content()));
            if let Some(path) = extracted_to {
                println!("  extracted={path}");
            }
        }
        OutputFormat::Raw => return print_raw(flowfile.content()),
    }
    Ok(())
}

pub fn print_raw(data: &[u8]) -> CliResult<()> {
    write_raw(&mut std::io::stdout().lock(), data)
}

fn write_raw<W: Write>(out: &mut W, data: &[u8]) -> CliResult<()> {
    out.write_all(data)
        .and_then(|()| out.flush())
        .map_err(|err| io_error("failed writing stdout", err))
}

/// Attribute bytes rendered as text, with invalid UTF-8 replaced.
fn text_attributes(attributes: &Attributes) -> BTreeMap<Cow<'_, str>, Cow<'_, str>> {
    attributes
        .iter()
        .map(|(key, value)| (String::from_utf8_lossy(key), String::from_utf8_lossy(value)))
        .collect()
}

fn content_preview(content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(text) if text.chars().count() <= PREVIEW_LIMIT => text.to_string(),
        Ok(text) => {
            let head: String = text.chars().take(PREVIEW_LIMIT).collect();
            format!("{head}...")
        }
        Err(_) => format!("<binary {} bytes>", content.len()),
    }
}
