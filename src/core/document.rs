use crate::utils::error::{InsightError, Result};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

fn decode_error(message: impl Into<String>) -> InsightError {
    InsightError::DocumentDecodeError {
        message: message.into(),
    }
}

/// 從 .docx 取出純文字，格式一律捨棄
///
/// 每個段落後面接一個空行；`w:tab` 轉成 tab，`w:br`、`w:cr` 轉成換行。
pub fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| decode_error(format!("Could not open DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| decode_error(format!("Could not find file in archive: {}", DOCUMENT_PART)))?
        .read_to_string(&mut xml)
        .map_err(|e| decode_error(format!("Could not read {}: {}", DOCUMENT_PART, e)))?;

    document_xml_text(&xml)
}

fn document_xml_text(xml: &str) -> Result<String> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let chunk = e
                    .unescape()
                    .map_err(|err| decode_error(format!("Invalid text in document: {}", err)))?;
                text.push_str(&chunk);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(decode_error(format!(
                    "Malformed document XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}
