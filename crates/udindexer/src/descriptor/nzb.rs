use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{JobDescriptor, SourceKind};
use crate::error::DescriptorError;

/// Reads and parses the descriptor at `path`.
pub fn parse_descriptor(path: &Path, source_kind: SourceKind) -> Result<JobDescriptor, DescriptorError> {
    let bytes = std::fs::read(path).map_err(|e| DescriptorError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let descriptor_file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    parse_descriptor_bytes(&bytes, descriptor_file, source_kind)
}

/// Parses NZB content.
///
/// The declared name is the subject of the first `<file>`; the declared size
/// is the sum of every `<segment bytes="...">` across all files.
pub fn parse_descriptor_bytes(
    bytes: &[u8],
    descriptor_file: String,
    source_kind: SourceKind,
) -> Result<JobDescriptor, DescriptorError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut first_subject: Option<String> = None;
    let mut file_count = 0usize;
    let mut total_bytes: u64 = 0;
    let mut in_file = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"file" => {
                    in_file = true;
                    file_count += 1;
                    if file_count == 1 {
                        first_subject = Some(read_attribute(&reader, e, b"subject")?
                            .ok_or(DescriptorError::MissingSubject)?);
                    }
                }
                b"segment" if in_file => {
                    total_bytes = total_bytes.saturating_add(segment_bytes(&reader, e)?);
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"file" => {
                    // A file with no segments still declares the name.
                    file_count += 1;
                    if file_count == 1 {
                        first_subject = Some(read_attribute(&reader, e, b"subject")?
                            .ok_or(DescriptorError::MissingSubject)?);
                    }
                }
                b"segment" if in_file => {
                    total_bytes = total_bytes.saturating_add(segment_bytes(&reader, e)?);
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"file" {
                    in_file = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DescriptorError::Xml(format!(
                    "at byte {}: {}",
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if in_file {
        return Err(DescriptorError::Xml("unterminated <file> element".to_string()));
    }

    let declared_name = first_subject.ok_or(DescriptorError::NoFiles)?;
    let declared_name = declared_name.trim().to_string();
    if declared_name.is_empty() {
        return Err(DescriptorError::MissingSubject);
    }

    Ok(JobDescriptor {
        declared_name,
        declared_size_bytes: total_bytes,
        source_kind,
        descriptor_file,
    })
}

fn read_attribute(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    name: &[u8],
) -> Result<Option<String>, DescriptorError> {
    let attr = element
        .try_get_attribute(name)
        .map_err(|e| DescriptorError::Xml(e.to_string()))?;

    match attr {
        Some(attr) => {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|e| DescriptorError::Xml(e.to_string()))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

fn segment_bytes(reader: &Reader<&[u8]>, element: &BytesStart<'_>) -> Result<u64, DescriptorError> {
    let raw = read_attribute(reader, element, b"bytes")?.ok_or(DescriptorError::MissingSegmentBytes)?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| DescriptorError::InvalidSegmentBytes(raw))
}
