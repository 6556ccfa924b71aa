//! Builders for descriptor content and fake metadata services.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use udindexer::{Enrichment, EnrichmentError, MediaType, MetadataProvider};

/// Builder for NZB descriptor documents.
pub struct NzbBuilder {
    files: Vec<(String, Vec<u64>)>,
}

impl NzbBuilder {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Adds a `<file>` whose segments carry the given byte counts.
    pub fn file(mut self, subject: &str, segments: &[u64]) -> Self {
        self.files.push((subject.to_string(), segments.to_vec()));
        self
    }

    /// Adds a file announced as one segment of `size` bytes.
    pub fn single(self, subject: &str, size: u64) -> Self {
        self.file(subject, &[size])
    }

    pub fn build(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
             <!DOCTYPE nzb PUBLIC \"-//newzBin//DTD NZB 1.1//EN\" \"http://www.newzbin.com/DTD/nzb/nzb-1.1.dtd\">\n\
             <nzb xmlns=\"http://www.newzbin.com/DTD/2003/nzb\">\n",
        );
        for (subject, segments) in &self.files {
            xml.push_str(&format!(
                "  <file poster=\"poster@example.com\" date=\"1700000000\" subject=\"{}\">\n",
                subject
            ));
            xml.push_str("    <groups><group>alt.binaries.test</group></groups>\n    <segments>\n");
            for (i, bytes) in segments.iter().enumerate() {
                xml.push_str(&format!(
                    "      <segment bytes=\"{}\" number=\"{}\">part{}@example.com</segment>\n",
                    bytes,
                    i + 1,
                    i + 1
                ));
            }
            xml.push_str("    </segments>\n  </file>\n");
        }
        xml.push_str("</nzb>\n");
        xml
    }
}

/// Metadata service answering every lookup with the same record.
pub struct FixedProvider {
    pub calls: AtomicUsize,
    pub tmdb_id: i64,
    pub imdb_id: &'static str,
    pub canonical_title: &'static str,
}

impl FixedProvider {
    pub fn new(tmdb_id: i64, imdb_id: &'static str, canonical_title: &'static str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            tmdb_id,
            imdb_id,
            canonical_title,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for FixedProvider {
    async fn lookup(
        &self,
        _media_type: MediaType,
        _title: &str,
    ) -> Result<Option<Enrichment>, EnrichmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Enrichment {
            tmdb_id: self.tmdb_id,
            external_id: Some(self.imdb_id.to_string()),
            canonical_title: Some(self.canonical_title.to_string()),
            original_title: Some(self.canonical_title.to_string()),
            release_date: Some("2008-01-20".to_string()),
            release_year: Some(2008),
        }))
    }
}

/// Metadata service that is always down.
pub struct UnreachableProvider;

#[async_trait]
impl MetadataProvider for UnreachableProvider {
    async fn lookup(
        &self,
        _media_type: MediaType,
        _title: &str,
    ) -> Result<Option<Enrichment>, EnrichmentError> {
        Err(EnrichmentError::Status {
            endpoint: "/search/tv".to_string(),
            status: 503,
        })
    }
}
