use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use reqwest::blocking::{multipart, Client};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Client for a GROBID-compatible metadata extraction service. One request per
/// call, no state beyond the connection pool.
pub struct MetadataClient {
    base_url: String,
    http: Client,
    consolidate_header: bool,
    consolidate_citations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tei_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencesRecord {
    pub count: usize,
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tei_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulltextRecord {
    pub title: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tei_path: Option<String>,
}

impl MetadataClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.metadata.timeout_seconds.max(1)))
            .build()
            .with_context(|| "building http client")?;
        Ok(Self {
            base_url: cfg.metadata.base_url.trim_end_matches('/').to_string(),
            http,
            consolidate_header: cfg.metadata.consolidate_header,
            consolidate_citations: cfg.metadata.consolidate_citations,
        })
    }

    pub fn is_alive(&self) -> bool {
        let url = format!("{}/api/isalive", self.base_url);
        match self.http.get(&url).send() {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("metadata service unreachable: {e}");
                false
            }
        }
    }

    fn process(
        &self,
        endpoint: &str,
        input: &Path,
        consolidate: Option<(&'static str, bool)>,
    ) -> Result<String> {
        if !input.exists() {
            return Err(anyhow!("input not found: {}", input.display()));
        }
        let url = format!("{}/api/{}", self.base_url, endpoint);
        let mut form = multipart::Form::new()
            .file("input", input)
            .with_context(|| format!("reading {}", input.display()))?;
        if let Some((param, c)) = consolidate {
            form = form.text(param, if c { "1" } else { "0" });
        }

        debug!("POST {} input={}", url, input.display());
        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .with_context(|| format!("metadata service unreachable: {url}"))?;

        let status = resp.status();
        let body = resp.text().with_context(|| "reading response body")?;
        if !status.is_success() {
            return Err(anyhow!(
                "metadata service returned {status} for {endpoint}: {}",
                body.trim()
            ));
        }
        Ok(body)
    }

    fn write_tei(&self, tei: &str, output: Option<&Path>) -> Result<Option<String>> {
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    crate::util::ensure_dir(parent)?;
                }
                std::fs::write(path, tei)
                    .with_context(|| format!("writing TEI: {}", path.display()))?;
                Ok(Some(path.display().to_string()))
            }
            None => Ok(None),
        }
    }

    /// Header fields (title, authors, DOI, abstract) from the document.
    pub fn extract_metadata(&self, input: &Path, output: Option<&Path>) -> Result<HeaderRecord> {
        let tei = self.process(
            "processHeaderDocument",
            input,
            Some(("consolidateHeader", self.consolidate_header)),
        )?;
        let tei_path = self.write_tei(&tei, output)?;
        let mut record = parse_header_tei(&tei);
        record.tei_path = tei_path;
        Ok(record)
    }

    /// Bibliography entries from the document's reference section.
    pub fn extract_references(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<ReferencesRecord> {
        let tei = self.process(
            "processReferences",
            input,
            Some(("consolidateCitations", self.consolidate_citations)),
        )?;
        let tei_path = self.write_tei(&tei, output)?;
        let references = parse_references_tei(&tei);
        Ok(ReferencesRecord {
            count: references.len(),
            references,
            tei_path,
        })
    }

    /// Full body text of the document.
    pub fn extract_fulltext(&self, input: &Path, output: Option<&Path>) -> Result<FulltextRecord> {
        let tei = self.process("processFulltextDocument", input, None)?;
        let tei_path = self.write_tei(&tei, output)?;

        let body = first_capture(&tei, r"(?s)<body>(.*?)</body>").unwrap_or_default();
        Ok(FulltextRecord {
            title: first_capture(&tei, r"(?s)<title[^>]*>(.*?)</title>"),
            text: body,
            tei_path,
        })
    }
}

fn first_capture(tei: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(tei)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty())
}

/// Header fields pulled out of a processHeaderDocument TEI response.
pub fn parse_header_tei(tei: &str) -> HeaderRecord {
    HeaderRecord {
        title: first_capture(tei, r"(?s)<title[^>]*>(.*?)</title>"),
        authors: extract_authors(tei),
        doi: first_capture(tei, r#"(?s)<idno type="DOI">(.*?)</idno>"#),
        abstract_text: first_capture(tei, r"(?s)<abstract>(.*?)</abstract>"),
        tei_path: None,
    }
}

/// Flattened bibliography entries from a processReferences TEI response.
pub fn parse_references_tei(tei: &str) -> Vec<String> {
    captures_all(tei, r"(?s)<biblStruct[^>]*>(.*?)</biblStruct>")
        .into_iter()
        .map(|c| clean_text(&c))
        .filter(|s| !s.is_empty())
        .collect()
}

fn captures_all(tei: &str, pattern: &str) -> Vec<String> {
    let Ok(re) = Regex::new(pattern) else {
        return Vec::new();
    };
    re.captures_iter(tei)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn extract_authors(tei: &str) -> Vec<String> {
    captures_all(tei, r"(?s)<persName[^>]*>(.*?)</persName>")
        .into_iter()
        .map(|c| clean_text(&c))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Strip markup and collapse the whitespace TEI pretty-printing leaves behind.
pub fn clean_text(fragment: &str) -> String {
    let stripped = match Regex::new(r"<[^>]+>") {
        Ok(tags) => tags.replace_all(fragment, " ").into_owned(),
        Err(_) => fragment.to_string(),
    };
    let normalized: String = stripped.nfkc().collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}
