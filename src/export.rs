//! Export orchestrator: renders the three policies of a set and bundles them
//! into one zip archive.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{ExportFailure, PolicyError, Result};
use crate::flow::{LayoutMode, LayoutOptions};
use crate::fonts::FontManager;
use crate::generate::check_organization_name;
use crate::markdown::Block;
use crate::pipeline::{layout_document, PipelineConfig};
use crate::policy::{archive_name, Framework, PolicyKind, PolicySet};
use crate::render::render_pdf;

/// Date format of the `Generated:` line, e.g. `3/7/2025`.
pub const GENERATED_DATE_FORMAT: &str = "%-m/%-d/%Y";

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub mode: LayoutMode,
    pub layout: LayoutOptions,
    /// Date printed in each title block.
    pub generated_on: NaiveDate,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            mode: LayoutMode::Rich,
            layout: LayoutOptions::default(),
            generated_on: chrono::Local::now().date_naive(),
        }
    }
}

/// Export request as received over the wire.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportRequest {
    pub policies: Option<PolicySet>,
    pub organization_name: Option<String>,
    pub framework: Option<String>,
    pub plain_text: bool,
}

impl ExportRequest {
    /// Check the request and return its validated parts.
    pub fn validate(self) -> Result<(PolicySet, String, Framework, LayoutMode)> {
        let org = self
            .organization_name
            .filter(|s| !s.trim().is_empty());
        let framework = self.framework.filter(|s| !s.trim().is_empty());
        let (Some(policies), Some(org), Some(framework)) = (self.policies, org, framework) else {
            return Err(PolicyError::Validation("Missing required fields".into()));
        };
        check_organization_name(&org)?;
        let framework = framework
            .parse::<Framework>()
            .map_err(|_| PolicyError::Validation("Unknown framework".into()))?;
        let mode = if self.plain_text {
            LayoutMode::PlainText
        } else {
            LayoutMode::Rich
        };
        Ok((policies, org, framework, mode))
    }
}

/// A finished archive, ready to be written or sent.
#[derive(Debug, Clone)]
pub struct PolicyArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PolicyArchive {
    /// Write the archive into `dir` under its own file name. Only the final
    /// component of `file_name` is used.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let name = Path::new(&self.file_name).file_name().ok_or_else(|| {
            let err = std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("archive name '{}' is not a file name", self.file_name),
            );
            PolicyError::Export(ExportFailure::Io(err)).logged()
        })?;
        let path = dir.join(name);
        std::fs::write(&path, &self.bytes)
            .map_err(|e| PolicyError::Export(ExportFailure::Io(e)).logged())?;
        Ok(path)
    }
}

/// Blocks printed above every policy body.
pub fn title_block(
    kind: PolicyKind,
    organization: &str,
    framework: Framework,
    generated_on: NaiveDate,
) -> Vec<Block> {
    vec![
        Block::Heading {
            level: 1,
            text: kind.title(),
        },
        Block::Heading {
            level: 2,
            text: organization.to_string(),
        },
        Block::Paragraph(format!("Framework: {}", framework.label())),
        Block::Paragraph(format!(
            "Generated: {}",
            generated_on.format(GENERATED_DATE_FORMAT)
        )),
    ]
}

/// Lay out and render one policy, title block first.
pub fn render_policy_pdf(
    kind: PolicyKind,
    markdown: &str,
    organization: &str,
    framework: Framework,
    options: &ExportOptions,
) -> Vec<u8> {
    let config = PipelineConfig {
        title: kind.title(),
        layout: options.layout,
        mode: options.mode,
    };
    let fonts = FontManager::default();
    let preamble = title_block(kind, organization, framework, options.generated_on);
    let layout = layout_document(&preamble, markdown, &config, &fonts);
    log::debug!(
        "{} laid out on {} page(s)",
        kind.title(),
        layout.pages.len()
    );
    render_pdf(&layout, &fonts)
}

/// Render all three policies in parallel and zip them up.
///
/// Nothing is returned unless all three documents rendered and the archive
/// was finalised.
pub fn export_policies(
    policies: &PolicySet,
    organization: &str,
    framework: Framework,
    options: &ExportOptions,
) -> Result<PolicyArchive> {
    log::info!(
        "exporting {} policies for '{}' ({:?} mode)",
        framework,
        organization,
        options.mode
    );

    let documents: Vec<(String, Vec<u8>)> = PolicyKind::ALL
        .par_iter()
        .map(|&kind| {
            let bytes = render_policy_pdf(
                kind,
                policies.get(kind),
                organization,
                framework,
                options,
            );
            (kind.file_name(organization), bytes)
        })
        .collect();

    let bytes = build_archive(&documents).map_err(|e| PolicyError::Export(e).logged())?;
    let file_name = archive_name(organization, framework);
    log::info!("built {} ({} bytes)", file_name, bytes.len());

    Ok(PolicyArchive { file_name, bytes })
}

fn build_archive(documents: &[(String, Vec<u8>)]) -> std::result::Result<Vec<u8>, ExportFailure> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, bytes) in documents {
        if bytes.is_empty() {
            return Err(ExportFailure::EmptyDocument(name.clone()));
        }
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_config::DrawOp;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).unwrap()
    }

    #[test]
    fn title_block_lines() {
        let blocks = title_block(PolicyKind::AccessControl, "Acme", Framework::Hipaa, date());
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    text: "Access Control Policy".into()
                },
                Block::Heading {
                    level: 2,
                    text: "Acme".into()
                },
                Block::Paragraph("Framework: HIPAA".into()),
                Block::Paragraph("Generated: 3/7/2025".into()),
            ]
        );
    }

    #[test]
    fn title_block_precedes_body() {
        let config = PipelineConfig::default();
        let fonts = FontManager::default();
        let preamble = title_block(PolicyKind::IncidentResponse, "Acme", Framework::PciDss, date());
        let layout = layout_document(&preamble, "Body text", &config, &fonts);
        let first = layout.pages[0].ops.first();
        assert!(matches!(first, Some(DrawOp::Text(run)) if run.text == "Incident Response Policy"));
        let last = layout.text_runs().last().map(|(_, r)| r.text.clone());
        assert_eq!(last.as_deref(), Some("Body text"));
    }

    #[test]
    fn export_request_validation() {
        let ok = ExportRequest {
            policies: Some(PolicySet::default()),
            organization_name: Some("Acme".into()),
            framework: Some("CMMC Level 1".into()),
            plain_text: true,
        };
        let (_, org, framework, mode) = ok.clone().validate().unwrap();
        assert_eq!(org, "Acme");
        assert_eq!(framework, Framework::CmmcLevel1);
        assert_eq!(mode, LayoutMode::PlainText);

        let missing = ExportRequest {
            policies: None,
            ..ok.clone()
        };
        assert_eq!(
            missing.validate().unwrap_err().to_string(),
            "Missing required fields"
        );

        let traversal = ExportRequest {
            organization_name: Some("../../evil".into()),
            ..ok.clone()
        };
        assert_eq!(
            traversal.validate().unwrap_err().to_string(),
            "Invalid organization name"
        );

        let long = ExportRequest {
            organization_name: Some("x".repeat(21)),
            ..ok
        };
        assert_eq!(
            long.validate().unwrap_err().to_string(),
            "Organization name too long"
        );
    }

    #[test]
    fn write_to_dir_stays_inside_dir() {
        let dir = std::env::temp_dir().join(format!("policy-forge-dir-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let archive = PolicyArchive {
            file_name: "../outside.zip".into(),
            bytes: b"PK".to_vec(),
        };
        let path = archive.write_to_dir(&dir).unwrap();
        assert_eq!(path, dir.join("outside.zip"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_document_aborts_archive() {
        let docs = vec![
            ("a.pdf".to_string(), b"%PDF-1.7".to_vec()),
            ("b.pdf".to_string(), Vec::new()),
        ];
        let err = build_archive(&docs).unwrap_err();
        assert!(matches!(err, ExportFailure::EmptyDocument(name) if name == "b.pdf"));
    }
}
