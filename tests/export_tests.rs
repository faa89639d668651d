//! Integration tests for policy set export.

use std::io::{Cursor, Read};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use policy_forge::export::{export_policies, ExportOptions};
use policy_forge::flow::{LayoutMode, LayoutOptions};
use policy_forge::policy::{Framework, PolicyKind, PolicySet};
use policy_forge::prompts::sample_policy;

fn options(mode: LayoutMode) -> ExportOptions {
    ExportOptions {
        mode,
        layout: LayoutOptions::default(),
        generated_on: NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date"),
    }
}

fn sample_set(org: &str, framework: Framework) -> PolicySet {
    PolicySet {
        access_control: sample_policy(PolicyKind::AccessControl, org, framework),
        acceptable_usage: sample_policy(PolicyKind::AcceptableUsage, org, framework),
        incident_response: sample_policy(PolicyKind::IncidentResponse, org, framework),
    }
}

fn entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("readable zip");
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).expect("entry");
            let mut data = Vec::new();
            file.read_to_end(&mut data).expect("entry bytes");
            (file.name().to_string(), data)
        })
        .collect()
}

#[test]
fn hipaa_archive_contains_three_named_pdfs() {
    let set = sample_set("Acme", Framework::Hipaa);
    let archive = export_policies(&set, "Acme", Framework::Hipaa, &options(LayoutMode::Rich))
        .expect("export succeeds");

    assert_eq!(archive.file_name, "Acme_Security_Policies_HIPAA.zip");

    let files = entries(&archive.bytes);
    let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Acme_Access_Control_Policy.pdf",
            "Acme_Acceptable_Usage_Policy.pdf",
            "Acme_Incident_Response_Policy.pdf",
        ]
    );
    for (name, data) in &files {
        assert!(data.starts_with(b"%PDF-"), "{name} is not a PDF");
    }
}

#[test]
fn framework_whitespace_becomes_underscores() {
    let set = sample_set("Acme", Framework::CmmcLevel1);
    let archive = export_policies(
        &set,
        "Acme",
        Framework::CmmcLevel1,
        &options(LayoutMode::Rich),
    )
    .expect("export succeeds");
    assert_eq!(archive.file_name, "Acme_Security_Policies_CMMC_Level_1.zip");
}

#[test]
fn plain_mode_export_still_produces_three_pdfs() {
    let set = sample_set("Globex", Framework::PciDss);
    let archive = export_policies(
        &set,
        "Globex",
        Framework::PciDss,
        &options(LayoutMode::PlainText),
    )
    .expect("export succeeds");
    assert_eq!(archive.file_name, "Globex_Security_Policies_PCI-DSS.zip");
    let files = entries(&archive.bytes);
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|(_, data)| data.starts_with(b"%PDF-")));
}

#[test]
fn empty_policies_still_render_title_blocks() {
    let archive = export_policies(
        &PolicySet::default(),
        "Acme",
        Framework::Nist800171,
        &options(LayoutMode::Rich),
    )
    .expect("export succeeds");
    assert_eq!(entries(&archive.bytes).len(), 3);
}

#[test]
fn archive_is_written_under_its_own_name() {
    let dir = std::env::temp_dir().join(format!("policy-forge-export-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let archive = export_policies(
        &sample_set("Acme", Framework::Hipaa),
        "Acme",
        Framework::Hipaa,
        &options(LayoutMode::Rich),
    )
    .expect("export succeeds");
    let path = archive.write_to_dir(&dir).expect("written");
    assert_eq!(path, dir.join("Acme_Security_Policies_HIPAA.zip"));
    assert_eq!(std::fs::read(&path).expect("readable"), archive.bytes);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn path_like_organization_cannot_escape_archive_or_directory() {
    let archive = export_policies(
        &PolicySet::default(),
        "../../evil",
        Framework::Hipaa,
        &options(LayoutMode::Rich),
    )
    .expect("export succeeds");
    assert_eq!(archive.file_name, "____evil_Security_Policies_HIPAA.zip");
    for (name, _) in entries(&archive.bytes) {
        assert!(!name.contains('/') && !name.contains(".."), "{name}");
    }

    let dir = std::env::temp_dir().join(format!("policy-forge-slip-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = archive.write_to_dir(&dir).expect("written");
    assert_eq!(path.parent(), Some(dir.as_path()));
    let _ = std::fs::remove_dir_all(&dir);
}
