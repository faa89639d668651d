//! Policy domain types: the three policy kinds, the supported frameworks and
//! the policy set exchanged between generation and export.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Security framework a policy set is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "PCI-DSS")]
    PciDss,
    #[serde(rename = "HIPAA")]
    Hipaa,
    #[serde(rename = "NIST 800-171")]
    Nist800171,
    #[serde(rename = "CMMC Level 1")]
    CmmcLevel1,
}

impl Framework {
    pub const ALL: [Framework; 4] = [
        Framework::PciDss,
        Framework::Hipaa,
        Framework::Nist800171,
        Framework::CmmcLevel1,
    ];

    /// Display label, as used in prompts, titles and file names.
    pub fn label(self) -> &'static str {
        match self {
            Framework::PciDss => "PCI-DSS",
            Framework::Hipaa => "HIPAA",
            Framework::Nist800171 => "NIST 800-171",
            Framework::CmmcLevel1 => "CMMC Level 1",
        }
    }

    /// Label with whitespace runs replaced by `_`.
    pub fn file_label(self) -> String {
        self.label().split_whitespace().collect::<Vec<_>>().join("_")
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Framework::ALL
            .into_iter()
            .find(|f| f.label() == s.trim())
            .ok_or_else(|| format!("unknown framework: {s}"))
    }
}

/// The three documents of a policy set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    AccessControl,
    AcceptableUsage,
    IncidentResponse,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 3] = [
        PolicyKind::AccessControl,
        PolicyKind::AcceptableUsage,
        PolicyKind::IncidentResponse,
    ];

    /// e.g. "Access Control"
    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::AccessControl => "Access Control",
            PolicyKind::AcceptableUsage => "Acceptable Usage",
            PolicyKind::IncidentResponse => "Incident Response",
        }
    }

    /// e.g. "Access Control Policy"
    pub fn title(self) -> String {
        format!("{} Policy", self.name())
    }

    /// `{org}_Access_Control_Policy.pdf`
    pub fn file_name(self, organization: &str) -> String {
        format!(
            "{}_{}_Policy.pdf",
            file_safe(organization),
            self.name().replace(' ', "_")
        )
    }
}

/// Generated markdown for each policy kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySet {
    pub access_control: String,
    pub acceptable_usage: String,
    pub incident_response: String,
}

impl PolicySet {
    pub fn get(&self, kind: PolicyKind) -> &str {
        match kind {
            PolicyKind::AccessControl => &self.access_control,
            PolicyKind::AcceptableUsage => &self.acceptable_usage,
            PolicyKind::IncidentResponse => &self.incident_response,
        }
    }
}

/// Archive name: `{org}_Security_Policies_{framework}.zip`.
pub fn archive_name(organization: &str, framework: Framework) -> String {
    format!(
        "{}_Security_Policies_{}.zip",
        file_safe(organization),
        framework.file_label()
    )
}

/// Whether an organization name can go into file names and headers as is.
pub fn is_file_safe(organization: &str) -> bool {
    !organization.contains("..") && !organization.chars().any(is_unsafe_char)
}

/// Organization name with path separators, quotes, control characters and
/// `..` replaced by `_`.
pub fn file_safe(organization: &str) -> String {
    let cleaned: String = organization
        .trim()
        .chars()
        .map(|c| if is_unsafe_char(c) { '_' } else { c })
        .collect();
    cleaned.replace("..", "_")
}

fn is_unsafe_char(c: char) -> bool {
    c.is_control() || matches!(c, '/' | '\\' | '"' | ':' | '*' | '?' | '<' | '>' | '|')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_labels_round_trip() {
        for f in Framework::ALL {
            assert_eq!(f.label().parse::<Framework>(), Ok(f));
            let json = serde_json::to_string(&f).unwrap();
            assert_eq!(json, format!("\"{}\"", f.label()));
        }
        assert!("SOC 2".parse::<Framework>().is_err());
    }

    #[test]
    fn archive_names_replace_spaces() {
        assert_eq!(
            archive_name("Acme", Framework::Hipaa),
            "Acme_Security_Policies_HIPAA.zip"
        );
        assert_eq!(
            archive_name("Acme", Framework::CmmcLevel1),
            "Acme_Security_Policies_CMMC_Level_1.zip"
        );
        assert_eq!(
            archive_name("Acme", Framework::Nist800171),
            "Acme_Security_Policies_NIST_800-171.zip"
        );
    }

    #[test]
    fn traversal_and_quotes_are_neutralised_in_names() {
        assert_eq!(file_safe("../../evil"), "____evil");
        assert_eq!(
            archive_name("../../evil", Framework::Hipaa),
            "____evil_Security_Policies_HIPAA.zip"
        );
        assert_eq!(
            PolicyKind::AccessControl.file_name("a\\b\"c\td"),
            "a_b_c_d_Access_Control_Policy.pdf"
        );
        for name in PolicyKind::ALL.map(|k| k.file_name("../x")) {
            assert!(!name.contains('/') && !name.contains(".."), "{name}");
        }
    }

    #[test]
    fn file_safe_check() {
        assert!(is_file_safe("Acme Corp."));
        assert!(is_file_safe("O'Brien & Sons"));
        assert!(!is_file_safe("../evil"));
        assert!(!is_file_safe("a/b"));
        assert!(!is_file_safe("a\\b"));
        assert!(!is_file_safe("say \"hi\""));
        assert!(!is_file_safe("tab\there"));
    }

    #[test]
    fn policy_file_names() {
        let names: Vec<_> = PolicyKind::ALL.iter().map(|k| k.file_name("Acme")).collect();
        assert_eq!(
            names,
            vec![
                "Acme_Access_Control_Policy.pdf",
                "Acme_Acceptable_Usage_Policy.pdf",
                "Acme_Incident_Response_Policy.pdf",
            ]
        );
    }

    #[test]
    fn policy_set_uses_camel_case() {
        let set = PolicySet {
            access_control: "a".into(),
            acceptable_usage: "b".into(),
            incident_response: "c".into(),
        };
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["accessControl"], "a");
        assert_eq!(json["acceptableUsage"], "b");
        assert_eq!(json["incidentResponse"], "c");
    }
}
