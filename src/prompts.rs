//! Prompt templates and framework requirement tables.
//!
//! Every policy kind shares one section outline; what varies is the policy
//! name and the framework requirements appended at the end.

use crate::policy::{Framework, PolicyKind};

/// Framework controls the generated policy must cover.
pub fn framework_requirements(framework: Framework, kind: PolicyKind) -> &'static [&'static str] {
    use Framework::*;
    use PolicyKind::*;

    match (framework, kind) {
        (PciDss, AccessControl) => &[
            "Requirement 7: Restrict access to cardholder data by business need-to-know",
            "Requirement 8: Identify and authenticate access to system components",
            "Strong access control measures and authentication procedures",
            "Role-based access control (RBAC) implementation",
            "Multi-factor authentication for administrative access",
        ],
        (PciDss, AcceptableUsage) => &[
            "Requirement 12: Maintain a policy that addresses information security",
            "User education and awareness requirements",
            "Prohibition of unauthorized cardholder data access",
            "Clear guidelines for system usage and data handling",
        ],
        (PciDss, IncidentResponse) => &[
            "Requirement 12.10: Implement an incident response plan",
            "Security incident detection and response procedures",
            "Forensic preservation requirements",
            "Communication protocols for security incidents",
        ],
        (Hipaa, AccessControl) => &[
            "§164.308(a)(3) - Assigned security responsibility",
            "§164.308(a)(4) - Information access management",
            "§164.312(a)(1) - Access control standards",
            "§164.312(d) - Person or entity authentication",
            "Minimum necessary standard compliance",
        ],
        (Hipaa, AcceptableUsage) => &[
            "§164.308(a)(5) - Security awareness and training",
            "§164.530(b) - Training requirements",
            "PHI handling and usage guidelines",
            "Workforce access restrictions and monitoring",
        ],
        (Hipaa, IncidentResponse) => &[
            "§164.308(a)(6) - Security incident procedures",
            "§164.404 - Notification to individuals",
            "§164.406 - Notification to the media",
            "§164.408 - Notification to the Secretary",
            "Breach notification requirements within 60 days",
        ],
        (Nist800171, AccessControl) => &[
            "3.1.1 - Limit system access to authorized users",
            "3.1.2 - Limit system access to authorized functions",
            "3.1.3 - Control CUI in accordance with approved authorizations",
            "3.5.1 - Identify system users and processes",
            "3.5.2 - Authenticate system users and processes",
        ],
        (Nist800171, AcceptableUsage) => &[
            "3.2.1 - Ensure that managers, systems administrators receive security training",
            "3.2.2 - Ensure that personnel are trained to carry out assigned responsibilities",
            "CUI handling and marking requirements",
            "System usage monitoring and restrictions",
        ],
        (Nist800171, IncidentResponse) => &[
            "3.6.1 - Establish operational incident-handling capability",
            "3.6.2 - Track, document, and report incidents",
            "3.6.3 - Test incident response capability",
            "CUI incident reporting to government authorities",
        ],
        (CmmcLevel1, AccessControl) => &[
            "AC.L1-3.1.1 - Limit information system access",
            "AC.L1-3.1.2 - Limit information system access to authorized functions",
            "IA.L1-3.5.1 - Identify information system users",
            "IA.L1-3.5.2 - Authenticate information system users",
            "Basic access controls and user identification",
        ],
        (CmmcLevel1, AcceptableUsage) => &[
            "AT.L1-3.2.1 - Ensure security awareness training",
            "AT.L1-3.2.2 - Ensure role-based security training",
            "FCI protection and handling requirements",
            "System usage guidelines and restrictions",
        ],
        (CmmcLevel1, IncidentResponse) => &[
            "IR.L1-3.6.1 - Establish incident handling capability",
            "IR.L1-3.6.2 - Track and document security incidents",
            "Basic incident response procedures",
            "Security incident documentation requirements",
        ],
    }
}

/// Build the generation prompt for one policy.
pub fn build_prompt(
    kind: PolicyKind,
    organization: &str,
    framework: Framework,
    constraints: &str,
) -> String {
    let title = kind.title();
    let fw = framework.label();
    let requirements = framework_requirements(framework, kind).join("\n");

    format!(
        r#"Create a comprehensive {title} for {organization} that must comply with {fw} requirements.

Organization specifics: {constraints}

The policy must follow this EXACT format:

# {title} - {organization}

## Purpose & Scope
[Detailed purpose and scope section]

## Policy Statements - Core requirements according to policy type
[Comprehensive policy statements with numbered requirements]

## Roles & Responsibilities
[Clear role definitions and responsibilities]

## Compliance & Enforcement
[Enforcement mechanisms and compliance requirements]

## Review Cycle
[Policy review and update procedures]

## Appendices
# Appendix A: Glossary
[Key terms and definitions]

## Framework-Specific Requirements
[Specific {fw} control requirements]

## Framework Mappings
| Policy | Control ID | Description
[Table mapping policy requirements to {fw} controls]

Key requirements for {fw}:
{requirements}"#
    )
}

/// Sample policy markdown exercising every block kind the layout engine
/// handles. `export` on the command line falls back to it for any policy
/// file not given.
pub fn sample_policy(kind: PolicyKind, organization: &str, framework: Framework) -> String {
    let fw = framework.label();
    let requirements = framework_requirements(framework, kind);
    let mut md = format!(
        "# {title} - {organization}\n\n\
         ## Purpose & Scope\n\n\
         This policy establishes how **{organization}** meets the *{fw}* \
         requirements for {name} across all systems, staff and contractors.\n\n\
         ## Policy Statements\n\n",
        title = kind.title(),
        name = kind.name().to_lowercase(),
    );
    for (i, req) in requirements.iter().enumerate() {
        md.push_str(&format!("{}. {}\n", i + 1, req));
    }
    md.push_str(
        "\n## Roles & Responsibilities\n\n\
         - Security Officer: owns this policy\n\
         - IT Operations: implements technical controls\n\
         - All staff: follow the procedures described here\n\n\
         ## Review Cycle\n\n\
         This policy is reviewed annually.\n\n\
         ## Framework Mappings\n\n\
         | Policy | Control ID | Description |\n\
         |---|---|---|\n",
    );
    for (i, req) in requirements.iter().enumerate() {
        md.push_str(&format!("| {} | {}-{} | {} |\n", kind.name(), fw, i + 1, req));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_combination_has_requirements() {
        for fw in Framework::ALL {
            for kind in PolicyKind::ALL {
                assert!(framework_requirements(fw, kind).len() >= 4);
            }
        }
    }

    #[test]
    fn prompt_carries_org_framework_and_requirements() {
        let prompt = build_prompt(
            PolicyKind::IncidentResponse,
            "Acme",
            Framework::Hipaa,
            "50 staff, cloud only",
        );
        assert!(prompt.starts_with(
            "Create a comprehensive Incident Response Policy for Acme that must comply with HIPAA requirements."
        ));
        assert!(prompt.contains("Organization specifics: 50 staff, cloud only"));
        assert!(prompt.contains("# Incident Response Policy - Acme"));
        assert!(prompt.contains("Key requirements for HIPAA:\n§164.308(a)(6)"));
        assert!(prompt.ends_with("Breach notification requirements within 60 days"));
    }
}
