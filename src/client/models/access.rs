//! Access control models

use serde::{Deserialize, Serialize};

/// Who an access control entry applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessEntryType {
    Anonymous,
    User,
    Tenant,
    Organization,
}

/// Permission granted by an access control entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessScope {
    Connect,
    Host,
    Manage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlEntry {
    #[serde(rename = "type")]
    pub entry_type: AccessEntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<AccessScope>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    /// Restrict the entry to these ports; all ports when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<u16>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

impl AccessControlEntry {
    fn template(entry_type: AccessEntryType, scopes: Vec<AccessScope>, expiration: &str) -> Self {
        Self {
            entry_type,
            scopes: Some(scopes),
            expiration: Some(expiration.to_string()),
            ports: None,
            user_id: None,
            tenant_id: None,
            organization_id: None,
        }
    }
}

/// Arguments for `create_access`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccessRequest {
    pub tunnel_id: String,
    pub entry: AccessControlEntry,
}

/// Named access template offered when creating an entry
#[derive(Debug, Clone)]
pub struct AccessPreset {
    /// Identifier used on the command line, e.g. `public-demo`
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub template: AccessControlEntry,
}

/// Built-in access templates
pub fn access_presets() -> Vec<AccessPreset> {
    vec![
        AccessPreset {
            key: "public-demo",
            name: "Public Demo",
            description: "Public access for 24 hours",
            template: AccessControlEntry::template(
                AccessEntryType::Anonymous,
                vec![AccessScope::Connect],
                "24h",
            ),
        },
        AccessPreset {
            key: "team-only",
            name: "Team Access",
            description: "Organization members only",
            template: AccessControlEntry::template(
                AccessEntryType::Organization,
                vec![AccessScope::Connect, AccessScope::Host],
                "30d",
            ),
        },
        AccessPreset {
            key: "client-preview",
            name: "Client Preview",
            description: "Token-based access for clients",
            template: AccessControlEntry::template(
                AccessEntryType::Anonymous,
                vec![AccessScope::Connect],
                "7d",
            ),
        },
    ]
}
