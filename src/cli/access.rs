//! Access control command implementations

use dialoguer::Confirm;
use tabled::Tabled;

use tunnelsync::client::models::{
    AccessControlEntry, AccessEntryType, AccessPreset, AccessScope, CreateAccessRequest,
    access_presets,
};
use tunnelsync::{Error, Result};

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::{self, json, table};

/// Access template for table display
#[derive(Tabled)]
struct PresetDisplay {
    #[tabled(rename = "PRESET")]
    key: &'static str,
    #[tabled(rename = "NAME")]
    name: &'static str,
    #[tabled(rename = "EXPIRES")]
    expiration: String,
    #[tabled(rename = "DESCRIPTION")]
    description: &'static str,
}

impl From<&AccessPreset> for PresetDisplay {
    fn from(preset: &AccessPreset) -> Self {
        Self {
            key: preset.key,
            name: preset.name,
            expiration: table::or_dash(preset.template.expiration.clone()),
            description: preset.description,
        }
    }
}

/// Options of `access create`
#[derive(Debug, Default)]
pub struct AccessOptions {
    pub preset: Option<String>,
    pub anonymous: bool,
    pub org: Option<String>,
    pub ports: Vec<u16>,
    pub expiration: Option<String>,
}

impl AccessOptions {
    /// Build the entry from a preset or from the individual flags; flags
    /// given alongside a preset override its ports and expiration.
    fn into_entry(self) -> Result<AccessControlEntry> {
        let mut entry = match self.preset.as_deref() {
            Some(key) => access_presets()
                .into_iter()
                .find(|p| p.key == key)
                .map(|p| p.template)
                .ok_or_else(|| Error::Other(format!("Unknown access preset '{}'", key)))?,
            None => {
                let entry_type = if self.anonymous {
                    AccessEntryType::Anonymous
                } else if self.org.is_some() {
                    AccessEntryType::Organization
                } else {
                    return Err(Error::Other(
                        "Pass --preset, --anonymous or --org <name>".to_string(),
                    ));
                };
                AccessControlEntry {
                    entry_type,
                    scopes: Some(vec![AccessScope::Connect]),
                    expiration: None,
                    ports: None,
                    user_id: None,
                    tenant_id: None,
                    organization_id: self.org,
                }
            }
        };

        if !self.ports.is_empty() {
            entry.ports = Some(self.ports);
        }
        if self.expiration.is_some() {
            entry.expiration = self.expiration;
        }
        Ok(entry)
    }
}

/// Run the access list command
pub async fn list(opts: &GlobalOptions, tunnel_id: &str) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let listing = ctx.service.list_access(tunnel_id).await?;

    match ctx.format {
        OutputFormat::Table => println!("{}", listing.trim_end()),
        OutputFormat::Json => {
            let data = serde_json::json!({ "tunnelId": tunnel_id, "access": listing });
            println!("{}", json::format_json(&data)?);
        }
    }
    Ok(())
}

/// Run the access create command
pub async fn create(opts: &GlobalOptions, tunnel_id: String, options: AccessOptions) -> Result<()> {
    let entry = options.into_entry()?;
    let ctx = CommandContext::new(opts)?;

    let out = ctx
        .service
        .create_access(&CreateAccessRequest { tunnel_id, entry })
        .await?;
    output::print_message(ctx.format, &out)
}

/// Run the access reset command
pub async fn reset(opts: &GlobalOptions, tunnel_id: &str, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Reset access control of '{}'?", tunnel_id))
            .default(false)
            .interact()?;
        if !confirmed {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    let ctx = CommandContext::new(opts)?;
    let out = ctx.service.reset_access(tunnel_id).await?;
    output::print_message(ctx.format, &out)
}

/// Run the access presets command
pub fn presets(opts: &GlobalOptions) -> Result<()> {
    let presets = access_presets();

    match opts.format {
        OutputFormat::Table => {
            let rows: Vec<PresetDisplay> = presets.iter().map(PresetDisplay::from).collect();
            println!("{}", table::format_table(&rows));
        }
        OutputFormat::Json => {
            let data: Vec<_> = presets
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "key": p.key,
                        "name": p.name,
                        "description": p.description,
                        "entry": p.template,
                    })
                })
                .collect();
            println!("{}", json::format_json(&data)?);
        }
    }
    Ok(())
}
