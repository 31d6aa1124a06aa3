//! Port view assembled from detail text plus per-port lookups

use std::collections::HashMap;

use futures::future::join_all;
use log::warn;
use serde_json::json;

use super::TunnelService;
use crate::cache::Clock;
use crate::client::models::{Port, PortRecord};
use crate::client::{CommandBridge, commands};
use crate::error::Result;
use crate::parser;

/// Collapse records sharing a port number. The last record wins; the
/// position of the first occurrence is kept.
pub fn dedup_last_wins(records: Vec<PortRecord>) -> Vec<PortRecord> {
    let mut positions: HashMap<u16, usize> = HashMap::new();
    let mut unique: Vec<PortRecord> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(&record.port) {
            Some(&idx) => unique[idx] = record,
            None => {
                positions.insert(record.port, unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

impl<B: CommandBridge, C: Clock> TunnelService<B, C> {
    /// Ports of a tunnel with their details.
    ///
    /// Port numbers and forwarding URLs come from the (cached) detail text.
    /// Each port is then looked up concurrently; a failed lookup falls back
    /// to the record parsed from the text instead of failing the whole view.
    pub async fn ports(&self, tunnel_id: &str) -> Result<Vec<Port>> {
        let detail = self.show_tunnel(tunnel_id, false).await?;
        let records = dedup_last_wins(parser::parse_ports(&detail));

        let lookups = records.iter().map(|record| {
            self.dispatcher.invoke::<Port>(
                commands::SHOW_PORT,
                json!({ "tunnelId": tunnel_id, "portNumber": record.port }),
                Some("Failed to show port"),
            )
        });
        let results = join_all(lookups).await;

        Ok(records
            .iter()
            .zip(results)
            .map(|(record, result)| match result {
                Ok(mut port) => {
                    if record.url.is_some() {
                        port.port_forwarding_uris = record.url.clone().map(|url| vec![url]);
                    }
                    port
                }
                Err(e) => {
                    warn!(
                        "Using text-derived details for port {} of {}: {}",
                        record.port, tunnel_id, e
                    );
                    Port::from_record(record)
                }
            })
            .collect())
    }
}
