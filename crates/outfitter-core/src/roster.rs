//! Builds the app roster a run will process.
//!
//! With no `apps` array configured, a run covers the standard pair: the VPN
//! client first, then the app catalog client, each seeded from its per-role
//! config keys.

use crate::config::{AppEntry, RunConfig};
use crate::types::{AppRecord, AppRole, WrapState};

/// Default wrap policies for the app catalog client.
pub const CATALOG_POLICIES: [u32; 4] = [1, 6, 3, 4];

/// Default wrap policies for the VPN client.
pub const VPN_POLICIES: [u32; 4] = [0, 1, 3, 4];

/// Wrap policies applied when a record does not carry its own.
pub fn default_policies(role: AppRole) -> Vec<u32> {
    match role {
        AppRole::Catalog => CATALOG_POLICIES.to_vec(),
        AppRole::Vpn => VPN_POLICIES.to_vec(),
        AppRole::Custom => Vec::new(),
    }
}

/// Build the roster from merged configuration.
pub fn build_roster(config: &RunConfig) -> Vec<AppRecord> {
    if !config.apps.is_empty() {
        return config.apps.iter().map(record_from_entry).collect();
    }
    vec![vpn_record(config), catalog_record(config)]
}

fn record_from_entry(entry: &AppEntry) -> AppRecord {
    AppRecord {
        role: entry.role,
        file_name: entry.file_name.clone(),
        masked_psk: entry.masked_psk.clone(),
        psk: entry.psk.clone(),
        metadata: entry.metadata.clone(),
        policies: entry
            .policies
            .clone()
            .unwrap_or_else(|| default_policies(entry.role)),
        wrapped: WrapState::Unknown,
    }
}

fn vpn_record(config: &RunConfig) -> AppRecord {
    AppRecord {
        role: AppRole::Vpn,
        file_name: config.vpn_apk.clone(),
        masked_psk: None,
        psk: config.vpn_psk.clone(),
        metadata: config.vpn_metadata.clone(),
        policies: config
            .vpn_policies
            .clone()
            .unwrap_or_else(|| VPN_POLICIES.to_vec()),
        wrapped: WrapState::Unknown,
    }
}

fn catalog_record(config: &RunConfig) -> AppRecord {
    AppRecord {
        role: AppRole::Catalog,
        file_name: config.catalog_apk.clone(),
        masked_psk: None,
        psk: config.catalog_psk.clone(),
        metadata: config.catalog_metadata.clone(),
        policies: config
            .catalog_policies
            .clone()
            .unwrap_or_else(|| CATALOG_POLICIES.to_vec()),
        wrapped: WrapState::Unknown,
    }
}
