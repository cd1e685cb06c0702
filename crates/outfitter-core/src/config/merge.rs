//! Configuration layer merging logic.
//!
//! Two layers: the file (outfitter.json) and the command-line overrides.
//! Overrides take precedence field by field; an override field that was
//! never set falls through to the file value. Flags combine with OR, so a
//! flag enabled in either layer stays enabled.

use super::schema::RunConfig;

/// Merge command-line overrides on top of the file layer.
pub fn merge_configs(file: RunConfig, overrides: RunConfig) -> RunConfig {
    RunConfig {
        user: overrides.user.or(file.user),
        password: overrides.password.or(file.password),
        legacy_endpoint: overrides.legacy_endpoint.or(file.legacy_endpoint),
        api_endpoint: overrides.api_endpoint.or(file.api_endpoint),

        sign_local: overrides.sign_local || file.sign_local,
        keystore: overrides.keystore.or(file.keystore),
        credentials_psk: overrides.credentials_psk.or(file.credentials_psk),

        catalog_apk: overrides.catalog_apk.or(file.catalog_apk),
        catalog_psk: overrides.catalog_psk.or(file.catalog_psk),
        catalog_metadata: overrides.catalog_metadata.or(file.catalog_metadata),
        catalog_policies: overrides.catalog_policies.or(file.catalog_policies),

        vpn_apk: overrides.vpn_apk.or(file.vpn_apk),
        vpn_psk: overrides.vpn_psk.or(file.vpn_psk),
        vpn_metadata: overrides.vpn_metadata.or(file.vpn_metadata),
        vpn_policies: overrides.vpn_policies.or(file.vpn_policies),

        apps: if overrides.apps.is_empty() {
            file.apps
        } else {
            overrides.apps
        },

        sdk_path: overrides.sdk_path.or(file.sdk_path),
        zipalign_path: overrides.zipalign_path.or(file.zipalign_path),

        verbose: overrides.verbose || file.verbose,
        action: overrides.action.or(file.action),
    }
}
