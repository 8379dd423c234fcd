// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Small helpers shared by the library and the CLI.

/// Characters of a secret that may be shown.
const VISIBLE_PREFIX: usize = 4;

/// Mask an RPC secret for logs and `config show`.
///
/// Shows at most the first four characters, and never more than half of the
/// secret, followed by `"..."`. An empty secret is shown as `"(none)"`.
///
/// # Examples
///
/// ```
/// use ariadeck::utils::mask_secret;
///
/// assert_eq!(mask_secret("my-rpc-secret-token"), "my-r...");
/// assert_eq!(mask_secret(""), "(none)");
/// ```
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(none)".to_string();
    }
    let visible = VISIBLE_PREFIX.min(secret.chars().count() / 2);
    let prefix: String = secret.chars().take(visible).collect();
    format!("{}...", prefix)
}
