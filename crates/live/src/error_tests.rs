// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    transport = { ErrorKind::Transport, "TRANSPORT", true },
    protocol = { ErrorKind::Protocol, "PROTOCOL", true },
    credential = { ErrorKind::Credential, "CREDENTIAL", false },
    handler = { ErrorKind::Handler, "HANDLER", true },
)]
fn kind_strings_and_recoverability(kind: ErrorKind, name: &str, recoverable: bool) {
    assert_eq!(kind.as_str(), name);
    assert_eq!(kind.to_string(), name);
    assert_eq!(kind.is_recoverable(), recoverable);
}

#[test]
fn serializes_snake_case() -> anyhow::Result<()> {
    assert_eq!(serde_json::to_string(&ErrorKind::Credential)?, "\"credential\"");
    Ok(())
}
