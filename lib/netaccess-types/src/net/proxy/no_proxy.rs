/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

/// Host suffix exclusion list, as found in the `no_proxy` variable.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NoProxyRule {
    tokens: Vec<String>,
}

impl NoProxyRule {
    pub fn parse(value: &str) -> Self {
        if value.is_empty() {
            return NoProxyRule::default();
        }
        let tokens = value
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .collect();
        NoProxyRule { tokens }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.tokens
            .iter()
            .any(|token| token_matches(token, &host))
    }
}

fn token_matches(token: &str, host: &str) -> bool {
    let mut token = token.strip_prefix('*').unwrap_or(token);
    if !host.ends_with('.') {
        token = token.strip_suffix('.').unwrap_or(token);
    }
    let token = token.strip_prefix('.').unwrap_or(token);

    if !host.ends_with(token) {
        return false;
    }
    if host.len() == token.len() {
        return true;
    }
    // the suffix must start on a label boundary
    host.as_bytes()[host.len() - token.len() - 1] == b'.'
}
