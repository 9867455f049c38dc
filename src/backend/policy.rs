use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::export::{AccessControl, Identity, Scope};

/// A user entry of the policy file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUser {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    /// May export any scope
    #[serde(default)]
    pub admin: bool,
}

impl PolicyUser {
    fn allows(&self, scope: &Scope) -> bool {
        if self.admin {
            return true;
        }
        let team_ok = scope
            .team_id
            .as_ref()
            .is_none_or(|team| self.teams.contains(team));
        let org_ok = scope
            .organization_id
            .as_ref()
            .is_none_or(|org| self.organizations.contains(org));
        team_ok && org_ok
    }
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    users: Vec<PolicyUser>,
}

/// Static token-based access policy
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    by_token: HashMap<String, PolicyUser>,
}

impl TokenPolicy {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read policy {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid policy {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let policy: PolicyFile = serde_json::from_str(json)?;
        Self::new(policy.users)
    }

    pub fn new(users: Vec<PolicyUser>) -> Result<Self> {
        let mut by_token = HashMap::with_capacity(users.len());
        for user in users {
            if user.token.is_empty() {
                bail!("user {} has an empty token", user.user_id);
            }
            if by_token.contains_key(&user.token) {
                bail!("token of user {} is not unique", user.user_id);
            }
            by_token.insert(user.token.clone(), user);
        }
        Ok(Self { by_token })
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}

#[async_trait]
impl AccessControl for TokenPolicy {
    async fn authenticate(&self, token: &str) -> Result<Option<Identity>> {
        Ok(self
            .by_token
            .get(token)
            .map(|user| Identity::new(user.user_id.clone())))
    }

    async fn can_access_scope(&self, identity: &Identity, scope: &Scope) -> Result<bool> {
        Ok(self
            .by_token
            .values()
            .any(|user| user.user_id == identity.user_id && user.allows(scope)))
    }
}
