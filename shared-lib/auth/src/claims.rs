//! JWT claims and permission definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Permissions granted to API callers by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read drinks with full recipes
    GetDrinksDetail,
    /// Create drinks
    PostDrinks,
    /// Modify drinks
    PatchDrinks,
    /// Remove drinks
    DeleteDrinks,
}

impl Permission {
    pub const ALL: [Permission; 4] = [
        Permission::GetDrinksDetail,
        Permission::PostDrinks,
        Permission::PatchDrinks,
        Permission::DeleteDrinks,
    ];

    /// Scope string as it appears in the `permissions` claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::GetDrinksDetail => "get:drinks-detail",
            Permission::PostDrinks => "post:drinks",
            Permission::PatchDrinks => "patch:drinks",
            Permission::DeleteDrinks => "delete:drinks",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission: {s}"))
    }
}

/// Audience claim, which can be a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Check if the audience contains a specific value.
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Audience::Single(s) => s == value,
            Audience::Multiple(v) => v.iter().any(|s| s == value),
        }
    }
}

/// Verified token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: Audience,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Subject (user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Authorized party (client ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    /// Space-delimited OAuth scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Granted permissions; `None` when the claim is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Claims not covered above
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Create claims for a subject, expiring `expires_in_secs` from now.
    pub fn new(
        subject: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        expires_in_secs: i64,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            iss: issuer.into(),
            aud: Audience::Single(audience.into()),
            exp: now + expires_in_secs,
            sub: Some(subject.into()),
            iat: Some(now),
            azp: None,
            scope: None,
            permissions: Some(Vec::new()),
            extra: HashMap::new(),
        }
    }

    /// Replace the granted permissions.
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    /// Drop the permissions claim entirely.
    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    /// Check whether `scope` is among the granted permissions.
    pub fn has_permission(&self, scope: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == scope))
    }
}
