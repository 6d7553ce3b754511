use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role name as carried in the token's `roles` claim.
///
/// Roles are opaque strings; only `sysadmin`, `admin` and `staff` carry a
/// rank. Anything else is accepted and ranks as [`RoleRank::None`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const SYSADMIN: Role = Role(Cow::Borrowed("sysadmin"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const STAFF: Role = Role(Cow::Borrowed("staff"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn rank(&self) -> RoleRank {
        RoleRank::of(self.as_str())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Role {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

/// Coarse authorization level. Higher means broader access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RoleRank {
    #[default]
    None = 0,
    Staff = 1,
    Admin = 2,
    SysAdmin = 4,
}

impl RoleRank {
    pub fn of(role: &str) -> Self {
        match role {
            "sysadmin" => Self::SysAdmin,
            "admin" => Self::Admin,
            "staff" => Self::Staff,
            _ => Self::None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

/// Highest rank among `roles` (not a sum); `None` for an empty input.
pub fn highest_role<I, R>(roles: I) -> RoleRank
where
    I: IntoIterator<Item = R>,
    R: AsRef<str>,
{
    roles
        .into_iter()
        .map(|r| RoleRank::of(r.as_ref()))
        .max()
        .unwrap_or_default()
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
