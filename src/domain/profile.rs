use crate::domain::progression::Progression;
use crate::error::AppError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Helper,
    Authority,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Helper => "HELPER",
            Role::Authority => "AUTHORITY",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HELPER" => Ok(Role::Helper),
            "AUTHORITY" => Ok(Role::Authority),
            other => Err(AppError::Validation(format!(
                "role must be HELPER or AUTHORITY (got '{}')",
                other
            ))),
        }
    }
}

/// Stored profile. Level and title are not part of it; ask `progression()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub points: i32,
    pub bio: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Profile {
    pub fn progression(&self) -> Progression {
        Progression::of(Some(i64::from(self.points)))
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

/// Who is performing an operation. Built per request from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointReason {
    ReportResolved,
}

impl PointReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PointReason::ReportResolved => "report_resolved",
        }
    }
}

/// One atomic points delta plus what caused it, for the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointAward {
    pub delta: i32,
    pub reason: PointReason,
    pub report_id: i32,
    pub actor_id: i32,
}

/// An authenticated account as the identity provider knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i32,
    pub email: String,
}

/// A signed-in session. Carried inside access and refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i32,
}
