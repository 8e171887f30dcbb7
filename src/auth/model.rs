use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};

/// Roles allowed to mutate the media library.
pub const AUTHORIZED_ROLES: &[&str] = &["admin", "super_admin"];

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // caller id
    pub username: String,
    pub role: String,
    pub exp: usize,         // expiration time
    pub iat: usize,         // issued at
    pub token_type: String, // only "access" is accepted
}

/// Identity and role of whoever issued a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub subject: String,
    pub role: String,
}

impl Caller {
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }

    pub fn is_authorized(&self) -> bool {
        AUTHORIZED_ROLES.contains(&self.role.as_str())
    }

    pub fn ensure_authorized(&self) -> MediaResult<()> {
        if self.is_authorized() {
            Ok(())
        } else {
            Err(MediaError::Unauthorized(format!(
                "Role '{}' may not modify the media library",
                self.role
            )))
        }
    }
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            role: claims.role,
        }
    }
}
