//! Reference-data entity definitions

use crate::{EntityIdentity, RefDataEntity, VersionMeta};
use serde::{Deserialize, Serialize};

// ============================================================================
// USER
// ============================================================================

/// A trader or operator known to the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub firstname: String,
    pub surname: String,
    pub desk: String,
    pub age: u32,
    #[serde(skip)]
    pub meta: VersionMeta,
}

impl User {
    /// Build a live user that has not been stored yet.
    pub fn new(
        firstname: impl Into<String>,
        surname: impl Into<String>,
        desk: impl Into<String>,
        age: u32,
    ) -> Self {
        Self {
            firstname: firstname.into(),
            surname: surname.into(),
            desk: desk.into(),
            age,
            meta: VersionMeta::new_active(),
        }
    }
}

impl RefDataEntity for User {
    const TABLE: &'static str = "Users";

    fn identity(&self) -> EntityIdentity {
        format!("{}{}", self.firstname, self.surname)
    }

    fn meta(&self) -> &VersionMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut VersionMeta {
        &mut self.meta
    }
}

// ============================================================================
// DESK
// ============================================================================

/// A trading desk users are assigned to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Desk {
    pub code: String,
    pub name: String,
    pub region: String,
    #[serde(skip)]
    pub meta: VersionMeta,
}

impl Desk {
    /// Build a live desk that has not been stored yet.
    pub fn new(code: impl Into<String>, name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            region: region.into(),
            meta: VersionMeta::new_active(),
        }
    }
}

impl RefDataEntity for Desk {
    const TABLE: &'static str = "Desks";

    fn identity(&self) -> EntityIdentity {
        self.code.clone()
    }

    fn meta(&self) -> &VersionMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut VersionMeta {
        &mut self.meta
    }
}
