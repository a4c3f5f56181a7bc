use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::address::Address;

/// A registered member. Orders are not embedded; they are reached through
/// order search filtered on the member's name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub address: Address,
}

impl Member {
    pub fn new(name: String, address: Address) -> anyhow::Result<Self> {
        if name.trim().is_empty() {
            anyhow::bail!("member name empty");
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            address,
        })
    }

    pub fn rename(&mut self, name: String) -> anyhow::Result<()> {
        if name.trim().is_empty() {
            anyhow::bail!("member name empty");
        }
        self.name = name;
        Ok(())
    }
}
