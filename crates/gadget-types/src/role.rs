use std::{fmt, str::FromStr};

/// The semantic purpose of a gadget structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Mbr,
    SystemSeed,
    SystemSeedNull,
    SystemBoot,
    SystemSave,
    SystemData,
}

impl Role {
    /// The only roles the installer will create or delete, absent
    /// `CreateAllMissing` (I1).
    pub fn creatable(self) -> bool {
        matches!(self, Role::SystemBoot | Role::SystemSave | Role::SystemData)
    }

    /// Only `system-data` and `system-save` may be encrypted (I5).
    pub fn encryptable(self) -> bool {
        matches!(self, Role::SystemData | Role::SystemSave)
    }

    pub fn is_seed(self) -> bool {
        matches!(self, Role::SystemSeed | Role::SystemSeedNull)
    }
}

impl FromStr for Role {
    type Err = &'static str;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let role = match string {
            "mbr" => Role::Mbr,
            "system-seed" => Role::SystemSeed,
            "system-seed-null" => Role::SystemSeedNull,
            "system-boot" => Role::SystemBoot,
            "system-save" => Role::SystemSave,
            "system-data" => Role::SystemData,
            _ => return Err("invalid role"),
        };
        Ok(role)
    }
}

impl From<Role> for &'static str {
    fn from(role: Role) -> Self {
        match role {
            Role::Mbr => "mbr",
            Role::SystemSeed => "system-seed",
            Role::SystemSeedNull => "system-seed-null",
            Role::SystemBoot => "system-boot",
            Role::SystemSave => "system-save",
            Role::SystemData => "system-data",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let str: &'static str = (*self).into();
        f.write_str(str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creatable_roles_gate() {
        assert!(Role::SystemBoot.creatable());
        assert!(Role::SystemSave.creatable());
        assert!(Role::SystemData.creatable());
        assert!(!Role::Mbr.creatable());
        assert!(!Role::SystemSeed.creatable());
        assert!(!Role::SystemSeedNull.creatable());
    }

    #[test]
    fn encryptable_roles_gate() {
        assert!(Role::SystemData.encryptable());
        assert!(Role::SystemSave.encryptable());
        assert!(!Role::SystemBoot.encryptable());
        assert!(!Role::Mbr.encryptable());
    }

    #[test]
    fn round_trips_through_str() {
        for role in &[
            Role::Mbr,
            Role::SystemSeed,
            Role::SystemSeedNull,
            Role::SystemBoot,
            Role::SystemSave,
            Role::SystemData,
        ] {
            let s: &'static str = (*role).into();
            assert_eq!(s.parse::<Role>().unwrap(), *role);
        }
    }
}
