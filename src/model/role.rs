use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize, ToSchema, EnumString,
    Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Employee,
}

impl Role {
    /// Admins and managers act on other people's records.
    pub fn is_manager_or_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_names() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(Role::Employee.as_ref(), "employee");
        assert_eq!("owner".parse::<Role>(), Err(strum::ParseError::VariantNotFound));
    }

    #[test]
    fn only_admin_and_manager_manage() {
        assert!(Role::Admin.is_manager_or_admin());
        assert!(Role::Manager.is_manager_or_admin());
        assert!(!Role::Employee.is_manager_or_admin());
    }
}
