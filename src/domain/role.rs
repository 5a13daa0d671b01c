//! User roles

string_enum! {
    /// Role of a user inside their company
    pub enum UserRole {
        Admin => "ADMIN",
        Manager => "MANAGER",
        Employee => "EMPLOYEE",
    }
}

impl UserRole {
    /// Whether this role may approve or reject expenses
    pub fn can_approve(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(UserRole::from_str("manager").unwrap(), UserRole::Manager);
        assert_eq!(UserRole::from_str(" ADMIN ").unwrap(), UserRole::Admin);
        assert!(UserRole::from_str("owner").is_err());
    }

    #[test]
    fn test_role_serde_uses_upper_case() {
        let json = serde_json::to_string(&UserRole::Employee).unwrap();
        assert_eq!(json, "\"EMPLOYEE\"");
        let role: UserRole = serde_json::from_str("\"MANAGER\"").unwrap();
        assert_eq!(role, UserRole::Manager);
    }

    #[test]
    fn test_only_managers_and_admins_approve() {
        assert!(UserRole::Admin.can_approve());
        assert!(UserRole::Manager.can_approve());
        assert!(!UserRole::Employee.can_approve());
    }
}
