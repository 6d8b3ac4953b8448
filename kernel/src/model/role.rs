use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    /// Whether this role may create, update and delete events.
    pub fn can_manage_events(self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn only_admin_and_teacher_manage_events() {
        assert!(Role::Admin.can_manage_events());
        assert!(Role::Teacher.can_manage_events());
        assert!(!Role::Student.can_manage_events());
    }

    #[test]
    fn parses_stored_role_names() {
        assert_eq!(Role::from_str("teacher").unwrap(), Role::Teacher);
        assert_eq!(Role::Student.as_ref(), "student");
        assert!(Role::from_str("janitor").is_err());
    }
}
