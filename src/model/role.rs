#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    /// Roles allowed to approve proposals and edit attendance directly.
    pub fn is_reviewer(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}
