#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    InstitutionAdmin = 2,
    Staff = 3,
    System = 4,
    Device = 5,
}

impl Role {
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::InstitutionAdmin),
            3 => Some(Role::Staff),
            4 => Some(Role::System),
            5 => Some(Role::Device),
            _ => None,
        }
    }
}
