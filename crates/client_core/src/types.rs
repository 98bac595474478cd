use shared::domain::{StaffRole, UserId};

/// The signed-in staff member, resolved once at startup and injected into
/// the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorIdentity {
    pub user_id: UserId,
    pub display_name: String,
    pub role: StaffRole,
}

impl OperatorIdentity {
    pub fn new(user_id: UserId, display_name: impl Into<String>, role: StaffRole) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            role,
        }
    }
}
