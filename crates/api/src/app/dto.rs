use serde::Serialize;

use adminhub_auth::RoleState;

/// Role as reported to the dashboard (`GET /me/role`).
#[derive(Debug, Serialize)]
pub struct RoleView {
    pub role: Option<String>,
    pub is_loading: bool,
    pub level: Option<u8>,
    pub is_admin: bool,
    pub is_owner: bool,
}

impl From<&RoleState> for RoleView {
    fn from(state: &RoleState) -> Self {
        Self {
            role: state.role.as_ref().map(|r| r.as_str().to_string()),
            is_loading: state.is_loading,
            level: state.level(),
            is_admin: state.is_admin(),
            is_owner: state.is_owner(),
        }
    }
}
