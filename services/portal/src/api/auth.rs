//! services/portal/src/api/auth.rs

use super::endpoint::{with_json, MutationDef, QueryDef};
use crate::cache::{Tag, TagRef};
use course_portal_core::domain::{
    AuthResponse, LoginCredentials, ProfileUpdate, RegisterCredentials, User,
};
use course_portal_core::ports::{ApiRequest, HttpMethod, PortError, PortResult};

pub fn login(credentials: &LoginCredentials) -> PortResult<MutationDef<AuthResponse>> {
    let request = with_json(ApiRequest::new(HttpMethod::Post, "/auth/login"), credentials)?;
    Ok(MutationDef::new(request, Vec::new()))
}

/// Fails locally with `PortError::Invalid` for roles that cannot self-register.
pub fn register(credentials: &RegisterCredentials) -> PortResult<MutationDef<AuthResponse>> {
    credentials.validate().map_err(PortError::Invalid)?;
    let request = with_json(
        ApiRequest::new(HttpMethod::Post, "/auth/register"),
        credentials,
    )?;
    Ok(MutationDef::new(request, Vec::new()))
}

pub fn logout() -> MutationDef<()> {
    MutationDef::new(
        ApiRequest::new(HttpMethod::Post, "/auth/logout"),
        vec![TagRef::all(Tag::User)],
    )
}

pub fn me() -> QueryDef<User> {
    QueryDef::new(ApiRequest::get("/auth/me"), vec![TagRef::all(Tag::User)])
}

pub fn update_profile(update: &ProfileUpdate) -> PortResult<MutationDef<User>> {
    let request = with_json(ApiRequest::new(HttpMethod::Put, "/auth/me"), update)?;
    Ok(MutationDef::new(request, vec![TagRef::all(Tag::User)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_portal_core::domain::Role;

    #[test]
    fn admin_registration_is_refused_before_sending() {
        let credentials = RegisterCredentials {
            name: "Root".to_string(),
            email: "root@example.com".to_string(),
            password: "hunter22".to_string(),
            role: Role::Admin,
        };
        assert!(matches!(register(&credentials), Err(PortError::Invalid(_))));
    }
}
