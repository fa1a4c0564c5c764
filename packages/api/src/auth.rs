// ABOUTME: Authentication context for API requests
// ABOUTME: Extractors reading the identity headers injected by the upstream auth layer

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::Serialize;

use labstock_lending::Requester;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

/// Current authenticated user, assembled from the `x-user-*` headers the
/// upstream auth proxy sets on every request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub roll_number: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn as_requester(&self) -> Requester {
        Requester {
            user_id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            roll_number: self.roll_number.clone(),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, "x-user-id")
            .ok_or((StatusCode::UNAUTHORIZED, "Missing x-user-id header"))?
            .to_string();
        let name = header(parts, "x-user-name").unwrap_or("Unknown").to_string();
        let email = header(parts, "x-user-email").unwrap_or("").to_string();
        let role = match header(parts, "x-user-role") {
            Some("admin") => Role::Admin,
            Some("student") | None => Role::Student,
            Some(_) => return Err((StatusCode::UNAUTHORIZED, "Unknown x-user-role")),
        };
        let roll_number = header(parts, "x-user-roll").map(|roll| roll.to_uppercase());

        Ok(Self {
            id,
            name,
            email,
            role,
            roll_number,
        })
    }
}

/// An authenticated user that must hold the admin role. Rejects students
/// with 403 so admin-only routes need no in-handler role checks.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err((StatusCode::FORBIDDEN, "Admin role required"));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_auth_user_from_headers() {
        let mut parts = parts(&[
            ("x-user-id", "u1"),
            ("x-user-name", "Grace Hopper"),
            ("x-user-email", "grace@lab.edu"),
            ("x-user-role", "admin"),
        ]);
        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.role, Role::Admin);
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn test_missing_identity_rejected() {
        let mut parts = parts(&[("x-user-role", "student")]);
        let err = AuthUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_student_blocked_from_admin_routes() {
        let mut parts = parts(&[("x-user-id", "u2"), ("x-user-role", "student")]);
        let err = AdminUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_role_defaults_to_student() {
        let mut parts = parts(&[("x-user-id", "u3"), ("x-user-roll", "21bce042")]);
        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.roll_number.as_deref(), Some("21BCE042"));
    }
}
