//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Request to register a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
}

/// Request to login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(alias = "current_password")]
    pub current_password: String,
    /// The new password.
    pub password: String,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

/// Response containing authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// URL of the attached image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub author: AuthorResponse,
    pub tags: Vec<TagResponse>,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub pages: u64,
}

/// Query string of `GET /api/post`. Missing values fall back to the listing
/// defaults; `tagId=0` means no tag filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListPostsQuery {
    pub search: Option<String>,
    #[serde(alias = "tag_id")]
    pub tag_id: Option<i64>,
    pub page: Option<u64>,
    #[serde(alias = "page_size")]
    pub page_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_request_accepts_both_spellings() {
        let camel: UpdatePasswordRequest =
            serde_json::from_str(r#"{"currentPassword":"old","password":"new"}"#).unwrap();
        let snake: UpdatePasswordRequest =
            serde_json::from_str(r#"{"current_password":"old","password":"new"}"#).unwrap();

        assert_eq!(camel.current_password, "old");
        assert_eq!(snake.current_password, "old");
        assert_eq!(snake.password, "new");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let request: SignUpRequest = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(request.password, "");
    }

    #[test]
    fn test_post_response_uses_camel_case() {
        let post = PostResponse {
            id: 1,
            title: "t".to_string(),
            content: "c".to_string(),
            image: None,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
            author: AuthorResponse {
                id: 2,
                username: "alice".to_string(),
            },
            tags: vec![],
        };

        let json = serde_json::to_value(&post).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("image").is_none());
    }
}
