use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// The logged-in user as returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub department_id: Option<u64>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Token pair and user profile for one login. Tokens never appear in `Debug`
/// output.
#[derive(Debug)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub user: User,
}

/// Wire shape of a successful login or refresh.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl From<TokenGrant> for Session {
    fn from(grant: TokenGrant) -> Self {
        Self {
            access_token: SecretString::from(grant.access_token),
            refresh_token: SecretString::from(grant.refresh_token),
            user: grant.user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_debug_hides_tokens() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"accessToken":"acc-123","refreshToken":"ref-456","user":{"id":1,"name":"Ana","departmentId":2,"permissions":["approve"]}}"#,
        )
        .unwrap();
        let session = Session::from(grant);
        let printed = format!("{:?}", session);
        assert!(!printed.contains("acc-123"));
        assert!(!printed.contains("ref-456"));
        assert_eq!(session.user.permissions, vec!["approve".to_string()]);
        assert_eq!(session.user.department_id, Some(2));
    }
}
