use async_graphql::ErrorExtensions;

use thoughts_db::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failures raised by the resolvers. Lookups that find nothing are not
/// errors; they come back as `None` or an empty list.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("You need to be logged in!")]
    Unauthenticated,

    /// Shared by unknown email and wrong password, so callers cannot tell
    /// which one it was.
    #[error("Incorrect credentials")]
    InvalidCredentials,

    #[error("Malformed id '{0}'")]
    InvalidId(String),

    #[error("Token lifetime does not fit the calendar")]
    TokenLifetime,

    #[error("Failed to sign token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::InvalidId(_) => "BAD_USER_INPUT",
            ApiError::Store(StoreError::Constraint(_)) => "CONSTRAINT_VIOLATION",
            ApiError::Token(_) | ApiError::TokenLifetime | ApiError::Store(StoreError::Backend(_)) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_render_identically() {
        assert_eq!(ApiError::InvalidCredentials.to_string(), "Incorrect credentials");
        assert_eq!(ApiError::InvalidCredentials.code(), "INVALID_CREDENTIALS");
    }

    #[test]
    fn constraint_message_passes_through() {
        let err = ApiError::from(StoreError::Constraint(
            "UNIQUE constraint failed: users.email".into(),
        ));

        assert_eq!(err.to_string(), "UNIQUE constraint failed: users.email");
        assert_eq!(err.code(), "CONSTRAINT_VIOLATION");
    }

    #[test]
    fn extensions_carry_the_code() {
        let gql = ApiError::Unauthenticated.extend();
        let code = gql.extensions.as_ref().and_then(|ext| ext.get("code"));

        assert_eq!(gql.message, "You need to be logged in!");
        assert_eq!(code, Some(&async_graphql::Value::from("UNAUTHENTICATED")));
    }
}
