use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{Identity, UserEntity},
    dto::validation::{BIRTH_DATE_DISPLAY, validate_not_blank},
};

/// Payload used to register a club member or update their details.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Numeric handle assigned by the messaging transport.
    pub identity: Identity,
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub last_name: String,
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 32), custom(function = "validate_not_blank"))]
    pub group: String,
    /// Birth date typed as `DD.MM.YYYY`.
    #[schema(example = "12.04.2008")]
    pub birth_date: String,
}

/// Registered member as echoed back to the transport.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub identity: Identity,
    pub last_name: String,
    pub first_name: String,
    pub group: String,
    /// `DD.MM.YYYY`
    pub birth_date: String,
}

impl From<&UserEntity> for UserSummary {
    fn from(user: &UserEntity) -> Self {
        Self {
            identity: user.identity,
            last_name: user.last_name.clone(),
            first_name: user.first_name.clone(),
            group: user.group.clone(),
            birth_date: user
                .birth_date
                .format(BIRTH_DATE_DISPLAY)
                .unwrap_or_else(|_| user.birth_date.to_string()),
        }
    }
}

/// Result of a registration, with the text the transport relays to the member.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub user: UserSummary,
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn request(last_name: &str) -> RegisterRequest {
        RegisterRequest {
            identity: 42,
            last_name: last_name.into(),
            first_name: "Ivan".into(),
            group: "7B".into(),
            birth_date: "12.04.2008".into(),
        }
    }

    #[test]
    fn blank_names_fail_validation() {
        assert!(request("Ivanov").validate().is_ok());
        assert!(request("").validate().is_err());
        assert!(request("   ").validate().is_err());
    }

    #[test]
    fn summary_formats_birth_date_with_padding() {
        let user = UserEntity {
            identity: 42,
            last_name: "Ivanov".into(),
            first_name: "Ivan".into(),
            group: "7B".into(),
            birth_date: date!(2009 - 02 - 01),
        };
        assert_eq!(UserSummary::from(&user).birth_date, "01.02.2009");
    }
}
