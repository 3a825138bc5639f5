/// Request validation
///
/// Declarative checks (presence, lengths, email shape) come from the
/// `validator` derives on the request types; the rules that need more than a
/// length (charsets, enum membership, dates, password confirmation) live here.
/// All failures are collected per field before anything touches the store.
use crate::{
    account::{
        ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
        SignupRequest, UpdateProfileRequest,
    },
    db::user::{Gender, ProfileChanges, Role},
    error::{AuthError, AuthResult, FieldError},
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use validator::{Validate, ValidationErrors};

/// Signup input after validation
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub phone: String,
    pub role: Role,
}

/// Accumulates field errors in a stable order
#[derive(Debug, Default)]
struct Errors(Vec<FieldError>);

impl Errors {
    fn from_derive(request: &impl Validate) -> Self {
        let mut errors = Errors::default();
        if let Err(derived) = request.validate() {
            errors.absorb(&derived);
        }
        errors
    }

    fn absorb(&mut self, derived: &ValidationErrors) {
        let mut fields: Vec<_> = derived.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        for (field, failures) in fields {
            let field = camel_case(&field.to_string());
            for failure in failures.iter() {
                let message = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field));
                self.push(field.clone(), message);
            }
        }
    }

    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> AuthResult<T> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(AuthError::Validation(self.0))
        }
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Letters, digits and underscores only
pub fn is_valid_username(user_name: &str) -> bool {
    !user_name.is_empty() && user_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Digits, whitespace, `-`, `+`, `(` and `)` only
pub fn is_valid_phone(phone: &str) -> bool {
    !phone.is_empty()
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '+' | '(' | ')'))
}

/// Whether a login identifier should be treated as an email: some
/// non-blank run of the form `local@domain.tld`.
pub fn looks_like_email(identifier: &str) -> bool {
    identifier.split_whitespace().any(|word| match word.split_once('@') {
        Some((local, domain)) if !local.is_empty() => domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len()),
        _ => false,
    })
}

/// Parse a date of birth given as `YYYY-MM-DD` or an RFC 3339 timestamp
pub fn parse_dob(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// A date counts as past when its start (UTC midnight) is before `now`
pub fn is_past_date(date: NaiveDate, now: DateTime<Utc>) -> bool {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)) < now
}

fn check_dob(errors: &mut Errors, value: &str, now: DateTime<Utc>) -> Option<NaiveDate> {
    if value.trim().is_empty() {
        errors.push("dob", "Date of birth is required");
        return None;
    }
    match parse_dob(value) {
        Some(dob) if is_past_date(dob, now) => Some(dob),
        Some(_) => {
            errors.push("dob", "Date of birth must be in the past");
            None
        }
        None => {
            errors.push("dob", "Invalid date of birth");
            None
        }
    }
}

/// Validate a signup request. `now` anchors the date-of-birth check.
pub fn validate_signup(request: &SignupRequest, now: DateTime<Utc>) -> AuthResult<SignupInput> {
    let mut errors = Errors::from_derive(request);

    if !request.user_name.is_empty() && !is_valid_username(&request.user_name) {
        errors.push(
            "userName",
            "Username can only contain letters, numbers, and underscores",
        );
    }

    if !request.phone.is_empty() && !is_valid_phone(&request.phone) {
        errors.push("phone", "Invalid phone number format");
    }

    let gender = request.gender.parse::<Gender>().ok();
    if gender.is_none() {
        errors.push("gender", "Please select a valid gender");
    }

    let role = match request.role.as_deref() {
        None | Some("") => Some(Role::default()),
        Some(value) => value.parse::<Role>().ok(),
    };
    if role.is_none() {
        errors.push("role", "Invalid role");
    }

    let dob = check_dob(&mut errors, &request.dob, now);

    if !errors.has("confirmPassword") && request.password != request.confirm_password {
        errors.push("confirmPassword", "Passwords do not match");
    }

    match (gender, role, dob) {
        (Some(gender), Some(role), Some(dob)) => errors.finish(|| SignupInput {
            email: request.email.trim().to_string(),
            password: request.password.clone(),
            user_name: request.user_name.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            gender,
            dob,
            phone: request.phone.trim().to_string(),
            role,
        }),
        _ => Err(AuthError::Validation(errors.0)),
    }
}

pub fn validate_login(request: &LoginRequest) -> AuthResult<()> {
    Errors::from_derive(request).finish(|| ())
}

pub fn validate_forgot_password(request: &ForgotPasswordRequest) -> AuthResult<()> {
    Errors::from_derive(request).finish(|| ())
}

pub fn validate_reset_password(request: &ResetPasswordRequest) -> AuthResult<()> {
    Errors::from_derive(request).finish(|| ())
}

pub fn validate_change_password(request: &ChangePasswordRequest) -> AuthResult<()> {
    let mut errors = Errors::from_derive(request);

    if !errors.has("confirmPassword") && request.new_password != request.confirm_password {
        errors.push("confirmPassword", "Passwords do not match");
    }

    errors.finish(|| ())
}

/// Validate a partial profile update, applying the signup rules to each
/// present field
pub fn validate_profile_update(
    request: &UpdateProfileRequest,
    now: DateTime<Utc>,
) -> AuthResult<ProfileChanges> {
    let mut errors = Errors::from_derive(request);
    let mut changes = ProfileChanges {
        email: request.email.as_ref().map(|e| e.trim().to_string()),
        user_name: request.user_name.as_ref().map(|u| u.trim().to_string()),
        first_name: request.first_name.as_ref().map(|f| f.trim().to_string()),
        last_name: request.last_name.as_ref().map(|l| l.trim().to_string()),
        ..Default::default()
    };

    if let Some(user_name) = &changes.user_name {
        if !is_valid_username(user_name) {
            errors.push(
                "userName",
                "Username can only contain letters, numbers, and underscores",
            );
        }
    }

    if let Some(phone) = &request.phone {
        if is_valid_phone(phone) {
            changes.phone = Some(phone.trim().to_string());
        } else {
            errors.push("phone", "Invalid phone number format");
        }
    }

    if let Some(gender) = &request.gender {
        match gender.parse::<Gender>() {
            Ok(gender) => changes.gender = Some(gender),
            Err(_) => errors.push("gender", "Please select a valid gender"),
        }
    }

    if let Some(dob) = &request.dob {
        changes.dob = check_dob(&mut errors, dob, now);
    }

    errors.finish(|| changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid_signup() -> SignupRequest {
        SignupRequest {
            email: "alice@example.com".to_string(),
            password: "secret123".to_string(),
            confirm_password: "secret123".to_string(),
            user_name: "alice_01".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            gender: "female".to_string(),
            dob: "1990-05-17".to_string(),
            phone: "+1 (555) 010-0000".to_string(),
            role: None,
        }
    }

    fn fields(err: AuthError) -> Vec<String> {
        match err {
            AuthError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_signup_defaults_role() {
        let input = validate_signup(&valid_signup(), Utc::now()).unwrap();
        assert_eq!(input.role, Role::User);
        assert_eq!(input.gender, Gender::Female);
        assert_eq!(input.dob, NaiveDate::from_ymd_opt(1990, 5, 17).unwrap());
    }

    #[test]
    fn test_signup_rejects_future_dob() {
        let now = Utc::now();
        let mut request = valid_signup();
        request.dob = (now + Duration::days(1)).date_naive().format("%Y-%m-%d").to_string();

        let err = validate_signup(&request, now).unwrap_err();
        match err {
            AuthError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "dob");
                assert_eq!(errors[0].message, "Date of birth must be in the past");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_signup_accepts_rfc3339_dob() {
        let mut request = valid_signup();
        request.dob = "1990-05-17T00:00:00Z".to_string();
        assert!(validate_signup(&request, Utc::now()).is_ok());
    }

    #[test]
    fn test_signup_password_mismatch() {
        let mut request = valid_signup();
        request.confirm_password = "secret124".to_string();
        assert_eq!(
            fields(validate_signup(&request, Utc::now()).unwrap_err()),
            vec!["confirmPassword"]
        );
    }

    #[test]
    fn test_signup_field_rules() {
        let mut request = valid_signup();
        request.email = "not-an-email".to_string();
        request.user_name = "bad name!".to_string();
        request.phone = "555-CALL".to_string();
        request.gender = "robot".to_string();
        request.role = Some("owner".to_string());
        request.password = "123".to_string();
        request.confirm_password = "123".to_string();

        let fields = fields(validate_signup(&request, Utc::now()).unwrap_err());
        for expected in ["email", "userName", "phone", "gender", "role", "password"] {
            assert!(fields.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_signup_short_username() {
        let mut request = valid_signup();
        request.user_name = "ab".to_string();
        assert_eq!(fields(validate_signup(&request, Utc::now()).unwrap_err()), vec!["userName"]);
    }

    #[test]
    fn test_login_requires_fields() {
        let fields = fields(validate_login(&LoginRequest::default()).unwrap_err());
        assert!(fields.contains(&"identifier".to_string()));
        assert!(fields.contains(&"password".to_string()));
    }

    #[test]
    fn test_change_password_mismatch() {
        let request = ChangePasswordRequest {
            current_password: "old-secret".to_string(),
            new_password: "new-secret".to_string(),
            confirm_password: "new-secrex".to_string(),
        };
        assert_eq!(
            fields(validate_change_password(&request).unwrap_err()),
            vec!["confirmPassword"]
        );
    }

    #[test]
    fn test_profile_update_partial() {
        let request = UpdateProfileRequest {
            phone: Some("+44 20 7946 0000".to_string()),
            gender: Some("prefer-not-to-say".to_string()),
            ..Default::default()
        };
        let changes = validate_profile_update(&request, Utc::now()).unwrap();
        assert_eq!(changes.gender, Some(Gender::PreferNotToSay));
        assert!(changes.email.is_none());
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_profile_update_rejects_bad_fields() {
        let request = UpdateProfileRequest {
            email: Some("nope".to_string()),
            dob: Some("2999-01-01".to_string()),
            ..Default::default()
        };
        let fields = fields(validate_profile_update(&request, Utc::now()).unwrap_err());
        assert!(fields.contains(&"email".to_string()));
        assert!(fields.contains(&"dob".to_string()));
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("alice@example.com"));
        assert!(looks_like_email("a@b.c"));
        assert!(!looks_like_email("alice"));
        assert!(!looks_like_email("alice@localhost"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("alice@.com"));
    }

    #[test]
    fn test_charsets() {
        assert!(is_valid_username("store_admin_2"));
        assert!(!is_valid_username("store-admin"));
        assert!(is_valid_phone("+1 (555) 010-0000"));
        assert!(!is_valid_phone("555 0100 ext. 2"));
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("confirm_password"), "confirmPassword");
        assert_eq!(camel_case("email"), "email");
    }
}
