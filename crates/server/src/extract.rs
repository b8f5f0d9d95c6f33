use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Form, Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use validator::Validate;

use crate::error::AppError;

/// A url-encoded form body that passed its `Validate` rules
pub struct ValidatedForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        value.validate()?;

        Ok(Self(value))
    }
}

/// A JSON body that passed its `Validate` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        value.validate()?;

        Ok(Self(value))
    }
}

/// `deserialize_with` helper so length rules see the trimmed value
pub fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|value| value.trim().to_string())
}

/// Checkbox semantics: present and not explicitly off
pub fn checked<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.is_some_and(|v| !matches!(v.trim(), "" | "0" | "false" | "off")))
}

/// Trims a submitted string and maps blank input to `None`
pub fn optional_text(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `#rgb` or `#rrggbb`
pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#0D6EFD"));
        assert!(!is_hex_color("0d6efd"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#ggg"));
        assert!(!is_hex_color("red"));
    }

    #[derive(Debug, Deserialize)]
    struct Signup {
        #[serde(default, deserialize_with = "trimmed")]
        name: String,
        #[serde(default, deserialize_with = "checked")]
        remember: bool,
    }

    #[test]
    fn form_fields_are_trimmed_and_checkboxes_parsed() {
        let form: Signup = serde_json::from_str(r#"{"name": "  ada ", "remember": "y"}"#).unwrap();
        assert_eq!(form.name, "ada");
        assert!(form.remember);

        let form: Signup = serde_json::from_str(r#"{"name": "   ", "remember": "false"}"#).unwrap();
        assert_eq!(form.name, "");
        assert!(!form.remember);

        let form: Signup = serde_json::from_str("{}").unwrap();
        assert!(!form.remember);
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(optional_text("   "), None);
        assert_eq!(optional_text(" notes "), Some("notes".to_string()));
    }
}
