//! Request payload validation
//!
//! Every incoming body is deserialized with optional fields and then checked
//! here, so a missing field is reported per field instead of as a decode
//! failure.

use lingo_core::{
    NewTag, NewTranslation, ProfileUpdate, TranslationUpdate, UserLogin, UserRegistration,
    LOCALE_LEN, MAX_KEY_LEN, MAX_TAG_DESCRIPTION_LEN, MAX_TAG_NAME_LEN,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAX_NAME_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;

/// Field name -> messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
impl ValidationErrors {
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Require a non-blank string, recording `message` otherwise
fn required(errors: &mut ValidationErrors, field: &str, value: Option<String>, message: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            errors.add(field, message);
            String::new()
        }
    }
}

fn trim_tag_names(tags: Vec<String>) -> Vec<String> {
    tags.into_iter().map(|name| name.trim().to_string()).collect()
}

fn check_tag_names(errors: &mut ValidationErrors, tags: &[String]) {
    for (i, name) in tags.iter().enumerate() {
        let field = format!("tags.{}", i);
        if name.is_empty() {
            errors.add(field, "Tag names must not be empty");
        } else if char_len(name) > MAX_TAG_NAME_LEN {
            errors.add(
                field,
                format!("Tag names may not be greater than {} characters", MAX_TAG_NAME_LEN),
            );
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTranslationRequest {
    pub key: Option<String>,
    pub content: Option<String>,
    pub locale: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl CreateTranslationRequest {
    pub fn validate(self) -> Result<NewTranslation, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let key = required(&mut errors, "key", self.key, "The translation key is required");
        if char_len(&key) > MAX_KEY_LEN {
            errors.add(
                "key",
                format!("The key may not be greater than {} characters", MAX_KEY_LEN),
            );
        }

        let content = required(
            &mut errors,
            "content",
            self.content,
            "The translation content is required",
        );

        let locale = required(&mut errors, "locale", self.locale, "The locale is required");
        if !locale.is_empty() && char_len(&locale) != LOCALE_LEN {
            errors.add("locale", "The locale must be 2 characters (e.g., en, es)");
        }

        let tags = trim_tag_names(self.tags.unwrap_or_default());
        check_tag_names(&mut errors, &tags);

        errors.finish(NewTranslation::new(key, content, locale).with_tags(tags))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTranslationRequest {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdateTranslationRequest {
    pub fn validate(self) -> Result<TranslationUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let content = required(
            &mut errors,
            "content",
            self.content,
            "The translation content is required",
        );

        let tags = self.tags.map(trim_tag_names);
        if let Some(tags) = &tags {
            check_tag_names(&mut errors, tags);
        }

        errors.finish(TranslationUpdate { content, tags })
    }
}

/// Tag ids for the tag-management route. Existence is checked by the caller.
#[derive(Debug, Default, Deserialize)]
pub struct SyncTagsRequest {
    pub tags: Option<Vec<i64>>,
}

impl SyncTagsRequest {
    pub fn validate(self) -> Result<Vec<i64>, ValidationErrors> {
        self.tags
            .ok_or_else(|| ValidationErrors::single("tags", "The tags field is required."))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateTagRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CreateTagRequest {
    pub fn validate(self) -> Result<NewTag, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required(&mut errors, "name", self.name, "The name field is required.");
        if char_len(&name) > MAX_TAG_NAME_LEN {
            errors.add(
                "name",
                format!("The name may not be greater than {} characters.", MAX_TAG_NAME_LEN),
            );
        }

        let description = self.description.filter(|d| !d.is_empty());
        if description
            .as_deref()
            .is_some_and(|d| char_len(d) > MAX_TAG_DESCRIPTION_LEN)
        {
            errors.add(
                "description",
                format!(
                    "The description may not be greater than {} characters.",
                    MAX_TAG_DESCRIPTION_LEN
                ),
            );
        }

        errors.finish(NewTag { name, description })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<UserRegistration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required(&mut errors, "name", self.name, "The name field is required.");
        if char_len(&name) > MAX_NAME_LEN {
            errors.add(
                "name",
                format!("The name may not be greater than {} characters.", MAX_NAME_LEN),
            );
        }

        let email = required(&mut errors, "email", self.email, "The email field is required.");
        if !email.is_empty() && !looks_like_email(&email) {
            errors.add("email", "The email must be a valid email address.");
        }

        let password = required(
            &mut errors,
            "password",
            self.password,
            "The password field is required.",
        );
        if !password.is_empty() && char_len(&password) < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("The password must be at least {} characters.", MIN_PASSWORD_LEN),
            );
        }

        errors.finish(UserRegistration {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn validate(self) -> Result<UserLogin, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = required(&mut errors, "email", self.email, "The email field is required.");
        let password = required(
            &mut errors,
            "password",
            self.password,
            "The password field is required.",
        );
        errors.finish(UserLogin { email, password })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub new_password_confirmation: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<ProfileUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required(&mut errors, "name", self.name, "The name field is required.");
        if char_len(&name) > MAX_NAME_LEN {
            errors.add(
                "name",
                format!("The name may not be greater than {} characters.", MAX_NAME_LEN),
            );
        }

        let email = required(&mut errors, "email", self.email, "The email field is required.");
        if !email.is_empty() && !looks_like_email(&email) {
            errors.add("email", "The email must be a valid email address.");
        }
        if char_len(&email) > MAX_NAME_LEN {
            errors.add(
                "email",
                format!("The email may not be greater than {} characters.", MAX_NAME_LEN),
            );
        }

        let current_password = self.current_password.filter(|p| !p.is_empty());
        let new_password = self.new_password.filter(|p| !p.is_empty());
        if let Some(new_password) = &new_password {
            if current_password.is_none() {
                errors.add(
                    "current_password",
                    "The current password field is required when new password is present.",
                );
            }
            if char_len(new_password) < MIN_PASSWORD_LEN {
                errors.add(
                    "new_password",
                    format!("The new password must be at least {} characters.", MIN_PASSWORD_LEN),
                );
            }
            if self.new_password_confirmation.as_ref() != Some(new_password) {
                errors.add("new_password", "The new password confirmation does not match.");
            }
        }

        errors.finish(ProfileUpdate {
            name,
            email,
            current_password,
            new_password,
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
