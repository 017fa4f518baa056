use serde::{Deserialize, Serialize};

use crate::users::dto::PublicProfile;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ContactUsRequest {
    pub email: String,
    pub name: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: PublicProfile,
    pub token: String,
}

/// Sent after a password change, which also rotates the session.
#[derive(Debug, Serialize)]
pub struct MessageWithToken {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `200`: "Your <action> request was successful. <detail>!"
pub fn ok_message(action: &str, detail: &str) -> String {
    format!("Your {action} request was successful. {detail}!")
}

/// `201`: "The data you entered is correct.The <thing> has been <done> successfully!"
pub fn created_message(thing: &str, done: &str) -> String {
    format!("The data you entered is correct.The {thing} has been {done} successfully!")
}
