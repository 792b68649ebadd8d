//! Field rules for registration and login. All lengths are measured in
//! code points, not bytes.

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const EMAIL_MIN: usize = 5;
pub const EMAIL_MAX: usize = 40;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 20;

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Username cannot be empty or only whitespace.".into());
    }
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(format!(
            "Username must be between {} and {} characters.",
            USERNAME_MIN, USERNAME_MAX
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("Username can only contain letters, digits, underscore, and hyphen.".into());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email cannot be empty or only whitespace.".into());
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Email cannot contain whitespace.".into());
    }
    let len = email.chars().count();
    if !(EMAIL_MIN..=EMAIL_MAX).contains(&len) {
        return Err(format!(
            "Email must be between {} and {} characters.",
            EMAIL_MIN, EMAIL_MAX
        ));
    }
    if !email.contains('@') || !email.contains('.') {
        return Err("Enter a valid email address.".into());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("Password cannot be empty or only whitespace.".into());
    }
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        return Err(format!(
            "Password must be between {} and {} characters.",
            PASSWORD_MIN, PASSWORD_MAX
        ));
    }
    Ok(())
}
