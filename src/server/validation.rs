use crate::server::response::ApiError;

const MAX_USERNAME_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_TITLE_LEN: usize = 200;
const MAX_NAME_LEN: usize = 100;

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain alphanumeric characters, hyphens, and underscores",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "Title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Tag and tech-stack names. Topic and language strings from GitHub pass
/// through here too, so the rules stay permissive: non-empty, bounded,
/// no leading/trailing whitespace.
pub fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request("Name cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name != name.trim() {
        return Err(ApiError::bad_request(
            "Name cannot start or end with whitespace",
        ));
    }
    Ok(())
}

pub fn validate_repo_url(repo_url: &str) -> Result<(), ApiError> {
    if !(repo_url.starts_with("https://") || repo_url.starts_with("http://")) {
        return Err(ApiError::bad_request(
            "Repository URL must be an http(s) URL",
        ));
    }
    crate::github::owner_and_name(repo_url)
        .map_err(|_| ApiError::bad_request("Repository URL must end in an owner/name path"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("jane_doe-42").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has spaces").is_err());
        assert!(validate_username(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_password_minimum_length() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_name_rules() {
        assert!(validate_name("django-rest-framework").is_ok());
        assert!(validate_name("C++").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(" padded ").is_err());
    }

    #[test]
    fn test_repo_url_rules() {
        assert!(validate_repo_url("https://github.com/jdoe/portfolio").is_ok());
        assert!(validate_repo_url("git@github.com:jdoe/portfolio.git").is_err());
        assert!(validate_repo_url("https://nopath").is_err());
    }
}
