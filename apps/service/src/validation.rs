use anyhow::{Result, anyhow};
use std::net::IpAddr;
use url::Url;

use crate::monitoring::classifier::{TargetKind, classify};

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    pub fn to_result(&self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(anyhow!(self.error.clone().unwrap_or_else(|| "Validation failed".to_string())))
        }
    }
}

/// Validate HTTP/HTTPS URL
fn validate_http_url(target: &str) -> ValidationResult {
    match Url::parse(target) {
        Ok(url) => {
            let scheme = url.scheme();
            if scheme != "http" && scheme != "https" {
                return ValidationResult::err(format!(
                    "Invalid scheme '{scheme}'. Must be http or https"
                ));
            }

            if url.host_str().is_none() {
                return ValidationResult::err("URL must have a valid host");
            }

            ValidationResult::ok()
        }
        Err(e) => {
            // If it fails to parse, check if it's missing a scheme
            if !target.contains("://") {
                ValidationResult::err("URL must include scheme (http:// or https://)")
            } else {
                ValidationResult::err(format!("Invalid URL: {e}"))
            }
        }
    }
}

/// Validate a target address: an IPv4 literal, an IPv6 literal, or an
/// http(s) URL.
///
/// IPv6 literals are stored as given but probed over the URL path, which
/// reports them offline.
pub fn validate_target_address(target: &str) -> ValidationResult {
    if target.trim().is_empty() {
        return ValidationResult::err("Target cannot be empty");
    }

    if target.trim() != target {
        return ValidationResult::err("Target cannot have leading or trailing whitespace");
    }

    if classify(target) == TargetKind::IpLiteral {
        return ValidationResult::ok();
    }

    if let Ok(IpAddr::V6(_)) = target.parse::<IpAddr>() {
        return ValidationResult::ok();
    }

    validate_http_url(target)
}

/// Validate a webhook subscriber URL
pub fn validate_webhook_url(url: &str) -> ValidationResult {
    if url.trim().is_empty() {
        return ValidationResult::err("Webhook URL cannot be empty");
    }

    validate_http_url(url)
}
