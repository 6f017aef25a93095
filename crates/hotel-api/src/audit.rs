//! Security audit logging for account events
//!
//! All audit events are logged at INFO level with the "audit" target so they
//! can be filtered and routed separately from application logs. Each record
//! carries the key fields as structured values plus the whole event as JSON.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    RegistrationSuccess {
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    LoginSuccess {
        user_id: String,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Same reason for unknown email and wrong password
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    TokenRefresh {
        user_id: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    RefreshRejected {
        /// User id claimed by the caller
        user_id: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    SecurityStampRotated {
        user_id: String,
        email: String,
        reason: String,
    },

    /// Invalid or expired bearer token on a protected route
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },
}

/// Log a security audit event
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::RegistrationSuccess {
            email, ip_address, ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                ip_address = ?ip_address,
                "Registration successful"
            );
        }
        AuditEvent::RegistrationFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "Registration failed"
            );
        }
        AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::TokenRefresh {
            user_id,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                ip_address = ?ip_address,
                "Token refresh"
            );
        }
        AuditEvent::RefreshRejected {
            user_id,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                ip_address = ?ip_address,
                "Token refresh rejected"
            );
        }
        AuditEvent::SecurityStampRotated {
            user_id,
            email,
            reason,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                reason = %reason,
                "Security stamp rotated"
            );
        }
        AuditEvent::InvalidToken {
            ip_address, reason, ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                ip_address = ?ip_address,
                reason = %reason,
                "Invalid token"
            );
        }
    }
}

/// Client IP from X-Forwarded-For or X-Real-IP
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            // First entry is the originating client
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: "b7c1".to_string(),
            email: "guest@example.com".to_string(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("guest@example.com"));
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::SecurityStampRotated {
            user_id: "b7c1".to_string(),
            email: "guest@example.com".to_string(),
            reason: "refresh token mismatch".to_string(),
        });
        audit_log(&AuditEvent::LoginFailure {
            email: "guest@example.com".to_string(),
            reason: "Invalid credentials".to_string(),
            ip_address: None,
            user_agent: Some("Test Agent".to_string()),
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.7".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();

        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}
