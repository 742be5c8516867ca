use serde::{Deserialize, Serialize};

// 统一API响应结构
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorDetail>>,
    pub timestamp: String,
}

#[derive(Serialize, Default)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page,
            per_page,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

impl ResponseMeta {
    pub fn paginated(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            pagination: Some(Pagination::new(page, per_page, total)),
            total_count: Some(total),
            ..Default::default()
        }
    }
}

/// 分页查询参数, clamped by `resolve`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageParams {
    /// Returns `(page, per_page, offset)`.
    pub fn resolve(&self, default_per_page: i64, max_per_page: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, max_per_page);
        (page, per_page, (page - 1) * per_page)
    }
}

#[derive(Serialize)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

// 便捷构造函数
impl<T> ApiResponse<T> {
    pub fn success(data: T, message: &str) -> Self {
        Self {
            success: true,
            code: 200,
            message: message.to_string(),
            data: Some(data),
            meta: None,
            errors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn success_with_meta(data: T, message: &str, meta: ResponseMeta) -> Self {
        Self {
            success: true,
            code: 200,
            message: message.to_string(),
            data: Some(data),
            meta: Some(meta),
            errors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn created(data: T, message: &str) -> Self {
        Self {
            success: true,
            code: 201,
            message: message.to_string(),
            data: Some(data),
            meta: None,
            errors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn accepted(data: T, message: &str) -> Self {
        Self {
            success: true,
            code: 202,
            message: message.to_string(),
            data: Some(data),
            meta: None,
            errors: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(code: u16, message: &str, errors: Vec<ErrorDetail>) -> Self {
        Self {
            success: false,
            code,
            message: message.to_string(),
            data: None,
            meta: None,
            errors: if errors.is_empty() { None } else { Some(errors) },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn unprocessable(message: &str) -> Self {
        Self::single_error(422, "VALIDATION_ERROR", message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::single_error(401, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: &str) -> Self {
        Self::single_error(403, "FORBIDDEN", message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::single_error(404, "NOT_FOUND", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::single_error(400, "BAD_REQUEST", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::single_error(500, "INTERNAL_ERROR", message)
    }

    pub fn conflict(message: &str, field: Option<String>, error_code: &str) -> Self {
        Self {
            success: false,
            code: 409,
            message: message.to_string(),
            data: None,
            meta: None,
            errors: Some(vec![ErrorDetail {
                field,
                code: error_code.to_string(),
                message: message.to_string(),
            }]),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn single_error(code: u16, error_code: &str, message: &str) -> Self {
        Self {
            success: false,
            code,
            message: message.to_string(),
            data: None,
            meta: None,
            errors: Some(vec![ErrorDetail {
                field: None,
                code: error_code.to_string(),
                message: message.to_string(),
            }]),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// PATCH 字段: absent stays `None`, explicit `null` becomes `Some(None)`.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// 业务错误码常量
pub mod error_codes {
    pub const EVENT_SLUG_EXISTS: &str = "EVENT_001";
    pub const REGISTRATION_DUPLICATE: &str = "REGISTRATION_001";
    pub const SUB_EVENT_FULL: &str = "REGISTRATION_002";
    pub const SCHOLARSHIP_EXHAUSTED: &str = "SCHOLARSHIP_001";
    pub const SCHOLARSHIP_CODE_EXISTS: &str = "SCHOLARSHIP_002";
    pub const MEMBERSHIP_ACTIVE_EXISTS: &str = "MEMBERSHIP_001";
    pub const CO_CREATOR_EMAIL_EXISTS: &str = "CO_CREATOR_001";
    pub const CO_CREATOR_ALREADY_ASSIGNED: &str = "CO_CREATOR_002";
    pub const USER_EMAIL_EXISTS: &str = "USER_001";
    pub const BOOTSTRAP_CLOSED: &str = "USER_002";
    pub const SUB_EVENT_IN_USE: &str = "SUB_EVENT_001";
    pub const FORM_TEMPLATE_IN_USE: &str = "FORM_001";
    pub const FORM_ALREADY_ATTACHED: &str = "FORM_002";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(1, 25, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);

        let p = Pagination::new(2, 25, 51);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn test_page_params_clamp() {
        let params = PageParams {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(params.resolve(25, 100), (1, 100, 0));

        let params = PageParams {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(params.resolve(25, 100), (3, 25, 50));
    }

    #[derive(Deserialize, Default)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.notes, None);
        let null: Patch = serde_json::from_str(r#"{"notes":null}"#).unwrap();
        assert_eq!(null.notes, Some(None));
        let set: Patch = serde_json::from_str(r#"{"notes":"hi"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("hi".to_string())));
    }
}
