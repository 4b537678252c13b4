use serde::Serialize;

/// JSON envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
    pub limit: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn paged(message: impl Into<String>, data: T, pagination: PageInfo) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(message, data)
        }
    }
}

impl ApiResponse<()> {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            pagination: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_omits_data_and_pagination() {
        let body = serde_json::to_value(ApiResponse::<()>::failure("User not found")).unwrap();
        assert_eq!(body, json!({ "success": false, "message": "User not found" }));
    }

    #[test]
    fn paged_serializes_camel_case_pagination() {
        let info = PageInfo { page: 2, total_pages: 3, total: 25, limit: 10 };
        let body = serde_json::to_value(ApiResponse::paged("ok", vec![1, 2], info)).unwrap();
        assert_eq!(
            body["pagination"],
            json!({ "page": 2, "totalPages": 3, "total": 25, "limit": 10 })
        );
        assert_eq!(body["data"], json!([1, 2]));
    }
}
