use serde::{Deserialize, Serialize};

use crate::handlers::ModuleDescriptor;

/// Subset of `core_webservice_get_site_info` used for capability checks
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteInfo {
    #[serde(default)]
    pub sitename: String,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub downloadfiles: u8,
}

impl SiteInfo {
    pub fn can_download_files(&self) -> bool {
        self.downloadfiles == 1
    }
}

/// One section from `core_course_get_contents`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CourseSection {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
}

/// Warning entry attached to many web-service replies
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WsWarning {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub itemid: Option<i64>,
    #[serde(default)]
    pub warningcode: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_site_info_capabilities() {
        let info: SiteInfo = serde_json::from_value(json!({
            "sitename": "School",
            "downloadfiles": 1,
            "functions": [{"name": "mod_book_get_books_by_courses", "version": "2023100900"}]
        }))
        .unwrap();

        assert!(info.can_download_files());
    }

    #[test]
    fn test_site_info_defaults_to_no_downloads() {
        let info: SiteInfo = serde_json::from_value(json!({"sitename": "School"})).unwrap();
        assert!(!info.can_download_files());
    }
}
