//! Key layout for the cache partitions
//!
//! - `responses`: resp:{cache_key} -> CachedEntry (JSON)
//! - `files`: file:{component}/{course_id}/{module_id}/{url} -> FileEntry (JSON)
//! - `metadata`: meta:{key} -> value (string)
use crate::handlers::{CourseId, ModuleId};

/// Encode a response key: resp:{cache_key}
pub fn encode_response_key(cache_key: &str) -> Vec<u8> {
    format!("resp:{}", cache_key).into_bytes()
}

/// Encode a file key: file:{component}/{course_id}/{module_id}/{url}
pub fn encode_file_key(
    component: &str,
    course_id: CourseId,
    module_id: ModuleId,
    url: &str,
) -> Vec<u8> {
    let mut key = encode_file_prefix(component, course_id, module_id);
    key.extend_from_slice(url.as_bytes());
    key
}

/// Prefix covering every file of one module in one course. The trailing
/// separator keeps module 4 from matching module 42.
pub fn encode_file_prefix(component: &str, course_id: CourseId, module_id: ModuleId) -> Vec<u8> {
    format!("file:{}/{}/{}/", component, course_id, module_id).into_bytes()
}

/// Encode a metadata key: meta:{key}
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}
