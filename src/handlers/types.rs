use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

pub type CourseId = i64;
pub type ModuleId = i64;

/// Reference to a remotely stored file, as returned by the site web services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFile {
    pub fileurl: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timemodified: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

impl ExternalFile {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            fileurl: url.into(),
            filename: None,
            filepath: None,
            filesize: None,
            timemodified: None,
            mimetype: None,
        }
    }

    pub fn named(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Relative name under which the file is stored.
    ///
    /// Uses `filepath` + `filename` when the server supplied them, otherwise
    /// the last path segment of the URL (query string dropped).
    pub fn storage_name(&self) -> String {
        let filename = match self.filename.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => {
                let without_query = self.fileurl.split(['?', '#']).next().unwrap_or("");
                without_query
                    .rsplit('/')
                    .find(|segment| !segment.is_empty())
                    .unwrap_or("file")
                    .to_string()
            }
        };

        let dir = self
            .filepath
            .as_deref()
            .unwrap_or("/")
            .trim_matches('/');

        if dir.is_empty() {
            filename
        } else {
            format!("{}/{}", dir, filename)
        }
    }
}

/// One entry of a module's `contents` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub fileurl: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub timemodified: Option<i64>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

impl ModuleContent {
    /// Downloadable file for this entry. Only `file` entries with a URL qualify.
    pub fn as_file(&self) -> Option<ExternalFile> {
        if self.kind != "file" {
            return None;
        }
        let fileurl = self.fileurl.clone()?;
        Some(ExternalFile {
            fileurl,
            filename: self.filename.clone(),
            filepath: self.filepath.clone(),
            filesize: self.filesize,
            timemodified: self.timemodified,
            mimetype: self.mimetype.clone(),
        })
    }
}

/// A module instance inside a course.
///
/// Accepts both the summary shape and the full `core_course_get_contents`
/// shape; anything not modelled explicitly lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    id: ModuleId,
    modname: String,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    contents: Vec<ModuleContent>,
    #[serde(default)]
    introfiles: Vec<ExternalFile>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ModuleDescriptor {
    pub fn new(id: ModuleId, modname: impl Into<String>) -> Self {
        Self {
            id,
            modname: modname.into(),
            name: String::new(),
            description: None,
            contents: Vec::new(),
            introfiles: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, html: impl Into<String>) -> Self {
        self.description = Some(html.into());
        self
    }

    pub fn with_contents(mut self, contents: Vec<ModuleContent>) -> Self {
        self.contents = contents;
        self
    }

    pub fn with_intro_files(mut self, files: Vec<ExternalFile>) -> Self {
        self.introfiles = files;
        self
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn modname(&self) -> &str {
        &self.modname
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn contents(&self) -> &[ModuleContent] {
        &self.contents
    }

    pub fn intro_files(&self) -> &[ExternalFile] {
        &self.introfiles
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Files referenced by `contents` that can be downloaded
    pub fn content_files(&self) -> Vec<ExternalFile> {
        self.contents.iter().filter_map(ModuleContent::as_file).collect()
    }
}

/// Type-specific metadata fetched from the site for one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub coursemodule: ModuleId,
    pub course: CourseId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introfiles: Option<Vec<ExternalFile>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pattern over update event names that mark a module's cache as outdated
#[derive(Clone)]
pub struct UpdateSignature {
    pattern: Regex,
}

impl UpdateSignature {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn matches(&self, update_name: &str) -> bool {
        self.pattern.is_match(update_name)
    }

    pub fn matches_any<S: AsRef<str>>(&self, update_names: &[S]) -> bool {
        update_names.iter().any(|name| self.matches(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl fmt::Debug for UpdateSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UpdateSignature").field(&self.as_str()).finish()
    }
}

static PLUGINFILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:src|href)\s*=\s*["']([^"']*pluginfile\.php[^"']*)["']"#)
        .expect("pluginfile link pattern is valid")
});

/// Extract downloadable files embedded in an HTML fragment.
///
/// Only links served through `pluginfile.php` are returned; external links are
/// not part of the module.
pub fn files_in_html(html: &str) -> Vec<ExternalFile> {
    PLUGINFILE_LINK
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| ExternalFile::from_url(m.as_str().replace("&amp;", "&")))
        .collect()
}
