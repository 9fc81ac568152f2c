use crate::{JinjaTemplate, PromptError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads every `<name>.jinja` or `<name>.j2` file in one directory
#[derive(Debug, Clone)]
pub struct FileLoader {
    dir: PathBuf,
}

impl FileLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Templates ordered by name; subdirectories and other files are skipped
    pub fn load_all(&self) -> Result<Vec<JinjaTemplate>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| read_error(&self.dir, source))?;

        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| read_error(&self.dir, source))?.path();
            if let Some(name) = template_name(&path).filter(|_| path.is_file()) {
                found.push((name, path));
            }
        }
        found.sort();

        let mut templates = Vec::with_capacity(found.len());
        for (name, path) in found {
            let source = std::fs::read_to_string(&path).map_err(|source| read_error(&path, source))?;
            templates.push(JinjaTemplate::new(name, source)?);
        }
        debug!(dir = %self.dir.display(), count = templates.len(), "Read prompt files");
        Ok(templates)
    }
}

fn template_name(path: &Path) -> Option<String> {
    match path.extension()?.to_str()? {
        "jinja" | "j2" => path.file_stem()?.to_str().map(str::to_string),
        _ => None,
    }
}

fn read_error(path: &Path, source: std::io::Error) -> PromptError {
    PromptError::Read {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_reads_only_template_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("orchestrator.j2"), "CRO {{ company_id }}").unwrap();
        fs::write(dir.path().join("data_scientist.jinja"), "DS").unwrap();
        fs::write(dir.path().join("README.md"), "ignored").unwrap();
        fs::create_dir(dir.path().join("drafts.jinja")).unwrap();

        let loader = FileLoader::new(dir.path());
        assert!(loader.exists());

        let templates = loader.load_all().unwrap();
        let names: Vec<_> = templates.iter().map(JinjaTemplate::name).collect();
        assert_eq!(names, vec!["data_scientist", "orchestrator"]);
        assert_eq!(templates[1].render(&json!({ "company_id": 4 })).unwrap(), "CRO 4");
    }

    #[test]
    fn test_bad_override_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("financial_analyst.jinja"), "{% for %}").unwrap();

        let err = FileLoader::new(dir.path()).load_all().unwrap_err();
        assert!(matches!(err, PromptError::Syntax { ref name, .. } if name == "financial_analyst"));
    }

    #[test]
    fn test_missing_directory() {
        let loader = FileLoader::new("/no/such/prompts");
        assert!(!loader.exists());
        assert!(matches!(loader.load_all(), Err(PromptError::Read { .. })));
    }
}
