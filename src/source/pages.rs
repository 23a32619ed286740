use std::collections::HashMap;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context;

use crate::foundation::error::{KomaError, KomaResult};
use crate::scene::model::Page;

/// Persistence boundary that yields a project's pages.
pub trait PageSource: Send + Sync {
    /// All pages of `project_id`, ordered by ascending page number.
    ///
    /// Failures surface as [`KomaError::Fetch`].
    fn fetch_all_pages(&self, project_id: &str) -> KomaResult<Vec<Page>>;
}

/// On-disk project document.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// Project identifier.
    pub project_id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Pages in any order.
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// Elements are not validated here; the renderer skips malformed ones individually.
fn sorted(mut pages: Vec<Page>) -> Vec<Page> {
    pages.sort_by_key(|p| p.page_number);
    pages
}

/// Reads `<dir>/<project_id>.json` project files.
#[derive(Clone, Debug)]
pub struct JsonPageSource {
    dir: PathBuf,
}

impl JsonPageSource {
    /// Source over the project files in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load and parse the whole project document.
    pub fn read_project(&self, project_id: &str) -> KomaResult<ProjectFile> {
        self.read_project_inner(project_id)
            .map_err(|e| KomaError::fetch(format!("failed to load project '{project_id}'"), e))
    }

    fn read_project_inner(&self, project_id: &str) -> anyhow::Result<ProjectFile> {
        if project_id.is_empty()
            || project_id.contains(['/', '\\'])
            || project_id == "."
            || project_id == ".."
        {
            anyhow::bail!("invalid project id '{project_id}'");
        }
        let path = self.dir.join(format!("{project_id}.json"));
        let f = std::fs::File::open(&path)
            .with_context(|| format!("open project file '{}'", path.display()))?;
        let project: ProjectFile = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse project file '{}'", path.display()))?;
        if project.project_id != project_id {
            anyhow::bail!(
                "project file '{}' declares id '{}'",
                path.display(),
                project.project_id
            );
        }
        Ok(project)
    }
}

impl PageSource for JsonPageSource {
    fn fetch_all_pages(&self, project_id: &str) -> KomaResult<Vec<Page>> {
        let project = self.read_project(project_id)?;
        tracing::debug!(project_id, pages = project.pages.len(), "loaded project file");
        Ok(sorted(project.pages))
    }
}

/// Page source backed by a map, for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPageSource {
    projects: HashMap<String, Vec<Page>>,
}

impl InMemoryPageSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style project registration.
    pub fn with_project(mut self, project_id: impl Into<String>, pages: Vec<Page>) -> Self {
        self.insert(project_id, pages);
        self
    }

    /// Register or replace a project.
    pub fn insert(&mut self, project_id: impl Into<String>, pages: Vec<Page>) {
        self.projects.insert(project_id.into(), pages);
    }
}

impl PageSource for InMemoryPageSource {
    fn fetch_all_pages(&self, project_id: &str) -> KomaResult<Vec<Page>> {
        let pages = self.projects.get(project_id).cloned().ok_or_else(|| {
            KomaError::fetch(
                format!("unknown project '{project_id}'"),
                anyhow::anyhow!("no such project"),
            )
        })?;
        Ok(sorted(pages))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/pages.rs"]
mod tests;
