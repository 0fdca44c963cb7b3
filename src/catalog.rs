//! Project catalog: model and remote client.

use crate::auth::TokenProvider;
use crate::error::{KataError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A practice project as listed by the catalog.
///
/// Each catalog entry is one project in one or more variants (languages).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    /// Comma-delimited variant set, e.g. `"rust, go"`.
    #[serde(default)]
    pub languages: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub estimated_duration: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub access_tier: String,
}

impl Project {
    pub fn variants(&self) -> Vec<String> {
        self.languages
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Normalized name used for directory and repository names.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

pub fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Distinct project names in first-appearance order.
pub fn distinct_names(projects: &[Project]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for project in projects {
        if !names.contains(&project.name) {
            names.push(project.name.clone());
        }
    }
    names
}

/// Every `(project, variant)` pair offered under `name`.
pub fn variants_named<'a>(projects: &'a [Project], name: &str) -> Vec<(&'a Project, String)> {
    projects
        .iter()
        .filter(|p| p.name == name)
        .flat_map(|p| p.variants().into_iter().map(move |v| (p, v)))
        .collect()
}

pub fn find_project(projects: &[Project], id: u64) -> Option<&Project> {
    projects.iter().find(|p| p.id == id)
}

pub trait CatalogClient: Send + Sync {
    fn list_projects(&self) -> Result<Vec<Project>>;

    /// Tell the catalog a project has been downloaded.
    fn initialize_project(&self, project_id: u64) -> Result<()>;

    fn bulk_update_test_results(
        &self,
        failed: &[String],
        passed: &[String],
        project_id: u64,
    ) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct ResultsPayload<'a> {
    failed: &'a [String],
    passed: &'a [String],
}

pub struct HttpCatalogClient {
    client: Client,
    api_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpCatalogClient {
    pub fn new(api_url: &str, timeout: Duration, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.tokens.get_token()?;
        let response = request.bearer_auth(token).send()?;
        check_status(response)
    }
}

fn check_status(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(KataError::Unauthorized),
        status if !status.is_success() => Err(KataError::Catalog(format!(
            "{} returned {}",
            response.url().path(),
            status
        ))),
        _ => Ok(response),
    }
}

impl CatalogClient for HttpCatalogClient {
    fn list_projects(&self) -> Result<Vec<Project>> {
        let response = self.send(self.client.get(format!("{}/projects", self.api_url)))?;
        let projects: Vec<Project> = response.json()?;
        tracing::debug!(count = projects.len(), "fetched catalog");
        Ok(projects)
    }

    fn initialize_project(&self, project_id: u64) -> Result<()> {
        self.send(
            self.client
                .post(format!("{}/projects/{}/init", self.api_url, project_id)),
        )?;
        Ok(())
    }

    fn bulk_update_test_results(
        &self,
        failed: &[String],
        passed: &[String],
        project_id: u64,
    ) -> Result<()> {
        self.send(
            self.client
                .post(format!("{}/projects/{}/results", self.api_url, project_id))
                .json(&ResultsPayload { failed, passed }),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: u64, name: &str, languages: &str) -> Project {
        Project {
            id,
            name: name.to_string(),
            languages: languages.to_string(),
            difficulty: "easy".to_string(),
            estimated_duration: "2h".to_string(),
            description: String::new(),
            access_tier: "free".to_string(),
        }
    }

    #[test]
    fn test_variants_trims_and_drops_empty_entries() {
        let p = project(1, "Key Value Store", " rust,go , ,python,");
        assert_eq!(p.variants(), vec!["rust", "go", "python"]);
        assert!(project(2, "Empty", "").variants().is_empty());
    }

    #[test]
    fn test_slug_lowercases_and_replaces_spaces() {
        assert_eq!(project(1, "Key Value Store", "rust").slug(), "key_value_store");
        assert_eq!(slugify("  Http Server "), "http_server");
    }

    #[test]
    fn test_distinct_names_keep_first_appearance_order() {
        let projects = vec![
            project(1, "Shell", "rust"),
            project(2, "Git", "go"),
            project(3, "Shell", "python"),
        ];
        assert_eq!(distinct_names(&projects), vec!["Shell", "Git"]);
    }

    #[test]
    fn test_variants_named_spans_entries_with_same_name() {
        let projects = vec![
            project(1, "Shell", "rust, go"),
            project(2, "Git", "go"),
            project(3, "Shell", "python"),
        ];

        let pairs: Vec<(u64, String)> = variants_named(&projects, "Shell")
            .into_iter()
            .map(|(p, v)| (p.id, v))
            .collect();

        assert_eq!(
            pairs,
            vec![
                (1, "rust".to_string()),
                (1, "go".to_string()),
                (3, "python".to_string())
            ]
        );
        assert!(variants_named(&projects, "Unknown").is_empty());
    }

    #[test]
    fn test_project_deserializes_with_missing_optional_fields() {
        let json = r#"[{"id": 7, "name": "Redis", "languages": "rust"}]"#;
        let projects: Vec<Project> = serde_json::from_str(json).unwrap();
        assert_eq!(projects[0].id, 7);
        assert_eq!(projects[0].difficulty, "");
        assert!(find_project(&projects, 7).is_some());
        assert!(find_project(&projects, 8).is_none());
    }
}
