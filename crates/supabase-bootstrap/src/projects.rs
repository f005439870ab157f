//! Project resolution.

use crate::error::{SetupError, SetupResult};
use crate::platform_client::{ApiListing, PlatformClient, Project};
use setup_storage::BearerToken;

/// What the resolver decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectResolution {
    /// Exactly one project; use it without asking.
    Selected(Project),
    /// Several projects, in upstream order. The caller must pick one.
    Choose(Vec<Project>),
}

/// Lists the projects a token can see and picks one when unambiguous.
#[derive(Clone)]
pub struct ProjectResolver {
    client: PlatformClient,
}

impl ProjectResolver {
    pub fn new(client: PlatformClient) -> Self {
        Self { client }
    }

    /// Fetch the projects for `token` and resolve them.
    pub async fn resolve(&self, token: &BearerToken) -> SetupResult<ProjectResolution> {
        match self.client.list_projects(token).await? {
            ApiListing::Items(projects) => resolve_projects(projects),
            ApiListing::Rejected {
                status,
                body_summary,
            } => Err(SetupError::UnexpectedResponse(format!(
                "project listing failed with status {status} ({body_summary})"
            ))),
        }
    }
}

/// Resolve an already-fetched project list.
pub fn resolve_projects(mut projects: Vec<Project>) -> SetupResult<ProjectResolution> {
    projects.retain(|project| !project.id.trim().is_empty());
    match projects.len() {
        0 => Err(SetupError::EmptyProjectList),
        1 => {
            let project = projects.remove(0);
            tracing::info!(project_ref = %project.id, "single project selected");
            Ok(ProjectResolution::Selected(project))
        }
        count => {
            tracing::info!(count, "multiple projects, selection required");
            Ok(ProjectResolution::Choose(projects))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_single_project_is_selected() {
        let resolution = resolve_projects(vec![project("proj-1", "Only")]).unwrap();
        assert_eq!(resolution, ProjectResolution::Selected(project("proj-1", "Only")));
    }

    #[test]
    fn test_empty_list_is_an_error() {
        assert!(matches!(
            resolve_projects(Vec::new()),
            Err(SetupError::EmptyProjectList)
        ));
    }

    #[test]
    fn test_many_projects_keep_upstream_order() {
        let projects = vec![
            project("zeta", "Zeta"),
            project("alpha", "Alpha"),
            project("mid", "Mid"),
        ];
        let resolution = resolve_projects(projects.clone()).unwrap();
        assert_eq!(resolution, ProjectResolution::Choose(projects));
    }

    #[test]
    fn test_entries_without_id_are_ignored() {
        let resolution =
            resolve_projects(vec![project("", "Broken"), project("proj-1", "Real")]).unwrap();
        assert_eq!(resolution, ProjectResolution::Selected(project("proj-1", "Real")));
    }

    #[tokio::test]
    async fn resolve_reports_rejected_listing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/projects"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let client =
            PlatformClient::new(Url::parse(&mock_server.uri()).unwrap(), Duration::from_secs(5))
                .unwrap();
        let result = ProjectResolver::new(client)
            .resolve(&BearerToken::new("sbp_token"))
            .await;

        assert!(matches!(result, Err(SetupError::UnexpectedResponse(_))));
    }
}
