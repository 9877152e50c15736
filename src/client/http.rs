use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    client::{
        ApiError, CommitRequest, ModelApi,
        wire::{CommitBody, CommitDto, ElementDto, IdRef, NewProjectDto, ProjectDto},
    },
    domain::{CommitId, CommitInfo, Config, Element, ProjectId, ProjectInfo},
};

/// A [`ModelApi`] backed by a SysML v2 REST server.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    host: String,
    timeout: Duration,
}

impl HttpApi {
    /// Creates a client for the server at `host` (e.g. `http://localhost:9000`).
    ///
    /// Every request is abandoned after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Fetch`] if the underlying HTTP client cannot be
    /// initialised.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let host = host.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Fetch {
                resource: host.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            host,
            timeout,
        })
    }

    /// Creates a client from the connection settings.
    ///
    /// # Errors
    ///
    /// See [`HttpApi::new`].
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.host(), config.timeout())
    }

    /// The server base URL.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.host)
    }

    fn reason(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!("no response within {:?}", self.timeout)
        } else {
            error.to_string()
        }
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let fetch_error = |reason| ApiError::Fetch {
            resource: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_error(self.reason(&e)))?;
        let response = successful(response).map_err(fetch_error)?;
        response.json().map_err(|e| fetch_error(self.reason(&e)))
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, String> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.reason(&e))?;
        successful(response)?.json().map_err(|e| self.reason(&e))
    }
}

/// Passes through a 2xx response, otherwise describes the failure.
fn successful(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    if body.is_empty() {
        Err(format!("server answered {status}"))
    } else {
        Err(format!("server answered {status}: {body}"))
    }
}

impl ModelApi for HttpApi {
    fn projects(&self) -> Result<Vec<ProjectInfo>, ApiError> {
        let projects: Vec<ProjectDto> = self.get("projects")?;
        Ok(projects.into_iter().map(ProjectInfo::from).collect())
    }

    fn create_project(&self, name: &str, description: &str) -> Result<ProjectInfo, ApiError> {
        let project: ProjectDto = self
            .post("projects", &NewProjectDto::new(name, description))
            .map_err(|reason| ApiError::CreateProject {
                name: name.to_string(),
                reason,
            })?;
        Ok(project.into())
    }

    fn commits(&self, project: &ProjectId) -> Result<Vec<CommitInfo>, ApiError> {
        let commits: Vec<CommitDto> = self.get(&format!("projects/{project}/commits"))?;
        Ok(commits.into_iter().map(CommitInfo::from).collect())
    }

    fn elements(&self, project: &ProjectId, commit: &CommitId) -> Result<Vec<Element>, ApiError> {
        let elements: Vec<ElementDto> =
            self.get(&format!("projects/{project}/commits/{commit}/elements"))?;
        Ok(elements.into_iter().map(Element::from).collect())
    }

    fn commit(&self, project: &ProjectId, request: &CommitRequest) -> Result<CommitId, ApiError> {
        let commit: IdRef<CommitId> = self
            .post(&format!("projects/{project}/commits"), &CommitBody::from(request))
            .map_err(|reason| ApiError::Commit {
                project: project.clone(),
                reason,
            })?;
        tracing::info!(%project, commit = %commit.id, "commit accepted");
        Ok(commit.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped_from_host() {
        let api = HttpApi::new("http://localhost:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.host(), "http://localhost:9000");
        assert_eq!(api.url("projects"), "http://localhost:9000/projects");
    }

    #[test]
    fn unreachable_server_is_a_fetch_error() {
        // Port 9 (discard) is not expected to serve HTTP.
        let api = HttpApi::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();

        let err = api.projects().unwrap_err();
        assert!(matches!(err, ApiError::Fetch { ref resource, .. } if resource == "http://127.0.0.1:9/projects"));
    }
}
