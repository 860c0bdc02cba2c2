//! GitLab REST API (v4) tracker.
//!
//! Wire types are private to this module and mapped into domain types as
//! soon as a response is decoded.

use super::{Tracker, TrackerError, TrackerResult};
use crate::domain::{Board, BoardList, Issue, IssueState, Label, LinkedIssue, NewIssue, Note};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const TOKEN_HEADER: &str = "private-token";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
struct WireIssue {
    id: u64,
    iid: u64,
    title: String,
    #[serde(default)]
    state: IssueState,
    #[serde(default)]
    labels: Vec<String>,
    description: Option<String>,
    web_url: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    updated_at: String,
}

impl From<WireIssue> for Issue {
    fn from(w: WireIssue) -> Self {
        Issue {
            id: w.id,
            iid: w.iid,
            title: w.title,
            state: w.state,
            labels: w.labels,
            description: w.description,
            web_url: w.web_url,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireLinkedIssue {
    iid: u64,
}

#[derive(Debug, Deserialize)]
struct WireNote {
    id: u64,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    name: String,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireBoard {
    id: u64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireBoardList {
    id: u64,
    label: Option<WireLabel>,
}

#[derive(Debug, Serialize)]
struct CreateLabel<'a> {
    name: &'a str,
    color: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateIssue<'a> {
    title: &'a str,
    description: &'a str,
    labels: String,
}

#[derive(Debug, Serialize)]
struct CreateNote<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateLink<'a> {
    target_project_id: &'a str,
    target_issue_iid: u64,
    link_type: &'a str,
}

#[derive(Debug, Serialize)]
struct Reorder {
    move_after_id: u64,
}

#[derive(Debug, Deserialize)]
struct Ignored {}

/// Tracker backed by a GitLab project.
#[derive(Debug, Clone)]
pub struct GitlabTracker {
    client: reqwest::Client,
    project_url: String,
    project_id: String,
}

impl GitlabTracker {
    /// Create a client for `project_id` on the GitLab instance at `base_url`.
    ///
    /// `project_id` may be numeric or a `group/project` path. Every request
    /// carries `token` and is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(
        base_url: &str,
        project_id: &str,
        token: &str,
        timeout: Duration,
    ) -> TrackerResult<Self> {
        let mut token_value = HeaderValue::from_str(token)
            .map_err(|_| TrackerError::Unauthorized("token contains invalid characters".into()))?;
        token_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("storymap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackerError::Connection(e.to_string()))?;

        let project_url = format!(
            "{}/api/v4/projects/{}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(project_id)
        );

        Ok(Self {
            client,
            project_url,
            project_id: project_id.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.project_url)
    }

    async fn send(&self, request: RequestBuilder) -> TrackerResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| TrackerError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TrackerError::Unauthorized(message),
            StatusCode::NOT_FOUND => TrackerError::NotFound(message),
            StatusCode::CONFLICT => TrackerError::Conflict(message),
            _ => TrackerError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn decode<T: DeserializeOwned + Send>(response: Response) -> TrackerResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| TrackerError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, path: &str) -> TrackerResult<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Self::decode(response).await
    }

    async fn get_paged<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> TrackerResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page = "1".to_string();
        loop {
            let request = self
                .client
                .get(self.url(path))
                .query(query)
                .query(&[("per_page", PER_PAGE), ("page", page.as_str())]);
            let response = self.send(request).await?;
            let next = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string);

            let mut batch: Vec<T> = Self::decode(response).await?;
            debug!(path, page = %page, count = batch.len(), "Fetched page");
            items.append(&mut batch);

            match next {
                Some(n) => page = n,
                None => return Ok(items),
            }
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> TrackerResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let response = self
            .send(self.client.post(self.url(path)).json(body))
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, path: &str) -> TrackerResult<()> {
        self.send(self.client.delete(self.url(path))).await?;
        Ok(())
    }
}

/// Extract GitLab's `message`/`error` field, falling back to the raw body.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let field = parsed.as_ref().and_then(|v| v.get("message").or_else(|| v.get("error")));
    match field {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => body.trim().to_string(),
    }
}

#[async_trait]
impl Tracker for GitlabTracker {
    async fn list_issues(&self) -> TrackerResult<Vec<Issue>> {
        let issues: Vec<WireIssue> = self
            .get_paged("/issues", &[("scope", "all".to_string())])
            .await?;
        Ok(issues.into_iter().map(Issue::from).collect())
    }

    async fn get_issue(&self, iid: u64) -> TrackerResult<Issue> {
        let issue: WireIssue = self.get_json(&format!("/issues/{iid}")).await?;
        Ok(issue.into())
    }

    async fn list_issue_links(&self, iid: u64) -> TrackerResult<Vec<LinkedIssue>> {
        let links: Vec<WireLinkedIssue> = self.get_json(&format!("/issues/{iid}/links")).await?;
        Ok(links
            .into_iter()
            .map(|l| LinkedIssue { iid: l.iid })
            .collect())
    }

    async fn list_issue_notes(&self, iid: u64) -> TrackerResult<Vec<Note>> {
        let notes: Vec<WireNote> = self
            .get_paged(
                &format!("/issues/{iid}/notes"),
                &[("sort", "asc".to_string())],
            )
            .await?;
        Ok(notes
            .into_iter()
            .map(|n| Note {
                id: n.id,
                body: n.body,
            })
            .collect())
    }

    async fn list_labels(&self) -> TrackerResult<Vec<Label>> {
        let labels: Vec<WireLabel> = self.get_paged("/labels", &[]).await?;
        Ok(labels
            .into_iter()
            .map(|l| Label {
                name: l.name,
                color: l.color,
            })
            .collect())
    }

    async fn create_label(&self, name: &str, color: &str) -> TrackerResult<Label> {
        let label: WireLabel = self
            .post_json("/labels", &CreateLabel { name, color })
            .await?;
        Ok(Label {
            name: label.name,
            color: label.color,
        })
    }

    async fn delete_label(&self, name: &str) -> TrackerResult<()> {
        self.delete(&format!("/labels/{}", urlencoding::encode(name)))
            .await
    }

    async fn create_issue(&self, issue: &NewIssue) -> TrackerResult<Issue> {
        let body = CreateIssue {
            title: &issue.title,
            description: &issue.description,
            labels: issue.labels.join(","),
        };
        let created: WireIssue = self.post_json("/issues", &body).await?;
        Ok(created.into())
    }

    async fn delete_issue(&self, iid: u64) -> TrackerResult<()> {
        self.delete(&format!("/issues/{iid}")).await
    }

    async fn create_note(&self, iid: u64, body: &str) -> TrackerResult<Note> {
        let note: WireNote = self
            .post_json(&format!("/issues/{iid}/notes"), &CreateNote { body })
            .await?;
        Ok(Note {
            id: note.id,
            body: note.body,
        })
    }

    async fn delete_note(&self, iid: u64, note_id: u64) -> TrackerResult<()> {
        self.delete(&format!("/issues/{iid}/notes/{note_id}")).await
    }

    async fn create_issue_link(
        &self,
        source: u64,
        target: u64,
        link_type: &str,
    ) -> TrackerResult<()> {
        let body = CreateLink {
            target_project_id: &self.project_id,
            target_issue_iid: target,
            link_type,
        };
        let _: Ignored = self
            .post_json(&format!("/issues/{source}/links"), &body)
            .await?;
        Ok(())
    }

    async fn get_board(&self, board_id: u64) -> TrackerResult<Board> {
        let board: WireBoard = self.get_json(&format!("/boards/{board_id}")).await?;
        Ok(Board {
            id: board.id,
            name: board.name,
        })
    }

    async fn list_board_lists(&self, board_id: u64) -> TrackerResult<Vec<BoardList>> {
        let lists: Vec<WireBoardList> =
            self.get_json(&format!("/boards/{board_id}/lists")).await?;
        Ok(lists
            .into_iter()
            .map(|l| BoardList {
                id: l.id,
                label: l.label.map(|label| label.name),
            })
            .collect())
    }

    async fn reorder_issue(&self, iid: u64, after_iid: u64) -> TrackerResult<()> {
        // The reorder endpoint addresses the anchor by its instance-wide id.
        let anchor = self.get_issue(after_iid).await?;
        let request = self
            .client
            .put(self.url(&format!("/issues/{iid}/reorder")))
            .json(&Reorder {
                move_after_id: anchor.id,
            });
        self.send(request).await?;
        Ok(())
    }
}
