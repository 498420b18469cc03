//! Concrete [`crate::ForgeAdapter`] implementation backed by the GitHub REST
//! API via `octocrab`. This is the only adapter trait with a real,
//! network-backed implementation in this crate — the issue tracker, VCS,
//! census, and jcheck engine contracts are satisfied by [`crate::fakes`] or
//! by a deployment's own adapters.

use async_trait::async_trait;
use base64::Engine;
use octocrab::Octocrab;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    errors::Error,
    models::{Comment, Label, PullRequest, PullRequestFile, Review, ReviewState, StatusCheck, User},
    ForgeAdapter,
};

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;

/// Logs detailed context from an `octocrab::Error` before it's folded into
/// an [`Error`].
fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = *source;
            error!(
                error_message = err.message,
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),
        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}

fn classify(e: octocrab::Error) -> Error {
    let is_not_found = matches!(&e, octocrab::Error::GitHub { source, .. } if source.message.contains("Not Found"));
    if is_not_found {
        Error::NotFound(e.to_string())
    } else {
        log_octocrab_error("GitHub API call failed", e);
        Error::ApiError()
    }
}

/// GitHub-backed implementation of [`ForgeAdapter`].
///
/// Built from an already-authenticated `Octocrab` client — use
/// [`crate::auth::create_app_client`] or [`crate::auth::create_token_client`]
/// to obtain one.
#[derive(Debug, Default)]
pub struct GitHubForgeAdapter {
    client: Octocrab,
}

impl GitHubForgeAdapter {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    async fn fetch_default_branch(&self, repo_owner: &str, repo_name: &str) -> Result<String, Error> {
        let repo = self
            .client
            .repos(repo_owner, repo_name)
            .get()
            .await
            .map_err(classify)?;
        Ok(repo.default_branch.unwrap_or_else(|| "main".to_string()))
    }
}

#[async_trait]
impl ForgeAdapter for GitHubForgeAdapter {
    #[instrument(skip(self))]
    async fn list_open_pull_requests(
        &self,
        repo_owner: &str,
        repo_name: &str,
    ) -> Result<Vec<PullRequest>, Error> {
        let mut current_page = self
            .client
            .pulls(repo_owner, repo_name)
            .list()
            .state(octocrab::params::State::Open)
            .send()
            .await
            .map_err(classify)?;

        let mut pulls = current_page.take_items();
        while let Ok(Some(mut new_page)) = self.client.get_page(&current_page.next).await {
            pulls.extend(new_page.take_items());
            current_page = new_page;
        }

        let mut result = Vec::with_capacity(pulls.len());
        for pull in pulls {
            result.push(self.get_pull_request(repo_owner, repo_name, pull.number).await?);
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_pull_request(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<PullRequest, Error> {
        let pr = self
            .client
            .pulls(repo_owner, repo_name)
            .get(pr_number)
            .await
            .map_err(classify)?;

        let labels = self
            .list_applied_labels(repo_owner, repo_name, pr_number)
            .await?;
        let comments = self.list_comments(repo_owner, repo_name, pr_number).await?;
        let reviews = self.list_reviews(repo_owner, repo_name, pr_number).await?;

        Ok(PullRequest {
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            draft: pr.draft.unwrap_or_default(),
            body: pr.body,
            head_sha: pr.head.sha,
            base_ref: pr.base.ref_field,
            author: pr.user.map(|u| User {
                id: u.id.0,
                login: u.login,
            }),
            labels,
            comments,
            reviews,
            check: None,
            last_force_push_epoch_ms: None,
        })
    }

    #[instrument(skip(self, title))]
    async fn set_title(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        title: &str,
    ) -> Result<(), Error> {
        self.client
            .pulls(repo_owner, repo_name)
            .update(pr_number)
            .title(title)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn set_body(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), Error> {
        self.client
            .pulls(repo_owner, repo_name)
            .update(pr_number)
            .body(body)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error> {
        self.client
            .issues(repo_owner, repo_name)
            .add_labels(pr_number, &[label.to_string()])
            .await
            .map_err(classify)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_label(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        label: &str,
    ) -> Result<(), Error> {
        match self
            .client
            .issues(repo_owner, repo_name)
            .remove_label(pr_number, label)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let not_applied =
                    matches!(&e, octocrab::Error::GitHub { source, .. } if source.message.contains("Label does not exist"));
                if not_applied {
                    Ok(())
                } else {
                    Err(classify(e))
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_applied_labels(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Label>, Error> {
        let mut current_page = self
            .client
            .issues(repo_owner, repo_name)
            .list_labels_for_issue(pr_number)
            .send()
            .await
            .map_err(classify)?;

        let mut labels = current_page.take_items();
        while let Ok(Some(mut new_page)) = self.client.get_page(&current_page.next).await {
            labels.extend(new_page.take_items());
            current_page = new_page;
        }

        Ok(labels.into_iter().map(|l| Label { name: l.name }).collect())
    }

    #[instrument(skip(self, body))]
    async fn add_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<u64, Error> {
        let comment = self
            .client
            .issues(repo_owner, repo_name)
            .create_comment(pr_number, body)
            .await
            .map_err(classify)?;
        Ok(comment.id.0)
    }

    #[instrument(skip(self, body))]
    async fn update_comment(
        &self,
        repo_owner: &str,
        repo_name: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<(), Error> {
        self.client
            .issues(repo_owner, repo_name)
            .update_comment(comment_id.into(), body)
            .await
            .map_err(classify)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_comments(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Comment>, Error> {
        let mut current_page = self
            .client
            .issues(repo_owner, repo_name)
            .list_comments(pr_number)
            .send()
            .await
            .map_err(classify)?;

        let mut comments = current_page.take_items();
        while let Ok(Some(mut new_page)) = self.client.get_page(&current_page.next).await {
            comments.extend(new_page.take_items());
            current_page = new_page;
        }

        Ok(comments
            .into_iter()
            .map(|c| Comment {
                id: c.id.0,
                body: c.body.unwrap_or_default(),
                user: User {
                    id: c.user.id.0,
                    login: c.user.login,
                },
                created_at_epoch_ms: c.created_at.timestamp_millis(),
            })
            .collect())
    }

    #[instrument(skip(self, check))]
    async fn create_check(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        check: &StatusCheck,
    ) -> Result<(), Error> {
        self.update_check(repo_owner, repo_name, pr_number, check).await
    }

    #[instrument(skip(self, check))]
    async fn update_check(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
        check: &StatusCheck,
    ) -> Result<(), Error> {
        let pr = self
            .client
            .pulls(repo_owner, repo_name)
            .get(pr_number)
            .await
            .map_err(classify)?;

        let (status, conclusion) = match check.status {
            crate::models::CheckStatus::InProgress => ("in_progress", None),
            crate::models::CheckStatus::Success => ("completed", Some("success")),
            crate::models::CheckStatus::Failure => ("completed", Some("failure")),
            crate::models::CheckStatus::Cancelled => ("completed", Some("cancelled")),
        };

        let mut payload = json!({
            "name": "jcheck",
            "head_sha": pr.head.sha,
            "status": status,
            "output": {
                "title": check.title,
                "summary": check.summary,
            },
            "external_id": check.metadata,
        });
        if let Some(conclusion) = conclusion {
            payload["conclusion"] = json!(conclusion);
        }

        let url = format!("/repos/{repo_owner}/{repo_name}/check-runs");
        self.client._post(url, Some(&payload)).await.map_err(|e| {
            log_octocrab_error("failed to create/update check run", e);
            Error::FailedToUpdatePullRequest("failed to create/update check run".to_string())
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_files(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<PullRequestFile>, Error> {
        let mut current_page = self
            .client
            .pulls(repo_owner, repo_name)
            .list_files(pr_number)
            .await
            .map_err(classify)?;

        let mut files = current_page.take_items();
        while let Ok(Some(mut new_page)) = self.client.get_page(&current_page.next).await {
            files.extend(new_page.take_items());
            current_page = new_page;
        }

        debug!(pr_number, file_count = files.len(), "retrieved pull request files");

        Ok(files
            .into_iter()
            .map(|f| PullRequestFile {
                filename: f.filename,
                additions: f.additions,
                deletions: f.deletions,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_reviews(
        &self,
        repo_owner: &str,
        repo_name: &str,
        pr_number: u64,
    ) -> Result<Vec<Review>, Error> {
        let mut current_page = self
            .client
            .pulls(repo_owner, repo_name)
            .list_reviews(pr_number)
            .send()
            .await
            .map_err(classify)?;

        let mut reviews = current_page.take_items();
        while let Ok(Some(mut new_page)) = self.client.get_page(&current_page.next).await {
            reviews.extend(new_page.take_items());
            current_page = new_page;
        }

        let base_ref = self
            .client
            .pulls(repo_owner, repo_name)
            .get(pr_number)
            .await
            .map_err(classify)?
            .base
            .ref_field;

        Ok(reviews
            .into_iter()
            .filter_map(|r| {
                let state = match r.state? {
                    octocrab::models::pulls::ReviewState::Approved => ReviewState::Approved,
                    octocrab::models::pulls::ReviewState::ChangesRequested => ReviewState::Disapproved,
                    _ => ReviewState::Comment,
                };
                Some(Review {
                    user: r.user.map(|u| User {
                        id: u.id.0,
                        login: u.login,
                    })?,
                    state,
                    commit_sha: r.commit_id.unwrap_or_default(),
                    target_ref: base_ref.clone(),
                    submitted_at_epoch_ms: r
                        .submitted_at
                        .map(|t| t.timestamp_millis())
                        .unwrap_or_default(),
                })
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn fetch_file(
        &self,
        repo_owner: &str,
        repo_name: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<Option<String>, Error> {
        let git_ref = if git_ref.is_empty() {
            self.fetch_default_branch(repo_owner, repo_name).await?
        } else {
            git_ref.to_string()
        };

        info!(repo_owner, repo_name, path, git_ref = %git_ref, "fetching file from forge");

        let content_result = self
            .client
            .repos(repo_owner, repo_name)
            .get_content()
            .path(path)
            .r#ref(&git_ref)
            .send()
            .await;

        match content_result {
            Ok(response) => {
                let Some(file) = response.items.into_iter().next() else {
                    return Ok(None);
                };
                let Some(content) = file.content else {
                    return Ok(None);
                };
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(content.replace('\n', ""))
                    .map_err(|_| Error::InvalidResponse)?;
                let text = String::from_utf8(decoded).map_err(|_| Error::InvalidResponse)?;
                Ok(Some(text))
            }
            Err(e) => {
                let not_found =
                    matches!(&e, octocrab::Error::GitHub { source, .. } if source.message.contains("Not Found"));
                if not_found {
                    Ok(None)
                } else {
                    warn!("failed to fetch file {path} at {git_ref}");
                    Err(classify(e))
                }
            }
        }
    }
}
