// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub contribution calendar and latest commit.

use crate::config::GitHubSettings;
use crate::error::Result;
use crate::models::{CodeActivity, CommitInfo, ContributionDay, ContributionWeek};
use crate::services::upstream::{check_response_json, transport_error, GraphQlResponse};
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "GitHub";
const API_BASE: &str = "https://api.github.com";

const CONTRIBUTIONS_QUERY: &str = r#"
query($username: String!) {
  user(login: $username) {
    contributionsCollection {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            date
            contributionCount
            contributionLevel
          }
        }
      }
    }
  }
}
"#;

#[derive(Clone)]
pub struct GitHubService {
    http: reqwest::Client,
    base_url: String,
    settings: Option<GitHubSettings>,
}

impl GitHubService {
    pub fn new(http: reqwest::Client, settings: Option<GitHubSettings>) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
            settings,
        }
    }

    /// Contributions plus the latest commit, fetched concurrently.
    ///
    /// A failed commit lookup is logged and reported as `None`; a failed
    /// contributions lookup fails the whole call.
    pub async fn get_code_activity(&self) -> Result<Option<CodeActivity>> {
        let Some(settings) = &self.settings else {
            return Ok(None);
        };

        let (calendar, latest_commit) = futures_util::future::join(
            self.get_contributions(settings),
            self.get_latest_commit(settings),
        )
        .await;

        let calendar = calendar?;
        let latest_commit = latest_commit
            .map_err(|e| {
                tracing::warn!(
                    repo = %settings.repo,
                    error = %e,
                    "Failed to fetch latest commit"
                );
            })
            .ok()
            .flatten();

        Ok(Some(CodeActivity {
            total_contributions: calendar.total_contributions,
            weeks: calendar.weeks.into_iter().map(Into::into).collect(),
            latest_commit,
        }))
    }

    async fn get_contributions(&self, settings: &GitHubSettings) -> Result<RawCalendar> {
        let mut request = self.http.post(format!("{}/graphql", self.base_url)).json(&json!({
            "query": CONTRIBUTIONS_QUERY,
            "variables": { "username": settings.username },
        }));
        if let Some(token) = &settings.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let response: GraphQlResponse<ContributionsData> =
            check_response_json(PROVIDER, response).await?;

        Ok(response
            .into_data()?
            .user
            .contributions_collection
            .contribution_calendar)
    }

    async fn get_latest_commit(&self, settings: &GitHubSettings) -> Result<Option<CommitInfo>> {
        let url = format!(
            "{}/repos/{}/{}/commits",
            self.base_url,
            urlencoding::encode(&settings.username),
            urlencoding::encode(&settings.repo)
        );

        let mut request = self.http.get(url).query(&[("per_page", "1")]);
        if let Some(token) = &settings.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let commits: Vec<RawCommit> = check_response_json(PROVIDER, response).await?;

        Ok(commits.into_iter().next().map(Into::into))
    }
}

/// Map GitHub's quartile names onto 0..=4.
fn contribution_level(level: &str) -> u8 {
    match level {
        "FIRST_QUARTILE" => 1,
        "SECOND_QUARTILE" => 2,
        "THIRD_QUARTILE" => 3,
        "FOURTH_QUARTILE" => 4,
        _ => 0,
    }
}

#[derive(Debug, Deserialize)]
struct ContributionsData {
    user: RawUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    contributions_collection: RawCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCollection {
    contribution_calendar: RawCalendar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCalendar {
    total_contributions: u32,
    weeks: Vec<RawWeek>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWeek {
    contribution_days: Vec<RawDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDay {
    date: String,
    contribution_count: u32,
    contribution_level: String,
}

impl From<RawWeek> for ContributionWeek {
    fn from(week: RawWeek) -> Self {
        ContributionWeek {
            days: week
                .contribution_days
                .into_iter()
                .map(|day| ContributionDay {
                    level: contribution_level(&day.contribution_level),
                    date: day.date,
                    count: day.contribution_count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    sha: String,
    commit: RawCommitDetail,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
    author: RawCommitAuthor,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawCommitAuthor {
    date: String,
}

impl From<RawCommit> for CommitInfo {
    fn from(raw: RawCommit) -> Self {
        CommitInfo {
            sha: raw.sha.chars().take(7).collect(),
            date: raw.commit.author.date,
            message: raw.commit.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contribution_levels() {
        assert_eq!(contribution_level("NONE"), 0);
        assert_eq!(contribution_level("FIRST_QUARTILE"), 1);
        assert_eq!(contribution_level("FOURTH_QUARTILE"), 4);
        assert_eq!(contribution_level("SOMETHING_NEW"), 0);
    }

    #[test]
    fn test_parse_contribution_calendar() {
        let response: GraphQlResponse<ContributionsData> = serde_json::from_value(json!({
            "data": {"user": {"contributionsCollection": {"contributionCalendar": {
                "totalContributions": 12,
                "weeks": [{"contributionDays": [
                    {"date": "2025-06-01", "contributionCount": 0, "contributionLevel": "NONE"},
                    {"date": "2025-06-02", "contributionCount": 12, "contributionLevel": "THIRD_QUARTILE"}
                ]}]
            }}}}
        }))
        .unwrap();

        let calendar = response
            .into_data()
            .unwrap()
            .user
            .contributions_collection
            .contribution_calendar;
        assert_eq!(calendar.total_contributions, 12);

        let weeks: Vec<ContributionWeek> = calendar.weeks.into_iter().map(Into::into).collect();
        assert_eq!(weeks[0].days[1].level, 3);
        assert_eq!(weeks[0].days[1].count, 12);
        assert_eq!(weeks[0].days[0].date, "2025-06-01");
    }

    #[test]
    fn test_commit_sha_is_shortened() {
        let commits: Vec<RawCommit> = serde_json::from_value(json!([{
            "sha": "0123456789abcdef0123456789abcdef01234567",
            "commit": {
                "author": {"name": "me", "date": "2025-06-01T12:00:00Z"},
                "message": "Fix footer"
            }
        }]))
        .unwrap();

        let info: CommitInfo = commits.into_iter().next().unwrap().into();
        assert_eq!(info.sha, "0123456");
        assert_eq!(info.message, "Fix footer");
        assert_eq!(info.date, "2025-06-01T12:00:00Z");
    }

    #[test]
    fn test_code_activity_serializes_null_commit() {
        let activity = CodeActivity {
            weeks: vec![],
            total_contributions: 0,
            latest_commit: None,
        };
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["totalContributions"], 0);
        assert!(json["latestCommit"].is_null());
    }

    #[tokio::test]
    async fn test_unconfigured_has_nothing_to_show() {
        let service = GitHubService::new(reqwest::Client::new(), None);
        assert!(service.get_code_activity().await.unwrap().is_none());
    }
}
