// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Literal (literal.club) reading tracker: the book currently being read.

use crate::config::LiteralCredentials;
use crate::error::Result;
use crate::models::LiteralBook;
use crate::services::upstream::{check_response_json, transport_error, GraphQlResponse};
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "Literal";
const API_URL: &str = "https://api.literal.club/graphql/";

const CURRENTLY_READING_QUERY: &str = r#"
query booksByReadingStateAndProfile(
  $limit: Int!
  $offset: Int!
  $readingStatus: ReadingStatus!
  $profileId: String!
) {
  booksByReadingStateAndProfile(
    limit: $limit
    offset: $offset
    readingStatus: $readingStatus
    profileId: $profileId
  ) {
    id
    slug
    title
    subtitle
    cover
    authors {
      id
      name
    }
  }
}
"#;

#[derive(Clone)]
pub struct LiteralService {
    http: reqwest::Client,
    credentials: Option<LiteralCredentials>,
}

impl LiteralService {
    pub fn new(http: reqwest::Client, credentials: Option<LiteralCredentials>) -> Self {
        Self { http, credentials }
    }

    /// First book on the profile's "reading" shelf.
    pub async fn get_currently_reading(&self) -> Result<Option<LiteralBook>> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        let body = json!({
            "query": CURRENTLY_READING_QUERY,
            "variables": {
                "limit": 1,
                "offset": 0,
                "readingStatus": "IS_READING",
                "profileId": credentials.profile_id,
            }
        });

        let response = self
            .http
            .post(API_URL)
            .bearer_auth(&credentials.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response: GraphQlResponse<ReadingData> =
            check_response_json(PROVIDER, response).await?;
        Ok(response.into_data()?.books.into_iter().next())
    }
}

#[derive(Debug, Deserialize)]
struct ReadingData {
    #[serde(rename = "booksByReadingStateAndProfile", default)]
    books: Vec<LiteralBook>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_parse_currently_reading() {
        let response: GraphQlResponse<ReadingData> = serde_json::from_value(json!({
            "data": {
                "booksByReadingStateAndProfile": [{
                    "id": "cl1",
                    "slug": "the-dispossessed",
                    "title": "The Dispossessed",
                    "subtitle": null,
                    "cover": "https://assets.literal.club/cover.jpg",
                    "authors": [{"id": "a1", "name": "Ursula K. Le Guin"}]
                }]
            }
        }))
        .unwrap();

        let book = response.into_data().unwrap().books.remove(0);
        assert_eq!(book.title, "The Dispossessed");
        assert_eq!(book.subtitle, None);
        assert_eq!(book.authors[0].name, "Ursula K. Le Guin");
    }

    #[test]
    fn test_empty_shelf() {
        let response: GraphQlResponse<ReadingData> =
            serde_json::from_value(json!({"data": {"booksByReadingStateAndProfile": []}}))
                .unwrap();
        assert!(response.into_data().unwrap().books.is_empty());
    }

    #[test]
    fn test_graphql_errors_fail() {
        let response: GraphQlResponse<ReadingData> = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "Profile not found"}]
        }))
        .unwrap();

        let err = response.into_data().unwrap_err();
        assert!(matches!(err, AppError::Upstream(msg) if msg.contains("Profile not found")));
    }

    #[tokio::test]
    async fn test_unconfigured_has_nothing_to_show() {
        let service = LiteralService::new(reqwest::Client::new(), None);
        assert!(service.get_currently_reading().await.unwrap().is_none());
    }
}
