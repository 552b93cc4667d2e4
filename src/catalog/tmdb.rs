//! TMDb catalog adapter.

use std::io::Read;
use std::time::Duration;

use log::debug;
use serde_json::Value;

use crate::catalog::{CatalogCandidate, CatalogDetails, CatalogService};
use crate::config::CatalogConfig;
use crate::records::MediaKind;

const USER_AGENT: &str = "watchlog/0.1.0 (watch log enrichment)";
const MAX_ERROR_SNIPPET_CHARS: usize = 120;

/// TMDb v3 adapter backed by `ureq`.
pub struct TmdbCatalog {
    http_client: ureq::Agent,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbCatalog {
    /// Creates a new adapter from catalog settings.
    pub fn new(config: &CatalogConfig) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .timeout_read(Duration::from_secs(config.read_timeout_secs))
            .timeout_write(Duration::from_secs(config.read_timeout_secs))
            .build();
        Self {
            http_client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        }
    }

    fn api_url(&self, path: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}/{}?api_key={}",
            self.base_url,
            path.trim_start_matches('/'),
            urlencoding::encode(&self.api_key)
        );
        if !self.language.is_empty() {
            url.push_str("&language=");
            url.push_str(urlencoding::encode(&self.language).as_ref());
        }
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(urlencoding::encode(value).as_ref());
        }
        url
    }

    fn status_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|parsed| parsed["status_message"].as_str().map(ToOwned::to_owned))
            .unwrap_or_else(|| body.chars().take(MAX_ERROR_SNIPPET_CHARS).collect())
    }

    fn status_error(code: u16, path: &str, body: &str) -> String {
        let message = format!(
            "TMDb returned HTTP {code} for {path}: {}",
            Self::status_message(body)
        );
        if code == 401 {
            format!("{message} (check catalog.api_key or TMDB_API_KEY)")
        } else {
            message
        }
    }

    fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, String> {
        let url = self.api_url(path, params);
        debug!("TMDb request: /{}", path.trim_start_matches('/'));
        let response = match self
            .http_client
            .get(&url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json")
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(Self::status_error(code, path, &body));
            }
            Err(error) => return Err(format!("TMDb request failed ({path}): {error}")),
        };
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|error| format!("Failed to read TMDb response ({path}): {error}"))?;
        serde_json::from_str(&body)
            .map_err(|error| format!("Invalid JSON response ({path}): {error}"))
    }

    fn parse_search_results(value: &Value, name_key: &str) -> Result<Vec<CatalogCandidate>, String> {
        let Some(results) = value["results"].as_array() else {
            return Err("search response has no results array".to_string());
        };
        Ok(results
            .iter()
            .filter_map(|item| {
                let id = item["id"].as_u64()?;
                let name = item[name_key]
                    .as_str()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                Some(CatalogCandidate { id, name })
            })
            .collect())
    }

    fn parse_details(value: &Value, kind: MediaKind) -> Result<CatalogDetails, String> {
        let Some(genres) = value["genres"].as_array() else {
            return Err("details response has no genres array".to_string());
        };
        let genres = genres
            .iter()
            .filter_map(|genre| genre["name"].as_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        let runtime = value["runtime"].as_u64();
        let runtime = match kind {
            MediaKind::Movie => runtime,
            MediaKind::Series => runtime.filter(|minutes| *minutes > 0).or_else(|| {
                value["episode_run_time"]
                    .as_array()
                    .and_then(|runtimes| runtimes.iter().filter_map(Value::as_u64).find(|m| *m > 0))
            }),
        };
        Ok(CatalogDetails {
            genres,
            runtime_minutes: runtime.map(|minutes| u32::try_from(minutes).unwrap_or(u32::MAX)),
        })
    }
}

impl CatalogService for TmdbCatalog {
    fn search_movies(&self, title: &str) -> Result<Vec<CatalogCandidate>, String> {
        let payload = self.get_json("search/movie", &[("query", title)])?;
        Self::parse_search_results(&payload, "title")
    }

    fn search_series(&self, title: &str) -> Result<Vec<CatalogCandidate>, String> {
        let payload = self.get_json("search/tv", &[("query", title)])?;
        Self::parse_search_results(&payload, "name")
    }

    fn fetch_details(&self, kind: MediaKind, id: u64) -> Result<CatalogDetails, String> {
        let path = match kind {
            MediaKind::Movie => format!("movie/{id}"),
            MediaKind::Series => format!("tv/{id}"),
        };
        let payload = self.get_json(&path, &[])?;
        Self::parse_details(&payload, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::TmdbCatalog;
    use crate::config::CatalogConfig;
    use crate::records::MediaKind;
    use serde_json::json;

    #[test]
    fn test_api_url_encodes_query_and_key() {
        let catalog = TmdbCatalog::new(&CatalogConfig {
            api_key: "k&y".to_string(),
            base_url: "https://api.example.test/3/".to_string(),
            ..CatalogConfig::default()
        });
        let url = catalog.api_url("search/movie", &[("query", "Spider-Man: No Way Home")]);
        assert_eq!(
            url,
            "https://api.example.test/3/search/movie?api_key=k%26y&language=en-US&query=Spider-Man%3A%20No%20Way%20Home"
        );
    }

    #[test]
    fn test_parse_search_results_keeps_order_and_skips_missing_ids() {
        let payload = json!({
            "page": 1,
            "results": [
                {"id": 438631, "title": "Dune"},
                {"title": "No Id"},
                {"id": 841, "title": "Dune"}
            ]
        });
        let candidates =
            TmdbCatalog::parse_search_results(&payload, "title").expect("results should parse");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, 438631);
        assert_eq!(candidates[1].id, 841);
    }

    #[test]
    fn test_parse_search_results_without_results_is_an_error() {
        let payload = json!({"status_message": "Invalid API key"});
        assert!(TmdbCatalog::parse_search_results(&payload, "title").is_err());
    }

    #[test]
    fn test_parse_movie_details_reads_genres_and_runtime() {
        let payload = json!({
            "genres": [{"id": 878, "name": "Science Fiction"}, {"id": 12, "name": "Adventure"}],
            "runtime": 155
        });
        let details =
            TmdbCatalog::parse_details(&payload, MediaKind::Movie).expect("details should parse");
        assert_eq!(details.genres, vec!["Science Fiction", "Adventure"]);
        assert_eq!(details.runtime_minutes, Some(155));
    }

    #[test]
    fn test_parse_series_details_falls_back_to_episode_runtime() {
        let payload = json!({
            "genres": [{"id": 35, "name": "Comedy"}],
            "episode_run_time": [0, 30]
        });
        let details =
            TmdbCatalog::parse_details(&payload, MediaKind::Series).expect("details should parse");
        assert_eq!(details.runtime_minutes, Some(30));

        let payload = json!({"genres": [], "episode_run_time": []});
        let details =
            TmdbCatalog::parse_details(&payload, MediaKind::Series).expect("details should parse");
        assert_eq!(details.runtime_minutes, None);
    }

    #[test]
    fn test_parse_details_without_genres_is_an_error() {
        let payload = json!({"runtime": 90});
        assert!(TmdbCatalog::parse_details(&payload, MediaKind::Movie).is_err());
    }

    #[test]
    fn test_status_message_prefers_tmdb_error_text() {
        assert_eq!(
            TmdbCatalog::status_message(r#"{"status_code":7,"status_message":"Invalid API key"}"#),
            "Invalid API key"
        );
        assert_eq!(TmdbCatalog::status_message("gateway down"), "gateway down");
    }

    #[test]
    fn test_unauthorized_status_points_at_api_key() {
        let body = r#"{"status_code":7,"status_message":"Invalid API key"}"#;
        assert_eq!(
            TmdbCatalog::status_error(401, "search/movie", body),
            "TMDb returned HTTP 401 for search/movie: Invalid API key \
             (check catalog.api_key or TMDB_API_KEY)"
        );
        assert_eq!(
            TmdbCatalog::status_error(503, "movie/1", "gateway down"),
            "TMDb returned HTTP 503 for movie/1: gateway down"
        );
    }
}
