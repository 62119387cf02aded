//! Minimal REST client for the backend-as-a-service (PostgREST tables + auth).
//!
//! Reads use the service role key when present and the anon key otherwise.
//! Writes require the service role key. Calls are instrumented and log table
//! names, filters and row counts (never keys or tokens).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::BackendCfg;
use crate::domain::*;
use crate::error::StoreError;
use crate::store::{DataStore, SessionResolver, StoreResult};

const UA: &str = "classroom-backend/0.1";

#[derive(Clone)]
pub struct BaasClient {
  pub client: reqwest::Client,
  pub base_url: String,
  anon_key: Option<String>,
  service_role_key: Option<String>,
}

/// PostgREST filter: `(column, "op.value")`.
type Filter = (&'static str, String);

fn eq(col: &'static str, v: &str) -> Filter { (col, format!("eq.{v}")) }

fn in_list(col: &'static str, values: &[String]) -> Filter {
  let quoted: Vec<String> = values.iter().map(|v| format!("\"{}\"", v.replace('"', ""))).collect();
  (col, format!("in.({})", quoted.join(",")))
}

impl BaasClient {
  /// Construct the client if a backend URL is configured; otherwise return None.
  pub fn from_config(cfg: &BackendCfg) -> Option<Self> {
    let base_url = cfg.url.clone()?;
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;
    Some(Self {
      client,
      base_url,
      anon_key: cfg.anon_key.clone(),
      service_role_key: cfg.service_role_key.clone(),
    })
  }

  fn read_key(&self) -> StoreResult<&str> {
    self.service_role_key
      .as_deref()
      .or(self.anon_key.as_deref())
      .ok_or(StoreError::MissingCredential("BACKEND_ANON_KEY"))
  }

  /// `apikey` for the auth endpoint: the anon key, or the service key when only that is set.
  fn auth_key(&self) -> StoreResult<&str> {
    self.anon_key
      .as_deref()
      .or(self.service_role_key.as_deref())
      .ok_or(StoreError::MissingCredential("BACKEND_ANON_KEY"))
  }

  fn write_key(&self) -> StoreResult<&str> {
    self.service_role_key.as_deref().ok_or(StoreError::MissingCredential("BACKEND_SERVICE_ROLE_KEY"))
  }

  fn table_url(&self, table: &str) -> String {
    format!("{}/rest/v1/{}", self.base_url, table)
  }

  /// Send a table request and decode the JSON row array.
  #[instrument(level = "debug", skip(self, key, filters, body), fields(%table, %method))]
  async fn rows<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    method: Method,
    table: &str,
    key: &str,
    filters: &[Filter],
    body: Option<&B>,
  ) -> StoreResult<Vec<T>> {
    let mut query: Vec<(&str, String)> = vec![("select", "*".into())];
    query.extend(filters.iter().map(|(c, v)| (*c, v.clone())));

    let mut req = self.client.request(method.clone(), self.table_url(table))
      .header(USER_AGENT, UA)
      .header("apikey", key)
      .header(AUTHORIZATION, format!("Bearer {}", key))
      .query(&query);
    if method != Method::GET {
      req = req.header("Prefer", "return=representation");
    }
    if let Some(b) = body {
      req = req.header(CONTENT_TYPE, "application/json").json(b);
    }

    let res = req.send().await?;
    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_backend_error(&body).unwrap_or(body);
      return Err(StoreError::Http { status: status.as_u16(), message });
    }
    let rows: Vec<T> = res.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
    debug!(target: "classroom_backend", %table, rows = rows.len(), "Backend rows");
    Ok(rows)
  }

  async fn select<T: DeserializeOwned>(&self, table: &str, filters: &[Filter]) -> StoreResult<Vec<T>> {
    let key = self.read_key()?;
    self.rows::<T, ()>(Method::GET, table, key, filters, None).await
  }

  async fn select_one<T: DeserializeOwned>(&self, table: &str, id: &str) -> StoreResult<Option<T>> {
    Ok(self.select::<T>(table, &[eq("id", id)]).await?.into_iter().next())
  }

  async fn write<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    method: Method,
    table: &str,
    filters: &[Filter],
    body: Option<&B>,
  ) -> StoreResult<Vec<T>> {
    let key = self.write_key()?;
    self.rows(method, table, key, filters, body).await
  }
}

#[async_trait]
impl DataStore for BaasClient {
  async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>> {
    self.select_one("submissions", id).await
  }

  async fn grade_submission(&self, id: &str, patch: &GradePatch) -> StoreResult<Submission> {
    let rows: Vec<Submission> = self.write(Method::PATCH, "submissions", &[eq("id", id)], Some(patch)).await?;
    rows.into_iter().next().ok_or_else(|| StoreError::Missing(format!("submission {id}")))
  }

  async fn list_submissions(&self, assignment_ids: &[String]) -> StoreResult<Vec<Submission>> {
    if assignment_ids.is_empty() { return Ok(vec![]); }
    self.select("submissions", &[in_list("assignment_id", assignment_ids), ("order", "created_at.asc".into())]).await
  }

  async fn count_submissions(&self, assignment_id: &str, status: SubmissionStatus) -> StoreResult<u64> {
    #[derive(Deserialize)]
    struct IdOnly { #[allow(dead_code)] id: String }
    let rows: Vec<IdOnly> = self
      .select("submissions", &[eq("assignment_id", assignment_id), eq("status", status.as_str())])
      .await?;
    Ok(rows.len() as u64)
  }

  async fn get_assignment(&self, id: &str) -> StoreResult<Option<Assignment>> {
    self.select_one("assignments", id).await
  }

  async fn list_assignments_for_class(&self, class_id: &str) -> StoreResult<Vec<Assignment>> {
    self.select("assignments", &[eq("class_id", class_id)]).await
  }

  async fn update_assignment_metrics(&self, id: &str, metrics: AssignmentMetrics) -> StoreResult<()> {
    let rows: Vec<serde_json::Value> = self.write(Method::PATCH, "assignments", &[eq("id", id)], Some(&metrics)).await?;
    if rows.is_empty() {
      return Err(StoreError::Missing(format!("assignment {id}")));
    }
    Ok(())
  }

  async fn list_enrollments(&self, class_id: &str) -> StoreResult<Vec<Enrollment>> {
    self.select("enrollments", &[eq("class_id", class_id)]).await
  }

  async fn count_active_enrollments(&self, class_id: &str) -> StoreResult<u64> {
    let rows: Vec<Enrollment> = self.select("enrollments", &[eq("class_id", class_id), eq("status", "active")]).await?;
    Ok(rows.len() as u64)
  }

  async fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>> {
    self.select_one("profiles", id).await
  }

  async fn list_profiles(&self, ids: &[String]) -> StoreResult<Vec<Profile>> {
    if ids.is_empty() { return Ok(vec![]); }
    self.select("profiles", &[in_list("id", ids)]).await
  }

  async fn list_guardians(&self, student_id: &str) -> StoreResult<Vec<Guardian>> {
    self.select("student_guardians", &[eq("student_id", student_id)]).await
  }

  async fn insert_guardian(&self, guardian: &Guardian) -> StoreResult<Guardian> {
    let rows: Vec<Guardian> = self.write(Method::POST, "student_guardians", &[], Some(guardian)).await?;
    rows.into_iter().next().ok_or_else(|| StoreError::Decode("insert returned no row".into()))
  }

  async fn delete_guardian(&self, student_id: &str, guardian_id: &str) -> StoreResult<bool> {
    let rows: Vec<Guardian> = self
      .write::<Guardian, ()>(Method::DELETE, "student_guardians", &[eq("id", guardian_id), eq("student_id", student_id)], None)
      .await?;
    Ok(!rows.is_empty())
  }

  async fn get_test(&self, id: &str) -> StoreResult<Option<Test>> {
    self.select_one("tests", id).await
  }

  async fn list_tests_for_class(&self, class_id: &str) -> StoreResult<Vec<Test>> {
    self.select("tests", &[eq("class_id", class_id)]).await
  }

  async fn list_attempts(&self, test_ids: &[String]) -> StoreResult<Vec<TestAttempt>> {
    if test_ids.is_empty() { return Ok(vec![]); }
    self.select("test_attempts", &[in_list("test_id", test_ids), ("order", "started_at.desc.nullslast".into())]).await
  }

  async fn list_lessons_for_class(&self, class_id: &str) -> StoreResult<Vec<Lesson>> {
    self.select("lessons", &[eq("class_id", class_id)]).await
  }

  async fn list_lesson_completions(&self, lesson_ids: &[String]) -> StoreResult<Vec<LessonCompletion>> {
    if lesson_ids.is_empty() { return Ok(vec![]); }
    self.select("lesson_completions", &[in_list("lesson_id", lesson_ids)]).await
  }

  async fn list_study_sessions(&self, class_id: &str) -> StoreResult<Vec<StudySession>> {
    self.select("study_sessions", &[eq("class_id", class_id)]).await
  }
}

#[async_trait]
impl SessionResolver for BaasClient {
  #[instrument(level = "debug", skip_all)]
  async fn resolve_token(&self, token: &str) -> StoreResult<Option<String>> {
    #[derive(Deserialize)]
    struct AuthUserResp { id: String }

    let key = self.auth_key()?;
    let res = self.client.get(format!("{}/auth/v1/user", self.base_url))
      .header(USER_AGENT, UA)
      .header("apikey", key)
      .header(AUTHORIZATION, format!("Bearer {}", token))
      .send().await?;

    match res.status() {
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
      s if s.is_success() => {
        let user: AuthUserResp = res.json().await.map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Some(user.id))
      }
      s => {
        let body = res.text().await.unwrap_or_default();
        let message = extract_backend_error(&body).unwrap_or(body);
        Err(StoreError::Http { status: s.as_u16(), message })
      }
    }
  }
}

/// Try to extract a clean error message from a PostgREST / auth error body.
fn extract_backend_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EObj {
    #[serde(default)] message: Option<String>,
    #[serde(default)] msg: Option<String>,
    #[serde(default)] hint: Option<String>,
  }
  let e = serde_json::from_str::<EObj>(body).ok()?;
  let msg = e.message.or(e.msg)?;
  Some(match e.hint {
    Some(h) => format!("{msg} ({h})"),
    None => msg,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn in_filter_quotes_values() {
    let (col, v) = in_list("id", &["a".into(), "b\"c".into()]);
    assert_eq!(col, "id");
    assert_eq!(v, "in.(\"a\",\"bc\")");
  }

  #[test]
  fn error_body_prefers_message_and_appends_hint() {
    assert_eq!(
      extract_backend_error(r#"{"message":"permission denied","hint":"check RLS"}"#).as_deref(),
      Some("permission denied (check RLS)")
    );
    assert_eq!(extract_backend_error(r#"{"msg":"bad jwt"}"#).as_deref(), Some("bad jwt"));
    assert!(extract_backend_error("<html>").is_none());
  }

  #[test]
  fn writes_need_service_role_key() {
    let cfg = BackendCfg { url: Some("https://db.example".into()), anon_key: Some("anon".into()), service_role_key: None };
    let c = BaasClient::from_config(&cfg).unwrap();
    assert_eq!(c.read_key().unwrap(), "anon");
    assert!(matches!(c.write_key(), Err(StoreError::MissingCredential("BACKEND_SERVICE_ROLE_KEY"))));
  }

  use crate::error::AppError;
  use crate::testutil;
  use serde_json::json;
  use wiremock::matchers::{bearer_token, body_partial_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client_for(server: &MockServer, anon: Option<&str>, service: Option<&str>) -> BaasClient {
    let cfg = BackendCfg {
      url: Some(server.uri()),
      anon_key: anon.map(str::to_string),
      service_role_key: service.map(str::to_string),
    };
    BaasClient::from_config(&cfg).unwrap()
  }

  fn patch() -> GradePatch {
    GradePatch {
      score: 18.0,
      feedback: Some("Great work".into()),
      status: SubmissionStatus::Graded,
      graded_at: testutil::at(11, 10),
      updated_at: testutil::at(11, 10),
    }
  }

  #[tokio::test]
  async fn session_lookup_maps_auth_statuses() {
    let server = MockServer::start().await;
    let user_endpoint = || Mock::given(method("GET")).and(path("/auth/v1/user")).and(header("apikey", "anon"));
    user_endpoint()
      .and(bearer_token("good"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1", "email": "t@school.test"})))
      .mount(&server)
      .await;
    user_endpoint().and(bearer_token("expired")).respond_with(ResponseTemplate::new(401)).mount(&server).await;
    user_endpoint().and(bearer_token("revoked")).respond_with(ResponseTemplate::new(403)).mount(&server).await;
    user_endpoint()
      .and(bearer_token("boom"))
      .respond_with(ResponseTemplate::new(502).set_body_json(json!({"msg": "auth service down"})))
      .mount(&server)
      .await;

    let c = client_for(&server, Some("anon"), None);
    assert_eq!(c.resolve_token("good").await.unwrap().as_deref(), Some("u1"));
    assert_eq!(c.resolve_token("expired").await.unwrap(), None);
    assert_eq!(c.resolve_token("revoked").await.unwrap(), None);
    match c.resolve_token("boom").await {
      Err(StoreError::Http { status, message }) => {
        assert_eq!(status, 502);
        assert_eq!(message, "auth service down");
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[tokio::test]
  async fn session_lookup_falls_back_to_service_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/auth/v1/user"))
      .and(header("apikey", "service"))
      .and(bearer_token("good"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u2"})))
      .expect(1)
      .mount(&server)
      .await;

    let c = client_for(&server, None, Some("service"));
    assert_eq!(c.resolve_token("good").await.unwrap().as_deref(), Some("u2"));
  }

  #[tokio::test]
  async fn grade_patch_asks_for_the_updated_row_with_service_key() {
    let server = MockServer::start().await;
    let mut row = testutil::submission("s1", "st1", "a1", SubmissionStatus::Graded);
    row.score = Some(18.0);
    row.graded_at = Some(testutil::at(11, 10));
    Mock::given(method("PATCH"))
      .and(path("/rest/v1/submissions"))
      .and(query_param("id", "eq.s1"))
      .and(query_param("select", "*"))
      .and(header("Prefer", "return=representation"))
      .and(header("apikey", "service"))
      .and(bearer_token("service"))
      .and(body_partial_json(json!({"score": 18.0, "status": "graded", "feedback": "Great work"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
      .expect(1)
      .mount(&server)
      .await;

    let c = client_for(&server, Some("anon"), Some("service"));
    let graded = c.grade_submission("s1", &patch()).await.unwrap();
    assert_eq!(graded.id, "s1");
    assert_eq!(graded.score, Some(18.0));
  }

  #[tokio::test]
  async fn empty_patch_result_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
      .and(path("/rest/v1/submissions"))
      .and(query_param("id", "eq.gone"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&server)
      .await;

    let c = client_for(&server, None, Some("service"));
    let err = c.grade_submission("gone", &patch()).await.unwrap_err();
    assert!(matches!(err, StoreError::Missing(_)));
    assert!(matches!(AppError::from(err), AppError::NotFound(_)));
  }

  #[tokio::test]
  async fn writes_without_service_key_never_reach_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let c = client_for(&server, Some("anon"), None);
    let err = c.grade_submission("s1", &patch()).await.unwrap_err();
    assert!(matches!(err, StoreError::MissingCredential("BACKEND_SERVICE_ROLE_KEY")));
  }

  #[tokio::test]
  async fn backend_error_body_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rest/v1/assignments"))
      .and(query_param("id", "eq.a1"))
      .and(header("apikey", "anon"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "permission denied", "hint": "check RLS"})))
      .mount(&server)
      .await;

    let c = client_for(&server, Some("anon"), None);
    match c.get_assignment("a1").await {
      Err(StoreError::Http { status, message }) => {
        assert_eq!(status, 401);
        assert_eq!(message, "permission denied (check RLS)");
      }
      other => panic!("unexpected: {other:?}"),
    }
  }
}

