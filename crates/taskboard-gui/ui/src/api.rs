use gloo::net::http::Request;
use serde::de::DeserializeOwned;
use taskboard_shared::{
  BoardDto,
  FORM_CONTENT_TYPE,
  StateDto,
  StateWrite
};

/// Endpoints are served from the same
/// origin as the page.
const ROOT_URL: &str = "";

async fn get_json<R>(
  path: &str
) -> Result<R, String>
where
  R: DeserializeOwned
{
  let url = format!("{ROOT_URL}{path}");
  let response = Request::get(&url)
    .header("Accept", "application/json")
    .send()
    .await
    .map_err(|e| {
      format!("GET {url} failed: {e}")
    })?;
  if !response.ok() {
    return Err(format!(
      "GET {url} returned {}",
      response.status()
    ));
  }

  let body =
    response.text().await.map_err(|e| {
      format!("read error: {e}")
    })?;
  let body = body.trim();
  serde_json::from_str(if body.is_empty() {
    "{}"
  } else {
    body
  })
  .map_err(|e| format!("decode error: {e}"))
}

pub async fn fetch_board()
-> Result<BoardDto, String> {
  get_json("/board").await
}

pub async fn fetch_state()
-> Result<StateDto, String> {
  get_json("/state").await
}

pub async fn send_state(
  write: &StateWrite
) -> Result<(), String> {
  let url = format!("{ROOT_URL}/state");
  let response = Request::post(&url)
    .header(
      "Content-Type",
      FORM_CONTENT_TYPE
    )
    .body(write.to_form_body())
    .map_err(|e| {
      format!("failed to encode body: {e}")
    })?
    .send()
    .await
    .map_err(|e| {
      format!("POST {url} failed: {e}")
    })?;
  if !response.ok() {
    return Err(format!(
      "POST {url} returned {}",
      response.status()
    ));
  }
  Ok(())
}
