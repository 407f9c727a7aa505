use log::{error, info};
use rocket::serde::json::Json;
use rocket::{get, post, State};
use std::sync::Arc;

use crate::models::{CutoffPolicy, ErrorResponse, ProcessLinkRequest, ProcessLinkResponse, VideoLink};
use crate::services::channel::{resolve_channel, SyncTarget};
use crate::services::pipeline::SyncRequest;
use crate::services::status::{RunReporter, RunStatus};
use crate::AppState;

/// Validates the request, registers a run and syncs in the background. Poll
/// `/status/<run_id>` for progress.
#[post("/process_link", data = "<request>")]
pub async fn process_link(
    state: &State<AppState>,
    request: Json<ProcessLinkRequest>,
) -> Result<Json<ProcessLinkResponse>, ErrorResponse> {
    let request = request.into_inner();
    let cutoff = CutoffPolicy::from_options(
        request.date_option.as_deref(),
        request.date_input.as_deref(),
    )?;

    let spreadsheet_id = request
        .spreadsheet_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .or_else(|| state.config.spreadsheet_id.clone())
        .ok_or_else(|| ErrorResponse {
            error: "missing_spreadsheet_id".to_string(),
            message: "No spreadsheet id given and SPREADSHEET_ID is not set".to_string(),
        })?;

    let tab = match SyncTarget::detect(&request.link) {
        SyncTarget::Channel(link) => resolve_channel(&link)?.display_name,
        SyncTarget::Video(link) => {
            VideoLink::parse(&link)?;
            state.config.single_video_sheet.clone()
        }
    };

    let run_id = state.runs.start_run(&request.link);
    let reporter = Arc::new(RunReporter::new(state.runs.clone(), run_id.clone()));
    let pipeline = state.build_pipeline(&spreadsheet_id, reporter);
    let lock = state.sheet_locks.lock_for(&spreadsheet_id, &tab);
    let sync_request = SyncRequest {
        link: request.link.clone(),
        cutoff,
        resume: request.resume,
    };

    info!("Run {run_id}: queued {} for sheet '{tab}'", request.link);
    let task_run_id = run_id.clone();
    tokio::spawn(async move {
        let _guard = lock.lock().await;
        match pipeline.run(&sync_request).await {
            Ok(report) => info!("Run {task_run_id} finished: {report:?}"),
            Err(e) => error!("Run {task_run_id} failed: {e}"),
        }
    });

    Ok(Json(ProcessLinkResponse {
        success: true,
        message: "Link processing started.".to_string(),
        run_id,
    }))
}

#[get("/status/<run_id>")]
pub async fn run_status(state: &State<AppState>, run_id: &str) -> Option<Json<RunStatus>> {
    state.runs.get(run_id).map(Json)
}

#[cfg(test)]
mod tests {
    use crate::api::build_rocket;
    use crate::config::test_config;
    use crate::models::ErrorResponse;
    use crate::services::locks::SheetLocks;
    use crate::services::status::RunRegistry;
    use crate::AppState;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use std::sync::Arc;

    async fn client() -> Client {
        let state = AppState {
            config: Arc::new(test_config()),
            http: reqwest::Client::new(),
            runs: Arc::new(RunRegistry::new()),
            sheet_locks: Arc::new(SheetLocks::default()),
        };
        Client::tracked(build_rocket(state)).await.unwrap()
    }

    async fn post(client: &Client, body: &str) -> (Status, Option<ErrorResponse>) {
        let response = client
            .post("/process_link")
            .header(ContentType::JSON)
            .body(body)
            .dispatch()
            .await;
        let status = response.status();
        (status, response.into_json::<ErrorResponse>().await)
    }

    #[rocket::async_test]
    async fn custom_cutoff_without_date_is_rejected() {
        let client = client().await;
        let (status, body) = post(
            &client,
            r#"{"link": "https://www.youtube.com/@Example", "date_option": "custom", "spreadsheet_id": "abc"}"#,
        )
        .await;

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body.unwrap().error, "malformed_input");
    }

    #[rocket::async_test]
    async fn missing_spreadsheet_id_is_rejected() {
        let client = client().await;
        let (status, body) = post(&client, r#"{"link": "https://www.youtube.com/@Example"}"#).await;

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body.unwrap().error, "missing_spreadsheet_id");
    }

    #[rocket::async_test]
    async fn malformed_video_link_is_rejected_before_starting_a_run() {
        let client = client().await;
        let (status, body) = post(
            &client,
            r#"{"link": "https://www.youtube.com/watch?v=short", "spreadsheet_id": "abc"}"#,
        )
        .await;

        assert_eq!(status, Status::BadRequest);
        assert_eq!(body.unwrap().error, "malformed_input");
    }

    #[rocket::async_test]
    async fn unknown_run_is_not_found() {
        let client = client().await;
        let response = client.get("/status/0_0").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
