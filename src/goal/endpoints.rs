//! Route handlers for savings goals.
//!
//! Every handler is scoped to the user in the access token: goals owned by
//! other users are reported as not found.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    database_id::GoalId,
    db::lock_connection,
    form::REQUIRED,
    goal::{
        core::{
            GoalView, SavingsGoal, add_to_goal_current_amount, create_goal, delete_goal, get_goal,
            list_goals, set_goal_current_amount, update_goal,
        },
        form::{AddAmountForm, CurrentAmountForm, GoalForm},
        summary::{GoalSummary, summarize_goals},
    },
    json::JsonBody,
    user::{UserID, get_user_by_id},
};

/// The state needed by the goal endpoints.
#[derive(Debug, Clone)]
pub struct GoalState {
    /// The database connection for managing goals.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GoalState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string accepted by the goal list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct GoalListQuery {
    /// `true`/`1` for completed goals only, `false`/`0` for active goals only.
    pub completed: Option<String>,
}

impl GoalListQuery {
    /// The completion status to filter by. Unrecognised values are ignored.
    pub fn completed(&self) -> Option<bool> {
        match self.completed.as_deref()?.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

/// The response to adding money to a goal.
#[derive(Debug, Serialize)]
pub struct AddToGoalResponse {
    message: String,
    goal: GoalView,
}

fn to_view(goal: SavingsGoal, connection: &Connection) -> Result<GoalView, Error> {
    let owner = get_user_by_id(goal.user_id, connection)?;

    Ok(GoalView::new(goal, &owner.full_name()))
}

/// A route handler that lists the user's goals, newest first.
pub async fn list_goals_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<GoalListQuery>,
) -> Result<Json<Vec<GoalView>>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let owner = get_user_by_id(user_id, &connection)?;
    let user_name = owner.full_name();

    let goals = list_goals(user_id, query.completed(), &connection)?
        .into_iter()
        .map(|goal| GoalView::new(goal, &user_name))
        .collect();

    Ok(Json(goals))
}

/// A route handler for creating a goal, responds with 201 Created and the new goal.
pub async fn create_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(form): JsonBody<GoalForm>,
) -> Result<Response, Error> {
    let draft = form.into_draft()?;
    let connection = lock_connection(&state.db_connection)?;

    let goal = create_goal(user_id, draft, &connection)?;
    tracing::debug!("User {user_id} created goal {}", goal.id);

    Ok((StatusCode::CREATED, Json(to_view(goal, &connection)?)).into_response())
}

/// A route handler that summarizes all of the user's goals.
pub async fn goal_summary_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<GoalSummary>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let goals = list_goals(user_id, None, &connection)?;

    Ok(Json(summarize_goals(&goals)))
}

/// A route handler that responds with a single goal.
pub async fn get_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<GoalView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let goal = get_goal(goal_id, user_id, &connection)?;

    to_view(goal, &connection).map(Json)
}

/// A route handler that replaces every editable field of a goal.
pub async fn update_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    JsonBody(form): JsonBody<GoalForm>,
) -> Result<Json<GoalView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    // Another user's goal is a 404 even when the body is invalid.
    get_goal(goal_id, user_id, &connection)?;

    let draft = form.into_draft()?;
    let goal = update_goal(goal_id, user_id, draft, &connection)?;

    to_view(goal, &connection).map(Json)
}

/// A route handler that changes only the fields of a goal present in the body.
pub async fn patch_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    JsonBody(form): JsonBody<GoalForm>,
) -> Result<Json<GoalView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let goal = get_goal(goal_id, user_id, &connection)?;

    let draft = form.merge_into(&goal)?;
    let goal = update_goal(goal_id, user_id, draft, &connection)?;

    to_view(goal, &connection).map(Json)
}

/// A route handler for deleting a goal, responds with 204 No Content.
pub async fn delete_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_goal(goal_id, user_id, &connection)?;
    tracing::debug!("User {user_id} deleted goal {goal_id}");

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for `PUT` requests that set a goal's saved amount.
///
/// `current_amount` is required.
pub async fn set_goal_amount_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    JsonBody(form): JsonBody<CurrentAmountForm>,
) -> Result<Json<GoalView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    get_goal(goal_id, user_id, &connection)?;

    let Some(current_amount) = form.validate()? else {
        return Err(Error::validation("current_amount", REQUIRED));
    };
    let goal = set_goal_current_amount(goal_id, user_id, current_amount, &connection)?;

    to_view(goal, &connection).map(Json)
}

/// A route handler for `PATCH` requests that set a goal's saved amount.
///
/// The goal is left unchanged if `current_amount` is absent.
pub async fn patch_goal_amount_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    JsonBody(form): JsonBody<CurrentAmountForm>,
) -> Result<Json<GoalView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let goal = get_goal(goal_id, user_id, &connection)?;

    let goal = match form.validate()? {
        Some(current_amount) => {
            set_goal_current_amount(goal_id, user_id, current_amount, &connection)?
        }
        None => goal,
    };

    to_view(goal, &connection).map(Json)
}

/// A route handler that adds money to a goal's saved amount.
///
/// Responds with a confirmation message and the updated goal.
pub async fn add_to_goal_endpoint(
    State(state): State<GoalState>,
    Extension(user_id): Extension<UserID>,
    Path(goal_id): Path<GoalId>,
    JsonBody(form): JsonBody<AddAmountForm>,
) -> Result<Json<AddToGoalResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    get_goal(goal_id, user_id, &connection)?;

    let amount = form.validate()?;
    let goal = add_to_goal_current_amount(goal_id, user_id, amount, &connection)?;
    let message = format!("Successfully added ${amount} to {}", goal.title);

    Ok(Json(AddToGoalResponse {
        message,
        goal: to_view(goal, &connection)?,
    }))
}


#[cfg(test)]
mod endpoint_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{get_test_server, get_test_state, get_test_token},
    };

    struct TestClient {
        server: TestServer,
        token: String,
    }

    impl TestClient {
        fn new() -> Self {
            let state = get_test_state();
            let token = get_test_token(&state, "saver@example.com");

            Self {
                server: get_test_server(state),
                token,
            }
        }

        async fn create_goal(&self, body: Value) -> Value {
            let response = self
                .server
                .post(endpoints::GOALS)
                .authorization_bearer(&self.token)
                .json(&body)
                .await;
            response.assert_status(StatusCode::CREATED);
            response.json()
        }
    }

    fn goal_url(endpoint: &str, goal: &Value) -> String {
        format_endpoint(endpoint, goal["id"].as_i64().unwrap())
    }

    #[tokio::test]
    async fn create_goal_returns_derived_fields() {
        let client = TestClient::new();

        let goal = client
            .create_goal(json!({
                "title": "Holiday",
                "target_amount": "1000.00",
                "current_amount": "500.00",
                "deadline": "2030-12-31",
            }))
            .await;

        assert_eq!(goal["title"], "Holiday");
        assert_eq!(goal["target_amount"], "1000.00");
        assert_eq!(goal["current_amount"], "500.00");
        assert_eq!(goal["progress_percentage"], "50.00");
        assert_eq!(goal["remaining_amount"], "500.00");
        assert_eq!(goal["formatted_target_amount"], "$1,000.00");
        assert_eq!(goal["deadline"], "2030-12-31");
        assert_eq!(goal["is_completed"], false);
        assert_eq!(goal["user_name"], "Test User");
    }

    #[tokio::test]
    async fn create_goal_rejects_invalid_amounts() {
        let client = TestClient::new();

        let response = client
            .server
            .post(endpoints::GOALS)
            .authorization_bearer(&client.token)
            .json(&json!({"title": "Bad", "target_amount": 0, "current_amount": -1}))
            .await;

        response.assert_status_bad_request();
        let body = response.json::<Value>();
        assert_eq!(
            body["fields"]["target_amount"][0],
            "Target amount must be greater than zero"
        );
        assert_eq!(
            body["fields"]["current_amount"][0],
            "Current amount cannot be negative"
        );
    }

    #[tokio::test]
    async fn setting_current_amount_to_target_completes_goal() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({
                "title": "Car",
                "target_amount": "1000.00",
                "current_amount": "500.00",
            }))
            .await;

        let response = client
            .server
            .put(&goal_url(endpoints::GOAL_UPDATE_AMOUNT, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({"current_amount": "1000.00"}))
            .await;

        response.assert_status_ok();
        let goal = response.json::<Value>();
        assert_eq!(goal["is_completed"], true);
        assert_eq!(goal["progress_percentage"], "100.00");
        assert_eq!(goal["remaining_amount"], "0.00");
    }

    #[tokio::test]
    async fn put_update_amount_requires_current_amount() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({"title": "Car", "target_amount": "1000.00"}))
            .await;

        let response = client
            .server
            .put(&goal_url(endpoints::GOAL_UPDATE_AMOUNT, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({}))
            .await;

        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>()["fields"]["current_amount"][0],
            "This field is required."
        );
    }

    #[tokio::test]
    async fn patch_update_amount_without_amount_changes_nothing() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({
                "title": "Car",
                "target_amount": "1000.00",
                "current_amount": "10.00",
            }))
            .await;

        let response = client
            .server
            .patch(&goal_url(endpoints::GOAL_UPDATE_AMOUNT, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({}))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["current_amount"], "10.00");
    }

    #[tokio::test]
    async fn add_to_goal_increments_and_reports() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({
                "title": "Vacation",
                "target_amount": "100.00",
                "current_amount": "60.00",
            }))
            .await;

        let response = client
            .server
            .post(&goal_url(endpoints::GOAL_ADD, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({"amount": "50.00"}))
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["message"], "Successfully added $50.00 to Vacation");
        assert_eq!(body["goal"]["current_amount"], "110.00");
        assert_eq!(body["goal"]["is_completed"], true);
        assert_eq!(body["goal"]["progress_percentage"], "100.00");
    }

    #[tokio::test]
    async fn negative_increment_is_rejected_and_goal_unchanged() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({
                "title": "Vacation",
                "target_amount": "100.00",
                "current_amount": "60.00",
            }))
            .await;

        let response = client
            .server
            .post(&goal_url(endpoints::GOAL_ADD, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({"amount": -5}))
            .await;

        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>()["fields"]["amount"][0],
            "Amount must be greater than zero"
        );
        let stored = client
            .server
            .get(&goal_url(endpoints::GOAL, &goal))
            .authorization_bearer(&client.token)
            .await
            .json::<Value>();
        assert_eq!(stored["current_amount"], "60.00");
    }

    #[tokio::test]
    async fn increment_with_three_decimal_places_is_rejected() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({"title": "Vacation", "target_amount": "100.00"}))
            .await;

        client
            .server
            .post(&goal_url(endpoints::GOAL_ADD, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({"amount": "1.005"}))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn list_goals_filters_by_completion() {
        let client = TestClient::new();
        client
            .create_goal(json!({
                "title": "Done",
                "target_amount": "1000.00",
                "current_amount": "1000.00",
            }))
            .await;
        client
            .create_goal(json!({
                "title": "Active",
                "target_amount": "2000.00",
                "current_amount": "500.00",
            }))
            .await;

        let all = client
            .server
            .get(endpoints::GOALS)
            .authorization_bearer(&client.token)
            .await
            .json::<Vec<Value>>();
        let completed = client
            .server
            .get(endpoints::GOALS)
            .add_query_param("completed", "TRUE")
            .authorization_bearer(&client.token)
            .await
            .json::<Vec<Value>>();
        let ignored = client
            .server
            .get(endpoints::GOALS)
            .add_query_param("completed", "maybe")
            .authorization_bearer(&client.token)
            .await
            .json::<Vec<Value>>();

        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["title"], "Active");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0]["title"], "Done");
        assert_eq!(ignored.len(), 2);
    }

    #[tokio::test]
    async fn summary_counts_completed_goals() {
        let client = TestClient::new();
        client
            .create_goal(json!({
                "title": "Done",
                "target_amount": "1000",
                "current_amount": "1000",
            }))
            .await;
        client
            .create_goal(json!({
                "title": "Active",
                "target_amount": "2000",
                "current_amount": "500",
            }))
            .await;

        let response = client
            .server
            .get(endpoints::GOAL_SUMMARY)
            .authorization_bearer(&client.token)
            .await;

        response.assert_status_ok();
        let summary = response.json::<Value>();
        assert_eq!(summary["total_goals"], 2);
        assert_eq!(summary["completed_goals"], 1);
        assert_eq!(summary["active_goals"], 1);
        assert_eq!(summary["completion_rate"], "50.00");
        assert_eq!(summary["total_target_amount"], "3000.00");
        assert_eq!(summary["total_saved_amount"], "1500.00");
        assert_eq!(summary["remaining_amount"], "1500.00");
        assert_eq!(summary["overall_progress_percentage"], "50.00");
    }

    #[tokio::test]
    async fn empty_summary_is_all_zeros() {
        let client = TestClient::new();

        let summary = client
            .server
            .get(endpoints::GOAL_SUMMARY)
            .authorization_bearer(&client.token)
            .await
            .json::<Value>();

        assert_eq!(summary["total_goals"], 0);
        assert_eq!(summary["completion_rate"], "0.00");
        assert_eq!(summary["overall_progress_percentage"], "0.00");
    }

    #[tokio::test]
    async fn put_replaces_and_patch_merges() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({
                "title": "Bike",
                "target_amount": "500.00",
                "current_amount": "100.00",
                "deadline": "2030-01-01",
            }))
            .await;

        let patched = client
            .server
            .patch(&goal_url(endpoints::GOAL, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({"title": "Road bike"}))
            .await;
        patched.assert_status_ok();
        let patched = patched.json::<Value>();
        assert_eq!(patched["title"], "Road bike");
        assert_eq!(patched["current_amount"], "100.00");
        assert_eq!(patched["deadline"], "2030-01-01");

        let replaced = client
            .server
            .put(&goal_url(endpoints::GOAL, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({"title": "Gravel bike", "target_amount": "100.00"}))
            .await;
        replaced.assert_status_ok();
        let replaced = replaced.json::<Value>();
        assert_eq!(replaced["title"], "Gravel bike");
        assert_eq!(replaced["current_amount"], "0.00");
        assert_eq!(replaced["deadline"], Value::Null);
    }

    #[tokio::test]
    async fn delete_goal_responds_no_content_then_not_found() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({"title": "Gone", "target_amount": "10"}))
            .await;

        client
            .server
            .delete(&goal_url(endpoints::GOAL, &goal))
            .authorization_bearer(&client.token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        client
            .server
            .get(&goal_url(endpoints::GOAL, &goal))
            .authorization_bearer(&client.token)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn other_users_goal_is_not_found() {
        let state = get_test_state();
        let owner_token = get_test_token(&state, "owner@example.com");
        let other_token = get_test_token(&state, "other@example.com");
        let server = get_test_server(state);

        let goal = server
            .post(endpoints::GOALS)
            .authorization_bearer(&owner_token)
            .json(&json!({"title": "Mine", "target_amount": "10"}))
            .await
            .json::<Value>();
        let url = goal_url(endpoints::GOAL, &goal);

        server
            .get(&url)
            .authorization_bearer(&other_token)
            .await
            .assert_status_not_found();
        server
            .put(&url)
            .authorization_bearer(&other_token)
            .json(&json!({}))
            .await
            .assert_status_not_found();
        server
            .post(&goal_url(endpoints::GOAL_ADD, &goal))
            .authorization_bearer(&other_token)
            .json(&json!({"amount": "1"}))
            .await
            .assert_status_not_found();
        server
            .delete(&url)
            .authorization_bearer(&other_token)
            .await
            .assert_status_not_found();
        let others = server
            .get(endpoints::GOALS)
            .authorization_bearer(&other_token)
            .await
            .json::<Vec<Value>>();
        assert!(others.is_empty());
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized_not_missing() {
        let server = get_test_server(get_test_state());

        server
            .get(&format_endpoint(endpoints::GOAL, 1))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get(endpoints::GOALS)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn patch_with_null_deadline_clears_it() {
        let client = TestClient::new();
        let goal = client
            .create_goal(json!({
                "title": "Bike",
                "target_amount": "500.00",
                "deadline": "2030-01-01",
            }))
            .await;

        let response = client
            .server
            .patch(&goal_url(endpoints::GOAL, &goal))
            .authorization_bearer(&client.token)
            .json(&json!({"deadline": null}))
            .await;

        response.assert_status_ok();
        let patched = response.json::<Value>();
        assert_eq!(patched["deadline"], Value::Null);
        assert_eq!(patched["title"], "Bike");
    }

    #[tokio::test]
    async fn create_with_null_current_amount_is_rejected() {
        let client = TestClient::new();

        let response = client
            .server
            .post(endpoints::GOALS)
            .authorization_bearer(&client.token)
            .json(&json!({"title": "Bike", "target_amount": "500.00", "current_amount": null}))
            .await;

        response.assert_status_bad_request();
        assert_eq!(
            response.json::<Value>()["fields"]["current_amount"][0],
            "This field may not be null."
        );
    }
}
