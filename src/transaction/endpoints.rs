//! Route handlers for transactions, their statistics and monthly summaries.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    db::lock_connection,
    json::JsonBody,
    timezone::today,
    transaction::{
        core::{
            Transaction, TransactionView, create_transaction, delete_transaction, get_transaction,
            list_transactions, update_transaction,
        },
        filter::{TransactionFilter, TransactionListQuery, filter_transactions},
        form::TransactionForm,
        summary::{MonthlySummary, MonthlySummaryQuery, OverallStats, monthly_summary, overall_stats},
    },
    user::{UserID, get_user_by_id},
};

/// The state needed by the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn to_view(transaction: Transaction, connection: &Connection) -> Result<TransactionView, Error> {
    let owner = get_user_by_id(transaction.user_id, connection)?;

    Ok(TransactionView::new(transaction, &owner.full_name()))
}

/// A route handler that lists the user's transactions, most recent first.
///
/// Supports the query parameters `type`, `category`, `start_date` and `end_date`.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<Vec<TransactionView>>, Error> {
    let filter = TransactionFilter::from(query);
    let connection = lock_connection(&state.db_connection)?;
    let user_name = get_user_by_id(user_id, &connection)?.full_name();

    let transactions = filter_transactions(list_transactions(user_id, &connection)?, &filter)
        .map(|transaction| TransactionView::new(transaction, &user_name))
        .collect();

    Ok(Json(transactions))
}

/// A route handler for creating a transaction dated today in the server's timezone.
///
/// Responds with 201 Created and the new transaction.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(form): JsonBody<TransactionForm>,
) -> Result<Response, Error> {
    let draft = form.into_draft()?;
    let date = today(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let transaction = create_transaction(user_id, draft, date, &connection)?;
    tracing::debug!("User {user_id} created transaction {}", transaction.id);

    Ok((StatusCode::CREATED, Json(to_view(transaction, &connection)?)).into_response())
}

/// A route handler that responds with a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<TransactionView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = get_transaction(transaction_id, user_id, &connection)?;

    to_view(transaction, &connection).map(Json)
}

/// A route handler that replaces the amount, type, category and description of a transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    JsonBody(form): JsonBody<TransactionForm>,
) -> Result<Json<TransactionView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = get_transaction(transaction_id, user_id, &connection)?;

    let draft = form.replace(&transaction)?;
    let transaction = update_transaction(transaction_id, user_id, draft, &connection)?;

    to_view(transaction, &connection).map(Json)
}

/// A route handler that changes only the fields of a transaction present in the body.
pub async fn patch_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    JsonBody(form): JsonBody<TransactionForm>,
) -> Result<Json<TransactionView>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transaction = get_transaction(transaction_id, user_id, &connection)?;

    let draft = form.merge_into(&transaction)?;
    let transaction = update_transaction(transaction_id, user_id, draft, &connection)?;

    to_view(transaction, &connection).map(Json)
}

/// A route handler for deleting a transaction, responds with 204 No Content.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_transaction(transaction_id, user_id, &connection)?;
    tracing::debug!("User {user_id} deleted transaction {transaction_id}");

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler that responds with statistics over all of the user's transactions.
pub async fn transaction_stats_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<OverallStats>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transactions = list_transactions(user_id, &connection)?;

    Ok(Json(overall_stats(&transactions)))
}

/// A route handler that summarizes one calendar month of the user's transactions.
///
/// The `month` and `year` query parameters default to the current month in
/// the server's timezone.
pub async fn monthly_summary_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<MonthlySummaryQuery>,
) -> Result<Json<MonthlySummary>, Error> {
    let (month, year) = query.resolve(today(&state.local_timezone)?)?;
    let connection = lock_connection(&state.db_connection)?;
    let transactions = list_transactions(user_id, &connection)?;

    Ok(Json(monthly_summary(&transactions, month, year)))
}
